use clap::Parser;
use referendum_map::config::AppConfig;
use referendum_map::{export, pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration; defaults are used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the referendum, region, department and geometry files
    #[arg(long, value_name = "DIR", env = "REFERENDUM_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut app_config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        app_config.input.data_dir = dir;
    }

    let output = match pipeline::run(&app_config) {
        Ok(output) => output,
        Err(e) if e.is_file_not_found() => {
            anyhow::bail!("Data file not found, no map was produced. {}", e);
        }
        Err(e) => return Err(e.into()),
    };

    let out = &app_config.output;
    export::save_results(&output.results, &out.dir.join(&out.results_csv))?;
    export::save_region_map(&output.map, &out.dir.join(&out.map_geojson))?;
    export::save_figure(&output.figure, &out.dir.join(&out.map_png))?;

    println!("Map written to {:?}", out.dir.join(&out.map_png));
    Ok(())
}
