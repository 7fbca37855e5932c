use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub data_dir: PathBuf,
    pub referendum: PathBuf,
    #[serde(deserialize_with = "ascii_delimiter")]
    pub referendum_delimiter: u8,
    pub regions: PathBuf,
    #[serde(deserialize_with = "ascii_delimiter")]
    pub regions_delimiter: u8,
    pub departments: PathBuf,
    #[serde(deserialize_with = "ascii_delimiter")]
    pub departments_delimiter: u8,
    pub geometry: PathBuf, // GeoJSON or Shapefile
    pub geometry_code_property: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            referendum: PathBuf::from("referendum.csv"),
            referendum_delimiter: b';',
            regions: PathBuf::from("regions.csv"),
            regions_delimiter: b',',
            departments: PathBuf::from("departments.csv"),
            departments_delimiter: b',',
            geometry: PathBuf::from("regions.geojson"),
            geometry_code_property: "code".to_string(),
        }
    }
}

impl InputConfig {
    pub fn referendum_path(&self) -> PathBuf {
        self.data_dir.join(&self.referendum)
    }

    pub fn regions_path(&self) -> PathBuf {
        self.data_dir.join(&self.regions)
    }

    pub fn departments_path(&self) -> PathBuf {
        self.data_dir.join(&self.departments)
    }

    pub fn geometry_path(&self) -> PathBuf {
        self.data_dir.join(&self.geometry)
    }
}

// The CSV reader splits on a single byte.
fn ascii_delimiter<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let c = char::deserialize(deserializer)?;
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(serde::de::Error::custom(format!(
            "delimiter {:?} is not a single ASCII character",
            c
        )))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterConfig {
    /// Department codes containing this are overseas territories or abroad.
    pub excluded_marker: String,
    /// Ballot department codes are zero-padded to this width.
    pub department_code_width: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_marker: "Z".to_string(),
            department_code_width: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub results_csv: PathBuf,
    pub map_geojson: PathBuf,
    pub map_png: PathBuf,
    pub width: u32,
    pub height: u32,
    pub font: Option<PathBuf>, // TTF used for title and legend label
    pub title: String,
    pub legend_label: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            results_csv: PathBuf::from("referendum_results.csv"),
            map_geojson: PathBuf::from("referendum_map.geojson"),
            map_png: PathBuf::from("referendum_map.png"),
            width: 1000,
            height: 1000,
            font: None,
            title: "Referendum Results by Region (Ratio of 'Choice A')".to_string(),
            legend_label: "Ratio of 'Choice A' over Expressed Ballots".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Config rooted at `data_dir` with every other setting at its default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let mut config = AppConfig::default();
        config.input.data_dir = data_dir.into();
        config
    }
}
