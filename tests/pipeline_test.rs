use pretty_assertions::assert_eq;
use proptest::prelude::*;
use referendum_map::config::AppConfig;
use referendum_map::data::load_data;
use referendum_map::export::write_results;
use referendum_map::merge::{is_excluded, merge_referendum_and_areas, merge_regions_and_departments};
use referendum_map::types::{BallotCounts, BallotRecord, Department, Region};
use referendum_map::{run, PipelineError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const REFERENDUM: &str = "\
Department code;Department name;Town code;Town name;Registered;Abstentions;Null;Choice A;Choice B
1;AIN;1;L'Abergement-Clémenciat;60;12;3;25;20
1;AIN;2;L'Abergement-de-Varey;40;8;2;15;15
75;PARIS;56;Paris;500;100;20;200;180
2A;CORSE SUD;4;Ajaccio;80;20;0;0;0
ZA;GUADELOUPE;101;Les Abymes;300;30;10;150;110
ZZ;FRANCAIS DE L'ETRANGER;1;Europe;900;500;40;200;160
99;LEGACY;1;Old;70;7;3;30;30
";

const REGIONS: &str = "\
id,code,name,slug
1,84,Auvergne-Rhône-Alpes,auvergne-rhone-alpes
2,11,Île-de-France,ile-de-france
3,94,Corse,corse
4,01,Guadeloupe,guadeloupe
";

const DEPARTMENTS: &str = "\
id,region_code,code,name,slug
1,84,01,Ain,ain
2,11,75,Paris,paris
3,94,2A,Corse-du-Sud,corse-du-sud
4,01,ZA,Guadeloupe,guadeloupe
5,00,99,Legacy,legacy
";

const GEOMETRY: &str = r#"{"type":"FeatureCollection","features":[
{"type":"Feature","properties":{"code":"84","nom":"Auvergne-Rhône-Alpes"},
 "geometry":{"type":"Polygon","coordinates":[[[3.0,44.5],[6.5,44.5],[6.5,46.5],[3.0,46.5],[3.0,44.5]]]}},
{"type":"Feature","properties":{"code":"11","nom":"Île-de-France"},
 "geometry":{"type":"Polygon","coordinates":[[[1.5,48.2],[3.5,48.2],[3.5,49.2],[1.5,49.2],[1.5,48.2]]]}},
{"type":"Feature","properties":{"code":"94","nom":"Corse"},
 "geometry":{"type":"MultiPolygon","coordinates":[[[[8.5,41.4],[9.5,41.4],[9.5,43.0],[8.5,43.0],[8.5,41.4]]]]}},
{"type":"Feature","properties":{"code":"53","nom":"Bretagne"},
 "geometry":{"type":"Polygon","coordinates":[[[-5.0,47.3],[-1.0,47.3],[-1.0,48.9],[-5.0,48.9],[-5.0,47.3]]]}}
]}"#;

fn fixture() -> (TempDir, AppConfig) {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "referendum.csv", REFERENDUM);
    write(dir.path(), "regions.csv", REGIONS);
    write(dir.path(), "departments.csv", DEPARTMENTS);
    write(dir.path(), "regions.geojson", GEOMETRY);

    let mut config = AppConfig::with_data_dir(dir.path());
    config.output.width = 300;
    config.output.height = 300;
    (dir, config)
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn aggregates_metropolitan_regions() {
    let (_dir, config) = fixture();

    let output = run(&config).unwrap();

    let rows: Vec<(&str, &str, BallotCounts)> = output
        .results
        .iter()
        .map(|r| (r.code.as_str(), r.name.as_str(), r.counts))
        .collect();
    assert_eq!(
        rows,
        vec![
            (
                "11",
                "Île-de-France",
                BallotCounts { registered: 500, abstentions: 100, null: 20, choice_a: 200, choice_b: 180 }
            ),
            (
                "84",
                "Auvergne-Rhône-Alpes",
                BallotCounts { registered: 100, abstentions: 20, null: 5, choice_a: 40, choice_b: 35 }
            ),
            (
                "94",
                "Corse",
                BallotCounts { registered: 80, abstentions: 20, null: 0, choice_a: 0, choice_b: 0 }
            ),
        ]
    );
}

#[test]
fn map_keeps_ratio_and_name_per_geometry() {
    let (_dir, config) = fixture();

    let output = run(&config).unwrap();
    let map = &output.map;

    assert_eq!(map.len(), 4);
    let aura = map.get("84").unwrap();
    assert_eq!(aura.name.as_deref(), Some("Auvergne-Rhône-Alpes"));
    assert!((aura.ratio - 0.5333).abs() < 1e-4);

    // No expressed ballots.
    assert!(map.get("94").unwrap().ratio.is_nan());
    // No result at all.
    let bretagne = map.get("53").unwrap();
    assert!(bretagne.ratio.is_nan());
    assert_eq!(bretagne.name, None);

    assert_eq!(output.figure.dimensions(), (300, 300));
}

#[test]
fn missing_source_aborts_with_its_path() {
    let (dir, config) = fixture();
    let missing = dir.path().join("departments.csv");
    fs::remove_file(&missing).unwrap();

    match run(&config) {
        Err(PipelineError::FileNotFound { path }) => assert_eq!(path, missing),
        Err(other) => panic!("unexpected error {other:?}"),
        Ok(_) => panic!("pipeline should fail without departments"),
    }
}

#[test]
fn missing_geometry_aborts_before_any_output() {
    let (dir, config) = fixture();
    fs::remove_file(dir.path().join("regions.geojson")).unwrap();

    let err = run(&config).err().unwrap();
    assert!(err.is_file_not_found());
    assert!(err.to_string().contains("regions.geojson"));
}

#[test]
fn rerun_produces_identical_results_table() {
    let (_dir, config) = fixture();

    let mut first = Vec::new();
    write_results(&run(&config).unwrap().results, &mut first).unwrap();
    let mut second = Vec::new();
    write_results(&run(&config).unwrap().results, &mut second).unwrap();

    assert_eq!(first, second);
}

#[test]
fn orphan_department_survives_hierarchy_but_not_results() {
    let (_dir, config) = fixture();
    let tables = load_data(&config).unwrap();

    let hierarchy = merge_regions_and_departments(&tables.regions, &tables.departments);
    assert_eq!(hierarchy.len(), tables.departments.len());
    let legacy = hierarchy.iter().find(|rd| rd.department_code == "99").unwrap();
    assert_eq!(legacy.region_name(), None);

    let areas = merge_referendum_and_areas(&tables.referendum, &hierarchy, "Z");
    assert!(areas.iter().all(|a| a.department_code != "99"));
    assert!(areas.iter().all(|a| !a.department_code.contains('Z')));
    assert_eq!(areas.len(), 4);
}

fn arb_code() -> impl Strategy<Value = String> {
    "[0-9A-Z]{1,3}"
}

proptest! {
    #[test]
    fn filter_removes_exactly_marked_codes(codes in prop::collection::vec(arb_code(), 0..40)) {
        let regions = vec![Region { code: "R".to_string(), name: "Region".to_string() }];
        let departments: Vec<Department> = codes
            .iter()
            .map(|c| Department { code: c.clone(), name: c.clone(), region_code: "R".to_string() })
            .collect();
        let mut seen = std::collections::HashSet::new();
        let unique: Vec<Department> = departments.into_iter().filter(|d| seen.insert(d.code.clone())).collect();
        let records: Vec<BallotRecord> = codes
            .iter()
            .map(|c| BallotRecord { department_code: c.clone(), counts: BallotCounts::default() })
            .collect();

        let hierarchy = merge_regions_and_departments(&regions, &unique);
        prop_assert_eq!(hierarchy.len(), unique.len());

        let areas = merge_referendum_and_areas(&records, &hierarchy, "Z");
        let expected = codes.iter().filter(|c| !is_excluded(c, "Z")).count();
        prop_assert_eq!(areas.len(), expected);
        prop_assert!(areas.iter().all(|a| !a.department_code.contains('Z')));
    }

    #[test]
    fn registered_total_is_preserved_by_aggregation(regs in prop::collection::vec(0u64..100_000, 1..4)) {
        let (dir, config) = fixture();
        let mut csv = String::from("Department code;Registered;Abstentions;Null;Choice A;Choice B\n");
        for (i, r) in regs.iter().enumerate() {
            let code = ["01", "75", "2A"][i % 3];
            csv.push_str(&format!("{};{};0;0;1;1\n", code, r));
        }
        write(dir.path(), "referendum.csv", &csv);

        let output = run(&config).unwrap();
        let total: u64 = output.results.iter().map(|r| r.counts.registered).sum();
        prop_assert_eq!(total, regs.iter().sum::<u64>());
    }
}
