use arengine_lib::scenario::Scenario;
use std::{collections::HashSet, fs, path::Path};

const SCENARIO_FILES: &[&str] = &["plaza.toml", "tiled_area.toml", "tracking.toml"];

const FEED_FILES: &[&str] = &["plaza.json"];

#[test]
fn example_scenario_file_list_matches_expected() {
    let files: HashSet<String> = fs::read_dir("../scenarios")
        .unwrap()
        .map(|d| d.unwrap().file_name().into_string().unwrap())
        .collect();
    let expected: HashSet<String> = SCENARIO_FILES
        .iter()
        .chain(FEED_FILES.iter())
        .map(|f| f.to_string())
        .collect();
    assert_eq!(files, expected, "Example scenarios directory is missing an expected file or contains a new file that should be tested");
}

#[test]
fn example_scenario_files_parse() {
    let dir = Path::new("../scenarios");
    for file in SCENARIO_FILES {
        let scenario = Scenario::load(dir.join(file)).unwrap();
        let feed = scenario.load_feed().unwrap();
        assert!(!feed.is_empty(), "{file} has an empty feed");
        assert!(scenario.frame_count() > 0);
    }
}
