use tokenseq::settings::*;

fn main() {
    // Load settings from the default location
    let project_settings = parse_settings(None).unwrap();
    println!("Loaded settings: {:?}", project_settings);

    // Attempt to load from an invalid path (expected to fail)
    let is_err = parse_settings(Some("")).is_err();
    println!("Error on invalid path: {:?}", is_err);

    // Attempt to load from a custom path
    // $ cargo run --bin settings_demo -- --settings=settings/release.toml register
    let path = Cli::try_parse().ok().and_then(|cli| cli.settings);
    let project_settings = parse_settings(path.as_deref()).unwrap();
    println!(
        "Loaded settings: {}",
        serde_json::to_string_pretty(&project_settings).unwrap()
    );
}
