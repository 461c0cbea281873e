use blueprintflow::settings::DEFAULT_SETTINGS;
use blueprintflow::{eq_struct, load_settings, load_user_settings, Error, ModelTask, UserPaths};
use std::fs;
use tempfile::TempDir;

fn doc(text: &str) -> toml::Table {
    text.parse::<toml::Table>().unwrap()
}

#[test]
fn test_eq_struct_properties() {
    let default = doc(DEFAULT_SETTINGS);
    assert!(eq_struct(&default, &default));

    assert!(!eq_struct(&doc("a = 1"), &doc("a = 1\nb = 1")));
    assert!(!eq_struct(&doc("a = 1\nb = 1"), &doc("a = 1")));
    assert!(eq_struct(&doc("a = 1"), &doc("a = 2")));
    assert!(!eq_struct(&doc("a = 1"), &doc("a = false")));
    assert!(eq_struct(&doc("[x.y]\nlist = [1]"), &doc("[x.y]\nlist = []")));
    assert!(!eq_struct(&doc("[x.y]\nz = 1"), &doc("[x.y]\nw = 1")));
}

#[test]
fn test_bundled_default_covers_every_task() {
    let settings = load_settings(None).unwrap();
    for task in ModelTask::ALL {
        let model = settings.model(task).unwrap();
        assert!(!model.identifier.is_empty(), "{}", task);
    }
}

#[test]
fn test_custom_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("custom.toml");
    let custom = DEFAULT_SETTINGS.replace("http://localhost:11434", "http://gpu-box:11434");
    fs::write(&file, custom).unwrap();

    let settings = load_settings(Some(&file)).unwrap();
    assert_eq!(settings.model(ModelTask::Chat).unwrap().api_base, "http://gpu-box:11434");
}

#[test]
fn test_missing_section_is_a_mismatch() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("settings.toml");
    let without_thinking = DEFAULT_SETTINGS
        .split("[models.thinking]")
        .next()
        .unwrap()
        .to_string();
    fs::write(&file, without_thinking).unwrap();

    assert!(matches!(load_settings(Some(&file)), Err(Error::ConfigStructureMismatch)));
}

#[test]
fn test_user_settings_file_is_reused() {
    let temp_dir = TempDir::new().unwrap();
    let paths = UserPaths::with_root(temp_dir.path());
    load_user_settings(&paths).unwrap();

    let edited = DEFAULT_SETTINGS.replace("deepseek-r1:8b", "qwq:32b");
    fs::write(paths.settings_file(), edited).unwrap();

    let settings = load_user_settings(&paths).unwrap();
    assert_eq!(settings.model(ModelTask::Thinking).unwrap().identifier, "qwq:32b");
}
