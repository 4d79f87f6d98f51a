use clap::Parser;
use pvd_search::config::{AppConfig, CliArgs};
use pvd_search::error::SearchError;
use pvd_search::loader::DataSource;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn with_password() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.password = "secret".to_string();
    config
}

#[test]
fn test_defaults() {
    let config = AppConfig::default();

    assert_eq!(config.records_sheet, "raw");
    assert_eq!(config.grades_sheet, "참조표2");
    assert_eq!(config.page_size, 15);
    assert!(config.auth.enabled);
    assert_eq!(config.auth.token_ttl_hours, 24);
    assert_eq!(config.width.min_px, 80);
    assert_eq!(config.width.max_px, 360);
}

#[test]
fn test_yaml_overrides_only_given_keys() {
    let config = AppConfig::from_yaml_str(
        r#"
data_path: /srv/pvd/공정.xlsx
page_size: 30
auth:
  username: operator
  password: pw
width:
  max_px: 500
"#,
    )
    .unwrap();

    assert_eq!(config.data_path, PathBuf::from("/srv/pvd/공정.xlsx"));
    assert_eq!(config.page_size, 30);
    assert_eq!(config.auth.username, "operator");
    assert!(config.auth.enabled);
    assert_eq!(config.width.max_px, 500);
    assert_eq!(config.width.px_per_char, 9);
    assert_eq!(config.records_sheet, "raw");
    config.validate().unwrap();
}

#[test]
fn test_malformed_yaml() {
    let err = AppConfig::from_yaml_str("page_size: [1, 2").unwrap_err();
    assert!(matches!(err, SearchError::Config(_)));
}

#[test]
fn test_load_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pvd.yaml");
    fs::write(&path, "listen: 0.0.0.0:8080\n").unwrap();

    let config = AppConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config.listen, "0.0.0.0:8080");

    assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    assert!(matches!(
        AppConfig::load(Some(dir.path().join("missing.yaml").as_path())),
        Err(SearchError::Config(_))
    ));
}

#[test]
fn test_validation() {
    with_password().validate().unwrap();

    // the gate needs a password unless it is switched off
    assert!(AppConfig::default().validate().is_err());
    let mut open = AppConfig::default();
    open.auth.enabled = false;
    open.validate().unwrap();

    let mut config = with_password();
    config.page_size = 0;
    assert!(config.validate().is_err());

    let mut config = with_password();
    config.width.min_px = 400;
    assert!(config.validate().is_err());

    let mut config = with_password();
    config.records_csv = Some(PathBuf::from("raw.csv"));
    assert!(config.validate().is_err());

    let mut config = with_password();
    config.auth.token_ttl_hours = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_environment_overrides() {
    let env: HashMap<&str, &str> = [
        ("PVD_DATA_PATH", "/data/pvd.xlsx"),
        ("PVD_AUTH_PASSWORD", "from-env"),
    ]
    .into_iter()
    .collect();

    let mut config = AppConfig::default();
    config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.data_path, PathBuf::from("/data/pvd.xlsx"));
    assert_eq!(config.auth.password, "from-env");
    assert_eq!(config.auth.username, "admin");
}

#[test]
fn test_flags_override_file() {
    let args = CliArgs::parse_from([
        "website",
        "--records-csv",
        "raw.csv",
        "--grades-csv",
        "grades.csv",
        "--page-size",
        "5",
        "--listen",
        "0.0.0.0:9000",
        "--no-auth",
    ]);

    let mut config = AppConfig::default();
    config.apply_args(&args);
    config.validate().unwrap();

    assert_eq!(config.page_size, 5);
    assert_eq!(config.listen, "0.0.0.0:9000");
    assert!(!config.auth.enabled);
    assert_eq!(
        config.data_source(),
        DataSource::Csv {
            records: PathBuf::from("raw.csv"),
            grades: PathBuf::from("grades.csv"),
        }
    );
}

#[test]
fn test_workbook_source_by_default() {
    let config = with_password();
    match config.data_source() {
        DataSource::Workbook {
            records_sheet,
            grades_sheet,
            ..
        } => {
            assert_eq!(records_sheet, "raw");
            assert_eq!(grades_sheet, "참조표2");
        }
        other => panic!("expected workbook source, got {:?}", other),
    }
}
