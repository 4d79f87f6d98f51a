use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};
use crate::loader::{DEFAULT_GRADES_SHEET, DEFAULT_RECORDS_SHEET, DataSource};
use crate::login::AuthConfig;
use crate::projection::WidthPolicy;
use crate::store::TableStore;

/// Command-line flags shared by the web server and the terminal front end.
///
/// Flags override values from the YAML file given with `--config`.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "pvd-search", about = "Search the PVD process workbook")]
pub struct CliArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Workbook holding the raw and reference sheets
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// CSV export of the raw sheet (use together with --grades-csv)
    #[arg(long)]
    pub records_csv: Option<PathBuf>,

    /// CSV export of the reference sheet
    #[arg(long)]
    pub grades_csv: Option<PathBuf>,

    /// Compressed snapshot of the parsed tables
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Rows per result page
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Disable the login gate
    #[arg(long)]
    pub no_auth: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub records_sheet: String,
    pub grades_sheet: String,
    pub records_csv: Option<PathBuf>,
    pub grades_csv: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    pub listen: String,
    pub page_size: usize,
    pub auth: AuthConfig,
    pub width: WidthPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_path: PathBuf::from("data/___PVD 공정 데이터 APPS_1.xlsx"),
            records_sheet: DEFAULT_RECORDS_SHEET.to_string(),
            grades_sheet: DEFAULT_GRADES_SHEET.to_string(),
            records_csv: None,
            grades_csv: None,
            snapshot_path: None,
            listen: "127.0.0.1:3000".to_string(),
            page_size: 15,
            auth: AuthConfig::default(),
            width: WidthPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| SearchError::Config(e.to_string()))
    }

    /// Read `path` if given, otherwise start from the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|e| {
                    SearchError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_yaml_str(&contents)
            }
            None => Ok(Self::default()),
        }
    }

    /// File, then environment, then flags; the result is validated.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let mut config = Self::load(args.config.as_deref())?;
        config.apply_env_from(|key| std::env::var(key).ok());
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    /// `PVD_DATA_PATH`, `PVD_AUTH_USERNAME` and `PVD_AUTH_PASSWORD` override the file.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("PVD_DATA_PATH") {
            self.data_path = PathBuf::from(path);
        }
        if let Some(username) = lookup("PVD_AUTH_USERNAME") {
            self.auth.username = username;
        }
        if let Some(password) = lookup("PVD_AUTH_PASSWORD") {
            self.auth.password = password;
        }
    }

    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(data) = &args.data {
            self.data_path = data.clone();
        }
        if let Some(records) = &args.records_csv {
            self.records_csv = Some(records.clone());
        }
        if let Some(grades) = &args.grades_csv {
            self.grades_csv = Some(grades.clone());
        }
        if let Some(snapshot) = &args.snapshot {
            self.snapshot_path = Some(snapshot.clone());
        }
        if let Some(listen) = &args.listen {
            self.listen = listen.clone();
        }
        if let Some(page_size) = args.page_size {
            self.page_size = page_size;
        }
        if args.no_auth {
            self.auth.enabled = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(SearchError::Config("page_size must be at least 1".into()));
        }
        if self.width.min_px > self.width.max_px {
            return Err(SearchError::Config(format!(
                "width.min_px ({}) is larger than width.max_px ({})",
                self.width.min_px, self.width.max_px
            )));
        }
        if self.records_csv.is_some() != self.grades_csv.is_some() {
            return Err(SearchError::Config(
                "records_csv and grades_csv must be given together".into(),
            ));
        }
        if self.auth.enabled {
            if self.auth.username.is_empty() || self.auth.password.is_empty() {
                return Err(SearchError::Config(
                    "auth.username and auth.password must be set while the login gate is enabled"
                        .into(),
                ));
            }
            if self.auth.token_ttl_hours == 0 || self.auth.token_ttl_hours > 24 * 365 {
                return Err(SearchError::Config(
                    "auth.token_ttl_hours must be between 1 and 8760".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn data_source(&self) -> DataSource {
        match (&self.records_csv, &self.grades_csv) {
            (Some(records), Some(grades)) => DataSource::Csv {
                records: records.clone(),
                grades: grades.clone(),
            },
            _ => DataSource::Workbook {
                path: self.data_path.clone(),
                records_sheet: self.records_sheet.clone(),
                grades_sheet: self.grades_sheet.clone(),
            },
        }
    }

    pub fn table_store(&self) -> TableStore {
        let store = TableStore::new(self.data_source());
        match &self.snapshot_path {
            Some(snapshot) => store.with_snapshot(snapshot),
            None => store,
        }
    }
}
