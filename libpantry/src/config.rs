use crate::access::{self, AccessGate};
use crate::ledger::ReconcilePolicy;
use crate::parser::{self, Options};
use crate::store::StoreOptions;
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};

use std::path::{Path, PathBuf};

/// Where every table lives and how the ledger behaves.
///
/// Read from a file of `option "key" "value"` and `include "file"`
/// directives. Anything not set keeps its default.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub donation_file: String,
    pub spoilage_file: String,
    pub menstrual_file: String,
    pub survey_file: String,
    pub menu_file: String,
    pub removed_file: String,
    pub reconcile: ReconcilePolicy,
    pub compact_every: usize,
    pub write_secret_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("."),
            ledger_file: "product_data.csv".to_string(),
            donation_file: "donation_data.csv".to_string(),
            spoilage_file: "spoilage_data.csv".to_string(),
            menstrual_file: "menstrual_data.csv".to_string(),
            survey_file: "survey_data.csv".to_string(),
            menu_file: "walk_in_menu.csv".to_string(),
            removed_file: "removed_products.csv".to_string(),
            reconcile: ReconcilePolicy::Bounded,
            compact_every: 50,
            write_secret_env: "PANTRY_WRITE_SECRET".to_string(),
        }
    }
}

impl Config {
    /// Load `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            debug!("{} not found, using default configuration", path.display());
            return Ok(Config::default());
        }
        let options = parser::parse_options_file(path, None)
            .with_context(|| format!("unable to read configuration {}", path.display()))?;
        Config::from_options(&options)
    }

    pub fn from_options(options: &Options) -> Result<Config> {
        let mut config = Config::default();
        for (key, value) in options {
            match key.as_str() {
                "data_dir" => config.data_dir = PathBuf::from(value),
                "ledger_file" => config.ledger_file = value.clone(),
                "donation_file" => config.donation_file = value.clone(),
                "spoilage_file" => config.spoilage_file = value.clone(),
                "menstrual_file" => config.menstrual_file = value.clone(),
                "survey_file" => config.survey_file = value.clone(),
                "menu_file" => config.menu_file = value.clone(),
                "removed_file" => config.removed_file = value.clone(),
                "reconcile" => config.reconcile = value.parse()?,
                "compact_every" => {
                    config.compact_every = value
                        .trim()
                        .parse()
                        .map_err(|_| anyhow!("invalid compact_every: '{}'", value))?
                }
                "write_secret_env" => config.write_secret_env = value.clone(),
                _ => warn!("ignoring unknown option '{}'", key),
            }
        }
        Ok(config)
    }

    fn in_data_dir(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.in_data_dir(&self.ledger_file)
    }

    pub fn donation_path(&self) -> PathBuf {
        self.in_data_dir(&self.donation_file)
    }

    pub fn spoilage_path(&self) -> PathBuf {
        self.in_data_dir(&self.spoilage_file)
    }

    pub fn menstrual_path(&self) -> PathBuf {
        self.in_data_dir(&self.menstrual_file)
    }

    pub fn survey_path(&self) -> PathBuf {
        self.in_data_dir(&self.survey_file)
    }

    pub fn menu_path(&self) -> PathBuf {
        self.in_data_dir(&self.menu_file)
    }

    pub fn removed_path(&self) -> PathBuf {
        self.in_data_dir(&self.removed_file)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            policy: self.reconcile,
            compact_every: self.compact_every,
        }
    }

    pub fn access_gate(&self) -> Box<dyn AccessGate> {
        access::gate_from_env(&self.write_secret_env)
    }
}
