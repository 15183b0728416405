use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_PATH: &str = "workmanager_erp.db";
pub const DEFAULT_TAX_ID: &str = "901.234.567-8";
pub const DEFAULT_CREATOR_TAG: &str = "AUTO_IMPORT";

/// Values the importer injects into records that leave them out.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ImportConfig {
    pub database_path: PathBuf,
    pub default_tax_id: String,
    pub default_creator_tag: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            default_tax_id: DEFAULT_TAX_ID.to_string(),
            default_creator_tag: DEFAULT_CREATOR_TAG.to_string(),
        }
    }
}

impl ImportConfig {
    /// Layering, lowest priority first: built-in defaults, the optional config
    /// file, `WORKMANAGER__*` environment variables, then the `--db` flag.
    pub fn load(config_file: Option<&Path>, db_override: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("database_path", DEFAULT_DATABASE_PATH)?
            .set_default("default_tax_id", DEFAULT_TAX_ID)?
            .set_default("default_creator_tag", DEFAULT_CREATOR_TAG)?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        // e.g. WORKMANAGER__DEFAULT_TAX_ID=800.000.000-1
        builder = builder.add_source(Environment::with_prefix("WORKMANAGER").separator("__"));

        if let Some(db) = db_override {
            builder = builder.set_override("database_path", db.to_string_lossy().to_string())?;
        }

        builder.build()?.try_deserialize()
    }
}
