// config lets you layer a settings file and the environment over defaults
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::construct::KeyOptions;
use crate::error::Result;

pub const DEFAULT_SETTINGS_FILE: &str = "datarepo";
pub const ENV_PREFIX: &str = "DATAREPO";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,
    /// Type enforcement for seeded keys.
    pub type_enforcement: bool,
    pub seed_json: Option<PathBuf>,
    pub seed_base_key: String,
    pub seed_pass: Option<String>,
}

impl Settings {
    /// Defaults, then `file` (or `datarepo.toml` etc. in the working directory when
    /// none is given, optional in that case), then `DATAREPO_*` environment variables.
    pub fn load(file: Option<&str>) -> Result<Self> {
        let source = match file {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };
        let settings = Config::builder()
            .set_default("log_filter", "info")?
            .set_default("type_enforcement", false)?
            .set_default("seed_base_key", "")?
            .add_source(source)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
    pub fn key_options(&self) -> KeyOptions {
        let options = KeyOptions::new().enforce_type(self.type_enforcement);
        match &self.seed_pass {
            Some(pass) => options.delete_pass(pass.as_str()),
            None => options,
        }
    }
}
