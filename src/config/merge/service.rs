//! MergeService: stacks config sources and deserializes to DedupConfig.

use crate::config::sources::{environment, global_file};
use crate::config::DedupConfig;
use config::{Config, ConfigError, File};
use std::path::Path;

pub struct MergeService;

impl MergeService {
    /// Precedence: serde defaults (lowest) -> global file -> environment (highest).
    pub fn load() -> Result<DedupConfig, ConfigError> {
        let builder = Config::builder();
        let builder = global_file::add_to_builder(builder)?;
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }

    /// Load a specific file (which must exist) with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<DedupConfig, ConfigError> {
        let builder = Config::builder().add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }
}
