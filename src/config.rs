// SPDX-License-Identifier: MPL-2.0
//! Enhancement presets as TOML files.
//!
//! A preset bundles a mode and its parameters so callers can persist and
//! share enhancement settings. This is the only filesystem access in the
//! crate besides whatever a [`crate::model::WeightSource`] implementation
//! chooses to do; the pipeline itself never touches disk.
//!
//! ```no_run
//! use relumin::config::{self, EnhanceConfig};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), relumin::EnhanceError> {
//! let preset = config::load_from_path(Path::new("preset.toml"))?;
//! preset.parameters.validate()?;
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EnhanceError, EnhanceResult};
use crate::pipeline::{EnhancementMode, Parameters};

/// A persisted enhancement preset: which mode to run and how.
///
/// Missing fields fall back to their defaults, so a preset file may name
/// just a mode. Loading does not validate ranges; call
/// [`Parameters::validate`] (the pipeline does so anyway).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EnhanceConfig {
    /// The enhancement mode to run.
    pub mode: EnhancementMode,
    /// Parameters for that mode.
    pub parameters: Parameters,
}

impl EnhanceConfig {
    /// A preset carrying the given mode's default parameters.
    #[must_use]
    pub fn for_mode(mode: EnhancementMode) -> Self {
        Self {
            mode,
            parameters: Parameters::defaults_for(mode),
        }
    }
}

/// Parses a preset from TOML text.
///
/// # Errors
///
/// Returns [`EnhanceError::InvalidInput`] for malformed TOML.
pub fn from_toml_str(text: &str) -> EnhanceResult<EnhanceConfig> {
    toml::from_str(text).map_err(|e| EnhanceError::InvalidInput(format!("invalid preset: {e}")))
}

/// Serializes a preset to TOML text.
///
/// # Errors
///
/// Returns [`EnhanceError::InvalidInput`] if serialization fails.
pub fn to_toml_string(config: &EnhanceConfig) -> EnhanceResult<String> {
    toml::to_string_pretty(config)
        .map_err(|e| EnhanceError::InvalidInput(format!("unserializable preset: {e}")))
}

/// Loads a preset file.
///
/// # Errors
///
/// Returns [`EnhanceError::InvalidInput`] if the file cannot be read or
/// parsed.
pub fn load_from_path(path: &Path) -> EnhanceResult<EnhanceConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| EnhanceError::InvalidInput(format!("{}: {e}", path.display())))?;
    from_toml_str(&content)
}

/// Writes a preset file, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`EnhanceError::InvalidInput`] if the file cannot be written.
pub fn save_to_path(config: &EnhanceConfig, path: &Path) -> EnhanceResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| EnhanceError::InvalidInput(format!("{}: {e}", parent.display())))?;
    }
    let content = to_toml_string(config)?;
    fs::write(path, content)
        .map_err(|e| EnhanceError::InvalidInput(format!("{}: {e}", path.display())))
}
