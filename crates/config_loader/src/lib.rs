//! # Config Loader
//!
//! Turns a TOML or JSON document into a validated `LoggingBlueprint`.
//!
//! The format is picked from the file extension; parsing is done by serde and
//! validation runs immediately afterwards, so a blueprint returned from here
//! can be handed to the logger as is.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("logging.toml")).unwrap();
//! println!("Sinks: {}", blueprint.sinks.len());
//! ```

mod parser;
mod validator;

pub use contracts::LoggingBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Stateless entry points for loading logging configuration
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a `.toml` / `.json` file
    pub fn load_from_path(path: &Path) -> Result<LoggingBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("cannot read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate an in-memory document
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<LoggingBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Run validation on a blueprint built in code
    pub fn validate(blueprint: &LoggingBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Render a blueprint in the given format
    pub fn render(blueprint: &LoggingBlueprint, format: ConfigFormat) -> Result<String, ContractError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(blueprint)
                .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}"))),
            ConfigFormat::Json => serde_json::to_string_pretty(blueprint)
                .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}"))),
        }
    }
}
