//! # Session Configuration
//!
//! [`SessionConfig`] collects the knobs a [`Session`](crate::session::Session)
//! reads: the prefix of generated source names, the CSV separator and an
//! upper bound on CSV input size. Build one with [`SessionConfig::builder`];
//! `build()` validates the combination.
//!
//! ```ignore
//! let config = SessionConfig::builder()
//!     .command_prefix("job")
//!     .csv_separator(b';')
//!     .build()?;
//! ```

pub mod constants;

pub use constants::*;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    command_prefix: String,
    csv_separator: u8,
    max_csv_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_prefix: DEFAULT_COMMAND_PREFIX.to_owned(),
            csv_separator: DEFAULT_CSV_SEPARATOR,
            max_csv_bytes: DEFAULT_MAX_CSV_BYTES,
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder { config: SessionConfig::default() }
    }

    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    pub fn csv_separator(&self) -> u8 {
        self.csv_separator
    }

    pub fn max_csv_bytes(&self) -> usize {
        self.max_csv_bytes
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.command_prefix = prefix.into();
        self
    }

    pub fn csv_separator(mut self, separator: u8) -> Self {
        self.config.csv_separator = separator;
        self
    }

    pub fn max_csv_bytes(mut self, limit: usize) -> Self {
        self.config.max_csv_bytes = limit;
        self
    }

    pub fn build(self) -> Result<SessionConfig> {
        let config = self.config;
        if config.command_prefix.is_empty() {
            return Err(Error::Domain("command prefix must not be empty".into()));
        }
        if matches!(config.csv_separator, b'\n' | b'\r' | CSV_QUOTE) {
            return Err(Error::Domain(format!(
                "invalid CSV separator {:?}",
                config.csv_separator as char
            )));
        }
        if config.max_csv_bytes == 0 {
            return Err(Error::Domain("max_csv_bytes must be positive".into()));
        }
        Ok(config)
    }
}
