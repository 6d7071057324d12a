//! Error types shared by the whole migration pipeline.
//!
//! Every fallible step (reading the export, expanding templates, converting
//! markup, writing page directories, loading configuration) reports through
//! `MigrateError`. All of them are fatal for a run; the only recoverable
//! situations (bad timestamps, unknown plugin ids) never produce an error.
//!
//! Exported items:
//! - `MigrateError` - main error enum.
//! - `Result<T>` - convenient alias `std::result::Result<T, MigrateError>`.

use std::path::PathBuf;

use thiserror::Error;

/// The canonical result type used across the crate.
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Migration error with rich variants.
///
/// - `Parse` - the export document is not well-formed or misses a required
///   element. Carries the byte offset when the XML reader knows it.
/// - `ExpansionDidNotConverge` - a template kept matching after the
///   configured number of expansions on one page.
/// - `Config` - the configuration file could not be parsed or is invalid.
/// - `Conversion` - the markup converter rejected a page.
/// - `Io` - reading or writing a file failed.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("{}", format_parse(.msg, .offset))]
    Parse {
        msg: String,
        /// Byte offset in the export where the problem was detected, if known.
        offset: Option<u64>,
    },

    #[error(
        "template expansion did not converge: '{template}' still matches on page '{page}' after {iterations} expansions"
    )]
    ExpansionDidNotConverge {
        page: String,
        template: String,
        iterations: usize,
    },

    #[error("Config error: {msg}")]
    Config {
        msg: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    #[error("Conversion of '{page}' failed: {msg}")]
    Conversion { page: String, msg: String },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn format_parse(msg: &str, offset: &Option<u64>) -> String {
    match offset {
        Some(off) => format!("Parse error at {}: {}", off, msg),
        None => format!("Parse error: {}", msg),
    }
}

impl MigrateError {
    /// Construct a parse error with a message.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        MigrateError::Parse {
            msg: msg.into(),
            offset: None,
        }
    }

    /// Construct a parse error with a message and offset.
    pub fn parse_at<S: Into<String>>(msg: S, offset: u64) -> Self {
        MigrateError::Parse {
            msg: msg.into(),
            offset: Some(offset),
        }
    }

    /// Construct a non-convergence error for `template` on `page`.
    pub fn did_not_converge(page: &str, template: &str, iterations: usize) -> Self {
        MigrateError::ExpansionDidNotConverge {
            page: page.to_owned(),
            template: template.to_owned(),
            iterations,
        }
    }

    /// Construct a configuration error without an underlying cause.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MigrateError::Config {
            msg: msg.into(),
            source: None,
        }
    }

    /// Construct a conversion error for `page`.
    pub fn conversion<S: Into<String>>(page: &str, msg: S) -> Self {
        MigrateError::Conversion {
            page: page.to_owned(),
            msg: msg.into(),
        }
    }

    /// Wrap an I/O error together with the path it happened on.
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns a short, user-friendly description of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            MigrateError::Parse { .. } => "Parse",
            MigrateError::ExpansionDidNotConverge { .. } => "ExpansionDidNotConverge",
            MigrateError::Config { .. } => "Config",
            MigrateError::Conversion { .. } => "Conversion",
            MigrateError::Io { .. } => "Io",
        }
    }
}

impl From<toml::de::Error> for MigrateError {
    fn from(e: toml::de::Error) -> Self {
        MigrateError::Config {
            msg: e.message().to_owned(),
            source: Some(e),
        }
    }
}
