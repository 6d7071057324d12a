//! Run configuration, read from `wiki_migrate.toml`.
//!
//! Every field has a default so an empty (or missing) file yields a usable
//! configuration:
//!
//! ```toml
//! log_level = "info"
//! source_dump = "dump.xml"
//! target_path = "wiki-pages"
//! default_namespace = "Sandbox"
//! max_expansions = 1000
//! filter_templates = false
//!
//! [filters]
//! pre = ["template-alias", "image-alias", "reset-flow"]
//! post = ["remove-image-left-align"]
//! reset_token = "{{-}}"
//!
//! [resolvers]
//! namespace = ["archive"]
//!
//! [archive]
//! cutoff = "2008-01-31"
//! namespace = "Archiv"
//!
//! [aliases]
//! template = "Vorlage"
//! image = "Bild"
//! category = "Kategorie"
//!
//! [download]
//! base_url = "http://wiki.example.org/images/"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::dump::templates::DEFAULT_MAX_EXPANSIONS;
use crate::errors::{MigrateError, Result};
use crate::filters::reset_flow::RESET_FLOW_TOKEN;
use crate::namespace::default_archive_cutoff;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "wiki_migrate.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fallback for `RUST_LOG`.
    pub log_level: String,
    pub source_dump: PathBuf,
    pub target_path: PathBuf,
    /// Namespace for pages no resolver claims.
    pub default_namespace: String,
    /// Expansions of one template on one page before giving up.
    pub max_expansions: usize,
    /// Also run the pre-transform filters over template bodies.
    pub filter_templates: bool,
    pub filters: FilterConfig,
    pub resolvers: ResolverConfig,
    pub archive: ArchiveConfig,
    pub aliases: AliasConfig,
    pub download: Option<DownloadConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            source_dump: PathBuf::from("dump.xml"),
            target_path: PathBuf::from("wiki-pages"),
            default_namespace: "Sandbox".to_string(),
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            filter_templates: false,
            filters: FilterConfig::default(),
            resolvers: ResolverConfig::default(),
            archive: ArchiveConfig::default(),
            aliases: AliasConfig::default(),
            download: None,
        }
    }
}

/// Ordered plugin ids of the two filter chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub pre: Vec<String>,
    pub post: Vec<String>,
    /// Token removed by `reset-flow`.
    pub reset_token: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            pre: Vec::new(),
            post: Vec::new(),
            reset_token: RESET_FLOW_TOKEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub namespace: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Pages revised before midnight UTC of this day are archived.
    pub cutoff: NaiveDate,
    pub namespace: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            cutoff: default_archive_cutoff(),
            namespace: "Archiv".to_string(),
        }
    }
}

/// Localized keywords the alias filters rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    pub template: String,
    pub image: String,
    pub category: String,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            template: "Vorlage".to_string(),
            image: "Bild".to_string(),
            category: "Kategorie".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Files are fetched from `base_url` joined with the file name.
    pub base_url: Url,
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| MigrateError::io(path, e))?;
        Self::from_toml(&text)
    }

    /// Load from `path` when given, else from `wiki_migrate.toml` in the
    /// working directory when it exists, else use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_path(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_path(local);
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.default_namespace.trim().is_empty() {
            return Err(MigrateError::config("default_namespace must not be empty"));
        }
        if self.archive.namespace.trim().is_empty() {
            return Err(MigrateError::config("archive.namespace must not be empty"));
        }
        if self.max_expansions == 0 {
            return Err(MigrateError::config("max_expansions must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_namespace, "Sandbox");
        assert_eq!(config.max_expansions, 1000);
        assert_eq!(config.archive.cutoff, NaiveDate::from_ymd_opt(2008, 1, 31).unwrap());
        assert!(config.download.is_none());
    }

    #[test]
    fn full_file() {
        let config = Config::from_toml(
            r#"
            log_level = "debug"
            source_dump = "in/export.xml"
            target_path = "out"
            default_namespace = "Main"
            max_expansions = 50
            filter_templates = true

            [filters]
            pre = ["template-alias", "reset-flow"]
            post = ["remove-image-left-align"]

            [resolvers]
            namespace = ["archive"]

            [archive]
            cutoff = "2010-05-01"
            namespace = "Old"

            [aliases]
            template = "Modèle"

            [download]
            base_url = "http://wiki.example.org/images/"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.source_dump, PathBuf::from("in/export.xml"));
        assert_eq!(config.max_expansions, 50);
        assert!(config.filter_templates);
        assert_eq!(config.filters.pre, vec!["template-alias", "reset-flow"]);
        assert_eq!(config.filters.reset_token, "{{-}}");
        assert_eq!(config.resolvers.namespace, vec!["archive"]);
        assert_eq!(config.archive.namespace, "Old");
        assert_eq!(config.aliases.template, "Modèle");
        assert_eq!(config.aliases.image, "Bild");
        assert_eq!(
            config.download.unwrap().base_url.as_str(),
            "http://wiki.example.org/images/"
        );
    }

    #[test]
    fn invalid_files_are_config_errors() {
        let err = Config::from_toml("max_expansions = \"many\"").unwrap_err();
        assert_eq!(err.kind(), "Config");
        let err = Config::from_toml("max_expansions = 0").unwrap_err();
        assert_eq!(err.kind(), "Config");
        let err = Config::from_toml("[download]\nbase_url = \"not a url\"").unwrap_err();
        assert_eq!(err.kind(), "Config");
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert_eq!(err.kind(), "Io");

        let path = dir.path().join("cfg.toml");
        let mut fh = fs::File::create(&path).unwrap();
        writeln!(fh, "default_namespace = \"Main\"").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.default_namespace, "Main");
    }
}
