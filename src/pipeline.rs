//! One migration run, from export file to page directories.
//!
//! Stages run strictly in order over the whole page list: pre-transform
//! filters, template expansion, then per page namespace assignment,
//! conversion, post-transform filters and writing. The first error stops the
//! run; pages already written stay on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::convert::MarkupConverter;
use crate::convert::references::ReferenceCollector;
use crate::dump::loader::{Export, load_export_file};
use crate::dump::model::Page;
use crate::dump::templates::TemplateResolver;
use crate::errors::{MigrateError, Result};
use crate::filters::{apply_post, apply_pre, apply_pre_to_definitions};
use crate::output::PageWriter;
use crate::plugins::PluginRegistry;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_written: usize,
    pub template_namespaces: usize,
    pub definitions: usize,
    /// Pages written per output namespace.
    pub per_namespace: BTreeMap<String, usize>,
    /// Root download script, when one was written.
    pub download_summary: Option<PathBuf>,
}

/// Log how many of `total` items a stage touched.
///
/// # Arguments
/// - stage -> Name of the stage, used as log prefix.
/// - total -> Items the stage looked at.
/// - changed -> Items the stage actually changed.
fn log_stage(stage: &str, total: usize, changed: usize) {
    log::info!(
        "[{}] Total: {}. Changed: {}. Rate: {:.2}%",
        stage,
        total,
        changed,
        if total == 0 {
            0.0
        } else {
            (changed as f64 / total as f64) * 100.0
        }
    );
}

pub struct Pipeline<'a> {
    config: &'a Config,
    converter: Box<dyn MarkupConverter + 'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, converter: Box<dyn MarkupConverter + 'a>) -> Self {
        Self { config, converter }
    }

    /// Load the configured export and run every stage over it.
    pub fn run(&self) -> Result<RunSummary> {
        log::info!("parsing export {} ...", self.config.source_dump.display());
        let export = load_export_file(&self.config.source_dump)?;
        self.run_export(export)
    }

    /// Run every stage over an already loaded export.
    pub fn run_export(&self, export: Export) -> Result<RunSummary> {
        let config = self.config;
        let mut registry = PluginRegistry::new(config);
        let pre = registry.pre_filters(&config.filters.pre);
        let post = registry.post_filters(&config.filters.post);
        let chain = registry.resolver_chain();
        log::info!(
            "{} pre-transform filter(s), {} post-transform filter(s), {} namespace resolver(s) ({} instance(s))",
            pre.len(),
            post.len(),
            chain.len(),
            registry.cached()
        );
        if chain.is_empty() {
            log::info!("no namespace resolvers, every page goes to {}", chain.default_namespace());
        }

        let mut summary = RunSummary {
            template_namespaces: export.namespaces.len(),
            definitions: export.definition_count(),
            ..RunSummary::default()
        };
        let Export {
            mut namespaces,
            mut pages,
        } = export;
        log::info!(
            "{} page(s), {} template namespace(s), {} definition(s)",
            pages.len(),
            summary.template_namespaces,
            summary.definitions
        );

        if config.filter_templates && !pre.is_empty() {
            let filtered = apply_pre_to_definitions(&pre, &mut namespaces);
            log_stage("filter_templates", summary.definitions, filtered);
        }

        log::info!("pre filtering ...");
        let mut changed = 0usize;
        for page in pages.iter_mut() {
            let before = page.text().to_owned();
            apply_pre(&pre, page, &mut namespaces);
            if page.text() != before {
                changed += 1;
            }
        }
        log_stage("pre_filter", pages.len(), changed);

        log::info!("resolving templates ...");
        let resolver = TemplateResolver::new(&namespaces, config.max_expansions)?;
        log::debug!("compiled {} template pattern(s)", resolver.templates().len());
        let changed = resolver.resolve_pages(&mut pages)?;
        log_stage("resolve_templates", pages.len(), changed);

        log::info!("saving pages to {} ...", config.target_path.display());
        fs::create_dir_all(&config.target_path)
            .map_err(|e| MigrateError::io(&config.target_path, e))?;
        let download = config.download.as_ref().map(|d| d.base_url.clone());
        let mut writer = PageWriter::new(&config.target_path, download);

        for mut page in pages {
            let namespace = chain.resolve(&page);
            self.convert(&mut page)?;
            apply_post(&post, &mut page);
            writer.write(&page, &namespace)?;
            *summary.per_namespace.entry(namespace).or_default() += 1;
            summary.pages_written += 1;
        }
        log_stage("write_pages", summary.pages_written, summary.pages_written);
        for (namespace, count) in &summary.per_namespace {
            log::info!("  {}: {} page(s)", namespace, count);
        }

        summary.download_summary = writer.finish()?;
        log::info!("Done.");
        Ok(summary)
    }

    /// Convert the working text and merge the collected references.
    fn convert(&self, page: &mut Page) -> Result<()> {
        let mut collector = ReferenceCollector::new();
        let converted = self
            .converter
            .convert(page.text(), &mut collector)
            .map_err(|e| match e {
                MigrateError::Conversion { .. } => e,
                other => MigrateError::conversion(page.title(), other.to_string()),
            })?;
        log::debug!(
            "{} converted {:?}: {} file(s), {} categor(y/ies)",
            self.converter.name(),
            page.title(),
            collector.files().len(),
            collector.categories().len()
        );
        let (files, categories) = collector.into_parts();
        for file in files {
            page.add_file(file);
        }
        for category in categories {
            page.add_category(category);
        }
        page.set_text(converted);
        Ok(())
    }
}
