//! Compile-time plugin registry.
//!
//! The configuration names filters and resolvers by stable ids. Each id maps
//! to a factory building the plugin from the configuration; built instances
//! are cached per id, so an id listed twice shares one instance. Unknown ids
//! are logged and skipped.

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;

use crate::config::Config;
use crate::filters::{
    CategoryAliasFilter, ImageAliasFilter, PostTransformFilter, PreTransformFilter,
    RemoveImageLeftAlign, ResetFlowFilter, TemplateAliasFilter,
};
use crate::namespace::{ArchiveResolver, NamespaceResolver, NamespaceResolverChain};

pub const TEMPLATE_ALIAS: &str = "template-alias";
pub const IMAGE_ALIAS: &str = "image-alias";
pub const CATEGORY_ALIAS: &str = "category-alias";
pub const RESET_FLOW: &str = "reset-flow";
pub const REMOVE_IMAGE_LEFT_ALIGN: &str = "remove-image-left-align";
pub const ARCHIVE: &str = "archive";

type PreFactory = fn(&Config) -> Arc<dyn PreTransformFilter>;
type PostFactory = fn(&Config) -> Arc<dyn PostTransformFilter>;
type ResolverFactory = fn(&Config) -> Arc<dyn NamespaceResolver>;

const PRE_FILTERS: &[(&str, PreFactory)] = &[
    (TEMPLATE_ALIAS, template_alias),
    (IMAGE_ALIAS, image_alias),
    (CATEGORY_ALIAS, category_alias),
    (RESET_FLOW, reset_flow),
];

const POST_FILTERS: &[(&str, PostFactory)] = &[(REMOVE_IMAGE_LEFT_ALIGN, remove_image_left_align)];

const RESOLVERS: &[(&str, ResolverFactory)] = &[(ARCHIVE, archive)];

fn template_alias(config: &Config) -> Arc<dyn PreTransformFilter> {
    Arc::new(TemplateAliasFilter::new(
        config.aliases.template.as_str(),
        "Template",
    ))
}

fn image_alias(config: &Config) -> Arc<dyn PreTransformFilter> {
    Arc::new(ImageAliasFilter::new(&config.aliases.image))
}

fn category_alias(config: &Config) -> Arc<dyn PreTransformFilter> {
    Arc::new(CategoryAliasFilter::new(&config.aliases.category))
}

fn reset_flow(config: &Config) -> Arc<dyn PreTransformFilter> {
    Arc::new(ResetFlowFilter::with_token(config.filters.reset_token.as_str()))
}

fn remove_image_left_align(_config: &Config) -> Arc<dyn PostTransformFilter> {
    Arc::new(RemoveImageLeftAlign)
}

fn archive(config: &Config) -> Arc<dyn NamespaceResolver> {
    Arc::new(ArchiveResolver::new(
        config.archive.cutoff,
        config.archive.namespace.as_str(),
    ))
}

fn lookup<F: Copy>(table: &[(&str, F)], id: &str) -> Option<F> {
    table.iter().find(|(known, _)| *known == id).map(|(_, f)| *f)
}

/// Ids are compared after trimming and lowercasing.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Builds the plugin chains of a run and caches the instances it creates.
pub struct PluginRegistry<'a> {
    config: &'a Config,
    pre: HashMap<String, Arc<dyn PreTransformFilter>>,
    post: HashMap<String, Arc<dyn PostTransformFilter>>,
    resolvers: HashMap<String, Arc<dyn NamespaceResolver>>,
}

impl<'a> PluginRegistry<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            pre: HashMap::new(),
            post: HashMap::new(),
            resolvers: HashMap::new(),
        }
    }

    /// Instances built so far.
    pub fn cached(&self) -> usize {
        self.pre.len() + self.post.len() + self.resolvers.len()
    }

    pub fn pre_filters(&mut self, ids: &[String]) -> Vec<Arc<dyn PreTransformFilter>> {
        let config = self.config;
        ids.iter()
            .filter_map(|id| instance(&mut self.pre, id, "pre-transform filter", |id| {
                lookup(PRE_FILTERS, id).map(|f| f(config))
            }))
            .collect()
    }

    pub fn post_filters(&mut self, ids: &[String]) -> Vec<Arc<dyn PostTransformFilter>> {
        let config = self.config;
        ids.iter()
            .filter_map(|id| instance(&mut self.post, id, "post-transform filter", |id| {
                lookup(POST_FILTERS, id).map(|f| f(config))
            }))
            .collect()
    }

    pub fn resolvers(&mut self, ids: &[String]) -> Vec<Arc<dyn NamespaceResolver>> {
        let config = self.config;
        ids.iter()
            .filter_map(|id| instance(&mut self.resolvers, id, "namespace resolver", |id| {
                lookup(RESOLVERS, id).map(|f| f(config))
            }))
            .collect()
    }

    /// Resolver chain from the configured ids and default namespace.
    pub fn resolver_chain(&mut self) -> NamespaceResolverChain {
        let config = self.config;
        let resolvers = self.resolvers(&config.resolvers.namespace);
        NamespaceResolverChain::new(resolvers, config.default_namespace.as_str())
    }
}

fn instance<T: ?Sized, F>(
    cache: &mut HashMap<String, Arc<T>>,
    raw_id: &str,
    kind: &str,
    build: F,
) -> Option<Arc<T>>
where
    F: FnOnce(&str) -> Option<Arc<T>>,
{
    let id = normalize_id(raw_id);
    if id.is_empty() {
        return None;
    }
    if let Some(found) = cache.get(&id) {
        return Some(Arc::clone(found));
    }
    match build(&id) {
        Some(plugin) => {
            log::debug!("loaded {} {}", kind, id);
            cache.insert(id, Arc::clone(&plugin));
            Some(plugin)
        }
        None => {
            log::warn!("unknown {} {:?}, skipping", kind, raw_id);
            None
        }
    }
}

/// Ids this build knows about, for help output.
pub fn known_ids() -> String {
    PRE_FILTERS
        .iter()
        .map(|(id, _)| *id)
        .chain(POST_FILTERS.iter().map(|(id, _)| *id))
        .chain(RESOLVERS.iter().map(|(id, _)| *id))
        .join(", ")
}
