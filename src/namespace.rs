//! Output namespace assignment.
//!
//! A page is routed to the first namespace a resolver of the chain names, or
//! to the configured default when none does.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::dump::model::Page;

/// Chooses an output namespace for a page, or defers with `None`.
pub trait NamespaceResolver {
    fn id(&self) -> &'static str;

    fn determine_namespace(&self, page: &Page) -> Option<String>;
}

/// Ordered resolvers plus the fallback namespace.
#[derive(Clone)]
pub struct NamespaceResolverChain {
    resolvers: Vec<Arc<dyn NamespaceResolver>>,
    default: String,
}

impl NamespaceResolverChain {
    pub fn new<S: Into<String>>(resolvers: Vec<Arc<dyn NamespaceResolver>>, default: S) -> Self {
        Self {
            resolvers,
            default: default.into(),
        }
    }

    pub fn default_namespace(&self) -> &str {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// First non-empty answer of the chain, else the default namespace.
    pub fn resolve(&self, page: &Page) -> String {
        self.resolvers
            .iter()
            .find_map(|r| {
                r.determine_namespace(page)
                    .filter(|ns| !ns.is_empty())
                    .inspect(|ns| log::debug!("{} put {:?} into {}", r.id(), page.title(), ns))
            })
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Sends pages last revised before a cutoff to an archive namespace.
#[derive(Debug, Clone)]
pub struct ArchiveResolver {
    cutoff: DateTime<Utc>,
    namespace: String,
}

/// Default archive cutoff: 2008-01-31T00:00:00Z.
pub fn default_archive_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2008, 1, 31).unwrap_or_default()
}

impl Default for ArchiveResolver {
    fn default() -> Self {
        Self::new(default_archive_cutoff(), "Archiv")
    }
}

impl ArchiveResolver {
    /// `cutoff` is taken at midnight UTC.
    pub fn new<S: Into<String>>(cutoff: NaiveDate, namespace: S) -> Self {
        Self {
            cutoff: Utc.from_utc_datetime(&cutoff.and_hms_opt(0, 0, 0).unwrap_or_default()),
            namespace: namespace.into(),
        }
    }
}

impl NamespaceResolver for ArchiveResolver {
    fn id(&self) -> &'static str {
        "archive"
    }

    fn determine_namespace(&self, page: &Page) -> Option<String> {
        let revision = page.revision()?;
        (revision < self.cutoff).then(|| self.namespace.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::model::parse_revision;

    struct Fixed(Option<&'static str>);

    impl NamespaceResolver for Fixed {
        fn id(&self) -> &'static str {
            "fixed"
        }

        fn determine_namespace(&self, _page: &Page) -> Option<String> {
            self.0.map(str::to_owned)
        }
    }

    fn page_at(ts: &str) -> Page {
        Page::new("P", "", "", parse_revision(ts))
    }

    #[test]
    fn first_answer_wins() {
        let chain = NamespaceResolverChain::new(
            vec![
                Arc::new(Fixed(None)),
                Arc::new(Fixed(Some("Archiv"))),
                Arc::new(Fixed(Some("Other"))),
            ],
            "Main",
        );
        assert_eq!(chain.resolve(&page_at("2009-01-01T00:00:00Z")), "Archiv");
    }

    #[test]
    fn empty_answers_defer_to_default() {
        let chain = NamespaceResolverChain::new(vec![Arc::new(Fixed(Some("")))], "Sandbox");
        assert_eq!(chain.resolve(&page_at("2009-01-01T00:00:00Z")), "Sandbox");
        let empty = NamespaceResolverChain::new(Vec::new(), "Sandbox");
        assert_eq!(empty.resolve(&page_at("2009-01-01T00:00:00Z")), "Sandbox");
        assert_eq!(empty.len(), 0);
    }

    #[test]
    fn archive_cutoff() {
        let archive = ArchiveResolver::default();
        assert_eq!(
            archive.determine_namespace(&page_at("2007-01-01T00:00:00Z")),
            Some("Archiv".to_string())
        );
        assert_eq!(
            archive.determine_namespace(&page_at("2008-01-30T23:59:59Z")),
            Some("Archiv".to_string())
        );
        assert_eq!(archive.determine_namespace(&page_at("2008-01-31T00:00:00Z")), None);
        assert_eq!(archive.determine_namespace(&page_at("2008-06-01T00:00:00Z")), None);
    }

    #[test]
    fn archive_defers_without_revision() {
        let archive = ArchiveResolver::default();
        assert_eq!(archive.determine_namespace(&page_at("not a date")), None);
    }

    #[test]
    fn archive_in_chain_falls_through() {
        let chain = NamespaceResolverChain::new(vec![Arc::new(ArchiveResolver::default())], "Main");
        assert_eq!(chain.resolve(&page_at("2007-01-01T00:00:00Z")), "Archiv");
        assert_eq!(chain.resolve(&page_at("2008-06-01T00:00:00Z")), "Main");
    }
}
