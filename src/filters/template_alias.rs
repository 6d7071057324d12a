//! Folds a localized template namespace into the canonical one.

use std::sync::Mutex;

use itertools::Itertools;
use regex::{Captures, Regex, RegexBuilder};

use crate::dump::model::{Namespace, Page};
use crate::filters::PreTransformFilter;

/// Rewrite pattern for one set of canonical definition names.
#[derive(Debug)]
struct RewritePattern {
    names: Vec<String>,
    pattern: Regex,
}

/// Renames the `alias` template namespace to `canonical` and rewrites
/// invocations written with either prefix to the canonical one.
///
/// `{{Vorlage:Hint}}` and `{{template:hint|x}}` both become
/// `{{Template:Hint...` when `Hint` is a definition of the canonical
/// namespace. The rewrite pattern is compiled once and rebuilt only when the
/// definition names change.
#[derive(Debug)]
pub struct TemplateAliasFilter {
    alias: String,
    canonical: String,
    cache: Mutex<Option<RewritePattern>>,
}

impl Default for TemplateAliasFilter {
    fn default() -> Self {
        Self::new("Vorlage", "Template")
    }
}

impl TemplateAliasFilter {
    pub fn new<S: Into<String>>(alias: S, canonical: S) -> Self {
        Self {
            alias: alias.into(),
            canonical: canonical.into(),
            cache: Mutex::new(None),
        }
    }

    fn rename_namespaces(&self, namespaces: &mut [Namespace]) {
        for ns in namespaces.iter_mut() {
            if ns.name.eq_ignore_ascii_case(&self.alias) && ns.name != self.canonical {
                log::debug!("renaming template namespace {} to {}", ns.name, self.canonical);
                ns.rename(self.canonical.as_str());
            }
        }
    }

    fn compile(&self, names: &[String]) -> Option<Regex> {
        let source = format!(
            r"\{{\{{(?:{}|{}):({})(\s*(?:\||\}}\}}))",
            regex::escape(&self.alias),
            regex::escape(&self.canonical),
            names.iter().map(|n| regex::escape(n)).join("|")
        );
        match RegexBuilder::new(&source).case_insensitive(true).build() {
            Ok(pattern) => {
                log::debug!("compiled template alias pattern for {} name(s)", names.len());
                Some(pattern)
            }
            Err(e) => {
                log::warn!("skipping template alias rewrite: {}", e);
                None
            }
        }
    }

    fn rewrite(&self, text: &str, names: Vec<String>) -> String {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if cache.as_ref().is_none_or(|c| c.names != names) {
            *cache = self
                .compile(&names)
                .map(|pattern| RewritePattern { names, pattern });
        }
        let Some(rewrite) = cache.as_ref() else {
            return text.to_owned();
        };
        rewrite
            .pattern
            .replace_all(text, |caps: &Captures| {
                let found = caps[1].to_lowercase();
                let name = rewrite
                    .names
                    .iter()
                    .find(|n| n.to_lowercase() == found)
                    .map_or(&caps[1], String::as_str);
                format!("{{{{{}:{}{}", self.canonical, name, &caps[2])
            })
            .into_owned()
    }
}

impl PreTransformFilter for TemplateAliasFilter {
    fn id(&self) -> &'static str {
        "template-alias"
    }

    fn filter_page(&self, page: &mut Page, namespaces: &mut [Namespace]) {
        self.rename_namespaces(namespaces);

        let names: Vec<String> = namespaces
            .iter()
            .filter(|ns| ns.name == self.canonical)
            .flat_map(|ns| ns.definitions.iter().map(|def| ns.bare_name(&def.title).to_owned()))
            .collect();
        if names.is_empty() {
            return;
        }
        let text = self.rewrite(page.text(), names);
        page.set_text(text);
    }
}
