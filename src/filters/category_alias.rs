use regex::{Regex, RegexBuilder};

use crate::dump::model::{Namespace, Page};
use crate::filters::PreTransformFilter;

/// Rewrites localized category links (`[[Kategorie:Tiere]]`) to
/// `[[Category:Tiere]]`.
#[derive(Debug, Clone)]
pub struct CategoryAliasFilter {
    pattern: Option<Regex>,
}

impl Default for CategoryAliasFilter {
    fn default() -> Self {
        Self::new("Kategorie")
    }
}

impl CategoryAliasFilter {
    pub fn new(alias: &str) -> Self {
        let source = format!(r"\[\[\s*{}\s*:", regex::escape(alias.trim()));
        let pattern = match RegexBuilder::new(&source).case_insensitive(true).build() {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("category alias {:?} disabled: {}", alias, e);
                None
            }
        };
        Self { pattern }
    }
}

impl PreTransformFilter for CategoryAliasFilter {
    fn id(&self) -> &'static str {
        "category-alias"
    }

    fn filter_page(&self, page: &mut Page, _namespaces: &mut [Namespace]) {
        let Some(pattern) = &self.pattern else {
            return;
        };
        let text = pattern.replace_all(page.text(), "[[Category:").into_owned();
        page.set_text(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_becomes_category() {
        let mut page = Page::new("P", "[[Kategorie:Tiere]] [[ kategorie :Vögel]] [[Kategorien]]", "", None);
        CategoryAliasFilter::default().filter_page(&mut page, &mut []);
        assert_eq!(page.text(), "[[Category:Tiere]] [[Category:Vögel]] [[Kategorien]]");
    }
}
