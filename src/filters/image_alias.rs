use lazy_regex::regex_replace_all;
use regex::{Captures, Regex, RegexBuilder};

use crate::dump::model::{Namespace, Page};
use crate::filters::PreTransformFilter;

/// Rewrites localized image links (`[[Bild:x.png]]`) to `[[Image:x.png]]` and
/// normalizes lowercase `[[image:` links.
#[derive(Debug, Clone)]
pub struct ImageAliasFilter {
    pattern: Option<Regex>,
}

impl Default for ImageAliasFilter {
    fn default() -> Self {
        Self::new("Bild")
    }
}

impl ImageAliasFilter {
    pub fn new(alias: &str) -> Self {
        let source = format!(r"\[\[\s*{}\s*:\s*([^\]]*?)\]\]", regex::escape(alias.trim()));
        let pattern = match RegexBuilder::new(&source).case_insensitive(true).build() {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("image alias {:?} disabled: {}", alias, e);
                None
            }
        };
        Self { pattern }
    }
}

impl PreTransformFilter for ImageAliasFilter {
    fn id(&self) -> &'static str {
        "image-alias"
    }

    fn filter_page(&self, page: &mut Page, _namespaces: &mut [Namespace]) {
        let mut text = page.text().to_owned();
        if let Some(pattern) = &self.pattern {
            text = pattern
                .replace_all(&text, |caps: &Captures| format!("[[Image:{}]]", &caps[1]))
                .into_owned();
        }
        let text = regex_replace_all!(r"\[\[\s*image\s*:\s*([^\]]*?)\]\]", &text, |_, target| {
            format!("[[Image:{}]]", target)
        });
        page.set_text(text.into_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(text: &str) -> String {
        let mut page = Page::new("P", text, "", None);
        ImageAliasFilter::default().filter_page(&mut page, &mut []);
        page.text().to_owned()
    }

    #[test]
    fn alias_becomes_image() {
        assert_eq!(filter("[[Bild:cat.png|a cat]]"), "[[Image:cat.png|a cat]]");
        assert_eq!(filter("[[ bild : cat.png]]"), "[[Image:cat.png]]");
        assert_eq!(filter("[[BILD:x.png]] and [[Bild:y.png]]"), "[[Image:x.png]] and [[Image:y.png]]");
    }

    #[test]
    fn lowercase_image_is_normalized() {
        assert_eq!(filter("[[image:cat.png]]"), "[[Image:cat.png]]");
        assert_eq!(filter("[[Image:cat.png]]"), "[[Image:cat.png]]");
    }

    #[test]
    fn other_links_untouched() {
        assert_eq!(filter("[[Bildung]] [[Page|Bild:x]]"), "[[Bildung]] [[Page|Bild:x]]");
    }
}
