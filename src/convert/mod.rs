//! Markup conversion seam.
//!
//! The pipeline converts every page through a `MarkupConverter`. A real
//! wiki-to-target converter can be plugged in behind the trait; the crate
//! ships `ReferenceScanConverter`, which leaves the markup as it is and only
//! reports the links it finds.

pub mod links;
pub mod references;

use crate::convert::links::{LinkType, scan_links};
use crate::convert::references::ReferenceListener;
use crate::errors::Result;

/// Converts raw wiki markup to the target syntax.
pub trait MarkupConverter {
    /// Convert `source`, reporting every reference on the way to `listener`.
    fn convert(&self, source: &str, listener: &mut dyn ReferenceListener) -> Result<String>;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;
}

/// Identity converter that reports internal links as resolved references and
/// external links as plain references.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceScanConverter;

impl MarkupConverter for ReferenceScanConverter {
    fn convert(&self, source: &str, listener: &mut dyn ReferenceListener) -> Result<String> {
        for link in scan_links(source) {
            log::trace!("{} link {}", link.link_type, link.to_wikitext());
            match link.link_type {
                LinkType::Internal => listener.on_resolved_reference(&link),
                LinkType::External => listener.on_reference(&link.target),
            }
        }
        Ok(source.to_owned())
    }

    fn name(&self) -> &'static str {
        "reference-scan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::references::ReferenceCollector;

    #[test]
    fn scan_converter_keeps_text_and_reports_links() {
        let text = "A [[Image:cat.png|thumb]] in [[Category:Animals]], see [http://x.org site].";
        let mut collector = ReferenceCollector::new();
        let out = ReferenceScanConverter
            .convert(text, &mut collector)
            .unwrap();
        assert_eq!(out, text);
        assert_eq!(collector.files(), ["cat.png"]);
        assert_eq!(collector.categories(), ["Animals"]);
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl ReferenceListener for Recorder {
        fn on_reference(&mut self, reference: &str) {
            self.0.push(reference.to_owned());
        }
    }

    #[test]
    fn external_links_are_plain_references() {
        let mut rec = Recorder::default();
        ReferenceScanConverter
            .convert("[https://a.b label] [[Page|x]]", &mut rec)
            .unwrap();
        assert_eq!(rec.0, vec!["https://a.b", "Page"]);
    }
}
