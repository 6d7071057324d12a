//! Reference collection during markup conversion.
//!
//! A converter reports every link and image it encounters to a
//! `ReferenceListener`. `ReferenceCollector` is the listener the pipeline
//! uses: it keeps the link targets that name files or categories.

use lazy_regex::regex_is_match;

use crate::convert::links::Link;

/// Callbacks a markup converter drives while it walks a page.
///
/// All methods default to doing nothing so converters only need to report
/// what they understand.
pub trait ReferenceListener {
    /// A plain reference such as `Category:Animals`.
    fn on_reference(&mut self, _reference: &str) {}

    /// A reference with a target and a label.
    fn on_resolved_reference(&mut self, link: &Link) {
        self.on_reference(&link.target);
    }

    /// A plain image reference, already without any prefix.
    fn on_image(&mut self, _image: &str) {}

    /// An image with a target and a label.
    fn on_resolved_image(&mut self, link: &Link) {
        self.on_image(&link.target);
    }
}

/// Target class of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    File,
    Category,
}

/// Classify a reference by its prefix. Prefixes are matched case-insensitively.
pub fn classify(reference: &str) -> Option<ReferenceKind> {
    if regex_is_match!(r"(?i)^(?:image|file|media|datei):", reference) {
        Some(ReferenceKind::File)
    } else if regex_is_match!(r"(?i)^category:", reference) {
        Some(ReferenceKind::Category)
    } else {
        None
    }
}

/// Collects file and category references of one page.
///
/// Lists keep every occurrence, duplicates included.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReferenceCollector {
    files: Vec<String>,
    categories: Vec<String>,
}

impl ReferenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Hand over the collected `(files, categories)`.
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.files, self.categories)
    }
}

impl ReferenceListener for ReferenceCollector {
    fn on_reference(&mut self, reference: &str) {
        let Some(kind) = classify(reference) else {
            return;
        };
        let Some((_, value)) = reference.split_once(':') else {
            return;
        };
        if value.trim().is_empty() {
            return;
        }
        match kind {
            ReferenceKind::File => self.files.push(value.to_owned()),
            ReferenceKind::Category => self.categories.push(value.to_owned()),
        }
    }

    fn on_image(&mut self, image: &str) {
        if !image.trim().is_empty() {
            self.files.push(image.to_owned());
        }
    }
}
