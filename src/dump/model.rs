//! In-memory model of an export: pages, template namespaces and template
//! definitions.
//!
//! `PageRecord` is the raw record the XML reader produces. The loader turns
//! each record either into a `TemplateDefinition` (when its title sits in a
//! template namespace) or into a `Page`.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use derive_builder::Builder;
use lazy_regex::regex_captures;

/// One `<page>` element of the export, before classification.
#[derive(Debug, Clone, Default, Builder, PartialEq, Eq)]
#[builder(setter(into), default)]
pub struct PageRecord {
    pub title: String,
    pub text: String,
    pub username: String,
    /// Raw `<timestamp>` content, e.g. `2009-09-09T10:45:25Z`.
    pub timestamp: String,
}

/// Parse a revision timestamp of the exact form `YYYY-MM-DDThh:mm:ssZ`.
///
/// Anything else (including impossible dates such as month 13) yields `None`.
pub fn parse_revision(raw: &str) -> Option<DateTime<Utc>> {
    let (_, year, month, day, hour, min, sec) = regex_captures!(
        r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})Z$",
        raw
    )?;
    Utc.with_ymd_and_hms(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
        hour.parse().ok()?,
        min.parse().ok()?,
        sec.parse().ok()?,
    )
    .single()
}

/// A content page of the export.
///
/// The working text starts equal to the original and is rewritten by filters,
/// the template resolver and the markup converter. The original is a snapshot
/// taken at load time and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    title: String,
    revision: Option<DateTime<Utc>>,
    author: String,
    text: String,
    original: String,
    categories: BTreeSet<String>,
    files: BTreeSet<String>,
}

impl Page {
    pub fn new<S: Into<String>>(
        title: S,
        text: S,
        author: S,
        revision: Option<DateTime<Utc>>,
    ) -> Self {
        let text = text.into();
        Self {
            title: title.into(),
            revision,
            author: author.into(),
            original: text.clone(),
            text,
            categories: BTreeSet::new(),
            files: BTreeSet::new(),
        }
    }

    /// Build a page from an export record. An unparsable timestamp leaves the
    /// revision unset.
    pub fn from_record(record: PageRecord) -> Self {
        let revision = parse_revision(record.timestamp.trim());
        if revision.is_none() && !record.timestamp.is_empty() {
            log::debug!(
                "page {:?} has an unparsable timestamp {:?}",
                record.title,
                record.timestamp
            );
        }
        Self::new(record.title, record.text, record.username, revision)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn revision(&self) -> Option<DateTime<Utc>> {
        self.revision
    }

    /// Revision as milliseconds since the Unix epoch.
    pub fn revision_millis(&self) -> Option<i64> {
        self.revision.map(|r| r.timestamp_millis())
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Current working text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text<S: Into<String>>(&mut self, text: S) {
        self.text = text.into();
    }

    /// Text as it was in the export.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Returns `true` when the category was not present yet.
    pub fn add_category<S: Into<String>>(&mut self, category: S) -> bool {
        self.categories.insert(category.into())
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    /// Returns `true` when the file was not present yet.
    pub fn add_file<S: Into<String>>(&mut self, file: S) -> bool {
        self.files.insert(file.into())
    }

    pub fn files(&self) -> &BTreeSet<String> {
        &self.files
    }
}

fn strip_prefix_ignore_case<'a>(title: &'a str, prefix: &str) -> &'a str {
    match title.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &title[prefix.len()..],
        _ => title,
    }
}

/// A reusable text fragment with `{{{key}}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDefinition {
    /// Usually `<namespace>:<name>`.
    pub title: String,
    pub body: String,
}

impl TemplateDefinition {
    pub fn new<S: Into<String>>(title: S, body: S) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A namespace declared by the export, together with the template definitions
/// found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    /// Numeric key as written in the export (kept as text).
    pub key: String,
    pub definitions: Vec<TemplateDefinition>,
}

impl Namespace {
    pub fn new<S: Into<String>>(name: S, key: S) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            definitions: Vec::new(),
        }
    }

    /// `"<name>:"`, the title prefix of pages living in this namespace.
    pub fn prefix(&self) -> String {
        format!("{}:", self.name)
    }

    /// Whether a page title belongs to this namespace (case-sensitive, like
    /// the export itself).
    pub fn owns_title(&self, title: &str) -> bool {
        title.starts_with(&self.prefix())
    }

    /// Strip this namespace's prefix (compared case-insensitively) from a
    /// definition title. Titles without the prefix come back whole.
    pub fn bare_name<'a>(&self, title: &'a str) -> &'a str {
        strip_prefix_ignore_case(title, &self.prefix())
    }

    /// Rename the namespace and rewrite the titles of its definitions to the
    /// new prefix.
    pub fn rename<S: Into<String>>(&mut self, new_name: S) {
        let new_name = new_name.into();
        let old_prefix = self.prefix();
        let new_prefix = format!("{}:", new_name);
        for def in self.definitions.iter_mut() {
            let bare = strip_prefix_ignore_case(&def.title, &old_prefix).to_owned();
            def.title = format!("{}{}", new_prefix, bare);
        }
        self.name = new_name;
    }

    pub fn push(&mut self, def: TemplateDefinition) {
        self.definitions.push(def);
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
