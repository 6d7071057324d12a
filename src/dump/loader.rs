//! Export loader: reads a MediaWiki XML export into template namespaces and
//! content pages.
//!
//! The reader walks the document once with `quick-xml`, collecting namespace
//! declarations from `siteinfo/namespaces` and one `PageRecord` per `<page>`.
//! Only the first `title`/`text`/`username`/`timestamp` of a page is kept, so
//! later revisions in the same page are ignored.

use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::dump::model::{Namespace, Page, PageRecord, PageRecordBuilder, TemplateDefinition};
use crate::errors::{MigrateError, Result};

/// Everything the rest of the pipeline needs from an export.
#[derive(Debug, Clone, Default)]
pub struct Export {
    /// Template namespaces that own at least one definition, in declaration order.
    pub namespaces: Vec<Namespace>,
    /// Content pages in document order. Template sources are not included.
    pub pages: Vec<Page>,
}

impl Export {
    pub fn definition_count(&self) -> usize {
        self.namespaces.iter().map(|ns| ns.definitions.len()).sum()
    }
}

/// Read and load an export file.
pub fn load_export_file(path: &Path) -> Result<Export> {
    let xml = fs::read_to_string(path).map_err(|e| MigrateError::io(path, e))?;
    load_export(&xml)
}

/// Load an export from its XML text.
pub fn load_export(xml: &str) -> Result<Export> {
    let (declared, records) = read_document(xml)?;
    log::debug!(
        "export declares {} namespaces and {} pages",
        declared.len(),
        records.len()
    );

    let namespaces = build_registry(declared, &records);
    for ns in &namespaces {
        log::debug!(
            " > template namespace {:?} contains {} templates",
            ns.name,
            ns.definitions.len()
        );
    }

    let pages = build_pages(records, &namespaces);
    log::debug!("read {} pages", pages.len());

    Ok(Export { namespaces, pages })
}

/// Attach every record whose title sits in a declared namespace to that
/// namespace and drop namespaces that end up empty.
///
/// Names are unique in the result: a later declaration reusing a name is
/// dropped so each definition has exactly one owner.
pub fn build_registry(declared: Vec<Namespace>, records: &[PageRecord]) -> Vec<Namespace> {
    let mut registry: Vec<Namespace> = Vec::with_capacity(declared.len());
    for ns in declared {
        if registry.iter().any(|known| known.name == ns.name) {
            log::warn!(
                "namespace {:?} (key {}) is declared twice, keeping the first declaration",
                ns.name,
                ns.key
            );
            continue;
        }
        registry.push(ns);
    }

    for ns in registry.iter_mut() {
        let owned: Vec<&PageRecord> = records.iter().filter(|r| ns.owns_title(&r.title)).collect();
        for record in owned {
            ns.push(TemplateDefinition::new(
                record.title.as_str(),
                record.text.as_str(),
            ));
        }
    }

    registry.retain(|ns| !ns.is_empty());
    registry
}

/// Turn every record that is not a template source into a `Page`.
pub fn build_pages(records: Vec<PageRecord>, registry: &[Namespace]) -> Vec<Page> {
    records
        .into_iter()
        .filter(|r| !registry.iter().any(|ns| ns.owns_title(&r.title)))
        .map(Page::from_record)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Text,
    Username,
    Timestamp,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"title" => Some(Field::Title),
            b"text" => Some(Field::Text),
            b"username" => Some(Field::Username),
            b"timestamp" => Some(Field::Timestamp),
            _ => None,
        }
    }
}

/// Fields of the `<page>` currently being read.
#[derive(Debug, Default)]
struct PageFields {
    title: Option<String>,
    text: Option<String>,
    username: Option<String>,
    timestamp: Option<String>,
    open: Option<Field>,
}

impl PageFields {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Text => &mut self.text,
            Field::Username => &mut self.username,
            Field::Timestamp => &mut self.timestamp,
        }
    }

    /// Start capturing `field` unless an earlier element already filled it.
    fn begin(&mut self, field: Field) -> bool {
        let slot = self.slot(field);
        if slot.is_some() {
            return false;
        }
        *slot = Some(String::new());
        true
    }

    fn append(&mut self, text: &str) {
        if let Some(field) = self.open
            && let Some(value) = self.slot(field)
        {
            value.push_str(text);
        }
    }

    fn into_record(self, offset: u64) -> Result<PageRecord> {
        let title = self
            .title
            .ok_or_else(|| MigrateError::parse_at("page without a <title> element", offset))?;
        PageRecordBuilder::default()
            .title(title)
            .text(self.text.unwrap_or_default())
            .username(self.username.unwrap_or_default())
            .timestamp(self.timestamp.unwrap_or_default())
            .build()
            .map_err(|e| MigrateError::parse_at(e.to_string(), offset))
    }
}

/// Streaming state while walking the document.
#[derive(Debug, Default)]
struct DumpReader {
    stack: Vec<Vec<u8>>,
    namespaces: Vec<Namespace>,
    records: Vec<PageRecord>,
    page: Option<PageFields>,
    /// Key and accumulated name of an open `<namespace>` declaration.
    namespace: Option<(String, String)>,
}

impl DumpReader {
    fn parent_is(&self, tag: &[u8]) -> bool {
        self.stack.last().is_some_and(|t| t.as_slice() == tag)
    }

    fn start(&mut self, e: &BytesStart, offset: u64) -> Result<()> {
        let tag = e.local_name().as_ref().to_vec();
        if tag == b"namespace" && self.parent_is(b"namespaces") {
            self.namespace = Some((namespace_key(e, offset)?, String::new()));
        } else if tag == b"page" {
            self.page = Some(PageFields::default());
        } else if let Some(field) = Field::from_tag(&tag)
            && let Some(page) = self.page.as_mut()
            && page.begin(field)
        {
            page.open = Some(field);
        }
        self.stack.push(tag);
        Ok(())
    }

    fn empty(&mut self, e: &BytesStart, offset: u64) -> Result<()> {
        let tag = e.local_name();
        if tag.as_ref() == b"namespace" && self.parent_is(b"namespaces") {
            let key = namespace_key(e, offset)?;
            self.namespaces.push(Namespace::new(String::new(), key));
        } else if let Some(field) = Field::from_tag(tag.as_ref())
            && let Some(page) = self.page.as_mut()
        {
            page.begin(field);
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some((_, name)) = self.namespace.as_mut() {
            name.push_str(text);
        } else if let Some(page) = self.page.as_mut() {
            page.append(text);
        }
    }

    fn end(&mut self, offset: u64) -> Result<()> {
        let tag = self
            .stack
            .pop()
            .ok_or_else(|| MigrateError::parse_at("closing tag without an opening tag", offset))?;

        if tag == b"namespace" {
            if let Some((key, name)) = self.namespace.take() {
                self.namespaces.push(Namespace::new(name, key));
            }
        } else if tag == b"page" {
            if let Some(page) = self.page.take() {
                self.records.push(page.into_record(offset)?);
            }
        } else if let Some(field) = Field::from_tag(&tag)
            && let Some(page) = self.page.as_mut()
            && page.open == Some(field)
        {
            page.open = None;
        }
        Ok(())
    }
}

fn namespace_key(e: &BytesStart, offset: u64) -> Result<String> {
    let attr = e
        .try_get_attribute("key")
        .map_err(|err| MigrateError::parse_at(format!("bad namespace attribute: {}", err), offset))?;
    match attr {
        Some(attr) => attr
            .unescape_value()
            .map(|v| v.into_owned())
            .map_err(|err| MigrateError::parse_at(format!("bad namespace key: {}", err), offset)),
        None => Ok(String::new()),
    }
}

/// Walk the whole document and return the declared namespaces (without
/// definitions) and every page record.
fn read_document(xml: &str) -> Result<(Vec<Namespace>, Vec<PageRecord>)> {
    let mut reader = Reader::from_str(xml);
    let mut state = DumpReader::default();
    let mut seen_root = false;

    loop {
        let offset = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                seen_root = true;
                state.start(&e, offset)?;
            }
            Ok(Event::Empty(e)) => {
                seen_root = true;
                state.empty(&e, offset)?;
            }
            Ok(Event::End(_)) => state.end(offset)?,
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|err| MigrateError::parse_at(err.to_string(), offset))?;
                state.text(&text);
            }
            Ok(Event::CData(c)) => {
                let raw = c.into_inner();
                state.text(&String::from_utf8_lossy(&raw));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(MigrateError::parse_at(
                    err.to_string(),
                    reader.error_position() as u64,
                ));
            }
        }
    }

    if !seen_root {
        return Err(MigrateError::parse("document has no root element"));
    }
    if let Some(open) = state.stack.last() {
        return Err(MigrateError::parse_at(
            format!(
                "unexpected end of document inside <{}>",
                String::from_utf8_lossy(open)
            ),
            reader.buffer_position() as u64,
        ));
    }

    Ok((state.namespaces, state.records))
}
