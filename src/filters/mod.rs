//! Text filters run around markup conversion.
//!
//! Pre-transform filters see the raw markup of a page together with the
//! template namespaces; they may rename namespaces and rewrite definition
//! titles but never add or remove entries. Post-transform filters only see
//! the converted text.
//!
//! Filters are infallible: they rewrite text and nothing else.

pub mod category_alias;
pub mod image_alias;
pub mod image_align;
pub mod reset_flow;
pub mod template_alias;

use std::sync::Arc;

use crate::dump::model::{Namespace, Page};

pub use category_alias::CategoryAliasFilter;
pub use image_alias::ImageAliasFilter;
pub use image_align::RemoveImageLeftAlign;
pub use reset_flow::ResetFlowFilter;
pub use template_alias::TemplateAliasFilter;

/// A filter over raw wiki markup.
pub trait PreTransformFilter {
    fn id(&self) -> &'static str;

    fn filter_page(&self, page: &mut Page, namespaces: &mut [Namespace]);
}

/// A filter over converted text.
pub trait PostTransformFilter {
    fn id(&self) -> &'static str;

    fn filter_page(&self, page: &mut Page);
}

/// Run every pre-transform filter over `page`, in order.
pub fn apply_pre(filters: &[Arc<dyn PreTransformFilter>], page: &mut Page, namespaces: &mut [Namespace]) {
    for filter in filters {
        log::trace!("{} on {:?}", filter.id(), page.title());
        filter.filter_page(page, namespaces);
    }
}

/// Run every post-transform filter over `page`, in order.
pub fn apply_post(filters: &[Arc<dyn PostTransformFilter>], page: &mut Page) {
    for filter in filters {
        log::trace!("{} on {:?}", filter.id(), page.title());
        filter.filter_page(page);
    }
}

/// Run the pre-transform chain over the template bodies themselves.
///
/// Every definition is filtered as a page titled after the definition, and
/// its body is replaced by the filtered text.
pub fn apply_pre_to_definitions(
    filters: &[Arc<dyn PreTransformFilter>],
    namespaces: &mut [Namespace],
) -> usize {
    let mut filtered = 0usize;
    for ns_idx in 0..namespaces.len() {
        for def_idx in 0..namespaces[ns_idx].definitions.len() {
            let def = &namespaces[ns_idx].definitions[def_idx];
            let mut page = Page::new(def.title.clone(), def.body.clone(), String::new(), None);
            apply_pre(filters, &mut page, namespaces);
            if let Some(def) = namespaces[ns_idx].definitions.get_mut(def_idx) {
                def.body = page.text().to_owned();
            }
            filtered += 1;
        }
    }
    filtered
}
