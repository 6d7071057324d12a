use lazy_regex::regex_replace_all;

use crate::dump::model::Page;
use crate::filters::PostTransformFilter;

const LEFT_ALIGN: &str = "align=\"left\"";

/// Drops `align="left"` from converted `[[image:...]]` links.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveImageLeftAlign;

impl PostTransformFilter for RemoveImageLeftAlign {
    fn id(&self) -> &'static str {
        "remove-image-left-align"
    }

    fn filter_page(&self, page: &mut Page) {
        if !page.text().contains(LEFT_ALIGN) {
            return;
        }
        let text = regex_replace_all!(r"\[\[image:[^\]]*\]\]", page.text(), |link: &str| {
            link.replace(LEFT_ALIGN, "")
        });
        let text = text.into_owned();
        page.set_text(text);
    }
}
