use crate::dump::model::{Namespace, Page};
use crate::filters::PreTransformFilter;

/// Layout reset marker MediaWiki uses to clear floating elements.
pub const RESET_FLOW_TOKEN: &str = "{{-}}";

/// Removes every occurrence of a layout token, `{{-}}` unless configured
/// otherwise.
#[derive(Debug, Clone)]
pub struct ResetFlowFilter {
    token: String,
}

impl Default for ResetFlowFilter {
    fn default() -> Self {
        Self::with_token(RESET_FLOW_TOKEN)
    }
}

impl ResetFlowFilter {
    pub fn with_token<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl PreTransformFilter for ResetFlowFilter {
    fn id(&self) -> &'static str {
        "reset-flow"
    }

    fn filter_page(&self, page: &mut Page, _namespaces: &mut [Namespace]) {
        if self.token.is_empty() || !page.text().contains(&self.token) {
            return;
        }
        let text = page.text().replace(&self.token, "");
        page.set_text(text);
    }
}
