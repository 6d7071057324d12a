/*!
Link scanning for wiki markup.

- `Link` is either an internal `[[target|label]]` or an external `[url label]`
  link, as reported to reference listeners.
- `parse_internal_link_at(input, start)` reads a `[[...]]` link (nested links
  are kept inside the target).
- `parse_external_link_at(input, start)` reads a `[url label]` link whose
  target looks like a URL.
- `scan_links(input)` walks a whole text and yields every link in order.
*/

use std::fmt;

/// Whether a link points inside the wiki or outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Internal,
    External,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Internal => write!(f, "Internal"),
            LinkType::External => write!(f, "External"),
        }
    }
}

/// A link found in page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub link_type: LinkType,
    pub target: String,
    pub label: String,
}

impl Link {
    pub fn new_internal<S: Into<String>>(target: S, label: S) -> Self {
        Self {
            link_type: LinkType::Internal,
            target: target.into(),
            label: label.into(),
        }
    }

    pub fn new_external<S: Into<String>>(target: S, label: S) -> Self {
        Self {
            link_type: LinkType::External,
            target: target.into(),
            label: label.into(),
        }
    }

    /// Reconstruct the link as markup.
    pub fn to_wikitext(&self) -> String {
        let labelled = !self.label.is_empty() && self.label != self.target;
        match (self.link_type, labelled) {
            (LinkType::Internal, false) => format!("[[{}]]", self.target),
            (LinkType::Internal, true) => format!("[[{}|{}]]", self.target, self.label),
            (LinkType::External, false) => format!("[{}]", self.target),
            (LinkType::External, true) => format!("[{} {}]", self.target, self.label),
        }
    }
}

/// Parse an internal link `[[...]]` starting at byte `start` of `input`.
///
/// Returns the number of bytes consumed and the link. An unterminated or empty
/// link yields `None`.
pub fn parse_internal_link_at(input: &str, start: usize) -> Option<(usize, Link)> {
    let rest = input.get(start..)?;
    if !rest.starts_with("[[") {
        return None;
    }

    let mut depth = 1usize;
    let mut content = String::new();
    let mut chars = rest.char_indices().skip(2).peekable();
    let mut consumed = None;

    while let Some((idx, ch)) = chars.next() {
        let next = chars.peek().map(|(_, c)| *c);
        if ch == '[' && next == Some('[') {
            depth += 1;
            content.push_str("[[");
            chars.next();
        } else if ch == ']' && next == Some(']') {
            chars.next();
            depth -= 1;
            if depth == 0 {
                consumed = Some(idx + 2);
                break;
            }
            content.push_str("]]");
        } else {
            content.push(ch);
        }
    }

    let consumed = consumed?;
    if content.trim().is_empty() {
        return None;
    }

    // The first '|' separates target from label; a nested link may carry its own.
    let (target, label) = match content.split_once('|') {
        Some((t, l)) => (t.trim().to_owned(), l.trim().to_owned()),
        None => (content.trim().to_owned(), content.trim().to_owned()),
    };

    Some((consumed, Link::new_internal(target, label)))
}

/// Parse an external link `[url label]` starting at byte `start` of `input`.
///
/// The target must carry a scheme (`http:`, `mailto:`, ...) or start with
/// `//`; plain bracketed text is not a link.
pub fn parse_external_link_at(input: &str, start: usize) -> Option<(usize, Link)> {
    let rest = input.get(start..)?;
    if !rest.starts_with('[') || rest.starts_with("[[") {
        return None;
    }

    let end = rest.find(']')?;
    let content = &rest[1..end];
    if content.contains('\n') {
        return None;
    }

    let (target, label) = match content.trim().split_once(char::is_whitespace) {
        Some((t, l)) => (t.to_owned(), l.trim().to_owned()),
        None => (content.trim().to_owned(), content.trim().to_owned()),
    };
    if !looks_like_url(&target) {
        return None;
    }

    Some((end + 1, Link::new_external(target, label)))
}

fn looks_like_url(target: &str) -> bool {
    if target.starts_with("//") {
        return true;
    }
    match target.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// Every link in `input`, in document order. Text that fails to parse as a
/// link is skipped one character at a time.
pub fn scan_links(input: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let mut idx = 0usize;

    while let Some(offset) = input[idx..].find('[') {
        let at = idx + offset;
        let parsed = parse_internal_link_at(input, at).or_else(|| parse_external_link_at(input, at));
        match parsed {
            Some((consumed, link)) => {
                links.push(link);
                idx = at + consumed;
            }
            None => idx = at + 1,
        }
    }

    links
}
