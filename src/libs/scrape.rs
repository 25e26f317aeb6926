//! Tolerant HTML extraction for the attendance service's rendered pages.
//!
//! The attendance protocol never needs a full DOM: every value this crate
//! pulls out of a page lives in the attributes of an `<input>` or `<meta>`
//! tag. These helpers scan the raw markup case-insensitively, parse single
//! tags into attributes, and scope token lookups to `<form>` blocks so that
//! each action button's own anti-forgery token is selected.
//!
//! Every "expected element missing" case surfaces as a typed [`ScrapeError`]
//! instead of a panic, so all failure paths are uniformly reportable.

use thiserror::Error;

/// The anti-forgery token field name used by every form on the service.
pub const TOKEN_FIELD: &str = "authenticity_token";

/// A structural mismatch between the page we fetched and the page the
/// protocol expects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("expected <{tag}> with {what} not found in page")]
    MissingElement { tag: &'static str, what: String },
    #[error("<{tag}> with {what} has no \"{attr}\" attribute")]
    MissingAttr {
        tag: &'static str,
        what: String,
        attr: &'static str,
    },
}

/// Returns the `value` of the first `<input name="...">` matching `name`.
pub fn input_by_name(html: &str, name: &str) -> Result<String, ScrapeError> {
    input_where(html, "name", name)
}

/// Returns the `value` of the first `<input id="...">` matching `id`.
pub fn input_by_id(html: &str, id: &str) -> Result<String, ScrapeError> {
    input_where(html, "id", id)
}

/// Returns the `content` of the first `<meta name="...">` matching `name`.
pub fn meta_content(html: &str, name: &str) -> Result<String, ScrapeError> {
    let tag = tag_spans(html, "meta")
        .into_iter()
        .map(|(s, e)| &html[s..e])
        .find(|tag| attr(tag, "name").as_deref() == Some(name))
        .ok_or_else(|| ScrapeError::MissingElement {
            tag: "meta",
            what: format!("name=\"{}\"", name),
        })?;
    attr(tag, "content").ok_or_else(|| ScrapeError::MissingAttr {
        tag: "meta",
        what: format!("name=\"{}\"", name),
        attr: "content",
    })
}

/// Returns the anti-forgery token scoped to the action button whose
/// `<input value="...">` matches `event`.
///
/// The landing page renders one small form per action button, each with its
/// own token. The token is looked up inside the `<form>` block that contains
/// the matching button, never in a sibling form.
pub fn event_token(html: &str, event: &str) -> Result<String, ScrapeError> {
    let block = form_blocks(html)
        .into_iter()
        .find(|block| {
            tag_spans(block, "input")
                .into_iter()
                .any(|(s, e)| attr(&block[s..e], "value").as_deref() == Some(event))
        })
        .ok_or_else(|| ScrapeError::MissingElement {
            tag: "input",
            what: format!("value=\"{}\"", event),
        })?;
    input_where(block, "name", TOKEN_FIELD).map_err(|_| ScrapeError::MissingElement {
        tag: "input",
        what: format!("name=\"{}\" in the \"{}\" form", TOKEN_FIELD, event),
    })
}

/// Finds the first `<input>` whose attribute `key` equals `expected` and
/// returns its `value` attribute.
fn input_where(html: &str, key: &str, expected: &str) -> Result<String, ScrapeError> {
    let tag = tag_spans(html, "input")
        .into_iter()
        .map(|(s, e)| &html[s..e])
        .find(|tag| attr(tag, key).as_deref() == Some(expected))
        .ok_or_else(|| ScrapeError::MissingElement {
            tag: "input",
            what: format!("{}=\"{}\"", key, expected),
        })?;
    attr(tag, "value").ok_or_else(|| ScrapeError::MissingAttr {
        tag: "input",
        what: format!("{}=\"{}\"", key, expected),
        attr: "value",
    })
}

/// Byte spans of every `<tag ...>` opening tag, matched case-insensitively.
///
/// ASCII lowercasing keeps byte offsets aligned with the original markup,
/// so spans index into `html` directly.
fn tag_spans(html: &str, tag: &str) -> Vec<(usize, usize)> {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{}", tag);
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(pos) = lower[from..].find(&open) {
        let start = from + pos;
        let after = start + open.len();
        match lower.as_bytes().get(after) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => {
                let end = lower[after..].find('>').map(|i| after + i + 1).unwrap_or(lower.len());
                spans.push((start, end));
                from = end;
            }
            // A longer tag name sharing the prefix (e.g. <metadata>)
            _ => from = after,
        }
    }
    spans
}

/// Slices of every `<form> ... </form>` block in document order.
///
/// Unclosed forms extend to the end of the document rather than being
/// dropped; real pages occasionally omit the closing tag.
fn form_blocks(html: &str) -> Vec<&str> {
    let lower = html.to_ascii_lowercase();
    let mut blocks = Vec::new();
    let mut from = 0;

    while let Some(pos) = lower[from..].find("<form") {
        let start = from + pos;
        let end = lower[start..].find("</form").map(|i| start + i).unwrap_or(html.len());
        blocks.push(&html[start..end]);
        from = end.max(start + 5);
    }
    blocks
}

/// Extracts an attribute value from a single opening tag.
///
/// Attribute names match case-insensitively; values keep their original
/// case. Both quoted and unquoted values are accepted, and whitespace
/// around `=` is tolerated.
fn attr(tag: &str, name: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let needle = name.to_ascii_lowercase();
    let bytes = tag.as_bytes();
    let mut from = 0;

    while let Some(pos) = lower[from..].find(&needle) {
        let start = from + pos;
        from = start + needle.len();

        // Must be a standalone attribute name: preceded by whitespace,
        // followed by '=' (with optional whitespace around it).
        if start == 0 || !bytes[start - 1].is_ascii_whitespace() {
            continue;
        }
        let mut i = start + needle.len();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }

        return match bytes[i] {
            q @ (b'"' | b'\'') => {
                let rest = &tag[i + 1..];
                rest.find(q as char).map(|end| rest[..end].to_string())
            }
            _ => {
                let rest = &tag[i..];
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                    .unwrap_or(rest.len());
                Some(rest[..end].to_string())
            }
        };
    }
    None
}
