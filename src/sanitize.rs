//! Allowlist sanitizer for preview markup received from peers.
//!
//! Only the formatting tags the local renderer emits survive, and they lose
//! all attributes. Other tags are dropped while their text is kept; the
//! contents of script-like elements are dropped entirely. Stray angle
//! brackets are escaped.

use once_cell::sync::Lazy;

use regex::Regex;

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "ul", "ol", "li", "pre", "code",
    "strong", "em", "u", "del",
];

const DROP_CONTENT_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "template", "noscript", "textarea", "title",
];

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9-]*)((?:[^>\x22']|\x22[^\x22]*\x22|'[^']*')*)>")
        .expect("tag pattern is valid")
});

pub fn sanitize_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(found) = TAG.captures_at(input, cursor) {
        let whole = found.get(0).map_or(cursor..cursor, |m| m.range());
        push_text(&mut out, &input[cursor..whole.start]);
        cursor = whole.end;

        let Some(name) = found.get(2) else {
            // comment
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = found.get(1).is_some_and(|m| !m.as_str().is_empty());

        if !closing && DROP_CONTENT_TAGS.contains(&name.as_str()) {
            cursor = skip_element(input, cursor, &name);
            continue;
        }
        if ALLOWED_TAGS.contains(&name.as_str()) {
            if name == "br" {
                if !closing {
                    out.push_str("<br>");
                }
            } else if closing {
                out.push_str(&format!("</{name}>"));
            } else {
                out.push_str(&format!("<{name}>"));
            }
        }
    }
    push_text(&mut out, &input[cursor..]);
    out
}

/// Position just past the closing tag of `name`, or the end of input
fn skip_element(input: &str, from: usize, name: &str) -> usize {
    let lower = input[from..].to_ascii_lowercase();
    let needle = format!("</{name}");
    match lower.find(&needle) {
        Some(at) => {
            let close_start = from + at;
            input[close_start..]
                .find('>')
                .map_or(input.len(), |end| close_start + end + 1)
        }
        None => input.len(),
    }
}

fn push_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
