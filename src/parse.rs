//! HTML credit block parser.
//!
//! Turns the rich-text HTML a CMS editor produces for a credits section
//! into ordered [`CreditRow`]s. Lines are delimited by `<br>` and paragraph
//! boundaries. Each line yields a role label (the text before the first
//! anchor, cut at a colon) and the people mentioned on it: anchors when the
//! line has any, otherwise capitalized name runs from the plain text.
//!
//! This is a best-effort heuristic over the block shapes seen in practice:
//!
//! ```text
//! Photography: <a href="https://instagram.com/jd">@jd</a><br>
//! Director <a href="//instagram.com/sc/#">Santiago Carrasquilla</a><br>
//! Music: Nick Apple &amp; Camilo Ojeda
//! ```
//!
//! A line that yields a label but no people is dropped.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CreditMention, CreditRow, DEFAULT_LABEL};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static P_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<p(?:\s[^>]*)?>").expect("valid regex"));
static P_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p\s*>").expect("valid regex"));
static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("valid regex"));
static ANCHOR_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<a\s").expect("valid regex"));
static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\s+[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#).expect("valid regex")
});
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z][\w'.-]+(?:\s+[A-Z][\w'.-]+)+").expect("valid regex"));
static TRAILING_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*[A-Z][\w'.-]+(?:\s+[A-Z][\w'.-]+)+\s*$").expect("valid regex")
});
static TRAILING_SEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s:@/]+$").expect("valid regex"));
static NAME_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|&|\band\b)\s*").expect("valid regex"));
static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Decode the handful of entities rich-text editors emit.
///
/// `&amp;` is decoded before `&lt;`/`&gt;`, so double-escaped markup
/// (`&amp;lt;`) ends up as a literal `<`.
pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
}

/// Remove every `<...>` tag, keeping the text between them.
pub fn strip_tags(s: &str) -> String {
    TAG_RE.replace_all(s, "").into_owned()
}

/// Normalize a profile link: trim, drop trailing `#`, and upgrade
/// protocol-relative `//host/...` to `https://host/...`.
pub fn normalize_href(href: &str) -> String {
    let url = href.trim().trim_end_matches('#');
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    }
}

/// Derive a URL-safe slug: lowercase ASCII alphanumerics joined by single
/// hyphens, no leading or trailing hyphen.
pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase();
    NON_ALNUM_RE
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Derive a role label from the text preceding the first anchor on a line.
pub fn clean_label(prefix: &str) -> String {
    let text = decode_entities(&strip_tags(prefix));
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let label = match text.split_once(':') {
        Some((before, _)) => before.to_string(),
        // Keep a trailing "First Last" out of the label.
        None => TRAILING_NAME_RE.replace(text, "").into_owned(),
    };

    TRAILING_SEP_RE.replace(&label, "").trim().to_string()
}

/// Parse an HTML credits block into rows, in line order.
pub fn parse_credits_html(html: &str) -> Vec<CreditRow> {
    let decoded = decode_entities(html).replace("\r\n", "\n").replace('\r', "\n");
    let without_open = P_OPEN_RE.replace_all(&decoded, "");
    let normalized = P_CLOSE_RE.replace_all(&without_open, "<br>");

    BR_RE
        .split(&normalized)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<CreditRow> {
    let prefix = match ANCHOR_START_RE.find(line) {
        Some(m) => &line[..m.start()],
        None => line,
    };
    let label = clean_label(prefix);

    let mut people = anchor_mentions(line);
    if people.is_empty() {
        people = plain_text_mentions(line, &label);
    }

    let people = dedup_mentions(people);
    if people.is_empty() {
        return None;
    }

    Some(CreditRow {
        label: if label.is_empty() {
            DEFAULT_LABEL.to_string()
        } else {
            label
        },
        people,
    })
}

fn anchor_mentions(line: &str) -> Vec<CreditMention> {
    let mut people = Vec::new();
    for caps in ANCHOR_RE.captures_iter(line) {
        let href = normalize_href(&caps[1]);
        if href.is_empty() {
            continue;
        }
        let text = decode_entities(&strip_tags(&caps[2]));
        let text = text.trim();
        let name = text.strip_prefix('@').unwrap_or(text).trim();
        if name.is_empty() {
            continue;
        }
        people.push(CreditMention::new(name, Some(href)));
    }
    people
}

fn plain_text_mentions(line: &str, label: &str) -> Vec<CreditMention> {
    let plain = decode_entities(&strip_tags(line));
    let plain = plain.trim();

    let names_text = match plain.split_once(':') {
        Some((_, after)) => after.trim(),
        None => plain.strip_prefix(label).unwrap_or(plain).trim(),
    };
    if names_text.is_empty() {
        return Vec::new();
    }

    NAME_SPLIT_RE
        .split(names_text)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| NAME_RE.find(token))
        .map(|m| CreditMention::new(m.as_str().trim(), None))
        .collect()
}

/// Drop repeated mentions, keeping the first occurrence of each key.
pub fn dedup_mentions(people: Vec<CreditMention>) -> Vec<CreditMention> {
    let mut seen = HashSet::new();
    people
        .into_iter()
        .filter(|p| seen.insert(p.dedup_key()))
        .collect()
}

/// Flatten rows into the unique set of mentions they reference.
pub fn flatten_mentions(rows: &[CreditRow]) -> Vec<CreditMention> {
    dedup_mentions(rows.iter().flat_map(|r| r.people.iter().cloned()).collect())
}

/// Bring hand-edited rows (from a JSON input) to the shape the parser emits:
/// trimmed names, normalized URLs, deduplicated people, no empty rows.
pub fn normalize_rows(rows: Vec<CreditRow>) -> Vec<CreditRow> {
    rows.into_iter()
        .filter_map(|row| {
            let people: Vec<CreditMention> = row
                .people
                .into_iter()
                .filter_map(|p| {
                    let url = p
                        .url
                        .as_deref()
                        .map(normalize_href)
                        .filter(|u| !u.is_empty());
                    let name = p.name.trim();
                    if name.is_empty() && url.is_none() {
                        return None;
                    }
                    Some(CreditMention::new(name, url))
                })
                .collect();
            let people = dedup_mentions(people);
            if people.is_empty() {
                return None;
            }
            let label = row.label.trim();
            Some(CreditRow {
                label: if label.is_empty() {
                    DEFAULT_LABEL.to_string()
                } else {
                    label.to_string()
                },
                people,
            })
        })
        .collect()
}
