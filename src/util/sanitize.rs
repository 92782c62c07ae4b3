use regex::Regex;
use std::sync::LazyLock;

static ANSI_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-9;?]*[ -/]*[@-~]").ok());
static TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").ok());
static NUMERIC_ENTITY_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").ok());

// Strip ANSI sequences and control chars from untrusted feed text, collapse
// whitespace. Output is a single line.
pub fn sanitize_for_terminal(s: &str) -> String {
    let no_ansi = match ANSI_RE.as_ref() {
        Some(r) => r.replace_all(s, "").into_owned(),
        None => s.to_string(),
    };
    let cleaned: String = no_ansi
        .chars()
        .map(|ch| if ch.is_whitespace() { ' ' } else { ch })
        .filter(|ch| !ch.is_control())
        .collect();
    collapse_whitespace(&cleaned)
}

/// Feed summaries are often HTML fragments; reduce them to plain text.
pub fn strip_html(s: &str) -> String {
    let no_tags = match TAG_RE.as_ref() {
        Some(r) => r.replace_all(s, " ").into_owned(),
        None => s.to_string(),
    };
    let decoded = decode_numeric_entities(&no_tags)
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    sanitize_for_terminal(&decoded)
}

/// `&#8217;` and `&#x2019;` style references; invalid code points are dropped.
fn decode_numeric_entities(s: &str) -> String {
    let Some(re) = NUMERIC_ENTITY_RE.as_ref() else {
        return s.to_string();
    };
    re.replace_all(s, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32).map(String::from).unwrap_or_default()
    })
    .into_owned()
}

/// Cut to at most `max` chars, marking the cut with "...".
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
