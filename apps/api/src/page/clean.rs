use once_cell::sync::Lazy;
use regex::Regex;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*?>").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s.,:;!?()'/&%+#-]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalizes scraped page text before it is sent to the LLM.
///
/// Removes leftover markup and URLs, drops symbols outside basic punctuation,
/// and collapses all whitespace into single spaces.
pub fn clean_text(text: &str) -> String {
    let text = HTML_TAG.replace_all(text, " ");
    let text = URL.replace_all(&text, " ");
    let text = DISALLOWED.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Cuts `text` to at most `max_chars` characters, on a char boundary.
/// Returns the input unchanged when it already fits.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
