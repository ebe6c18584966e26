
use anyhow::Result;
use fancy_regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

// Keeps the Bangla block, Bengali danda/double danda, zero-width joiners used
// in Bangla conjuncts, whitespace, and common punctuation. Everything else is
// OCR noise for this corpus.
static FOREIGN_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^\u{0980}-\u{09FF}\s\u{0964}\u{0965}\u{200C}\u{200D}.,!?;:“”‘’"'\-—()]"#)
        .expect("foreign character pattern is valid")
});

static PAGE_NUMBER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s*$").expect("page number pattern is valid"));

static PAGE_HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*page\s*\d+").expect("page header pattern is valid"));

static MISSING_SPACE_AFTER_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([।!?;,”»])(\S)").expect("punctuation pattern is valid"));

static REPEATED_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("spacing pattern is valid"));

static REPEATED_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("blank line pattern is valid"));

/// Clean raw extracted text for chunking and embedding.
///
/// NFC normalization first, so decomposed Bangla letters compose correctly
/// before the character filter runs.
#[inline]
pub fn clean_text(raw: &str) -> Result<String> {
    let text = normalize_unicode(raw);
    let text = remove_page_markers(&text)?;
    let text = remove_foreign_characters(&text);
    let text = fix_spacing(&text);

    debug!("Cleaned {} bytes down to {}", raw.len(), text.len());
    Ok(text)
}

/// Compose combining marks into canonical NFC form.
#[inline]
pub fn normalize_unicode(text: &str) -> String {
    text.nfc().collect()
}

/// Drop lines that are bare page numbers or `Page N` headers.
#[inline]
pub fn remove_page_markers(text: &str) -> Result<String> {
    let mut lines = Vec::new();
    for line in text.lines() {
        if PAGE_NUMBER_LINE.is_match(line)? || PAGE_HEADER_LINE.is_match(line)? {
            continue;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

/// Strip characters outside the Bangla script and the punctuation whitelist.
#[inline]
pub fn remove_foreign_characters(text: &str) -> String {
    FOREIGN_CHARS.replace_all(text, "").into_owned()
}

/// Ensure a space after sentence punctuation and collapse repeated blanks.
#[inline]
pub fn fix_spacing(text: &str) -> String {
    let text = MISSING_SPACE_AFTER_PUNCT.replace_all(text, "$1 $2");
    let text = REPEATED_SPACES.replace_all(&text, " ");
    let text = REPEATED_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}
