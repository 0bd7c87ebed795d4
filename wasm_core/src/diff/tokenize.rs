//! Word-level tokenizer for the text comparison tool.
//!
//! Text is split into CJK ideographs (one token per character), runs of
//! ASCII word characters and apostrophes, whitespace runs, and runs of
//! anything else. Every token keeps the original slice for display plus a
//! normalized key that is only ever used for equality.
use serde::Deserialize;
use unicode_general_category::{get_general_category, GeneralCategory};

use super::lcs::Keyed;

/// Flags that relax how two pieces of text compare. All combinations are valid.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct NormalizationSettings {
    pub ignore_case: bool,
    pub ignore_punctuation: bool,
    pub ignore_whitespace: bool,
}

/// A slice of the input together with its comparison key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Exact source text, used when rendering.
    pub render: &'a str,
    /// Normalized text, used only for equality.
    pub key: String,
}

impl Keyed for Token<'_> {
    fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenClass {
    Cjk,
    Word,
    Space,
    Other,
}

fn classify(ch: char) -> TokenClass {
    if is_cjk_ideograph(ch) {
        TokenClass::Cjk
    } else if ch.is_ascii_alphanumeric() || ch == '_' || ch == '\'' {
        TokenClass::Word
    } else if ch.is_whitespace() {
        TokenClass::Space
    } else {
        TokenClass::Other
    }
}

pub(crate) fn is_cjk_ideograph(ch: char) -> bool {
    matches!(
        ch as u32,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2FA1F
    )
}

/// Unicode punctuation (P*) or symbol (S*) characters.
pub(crate) fn is_punct_or_symbol(ch: char) -> bool {
    matches!(
        get_general_category(ch),
        GeneralCategory::ConnectorPunctuation
            | GeneralCategory::DashPunctuation
            | GeneralCategory::OpenPunctuation
            | GeneralCategory::ClosePunctuation
            | GeneralCategory::InitialPunctuation
            | GeneralCategory::FinalPunctuation
            | GeneralCategory::OtherPunctuation
            | GeneralCategory::MathSymbol
            | GeneralCategory::CurrencySymbol
            | GeneralCategory::ModifierSymbol
            | GeneralCategory::OtherSymbol
    )
}

/// Folds the fullwidth ASCII block (U+FF01..U+FF5E) and the ideographic
/// space onto their halfwidth counterparts.
fn fold_width(ch: char) -> char {
    match ch as u32 {
        0xFF01..=0xFF5E => char::from_u32(ch as u32 - 0xFEE0).unwrap_or(ch),
        0x3000 => ' ',
        _ => ch,
    }
}

/// Splits `text` into contiguous slices. Concatenating the slices yields
/// `text` again.
fn segment(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut current: Option<TokenClass> = None;
    for (idx, ch) in text.char_indices() {
        let class = classify(ch);
        if let Some(prev) = current {
            if prev != class || class == TokenClass::Cjk {
                pieces.push(&text[start..idx]);
                start = idx;
            }
        }
        current = Some(class);
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Derives the comparison key for a piece of text.
///
/// Steps run in a fixed order: width folding (always), lowercasing,
/// punctuation stripping, then whitespace stripping. When whitespace is
/// significant the key is trimmed instead, unless it is whitespace only, so
/// runs of different widths still compare unequal.
pub fn normalize_key(text: &str, settings: &NormalizationSettings) -> String {
    let mut key: String = text.chars().map(fold_width).collect();
    if settings.ignore_case {
        key = key.to_lowercase();
    }
    if settings.ignore_punctuation {
        key.retain(|ch| !is_punct_or_symbol(ch));
    }
    if settings.ignore_whitespace {
        key.retain(|ch| !ch.is_whitespace());
    } else if !key.chars().all(char::is_whitespace) {
        let trimmed = key.trim();
        if trimmed.len() != key.len() {
            key = trimmed.to_string();
        }
    }
    key
}

fn is_hidden(render: &str, settings: &NormalizationSettings) -> bool {
    (settings.ignore_punctuation && render.chars().all(is_punct_or_symbol))
        || (settings.ignore_whitespace && render.chars().all(char::is_whitespace))
}

/// Tokenizes `text` and drops the tokens the active flags make invisible.
pub fn tokenize<'a>(text: &'a str, settings: &NormalizationSettings) -> Vec<Token<'a>> {
    segment(text)
        .into_iter()
        .filter(|render| !is_hidden(render, settings))
        .map(|render| Token {
            render,
            key: normalize_key(render, settings),
        })
        .collect()
}
