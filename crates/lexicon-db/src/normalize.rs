//! Katakana → hiragana folding used for every container key.

use std::borrow::Cow;

use crate::intern::Interner;
use lexicon_types::Text;

const KATAKANA_SMALL_A: u32 = 0x30A1;
const KATAKANA_SMALL_KE: u32 = 0x30F6;
const KATAKANA_ITERATION: u32 = 0x30FD;
const KATAKANA_VOICED_ITERATION: u32 = 0x30FE;
const KANA_OFFSET: u32 = 0x60;

/// Fold katakana to the canonical hiragana indexing script.
///
/// Every other character (kanji, long-vowel mark `ー`, Latin, punctuation)
/// passes through untouched. Strings without katakana are returned borrowed.
/// The mapping is idempotent: its output never contains foldable characters.
pub fn normalize(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_foldable) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.chars().map(fold).collect())
}

/// Normalize `text` and intern the result.
pub fn normalized_key(interner: &Interner, text: &str) -> Text {
    interner.intern(&normalize(text))
}

fn is_foldable(c: char) -> bool {
    matches!(
        c as u32,
        KATAKANA_SMALL_A..=KATAKANA_SMALL_KE | KATAKANA_ITERATION..=KATAKANA_VOICED_ITERATION
    )
}

fn fold(c: char) -> char {
    if is_foldable(c) {
        char::from_u32(c as u32 - KANA_OFFSET).unwrap_or(c)
    } else {
        c
    }
}
