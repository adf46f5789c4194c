// src/matcher.rs
//! Keyword matcher: case-insensitive, boundary-aware containment.
//!
//! A keyword matches when it occurs in the text and both ends of the occurrence sit on a
//! token boundary. Boundaries are decided by explicit character-class transitions rather
//! than a locale-aware regex `\b`:
//!
//! - string edges and non-word characters (whitespace, punctuation, symbols) are boundaries;
//! - a transition between a CJK character and a non-CJK character is a boundary;
//! - two adjacent CJK characters are a boundary (CJK scripts carry no token delimiters);
//! - a lowercase → uppercase transition (`OpenAI`) is a boundary;
//! - anything else between two word characters (`WAIT`, `gpt4`) is not.

/// Broad classification of a character for boundary decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Cjk,
    Word,
    Other,
}

/// CJK ideographs, kana and hangul.
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF        // hiragana, katakana
        | 0x31F0..=0x31FF      // katakana phonetic extensions
        | 0x3400..=0x4DBF      // CJK ext A
        | 0x4E00..=0x9FFF      // CJK unified ideographs
        | 0xF900..=0xFAFF      // CJK compatibility ideographs
        | 0x1100..=0x11FF      // hangul jamo
        | 0x3130..=0x318F      // hangul compatibility jamo
        | 0xAC00..=0xD7AF      // hangul syllables
        | 0x20000..=0x2FA1F    // CJK ext B.. + compatibility supplement
    )
}

fn class_of(c: char) -> CharClass {
    if is_cjk(c) {
        CharClass::Cjk
    } else if c.is_alphanumeric() || c == '_' {
        CharClass::Word
    } else {
        CharClass::Other
    }
}

/// True if a token boundary exists between `left` and `right` (original, un-lowered chars).
pub fn is_boundary(left: Option<char>, right: Option<char>) -> bool {
    let (l, r) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        _ => return true,
    };
    match (class_of(l), class_of(r)) {
        (CharClass::Other, _) | (_, CharClass::Other) => true,
        (CharClass::Cjk, _) | (_, CharClass::Cjk) => true,
        (CharClass::Word, CharClass::Word) => l.is_lowercase() && r.is_uppercase(),
    }
}

/// Lowercased view of `text`: each lowered char remembers the original char index it came from.
fn lowered_with_origin(chars: &[char]) -> Vec<(char, usize)> {
    let mut out = Vec::with_capacity(chars.len());
    for (i, c) in chars.iter().enumerate() {
        for lc in c.to_lowercase() {
            out.push((lc, i));
        }
    }
    out
}

/// Case-insensitive, boundary-aware keyword match. Blank keywords never match.
pub fn matches(text: &str, keyword: &str) -> bool {
    let keyword = keyword.trim();
    if keyword.is_empty() || text.is_empty() {
        return false;
    }

    let needle: Vec<char> = keyword.chars().flat_map(char::to_lowercase).collect();

    let chars: Vec<char> = text.chars().collect();
    let hay = lowered_with_origin(&chars);
    if needle.len() > hay.len() {
        return false;
    }

    for start in 0..=(hay.len() - needle.len()) {
        let end = start + needle.len();
        if !hay[start..end]
            .iter()
            .zip(&needle)
            .all(|((h, _), n)| h == n)
        {
            continue;
        }

        let first_orig = hay[start].1;
        let last_orig = hay[end - 1].1;
        // An occurrence must cover whole original chars (expanded lowercase forms).
        if start > 0 && hay[start - 1].1 == first_orig {
            continue;
        }
        if end < hay.len() && hay[end].1 == last_orig {
            continue;
        }

        let before = first_orig.checked_sub(1).map(|i| chars[i]);
        let after = chars.get(last_orig + 1).copied();

        // Case transitions are judged on the text's own casing.
        if is_boundary(before, Some(chars[first_orig]))
            && is_boundary(Some(chars[last_orig]), after)
        {
            return true;
        }
    }
    false
}

/// Index of the first matching keyword; later keywords are not tried.
pub fn matches_any<S: AsRef<str>>(text: &str, keywords: &[S]) -> Option<usize> {
    keywords.iter().position(|k| matches(text, k.as_ref()))
}
