//! Locale folding for marker matching.
//!
//! Turkish notes are typed with and without diacritics depending on the
//! keyboard, so both the note and the marker lists are folded to the same
//! ASCII-ish form before substring matching.

/// Lower-case `text`, strip combining marks, and map Turkish letters to
/// their unaccented base (`ç→c ğ→g ı→i ö→o ş→s ü→u`, plus circumflex vowels).
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| !is_combining_mark(*c))
        .map(fold_char)
        .collect()
}

fn fold_char(c: char) -> char {
    match c {
        'ç' => 'c',
        'ğ' => 'g',
        'ı' => 'i',
        'ö' => 'o',
        'ş' => 's',
        'ü' => 'u',
        'â' => 'a',
        'î' => 'i',
        'û' => 'u',
        other => other,
    }
}

// `İ`.to_lowercase() yields `i` + U+0307.
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}
