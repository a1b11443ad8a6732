use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Replacements applied before decomposition. `Ã` maps to lowercase `a`
/// because it only ever shows up as mojibake inside lowercase names.
const ACCENT_TABLE: &[(char, &str)] = &[
    ('Á', "A"),
    ('á', "a"),
    ('É', "E"),
    ('é', "e"),
    ('Í', "I"),
    ('í', "i"),
    ('Ó', "O"),
    ('ó', "o"),
    ('Ú', "U"),
    ('ú', "u"),
    ('Ü', "U"),
    ('ü', "u"),
    ('Ñ', "N"),
    ('ñ', "n"),
    ('Ç', "C"),
    ('ç', "c"),
    ('Ã', "a"),
];

/// Fold text to plain ASCII: table lookup, then NFKD with combining marks
/// removed, then anything still outside ASCII is dropped. Result is trimmed.
pub fn fold_to_ascii(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| {
            ACCENT_TABLE
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| (*to).to_string())
                .unwrap_or_else(|| c.to_string())
        })
        .collect();

    let folded: String = mapped
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .collect();

    folded.trim().to_string()
}

/// Trim whitespace and strip one pair of surrounding double quotes.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}
