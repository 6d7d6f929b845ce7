use std::{collections::HashSet, sync::LazyLock};

///
/// RESERVED_WORDS
/// rust keywords plus the names generated code binds itself
///

static RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut words = Vec::new();

    // rust
    // https://doc.rust-lang.org/reference/keywords.html
    words.extend(vec![
        "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn",
        "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
        "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type",
        "unsafe", "use", "where", "while", "async", "await", "dyn", "abstract", "become", "box",
        "do", "final", "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
    ]);

    // generated code
    // `markup` would make `parse_markup` collide with the record's parse entry point
    words.extend(vec!["markup"]);

    words.into_iter().collect()
});

/// Check if an identifier is a reserved word.
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(word)
}
