//! English noun lemmatizer backed by a word list.
//!
//! Lookup works the way WordNet's `morphy` does for nouns: an irregular form
//! is mapped through the exception list, otherwise each detachment rule is
//! tried and a candidate is only accepted if the result is a known noun.
//! Words the lexicon does not know (names, adverbs, rare words) come back
//! unchanged, so "dickens" stays "dickens" rather than losing its `s`.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

/// Base noun forms, one per line.
const LEXICON: &str = include_str!("../data/noun_lemmas.txt");
/// `inflected base` pairs, one per line, in WordNet `noun.exc` layout.
const EXCEPTIONS: &str = include_str!("../data/noun_exceptions.txt");

/// Suffix detachment rules for nouns, as `(suffix, replacement)`.
const RULES: &[(&str, &str)] = &[
    ("s", ""),
    ("ses", "s"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

lazy_static! {
    static ref NOUNS: HashSet<&'static str> = LEXICON.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    static ref IRREGULAR: HashMap<&'static str, &'static str> = EXCEPTIONS
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            Some((parts.next()?, parts.next()?))
        })
        .collect();
}

/// Reduce a lower-cased token to its base noun form.
///
/// When several bases are possible the shortest wins, ties broken
/// alphabetically. `lemmatize(lemmatize(w)) == lemmatize(w)` for every input.
pub fn lemmatize(token: &str) -> String {
    if let Some(base) = IRREGULAR.get(token) {
        return (*base).to_string();
    }
    let mut best: Option<String> = NOUNS.contains(token).then(|| token.to_string());
    for (suffix, replacement) in RULES {
        let Some(stem) = token.strip_suffix(suffix) else { continue };
        if stem.is_empty() { continue; }
        let candidate = format!("{stem}{replacement}");
        if !NOUNS.contains(candidate.as_str()) { continue; }
        let better = match &best {
            Some(b) => (candidate.len(), candidate.as_str()) < (b.len(), b.as_str()),
            None => true,
        };
        if better { best = Some(candidate); }
    }
    best.unwrap_or_else(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_plurals() {
        assert_eq!(lemmatize("books"), "book");
        assert_eq!(lemmatize("stories"), "story");
        assert_eq!(lemmatize("churches"), "church");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("classes"), "class");
        assert_eq!(lemmatize("ties"), "tie");
        assert_eq!(lemmatize("movies"), "movie");
        assert_eq!(lemmatize("cookies"), "cookie");
        assert_eq!(lemmatize("women"), "woman");
        assert_eq!(lemmatize("lenses"), "lens");
    }

    #[test]
    fn irregular_plurals() {
        assert_eq!(lemmatize("children"), "child");
        assert_eq!(lemmatize("wolves"), "wolf");
        assert_eq!(lemmatize("mice"), "mouse");
        assert_eq!(lemmatize("data"), "datum");
    }

    #[test]
    fn unknown_and_singular_words_pass_through() {
        for w in ["gatsby", "class", "bus", "analysis", "gas", "series", "news", "tolkien", "1984", "1980s"] {
            assert_eq!(lemmatize(w), w);
        }
    }

    #[test]
    fn names_and_adverbs_keep_their_s() {
        for w in ["dickens", "williams", "james", "charles", "always", "perhaps", "adams"] {
            assert_eq!(lemmatize(w), w);
        }
    }

    #[test]
    fn lexicon_entries_are_base_forms() {
        assert!(NOUNS.contains("hobbit"));
        assert!(!NOUNS.contains("william"));
        for word in NOUNS.iter() {
            assert_eq!(lemmatize(word), *word, "{word}");
        }
    }

    #[test]
    fn lemmatize_is_idempotent() {
        let words = [
            "books", "stories", "churches", "boxes", "classes", "ties", "flies", "children", "wolves",
            "expectations", "houses", "glasses", "indices", "data", "datas", "heroes", "sses", "ies", "xes",
            "dickens", "movies", "menus",
        ];
        for w in words {
            let once = lemmatize(w);
            assert_eq!(lemmatize(&once), once, "{w}");
        }
        for (inflected, _) in IRREGULAR.iter() {
            let once = lemmatize(inflected);
            assert_eq!(lemmatize(&once), once, "{inflected}");
        }
    }
}
