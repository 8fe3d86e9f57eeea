use crate::lemmatizer::lemmatize;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Word runs, kept whole across internal hyphens, periods and apostrophes
    // ("e-mail", "3.5", "o'brien"), or runs of symbols. Joined and symbol
    // tokens are rejected below by the alphanumeric check.
    static ref RE: Regex = Regex::new(r"(?u)\w+(?:[-.'’]\w+)*|[^\w\s]+").expect("valid regex");
    static ref ENGLISH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","ain","all","am","an","and","any","are","aren","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","couldn","couldn't",
            "d","did","didn","didn't","do","does","doesn","doesn't","doing","don","don't","down","during",
            "each","few","for","from","further",
            "had","hadn","hadn't","has","hasn","hasn't","have","haven","haven't","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","isn","isn't","it","it's","its","itself",
            "just","ll","m","ma","me","mightn","mightn't","more","most","mustn","mustn't","my","myself",
            "needn","needn't","no","nor","not","now",
            "o","of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
            "re","s","same","shan","shan't","she","she's","should","should've","shouldn","shouldn't","so","some","such",
            "t","than","that","that'll","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","wasn't","we","were","weren","weren't","what","when","where","which","while","who","whom","why","will","with","won","won't","wouldn","wouldn't",
            "y","you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Which stopwords are removed before a token becomes a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Stopwords {
    /// The NLTK English list.
    #[default]
    English,
    None,
    /// Caller supplied list; entries are lower-cased on use.
    Custom(Vec<String>),
}

/// Contraction endings after the apostrophe; "n't" is handled on its own.
const CLITICS: &[&str] = &["s", "re", "ve", "ll", "d", "m"];

/// Upper bound on re-stemming; Snowball output settles in two or three passes.
const MAX_STEM_PASSES: usize = 8;

/// How a surviving token is reduced to its term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TermReducer {
    /// Dictionary base form, part-of-speech agnostic.
    #[default]
    Lemma,
    /// Snowball English stemming.
    Stem,
    None,
}

/// Everything that decides how text becomes terms.
///
/// An index stores the config it was built with, so queries against it are
/// normalized the same way even after a reload from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub stopwords: Stopwords,
    pub reducer: TermReducer,
    /// Apply NFKC compatibility folding before lower-casing.
    pub unicode_nfkc: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { stopwords: Stopwords::English, reducer: TermReducer::Lemma, unicode_nfkc: true }
    }
}

/// Turns raw text into index-ready terms.
///
/// Immutable once constructed; share it behind an `Arc`.
pub struct Normalizer {
    config: NormalizerConfig,
    custom_stopwords: HashSet<String>,
    stemmer: Option<Stemmer>,
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer").field("config", &self.config).finish()
    }
}

impl Default for Normalizer {
    fn default() -> Self { Self::new(NormalizerConfig::default()) }
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let custom_stopwords = match &config.stopwords {
            Stopwords::Custom(words) => words.iter().map(|w| w.to_lowercase()).collect(),
            _ => HashSet::new(),
        };
        let stemmer = match config.reducer {
            TermReducer::Stem => Some(Stemmer::create(Algorithm::English)),
            _ => None,
        };
        Self { config, custom_stopwords, stemmer }
    }

    pub fn config(&self) -> &NormalizerConfig { &self.config }

    fn is_stopword(&self, token: &str) -> bool {
        match &self.config.stopwords {
            Stopwords::English => ENGLISH_STOPWORDS.contains(token),
            Stopwords::None => false,
            Stopwords::Custom(_) => self.custom_stopwords.contains(token),
        }
    }

    fn reduce(&self, token: &str) -> String {
        let reduced = match (self.config.reducer, &self.stemmer) {
            (TermReducer::Lemma, _) => lemmatize(token),
            (TermReducer::Stem, Some(stemmer)) => stem_to_fixpoint(stemmer, token),
            _ => return token.to_string(),
        };
        // A reduction must not turn a kept token into one that would have been dropped.
        if reduced.is_empty() || self.is_stopword(&reduced) {
            token.to_string()
        } else {
            reduced
        }
    }

    /// Normalize text into an ordered sequence of terms.
    ///
    /// Lower-cases, splits on word boundaries, drops tokens that are not entirely
    /// alphanumeric, drops stopwords and reduces the rest. Duplicates are kept.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let folded = if self.config.unicode_nfkc { text.nfkc().collect::<String>() } else { text.to_string() };
        let lowered = folded.to_lowercase();
        let mut terms = Vec::new();
        for mat in RE.find_iter(&lowered) {
            let token = strip_clitic(mat.as_str());
            if !token.chars().all(char::is_alphanumeric) { continue; }
            if self.is_stopword(token) { continue; }
            terms.push(self.reduce(token));
        }
        terms
    }
}

/// Drop a contraction ending: "gatsby's" -> "gatsby", "don't" -> "do".
///
/// The ending itself is never alphanumeric, so it would not survive as a term.
fn strip_clitic(token: &str) -> &str {
    let Some((pos, quote)) = token.char_indices().rev().find(|(_, c)| matches!(c, '\'' | '\u{2019}')) else {
        return token;
    };
    let ending = &token[pos + quote.len_utf8()..];
    if ending == "t" && pos > 1 && token[..pos].ends_with('n') {
        return &token[..pos - 1];
    }
    if pos > 0 && CLITICS.contains(&ending) { &token[..pos] } else { token }
}

/// Stem until the output stops changing.
///
/// Snowball is not idempotent ("agreed" -> "agre" -> "agr"); stored terms are
/// fed back through the normalizer on reload and for queries, so a term must
/// be a fixed point.
fn stem_to_fixpoint(stemmer: &Stemmer, token: &str) -> String {
    let mut current = stemmer.stem(token).into_owned();
    for _ in 0..MAX_STEM_PASSES {
        let next = stemmer.stem(&current);
        if next == current.as_str() { break; }
        current = next.into_owned();
    }
    current
}

/// Render normalized terms back into text, space separated.
pub fn terms_as_text(terms: &[String]) -> String { terms.join(" ") }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_normalize() {
        let n = Normalizer::default();
        let t = n.normalize("The Hobbits, and their BOOKS!");
        assert_eq!(t, vec!["hobbit", "book"]);
    }

    #[test]
    fn rejects_mixed_symbol_tokens() {
        let n = Normalizer::default();
        let t = n.normalize("snake_case ... c++ rust 2024 e-mail sci-fi 3.5");
        assert_eq!(t, vec!["c", "rust", "2024"]);
    }

    #[test]
    fn possessives_and_contractions_are_split() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Gatsby's world"), vec!["gatsby", "world"]);
        assert_eq!(n.normalize("Gatsby\u{2019}s world"), vec!["gatsby", "world"]);
        assert_eq!(n.normalize("they're hobbits"), vec!["hobbit"]);
        // no contraction ending: kept whole and dropped
        assert!(n.normalize("O'Brien").is_empty());
    }

    #[test]
    fn empty_input_is_empty_output() {
        let n = Normalizer::default();
        assert!(n.normalize("").is_empty());
        assert!(n.normalize("   ?! ,, ").is_empty());
    }

    #[test]
    fn contractions_fall_out_as_stopwords() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("don't stop"), vec!["stop"]);
    }

    #[test]
    fn stem_mode_uses_snowball() {
        let n = Normalizer::new(NormalizerConfig { reducer: TermReducer::Stem, ..Default::default() });
        assert_eq!(n.normalize("running runners"), vec!["run", "runner"]);
    }

    #[test]
    fn stemming_settles_on_a_fixed_point() {
        let n = Normalizer::new(NormalizerConfig { reducer: TermReducer::Stem, ..Default::default() });
        let once = n.normalize("generously agreed");
        assert_eq!(once, vec!["generous", "agr"]);
        assert_eq!(n.normalize(&terms_as_text(&once)), once);
    }

    #[test]
    fn custom_stopwords_replace_the_english_list() {
        let n = Normalizer::new(NormalizerConfig {
            stopwords: Stopwords::Custom(vec!["Book".into()]),
            reducer: TermReducer::None,
            unicode_nfkc: true,
        });
        assert_eq!(n.normalize("the book"), vec!["the"]);
    }
}
