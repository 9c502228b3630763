//! Text normalization for string columns.
//!
//! Language-specific knowledge (stop words, lemmas) sits behind the
//! [`TextNormalizer`] trait; [`EnglishNormalizer`] is the built-in.

use super::types::CleaningOptions;
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization as _;

pub trait TextNormalizer: Send + Sync {
    fn is_stop_word(&self, word: &str) -> bool;

    fn lemmatize(&self, word: &str) -> String;
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct TextOptions {
    pub remove_accents: bool,
    pub to_lowercase: bool,
    pub remove_special_chars: bool,
    pub remove_stopwords: bool,
    pub lemmatize: bool,
}

impl From<&CleaningOptions> for TextOptions {
    fn from(options: &CleaningOptions) -> Self {
        Self {
            remove_accents: options.remove_accents,
            to_lowercase: options.to_lowercase,
            remove_special_chars: options.remove_special_chars,
            remove_stopwords: options.remove_stopwords,
            lemmatize: options.lemmatize,
        }
    }
}

/// Apply the enabled text steps and re-join the words with single spaces.
pub fn normalize_text(text: &str, options: &TextOptions, normalizer: &dyn TextNormalizer) -> String {
    let mut value = if options.remove_accents {
        text.nfkd().filter(char::is_ascii).collect()
    } else {
        text.to_owned()
    };
    if options.to_lowercase {
        value = value.to_lowercase();
    }
    if options.remove_special_chars {
        value = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
            .collect();
    }

    value
        .split_whitespace()
        .filter(|word| !(options.remove_stopwords && normalizer.is_stop_word(word)))
        .map(|word| {
            if options.lemmatize {
                normalizer.lemmatize(word)
            } else {
                word.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("people", "person"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("criteria", "criterion"),
    ("phenomena", "phenomenon"),
    ("analyses", "analysis"),
    ("indices", "index"),
    ("leaves", "leaf"),
    ("knives", "knife"),
    ("wives", "wife"),
    ("lives", "life"),
    ("halves", "half"),
];

/// English stop words and a rule-based noun lemmatizer.
///
/// Lemmatization reduces plural nouns to their singular form; words with
/// capitals, digits or fewer than four letters are left alone.
#[derive(Debug, Clone)]
pub struct EnglishNormalizer {
    stop_words: HashSet<&'static str>,
    irregular: HashMap<&'static str, &'static str>,
}

impl Default for EnglishNormalizer {
    fn default() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
            irregular: IRREGULAR_PLURALS.iter().copied().collect(),
        }
    }
}

impl TextNormalizer for EnglishNormalizer {
    fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word.to_lowercase().as_str())
    }

    fn lemmatize(&self, word: &str) -> String {
        if let Some(lemma) = self.irregular.get(word) {
            return (*lemma).to_owned();
        }
        if word.len() < 4 || !word.chars().all(|c| c.is_ascii_lowercase()) {
            return word.to_owned();
        }

        const RULES: &[(&str, &str)] = &[
            ("sses", "ss"),
            ("ies", "y"),
            ("xes", "x"),
            ("zes", "z"),
            ("ches", "ch"),
            ("shes", "sh"),
        ];
        for (suffix, replacement) in RULES {
            if let Some(stem) = word.strip_suffix(suffix) {
                return format!("{stem}{replacement}");
            }
        }

        if ["ss", "us", "is"].iter().any(|end| word.ends_with(end)) {
            return word.to_owned();
        }
        word.strip_suffix('s').unwrap_or(word).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_on() -> TextOptions {
        TextOptions {
            remove_accents: true,
            to_lowercase: true,
            remove_special_chars: true,
            remove_stopwords: true,
            lemmatize: true,
        }
    }

    #[test]
    fn test_full_normalization() {
        let normalizer = EnglishNormalizer::default();
        let out = normalize_text("The Cafés are  selling BOXES of berries!", &all_on(), &normalizer);
        assert_eq!(out, "cafe selling box berry");
    }

    #[test]
    fn test_only_whitespace_when_nothing_enabled() {
        let normalizer = EnglishNormalizer::default();
        let out = normalize_text("  Mixed\tCase  Text ", &TextOptions::default(), &normalizer);
        assert_eq!(out, "Mixed Case Text");
    }

    #[test]
    fn test_lemmatizer_rules() {
        let n = EnglishNormalizer::default();
        assert_eq!(n.lemmatize("classes"), "class");
        assert_eq!(n.lemmatize("cities"), "city");
        assert_eq!(n.lemmatize("children"), "child");
        assert_eq!(n.lemmatize("status"), "status");
        assert_eq!(n.lemmatize("orders"), "order");
        assert_eq!(n.lemmatize("bus"), "bus");
        assert_eq!(n.lemmatize("Orders"), "Orders");
    }
}
