//! Text normalization for matching
//!
//! Case-folds, drops punctuation and English stop-words, and reduces each
//! remaining token to a lemma. The stop-word and irregular-form tables are
//! process-wide statics built once on first use.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
        "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
        "amongst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything",
        "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became", "because",
        "become", "becomes", "becoming", "been", "before", "beforehand", "behind", "being",
        "below", "beside", "besides", "between", "beyond", "both", "bottom", "but", "by", "ca",
        "call", "can", "cannot", "could", "did", "do", "does", "doing", "done", "down", "due",
        "during", "each", "eight", "either", "eleven", "else", "elsewhere", "empty", "enough",
        "even", "ever", "every", "everyone", "everything", "everywhere", "except", "few",
        "fifteen", "fifty", "first", "five", "for", "former", "formerly", "forty", "four",
        "from", "front", "full", "further", "get", "give", "go", "had", "has", "have", "he",
        "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon", "hers", "herself",
        "him", "himself", "his", "how", "however", "hundred", "i", "if", "in", "indeed", "into",
        "is", "it", "its", "itself", "just", "keep", "last", "latter", "latterly", "least",
        "less", "made", "make", "many", "may", "me", "meanwhile", "might", "mine", "more",
        "moreover", "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely",
        "neither", "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone",
        "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one",
        "only", "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out",
        "over", "own", "part", "per", "perhaps", "please", "put", "quite", "rather", "re",
        "really", "regarding", "same", "say", "see", "seem", "seemed", "seeming", "seems",
        "serious", "several", "she", "should", "show", "side", "since", "six", "sixty", "so",
        "some", "somehow", "someone", "something", "sometime", "sometimes", "somewhere",
        "still", "such", "take", "ten", "than", "that", "the", "their", "them", "themselves",
        "then", "thence", "there", "thereafter", "thereby", "therefore", "therein",
        "thereupon", "these", "they", "third", "this", "those", "though", "three", "through",
        "throughout", "thru", "thus", "to", "together", "too", "top", "toward", "towards",
        "twelve", "twenty", "two", "under", "unless", "until", "up", "upon", "us", "used",
        "using", "various", "very", "via", "was", "we", "well", "were", "what", "whatever",
        "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein",
        "whereupon", "wherever", "whether", "which", "while", "whither", "who", "whoever",
        "whole", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet",
        "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Forms the suffix rules get wrong
static IRREGULAR: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("uses", "use"),
        ("gases", "gas"),
        ("analyses", "analysis"),
        ("apparatus", "apparatus"),
        ("children", "child"),
        ("heated", "heat"),
        ("heating", "heat"),
        ("heats", "heat"),
        ("added", "add"),
        ("adding", "add"),
        ("left", "leave"),
        ("kept", "keep"),
        ("ran", "run"),
        ("set", "set"),
        ("dried", "dry"),
        ("drying", "dry"),
        ("stirred", "stir"),
        ("stirring", "stir"),
    ]
    .into_iter()
    .collect()
});

/// Tokenizes and lemmatizes free text
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Lemmas of the non-stop-word tokens, in text order
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        WORD_RE
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| !is_stop_word(token))
            .map(lemmatize)
            .collect()
    }

    /// Normalized text joined by single spaces
    pub fn normalize_to_string(&self, text: &str) -> String {
        self.normalize(text).join(" ")
    }
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Reduce a lowercase token to its lemma
pub fn lemmatize(token: &str) -> String {
    if let Some(lemma) = IRREGULAR.get(token) {
        return (*lemma).to_string();
    }
    // Identifiers, numbers and very short words are left alone
    if token.len() <= 3 || token.chars().any(|c| c.is_ascii_digit() || c == '_') {
        return token.to_string();
    }

    if let Some(stem) = token.strip_suffix("ies") {
        if stem.len() >= 2 {
            return format!("{}y", stem);
        }
    }
    if let Some(stem) = token.strip_suffix("ied") {
        if stem.len() >= 2 {
            return format!("{}y", stem);
        }
    }
    if token.ends_with("sses") {
        return token[..token.len() - 2].to_string();
    }
    if let Some(stem) = token.strip_suffix("ing") {
        if stem.len() >= 3 && has_vowel(stem) {
            return restore_stem(stem);
        }
    }
    if let Some(stem) = token.strip_suffix("ed") {
        // speed, need, feed
        if stem.len() >= 3 && has_vowel(stem) && !token.ends_with("eed") {
            return restore_stem(stem);
        }
    }
    for suffix in ["xes", "ches", "shes", "zes"] {
        if token.ends_with(suffix) {
            return token[..token.len() - 2].to_string();
        }
    }
    if token.ends_with('s')
        && !token.ends_with("ss")
        && !token.ends_with("us")
        && !token.ends_with("is")
    {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn has_vowel(s: &str) -> bool {
    s.chars().any(is_vowel)
}

/// Undo spelling changes made when adding -ing / -ed
fn restore_stem(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();
    let last = chars[n - 1];

    // stirr -> stir, but keep fill, pass, buzz
    if n >= 2 && chars[n - 2] == last && !is_vowel(last) && !matches!(last, 'l' | 's' | 'z') {
        return chars[..n - 1].iter().collect();
    }

    // sourc -> source, remov -> remove, dispens -> dispense, evacuat -> evacuate
    let needs_e = matches!(last, 'c' | 'v')
        || stem.ends_with("ns")
        || stem.ends_with("rg")
        || stem.ends_with("dg")
        || stem.ends_with("yz")
        || stem.ends_with("iz")
        || (n >= 5 && (stem.ends_with("at") || stem.ends_with("ut")))
        || (n <= 4 && n >= 3 && is_cvc(&chars[n - 3..]));

    if needs_e {
        format!("{}e", stem)
    } else {
        stem.to_string()
    }
}

/// consonant-vowel-consonant ending (prim, elut) where the final letter is not w/x/y
fn is_cvc(tail: &[char]) -> bool {
    !is_vowel(tail[0]) && is_vowel(tail[1]) && !is_vowel(tail[2]) && !matches!(tail[2], 'w' | 'x' | 'y')
}
