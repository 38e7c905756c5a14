//! Title stage helpers: keyword and candidate parsing, banned-term filtering
//! and shortlist fallback.
//!
//! All matching happens on folded text: lowercase, Unicode NFD with combining
//! marks removed, anything that is not alphanumeric replaced by a space.

use crate::generation::text::{normalize_text, strip_list_marker};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_MAX_KEYWORDS: usize = 12;

/// Fold text for case and accent insensitive comparison.
pub fn fold_for_matching(text: &str) -> String {
    let stripped: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a keyword reply on commas and newlines.
pub fn parse_keywords(raw: &str, max: usize) -> Vec<String> {
    raw.split([',', '\n'])
        .map(|item| trim_quotes(strip_list_marker(item)))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .take(max)
        .collect()
}

/// One entry per non-empty line, numbering and quotes removed.
pub fn parse_numbered_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| trim_quotes(strip_list_marker(line)))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn numbered_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn trim_quotes(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '«' | '»' | '*'))
        .trim()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BannedTerm {
    Word(String),
    Prefix(String),
}

impl BannedTerm {
    fn parse(raw: &str) -> Option<Self> {
        let (body, prefix) = match raw.trim().strip_suffix('*') {
            Some(body) => (body, true),
            None => (raw.trim(), false),
        };
        let folded = fold_for_matching(body);
        if folded.is_empty() {
            return None;
        }
        Some(if prefix {
            BannedTerm::Prefix(folded)
        } else {
            BannedTerm::Word(folded)
        })
    }

    fn matches(&self, word: &str) -> bool {
        match self {
            BannedTerm::Word(term) => word == term,
            BannedTerm::Prefix(term) => word.starts_with(term.as_str()),
        }
    }
}

/// Banned-term filter and keyword shortlist for title candidates.
#[derive(Debug, Clone)]
pub struct TitleFilter {
    banned: Vec<BannedTerm>,
}

impl TitleFilter {
    /// `terms` ending in `*` match any word they prefix; others match whole words.
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Self {
        Self {
            banned: terms
                .iter()
                .filter_map(|t| BannedTerm::parse(t.as_ref()))
                .collect(),
        }
    }

    pub fn contains_banned(&self, text: &str) -> bool {
        let folded = fold_for_matching(text);
        folded
            .split(' ')
            .any(|word| self.banned.iter().any(|term| term.matches(word)))
    }

    /// Candidates in preference order.
    ///
    /// Clean candidates covering enough keywords come first; when none do, all
    /// clean candidates; when every candidate is banned, the unfiltered list.
    pub fn shortlist(&self, candidates: &[String], keywords: &[String]) -> Vec<String> {
        let clean: Vec<String> = candidates
            .iter()
            .filter(|c| !self.contains_banned(c))
            .cloned()
            .collect();

        let folded_keywords: Vec<String> = keywords
            .iter()
            .map(|k| fold_for_matching(k))
            .filter(|k| !k.is_empty())
            .collect();
        let required = folded_keywords.len().min(2);

        let covering: Vec<String> = if required == 0 {
            Vec::new()
        } else {
            clean
                .iter()
                .filter(|c| keyword_hits(c, &folded_keywords) >= required)
                .cloned()
                .collect()
        };

        if !covering.is_empty() {
            covering
        } else if !clean.is_empty() {
            clean
        } else {
            candidates.to_vec()
        }
    }

    /// Resolve the selection reply against the shortlist.
    ///
    /// Returns `None` only when the shortlist is empty and the reply unusable.
    pub fn resolve_selection(&self, reply: &str, shortlist: &[String]) -> Option<String> {
        let normalized = normalize_text(reply);
        let chosen = normalized
            .lines()
            .map(|line| trim_quotes(strip_list_marker(line)))
            .find(|line| !line.is_empty())
            .map(str::to_string);
        let first_clean = shortlist.iter().find(|c| !self.contains_banned(c)).cloned();

        match chosen {
            Some(title) if !self.contains_banned(&title) => Some(title),
            Some(title) => first_clean.or(Some(title)),
            None => first_clean.or_else(|| shortlist.first().cloned()),
        }
    }
}

fn keyword_hits(candidate: &str, folded_keywords: &[String]) -> usize {
    let folded = fold_for_matching(candidate);
    folded_keywords
        .iter()
        .filter(|kw| folded.contains(kw.as_str()))
        .count()
}
