use std::collections::HashSet;

use regex::Regex;

/// Substring and regex matching shared by the detectors.
///
/// Substring checks are case-insensitive: needles are expected in lowercase
/// and haystacks are lowercased once at construction.
pub struct PatternMatcher {
    haystacks: Vec<(String, String)>,
}

impl PatternMatcher {
    /// Index a set of paths for repeated substring queries; repeated paths are kept once
    pub fn new<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        Self {
            haystacks: paths
                .into_iter()
                .filter(|p| seen.insert(*p))
                .map(|p| (p.to_string(), p.to_lowercase()))
                .collect(),
        }
    }

    /// Paths containing any of the needles, in input order
    pub fn paths_matching_any(&self, needles: &[&str]) -> Vec<&str> {
        self.haystacks
            .iter()
            .filter(|(_, lower)| contains_any(lower, needles))
            .map(|(original, _)| original.as_str())
            .collect()
    }
}

/// Whether `haystack` contains any needle
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Whether any regex in the set matches
pub fn matches_any_regex(text: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

/// Every non-empty capture of `group` across all matches of `pattern`
pub fn captures_of<'t>(pattern: &Regex, text: &'t str, group: usize) -> Vec<&'t str> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(group))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Captures of several groups joined with `separator`; matches missing a group are skipped
pub fn joined_captures(pattern: &Regex, text: &str, groups: &[usize], separator: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let parts: Option<Vec<&str>> = groups
                .iter()
                .map(|&g| caps.get(g).map(|m| m.as_str().trim()))
                .collect();
            parts.filter(|p| p.iter().all(|s| !s.is_empty()))
        })
        .map(|parts| parts.join(separator))
        .collect()
}
