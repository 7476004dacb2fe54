// src/matching/fuzzy.rs - String similarity scoring for the cascade tiers
//
// Scores are on a 0-100 scale. Inputs are normalised first: lowercased,
// punctuation replaced by spaces, whitespace collapsed. An input that
// normalises to nothing scores 0 against everything.

use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

/// Which scoring rule a tier uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerPolicy {
    /// Whole-string similarity.
    Ratio,
    /// Best alignment of the shorter string inside the longer one.
    PartialRatio,
    /// Token-based, ignoring order and duplicates.
    TokenSetRatio,
}

pub trait SimilarityScorer: Send + Sync {
    fn ratio(&self, a: &str, b: &str) -> f64;
    fn partial_ratio(&self, a: &str, b: &str) -> f64;
    fn token_set_ratio(&self, a: &str, b: &str) -> f64;

    fn score(&self, policy: ScorerPolicy, a: &str, b: &str) -> f64 {
        match policy {
            ScorerPolicy::Ratio => self.ratio(a, b),
            ScorerPolicy::PartialRatio => self.partial_ratio(a, b),
            ScorerPolicy::TokenSetRatio => self.token_set_ratio(a, b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch<'a> {
    pub choice: &'a str,
    pub score: f64,
}

/// Top-1 search: the highest-scoring choice at or above `cutoff`. Ties keep
/// the earliest choice in iteration order.
pub fn extract_best<'a, I>(
    scorer: &dyn SimilarityScorer,
    policy: ScorerPolicy,
    query: &str,
    choices: I,
    cutoff: f64,
) -> Option<FuzzyMatch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<FuzzyMatch<'a>> = None;
    for choice in choices {
        let score = scorer.score(policy, query, choice);
        if score < cutoff {
            continue;
        }
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(FuzzyMatch { choice, score });
            if score >= 100.0 {
                break;
            }
        }
    }
    best
}

/// Default scorer built on normalised Levenshtein similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrsimScorer;

impl SimilarityScorer for StrsimScorer {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        let (a, b) = (normalize(a), normalize(b));
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        normalized_levenshtein(&a, &b) * 100.0
    }

    fn partial_ratio(&self, a: &str, b: &str) -> f64 {
        let (a, b) = (normalize(a), normalize(b));
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
        let distance = best_substring_distance(short, long);
        (1.0 - distance as f64 / short.len() as f64) * 100.0
    }

    fn token_set_ratio(&self, a: &str, b: &str) -> f64 {
        let (a, b) = (normalize(a), normalize(b));
        let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
        let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
        if tokens_a.is_empty() || tokens_b.is_empty() {
            return 0.0;
        }

        let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
        let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
        let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

        if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
            return 100.0;
        }

        let sect = intersection.join(" ");
        let diff_ab = diff_ab.join(" ");
        let diff_ba = diff_ba.join(" ");
        let combined_ab = join_nonempty(&sect, &diff_ab);
        let combined_ba = join_nonempty(&sect, &diff_ba);

        let mut best = levenshtein_score(&combined_ab, &combined_ba);
        if !sect.is_empty() {
            best = best
                .max(levenshtein_score(&sect, &combined_ab))
                .max(levenshtein_score(&sect, &combined_ba));
        }
        best
    }
}

/// Lowercase, punctuation to spaces, collapsed whitespace.
pub fn normalize(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn levenshtein_score(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

/// Smallest edit distance between `needle` and any substring of `haystack`.
fn best_substring_distance(needle: &[char], haystack: &[char]) -> usize {
    let m = needle.len();
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut cur = vec![0usize; m + 1];
    let mut best = prev[m];

    for &h in haystack {
        cur[0] = 0;
        for i in 1..=m {
            let cost = if needle[i - 1] == h { 0 } else { 1 };
            cur[i] = (prev[i - 1] + cost).min(prev[i] + 1).min(cur[i - 1] + 1);
        }
        best = best.min(cur[m]);
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Univ. of  Calif, Berkeley "), "univ of calif berkeley");
        assert_eq!(normalize("Texas A&M"), "texas a m");
        assert_eq!(normalize("?!"), "");
    }

    #[test]
    fn test_ratio_case_and_whitespace_insensitive() {
        let scorer = StrsimScorer;
        assert_eq!(scorer.ratio("MIT", "mit"), 100.0);
        assert_eq!(scorer.ratio("Stanford  University", "stanford university"), 100.0);
        assert!(scorer.ratio("Stanford Universty", "Stanford University") >= 90.0);
        assert!(scorer.ratio("Stanford", "Harvard") < 90.0);
        assert_eq!(scorer.ratio("", "MIT"), 0.0);
    }

    #[test]
    fn test_partial_ratio_finds_substring() {
        let scorer = StrsimScorer;
        assert_eq!(
            scorer.partial_ratio("Berkeley", "University of California, Berkeley"),
            100.0
        );
        assert_eq!(
            scorer.partial_ratio("University of California, Berkeley", "Berkeley"),
            100.0
        );
        assert!(scorer.partial_ratio("Berkely", "University of California, Berkeley") < 95.0);
        assert!(scorer.partial_ratio("Princeton", "University of California, Berkeley") < 50.0);
    }

    #[test]
    fn test_token_set_ratio_ignores_order_and_duplicates() {
        let scorer = StrsimScorer;
        assert_eq!(
            scorer.token_set_ratio("Michigan State University", "University Michigan State"),
            100.0
        );
        assert_eq!(scorer.token_set_ratio("NYU NYU Stern", "Stern NYU"), 100.0);
        assert_eq!(scorer.token_set_ratio("UCLA", "UCLA Anderson School"), 100.0);
        assert!(scorer.token_set_ratio("Boston University", "Boston College") < 95.0);
        assert_eq!(scorer.token_set_ratio("", "UCLA"), 0.0);
    }

    #[test]
    fn test_extract_best_respects_cutoff_and_order() {
        let scorer = StrsimScorer;
        let choices = ["Harvard", "mit", "MIT"];

        let hit = extract_best(&scorer, ScorerPolicy::Ratio, "MIT", choices, 90.0).unwrap();
        assert_eq!(hit.choice, "mit");
        assert_eq!(hit.score, 100.0);

        assert!(extract_best(&scorer, ScorerPolicy::Ratio, "Yale", choices, 90.0).is_none());
        assert!(extract_best(&scorer, ScorerPolicy::Ratio, "MIT", Vec::<&str>::new(), 0.0).is_none());
    }

    #[test]
    fn test_extract_best_prefers_higher_score() {
        let scorer = StrsimScorer;
        let choices = ["Stanford Universit", "Stanford University"];
        let hit = extract_best(&scorer, ScorerPolicy::Ratio, "Stanford University", choices, 90.0)
            .unwrap();
        assert_eq!(hit.choice, "Stanford University");
    }

    #[test]
    fn test_best_substring_distance() {
        let needle: Vec<char> = "abc".chars().collect();
        let haystack: Vec<char> = "xxabdxx".chars().collect();
        assert_eq!(best_substring_distance(&needle, &haystack), 1);
        let exact: Vec<char> = "zzabczz".chars().collect();
        assert_eq!(best_substring_distance(&needle, &exact), 0);
    }
}
