// src/matching/acronym.rs
use once_cell::sync::Lazy;
use regex::Regex;

// 3+ uppercase/digit run, or a joined compound like A&M / M.I.T / UC-SD,
// or any parenthesised token like (MIT).
static ACRONYM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[A-Z0-9]{3,}|[A-Z0-9]+(?:[&./\-][A-Z0-9]+)+)\b|\(\b[A-Za-z0-9.\-]+\b\)")
        .expect("acronym pattern is valid")
});

/// Returns the leftmost acronym-looking token in `name`, or an empty string.
/// Parenthesised matches keep their parentheses. No dictionary check is made.
pub fn find_acronym(name: &str) -> String {
    ACRONYM_REGEX
        .find(name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_runs() {
        assert_eq!(find_acronym("MIT"), "MIT");
        assert_eq!(find_acronym("UCLA Anderson"), "UCLA");
        assert_eq!(find_acronym("ETH Zurich"), "ETH");
        assert_eq!(find_acronym("KTH"), "KTH");
    }

    #[test]
    fn test_joined_compounds() {
        assert_eq!(find_acronym("Texas A&M"), "A&M");
        assert_eq!(find_acronym("M.I.T"), "M.I.T");
        assert_eq!(find_acronym("UC-SD"), "UC-SD");
        assert_eq!(find_acronym("Univ. of N/A"), "N/A");
    }

    #[test]
    fn test_parenthesised_token_keeps_parens() {
        assert_eq!(find_acronym("Univ of Calif (ucb)"), "(ucb)");
        assert_eq!(find_acronym("University of Michigan (Ann Arbor)"), "");
    }

    #[test]
    fn test_leftmost_match_wins() {
        assert_eq!(find_acronym("UCSD (UC San Diego)"), "UCSD");
        assert_eq!(find_acronym("Georgia Tech (GT) GATECH"), "(GT)");
    }

    #[test]
    fn test_no_acronym() {
        assert_eq!(find_acronym("Georgia Tech"), "");
        assert_eq!(find_acronym("Univ. of Calif Berkeley"), "");
        assert_eq!(find_acronym("mit"), "");
        assert_eq!(find_acronym(""), "");
    }
}
