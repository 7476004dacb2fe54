// src/matching/skip_filter.rs - Rule-based rejection of non-institution names
//
// Crowd-sourced free text carries high-frequency junk ("Any school",
// "Hogwarts") that is cheaper to drop here than to send to the directory.

const SKIP_PREFIXES: [&str; 2] = ["#", "*"];

const SKIP_EXACT: [&str; 11] = [
    "any", "college", "university", "the", "no", "at", "in", "a university", "university of",
    "general", "generic",
];

const SKIP_CONTAINS: [&str; 13] = [
    "ignore", "everywhere", "every", "other", "test", "prison", "reject", "file", "torture",
    "anyone ", "interview", "?", "hogwarts",
];

/// True when `name` is a placeholder, meta-commentary or too generic to be
/// a real institution. Case-insensitive; exact phrases compare after trimming.
pub fn should_skip(name: &str) -> bool {
    let lowered = name.to_lowercase();
    if SKIP_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return true;
    }
    if SKIP_EXACT.contains(&lowered.trim()) {
        return true;
    }
    SKIP_CONTAINS.iter().any(|sub| lowered.contains(sub))
}
