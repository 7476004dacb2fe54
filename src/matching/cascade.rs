// src/matching/cascade.rs - Resolution of one raw name against the reference stores
//
// Tiers run in strict order and stop at the first hit:
//   skip filter -> exact map key -> map fuzzy (ratio) -> profile fuzzy
//   (partial ratio) -> acronym-gated map fuzzy (token set) -> live lookup
// A name that misses every tier bumps its failure counter and stays unmapped.

use crate::directory::DirectoryLookup;
use crate::matching::acronym::find_acronym;
use crate::matching::fuzzy::{extract_best, ScorerPolicy, SimilarityScorer, StrsimScorer};
use crate::matching::skip_filter::should_skip;
use crate::models::{CanonicalProfile, ResolutionOutcome, ResolutionTier, StoredProfile, SKIPPED_SENTINEL};
use crate::storage::ReferenceData;
use crate::utils::config::MatchThresholds;
use crate::utils::progress_bars::logging::ResolutionLogger;

pub struct ResolutionCascade<D: DirectoryLookup> {
    directory: D,
    scorer: Box<dyn SimilarityScorer>,
    thresholds: MatchThresholds,
    logger: ResolutionLogger,
}

impl<D: DirectoryLookup> ResolutionCascade<D> {
    pub fn new(directory: D, thresholds: MatchThresholds) -> Self {
        Self {
            directory,
            scorer: Box::new(StrsimScorer),
            thresholds,
            logger: ResolutionLogger::resolution(),
        }
    }

    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn thresholds(&self) -> MatchThresholds {
        self.thresholds
    }

    /// Decides and records the mapping for `name`. Mutates `data` in place;
    /// persisting it is up to the caller.
    pub async fn resolve(&self, name: &str, data: &mut ReferenceData) -> ResolutionOutcome {
        let outcome = self.run_tiers(name, data).await;
        self.logger.log_outcome(name, &outcome);
        outcome
    }

    async fn run_tiers(&self, name: &str, data: &mut ReferenceData) -> ResolutionOutcome {
        if should_skip(name) {
            data.map.insert(name, SKIPPED_SENTINEL.to_string());
            return ResolutionOutcome::Skipped;
        }

        if let Some(canonical) = data.map.get(name) {
            return ResolutionOutcome::Cached {
                canonical: canonical.clone(),
            };
        }

        let acronym = find_acronym(name);

        if let Some(outcome) = self.match_map(name, data, ResolutionTier::MapFuzzy) {
            return outcome;
        }
        if let Some(outcome) = self.match_profiles(name, data) {
            return outcome;
        }
        if !acronym.is_empty() {
            if let Some(outcome) = self.match_map(name, data, ResolutionTier::AcronymFuzzy) {
                return outcome;
            }
        }

        self.live_lookup(name, &acronym, data).await
    }

    /// Map-key tiers reuse the matched key's existing mapping.
    fn match_map(
        &self,
        name: &str,
        data: &mut ReferenceData,
        tier: ResolutionTier,
    ) -> Option<ResolutionOutcome> {
        let (policy, cutoff) = match tier {
            ResolutionTier::AcronymFuzzy => (ScorerPolicy::TokenSetRatio, self.thresholds.acronym),
            _ => (ScorerPolicy::Ratio, self.thresholds.map),
        };

        let (matched_key, score) = {
            let hit = extract_best(self.scorer.as_ref(), policy, name, data.map.keys(), cutoff)?;
            (hit.choice.to_string(), hit.score)
        };
        let canonical = data.map.get(&matched_key)?.clone();
        data.map.insert(name, canonical.clone());

        Some(ResolutionOutcome::Matched {
            tier,
            matched_key,
            canonical,
            score,
        })
    }

    /// Profile keys are canonical names, so a hit maps straight to the key.
    fn match_profiles(&self, name: &str, data: &mut ReferenceData) -> Option<ResolutionOutcome> {
        let (matched_key, score) = {
            let hit = extract_best(
                self.scorer.as_ref(),
                ScorerPolicy::PartialRatio,
                name,
                data.profiles.keys(),
                self.thresholds.profile,
            )?;
            (hit.choice.to_string(), hit.score)
        };
        data.map.insert(name, matched_key.clone());

        Some(ResolutionOutcome::Matched {
            tier: ResolutionTier::ProfileFuzzy,
            canonical: matched_key.clone(),
            matched_key,
            score,
        })
    }

    async fn live_lookup(&self, name: &str, acronym: &str, data: &mut ReferenceData) -> ResolutionOutcome {
        let mut via_acronym = false;
        let mut record = self.directory.search(name).await;
        if record.is_none() && !acronym.is_empty() {
            self.logger
                .log_debug(&format!("retrying lookup for '{}' with acronym '{}'", name, acronym));
            record = self.directory.search(acronym).await;
            via_acronym = record.is_some();
        }

        let Some(record) = record else {
            let count = data.failures.get_or_insert_with(name, || 0);
            *count += 1;
            return ResolutionOutcome::Failed {
                failure_count: *count,
            };
        };

        let canonical = canonical_name(&record.display_name, acronym);
        let profile = CanonicalProfile::from(record);
        match data.profiles.get_mut(&canonical) {
            Some(existing) => existing.data.merge_missing(profile),
            None => {
                data.profiles.insert(canonical.clone(), StoredProfile::new(profile));
            }
        }
        data.map.insert(name, canonical.clone());

        ResolutionOutcome::Discovered {
            canonical,
            via_acronym,
        }
    }
}

/// Official display name followed by the acronym found in the raw name.
pub fn canonical_name(display_name: &str, acronym: &str) -> String {
    format!("{} {}", display_name, acronym).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstitutionRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory directory that records every query.
    #[derive(Default)]
    struct StubDirectory {
        known: HashMap<String, InstitutionRecord>,
        queries: Mutex<Vec<String>>,
    }

    impl StubDirectory {
        fn with(entries: &[(&str, &str)]) -> Self {
            let known = entries
                .iter()
                .map(|(query, display_name)| {
                    (
                        query.to_string(),
                        InstitutionRecord {
                            id: Some(format!("https://openalex.org/{}", query)),
                            display_name: display_name.to_string(),
                            works_count: Some(100),
                            cited_by_count: Some(1000),
                            summary_stats: None,
                            geo: None,
                        },
                    )
                })
                .collect();
            Self {
                known,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DirectoryLookup for StubDirectory {
        async fn search(&self, name: &str) -> Option<InstitutionRecord> {
            self.queries.lock().unwrap().push(name.to_string());
            self.known.get(name).cloned()
        }
    }

    fn cascade(entries: &[(&str, &str)]) -> ResolutionCascade<StubDirectory> {
        ResolutionCascade::new(StubDirectory::with(entries), MatchThresholds::default())
    }

    const MIT_CANONICAL: &str = "Massachusetts Institute of Technology MIT";

    #[tokio::test]
    async fn test_skipped_names_never_reach_directory() {
        let cascade = cascade(&[]);
        let mut data = ReferenceData::default();

        let outcome = cascade.resolve("Hogwarts School", &mut data).await;

        assert_eq!(outcome, ResolutionOutcome::Skipped);
        assert_eq!(data.map.get("Hogwarts School").map(String::as_str), Some("skipped"));
        assert!(data.failures.is_empty());
        assert!(cascade.directory().queries().is_empty());
    }

    #[tokio::test]
    async fn test_new_acronym_name_is_discovered_live() {
        let cascade = cascade(&[("MIT", "Massachusetts Institute of Technology")]);
        let mut data = ReferenceData::default();

        let outcome = cascade.resolve("MIT", &mut data).await;

        assert_eq!(
            outcome,
            ResolutionOutcome::Discovered {
                canonical: MIT_CANONICAL.to_string(),
                via_acronym: false
            }
        );
        assert_eq!(data.map.get("MIT").map(String::as_str), Some(MIT_CANONICAL));
        let stored = data.profiles.get(MIT_CANONICAL).unwrap();
        assert_eq!(
            stored.data.display_name.as_deref(),
            Some("Massachusetts Institute of Technology")
        );
        assert_eq!(cascade.directory().queries(), vec!["MIT".to_string()]);
    }

    #[tokio::test]
    async fn test_case_variant_reuses_mapping_without_lookup() {
        let cascade = cascade(&[("MIT", "Massachusetts Institute of Technology")]);
        let mut data = ReferenceData::default();
        cascade.resolve("MIT", &mut data).await;

        let outcome = cascade.resolve("mit", &mut data).await;

        match outcome {
            ResolutionOutcome::Matched { tier, matched_key, canonical, .. } => {
                assert_eq!(tier, ResolutionTier::MapFuzzy);
                assert_eq!(matched_key, "MIT");
                assert_eq!(canonical, MIT_CANONICAL);
            }
            other => panic!("expected map match, got {:?}", other),
        }
        assert_eq!(data.map.get("mit").map(String::as_str), Some(MIT_CANONICAL));
        assert_eq!(cascade.directory().queries().len(), 1);
    }

    #[tokio::test]
    async fn test_resolving_twice_is_idempotent() {
        let cascade = cascade(&[("MIT", "Massachusetts Institute of Technology")]);
        let mut data = ReferenceData::default();

        let first = cascade.resolve("MIT", &mut data).await;
        let snapshot = data.clone();
        let second = cascade.resolve("MIT", &mut data).await;

        assert_eq!(first.canonical(), second.canonical());
        assert_eq!(second.tier(), ResolutionTier::ExactCache);
        assert_eq!(data, snapshot);
        assert_eq!(cascade.directory().queries().len(), 1);
    }

    #[tokio::test]
    async fn test_below_threshold_falls_through_to_lookup() {
        let cascade = cascade(&[]);
        let mut data = ReferenceData::default();
        data.map.insert("Stanford University", "Stanford University".to_string());

        let outcome = cascade.resolve("Stanford Univ", &mut data).await;

        assert_eq!(outcome, ResolutionOutcome::Failed { failure_count: 1 });
        assert_eq!(cascade.directory().queries(), vec!["Stanford Univ".to_string()]);
        assert!(!data.map.contains_key("Stanford Univ"));
    }

    #[tokio::test]
    async fn test_profile_tier_matches_partial_name() {
        let cascade = cascade(&[]);
        let mut data = ReferenceData::default();
        data.profiles.insert("University of California, Berkeley", StoredProfile::default());

        let outcome = cascade.resolve("Berkeley", &mut data).await;

        assert_eq!(outcome.tier(), ResolutionTier::ProfileFuzzy);
        assert_eq!(
            data.map.get("Berkeley").map(String::as_str),
            Some("University of California, Berkeley")
        );
        assert!(cascade.directory().queries().is_empty());
    }

    #[tokio::test]
    async fn test_acronym_tier_uses_token_set_match() {
        let cascade = cascade(&[]);
        let mut data = ReferenceData::default();
        data.map.insert(
            "UCLA Anderson School of Management",
            "University of California, Los Angeles UCLA".to_string(),
        );

        let outcome = cascade.resolve("UCLA Anderson", &mut data).await;

        assert_eq!(outcome.tier(), ResolutionTier::AcronymFuzzy);
        assert_eq!(
            outcome.canonical(),
            Some("University of California, Los Angeles UCLA")
        );
        assert!(cascade.directory().queries().is_empty());
    }

    #[tokio::test]
    async fn test_acronym_tier_requires_an_acronym() {
        let cascade = cascade(&[]);
        let mut data = ReferenceData::default();
        data.map.insert(
            "Anderson School of Management",
            "University of California, Los Angeles UCLA".to_string(),
        );

        let outcome = cascade.resolve("anderson school", &mut data).await;

        assert_eq!(outcome, ResolutionOutcome::Failed { failure_count: 1 });
        assert_eq!(cascade.directory().queries(), vec!["anderson school".to_string()]);
    }

    #[tokio::test]
    async fn test_lookup_retries_with_acronym() {
        let cascade = cascade(&[("KTH", "KTH Royal Institute of Technology")]);
        let mut data = ReferenceData::default();

        let outcome = cascade.resolve("KTH Royal Inst. Stockholm", &mut data).await;

        assert_eq!(
            outcome,
            ResolutionOutcome::Discovered {
                canonical: "KTH Royal Institute of Technology KTH".to_string(),
                via_acronym: true
            }
        );
        assert_eq!(
            cascade.directory().queries(),
            vec!["KTH Royal Inst. Stockholm".to_string(), "KTH".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failures_accumulate_across_runs() {
        let cascade = cascade(&[]);
        let mut data = ReferenceData::default();
        data.failures.insert("Nowhere State", 2);

        let outcome = cascade.resolve("Nowhere State", &mut data).await;

        assert_eq!(outcome, ResolutionOutcome::Failed { failure_count: 3 });
        assert_eq!(data.failures.get("Nowhere State"), Some(&3));
        assert!(!data.map.contains_key("Nowhere State"));
    }

    #[tokio::test]
    async fn test_discovery_merges_into_existing_profile() {
        let cascade = cascade(&[("Owls of Houston", "Rice University")]);
        let mut data = ReferenceData::default();
        data.profiles.insert(
            "Rice University",
            StoredProfile::new(CanonicalProfile {
                id: Some("I1".to_string()),
                display_name: Some("Rice University".to_string()),
                ..Default::default()
            }),
        );

        let outcome = cascade.resolve("Owls of Houston", &mut data).await;

        assert_eq!(outcome.canonical(), Some("Rice University"));
        assert_eq!(data.profiles.len(), 1);
        let stored = data.profiles.get("Rice University").unwrap();
        assert_eq!(stored.data.id.as_deref(), Some("I1"));
        assert_eq!(stored.data.works_count, Some(100));
    }

    #[test]
    fn test_canonical_name_trims_empty_acronym() {
        assert_eq!(canonical_name("Rice University", ""), "Rice University");
        assert_eq!(canonical_name("Texas A&M University", "A&M"), "Texas A&M University A&M");
    }
}
