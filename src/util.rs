use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::math::{Vec3, vec3};

/// Deterministic point in `[-1, 1]^3` derived from an id.
pub fn stable_triple(id: &str) -> Vec3 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let unit = |bits: u64| ((bits & 0x1f_ffff) as f64 / 0x1f_ffff as f64) as f32;
    let x = unit(hash);
    let y = unit(hash >> 21);
    let z = unit(hash >> 42);
    vec3((x * 2.0) - 1.0, (y * 2.0) - 1.0, (z * 2.0) - 1.0)
}

pub fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}
