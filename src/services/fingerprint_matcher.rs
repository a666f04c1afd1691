use crate::models::frame::Fingerprint;
use std::collections::HashMap;

/// Fraction of reference ink missing from the live sample
pub fn fn_rate(live: &Fingerprint, reference: &Fingerprint) -> f64 {
    if reference.is_empty() {
        return 1.0;
    }
    reference.count_missing_from(live) as f64 / reference.len() as f64
}

/// Fraction of live ink not present in the reference
pub fn fp_rate(live: &Fingerprint, reference: &Fingerprint) -> f64 {
    if live.is_empty() {
        return 1.0;
    }
    live.count_missing_from(reference) as f64 / live.len() as f64
}

/// Find the stored fingerprint matching `live` within the asymmetric
/// tolerances (both inclusive).
///
/// Exhaustive search returns the qualifying candidate with the lowest FN
/// rate, otherwise the first qualifying one. Candidates are visited in name
/// order. Live samples under the pixel floor never match.
pub fn match_fingerprint(
    live: &Fingerprint,
    candidates: &HashMap<String, Fingerprint>,
    fn_tolerance: f64,
    fp_tolerance: f64,
    exhaustive: bool,
) -> Option<String> {
    if !live.is_trustworthy() {
        return None;
    }

    let mut names: Vec<&String> = candidates.keys().collect();
    names.sort();

    let mut best: Option<(&String, f64)> = None;
    for name in names {
        let reference = &candidates[name];
        let missing = fn_rate(live, reference);
        if missing > fn_tolerance || fp_rate(live, reference) > fp_tolerance {
            continue;
        }
        if !exhaustive {
            return Some(name.clone());
        }
        if best.map_or(true, |(_, best_rate)| missing < best_rate) {
            best = Some((name, missing));
        }
    }

    best.map(|(name, _)| name.clone())
}
