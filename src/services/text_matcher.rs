use crate::models::recognition::{MatchOrigin, MatchTier};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn disallowed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Z' \-.]").expect("valid allow-list regex"))
}

/// Characters the OCR engine is known to confuse with letters
fn ocr_substitute(c: char) -> char {
    match c {
        '!' => 'L',
        '+' => 'T',
        '|' => 'I',
        other => other,
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'Ç' => 'C',
        'Ñ' => 'N',
        'Ý' => 'Y',
        other => other,
    }
}

/// Normalize text for comparison. `from_ocr` additionally applies OCR
/// confusable substitutions, which never apply to catalog text.
pub fn normalize(text: &str, from_ocr: bool) -> String {
    let substituted: String = if from_ocr {
        text.chars().map(ocr_substitute).collect()
    } else {
        text.to_string()
    };
    let folded: String = substituted.to_uppercase().chars().map(fold_accent).collect();

    let collapsed = whitespace_re().replace_all(&folded, " ");
    let stripped = disallowed_re().replace_all(&collapsed, "");
    whitespace_re().replace_all(&stripped, " ").trim().to_string()
}

/// Multiset character Jaccard index in `[0, 1]`
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let count = |s: &str| {
        let mut counts: HashMap<char, usize> = HashMap::new();
        for c in s.chars() {
            *counts.entry(c).or_default() += 1;
        }
        counts
    };
    let counts_a = count(a);
    let counts_b = count(b);

    let mut intersection = 0usize;
    let mut union = 0usize;
    for (c, &n_a) in &counts_a {
        let n_b = counts_b.get(c).copied().unwrap_or(0);
        intersection += n_a.min(n_b);
        union += n_a.max(n_b);
    }
    for (c, &n_b) in &counts_b {
        if !counts_a.contains_key(c) {
            union += n_b;
        }
    }

    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Compare raw OCR output to a catalog string
pub fn classify(rough_text: &str, target_text: &str, threshold: f64) -> (MatchTier, f64) {
    compare_normalized(&normalize(rough_text, true), &normalize(target_text, false), threshold)
}

fn compare_normalized(rough: &str, target: &str, threshold: f64) -> (MatchTier, f64) {
    let similarity = jaccard_similarity(rough, target);
    let tier = if similarity < threshold {
        MatchTier::NoMatch
    } else if rough == target {
        MatchTier::PerfectMatch
    } else {
        MatchTier::GoodMatch
    };
    (tier, similarity)
}

/// Find the catalog candidate best matching `rough_text`.
///
/// Fingerprint-origin text is already high confidence and only accepts an
/// exact normalized match. OCR-origin text returns on the first perfect match,
/// otherwise the best (exhaustive) or first good match.
pub fn find_best<'a, T, I, F>(
    origin: MatchOrigin,
    rough_text: &str,
    candidates: I,
    name_of: F,
    threshold: f64,
    exhaustive: bool,
) -> (MatchTier, Option<&'a T>)
where
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> &str,
{
    if rough_text.trim().is_empty() {
        return (MatchTier::NoMatch, None);
    }

    match origin {
        MatchOrigin::None => (MatchTier::NoMatch, None),
        MatchOrigin::Fingerprint => {
            let rough = normalize(rough_text, false);
            candidates
                .into_iter()
                .find(|candidate| normalize(name_of(candidate), false) == rough)
                .map_or((MatchTier::NoMatch, None), |candidate| {
                    (MatchTier::PerfectMatch, Some(candidate))
                })
        }
        MatchOrigin::Ocr => {
            let rough = normalize(rough_text, true);
            let mut best: Option<(&'a T, f64)> = None;

            for candidate in candidates {
                let target = normalize(name_of(candidate), false);
                match compare_normalized(&rough, &target, threshold) {
                    (MatchTier::PerfectMatch, _) => {
                        return (MatchTier::PerfectMatch, Some(candidate));
                    }
                    (MatchTier::GoodMatch, similarity) => {
                        if !exhaustive {
                            return (MatchTier::GoodMatch, Some(candidate));
                        }
                        if best.map_or(true, |(_, best_similarity)| similarity > best_similarity) {
                            best = Some((candidate, similarity));
                        }
                    }
                    (MatchTier::NoMatch, _) => {}
                }
            }

            best.map_or((MatchTier::NoMatch, None), |(candidate, _)| {
                (MatchTier::GoodMatch, Some(candidate))
            })
        }
    }
}
