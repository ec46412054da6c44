//! Answer key matching
//!
//! Matches a detected exam code against the registry. Comparison is
//! case- and whitespace-insensitive and uses two-way containment, so
//! "SKE 1" on a paper matches a key filed under "SKE1" and vice versa.
//! The first hit in registry order (newest first) wins.

use crate::models::AnswerKey;

/// Minimum similarity for a near-miss suggestion
const NEAR_MISS_THRESHOLD: f64 = 0.75;

/// Normalize an exam code for comparison: strip all whitespace, uppercase.
pub fn normalize_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Find the first key matching a detected code.
///
/// Containment runs both ways. Codes that normalize to empty never match:
/// an empty detected code returns no match rather than matching every key,
/// and keys with empty codes are skipped.
pub fn find_match<'a>(detected_code: &str, keys: &'a [AnswerKey]) -> Option<&'a AnswerKey> {
    let detected = normalize_code(detected_code);
    if detected.is_empty() {
        return None;
    }

    keys.iter().find(|key| {
        let key_code = normalize_code(&key.code);
        !key_code.is_empty() && (detected.contains(&key_code) || key_code.contains(&detected))
    })
}

/// Suggest the closest known code when matching failed.
///
/// Returns the display code of the most similar key when it clears the
/// similarity threshold; used to enrich no-match error messages.
pub fn nearest_code(detected_code: &str, keys: &[AnswerKey]) -> Option<String> {
    let detected = normalize_code(detected_code);
    if detected.is_empty() {
        return None;
    }

    keys.iter()
        .filter_map(|key| {
            let key_code = normalize_code(&key.code);
            if key_code.is_empty() {
                return None;
            }
            let similarity = strsim::jaro_winkler(&detected, &key_code);
            if similarity >= NEAR_MISS_THRESHOLD {
                Some((key.code.clone(), similarity))
            } else {
                None
            }
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(code, _)| code)
}
