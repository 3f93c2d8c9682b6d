//! Weighted string similarity used to spot duplicate companies and leads.
//!
//! The score combines three signals: edit distance between normalized names,
//! equality of normalized web domains and equality of digit-only phone
//! numbers. Weights are renormalized over the signals both records carry, so a
//! pair with no domains or phones is judged on the name alone.

use serde::{Deserialize, Serialize};

/// Legal-form tokens that do not distinguish one company from another.
const LEGAL_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "llc",
    "ltd",
    "limited",
    "gmbh",
    "corp",
    "corporation",
    "co",
    "company",
    "plc",
    "sa",
    "ag",
    "bv",
    "oy",
];

/// Relative importance of each similarity signal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimilarityWeights {
    pub name: f64,
    pub domain: f64,
    pub phone: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            name: 0.5,
            domain: 0.3,
            phone: 0.2,
        }
    }
}

/// Tunables for duplicate detection, loaded from configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DuplicateSettings {
    pub weights: SimilarityWeights,
    /// Score (0.0..=1.0) a record must exceed to be reported as a candidate.
    pub threshold: f64,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            threshold: 0.75,
        }
    }
}

/// Comparable projection of a record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchProfile {
    pub name: String,
    pub domain: Option<String>,
    pub phone: Option<String>,
}

impl MatchProfile {
    /// Builds a profile normalizing every field.
    pub fn new(name: &str, domain: Option<&str>, phone: Option<&str>) -> Self {
        Self {
            name: normalize_name(name),
            domain: domain.and_then(normalize_domain),
            phone: phone.map(phone_digits).filter(|digits| !digits.is_empty()),
        }
    }
}

/// Records that can take part in duplicate detection.
pub trait Matchable {
    fn match_profile(&self) -> MatchProfile;
}

/// A record reported as a likely duplicate together with its score.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DuplicateCandidate<T> {
    pub record: T,
    pub score: f64,
}

/// Reduces a url, email or bare host to its lower-cased registrable part.
///
/// Returns `None` when nothing resembling a domain remains.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let mut value = raw.trim().to_lowercase();

    if let Some((_, host)) = value.rsplit_once('@') {
        value = host.to_string();
    }
    for scheme in ["https://", "http://"] {
        if let Some(rest) = value.strip_prefix(scheme) {
            value = rest.to_string();
        }
    }
    let host = value
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host).trim_end_matches('.');

    if host.is_empty() || !host.contains('.') || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some(host.to_string())
}

/// Lower-cases a name, drops punctuation and legal-form suffixes.
pub fn normalize_name(raw: &str) -> String {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let significant: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|token| !LEGAL_SUFFIXES.contains(token))
        .collect();

    if significant.is_empty() {
        tokens.join(" ")
    } else {
        significant.join(" ")
    }
}

/// Keeps only ASCII digits.
pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Character-level Levenshtein edit distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// `1 - distance / longest`, in `0.0..=1.0`.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Weighted similarity of two profiles in `0.0..=1.0`.
pub fn similarity(a: &MatchProfile, b: &MatchProfile, weights: &SimilarityWeights) -> f64 {
    let mut total_weight = weights.name;
    let mut score = weights.name * name_similarity(&a.name, &b.name);

    if let (Some(left), Some(right)) = (&a.domain, &b.domain) {
        total_weight += weights.domain;
        if left == right {
            score += weights.domain;
        }
    }

    if let (Some(left), Some(right)) = (&a.phone, &b.phone) {
        total_weight += weights.phone;
        if left == right {
            score += weights.phone;
        }
    }

    if total_weight <= 0.0 {
        return 0.0;
    }
    score / total_weight
}

/// Scores every record against `target` and keeps those strictly above the
/// threshold, best first.
pub fn rank_candidates<T: Matchable>(
    target: &MatchProfile,
    records: Vec<T>,
    settings: &DuplicateSettings,
) -> Vec<DuplicateCandidate<T>> {
    let mut candidates: Vec<DuplicateCandidate<T>> = records
        .into_iter()
        .filter_map(|record| {
            let score = similarity(target, &record.match_profile(), &settings.weights);
            (score > settings.threshold).then_some(DuplicateCandidate { record, score })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}
