//! Locale-insensitive relevance scoring and candidate selection.
//!
//! Providers return noisy result lists; this module decides which single
//! result, if any, answers the user's query.

use digger_core::{ResultEnvelope, ScoringWeights, SearchCriteria};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Largest number of raw results considered per provider.
pub const MAX_TOP_K: usize = 3;

/// Fold case, strip accents, and collapse whitespace.
///
/// Idempotent, and `normalize_for_matching("Café") == normalize_for_matching("cafe")`.
#[must_use]
pub fn normalize_for_matching(s: &str) -> String {
    let stripped: String = s
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when `term` occurs in `haystack` bounded by non-alphanumerics.
///
/// Both arguments must already be normalized.
fn contains_whole_word(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    haystack.match_indices(term).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Score one raw result against the searched artist and track.
///
/// The haystack is the result title, the artist the provider reported, and
/// any extra text. Both terms present earn the full base, one term the
/// partial base, none scores zero and rejects the result. Each term then
/// earns a bonus when found inside the title and another when it matches as
/// a whole word.
#[must_use]
pub fn calculate_relevance_score(
    artist: Option<&str>,
    track: Option<&str>,
    title: &str,
    found_artist: Option<&str>,
    extra: &str,
    weights: &ScoringWeights,
) -> u32 {
    let terms: Vec<String> = [artist, track]
        .into_iter()
        .flatten()
        .map(normalize_for_matching)
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return 0;
    }

    let title = normalize_for_matching(title);
    let haystack = normalize_for_matching(&format!(
        "{} {} {}",
        title,
        found_artist.unwrap_or_default(),
        extra
    ));

    let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
    let mut score = match matched {
        0 => return 0,
        2 => weights.both_terms,
        _ => weights.one_term,
    };

    for term in &terms {
        if title.contains(term.as_str()) {
            score += weights.title_bonus;
        }
        if contains_whole_word(&haystack, term) {
            score += weights.whole_word_bonus;
        }
    }
    score
}

/// Word-level gate applied before scoring on noisy sources.
///
/// Every non-empty criteria field must contribute at least one of its words
/// to the haystack. Empty criteria pass.
#[must_use]
pub fn strict_filter(criteria: &SearchCriteria, haystack: &str) -> bool {
    let haystack = normalize_for_matching(haystack);
    criteria.fields().all(|field| {
        normalize_for_matching(field)
            .split_whitespace()
            .any(|word| haystack.contains(word))
    })
}

/// A raw result with its computed score.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The raw result
    pub envelope: ResultEnvelope,
    /// Relevance score, zero when rejected
    pub score: u32,
}

/// The artist and track terms a result is scored against.
///
/// A catalog-only query has neither, so the catalog number stands in for
/// the track and is matched against the result's catalog field.
fn scoring_terms(criteria: &SearchCriteria) -> (Option<&str>, Option<&str>) {
    match (criteria.artist(), criteria.primary_term()) {
        (None, None) => (None, criteria.catalog()),
        terms => terms,
    }
}

impl Candidate {
    /// Score `envelope` against `criteria`.
    #[must_use]
    pub fn score(envelope: ResultEnvelope, criteria: &SearchCriteria, weights: &ScoringWeights) -> Self {
        let (artist, track) = scoring_terms(criteria);
        let score = calculate_relevance_score(
            artist,
            track,
            &envelope.title,
            envelope.artist.as_deref(),
            &envelope.extra_text(),
            weights,
        );
        Self { envelope, score }
    }
}

/// How a provider's raw results are narrowed to one envelope.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    /// Scorer weights
    pub weights: &'a ScoringWeights,
    /// Raw results evaluated, clamped to `1..=MAX_TOP_K`
    pub top_k: usize,
    /// Apply [`strict_filter`] before scoring
    pub strict: bool,
}

impl Selection<'_> {
    /// Pick the best of the first `top_k` results.
    ///
    /// Ties keep first-seen order. When nothing scores above zero the
    /// provider's no-match sentinel is returned.
    #[must_use]
    pub fn best(
        &self,
        platform: &str,
        criteria: &SearchCriteria,
        results: Vec<ResultEnvelope>,
    ) -> ResultEnvelope {
        let top_k = self.top_k.clamp(1, MAX_TOP_K);
        let mut best: Option<Candidate> = None;

        for envelope in results.into_iter().take(top_k) {
            if self.strict {
                let haystack = format!(
                    "{} {} {}",
                    envelope.title,
                    envelope.artist.as_deref().unwrap_or_default(),
                    envelope.extra_text()
                );
                if !strict_filter(criteria, &haystack) {
                    tracing::debug!(platform, title = %envelope.title, "dropped by strict filter");
                    continue;
                }
            }

            let candidate = Candidate::score(envelope, criteria, self.weights);
            tracing::trace!(platform, title = %candidate.envelope.title, score = candidate.score, "scored");
            if candidate.score > best.as_ref().map_or(0, |b| b.score) {
                best = Some(candidate);
            }
        }

        best.map_or_else(|| ResultEnvelope::no_match(platform), |c| c.envelope)
    }
}
