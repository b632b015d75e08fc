//! Question selection and balancing.
//!
//! Given a pool of candidates partitioned by question type, computes a
//! target count per type under a distribution strategy, samples a diverse,
//! shuffled subset per type honoring the difficulty spread, and shuffles
//! the combined selection so final order is independent of type.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three supported question shapes, in fixed priority order.
///
/// The declaration order doubles as the priority order used when even
/// distribution hands out remainder slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// One correct answer among several wrong ones.
    MultipleChoice,
    /// A statement judged true or false.
    TrueFalse,
    /// A free-text answer compared against the canonical one.
    OpenEnded,
}

impl QuestionType {
    /// All types in priority order.
    pub fn all() -> [QuestionType; 3] {
        [
            QuestionType::MultipleChoice,
            QuestionType::TrueFalse,
            QuestionType::OpenEnded,
        ]
    }

    /// Stable string form used in store records and rules.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::OpenEnded => "open_ended",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "true_false" => Some(QuestionType::TrueFalse),
            "open_ended" => Some(QuestionType::OpenEnded),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An unselected question eligible for inclusion in a trivia set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionCandidate {
    /// Store record id.
    pub id: String,
    /// Question text.
    pub question: String,
    /// Question shape.
    pub question_type: QuestionType,
    /// The correct answer.
    pub correct_answer: String,
    /// Wrong answers, for multiple-choice questions.
    #[serde(default)]
    pub wrong_answers: Vec<String>,
    /// Optional theme the question belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Declared difficulty ("easy" | "medium" | "hard"), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// Id of the source collection the candidate came from.
    pub collection_id: String,
}

impl QuestionCandidate {
    /// Normalized difficulty key used for bucketing.
    pub fn difficulty_key(&self) -> &'static str {
        normalize_difficulty(self.difficulty.as_deref())
    }
}

/// Maps a declared difficulty onto the closed bucket key space.
pub fn normalize_difficulty(difficulty: Option<&str>) -> &'static str {
    match difficulty.map(|d| d.trim().to_lowercase()).as_deref() {
        Some("easy") => "easy",
        Some("medium") => "medium",
        Some("hard") => "hard",
        _ => "unknown",
    }
}

/// Policy for apportioning the total across question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStrategy {
    /// Split as evenly as possible, remainder to earliest types.
    Even,
    /// Shares proportional to each type's share of the available pool.
    Weighted,
    /// Reserved; currently falls back to `Weighted`.
    Custom,
}

impl DistributionStrategy {
    /// Parses the lowercase string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "even" => Some(DistributionStrategy::Even),
            "weighted" => Some(DistributionStrategy::Weighted),
            "custom" => Some(DistributionStrategy::Custom),
            _ => None,
        }
    }
}

/// Parameters for one selection run.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Requested number of questions.
    pub total: usize,
    /// Distribution strategy across types.
    pub strategy: DistributionStrategy,
    /// Accept a smaller set when supply is insufficient.
    pub allow_partial: bool,
    /// RNG seed for reproducible selection (None = non-deterministic).
    pub seed: Option<u64>,
}

/// The realized outcome of a selection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSelectionResult {
    /// The full candidate pool the selection drew from.
    pub pool: Vec<QuestionCandidate>,
    /// The selected, shuffled subset.
    pub selected: Vec<QuestionCandidate>,
    /// Realized per-type selected counts.
    pub distribution: BTreeMap<QuestionType, usize>,
    /// Non-fatal notes, e.g. a partial set smaller than requested.
    pub warnings: Vec<String>,
}

/// Selection failures reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Not enough candidates and partial sets are disallowed.
    #[error("Insufficient questions: need {requested}, have {available}")]
    InsufficientQuestions { requested: usize, available: usize },
}

/// Selects a balanced, diverse, shuffled subset from `pool`.
///
/// The sum of realized per-type counts equals the (possibly capped)
/// working total exactly; no per-type count exceeds that type's
/// availability.
pub fn select_questions(
    pool: &[QuestionCandidate],
    config: &SelectionConfig,
) -> Result<QuestionSelectionResult, SelectionError> {
    let available = pool.len();
    let mut warnings = Vec::new();

    if available < config.total {
        if !config.allow_partial {
            return Err(SelectionError::InsufficientQuestions {
                requested: config.total,
                available,
            });
        }
        warnings.push(format!(
            "Requested {} questions but only {} were available; building a partial set",
            config.total, available
        ));
    }
    let working_total = config.total.min(available);

    let mut rng = create_rng(config.seed);

    // Group the pool by type, preserving priority order.
    let mut by_type: BTreeMap<QuestionType, Vec<&QuestionCandidate>> = BTreeMap::new();
    for candidate in pool {
        by_type.entry(candidate.question_type).or_default().push(candidate);
    }

    let targets = compute_distribution(&by_type, working_total, config.strategy);

    let mut selected: Vec<QuestionCandidate> = Vec::with_capacity(working_total);
    let mut distribution: BTreeMap<QuestionType, usize> = BTreeMap::new();
    for (qtype, candidates) in &by_type {
        let target = targets.get(qtype).copied().unwrap_or(0);
        if target == 0 {
            continue;
        }
        let picked = sample_diverse(candidates, target, &mut rng);
        distribution.insert(*qtype, picked.len());
        selected.extend(picked.into_iter().cloned());
    }

    // Final order must be independent of type.
    selected.shuffle(&mut rng);

    if selected.len() < config.total {
        warnings.push(format!(
            "Selected {} of {} requested questions",
            selected.len(),
            config.total
        ));
    }

    tracing::debug!(
        requested = config.total,
        selected = selected.len(),
        types = distribution.len(),
        strategy = ?config.strategy,
        "Question selection complete"
    );

    Ok(QuestionSelectionResult {
        pool: pool.to_vec(),
        selected,
        distribution,
        warnings,
    })
}

/// Computes the per-type target counts under `strategy` and reconciles
/// rounding drift so targets sum to exactly `total` whenever availability
/// allows.
fn compute_distribution(
    by_type: &BTreeMap<QuestionType, Vec<&QuestionCandidate>>,
    total: usize,
    strategy: DistributionStrategy,
) -> BTreeMap<QuestionType, usize> {
    let strategy = match strategy {
        DistributionStrategy::Custom => {
            // No custom scheme is defined; weighted is the documented fallback.
            tracing::debug!("Custom distribution not implemented, falling back to weighted");
            DistributionStrategy::Weighted
        }
        other => other,
    };

    let types: Vec<QuestionType> = by_type.keys().copied().collect();
    let availability: BTreeMap<QuestionType, usize> =
        by_type.iter().map(|(t, c)| (*t, c.len())).collect();
    let total_available: usize = availability.values().sum();

    let mut targets: BTreeMap<QuestionType, usize> = BTreeMap::new();

    match strategy {
        DistributionStrategy::Even => {
            let count = types.len().max(1);
            let base = total / count;
            let remainder = total % count;
            for (i, qtype) in types.iter().enumerate() {
                let share = base + usize::from(i < remainder);
                targets.insert(*qtype, share.min(availability[qtype]));
            }
        }
        _ => {
            for qtype in &types {
                let share = if total_available == 0 {
                    0
                } else {
                    ((total as f64) * (availability[qtype] as f64) / (total_available as f64))
                        .round() as usize
                };
                targets.insert(*qtype, share.min(availability[qtype]));
            }
        }
    }

    // Reconcile rounding drift: scale down proportionally if over, then
    // greedily top up types with unused availability until the total is
    // met or supply runs out.
    let sum: usize = targets.values().sum();
    if sum > total {
        for target in targets.values_mut() {
            *target = *target * total / sum;
        }
    }
    loop {
        let sum: usize = targets.values().sum();
        if sum >= total {
            break;
        }
        let mut bumped = false;
        for qtype in &types {
            let sum: usize = targets.values().sum();
            if sum >= total {
                break;
            }
            let target = targets.entry(*qtype).or_insert(0);
            if *target < availability[qtype] {
                *target += 1;
                bumped = true;
            }
        }
        if !bumped {
            break;
        }
    }

    targets
}

/// Samples `target` candidates of one type with a difficulty spread.
///
/// Difficulty buckets are walked in lexical key order, taking
/// `ceil(remaining / buckets_left)` from each via shuffle-take-N; any
/// slots left after one pass are filled uniformly at random from the
/// remainder, without replacement.
fn sample_diverse<'a>(
    candidates: &[&'a QuestionCandidate],
    target: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<&'a QuestionCandidate> {
    if candidates.len() <= target {
        return candidates.to_vec();
    }

    let mut buckets: BTreeMap<&'static str, Vec<&QuestionCandidate>> = BTreeMap::new();
    for candidate in candidates {
        buckets.entry(candidate.difficulty_key()).or_default().push(candidate);
    }

    let mut selected: Vec<&QuestionCandidate> = Vec::with_capacity(target);
    let mut leftovers: Vec<&QuestionCandidate> = Vec::new();
    let bucket_count = buckets.len();

    for (walked, bucket) in buckets.values_mut().enumerate() {
        let remaining = target - selected.len();
        if remaining == 0 {
            leftovers.extend(bucket.iter().copied());
            continue;
        }
        let buckets_left = bucket_count - walked;
        let share = remaining.div_ceil(buckets_left).min(bucket.len()).min(remaining);

        bucket.shuffle(rng);
        selected.extend(bucket.iter().take(share).copied());
        leftovers.extend(bucket.iter().skip(share).copied());
    }

    if selected.len() < target {
        leftovers.shuffle(rng);
        let needed = target - selected.len();
        selected.extend(leftovers.into_iter().take(needed));
    }

    selected
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, qtype: QuestionType, difficulty: Option<&str>) -> QuestionCandidate {
        QuestionCandidate {
            id: id.to_string(),
            question: format!("Question {id}?"),
            question_type: qtype,
            correct_answer: "yes".to_string(),
            wrong_answers: vec!["no".to_string(), "maybe".to_string()],
            theme: Some("space".to_string()),
            tags: Vec::new(),
            difficulty: difficulty.map(|d| d.to_string()),
            collection_id: "col-1".to_string(),
        }
    }

    fn pool(mc: usize, tf: usize) -> Vec<QuestionCandidate> {
        let difficulties = ["easy", "medium", "hard"];
        let mut pool = Vec::new();
        for i in 0..mc {
            pool.push(candidate(
                &format!("mc-{i}"),
                QuestionType::MultipleChoice,
                Some(difficulties[i % 3]),
            ));
        }
        for i in 0..tf {
            pool.push(candidate(
                &format!("tf-{i}"),
                QuestionType::TrueFalse,
                Some(difficulties[i % 3]),
            ));
        }
        pool
    }

    fn config(total: usize, strategy: DistributionStrategy, allow_partial: bool) -> SelectionConfig {
        SelectionConfig {
            total,
            strategy,
            allow_partial,
            seed: Some(42),
        }
    }

    #[test]
    fn test_normalize_difficulty() {
        assert_eq!(normalize_difficulty(Some("Easy ")), "easy");
        assert_eq!(normalize_difficulty(Some("HARD")), "hard");
        assert_eq!(normalize_difficulty(Some("tricky")), "unknown");
        assert_eq!(normalize_difficulty(None), "unknown");
    }

    #[test]
    fn test_selection_sums_to_requested_total() {
        // P6: realized counts sum to T exactly for any T within supply.
        let pool = pool(10, 5);
        for total in 1..=15 {
            let result = select_questions(
                &pool,
                &config(total, DistributionStrategy::Weighted, false),
            )
            .expect("within supply");
            assert_eq!(result.selected.len(), total, "total {total}");
            let sum: usize = result.distribution.values().sum();
            assert_eq!(sum, total, "distribution sums for total {total}");
            for (qtype, count) in &result.distribution {
                let available = pool
                    .iter()
                    .filter(|c| c.question_type == *qtype)
                    .count();
                assert!(*count <= available, "{qtype} over-selected");
            }
        }
    }

    #[test]
    fn test_weighted_distribution_proportional() {
        // Scenario A: 10 MC + 5 TF, request 9 => roughly 6:3.
        let pool = pool(10, 5);
        let result = select_questions(&pool, &config(9, DistributionStrategy::Weighted, false))
            .expect("supply is sufficient");
        assert_eq!(result.selected.len(), 9);
        let mc = result.distribution[&QuestionType::MultipleChoice];
        let tf = result.distribution[&QuestionType::TrueFalse];
        assert_eq!(mc + tf, 9);
        assert!((5..=7).contains(&mc), "mc share {mc} should be near 6");
        assert!((2..=4).contains(&tf), "tf share {tf} should be near 3");
    }

    #[test]
    fn test_even_distribution_with_remainder() {
        let pool = pool(10, 10);
        let result = select_questions(&pool, &config(9, DistributionStrategy::Even, false))
            .expect("supply is sufficient");
        let mc = result.distribution[&QuestionType::MultipleChoice];
        let tf = result.distribution[&QuestionType::TrueFalse];
        // Remainder slot goes to the earliest type in priority order.
        assert_eq!(mc, 5);
        assert_eq!(tf, 4);
    }

    #[test]
    fn test_even_distribution_clamps_to_availability() {
        let pool = pool(12, 2);
        let result = select_questions(&pool, &config(10, DistributionStrategy::Even, false))
            .expect("supply is sufficient");
        let tf = result.distribution[&QuestionType::TrueFalse];
        assert!(tf <= 2, "true/false cannot exceed availability");
        assert_eq!(result.selected.len(), 10, "shortfall topped up elsewhere");
    }

    #[test]
    fn test_custom_falls_back_to_weighted() {
        let pool = pool(10, 5);
        let custom = select_questions(&pool, &config(9, DistributionStrategy::Custom, false))
            .expect("supply is sufficient");
        let weighted = select_questions(&pool, &config(9, DistributionStrategy::Weighted, false))
            .expect("supply is sufficient");
        assert_eq!(custom.distribution, weighted.distribution);
    }

    #[test]
    fn test_insufficient_supply_fails_without_partial() {
        // Scenario B: 3 available, 10 requested, partial disallowed.
        let pool = pool(3, 0);
        let err = select_questions(&pool, &config(10, DistributionStrategy::Weighted, false))
            .expect_err("must fail");
        assert_eq!(
            err,
            SelectionError::InsufficientQuestions {
                requested: 10,
                available: 3
            }
        );
        assert!(err.to_string().contains("need 10, have 3"));
    }

    #[test]
    fn test_insufficient_supply_partial_allowed() {
        // Scenario C: partial allowed => exactly 3 selected plus a warning
        // naming both numbers.
        let pool = pool(3, 0);
        let result = select_questions(&pool, &config(10, DistributionStrategy::Weighted, true))
            .expect("partial set");
        assert_eq!(result.selected.len(), 3);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("10") && w.contains('3')));
    }

    #[test]
    fn test_difficulty_spread_in_selection() {
        // 30 MC candidates evenly spread over easy/medium/hard; selecting 9
        // should draw from every bucket.
        let pool = pool(30, 0);
        let result = select_questions(&pool, &config(9, DistributionStrategy::Weighted, false))
            .expect("supply is sufficient");
        let mut keys: Vec<&str> = result
            .selected
            .iter()
            .map(|c| c.difficulty_key())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys, vec!["easy", "hard", "medium"]);
    }

    #[test]
    fn test_selection_reproducible_with_seed() {
        let pool = pool(20, 10);
        let a = select_questions(&pool, &config(12, DistributionStrategy::Weighted, false))
            .expect("run a");
        let b = select_questions(&pool, &config(12, DistributionStrategy::Weighted, false))
            .expect("run b");
        let ids_a: Vec<&str> = a.selected.iter().map(|c| c.id.as_str()).collect();
        let ids_b: Vec<&str> = b.selected.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_no_duplicates_in_selection() {
        let pool = pool(15, 15);
        let result = select_questions(&pool, &config(20, DistributionStrategy::Even, false))
            .expect("supply is sufficient");
        let mut ids: Vec<&str> = result.selected.iter().map(|c| c.id.as_str()).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn test_exact_supply_takes_everything() {
        let pool = pool(4, 2);
        let result = select_questions(&pool, &config(6, DistributionStrategy::Weighted, false))
            .expect("exact supply");
        assert_eq!(result.selected.len(), 6);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_question_type_round_trip() {
        for qtype in QuestionType::all() {
            assert_eq!(QuestionType::parse(qtype.as_str()), Some(qtype));
        }
        assert_eq!(QuestionType::parse("essay"), None);
    }
}
