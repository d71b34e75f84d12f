use crate::{FocalSet, Frame, Hypothesis, MassFunction, DecisionError};
use validator::Validate;

/// The outcome of evaluating one reference feature against its candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<C> {
    /// The reference feature corresponds to this candidate.
    Matched(C),
    /// The evidence favors the reserved no-correspondence hypothesis.
    NoMatch,
    /// The evidence is too weak, too conflicting, or too evenly split to pick a hypothesis.
    Ambiguous,
}

impl<C> Verdict<C> {
    /// A short name for the kind of verdict: `matched`, `no_match` or `ambiguous`.
    pub fn kind(&self) -> &'static str {
        match self {
            Verdict::Matched(_) => "matched",
            Verdict::NoMatch => "no_match",
            Verdict::Ambiguous => "ambiguous",
        }
    }

    /// The matched candidate, if any.
    pub fn candidate(&self) -> Option<&C> {
        match self {
            Verdict::Matched(c) => Some(c),
            _ => None,
        }
    }
}

/// Selects the score used to rank hypotheses in [`decide`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Criterion {
    /// Rank by [`belief`], the most cautious score.
    #[default]
    Belief,
    /// Rank by [`plausibility`], the most optimistic score.
    Plausibility,
    /// Rank by the [`pignistic`] probability, which splits ignorance evenly.
    Pignistic,
}

/// Sums the mass of every non-empty focal set that is a subset of `{hᵢ}`.
///
/// # Arguments
///
/// * `mass` - The combined mass function.
/// * `index` - The hypothesis index within the frame.
pub fn belief(mass: &MassFunction, index: usize) -> f64 {
    let hypothesis = FocalSet::singleton(index);
    mass.iter()
        .filter(|e| !e.focal_set.is_empty() && e.focal_set.is_subset_of(&hypothesis))
        .map(|e| e.mass)
        .sum()
}

/// Sums the mass of every focal set that intersects `{hᵢ}`.
pub fn plausibility(mass: &MassFunction, index: usize) -> f64 {
    let hypothesis = FocalSet::singleton(index);
    mass.iter()
        .filter(|e| e.focal_set.intersects(&hypothesis))
        .map(|e| e.mass)
        .sum()
}

/// Reassigns the mass of each focal set evenly to its members and returns the share of `hᵢ`.
pub fn pignistic(mass: &MassFunction, index: usize) -> f64 {
    mass.iter()
        .filter(|e| e.focal_set.contains(index))
        .map(|e| e.mass / e.focal_set.len() as f64)
        .sum()
}

/// The belief figures for a single hypothesis, reported alongside a [`Verdict`].
#[derive(Debug, Clone, PartialEq)]
pub struct Support<C> {
    pub hypothesis: Hypothesis<C>,
    pub belief: f64,
    pub plausibility: f64,
    pub pignistic: f64,
}

impl<C> Support<C> {
    /// The score selected by `criterion`.
    pub fn score(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Belief => self.belief,
            Criterion::Plausibility => self.plausibility,
            Criterion::Pignistic => self.pignistic,
        }
    }
}

/// Computes the [`Support`] of every hypothesis of `frame`, in frame order.
pub fn supports<C: Clone>(mass: &MassFunction, frame: &Frame<C>) -> Vec<Support<C>> {
    frame
        .hypotheses()
        .iter()
        .enumerate()
        .map(|(index, hypothesis)| Support {
            hypothesis: hypothesis.clone(),
            belief: belief(mass, index),
            plausibility: plausibility(mass, index),
            pignistic: pignistic(mass, index),
        })
        .collect()
}

/// The thresholds that turn a combined mass function into a [`Verdict`].
#[derive(Debug, Clone, Copy, PartialEq, Validate)]
pub struct DecisionPolicy {
    /// The minimum score the winning hypothesis needs.
    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: f64,
    /// Any combination with more conflict than this is ambiguous regardless of the scores.
    #[validate(range(min = 0.0, max = 1.0))]
    pub max_conflict: f64,
    /// The winner is ambiguous if the runner-up scores within this margin of it.
    #[validate(range(min = 0.0, max = 1.0))]
    pub tie_margin: f64,
    /// The score used to rank hypotheses.
    pub criterion: Criterion,
}

/// The default [`DecisionPolicy::threshold`] value.
pub const DEFAULT_THRESHOLD: f64 = 0.5;
/// The default [`DecisionPolicy::max_conflict`] value.
pub const DEFAULT_MAX_CONFLICT: f64 = 0.5;
/// The default [`DecisionPolicy::tie_margin`] value.
pub const DEFAULT_TIE_MARGIN: f64 = 0.0;

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_conflict: DEFAULT_MAX_CONFLICT,
            tie_margin: DEFAULT_TIE_MARGIN,
            criterion: Criterion::default(),
        }
    }
}

/// Selects the best-supported hypothesis of a combined mass function.
///
/// Returns [`Verdict::Ambiguous`] when `conflict` exceeds the policy's `max_conflict`, when the best score is
/// below the `threshold`, or when the runner-up is within `tie_margin` of the best score. A winning
/// [`Hypothesis::NoMatch`] produces [`Verdict::NoMatch`].
///
/// A non-finite `conflict` is treated like one above `max_conflict`.
///
/// Returns [`DecisionError::ThresholdOutOfRange`] if any policy value is outside the 0.0 to 1.0 range and
/// [`DecisionError::FrameMismatch`] if `mass` is not defined over `frame`.
///
/// # Arguments
///
/// * `mass` - The combined mass function.
/// * `frame` - The frame `mass` is defined over.
/// * `conflict` - The conflict reported by the combination that produced `mass`.
/// * `policy` - The thresholds to apply.
pub fn decide<C: Clone>(
    mass: &MassFunction,
    frame: &Frame<C>,
    conflict: f64,
    policy: &DecisionPolicy,
) -> Result<Verdict<C>, DecisionError> {
    for value in [policy.threshold, policy.max_conflict, policy.tie_margin] {
        if !(0.0..=1.0).contains(&value) {
            return Err(DecisionError::ThresholdOutOfRange(value));
        }
    }
    if mass.width() != frame.len() {
        return Err(DecisionError::FrameMismatch {
            mass: mass.width(),
            frame: frame.len(),
        });
    }
    if !conflict.is_finite() || conflict > policy.max_conflict {
        return Ok(Verdict::Ambiguous);
    }

    let mut ranked: Vec<(usize, f64)> = (0..frame.len())
        .map(|index| {
            let score = match policy.criterion {
                Criterion::Belief => belief(mass, index),
                Criterion::Plausibility => plausibility(mass, index),
                Criterion::Pignistic => pignistic(mass, index),
            };
            (index, score)
        })
        .collect();
    // Stable sort keeps frame order among equal scores.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best, best_score) = ranked[0];
    if best_score < policy.threshold {
        return Ok(Verdict::Ambiguous);
    }
    if let Some((_, runner_up)) = ranked.get(1) {
        if best_score - runner_up <= policy.tie_margin {
            return Ok(Verdict::Ambiguous);
        }
    }
    Ok(match frame.get(best) {
        Some(Hypothesis::Candidate(c)) => Verdict::Matched(c.clone()),
        Some(Hypothesis::NoMatch) => Verdict::NoMatch,
        None => Verdict::Ambiguous,
    })
}
