use crate::{CombinationError, FocalSet, MassFunction, WeightedFocalSet};
use std::collections::BTreeMap;
use validator::Validate;

/// Combinations whose conflict is within this distance of 1.0 are treated as total conflict.
pub const TOTAL_CONFLICT_EPSILON: f64 = 1e-12;

/// The result of combining mass functions: the normalized combined function and the conflict mass `K` that
/// was discarded by normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub mass: MassFunction,
    pub conflict: f64,
}

/// Selects how the mass functions of independent evidence sources are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CombinationRule {
    /// Dempster's rule applied as a left fold, see [`combine_all`].
    #[default]
    Dempster,
    /// Murphy's averaging rule, see [`combine_murphy`].
    Murphy,
}

impl CombinationRule {
    /// Combines `masses` according to the rule.
    pub fn combine(&self, masses: &[MassFunction]) -> Result<Combination, CombinationError> {
        match self {
            CombinationRule::Dempster => combine_all(masses),
            CombinationRule::Murphy => combine_murphy(masses),
        }
    }
}

fn check_mass(mass: &MassFunction) -> Result<(), CombinationError> {
    mass.validate()
        .map_err(|e| CombinationError::InvalidMass(e.to_string()))
}

/// Performs the conjunctive combination of two mass functions with [Dempster's rule of combination].
///
/// Each function is first completed with [`fill_ignorance`](MassFunction::fill_ignorance). Every focal set on
/// the left is then intersected with every focal set on the right and the product of their masses is assigned
/// to the intersection. Products landing on the empty set form the conflict `K`, and the remaining masses are
/// normalized by `1 - K`.
///
/// Returns [`CombinationError::TotalConflict`] rather than dividing by zero when the functions share no
/// consensus at all.
///
/// # Arguments
///
/// * `left` - The first [`MassFunction`] of the pair.
/// * `right` - The second [`MassFunction`] of the pair.
///
/// [Dempster's rule of combination]: https://en.wikipedia.org/wiki/Dempster%E2%80%93Shafer_theory#Dempster's_rule_of_combination
pub fn combine(left: &MassFunction, right: &MassFunction) -> Result<Combination, CombinationError> {
    if left.width() != right.width() {
        return Err(CombinationError::FrameMismatch(left.width(), right.width()));
    }
    check_mass(left)?;
    check_mass(right)?;
    let left = left.fill_ignorance();
    let right = right.fill_ignorance();

    let mut conflict = 0.0;
    let mut intersections: BTreeMap<FocalSet, f64> = BTreeMap::new();
    for l in &left {
        for r in &right {
            let product = l.mass * r.mass;
            let intersection = l.focal_set & r.focal_set;
            if intersection.is_empty() {
                conflict += product;
            } else {
                *intersections.entry(intersection).or_insert(0.0) += product;
            }
        }
    }

    if conflict >= 1.0 - TOTAL_CONFLICT_EPSILON || intersections.values().all(|m| *m <= 0.0) {
        return Err(CombinationError::TotalConflict);
    }
    let normalization = 1.0 - conflict;
    Ok(Combination {
        mass: MassFunction::from_entries(
            left.width(),
            intersections
                .into_iter()
                .map(|(focal_set, mass)| WeightedFocalSet::new(focal_set, mass / normalization)),
        ),
        conflict: conflict.clamp(0.0, 1.0),
    })
}

/// Merges the conflict of a chain of pairwise combinations into the conflict of the whole combination.
///
/// The unnormalized conjunctive combination of all the functions keeps a fraction `Π(1 - Kᵢ)` of the mass
/// away from the empty set, so the overall conflict is `1 - Π(1 - Kᵢ)`.
fn accumulate_conflict(conflict: f64, step: f64) -> f64 {
    1.0 - (1.0 - conflict) * (1.0 - step)
}

/// Combines a sequence of mass functions with Dempster's rule, returning a new [`Combination`].
///
/// The functions are folded left to right starting from the vacuous function, so the result is the same for
/// every run on the same input. The rule is commutative and associative, so any other order gives the same
/// result up to floating point rounding.
///
/// # Arguments
///
/// * `masses` - The `MassFunction`s to be combined. They must all be defined over frames of the same width.
pub fn combine_all<'a, I>(masses: I) -> Result<Combination, CombinationError>
where
    I: IntoIterator<Item = &'a MassFunction>,
{
    let mut masses = masses.into_iter().peekable();
    let width = masses.peek().ok_or(CombinationError::Empty)?.width();
    let mut combined = Combination {
        mass: MassFunction::vacuous(width),
        conflict: 0.0,
    };
    for m in masses {
        let step = combine(&combined.mass, m)?;
        combined = Combination {
            mass: step.mass,
            conflict: accumulate_conflict(combined.conflict, step.conflict),
        };
    }
    Ok(combined)
}

/// Combines a slice of mass functions with Dempster's rule by reducing it as a balanced binary tree.
///
/// Produces the same result as [`combine_all`] up to floating point rounding. The two halves of each split
/// are independent, which makes this the reduction to reach for when the halves are computed separately.
pub fn combine_balanced(masses: &[MassFunction]) -> Result<Combination, CombinationError> {
    match masses {
        [] => Err(CombinationError::Empty),
        [single] => combine_all([single]),
        _ => {
            let (left, right) = masses.split_at(masses.len() / 2);
            let left = combine_balanced(left)?;
            let right = combine_balanced(right)?;
            let step = combine(&left.mass, &right.mass)?;
            Ok(Combination {
                mass: step.mass,
                conflict: accumulate_conflict(
                    accumulate_conflict(left.conflict, right.conflict),
                    step.conflict,
                ),
            })
        }
    }
}

/// Calculates the Murphy average of a set of mass functions, returning a new [`Combination`] as the result.
///
/// The Murphy average rule[^1] takes the mean value of each focal element across all mass functions to create
/// a new mass function. This new mass function is then combined with itself N times where N is the total
/// number of functions that were averaged together. It degrades gracefully where plain Dempster combination
/// would report total conflict.
///
/// # Arguments
///
/// * `masses` - The `MassFunction`s to be combined.
///
/// [^1]: Catherine K. Murphy. 2000. Combining belief functions when evidence conflicts.
///     Decision Support Systems 29, 1 (2000), 1-9. DOI:<https://doi.org/10.1016/s0167-9236(99)00084-6>
pub fn combine_murphy(masses: &[MassFunction]) -> Result<Combination, CombinationError> {
    let width = masses.first().ok_or(CombinationError::Empty)?.width();
    let length = masses.len() as f64;
    let mut entries = Vec::new();
    for m in masses {
        if m.width() != width {
            return Err(CombinationError::FrameMismatch(width, m.width()));
        }
        check_mass(m)?;
        entries.extend(
            m.fill_ignorance()
                .iter()
                .map(|e| WeightedFocalSet::new(e.focal_set, e.mass / length)),
        );
    }
    let average = MassFunction::from_entries(width, entries);
    combine_all(std::iter::repeat(&average).take(masses.len()))
}
