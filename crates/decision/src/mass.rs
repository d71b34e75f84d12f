use crate::FocalSet;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

/// The tolerance used when checking that masses sum to one.
pub const MASS_EPSILON: f64 = 1e-9;

/// A focal set paired with the mass assigned to it.
///
/// This is the unit every evidence source emits. Several weighted focal sets may share a focal set until
/// they are canonicalized with [`sort_kernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedFocalSet {
    pub focal_set: FocalSet,
    pub mass: f64,
}

impl WeightedFocalSet {
    pub fn new(focal_set: FocalSet, mass: f64) -> Self {
        Self { focal_set, mass }
    }
}

/// Canonicalizes a list of weighted focal sets.
///
/// Entries sharing a focal set are merged by summing their masses, and the result is sorted by focal set.
/// Total mass is conserved and the input order has no effect on the output beyond floating point rounding.
/// Groups whose mass sums to exactly zero carry no evidence and are dropped.
pub fn sort_kernel<I>(entries: I) -> Vec<WeightedFocalSet>
where
    I: IntoIterator<Item = WeightedFocalSet>,
{
    let mut kernel: BTreeMap<FocalSet, f64> = BTreeMap::new();
    for entry in entries {
        *kernel.entry(entry.focal_set).or_insert(0.0) += entry.mass;
    }
    kernel
        .into_iter()
        .filter(|(_, mass)| *mass != 0.0)
        .map(|(focal_set, mass)| WeightedFocalSet { focal_set, mass })
        .collect()
}

/// A canonical [Dempster-Shafer](https://en.wikipedia.org/wiki/Dempster%E2%80%93Shafer_theory) mass function
/// over a frame of `width` hypotheses.
///
/// Every focal set appears at most once and entries are sorted by focal set. A mass function emitted by an
/// evidence source may sum to less than one; the remainder is read as ignorance and assigned to the full
/// frame when the function is combined (see [`fill_ignorance`](MassFunction::fill_ignorance)).
///
/// Mass functions are immutable. Every transformation returns a new value.
#[derive(Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_kernel", skip_on_field_errors = false))]
pub struct MassFunction {
    width: usize,
    entries: Vec<WeightedFocalSet>,
}

/// Validates that a `MassFunction` holds finite, non-negative masses summing to at most one and that no mass
/// is assigned to the empty set.
fn validate_kernel(mass: &MassFunction) -> Result<(), ValidationError> {
    let full = FocalSet::full(mass.width);
    for entry in &mass.entries {
        if !entry.mass.is_finite() {
            return Err(ValidationError::new("mass must be finite"));
        }
        if entry.mass < 0.0 {
            return Err(ValidationError::new("mass cannot be negative"));
        }
        if entry.focal_set.is_empty() && entry.mass > 0.0 {
            return Err(ValidationError::new("empty set cannot carry mass"));
        }
        if !entry.focal_set.is_subset_of(&full) {
            return Err(ValidationError::new("focal set exceeds frame width"));
        }
    }
    if mass.total() > 1.0 + MASS_EPSILON {
        return Err(ValidationError::new("sum cannot be greater than one"));
    }
    Ok(())
}

impl MassFunction {
    /// Builds a canonical mass function from raw weighted focal sets. See [`sort_kernel`].
    pub fn from_entries<I>(width: usize, entries: I) -> Self
    where
        I: IntoIterator<Item = WeightedFocalSet>,
    {
        Self {
            width,
            entries: sort_kernel(entries),
        }
    }

    /// The vacuous mass function, assigning all mass to the full frame (total ignorance).
    ///
    /// It is the neutral element of [`combine`](crate::combine).
    pub fn vacuous(width: usize) -> Self {
        Self {
            width,
            entries: vec![WeightedFocalSet::new(FocalSet::full(width), 1.0)],
        }
    }

    /// The number of hypotheses in the frame this function is defined over.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn entries(&self) -> &[WeightedFocalSet] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WeightedFocalSet> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The mass assigned to exactly `focal_set`.
    pub fn mass(&self, focal_set: FocalSet) -> f64 {
        self.entries
            .binary_search_by_key(&focal_set, |e| e.focal_set)
            .map(|i| self.entries[i].mass)
            .unwrap_or(0.0)
    }

    /// The mass assigned to the full frame.
    pub fn ignorance(&self) -> f64 {
        self.mass(FocalSet::full(self.width))
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.mass).sum()
    }

    /// `true` if the masses sum to one within [`MASS_EPSILON`].
    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() <= MASS_EPSILON
    }

    /// If the masses sum to less than one, assigns the remainder to the full frame.
    pub fn fill_ignorance(&self) -> Self {
        let total = self.total();
        if total >= 1.0 {
            return self.clone();
        }
        Self::from_entries(
            self.width,
            self.entries
                .iter()
                .copied()
                .chain(std::iter::once(WeightedFocalSet::new(
                    FocalSet::full(self.width),
                    1.0 - total,
                ))),
        )
    }

    /// Rescales the masses so they sum to at most one, preserving their relative proportions.
    ///
    /// Negative and non-finite masses are dropped first. A function that already sums to one or less only loses
    /// those invalid entries.
    pub fn scale(&self) -> Self {
        let valid: Vec<WeightedFocalSet> = self
            .entries
            .iter()
            .filter(|e| e.mass.is_finite() && e.mass > 0.0 && !e.focal_set.is_empty())
            .copied()
            .collect();
        let total: f64 = valid.iter().map(|e| e.mass).sum();
        let factor = if total > 1.0 { 1.0 / total } else { 1.0 };
        Self::from_entries(
            self.width,
            valid
                .into_iter()
                .map(|e| WeightedFocalSet::new(e.focal_set, e.mass * factor)),
        )
    }

    /// Discounts the function by a reliability `factor`.
    ///
    /// Every mass is multiplied by `factor` (clamped to the 0.0 to 1.0 range) and whatever is removed is
    /// reassigned to the full frame. A 1.0 factor leaves the function unchanged aside from filling ignorance,
    /// a 0.0 factor produces the [`vacuous`](MassFunction::vacuous) function.
    pub fn discount(&self, factor: f64) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        Self::from_entries(
            self.width,
            self.entries
                .iter()
                .map(|e| WeightedFocalSet::new(e.focal_set, e.mass * factor)),
        )
        .fill_ignorance()
    }
}

impl<'a> IntoIterator for &'a MassFunction {
    type Item = &'a WeightedFocalSet;
    type IntoIter = std::slice::Iter<'a, WeightedFocalSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
