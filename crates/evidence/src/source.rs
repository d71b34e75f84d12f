use crate::{orientation_difference, Feature, Geometry, Outcome, OutcomeBanks};
use geomatch_decision::{Frame, FrameError, WeightedFocalSet};
use strum::IntoEnumIterator;
use tracing::trace;

/// A criterion that converts the comparison of a reference feature with its candidates into mass.
///
/// Implementations only supply the criterion value through [`measure`](EvidenceSource::measure) and their
/// calibration through [`banks`](EvidenceSource::banks). The conversion to weighted focal sets is shared, so the
/// combination engine never needs to know which criterion it is looking at.
pub trait EvidenceSource<G>: Send + Sync + std::fmt::Debug {
    /// A short, human-readable name used in logs.
    fn name(&self) -> &str;

    /// The reliability of the source in the 0.0 to 1.0 range, used to discount its mass functions.
    fn weight(&self) -> f64 {
        1.0
    }

    /// The membership banks that calibrate the criterion.
    fn banks(&self) -> &OutcomeBanks;

    /// The criterion value for a reference and candidate geometry, `None` if the criterion does not apply to them.
    fn measure(&self, reference: &G, candidate: &G) -> Option<f64>;

    /// Produces the weighted focal sets for the candidate at `index` of a frame of `width` hypotheses.
    ///
    /// Each outcome with a positive mass emits one entry: `Matched` for `{h}`, `NotMatched` for `Θ \ {h}` and
    /// `Undecided` for `Θ`. A criterion that does not apply emits nothing.
    fn evaluate_candidate(
        &self,
        reference: &Feature<G>,
        candidate: &Feature<G>,
        index: usize,
        width: usize,
    ) -> Vec<WeightedFocalSet> {
        let Some(value) = self.measure(&reference.geometry, &candidate.geometry) else {
            trace!(
                message = "criterion not applicable",
                source = self.name(),
                candidate = %candidate.id,
            );
            return vec![];
        };
        Outcome::iter()
            .filter_map(|outcome| {
                let mass = self.banks().evaluate(outcome, value);
                (mass > 0.0)
                    .then(|| WeightedFocalSet::new(outcome.focal_set(index, width), mass))
            })
            .collect()
    }

    /// Produces the weighted focal sets of every candidate, concatenated in candidate order.
    ///
    /// The frame is the one [`Frame::new`] builds from `candidates`. Returns a [`FrameError`] if the candidates
    /// cannot form a frame.
    fn evaluate(
        &self,
        reference: &Feature<G>,
        candidates: &[Feature<G>],
    ) -> Result<Vec<WeightedFocalSet>, FrameError> {
        let frame = Frame::new(candidates.iter().map(|c| c.id.as_str()))?;
        Ok(candidates
            .iter()
            .enumerate()
            .flat_map(|(index, candidate)| {
                self.evaluate_candidate(reference, candidate, index, frame.len())
            })
            .collect())
    }
}

/// Measures the distance between the reference and candidate geometries.
#[derive(Debug, Clone)]
pub struct DistanceSource {
    name: String,
    weight: f64,
    banks: OutcomeBanks,
}

impl DistanceSource {
    pub fn new(name: impl Into<String>, banks: OutcomeBanks) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            banks,
        }
    }

    /// Sets the reliability the source's evidence is discounted by.
    pub fn with_weight(self, weight: f64) -> Self {
        Self { weight, ..self }
    }
}

impl<G: Geometry> EvidenceSource<G> for DistanceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn banks(&self) -> &OutcomeBanks {
        &self.banks
    }

    fn measure(&self, reference: &G, candidate: &G) -> Option<f64> {
        let distance = reference.distance(candidate);
        (!distance.is_nan()).then_some(distance)
    }
}

/// Measures the acute angle, in degrees, between the principal directions of the reference and candidate
/// geometries. Does not apply to geometries without a direction.
#[derive(Debug, Clone)]
pub struct OrientationSource {
    name: String,
    weight: f64,
    banks: OutcomeBanks,
}

impl OrientationSource {
    pub fn new(name: impl Into<String>, banks: OutcomeBanks) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            banks,
        }
    }

    /// Sets the reliability the source's evidence is discounted by.
    pub fn with_weight(self, weight: f64) -> Self {
        Self { weight, ..self }
    }
}

impl<G: Geometry> EvidenceSource<G> for OrientationSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn banks(&self) -> &OutcomeBanks {
        &self.banks
    }

    fn measure(&self, reference: &G, candidate: &G) -> Option<f64> {
        Some(orientation_difference(
            reference.orientation()?,
            candidate.orientation()?,
        ))
    }
}
