//! The config module provides the internal representation of geomatch's calibration configuration.

use geomatch_decision::{CombinationRule, Criterion, DecisionPolicy};
use geomatch_evidence::{
    DistanceSource, EvidenceSource, MatchError, Matcher, OrientationSource, OutcomeBanks, Shape,
};
use regex::Regex;
use validator::Validate;

lazy_static! {
    static ref RE_VALID_REFERENCE: Regex = Regex::new(r"^[_a-z]+$").unwrap();
}

/// The root of a geomatch configuration.
///
/// Wraps the decision thresholds, the batch runtime settings and the calibrated evidence sources.
#[derive(Debug, Clone)]
pub struct Config {
    /// Configuration for the decision layer.
    pub decision: Decision,
    /// Configuration for the batch runtime.
    pub runtime: Runtime,
    /// The evidence sources, in the order their evidence is combined.
    pub sources: Vec<Source>,
}

impl Config {
    /// Looks up the [`Source`] corresponding to the `reference` string.
    ///
    /// # Arguments
    ///
    /// * `reference` - A string that corresponds to a [`Source::reference`] value.
    pub fn source(&self, reference: &str) -> Option<&Source> {
        self.sources
            .iter()
            .find(|&source| source.reference == reference)
    }

    /// Builds a [`Matcher`] from the configured sources and decision settings.
    pub fn matcher(&self) -> Result<Matcher<Shape>, MatchError> {
        Matcher::new(
            self.sources.iter().map(Source::build).collect(),
            self.decision.policy(),
            self.decision.rule,
        )
    }
}

/// Configuration for the decision layer.
///
/// Every threshold is a fraction in the 0.0 to 1.0 range.
#[derive(Debug, Clone, Copy, Validate)]
pub struct Decision {
    /// The minimum score the winning hypothesis needs for a non-ambiguous verdict.
    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: f64,
    /// Any combination with more conflict than this produces an ambiguous verdict.
    #[validate(range(min = 0.0, max = 1.0))]
    pub max_conflict: f64,
    /// The winner is ambiguous if the runner-up scores within this margin of it.
    #[validate(range(min = 0.0, max = 1.0))]
    pub tie_margin: f64,
    /// The score hypotheses are ranked by.
    pub criterion: Criterion,
    /// The rule used to merge the evidence of independent sources.
    pub rule: CombinationRule,
}

impl Decision {
    /// The [`DecisionPolicy`] for these settings.
    pub fn policy(&self) -> DecisionPolicy {
        DecisionPolicy {
            threshold: self.threshold,
            max_conflict: self.max_conflict,
            tie_margin: self.tie_margin,
            criterion: self.criterion,
        }
    }
}

impl Default for Decision {
    /// Default decision settings.
    fn default() -> Self {
        Self {
            threshold: geomatch_decision::DEFAULT_THRESHOLD,
            max_conflict: geomatch_decision::DEFAULT_MAX_CONFLICT,
            tie_margin: geomatch_decision::DEFAULT_TIE_MARGIN,
            criterion: Criterion::default(),
            rule: CombinationRule::default(),
        }
    }
}

/// Configuration for the batch runtime.
#[derive(Debug, Clone, Validate)]
pub struct Runtime {
    /// The maximum number of reference features evaluated at the same time.
    #[validate(range(min = 1))]
    pub max_concurrent_features: usize,
    /// The maximum amount of time, in milliseconds, a single reference feature may take. No limit if unset.
    pub feature_timeout_ms: Option<u64>,
}

/// The default [`Runtime::max_concurrent_features`] value: the number of logical CPUs.
pub fn default_max_concurrent_features() -> usize {
    num_cpus::get()
}

impl Default for Runtime {
    /// Default runtime config
    fn default() -> Self {
        Self {
            max_concurrent_features: default_max_concurrent_features(),
            feature_timeout_ms: None,
        }
    }
}

/// The criterion an evidence source measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// The distance between the reference and candidate geometries. See [`DistanceSource`].
    Distance,
    /// The angle between the principal directions of the geometries. See [`OrientationSource`].
    Orientation,
}

/// The configuration for an individual evidence source.
#[derive(Debug, Validate, Clone)]
pub struct Source {
    /// The source reference key. Should be limited to ASCII lowercase a-z plus underscores. Maximum 96 characters.
    #[validate(length(min = 1, max = 96), regex(path = "RE_VALID_REFERENCE"))]
    pub reference: String,
    /// The criterion this source measures.
    pub kind: SourceKind,
    /// The reliability this source's evidence is discounted by.
    ///
    /// A 1.0 value has no effect. See [`geomatch_decision::MassFunction::discount`].
    #[validate(range(min = 0.0, max = 1.0))]
    pub weight: f64,
    /// The calibrated membership functions for each outcome.
    pub banks: OutcomeBanks,
}

/// The default [`Source::weight`] value.
pub const DEFAULT_SOURCE_WEIGHT: f64 = 1.0;

impl Source {
    /// Builds the evidence source this configuration describes.
    pub fn build(&self) -> Box<dyn EvidenceSource<Shape>> {
        match self.kind {
            SourceKind::Distance => Box::new(
                DistanceSource::new(self.reference.clone(), self.banks.clone())
                    .with_weight(self.weight),
            ),
            SourceKind::Orientation => Box::new(
                OrientationSource::new(self.reference.clone(), self.banks.clone())
                    .with_weight(self.weight),
            ),
        }
    }

    /// The number of membership functions across all of the source's banks.
    pub fn function_count(&self) -> usize {
        [
            &self.banks.matched,
            &self.banks.not_matched,
            &self.banks.undecided,
        ]
        .into_iter()
        .flatten()
        .map(|bank| bank.len())
        .sum()
    }
}
