use crate::MembershipFunction;
use geomatch_decision::FocalSet;
use tracing::{trace, warn};

/// The semantic outcomes a membership bank can attest for a candidate `h`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    /// Evidence for `{h}`.
    Matched,
    /// Evidence for `Θ \ {h}`.
    NotMatched,
    /// Evidence for `Θ`, i.e. the criterion does not decide.
    Undecided,
}

impl Outcome {
    /// The focal set this outcome assigns mass to for the hypothesis at `index` in a frame of `width` hypotheses.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`FocalSet::CAPACITY`].
    pub fn focal_set(&self, index: usize, width: usize) -> FocalSet {
        match self {
            Outcome::Matched => FocalSet::singleton(index),
            Outcome::NotMatched => FocalSet::singleton(index).complement(width),
            Outcome::Undecided => FocalSet::full(width),
        }
    }
}

/// An ordered list of membership functions for one outcome.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MembershipBank {
    functions: Vec<MembershipFunction>,
}

impl MembershipBank {
    pub fn new(functions: Vec<MembershipFunction>) -> Self {
        Self { functions }
    }

    pub fn functions(&self) -> &[MembershipFunction] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Converts a criterion value into a mass.
    ///
    /// Only the first function, in configured order, whose interval contains `value` is evaluated; later
    /// overlapping functions are ignored. A value outside every interval is a calibration gap and yields 0.0.
    /// An evaluation fault is logged and also yields 0.0.
    pub fn evaluate(&self, value: f64) -> f64 {
        let Some(function) = self.functions.iter().find(|f| f.contains(value)) else {
            trace!(message = "calibration gap", value = value);
            return 0.0;
        };
        match function.evaluate(value) {
            Ok(mass) => mass,
            Err(e) => {
                warn!(
                    message = "membership function fault",
                    value = value,
                    lower = function.lower(),
                    upper = function.upper(),
                    error_message = %e,
                );
                0.0
            }
        }
    }
}

/// The membership banks of an evidence source, one optional bank per [`Outcome`].
///
/// A missing bank contributes no mass for its outcome.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutcomeBanks {
    pub matched: Option<MembershipBank>,
    pub not_matched: Option<MembershipBank>,
    pub undecided: Option<MembershipBank>,
}

impl OutcomeBanks {
    pub fn bank(&self, outcome: Outcome) -> Option<&MembershipBank> {
        match outcome {
            Outcome::Matched => self.matched.as_ref(),
            Outcome::NotMatched => self.not_matched.as_ref(),
            Outcome::Undecided => self.undecided.as_ref(),
        }
    }

    /// Evaluates the bank for `outcome` at `value`, 0.0 if the bank is missing.
    pub fn evaluate(&self, outcome: Outcome, value: f64) -> f64 {
        self.bank(outcome).map_or(0.0, |bank| bank.evaluate(value))
    }
}
