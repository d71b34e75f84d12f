use geomatch_decision::{CombinationError, DecisionError, FrameError};

/// Returned when a membership function cannot be built or cannot produce a mass for a value.
///
/// Evaluation errors never escape a [`MembershipBank`](crate::MembershipBank), which logs them and contributes
/// zero mass instead.
#[derive(thiserror::Error, Debug, PartialEq, Clone)]
pub enum FunctionError {
    #[error("invalid interval: lower bound {lower} must be below upper bound {upper}")]
    InvalidInterval { lower: f64, upper: f64 },
    #[error("value {value} is outside the function domain ({lower}, {upper})")]
    OutOfDomain { value: f64, lower: f64, upper: f64 },
    #[error("invalid function parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("function produced a non-finite mass for {0}")]
    NonFinite(f64),
    #[error("function produced mass {0} outside of the 0.0 to 1.0 range")]
    MassOutOfRange(f64),
}

/// Returned when a [`Matcher`](crate::Matcher) cannot be built or cannot evaluate a reference feature.
#[derive(thiserror::Error, Debug)]
pub enum MatchError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] FrameError),
    #[error(transparent)]
    Combination(#[from] CombinationError),
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error(transparent)]
    InvalidPolicy(#[from] validator::ValidationErrors),
    #[error("a matcher needs at least one evidence source")]
    NoSources,
}
