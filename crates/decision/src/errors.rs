/// Returned when a [`Frame`](crate::Frame) cannot be built or a subset cannot be encoded against it.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum FrameError {
    #[error("frame of discernment must contain at least one candidate")]
    Empty,
    #[error("candidate at position {0} is already part of the frame of discernment")]
    DuplicateCandidate(usize),
    #[error("frame of discernment has {0} hypotheses, exceeding the focal set capacity of 128")]
    Capacity(usize),
    #[error("hypothesis is not a member of the frame of discernment")]
    UnknownHypothesis,
    #[error("focal set encoding of {0} bytes exceeds the focal set capacity")]
    EncodingTooWide(usize),
}

/// Returned when two or more mass functions cannot be combined.
#[derive(thiserror::Error, Debug, PartialEq, Clone)]
pub enum CombinationError {
    #[error("total conflict between mass functions, combination is undefined")]
    TotalConflict,
    #[error("mass functions are defined over frames of different widths: {0} and {1}")]
    FrameMismatch(usize, usize),
    #[error("invalid mass function: {0}")]
    InvalidMass(String),
    #[error("no mass functions to combine")]
    Empty,
}

/// Returned when [`decide`](crate::decide) cannot apply a [`DecisionPolicy`](crate::DecisionPolicy) to a mass function.
#[derive(thiserror::Error, Debug, PartialEq, Clone)]
pub enum DecisionError {
    #[error("threshold out of range: {0}")]
    ThresholdOutOfRange(f64),
    #[error("mass function width {mass} does not match the frame of {frame} hypotheses")]
    FrameMismatch { mass: usize, frame: usize },
}
