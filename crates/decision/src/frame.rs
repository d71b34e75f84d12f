use crate::{FocalSet, FrameError};
use std::{collections::HashSet, hash::Hash};

/// A member of a [`Frame`] of discernment.
///
/// Each candidate hypothesis states that the reference feature corresponds to that candidate. The reserved
/// `NoMatch` hypothesis states that the reference feature has no counterpart among the candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Hypothesis<C> {
    Candidate(C),
    NoMatch,
}

impl<C> Hypothesis<C> {
    /// The candidate this hypothesis refers to, `None` for [`Hypothesis::NoMatch`].
    pub fn candidate(&self) -> Option<&C> {
        match self {
            Hypothesis::Candidate(c) => Some(c),
            Hypothesis::NoMatch => None,
        }
    }
}

/// The ordered, exhaustive set of mutually exclusive hypotheses for one reference feature.
///
/// Candidates keep the order they were given in and the reserved [`Hypothesis::NoMatch`] is always last.
/// The frame fixes the bit layout of every [`FocalSet`] produced while evaluating the reference feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<C> {
    hypotheses: Vec<Hypothesis<C>>,
}

impl<C: Eq + Hash> Frame<C> {
    /// Builds a frame from the candidates of a reference feature.
    ///
    /// Returns [`FrameError::Empty`] if there are no candidates, [`FrameError::DuplicateCandidate`] if a candidate
    /// appears twice and [`FrameError::Capacity`] if the candidates plus the no-match hypothesis do not fit in a
    /// [`FocalSet`].
    pub fn new<I>(candidates: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = C>,
    {
        let candidates: Vec<C> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(FrameError::Empty);
        }
        let mut seen = HashSet::with_capacity(candidates.len());
        if let Some(position) = candidates.iter().position(|c| !seen.insert(c)) {
            return Err(FrameError::DuplicateCandidate(position));
        }
        if candidates.len() + 1 > FocalSet::CAPACITY {
            return Err(FrameError::Capacity(candidates.len() + 1));
        }
        let mut hypotheses: Vec<Hypothesis<C>> =
            candidates.into_iter().map(Hypothesis::Candidate).collect();
        hypotheses.push(Hypothesis::NoMatch);
        Ok(Self { hypotheses })
    }
}

impl<C> Frame<C> {
    /// The number of hypotheses, including [`Hypothesis::NoMatch`].
    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    /// Always `false`, a frame holds at least one candidate and the no-match hypothesis.
    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    pub fn hypotheses(&self) -> &[Hypothesis<C>] {
        &self.hypotheses
    }

    pub fn get(&self, index: usize) -> Option<&Hypothesis<C>> {
        self.hypotheses.get(index)
    }

    /// Iterates the candidates with their hypothesis indices.
    pub fn candidates(&self) -> impl Iterator<Item = (usize, &C)> {
        self.hypotheses
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.candidate().map(|c| (i, c)))
    }

    /// The index of the reserved no-match hypothesis.
    pub fn no_match_index(&self) -> usize {
        self.hypotheses.len() - 1
    }

    /// The number of bytes in the byte encoding of this frame's focal sets.
    pub fn byte_width(&self) -> usize {
        FocalSet::byte_width(self.len())
    }

    /// Total ignorance: the set of every hypothesis.
    pub fn full(&self) -> FocalSet {
        FocalSet::full(self.len())
    }

    /// The focal set `{hᵢ}`.
    pub fn singleton(&self, index: usize) -> Result<FocalSet, FrameError> {
        if index >= self.len() {
            return Err(FrameError::UnknownHypothesis);
        }
        Ok(FocalSet::singleton(index))
    }

    /// The focal set `Θ \ {hᵢ}`.
    pub fn complement_of(&self, index: usize) -> Result<FocalSet, FrameError> {
        Ok(self.singleton(index)?.complement(self.len()))
    }

    /// Encodes a subset of the frame given by hypothesis indices.
    pub fn encode_indices(&self, indices: &[usize]) -> Result<FocalSet, FrameError> {
        indices
            .iter()
            .try_fold(FocalSet::EMPTY, |set, index| Ok(set | self.singleton(*index)?))
    }

    /// Lists the hypotheses a focal set refers to, in frame order.
    pub fn decode(&self, focal_set: FocalSet) -> Vec<&Hypothesis<C>> {
        focal_set
            .indices()
            .take_while(|i| *i < self.len())
            .map(|i| &self.hypotheses[i])
            .collect()
    }
}

impl<C: PartialEq> Frame<C> {
    pub fn index_of(&self, hypothesis: &Hypothesis<C>) -> Option<usize> {
        self.hypotheses.iter().position(|h| h == hypothesis)
    }

    /// Encodes a subset of the frame. Repeated hypotheses are accepted and encoded once.
    pub fn encode(&self, subset: &[Hypothesis<C>]) -> Result<FocalSet, FrameError> {
        subset.iter().try_fold(FocalSet::EMPTY, |set, hypothesis| {
            let index = self
                .index_of(hypothesis)
                .ok_or(FrameError::UnknownHypothesis)?;
            Ok(set | FocalSet::singleton(index))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_appends_no_match() -> Result<(), Box<dyn std::error::Error>> {
        let frame = Frame::new(["a", "b"])?;
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.no_match_index(), 2);
        assert_eq!(frame.get(2), Some(&Hypothesis::NoMatch));
        assert_eq!(
            frame.candidates().collect::<Vec<_>>(),
            vec![(0, &"a"), (1, &"b")]
        );
        Ok(())
    }

    #[test]
    fn frame_rejects_malformed_input() {
        assert_eq!(Frame::<u32>::new([]), Err(FrameError::Empty));
        assert_eq!(Frame::new(0..127u32).map(|f| f.len()), Ok(128));
        assert_eq!(Frame::new(0..128u32), Err(FrameError::Capacity(129)));
    }

    #[test]
    fn frame_rejects_duplicate_candidates() {
        assert_eq!(Frame::new(["a", "a"]), Err(FrameError::DuplicateCandidate(1)));
        assert_eq!(
            Frame::new(["a", "b", "c", "b"]),
            Err(FrameError::DuplicateCandidate(3))
        );
        assert!(Frame::new(["a", "b"]).is_ok());
    }

    #[test]
    fn encode_is_injective_and_stable() -> Result<(), Box<dyn std::error::Error>> {
        let frame = Frame::new(["a", "b", "c"])?;
        let a = Hypothesis::Candidate("a");
        let c = Hypothesis::Candidate("c");
        let ac = frame.encode(&[a.clone(), c.clone()])?;
        assert_eq!(ac, frame.encode(&[c.clone(), a.clone(), a.clone()])?);
        assert_ne!(ac, frame.encode(&[a.clone()])?);
        assert_eq!(ac.to_bytes(frame.len()), vec![0b0101]);
        assert_eq!(
            frame.encode(&[Hypothesis::Candidate("z")]),
            Err(FrameError::UnknownHypothesis)
        );
        assert_eq!(frame.decode(ac), vec![&a, &c]);
        Ok(())
    }

    #[test]
    fn complement_excludes_only_the_hypothesis() -> Result<(), Box<dyn std::error::Error>> {
        let frame = Frame::new(["a", "b"])?;
        let not_a = frame.complement_of(0)?;
        assert_eq!(
            frame.decode(not_a),
            vec![&Hypothesis::Candidate("b"), &Hypothesis::NoMatch]
        );
        assert_eq!(frame.singleton(3), Err(FrameError::UnknownHypothesis));
        assert_eq!(frame.full(), FocalSet::full(3));
        assert_eq!(frame.encode_indices(&[1, 2])?, not_a);
        assert_eq!(frame.encode_indices(&[0, 5]), Err(FrameError::UnknownHypothesis));
        Ok(())
    }
}
