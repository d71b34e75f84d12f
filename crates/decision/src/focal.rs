use crate::FrameError;
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// A subset of a [`Frame`](crate::Frame) of discernment, encoded as a fixed-width bit set.
///
/// Bit `i` is set when the hypothesis at index `i` of the frame belongs to the subset. The empty set
/// represents total conflict and the set with every bit of the frame width set represents total ignorance.
///
/// Focal sets order the same way their big-endian byte encodings order lexicographically, which is what
/// gives canonical mass functions their deterministic ordering.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default)]
pub struct FocalSet(u128);

impl FocalSet {
    /// The maximum number of hypotheses a frame may hold.
    pub const CAPACITY: usize = u128::BITS as usize;

    /// The empty set.
    pub const EMPTY: FocalSet = FocalSet(0);

    /// Builds a focal set directly from its bit representation.
    pub const fn from_bits(bits: u128) -> Self {
        Self(bits)
    }

    /// The raw bit representation.
    pub const fn bits(&self) -> u128 {
        self.0
    }

    /// The set containing only the hypothesis at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`CAPACITY`](FocalSet::CAPACITY). [`Frame`](crate::Frame) guarantees this
    /// for every index it hands out.
    pub fn singleton(index: usize) -> Self {
        assert!(index < Self::CAPACITY, "hypothesis index out of range");
        Self(1u128 << index)
    }

    /// The set of all hypotheses in a frame of `width` hypotheses.
    pub fn full(width: usize) -> Self {
        if width >= Self::CAPACITY {
            Self(u128::MAX)
        } else {
            Self((1u128 << width) - 1)
        }
    }

    /// The hypotheses of a `width`-sized frame that are not part of this set.
    pub fn complement(&self, width: usize) -> Self {
        Self(!self.0 & Self::full(width).0)
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The number of hypotheses in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(&self, index: usize) -> bool {
        index < Self::CAPACITY && self.0 & (1u128 << index) != 0
    }

    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Iterates the indices of the hypotheses in the set in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..Self::CAPACITY).filter(move |i| bits & (1u128 << i) != 0)
    }

    /// The number of bytes needed to encode a focal set of a `width`-sized frame.
    pub fn byte_width(width: usize) -> usize {
        (width + 7) / 8
    }

    /// Encodes the set as `⌈width / 8⌉` big-endian bytes.
    ///
    /// The encoding is injective over the subsets of a `width`-sized frame, and the same subset always
    /// produces byte-identical output.
    pub fn to_bytes(&self, width: usize) -> Vec<u8> {
        let n = Self::byte_width(width.min(Self::CAPACITY));
        let bytes = self.0.to_be_bytes();
        bytes[bytes.len() - n..].to_vec()
    }

    /// Decodes a big-endian byte encoding produced by [`to_bytes`](FocalSet::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() > Self::CAPACITY / 8 {
            return Err(FrameError::EncodingTooWide(bytes.len()));
        }
        Ok(Self(
            bytes
                .iter()
                .fold(0u128, |bits, byte| (bits << 8) | u128::from(*byte)),
        ))
    }
}

impl BitAnd for FocalSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(&rhs)
    }
}

impl BitOr for FocalSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(&rhs)
    }
}

impl fmt::Debug for FocalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FocalSet({self})")
    }
}

impl fmt::Display for FocalSet {
    /// Formats the set as the list of its hypothesis indices, e.g. `{0,2}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices: Vec<String> = self.indices().map(|i| i.to_string()).collect();
        write!(f, "{{{}}}", indices.join(","))
    }
}
