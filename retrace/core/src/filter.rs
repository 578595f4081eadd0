//! Bit filter controlling structured diff output.

use crate::{DeltaError, DeltaResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Selects which sides and which kinds of content a diff materializes.
///
/// Side bits (`ORIGINAL`, `MUTATED`) and content bits (`DATA`,
/// `ATTRIBUTE`, `CUSTOM`, `CHILDREN`) combine freely; `PROPERTY` is the
/// union of the three property kinds and `ALL` selects everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFilter(u32);

impl DiffFilter {
    /// Report values as they were when tracking began.
    pub const ORIGINAL: DiffFilter = DiffFilter(0x01);
    /// Report values as they are now.
    pub const MUTATED: DiffFilter = DiffFilter(0x02);
    /// Character-data edits.
    pub const DATA: DiffFilter = DiffFilter(0x04);
    /// Attribute edits, namespaced or plain.
    pub const ATTRIBUTE: DiffFilter = DiffFilter(0x08);
    /// Custom (embedder-defined) property edits.
    pub const CUSTOM: DiffFilter = DiffFilter(0x10);
    /// Child-list placement changes.
    pub const CHILDREN: DiffFilter = DiffFilter(0x20);
    /// All property kinds.
    pub const PROPERTY: DiffFilter =
        DiffFilter(Self::DATA.0 | Self::ATTRIBUTE.0 | Self::CUSTOM.0);
    /// Both sides, every kind of content.
    pub const ALL: DiffFilter =
        DiffFilter(Self::ORIGINAL.0 | Self::MUTATED.0 | Self::PROPERTY.0 | Self::CHILDREN.0);

    const SIDES: u32 = Self::ORIGINAL.0 | Self::MUTATED.0;
    const CONTENT: u32 = Self::PROPERTY.0 | Self::CHILDREN.0;

    /// Raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    pub fn contains(self, other: DiffFilter) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set in `self`.
    pub fn intersects(self, other: DiffFilter) -> bool {
        self.0 & other.0 != 0
    }

    /// Reject filters that carry unknown bits, select no side, or select
    /// no content. Both degenerate cases would produce an always-empty
    /// diff, which is a caller bug rather than a useful answer.
    pub fn validate(self) -> DeltaResult<Self> {
        let known = Self::SIDES | Self::CONTENT;
        if self.0 == 0 || self.0 & !known != 0 {
            return Err(DeltaError::invalid_filter(self.0));
        }
        if self.0 & Self::SIDES == 0 || self.0 & Self::CONTENT == 0 {
            return Err(DeltaError::invalid_filter(self.0));
        }
        Ok(self)
    }
}

impl BitOr for DiffFilter {
    type Output = DiffFilter;

    fn bitor(self, rhs: DiffFilter) -> DiffFilter {
        DiffFilter(self.0 | rhs.0)
    }
}

impl BitOrAssign for DiffFilter {
    fn bitor_assign(&mut self, rhs: DiffFilter) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for DiffFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter({:#06x})", self.0)
    }
}
