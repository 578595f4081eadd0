//! Floating-node records.

use retrace_core::{Direction, NodeId, Position, Sibling};

/// Which of a record's two placements a sibling slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Layer {
    /// The placement at the moment tracking began.
    Original,
    /// The placement as reflected by ingested notifications.
    Mutated,
}

/// Bitset of sides already examined for one revert candidate.
///
/// Cleared whenever a mutation disturbs the record's neighborhood, so a
/// side that failed once is not re-walked until something changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SideSet(u8);

impl SideSet {
    fn bit(dir: Direction) -> u8 {
        match dir {
            Direction::Prev => 0b01,
            Direction::Next => 0b10,
        }
    }

    pub fn insert(&mut self, dir: Direction) {
        self.0 |= Self::bit(dir);
    }

    pub fn contains(&self, dir: Direction) -> bool {
        self.0 & Self::bit(dir) != 0
    }

    pub fn is_full(&self) -> bool {
        self.0 == 0b11
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// A node whose effective placement differs from its original one.
///
/// `original == None` means the node did not exist in tracked scope when
/// tracking began; `mutated == None` means the node is presently removed.
/// Both are never `None` together outside a single ingest step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MovedRecord {
    pub node: NodeId,
    pub original: Option<Position>,
    pub mutated: Option<Position>,
    pub tried: SideSet,
}

impl MovedRecord {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            original: None,
            mutated: None,
            tried: SideSet::default(),
        }
    }

    /// The triple for a layer.
    pub fn layer(&self, layer: Layer) -> Option<Position> {
        match layer {
            Layer::Original => self.original,
            Layer::Mutated => self.mutated,
        }
    }

    /// Mutable access to the triple for a layer.
    pub fn layer_mut(&mut self, layer: Layer) -> &mut Option<Position> {
        match layer {
            Layer::Original => &mut self.original,
            Layer::Mutated => &mut self.mutated,
        }
    }

    /// One sibling slot, `None` when the whole triple is absent.
    pub fn side(&self, layer: Layer, dir: Direction) -> Option<Sibling> {
        self.layer(layer).map(|pos| pos.side(dir))
    }
}
