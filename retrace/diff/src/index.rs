//! Sibling indexes for efficient neighbor lookups.
//!
//! One map per `(layer, side)` combination, keyed by the *sibling* node and
//! pointing at the record that names it in that slot. Only concrete node
//! siblings are indexed; `End`, `Unknown` and parked promises are not.

use crate::record::{Layer, MovedRecord};
use retrace_core::{Direction, NodeId, Position, Sibling};
use std::collections::HashMap;

/// Bidirectional sibling lookup: `sibling node -> owning record's node`.
#[derive(Debug, Default)]
pub(crate) struct SiblingIndex {
    maps: [HashMap<NodeId, NodeId>; 4],
}

fn slot(layer: Layer, dir: Direction) -> usize {
    let l = match layer {
        Layer::Original => 0,
        Layer::Mutated => 2,
    };
    let d = match dir {
        Direction::Prev => 0,
        Direction::Next => 1,
    };
    l + d
}

impl SiblingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record whose `layer`/`dir` slot names `sibling`.
    pub fn lookup(&self, layer: Layer, dir: Direction, sibling: NodeId) -> Option<NodeId> {
        self.maps[slot(layer, dir)].get(&sibling).copied()
    }

    /// Index every concrete sibling of a record's triples.
    pub fn add(&mut self, rec: &MovedRecord) {
        for layer in [Layer::Original, Layer::Mutated] {
            for dir in [Direction::Prev, Direction::Next] {
                if let Some(Sibling::Node(k)) = rec.side(layer, dir) {
                    self.insert_key(layer, dir, k, rec.node);
                }
            }
        }
    }

    /// Drop every index entry owned by a record.
    pub fn remove(&mut self, rec: &MovedRecord) {
        for layer in [Layer::Original, Layer::Mutated] {
            self.remove_layer(rec, layer);
        }
    }

    /// Drop the index entries of one layer of a record.
    pub fn remove_layer(&mut self, rec: &MovedRecord, layer: Layer) {
        for dir in [Direction::Prev, Direction::Next] {
            if let Some(Sibling::Node(k)) = rec.side(layer, dir) {
                self.remove_key(layer, dir, k, rec.node);
            }
        }
    }

    /// Write one sibling slot, keeping the index in sync. Returns the old
    /// slot value.
    ///
    /// When the targeted triple is still absent it is lazily created with
    /// both sides unknown, treating the record as living in `parent_hint`;
    /// with no hint the call is a no-op reporting `Unknown`.
    pub fn update(
        &mut self,
        rec: &mut MovedRecord,
        layer: Layer,
        dir: Direction,
        new: Sibling,
        parent_hint: Option<NodeId>,
    ) -> Sibling {
        let node = rec.node;
        let triple = rec.layer_mut(layer);
        if triple.is_none() {
            match parent_hint {
                Some(parent) => *triple = Some(Position::unknown(parent)),
                None => return Sibling::Unknown,
            }
        }
        let pos = triple.as_mut().expect("triple just ensured");
        let old = pos.side(dir);
        if let Sibling::Node(k) = old {
            self.remove_key(layer, dir, k, node);
        }
        pos.set_side(dir, new);
        if let Sibling::Node(k) = new {
            self.insert_key(layer, dir, k, node);
        }
        old
    }

    pub fn clear(&mut self) {
        for map in &mut self.maps {
            map.clear();
        }
    }

    fn insert_key(&mut self, layer: Layer, dir: Direction, sibling: NodeId, owner: NodeId) {
        self.maps[slot(layer, dir)].insert(sibling, owner);
    }

    fn remove_key(&mut self, layer: Layer, dir: Direction, sibling: NodeId, owner: NodeId) {
        let map = &mut self.maps[slot(layer, dir)];
        if map.get(&sibling) == Some(&owner) {
            map.remove(&sibling);
        }
    }

    /// Check that a record's concrete slots and the maps agree (test aid).
    #[cfg(debug_assertions)]
    pub fn is_consistent_with(&self, rec: &MovedRecord) -> bool {
        for layer in [Layer::Original, Layer::Mutated] {
            for dir in [Direction::Prev, Direction::Next] {
                if let Some(Sibling::Node(k)) = rec.side(layer, dir) {
                    if self.lookup(layer, dir, k) != Some(rec.node) {
                        return false;
                    }
                }
            }
        }
        true
    }
}
