//! Deferred sibling resolution.
//!
//! A promise stands for "the original sibling of `origin` in `direction`,
//! pending discovery of intermediate siblings". It is not a task: it is a
//! struct pointed at from exactly one mutated-side slot (the `pointer`),
//! resumed synchronously when that slot's value becomes known. The arena
//! is cleared wholesale by `clear`/`revert`.

use retrace_core::{Direction, NodeId, PromiseId};

/// A pending original-sibling computation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Promise {
    /// The record whose original side is being sought.
    pub origin: NodeId,
    /// Which side of the origin is sought; also the direction walked.
    pub direction: Direction,
    /// The record whose mutated-side slot the promise is parked in, once
    /// a walk suspends. Survives slot refreshes so joint encounters can
    /// still be detected during synchronization.
    pub pointer: Option<NodeId>,
}

/// Slab arena of promises.
#[derive(Debug, Default)]
pub(crate) struct PromiseArena {
    slots: Vec<Option<Promise>>,
    free: Vec<u32>,
}

impl PromiseArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, origin: NodeId, direction: Direction) -> PromiseId {
        let promise = Promise {
            origin,
            direction,
            pointer: None,
        };
        match self.free.pop() {
            Some(i) => {
                self.slots[i as usize] = Some(promise);
                PromiseId::new(i)
            }
            None => {
                self.slots.push(Some(promise));
                PromiseId::new((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn get(&self, id: PromiseId) -> Option<&Promise> {
        self.slots.get(id.raw() as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: PromiseId) -> Option<&mut Promise> {
        self.slots.get_mut(id.raw() as usize)?.as_mut()
    }

    /// Take a promise out of the arena, freeing its slot.
    pub fn take(&mut self, id: PromiseId) -> Option<Promise> {
        let promise = self.slots.get_mut(id.raw() as usize)?.take();
        if promise.is_some() {
            self.free.push(id.raw());
        }
        promise
    }

    /// Ids of all live promises.
    pub fn ids(&self) -> Vec<PromiseId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .map(|(i, _)| PromiseId::new(i as u32))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}
