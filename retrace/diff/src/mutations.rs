//! The child-list mutation engine.
//!
//! Ingests batched tree-mutation windows and maintains the floating set:
//! one record per node whose effective placement differs from its original
//! one. Each window reveals a contiguous pre-state slice
//! `prev, removed.., next`; the engine materializes that reveal into the
//! affected records, resumes promises parked on the revealed slots, fills
//! original siblings for newly floated nodes, ingests the post-state, and
//! finally propagates fixedness so any record back at its original
//! placement is dropped.
//!
//! Invariants hold at method boundaries only:
//! - every floating record has at least one placement
//! - sibling indexes mirror record slots exactly
//! - no record survives with identical settled placements

use crate::index::SiblingIndex;
use crate::record::{Layer, MovedRecord};
use crate::promise::PromiseArena;
use retrace_core::{DeltaResult, Direction, NodeId, Position, PromiseId, Sibling};
use retrace_tree::{TreeMutator, TreeReader};
use std::collections::{HashMap, HashSet, VecDeque};

/// Structural revert statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RevertStats {
    /// Groups of nodes moved back to their original placement.
    pub groups_moved: usize,
    /// Groups skipped because no placement anchor was known.
    pub groups_skipped: usize,
    /// Nodes detached for good: additions whose removal is the revert.
    pub nodes_removed: usize,
}

/// Tracker of child-list deltas against the tracking-start tree.
#[derive(Debug, Default)]
pub(crate) struct TreeMutations {
    floating: HashMap<NodeId, MovedRecord>,
    index: SiblingIndex,
    promises: PromiseArena,
}

impl TreeMutations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of floating records.
    pub fn len(&self) -> usize {
        self.floating.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floating.is_empty()
    }

    pub fn is_floating(&self, node: NodeId) -> bool {
        self.floating.contains_key(&node)
    }

    /// All floating records.
    pub fn records(&self) -> impl Iterator<Item = &MovedRecord> {
        self.floating.values()
    }

    pub fn record(&self, node: NodeId) -> Option<&MovedRecord> {
        self.floating.get(&node)
    }

    /// Drop all tracked state.
    pub fn clear(&mut self) {
        self.floating.clear();
        self.index.clear();
        self.promises.clear();
    }

    /// Ingest one batched child-list window.
    ///
    /// `prev`/`next` are the point-in-time siblings framing the window at
    /// the moment this batch occurred, which may differ from the live
    /// tree's current state.
    pub fn mutation(
        &mut self,
        parent: NodeId,
        removed: &[NodeId],
        added: &[NodeId],
        prev: Option<NodeId>,
        next: Option<NodeId>,
    ) {
        if removed.is_empty() && added.is_empty() {
            return;
        }
        let prev_sib = Sibling::from_reported(prev);
        let next_sib = Sibling::from_reported(next);
        let mut candidates: Vec<NodeId> = Vec::new();

        // Records created by this window: fixed until now, so their
        // pre-state placement is also their original one.
        let mut fresh: HashSet<NodeId> = HashSet::new();
        for (i, &n) in removed.iter().enumerate() {
            if self.floating.contains_key(&n) {
                continue;
            }
            let mut rec = MovedRecord::new(n);
            rec.original = Some(Position::unknown(parent));
            rec.mutated = Some(Position {
                parent,
                prev: if i == 0 {
                    prev_sib
                } else {
                    Sibling::Node(removed[i - 1])
                },
                next: if i + 1 == removed.len() {
                    next_sib
                } else {
                    Sibling::Node(removed[i + 1])
                },
            });
            self.index.add(&rec);
            self.floating.insert(n, rec);
            fresh.insert(n);
        }

        // Step 1: materialize the revealed pre-state adjacency into the
        // already-floating window members and resume promises parked on
        // the revealed slots.
        self.scan_window(parent, removed, prev_sib, next_sib, &fresh, &mut candidates);

        // Step 3 (before the removal slots are cleared, so walks can still
        // traverse the pre-state window): fill original siblings of the
        // newly floated records.
        for (i, &n) in removed.iter().enumerate() {
            if fresh.contains(&n) {
                self.fill_original(n, i, removed, prev_sib, next_sib, &fresh, &mut candidates);
            }
        }

        // Step 2 (completion): ingest the removals.
        let mut cancelled: Vec<NodeId> = Vec::new();
        for &n in removed {
            let Some(rec) = self.floating.get(&n).copied() else {
                continue;
            };
            self.index.remove_layer(&rec, Layer::Mutated);
            if rec.original.is_none() {
                // A pure add removed again: the operations cancel out.
                cancelled.push(n);
                continue;
            }
            let entry = self.floating.get_mut(&n).expect("record just read");
            debug_assert!(
                !matches!(entry.mutated.map(|m| (m.prev, m.next)), Some((Sibling::Pending(_), _)) | Some((_, Sibling::Pending(_)))),
                "window scan must consume parked promises before removal"
            );
            entry.mutated = None;
            entry.tried.clear();
            if !fresh.contains(&n) && rec.original.map(|o| o.parent) == Some(parent) {
                candidates.push(n);
            }
        }
        for n in cancelled {
            self.drop_record(n);
        }

        // Step 4: retarget the window endpoints, then ingest additions.
        let first_new = added
            .first()
            .map(|&n| Sibling::Node(n))
            .unwrap_or(next_sib);
        let last_new = added
            .last()
            .map(|&n| Sibling::Node(n))
            .unwrap_or(prev_sib);
        if let Sibling::Node(p) = prev_sib {
            if self.is_floating(p) {
                self.update_slot(p, Layer::Mutated, Direction::Next, first_new, Some(parent));
                if self.original_parent(p) == Some(parent) {
                    candidates.push(p);
                }
            }
        }
        if let Sibling::Node(q) = next_sib {
            if self.is_floating(q) {
                self.update_slot(q, Layer::Mutated, Direction::Prev, last_new, Some(parent));
                if self.original_parent(q) == Some(parent) {
                    candidates.push(q);
                }
            }
        }
        for (i, &n) in added.iter().enumerate() {
            let pos = Position {
                parent,
                prev: if i == 0 {
                    prev_sib
                } else {
                    Sibling::Node(added[i - 1])
                },
                next: if i + 1 == added.len() {
                    next_sib
                } else {
                    Sibling::Node(added[i + 1])
                },
            };
            match self.floating.get(&n).copied() {
                None => {
                    // Never seen: did not exist in tracked scope at
                    // tracking start.
                    let mut rec = MovedRecord::new(n);
                    rec.mutated = Some(pos);
                    self.index.add(&rec);
                    self.floating.insert(n, rec);
                }
                Some(rec) => {
                    debug_assert!(rec.mutated.is_none(), "re-add without prior removal");
                    self.index.remove_layer(&rec, Layer::Mutated);
                    if rec.original.map(|o| o.parent) == Some(parent) {
                        candidates.push(n);
                    }
                    let entry = self.floating.get_mut(&n).expect("record just read");
                    entry.mutated = Some(pos);
                    entry.tried.clear();
                    let copy = *entry;
                    self.index.add(&copy);
                }
            }
        }

        // Step 5: fixedness propagation over every disturbed record.
        self.propagate(candidates);

        #[cfg(debug_assertions)]
        self.debug_validate();
    }

    fn original_parent(&self, node: NodeId) -> Option<NodeId> {
        self.floating
            .get(&node)
            .and_then(|r| r.original)
            .map(|o| o.parent)
    }

    /// Write one sibling slot through the index, clearing the record's
    /// tried-sides (its neighborhood was disturbed). Returns the old value.
    fn update_slot(
        &mut self,
        node: NodeId,
        layer: Layer,
        dir: Direction,
        value: Sibling,
        parent_hint: Option<NodeId>,
    ) -> Sibling {
        let Self {
            floating, index, ..
        } = self;
        match floating.get_mut(&node) {
            Some(rec) => {
                rec.tried.clear();
                index.update(rec, layer, dir, value, parent_hint)
            }
            None => Sibling::Unknown,
        }
    }

    // ==================== Window scan ====================

    /// Left-to-right lockstep scan over `prev, removed.., next`.
    ///
    /// Materializes the pre-state adjacency into each floating member's
    /// facing slots. A parked prev-direction promise popped off a slot
    /// resolves against the most recent solid element, joint-resolves with
    /// the pending next-direction promise, or escapes out of the left
    /// edge; a popped next-direction promise stays pending until the next
    /// solid element or escapes out of the right edge.
    fn scan_window(
        &mut self,
        parent: NodeId,
        removed: &[NodeId],
        prev_sib: Sibling,
        next_sib: Sibling,
        fresh: &HashSet<NodeId>,
        candidates: &mut Vec<NodeId>,
    ) {
        let mut items: Vec<Sibling> = Vec::with_capacity(removed.len() + 2);
        items.push(prev_sib);
        items.extend(removed.iter().map(|&n| Sibling::Node(n)));
        items.push(next_sib);

        let mut last_solid: Option<Sibling> = None;
        let mut pending_next: Option<PromiseId> = None;
        let mut escaped_left: Vec<PromiseId> = Vec::new();

        for i in 0..items.len() {
            let item = items[i];
            if let Sibling::Node(x) = item {
                if self.is_floating(x) {
                    if i > 0 {
                        let old =
                            self.update_slot(x, Layer::Mutated, Direction::Prev, items[i - 1], Some(parent));
                        if let Sibling::Pending(p) = old {
                            debug_assert!(
                                self.promises.get(p).map(|pr| pr.direction) == Some(Direction::Prev),
                                "prev slot can only park a prev-walking promise"
                            );
                            if let Some(q) = pending_next.take() {
                                self.joint_resolve(q, p, candidates);
                            } else if let Some(anchor) = last_solid {
                                self.resolve_promise(p, anchor, candidates);
                            } else {
                                escaped_left.push(p);
                            }
                        }
                    }
                    if i + 1 < items.len() {
                        let old =
                            self.update_slot(x, Layer::Mutated, Direction::Next, items[i + 1], Some(parent));
                        if let Sibling::Pending(q) = old {
                            debug_assert!(
                                self.promises.get(q).map(|pr| pr.direction) == Some(Direction::Next),
                                "next slot can only park a next-walking promise"
                            );
                            if let Some(stale) = pending_next.replace(q) {
                                // Two same-direction walks through one gap
                                // cannot both be right; resolve the older
                                // one by walking from here.
                                debug_assert!(false, "overlapping next-direction promises");
                                self.walk(stale, item, fresh, candidates);
                            }
                        }
                    }
                }
            }
            // Solid elements: the window's end edges, fixed nodes, and
            // fresh members (still at their original placement in the
            // pre-state this scan describes).
            let solid = match item {
                Sibling::End => Some(Sibling::End),
                Sibling::Node(x) if !self.is_floating(x) || fresh.contains(&x) => {
                    Some(Sibling::Node(x))
                }
                _ => None,
            };
            if let Some(anchor) = solid {
                if let Some(q) = pending_next.take() {
                    self.resolve_promise(q, anchor, candidates);
                }
                last_solid = Some(anchor);
            }
        }

        // Escapes continue as ordinary walks outside the window.
        if let Some(q) = pending_next.take() {
            let edge = *items.last().expect("window has edges");
            self.walk(q, edge, fresh, candidates);
        }
        for p in escaped_left {
            self.walk(p, items[0], fresh, candidates);
        }
    }

    // ==================== Original-side fill ====================

    /// Determine the original siblings of a newly floated record.
    fn fill_original(
        &mut self,
        node: NodeId,
        list_index: usize,
        removed: &[NodeId],
        prev_sib: Sibling,
        next_sib: Sibling,
        fresh: &HashSet<NodeId>,
        candidates: &mut Vec<NodeId>,
    ) {
        for dir in [Direction::Prev, Direction::Next] {
            // 1. Inherit: a neighbor's original already names this node.
            if let Some(owner) = self.index.lookup(Layer::Original, dir.opposite(), node) {
                self.set_original_side(node, dir, Sibling::Node(owner));
                continue;
            }
            // 2. An adjacent fresh member of the removed list: both were
            // fixed until now, so their pre-state adjacency is original.
            let neighbor = match dir {
                Direction::Prev => list_index.checked_sub(1).map(|j| removed[j]),
                Direction::Next => removed.get(list_index + 1).copied(),
            };
            if let Some(m) = neighbor {
                if fresh.contains(&m) {
                    self.set_original_side(node, dir, Sibling::Node(m));
                    continue;
                }
            }
            // 3. Walk outward from the window-adjacent element.
            let start = match (neighbor, dir) {
                (Some(m), _) => Sibling::Node(m),
                (None, Direction::Prev) => prev_sib,
                (None, Direction::Next) => next_sib,
            };
            let pid = self.promises.alloc(node, dir);
            self.set_original_side(node, dir, Sibling::Pending(pid));
            self.walk(pid, start, fresh, candidates);
        }
    }

    /// Write an original-side slot through the index.
    fn set_original_side(&mut self, node: NodeId, dir: Direction, value: Sibling) {
        let Self {
            floating, index, ..
        } = self;
        if let Some(rec) = floating.get_mut(&node) {
            debug_assert!(rec.original.is_some(), "original triple must exist");
            rec.tried.clear();
            index.update(rec, Layer::Original, dir, value, None);
        } else {
            debug_assert!(false, "original side written for unknown record {node}");
        }
    }

    // ==================== Promise walks ====================

    /// Walk the mutated-sibling graph from `start` in the promise's
    /// direction. Resolves at the first settled anchor (`End`, a fixed
    /// node, or a fresh member of the current window), parks on an
    /// unknown slot, and gives up on information gaps.
    fn walk(
        &mut self,
        pid: PromiseId,
        start: Sibling,
        fresh: &HashSet<NodeId>,
        candidates: &mut Vec<NodeId>,
    ) {
        let Some(promise) = self.promises.get(pid).copied() else {
            debug_assert!(false, "walk of a dead promise");
            return;
        };
        let dir = promise.direction;
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut cur = start;
        loop {
            match cur {
                Sibling::End => {
                    self.resolve_promise(pid, Sibling::End, candidates);
                    return;
                }
                Sibling::Node(x) => {
                    if fresh.contains(&x) || !self.is_floating(x) {
                        self.resolve_promise(pid, Sibling::Node(x), candidates);
                        return;
                    }
                    if !seen.insert(x) {
                        // Stale adjacency claims formed a loop.
                        self.discard_promise(pid);
                        return;
                    }
                    let rec = self.floating[&x];
                    let Some(mutated) = rec.mutated else {
                        // Detached claim: the trail went cold.
                        self.discard_promise(pid);
                        return;
                    };
                    match mutated.side(dir) {
                        Sibling::Unknown => {
                            self.park(pid, x, dir);
                            return;
                        }
                        Sibling::Pending(_) => {
                            // A same-direction walk is already parked in
                            // this slot; two walks through one gap would
                            // have to share a resolution.
                            debug_assert!(false, "promise collision at {x}");
                            self.discard_promise(pid);
                            return;
                        }
                        value => cur = value,
                    }
                }
                Sibling::Unknown | Sibling::Pending(_) => {
                    debug_assert!(false, "walk started from an unsettled sibling");
                    self.discard_promise(pid);
                    return;
                }
            }
        }
    }

    /// Suspend a walk: attach the promise to the slot it needs.
    fn park(&mut self, pid: PromiseId, at: NodeId, dir: Direction) {
        self.update_slot(at, Layer::Mutated, dir, Sibling::Pending(pid), None);
        if let Some(promise) = self.promises.get_mut(pid) {
            promise.pointer = Some(at);
        }
    }

    /// Complete a promise with its found original sibling.
    fn resolve_promise(&mut self, pid: PromiseId, value: Sibling, candidates: &mut Vec<NodeId>) {
        let Some(promise) = self.promises.take(pid) else {
            return;
        };
        debug_assert!(value.is_settled(), "promises resolve to settled values");
        self.clean_pointer_slot(&promise, pid);
        self.set_original_side(promise.origin, promise.direction, value);
        candidates.push(promise.origin);
    }

    /// Resolve a next-direction and a prev-direction promise against each
    /// other: every node between their origins is floating, so the two
    /// origins were originally adjacent.
    fn joint_resolve(&mut self, next_pid: PromiseId, prev_pid: PromiseId, candidates: &mut Vec<NodeId>) {
        let (Some(q), Some(p)) = (self.promises.take(next_pid), self.promises.take(prev_pid))
        else {
            debug_assert!(false, "joint resolution of dead promises");
            return;
        };
        debug_assert!(q.direction == Direction::Next && p.direction == Direction::Prev);
        self.clean_pointer_slot(&q, next_pid);
        self.clean_pointer_slot(&p, prev_pid);
        self.set_original_side(q.origin, Direction::Next, Sibling::Node(p.origin));
        self.set_original_side(p.origin, Direction::Prev, Sibling::Node(q.origin));
        candidates.push(q.origin);
        candidates.push(p.origin);
    }

    /// Drop a promise, leaving its origin side unknown.
    fn discard_promise(&mut self, pid: PromiseId) {
        let Some(promise) = self.promises.take(pid) else {
            return;
        };
        self.clean_pointer_slot(&promise, pid);
        let Self {
            floating, index, ..
        } = self;
        if let Some(rec) = floating.get_mut(&promise.origin) {
            if rec.side(Layer::Original, promise.direction) == Some(Sibling::Pending(pid)) {
                index.update(rec, Layer::Original, promise.direction, Sibling::Unknown, None);
            }
        }
    }

    /// If the promise is still attached to its pointer slot, detach it.
    fn clean_pointer_slot(&mut self, promise: &crate::promise::Promise, pid: PromiseId) {
        let Some(ptr) = promise.pointer else {
            return;
        };
        if self
            .floating
            .get(&ptr)
            .and_then(|r| r.side(Layer::Mutated, promise.direction))
            == Some(Sibling::Pending(pid))
        {
            self.update_slot(ptr, Layer::Mutated, promise.direction, Sibling::Unknown, None);
        }
    }

    // ==================== Fixedness propagation ====================

    /// Re-check revert candidates until no more records become fixed.
    fn propagate(&mut self, candidates: Vec<NodeId>) {
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut queued: HashSet<NodeId> = HashSet::new();
        for n in candidates {
            if queued.insert(n) {
                queue.push_back(n);
            }
        }
        while let Some(n) = queue.pop_front() {
            queued.remove(&n);
            let Some(rec) = self.floating.get(&n).copied() else {
                continue;
            };
            let (Some(orig), Some(mutated)) = (rec.original, rec.mutated) else {
                continue;
            };
            if orig.parent != mutated.parent || rec.tried.is_full() {
                continue;
            }
            // Zero-delta fast path: identical settled placements.
            let identical = orig == mutated
                && orig.prev.is_settled()
                && orig.next.is_settled();
            let reverted = identical
                || (self.side_agrees(&rec, Direction::Prev)
                    && self.side_agrees(&rec, Direction::Next));
            if reverted {
                self.fix_record(n, &mut queue, &mut queued);
            } else if let Some(entry) = self.floating.get_mut(&n) {
                entry.tried.insert(Direction::Prev);
                entry.tried.insert(Direction::Next);
            }
        }
    }

    /// One side of the revert check: the anchor of the original chain must
    /// equal the anchor of the mutated chain.
    fn side_agrees(&self, rec: &MovedRecord, dir: Direction) -> bool {
        let (Some(orig), Some(mutated)) = (rec.original, rec.mutated) else {
            return false;
        };
        let expected = self.effective_anchor(Layer::Original, orig.side(dir), dir);
        let current = self.effective_anchor(Layer::Mutated, mutated.side(dir), dir);
        match (expected, current) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Walk a sibling chain through floating records until a fixed node or
    /// an end-of-parent. Floating nodes are transparent: in the mutated
    /// chain they are not where they belong, in the original chain they
    /// are not where they were. `None` when the chain runs into unknown
    /// territory or a cycle of stale claims.
    fn effective_anchor(&self, layer: Layer, start: Sibling, dir: Direction) -> Option<Sibling> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut cur = start;
        loop {
            match cur {
                Sibling::End => return Some(Sibling::End),
                Sibling::Node(x) => {
                    let Some(rec) = self.floating.get(&x) else {
                        return Some(Sibling::Node(x));
                    };
                    if !seen.insert(x) {
                        return None;
                    }
                    cur = rec.layer(layer)?.side(dir);
                }
                Sibling::Unknown | Sibling::Pending(_) => return None,
            }
        }
    }

    /// A record returned to its original placement: drop it and give its
    /// neighbors a fresh chance to revert.
    fn fix_record(
        &mut self,
        node: NodeId,
        queue: &mut VecDeque<NodeId>,
        queued: &mut HashSet<NodeId>,
    ) {
        let Some(rec) = self.floating.remove(&node) else {
            return;
        };
        self.index.remove(&rec);
        // Any promises still attached to the record go with it.
        for layer in [Layer::Original, Layer::Mutated] {
            for dir in [Direction::Prev, Direction::Next] {
                if let Some(Sibling::Pending(pid)) = rec.side(layer, dir) {
                    self.discard_promise(pid);
                }
            }
        }
        let mut neighbors: Vec<NodeId> = Vec::new();
        for layer in [Layer::Original, Layer::Mutated] {
            for dir in [Direction::Prev, Direction::Next] {
                if let Some(owner) = self.index.lookup(layer, dir, node) {
                    neighbors.push(owner);
                }
                if let Some(Sibling::Node(x)) = rec.side(layer, dir) {
                    neighbors.push(x);
                }
            }
        }
        for x in neighbors {
            if let Some(entry) = self.floating.get_mut(&x) {
                entry.tried.clear();
                if queued.insert(x) {
                    queue.push_back(x);
                }
            }
        }
    }

    /// Remove a record entirely (cancellation, not reversion).
    fn drop_record(&mut self, node: NodeId) {
        let Some(rec) = self.floating.remove(&node) else {
            return;
        };
        self.index.remove(&rec);
        for layer in [Layer::Original, Layer::Mutated] {
            for dir in [Direction::Prev, Direction::Next] {
                if let Some(Sibling::Pending(pid)) = rec.side(layer, dir) {
                    self.discard_promise(pid);
                }
            }
        }
    }

    // ==================== Synchronize ====================

    /// Reconcile the floating set with the live tree.
    ///
    /// The caller asserts the tree is quiescent: every record with
    /// unsettled mutated slots is refreshed from live siblings, then
    /// outstanding promises resolve in two passes (next-direction walks
    /// first, detecting joint encounters with parked prev-direction
    /// promises; then prev-direction walks, which are guaranteed an
    /// anchor). Refreshed and resolved records are re-checked for
    /// reversion. Returns the number of records still floating.
    pub fn synchronize(&mut self, tree: &impl TreeReader) -> usize {
        let mut candidates: Vec<NodeId> = Vec::new();
        let no_fresh = HashSet::new();

        let stale: Vec<NodeId> = self
            .floating
            .iter()
            .filter(|(_, r)| {
                r.mutated
                    .is_some_and(|m| !m.prev.is_settled() || !m.next.is_settled())
            })
            .map(|(&n, _)| n)
            .collect();
        // Detaching a parked promise keeps its pointer memo so the passes
        // below can still detect joint encounters.
        for n in stale {
            match tree.parent_of(n) {
                None => {
                    let rec = self.floating[&n];
                    self.index.remove_layer(&rec, Layer::Mutated);
                    let entry = self.floating.get_mut(&n).expect("stale record");
                    entry.mutated = None;
                    entry.tried.clear();
                }
                Some(parent) => {
                    let (live_prev, live_next) = tree.siblings_of(n);
                    self.update_slot(
                        n,
                        Layer::Mutated,
                        Direction::Prev,
                        Sibling::from_reported(live_prev),
                        Some(parent),
                    );
                    self.update_slot(
                        n,
                        Layer::Mutated,
                        Direction::Next,
                        Sibling::from_reported(live_next),
                        Some(parent),
                    );
                    if let Some(pos) = self
                        .floating
                        .get_mut(&n)
                        .and_then(|r| r.mutated.as_mut())
                    {
                        pos.parent = parent;
                    }
                }
            }
            candidates.push(n);
        }

        let ids = self.promises.ids();
        let prev_by_pointer: HashMap<NodeId, PromiseId> = ids
            .iter()
            .filter_map(|&pid| {
                let p = self.promises.get(pid)?;
                (p.direction == Direction::Prev).then_some((p.pointer?, pid))
            })
            .collect();

        // Pass 1: next-direction walks, with joint resolution.
        for &pid in &ids {
            let Some(promise) = self.promises.get(pid).copied() else {
                continue;
            };
            if promise.direction != Direction::Next {
                continue;
            }
            match self.resume_value(&promise) {
                Some(start) => {
                    self.sync_walk_next(pid, start, &prev_by_pointer, &mut candidates)
                }
                None => self.discard_promise(pid),
            }
        }

        // Pass 2: remaining prev-direction walks over a settled graph.
        for &pid in &ids {
            let Some(promise) = self.promises.get(pid).copied() else {
                continue;
            };
            debug_assert!(promise.direction == Direction::Prev);
            match self.resume_value(&promise) {
                Some(start) => self.walk(pid, start, &no_fresh, &mut candidates),
                None => self.discard_promise(pid),
            }
        }

        self.propagate(candidates);

        #[cfg(debug_assertions)]
        self.debug_validate();

        self.floating.len()
    }

    /// Where a detached promise continues: its pointer's refreshed slot.
    fn resume_value(&self, promise: &crate::promise::Promise) -> Option<Sibling> {
        let ptr = promise.pointer?;
        let value = self
            .floating
            .get(&ptr)
            .and_then(|r| r.side(Layer::Mutated, promise.direction))?;
        value.is_settled().then_some(value)
    }

    /// Next-direction synchronize walk: stepping onto a floating node that
    /// carries a parked prev-direction promise is a joint encounter.
    fn sync_walk_next(
        &mut self,
        pid: PromiseId,
        start: Sibling,
        prev_by_pointer: &HashMap<NodeId, PromiseId>,
        candidates: &mut Vec<NodeId>,
    ) {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut cur = start;
        loop {
            match cur {
                Sibling::End => {
                    self.resolve_promise(pid, Sibling::End, candidates);
                    return;
                }
                Sibling::Node(x) => {
                    if !self.is_floating(x) {
                        self.resolve_promise(pid, Sibling::Node(x), candidates);
                        return;
                    }
                    if let Some(&prev_pid) = prev_by_pointer.get(&x) {
                        if self.promises.get(prev_pid).is_some() {
                            self.joint_resolve(pid, prev_pid, candidates);
                            return;
                        }
                    }
                    if !seen.insert(x) {
                        self.discard_promise(pid);
                        return;
                    }
                    match self.floating[&x].mutated.map(|m| m.next) {
                        Some(value) if value.is_settled() => cur = value,
                        _ => {
                            self.discard_promise(pid);
                            return;
                        }
                    }
                }
                Sibling::Unknown | Sibling::Pending(_) => {
                    self.discard_promise(pid);
                    return;
                }
            }
        }
    }

    // ==================== Revert ====================

    /// Move every floating node back to its original placement.
    ///
    /// All floating nodes are detached first: the move groups below may
    /// target parents presently nested inside their own members, and the
    /// tree's insertion API will detach them anyway. Then maximal runs of
    /// original-sibling-linked records sharing an original parent are
    /// placed by whichever anchor is known; a group with no usable anchor
    /// is skipped with a diagnostic.
    pub fn revert(&mut self, tree: &mut impl TreeMutator) -> DeltaResult<RevertStats> {
        let mut stats = RevertStats::default();
        let mut nodes: Vec<NodeId> = self.floating.keys().copied().collect();
        nodes.sort_unstable();

        for &n in &nodes {
            tree.remove(n)?;
            if self.floating[&n].original.is_none() {
                stats.nodes_removed += 1;
            }
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        for &n in &nodes {
            let Some(orig) = self.floating[&n].original else {
                continue;
            };
            if visited.contains(&n) {
                continue;
            }
            let members = self.collect_group(n, orig.parent, &mut visited);
            let first = self.floating[&members[0]]
                .original
                .expect("group members have originals");
            let last = self.floating[members.last().expect("group is nonempty")]
                .original
                .expect("group members have originals");

            let placed = self.place_group(tree, orig.parent, &members, first, last)?;
            if placed {
                stats.groups_moved += 1;
            } else {
                stats.groups_skipped += 1;
                log::warn!(
                    "insufficient information to revert {} node(s) under {}; skipping",
                    members.len(),
                    orig.parent
                );
            }
        }

        self.clear();
        Ok(stats)
    }

    /// Maximal run of original-sibling-linked floating records around
    /// `node`, all sharing `parent` as original parent. One-sided links
    /// count: either neighbor naming the other joins the run.
    fn collect_group(
        &self,
        node: NodeId,
        parent: NodeId,
        visited: &mut HashSet<NodeId>,
    ) -> Vec<NodeId> {
        let in_group = |x: NodeId| {
            self.floating
                .get(&x)
                .and_then(|r| r.original)
                .map(|o| o.parent)
                == Some(parent)
        };

        // Walk left to the start of the run.
        let mut start = node;
        let mut guard: HashSet<NodeId> = HashSet::from([node]);
        loop {
            let prev = self.floating[&start]
                .original
                .expect("group member has original")
                .prev;
            let left = match prev {
                Sibling::Node(p) if in_group(p) => Some(p),
                // A settled non-member neighbor is definitive; only an
                // unknown side may be patched by a one-sided link.
                Sibling::Node(_) | Sibling::End => None,
                Sibling::Unknown | Sibling::Pending(_) => self
                    .index
                    .lookup(Layer::Original, Direction::Next, start)
                    .filter(|&p| in_group(p)),
            };
            match left {
                Some(p) if guard.insert(p) => start = p,
                _ => break,
            }
        }

        // Collect rightward.
        let mut members = vec![start];
        visited.insert(start);
        let mut cur = start;
        loop {
            let next = self.floating[&cur]
                .original
                .expect("group member has original")
                .next;
            let right = match next {
                Sibling::Node(x) if in_group(x) => Some(x),
                Sibling::Node(_) | Sibling::End => None,
                Sibling::Unknown | Sibling::Pending(_) => self
                    .index
                    .lookup(Layer::Original, Direction::Prev, cur)
                    .filter(|&x| in_group(x)),
            };
            match right {
                Some(x) if !visited.contains(&x) => {
                    members.push(x);
                    visited.insert(x);
                    cur = x;
                }
                _ => break,
            }
        }
        members
    }

    /// Insert a group by its known anchors. Returns false when neither
    /// side gives a usable placement.
    fn place_group(
        &self,
        tree: &mut impl TreeMutator,
        parent: NodeId,
        members: &[NodeId],
        first: Position,
        last: Position,
    ) -> DeltaResult<bool> {
        if let Sibling::Node(p) = first.prev {
            if !self.is_floating(p) && tree.parent_of(p) == Some(parent) {
                match tree.siblings_of(p).1 {
                    Some(reference) => tree.insert_before(parent, members, reference)?,
                    None => tree.append(parent, members)?,
                }
                return Ok(true);
            }
        }
        if let Sibling::Node(q) = last.next {
            if !self.is_floating(q) && tree.parent_of(q) == Some(parent) {
                tree.insert_before(parent, members, q)?;
                return Ok(true);
            }
        }
        if first.prev == Sibling::End {
            tree.prepend(parent, members)?;
            return Ok(true);
        }
        if last.next == Sibling::End {
            tree.append(parent, members)?;
            return Ok(true);
        }
        Ok(false)
    }

    // ==================== Invariants ====================

    #[cfg(debug_assertions)]
    fn debug_validate(&self) {
        for rec in self.floating.values() {
            debug_assert!(
                rec.original.is_some() || rec.mutated.is_some(),
                "record {} has no placement at all",
                rec.node
            );
            debug_assert!(
                self.index.is_consistent_with(rec),
                "index out of sync for {}",
                rec.node
            );
            if let (Some(o), Some(m)) = (rec.original, rec.mutated) {
                let settled =
                    o.prev.is_settled() && o.next.is_settled() && m.prev.is_settled() && m.next.is_settled();
                debug_assert!(
                    !(settled && o == m),
                    "record {} kept identical placements",
                    rec.node
                );
            }
        }
    }
}
