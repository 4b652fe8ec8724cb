//! A dynamic nearest-neighbor index over color coordinates.
//!
//! The placement frontier inserts and deletes points millions of times while
//! being queried after every placement, which rules out a static k-d tree,
//! and a single incrementally-updated tree unbalances quickly. This module
//! keeps a *forest* of balanced k-d trees instead, one per set bit of the
//! point count: inserting rebuilds only the smallest trees, deletions leave
//! tombstones in place, and a full compaction runs whenever tombstones reach
//! half the structure. Inserts cost amortized `O(log^2 n)` and queries
//! `O(sqrt(n) log n)` in the worst case.
//!
//! Nodes live in an indexed pool with a free list. A [`NodeId`] stays valid
//! from [`KdForest::insert`] until the tombstone is physically discarded by
//! a compaction, so callers can hold ids across rebuilds; rebuilds only
//! rewire child links in place.

use crate::color::Coord;

/// Sentinel child link and empty slot marker.
const NIL: u32 = u32::MAX;

/// Handle to a live node, returned by [`KdForest::insert`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeId(u32);

/// A point in one of the forest's trees.
#[derive(Clone, Debug)]
struct Node {
    coord: Coord,
    left: u32,
    right: u32,
    /// Which side of the current split this node falls on during a rebuild.
    goes_left: bool,
    /// Logically deleted; skipped as a query candidate but still traversed.
    removed: bool,
    /// Owning pixel index, opaque to the forest.
    pixel: u32,
}

/// A forest of balanced k-d trees under the logarithmic method.
#[derive(Debug, Default)]
pub struct KdForest {
    /// Node pool; rebuilt trees rewire links without moving nodes.
    nodes: Vec<Node>,
    /// Pool slots recycled by compaction.
    free: Vec<u32>,
    /// Tree roots; slot `i` holds either `NIL` or a tree of exactly `2^i`
    /// nodes (live plus tombstoned).
    roots: Vec<u32>,
    /// Live nodes.
    size: usize,
    /// Live plus tombstoned nodes; kept below `2 * (size + 1)`.
    size_est: usize,
}

impl KdForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live points.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of pool entries still held by the trees, tombstones included.
    pub fn len_estimate(&self) -> usize {
        self.size_est
    }

    /// Add a point, rebalancing as required by the structural rule.
    pub fn insert(&mut self, coord: Coord, pixel: u32) -> NodeId {
        // With half or more of the structure tombstoned, queries pay for
        // nodes that can never match; rebuild everything from the live set.
        let force = self.size_est + 1 >= 2 * (self.size + 1);
        let id = self.alloc(coord, pixel);
        self.balance(id, force);
        NodeId(id)
    }

    /// Logically delete a point. The node stays in place as a tombstone
    /// until the next rebuild that covers its tree.
    pub fn remove(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0 as usize];
        debug_assert!(!node.removed, "node removed twice");
        node.removed = true;
        self.size -= 1;
    }

    /// The pixel payload of the live point nearest to `target`, or `None`
    /// when no live point exists.
    pub fn nearest(&self, target: &Coord) -> Option<u32> {
        let mut best = NIL;
        let mut limit = f64::INFINITY;

        for &root in &self.roots {
            if root != NIL {
                self.nearest_in(root, target, &mut best, &mut limit, 0);
            }
        }

        if best == NIL {
            None
        } else {
            Some(self.nodes[best as usize].pixel)
        }
    }

    fn alloc(&mut self, coord: Coord, pixel: u32) -> u32 {
        let node = Node {
            coord,
            left: NIL,
            right: NIL,
            goes_left: false,
            removed: false,
            pixel,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id as usize] = node;
                id
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as u32
            }
        }
    }

    /// Rebuild after an insertion.
    ///
    /// Normally the new node and every node of the trees below the first
    /// empty slot `k` (tombstones included, `2^k` in total) become one fresh
    /// tree in slot `k`. A forced compaction instead gathers the live nodes
    /// of *every* tree, recycles the tombstones, and deposits trees matching
    /// the binary expansion of the live count.
    fn balance(&mut self, new_node: u32, force: bool) {
        self.size += 1;

        let mut buffer = vec![new_node];

        if force {
            for slot in 0..self.roots.len() {
                let root = self.roots[slot];
                if root != NIL {
                    self.collect(root, &mut buffer, false);
                }
            }
            self.size_est = self.size;
            debug_assert_eq!(buffer.len(), self.size);
        } else {
            self.size_est += 1;
            let slot = self
                .roots
                .iter()
                .position(|&r| r == NIL)
                .unwrap_or(self.roots.len());
            buffer.reserve((1 << slot) - 1);
            for s in 0..slot {
                self.collect(self.roots[s], &mut buffer, true);
            }
            debug_assert_eq!(buffer.len(), 1 << slot);
        }

        self.deposit(&buffer, force);
    }

    /// Append a tree's nodes to `buffer` in preorder. Tombstones are kept
    /// when `keep_tombstones` is set and recycled onto the free list
    /// otherwise.
    fn collect(&mut self, root: u32, buffer: &mut Vec<u32>, keep_tombstones: bool) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            let (left, right, removed) = (node.left, node.right, node.removed);

            if right != NIL {
                stack.push(right);
            }
            if left != NIL {
                stack.push(left);
            }

            if keep_tombstones || !removed {
                buffer.push(id);
            } else {
                self.free.push(id);
            }
        }
    }

    /// Build one tree per set bit of `buffer.len()`, lowest slots first.
    fn deposit(&mut self, buffer: &[u32], force: bool) {
        let total = buffer.len();
        let mut offset = 0;
        let mut slot = 0;

        while offset < total {
            if slot >= self.roots.len() {
                self.roots.push(NIL);
            }
            let chunk = 1usize << slot;
            if total & chunk != 0 {
                self.roots[slot] = Self::build(&mut self.nodes, &buffer[offset..offset + chunk]);
                offset += chunk;
            } else {
                self.roots[slot] = NIL;
            }
            slot += 1;
        }

        // A compaction owns every slot, so anything above the last deposit
        // is stale.
        if force {
            self.roots.truncate(slot);
        }
    }

    /// Build a balanced tree over `ids` and return its root.
    ///
    /// Keeps one id buffer pre-sorted per axis so each level splits at the
    /// true median in `O(n)` instead of re-sorting: the splitting axis marks
    /// every node left or right of the median, and the other buffers are
    /// stably partitioned through a scratch buffer. Equal coordinates keep
    /// their buffer order, so the tree shape is a function of the input
    /// order alone.
    fn build(nodes: &mut [Node], ids: &[u32]) -> u32 {
        if ids.is_empty() {
            return NIL;
        }

        let mut by_axis = [ids.to_vec(), ids.to_vec(), ids.to_vec()];
        for (axis, buf) in by_axis.iter_mut().enumerate() {
            buf.sort_by(|&a, &b| {
                nodes[a as usize].coord[axis].total_cmp(&nodes[b as usize].coord[axis])
            });
        }

        let mut scratch = vec![0u32; ids.len()];
        let [mut b0, mut b1, mut b2] = by_axis;
        Self::build_recursive(
            nodes,
            [&mut b0[..], &mut b1[..], &mut b2[..]],
            &mut scratch,
            0,
        )
    }

    fn build_recursive(
        nodes: &mut [Node],
        mut buffers: [&mut [u32]; 3],
        scratch: &mut [u32],
        axis: usize,
    ) -> u32 {
        let size = buffers[0].len();
        if size == 0 {
            return NIL;
        }

        let split = size / 2;
        let root = buffers[axis][split];

        for (i, &id) in buffers[axis].iter().enumerate() {
            nodes[id as usize].goes_left = i < split;
        }

        for (a, buf) in buffers.iter_mut().enumerate() {
            if a == axis {
                continue;
            }
            let mut keep = 0;
            let mut spill = 0;
            for j in 0..size {
                let id = buf[j];
                if nodes[id as usize].goes_left {
                    buf[keep] = id;
                    keep += 1;
                } else if id != root {
                    scratch[spill] = id;
                    spill += 1;
                }
            }
            debug_assert_eq!(keep, split);
            buf[split + 1..size].copy_from_slice(&scratch[..spill]);
        }

        let next = (axis + 1) % 3;
        let [b0, b1, b2] = buffers;
        let (l0, rest0) = b0.split_at_mut(split);
        let (l1, rest1) = b1.split_at_mut(split);
        let (l2, rest2) = b2.split_at_mut(split);

        let left = Self::build_recursive(nodes, [l0, l1, l2], scratch, next);
        let right = Self::build_recursive(
            nodes,
            [&mut rest0[1..], &mut rest1[1..], &mut rest2[1..]],
            scratch,
            next,
        );

        nodes[root as usize].left = left;
        nodes[root as usize].right = right;
        root
    }

    /// Branch-and-bound descent threading one squared-distance bound.
    fn nearest_in(&self, id: u32, target: &Coord, best: &mut u32, limit: &mut f64, axis: usize) {
        let node = &self.nodes[id as usize];

        if !node.removed {
            let dist_sq = (node.coord - *target).norm_squared();
            if dist_sq < *limit {
                *best = id;
                *limit = dist_sq;
            }
        }

        let delta = target[axis] - node.coord[axis];
        let next = (axis + 1) % 3;
        let (near, far) = if delta < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if near != NIL {
            self.nearest_in(near, target, best, limit, next);
        }
        // The far side can only improve on the bound if the splitting plane
        // itself is within it.
        if far != NIL && delta * delta <= *limit {
            self.nearest_in(far, target, best, limit, next);
        }
    }
}
