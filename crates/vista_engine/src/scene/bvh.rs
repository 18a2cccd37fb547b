//! Scene bounding volume hierarchy
//!
//! A binary tree over caller-supplied object indices, used to frustum-cull
//! both the main camera view and every shadow view. The tree is rebuilt from
//! scratch whenever scene geometry changes; there is no incremental update.
//!
//! ## Build
//!
//! Median split on the longest axis of the union box: sort the range by
//! centroid along that axis and cut it into two equal-count halves. This is
//! an O(N log N) build that trades the query quality of a SAH build for a
//! rebuild cheap enough to run after every transform edit.
//!
//! ## Node storage
//!
//! Nodes live in a flat `Vec` arena and reference each other by index only.
//! Node 0 is the root. Any node index obtained before the last
//! [`SceneBvh::build`] is invalid afterwards; only the returned object
//! indices are stable.

use rayon::prelude::*;

use crate::foundation::math::Vec3;
use crate::scene::{Frustum, AABB};

/// Single node in the BVH arena
#[derive(Debug, Clone, PartialEq)]
pub struct BvhNode {
    /// Minimum corner of the node bounds
    pub min: Vec3,
    /// Maximum corner of the node bounds
    pub max: Vec3,
    /// Left child (internal nodes only)
    pub left: Option<usize>,
    /// Right child (internal nodes only)
    pub right: Option<usize>,
    /// Caller object index (leaves only)
    pub instance_index: Option<usize>,
    /// Distance from the root (root = 0)
    pub depth: u32,
}

impl BvhNode {
    fn leaf(bounds: AABB, instance_index: usize, depth: u32) -> Self {
        Self {
            min: bounds.min,
            max: bounds.max,
            left: None,
            right: None,
            instance_index: Some(instance_index),
            depth,
        }
    }

    fn internal(bounds: AABB, depth: u32) -> Self {
        Self {
            min: bounds.min,
            max: bounds.max,
            left: None,
            right: None,
            instance_index: None,
            depth,
        }
    }

    /// True if this node maps to a caller object
    pub fn is_leaf(&self) -> bool {
        self.instance_index.is_some()
    }

    /// Node bounds as an AABB
    pub fn bounds(&self) -> AABB {
        AABB::new(self.min, self.max)
    }
}

/// Traversal counters for a single query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    /// Every node the traversal touched
    pub nodes_visited: usize,
    /// Nodes rejected by the frustum (whole subtree pruned)
    pub nodes_culled: usize,
    /// Leaves accepted and emitted
    pub leafs_tested: usize,
}

impl BvhStats {
    /// Sum counters of several queries
    pub fn accumulate(&mut self, other: &BvhStats) {
        self.nodes_visited += other.nodes_visited;
        self.nodes_culled += other.nodes_culled;
        self.leafs_tested += other.leafs_tested;
    }
}

/// Result of a frustum query
#[derive(Debug, Clone, Default)]
pub struct BvhQuery {
    /// Visible caller indices in traversal order (not input order)
    pub indices: Vec<usize>,
    /// Traversal counters
    pub stats: BvhStats,
}

#[derive(Debug, Clone, Copy)]
struct BuildItem {
    index: usize,
    bounds: AABB,
    centroid: Vec3,
}

impl BuildItem {
    fn new(index: usize, bounds: AABB) -> Self {
        Self { index, bounds, centroid: bounds.center() }
    }
}

/// Bounding volume hierarchy over scene objects
#[derive(Debug, Clone)]
pub struct SceneBvh {
    nodes: Vec<BvhNode>,
    root: Option<usize>,
    parallel_threshold: usize,
}

impl Default for SceneBvh {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBvh {
    /// Default object count at which AABB precomputation runs on the rayon pool
    pub const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

    /// Create an empty BVH
    pub fn new() -> Self {
        Self::with_parallel_threshold(Self::DEFAULT_PARALLEL_THRESHOLD)
    }

    /// Create an empty BVH with a custom parallel precompute threshold
    pub fn with_parallel_threshold(parallel_threshold: usize) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            parallel_threshold,
        }
    }

    /// Rebuild the tree over `indices`
    ///
    /// `aabb_provider` is called exactly once per index. With enough objects
    /// those calls run on the rayon pool, so the provider must be `Sync` and
    /// free of side effects that depend on call order.
    pub fn build<F>(&mut self, indices: &[usize], aabb_provider: F)
    where
        F: Fn(usize) -> AABB + Sync,
    {
        self.nodes.clear();
        self.root = None;

        if indices.is_empty() {
            log::debug!("BVH rebuilt with no objects");
            return;
        }

        let mut items: Vec<BuildItem> = if indices.len() >= self.parallel_threshold {
            indices
                .par_iter()
                .map(|&index| BuildItem::new(index, aabb_provider(index)))
                .collect()
        } else {
            indices
                .iter()
                .map(|&index| BuildItem::new(index, aabb_provider(index)))
                .collect()
        };

        // A binary tree with N leaves has exactly 2N - 1 nodes
        self.nodes.reserve(2 * items.len());
        self.root = Some(self.build_range(&mut items, 0));

        log::debug!(
            "BVH rebuilt: {} objects, {} nodes, max depth {}",
            indices.len(),
            self.nodes.len(),
            self.max_depth()
        );
    }

    fn build_range(&mut self, items: &mut [BuildItem], depth: u32) -> usize {
        let node_index = self.nodes.len();

        if let [item] = items {
            self.nodes.push(BvhNode::leaf(item.bounds, item.index, depth));
            return node_index;
        }

        let bounds = items
            .iter()
            .fold(AABB::empty(), |acc, item| acc.union(&item.bounds));
        self.nodes.push(BvhNode::internal(bounds, depth));

        let axis = bounds.longest_axis();
        items.sort_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

        let (left_items, right_items) = items.split_at_mut(items.len() / 2);
        let left = self.build_range(left_items, depth + 1);
        let right = self.build_range(right_items, depth + 1);

        let node = &mut self.nodes[node_index];
        node.left = Some(left);
        node.right = Some(right);
        node_index
    }

    /// Collect every object whose leaf box passes the frustum test
    pub fn query(&self, frustum: &Frustum) -> BvhQuery {
        let mut indices = Vec::new();
        let stats = self.query_into(frustum, &mut indices);
        BvhQuery { indices, stats }
    }

    /// Same as [`SceneBvh::query`] but reuses the caller's buffer
    ///
    /// `out` is cleared first.
    pub fn query_into(&self, frustum: &Frustum, out: &mut Vec<usize>) -> BvhStats {
        self.traverse(out, |node| frustum.intersects(node.min, node.max))
    }

    /// Collect every object whose leaf box overlaps `bounds`
    pub fn query_aabb(&self, bounds: &AABB) -> Vec<usize> {
        let mut out = Vec::new();
        self.traverse(&mut out, |node| bounds.intersects(&node.bounds()));
        out
    }

    fn traverse(&self, out: &mut Vec<usize>, accept: impl Fn(&BvhNode) -> bool) -> BvhStats {
        out.clear();
        let mut stats = BvhStats::default();
        let Some(root) = self.root else {
            return stats;
        };

        let mut stack = Vec::with_capacity(64);
        stack.push(root);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            stats.nodes_visited += 1;

            if !accept(node) {
                stats.nodes_culled += 1;
                continue;
            }

            if let Some(instance) = node.instance_index {
                stats.leafs_tested += 1;
                out.push(instance);
                continue;
            }

            // Right first so the left subtree is popped first
            if let Some(right) = node.right {
                stack.push(right);
            }
            if let Some(left) = node.left {
                stack.push(left);
            }
        }

        stats
    }

    /// Tightest node whose bounds fully contain `bounds`
    ///
    /// Returns `None` if the tree is empty or the root does not contain the
    /// box. When both children contain the box the left child is taken.
    pub fn find_enclosing_node(&self, bounds: &AABB) -> Option<usize> {
        let mut current = self.root?;
        if !self.nodes[current].bounds().contains(bounds) {
            return None;
        }

        loop {
            let node = &self.nodes[current];
            let (Some(left), Some(right)) = (node.left, node.right) else {
                return Some(current);
            };

            let in_left = self.nodes[left].bounds().contains(bounds);
            let in_right = self.nodes[right].bounds().contains(bounds);

            current = match (in_left, in_right) {
                (true, _) => left,
                (false, true) => right,
                (false, false) => return Some(current),
            };
        }
    }

    /// Root node index, `None` when empty
    pub fn root(&self) -> Option<usize> {
        self.root
    }

    /// Node by index
    ///
    /// # Panics
    /// Panics on an index that does not belong to the current build.
    pub fn node(&self, index: usize) -> &BvhNode {
        &self.nodes[index]
    }

    /// All nodes of the current build
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no objects were built
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of leaves (equals the number of built objects)
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Deepest node depth
    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }
}
