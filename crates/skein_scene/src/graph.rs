//! # Scene Graph
//!
//! Arena-backed node storage with intrusive links.
//!
//! Invariants upheld by every operation:
//! - the sibling list is acyclic and consistently doubly linked
//! - a node has at most one parent; linking under a new parent unlinks the
//!   old one first
//! - a removed node's own links are cleared so it cannot be reused in a
//!   corrupted state
//! - effective visibility = own flag AND parent's effective visibility

use thiserror::Error;

use skein_shared::Transform;

/// Unique identifier for a scene node: index plus generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates an ID from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Null/invalid node ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NULL
    }
}

/// Errors raised by structural scene-graph operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The id refers to a destroyed node or a recycled slot.
    ///
    /// Callers treat this as a missing dependency: skip this tick, retry
    /// on the next one.
    #[error("stale or destroyed node {0:?}")]
    StaleNode(NodeId),

    /// Linking would make a node an ancestor of itself.
    #[error("linking {child:?} under {parent:?} would create a cycle")]
    WouldCycle {
        /// Prospective parent.
        parent: NodeId,
        /// Prospective child.
        child: NodeId,
    },

    /// `remove_child` was called with a node that is not a child of the
    /// given parent.
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild {
        /// The parent passed in.
        parent: NodeId,
        /// The node that was not its child.
        child: NodeId,
    },
}

struct Node {
    generation: u32,
    live: bool,

    parent: NodeId,
    first_child: NodeId,
    prev_sibling: NodeId,
    next_sibling: NodeId,

    visible: bool,
    local: Transform,

    // Recomputed by `update`, top-down.
    world: Transform,
    effective_visible: bool,
}

impl Node {
    fn clear_links(&mut self) {
        self.parent = NodeId::NULL;
        self.prev_sibling = NodeId::NULL;
        self.next_sibling = NodeId::NULL;
    }
}

/// Arena of scene nodes with intrusive parent/child/sibling links.
pub struct SceneGraph {
    nodes: Vec<Node>,
    free: Vec<u32>,
}

impl SceneGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new(), free: Vec::new() }
    }

    fn resolve(&self, id: NodeId) -> Option<usize> {
        if id.is_null() {
            return None;
        }
        let idx = id.index() as usize;
        let node = self.nodes.get(idx)?;
        (node.live && node.generation == id.generation()).then_some(idx)
    }

    fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.resolve(id)
            .map(|idx| &self.nodes[idx])
            .ok_or(SceneError::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        match self.resolve(id) {
            Some(idx) => Ok(&mut self.nodes[idx]),
            None => Err(SceneError::StaleNode(id)),
        }
    }

    /// Creates a detached node: visible, identity transform, no links.
    pub fn create_node(&mut self) -> NodeId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.nodes.push(Node {
                    generation: 0,
                    live: false,
                    parent: NodeId::NULL,
                    first_child: NodeId::NULL,
                    prev_sibling: NodeId::NULL,
                    next_sibling: NodeId::NULL,
                    visible: true,
                    local: Transform::IDENTITY,
                    world: Transform::IDENTITY,
                    effective_visible: true,
                });
                (self.nodes.len() - 1) as u32
            }
        };

        let node = &mut self.nodes[index as usize];
        node.generation = node.generation.wrapping_add(1);
        node.live = true;
        node.parent = NodeId::NULL;
        node.first_child = NodeId::NULL;
        node.prev_sibling = NodeId::NULL;
        node.next_sibling = NodeId::NULL;
        node.visible = true;
        node.local = Transform::IDENTITY;
        node.world = Transform::IDENTITY;
        node.effective_visible = true;

        NodeId::new(index, node.generation)
    }

    /// Destroys a node and its entire subtree.
    ///
    /// The node is unlinked from its parent first; every freed slot's
    /// generation turns stale. Destroying a stale id is a logged no-op.
    pub fn destroy_node(&mut self, id: NodeId) {
        let Some(idx) = self.resolve(id) else {
            tracing::warn!(?id, "destroy of stale node, ignored");
            return;
        };

        let parent = self.nodes[idx].parent;
        if !parent.is_null() {
            // Unlink from the parent's child list before tearing down.
            let _ = self.remove_child(parent, id);
        }

        // Free the subtree iteratively, pre-order.
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(idx) = self.resolve(current) else { continue };
            let mut child = self.nodes[idx].first_child;
            while !child.is_null() {
                stack.push(child);
                child = match self.resolve(child) {
                    Some(child_idx) => self.nodes[child_idx].next_sibling,
                    None => NodeId::NULL,
                };
            }

            let node = &mut self.nodes[idx];
            node.live = false;
            node.first_child = NodeId::NULL;
            node.clear_links();
            self.free.push(current.index());
        }
    }

    /// Returns true while the node has not been destroyed.
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        self.resolve(id).is_some()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.live).count()
    }

    /// True if `ancestor` is on `node`'s parent chain (or is the node).
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while let Some(idx) = self.resolve(current) {
            if current == ancestor {
                return true;
            }
            current = self.nodes[idx].parent;
        }
        false
    }

    /// Links `child` as the last child of `parent`.
    ///
    /// If the child already has a parent it is unlinked from that parent's
    /// sibling list first - a node is never linked under two parents.
    /// Appending scans for the last child: O(children), a deliberate
    /// trade-off since structural mutation is far rarer than traversal.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        let _ = self.node(parent)?;
        let _ = self.node(child)?;

        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::WouldCycle { parent, child });
        }

        let old_parent = self.node(child)?.parent;
        if !old_parent.is_null() {
            self.remove_child(old_parent, child)?;
        }

        let first = self.node(parent)?.first_child;
        if first.is_null() {
            self.node_mut(parent)?.first_child = child;
        } else {
            // Last-child scan.
            let mut last = first;
            loop {
                let next = self.node(last)?.next_sibling;
                if next.is_null() {
                    break;
                }
                last = next;
            }
            self.node_mut(last)?.next_sibling = child;
            self.node_mut(child)?.prev_sibling = last;
        }

        self.node_mut(child)?.parent = parent;
        Ok(())
    }

    /// Splices `child` out of `parent`'s child list, relinking its
    /// neighbours and clearing the removed node's own links.
    ///
    /// The child keeps its subtree; only the upward and sideways links are
    /// cleared.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        let _ = self.node(parent)?;
        let child_node = self.node(child)?;
        if child_node.parent != parent {
            return Err(SceneError::NotAChild { parent, child });
        }

        let prev = child_node.prev_sibling;
        let next = child_node.next_sibling;

        if prev.is_null() {
            self.node_mut(parent)?.first_child = next;
        } else {
            self.node_mut(prev)?.next_sibling = next;
        }
        if !next.is_null() {
            self.node_mut(next)?.prev_sibling = prev;
        }

        self.node_mut(child)?.clear_links();
        Ok(())
    }

    /// Sets the node's own visibility flag. Stale ids are logged no-ops.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        match self.node_mut(id) {
            Ok(node) => node.visible = visible,
            Err(_) => tracing::warn!(?id, "set_visible on stale node, ignored"),
        }
    }

    /// Sets the node's local transform. Stale ids are logged no-ops.
    pub fn set_local_transform(&mut self, id: NodeId, local: Transform) {
        match self.node_mut(id) {
            Ok(node) => node.local = local,
            Err(_) => tracing::warn!(?id, "set_local_transform on stale node, ignored"),
        }
    }

    /// The node's own visibility flag.
    pub fn visible(&self, id: NodeId) -> Result<bool, SceneError> {
        self.node(id).map(|node| node.visible)
    }

    /// Effective visibility as of the last [`update`](Self::update) pass.
    pub fn effective_visible(&self, id: NodeId) -> Result<bool, SceneError> {
        self.node(id).map(|node| node.effective_visible)
    }

    /// The node's local transform.
    pub fn local_transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        self.node(id).map(|node| node.local)
    }

    /// World transform as of the last [`update`](Self::update) pass.
    pub fn world_transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        self.node(id).map(|node| node.world)
    }

    /// The node's parent, if linked.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        self.node(id)
            .map(|node| (!node.parent.is_null()).then_some(node.parent))
    }

    /// Iterates a node's direct children in sibling order.
    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self
            .resolve(parent)
            .map_or(NodeId::NULL, |idx| self.nodes[idx].first_child);
        std::iter::successors(
            (!first.is_null()).then_some(first),
            move |current| {
                let idx = self.resolve(*current)?;
                let next = self.nodes[idx].next_sibling;
                (!next.is_null()).then_some(next)
            },
        )
    }

    /// Deterministic pre-order traversal (node, then first-child chain,
    /// then next sibling) starting at `root`.
    #[must_use]
    pub fn pre_order(&self, root: NodeId) -> PreOrder<'_> {
        PreOrder {
            graph: self,
            stack: if self.resolve(root).is_some() { vec![root] } else { Vec::new() },
        }
    }

    /// Recomputes effective visibility and world transforms for the whole
    /// subtree under `root`, top-down, every pass.
    ///
    /// `root` itself composes against identity: its world transform is its
    /// local transform and its effective visibility is its own flag.
    pub fn update(&mut self, root: NodeId) -> Result<(), SceneError> {
        let _ = self.node(root)?;
        self.update_node(root, Transform::IDENTITY, true);
        Ok(())
    }

    fn update_node(&mut self, id: NodeId, parent_world: Transform, parent_visible: bool) {
        let Some(idx) = self.resolve(id) else { return };

        let (world, effective, first_child) = {
            let node = &self.nodes[idx];
            (
                parent_world.compose(node.local),
                node.visible && parent_visible,
                node.first_child,
            )
        };

        {
            let node = &mut self.nodes[idx];
            node.world = world;
            node.effective_visible = effective;
        }

        let mut child = first_child;
        while !child.is_null() {
            self.update_node(child, world, effective);
            child = match self.resolve(child) {
                Some(child_idx) => self.nodes[child_idx].next_sibling,
                None => NodeId::NULL,
            };
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order iterator over a subtree.
pub struct PreOrder<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let idx = self.graph.resolve(id)?;

        // Push children in reverse so the first child pops first.
        let mut children = Vec::new();
        let mut child = self.graph.nodes[idx].first_child;
        while !child.is_null() {
            children.push(child);
            child = match self.graph.resolve(child) {
                Some(child_idx) => self.graph.nodes[child_idx].next_sibling,
                None => NodeId::NULL,
            };
        }
        for child in children.into_iter().rev() {
            self.stack.push(child);
        }

        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_shared::Vec3;

    #[test]
    fn test_add_child_appends_in_order() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node();
        let a = graph.create_node();
        let b = graph.create_node();
        let c = graph.create_node();

        graph.add_child(root, a).unwrap();
        graph.add_child(root, b).unwrap();
        graph.add_child(root, c).unwrap();

        let children: Vec<NodeId> = graph.children(root).collect();
        assert_eq!(children, vec![a, b, c]);
        assert_eq!(graph.parent(a).unwrap(), Some(root));
    }

    #[test]
    fn test_reparent_unlinks_old_parent() {
        let mut graph = SceneGraph::new();
        let p1 = graph.create_node();
        let p2 = graph.create_node();
        let a = graph.create_node();
        let b = graph.create_node();
        let c = graph.create_node();

        graph.add_child(p1, a).unwrap();
        graph.add_child(p1, b).unwrap();
        graph.add_child(p1, c).unwrap();

        // Re-parent the middle child: never under two parents at once,
        // and the old siblings must relink around the hole.
        graph.add_child(p2, b).unwrap();

        let old: Vec<NodeId> = graph.children(p1).collect();
        let new: Vec<NodeId> = graph.children(p2).collect();
        assert_eq!(old, vec![a, c]);
        assert_eq!(new, vec![b]);
        assert_eq!(graph.parent(b).unwrap(), Some(p2));
    }

    #[test]
    fn test_remove_child_clears_links() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node();
        let a = graph.create_node();
        let b = graph.create_node();

        graph.add_child(root, a).unwrap();
        graph.add_child(root, b).unwrap();
        graph.remove_child(root, a).unwrap();

        assert_eq!(graph.parent(a).unwrap(), None);
        let children: Vec<NodeId> = graph.children(root).collect();
        assert_eq!(children, vec![b]);

        // The removed node is reusable in a clean state.
        graph.add_child(root, a).unwrap();
        let children: Vec<NodeId> = graph.children(root).collect();
        assert_eq!(children, vec![b, a]);
    }

    #[test]
    fn test_remove_non_child_rejected() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node();
        let stranger = graph.create_node();
        assert!(matches!(
            graph.remove_child(root, stranger),
            Err(SceneError::NotAChild { .. })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node();
        let b = graph.create_node();
        let c = graph.create_node();

        graph.add_child(a, b).unwrap();
        graph.add_child(b, c).unwrap();

        assert!(matches!(graph.add_child(c, a), Err(SceneError::WouldCycle { .. })));
        assert!(matches!(graph.add_child(a, a), Err(SceneError::WouldCycle { .. })));
    }

    #[test]
    fn test_preorder_visits_each_node_once() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node();
        let mut all = vec![root];

        // root -> (a -> (a1, a2), b -> (b1))
        let a = graph.create_node();
        let b = graph.create_node();
        let a1 = graph.create_node();
        let a2 = graph.create_node();
        let b1 = graph.create_node();
        all.extend([a, b, a1, a2, b1]);

        graph.add_child(root, a).unwrap();
        graph.add_child(root, b).unwrap();
        graph.add_child(a, a1).unwrap();
        graph.add_child(a, a2).unwrap();
        graph.add_child(b, b1).unwrap();

        let visited: Vec<NodeId> = graph.pre_order(root).collect();
        assert_eq!(visited, vec![root, a, a1, a2, b, b1]);

        // Exactly once each, even after structural churn.
        graph.add_child(b, a2).unwrap();
        let visited: Vec<NodeId> = graph.pre_order(root).collect();
        assert_eq!(visited.len(), all.len());
        for id in &all {
            assert_eq!(visited.iter().filter(|v| *v == id).count(), 1);
        }
    }

    #[test]
    fn test_visibility_propagates_top_down() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node();
        let mid = graph.create_node();
        let leaf = graph.create_node();
        graph.add_child(root, mid).unwrap();
        graph.add_child(mid, leaf).unwrap();

        graph.update(root).unwrap();
        assert!(graph.effective_visible(leaf).unwrap());

        // Hiding the middle node hides the leaf, leaves the root alone.
        graph.set_visible(mid, false);
        graph.update(root).unwrap();
        assert!(graph.effective_visible(root).unwrap());
        assert!(!graph.effective_visible(mid).unwrap());
        assert!(!graph.effective_visible(leaf).unwrap());

        // The leaf's own flag is still set; re-showing mid restores it.
        assert!(graph.visible(leaf).unwrap());
        graph.set_visible(mid, true);
        graph.update(root).unwrap();
        assert!(graph.effective_visible(leaf).unwrap());
    }

    #[test]
    fn test_world_transforms_compose_down_the_tree() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node();
        let child = graph.create_node();
        graph.add_child(root, child).unwrap();

        graph.set_local_transform(root, Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        graph.set_local_transform(child, Transform::from_position(Vec3::new(0.0, 5.0, 0.0)));
        graph.update(root).unwrap();

        assert_eq!(graph.world_transform(root).unwrap().position, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(graph.world_transform(child).unwrap().position, Vec3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn test_destroy_subtree_frees_and_stales() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node();
        let a = graph.create_node();
        let a1 = graph.create_node();
        graph.add_child(root, a).unwrap();
        graph.add_child(a, a1).unwrap();

        graph.destroy_node(a);
        assert_eq!(graph.node_count(), 1);
        assert!(!graph.is_live(a));
        assert!(!graph.is_live(a1));
        assert!(graph.children(root).next().is_none());

        // Recycled slots turn old ids stale.
        let fresh = graph.create_node();
        assert!(graph.is_live(fresh));
        assert!(!graph.is_live(a) && !graph.is_live(a1));
    }

    #[test]
    fn test_stale_ops_are_soft() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node();
        let ghost = graph.create_node();
        graph.destroy_node(ghost);

        assert!(matches!(graph.add_child(root, ghost), Err(SceneError::StaleNode(_))));
        graph.set_visible(ghost, false); // logged no-op
        graph.destroy_node(ghost); // logged no-op
        assert_eq!(graph.node_count(), 1);
    }
}
