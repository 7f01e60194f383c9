//! # Block Arena
//!
//! Tracked blocks live in a slot vector addressed by dense [`Handle`]s.
//! Parent and child edges are handles, so ancestor walks are pointer hops
//! with no hashing or allocation.
//!
//! A node whose parent is not in the arena carries [`Parent::Detached`] with
//! the parent's id: the anchor, a block that has since been decided, or a
//! block that has not arrived yet.

use shared_types::BlockId;
use std::collections::HashMap;

/// Dense index of a tracked block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Parent edge of a tracked block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Tracked(Handle),
    Detached(BlockId),
}

/// One tracked block and its consensus bookkeeping.
#[derive(Debug)]
pub struct Node<B> {
    pub block: B,
    pub id: BlockId,
    pub height: u64,
    pub parent: Parent,
    pub children: Vec<Handle>,
    /// Consecutive polls on the preferred path.
    pub confidence: usize,
    /// False while the block waits for its parent.
    pub processing: bool,
}

impl<B> Node<B> {
    pub fn new(block: B, id: BlockId, height: u64, parent_id: BlockId) -> Self {
        Self {
            block,
            id,
            height,
            parent: Parent::Detached(parent_id),
            children: Vec::new(),
            confidence: 0,
            processing: false,
        }
    }
}

/// Slot storage with id lookup and slot reuse.
#[derive(Debug)]
pub struct Arena<B> {
    slots: Vec<Option<Node<B>>>,
    free: Vec<u32>,
    index: HashMap<BlockId, Handle>,
}

impl<B> Default for Arena<B> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<B> Arena<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn handle(&self, id: &BlockId) -> Option<Handle> {
        self.index.get(id).copied()
    }

    pub fn get(&self, handle: Handle) -> Option<&Node<B>> {
        self.slots.get(handle.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Node<B>> {
        self.slots.get_mut(handle.index()).and_then(Option::as_mut)
    }

    pub fn by_id(&self, id: &BlockId) -> Option<&Node<B>> {
        self.handle(id).and_then(|h| self.get(h))
    }

    /// Store a node. The caller links it to its parent.
    pub fn insert(&mut self, node: Node<B>) -> Handle {
        let id = node.id;
        let handle = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(node);
                Handle(slot)
            }
            None => {
                self.slots.push(Some(node));
                Handle((self.slots.len() - 1) as u32)
            }
        };
        self.index.insert(id, handle);
        handle
    }

    /// Point `child` at `parent` and register it as a child.
    pub fn link(&mut self, child: Handle, parent: Parent) {
        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
        }
        if let Parent::Tracked(p) = parent {
            if let Some(node) = self.get_mut(p) {
                node.children.push(child);
            }
        }
    }

    /// Remove a node, unlinking it from its parent and detaching its
    /// children (which keep the removed id as their parent).
    pub fn remove(&mut self, handle: Handle) -> Option<Node<B>> {
        let node = self.slots.get_mut(handle.index())?.take()?;
        self.index.remove(&node.id);
        self.free.push(handle.0);

        if let Parent::Tracked(p) = node.parent {
            if let Some(parent) = self.get_mut(p) {
                parent.children.retain(|c| *c != handle);
            }
        }
        for child in &node.children {
            if let Some(c) = self.get_mut(*child) {
                c.parent = Parent::Detached(node.id);
            }
        }
        Some(node)
    }

    /// Walk from `start` through tracked parents, `start` included.
    pub fn path(&self, start: Handle) -> PathIter<'_, B> {
        PathIter {
            arena: self,
            next: Some(start),
        }
    }

    /// Id of the first untracked block below `start`.
    pub fn root(&self, start: Handle) -> Option<BlockId> {
        let last = self.path(start).last()?;
        match self.get(last)?.parent {
            Parent::Detached(id) => Some(id),
            Parent::Tracked(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Node<B>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (Handle(i as u32), node)))
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node<B>> {
        self.slots.iter_mut().flatten()
    }
}

/// Ancestor walk over tracked parents.
pub struct PathIter<'a, B> {
    arena: &'a Arena<B>,
    next: Option<Handle>,
}

impl<B> Iterator for PathIter<'_, B> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let current = self.next?;
        self.next = match self.arena.get(current).map(|n| n.parent) {
            Some(Parent::Tracked(p)) => Some(p),
            _ => None,
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> BlockId {
        BlockId([b; 32])
    }

    fn chain(arena: &mut Arena<()>) -> (Handle, Handle, Handle) {
        let a = arena.insert(Node::new((), id(1), 1, id(0)));
        let b = arena.insert(Node::new((), id(2), 2, id(1)));
        let c = arena.insert(Node::new((), id(3), 3, id(2)));
        arena.link(b, Parent::Tracked(a));
        arena.link(c, Parent::Tracked(b));
        (a, b, c)
    }

    #[test]
    fn test_path_walks_to_detached_root() {
        let mut arena = Arena::new();
        let (a, b, c) = chain(&mut arena);
        assert_eq!(arena.path(c).collect::<Vec<_>>(), vec![c, b, a]);
        assert_eq!(arena.root(c), Some(id(0)));
        assert_eq!(arena.get(a).unwrap().children, vec![b]);
    }

    #[test]
    fn test_remove_detaches_children() {
        let mut arena = Arena::new();
        let (a, b, c) = chain(&mut arena);
        let removed = arena.remove(a).unwrap();
        assert_eq!(removed.id, id(1));
        assert_eq!(arena.get(b).unwrap().parent, Parent::Detached(id(1)));
        assert_eq!(arena.root(c), Some(id(1)));
        assert!(arena.handle(&id(1)).is_none());
        assert_eq!(arena.len(), 2);
        let live: Vec<Handle> = arena.iter().map(|(h, _)| h).collect();
        assert_eq!(live, vec![b, c]);
    }

    #[test]
    fn test_remove_unlinks_from_parent() {
        let mut arena = Arena::new();
        let (_, b, c) = chain(&mut arena);
        arena.remove(c).unwrap();
        assert!(arena.get(b).unwrap().children.is_empty());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut arena = Arena::new();
        let (a, _, _) = chain(&mut arena);
        arena.remove(a);
        let d = arena.insert(Node::new((), id(9), 1, id(0)));
        assert_eq!(d, a);
        assert_eq!(arena.by_id(&id(9)).unwrap().height, 1);
        assert!(arena.remove(Handle(99)).is_none());
    }
}
