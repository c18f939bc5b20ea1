//! Index-linked doubly linked list.
//!
//! Nodes live in a `Vec` arena and link to each other by [`NodeId`]. Freed
//! slots go on a free list and are reused by later insertions, so a node's id
//! stays valid for as long as the node is in the list and nothing is ever
//! reached through a dangling pointer.
//!
//! ```text
//!   slots: [ Node{A, prev:-, next:2} | free | Node{C, prev:2, next:-} | ... ]
//!
//!   head ─► [0:A] ◄──► [2:B] ◄──► [3:C] ◄── tail
//!           (most recent)          (least recent)
//! ```
//!
//! All operations except iteration are O(1).

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

/// Stable handle to a node in a [`List`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

struct Node<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

enum Slot<T> {
    Occupied(Node<T>),
    Free { next_free: Option<NodeId> },
}

/// A doubly linked list whose nodes are addressed by [`NodeId`].
///
/// The front of the list is the most recently attached node, the back the
/// least recently attached one.
pub struct List<T> {
    slots: Vec<Slot<T>>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    free: Option<NodeId>,
    len: usize,
}

impl<T> List<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` nodes before the arena
    /// reallocates.
    pub fn with_capacity(capacity: usize) -> Self {
        List {
            slots: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            free: None,
            len: 0,
        }
    }

    /// Returns the current number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the list contains no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Id of the front (most recent) node.
    #[inline]
    pub fn front(&self) -> Option<NodeId> {
        self.head
    }

    /// Id of the back (least recent) node.
    #[inline]
    pub fn back(&self) -> Option<NodeId> {
        self.tail
    }

    /// Returns the value stored at `id`, if the node is live.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied(node)) => Some(&node.value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the value stored at `id`.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied(node)) => Some(&mut node.value),
            _ => None,
        }
    }

    /// Inserts `value` at the front and returns its id.
    pub fn push_front(&mut self, value: T) -> NodeId {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        let id = match self.free {
            Some(id) => {
                if let Slot::Free { next_free } = self.slots[id.index()] {
                    self.free = next_free;
                }
                self.slots[id.index()] = Slot::Occupied(node);
                id
            }
            None => {
                let id = NodeId(self.slots.len() as u32);
                self.slots.push(Slot::Occupied(node));
                id
            }
        };
        self.attach_front(id);
        self.len += 1;
        id
    }

    /// Removes the back (least recent) node and returns its value.
    pub fn pop_back(&mut self) -> Option<T> {
        let id = self.tail?;
        self.remove(id)
    }

    /// Removes the node at `id` and returns its value.
    ///
    /// Returns `None` if `id` is not a live node.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        if !matches!(self.slots.get(id.index()), Some(Slot::Occupied(_))) {
            return None;
        }
        self.detach(id);
        let slot = core::mem::replace(
            &mut self.slots[id.index()],
            Slot::Free {
                next_free: self.free,
            },
        );
        self.free = Some(id);
        self.len -= 1;
        match slot {
            Slot::Occupied(node) => Some(node.value),
            Slot::Free { .. } => None,
        }
    }

    /// Moves the node at `id` to the front. Returns false if `id` is not live.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        if !matches!(self.slots.get(id.index()), Some(Slot::Occupied(_))) {
            return false;
        }
        if self.head != Some(id) {
            self.detach(id);
            self.attach_front(id);
        }
        true
    }

    /// Drops every node and releases the free list.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = None;
        self.tail = None;
        self.free = None;
        self.len = 0;
    }

    /// Iterates values from front (most recent) to back (least recent).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
        }
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        match &self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Free { .. } => unreachable!("linked node {id:?} is on the free list"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match &mut self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Free { .. } => unreachable!("linked node {id:?} is on the free list"),
        }
    }

    fn detach(&mut self, id: NodeId) {
        let (prev, next) = {
            let node = self.node(id);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let node = self.node_mut(id);
        node.prev = None;
        node.next = None;
    }

    fn attach_front(&mut self, id: NodeId) {
        let old_head = self.head;
        {
            let node = self.node_mut(id);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("len", &self.len)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}

/// Front-to-back iterator over a [`List`].
pub struct Iter<'a, T> {
    list: &'a List<T>,
    current: Option<NodeId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.list.node(id);
        self.current = node.next;
        Some(&node.value)
    }
}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("current", &self.current).finish()
    }
}
