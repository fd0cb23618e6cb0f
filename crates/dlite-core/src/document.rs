#![forbid(unsafe_code)]

//! Single-threaded document model: an arena of element nodes with a shared
//! active-element slot and bubbling event listeners.
//!
//! # Architecture
//!
//! [`Document`] is a cheap `Rc<RefCell<..>>` handle; clones share one tree.
//! Nodes live in an arena and are addressed by [`NodeId`]. Nodes are never
//! freed; a detached node simply has no parent and can be re-attached.
//!
//! # Invariants
//!
//! 1. A node has at most one parent, and appears once in that parent's
//!    children.
//! 2. The tree is acyclic: a node is never appended into its own subtree.
//! 3. The active element, when set, is always connected to the root.
//!    Detaching a subtree that holds focus clears the active element.
//! 4. No internal borrow is held while listener callbacks run, so
//!    listeners may mutate the document re-entrantly.
//!
//! # Failure Modes
//!
//! - `append_child` into the child's own subtree returns
//!   [`DomError::HierarchyRequest`].
//! - `remove_child` of a node that is not a direct child returns
//!   [`DomError::NotAChild`].
//! - Queries on a [`NodeId`] from another document return empty results
//!   instead of panicking.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::event::{Event, EventKind};
use crate::focusable::{ElementView, is_focusable};

/// Handle to a node inside a [`Document`].
///
/// Wraps the arena index directly, so every allocated node has a distinct
/// id for the lifetime of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Get the raw arena index.
    #[inline]
    pub const fn id(self) -> usize {
        self.0
    }

    const fn index(self) -> usize {
        self.0
    }
}

/// Identifies a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Errors from tree mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("cannot insert {child:?} under {parent:?}: parent lies inside the child's subtree")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
}

type Callback = Rc<dyn Fn(&mut Event)>;

struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    callback: Callback,
}

struct NodeData {
    tag: String,
    attrs: AHashMap<String, String>,
    classes: Vec<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    hidden: bool,
    listeners: Vec<ListenerEntry>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: AHashMap::new(),
            classes: Vec::new(),
            parent: None,
            children: Vec::new(),
            hidden: false,
            listeners: Vec::new(),
        }
    }
}

impl ElementView for NodeData {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

struct DocumentInner {
    nodes: Vec<NodeData>,
    root: NodeId,
    body: NodeId,
    active: Option<NodeId>,
    next_listener: u64,
}

impl DocumentInner {
    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.index())
    }

    fn alloc(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(tag));
        id
    }

    /// Inclusive: a node contains itself.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = self.node(node).map(|_| node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.node(current).and_then(|n| n.parent);
        }
        false
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(node) = self.node(root) else {
            return out;
        };
        let mut pending: Vec<NodeId> = node.children.iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            out.push(id);
            if let Some(node) = self.node(id) {
                pending.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
        if let Some(active) = self.active
            && self.contains(child, active)
        {
            tracing::trace!(node = active.id(), "active element detached; focus cleared");
            self.active = None;
        }
    }
}

/// Shared handle to a document tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Document")
            .field("nodes", &inner.nodes.len())
            .field("active", &inner.active)
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding an empty `body` under the root.
    pub fn new() -> Self {
        let mut inner = DocumentInner {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            active: None,
            next_listener: 1,
        };
        let root = inner.alloc("#document");
        let body = inner.alloc("body");
        inner.nodes[body.index()].parent = Some(root);
        inner.nodes[root.index()].children.push(body);
        inner.root = root;
        inner.body = body;
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.inner.borrow().root
    }

    #[inline]
    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    // --- Elements ---

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.borrow_mut().alloc(tag)
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.inner.borrow().node(node).map(|n| n.tag.clone())
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.inner.borrow_mut().node_mut(node) {
            n.attrs.insert(name.to_owned(), value.to_owned());
        }
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow_mut()
            .node_mut(node)
            .and_then(|n| n.attrs.remove(name))
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .node(node)
            .and_then(|n| n.attrs.get(name).cloned())
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.inner
            .borrow()
            .node(node)
            .is_some_and(|n| n.attrs.contains_key(name))
    }

    /// Add a class; adding one that is already present is a no-op.
    pub fn add_class(&self, node: NodeId, class: &str) {
        if class.is_empty() {
            return;
        }
        if let Some(n) = self.inner.borrow_mut().node_mut(node)
            && !n.classes.iter().any(|c| c == class)
        {
            n.classes.push(class.to_owned());
        }
    }

    pub fn remove_class(&self, node: NodeId, class: &str) {
        if let Some(n) = self.inner.borrow_mut().node_mut(node) {
            n.classes.retain(|c| c != class);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.inner
            .borrow()
            .node(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    /// Space-separated class list, in insertion order.
    pub fn class_name(&self, node: NodeId) -> String {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.classes.join(" "))
            .unwrap_or_default()
    }

    /// Hide or show a node. Hidden nodes and their subtrees have no layout box.
    pub fn set_hidden(&self, node: NodeId, hidden: bool) {
        if let Some(n) = self.inner.borrow_mut().node_mut(node) {
            n.hidden = hidden;
        }
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.inner.borrow().node(node).is_some_and(|n| n.hidden)
    }

    // --- Tree ---

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already attached elsewhere.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        for id in [parent, child] {
            if inner.node(id).is_none() {
                return Err(DomError::UnknownNode(id));
            }
        }
        if inner.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        inner.detach(child);
        inner.nodes[child.index()].parent = Some(parent);
        inner.nodes[parent.index()].children.push(child);
        Ok(())
    }

    /// Detach `child` from `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        if inner.node(child).and_then(|n| n.parent) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        inner.detach(child);
        Ok(())
    }

    /// Whether `node` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.borrow().contains(ancestor, node)
    }

    /// Whether `node` is attached under the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let inner = self.inner.borrow();
        inner.contains(inner.root, node)
    }

    /// Whether `node` currently has a layout box: it is connected and
    /// neither it nor any ancestor is hidden.
    pub fn is_rendered(&self, node: NodeId) -> bool {
        let inner = self.inner.borrow();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            let Some(data) = inner.node(current) else {
                return false;
            };
            if data.hidden {
                return false;
            }
            if current == inner.root {
                return true;
            }
            cursor = data.parent;
        }
        false
    }

    /// All nodes under `root` in document order, excluding `root`.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        self.inner.borrow().descendants(root)
    }

    /// Connected elements carrying `class`, in document order.
    pub fn query_by_class(&self, class: &str) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        inner
            .descendants(inner.root)
            .into_iter()
            .filter(|id| {
                inner
                    .node(*id)
                    .is_some_and(|n| n.classes.iter().any(|c| c == class))
            })
            .collect()
    }

    /// Descendants of `root` matching the focusable selector list, in
    /// document order. Visibility is not considered here.
    pub fn query_focusable(&self, root: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        inner
            .descendants(root)
            .into_iter()
            .filter(|id| inner.node(*id).is_some_and(|n| is_focusable(n)))
            .collect()
    }

    // --- Focus ---

    #[inline]
    pub fn active_element(&self) -> Option<NodeId> {
        self.inner.borrow().active
    }

    /// Give `node` focus. Disconnected nodes cannot take focus.
    pub fn focus(&self, node: NodeId) {
        let mut inner = self.inner.borrow_mut();
        let root = inner.root;
        if !inner.contains(root, node) {
            tracing::trace!(node = node.id(), "focus ignored: node not connected");
            return;
        }
        inner.active = Some(node);
    }

    /// Drop focus from `node` if it holds it.
    pub fn blur(&self, node: NodeId) {
        let mut inner = self.inner.borrow_mut();
        if inner.active == Some(node) {
            inner.active = None;
        }
    }

    // --- Events ---

    /// Register `listener` for `kind` events reaching `node`.
    pub fn add_event_listener(
        &self,
        node: NodeId,
        kind: EventKind,
        listener: impl Fn(&mut Event) + 'static,
    ) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        if let Some(n) = inner.node_mut(node) {
            n.listeners.push(ListenerEntry {
                id,
                kind,
                callback: Rc::new(listener),
            });
        }
        id
    }

    /// Remove a listener. Returns `false` if it was not registered on `node`.
    pub fn remove_event_listener(&self, node: NodeId, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(n) = inner.node_mut(node) else {
            return false;
        };
        let before = n.listeners.len();
        n.listeners.retain(|l| l.id != id);
        n.listeners.len() != before
    }

    /// Number of listeners for `kind` on `node`.
    pub fn listener_count(&self, node: NodeId, kind: EventKind) -> usize {
        self.inner
            .borrow()
            .node(node)
            .map_or(0, |n| n.listeners.iter().filter(|l| l.kind == kind).count())
    }

    fn has_listener(&self, node: NodeId, id: ListenerId) -> bool {
        self.inner
            .borrow()
            .node(node)
            .is_some_and(|n| n.listeners.iter().any(|l| l.id == id))
    }

    /// Dispatch `event` to its target and bubble it up to the root.
    ///
    /// The propagation path is fixed before any listener runs. A listener
    /// removed during dispatch is not invoked afterwards.
    pub fn dispatch(&self, mut event: Event) -> Event {
        let path: Vec<NodeId> = {
            let inner = self.inner.borrow();
            let mut path = Vec::new();
            let mut cursor = inner.node(event.target()).map(|_| event.target());
            while let Some(current) = cursor {
                path.push(current);
                cursor = inner.node(current).and_then(|n| n.parent);
            }
            path
        };

        for node in path {
            let callbacks: Vec<(ListenerId, Callback)> = {
                let inner = self.inner.borrow();
                inner
                    .node(node)
                    .map(|n| {
                        n.listeners
                            .iter()
                            .filter(|l| l.kind == event.kind())
                            .map(|l| (l.id, Rc::clone(&l.callback)))
                            .collect()
                    })
                    .unwrap_or_default()
            };

            event.set_current_target(node);
            for (id, callback) in callbacks {
                if self.has_listener(node, id) {
                    callback(&mut event);
                }
            }
            if event.propagation_stopped() {
                break;
            }
        }
        event
    }
}
