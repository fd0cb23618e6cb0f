#![forbid(unsafe_code)]

//! Document model, input events, and focusable-element rules for dialog-lite.
//!
//! The dialog crate drives overlays through this model: it attaches and
//! detaches nodes, moves keyboard focus, and listens for pointer and key
//! events.

pub mod document;
pub mod event;
pub mod focusable;

pub use document::{Document, DomError, ListenerId, NodeId};
pub use event::{Event, EventKind, KeyCode, KeyEvent, Modifiers};
pub use focusable::{FOCUSABLE_SELECTORS, is_focusable};
