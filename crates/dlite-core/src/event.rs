#![forbid(unsafe_code)]

//! Input events dispatched through a [`Document`](crate::Document).
//!
//! Events carry a fixed `target` and a `current_target` that moves as the
//! event bubbles from the target up to the document root. Listeners may
//! call [`Event::stop_propagation`] to halt bubbling after the current node
//! and [`Event::prevent_default`] to suppress the host's native handling
//! (for example the built-in Tab order).

use bitflags::bitflags;

use crate::document::NodeId;

/// The kind of an event, used to select listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Primary pointer click.
    Click,
    /// Start of a touch gesture.
    TouchStart,
    /// Key pressed.
    KeyDown,
}

/// Key identity for keyboard events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Tab,
    Escape,
    Enter,
    Char(char),
    /// Any other named key.
    Named(String),
}

bitflags! {
    /// Modifier keys held during a keyboard event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const META  = 0b1000;
    }
}

/// Keyboard payload of a [`EventKind::KeyDown`] event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Key press without modifiers.
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// Add modifiers to this key press.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// Whether Shift was held.
    #[inline]
    pub fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// A dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    target: NodeId,
    current_target: NodeId,
    key: Option<KeyEvent>,
    propagation_stopped: bool,
    default_prevented: bool,
}

impl Event {
    fn new(kind: EventKind, target: NodeId, key: Option<KeyEvent>) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            key,
            propagation_stopped: false,
            default_prevented: false,
        }
    }

    /// A click landing on `target`.
    pub fn click(target: NodeId) -> Self {
        Self::new(EventKind::Click, target, None)
    }

    /// A touch gesture starting on `target`.
    pub fn touch_start(target: NodeId) -> Self {
        Self::new(EventKind::TouchStart, target, None)
    }

    /// A key press delivered to `target`.
    pub fn key_down(target: NodeId, key: KeyEvent) -> Self {
        Self::new(EventKind::KeyDown, target, Some(key))
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The node the event was originally dispatched to.
    #[inline]
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The node whose listeners are currently running.
    #[inline]
    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub(crate) fn set_current_target(&mut self, node: NodeId) {
        self.current_target = node;
    }

    /// Keyboard payload, present only for [`EventKind::KeyDown`].
    #[inline]
    pub fn key(&self) -> Option<&KeyEvent> {
        self.key.as_ref()
    }

    /// Stop bubbling once the listeners of the current node finish.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    #[inline]
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Suppress the host's native handling of this event.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    #[inline]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}
