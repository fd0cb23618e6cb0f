#![forbid(unsafe_code)]

//! Registry of open dialogs with document-level keyboard routing.
//!
//! The `DialogStack` keeps open dialogs in LIFO order and installs a single
//! keydown listener on the document root. Key presses go to the topmost
//! open dialog only: Tab feeds its focus trap, Escape and Enter dismiss it
//! when its resolved settings allow.
//!
//! # Invariants
//!
//! - Only the top open dialog receives key events.
//! - Dialogs never call back into the stack. A dialog that closed by any
//!   route is pruned the next time the stack is consulted.
//! - Exactly one root listener exists per stack; dropping the stack
//!   removes it.
//!
//! # Failure Modes
//!
//! - Key events with no open dialog pass through untouched.
//! - `close_all` on an empty stack returns 0.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use dlite_core::{Document, Event, EventKind, KeyCode, ListenerId};

use crate::controller::{DialogController, DialogId, DialogState};
use crate::settings::KeyboardDismiss;

/// A dialog the stack can route keys to and close.
///
/// Implemented for [`DialogController`]; the accept value for Enter comes
/// from `T::default()`.
pub trait StackDialog {
    fn dialog_id(&self) -> DialogId;

    /// Whether the dialog still counts as open for routing purposes.
    fn is_open(&self) -> bool;

    /// Handle a keydown that reached the document root.
    fn handle_key_down(&self, event: &mut Event);

    /// Cancel the dialog with `reason`.
    fn close_with(&self, reason: &str);
}

impl<T: Default + 'static> StackDialog for DialogController<T> {
    fn dialog_id(&self) -> DialogId {
        self.id()
    }

    fn is_open(&self) -> bool {
        self.state() != DialogState::Closed
    }

    fn handle_key_down(&self, event: &mut Event) {
        let Some(code) = event.key().map(|key| key.code.clone()) else {
            return;
        };
        let keyboard = self.settings().keyboard;
        match code {
            KeyCode::Tab => self.retain_focus(event),
            KeyCode::Escape if keyboard.contains(KeyboardDismiss::ESCAPE) => {
                event.prevent_default();
                self.cancel();
            }
            KeyCode::Enter if keyboard.contains(KeyboardDismiss::ENTER) => {
                event.prevent_default();
                self.ok(T::default());
            }
            _ => {}
        }
    }

    fn close_with(&self, reason: &str) {
        self.cancel_with(reason);
    }
}

type Entries = RefCell<Vec<Rc<dyn StackDialog>>>;

/// LIFO registry of open dialogs bound to one document.
pub struct DialogStack {
    document: Document,
    entries: Rc<Entries>,
    listener: ListenerId,
}

impl fmt::Debug for DialogStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogStack")
            .field("depth", &self.entries.borrow().len())
            .field("listener", &self.listener)
            .finish()
    }
}

impl DialogStack {
    /// Create an empty stack and install the root keydown listener.
    pub fn new(document: &Document) -> Self {
        let entries: Rc<Entries> = Rc::new(RefCell::new(Vec::new()));
        let weak: Weak<Entries> = Rc::downgrade(&entries);
        let listener = document.add_event_listener(document.root(), EventKind::KeyDown, move |event| {
            let Some(entries) = weak.upgrade() else {
                return;
            };
            let top = {
                let mut entries = entries.borrow_mut();
                prune(&mut entries);
                entries.last().cloned()
            };
            if let Some(top) = top {
                top.handle_key_down(event);
            }
        });

        Self {
            document: document.clone(),
            entries,
            listener,
        }
    }

    /// Register an open dialog on top of the stack.
    pub fn push<D: StackDialog + 'static>(&self, dialog: D) -> DialogId {
        let id = dialog.dialog_id();
        let mut entries = self.entries.borrow_mut();
        prune(&mut entries);
        entries.push(Rc::new(dialog));
        tracing::trace!(dialog = id.id(), depth = entries.len(), "dialog pushed");
        id
    }

    /// Number of open dialogs.
    pub fn depth(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        prune(&mut entries);
        entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// ID of the dialog currently receiving keys.
    pub fn top_id(&self) -> Option<DialogId> {
        let mut entries = self.entries.borrow_mut();
        prune(&mut entries);
        entries.last().map(|dialog| dialog.dialog_id())
    }

    pub fn contains(&self, id: DialogId) -> bool {
        let mut entries = self.entries.borrow_mut();
        prune(&mut entries);
        entries.iter().any(|dialog| dialog.dialog_id() == id)
    }

    /// Cancel every open dialog, topmost first. Returns how many closed.
    pub fn close_all(&self, reason: &str) -> usize {
        let drained: Vec<Rc<dyn StackDialog>> = {
            let mut entries = self.entries.borrow_mut();
            prune(&mut entries);
            entries.drain(..).rev().collect()
        };
        for dialog in &drained {
            dialog.close_with(reason);
        }
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), reason, "closed all dialogs");
        }
        drained.len()
    }
}

impl Drop for DialogStack {
    fn drop(&mut self) {
        self.document
            .remove_event_listener(self.document.root(), self.listener);
    }
}

fn prune(entries: &mut Vec<Rc<dyn StackDialog>>) {
    entries.retain(|dialog| dialog.is_open());
}
