#![forbid(unsafe_code)]

//! Lifecycle controller for one modal dialog.
//!
//! A [`DialogController`] owns the overlay element, the outcome channel,
//! the element focused before the dialog opened, and the overlay dismissal
//! listeners. Every path that closes the dialog goes through one
//! settlement routine.
//!
//! # States
//!
//! ```text
//! Constructed --show()--> Shown --ok()/cancel()--> Closed
//! ```
//!
//! # Invariants
//!
//! 1. The lifecycle state is the only settlement guard: the outcome sender
//!    lives inside `Constructed`/`Shown` and is consumed when the state
//!    becomes `Closed`. No state is ever left once `Closed`.
//! 2. The outcome settles after teardown finishes: listeners removed,
//!    overlay detached, content detached and unbound, focus restored.
//! 3. The overlay is created once per controller and never reused.
//! 4. The focusable list for the trap is recomputed on every Tab press;
//!    content may change while the dialog is open.
//!
//! # Failure Modes
//!
//! - `show()` without content: [`DialogError::NotComposed`], no side effects.
//! - `show()` when the host rejects the overlay: [`DialogError::Dom`],
//!   focus is handed back to the element that had it.
//! - `ok`/`cancel`/`retain_focus` outside `Shown`: silent no-op.
//! - Overlay moved under another parent before close: logged, then
//!   detached from that parent.
//! - Overlay already detached by someone else at close: logged, teardown
//!   continues.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use dlite_core::{Document, Event, EventKind, KeyCode, ListenerId, NodeId};

use crate::error::DialogError;
use crate::outcome::{self, DEFAULT_CANCEL_REASON, DialogCancelled, DialogOutcome, Settle, Settlement};
use crate::settings::DialogSettings;

/// Global counter for unique dialog IDs.
static DIALOG_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a dialog controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialogId(u64);

impl DialogId {
    fn new() -> Self {
        Self(DIALOG_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Lifecycle hooks of the content rendered inside the overlay.
///
/// The controller drives these hooks but does not own what they do.
pub trait ContentController {
    /// The overlay is attached to its host.
    fn attached(&mut self);
    /// The overlay was detached from its host.
    fn detached(&mut self);
    /// Release bindings; called once, after `detached`.
    fn unbind(&mut self);
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Constructed,
    Shown,
    Closed,
}

struct Shown<T> {
    settle: Settle<T>,
    last_focused: Option<NodeId>,
    listeners: [ListenerId; 2],
}

enum Lifecycle<T> {
    Constructed { settle: Settle<T> },
    Shown(Shown<T>),
    Closed,
}

impl<T> Lifecycle<T> {
    fn state(&self) -> DialogState {
        match self {
            Self::Constructed { .. } => DialogState::Constructed,
            Self::Shown(_) => DialogState::Shown,
            Self::Closed => DialogState::Closed,
        }
    }
}

struct Inner<T> {
    id: DialogId,
    document: Document,
    settings: DialogSettings,
    overlay: NodeId,
    content: RefCell<Option<Box<dyn ContentController>>>,
    lifecycle: RefCell<Lifecycle<T>>,
    outcome: RefCell<Option<DialogOutcome<T>>>,
}

/// Handle to one dialog. Clones share the same dialog.
pub struct DialogController<T = serde_json::Value> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for DialogController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for DialogController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogController")
            .field("id", &self.inner.id)
            .field("state", &self.inner.lifecycle.borrow().state())
            .field("overlay", &self.inner.overlay)
            .finish()
    }
}

impl<T: 'static> DialogController<T> {
    /// Build the overlay element and the outcome channel. Nothing is
    /// attached until [`show`](Self::show).
    pub fn new(document: &Document, settings: DialogSettings) -> Self {
        let overlay = document.create_element("div");
        document.add_class(overlay, &settings.overlay_class_name);
        let (settle, outcome) = outcome::channel();
        let id = DialogId::new();
        tracing::trace!(dialog = id.id(), overlay = overlay.id(), "dialog constructed");

        Self {
            inner: Rc::new(Inner {
                id,
                document: document.clone(),
                settings,
                overlay,
                content: RefCell::new(None),
                lifecycle: RefCell::new(Lifecycle::Constructed { settle }),
                outcome: RefCell::new(Some(outcome)),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> DialogId {
        self.inner.id
    }

    #[inline]
    pub fn settings(&self) -> &DialogSettings {
        &self.inner.settings
    }

    /// The overlay element this controller owns.
    #[inline]
    pub fn overlay(&self) -> NodeId {
        self.inner.overlay
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn state(&self) -> DialogState {
        self.inner.lifecycle.borrow().state()
    }

    /// Whether the dialog is currently shown.
    pub fn is_attached(&self) -> bool {
        self.state() == DialogState::Shown
    }

    /// Assign the content controller. Ignored once the dialog has been shown.
    pub fn set_content(&self, content: Box<dyn ContentController>) {
        if self.state() != DialogState::Constructed {
            tracing::debug!(dialog = self.inner.id.id(), "content assignment ignored after show");
            return;
        }
        *self.inner.content.borrow_mut() = Some(content);
    }

    pub fn has_content(&self) -> bool {
        self.inner.content.borrow().is_some()
    }

    /// Take the awaitable outcome. Returns `None` after the first call.
    pub fn take_outcome(&self) -> Option<DialogOutcome<T>> {
        self.inner.outcome.borrow_mut().take()
    }

    /// Attach the overlay to its host and start the dialog.
    ///
    /// In order: remember and blur the focused element, append the overlay
    /// to `settings.host`, run the content's `attached` hook, and install
    /// the overlay click/touch dismissal listeners.
    pub fn show(&self) -> Result<(), DialogError> {
        let inner = &self.inner;
        if self.state() != DialogState::Constructed {
            tracing::debug!(dialog = inner.id.id(), state = ?self.state(), "show ignored");
            return Ok(());
        }
        if !self.has_content() {
            return Err(DialogError::NotComposed);
        }

        let document = &inner.document;
        let last_focused = document.active_element();
        if let Some(node) = last_focused {
            document.blur(node);
        }

        if let Err(err) = document.append_child(inner.settings.host, inner.overlay) {
            if let Some(node) = last_focused {
                document.focus(node);
            }
            return Err(err.into());
        }

        // Taken out so the hook may call back into the controller.
        let content = inner.content.borrow_mut().take();
        if let Some(mut content) = content {
            content.attached();
            *inner.content.borrow_mut() = Some(content);
        }

        let listeners = [
            self.listen_overlay(EventKind::Click),
            self.listen_overlay(EventKind::TouchStart),
        ];

        let mut lifecycle = inner.lifecycle.borrow_mut();
        match mem::replace(&mut *lifecycle, Lifecycle::Closed) {
            Lifecycle::Constructed { settle } => {
                *lifecycle = Lifecycle::Shown(Shown {
                    settle,
                    last_focused,
                    listeners,
                });
            }
            other => *lifecycle = other,
        }
        tracing::debug!(
            dialog = inner.id.id(),
            host = inner.settings.host.id(),
            last_focused = last_focused.map(NodeId::id),
            "dialog shown"
        );
        Ok(())
    }

    fn listen_overlay(&self, kind: EventKind) -> ListenerId {
        let weak: Weak<Inner<T>> = Rc::downgrade(&self.inner);
        self.inner
            .document
            .add_event_listener(self.inner.overlay, kind, move |event| {
                if let Some(inner) = weak.upgrade() {
                    DialogController { inner }.cancel_on_overlay(event);
                }
            })
    }

    /// Close the dialog and resolve the outcome with `value`.
    pub fn ok(&self, value: T) {
        self.close(Ok(value));
    }

    /// Close the dialog and reject the outcome with the default reason.
    pub fn cancel(&self) {
        self.cancel_with(DEFAULT_CANCEL_REASON);
    }

    /// Close the dialog and reject the outcome with `reason`.
    pub fn cancel_with(&self, reason: impl Into<String>) {
        self.close(Err(DialogCancelled::new(reason)));
    }

    /// Overlay click/touch handler: cancels only when dismissal is enabled
    /// and the event landed on the backdrop itself, not bubbled up from
    /// the dialog content.
    pub fn cancel_on_overlay(&self, event: &Event) {
        if self.inner.settings.overlay_dismiss && event.target() == self.inner.overlay {
            self.cancel();
        }
    }

    /// Keyboard focus trap. Handles Tab only.
    ///
    /// Consumes the event, then moves focus to the next (or, with Shift,
    /// previous) rendered focusable node inside the overlay, wrapping at
    /// both ends. Focus that escaped the overlay is pulled back to the
    /// first focusable node.
    pub fn retain_focus(&self, event: &mut Event) {
        if !self.is_attached() {
            return;
        }
        let Some(key) = event.key() else {
            return;
        };
        if key.code != KeyCode::Tab {
            return;
        }
        let backward = key.shift();
        event.stop_propagation();
        event.prevent_default();

        let document = &self.inner.document;
        let overlay = self.inner.overlay;
        let nodes: Vec<NodeId> = document
            .query_focusable(overlay)
            .into_iter()
            .filter(|node| document.is_rendered(*node))
            .collect();
        if nodes.is_empty() {
            return;
        }

        let active = document
            .active_element()
            .filter(|node| document.contains(overlay, *node));
        let target = match active {
            None => nodes[0],
            Some(current) => {
                let index = nodes.iter().position(|node| *node == current);
                nodes[next_focus_index(index, nodes.len(), backward)]
            }
        };
        tracing::trace!(
            dialog = self.inner.id.id(),
            from = active.map(NodeId::id),
            to = target.id(),
            "focus trap"
        );
        document.focus(target);
    }

    fn close(&self, settlement: Settlement<T>) {
        let shown = {
            let mut lifecycle = self.inner.lifecycle.borrow_mut();
            match mem::replace(&mut *lifecycle, Lifecycle::Closed) {
                Lifecycle::Shown(shown) => shown,
                other => {
                    *lifecycle = other;
                    tracing::trace!(dialog = self.inner.id.id(), "settlement ignored: not attached");
                    return;
                }
            }
        };

        let accepted = settlement.is_ok();
        let settle = self.hide(shown);
        match &settlement {
            Ok(_) => tracing::debug!(dialog = self.inner.id.id(), "dialog accepted"),
            Err(cancelled) => tracing::debug!(
                dialog = self.inner.id.id(),
                reason = cancelled.reason(),
                "dialog cancelled"
            ),
        }
        if settle.send(settlement).is_err() {
            tracing::trace!(dialog = self.inner.id.id(), accepted, "outcome receiver dropped");
        }
    }

    /// Teardown, reached only through settlement.
    fn hide(&self, shown: Shown<T>) -> Settle<T> {
        let inner = &self.inner;
        let document = &inner.document;
        for listener in shown.listeners {
            document.remove_event_listener(inner.overlay, listener);
        }

        // Detach from wherever the overlay ended up, not only from the host.
        match document.parent(inner.overlay) {
            Some(parent) => {
                if parent != inner.settings.host {
                    tracing::warn!(
                        dialog = inner.id.id(),
                        host = inner.settings.host.id(),
                        parent = parent.id(),
                        "overlay moved away from its host"
                    );
                }
                if let Err(err) = document.remove_child(parent, inner.overlay) {
                    tracing::warn!(dialog = inner.id.id(), %err, "overlay detach failed");
                }
            }
            None => tracing::warn!(dialog = inner.id.id(), "overlay already detached"),
        }

        let content = inner.content.borrow_mut().take();
        if let Some(mut content) = content {
            content.detached();
            content.unbind();
        }

        if let Some(node) = shown.last_focused {
            match &inner.settings.restore_focus {
                Some(restore) => restore(node),
                None => document.focus(node),
            }
        }
        shown.settle
    }
}

/// Index of the next node in a circular tab order of `len` nodes.
///
/// `current` is `None` when the focused element is inside the overlay but
/// not in the list; stepping forward then lands on the first node and
/// stepping backward on the last.
fn next_focus_index(current: Option<usize>, len: usize, backward: bool) -> usize {
    debug_assert!(len > 0);
    match (current, backward) {
        (None, false) => 0,
        (None, true) => len - 1,
        (Some(i), false) => (i + 1) % len,
        (Some(0), true) => len - 1,
        (Some(i), true) => i - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DialogSettingsOverrides;
    use dlite_core::{KeyEvent, Modifiers};
    use futures::FutureExt;
    use futures::executor::block_on;
    use serde_json::{Value, json};
    use std::cell::Cell;

    #[derive(Default)]
    struct HookLog {
        calls: RefCell<Vec<&'static str>>,
    }

    struct RecordingContent(Rc<HookLog>);

    impl ContentController for RecordingContent {
        fn attached(&mut self) {
            self.0.calls.borrow_mut().push("attached");
        }
        fn detached(&mut self) {
            self.0.calls.borrow_mut().push("detached");
        }
        fn unbind(&mut self) {
            self.0.calls.borrow_mut().push("unbind");
        }
    }

    fn unlocked() -> DialogSettingsOverrides {
        DialogSettingsOverrides::new().lock(false)
    }

    fn controller(doc: &Document, overrides: DialogSettingsOverrides) -> (DialogController<Value>, Rc<HookLog>) {
        let settings = DialogSettings::defaults(doc).resolve(overrides);
        let controller = DialogController::new(doc, settings);
        let log = Rc::new(HookLog::default());
        controller.set_content(Box::new(RecordingContent(Rc::clone(&log))));
        (controller, log)
    }

    fn tab(doc: &Document, controller: &DialogController<Value>, shift: bool) {
        let target = doc.active_element().unwrap_or(doc.body());
        let mut key = KeyEvent::new(KeyCode::Tab);
        if shift {
            key = key.with_modifiers(Modifiers::SHIFT);
        }
        let mut event = Event::key_down(target, key);
        controller.retain_focus(&mut event);
        assert!(event.default_prevented());
        assert!(event.propagation_stopped());
    }

    fn add(doc: &Document, parent: NodeId, tag: &str) -> NodeId {
        let node = doc.create_element(tag);
        doc.append_child(parent, node).unwrap();
        node
    }

    #[test]
    fn construct_does_not_attach() {
        let doc = Document::new();
        let (controller, log) = controller(&doc, DialogSettingsOverrides::new());
        assert_eq!(controller.state(), DialogState::Constructed);
        assert!(!doc.is_connected(controller.overlay()));
        assert_eq!(doc.class_name(controller.overlay()), "dialog-lite-overlay");
        assert!(log.calls.borrow().is_empty());
    }

    #[test]
    fn show_without_content_fails() {
        let doc = Document::new();
        let settings = DialogSettings::defaults(&doc);
        let controller = DialogController::<Value>::new(&doc, settings);
        let outside = add(&doc, doc.body(), "button");
        doc.focus(outside);

        assert_eq!(controller.show(), Err(DialogError::NotComposed));
        assert_eq!(controller.show().unwrap_err().to_string(), "cannot show dialog before composing");
        assert_eq!(controller.state(), DialogState::Constructed);
        assert!(!doc.is_connected(controller.overlay()));
        assert_eq!(doc.active_element(), Some(outside));
    }

    #[test]
    fn show_attaches_and_captures_focus() {
        let doc = Document::new();
        let trigger = add(&doc, doc.body(), "button");
        doc.focus(trigger);

        let (controller, log) = controller(&doc, DialogSettingsOverrides::new());
        controller.show().unwrap();

        assert_eq!(controller.state(), DialogState::Shown);
        assert_eq!(doc.parent(controller.overlay()), Some(doc.body()));
        assert_eq!(doc.active_element(), None);
        assert_eq!(*log.calls.borrow(), vec!["attached"]);
        assert_eq!(doc.listener_count(controller.overlay(), EventKind::Click), 1);
        assert_eq!(doc.listener_count(controller.overlay(), EventKind::TouchStart), 1);
    }

    #[test]
    fn show_twice_is_noop() {
        let doc = Document::new();
        let (controller, log) = controller(&doc, DialogSettingsOverrides::new());
        controller.show().unwrap();
        controller.show().unwrap();
        assert_eq!(doc.children(doc.body()), vec![controller.overlay()]);
        assert_eq!(*log.calls.borrow(), vec!["attached"]);
    }

    #[test]
    fn show_into_custom_host() {
        let doc = Document::new();
        let host = add(&doc, doc.body(), "section");
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new().host(host));
        controller.show().unwrap();
        assert_eq!(doc.parent(controller.overlay()), Some(host));
    }

    #[test]
    fn failed_attach_restores_focus() {
        let doc = Document::new();
        let trigger = add(&doc, doc.body(), "button");
        doc.focus(trigger);

        let host = add(&doc, doc.body(), "section");
        let (broken, log) = controller(&doc, DialogSettingsOverrides::new().host(host));
        // Host inside the overlay: the append would create a cycle.
        doc.append_child(broken.overlay(), host).unwrap();

        assert!(matches!(broken.show(), Err(DialogError::Dom(_))));
        assert_eq!(broken.state(), DialogState::Constructed);
        assert_eq!(doc.active_element(), Some(trigger));
        assert!(log.calls.borrow().is_empty());
    }

    #[test]
    fn moved_overlay_is_still_detached_on_close() {
        let doc = Document::new();
        let trigger = add(&doc, doc.body(), "button");
        doc.focus(trigger);
        let (controller, log) = controller(&doc, DialogSettingsOverrides::new());
        controller.show().unwrap();

        let elsewhere = add(&doc, doc.body(), "aside");
        doc.append_child(elsewhere, controller.overlay()).unwrap();
        controller.ok(Value::Null);

        assert_eq!(controller.state(), DialogState::Closed);
        assert!(!doc.is_connected(controller.overlay()));
        assert_eq!(doc.parent(controller.overlay()), None);
        assert!(doc.children(elsewhere).is_empty());
        assert_eq!(*log.calls.borrow(), vec!["attached", "detached", "unbind"]);
        assert_eq!(doc.active_element(), Some(trigger));
    }

    #[test]
    fn externally_detached_overlay_still_settles() {
        let doc = Document::new();
        let (controller, log) = controller(&doc, DialogSettingsOverrides::new());
        controller.show().unwrap();
        doc.remove_child(doc.body(), controller.overlay()).unwrap();

        controller.cancel();
        assert_eq!(controller.state(), DialogState::Closed);
        assert_eq!(*log.calls.borrow(), vec!["attached", "detached", "unbind"]);
        assert!(block_on(controller.take_outcome().unwrap()).is_err());
    }

    #[test]
    fn ok_resolves_after_teardown() {
        let doc = Document::new();
        let trigger = add(&doc, doc.body(), "button");
        doc.focus(trigger);
        let (controller, log) = controller(&doc, DialogSettingsOverrides::new());
        let mut outcome = controller.take_outcome().unwrap();
        controller.show().unwrap();
        assert!((&mut outcome).now_or_never().is_none());

        controller.ok(json!({ "a": 1, "b": "2" }));

        assert_eq!(controller.state(), DialogState::Closed);
        assert!(!doc.is_connected(controller.overlay()));
        assert_eq!(*log.calls.borrow(), vec!["attached", "detached", "unbind"]);
        assert_eq!(doc.active_element(), Some(trigger));
        assert_eq!(doc.listener_count(controller.overlay(), EventKind::Click), 0);
        assert_eq!(doc.listener_count(controller.overlay(), EventKind::TouchStart), 0);
        assert_eq!(block_on(outcome), Ok(json!({ "a": 1, "b": "2" })));
    }

    #[test]
    fn cancel_default_and_custom_reason() {
        let doc = Document::new();
        let (first, _) = controller(&doc, DialogSettingsOverrides::new());
        first.show().unwrap();
        first.cancel();
        let err = block_on(first.take_outcome().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "cancelled");

        let (second, _) = controller(&doc, DialogSettingsOverrides::new());
        second.show().unwrap();
        second.cancel_with("another reason");
        let err = block_on(second.take_outcome().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "another reason");
    }

    #[test]
    fn settlement_before_show_is_ignored() {
        let doc = Document::new();
        let (controller, log) = controller(&doc, DialogSettingsOverrides::new());
        let mut outcome = controller.take_outcome().unwrap();
        controller.ok(json!(1));
        controller.cancel();
        assert_eq!(controller.state(), DialogState::Constructed);
        assert!(log.calls.borrow().is_empty());
        assert!((&mut outcome).now_or_never().is_none());

        controller.show().unwrap();
        controller.ok(json!(2));
        assert_eq!(block_on(outcome), Ok(json!(2)));
    }

    #[test]
    fn settles_at_most_once() {
        let doc = Document::new();
        let trigger = add(&doc, doc.body(), "button");
        doc.focus(trigger);
        let (controller, log) = controller(&doc, DialogSettingsOverrides::new());
        controller.show().unwrap();

        controller.ok(json!("first"));
        let other = add(&doc, doc.body(), "input");
        doc.focus(other);
        controller.cancel();
        controller.ok(json!("second"));
        controller.cancel_with("late");

        assert_eq!(*log.calls.borrow(), vec!["attached", "detached", "unbind"]);
        // No second focus restoration.
        assert_eq!(doc.active_element(), Some(other));
        assert_eq!(block_on(controller.take_outcome().unwrap()), Ok(json!("first")));
    }

    #[test]
    fn show_after_close_is_noop() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        controller.show().unwrap();
        controller.cancel();
        assert_eq!(controller.show(), Ok(()));
        assert_eq!(controller.state(), DialogState::Closed);
        assert!(!doc.is_connected(controller.overlay()));
    }

    #[test]
    fn take_outcome_once() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        assert!(controller.take_outcome().is_some());
        assert!(controller.take_outcome().is_none());
    }

    #[test]
    fn no_focus_to_restore() {
        let doc = Document::new();
        let restored = Rc::new(Cell::new(false));
        let r = Rc::clone(&restored);
        let (controller, _) = controller(
            &doc,
            DialogSettingsOverrides::new().restore_focus(move |_| r.set(true)),
        );
        controller.show().unwrap();
        controller.ok(Value::Null);
        assert!(!restored.get());
        assert_eq!(doc.active_element(), None);
    }

    #[test]
    fn restore_focus_override_replaces_default() {
        let doc = Document::new();
        let trigger = add(&doc, doc.body(), "button");
        doc.focus(trigger);
        let seen = Rc::new(Cell::new(None));
        let s = Rc::clone(&seen);
        let (controller, _) = controller(
            &doc,
            DialogSettingsOverrides::new().restore_focus(move |node| s.set(Some(node))),
        );
        controller.show().unwrap();
        controller.cancel();
        assert_eq!(seen.get(), Some(trigger));
        assert_eq!(doc.active_element(), None);
    }

    #[test]
    fn overlay_click_on_backdrop_cancels() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, unlocked().overlay_dismiss(true));
        let content = add(&doc, controller.overlay(), "div");
        let button = add(&doc, content, "button");
        controller.show().unwrap();

        doc.dispatch(Event::click(button));
        doc.dispatch(Event::touch_start(content));
        assert!(controller.is_attached());

        doc.dispatch(Event::click(controller.overlay()));
        assert_eq!(controller.state(), DialogState::Closed);
        let err = block_on(controller.take_outcome().unwrap()).unwrap_err();
        assert_eq!(err.reason(), "cancelled");
    }

    #[test]
    fn overlay_touch_on_backdrop_cancels() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, unlocked().overlay_dismiss(true));
        controller.show().unwrap();
        doc.dispatch(Event::touch_start(controller.overlay()));
        assert_eq!(controller.state(), DialogState::Closed);
    }

    #[test]
    fn overlay_click_without_dismiss_does_nothing() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, unlocked());
        controller.show().unwrap();
        doc.dispatch(Event::click(controller.overlay()));
        assert!(controller.is_attached());
    }

    #[test]
    fn lock_is_enforced_by_resolution_not_controller() {
        let doc = Document::new();

        // Through the resolver, lock wins.
        let (resolved, _) = controller(&doc, DialogSettingsOverrides::new().overlay_dismiss(true));
        resolved.show().unwrap();
        doc.dispatch(Event::click(resolved.overlay()));
        assert!(resolved.is_attached());

        // Hand-built settings bypass the resolver: the controller only
        // consults overlay_dismiss.
        let mut raw = DialogSettings::defaults(&doc);
        raw.lock = true;
        raw.overlay_dismiss = true;
        let direct = DialogController::<Value>::new(&doc, raw);
        direct.set_content(Box::new(RecordingContent(Rc::default())));
        direct.show().unwrap();
        doc.dispatch(Event::click(direct.overlay()));
        assert_eq!(direct.state(), DialogState::Closed);
    }

    #[test]
    fn content_hooks_may_reenter() {
        struct SelfClosing(DialogController<Value>);
        impl ContentController for SelfClosing {
            fn attached(&mut self) {
                // Not yet shown: ignored.
                self.0.ok(json!("early"));
            }
            fn detached(&mut self) {
                self.0.cancel();
            }
            fn unbind(&mut self) {}
        }

        let doc = Document::new();
        let controller = DialogController::<Value>::new(&doc, DialogSettings::defaults(&doc));
        controller.set_content(Box::new(SelfClosing(controller.clone())));
        controller.show().unwrap();
        assert!(controller.is_attached());
        controller.ok(json!("late"));
        assert_eq!(block_on(controller.take_outcome().unwrap()), Ok(json!("late")));
    }

    #[test]
    fn dropped_controller_abandons_outcome() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        let outcome = controller.take_outcome().unwrap();
        drop(controller);
        let err = block_on(outcome).unwrap_err();
        assert_eq!(err.reason(), outcome::ABANDONED_REASON);
    }

    // --- Focus trap ---

    #[test]
    fn next_index_wraps_both_ways() {
        assert_eq!(next_focus_index(Some(0), 3, false), 1);
        assert_eq!(next_focus_index(Some(2), 3, false), 0);
        assert_eq!(next_focus_index(Some(0), 3, true), 2);
        assert_eq!(next_focus_index(Some(2), 3, true), 1);
        assert_eq!(next_focus_index(None, 3, false), 0);
        assert_eq!(next_focus_index(None, 3, true), 2);
        assert_eq!(next_focus_index(Some(0), 1, false), 0);
        assert_eq!(next_focus_index(Some(0), 1, true), 0);
    }

    #[test]
    fn tab_cycles_inside_overlay() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        let overlay = controller.overlay();
        let first = add(&doc, overlay, "input");
        let middle = add(&doc, overlay, "button");
        let last = add(&doc, overlay, "textarea");
        controller.show().unwrap();

        doc.focus(first);
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(middle));
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(last));
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(first));
        tab(&doc, &controller, true);
        assert_eq!(doc.active_element(), Some(last));
    }

    #[test]
    fn escaped_focus_is_recaptured() {
        let doc = Document::new();
        let outside = add(&doc, doc.body(), "button");
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        let first = add(&doc, controller.overlay(), "button");
        let _second = add(&doc, controller.overlay(), "button");
        controller.show().unwrap();

        doc.focus(outside);
        tab(&doc, &controller, true);
        assert_eq!(doc.active_element(), Some(first));

        doc.blur(first);
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(first));
    }

    #[test]
    fn hidden_and_disabled_nodes_are_skipped() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        let overlay = controller.overlay();
        let first = add(&doc, overlay, "button");
        let disabled = add(&doc, overlay, "button");
        doc.set_attribute(disabled, "disabled", "");
        let panel = add(&doc, overlay, "div");
        doc.set_hidden(panel, true);
        let _hidden = add(&doc, panel, "input");
        let last = add(&doc, overlay, "a");
        doc.set_attribute(last, "href", "#");
        controller.show().unwrap();

        doc.focus(first);
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(last));
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(first));
    }

    #[test]
    fn list_is_recomputed_per_keystroke() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        let overlay = controller.overlay();
        let first = add(&doc, overlay, "button");
        controller.show().unwrap();

        doc.focus(first);
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(first));

        let added = add(&doc, overlay, "button");
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(added));
    }

    #[test]
    fn focus_on_non_focusable_overlay_child() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        let overlay = controller.overlay();
        let heading = add(&doc, overlay, "h2");
        let first = add(&doc, overlay, "button");
        let last = add(&doc, overlay, "button");
        controller.show().unwrap();

        doc.focus(heading);
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(first));

        doc.focus(heading);
        tab(&doc, &controller, true);
        assert_eq!(doc.active_element(), Some(last));
    }

    #[test]
    fn no_focusable_nodes_still_consumes_tab() {
        let doc = Document::new();
        let outside = add(&doc, doc.body(), "button");
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        add(&doc, controller.overlay(), "p");
        controller.show().unwrap();
        doc.focus(outside);
        tab(&doc, &controller, false);
        assert_eq!(doc.active_element(), Some(outside));
    }

    #[test]
    fn non_tab_keys_pass_through() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        let button = add(&doc, controller.overlay(), "button");
        controller.show().unwrap();

        let mut event = Event::key_down(doc.body(), KeyEvent::new(KeyCode::Char('a')));
        controller.retain_focus(&mut event);
        assert!(!event.default_prevented());
        assert!(!event.propagation_stopped());
        assert_eq!(doc.active_element(), None);

        let mut click = Event::click(button);
        controller.retain_focus(&mut click);
        assert!(!click.default_prevented());
    }

    #[test]
    fn trap_inactive_when_not_shown() {
        let doc = Document::new();
        let (controller, _) = controller(&doc, DialogSettingsOverrides::new());
        add(&doc, controller.overlay(), "button");
        let mut event = Event::key_down(doc.body(), KeyEvent::new(KeyCode::Tab));
        controller.retain_focus(&mut event);
        assert!(!event.default_prevented());
        assert_eq!(doc.active_element(), None);
    }
}
