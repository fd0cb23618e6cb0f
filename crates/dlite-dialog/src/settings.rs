#![forbid(unsafe_code)]

//! Dialog settings and the resolver that merges caller overrides onto
//! process-wide defaults.
//!
//! # Lock Coupling
//!
//! `lock: true` suppresses keyboard and overlay-click dismissal. The
//! controller never looks at `lock` itself; [`DialogSettings::resolve`]
//! clears `keyboard` and `overlay_dismiss` whenever the merged `lock` is
//! true. Settings built by hand and handed straight to a controller skip
//! that step.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use dlite_core::{Document, NodeId};

/// Class applied to generated overlays unless overridden.
pub const DEFAULT_OVERLAY_CLASS: &str = "dialog-lite-overlay";

bitflags! {
    /// Keys that close the topmost dialog.
    ///
    /// `ESCAPE` cancels, `ENTER` accepts. `true` in the boolean form
    /// means `ESCAPE` only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyboardDismiss: u8 {
        const ESCAPE = 0b01;
        const ENTER  = 0b10;
    }
}

impl From<bool> for KeyboardDismiss {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::ESCAPE
        } else {
            Self::empty()
        }
    }
}

/// Callback that receives the element focused before the dialog opened.
pub type RestoreFocus = Rc<dyn Fn(NodeId)>;

/// Fully resolved configuration for one dialog.
#[derive(Clone)]
pub struct DialogSettings {
    /// Identity of the content view-model, passed through to the composer.
    pub view_model: Option<String>,
    /// View override, passed through to the composer.
    pub view: Option<String>,
    /// Payload handed to the content on activation.
    pub model: Option<serde_json::Value>,
    /// Node the overlay attaches under.
    pub host: NodeId,
    pub lock: bool,
    pub keyboard: KeyboardDismiss,
    /// Cancel when the overlay backdrop itself is clicked or touched.
    pub overlay_dismiss: bool,
    pub overlay_class_name: String,
    /// Read only by [`crate::DialogService::open_response`]; the outcome
    /// itself always rejects on cancel.
    pub reject_on_cancel: bool,
    /// Replaces the default "focus it again" restoration on close.
    pub restore_focus: Option<RestoreFocus>,
}

impl fmt::Debug for DialogSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogSettings")
            .field("view_model", &self.view_model)
            .field("view", &self.view)
            .field("model", &self.model)
            .field("host", &self.host)
            .field("lock", &self.lock)
            .field("keyboard", &self.keyboard)
            .field("overlay_dismiss", &self.overlay_dismiss)
            .field("overlay_class_name", &self.overlay_class_name)
            .field("reject_on_cancel", &self.reject_on_cancel)
            .field("restore_focus", &self.restore_focus.is_some())
            .finish()
    }
}

impl DialogSettings {
    /// Process-wide defaults: host is the document body, `lock` is on,
    /// `reject_on_cancel` is off, everything else absent or off.
    pub fn defaults(document: &Document) -> Self {
        Self {
            view_model: None,
            view: None,
            model: None,
            host: document.body(),
            lock: true,
            keyboard: KeyboardDismiss::empty(),
            overlay_dismiss: false,
            overlay_class_name: DEFAULT_OVERLAY_CLASS.to_owned(),
            reject_on_cancel: false,
            restore_focus: None,
        }
    }

    /// Overlay `overrides` onto `self`, then apply the lock coupling.
    #[must_use]
    pub fn resolve(&self, overrides: DialogSettingsOverrides) -> DialogSettings {
        let DialogSettingsOverrides {
            view_model,
            view,
            model,
            host,
            lock,
            keyboard,
            overlay_dismiss,
            overlay_class_name,
            reject_on_cancel,
            restore_focus,
        } = overrides;

        let mut merged = self.clone();
        if view_model.is_some() {
            merged.view_model = view_model;
        }
        if view.is_some() {
            merged.view = view;
        }
        if model.is_some() {
            merged.model = model;
        }
        if restore_focus.is_some() {
            merged.restore_focus = restore_focus;
        }
        merged.host = host.unwrap_or(merged.host);
        merged.lock = lock.unwrap_or(merged.lock);
        merged.keyboard = keyboard.unwrap_or(merged.keyboard);
        merged.overlay_dismiss = overlay_dismiss.unwrap_or(merged.overlay_dismiss);
        merged.reject_on_cancel = reject_on_cancel.unwrap_or(merged.reject_on_cancel);
        if let Some(class) = overlay_class_name {
            merged.overlay_class_name = class;
        }

        if merged.lock && (merged.overlay_dismiss || !merged.keyboard.is_empty()) {
            tracing::trace!(
                keyboard = ?merged.keyboard,
                overlay_dismiss = merged.overlay_dismiss,
                "locked dialog: dismissal gestures disabled"
            );
            merged.keyboard = KeyboardDismiss::empty();
            merged.overlay_dismiss = false;
        }
        merged
    }
}

/// Caller-supplied settings; every unset field falls back to the defaults.
#[derive(Clone, Default)]
pub struct DialogSettingsOverrides {
    view_model: Option<String>,
    view: Option<String>,
    model: Option<serde_json::Value>,
    host: Option<NodeId>,
    lock: Option<bool>,
    keyboard: Option<KeyboardDismiss>,
    overlay_dismiss: Option<bool>,
    overlay_class_name: Option<String>,
    reject_on_cancel: Option<bool>,
    restore_focus: Option<RestoreFocus>,
}

impl fmt::Debug for DialogSettingsOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogSettingsOverrides")
            .field("view_model", &self.view_model)
            .field("view", &self.view)
            .field("model", &self.model)
            .field("host", &self.host)
            .field("lock", &self.lock)
            .field("keyboard", &self.keyboard)
            .field("overlay_dismiss", &self.overlay_dismiss)
            .field("overlay_class_name", &self.overlay_class_name)
            .field("reject_on_cancel", &self.reject_on_cancel)
            .field("restore_focus", &self.restore_focus.is_some())
            .finish()
    }
}

impl DialogSettingsOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view_model(mut self, view_model: impl Into<String>) -> Self {
        self.view_model = Some(view_model.into());
        self
    }

    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    pub fn model(mut self, model: serde_json::Value) -> Self {
        self.model = Some(model);
        self
    }

    pub fn host(mut self, host: NodeId) -> Self {
        self.host = Some(host);
        self
    }

    pub fn lock(mut self, lock: bool) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Accepts a [`KeyboardDismiss`] set or a plain `bool`.
    pub fn keyboard(mut self, keyboard: impl Into<KeyboardDismiss>) -> Self {
        self.keyboard = Some(keyboard.into());
        self
    }

    pub fn overlay_dismiss(mut self, dismiss: bool) -> Self {
        self.overlay_dismiss = Some(dismiss);
        self
    }

    pub fn overlay_class_name(mut self, class: impl Into<String>) -> Self {
        self.overlay_class_name = Some(class.into());
        self
    }

    pub fn reject_on_cancel(mut self, reject: bool) -> Self {
        self.reject_on_cancel = Some(reject);
        self
    }

    pub fn restore_focus(mut self, restore: impl Fn(NodeId) + 'static) -> Self {
        self.restore_focus = Some(Rc::new(restore));
        self
    }
}
