#![forbid(unsafe_code)]

//! Modal dialog lifecycle and focus trap for dialog-lite.
//!
//! A dialog is an overlay element attached to a host node, a content
//! controller rendered inside it, and a single-settlement outcome. The
//! pieces:
//!
//! - [`settings`]: defaults, caller overrides, and the lock coupling.
//! - [`controller`]: the per-dialog state machine, overlay dismissal, and
//!   the Tab focus trap.
//! - [`outcome`]: the awaitable accept/cancel result.
//! - [`stack`]: open dialogs in LIFO order with keyboard routing.
//! - [`service`]: composes the above for callers.
//!
//! # Example
//!
//! ```ignore
//! let doc = Document::new();
//! let service = DialogService::new(&doc);
//! let outcome = service.open::<Value, _>(
//!     DialogSettingsOverrides::new().model(json!({ "title": "Delete?" })),
//!     |controller| Box::new(ConfirmContent::new(controller.clone())),
//! )?;
//! match outcome.await {
//!     Ok(value) => { /* accepted */ }
//!     Err(cancelled) => { /* cancelled.reason() */ }
//! }
//! ```

pub mod controller;
pub mod error;
pub mod outcome;
pub mod service;
pub mod settings;
pub mod stack;

pub use controller::{ContentController, DialogController, DialogId, DialogState};
pub use error::DialogError;
pub use outcome::{
    ABANDONED_REASON, DEFAULT_CANCEL_REASON, DialogCancelled, DialogOutcome, DialogResponse,
};
pub use service::DialogService;
pub use settings::{
    DEFAULT_OVERLAY_CLASS, DialogSettings, DialogSettingsOverrides, KeyboardDismiss, RestoreFocus,
};
pub use stack::{DialogStack, StackDialog};
