#![forbid(unsafe_code)]

//! Composer entry point: resolve settings, build content, show, track.
//!
//! The service owns the process-wide default settings and the
//! [`DialogStack`] for one document. Content construction is delegated to
//! the caller through a `compose` callback, which receives the fresh
//! controller so the content can settle it later.

use std::future::Future;

use dlite_core::Document;

use crate::controller::{ContentController, DialogController};
use crate::error::DialogError;
use crate::outcome::{DialogCancelled, DialogOutcome, DialogResponse};
use crate::settings::{DialogSettings, DialogSettingsOverrides};
use crate::stack::DialogStack;

/// Opens dialogs against one document.
#[derive(Debug)]
pub struct DialogService {
    document: Document,
    defaults: DialogSettings,
    stack: DialogStack,
}

impl DialogService {
    /// Service with the built-in defaults (host is the document body).
    pub fn new(document: &Document) -> Self {
        Self::with_defaults(document, DialogSettings::defaults(document))
    }

    /// Service with caller-supplied defaults.
    pub fn with_defaults(document: &Document, defaults: DialogSettings) -> Self {
        Self {
            document: document.clone(),
            defaults,
            stack: DialogStack::new(document),
        }
    }

    #[inline]
    pub fn defaults(&self) -> &DialogSettings {
        &self.defaults
    }

    /// Replace the defaults used by later dialogs.
    pub fn set_defaults(&mut self, defaults: DialogSettings) {
        self.defaults = defaults;
    }

    #[inline]
    pub fn stack(&self) -> &DialogStack {
        &self.stack
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Create, compose and show a dialog.
    ///
    /// `compose` receives the resolved controller and returns the content
    /// handle. On failure the dialog is never tracked and its outcome
    /// resolves as abandoned once the returned error drops the controller.
    pub fn create<T, F>(
        &self,
        overrides: DialogSettingsOverrides,
        compose: F,
    ) -> Result<DialogController<T>, DialogError>
    where
        T: Default + 'static,
        F: FnOnce(&DialogController<T>) -> Box<dyn ContentController>,
    {
        let settings = self.defaults.resolve(overrides);
        let controller = DialogController::new(&self.document, settings);
        let content = compose(&controller);
        controller.set_content(content);
        controller.show()?;
        self.stack.push(controller.clone());
        tracing::debug!(
            dialog = controller.id().id(),
            depth = self.stack.depth(),
            view_model = controller.settings().view_model.as_deref(),
            "dialog opened"
        );
        Ok(controller)
    }

    /// Create a dialog and return its outcome.
    ///
    /// The outcome rejects with [`DialogCancelled`] on every cancellation,
    /// whatever `reject_on_cancel` says.
    pub fn open<T, F>(
        &self,
        overrides: DialogSettingsOverrides,
        compose: F,
    ) -> Result<DialogOutcome<T>, DialogError>
    where
        T: Default + 'static,
        F: FnOnce(&DialogController<T>) -> Box<dyn ContentController>,
    {
        let controller = self.create(overrides, compose)?;
        controller.take_outcome().ok_or(DialogError::OutcomeTaken)
    }

    /// Like [`open`](Self::open), but with `reject_on_cancel` off a
    /// cancellation resolves as [`DialogResponse::Cancelled`] instead of
    /// rejecting.
    pub fn open_response<T, F>(
        &self,
        overrides: DialogSettingsOverrides,
        compose: F,
    ) -> Result<impl Future<Output = Result<DialogResponse<T>, DialogCancelled>> + use<T, F>, DialogError>
    where
        T: Default + 'static,
        F: FnOnce(&DialogController<T>) -> Box<dyn ContentController>,
    {
        let controller = self.create(overrides, compose)?;
        let reject_on_cancel = controller.settings().reject_on_cancel;
        let outcome = controller.take_outcome().ok_or(DialogError::OutcomeTaken)?;
        Ok(outcome.into_response(reject_on_cancel))
    }
}
