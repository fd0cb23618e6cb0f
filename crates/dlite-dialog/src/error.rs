#![forbid(unsafe_code)]

use dlite_core::DomError;

/// Misuse of the dialog API. These indicate wiring mistakes, not user
/// actions; cancellation is reported through the outcome instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    /// `show()` was called before a content controller was assigned.
    #[error("cannot show dialog before composing")]
    NotComposed,
    /// The outcome was already taken from the controller.
    #[error("dialog outcome already taken")]
    OutcomeTaken,
    /// The overlay could not be attached to its host.
    #[error("overlay attach failed: {0}")]
    Dom(#[from] DomError),
}
