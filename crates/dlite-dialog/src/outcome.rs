#![forbid(unsafe_code)]

//! Single-settlement outcome of a dialog.
//!
//! A [`DialogOutcome`] resolves exactly once: to the value passed to
//! `ok`, or to a [`DialogCancelled`] carrying the cancellation reason.
//! The sending half lives inside the controller's lifecycle state and is
//! consumed on the first settlement, so later attempts have nothing left
//! to send with.
//!
//! # Failure Modes
//!
//! - Controller dropped before settling: the outcome resolves to
//!   `DialogCancelled` with reason [`ABANDONED_REASON`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

/// Reason used by `cancel()` without an explicit reason.
pub const DEFAULT_CANCEL_REASON: &str = "cancelled";

/// Reason reported when a dialog goes away without being settled.
pub const ABANDONED_REASON: &str = "abandoned";

/// A dialog was cancelled. Displays as the bare reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct DialogCancelled {
    reason: String,
}

impl DialogCancelled {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Default for DialogCancelled {
    fn default() -> Self {
        Self::new(DEFAULT_CANCEL_REASON)
    }
}

pub(crate) type Settlement<T> = Result<T, DialogCancelled>;
pub(crate) type Settle<T> = oneshot::Sender<Settlement<T>>;

pub(crate) fn channel<T>() -> (Settle<T>, DialogOutcome<T>) {
    let (tx, rx) = oneshot::channel();
    (tx, DialogOutcome { rx })
}

/// Awaitable outcome of one dialog.
#[must_use = "a dialog outcome does nothing unless awaited"]
#[derive(Debug)]
pub struct DialogOutcome<T> {
    rx: oneshot::Receiver<Settlement<T>>,
}

impl<T> Future for DialogOutcome<T> {
    type Output = Result<T, DialogCancelled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(settlement)) => Poll::Ready(settlement),
            Poll::Ready(Err(oneshot::Canceled)) => {
                Poll::Ready(Err(DialogCancelled::new(ABANDONED_REASON)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Outcome as seen by callers that treat cancellation as a normal branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogResponse<T> {
    Accepted(T),
    Cancelled(String),
}

impl<T> DialogResponse<T> {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// The accepted value, if any.
    pub fn accepted(self) -> Option<T> {
        match self {
            Self::Accepted(value) => Some(value),
            Self::Cancelled(_) => None,
        }
    }
}

impl<T> DialogOutcome<T> {
    /// Wait for the outcome and apply the `reject_on_cancel` convention.
    ///
    /// With `reject_on_cancel` off a cancellation arrives as
    /// `Ok(DialogResponse::Cancelled(reason))`; with it on it stays an `Err`.
    pub async fn into_response(
        self,
        reject_on_cancel: bool,
    ) -> Result<DialogResponse<T>, DialogCancelled> {
        match self.await {
            Ok(value) => Ok(DialogResponse::Accepted(value)),
            Err(cancelled) if reject_on_cancel => Err(cancelled),
            Err(cancelled) => Ok(DialogResponse::Cancelled(cancelled.reason)),
        }
    }
}
