use parking_lot::Mutex;

use crate::error::BoxError;

/// Holds at most one failure from the worker thread.
///
/// The first [`set`](Self::set) wins; later ones are dropped so the reported
/// cause is the one that stopped the worker. [`take`](Self::take) empties the
/// slot, which is what makes a failure reportable only once.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    cause: Mutex<Option<BoxError>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `cause` unless a failure is already waiting. Returns whether it
    /// was stored.
    pub fn set(&self, cause: BoxError) -> bool {
        let mut slot = self.cause.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(cause);
        true
    }

    pub fn take(&self) -> Option<BoxError> {
        self.cause.lock().take()
    }

    pub fn is_set(&self) -> bool {
        self.cause.lock().is_some()
    }

    pub fn clear(&self) {
        self.cause.lock().take();
    }
}
