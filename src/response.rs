use std::cell::Cell;
use std::rc::Rc;

use actix_web::http::StatusCode;

/// Captures the final status code of a response.
///
/// The recorder keeps the *first* status it is handed; later writes to an
/// already-finalized status are a caller error in the underlying HTTP
/// semantics and are ignored here. When nothing was recorded, for example
/// when downstream handling was cancelled before producing a response,
/// [`final_status`](StatusRecorder::final_status) reports `200 OK`, the
/// value the underlying sink starts from.
///
/// Clones share the captured value.
#[derive(Clone, Debug, Default)]
pub struct StatusRecorder {
    status: Rc<Cell<Option<StatusCode>>>,
}

impl StatusRecorder {
    /// Creates a recorder with no status captured yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the status unless one was already captured.
    pub fn record(&self, status: StatusCode) {
        if self.status.get().is_none() {
            self.status.set(Some(status));
        }
    }

    /// The captured status, or `200 OK` when none was recorded.
    pub fn final_status(&self) -> StatusCode {
        self.status.get().unwrap_or(StatusCode::OK)
    }
}
