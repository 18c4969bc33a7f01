//! The `Communicator` sink: a minimal interface the host
//! supplies for progress reporting and cooperative cancellation. The
//! core never constructs one — analyses only ever borrow `&dyn
//! Communicator` for the duration of a run.

/// Progress message kinds a long-running analysis may post.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommKind {
    NumSteps,
    CurrentStep,
    NumRecords,
    CurrentRecord,
}

/// Host-supplied sink for progress and cancellation. Implementations
/// must be cheap to poll: `is_cancelled` may be called once per
/// traversal step.
pub trait Communicator: Sync {
    fn post_message(&self, kind: CommKind, value: usize);
    fn is_cancelled(&self) -> bool;
    fn log_warning(&self, message: &str);
    fn log_error(&self, message: &str);
}

/// A `Communicator` that never cancels and discards every message.
/// Used by library tests and by callers that don't care about progress.
pub struct NullCommunicator;

impl Communicator for NullCommunicator {
    fn post_message(&self, _kind: CommKind, _value: usize) {}
    fn is_cancelled(&self) -> bool {
        false
    }
    fn log_warning(&self, _message: &str) {}
    fn log_error(&self, _message: &str) {}
}

/// A `Communicator` backed by an `AtomicBool` the caller can flip from
/// another thread to request cancellation; warnings/errors are buffered
/// for the caller to inspect after the run.
pub struct FlagCommunicator {
    cancelled: std::sync::atomic::AtomicBool,
    warnings: std::sync::Mutex<Vec<String>>,
    errors: std::sync::Mutex<Vec<String>>,
}

impl Default for FlagCommunicator {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagCommunicator {
    pub fn new() -> Self {
        Self {
            cancelled: std::sync::atomic::AtomicBool::new(false),
            warnings: std::sync::Mutex::new(Vec::new()),
            errors: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn cancel(&self) {
        self.cancelled
            .store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Communicator for FlagCommunicator {
    fn post_message(&self, _kind: CommKind, _value: usize) {}

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn log_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn log_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_communicator_starts_uncancelled() {
        let comm = FlagCommunicator::new();
        assert!(!comm.is_cancelled());
        comm.cancel();
        assert!(comm.is_cancelled());
    }

    #[test]
    fn flag_communicator_buffers_warnings() {
        let comm = FlagCommunicator::new();
        comm.log_warning("line lay on a previously-merged cell");
        assert_eq!(comm.warnings().len(), 1);
    }
}
