//! Login failure reporting

use std::error::Error as StdError;

/// Receives every terminal login failure
///
/// `message` is safe to show to the caller; `cause` carries the full chain.
pub trait ErrorSink: Send + Sync {
    fn report(&self, status: u16, message: &str, cause: &(dyn StdError + 'static));
}

/// Logs failures with `tracing` at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, status: u16, message: &str, cause: &(dyn StdError + 'static)) {
        tracing::error!(status, error = %cause, "{message}");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Records reported failures for assertions
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        reports: Mutex<Vec<(u16, String)>>,
    }

    impl RecordingSink {
        pub fn reports(&self) -> Vec<(u16, String)> {
            self.reports.lock().clone()
        }
    }

    impl ErrorSink for RecordingSink {
        fn report(&self, status: u16, message: &str, _cause: &(dyn StdError + 'static)) {
            self.reports.lock().push((status, message.to_string()));
        }
    }
}
