// ErrorSink backed by the process-wide tracing subscriber.

use crate::core::coordination::{ErrorSink, FailureKind, Severity};

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl TracingErrorSink {
    pub fn new() -> Self {
        Self
    }
}

impl ErrorSink for TracingErrorSink {
    fn report(&self, kind: FailureKind, error: &dyn std::error::Error, context: &str) {
        match kind.severity() {
            Severity::Fatal => tracing::error!(
                kind = %kind,
                context = context,
                "{}",
                error
            ),
            Severity::Recoverable => tracing::warn!(
                kind = %kind,
                context = context,
                "{}",
                error
            ),
        }
    }
}
