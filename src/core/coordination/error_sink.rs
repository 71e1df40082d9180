// Diagnostic reporting for failures that are absorbed inside a pipeline.
//
// Nothing a pipeline step does is allowed to escape to the event dispatcher,
// so every caught failure is handed to an ErrorSink instead.

use std::fmt;

/// What went wrong, from the coordination layer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A moderation call on the platform (ban, delete) failed.
    RemoteActionFailure,
    /// The in-channel notice could not be sent.
    NotificationFailure,
    /// The audit record of a moderation action could not be written.
    CaseCreationFailure,
    /// A persisted store (or the settings behind it) could not be reached.
    StoreUnavailable,
    /// The guild lock could not be taken within the configured timeout.
    LockTimeout,
    /// An event handler task panicked.
    HandlerPanicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

impl FailureKind {
    /// Fatal-class failures break auditability or mean a whole event was lost.
    /// Severity only changes how a failure is reported, never control flow.
    pub fn severity(self) -> Severity {
        match self {
            FailureKind::RemoteActionFailure | FailureKind::NotificationFailure => {
                Severity::Recoverable
            }
            FailureKind::CaseCreationFailure
            | FailureKind::StoreUnavailable
            | FailureKind::LockTimeout
            | FailureKind::HandlerPanicked => Severity::Fatal,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::RemoteActionFailure => write!(f, "Remote Action Failure"),
            FailureKind::NotificationFailure => write!(f, "Notification Failure"),
            FailureKind::CaseCreationFailure => write!(f, "Case Creation Failure"),
            FailureKind::StoreUnavailable => write!(f, "Store Unavailable"),
            FailureKind::LockTimeout => write!(f, "Lock Timeout"),
            FailureKind::HandlerPanicked => write!(f, "Handler Panicked"),
        }
    }
}

/// Fire-and-forget diagnostic channel. Implementations must not block.
pub trait ErrorSink: Send + Sync {
    fn report(&self, kind: FailureKind, error: &dyn std::error::Error, context: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_and_availability_failures_are_fatal() {
        assert_eq!(
            FailureKind::CaseCreationFailure.severity(),
            Severity::Fatal
        );
        assert_eq!(FailureKind::StoreUnavailable.severity(), Severity::Fatal);
        assert_eq!(
            FailureKind::RemoteActionFailure.severity(),
            Severity::Recoverable
        );
        assert_eq!(
            FailureKind::NotificationFailure.severity(),
            Severity::Recoverable
        );
    }
}
