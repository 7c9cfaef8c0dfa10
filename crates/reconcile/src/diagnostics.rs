//! Structured diagnostics for the orchestration tool.

use std::{error::Error as _, fmt};

use crate::error::{FailureOrigin, ReconcileError};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation failed.
    Error,
    /// The operation succeeded but something deserves attention.
    Warning,
}

/// One problem report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the problem is.
    pub severity: Severity,
    /// Short, class-level description.
    pub summary: String,
    /// Full description, including the underlying cause chain.
    pub detail: String,
    /// Declared attribute the problem concerns, if any.
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Creates a warning diagnostic.
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Points the diagnostic at an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

fn detail_with_causes(err: &ReconcileError) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !detail.contains(&cause_text) {
            detail.push_str(": ");
            detail.push_str(&cause_text);
        }
        source = cause.source();
    }
    detail
}

impl From<&ReconcileError> for Diagnostic {
    fn from(err: &ReconcileError) -> Self {
        let summary = match err {
            ReconcileError::ClientCancelled { .. } => "Operation cancelled by client",
            ReconcileError::DeadlineExceeded { .. } => "Operation deadline exceeded",
            ReconcileError::InvalidInput { .. } => "Invalid attribute value",
            ReconcileError::TransactionConflict { .. } => "Resource already exists",
            ReconcileError::ClusterUnreachable { origin: FailureOrigin::Endpoint, .. } => {
                "Bad cluster endpoints, which are not reachable etcd servers"
            },
            ReconcileError::ClusterUnreachable { origin: FailureOrigin::Store, .. } => {
                "Store rejected the request"
            },
            ReconcileError::NotFound { .. } => "Resource not found",
        };

        let diagnostic = Self::error(summary, detail_with_causes(err));
        match err.attribute() {
            Some(attribute) => diagnostic.with_attribute(attribute),
            None => diagnostic,
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns `true` if there are no diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the diagnostics in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl From<ReconcileError> for Diagnostics {
    fn from(err: ReconcileError) -> Self {
        Diagnostic::from(&err).into()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", diagnostic.summary, diagnostic.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

#[cfg(test)]
mod tests {
    use etcd_provider_store::StoreError;

    use super::*;
    use crate::error::{Operation, ResourceKind};

    #[test]
    fn test_invalid_input_points_at_attribute() {
        let err = ReconcileError::invalid_input("password", "too short");
        let diagnostic = Diagnostic::from(&err);
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.attribute.as_deref(), Some("password"));
    }

    #[test]
    fn test_cluster_failures_have_distinct_summaries() {
        let endpoint = ReconcileError::from_store(
            StoreError::connection_with_source(
                "failed to connect",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ),
            Operation::Create,
            ResourceKind::KeyValue,
            "k",
        );
        let store = ReconcileError::from_store(
            StoreError::rejected("etcdserver: permission denied"),
            Operation::Create,
            ResourceKind::KeyValue,
            "k",
        );

        let endpoint = Diagnostic::from(&endpoint);
        let store = Diagnostic::from(&store);
        assert_ne!(endpoint.summary, store.summary);
        assert!(endpoint.summary.starts_with("Bad cluster endpoints"));
        // The io error at the bottom of the chain is kept
        assert!(endpoint.detail.contains("connection refused"));
        assert!(store.detail.contains("permission denied"));
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let diagnostics = Diagnostics::from(Diagnostic::warning("Resource already absent", "k"));
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_display_joins_diagnostics() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::error("A", "first"));
        diagnostics.push(Diagnostic::error("B", "second"));
        assert_eq!(diagnostics.to_string(), "A: first; B: second");
    }
}
