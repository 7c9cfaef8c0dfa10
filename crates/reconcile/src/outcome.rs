//! Outcomes of the read and delete verbs.

/// Result of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    /// The resource exists.
    Present(T),
    /// The resource is gone and should be dropped from tracked state.
    Absent,
}

impl<T> ReadOutcome<T> {
    /// Returns the observed state, if present.
    pub fn into_present(self) -> Option<T> {
        match self {
            Self::Present(state) => Some(state),
            Self::Absent => None,
        }
    }

    /// Returns `true` if the resource is gone.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Result of a delete. Both variants are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The resource existed and was removed.
    Deleted,
    /// There was nothing to remove.
    AlreadyAbsent,
}
