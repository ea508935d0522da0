//! Errors surfaced to callers of `SurfaceManager::open`

use thiserror::Error;

use crate::document::NodeId;

/// Why no mount point could be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MountFailure {
    #[error("inline mount requested but the trigger has no parent view")]
    NoInlineView,
    #[error("no placeholder is registered")]
    NoPlaceholder,
    #[error("the placeholder refused the surface")]
    PlaceholderRejected,
    #[error("the document has no root element")]
    NoDocumentRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// Nothing to attach the surface to; the caller decides whether to retry
    #[error("no mount point available: {0}")]
    MountUnavailable(#[from] MountFailure),
    #[error("trigger {0:?} is not part of the document")]
    UnknownTrigger(NodeId),
}
