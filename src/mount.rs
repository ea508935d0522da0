//! Deciding where a new surface is attached
//!
//! Resolution order, first match wins:
//! 1. inline, next to the trigger in the caller's own view
//! 2. the registered placeholder (`MountHost`)
//! 3. the document root, one scheduler tick later
//!
//! The root fallback stages the surface hidden next to the trigger first and
//! only moves it under the root once its initial layout has settled, so it is
//! never visible at an unpositioned offset.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::{Document, NodeId};
use crate::error::{MountFailure, SurfaceError};

/// Something that can host out-of-flow surfaces
pub trait MountHost {
    /// Whether surfaces can be attached right now
    fn has_mount_point(&self) -> bool;

    /// Attach `node`; returns false if the host cannot take it
    fn attach(&mut self, doc: &mut Document, node: NodeId) -> bool;
}

/// A designated container near the end of the host's tree
#[derive(Debug, Clone, Default)]
pub struct Placeholder {
    container: Option<NodeId>,
}

impl Placeholder {
    pub fn new(container: NodeId) -> Self {
        Self {
            container: Some(container),
        }
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }
}

impl MountHost for Placeholder {
    fn has_mount_point(&self) -> bool {
        self.container.is_some()
    }

    fn attach(&mut self, doc: &mut Document, node: NodeId) -> bool {
        match self.container {
            Some(container) => doc.append_child(container, node),
            None => false,
        }
    }
}

/// Strategy a caller can force instead of the default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountStrategy {
    Inline,
    Placeholder,
    Root,
}

/// A resolved attachment point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPoint {
    /// Next sibling of the given node
    Inline { after: NodeId },
    /// Inside the registered placeholder
    Placeholder,
    /// Under the document root, deferred; `staging` is where the surface
    /// waits (hidden) until the move
    Root { staging: Option<NodeId> },
}

impl MountPoint {
    pub fn strategy(&self) -> MountStrategy {
        match self {
            MountPoint::Inline { .. } => MountStrategy::Inline,
            MountPoint::Placeholder => MountStrategy::Placeholder,
            MountPoint::Root { .. } => MountStrategy::Root,
        }
    }
}

/// Outcome of attaching a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// The surface is in its final place
    Immediate,
    /// The surface is staged; call `finish_deferred` on the next tick
    Deferred,
}

#[derive(Default)]
pub struct MountResolver {
    host: Option<Box<dyn MountHost>>,
}

impl fmt::Debug for MountResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountResolver")
            .field("has_host", &self.host.is_some())
            .finish()
    }
}

impl MountResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the placeholder host, replacing any previous one
    pub fn set_host(&mut self, host: Box<dyn MountHost>) {
        self.host = Some(host);
    }

    /// Unregister the placeholder host
    pub fn clear_host(&mut self) -> Option<Box<dyn MountHost>> {
        self.host.take()
    }

    pub fn has_placeholder(&self) -> bool {
        self.host.as_ref().is_some_and(|h| h.has_mount_point())
    }

    /// Pick a mount point for a surface opened from `trigger`
    ///
    /// With a `strategy` override only that strategy is tried.
    pub fn resolve(
        &self,
        doc: &Document,
        trigger: NodeId,
        inline: bool,
        strategy: Option<MountStrategy>,
    ) -> Result<MountPoint, SurfaceError> {
        let point = match strategy {
            Some(MountStrategy::Inline) => self.inline(doc, trigger),
            Some(MountStrategy::Placeholder) => self.placeholder(),
            Some(MountStrategy::Root) => self.root(doc, trigger),
            None if inline => self.inline(doc, trigger),
            None if self.has_placeholder() => self.placeholder(),
            None => self.root(doc, trigger),
        }?;
        Ok(point)
    }

    fn inline(&self, doc: &Document, trigger: NodeId) -> Result<MountPoint, MountFailure> {
        match doc.parent(trigger) {
            Some(_) => Ok(MountPoint::Inline { after: trigger }),
            None => Err(MountFailure::NoInlineView),
        }
    }

    fn placeholder(&self) -> Result<MountPoint, MountFailure> {
        if self.has_placeholder() {
            Ok(MountPoint::Placeholder)
        } else {
            Err(MountFailure::NoPlaceholder)
        }
    }

    fn root(&self, doc: &Document, trigger: NodeId) -> Result<MountPoint, MountFailure> {
        if doc.root().is_none() {
            return Err(MountFailure::NoDocumentRoot);
        }
        Ok(MountPoint::Root {
            staging: doc.parent(trigger).map(|_| trigger),
        })
    }

    /// Attach `node` at a previously resolved point
    pub fn attach(
        &mut self,
        doc: &mut Document,
        point: MountPoint,
        node: NodeId,
    ) -> Result<Attachment, SurfaceError> {
        match point {
            MountPoint::Inline { after } => {
                if doc.insert_after(after, node) {
                    Ok(Attachment::Immediate)
                } else {
                    Err(MountFailure::NoInlineView.into())
                }
            }
            MountPoint::Placeholder => {
                let attached = self.host.as_mut().is_some_and(|h| h.attach(doc, node));
                if attached {
                    Ok(Attachment::Immediate)
                } else {
                    Err(MountFailure::PlaceholderRejected.into())
                }
            }
            MountPoint::Root { staging } => {
                if let Some(anchor) = staging {
                    doc.insert_after(anchor, node);
                }
                doc.set_visible(node, false);
                Ok(Attachment::Deferred)
            }
        }
    }

    /// Move a staged surface under the document root
    pub fn finish_deferred(doc: &mut Document, node: NodeId) -> bool {
        match doc.root() {
            Some(root) => doc.append_child(root, node),
            None => false,
        }
    }
}
