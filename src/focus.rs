//! Focus capture and restoration around a surface's lifetime
//!
//! The element focused when a surface opens is remembered in a `FocusToken`
//! owned by that surface. On close the token is handed back here, and focus
//! returns to it unless the surface's own content still holds focus.

use crate::document::{Document, NodeId};

/// Snapshot of the active element at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusToken {
    previous: Option<NodeId>,
}

impl FocusToken {
    /// The element that was focused when the token was taken
    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }
}

/// What happened to focus when a surface closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Focus went back to the captured element
    Restored(NodeId),
    /// A focusable element inside the surface held focus; nothing was moved
    Retained,
    /// Nothing was captured, or the captured element can no longer take focus
    Skipped,
}

/// Stateless focus helpers
pub struct FocusGuard;

impl FocusGuard {
    /// Remember whatever is focused right now
    ///
    /// Must run before the new surface moves focus into itself, otherwise the
    /// surface ends up restoring focus to its own content.
    pub fn capture(doc: &Document) -> FocusToken {
        FocusToken {
            previous: doc.active_element(),
        }
    }

    /// Put focus back on the captured element
    ///
    /// Returns false, without touching focus, when the element was removed,
    /// detached or made unfocusable in the meantime.
    pub fn restore(doc: &mut Document, token: &FocusToken) -> bool {
        let Some(previous) = token.previous else {
            return false;
        };
        let restored = doc.focus(previous);
        if !restored {
            tracing::debug!(?previous, "focus target no longer focusable, leaving focus alone");
        }
        restored
    }

    /// Whether a focusable descendant of `surface_root` currently holds focus
    ///
    /// The root itself does not count: a surface that only ever focused its
    /// own container never moved focus anywhere meaningful.
    pub fn retained_within(doc: &Document, surface_root: NodeId) -> bool {
        doc.active_element().is_some_and(|active| {
            active != surface_root
                && doc.contains(surface_root, active)
                && doc.get(active).is_some_and(|n| n.focusable)
        })
    }

    /// Apply the close-time policy
    ///
    /// `retained` must be computed with `retained_within` before the surface's
    /// nodes are destroyed.
    pub fn settle(doc: &mut Document, token: &FocusToken, retained: bool) -> FocusOutcome {
        if retained {
            return FocusOutcome::Retained;
        }
        match token.previous {
            Some(previous) if Self::restore(doc, token) => FocusOutcome::Restored(previous),
            _ => FocusOutcome::Skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn doc_with_button() -> (Document, NodeId) {
        let mut doc = Document::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        let root = doc.root().unwrap();
        let button = doc.append_element(root, "button").unwrap();
        doc.set_focusable(button, true);
        (doc, button)
    }

    #[test]
    fn test_capture_and_restore() {
        let (mut doc, button) = doc_with_button();
        doc.focus(button);
        let token = FocusGuard::capture(&doc);
        doc.blur();

        assert!(FocusGuard::restore(&mut doc, &token));
        assert_eq!(doc.active_element(), Some(button));
    }

    #[test]
    fn test_restore_detached_is_noop() {
        let (mut doc, button) = doc_with_button();
        doc.focus(button);
        let token = FocusGuard::capture(&doc);
        doc.remove(button);

        assert!(!FocusGuard::restore(&mut doc, &token));
        assert_eq!(doc.active_element(), None);
    }

    #[test]
    fn test_restore_empty_token() {
        let (mut doc, _) = doc_with_button();
        let token = FocusGuard::capture(&doc);
        assert_eq!(token.previous(), None);
        assert_eq!(
            FocusGuard::settle(&mut doc, &token, false),
            FocusOutcome::Skipped
        );
    }

    #[test]
    fn test_retained_within_ignores_root() {
        let (mut doc, _) = doc_with_button();
        let root = doc.root().unwrap();
        let surface = doc.append_element(root, "surface").unwrap();
        doc.set_focusable(surface, true);
        let option = doc.append_element(surface, "button").unwrap();
        doc.set_focusable(option, true);

        doc.focus(surface);
        assert!(!FocusGuard::retained_within(&doc, surface));

        doc.focus(option);
        assert!(FocusGuard::retained_within(&doc, surface));
    }

    #[test]
    fn test_settle_retained_keeps_focus() {
        let (mut doc, button) = doc_with_button();
        doc.focus(button);
        let token = FocusGuard::capture(&doc);
        doc.blur();

        assert_eq!(
            FocusGuard::settle(&mut doc, &token, true),
            FocusOutcome::Retained
        );
        assert_eq!(doc.active_element(), None);
    }
}
