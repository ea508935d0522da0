//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use flyout::document::{Document, NodeId};
use flyout::geometry::Rect;
use flyout::{SurfaceConfig, SurfaceHandle, SurfaceManager};

pub const VIEWPORT: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 800.0,
    height: 600.0,
};

/// Document with a `view` container holding one focusable trigger button
pub struct Fixture {
    pub manager: SurfaceManager,
    pub view: NodeId,
    pub trigger: NodeId,
}

/// Fixture with the trigger at `rect`
pub fn fixture_with_trigger(rect: Rect) -> Fixture {
    let mut doc = Document::new(VIEWPORT);
    let root = doc.root().unwrap();
    let view = doc.append_element(root, "view").unwrap();
    let trigger = doc.append_element(view, "button").unwrap();
    doc.set_focusable(trigger, true);
    doc.set_rect(trigger, rect);
    Fixture {
        manager: SurfaceManager::new(doc),
        view,
        trigger,
    }
}

/// Fixture with a 40x40 trigger at (100, 100)
pub fn fixture() -> Fixture {
    fixture_with_trigger(Rect::new(100.0, 100.0, 40.0, 40.0))
}

/// Add another focusable button under the root
pub fn add_button(manager: &mut SurfaceManager, rect: Rect) -> NodeId {
    let doc = manager.document_mut();
    let root = doc.root().unwrap();
    let button = doc.append_element(root, "button").unwrap();
    doc.set_focusable(button, true);
    doc.set_rect(button, rect);
    button
}

/// Add a placeholder container under the root and register it
pub fn add_placeholder(manager: &mut SurfaceManager) -> NodeId {
    let doc = manager.document_mut();
    let root = doc.root().unwrap();
    let slot = doc.append_element(root, "placeholder").unwrap();
    manager.register_placeholder(slot);
    slot
}

/// Open a surface and run the scheduler until it is open
pub fn open_now(manager: &mut SurfaceManager, trigger: NodeId, config: SurfaceConfig) -> SurfaceHandle {
    let handle = manager.open(trigger, config).unwrap();
    manager.run_until_idle();
    handle
}
