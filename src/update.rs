//! Message dispatch for `SurfaceManager`
//!
//! All input flows through `update`. In debug builds it is wrapped with a
//! tracing span and a diff of lifecycle states before and after.

use crate::lifecycle::SurfaceManager;
use crate::messages::{Key, Msg};

#[cfg(debug_assertions)]
use crate::tracing::SurfaceSnapshot;
#[cfg(debug_assertions)]
use tracing::{debug, span, Level};

/// Apply one message; returns true when anything changed
#[inline]
pub fn update(manager: &mut SurfaceManager, msg: Msg) -> bool {
    #[cfg(debug_assertions)]
    {
        update_traced(manager, msg)
    }
    #[cfg(not(debug_assertions))]
    {
        update_inner(manager, msg)
    }
}

fn update_inner(manager: &mut SurfaceManager, msg: Msg) -> bool {
    match msg {
        Msg::Click(target) => manager.handle_click(target) > 0,
        Msg::Key(Key::Escape) => manager.handle_escape(),
        Msg::Resize(viewport) => {
            manager.handle_resize(viewport);
            true
        }
        Msg::Tick => manager.tick() > 0,
        Msg::Advance(delta) => manager.advance(delta) > 0,
        Msg::CloseAll => manager.close_all() > 0,
    }
}

#[cfg(debug_assertions)]
fn update_traced(manager: &mut SurfaceManager, msg: Msg) -> bool {
    // Ticks fire constantly while idle
    let is_noisy = matches!(msg, Msg::Tick) && manager.scheduler().is_idle();

    let msg_name = format!("{:?}", msg);
    let _span = if is_noisy {
        None
    } else {
        Some(span!(Level::DEBUG, "update", msg = %msg_name).entered())
    };

    let before = SurfaceSnapshot::capture(manager);
    if !is_noisy {
        debug!(target: "message", msg = %msg_name, "processing");
    }

    let changed = update_inner(manager, msg);

    let after = SurfaceSnapshot::capture(manager);
    if let Some(diff) = before.diff(&after) {
        debug!(target: "surface", %diff, "state changed");
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::geometry::Rect;
    use crate::surface::{LifecycleState, SurfaceConfig};

    #[test]
    fn test_escape_closes_through_update() {
        let mut doc = Document::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        let root = doc.root().unwrap();
        let trigger = doc.append_element(root, "button").unwrap();
        let mut manager = SurfaceManager::new(doc);

        let handle = manager
            .open(trigger, SurfaceConfig::new("Hi").inline(true))
            .unwrap();
        assert!(update(&mut manager, Msg::Tick));
        assert_eq!(manager.state(handle), LifecycleState::Open);

        assert!(update(&mut manager, Msg::Key(Key::Escape)));
        assert_eq!(manager.state(handle), LifecycleState::Closed);
        assert!(!update(&mut manager, Msg::Tick));
    }
}
