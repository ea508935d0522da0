//! Input messages routed through `update`
//!
//! The host translates raw platform events into these and hands them to the
//! surface manager one at a time.

use std::time::Duration;

use crate::document::NodeId;
use crate::geometry::Rect;

/// Keys the surface runtime reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Pointer click on a node
    Click(NodeId),
    /// Key press while any surface is open
    Key(Key),
    /// Viewport changed size or origin
    Resize(Rect),
    /// Run one scheduler tick
    Tick,
    /// Move the virtual clock forward
    Advance(Duration),
    /// Close every registered surface
    CloseAll,
}
