//! Surface placement relative to a trigger
//!
//! Everything here is pure: given the trigger's rect, the surface's laid-out
//! size and the viewport, compute where the surface goes. Nothing is cached;
//! callers re-run the computation whenever any of the inputs change (first
//! layout, viewport resize, trigger movement).

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::document::{Document, NodeId};
use crate::geometry::{Point, Rect, Size};

/// Side of the trigger a surface is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Top and bottom placements stack the surface vertically
    pub fn is_vertical(self) -> bool {
        matches!(self, Side::Top | Side::Bottom)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Result of one positioning pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub top: f64,
    pub left: f64,
    /// True when the preferred side was swapped for its opposite
    pub flipped: bool,
    /// Side actually used
    pub side: Side,
}

impl Placement {
    /// Shift the placement by the given deltas
    pub fn add_offset(mut self, top: f64, left: f64) -> Self {
        self.top += top;
        self.left += left;
        self
    }

    /// Re-express a viewport-relative placement against a containing block origin
    pub fn relative_to(self, origin: Point) -> Self {
        self.add_offset(-origin.y, -origin.x)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }
}

/// Inputs to `compute_placement`
#[derive(Debug, Clone, Copy)]
pub struct PlacementRequest {
    pub trigger: Rect,
    pub surface: Size,
    pub viewport: Rect,
    pub preferred: Side,
    pub allow_flip: bool,
    /// Distance between trigger and surface along the main axis
    pub gap: f64,
    /// Edge margin the surface should keep from the viewport
    pub margin: f64,
}

impl PlacementRequest {
    pub fn new(trigger: Rect, surface: Size, viewport: Rect, preferred: Side) -> Self {
        Self {
            trigger,
            surface,
            viewport,
            preferred,
            allow_flip: false,
            gap: 0.0,
            margin: 0.0,
        }
    }

    /// Allow swapping to the opposite side (builder pattern)
    pub fn with_flip(mut self, allow_flip: bool) -> Self {
        self.allow_flip = allow_flip;
        self
    }

    /// Set the trigger gap (builder pattern)
    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    /// Set the viewport margin (builder pattern)
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }
}

/// Compute where a surface goes
///
/// The surface abuts the trigger on the preferred side and is centered on it
/// along the cross axis. When flipping is allowed and the preferred side runs
/// past the margin-inset viewport, the opposite side is used if it overflows
/// less. The cross axis is then clamped into the inset viewport and the main
/// axis into the viewport itself, so the result is always usable.
pub fn compute_placement(req: &PlacementRequest) -> Placement {
    let bounds = req.viewport.inset(req.margin);

    let mut side = req.preferred;
    let mut origin = abut(side, req);
    let mut flipped = false;

    if req.allow_flip {
        let overflow = main_axis_overflow(side, origin, req.surface, bounds);
        if overflow > 0.0 {
            let alt_side = side.opposite();
            let alt_origin = abut(alt_side, req);
            if main_axis_overflow(alt_side, alt_origin, req.surface, bounds) < overflow {
                side = alt_side;
                origin = alt_origin;
                flipped = true;
            }
        }
    }

    let (left, top) = if side.is_vertical() {
        (
            clamp_axis(origin.x, req.surface.width, bounds.x, bounds.right()),
            clamp_axis(
                origin.y,
                req.surface.height,
                req.viewport.y,
                req.viewport.bottom(),
            ),
        )
    } else {
        (
            clamp_axis(
                origin.x,
                req.surface.width,
                req.viewport.x,
                req.viewport.right(),
            ),
            clamp_axis(origin.y, req.surface.height, bounds.y, bounds.bottom()),
        )
    };

    Placement {
        top,
        left,
        flipped,
        side,
    }
}

/// Top-left corner that puts the surface against `side` of the trigger
fn abut(side: Side, req: &PlacementRequest) -> Point {
    let t = req.trigger;
    let s = req.surface;
    match side {
        Side::Top => Point::new(t.center_x() - s.width / 2.0, t.y - s.height - req.gap),
        Side::Bottom => Point::new(t.center_x() - s.width / 2.0, t.bottom() + req.gap),
        Side::Left => Point::new(t.x - s.width - req.gap, t.center_y() - s.height / 2.0),
        Side::Right => Point::new(t.right() + req.gap, t.center_y() - s.height / 2.0),
    }
}

/// How far the surface runs past `bounds` on the main axis (<= 0 means it fits)
fn main_axis_overflow(side: Side, origin: Point, size: Size, bounds: Rect) -> f64 {
    match side {
        Side::Top => bounds.y - origin.y,
        Side::Bottom => origin.y + size.height - bounds.bottom(),
        Side::Left => bounds.x - origin.x,
        Side::Right => origin.x + size.width - bounds.right(),
    }
}

fn clamp_axis(value: f64, extent: f64, lo: f64, hi: f64) -> f64 {
    if extent >= hi - lo {
        lo
    } else {
        // min/max rather than clamp: a NaN bound leaves the value alone
        value.min(hi - extent).max(lo)
    }
}

/// Origin of the containing block an absolutely positioned `node` is offset from
///
/// This is the top-left of the nearest ancestor with `relative`, `absolute` or
/// `fixed` position, or the viewport origin when there is none.
pub fn containing_block_offset(doc: &Document, node: NodeId) -> Point {
    doc.closest_positioned(node)
        .and_then(|ancestor| doc.rect(ancestor))
        .map(|rect| rect.origin())
        .unwrap_or_default()
}

/// Pin a surface to the trigger's start edge (or end edge with `align_end`)
///
/// Centering a wide surface over a small trigger leaves the trigger floating
/// in the middle of it. When the trigger is narrower than the surface, shift
/// by half the surface width minus half the trigger width so the edges line up.
pub fn align_to_trigger_edge(
    placement: Placement,
    trigger: Rect,
    surface: Size,
    align_end: bool,
) -> Placement {
    if trigger.width >= surface.width {
        return placement;
    }
    let shift = (surface.width / 2.0).round() - trigger.width / 2.0;
    if align_end {
        placement.add_offset(0.0, -shift)
    } else {
        placement.add_offset(0.0, shift)
    }
}

/// Geometry handed to per-edge adjustment callbacks
#[derive(Debug, Clone, Copy)]
pub struct EdgeContext {
    pub trigger: Rect,
    pub surface: Size,
    pub viewport: Rect,
}

/// Callback replacing the default placement rule for one side
#[derive(Clone)]
pub struct EdgeAdjust(Rc<dyn Fn(Placement, &EdgeContext) -> Placement>);

impl EdgeAdjust {
    pub fn new(f: impl Fn(Placement, &EdgeContext) -> Placement + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn apply(&self, placement: Placement, cx: &EdgeContext) -> Placement {
        (self.0)(placement, cx)
    }
}

impl fmt::Debug for EdgeAdjust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EdgeAdjust(..)")
    }
}
