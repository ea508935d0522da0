//! Surface configuration, handles and close events

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::document::{Document, NodeId};
use crate::geometry::Size;
use crate::positioning::{EdgeAdjust, Side};

/// Identifies one surface for the lifetime of a `SurfaceManager`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SurfaceId(pub u64);

/// Opaque handle returned by `open`
///
/// Handles stay valid after close; operations on a closed surface are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub(crate) SurfaceId);

impl SurfaceHandle {
    pub fn id(&self) -> SurfaceId {
        self.0
    }
}

/// Lifecycle of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Created,
    Mounted,
    Positioned,
    Open,
    Closing,
    Closed,
}

impl LifecycleState {
    /// States in which the surface is tracked by the registry
    pub fn is_live(self) -> bool {
        matches!(
            self,
            LifecycleState::Mounted | LifecycleState::Positioned | LifecycleState::Open
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Mounted => "mounted",
            LifecycleState::Positioned => "positioned",
            LifecycleState::Open => "open",
            LifecycleState::Closing => "closing",
            LifecycleState::Closed => "closed",
        }
    }
}

/// Why a surface closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseReason {
    /// Something inside the surface signalled completion
    Interaction,
    /// `close` or `close_all` was called
    Programmatic,
    /// A click landed outside the surface
    OutsideClick,
}

/// Delivered to close listeners once the surface is fully torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseEvent {
    pub surface: SurfaceHandle,
    pub reason: CloseReason,
    /// Node that caused the close, for click-driven closes
    pub target: Option<NodeId>,
}

/// Broad surface behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Anchored pane next to the trigger
    #[default]
    Popover,
    /// Anchored menu, edge-aligned with the trigger
    OverflowMenu,
    /// Centered dialog on a full-viewport backdrop
    Modal,
}

impl SurfaceKind {
    /// Tag used for the surface's root node
    pub fn tag(self) -> &'static str {
        match self {
            SurfaceKind::Popover => "popover",
            SurfaceKind::OverflowMenu => "menu",
            SurfaceKind::Modal => "modal",
        }
    }

    /// Accessible role of the root node
    pub fn role(self) -> &'static str {
        match self {
            SurfaceKind::OverflowMenu => "menu",
            SurfaceKind::Popover | SurfaceKind::Modal => "dialog",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Danger,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Danger => "danger",
        }
    }
}

/// Where focus goes when a surface opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialFocus {
    /// The surface's root node
    #[default]
    Root,
    /// The first focusable descendant, falling back to the root
    FirstFocusable,
}

/// Context handed to content while it renders
///
/// Content keeps the handle to close its own surface later, e.g. from a menu
/// option's action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceContext {
    pub surface: SurfaceHandle,
    /// Configured text advance width (`SurfaceDefaults::char_width`)
    pub char_width: f64,
}

/// Content that builds its own nodes
pub trait Render {
    /// Build nodes under `container` and return the laid-out content size
    fn render(&self, doc: &mut Document, container: NodeId, cx: &SurfaceContext) -> Size;
}

impl<F> Render for F
where
    F: Fn(&mut Document, NodeId, &SurfaceContext) -> Size,
{
    fn render(&self, doc: &mut Document, container: NodeId, cx: &SurfaceContext) -> Size {
        self(doc, container, cx)
    }
}

/// What a surface shows
#[derive(Clone)]
pub enum Content {
    /// Plain text, measured with the configured text metrics
    Text(String),
    Renderable(Rc<dyn Render>),
}

impl Content {
    pub fn renderable(render: impl Render + 'static) -> Self {
        Content::Renderable(Rc::new(render))
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Content::Renderable(_) => f.write_str("Renderable(..)"),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

/// Immutable description of a surface to open
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    pub kind: SurfaceKind,
    pub content: Content,
    /// Preferred side of the trigger
    pub placement: Side,
    /// Swap to the opposite side when the preferred one lacks room
    pub allow_flip: bool,
    /// Mount next to the trigger instead of out of flow
    pub inline: bool,
    /// Distance from the trigger along the main axis
    pub gap: f64,
    pub theme: Theme,
    /// Accessible label of the surface
    pub menu_label: Option<String>,
    pub initial_focus: InitialFocus,
    /// Reuse a live surface of the same kind for the same trigger
    pub single_instance: bool,
    /// Any click inside the surface closes it
    pub close_on_inner_click: bool,
    /// Edge-aligned kinds line up with the trigger's end edge instead of its start
    pub align_end: bool,
    /// Caller metadata, copied onto the root node as `data-*` attributes
    pub metadata: BTreeMap<String, String>,
    edges: HashMap<Side, EdgeAdjust>,
}

impl SurfaceConfig {
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            kind: SurfaceKind::Popover,
            content: content.into(),
            placement: Side::Bottom,
            allow_flip: false,
            inline: false,
            gap: 0.0,
            theme: Theme::Default,
            menu_label: None,
            initial_focus: InitialFocus::Root,
            single_instance: false,
            close_on_inner_click: false,
            align_end: false,
            metadata: BTreeMap::new(),
            edges: HashMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: SurfaceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_placement(mut self, placement: Side) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_flip(mut self, allow_flip: bool) -> Self {
        self.allow_flip = allow_flip;
        self
    }

    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_menu_label(mut self, label: impl Into<String>) -> Self {
        self.menu_label = Some(label.into());
        self
    }

    pub fn with_initial_focus(mut self, initial_focus: InitialFocus) -> Self {
        self.initial_focus = initial_focus;
        self
    }

    pub fn single_instance(mut self, single_instance: bool) -> Self {
        self.single_instance = single_instance;
        self
    }

    pub fn close_on_inner_click(mut self, close: bool) -> Self {
        self.close_on_inner_click = close;
        self
    }

    pub fn align_end(mut self, align_end: bool) -> Self {
        self.align_end = align_end;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the default placement rule for one side
    pub fn with_edge(mut self, side: Side, adjust: EdgeAdjust) -> Self {
        self.edges.insert(side, adjust);
        self
    }

    pub fn edge(&self, side: Side) -> Option<&EdgeAdjust> {
        self.edges.get(&side)
    }
}
