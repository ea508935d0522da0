//! Surface lifecycle
//!
//! `SurfaceManager` owns the document, the registry, the mount resolver and
//! the scheduler, and drives every surface through
//!
//! ```text
//! created -> mounted -> positioned -> open -> closing -> closed
//! ```
//!
//! Opening resolves a mount point, captures focus, builds and attaches the
//! surface's nodes and registers it; positioning happens on the next tick,
//! once the surface has a laid-out size. Closing deregisters, destroys the
//! nodes, settles focus and finally notifies close listeners.
//!
//! The manager is meant to live at the host's root scope, one per document.

use std::collections::HashMap;

use crate::config::SurfaceDefaults;
use crate::document::{Document, NodeId, PositionStyle};
use crate::error::SurfaceError;
use crate::focus::{FocusGuard, FocusOutcome, FocusToken};
use crate::geometry::{Point, Rect, Size};
use crate::mount::{Attachment, MountHost, MountPoint, MountResolver, MountStrategy, Placeholder};
use crate::positioning::{
    compute_placement, containing_block_offset, EdgeContext, Placement, PlacementRequest, Side,
};
use crate::registry::SurfaceRegistry;
use crate::scheduler::{Scheduler, Task};
use crate::surface::{
    CloseEvent, CloseReason, Content, InitialFocus, LifecycleState, SurfaceConfig,
    SurfaceContext, SurfaceHandle, SurfaceId, SurfaceKind,
};

/// Nodes carrying this attribute close their surface when clicked
pub const ATTR_DISMISS: &str = "data-dismiss";
/// Resolved side, set on the positioned node
pub const ATTR_PLACEMENT: &str = "data-placement";
/// Present while transient feedback is showing
pub const ATTR_FEEDBACK: &str = "data-feedback";
pub const ATTR_ROLE: &str = "role";
pub const ATTR_LABEL: &str = "aria-label";
pub const ATTR_THEME: &str = "data-theme";

type CloseListener = Box<dyn FnMut(&mut SurfaceManager, &CloseEvent)>;

/// Token returned by `subscribe`, used to unsubscribe early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    surface: SurfaceId,
    listener: u64,
}

/// Runtime record of one live surface
struct Surface {
    id: SurfaceId,
    trigger: NodeId,
    /// Outermost node: the backdrop for modals, the pane otherwise
    root: NodeId,
    /// Node that is positioned and holds the content
    pane: NodeId,
    config: SurfaceConfig,
    mount: MountPoint,
    /// Waiting for the deferred move under the document root
    staged: bool,
    state: LifecycleState,
    focus: FocusToken,
    placement: Option<Placement>,
    feedback: Option<String>,
    feedback_generation: u64,
    listeners: Vec<(u64, CloseListener)>,
}

pub struct SurfaceManager {
    doc: Document,
    registry: SurfaceRegistry,
    mounts: MountResolver,
    scheduler: Scheduler,
    defaults: SurfaceDefaults,
    surfaces: HashMap<SurfaceId, Surface>,
    next_surface: u64,
    next_listener: u64,
}

impl SurfaceManager {
    pub fn new(doc: Document) -> Self {
        Self::with_defaults(doc, SurfaceDefaults::default())
    }

    pub fn with_defaults(doc: Document, defaults: SurfaceDefaults) -> Self {
        Self {
            doc,
            registry: SurfaceRegistry::new(),
            mounts: MountResolver::new(),
            scheduler: Scheduler::new(),
            defaults,
            surfaces: HashMap::new(),
            next_surface: 1,
            next_listener: 1,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn defaults(&self) -> &SurfaceDefaults {
        &self.defaults
    }

    /// Current state; unknown and closed handles report `Closed`
    pub fn state(&self, handle: SurfaceHandle) -> LifecycleState {
        self.surfaces
            .get(&handle.0)
            .map(|s| s.state)
            .unwrap_or(LifecycleState::Closed)
    }

    pub fn is_open(&self, handle: SurfaceHandle) -> bool {
        self.state(handle) == LifecycleState::Open
    }

    /// Last applied placement, relative to the surface's containing block
    pub fn placement(&self, handle: SurfaceHandle) -> Option<Placement> {
        self.surfaces.get(&handle.0).and_then(|s| s.placement)
    }

    /// Outermost node of the surface
    pub fn root(&self, handle: SurfaceHandle) -> Option<NodeId> {
        self.surfaces.get(&handle.0).map(|s| s.root)
    }

    /// Positioned node holding the content (differs from `root` for modals)
    pub fn pane(&self, handle: SurfaceHandle) -> Option<NodeId> {
        self.surfaces.get(&handle.0).map(|s| s.pane)
    }

    pub fn trigger(&self, handle: SurfaceHandle) -> Option<NodeId> {
        self.surfaces.get(&handle.0).map(|s| s.trigger)
    }

    pub fn config(&self, handle: SurfaceHandle) -> Option<&SurfaceConfig> {
        self.surfaces.get(&handle.0).map(|s| &s.config)
    }

    pub fn mount_strategy(&self, handle: SurfaceHandle) -> Option<MountStrategy> {
        self.surfaces.get(&handle.0).map(|s| s.mount.strategy())
    }

    pub fn feedback(&self, handle: SurfaceHandle) -> Option<&str> {
        self.surfaces
            .get(&handle.0)
            .and_then(|s| s.feedback.as_deref())
    }

    /// Every surface not yet closed, oldest first
    pub fn live_surfaces(&self) -> Vec<SurfaceHandle> {
        self.live_ids().into_iter().map(SurfaceHandle).collect()
    }

    fn live_ids(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self.surfaces.keys().copied().collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // Mount points
    // ========================================================================

    /// Register `container` as the placeholder for out-of-flow surfaces
    pub fn register_placeholder(&mut self, container: NodeId) {
        self.set_mount_host(Box::new(Placeholder::new(container)));
    }

    pub fn set_mount_host(&mut self, host: Box<dyn MountHost>) {
        tracing::debug!("mount host registered");
        self.mounts.set_host(host);
    }

    pub fn clear_mount_host(&mut self) {
        if self.mounts.clear_host().is_some() {
            tracing::debug!("mount host cleared");
        }
    }

    pub fn has_placeholder(&self) -> bool {
        self.mounts.has_placeholder()
    }

    // ========================================================================
    // Open
    // ========================================================================

    /// Open a surface anchored to `trigger`
    pub fn open(
        &mut self,
        trigger: NodeId,
        config: SurfaceConfig,
    ) -> Result<SurfaceHandle, SurfaceError> {
        self.open_with(trigger, config, None)
    }

    /// Open a surface, optionally forcing a mount strategy
    pub fn open_with(
        &mut self,
        trigger: NodeId,
        config: SurfaceConfig,
        strategy: Option<MountStrategy>,
    ) -> Result<SurfaceHandle, SurfaceError> {
        if !self.doc.exists(trigger) {
            return Err(SurfaceError::UnknownTrigger(trigger));
        }

        if config.single_instance {
            if let Some(existing) = self.find_instance(trigger, config.kind) {
                tracing::debug!(surface = ?existing, ?trigger, "surface already open, reusing");
                return Ok(SurfaceHandle(existing));
            }
        }

        let point = self
            .mounts
            .resolve(&self.doc, trigger, config.inline, strategy)
            .inspect_err(|e| tracing::warn!(?trigger, "cannot open surface: {}", e))?;

        // Nothing of the new surface exists yet, so this cannot catch its own nodes
        let focus = FocusGuard::capture(&self.doc);

        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        let handle = SurfaceHandle(id);

        let (root, pane) = self.build(handle, &config);

        let attachment = match self.mounts.attach(&mut self.doc, point, root) {
            Ok(attachment) => attachment,
            Err(e) => {
                self.doc.remove(root);
                tracing::warn!(surface = ?id, "mount failed: {}", e);
                return Err(e);
            }
        };

        let mut surface = Surface {
            id,
            trigger,
            root,
            pane,
            config,
            mount: point,
            staged: attachment == Attachment::Deferred,
            state: LifecycleState::Created,
            focus,
            placement: None,
            feedback: None,
            feedback_generation: 0,
            listeners: Vec::new(),
        };
        transition(&mut surface, LifecycleState::Mounted);
        self.surfaces.insert(id, surface);
        self.registry.register(id);

        match attachment {
            Attachment::Immediate => self.scheduler.schedule_tick(Task::Position(id)),
            Attachment::Deferred => self.scheduler.schedule_tick(Task::FinishMount(id)),
        }

        tracing::debug!(
            surface = ?id,
            ?trigger,
            mount = ?point.strategy(),
            live = self.registry.len(),
            "surface opened"
        );
        Ok(handle)
    }

    fn find_instance(&self, trigger: NodeId, kind: SurfaceKind) -> Option<SurfaceId> {
        self.surfaces
            .values()
            .filter(|s| s.trigger == trigger && s.config.kind == kind && s.state.is_live())
            .map(|s| s.id)
            .min()
    }

    /// Create the surface's nodes, detached and hidden
    fn build(&mut self, handle: SurfaceHandle, config: &SurfaceConfig) -> (NodeId, NodeId) {
        let viewport = self.doc.viewport();
        let doc = &mut self.doc;
        let root = doc.create_element(config.kind.tag());
        doc.set_focusable(root, true);
        doc.set_visible(root, false);
        doc.set_attr(root, ATTR_ROLE, config.kind.role());
        doc.set_attr(root, ATTR_THEME, config.theme.as_str());
        if let Some(label) = &config.menu_label {
            doc.set_attr(root, ATTR_LABEL, label.as_str());
        }
        for (key, value) in &config.metadata {
            doc.set_attr(root, format!("data-{key}"), value.as_str());
        }

        let pane = match config.kind {
            SurfaceKind::Modal => {
                doc.set_position(root, PositionStyle::Fixed);
                doc.set_rect(root, viewport);
                let panel = doc.create_element("panel");
                doc.append_child(root, panel);
                doc.set_position(panel, PositionStyle::Absolute);
                panel
            }
            SurfaceKind::Popover | SurfaceKind::OverflowMenu => {
                doc.set_position(root, PositionStyle::Absolute);
                root
            }
        };

        let cx = SurfaceContext {
            surface: handle,
            char_width: self.defaults.char_width,
        };
        let size = match &config.content {
            Content::Text(text) => {
                let size = self.defaults.measure_text(text);
                let node = self.doc.create_element("text");
                self.doc.append_child(pane, node);
                self.doc.set_text(node, text.as_str());
                self.doc
                    .set_rect(node, Rect::from_origin_size(Point::default(), size));
                size
            }
            Content::Renderable(render) => render.render(&mut self.doc, pane, &cx),
        };
        self.doc
            .set_rect(pane, Rect::from_origin_size(Point::default(), size));

        (root, pane)
    }

    // ========================================================================
    // Close
    // ========================================================================

    /// Close a surface programmatically; closing twice is a no-op
    pub fn close(&mut self, handle: SurfaceHandle) -> bool {
        self.close_with_reason(handle, CloseReason::Programmatic)
    }

    /// Close a surface with an explicit reason, e.g. from content that signals
    /// completion through its `SurfaceContext`
    pub fn close_with_reason(&mut self, handle: SurfaceHandle, reason: CloseReason) -> bool {
        self.close_surface(handle.0, reason, None, true)
    }

    /// Close every registered surface
    ///
    /// Members are snapshotted first. Focus is not restored for any of them:
    /// with many surfaces closing there is no single correct target. A close
    /// listener may open new surfaces during the pass; those stay open and are
    /// not tracked by the registry, which is empty when this returns.
    pub fn close_all(&mut self) -> usize {
        let snapshot = self.registry.snapshot();
        let mut closed = 0;
        for id in snapshot {
            if self.close_surface(id, CloseReason::Programmatic, None, false) {
                closed += 1;
            }
        }
        self.registry.clear();
        tracing::debug!(closed, "closed all surfaces");
        closed
    }

    fn close_surface(
        &mut self,
        id: SurfaceId,
        reason: CloseReason,
        target: Option<NodeId>,
        restore_focus: bool,
    ) -> bool {
        let Some(mut surface) = self.surfaces.remove(&id) else {
            tracing::trace!(surface = ?id, ?reason, "close ignored, surface already closed");
            return false;
        };
        transition(&mut surface, LifecycleState::Closing);

        // Deregister before destroying so a bulk close never sees a dead node
        self.registry.deregister(id);
        let retained = FocusGuard::retained_within(&self.doc, surface.root);
        for nested in self.nested_in(surface.root) {
            self.close_surface(nested, CloseReason::Programmatic, None, false);
        }
        self.doc.remove(surface.root);
        transition(&mut surface, LifecycleState::Closed);

        let outcome = if restore_focus {
            FocusGuard::settle(&mut self.doc, &surface.focus, retained)
        } else {
            FocusOutcome::Skipped
        };
        tracing::debug!(surface = ?id, ?reason, ?outcome, "surface closed");

        let event = CloseEvent {
            surface: SurfaceHandle(id),
            reason,
            target,
        };
        for (_, mut listener) in surface.listeners.drain(..) {
            listener(self, &event);
        }
        true
    }

    /// Live surfaces whose nodes sit inside `node`, oldest first
    fn nested_in(&self, node: NodeId) -> Vec<SurfaceId> {
        self.live_ids()
            .into_iter()
            .filter(|id| {
                self.surfaces
                    .get(id)
                    .is_some_and(|s| self.doc.contains(node, s.root))
            })
            .collect()
    }

    // ========================================================================
    // Close listeners
    // ========================================================================

    /// Call `listener` once when the surface closes
    ///
    /// Returns `None` for surfaces that are already closed. Listeners are
    /// dropped with the surface.
    pub fn subscribe(
        &mut self,
        handle: SurfaceHandle,
        listener: impl FnMut(&mut SurfaceManager, &CloseEvent) + 'static,
    ) -> Option<Subscription> {
        let surface = self.surfaces.get_mut(&handle.0)?;
        let id = self.next_listener;
        self.next_listener += 1;
        surface.listeners.push((id, Box::new(listener)));
        Some(Subscription {
            surface: handle.0,
            listener: id,
        })
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let Some(surface) = self.surfaces.get_mut(&subscription.surface) else {
            return false;
        };
        let before = surface.listeners.len();
        surface
            .listeners
            .retain(|(id, _)| *id != subscription.listener);
        surface.listeners.len() != before
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Route a click to every open surface
    ///
    /// Clicks outside a surface (or on a modal's backdrop) close it with
    /// `OutsideClick`. Clicks inside close it with `Interaction` when the
    /// surface closes on inner clicks or the target sits under a
    /// `data-dismiss` node. The trigger itself is left to its owner, which
    /// usually toggles. Returns the number of surfaces closed.
    pub fn handle_click(&mut self, target: NodeId) -> usize {
        let mut closed = 0;
        for id in self.live_ids() {
            let reason = match self.surfaces.get(&id) {
                Some(surface) if surface.state == LifecycleState::Open => {
                    self.classify_click(surface, target)
                }
                _ => None,
            };
            if let Some(reason) = reason {
                if self.close_surface(id, reason, Some(target), true) {
                    closed += 1;
                }
            }
        }
        closed
    }

    fn classify_click(&self, surface: &Surface, target: NodeId) -> Option<CloseReason> {
        if self.doc.contains(surface.trigger, target) {
            return None;
        }
        let inside = self.doc.contains(surface.root, target);
        let on_backdrop = surface.config.kind == SurfaceKind::Modal && target == surface.root;
        if !inside || on_backdrop {
            return Some(CloseReason::OutsideClick);
        }
        let dismisses = std::iter::once(target)
            .chain(self.doc.ancestors(target))
            .take_while(|node| *node != surface.root)
            .any(|node| self.doc.attr(node, ATTR_DISMISS).is_some());
        if surface.config.close_on_inner_click || dismisses {
            return Some(CloseReason::Interaction);
        }
        None
    }

    /// Close the most recently opened open surface
    pub fn handle_escape(&mut self) -> bool {
        let topmost = self
            .live_ids()
            .into_iter()
            .rev()
            .find(|id| {
                self.surfaces
                    .get(id)
                    .is_some_and(|s| s.state == LifecycleState::Open)
            });
        match topmost {
            Some(id) => self.close_surface(id, CloseReason::Interaction, None, true),
            None => false,
        }
    }

    /// Resize the viewport and reposition every placed surface on the next tick
    pub fn handle_resize(&mut self, viewport: Rect) -> usize {
        self.doc.set_viewport(viewport);
        let mut scheduled = 0;
        for id in self.live_ids() {
            let Some(surface) = self.surfaces.get(&id) else {
                continue;
            };
            if matches!(
                surface.state,
                LifecycleState::Positioned | LifecycleState::Open
            ) {
                if surface.config.kind == SurfaceKind::Modal {
                    self.doc.set_rect(surface.root, viewport);
                }
                self.scheduler.schedule_tick(Task::Position(id));
                scheduled += 1;
            }
        }
        scheduled
    }

    /// Recompute placement on the next tick, e.g. after the trigger moved
    pub fn reposition(&mut self, handle: SurfaceHandle) -> bool {
        match self.surfaces.get(&handle.0) {
            Some(surface) if surface.state.is_live() => {
                self.scheduler.schedule_tick(Task::Position(handle.0));
                true
            }
            _ => false,
        }
    }

    /// Show transient feedback on a surface for the configured timeout
    ///
    /// Newer feedback replaces older; the older timer then expires as a no-op.
    pub fn show_feedback(&mut self, handle: SurfaceHandle, text: impl Into<String>) -> bool {
        let timeout = self.defaults.feedback_timeout();
        let Some(surface) = self.surfaces.get_mut(&handle.0) else {
            return false;
        };
        let text = text.into();
        surface.feedback_generation += 1;
        let generation = surface.feedback_generation;
        self.doc.set_attr(surface.root, ATTR_FEEDBACK, text.as_str());
        surface.feedback = Some(text);
        self.scheduler.schedule_after(
            timeout,
            Task::ClearFeedback {
                surface: handle.0,
                generation,
            },
        );
        true
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Run one scheduler tick; returns the number of tasks run
    pub fn tick(&mut self) -> usize {
        let tasks = self.scheduler.take_tick();
        let count = tasks.len();
        for task in tasks {
            self.run_task(task);
        }
        count
    }

    /// Run ticks until nothing is queued
    pub fn run_until_idle(&mut self) -> usize {
        let mut total = 0;
        while !self.scheduler.is_idle() {
            total += self.tick();
        }
        total
    }

    /// Move the virtual clock forward, then run everything that came due
    pub fn advance(&mut self, delta: std::time::Duration) -> usize {
        self.scheduler.advance(delta);
        self.run_until_idle()
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::FinishMount(id) => self.finish_mount(id),
            Task::Position(id) => self.position(id),
            Task::ClearFeedback {
                surface,
                generation,
            } => self.clear_feedback(surface, generation),
        }
    }

    fn finish_mount(&mut self, id: SurfaceId) {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            tracing::trace!(surface = ?id, "deferred mount superseded by close");
            return;
        };
        if !surface.staged {
            return;
        }
        if !self.doc.exists(surface.root) {
            tracing::debug!(surface = ?id, "staged nodes destroyed before deferred mount");
            self.close_surface(id, CloseReason::Programmatic, None, false);
        } else if MountResolver::finish_deferred(&mut self.doc, surface.root) {
            surface.staged = false;
            self.scheduler.schedule_tick(Task::Position(id));
        } else {
            tracing::warn!(surface = ?id, "document root vanished before deferred mount");
        }
    }

    fn position(&mut self, id: SurfaceId) {
        let Some(surface) = self.surfaces.get(&id) else {
            tracing::trace!(surface = ?id, "positioning superseded by close");
            return;
        };
        if surface.staged || !surface.state.is_live() {
            return;
        }
        if !self.doc.exists(surface.root) {
            tracing::debug!(surface = ?id, "surface nodes destroyed before positioning");
            self.close_surface(id, CloseReason::Programmatic, None, false);
            return;
        }

        let viewport = self.doc.viewport();
        let size = self
            .doc
            .rect(surface.pane)
            .map(|r| r.size())
            .unwrap_or_default();
        let placement = match surface.config.kind {
            SurfaceKind::Modal => centered(viewport, size, surface.config.placement),
            SurfaceKind::Popover | SurfaceKind::OverflowMenu => {
                let trigger = self.doc.rect(surface.trigger).unwrap_or_default();
                let request =
                    PlacementRequest::new(trigger, size, viewport, surface.config.placement)
                        .with_flip(surface.config.allow_flip)
                        .with_gap(surface.config.gap)
                        .with_margin(self.defaults.viewport_margin);
                let placement = compute_placement(&request);
                match surface.config.edge(placement.side) {
                    Some(adjust) => adjust.apply(
                        placement,
                        &EdgeContext {
                            trigger,
                            surface: size,
                            viewport,
                        },
                    ),
                    None => placement,
                }
            }
        };

        let pane = surface.pane;
        let root = surface.root;
        let origin = containing_block_offset(&self.doc, pane);
        let relative = placement.relative_to(origin);
        self.doc.set_offset(pane, relative.origin());
        self.doc
            .set_rect(pane, Rect::from_origin_size(placement.origin(), size));
        self.doc
            .set_attr(pane, ATTR_PLACEMENT, placement.side.as_str());

        let Some(surface) = self.surfaces.get_mut(&id) else {
            return;
        };
        surface.placement = Some(relative);
        tracing::trace!(surface = ?id, ?relative, "surface positioned");

        if surface.state != LifecycleState::Mounted {
            return;
        }
        transition(surface, LifecycleState::Positioned);
        self.doc.set_visible(root, true);
        transition(surface, LifecycleState::Open);

        let target = match surface.config.initial_focus {
            InitialFocus::Root => root,
            InitialFocus::FirstFocusable => {
                self.doc.first_focusable_descendant(root).unwrap_or(root)
            }
        };
        if !self.doc.focus(target) {
            tracing::debug!(surface = ?id, ?target, "initial focus target not focusable");
        }
    }

    fn clear_feedback(&mut self, id: SurfaceId, generation: u64) {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            tracing::trace!(surface = ?id, "feedback timer fired after close");
            return;
        };
        if surface.feedback_generation != generation {
            return;
        }
        surface.feedback = None;
        self.doc.remove_attr(surface.root, ATTR_FEEDBACK);
    }
}

fn transition(surface: &mut Surface, to: LifecycleState) {
    tracing::trace!(surface = ?surface.id, from = surface.state.as_str(), to = to.as_str(), "transition");
    surface.state = to;
}

/// Center a modal pane in the viewport
fn centered(viewport: Rect, size: Size, side: Side) -> Placement {
    Placement {
        top: viewport.y + ((viewport.height - size.height) / 2.0).max(0.0),
        left: viewport.x + ((viewport.width - size.width) / 2.0).max(0.0),
        flipped: false,
        side,
    }
}
