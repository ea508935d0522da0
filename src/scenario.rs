//! YAML scenarios replayed against a headless document
//!
//! A scenario declares a viewport, a node tree and a list of steps. Nodes are
//! referred to by the `name` given in the tree. Surfaces opened with `as: x`
//! are referred to as `@x`; `@x#N` is the N-th focusable node inside it
//! (zero-based, document order).
//!
//! ```yaml
//! viewport: { x: 0, y: 0, width: 800, height: 600 }
//! nodes:
//!   - name: more
//!     tag: button
//!     focusable: true
//!     rect: { x: 100, y: 500, width: 40, height: 40 }
//! steps:
//!   - focus: more
//!   - open: { trigger: more, as: menu, kind: overflow_menu, items: [Rename, Delete] }
//!   - run
//!   - click: "@menu#1"
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::SurfaceDefaults;
use crate::document::{Document, NodeId, PositionStyle};
use crate::geometry::Rect;
use crate::lifecycle::SurfaceManager;
use crate::menu::{modal_dialog, overflow_menu, MenuItem};
use crate::messages::{Key, Msg};
use crate::mount::MountStrategy;
use crate::positioning::{Placement, Side};
use crate::surface::{
    CloseEvent, CloseReason, InitialFocus, LifecycleState, SurfaceConfig, SurfaceHandle,
    SurfaceKind, Theme,
};
use crate::update::update;

// ============================================================================
// Scenario file
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default = "default_viewport")]
    pub viewport: Rect,
    /// Start without a document root; top-level nodes stay detached
    #[serde(default)]
    pub headless: bool,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    /// Name of the node registered as placeholder
    #[serde(default)]
    pub placeholder: Option<String>,
    pub steps: Vec<Step>,
}

fn default_viewport() -> Rect {
    Rect::new(0.0, 0.0, 800.0, 600.0)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub rect: Option<Rect>,
    #[serde(default)]
    pub position: PositionStyle,
    #[serde(default)]
    pub focusable: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

fn default_tag() -> String {
    "div".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ItemSpec {
    Label(String),
    Item {
        label: String,
        #[serde(default)]
        danger: bool,
        #[serde(default)]
        disabled: bool,
        #[serde(default)]
        divider: bool,
    },
}

impl ItemSpec {
    fn to_item(&self) -> MenuItem {
        match self {
            ItemSpec::Label(label) => MenuItem::new(label.as_str()),
            ItemSpec::Item {
                label,
                danger,
                disabled,
                divider,
            } => MenuItem {
                label: label.clone(),
                danger: *danger,
                disabled: *disabled,
                divider: *divider,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenSpec {
    pub trigger: String,
    #[serde(rename = "as", default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub kind: SurfaceKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
    #[serde(default)]
    pub placement: Option<Side>,
    #[serde(default)]
    pub flip: Option<bool>,
    #[serde(default)]
    pub inline: bool,
    #[serde(default)]
    pub mount: Option<MountStrategy>,
    #[serde(default)]
    pub gap: Option<f64>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub align_end: bool,
    #[serde(default)]
    pub initial_focus: Option<InitialFocus>,
    #[serde(default)]
    pub single_instance: Option<bool>,
    #[serde(default)]
    pub close_on_inner_click: Option<bool>,
}

impl OpenSpec {
    fn to_config(&self) -> SurfaceConfig {
        let text = self.text.clone().unwrap_or_default();
        let mut config = match self.kind {
            SurfaceKind::OverflowMenu => overflow_menu(
                self.items.iter().map(ItemSpec::to_item).collect(),
                self.align_end,
            ),
            SurfaceKind::Modal => modal_dialog(text, self.theme),
            SurfaceKind::Popover => SurfaceConfig::new(text).with_theme(self.theme),
        };
        config = config.inline(self.inline);
        if let Some(side) = self.placement {
            config = config.with_placement(side);
        }
        if let Some(flip) = self.flip {
            config = config.with_flip(flip);
        }
        if let Some(gap) = self.gap {
            config = config.with_gap(gap);
        }
        if let Some(label) = &self.label {
            config = config.with_menu_label(label.as_str());
        }
        if let Some(initial_focus) = self.initial_focus {
            config = config.with_initial_focus(initial_focus);
        }
        if let Some(single) = self.single_instance {
            config = config.single_instance(single);
        }
        if let Some(close) = self.close_on_inner_click {
            config = config.close_on_inner_click(close);
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyName {
    Escape,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Focus(String),
    Blur,
    Open(OpenSpec),
    Click(String),
    Key(KeyName),
    Resize(Rect),
    /// Run one scheduler tick
    Tick,
    /// Run ticks until the scheduler is idle
    Run,
    AdvanceMs(u64),
    Close(String),
    CloseAll,
    Feedback { surface: String, text: String },
    /// Register the named node as placeholder
    Placeholder(String),
    ClearPlaceholder,
}

impl Step {
    fn name(&self) -> String {
        match self {
            Step::Focus(node) => format!("focus {node}"),
            Step::Blur => "blur".to_string(),
            Step::Open(spec) => format!("open {}", spec.trigger),
            Step::Click(node) => format!("click {node}"),
            Step::Key(key) => format!("key {key:?}"),
            Step::Resize(rect) => format!("resize {}x{}", rect.width, rect.height),
            Step::Tick => "tick".to_string(),
            Step::Run => "run".to_string(),
            Step::AdvanceMs(ms) => format!("advance {ms}ms"),
            Step::Close(surface) => format!("close {surface}"),
            Step::CloseAll => "close_all".to_string(),
            Step::Feedback { surface, .. } => format!("feedback {surface}"),
            Step::Placeholder(node) => format!("placeholder {node}"),
            Step::ClearPlaceholder => "clear_placeholder".to_string(),
        }
    }
}

impl Scenario {
    pub fn from_yaml(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).context("Invalid scenario")
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub surfaces: Vec<SurfaceReport>,
    pub registered: usize,
    pub focused: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub closed: Vec<CloseReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurfaceReport {
    pub alias: String,
    pub state: LifecycleState,
    pub kind: SurfaceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount: Option<MountStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseReport {
    pub surface: String,
    pub reason: CloseReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

// ============================================================================
// Runner
// ============================================================================

/// Replays a scenario step by step
pub struct Runner {
    manager: SurfaceManager,
    names: HashMap<String, NodeId>,
    surfaces: IndexMap<String, (SurfaceHandle, SurfaceKind)>,
    events: Rc<RefCell<Vec<CloseEvent>>>,
    /// Node and reference of the most recent click, for naming close targets
    last_click: Option<(NodeId, String)>,
}

impl Runner {
    pub fn new(scenario: &Scenario, defaults: SurfaceDefaults) -> Result<Self> {
        let mut doc = if scenario.headless {
            Document::headless(scenario.viewport)
        } else {
            Document::new(scenario.viewport)
        };

        // Without a root, top-level nodes become detached trees
        let mut names = HashMap::new();
        let root = doc.root();
        for spec in &scenario.nodes {
            build_node(&mut doc, root, spec, &mut names)?;
        }

        let mut manager = SurfaceManager::with_defaults(doc, defaults);
        if let Some(name) = &scenario.placeholder {
            let node = lookup(&names, name)?;
            manager.register_placeholder(node);
        }

        Ok(Self {
            manager,
            names,
            surfaces: IndexMap::new(),
            events: Rc::new(RefCell::new(Vec::new())),
            last_click: None,
        })
    }

    pub fn manager(&self) -> &SurfaceManager {
        &self.manager
    }

    /// Run a step; step-level failures (e.g. no mount point) are reported,
    /// malformed references abort
    pub fn step(&mut self, index: usize, step: &Step) -> Result<StepReport> {
        self.last_click = None;
        let error = self
            .apply(step)
            .with_context(|| format!("step {} ({})", index, step.name()))?;

        let closed = self
            .events
            .borrow_mut()
            .drain(..)
            .collect::<Vec<CloseEvent>>();
        let closed = closed
            .into_iter()
            .map(|event| CloseReport {
                surface: self.alias_of(event.surface),
                reason: event.reason,
                target: event.target.map(|node| self.close_target_name(node)),
            })
            .collect();

        Ok(StepReport {
            index,
            action: step.name(),
            error,
            surfaces: self.surface_reports(),
            registered: self.manager.registry().len(),
            focused: self
                .manager
                .document()
                .active_element()
                .map(|node| self.node_name(node)),
            closed,
        })
    }

    /// Returns the user-facing error of a failed open
    fn apply(&mut self, step: &Step) -> Result<Option<String>> {
        match step {
            Step::Focus(name) => {
                let node = self.resolve(name)?;
                if !self.manager.document_mut().focus(node) {
                    return Ok(Some(format!("{name} cannot take focus")));
                }
            }
            Step::Blur => self.manager.document_mut().blur(),
            Step::Open(spec) => return self.open(spec),
            Step::Click(name) => {
                let node = self.resolve(name)?;
                self.last_click = Some((node, name.clone()));
                update(&mut self.manager, Msg::Click(node));
            }
            Step::Key(KeyName::Escape) => {
                update(&mut self.manager, Msg::Key(Key::Escape));
            }
            Step::Resize(viewport) => {
                update(&mut self.manager, Msg::Resize(*viewport));
            }
            Step::Tick => {
                update(&mut self.manager, Msg::Tick);
            }
            Step::Run => {
                self.manager.run_until_idle();
            }
            Step::AdvanceMs(ms) => {
                update(&mut self.manager, Msg::Advance(Duration::from_millis(*ms)));
            }
            Step::Close(alias) => {
                let handle = self.surface(alias)?;
                self.manager.close(handle);
            }
            Step::CloseAll => {
                update(&mut self.manager, Msg::CloseAll);
            }
            Step::Feedback { surface, text } => {
                let handle = self.surface(surface)?;
                self.manager.show_feedback(handle, text.as_str());
            }
            Step::Placeholder(name) => {
                let node = self.resolve(name)?;
                self.manager.register_placeholder(node);
            }
            Step::ClearPlaceholder => self.manager.clear_mount_host(),
        }
        Ok(None)
    }

    fn open(&mut self, spec: &OpenSpec) -> Result<Option<String>> {
        let trigger = self.resolve(&spec.trigger)?;
        let config = spec.to_config();
        let kind = config.kind;
        let handle = match self.manager.open_with(trigger, config, spec.mount) {
            Ok(handle) => handle,
            Err(e) => return Ok(Some(e.to_string())),
        };

        let alias = spec
            .alias
            .clone()
            .unwrap_or_else(|| format!("surface{}", handle.id().0));
        let known = self.surfaces.values().any(|(h, _)| *h == handle);
        if !known {
            let events = Rc::clone(&self.events);
            self.manager.subscribe(handle, move |_, event| {
                events.borrow_mut().push(*event);
            });
            self.surfaces.insert(alias, (handle, kind));
        }
        Ok(None)
    }

    fn surface(&self, alias: &str) -> Result<SurfaceHandle> {
        let key = alias.strip_prefix('@').unwrap_or(alias);
        self.surfaces
            .get(key)
            .map(|(handle, _)| *handle)
            .ok_or_else(|| anyhow!("unknown surface {alias}"))
    }

    /// Resolve `name`, `@surface` or `@surface#N`
    fn resolve(&self, reference: &str) -> Result<NodeId> {
        let Some(surface_ref) = reference.strip_prefix('@') else {
            return lookup(&self.names, reference);
        };
        let (alias, index) = match surface_ref.split_once('#') {
            Some((alias, index)) => {
                let index: usize = index
                    .parse()
                    .with_context(|| format!("bad node index in {reference}"))?;
                (alias, Some(index))
            }
            None => (surface_ref, None),
        };
        let handle = self.surface(alias)?;
        let root = self
            .manager
            .root(handle)
            .ok_or_else(|| anyhow!("surface {alias} is closed"))?;
        match index {
            None => Ok(root),
            Some(index) => self
                .focusable_nodes(root)
                .get(index)
                .copied()
                .ok_or_else(|| anyhow!("{reference} does not exist")),
        }
    }

    fn focusable_nodes(&self, root: NodeId) -> Vec<NodeId> {
        let doc = self.manager.document();
        doc.descendants(root)
            .into_iter()
            .filter(|node| doc.get(*node).is_some_and(|n| n.focusable))
            .collect()
    }

    fn node_name(&self, node: NodeId) -> String {
        if let Some((name, _)) = self.names.iter().find(|(_, id)| **id == node) {
            return name.clone();
        }
        for (alias, (handle, _)) in &self.surfaces {
            let Some(root) = self.manager.root(*handle) else {
                continue;
            };
            if root == node {
                return format!("@{alias}");
            }
            if let Some(i) = self.focusable_nodes(root).iter().position(|n| *n == node) {
                return format!("@{alias}#{i}");
            }
        }
        format!("node:{}", node.0)
    }

    /// Click targets inside a surface are gone by the time the event is
    /// reported, so reuse the reference the click was made with
    fn close_target_name(&self, node: NodeId) -> String {
        match &self.last_click {
            Some((clicked, reference)) if *clicked == node => reference.clone(),
            _ => self.node_name(node),
        }
    }

    fn alias_of(&self, handle: SurfaceHandle) -> String {
        self.surfaces
            .iter()
            .find(|(_, (h, _))| *h == handle)
            .map(|(alias, _)| alias.clone())
            .unwrap_or_else(|| format!("surface{}", handle.id().0))
    }

    fn surface_reports(&self) -> Vec<SurfaceReport> {
        self.surfaces
            .iter()
            .map(|(alias, (handle, kind))| SurfaceReport {
                alias: alias.clone(),
                state: self.manager.state(*handle),
                kind: *kind,
                mount: self.manager.mount_strategy(*handle),
                placement: self.manager.placement(*handle),
                feedback: self.manager.feedback(*handle).map(str::to_string),
            })
            .collect()
    }
}

fn build_node(
    doc: &mut Document,
    parent: Option<NodeId>,
    spec: &NodeSpec,
    names: &mut HashMap<String, NodeId>,
) -> Result<()> {
    let node = doc.create_element(spec.tag.as_str());
    if let Some(parent) = parent {
        doc.append_child(parent, node);
    }
    doc.set_position(node, spec.position);
    doc.set_focusable(node, spec.focusable);
    doc.set_disabled(node, spec.disabled);
    if let Some(rect) = spec.rect {
        doc.set_rect(node, rect);
    }
    if let Some(text) = &spec.text {
        doc.set_text(node, text.as_str());
    }
    for (key, value) in &spec.attrs {
        doc.set_attr(node, key.as_str(), value.as_str());
    }
    if let Some(name) = &spec.name {
        if name.starts_with('@') {
            bail!("node names cannot start with '@': {name}");
        }
        if names.insert(name.clone(), node).is_some() {
            bail!("duplicate node name {name}");
        }
    }
    for child in &spec.children {
        build_node(doc, Some(node), child, names)?;
    }
    Ok(())
}

fn lookup(names: &HashMap<String, NodeId>, name: &str) -> Result<NodeId> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| anyhow!("unknown node {name}"))
}

/// Run every step of `scenario` and collect the reports
pub fn run(scenario: &Scenario, defaults: SurfaceDefaults) -> Result<Report> {
    let mut runner = Runner::new(scenario, defaults)?;
    let steps = scenario
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| runner.step(index, step))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(steps = steps.len(), "scenario finished");
    Ok(Report { steps })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_yaml(
            r#"
nodes:
  - name: more
    tag: button
steps:
  - focus: more
  - open: { trigger: more, as: menu, kind: overflow_menu, items: [Rename, { label: Delete, danger: true }] }
  - tick
  - advance_ms: 2000
  - feedback: { surface: "@menu", text: Copied }
  - close_all
"#,
        )
        .unwrap();

        assert_eq!(scenario.viewport, default_viewport());
        assert_eq!(scenario.steps.len(), 6);
        assert!(matches!(scenario.steps[2], Step::Tick));
        assert!(matches!(scenario.steps[3], Step::AdvanceMs(2000)));
        let Step::Open(spec) = &scenario.steps[1] else {
            panic!("expected open step");
        };
        assert_eq!(spec.kind, SurfaceKind::OverflowMenu);
        assert_eq!(spec.items.len(), 2);
    }

    #[test]
    fn test_unknown_node_aborts() {
        let scenario = Scenario::from_yaml("steps:\n  - focus: nowhere\n").unwrap();
        let err = run(&scenario, SurfaceDefaults::default()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown node nowhere"));
    }

    #[test]
    fn test_mount_failure_is_reported() {
        let scenario = Scenario::from_yaml(
            r#"
nodes:
  - name: more
steps:
  - open: { trigger: more, mount: placeholder }
"#,
        )
        .unwrap();
        let report = run(&scenario, SurfaceDefaults::default()).unwrap();
        let error = report.steps[0].error.as_deref().unwrap();
        assert!(error.contains("no placeholder"));
        assert!(report.steps[0].surfaces.is_empty());
    }

    #[test]
    fn test_headless_document_has_no_mount_point() {
        let scenario = Scenario::from_yaml(
            r#"
headless: true
nodes:
  - name: more
steps:
  - open: { trigger: more }
"#,
        )
        .unwrap();
        let report = run(&scenario, SurfaceDefaults::default()).unwrap();
        let error = report.steps[0].error.as_deref().unwrap();
        assert!(error.contains("no root element"));
    }
}
