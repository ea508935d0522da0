//! Presets for the two common surface shapes: overflow menus and modal dialogs

use crate::document::{Document, NodeId};
use crate::geometry::{Point, Rect, Size};
use crate::lifecycle::{ATTR_DISMISS, ATTR_ROLE};
use crate::positioning::{align_to_trigger_edge, EdgeAdjust, Side};
use crate::surface::{
    Content, InitialFocus, Render, SurfaceConfig, SurfaceContext, SurfaceKind, Theme,
};

/// Accessible label used when the caller gives none
pub const DEFAULT_MENU_LABEL: &str = "Overflow";

pub const MENU_WIDTH: f64 = 160.0;
pub const ITEM_HEIGHT: f64 = 40.0;
/// Horizontal padding on each side of an item label
pub const ITEM_PADDING: f64 = 16.0;

/// Configuration for an overflow menu anchored to `trigger`
///
/// The menu opens below the trigger, flips above it when there is no room,
/// lines its start edge up with the trigger (end edge with `align_end`) and
/// closes on any click inside it.
pub fn overflow_menu(items: MenuItems, align_end: bool) -> SurfaceConfig {
    let adjust = EdgeAdjust::new(move |placement, cx| {
        align_to_trigger_edge(placement, cx.trigger, cx.surface, align_end)
    });
    SurfaceConfig::new(Content::renderable(items))
        .with_kind(SurfaceKind::OverflowMenu)
        .with_placement(Side::Bottom)
        .with_flip(true)
        .with_menu_label(DEFAULT_MENU_LABEL)
        .with_initial_focus(InitialFocus::FirstFocusable)
        .single_instance(true)
        .close_on_inner_click(true)
        .align_end(align_end)
        .with_edge(Side::Bottom, adjust.clone())
        .with_edge(Side::Top, adjust)
}

/// Configuration for a modal dialog centered on a backdrop
pub fn modal_dialog(content: impl Into<Content>, theme: Theme) -> SurfaceConfig {
    SurfaceConfig::new(content)
        .with_kind(SurfaceKind::Modal)
        .with_theme(theme)
        .with_initial_focus(InitialFocus::FirstFocusable)
}

/// One option of an overflow menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub danger: bool,
    pub disabled: bool,
    /// Draw a dividing line above this option
    pub divider: bool,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            danger: false,
            disabled: false,
            divider: false,
        }
    }

    pub fn danger(mut self) -> Self {
        self.danger = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn with_divider(mut self) -> Self {
        self.divider = true;
        self
    }

    fn label_width(&self, char_width: f64) -> f64 {
        self.label.chars().count() as f64 * char_width
    }
}

/// Options rendered as a vertical list of buttons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuItems {
    items: Vec<MenuItem>,
}

impl MenuItems {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, item: MenuItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<MenuItem> for MenuItems {
    fn from_iter<I: IntoIterator<Item = MenuItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Render for MenuItems {
    fn render(&self, doc: &mut Document, container: NodeId, cx: &SurfaceContext) -> Size {
        let list = doc.create_element("ul");
        doc.append_child(container, list);
        doc.set_attr(list, ATTR_ROLE, "presentation");

        let available = MENU_WIDTH - 2.0 * ITEM_PADDING;
        for (i, item) in self.items.iter().enumerate() {
            let button = doc.create_element("button");
            doc.append_child(list, button);
            doc.set_attr(button, ATTR_ROLE, "menuitem");
            doc.set_attr(button, ATTR_DISMISS, "");
            doc.set_text(button, item.label.as_str());
            doc.set_focusable(button, true);
            doc.set_disabled(button, item.disabled);
            if item.danger {
                doc.set_attr(button, "data-danger", "");
            }
            if item.divider {
                doc.set_attr(button, "data-divider", "");
            }
            // Labels too long for the pane get truncated; expose the full text
            if item.label_width(cx.char_width) > available {
                doc.set_attr(button, "title", item.label.as_str());
            }
            doc.set_rect(
                button,
                Rect::from_origin_size(
                    Point::new(0.0, i as f64 * ITEM_HEIGHT),
                    Size::new(MENU_WIDTH, ITEM_HEIGHT),
                ),
            );
        }

        let size = Size::new(MENU_WIDTH, self.items.len() as f64 * ITEM_HEIGHT);
        doc.set_rect(list, Rect::from_origin_size(Point::default(), size));
        size
    }
}
