//! Button-driven menus.
//!
//! Menus live in a [`MenuTree`] arena. Each node owns its items and its own
//! selection and scroll state, and refers to its parent by [`MenuId`], so
//! descending into a submenu and coming back keeps both cursors where they
//! were.
//!
//! [`MenuEngine`] maps buttons onto the tree:
//!
//! | Button | Effect |
//! |---|---|
//! | `Up` / `Down` | previous / next enabled item, wrapping |
//! | `Enter` / `Right` | open the submenu or run the action |
//! | `Left` / `Esc` | back to the parent; exit at the root |
//! | anything else | ignored |
//!
//! The panel is redrawn only after a button changed what the menu shows.
//!
//! ```rust
//! use ezio::menu::{MenuItem, MenuTree};
//!
//! let mut tree = MenuTree::new("SETTINGS");
//! let root = tree.root();
//! let network = tree.add_menu("NETWORK");
//! tree.add_submenu(root, "Network", network);
//! tree.add_item(root, MenuItem::new("Reboot").disabled());
//! tree.add_item(root, MenuItem::new("About"));
//!
//! tree.select_next(root);
//! assert_eq!(tree.selected(root), 2);
//! assert_eq!(tree.items(root)[0].label, "Network >");
//! assert_eq!(tree.parent(network), Some(root));
//! ```

pub mod builder;

pub use builder::{MetricsFeed, SystemMenuBuilder};

use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::display::SharedDisplay;
use crate::font::{self, Font};
use crate::framebuffer::{FrameBuffer, WIDTH};
use crate::types::Button;
use crate::{LcdError, Result};

/// Rows shown below the title when nothing else is configured.
pub const DEFAULT_VISIBLE_ROWS: usize = 6;

/// Appended to the label of items that open a submenu.
pub const SUBMENU_MARKER: &str = " >";

/// A fallible, argument-free menu action.
pub type MenuAction = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Produces the live value shown next to an item's label.
pub type MenuValue = Arc<dyn Fn() -> String + Send + Sync>;

/// Handle to one menu in a [`MenuTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuId(usize);

/// One selectable row.
#[derive(Clone)]
pub struct MenuItem {
    pub label: String,
    pub action: Option<MenuAction>,
    pub submenu: Option<MenuId>,
    pub value: Option<MenuValue>,
    pub disabled: bool,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: None,
            submenu: None,
            value: None,
            disabled: false,
        }
    }

    /// Run `action` when the item is activated.
    pub fn with_action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.action = Some(Arc::new(move || -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(action())
        }));
        self
    }

    /// Show `value()` after the label on every redraw.
    pub fn with_value<F>(mut self, value: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.value = Some(Arc::new(value));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Row text: `Label: value`, or just the label when the value is empty.
    pub fn text(&self) -> String {
        match self.value.as_ref().map(|value| value()) {
            Some(value) if !value.is_empty() => format!("{}: {}", self.label, value),
            _ => self.label.clone(),
        }
    }
}

impl std::fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuItem")
            .field("label", &self.label)
            .field("action", &self.action.is_some())
            .field("submenu", &self.submenu)
            .field("value", &self.value.is_some())
            .field("disabled", &self.disabled)
            .finish()
    }
}

#[derive(Debug)]
struct MenuNode {
    title: String,
    items: Vec<MenuItem>,
    parent: Option<MenuId>,
    selected: usize,
    scroll_offset: usize,
    visible_rows: usize,
}

impl MenuNode {
    fn new(title: String, visible_rows: usize) -> Self {
        Self {
            title,
            items: Vec::new(),
            parent: None,
            selected: 0,
            scroll_offset: 0,
            visible_rows,
        }
    }

    fn all_disabled(&self) -> bool {
        self.items.iter().all(|item| item.disabled)
    }

    /// Step the cursor by `forward` until it lands on an enabled item.
    fn step(&mut self, forward: bool) -> bool {
        if self.all_disabled() {
            return false;
        }
        let len = self.items.len();
        let before = self.selected;
        loop {
            self.selected = if forward {
                (self.selected + 1) % len
            } else {
                (self.selected + len - 1) % len
            };
            if !self.items[self.selected].disabled {
                break;
            }
        }
        self.update_scroll();
        self.selected != before
    }

    fn update_scroll(&mut self) {
        if self.selected >= self.scroll_offset + self.visible_rows {
            self.scroll_offset = self.selected + 1 - self.visible_rows;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        }
    }
}

/// Arena of menus. The first node is the root.
#[derive(Debug)]
pub struct MenuTree {
    nodes: Vec<MenuNode>,
    visible_rows: usize,
}

impl MenuTree {
    pub fn new(root_title: impl Into<String>) -> Self {
        Self {
            nodes: vec![MenuNode::new(root_title.into(), DEFAULT_VISIBLE_ROWS)],
            visible_rows: DEFAULT_VISIBLE_ROWS,
        }
    }

    /// Set the number of item rows shown at once, for existing and future menus.
    pub fn with_visible_rows(mut self, rows: usize) -> Self {
        self.visible_rows = rows.max(1);
        for node in &mut self.nodes {
            node.visible_rows = self.visible_rows;
            node.update_scroll();
        }
        self
    }

    pub fn root(&self) -> MenuId {
        MenuId(0)
    }

    /// Number of menus in the tree, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a menu that is not yet reachable. Attach it with [`add_submenu`](Self::add_submenu).
    pub fn add_menu(&mut self, title: impl Into<String>) -> MenuId {
        self.nodes.push(MenuNode::new(title.into(), self.visible_rows));
        MenuId(self.nodes.len() - 1)
    }

    pub fn add_item(&mut self, menu: MenuId, item: MenuItem) {
        self.node_mut(menu).items.push(item);
    }

    /// Add an item under `menu` that opens `child`, and make `menu` its parent.
    pub fn add_submenu(&mut self, menu: MenuId, label: impl Into<String>, child: MenuId) {
        let mut item = MenuItem::new(format!("{}{}", label.into(), SUBMENU_MARKER));
        item.submenu = Some(child);
        self.node_mut(child).parent = Some(menu);
        self.add_item(menu, item);
    }

    pub fn title(&self, menu: MenuId) -> &str {
        &self.node(menu).title
    }

    pub fn items(&self, menu: MenuId) -> &[MenuItem] {
        &self.node(menu).items
    }

    pub fn parent(&self, menu: MenuId) -> Option<MenuId> {
        self.node(menu).parent
    }

    pub fn selected(&self, menu: MenuId) -> usize {
        self.node(menu).selected
    }

    pub fn selected_item(&self, menu: MenuId) -> Option<&MenuItem> {
        let node = self.node(menu);
        node.items.get(node.selected)
    }

    pub fn scroll_offset(&self, menu: MenuId) -> usize {
        self.node(menu).scroll_offset
    }

    /// Move to the next enabled item, wrapping. Returns whether the cursor moved.
    pub fn select_next(&mut self, menu: MenuId) -> bool {
        self.node_mut(menu).step(true)
    }

    /// Move to the previous enabled item, wrapping. Returns whether the cursor moved.
    pub fn select_previous(&mut self, menu: MenuId) -> bool {
        self.node_mut(menu).step(false)
    }

    /// Draw `menu` into `fb`: inverted title, the visible window of items with
    /// the selection highlighted, and arrows when more items are above or below.
    pub fn draw(&self, menu: MenuId, fb: &mut FrameBuffer, font: &dyn Font) {
        let node = self.node(menu);
        let line_height = font.height();
        fb.clear();
        font::render_text_inverted(fb, font, 0, 0, &node.title);

        let end = (node.scroll_offset + node.visible_rows).min(node.items.len());
        let mut y = line_height;
        let rows = node.items.iter().enumerate().take(end);
        for (index, item) in rows.skip(node.scroll_offset) {
            let text = item.text();
            if index == node.selected {
                fb.fill_rect(0, y, WIDTH as i32, line_height, true);
                font::erase_text(fb, font, 2, y, &text);
            } else {
                let prefix = if item.disabled { "- " } else { "  " };
                font::render_text(fb, font, 0, y, &format!("{prefix}{text}"));
            }
            y += line_height;
        }

        if node.scroll_offset > 0 {
            fb.set_pixel(124, line_height + 2, true);
            fb.set_pixel(125, line_height + 1, true);
            fb.set_pixel(126, line_height + 2, true);
        }
        if end < node.items.len() {
            let last = line_height + node.visible_rows as i32 * line_height - 3;
            fb.set_pixel(124, last, true);
            fb.set_pixel(125, last + 1, true);
            fb.set_pixel(126, last, true);
        }
    }

    fn node(&self, menu: MenuId) -> &MenuNode {
        &self.nodes[menu.0]
    }

    fn node_mut(&mut self, menu: MenuId) -> &mut MenuNode {
        &mut self.nodes[menu.0]
    }
}

/// What to do when a menu action returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFailurePolicy {
    /// Log the failure, leave the panel as it is and keep handling buttons.
    #[default]
    SkipRender,
    /// Stop the engine and return the failure as [`LcdError::MenuAction`].
    Propagate,
}

/// Outcome of one button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The selection moved within the current menu.
    Moved,
    /// A submenu was opened.
    Entered(MenuId),
    /// An action completed.
    ActionRan,
    /// An action failed and the failure was swallowed.
    ActionFailed,
    /// Returned to the parent menu.
    Ascended(MenuId),
    /// Back was pressed at the root.
    Exit,
    /// Nothing changed.
    Ignored,
}

impl Transition {
    fn moved(changed: bool) -> Self {
        if changed {
            Transition::Moved
        } else {
            Transition::Ignored
        }
    }

    /// Whether the menu must be redrawn. Actions own the panel until the
    /// next press, so their outcome never triggers a redraw.
    pub fn needs_render(self) -> bool {
        matches!(self, Transition::Moved | Transition::Entered(_) | Transition::Ascended(_))
    }
}

/// Drives a [`MenuTree`] from button presses and draws it on a shared display.
///
/// The display lock is held only while drawing; actions run without it, so
/// an action may lock the display itself.
pub struct MenuEngine {
    tree: MenuTree,
    current: MenuId,
    display: SharedDisplay,
    policy: ActionFailurePolicy,
}

impl MenuEngine {
    pub fn new(tree: MenuTree, display: SharedDisplay) -> Self {
        let current = tree.root();
        Self {
            tree,
            current,
            display,
            policy: ActionFailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: ActionFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn tree(&self) -> &MenuTree {
        &self.tree
    }

    pub fn current(&self) -> MenuId {
        self.current
    }

    pub fn go_to_root(&mut self) {
        self.current = self.tree.root();
    }

    pub fn display(&self) -> &SharedDisplay {
        &self.display
    }

    /// Apply one button press. Only [`ActionFailurePolicy::Propagate`] turns
    /// an action failure into an error.
    pub async fn handle_button(&mut self, button: Button) -> Result<Transition> {
        let menu = self.current;
        let transition = match button {
            Button::Up => Transition::moved(self.tree.select_previous(menu)),
            Button::Down => Transition::moved(self.tree.select_next(menu)),
            Button::Enter | Button::Right => self.activate().await?,
            Button::Left | Button::Esc => match self.tree.parent(menu) {
                Some(parent) => {
                    self.current = parent;
                    Transition::Ascended(parent)
                }
                None => Transition::Exit,
            },
            _ => Transition::Ignored,
        };
        trace!("{} in '{}' => {:?}", button, self.tree.title(menu), transition);
        Ok(transition)
    }

    async fn activate(&mut self) -> Result<Transition> {
        let Some(item) = self.tree.selected_item(self.current) else {
            return Ok(Transition::Ignored);
        };
        if item.disabled {
            return Ok(Transition::Ignored);
        }
        if let Some(child) = item.submenu {
            debug!("Entering '{}'", self.tree.title(child));
            self.current = child;
            return Ok(Transition::Entered(child));
        }
        let Some(action) = item.action.clone() else {
            return Ok(Transition::Ignored);
        };
        let label = item.label.clone();

        debug!("Running menu action '{}'", label);
        match action().await {
            Ok(()) => Ok(Transition::ActionRan),
            Err(error) => match self.policy {
                ActionFailurePolicy::SkipRender => {
                    warn!("Menu action '{}' failed: {:#}", label, error);
                    Ok(Transition::ActionFailed)
                }
                ActionFailurePolicy::Propagate => Err(LcdError::menu_action_failed(label, error)),
            },
        }
    }

    /// Draw the current menu and upload it.
    pub async fn render(&self) -> Result<()> {
        let mut display = self.display.lock().await;
        let font = display.font_handle();
        self.tree.draw(self.current, display.frame_buffer_mut(), font.as_ref());
        display.update().await
    }

    /// Render, then handle presses until back is pressed at the root or the
    /// stream ends.
    pub async fn run<S>(&mut self, mut events: S) -> Result<()>
    where
        S: Stream<Item = Button> + Unpin,
    {
        info!("Menu '{}' started", self.tree.title(self.tree.root()));
        self.render().await?;

        while let Some(button) = events.next().await {
            let transition = self.handle_button(button).await?;
            if transition == Transition::Exit {
                info!("Menu exited from root");
                return Ok(());
            }
            if transition.needs_render() {
                self.render().await?;
            }
        }

        debug!("Button stream ended");
        Ok(())
    }
}

impl std::fmt::Debug for MenuEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuEngine")
            .field("current", &self.current)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::BuiltinFont;
    use crate::test_utils::memory_display;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn press(engine: &mut MenuEngine, button: Button) -> Transition {
        engine.handle_button(button).await.expect("transition")
    }

    fn four_items_third_disabled() -> MenuTree {
        let mut tree = MenuTree::new("TEST");
        let root = tree.root();
        tree.add_item(root, MenuItem::new("Zero"));
        tree.add_item(root, MenuItem::new("One"));
        tree.add_item(root, MenuItem::new("Two").disabled());
        tree.add_item(root, MenuItem::new("Three"));
        tree
    }

    #[test]
    fn selection_skips_disabled_items_and_wraps() {
        let mut tree = four_items_third_disabled();
        let root = tree.root();
        let mut visited = Vec::new();
        for _ in 0..5 {
            tree.select_next(root);
            visited.push(tree.selected(root));
        }
        assert_eq!(visited, vec![1, 3, 0, 1, 3]);

        tree.select_previous(root);
        assert_eq!(tree.selected(root), 1);
        tree.select_previous(root);
        assert_eq!(tree.selected(root), 0);
        tree.select_previous(root);
        assert_eq!(tree.selected(root), 3);
    }

    #[test]
    fn all_disabled_menu_does_not_move() {
        let mut tree = MenuTree::new("LOCKED");
        let root = tree.root();
        tree.add_item(root, MenuItem::new("A").disabled());
        tree.add_item(root, MenuItem::new("B").disabled());

        assert!(!tree.select_next(root));
        assert!(!tree.select_previous(root));
        assert_eq!(tree.selected(root), 0);

        let mut empty = MenuTree::new("EMPTY");
        let root = empty.root();
        assert!(!empty.select_next(root));
    }

    #[test]
    fn scroll_window_follows_selection() {
        let mut tree = MenuTree::new("LONG").with_visible_rows(3);
        let root = tree.root();
        for i in 0..8 {
            tree.add_item(root, MenuItem::new(format!("Item {i}")));
        }

        for _ in 0..4 {
            tree.select_next(root);
        }
        assert_eq!(tree.selected(root), 4);
        assert_eq!(tree.scroll_offset(root), 2);

        for _ in 0..4 {
            tree.select_next(root);
        }
        assert_eq!(tree.selected(root), 0);
        assert_eq!(tree.scroll_offset(root), 0);

        tree.select_previous(root);
        assert_eq!(tree.selected(root), 7);
        assert_eq!(tree.scroll_offset(root), 5);
    }

    #[test]
    fn item_text_includes_non_empty_values() {
        let plain = MenuItem::new("CPU");
        assert_eq!(plain.text(), "CPU");
        let valued = MenuItem::new("CPU").with_value(|| "12.5%".to_string());
        assert_eq!(valued.text(), "CPU: 12.5%");
        let blank = MenuItem::new("CPU").with_value(String::new);
        assert_eq!(blank.text(), "CPU");
    }

    #[test]
    fn draw_highlights_selection_and_marks_overflow() {
        let mut tree = MenuTree::new("MAIN").with_visible_rows(2);
        let root = tree.root();
        for label in ["A", "B", "C"] {
            tree.add_item(root, MenuItem::new(label));
        }
        let mut fb = FrameBuffer::new();

        tree.draw(root, &mut fb, &BuiltinFont);
        // Selected row is lit edge to edge, down arrow below the window
        assert!(fb.get_pixel(0, 8));
        assert!(fb.get_pixel(127, 15));
        assert!(!fb.get_pixel(0, 16));
        assert!(fb.get_pixel(125, 8 + 2 * 8 - 2));
        assert!(!fb.get_pixel(124, 8 + 2 * 8 - 2));

        tree.select_next(root);
        tree.select_next(root);
        tree.draw(root, &mut fb, &BuiltinFont);
        assert_eq!(tree.scroll_offset(root), 1);
        assert!(fb.get_pixel(125, 9));
        assert!(fb.get_pixel(0, 16));
    }

    #[tokio::test]
    async fn enter_and_back_preserve_submenu_state() {
        let mut tree = MenuTree::new("ROOT");
        let root = tree.root();
        let child = tree.add_menu("CHILD");
        tree.add_item(child, MenuItem::new("First"));
        tree.add_item(child, MenuItem::new("Second"));
        tree.add_submenu(root, "Child", child);

        let (display, _port) = memory_display();
        let mut engine = MenuEngine::new(tree, display.into_shared());

        assert_eq!(press(&mut engine, Button::Right).await, Transition::Entered(child));
        assert_eq!(press(&mut engine, Button::Down).await, Transition::Moved);
        assert_eq!(press(&mut engine, Button::Esc).await, Transition::Ascended(root));
        assert_eq!(press(&mut engine, Button::Enter).await, Transition::Entered(child));
        assert_eq!(engine.tree().selected(child), 1);

        assert_eq!(press(&mut engine, Button::Help).await, Transition::Ignored);
        assert_eq!(press(&mut engine, Button::Left).await, Transition::Ascended(root));
        assert_eq!(press(&mut engine, Button::Left).await, Transition::Exit);
    }

    #[tokio::test]
    async fn failed_actions_follow_the_policy() {
        let build = || {
            let mut tree = MenuTree::new("ROOT");
            let root = tree.root();
            let broken = MenuItem::new("Broken")
                .with_action(|| async { Err::<(), _>(anyhow::anyhow!("no such LED")) });
            tree.add_item(root, broken);
            tree
        };

        let (display, port) = memory_display();
        let mut engine = MenuEngine::new(build(), display.into_shared());
        assert_eq!(press(&mut engine, Button::Enter).await, Transition::ActionFailed);
        assert!(port.written().is_empty());

        let (display, _port) = memory_display();
        let mut engine = MenuEngine::new(build(), display.into_shared())
            .with_failure_policy(ActionFailurePolicy::Propagate);
        let error = engine.handle_button(Button::Enter).await.expect_err("propagated");
        assert!(matches!(error, LcdError::MenuAction { ref label, .. } if label == "Broken"));
    }

    #[tokio::test]
    async fn run_renders_only_after_state_changes() {
        let _ = tracing_subscriber::fmt::try_init();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let mut tree = MenuTree::new("ROOT");
        let root = tree.root();
        tree.add_item(root, MenuItem::new("Count").with_action(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            }
        }));
        tree.add_item(root, MenuItem::new("Other"));

        let (display, port) = memory_display();
        let mut engine = MenuEngine::new(tree, display.into_shared());
        let presses = futures::stream::iter(vec![
            Button::Enter,
            Button::Help,
            Button::Down,
            Button::Up,
            Button::Enter,
            Button::Esc,
            Button::Down,
        ]);
        engine.run(presses).await.expect("run");

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        // initial render plus the two moves; each render is one upload
        assert_eq!(port.write_calls(), 3);
        assert_eq!(engine.tree().selected(root), 0);
    }
}
