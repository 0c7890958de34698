use disview_core::{NodePath, TreeNode, TreeNodeKind};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TreeItem {
    pub path: NodePath,
    pub label: String,
    pub kind: TreeNodeKind,
    pub depth: usize,
    pub is_expanded: bool,
    pub has_children: bool,
}

impl TreeItem {
    pub fn new(node: &TreeNode, path: NodePath) -> Self {
        let has_children = node.allow_expand && !node.children.is_empty();

        Self {
            depth: path.len(),
            path,
            label: node.label.clone(),
            kind: node.kind,
            is_expanded: has_children,
            has_children,
        }
    }
}

/// The visible rows of a syntax tree, with per-path expansion state.
pub struct TreeView {
    items: Vec<TreeItem>,
    selected_index: usize,
    expanded_items: HashMap<NodePath, bool>,
    root: Option<TreeNode>,
}

impl TreeView {
    pub fn new(root: Option<TreeNode>) -> Self {
        let mut tree = Self {
            items: Vec::new(),
            selected_index: 0,
            expanded_items: HashMap::new(),
            root,
        };

        tree.rebuild_items();
        tree
    }

    /// Swaps in a freshly built tree, keeping expansion state for paths that still exist.
    pub fn set_root(&mut self, root: Option<TreeNode>) {
        self.root = root;
        self.rebuild_items();
        self.selected_index = self.selected_index.min(self.items.len().saturating_sub(1));
    }

    pub fn rebuild_items(&mut self) {
        self.items.clear();

        if let Some(root) = self.root.take() {
            self.add_node_recursive(&root, Vec::new());
            self.root = Some(root);
        }
    }

    fn add_node_recursive(&mut self, node: &TreeNode, path: NodePath) {
        let mut item = TreeItem::new(node, path);
        item.is_expanded = item.has_children
            && *self
                .expanded_items
                .get(&item.path)
                .unwrap_or(&item.is_expanded);

        let is_expanded = item.is_expanded;
        let path = item.path.clone();
        self.items.push(item);

        if is_expanded {
            for (index, child) in node.children.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(index);
                self.add_node_recursive(child, child_path);
            }
        }
    }

    pub fn move_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected_index + 1 < self.items.len() {
            self.selected_index += 1;
        }
    }

    pub fn toggle_expand(&mut self) {
        if let Some(item) = self.items.get(self.selected_index) {
            if item.has_children {
                let current_expanded = item.is_expanded;
                self.expanded_items
                    .insert(item.path.clone(), !current_expanded);
                self.rebuild_items();

                self.selected_index = self.selected_index.min(self.items.len().saturating_sub(1));
            }
        }
    }

    /// Selects the row for `path`, expanding its ancestors first.
    pub fn select_path(&mut self, path: &[usize]) {
        for depth in 0..path.len() {
            self.expanded_items.insert(path[..depth].to_vec(), true);
        }
        self.rebuild_items();

        if let Some(index) = self.items.iter().position(|item| item.path == path) {
            self.selected_index = index;
        }
    }

    pub fn selected_path(&self) -> Option<&[usize]> {
        self.items
            .get(self.selected_index)
            .map(|item| item.path.as_slice())
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn items(&self) -> &[TreeItem] {
        &self.items
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, block: Block) {
        if self.items.is_empty() {
            let empty = Paragraph::new("No syntax tree")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, tree_item)| {
                let indent = "  ".repeat(tree_item.depth);
                let expand_icon = if tree_item.has_children {
                    if tree_item.is_expanded { "▼ " } else { "▶ " }
                } else {
                    "  "
                };

                let content = format!("{}{}{}", indent, expand_icon, tree_item.label);
                let line = Line::from(vec![Span::styled(
                    content,
                    if i == self.selected_index {
                        Style::default().fg(Color::Black).bg(Color::White)
                    } else {
                        Self::get_node_style(tree_item.kind)
                    },
                )]);

                ListItem::new(line)
            })
            .collect();

        let list = List::new(items)
            .block(block.borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::BOLD));

        let mut state = ListState::default();
        state.select(Some(self.selected_index));

        frame.render_stateful_widget(list, area, &mut state);
    }

    fn get_node_style(kind: TreeNodeKind) -> Style {
        match kind {
            TreeNodeKind::Node => Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            TreeNodeKind::Field => Style::default().fg(Color::Green),
            TreeNodeKind::Leaf => Style::default().fg(Color::Yellow),
        }
    }
}
