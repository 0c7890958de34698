use disview_lang::{Position, Range, SyntaxNode, SyntaxValue};

/// Child indices from the root down to a node.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeNodeKind {
    /// A syntax node, labelled with its kind (and declared name, if any).
    Node,
    /// A named field of a syntax node.
    Field,
    /// A primitive value.
    Leaf,
}

/// One row of the structure tree view.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub label: String,
    pub kind: TreeNodeKind,
    pub range: Option<Range>,
    /// `false` for syntax nodes without fields and for primitive values.
    pub allow_expand: bool,
    pub children: Vec<TreeNode>,
}

/// Whether a field value is worth showing; empty lists are not.
pub fn maybe_add(value: &SyntaxValue) -> bool {
    !matches!(value, SyntaxValue::List(items) if items.is_empty())
}

pub fn build(root: &SyntaxNode) -> TreeNode {
    TreeNode::from_syntax(root)
}

impl TreeNode {
    fn from_syntax(node: &SyntaxNode) -> Self {
        let children = node
            .fields
            .iter()
            .filter(|(_, value)| maybe_add(value))
            .map(|(name, value)| {
                let mut field = TreeNode {
                    label: name.to_string(),
                    kind: TreeNodeKind::Field,
                    range: None,
                    allow_expand: true,
                    children: Vec::new(),
                };
                field.add(value);
                field
            })
            .collect();

        TreeNode {
            label: node.label(),
            kind: TreeNodeKind::Node,
            range: node.range,
            allow_expand: !node.is_leaf(),
            children,
        }
    }

    fn add(&mut self, value: &SyntaxValue) {
        match value {
            SyntaxValue::Node(node) => self.children.push(TreeNode::from_syntax(node)),
            SyntaxValue::List(items) => items.iter().for_each(|item| self.add(item)),
            SyntaxValue::Primitive(primitive) => self.children.push(TreeNode {
                label: primitive.to_string(),
                kind: TreeNodeKind::Leaf,
                range: None,
                allow_expand: false,
                children: Vec::new(),
            }),
        }
    }

    pub fn get(&self, path: &[usize]) -> Option<&TreeNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Path to the innermost syntax node whose range contains `position`.
    pub fn locate(&self, position: &Position) -> Option<NodePath> {
        let mut path = Vec::new();
        self.locate_in(position, &mut path).then_some(path)
    }

    fn locate_in(&self, position: &Position, path: &mut Vec<usize>) -> bool {
        for (index, child) in self.children.iter().enumerate() {
            path.push(index);
            if child.locate_in(position, path) {
                return true;
            }
            path.pop();
        }

        self.range.is_some_and(|range| range.contains(position))
    }

    /// Path to the outermost syntax node that starts on `line`.
    pub fn locate_line(&self, line: u32) -> Option<NodePath> {
        if self.range.is_some_and(|range| range.start.line == line) {
            return Some(Vec::new());
        }

        self.children.iter().enumerate().find_map(|(index, child)| {
            child.locate_line(line).map(|mut path| {
                path.insert(0, index);
                path
            })
        })
    }

    /// Number of nodes in the tree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeNode::node_count)
            .sum::<usize>()
    }

    /// The tree as an indented outline, two spaces per level.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.label);
        out.push('\n');
        for child in &self.children {
            child.write_outline(out, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tree(code: &str) -> TreeNode {
        build(&disview_lang::parse(code).unwrap().syntax())
    }

    fn labels(node: &TreeNode) -> Vec<&str> {
        node.children.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn test_assignment_shape() {
        let root = tree("x = 1");
        assert_eq!(root.label, "Module");
        assert_eq!(labels(&root), vec!["body"]);

        let assign = root.get(&[0, 0]).unwrap();
        assert_eq!(assign.label, "Assign");
        assert_eq!(assign.kind, TreeNodeKind::Node);
        assert_eq!(labels(assign), vec!["targets", "value"]);

        let value = assign.get(&[1, 0, 0, 0]).unwrap();
        assert_eq!(value.label, "1");
        assert_eq!(value.kind, TreeNodeKind::Leaf);
        assert!(!value.allow_expand);
    }

    #[test]
    fn test_empty_list_fields_are_skipped() {
        let root = tree("def f():\n  pass");
        let function = root.get(&[0, 0]).unwrap();

        assert_eq!(function.label, "FunctionDef f");
        assert_eq!(labels(function), vec!["name", "args", "body", "returns"]);

        let args = function.get(&[1, 0]).unwrap();
        assert_eq!(args.label, "arguments");
        assert!(args.children.is_empty());
    }

    #[test]
    fn test_fieldless_node_cannot_expand() {
        let root = tree("x");
        let ctx = root.get(&[0, 0, 0, 0, 1, 0]).unwrap();

        assert_eq!(ctx.label, "Load");
        assert!(!ctx.allow_expand);
        assert_eq!(ctx.range, None);
    }

    #[rstest]
    #[case::name(Position::new(2, 5), "Name")]
    #[case::operator(Position::new(2, 7), "BinOp")]
    #[case::statement(Position::new(2, 3), "Assign")]
    #[case::constant(Position::new(1, 5), "Constant")]
    #[case::cursor_after_constant(Position::new(1, 6), "Constant")]
    #[case::cursor_at_line_end(Position::new(2, 10), "Constant")]
    fn test_locate(#[case] position: Position, #[case] expected: &str) {
        let root = tree("a = 1\nb = a + 2");
        let path = root.locate(&position).unwrap();
        assert_eq!(root.get(&path).unwrap().label, expected);
    }

    #[test]
    fn test_locate_line() {
        let root = tree("x = 1\nif x:\n    y = 2");
        let path = root.locate_line(3).unwrap();
        assert_eq!(root.get(&path).unwrap().label, "Assign");
        assert_eq!(
            root.get(&root.locate_line(2).unwrap()).unwrap().label,
            "If"
        );
        assert_eq!(root.locate_line(9), None);
    }

    #[test]
    fn test_node_count() {
        assert_eq!(tree("pass").node_count(), 3);
    }

    #[test]
    fn test_outline() {
        assert_eq!(
            tree("pass").outline(),
            "Module\n  body\n    Pass\n"
        );
    }
}
