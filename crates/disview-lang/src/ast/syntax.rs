use std::fmt::{self, Display, Formatter};

use super::node::{Constant, Expr, ExprContext, ExprKind, Ident, Module, Param, Stmt, StmtKind};
use crate::range::Range;

/// A uniform, reflective view of a syntax tree node.
///
/// Every node has a kind name, an optional declared name (functions and classes),
/// an optional source range and an ordered list of named fields.
#[derive(PartialEq, Debug, Clone)]
pub struct SyntaxNode {
    pub kind: &'static str,
    pub name: Option<Ident>,
    pub range: Option<Range>,
    pub fields: Vec<(&'static str, SyntaxValue)>,
}

#[derive(PartialEq, Debug, Clone)]
pub enum SyntaxValue {
    Node(SyntaxNode),
    List(Vec<SyntaxValue>),
    Primitive(Primitive),
}

#[derive(PartialEq, Debug, Clone)]
pub enum Primitive {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
}

impl Display for Primitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Str(s) => write!(f, "{}", Constant::Str(s.clone())),
            Primitive::Int(n) => write!(f, "{}", Constant::Int(*n)),
            Primitive::Float(n) => write!(f, "{}", Constant::Float(*n)),
            Primitive::Bool(b) => write!(f, "{}", Constant::Bool(*b)),
            Primitive::None => write!(f, "None"),
        }
    }
}

impl From<&Constant> for Primitive {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::Int(n) => Primitive::Int(*n),
            Constant::Float(n) => Primitive::Float(*n),
            Constant::Str(s) => Primitive::Str(s.clone()),
            Constant::Bool(b) => Primitive::Bool(*b),
            Constant::None => Primitive::None,
        }
    }
}

impl From<SyntaxNode> for SyntaxValue {
    fn from(node: SyntaxNode) -> Self {
        SyntaxValue::Node(node)
    }
}

impl From<Primitive> for SyntaxValue {
    fn from(primitive: Primitive) -> Self {
        SyntaxValue::Primitive(primitive)
    }
}

impl From<Vec<SyntaxNode>> for SyntaxValue {
    fn from(nodes: Vec<SyntaxNode>) -> Self {
        SyntaxValue::List(nodes.into_iter().map(SyntaxValue::Node).collect())
    }
}

impl SyntaxNode {
    fn new(kind: &'static str, range: Option<Range>) -> Self {
        Self {
            kind,
            name: None,
            range,
            fields: Vec::new(),
        }
    }

    /// A field-less node such as an operator or an expression context.
    fn leaf(kind: &'static str) -> Self {
        Self::new(kind, None)
    }

    fn named(mut self, name: &Ident) -> Self {
        self.name = Some(name.clone());
        self
    }

    fn field(mut self, name: &'static str, value: impl Into<SyntaxValue>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.fields.is_empty()
    }

    /// The kind name, followed by the declared name for functions and classes.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {}", self.kind, name),
            None => self.kind.to_string(),
        }
    }
}

fn name(ident: &Ident) -> Primitive {
    Primitive::Str(ident.to_string())
}

fn nodes<T>(items: &[T], f: impl Fn(&T) -> SyntaxNode) -> Vec<SyntaxNode> {
    items.iter().map(f).collect()
}

fn arguments(params: &[Param]) -> SyntaxNode {
    let range = match (params.first(), params.last()) {
        (Some(first), Some(last)) => Some(first.range.merge(&last.range)),
        _ => None,
    };

    SyntaxNode::new("arguments", range).field(
        "args",
        nodes(params, |param| {
            SyntaxNode::new("arg", Some(param.range)).field("arg", name(&param.name))
        }),
    )
}

fn context(ctx: ExprContext) -> SyntaxNode {
    SyntaxNode::leaf(ctx.kind_name())
}

impl Module {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new("Module", None).field("body", nodes(&self.body, Stmt::syntax))
    }
}

impl Stmt {
    pub fn syntax(&self) -> SyntaxNode {
        let node = SyntaxNode::new(self.kind.kind_name(), Some(self.range));

        match &self.kind {
            StmtKind::Expr(value) => node.field("value", value.syntax()),
            StmtKind::Assign { targets, value } => node
                .field("targets", nodes(targets, Expr::syntax))
                .field("value", value.syntax()),
            StmtKind::AugAssign { target, op, value } => node
                .field("target", target.syntax())
                .field("op", SyntaxNode::leaf(op.kind_name()))
                .field("value", value.syntax()),
            StmtKind::Pass | StmtKind::Break | StmtKind::Continue => node,
            StmtKind::Return(value) => node.field(
                "value",
                match value {
                    Some(value) => SyntaxValue::Node(value.syntax()),
                    None => SyntaxValue::Primitive(Primitive::None),
                },
            ),
            StmtKind::If { test, body, orelse } => node
                .field("test", test.syntax())
                .field("body", nodes(body, Stmt::syntax))
                .field("orelse", nodes(orelse, Stmt::syntax)),
            StmtKind::While { test, body } => node
                .field("test", test.syntax())
                .field("body", nodes(body, Stmt::syntax))
                .field("orelse", SyntaxValue::List(Vec::new())),
            StmtKind::For { target, iter, body } => node
                .field("target", target.syntax())
                .field("iter", iter.syntax())
                .field("body", nodes(body, Stmt::syntax))
                .field("orelse", SyntaxValue::List(Vec::new())),
            StmtKind::FunctionDef {
                name: ident,
                params,
                body,
            } => node
                .named(ident)
                .field("name", name(ident))
                .field("args", arguments(params))
                .field("body", nodes(body, Stmt::syntax))
                .field("decorator_list", SyntaxValue::List(Vec::new()))
                .field("returns", Primitive::None),
            StmtKind::ClassDef {
                name: ident,
                bases,
                body,
            } => node
                .named(ident)
                .field("name", name(ident))
                .field("bases", nodes(bases, Expr::syntax))
                .field("keywords", SyntaxValue::List(Vec::new()))
                .field("body", nodes(body, Stmt::syntax))
                .field("decorator_list", SyntaxValue::List(Vec::new())),
        }
    }
}

impl Expr {
    pub fn syntax(&self) -> SyntaxNode {
        let node = SyntaxNode::new(self.kind.kind_name(), Some(self.range));

        match &self.kind {
            ExprKind::Constant(value) => node.field("value", Primitive::from(value)),
            ExprKind::Name(id, ctx) => node.field("id", name(id)).field("ctx", context(*ctx)),
            ExprKind::BinOp { left, op, right } => node
                .field("left", left.syntax())
                .field("op", SyntaxNode::leaf(op.kind_name()))
                .field("right", right.syntax()),
            ExprKind::UnaryOp { op, operand } => node
                .field("op", SyntaxNode::leaf(op.kind_name()))
                .field("operand", operand.syntax()),
            ExprKind::BoolOp { op, values } => node
                .field("op", SyntaxNode::leaf(op.kind_name()))
                .field("values", nodes(values, Expr::syntax)),
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => node
                .field("left", left.syntax())
                .field("ops", nodes(ops, |op| SyntaxNode::leaf(op.kind_name())))
                .field("comparators", nodes(comparators, Expr::syntax)),
            ExprKind::IfExp { test, body, orelse } => node
                .field("test", test.syntax())
                .field("body", body.syntax())
                .field("orelse", orelse.syntax()),
            ExprKind::Lambda { params, body } => node
                .field("args", arguments(params))
                .field("body", body.syntax()),
            ExprKind::Call { func, args } => node
                .field("func", func.syntax())
                .field("args", nodes(args, Expr::syntax))
                .field("keywords", SyntaxValue::List(Vec::new())),
            ExprKind::Attribute { value, attr, ctx } => node
                .field("value", value.syntax())
                .field("attr", name(attr))
                .field("ctx", context(*ctx)),
            ExprKind::Subscript { value, index, ctx } => node
                .field("value", value.syntax())
                .field("slice", index.syntax())
                .field("ctx", context(*ctx)),
            ExprKind::List(elts, ctx) | ExprKind::Tuple(elts, ctx) => node
                .field("elts", nodes(elts, Expr::syntax))
                .field("ctx", context(*ctx)),
        }
    }
}
