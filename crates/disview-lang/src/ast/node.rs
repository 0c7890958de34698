use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::range::Range;

pub type Ident = SmolStr;

#[derive(PartialEq, Debug, Clone)]
pub struct Module {
    pub body: Vec<Stmt>,
    pub range: Range,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: Range,
}

#[derive(PartialEq, Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    Pass,
    Break,
    Continue,
    Return(Option<Expr>),
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
    },
    FunctionDef {
        name: Ident,
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
    ClassDef {
        name: Ident,
        bases: Vec<Expr>,
        body: Vec<Stmt>,
    },
}

#[derive(PartialEq, Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub range: Range,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: Range,
}

#[derive(PartialEq, Debug, Clone)]
pub enum ExprKind {
    Constant(Constant),
    Name(Ident, ExprContext),
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Expr>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Lambda {
        params: Vec<Param>,
        body: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Attribute {
        value: Box<Expr>,
        attr: Ident,
        ctx: ExprContext,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
        ctx: ExprContext,
    },
    List(Vec<Expr>, ExprContext),
    Tuple(Vec<Expr>, ExprContext),
}

impl Expr {
    /// Re-tags an assignment target with the `Store` context.
    ///
    /// Expressions that cannot be assigned to are returned unchanged and are
    /// rejected later by the compiler.
    pub fn into_store(self) -> Expr {
        let kind = match self.kind {
            ExprKind::Name(name, _) => ExprKind::Name(name, ExprContext::Store),
            ExprKind::Attribute { value, attr, .. } => ExprKind::Attribute {
                value,
                attr,
                ctx: ExprContext::Store,
            },
            ExprKind::Subscript { value, index, .. } => ExprKind::Subscript {
                value,
                index,
                ctx: ExprContext::Store,
            },
            ExprKind::Tuple(elts, _) => ExprKind::Tuple(
                elts.into_iter().map(Expr::into_store).collect(),
                ExprContext::Store,
            ),
            ExprKind::List(elts, _) => ExprKind::List(
                elts.into_iter().map(Expr::into_store).collect(),
                ExprContext::Store,
            ),
            kind => kind,
        };
        Expr {
            kind,
            range: self.range,
        }
    }

    pub fn is_store(&self) -> bool {
        match &self.kind {
            ExprKind::Name(_, ctx)
            | ExprKind::Attribute { ctx, .. }
            | ExprKind::Subscript { ctx, .. } => *ctx == ExprContext::Store,
            ExprKind::Tuple(elts, ctx) | ExprKind::List(elts, ctx) => {
                *ctx == ExprContext::Store && elts.iter().all(Expr::is_store)
            }
            _ => false,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

impl Display for Constant {
    /// Formats the constant the way it is written in source (`repr`-style).
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(n) => write!(f, "{}", n),
            Constant::Float(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{:.1}", n),
            Constant::Float(n) => write!(f, "{}", n),
            Constant::Str(s) => write!(f, "'{}'", s.escape_default()),
            Constant::Bool(true) => write!(f, "True"),
            Constant::Bool(false) => write!(f, "False"),
            Constant::None => write!(f, "None"),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum ExprContext {
    Load,
    Store,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mult => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum UnaryOp {
    USub,
    UAdd,
    Not,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
        }
    }
}

macro_rules! impl_kind_name {
    ($ty:ty, { $($variant:pat => $name:expr),* $(,)? }) => {
        impl $ty {
            pub fn kind_name(&self) -> &'static str {
                match self {
                    $($variant => $name),*
                }
            }
        }
    };
}

impl_kind_name!(StmtKind, {
    StmtKind::Expr(_) => "Expr",
    StmtKind::Assign { .. } => "Assign",
    StmtKind::AugAssign { .. } => "AugAssign",
    StmtKind::Pass => "Pass",
    StmtKind::Break => "Break",
    StmtKind::Continue => "Continue",
    StmtKind::Return(_) => "Return",
    StmtKind::If { .. } => "If",
    StmtKind::While { .. } => "While",
    StmtKind::For { .. } => "For",
    StmtKind::FunctionDef { .. } => "FunctionDef",
    StmtKind::ClassDef { .. } => "ClassDef",
});

impl_kind_name!(ExprKind, {
    ExprKind::Constant(_) => "Constant",
    ExprKind::Name(..) => "Name",
    ExprKind::BinOp { .. } => "BinOp",
    ExprKind::UnaryOp { .. } => "UnaryOp",
    ExprKind::BoolOp { .. } => "BoolOp",
    ExprKind::Compare { .. } => "Compare",
    ExprKind::IfExp { .. } => "IfExp",
    ExprKind::Lambda { .. } => "Lambda",
    ExprKind::Call { .. } => "Call",
    ExprKind::Attribute { .. } => "Attribute",
    ExprKind::Subscript { .. } => "Subscript",
    ExprKind::List(..) => "List",
    ExprKind::Tuple(..) => "Tuple",
});

impl_kind_name!(BinOp, {
    BinOp::Add => "Add",
    BinOp::Sub => "Sub",
    BinOp::Mult => "Mult",
    BinOp::Div => "Div",
    BinOp::FloorDiv => "FloorDiv",
    BinOp::Mod => "Mod",
    BinOp::Pow => "Pow",
});

impl_kind_name!(UnaryOp, {
    UnaryOp::USub => "USub",
    UnaryOp::UAdd => "UAdd",
    UnaryOp::Not => "Not",
});

impl_kind_name!(BoolOp, {
    BoolOp::And => "And",
    BoolOp::Or => "Or",
});

impl_kind_name!(CmpOp, {
    CmpOp::Eq => "Eq",
    CmpOp::NotEq => "NotEq",
    CmpOp::Lt => "Lt",
    CmpOp::LtE => "LtE",
    CmpOp::Gt => "Gt",
    CmpOp::GtE => "GtE",
});

impl_kind_name!(ExprContext, {
    ExprContext::Load => "Load",
    ExprContext::Store => "Store",
});
