use rustc_hash::FxHashMap;

use crate::ast::{Expr, ExprContext, ExprKind, Ident, Module, Param, Stmt, StmtKind};
use crate::range::Position;

/// Names resolved without any assignment in the snippet.
pub const BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "dict", "enumerate", "float", "int", "isinstance", "len", "list",
    "max", "min", "print", "range", "repr", "reversed", "set", "sorted", "str", "sum", "tuple",
    "type", "zip",
];

pub type ScopeId = usize;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
}

/// How a name is accessed from a particular scope.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum NameScope {
    /// Looked up by name at run time (module and class bodies).
    Name,
    Local,
    /// A local captured by a nested function.
    Cell,
    /// A variable captured from an enclosing function.
    Free,
    Global,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Parameters first, then every other assigned name in order of first appearance.
    pub locals: Vec<Ident>,
    pub cells: Vec<Ident>,
    pub frees: Vec<Ident>,
    uses: Vec<Ident>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            locals: Vec::new(),
            cells: Vec::new(),
            frees: Vec::new(),
            uses: Vec::new(),
        }
    }

    fn declare(&mut self, name: &Ident) {
        if !self.locals.contains(name) {
            self.locals.push(name.clone());
        }
    }

    fn reference(&mut self, name: &Ident) {
        if !self.uses.contains(name) {
            self.uses.push(name.clone());
        }
    }
}

/// Scope analysis of a module, computed before code generation.
///
/// Function, lambda and class scopes are keyed by the start position of the
/// node that introduces them.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    by_position: FxHashMap<Position, ScopeId>,
}

impl SymbolTable {
    pub const ROOT: ScopeId = 0;

    pub fn build(module: &Module) -> Self {
        let mut table = Self {
            scopes: vec![Scope::new(ScopeKind::Module, None)],
            by_position: FxHashMap::default(),
        };

        for stmt in &module.body {
            table.visit_stmt(Self::ROOT, stmt);
        }
        table.analyze();
        table
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn scope_at(&self, position: &Position) -> Option<ScopeId> {
        self.by_position.get(position).copied()
    }

    pub fn resolve(&self, id: ScopeId, name: &str) -> NameScope {
        let scope = &self.scopes[id];
        match scope.kind {
            ScopeKind::Module | ScopeKind::Class => NameScope::Name,
            ScopeKind::Function if scope.cells.iter().any(|n| n == name) => NameScope::Cell,
            ScopeKind::Function if scope.locals.iter().any(|n| n == name) => NameScope::Local,
            ScopeKind::Function if scope.frees.iter().any(|n| n == name) => NameScope::Free,
            ScopeKind::Function => NameScope::Global,
        }
    }

    /// Whether `name` refers to a builtin from scope `id`, i.e. nothing shadows it.
    pub fn is_builtin(&self, id: ScopeId, name: &str) -> bool {
        BUILTINS.contains(&name)
            && !self.scopes[id].locals.iter().any(|n| n == name)
            && !self.scopes[Self::ROOT].locals.iter().any(|n| n == name)
            && !self.scopes[id].frees.iter().any(|n| n == name)
    }

    fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId, position: Position) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(kind, Some(parent)));
        self.by_position.insert(position, id);
        id
    }

    fn visit_function(
        &mut self,
        parent: ScopeId,
        position: Position,
        params: &[Param],
        visit: impl FnOnce(&mut Self, ScopeId),
    ) {
        let scope = self.push_scope(ScopeKind::Function, parent, position);
        for param in params {
            self.scopes[scope].declare(&param.name);
        }
        visit(self, scope);
    }

    fn visit_body(&mut self, current: ScopeId, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(current, stmt);
        }
    }

    fn visit_stmt(&mut self, current: ScopeId, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(value) => self.visit_expr(current, value),
            StmtKind::Assign { targets, value } => {
                self.visit_expr(current, value);
                for target in targets {
                    self.visit_expr(current, target);
                }
            }
            StmtKind::AugAssign { target, value, .. } => {
                if let ExprKind::Name(name, _) = &target.kind {
                    self.scopes[current].reference(name);
                }
                self.visit_expr(current, value);
                self.visit_expr(current, target);
            }
            StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.visit_expr(current, value);
                }
            }
            StmtKind::If { test, body, orelse } => {
                self.visit_expr(current, test);
                self.visit_body(current, body);
                self.visit_body(current, orelse);
            }
            StmtKind::While { test, body } => {
                self.visit_expr(current, test);
                self.visit_body(current, body);
            }
            StmtKind::For { target, iter, body } => {
                self.visit_expr(current, iter);
                self.visit_expr(current, target);
                self.visit_body(current, body);
            }
            StmtKind::FunctionDef { name, params, body } => {
                self.scopes[current].declare(name);
                self.visit_function(current, stmt.range.start, params, |table, scope| {
                    table.visit_body(scope, body)
                });
            }
            StmtKind::ClassDef { name, bases, body } => {
                for base in bases {
                    self.visit_expr(current, base);
                }
                self.scopes[current].declare(name);
                let scope = self.push_scope(ScopeKind::Class, current, stmt.range.start);
                self.visit_body(scope, body);
            }
        }
    }

    fn visit_expr(&mut self, current: ScopeId, expr: &Expr) {
        match &expr.kind {
            ExprKind::Constant(_) => {}
            ExprKind::Name(name, ExprContext::Store) => self.scopes[current].declare(name),
            ExprKind::Name(name, ExprContext::Load) => self.scopes[current].reference(name),
            ExprKind::BinOp { left, right, .. } => {
                self.visit_expr(current, left);
                self.visit_expr(current, right);
            }
            ExprKind::UnaryOp { operand, .. } => self.visit_expr(current, operand),
            ExprKind::BoolOp { values, .. } => {
                for value in values {
                    self.visit_expr(current, value);
                }
            }
            ExprKind::Compare {
                left, comparators, ..
            } => {
                self.visit_expr(current, left);
                for comparator in comparators {
                    self.visit_expr(current, comparator);
                }
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.visit_expr(current, test);
                self.visit_expr(current, body);
                self.visit_expr(current, orelse);
            }
            ExprKind::Lambda { params, body } => {
                self.visit_function(current, expr.range.start, params, |table, scope| {
                    table.visit_expr(scope, body)
                });
            }
            ExprKind::Call { func, args } => {
                self.visit_expr(current, func);
                for arg in args {
                    self.visit_expr(current, arg);
                }
            }
            ExprKind::Attribute { value, .. } => self.visit_expr(current, value),
            ExprKind::Subscript { value, index, .. } => {
                self.visit_expr(current, value);
                self.visit_expr(current, index);
            }
            ExprKind::List(elts, _) | ExprKind::Tuple(elts, _) => {
                for elt in elts {
                    self.visit_expr(current, elt);
                }
            }
        }
    }

    /// Marks captured locals as cells and threads free variables through every
    /// scope between the capturing function and the owner.
    fn analyze(&mut self) {
        for id in 0..self.scopes.len() {
            if self.scopes[id].kind != ScopeKind::Function {
                continue;
            }

            for name in self.scopes[id].uses.clone() {
                if self.scopes[id].locals.contains(&name) {
                    continue;
                }

                let mut chain = vec![id];
                let mut cursor = self.scopes[id].parent;
                while let Some(parent) = cursor {
                    let kind = self.scopes[parent].kind;
                    let owns = self.scopes[parent].locals.contains(&name);
                    match kind {
                        ScopeKind::Module => break,
                        ScopeKind::Function if owns => {
                            if !self.scopes[parent].cells.contains(&name) {
                                self.scopes[parent].cells.push(name.clone());
                            }
                            for &free in &chain {
                                if !self.scopes[free].frees.contains(&name) {
                                    self.scopes[free].frees.push(name.clone());
                                }
                            }
                            break;
                        }
                        ScopeKind::Function | ScopeKind::Class => {
                            chain.push(parent);
                            cursor = self.scopes[parent].parent;
                        }
                    }
                }
            }
        }
    }
}
