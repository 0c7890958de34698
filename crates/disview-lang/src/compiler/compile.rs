use std::mem;

use smol_str::SmolStr;

use crate::ast::{
    BinOp, BoolOp, CmpOp, Constant, Expr, ExprContext, ExprKind, Ident, Module, Stmt, StmtKind,
    UnaryOp,
};
use crate::code::{
    ArgValue, CodeArena, CodeUnit, CompiledProgram, INSTRUCTION_SIZE, Instruction, Opcode,
    UnitId, UnitKind,
};
use crate::range::Range;

use super::error::CompileError;
use super::symtable::{NameScope, ScopeId, SymbolTable};

const COMPARE_OPS: [CmpOp; 6] = [
    CmpOp::Lt,
    CmpOp::LtE,
    CmpOp::Eq,
    CmpOp::NotEq,
    CmpOp::Gt,
    CmpOp::GtE,
];
const INPLACE_OFFSET: u32 = 13;
const MAKE_FUNCTION_CLOSURE: u32 = 0x08;
const INTRINSIC_UNARY_POSITIVE: u32 = 5;

/// What is statically known about the value an expression leaves on the stack.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum Operand {
    Int,
    Float,
    Str,
    Bool,
    NoneValue,
    List,
    Tuple,
    Range,
    Builtin,
    RangeBuiltin,
    Unknown,
}

impl Operand {
    fn of(constant: &Constant) -> Self {
        match constant {
            Constant::Int(_) => Operand::Int,
            Constant::Float(_) => Operand::Float,
            Constant::Str(_) => Operand::Str,
            Constant::Bool(_) => Operand::Bool,
            Constant::None => Operand::NoneValue,
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, Operand::Int | Operand::Float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Label(usize);

#[derive(Debug)]
enum PendingArg {
    None,
    Value {
        arg: u32,
        argval: ArgValue,
        argrepr: String,
    },
    Jump(Label),
}

#[derive(Debug)]
struct Pending {
    opcode: Opcode,
    specialized: Option<Opcode>,
    arg: PendingArg,
    range: Option<Range>,
}

#[derive(Debug, Clone, Copy)]
struct Loop {
    start: Label,
    exit: Label,
    is_for: bool,
}

/// Instruction buffer for the code unit currently being compiled.
#[derive(Debug)]
struct UnitBuilder {
    id: UnitId,
    scope: ScopeId,
    kind: UnitKind,
    code: Vec<Pending>,
    labels: Vec<Option<usize>>,
    consts: Vec<ArgValue>,
    names: Vec<Ident>,
    varnames: Vec<Ident>,
    cellvars: Vec<Ident>,
    freevars: Vec<Ident>,
    loops: Vec<Loop>,
    location: Option<Range>,
}

impl UnitBuilder {
    fn new(id: UnitId, kind: UnitKind, scope: ScopeId, symtable: &SymbolTable) -> Self {
        let table = symtable.scope(scope);
        let varnames = match kind {
            UnitKind::Function | UnitKind::Lambda => table.locals.clone(),
            UnitKind::Module | UnitKind::Class => Vec::new(),
        };

        Self {
            id,
            scope,
            kind,
            code: Vec::new(),
            labels: Vec::new(),
            consts: Vec::new(),
            names: Vec::new(),
            varnames,
            cellvars: table.cells.clone(),
            freevars: table.frees.clone(),
            loops: Vec::new(),
            location: None,
        }
    }

    fn emit(&mut self, opcode: Opcode) {
        self.code.push(Pending {
            opcode,
            specialized: None,
            arg: PendingArg::None,
            range: self.location,
        });
    }

    fn emit_arg(&mut self, opcode: Opcode, arg: u32, argval: ArgValue, argrepr: impl Into<String>) {
        self.code.push(Pending {
            opcode,
            specialized: None,
            arg: PendingArg::Value {
                arg,
                argval,
                argrepr: argrepr.into(),
            },
            range: self.location,
        });
    }

    fn emit_name(&mut self, opcode: Opcode, arg: u32, name: &Ident) {
        self.emit_arg(opcode, arg, ArgValue::Name(name.clone()), name.as_str());
    }

    fn emit_count(&mut self, opcode: Opcode, count: usize) {
        self.emit_arg(opcode, count as u32, ArgValue::Int(count as u32), "");
    }

    fn emit_jump(&mut self, opcode: Opcode, label: Label) {
        self.code.push(Pending {
            opcode,
            specialized: None,
            arg: PendingArg::Jump(label),
            range: self.location,
        });
    }

    /// Records the specialised form of the most recently emitted instruction.
    fn specialize(&mut self, opcode: Option<Opcode>) {
        if let Some(last) = self.code.last_mut() {
            last.specialized = opcode;
        }
    }

    fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    fn bind(&mut self, label: Label) {
        self.labels[label.0] = Some(self.code.len());
    }

    fn const_index(&mut self, value: ArgValue) -> u32 {
        match self.consts.iter().position(|c| *c == value) {
            Some(index) => index as u32,
            None => {
                self.consts.push(value);
                (self.consts.len() - 1) as u32
            }
        }
    }

    fn name_index(&mut self, name: &Ident) -> u32 {
        match self.names.iter().position(|n| n == name) {
            Some(index) => index as u32,
            None => {
                self.names.push(name.clone());
                (self.names.len() - 1) as u32
            }
        }
    }

    fn varname_index(&self, name: &str) -> u32 {
        self.varnames
            .iter()
            .position(|n| n == name)
            .unwrap_or_default() as u32
    }

    /// Index of a cell or free variable in the unit's combined local storage.
    fn deref_index(&self, name: &str) -> u32 {
        if let Some(index) = self.varnames.iter().position(|n| n == name) {
            return index as u32;
        }
        if let Some(index) = self.cellvars.iter().position(|n| n == name) {
            return (self.varnames.len() + index) as u32;
        }
        let free = self.freevars.iter().position(|n| n == name).unwrap_or_default();
        (self.varnames.len() + self.cellvars.len() + free) as u32
    }

    fn load_const(&mut self, constant: &Constant) {
        let index = self.const_index(ArgValue::Const(constant.clone()));
        self.emit_arg(
            Opcode::LOAD_CONST,
            index,
            ArgValue::Const(constant.clone()),
            constant.to_string(),
        );
    }

    fn label_offset(&self, label: Label) -> usize {
        self.labels[label.0].unwrap_or(self.code.len()) * INSTRUCTION_SIZE
    }

    /// Resolves labels into offsets and produces the base and specialised streams.
    fn assemble(&self) -> (Vec<Instruction>, Vec<Instruction>) {
        let mut targets = self
            .code
            .iter()
            .filter_map(|pending| match pending.arg {
                PendingArg::Jump(label) => Some(self.label_offset(label)),
                _ => None,
            })
            .collect::<Vec<_>>();
        targets.sort_unstable();
        targets.dedup();

        let mut previous_line = None;
        let instructions = self
            .code
            .iter()
            .enumerate()
            .map(|(index, pending)| {
                let offset = index * INSTRUCTION_SIZE;
                let line = pending.range.map(|range| range.start.line);
                let starts_line = match line {
                    Some(line) if previous_line != Some(line) => {
                        previous_line = Some(line);
                        Some(line)
                    }
                    _ => None,
                };
                let label = targets
                    .binary_search(&offset)
                    .ok()
                    .map(|position| position + 1);

                let (opcode, arg, argval, argrepr, jump_target) = match &pending.arg {
                    PendingArg::None => (pending.opcode, None, ArgValue::None, String::new(), None),
                    PendingArg::Value {
                        arg,
                        argval,
                        argrepr,
                    } => (
                        pending.opcode,
                        Some(*arg),
                        argval.clone(),
                        argrepr.clone(),
                        None,
                    ),
                    PendingArg::Jump(label) => {
                        let target = self.label_offset(*label);
                        let next = offset + INSTRUCTION_SIZE;
                        let (opcode, delta) = match pending.opcode {
                            Opcode::JUMP_FORWARD if target < next => {
                                (Opcode::JUMP_BACKWARD, next - target)
                            }
                            opcode => (opcode, target.saturating_sub(next)),
                        };
                        let number = targets
                            .binary_search(&target)
                            .map(|position| position + 1)
                            .unwrap_or_default();
                        (
                            opcode,
                            Some((delta / INSTRUCTION_SIZE) as u32),
                            ArgValue::Offset(target),
                            format!("to L{}", number),
                            Some(target),
                        )
                    }
                };

                (
                    Instruction {
                        offset,
                        opcode,
                        arg,
                        argval,
                        argrepr,
                        range: pending.range,
                        starts_line,
                        jump_target,
                        label,
                        is_jump_target: label.is_some(),
                    },
                    pending.specialized,
                )
            })
            .collect::<Vec<_>>();

        let adaptive = instructions
            .iter()
            .map(|(instruction, specialized)| Instruction {
                opcode: specialized.unwrap_or(instruction.opcode),
                ..instruction.clone()
            })
            .collect();
        let base = instructions
            .into_iter()
            .map(|(instruction, _)| instruction)
            .collect();

        (base, adaptive)
    }
}

/// Generates code units for a parsed module.
pub struct Compiler<'a> {
    symtable: &'a SymbolTable,
    units: CodeArena,
    unit: UnitBuilder,
}

impl<'a> Compiler<'a> {
    pub fn new(symtable: &'a SymbolTable) -> Self {
        let mut units = CodeArena::new(8);
        let root = units.alloc(CodeUnit::new(
            SmolStr::new_static("<module>"),
            UnitKind::Module,
            None,
        ));

        Self {
            symtable,
            unit: UnitBuilder::new(root, UnitKind::Module, SymbolTable::ROOT, symtable),
            units,
        }
    }

    pub fn compile(mut self, module: &Module) -> Result<CompiledProgram, CompileError> {
        let root = self.unit.id;
        self.unit.emit_arg(Opcode::RESUME, 0, ArgValue::Int(0), "");
        self.compile_body(&module.body)?;
        self.finish_unit(&module.body);

        let builder = mem::replace(
            &mut self.unit,
            UnitBuilder::new(root, UnitKind::Module, SymbolTable::ROOT, self.symtable),
        );
        self.store_unit(builder);

        Ok(CompiledProgram {
            units: self.units,
            root,
        })
    }

    fn compile_body(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        for stmt in body {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    /// Appends the implicit `return None` unless the body already ends in a return.
    fn finish_unit(&mut self, body: &[Stmt]) {
        if matches!(body.last(), Some(Stmt { kind: StmtKind::Return(_), .. })) {
            return;
        }
        self.unit.location = body.last().map(|stmt| stmt.range);
        self.return_const(&Constant::None);
    }

    fn store_unit(&mut self, builder: UnitBuilder) {
        let (instructions, adaptive) = builder.assemble();

        if let Some(unit) = self.units.get_mut(builder.id) {
            unit.names = builder.names;
            unit.varnames = builder.varnames;
            unit.cellvars = builder.cellvars;
            unit.freevars = builder.freevars;
            unit.instructions = instructions;
            unit.adaptive = adaptive;
        }
    }

    /// Starts a nested unit; returns the parent builder to hand back to [`Self::leave_unit`].
    fn enter_unit(&mut self, name: Ident, kind: UnitKind, range: Range) -> UnitBuilder {
        let scope = self
            .symtable
            .scope_at(&range.start)
            .unwrap_or(self.unit.scope);
        let id = self.units.alloc(CodeUnit::new(name, kind, Some(range)));
        let parent = mem::replace(
            &mut self.unit,
            UnitBuilder::new(id, kind, scope, self.symtable),
        );

        for index in 0..self.unit.cellvars.len() {
            let name = self.unit.cellvars[index].clone();
            let arg = self.unit.deref_index(&name);
            self.unit.emit_name(Opcode::MAKE_CELL, arg, &name);
        }
        if !self.unit.freevars.is_empty() {
            let count = self.unit.freevars.len();
            self.unit.emit_count(Opcode::COPY_FREE_VARS, count);
        }

        self.unit.location = Some(range);
        self.unit.emit_arg(Opcode::RESUME, 0, ArgValue::Int(0), "");
        parent
    }

    /// Finishes the current unit, restores `parent` and emits the code that creates the function.
    fn leave_unit(&mut self, parent: UnitBuilder, location: Range) -> UnitId {
        let child = mem::replace(&mut self.unit, parent);
        let id = child.id;
        let name = self.units[id].name.clone();
        let line = self.units[id].first_line().unwrap_or_default();
        let freevars = child.freevars.clone();
        self.store_unit(child);

        self.unit.location = Some(location);
        if !freevars.is_empty() {
            for free in &freevars {
                let arg = self.unit.deref_index(free);
                self.unit.emit_name(Opcode::LOAD_CLOSURE, arg, free);
            }
            self.unit.emit_count(Opcode::BUILD_TUPLE, freevars.len());
        }

        let index = self.unit.const_index(ArgValue::Code(id));
        self.unit.emit_arg(
            Opcode::LOAD_CONST,
            index,
            ArgValue::Code(id),
            format!("<code object {} at {}, line {}>", name, id, line),
        );
        let flags = if freevars.is_empty() {
            0
        } else {
            MAKE_FUNCTION_CLOSURE
        };
        self.unit.emit_arg(
            Opcode::MAKE_FUNCTION,
            flags,
            ArgValue::Int(flags),
            if freevars.is_empty() { "" } else { "closure" },
        );
        id
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        self.unit.location = Some(stmt.range);

        match &stmt.kind {
            StmtKind::Expr(value) => {
                if let ExprKind::Constant(_) = value.kind {
                    self.unit.emit(Opcode::NOP);
                } else {
                    self.compile_expr(value)?;
                    self.unit.emit(Opcode::POP_TOP);
                }
            }
            StmtKind::Assign { targets, value } => {
                self.compile_expr(value)?;
                self.unit.location = Some(stmt.range);
                for (i, target) in targets.iter().enumerate() {
                    if i + 1 < targets.len() {
                        self.unit.emit_count(Opcode::COPY, 1);
                    }
                    self.compile_store(target)?;
                }
            }
            StmtKind::AugAssign { target, op, value } => {
                self.compile_aug_assign(target, *op, value)?
            }
            StmtKind::Pass => self.unit.emit(Opcode::NOP),
            StmtKind::Break => {
                let Some(current) = self.unit.loops.last().copied() else {
                    return Err(CompileError::BreakOutsideLoop(stmt.range));
                };
                if current.is_for {
                    self.unit.emit(Opcode::POP_TOP);
                }
                self.unit.emit_jump(Opcode::JUMP_FORWARD, current.exit);
            }
            StmtKind::Continue => {
                let Some(current) = self.unit.loops.last().copied() else {
                    return Err(CompileError::ContinueOutsideLoop(stmt.range));
                };
                self.unit.emit_jump(Opcode::JUMP_FORWARD, current.start);
            }
            StmtKind::Return(value) => {
                if !matches!(self.unit.kind, UnitKind::Function | UnitKind::Lambda) {
                    return Err(CompileError::ReturnOutsideFunction(stmt.range));
                }
                match value {
                    None => self.return_const(&Constant::None),
                    Some(Expr {
                        kind: ExprKind::Constant(constant),
                        ..
                    }) => self.return_const(constant),
                    Some(value) => {
                        self.compile_expr(value)?;
                        self.unit.emit(Opcode::RETURN_VALUE);
                    }
                }
            }
            StmtKind::If { test, body, orelse } => {
                let orelse_label = self.unit.new_label();
                let end = self.unit.new_label();

                self.compile_expr(test)?;
                self.unit.emit_jump(Opcode::POP_JUMP_IF_FALSE, orelse_label);
                self.compile_body(body)?;
                if !orelse.is_empty() {
                    self.unit.location = Some(stmt.range);
                    self.unit.emit_jump(Opcode::JUMP_FORWARD, end);
                }
                self.unit.bind(orelse_label);
                self.compile_body(orelse)?;
                self.unit.bind(end);
            }
            StmtKind::While { test, body } => {
                let start = self.unit.new_label();
                let exit = self.unit.new_label();

                self.unit.bind(start);
                self.compile_expr(test)?;
                self.unit.emit_jump(Opcode::POP_JUMP_IF_FALSE, exit);
                self.compile_loop_body(start, exit, false, body)?;
                self.unit.location = Some(stmt.range);
                self.unit.emit_jump(Opcode::JUMP_FORWARD, start);
                self.unit.bind(exit);
            }
            StmtKind::For { target, iter, body } => {
                let start = self.unit.new_label();
                let cleanup = self.unit.new_label();
                let exit = self.unit.new_label();

                let iterable = self.compile_expr(iter)?;
                self.unit.location = Some(stmt.range);
                self.unit.emit(Opcode::GET_ITER);
                self.unit.bind(start);
                self.unit.emit_jump(Opcode::FOR_ITER, cleanup);
                self.unit.specialize(match iterable {
                    Operand::Range => Some(Opcode::FOR_ITER_RANGE),
                    Operand::List => Some(Opcode::FOR_ITER_LIST),
                    Operand::Tuple => Some(Opcode::FOR_ITER_TUPLE),
                    _ => None,
                });
                self.compile_store(target)?;
                self.compile_loop_body(start, exit, true, body)?;
                self.unit.location = Some(stmt.range);
                self.unit.emit_jump(Opcode::JUMP_FORWARD, start);
                self.unit.bind(cleanup);
                self.unit.emit(Opcode::END_FOR);
                self.unit.bind(exit);
            }
            StmtKind::FunctionDef { name, body, .. } => {
                self.compile_function(name.clone(), UnitKind::Function, stmt.range, |c| {
                    c.compile_body(body)?;
                    c.finish_unit(body);
                    Ok(())
                })?;
                self.unit.location = Some(stmt.range);
                self.store_name(name);
            }
            StmtKind::ClassDef { name, bases, body } => {
                self.unit.emit(Opcode::PUSH_NULL);
                self.unit.emit(Opcode::LOAD_BUILD_CLASS);

                let parent = self.enter_unit(name.clone(), UnitKind::Class, stmt.range);
                let dunder_name = SmolStr::new_static("__name__");
                let dunder_module = SmolStr::new_static("__module__");
                let dunder_qualname = SmolStr::new_static("__qualname__");
                self.load_name(&dunder_name);
                self.store_name(&dunder_module);
                self.unit.load_const(&Constant::Str(name.to_string()));
                self.store_name(&dunder_qualname);
                self.compile_body(body)?;
                self.finish_unit(body);
                self.leave_unit(parent, stmt.range);

                self.unit.load_const(&Constant::Str(name.to_string()));
                for base in bases {
                    self.compile_expr(base)?;
                }
                self.unit.location = Some(stmt.range);
                self.unit.emit_count(Opcode::CALL, 2 + bases.len());
                self.store_name(name);
            }
        }

        Ok(())
    }

    fn compile_loop_body(
        &mut self,
        start: Label,
        exit: Label,
        is_for: bool,
        body: &[Stmt],
    ) -> Result<(), CompileError> {
        self.unit.loops.push(Loop {
            start,
            exit,
            is_for,
        });
        let result = self.compile_body(body);
        self.unit.loops.pop();
        result
    }

    fn compile_function(
        &mut self,
        name: Ident,
        kind: UnitKind,
        range: Range,
        body: impl FnOnce(&mut Self) -> Result<(), CompileError>,
    ) -> Result<UnitId, CompileError> {
        let parent = self.enter_unit(name, kind, range);
        body(self)?;
        Ok(self.leave_unit(parent, range))
    }

    fn compile_aug_assign(
        &mut self,
        target: &Expr,
        op: BinOp,
        value: &Expr,
    ) -> Result<(), CompileError> {
        let (arg, argrepr) = Self::binary_op_arg(op);
        let arg = arg + INPLACE_OFFSET;
        let argrepr = format!("{}=", argrepr);

        match &target.kind {
            ExprKind::Name(name, _) => {
                self.load_name(name);
                self.compile_expr(value)?;
                self.unit.emit_arg(Opcode::BINARY_OP, arg, ArgValue::Int(arg), argrepr);
                self.store_name(name);
            }
            ExprKind::Attribute {
                value: object,
                attr,
                ..
            } => {
                self.compile_expr(object)?;
                self.unit.emit_count(Opcode::COPY, 1);
                self.load_attr(attr, false);
                self.compile_expr(value)?;
                self.unit.emit_arg(Opcode::BINARY_OP, arg, ArgValue::Int(arg), argrepr);
                self.unit.emit_count(Opcode::SWAP, 2);
                self.store_attr(attr);
            }
            ExprKind::Subscript {
                value: object,
                index,
                ..
            } => {
                self.compile_expr(object)?;
                self.compile_expr(index)?;
                self.unit.emit_count(Opcode::COPY, 2);
                self.unit.emit_count(Opcode::COPY, 2);
                self.unit.emit(Opcode::BINARY_SUBSCR);
                self.compile_expr(value)?;
                self.unit.emit_arg(Opcode::BINARY_OP, arg, ArgValue::Int(arg), argrepr);
                self.unit.emit_count(Opcode::SWAP, 3);
                self.unit.emit_count(Opcode::SWAP, 2);
                self.unit.emit(Opcode::STORE_SUBSCR);
            }
            _ => {
                return Err(CompileError::InvalidAssignmentTarget(
                    target.range,
                    Self::describe(target),
                ));
            }
        }

        Ok(())
    }

    fn compile_store(&mut self, target: &Expr) -> Result<(), CompileError> {
        let saved = self.unit.location.replace(target.range);
        let result = self.compile_store_kind(target);
        self.unit.location = saved;
        result
    }

    fn compile_store_kind(&mut self, target: &Expr) -> Result<(), CompileError> {
        match &target.kind {
            ExprKind::Name(name, ExprContext::Store) => self.store_name(name),
            ExprKind::Attribute {
                value,
                attr,
                ctx: ExprContext::Store,
            } => {
                self.compile_expr(value)?;
                self.store_attr(attr);
            }
            ExprKind::Subscript {
                value,
                index,
                ctx: ExprContext::Store,
            } => {
                self.compile_expr(value)?;
                self.compile_expr(index)?;
                self.unit.emit(Opcode::STORE_SUBSCR);
            }
            ExprKind::Tuple(elts, ExprContext::Store) | ExprKind::List(elts, ExprContext::Store) => {
                self.unit.emit_count(Opcode::UNPACK_SEQUENCE, elts.len());
                for elt in elts {
                    self.compile_store(elt)?;
                }
            }
            _ => {
                return Err(CompileError::InvalidAssignmentTarget(
                    target.range,
                    Self::describe(target),
                ));
            }
        }

        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<Operand, CompileError> {
        let saved = self.unit.location.replace(expr.range);
        let result = self.compile_expr_kind(expr);
        self.unit.location = saved;
        result
    }

    fn compile_expr_kind(&mut self, expr: &Expr) -> Result<Operand, CompileError> {
        match &expr.kind {
            ExprKind::Constant(constant) => {
                self.unit.load_const(constant);
                Ok(Operand::of(constant))
            }
            ExprKind::Name(name, _) => Ok(self.load_name(name)),
            ExprKind::BinOp { left, op, right } => {
                let left = self.compile_expr(left)?;
                let right = self.compile_expr(right)?;
                let (arg, argrepr) = Self::binary_op_arg(*op);
                self.unit.location = Some(expr.range);
                self.unit
                    .emit_arg(Opcode::BINARY_OP, arg, ArgValue::Int(arg), argrepr);
                self.unit.specialize(Self::specialize_binary_op(*op, left, right));
                Ok(Self::binary_result(*op, left, right))
            }
            ExprKind::UnaryOp { op, operand } => {
                let operand = self.compile_expr(operand)?;
                self.unit.location = Some(expr.range);
                match op {
                    UnaryOp::USub => {
                        self.unit.emit(Opcode::UNARY_NEGATIVE);
                        Ok(if operand.is_number() {
                            operand
                        } else {
                            Operand::Unknown
                        })
                    }
                    UnaryOp::Not => {
                        self.unit.emit(Opcode::UNARY_NOT);
                        Ok(Operand::Bool)
                    }
                    UnaryOp::UAdd => {
                        self.unit.emit_arg(
                            Opcode::CALL_INTRINSIC_1,
                            INTRINSIC_UNARY_POSITIVE,
                            ArgValue::Int(INTRINSIC_UNARY_POSITIVE),
                            "INTRINSIC_UNARY_POSITIVE",
                        );
                        Ok(operand)
                    }
                }
            }
            ExprKind::BoolOp { op, values } => {
                let end = self.unit.new_label();
                let jump = match op {
                    BoolOp::And => Opcode::POP_JUMP_IF_FALSE,
                    BoolOp::Or => Opcode::POP_JUMP_IF_TRUE,
                };

                for (i, value) in values.iter().enumerate() {
                    self.compile_expr(value)?;
                    if i + 1 < values.len() {
                        self.unit.location = Some(expr.range);
                        self.unit.emit_count(Opcode::COPY, 1);
                        self.unit.emit_jump(jump, end);
                        self.unit.emit(Opcode::POP_TOP);
                    }
                }
                self.unit.bind(end);
                Ok(Operand::Unknown)
            }
            ExprKind::Compare {
                left,
                ops,
                comparators,
            } => self.compile_compare(expr.range, left, ops, comparators),
            ExprKind::IfExp { test, body, orelse } => {
                let orelse_label = self.unit.new_label();
                let end = self.unit.new_label();

                self.compile_expr(test)?;
                self.unit.emit_jump(Opcode::POP_JUMP_IF_FALSE, orelse_label);
                let body = self.compile_expr(body)?;
                self.unit.emit_jump(Opcode::JUMP_FORWARD, end);
                self.unit.bind(orelse_label);
                let orelse = self.compile_expr(orelse)?;
                self.unit.bind(end);

                Ok(if body == orelse { body } else { Operand::Unknown })
            }
            ExprKind::Lambda { body, .. } => {
                self.compile_function(
                    SmolStr::new_static("<lambda>"),
                    UnitKind::Lambda,
                    expr.range,
                    |c| {
                        match &body.kind {
                            ExprKind::Constant(constant) => {
                                c.unit.location = Some(body.range);
                                c.return_const(constant);
                            }
                            _ => {
                                c.compile_expr(body)?;
                                c.unit.emit(Opcode::RETURN_VALUE);
                            }
                        }
                        Ok(())
                    },
                )?;
                Ok(Operand::Unknown)
            }
            ExprKind::Call { func, args } => self.compile_call(expr.range, func, args),
            ExprKind::Attribute { value, attr, .. } => {
                self.compile_expr(value)?;
                self.unit.location = Some(expr.range);
                self.load_attr(attr, false);
                Ok(Operand::Unknown)
            }
            ExprKind::Subscript { value, index, .. } => {
                let container = self.compile_expr(value)?;
                let index = self.compile_expr(index)?;
                self.unit.location = Some(expr.range);
                self.unit.emit(Opcode::BINARY_SUBSCR);
                if container == Operand::List && index == Operand::Int {
                    self.unit.specialize(Some(Opcode::BINARY_SUBSCR_LIST_INT));
                }
                Ok(Operand::Unknown)
            }
            ExprKind::List(elts, _) => {
                for elt in elts {
                    self.compile_expr(elt)?;
                }
                self.unit.location = Some(expr.range);
                self.unit.emit_count(Opcode::BUILD_LIST, elts.len());
                Ok(Operand::List)
            }
            ExprKind::Tuple(elts, _) => {
                for elt in elts {
                    self.compile_expr(elt)?;
                }
                self.unit.location = Some(expr.range);
                self.unit.emit_count(Opcode::BUILD_TUPLE, elts.len());
                Ok(Operand::Tuple)
            }
        }
    }

    /// Compiles a comparison; chains short-circuit and clean up the spare operand.
    fn compile_compare(
        &mut self,
        range: Range,
        left: &Expr,
        ops: &[CmpOp],
        comparators: &[Expr],
    ) -> Result<Operand, CompileError> {
        let mut lhs = self.compile_expr(left)?;

        if ops.len() == 1 {
            let rhs = self.compile_expr(&comparators[0])?;
            self.unit.location = Some(range);
            self.compare_op(ops[0], lhs, rhs);
            return Ok(Operand::Bool);
        }

        let cleanup = self.unit.new_label();
        let end = self.unit.new_label();

        for (i, (op, comparator)) in ops.iter().zip(comparators).enumerate() {
            let rhs = self.compile_expr(comparator)?;
            self.unit.location = Some(range);

            if i + 1 < ops.len() {
                self.unit.emit_count(Opcode::SWAP, 2);
                self.unit.emit_count(Opcode::COPY, 2);
                self.compare_op(*op, lhs, rhs);
                self.unit.emit_count(Opcode::COPY, 1);
                self.unit.emit_jump(Opcode::POP_JUMP_IF_FALSE, cleanup);
                self.unit.emit(Opcode::POP_TOP);
            } else {
                self.compare_op(*op, lhs, rhs);
                self.unit.emit_jump(Opcode::JUMP_FORWARD, end);
            }
            lhs = rhs;
        }

        self.unit.bind(cleanup);
        self.unit.emit_count(Opcode::SWAP, 2);
        self.unit.emit(Opcode::POP_TOP);
        self.unit.bind(end);

        Ok(Operand::Bool)
    }

    fn compile_call(
        &mut self,
        range: Range,
        func: &Expr,
        args: &[Expr],
    ) -> Result<Operand, CompileError> {
        let callee = match &func.kind {
            ExprKind::Attribute { value, attr, .. } => {
                self.compile_expr(value)?;
                self.unit.location = Some(func.range);
                self.load_attr(attr, true);
                Operand::Unknown
            }
            ExprKind::Name(name, ExprContext::Load)
                if self.symtable.resolve(self.unit.scope, name) == NameScope::Global =>
            {
                let saved = self.unit.location.replace(func.range);
                let operand = self.load_global(name, true);
                self.unit.location = saved;
                operand
            }
            _ => {
                self.unit.emit(Opcode::PUSH_NULL);
                self.compile_expr(func)?
            }
        };

        for arg in args {
            self.compile_expr(arg)?;
        }

        self.unit.location = Some(range);
        self.unit.emit_count(Opcode::CALL, args.len());
        match callee {
            Operand::RangeBuiltin => {
                self.unit.specialize(Some(Opcode::CALL_BUILTIN_FAST));
                Ok(Operand::Range)
            }
            Operand::Builtin => {
                self.unit.specialize(Some(Opcode::CALL_BUILTIN_FAST));
                Ok(Operand::Unknown)
            }
            _ => Ok(Operand::Unknown),
        }
    }

    fn compare_op(&mut self, op: CmpOp, lhs: Operand, rhs: Operand) {
        let index = COMPARE_OPS
            .iter()
            .position(|candidate| *candidate == op)
            .unwrap_or_default() as u32;
        let arg = index << 4;
        self.unit
            .emit_arg(Opcode::COMPARE_OP, arg, ArgValue::Symbol(op.symbol()), op.symbol());
        self.unit.specialize(match (lhs, rhs) {
            (Operand::Int, Operand::Int) => Some(Opcode::COMPARE_OP_INT),
            (Operand::Float, Operand::Float) => Some(Opcode::COMPARE_OP_FLOAT),
            (Operand::Str, Operand::Str) => Some(Opcode::COMPARE_OP_STR),
            _ => None,
        });
    }

    fn return_const(&mut self, constant: &Constant) {
        let index = self.unit.const_index(ArgValue::Const(constant.clone()));
        self.unit.emit_arg(
            Opcode::RETURN_CONST,
            index,
            ArgValue::Const(constant.clone()),
            constant.to_string(),
        );
    }

    fn builtin_operand(&self, name: &Ident) -> Operand {
        if !self.symtable.is_builtin(self.unit.scope, name) {
            Operand::Unknown
        } else if name == "range" {
            Operand::RangeBuiltin
        } else {
            Operand::Builtin
        }
    }

    fn load_name(&mut self, name: &Ident) -> Operand {
        match self.symtable.resolve(self.unit.scope, name) {
            NameScope::Name => {
                let index = self.unit.name_index(name);
                self.unit.emit_name(Opcode::LOAD_NAME, index, name);
                self.builtin_operand(name)
            }
            NameScope::Local => {
                let index = self.unit.varname_index(name);
                self.unit.emit_name(Opcode::LOAD_FAST, index, name);
                Operand::Unknown
            }
            NameScope::Cell | NameScope::Free => {
                let index = self.unit.deref_index(name);
                self.unit.emit_name(Opcode::LOAD_DEREF, index, name);
                Operand::Unknown
            }
            NameScope::Global => self.load_global(name, false),
        }
    }

    fn load_global(&mut self, name: &Ident, push_null: bool) -> Operand {
        let index = self.unit.name_index(name);
        let arg = (index << 1) | push_null as u32;
        let argrepr = if push_null {
            format!("NULL + {}", name)
        } else {
            name.to_string()
        };
        self.unit
            .emit_arg(Opcode::LOAD_GLOBAL, arg, ArgValue::Name(name.clone()), argrepr);

        let operand = self.builtin_operand(name);
        self.unit.specialize(Some(if operand == Operand::Unknown {
            Opcode::LOAD_GLOBAL_MODULE
        } else {
            Opcode::LOAD_GLOBAL_BUILTIN
        }));
        operand
    }

    fn store_name(&mut self, name: &Ident) {
        match self.symtable.resolve(self.unit.scope, name) {
            NameScope::Name => {
                let index = self.unit.name_index(name);
                self.unit.emit_name(Opcode::STORE_NAME, index, name);
            }
            NameScope::Local => {
                let index = self.unit.varname_index(name);
                self.unit.emit_name(Opcode::STORE_FAST, index, name);
            }
            NameScope::Cell | NameScope::Free => {
                let index = self.unit.deref_index(name);
                self.unit.emit_name(Opcode::STORE_DEREF, index, name);
            }
            NameScope::Global => {
                let index = self.unit.name_index(name);
                self.unit.emit_name(Opcode::STORE_GLOBAL, index, name);
            }
        }
    }

    fn load_attr(&mut self, attr: &Ident, method: bool) {
        let index = self.unit.name_index(attr);
        let arg = (index << 1) | method as u32;
        let argrepr = if method {
            format!("NULL|self + {}", attr)
        } else {
            attr.to_string()
        };
        self.unit
            .emit_arg(Opcode::LOAD_ATTR, arg, ArgValue::Name(attr.clone()), argrepr);
    }

    fn store_attr(&mut self, attr: &Ident) {
        let index = self.unit.name_index(attr);
        self.unit.emit_name(Opcode::STORE_ATTR, index, attr);
    }

    fn binary_op_arg(op: BinOp) -> (u32, &'static str) {
        let arg = match op {
            BinOp::Add => 0,
            BinOp::FloorDiv => 2,
            BinOp::Mult => 5,
            BinOp::Mod => 6,
            BinOp::Pow => 8,
            BinOp::Sub => 10,
            BinOp::Div => 11,
        };
        (arg, op.symbol())
    }

    fn specialize_binary_op(op: BinOp, left: Operand, right: Operand) -> Option<Opcode> {
        match (op, left, right) {
            (BinOp::Add, Operand::Int, Operand::Int) => Some(Opcode::BINARY_OP_ADD_INT),
            (BinOp::Add, Operand::Float, Operand::Float) => Some(Opcode::BINARY_OP_ADD_FLOAT),
            (BinOp::Add, Operand::Str, Operand::Str) => Some(Opcode::BINARY_OP_ADD_UNICODE),
            (BinOp::Sub, Operand::Int, Operand::Int) => Some(Opcode::BINARY_OP_SUBTRACT_INT),
            (BinOp::Sub, Operand::Float, Operand::Float) => {
                Some(Opcode::BINARY_OP_SUBTRACT_FLOAT)
            }
            (BinOp::Mult, Operand::Int, Operand::Int) => Some(Opcode::BINARY_OP_MULTIPLY_INT),
            (BinOp::Mult, Operand::Float, Operand::Float) => {
                Some(Opcode::BINARY_OP_MULTIPLY_FLOAT)
            }
            _ => None,
        }
    }

    fn binary_result(op: BinOp, left: Operand, right: Operand) -> Operand {
        match (op, left, right) {
            (BinOp::Div, l, r) if l.is_number() && r.is_number() => Operand::Float,
            (_, Operand::Int, Operand::Int) => Operand::Int,
            (_, l, r) if l.is_number() && r.is_number() => Operand::Float,
            (BinOp::Add, Operand::Str, Operand::Str) => Operand::Str,
            _ => Operand::Unknown,
        }
    }

    fn describe(expr: &Expr) -> &'static str {
        match &expr.kind {
            ExprKind::Constant(Constant::None) => "None",
            ExprKind::Constant(Constant::Bool(true)) => "True",
            ExprKind::Constant(Constant::Bool(false)) => "False",
            ExprKind::Constant(_) => "literal",
            ExprKind::Call { .. } => "function call",
            ExprKind::Compare { .. } => "comparison",
            ExprKind::IfExp { .. } => "conditional expression",
            ExprKind::Lambda { .. } => "lambda",
            ExprKind::Tuple(..) => "tuple",
            ExprKind::List(..) => "list",
            _ => "expression",
        }
    }
}
