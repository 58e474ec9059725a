//! Tree-walking interpreter.
use std::{collections::BTreeMap, rc::Rc};

use pane_core::fault::Frame;

use super::{
    RuntimeError,
    ast::{BinaryOp, Expr, Literal, Program, Stmt, StmtKind, Target, UnaryOp},
    scope::{Scope, ScopeRef, assign, lookup},
    value::{Function, Value},
};
use crate::host::Host;

/// Function name of the top-level frame.
pub const MODULE_FRAME: &str = "<module>";

/// Largest string, in bytes, a single operation may build.
pub const MAX_STRING_LEN: usize = 64 * 1024 * 1024;
/// Largest list a single operation may build.
pub const MAX_LIST_LEN: usize = 8 * 1024 * 1024;

/// State shared by everything executed from one loaded script.
pub struct Runtime {
    /// File name reported in frames.
    pub file: Rc<str>,
    lines: Vec<String>,
    pub host: Host,
    pub max_call_depth: usize,
}

impl Runtime {
    pub fn new(file: impl Into<Rc<str>>, source: &str, host: Host, max_call_depth: usize) -> Self {
        Self {
            file: file.into(),
            lines: source.lines().map(str::to_string).collect(),
            host,
            max_call_depth,
        }
    }

    fn source_line(&self, line: u32) -> Option<&str> {
        let idx = (line as usize).checked_sub(1)?;
        self.lines.get(idx).map(String::as_str)
    }
}

struct ActiveCall {
    function: Rc<str>,
    line: u32,
}

enum Flow {
    Next,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter {
    runtime: Rc<Runtime>,
    stack: Vec<ActiveCall>,
}

impl Interpreter {
    pub fn new(runtime: Rc<Runtime>) -> Self {
        Self {
            runtime,
            stack: Vec::new(),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// `MemoryError` for a result of `len` units that would pass `limit`.
    pub fn check_size(
        &self,
        what: &str,
        len: Option<usize>,
        limit: usize,
    ) -> Result<(), RuntimeError> {
        match len {
            Some(len) if len <= limit => Ok(()),
            _ => Err(self.error("MemoryError", format!("{what} would be too large (limit {limit})"))),
        }
    }

    /// Build a fault of `kind` carrying the currently active frames.
    pub fn error(&self, kind: &str, message: impl Into<String>) -> RuntimeError {
        let frames = self
            .stack
            .iter()
            .map(|call| {
                let frame = Frame::new(&*self.runtime.file, &*call.function, call.line);
                match self.runtime.source_line(call.line) {
                    Some(src) => frame.with_source(src),
                    None => frame,
                }
            })
            .collect();
        RuntimeError {
            kind: kind.to_string(),
            message: message.into(),
            frames,
        }
    }

    fn type_error(&self, message: impl Into<String>) -> RuntimeError {
        self.error("TypeError", message)
    }

    /// Execute `program` at top level, binding into `globals`.
    pub fn run_module(&mut self, program: &Program, globals: &ScopeRef) -> Result<(), RuntimeError> {
        self.stack.push(ActiveCall {
            function: Rc::from(MODULE_FRAME),
            line: 0,
        });
        let result = match self.exec_block(&program.body, globals) {
            Ok(Flow::Next | Flow::Return(_)) => Ok(()),
            Ok(Flow::Break | Flow::Continue) => {
                Err(self.error("RuntimeError", "`break` or `continue` outside loop"))
            }
            Err(e) => Err(e),
        };
        self.stack.pop();
        result
    }

    /// Call a function value with already evaluated arguments.
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Builtin(b) => (b.func)(self, args),
            Value::Function(func) => self.call_function(func, args),
            other => Err(self.type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(&mut self, func: &Rc<Function>, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let def = &func.def;
        if args.len() != def.params.len() {
            return Err(self.type_error(format!(
                "{}() takes {} argument(s) but {} were given",
                def.name,
                def.params.len(),
                args.len()
            )));
        }
        if self.stack.len() >= self.runtime.max_call_depth {
            return Err(self.error("RecursionError", "maximum recursion depth exceeded"));
        }

        let scope = Scope::boundary(&func.env);
        {
            let mut s = scope.borrow_mut();
            for (param, arg) in def.params.iter().zip(args) {
                s.declare(param.clone(), arg);
            }
        }

        self.stack.push(ActiveCall {
            function: def.name.clone(),
            line: def.line,
        });
        let result = match self.exec_block(&def.body, &scope) {
            Ok(Flow::Return(v)) => Ok(v),
            Ok(Flow::Next) => Ok(Value::Null),
            Ok(Flow::Break | Flow::Continue) => {
                Err(self.error("RuntimeError", "`break` or `continue` outside loop"))
            }
            Err(e) => Err(e),
        };
        self.stack.pop();
        result
    }

    fn set_line(&mut self, line: u32) {
        if let Some(top) = self.stack.last_mut() {
            top.line = line;
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], scope: &ScopeRef) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            self.set_line(stmt.line);
            match self.exec_stmt(stmt, scope)? {
                Flow::Next => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Next)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &ScopeRef) -> Result<Flow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Let(name, expr) => {
                let value = self.eval(expr, scope)?;
                scope.borrow_mut().declare(name.clone(), value);
            }
            StmtKind::Assign { target, op, value } => self.exec_assign(target, *op, value, scope)?,
            StmtKind::Expr(expr) => {
                self.eval(expr, scope)?;
            }
            StmtKind::Fn(def) => {
                let func = Value::Function(Rc::new(Function {
                    def: def.clone(),
                    env: scope.clone(),
                }));
                scope.borrow_mut().declare(def.name.clone(), func);
            }
            StmtKind::If {
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    if self.eval(cond, scope)?.is_truthy() {
                        return self.exec_block(body, &Scope::child(scope));
                    }
                }
                if let Some(body) = otherwise {
                    return self.exec_block(body, &Scope::child(scope));
                }
            }
            StmtKind::While { cond, body } => {
                while self.eval(cond, scope)?.is_truthy() {
                    match self.exec_block(body, &Scope::child(scope))? {
                        Flow::Break => break,
                        Flow::Next | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                    self.set_line(stmt.line);
                }
            }
            StmtKind::For { var, iter, body } => {
                let iterable = self.eval(iter, scope)?;
                for item in self.iterate(&iterable)? {
                    let inner = Scope::child(scope);
                    inner.borrow_mut().declare(var.clone(), item);
                    match self.exec_block(body, &inner)? {
                        Flow::Break => break,
                        Flow::Next | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                    self.set_line(stmt.line);
                }
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(e) => self.eval(e, scope)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Raise(expr) => {
                let value = self.eval(expr, scope)?;
                return Err(self.raised(&value));
            }
            StmtKind::Try {
                body,
                binding,
                handler,
            } => {
                let err = match self.exec_block(body, &Scope::child(scope)) {
                    Ok(flow) => return Ok(flow),
                    Err(err) => err,
                };
                let inner = Scope::child(scope);
                if let Some(name) = binding {
                    let mut caught = BTreeMap::new();
                    caught.insert("kind".to_string(), Value::str(&err.kind));
                    caught.insert("message".to_string(), Value::str(&err.message));
                    inner.borrow_mut().declare(name.clone(), Value::map(caught));
                }
                self.set_line(stmt.line);
                return self.exec_block(handler, &inner);
            }
        }
        Ok(Flow::Next)
    }

    /// Fault for `raise value`. A map with `kind`/`message` entries sets both.
    fn raised(&self, value: &Value) -> RuntimeError {
        if let Value::Map(entries) = value {
            let entries = entries.borrow();
            let kind = entries.get("kind").and_then(Value::as_str).unwrap_or("Error");
            let message = entries
                .get("message")
                .map(Value::to_string)
                .unwrap_or_default();
            return self.error(kind, message);
        }
        self.error("Error", value.to_string())
    }

    fn exec_assign(
        &mut self,
        target: &Target,
        op: Option<BinaryOp>,
        value: &Expr,
        scope: &ScopeRef,
    ) -> Result<(), RuntimeError> {
        match target {
            Target::Name(name) => {
                let rhs = self.eval(value, scope)?;
                let new = match op {
                    None => rhs,
                    Some(op) => {
                        let current = self.load(name, scope)?;
                        self.binary(op, &current, &rhs)?
                    }
                };
                assign(scope, name, new);
            }
            Target::Index { target, index } => {
                let container = self.eval(target, scope)?;
                let key = self.eval(index, scope)?;
                let rhs = self.eval(value, scope)?;
                let new = match op {
                    None => rhs,
                    Some(op) => {
                        let current = self.index(&container, &key)?;
                        self.binary(op, &current, &rhs)?
                    }
                };
                self.store_index(&container, &key, new)?;
            }
            Target::Field { target, name } => {
                let container = self.eval(target, scope)?;
                let key = Value::Str(name.clone());
                let rhs = self.eval(value, scope)?;
                let new = match op {
                    None => rhs,
                    Some(op) => {
                        let current = self.field(&container, name)?;
                        self.binary(op, &current, &rhs)?
                    }
                };
                if !matches!(container, Value::Map(_)) {
                    return Err(self.type_error(format!(
                        "cannot set field `{name}` on '{}'",
                        container.type_name()
                    )));
                }
                self.store_index(&container, &key, new)?;
            }
        }
        Ok(())
    }

    fn load(&self, name: &str, scope: &ScopeRef) -> Result<Value, RuntimeError> {
        lookup(scope, name).ok_or_else(|| self.error("NameError", format!("name '{name}' is not defined")))
    }

    fn iterate(&self, value: &Value) -> Result<Vec<Value>, RuntimeError> {
        match value {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Map(entries) => Ok(entries.borrow().keys().map(Value::str).collect()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
            other => Err(self.type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    fn eval(&mut self, expr: &Expr, scope: &ScopeRef) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::Str(s.clone()),
            }),
            Expr::Ident(name) => self.load(name, scope),
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item, scope)?);
                }
                Ok(Value::list(out))
            }
            Expr::Map(entries) => {
                let mut out = BTreeMap::new();
                for (key, value) in entries {
                    out.insert(key.to_string(), self.eval(value, scope)?);
                }
                Ok(Value::map(out))
            }
            Expr::Unary(op, operand) => {
                let v = self.eval(operand, scope)?;
                match (op, &v) {
                    (UnaryOp::Not, _) => Ok(Value::Bool(!v.is_truthy())),
                    (UnaryOp::Neg, Value::Int(i)) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| self.error("OverflowError", "integer overflow")),
                    (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
                    (UnaryOp::Neg, other) => Err(self.type_error(format!(
                        "bad operand type for unary -: '{}'",
                        other.type_name()
                    ))),
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs, scope)?;
                let r = self.eval(rhs, scope)?;
                self.binary(*op, &l, &r)
            }
            Expr::And(lhs, rhs) => {
                let l = self.eval(lhs, scope)?;
                if l.is_truthy() { self.eval(rhs, scope) } else { Ok(l) }
            }
            Expr::Or(lhs, rhs) => {
                let l = self.eval(lhs, scope)?;
                if l.is_truthy() { Ok(l) } else { self.eval(rhs, scope) }
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee, scope)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, scope)?);
                }
                self.call_value(&callee, values)
            }
            Expr::Index { target, index } => {
                let container = self.eval(target, scope)?;
                let key = self.eval(index, scope)?;
                self.index(&container, &key)
            }
            Expr::Field { target, name } => {
                let container = self.eval(target, scope)?;
                self.field(&container, name)
            }
            Expr::Lambda(def) => Ok(Value::Function(Rc::new(Function {
                def: def.clone(),
                env: scope.clone(),
            }))),
        }
    }

    fn field(&self, container: &Value, name: &str) -> Result<Value, RuntimeError> {
        match container {
            Value::Map(entries) => entries
                .borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| self.error("KeyError", format!("{name:?}"))),
            other => Err(self.type_error(format!(
                "'{}' object has no field `{name}`",
                other.type_name()
            ))),
        }
    }

    /// Resolve a possibly negative index against `len`.
    fn position(&self, index: &Value, len: usize) -> Result<usize, RuntimeError> {
        let Some(i) = index.as_int() else {
            return Err(self.type_error(format!(
                "indices must be integers, not '{}'",
                index.type_name()
            )));
        };
        let resolved = if i < 0 { len as i64 + i } else { i };
        if resolved < 0 || resolved >= len as i64 {
            return Err(self.error("IndexError", "index out of range"));
        }
        Ok(resolved as usize)
    }

    fn index(&self, container: &Value, key: &Value) -> Result<Value, RuntimeError> {
        match container {
            Value::List(items) => {
                let items = items.borrow();
                let at = self.position(key, items.len())?;
                Ok(items[at].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let at = self.position(key, chars.len())?;
                Ok(Value::str(chars[at].to_string()))
            }
            Value::Map(entries) => {
                let Some(k) = key.as_str() else {
                    return Err(self.type_error("map keys must be strings"));
                };
                entries
                    .borrow()
                    .get(k)
                    .cloned()
                    .ok_or_else(|| self.error("KeyError", format!("{k:?}")))
            }
            other => Err(self.type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    fn store_index(&self, container: &Value, key: &Value, value: Value) -> Result<(), RuntimeError> {
        match container {
            Value::List(items) => {
                let len = items.borrow().len();
                let at = self.position(key, len)?;
                items.borrow_mut()[at] = value;
                Ok(())
            }
            Value::Map(entries) => {
                let Some(k) = key.as_str() else {
                    return Err(self.type_error("map keys must be strings"));
                };
                entries.borrow_mut().insert(k.to_string(), value);
                Ok(())
            }
            other => Err(self.type_error(format!(
                "'{}' object does not support item assignment",
                other.type_name()
            ))),
        }
    }

    pub fn binary(&self, op: BinaryOp, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
        use Value::{Float, Int, Str};

        let unsupported = || {
            self.type_error(format!(
                "unsupported operand types for {}: '{}' and '{}'",
                op.symbol(),
                l.type_name(),
                r.type_name()
            ))
        };
        let overflow = || self.error("OverflowError", "integer overflow");

        match op {
            BinaryOp::Eq => return Ok(Value::Bool(l.equals(r))),
            BinaryOp::NotEq => return Ok(Value::Bool(!l.equals(r))),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let ord = match (l, r) {
                    (Str(a), Str(b)) => a.cmp(b),
                    _ => match (as_number(l), as_number(r)) {
                        (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(unsupported)?,
                        _ => return Err(unsupported()),
                    },
                };
                let result = match op {
                    BinaryOp::Lt => ord.is_lt(),
                    BinaryOp::LtEq => ord.is_le(),
                    BinaryOp::Gt => ord.is_gt(),
                    _ => ord.is_ge(),
                };
                return Ok(Value::Bool(result));
            }
            _ => {}
        }

        match (op, l, r) {
            (BinaryOp::Add, Str(a), Str(b)) => {
                self.check_size("string", a.len().checked_add(b.len()), MAX_STRING_LEN)?;
                Ok(Value::str(format!("{a}{b}")))
            }
            (BinaryOp::Add, Value::List(a), Value::List(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                self.check_size("list", a.len().checked_add(b.len()), MAX_LIST_LEN)?;
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Ok(Value::list(out))
            }
            (BinaryOp::Mul, Str(s), Int(n)) | (BinaryOp::Mul, Int(n), Str(s)) => {
                // negative counts repeat zero times
                let count = usize::try_from(*n).unwrap_or(0);
                self.check_size("repeated string", s.len().checked_mul(count), MAX_STRING_LEN)?;
                Ok(Value::str(s.repeat(count)))
            }
            (BinaryOp::Add, Int(a), Int(b)) => a.checked_add(*b).map(Int).ok_or_else(overflow),
            (BinaryOp::Sub, Int(a), Int(b)) => a.checked_sub(*b).map(Int).ok_or_else(overflow),
            (BinaryOp::Mul, Int(a), Int(b)) => a.checked_mul(*b).map(Int).ok_or_else(overflow),
            (BinaryOp::Rem, Int(a), Int(b)) => {
                if *b == 0 {
                    return Err(self.error("ZeroDivisionError", "integer modulo by zero"));
                }
                a.checked_rem_euclid(*b).map(Int).ok_or_else(overflow)
            }
            (BinaryOp::Div, _, _) => {
                let (Some(a), Some(b)) = (as_number(l), as_number(r)) else {
                    return Err(unsupported());
                };
                if b == 0.0 {
                    return Err(self.error("ZeroDivisionError", "division by zero"));
                }
                Ok(Float(a / b))
            }
            _ => {
                let (Some(a), Some(b)) = (as_number(l), as_number(r)) else {
                    return Err(unsupported());
                };
                Ok(Float(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Rem if b == 0.0 => {
                        return Err(self.error("ZeroDivisionError", "float modulo"));
                    }
                    BinaryOp::Rem => a.rem_euclid(b),
                    _ => return Err(unsupported()),
                }))
            }
        }
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}
