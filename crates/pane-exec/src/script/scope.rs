//! Lexical scopes.
//!
//! Scopes form a parent chain. Blocks get a plain child scope; function calls get
//! one marked as a boundary, which is where assignment to an undeclared name binds.
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use super::{ast::Name, value::Value};

pub type ScopeRef = Rc<RefCell<Scope>>;

#[derive(Debug, Default)]
pub struct Scope {
    vars: BTreeMap<Name, Value>,
    parent: Option<ScopeRef>,
    boundary: bool,
}

impl Scope {
    /// A scope with no parent.
    pub fn root() -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            boundary: true,
            ..Scope::default()
        }))
    }

    /// A block scope under `parent`.
    pub fn child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            vars: BTreeMap::new(),
            parent: Some(parent.clone()),
            boundary: false,
        }))
    }

    /// A function or module scope under `parent`.
    pub fn boundary(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            vars: BTreeMap::new(),
            parent: Some(parent.clone()),
            boundary: true,
        }))
    }

    /// Bind `name` in this scope, shadowing outer bindings.
    pub fn declare(&mut self, name: Name, value: Value) {
        self.vars.insert(name, value);
    }

    /// Names bound directly in this scope, with their values.
    pub fn entries(&self) -> impl Iterator<Item = (&Name, &Value)> {
        self.vars.iter()
    }
}

/// Look `name` up along the chain.
pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
    let mut current = scope.clone();
    loop {
        let next = {
            let s = current.borrow();
            if let Some(v) = s.vars.get(name) {
                return Some(v.clone());
            }
            s.parent.clone()?
        };
        current = next;
    }
}

/// Assign to the nearest existing binding of `name`.
///
/// When there is none, the name is bound in the nearest boundary scope.
pub fn assign(scope: &ScopeRef, name: &Name, value: Value) {
    let mut current = scope.clone();
    let mut boundary: Option<ScopeRef> = None;
    loop {
        let next = {
            let mut s = current.borrow_mut();
            if let Some(slot) = s.vars.get_mut(&**name) {
                *slot = value;
                return;
            }
            if s.boundary && boundary.is_none() {
                boundary = Some(current.clone());
            }
            s.parent.clone()
        };
        match next {
            Some(parent) => current = parent,
            None => break,
        }
    }

    let target = boundary.unwrap_or(current);
    target.borrow_mut().declare(name.clone(), value);
}
