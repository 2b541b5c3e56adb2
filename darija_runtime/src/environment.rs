use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::debug;

use crate::{
    error::{runtime_error, ErrorMsg, Exception},
    stdlib,
    types::Value,
};

/// Name under which the receiver of a call is bound
pub const THIS: &str = "hadi";

#[derive(Clone, Debug)]
struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Debug, Default)]
pub struct Env {
    values: HashMap<String, Binding>,
    pub parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
    /// Creates the root scope holding every built-in
    pub fn new() -> Rc<RefCell<Self>> {
        let mut env = Self::default();
        env.define(THIS, Value::Undefined, false);
        stdlib::init(&mut env);
        Rc::new(RefCell::new(env))
    }

    pub fn with_parent(parent: Rc<RefCell<Env>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            ..Default::default()
        }))
    }

    /// Copies the bindings of this scope into a fresh scope with the
    /// same parent, so closures created earlier keep the old values.
    pub fn snapshot(&self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            values: self.values.clone(),
            parent: self.parent.clone(),
        }))
    }

    /// Binds a name unconditionally, replacing any binding of the
    /// same name in this scope.
    pub fn define(&mut self, name: &str, value: Value, mutable: bool) {
        debug!("Define {name} -> {value:?}");
        self.values
            .insert(name.to_string(), Binding { value, mutable });
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.define(name, value, true);
    }

    /// Declares a `tabit` or `bdl` binding. Names may only be
    /// declared once per scope.
    pub fn declare(&mut self, name: &str, value: Value, mutable: bool) -> Result<(), Exception> {
        if self.values.contains_key(name) {
            return Err(runtime_error(ErrorMsg::Redeclaration, name));
        }
        self.define(name, value, mutable);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Value, Exception> {
        debug!("Get {name}");
        if let Some(binding) = self.values.get(name) {
            return Ok(binding.value.clone());
        }
        if let Some(parent) = &self.parent {
            debug!("Get {name} from parent");
            return parent.borrow().get(name);
        }
        Err(runtime_error(ErrorMsg::UndefinedVar, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.borrow().contains(name))
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), Exception> {
        debug!("Assign {name} -> {value:?}");
        if let Some(binding) = self.values.get_mut(name) {
            if !binding.mutable {
                return Err(runtime_error(ErrorMsg::ConstAssign, name));
            }
            binding.value = value;
            return Ok(());
        }
        if let Some(parent) = &self.parent {
            debug!("Assign {name} in parent");
            return parent.borrow_mut().assign(name, value);
        }
        Err(runtime_error(ErrorMsg::UndefinedVar, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_msg(e: Exception) -> String {
        match e {
            Exception::Error(e) => e.msg,
            Exception::Raised { value, .. } => value.to_string(),
        }
    }

    #[test]
    fn lookup_walks_parents() {
        let root = Env::with_parent(Rc::new(RefCell::new(Env::default())));
        root.borrow_mut().set("x", Value::Number(1.0));
        let child = Env::with_parent(root.clone());
        assert_eq!(child.borrow().get("x").unwrap(), Value::Number(1.0));
        child.borrow_mut().assign("x", Value::Number(2.0)).unwrap();
        assert_eq!(root.borrow().get("x").unwrap(), Value::Number(2.0));
        assert!(child.borrow().contains("x"));
        assert!(!root.borrow().contains("y"));
    }

    #[test]
    fn undefined_variable() {
        let env = Env::default();
        assert_eq!(err_msg(env.get("y").unwrap_err()), "undefined variable `y`");
    }

    #[test]
    fn constants_reject_assignment() {
        let mut env = Env::default();
        env.declare("pi", Value::Number(2.5), false).unwrap();
        assert_eq!(
            err_msg(env.assign("pi", Value::Number(3.0)).unwrap_err()),
            "assignment to constant `pi`"
        );
        assert_eq!(env.get("pi").unwrap(), Value::Number(2.5));
    }

    #[test]
    fn redeclaration_in_same_scope() {
        let parent = Rc::new(RefCell::new(Env::default()));
        parent.borrow_mut().declare("a", Value::Null, true).unwrap();
        let child = Env::with_parent(parent.clone());
        assert!(child.borrow_mut().declare("a", Value::Null, true).is_ok());
        assert_eq!(
            err_msg(parent.borrow_mut().declare("a", Value::Null, true).unwrap_err()),
            "variable already declared in this scope `a`"
        );
    }

    #[test]
    fn snapshot_detaches_bindings() {
        let env = Rc::new(RefCell::new(Env::default()));
        env.borrow_mut().set("i", Value::Number(0.0));
        let next = env.borrow().snapshot();
        next.borrow_mut().assign("i", Value::Number(1.0)).unwrap();
        assert_eq!(env.borrow().get("i").unwrap(), Value::Number(0.0));
        assert_eq!(next.borrow().get("i").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn root_has_builtins() {
        let root = Env::new();
        assert!(root.borrow().get("tbe3").unwrap().is_callable());
        assert_eq!(root.borrow().get(THIS).unwrap(), Value::Undefined);
        assert!(root.borrow_mut().assign("tbe3", Value::Null).is_err());
    }
}
