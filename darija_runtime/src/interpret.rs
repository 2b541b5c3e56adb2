use std::{cell::RefCell, cmp::Ordering, rc::Rc};

use darija_syntax::{
    ast::{
        AssignOp, BinOp, CatchClause, DeclKind, Expr, Function, Ident, LogicalOp, Property,
        Source, Span, Stmt, SwitchCase, UnaryOp, UpdateOp,
    },
    parse::MAX_ARGS,
};
use log::debug;

use crate::{
    environment::{Env, THIS},
    error::{runtime_error, ErrorMsg, Exception},
    host::{Host, StdHost},
    methods,
    timers::{TimerQueue, MAX_TIMER_FIRINGS},
    types::{Callable, Func, NativeFunc, Value},
};

/// Nesting limit for calls of user functions
pub const MAX_CALL_DEPTH: usize = 64;

/// Nesting limit for statements and expressions under evaluation,
/// summed over all active calls
pub const MAX_NESTING_DEPTH: usize = 192;

/// Arrays never grow past this many elements through assignment
pub const MAX_ARRAY_LEN: usize = 1 << 20;

/// Property giving the length of arrays and strings
pub const LENGTH: &str = "twil";

/// How a statement completed
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// A resolved assignment target
enum Place {
    Var(String),
    Member(Value, Value),
}

pub struct Interpreter {
    pub env: Rc<RefCell<Env>>,
    pub output: Vec<String>,
    pub host: Box<dyn Host>,
    pub timers: TimerQueue,
    depth: usize,
    nesting: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Box::new(StdHost))
    }
}

impl Interpreter {
    /// The program runs in a child of the scope holding the
    /// built-ins, so user code may shadow them.
    pub fn new(host: Box<dyn Host>) -> Self {
        Self {
            env: Env::with_parent(Env::new()),
            output: Vec::default(),
            host,
            timers: TimerQueue::default(),
            depth: 0,
            nesting: 0,
        }
    }

    /// Runs the program body, then every queued timer
    pub fn interpret_all(&mut self, source: &Source) -> Result<(), Exception> {
        self.interpret_items(&source.body)?;
        self.drain_timers()
    }

    /// Runs statements in the current scope, after hoisting the
    /// function declarations among them.
    pub fn interpret_items(&mut self, items: &[Stmt]) -> Result<Flow, Exception> {
        for item in items {
            if let Stmt::Function(decl) = item {
                self.interpret_function_decl(decl);
            }
        }
        for item in items {
            let flow = self.interpret_stmt(item)?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn interpret_stmt(&mut self, stmt: &Stmt) -> Result<Flow, Exception> {
        self.nested(|interpreter| interpreter.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow, Exception> {
        match stmt {
            Stmt::VarDecl { kind, ident, init } => self.interpret_var_decl(*kind, ident, init),
            // Hoisted by `interpret_items`
            Stmt::Function(_) => Ok(Flow::Normal),
            Stmt::Block(items) => self.interpret_block(items),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => self.interpret_if_stmt(test, consequent, alternate.as_deref()),
            Stmt::While { test, body } => self.interpret_while_stmt(test, body),
            Stmt::DoWhile { body, test } => self.interpret_do_while_stmt(body, test),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let env = Env::with_parent(self.env.clone());
                self.with_scope(env, |interpreter| {
                    interpreter.interpret_for_stmt(
                        init.as_deref(),
                        test.as_ref(),
                        update.as_ref(),
                        body,
                    )
                })
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.interpret_try_stmt(block, handler.as_ref(), finalizer.as_deref()),
            Stmt::Switch {
                discriminant,
                cases,
            } => self.interpret_switch_stmt(discriminant, cases),
            Stmt::Return(arg) => {
                let value = match arg {
                    Some(expr) => self.interpret_expr(expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Expr(expr) => {
                self.interpret_expr(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Empty => Ok(Flow::Normal),
        }
    }

    fn interpret_var_decl(
        &mut self,
        kind: DeclKind,
        ident: &Ident,
        init: &Option<Expr>,
    ) -> Result<Flow, Exception> {
        let value = match init {
            Some(expr) => self.interpret_expr(expr)?,
            None => Value::Undefined,
        };
        self.env
            .borrow_mut()
            .declare(&ident.name, value, kind == DeclKind::Let)
            .map_err(|e| e.at(ident.span))?;
        Ok(Flow::Normal)
    }

    fn interpret_function_decl(&mut self, decl: &Rc<Function>) {
        let Some(name) = &decl.name else {
            return;
        };
        let func = Value::Func(Func {
            decl: decl.clone(),
            closure: self.env.clone(),
        });
        self.env.borrow_mut().set(&name.name, func);
    }

    fn interpret_block(&mut self, items: &[Stmt]) -> Result<Flow, Exception> {
        // Create a new env with the current env as the parent
        // and set it as the active env for the block scope
        let env = Env::with_parent(self.env.clone());
        self.with_scope(env, |interpreter| interpreter.interpret_items(items))
    }

    /// Runs `f` with `env` as the active scope, restoring the
    /// previous scope afterwards even if `f` fails
    fn with_scope<T>(
        &mut self,
        env: Rc<RefCell<Env>>,
        f: impl FnOnce(&mut Self) -> Result<T, Exception>,
    ) -> Result<T, Exception> {
        let previous = std::mem::replace(&mut self.env, env);
        let res = f(self);
        self.env = previous;
        res
    }

    fn interpret_if_stmt(
        &mut self,
        test: &Expr,
        consequent: &Stmt,
        alternate: Option<&Stmt>,
    ) -> Result<Flow, Exception> {
        if self.interpret_expr(test)?.is_truthy() {
            self.interpret_stmt(consequent)
        } else if let Some(stmt) = alternate {
            self.interpret_stmt(stmt)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn interpret_while_stmt(&mut self, test: &Expr, body: &Stmt) -> Result<Flow, Exception> {
        while self.interpret_expr(test)?.is_truthy() {
            match self.interpret_stmt(body)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => (),
            }
        }
        Ok(Flow::Normal)
    }

    fn interpret_do_while_stmt(&mut self, body: &Stmt, test: &Expr) -> Result<Flow, Exception> {
        loop {
            match self.interpret_stmt(body)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => (),
            }
            if !self.interpret_expr(test)?.is_truthy() {
                break;
            }
        }
        Ok(Flow::Normal)
    }

    fn interpret_for_stmt(
        &mut self,
        init: Option<&Stmt>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> Result<Flow, Exception> {
        if let Some(init) = init {
            self.interpret_stmt(init)?;
        }
        let per_iteration = matches!(init, Some(Stmt::VarDecl { .. }));
        loop {
            if let Some(test) = test {
                if !self.interpret_expr(test)?.is_truthy() {
                    break;
                }
            }
            match self.interpret_stmt(body)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => (),
            }
            if per_iteration {
                // Each iteration gets its own copy of the loop
                // variables, so closures keep the values they saw
                let next = self.env.borrow().snapshot();
                self.env = next;
            }
            if let Some(update) = update {
                self.interpret_expr(update)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn interpret_try_stmt(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
    ) -> Result<Flow, Exception> {
        let res = match (self.interpret_block(block), handler) {
            (Err(exception), Some(handler)) => {
                debug!("Caught {exception}");
                let env = Env::with_parent(self.env.clone());
                env.borrow_mut()
                    .set(&handler.param.name, exception.into_value());
                self.with_scope(env, |interpreter| interpreter.interpret_items(&handler.body))
            }
            (res, _) => res,
        };
        if let Some(finalizer) = finalizer {
            // A finally block that does not complete normally
            // overrides whatever was pending
            let flow = self.interpret_block(finalizer)?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        res
    }

    fn interpret_switch_stmt(
        &mut self,
        discriminant: &Expr,
        cases: &[SwitchCase],
    ) -> Result<Flow, Exception> {
        let value = self.interpret_expr(discriminant)?;
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if self.interpret_expr(test)? == value {
                    start = Some(i);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| cases.iter().position(|case| case.test.is_none()))
        else {
            return Ok(Flow::Normal);
        };
        // All clauses share one scope
        let env = Env::with_parent(self.env.clone());
        self.with_scope(env, |interpreter| {
            for case in &cases[start..] {
                match interpreter.interpret_items(&case.consequent)? {
                    Flow::Normal => (),
                    Flow::Break => return Ok(Flow::Normal),
                    flow => return Ok(flow),
                }
            }
            Ok(Flow::Normal)
        })
    }

    pub fn interpret_expr(&mut self, expr: &Expr) -> Result<Value, Exception> {
        self.nested(|interpreter| interpreter.evaluate_expr(expr))
    }

    /// Runs `f` one evaluation level deeper
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Exception>,
    ) -> Result<T, Exception> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(runtime_error(ErrorMsg::NestingTooDeep, MAX_NESTING_DEPTH));
        }
        self.nesting += 1;
        let res = f(self);
        self.nesting -= 1;
        res
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, Exception> {
        match expr {
            Expr::Literal(lit) => Ok(Value::from(lit)),
            Expr::Ident(ident) => self
                .env
                .borrow()
                .get(&ident.name)
                .map_err(|e| e.at(ident.span)),
            Expr::This => self.env.borrow().get(THIS),
            Expr::Array(elements) => {
                let items = elements
                    .iter()
                    .map(|e| self.interpret_expr(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::new_array(items))
            }
            Expr::Object(entries) => {
                let mut fields = vec![];
                for (key, value) in entries {
                    fields.push((key.clone(), self.interpret_expr(value)?));
                }
                Ok(Value::new_object(fields))
            }
            Expr::Function(decl) => Ok(Value::Func(Func {
                decl: decl.clone(),
                closure: self.env.clone(),
            })),
            Expr::Unary { op, expr } => self.interpret_unary(*op, expr),
            Expr::Binary { lhs, op, rhs } => {
                let left = self.interpret_expr(lhs)?;
                let right = self.interpret_expr(rhs)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { lhs, op, rhs } => self.interpret_logical(lhs, *op, rhs),
            Expr::Assign {
                op,
                target,
                value,
                span,
            } => self.interpret_assignment(*op, target, value, *span),
            Expr::Update {
                op,
                prefix,
                target,
                span,
            } => self.interpret_update(*op, *prefix, target, *span),
            Expr::Member {
                object,
                property,
                span,
            } => {
                let object = self.interpret_expr(object)?;
                let key = self.interpret_property(property)?;
                self.get_member(&object, &key).map_err(|e| e.at(*span))
            }
            Expr::Call { callee, args, span } => self.interpret_call(callee, args, *span),
            Expr::New { callee, args, span } => self.interpret_new(callee, args, *span),
        }
    }

    fn interpret_unary(&mut self, op: UnaryOp, expr: &Expr) -> Result<Value, Exception> {
        if op == UnaryOp::TypeOf {
            // Undeclared names have type "undefined" instead of failing
            if let Expr::Ident(ident) = expr {
                if !self.env.borrow().contains(&ident.name) {
                    return Ok(Value::Str(Value::Undefined.type_of().to_string()));
                }
            }
        }
        let value = self.interpret_expr(expr)?;
        Ok(match op {
            UnaryOp::Bang => Value::Boolean(!value.is_truthy()),
            UnaryOp::Minus => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::TypeOf => Value::Str(value.type_of().to_string()),
        })
    }

    fn interpret_logical(
        &mut self,
        lhs: &Expr,
        op: LogicalOp,
        rhs: &Expr,
    ) -> Result<Value, Exception> {
        let left = self.interpret_expr(lhs)?;
        match (op, left.is_truthy()) {
            (LogicalOp::Or, true) | (LogicalOp::And, false) => Ok(left),
            _ => self.interpret_expr(rhs),
        }
    }

    fn interpret_property(&mut self, property: &Property) -> Result<Value, Exception> {
        match property {
            Property::Named(name) => Ok(Value::Str(name.clone())),
            Property::Computed(expr) => self.interpret_expr(expr),
        }
    }

    fn resolve_place(&mut self, target: &Expr) -> Result<Place, Exception> {
        match target {
            Expr::Ident(ident) => Ok(Place::Var(ident.name.clone())),
            Expr::Member {
                object, property, ..
            } => {
                let object = self.interpret_expr(object)?;
                let key = self.interpret_property(property)?;
                Ok(Place::Member(object, key))
            }
            _ => Err(runtime_error(ErrorMsg::InvalidAssignTarget, target)),
        }
    }

    fn read_place(&self, place: &Place) -> Result<Value, Exception> {
        match place {
            Place::Var(name) => self.env.borrow().get(name),
            Place::Member(object, key) => self.get_member(object, key),
        }
    }

    fn write_place(&mut self, place: &Place, value: Value) -> Result<(), Exception> {
        match place {
            Place::Var(name) => self.env.borrow_mut().assign(name, value),
            Place::Member(object, key) => set_member(object, key, value),
        }
    }

    fn interpret_assignment(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        span: Span,
    ) -> Result<Value, Exception> {
        let place = self.resolve_place(target).map_err(|e| e.at(span))?;
        let value = match op.bin_op() {
            None => self.interpret_expr(value)?,
            Some(bin_op) => {
                let current = self.read_place(&place).map_err(|e| e.at(span))?;
                let rhs = self.interpret_expr(value)?;
                binary(bin_op, &current, &rhs)
            }
        };
        self.write_place(&place, value.clone())
            .map_err(|e| e.at(span))?;
        Ok(value)
    }

    fn interpret_update(
        &mut self,
        op: UpdateOp,
        prefix: bool,
        target: &Expr,
        span: Span,
    ) -> Result<Value, Exception> {
        let place = self.resolve_place(target).map_err(|e| e.at(span))?;
        let old = self.read_place(&place).map_err(|e| e.at(span))?.to_number();
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.write_place(&place, Value::Number(new))
            .map_err(|e| e.at(span))?;
        Ok(Value::Number(if prefix { new } else { old }))
    }

    /// Reads `object[key]`, binding methods of arrays and strings to
    /// their receiver
    pub fn get_member(&self, object: &Value, key: &Value) -> Result<Value, Exception> {
        match object {
            Value::Object(fields) => {
                let name = key.to_string();
                fields
                    .borrow()
                    .get(&name)
                    .ok_or_else(|| runtime_error(ErrorMsg::UndefinedMember, name))
            }
            Value::Array(items) => {
                if let Some(i) = index_of(key) {
                    return Ok(items.borrow().get(i).cloned().unwrap_or(Value::Undefined));
                }
                if let Value::Number(_) = key {
                    return Ok(Value::Undefined);
                }
                let name = key.to_string();
                if name == LENGTH {
                    return Ok(Value::Number(items.borrow().len() as f64));
                }
                bind_method(methods::ARRAY_METHODS, &name, object)
            }
            Value::Str(s) => {
                if let Some(i) = index_of(key) {
                    return Ok(s
                        .chars()
                        .nth(i)
                        .map_or(Value::Undefined, |c| Value::Str(c.to_string())));
                }
                if let Value::Number(_) = key {
                    return Ok(Value::Undefined);
                }
                let name = key.to_string();
                if name == LENGTH {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                bind_method(methods::STRING_METHODS, &name, object)
            }
            _ => Err(runtime_error(
                ErrorMsg::InvalidMemberAccess,
                object.to_literal(),
            )),
        }
    }

    fn interpret_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, Exception> {
        if args.len() > MAX_ARGS {
            return Err(runtime_error(ErrorMsg::TooManyArgs, args.len()));
        }
        args.iter().map(|arg| self.interpret_expr(arg)).collect()
    }

    fn interpret_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        span: Span,
    ) -> Result<Value, Exception> {
        // Methods are called with their object as `hadi`
        let (func, this) = match callee {
            Expr::Member {
                object,
                property,
                span,
            } => {
                let object = self.interpret_expr(object)?;
                let key = self.interpret_property(property)?;
                let func = self.get_member(&object, &key).map_err(|e| e.at(*span))?;
                (func, object)
            }
            _ => (self.interpret_expr(callee)?, Value::Undefined),
        };
        let args = self.interpret_args(args).map_err(|e| e.at(span))?;
        self.call_value(&func, this, args).map_err(|e| e.at(span))
    }

    fn interpret_new(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        span: Span,
    ) -> Result<Value, Exception> {
        let constructor = self.interpret_expr(callee)?;
        let args = self.interpret_args(args).map_err(|e| e.at(span))?;
        match &constructor {
            Value::Func(func) => {
                let this = Value::new_object(vec![]);
                let res = self
                    .call_func(func, this.clone(), args)
                    .map_err(|e| e.at(span))?;
                // An explicitly returned object replaces the new one
                Ok(match res {
                    Value::Object(_) | Value::Array(_) => res,
                    _ => this,
                })
            }
            Value::NativeFunc(func) => func
                .call(self, Value::Undefined, args)
                .map_err(|e| e.at(span)),
            _ => Err(
                runtime_error(ErrorMsg::InvalidConstructor, constructor.to_literal()).at(span),
            ),
        }
    }

    /// Calls any callable value. Used for calls in the program as well
    /// as callbacks invoked by built-ins and timers.
    pub fn call_value(
        &mut self,
        callee: &Value,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, Exception> {
        let func: Box<dyn Callable> = match callee {
            Value::Func(f) => Box::new(f.clone()),
            Value::NativeFunc(f) => Box::new(f.clone()),
            _ => {
                return Err(runtime_error(
                    ErrorMsg::InvalidCallExpr,
                    callee.to_literal(),
                ))
            }
        };
        debug!("Call {} with {} arguments", func.name(), args.len());
        func.call(self, this, args)
    }

    pub(crate) fn call_func(
        &mut self,
        func: &Func,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, Exception> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(runtime_error(ErrorMsg::CallDepthExceeded, func));
        }
        let env = Env::with_parent(func.closure.clone());
        {
            let mut scope = env.borrow_mut();
            // A named function can refer to itself
            if let Some(name) = &func.decl.name {
                scope.set(&name.name, Value::Func(func.clone()));
            }
            scope.define(THIS, this, false);
            // Missing arguments are undefined, extra ones are dropped
            let mut args = args.into_iter();
            for param in &func.decl.params {
                scope.set(&param.name, args.next().unwrap_or(Value::Undefined));
            }
        }
        self.depth += 1;
        let res = self.with_scope(env, |interpreter| interpreter.interpret_items(&func.decl.body));
        self.depth -= 1;
        match res? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    fn drain_timers(&mut self) -> Result<(), Exception> {
        let mut fired = 0;
        while let Some(task) = self.timers.pop() {
            fired += 1;
            if fired > MAX_TIMER_FIRINGS {
                return Err(runtime_error(
                    ErrorMsg::TimerLimitExceeded,
                    MAX_TIMER_FIRINGS,
                ));
            }
            debug!("Fire timer {} at {}ms", task.id, self.timers.clock());
            self.call_value(&task.callback, Value::Undefined, task.args.clone())?;
            self.timers.requeue(task);
        }
        Ok(())
    }
}

/// Applies a binary operator. Every operator is total over values.
pub fn binary(op: BinOp, left: &Value, right: &Value) -> Value {
    let is_text = |v: &Value| matches!(v, Value::Str(_) | Value::Object(_) | Value::Array(_));
    match op {
        BinOp::Plus if is_text(left) || is_text(right) => Value::Str(format!("{left}{right}")),
        BinOp::Plus => Value::Number(left.to_number() + right.to_number()),
        BinOp::Minus => Value::Number(left.to_number() - right.to_number()),
        BinOp::Star => Value::Number(left.to_number() * right.to_number()),
        BinOp::Slash => Value::Number(left.to_number() / right.to_number()),
        BinOp::Modulo => Value::Number(left.to_number() % right.to_number()),
        BinOp::Greater => Value::Boolean(compare(left, right) == Some(Ordering::Greater)),
        BinOp::GreaterEqual => Value::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinOp::Less => Value::Boolean(compare(left, right) == Some(Ordering::Less)),
        BinOp::LessEqual => Value::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinOp::EqualEqual => Value::Boolean(left.loose_eq(right)),
        BinOp::BangEqual => Value::Boolean(!left.loose_eq(right)),
        BinOp::StrictEqual => Value::Boolean(left == right),
        BinOp::StrictNotEqual => Value::Boolean(left != right),
    }
}

/// Strings compare lexicographically, everything else numerically.
/// NaN is unordered.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

/// Array index denoted by a key, if any
pub fn index_of(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < usize::MAX as f64 => {
            Some(*n as usize)
        }
        Value::Str(s) => s.parse::<usize>().ok().filter(|i| i.to_string() == *s),
        _ => None,
    }
}

fn bind_method(
    table: &[(&'static str, crate::types::NativeFn)],
    name: &str,
    object: &Value,
) -> Result<Value, Exception> {
    methods::lookup(table, name)
        .map(|(name, body)| Value::NativeFunc(NativeFunc::bind(name, body, object.clone())))
        .ok_or_else(|| runtime_error(ErrorMsg::UndefinedMember, name))
}

/// Writes `object[key]`. Arrays grow with undefined holes as needed,
/// up to `MAX_ARRAY_LEN` elements.
pub fn set_member(object: &Value, key: &Value, value: Value) -> Result<(), Exception> {
    match object {
        Value::Object(fields) => {
            fields.borrow_mut().set(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let Some(i) = index_of(key).filter(|&i| i < MAX_ARRAY_LEN) else {
                return Err(runtime_error(ErrorMsg::InvalidIndex, key.to_literal()));
            };
            let mut items = items.borrow_mut();
            if i >= items.len() {
                items.resize(i + 1, Value::Undefined);
            }
            items[i] = value;
            Ok(())
        }
        _ => Err(runtime_error(
            ErrorMsg::InvalidAssignTarget,
            object.to_literal(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darija_syntax::ast::Literal;

    fn num(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::default())
    }

    #[test]
    fn var_decl() {
        let mut interpreter = Interpreter::default();
        let init = Some(num(5.0));
        assert!(interpreter
            .interpret_var_decl(DeclKind::Let, &ident("x"), &init)
            .is_ok());
        assert_eq!(interpreter.env.borrow().get("x").unwrap(), Value::Number(5.0));
        // A second declaration in the same scope fails
        assert!(interpreter
            .interpret_var_decl(DeclKind::Let, &ident("x"), &init)
            .is_err());
    }

    #[test]
    fn if_stmt() {
        let mut interpreter = Interpreter::default();
        let consequent = Stmt::Return(Some(num(1.0)));
        let alternate = Stmt::Return(Some(num(2.0)));
        let flow = interpreter
            .interpret_if_stmt(&Expr::Literal(Literal::Null), &consequent, Some(&alternate))
            .unwrap();
        assert!(matches!(flow, Flow::Return(Value::Number(n)) if n == 2.0));
    }

    #[test]
    fn while_stmt() {
        let mut interpreter = Interpreter::default();
        let test = Expr::Literal(Literal::Boolean(false));
        let flow = interpreter
            .interpret_while_stmt(&test, &Stmt::Break)
            .unwrap();
        assert!(matches!(flow, Flow::Normal));
    }

    #[test]
    fn block_scope_is_dropped() {
        let mut interpreter = Interpreter::default();
        let items = vec![Stmt::VarDecl {
            kind: DeclKind::Const,
            ident: ident("inner"),
            init: Some(num(1.0)),
        }];
        assert!(interpreter.interpret_block(&items).is_ok());
        assert!(!interpreter.env.borrow().contains("inner"));
    }

    #[test]
    fn expr() {
        let mut interpreter = Interpreter::default();

        // Addition with coercion
        let result = interpreter.interpret_expr(&Expr::Binary {
            lhs: Box::new(num(10.0)),
            op: BinOp::Plus,
            rhs: Box::new(Expr::Literal(Literal::Str("px".to_string()))),
        });
        assert_eq!(result.unwrap(), Value::Str("10px".to_string()));

        // Logical or returns an operand
        let result = interpreter.interpret_expr(&Expr::Logical {
            lhs: Box::new(Expr::Literal(Literal::Str(String::new()))),
            op: LogicalOp::Or,
            rhs: Box::new(num(20.0)),
        });
        assert_eq!(result.unwrap(), Value::Number(20.0));

        // Typeof an undeclared name
        let result = interpreter.interpret_expr(&Expr::Unary {
            op: UnaryOp::TypeOf,
            expr: Box::new(Expr::Ident(ident("nowhere"))),
        });
        assert_eq!(result.unwrap(), Value::Str("undefined".to_string()));

        // Unary minus on a numeric string
        let result = interpreter.interpret_expr(&Expr::Unary {
            op: UnaryOp::Minus,
            expr: Box::new(Expr::Literal(Literal::Str("4".to_string()))),
        });
        assert_eq!(result.unwrap(), Value::Number(-4.0));
    }

    #[test]
    fn binary_ops() {
        let s = |s: &str| Value::Str(s.to_string());
        let n = Value::Number;
        assert_eq!(binary(BinOp::Modulo, &n(-7.0), &n(3.0)), n(-1.0));
        assert_eq!(binary(BinOp::Less, &s("abc"), &s("abd")), Value::Boolean(true));
        assert_eq!(binary(BinOp::Less, &s("10"), &n(9.0)), Value::Boolean(false));
        assert_eq!(
            binary(BinOp::GreaterEqual, &n(f64::NAN), &n(1.0)),
            Value::Boolean(false)
        );
        assert_eq!(binary(BinOp::EqualEqual, &s("1"), &n(1.0)), Value::Boolean(true));
        assert_eq!(binary(BinOp::StrictEqual, &s("1"), &n(1.0)), Value::Boolean(false));
        assert_eq!(binary(BinOp::Plus, &Value::Boolean(true), &n(1.0)), n(2.0));
        assert_eq!(
            binary(BinOp::Plus, &s("x="), &Value::new_array(vec![n(1.0)])),
            s("x=[1]")
        );
    }

    #[test]
    fn members() {
        let interpreter = Interpreter::default();
        let arr = Value::new_array(vec![Value::Number(7.0)]);
        let key = |s: &str| Value::Str(s.to_string());
        assert_eq!(
            interpreter.get_member(&arr, &Value::Number(0.0)).unwrap(),
            Value::Number(7.0)
        );
        assert_eq!(
            interpreter.get_member(&arr, &Value::Number(3.0)).unwrap(),
            Value::Undefined
        );
        assert_eq!(
            interpreter.get_member(&arr, &key("twil")).unwrap(),
            Value::Number(1.0)
        );
        assert!(interpreter.get_member(&arr, &key("zid")).unwrap().is_callable());
        assert!(interpreter.get_member(&arr, &key("nope")).is_err());
        assert!(interpreter.get_member(&Value::Null, &key("x")).is_err());

        set_member(&arr, &Value::Number(2.0), Value::Boolean(true)).unwrap();
        assert_eq!(arr.to_string(), "[7, mchmcha, s7i7]");
        assert!(set_member(&arr, &key("x"), Value::Null).is_err());
        let far = Value::Number(MAX_ARRAY_LEN as f64);
        assert!(set_member(&arr, &far, Value::Null).is_err());
        assert!(set_member(&arr, &Value::Number(4e9), Value::Null).is_err());
        assert_eq!(arr.to_string(), "[7, mchmcha, s7i7]");

        let word = key("salam");
        assert_eq!(
            interpreter.get_member(&word, &key("1")).unwrap(),
            key("a")
        );
        assert_eq!(
            interpreter.get_member(&word, &key("twil")).unwrap(),
            Value::Number(5.0)
        );
    }
}
