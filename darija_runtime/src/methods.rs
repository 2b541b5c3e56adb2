use std::{cell::RefCell, rc::Rc};

use crate::{
    error::{runtime_error, ErrorMsg, Exception},
    interpret::Interpreter,
    stdlib::arg,
    types::{NativeFn, Value},
};

pub const ARRAY_METHODS: &[(&str, NativeFn)] = &[
    ("zid", push),
    ("7iyed", pop),
    ("zid_lwl", unshift),
    ("7iyed_lwl", shift),
    ("7awl", map),
    ("sffi", filter),
    ("kol_wahed", for_each),
    ("l9a", find),
    ("fin", index_of),
    ("fih", includes),
    ("jme3", reduce),
    ("lsse9", join),
    ("9te3", slice),
];

pub const STRING_METHODS: &[(&str, NativeFn)] = &[
    ("kbir", upper),
    ("sghir", lower),
    ("fih", str_includes),
    ("fin", str_index_of),
    ("9te3", str_slice),
    ("9sem", split),
    ("n9i", trim),
];

pub fn lookup(table: &[(&'static str, NativeFn)], name: &str) -> Option<(&'static str, NativeFn)> {
    table.iter().find(|(n, _)| *n == name).copied()
}

fn items(this: &Value) -> Result<Rc<RefCell<Vec<Value>>>, Exception> {
    match this {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(runtime_error(ErrorMsg::ExpectedObject, this.to_literal())),
    }
}

/// Copy of the elements, so callbacks are free to mutate the array
fn snapshot(this: &Value) -> Result<Vec<Value>, Exception> {
    Ok(items(this)?.borrow().clone())
}

fn callback(args: &[Value]) -> Result<Value, Exception> {
    let f = arg(args, 0);
    if !f.is_callable() {
        return Err(runtime_error(ErrorMsg::ExpectedFunction, f.to_literal()));
    }
    Ok(f)
}

/// Calls `f(element, index, array)` for each element in order
fn each(
    interpreter: &mut Interpreter,
    this: &Value,
    f: &Value,
    mut visit: impl FnMut(Value, Value) -> bool,
) -> Result<(), Exception> {
    for (i, item) in snapshot(this)?.into_iter().enumerate() {
        let res = interpreter.call_value(
            f,
            Value::Undefined,
            vec![item.clone(), Value::Number(i as f64), this.clone()],
        )?;
        if !visit(item, res) {
            break;
        }
    }
    Ok(())
}

fn push(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let items = items(&this)?;
    let mut items = items.borrow_mut();
    items.extend(args);
    Ok(Value::Number(items.len() as f64))
}

fn pop(_: &mut Interpreter, this: Value, _: Vec<Value>) -> Result<Value, Exception> {
    Ok(items(&this)?.borrow_mut().pop().unwrap_or(Value::Undefined))
}

fn unshift(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let items = items(&this)?;
    let mut items = items.borrow_mut();
    items.splice(0..0, args);
    Ok(Value::Number(items.len() as f64))
}

fn shift(_: &mut Interpreter, this: Value, _: Vec<Value>) -> Result<Value, Exception> {
    let items = items(&this)?;
    let mut items = items.borrow_mut();
    if items.is_empty() {
        return Ok(Value::Undefined);
    }
    Ok(items.remove(0))
}

fn map(interpreter: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let f = callback(&args)?;
    let mut out = vec![];
    each(interpreter, &this, &f, |_, res| {
        out.push(res);
        true
    })?;
    Ok(Value::new_array(out))
}

fn filter(interpreter: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let f = callback(&args)?;
    let mut out = vec![];
    each(interpreter, &this, &f, |item, res| {
        if res.is_truthy() {
            out.push(item);
        }
        true
    })?;
    Ok(Value::new_array(out))
}

fn for_each(interpreter: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let f = callback(&args)?;
    each(interpreter, &this, &f, |_, _| true)?;
    Ok(Value::Undefined)
}

fn find(interpreter: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let f = callback(&args)?;
    let mut found = Value::Undefined;
    each(interpreter, &this, &f, |item, res| {
        if res.is_truthy() {
            found = item;
            return false;
        }
        true
    })?;
    Ok(found)
}

fn index_of(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let needle = arg(&args, 0);
    let pos = items(&this)?.borrow().iter().position(|item| *item == needle);
    Ok(Value::Number(pos.map_or(-1.0, |i| i as f64)))
}

fn includes(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let needle = arg(&args, 0);
    let found = items(&this)?
        .borrow()
        .iter()
        .any(|item| item.same_value_zero(&needle));
    Ok(Value::Boolean(found))
}

fn reduce(interpreter: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let f = callback(&args)?;
    let mut rest = snapshot(&this)?.into_iter().enumerate();
    let mut acc = match args.get(1) {
        Some(init) => init.clone(),
        None => match rest.next() {
            Some((_, first)) => first,
            None => return Err(runtime_error(ErrorMsg::EmptyReduce, this.to_literal())),
        },
    };
    for (i, item) in rest {
        acc = interpreter.call_value(
            &f,
            Value::Undefined,
            vec![acc, item, Value::Number(i as f64), this.clone()],
        )?;
    }
    Ok(acc)
}

fn join(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let sep = match arg(&args, 0) {
        Value::Undefined => ",".to_string(),
        sep => sep.to_string(),
    };
    let joined = items(&this)?
        .borrow()
        .iter()
        .map(|item| match item {
            Value::Null | Value::Undefined => String::new(),
            item => item.to_string(),
        })
        .collect::<Vec<_>>()
        .join(&sep);
    Ok(Value::Str(joined))
}

/// Resolves `9te3` bounds against a length. Negative bounds count
/// from the end, and the result never runs backwards.
fn slice_bounds(len: usize, start: &Value, end: &Value) -> (usize, usize) {
    let resolve = |bound: &Value, default: usize| {
        if let Value::Undefined = bound {
            return default;
        }
        let n = bound.to_number();
        let n = if n.is_nan() { 0.0 } else { n.trunc() };
        let n = if n < 0.0 {
            (len as f64 + n).max(0.0)
        } else {
            n.min(len as f64)
        };
        n as usize
    };
    let start = resolve(start, 0);
    let end = resolve(end, len);
    (start, end.max(start))
}

fn slice(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let items = snapshot(&this)?;
    let (start, end) = slice_bounds(items.len(), &arg(&args, 0), &arg(&args, 1));
    Ok(Value::new_array(items[start..end].to_vec()))
}

fn text(this: &Value) -> Result<String, Exception> {
    match this {
        Value::Str(s) => Ok(s.clone()),
        _ => Err(runtime_error(ErrorMsg::InvalidMemberAccess, this.to_literal())),
    }
}

fn upper(_: &mut Interpreter, this: Value, _: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Str(text(&this)?.to_uppercase()))
}

fn lower(_: &mut Interpreter, this: Value, _: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Str(text(&this)?.to_lowercase()))
}

fn str_includes(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let needle = arg(&args, 0).to_string();
    Ok(Value::Boolean(text(&this)?.contains(&needle)))
}

/// Position counted in characters, or -1
fn str_index_of(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let s = text(&this)?;
    let needle = arg(&args, 0).to_string();
    let pos = s
        .find(&needle)
        .map_or(-1.0, |byte| s[..byte].chars().count() as f64);
    Ok(Value::Number(pos))
}

fn str_slice(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let chars = text(&this)?.chars().collect::<Vec<_>>();
    let (start, end) = slice_bounds(chars.len(), &arg(&args, 0), &arg(&args, 1));
    Ok(Value::Str(chars[start..end].iter().collect()))
}

fn split(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let s = text(&this)?;
    let parts = match arg(&args, 0) {
        Value::Undefined => vec![Value::Str(s)],
        sep => match sep.to_string().as_str() {
            "" => s.chars().map(|c| Value::Str(c.to_string())).collect(),
            sep => s.split(sep).map(|p| Value::Str(p.to_string())).collect(),
        },
    };
    Ok(Value::new_array(parts))
}

fn trim(_: &mut Interpreter, this: Value, _: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Str(text(&this)?.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NativeFunc;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn s(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    fn nums(ns: &[f64]) -> Value {
        Value::new_array(ns.iter().copied().map(Value::Number).collect())
    }

    fn double() -> Value {
        Value::NativeFunc(NativeFunc::new("double", |_, _, args| {
            Ok(Value::Number(arg(&args, 0).to_number() * 2.0))
        }))
    }

    fn is_odd() -> Value {
        Value::NativeFunc(NativeFunc::new("is_odd", |_, _, args| {
            Ok(Value::Boolean(arg(&args, 0).to_number() % 2.0 == 1.0))
        }))
    }

    fn sum() -> Value {
        Value::NativeFunc(NativeFunc::new("sum", |_, _, args| {
            Ok(Value::Number(
                arg(&args, 0).to_number() + arg(&args, 1).to_number(),
            ))
        }))
    }

    #[test]
    fn mutators() {
        let mut interpreter = Interpreter::default();
        let arr = nums(&[1.0, 2.0]);
        assert_eq!(push(&mut interpreter, arr.clone(), vec![num(3.0)]).unwrap(), num(3.0));
        assert_eq!(pop(&mut interpreter, arr.clone(), vec![]).unwrap(), num(3.0));
        assert_eq!(unshift(&mut interpreter, arr.clone(), vec![num(0.0)]).unwrap(), num(3.0));
        assert_eq!(arr.to_string(), "[0, 1, 2]");
        assert_eq!(shift(&mut interpreter, arr.clone(), vec![]).unwrap(), num(0.0));
        assert_eq!(arr.to_string(), "[1, 2]");

        let empty = nums(&[]);
        assert_eq!(pop(&mut interpreter, empty.clone(), vec![]).unwrap(), Value::Undefined);
        assert_eq!(shift(&mut interpreter, empty, vec![]).unwrap(), Value::Undefined);
    }

    #[test]
    fn callbacks() {
        let mut interpreter = Interpreter::default();
        let arr = nums(&[1.0, 2.0, 3.0]);
        let mapped = map(&mut interpreter, arr.clone(), vec![double()]).unwrap();
        assert_eq!(mapped.to_string(), "[2, 4, 6]");
        let odd = filter(&mut interpreter, arr.clone(), vec![is_odd()]).unwrap();
        assert_eq!(odd.to_string(), "[1, 3]");
        assert_eq!(find(&mut interpreter, arr.clone(), vec![is_odd()]).unwrap(), num(1.0));
        assert_eq!(reduce(&mut interpreter, arr.clone(), vec![sum()]).unwrap(), num(6.0));
        assert_eq!(
            reduce(&mut interpreter, arr.clone(), vec![sum(), num(10.0)]).unwrap(),
            num(16.0)
        );
        assert!(reduce(&mut interpreter, nums(&[]), vec![sum()]).is_err());
        assert!(map(&mut interpreter, arr, vec![num(1.0)]).is_err());
    }

    #[test]
    fn searching() {
        let mut interpreter = Interpreter::default();
        let arr = Value::new_array(vec![num(1.0), s("1"), num(f64::NAN)]);
        assert_eq!(index_of(&mut interpreter, arr.clone(), vec![s("1")]).unwrap(), num(1.0));
        assert_eq!(index_of(&mut interpreter, arr.clone(), vec![num(f64::NAN)]).unwrap(), num(-1.0));
        assert_eq!(
            includes(&mut interpreter, arr.clone(), vec![num(f64::NAN)]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            includes(&mut interpreter, arr, vec![num(2.0)]).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn join_and_slice() {
        let mut interpreter = Interpreter::default();
        let arr = Value::new_array(vec![num(1.0), Value::Null, s("a")]);
        assert_eq!(join(&mut interpreter, arr.clone(), vec![]).unwrap(), s("1,,a"));
        assert_eq!(join(&mut interpreter, arr, vec![s(" - ")]).unwrap(), s("1 -  - a"));

        let arr = nums(&[1.0, 2.0, 3.0, 4.0]);
        let sliced = slice(&mut interpreter, arr.clone(), vec![num(1.0), num(-1.0)]).unwrap();
        assert_eq!(sliced.to_string(), "[2, 3]");
        let sliced = slice(&mut interpreter, arr.clone(), vec![num(-2.0)]).unwrap();
        assert_eq!(sliced.to_string(), "[3, 4]");
        let sliced = slice(&mut interpreter, arr, vec![num(3.0), num(1.0)]).unwrap();
        assert_eq!(sliced.to_string(), "[]");
    }

    #[test]
    fn strings() {
        let mut interpreter = Interpreter::default();
        let word = s("  Salam Dunya ");
        assert_eq!(trim(&mut interpreter, word.clone(), vec![]).unwrap(), s("Salam Dunya"));
        assert_eq!(upper(&mut interpreter, s("abc"), vec![]).unwrap(), s("ABC"));
        assert_eq!(lower(&mut interpreter, s("ABC"), vec![]).unwrap(), s("abc"));
        assert_eq!(
            str_includes(&mut interpreter, word.clone(), vec![s("Dun")]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(str_index_of(&mut interpreter, s("é-x"), vec![s("x")]).unwrap(), num(2.0));
        assert_eq!(str_index_of(&mut interpreter, word, vec![s("z")]).unwrap(), num(-1.0));
        assert_eq!(str_slice(&mut interpreter, s("salam"), vec![num(1.0), num(3.0)]).unwrap(), s("al"));
        assert_eq!(
            split(&mut interpreter, s("a,b,c"), vec![s(",")]).unwrap().to_string(),
            "[\"a\", \"b\", \"c\"]"
        );
        assert_eq!(
            split(&mut interpreter, s("ab"), vec![s("")]).unwrap().to_string(),
            "[\"a\", \"b\"]"
        );
        assert_eq!(
            split(&mut interpreter, s("ab"), vec![]).unwrap().to_string(),
            "[\"ab\"]"
        );
    }

    #[test]
    fn lookup_by_name() {
        assert!(lookup(ARRAY_METHODS, "7awl").is_some());
        assert!(lookup(STRING_METHODS, "7awl").is_none());
        assert_eq!(lookup(STRING_METHODS, "n9i").map(|(name, _)| name), Some("n9i"));
    }
}
