use std::{
    cell::RefCell,
    fmt::{self, Debug, Display, Write},
    rc::Rc,
};

use darija_syntax::ast::{Function, Literal};

use crate::{environment::Env, error::Exception, interpret::Interpreter};

/// Signature shared by every native function. The second argument
/// is the receiver (`hadi`) of the call.
pub type NativeFn = fn(&mut Interpreter, Value, Vec<Value>) -> Result<Value, Exception>;

#[derive(Clone)]
pub enum Value {
    Number(f64),
    Str(String),
    Boolean(bool),
    Null,
    Undefined,
    Object(Rc<RefCell<Object>>),
    Array(Rc<RefCell<Vec<Value>>>),
    Func(Func),
    NativeFunc(NativeFunc),
}

impl Value {
    pub fn new_object(entries: Vec<(String, Value)>) -> Self {
        let mut object = Object::default();
        for (key, value) in entries {
            object.set(key, value);
        }
        Self::Object(Rc::new(RefCell::new(object)))
    }

    pub fn new_array(items: Vec<Value>) -> Self {
        Self::Array(Rc::new(RefCell::new(items)))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null | Self::Undefined => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Func(_) | Self::NativeFunc(_))
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Str(s) => parse_number(s),
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::Null => 0.0,
            _ => f64::NAN,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Undefined => "undefined",
            Self::Null | Self::Object(_) | Self::Array(_) => "object",
            Self::Func(_) | Self::NativeFunc(_) => "function",
        }
    }

    /// The display form with strings quoted, as they appear nested
    /// inside arrays and objects
    pub fn to_literal(&self) -> String {
        let mut out = String::new();
        // Writing into a `String` cannot fail
        let _ = self.write(&mut out, &mut vec![], true);
        out
    }

    /// Coercive equality used by `==` and `!=`
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null | Self::Undefined, Self::Null | Self::Undefined) => true,
            (Self::Null | Self::Undefined, _) | (_, Self::Null | Self::Undefined) => false,
            (Self::Number(_), Self::Str(_)) | (Self::Str(_), Self::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Self::Boolean(_), _) => Self::Number(self.to_number()).loose_eq(other),
            (_, Self::Boolean(_)) => self.loose_eq(&Self::Number(other.to_number())),
            (Self::Object(_) | Self::Array(_), Self::Number(_) | Self::Str(_)) => {
                Self::Str(self.to_string()).loose_eq(other)
            }
            (Self::Number(_) | Self::Str(_), Self::Object(_) | Self::Array(_)) => {
                self.loose_eq(&Self::Str(other.to_string()))
            }
            _ => self == other,
        }
    }

    /// Equality used by `fih`, under which NaN matches itself
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self == other,
        }
    }

    fn write<W: Write>(&self, f: &mut W, seen: &mut Vec<usize>, nested: bool) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Str(s) if nested => write!(f, "\"{s}\""),
            Self::Str(s) => f.write_str(s),
            Self::Boolean(true) => f.write_str("s7i7"),
            Self::Boolean(false) => f.write_str("ghalat"),
            Self::Null => f.write_str("farkha"),
            Self::Undefined => f.write_str("mchmcha"),
            Self::Array(items) => {
                let ptr = Rc::as_ptr(items) as *const () as usize;
                if seen.contains(&ptr) {
                    return f.write_str("[circular]");
                }
                seen.push(ptr);
                f.write_char('[')?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write(f, seen, true)?;
                }
                seen.pop();
                f.write_char(']')
            }
            Self::Object(object) => {
                let ptr = Rc::as_ptr(object) as *const () as usize;
                if seen.contains(&ptr) {
                    return f.write_str("[circular]");
                }
                seen.push(ptr);
                f.write_char('{')?;
                for (i, (key, value)) in object.borrow().entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: ")?;
                    value.write(f, seen, true)?;
                }
                seen.pop();
                f.write_char('}')
            }
            Self::Func(func) => write!(f, "{func}"),
            Self::NativeFunc(func) => write!(f, "{func}"),
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        match lit {
            Literal::Number(n) => Self::Number(*n),
            Literal::Str(s) => Self::Str(s.clone()),
            Literal::Boolean(b) => Self::Boolean(*b),
            Literal::Null => Self::Null,
            Literal::Undefined => Self::Undefined,
        }
    }
}

/// Strict equality: same type and value, reference identity for
/// objects, arrays and functions.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Null, Self::Null) | (Self::Undefined, Self::Undefined) => true,
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Func(a), Self::Func(b)) => {
                Rc::ptr_eq(&a.decl, &b.decl) && Rc::ptr_eq(&a.closure, &b.closure)
            }
            (Self::NativeFunc(a), Self::NativeFunc(b)) => a.name == b.name && a.this == b.this,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, &mut vec![], false)
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "Number({n})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Boolean(b) => write!(f, "Boolean({b})"),
            Self::Null => f.write_str("Null"),
            Self::Undefined => f.write_str("Undefined"),
            Self::Object(_) => write!(f, "Object({self})"),
            Self::Array(_) => write!(f, "Array({self})"),
            Self::Func(func) => write!(f, "Func({func})"),
            Self::NativeFunc(func) => write!(f, "NativeFunc({func})"),
        }
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        // Also covers negative zero
        "0".to_string()
    } else {
        n.to_string()
    }
}

fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    match s {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) =>
        {
            s.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/// String-keyed fields kept in insertion order
#[derive(Debug, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn set(&mut self, key: String, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }
}

pub trait Callable {
    fn name(&self) -> &str;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, Exception>;
}

#[derive(Clone)]
pub struct Func {
    pub decl: Rc<Function>,
    pub closure: Rc<RefCell<Env>>,
}

impl Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .decl
            .params
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "dala {}({params})", self.name())
    }
}

impl Callable for Func {
    fn name(&self) -> &str {
        self.decl.name.as_ref().map_or("", |n| n.name.as_str())
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, Exception> {
        interpreter.call_func(self, this, args)
    }
}

#[derive(Clone)]
pub struct NativeFunc {
    pub name: &'static str,
    pub body: NativeFn,
    /// Receiver captured when the function was read as a method
    pub this: Option<Box<Value>>,
}

impl NativeFunc {
    pub fn new(name: &'static str, body: NativeFn) -> Self {
        Self {
            name,
            body,
            this: None,
        }
    }

    pub fn bind(name: &'static str, body: NativeFn, this: Value) -> Self {
        Self {
            name,
            body,
            this: Some(Box::new(this)),
        }
    }
}

impl Display for NativeFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dala {}(..)", self.name)
    }
}

impl Callable for NativeFunc {
    fn name(&self) -> &str {
        self.name
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, Exception> {
        let this = self.this.as_deref().cloned().unwrap_or(this);
        (self.body)(interpreter, this, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Boolean(false).to_string(), "ghalat");
        assert_eq!(Value::Null.to_string(), "farkha");
        assert_eq!(Value::Undefined.to_string(), "mchmcha");
        let arr = Value::new_array(vec![Value::Number(1.0), Value::Str("a".to_string())]);
        assert_eq!(arr.to_string(), "[1, \"a\"]");
        let obj = Value::new_object(vec![
            ("k".to_string(), Value::Boolean(true)),
            ("l".to_string(), arr),
        ]);
        assert_eq!(obj.to_string(), "{k: s7i7, l: [1, \"a\"]}");
    }

    #[test]
    fn circular_display() {
        let arr = Value::new_array(vec![]);
        if let Value::Array(items) = &arr {
            items.borrow_mut().push(arr.clone());
        }
        assert_eq!(arr.to_string(), "[[circular]]");
    }

    #[test]
    fn truthiness() {
        for falsy in [
            Value::Null,
            Value::Undefined,
            Value::Number(0.0),
            Value::Number(f64::NAN),
            Value::Str(String::new()),
            Value::Boolean(false),
        ] {
            assert!(!falsy.is_truthy(), "{falsy:?} should be falsy");
        }
        assert!(Value::Str("0".to_string()).is_truthy());
        assert!(Value::new_array(vec![]).is_truthy());
        assert!(Value::new_object(vec![]).is_truthy());
    }

    #[test]
    fn to_number() {
        assert_eq!(Value::Str(" 42 ".to_string()).to_number(), 42.0);
        assert_eq!(Value::Str(String::new()).to_number(), 0.0);
        assert!(Value::Str("abc".to_string()).to_number().is_nan());
        assert!(Value::Str("inf".to_string()).to_number().is_nan());
        assert_eq!(Value::Boolean(true).to_number(), 1.0);
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
    }

    #[test]
    fn equality() {
        let one = Value::Number(1.0);
        let one_str = Value::Str("1".to_string());
        assert!(one.loose_eq(&one_str));
        assert!(one != one_str);
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(Value::Null != Value::Undefined);
        assert!(!Value::Null.loose_eq(&Value::Number(0.0)));
        assert!(Value::Boolean(true).loose_eq(&one));
        assert!(Value::Number(0.0).loose_eq(&Value::Str(String::new())));
        let nan = Value::Number(f64::NAN);
        assert!(nan != nan.clone());
        assert!(nan.same_value_zero(&nan));
        let arr = Value::new_array(vec![]);
        assert!(arr == arr.clone());
        assert!(arr != Value::new_array(vec![]));
    }
}
