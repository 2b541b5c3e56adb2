use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::{
    environment::Env,
    error::{runtime_error, ErrorMsg, Exception},
    interpret::Interpreter,
    types::{NativeFn, NativeFunc, Value},
};

/// Field holding the milliseconds of a date object
pub const DATE_FIELD: &str = "wa9t";

pub fn init(env: &mut Env) {
    init_io(env);
    init_math(env);
    init_conversion(env);
    init_object(env);
    init_date(env);
    init_timers(env);
}

/// Argument `i`, or undefined when it was not passed
pub fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn define_all(env: &mut Env, table: &[(&'static str, NativeFn)]) {
    for &(name, body) in table {
        env.define(name, Value::NativeFunc(NativeFunc::new(name, body)), false);
    }
}

const IO: &[(&str, NativeFn)] = &[
    ("tbe3", print),
    ("nbh", alert),
    ("sowel", prompt),
    ("t2kd", confirm),
    ("rmmi", raise),
];

fn init_io(env: &mut Env) {
    define_all(env, IO);
}

fn message(args: &[Value]) -> String {
    args.first().map(ToString::to_string).unwrap_or_default()
}

fn print(interpreter: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    interpreter.output.push(line);
    Ok(Value::Undefined)
}

fn alert(interpreter: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let msg = message(&args);
    interpreter.host.alert(&msg);
    interpreter.output.push(msg);
    Ok(Value::Undefined)
}

fn prompt(interpreter: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(interpreter
        .host
        .prompt(&message(&args))
        .map_or(Value::Null, Value::Str))
}

fn confirm(interpreter: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Boolean(interpreter.host.confirm(&message(&args))))
}

fn raise(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Err(Exception::Raised {
        value: arg(&args, 0),
        line: 0,
        column: 0,
    })
}

const MATH: &[(&str, NativeFn)] = &[
    ("jdr", sqrt),
    ("qowa", pow),
    ("mtl9", abs),
    ("t9rib", round),
    ("ard", floor),
    ("sqf", ceil),
    ("kbar", max),
    ("sghar", min),
    ("tsadof", random),
];

fn init_math(env: &mut Env) {
    define_all(env, MATH);
}

fn number(args: &[Value], i: usize) -> f64 {
    arg(args, i).to_number()
}

fn sqrt(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(number(&args, 0).sqrt()))
}

fn pow(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(number(&args, 0).powf(number(&args, 1))))
}

fn abs(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(number(&args, 0).abs()))
}

/// Halves round towards positive infinity
fn round(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let n = number(&args, 0);
    // `f64::round` sends halves away from zero
    let r = n.round();
    Ok(Value::Number(if n - r == 0.5 { r + 1.0 } else { r }))
}

fn floor(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(number(&args, 0).floor()))
}

fn ceil(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(number(&args, 0).ceil()))
}

/// Folds the arguments with `pick`. Any NaN argument makes the
/// result NaN.
fn extremum(args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> Value {
    let n = args.iter().map(Value::to_number).fold(init, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            pick(acc, n)
        }
    });
    Value::Number(n)
}

fn max(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(extremum(&args, f64::NEG_INFINITY, f64::max))
}

fn min(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(extremum(&args, f64::INFINITY, f64::min))
}

fn random(interpreter: &mut Interpreter, _: Value, _: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(interpreter.host.random()))
}

const CONVERSION: &[(&str, NativeFn)] = &[("r9m", to_number), ("nass", to_string)];

fn init_conversion(env: &mut Env) {
    define_all(env, CONVERSION);
}

fn to_number(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(number(&args, 0)))
}

fn to_string(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Str(arg(&args, 0).to_string()))
}

const OBJECT: &[(&str, NativeFn)] = &[("mfati7", keys), ("9iyam", values)];

fn init_object(env: &mut Env) {
    define_all(env, OBJECT);
}

fn keys(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let keys = match arg(&args, 0) {
        Value::Object(object) => object.borrow().keys(),
        Value::Array(items) => (0..items.borrow().len()).map(|i| i.to_string()).collect(),
        other => return Err(runtime_error(ErrorMsg::ExpectedObject, other.to_literal())),
    };
    Ok(Value::new_array(keys.into_iter().map(Value::Str).collect()))
}

fn values(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let values = match arg(&args, 0) {
        Value::Object(object) => object.borrow().values(),
        Value::Array(items) => items.borrow().clone(),
        other => return Err(runtime_error(ErrorMsg::ExpectedObject, other.to_literal())),
    };
    Ok(Value::new_array(values))
}

const DATE: &[(&str, NativeFn)] = &[
    ("daba", now),
    ("Tarikh", date),
    ("l3am", year),
    ("chhar", month),
    ("nhar", day),
    ("sa3a", hour),
    ("d9i9a", minute),
    ("tanya", second),
    ("nhar_simana", weekday),
];

fn init_date(env: &mut Env) {
    define_all(env, DATE);
}

/// Host time shifted by the virtual time that timers have consumed
fn now_ms(interpreter: &mut Interpreter) -> f64 {
    interpreter.host.now_ms() + interpreter.timers.clock()
}

fn now(interpreter: &mut Interpreter, _: Value, _: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(now_ms(interpreter)))
}

fn date(interpreter: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let ms = match arg(&args, 0) {
        Value::Undefined => now_ms(interpreter),
        ms => ms.to_number(),
    };
    Ok(Value::new_object(vec![(
        DATE_FIELD.to_string(),
        Value::Number(ms),
    )]))
}

/// Reads a date object or a millisecond count as a UTC timestamp
fn date_of(value: &Value) -> Result<DateTime<Utc>, Exception> {
    let ms = match value {
        Value::Object(fields) => fields.borrow().get(DATE_FIELD).map(|ms| ms.to_number()),
        Value::Number(ms) => Some(*ms),
        _ => None,
    };
    ms.filter(|ms| ms.is_finite())
        .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single())
        .ok_or_else(|| runtime_error(ErrorMsg::ExpectedDate, value.to_literal()))
}

fn year(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(f64::from(date_of(&arg(&args, 0))?.year())))
}

fn month(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(f64::from(date_of(&arg(&args, 0))?.month())))
}

fn day(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(f64::from(date_of(&arg(&args, 0))?.day())))
}

fn hour(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(f64::from(date_of(&arg(&args, 0))?.hour())))
}

fn minute(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(f64::from(date_of(&arg(&args, 0))?.minute())))
}

fn second(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    Ok(Value::Number(f64::from(date_of(&arg(&args, 0))?.second())))
}

/// 0 is Sunday
fn weekday(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let date = date_of(&arg(&args, 0))?;
    Ok(Value::Number(f64::from(
        date.weekday().num_days_from_sunday(),
    )))
}

const TIMERS: &[(&str, NativeFn)] = &[
    ("m2a9it", set_timeout),
    ("tkrar", set_interval),
    ("lghi", clear_timer),
];

fn init_timers(env: &mut Env) {
    define_all(env, TIMERS);
}

fn schedule(interpreter: &mut Interpreter, args: Vec<Value>, repeat: bool) -> Result<Value, Exception> {
    let mut args = args.into_iter();
    let callback = args.next().unwrap_or(Value::Undefined);
    if !callback.is_callable() {
        return Err(runtime_error(
            ErrorMsg::ExpectedFunction,
            callback.to_literal(),
        ));
    }
    let delay = args.next().map_or(0.0, |delay| delay.to_number());
    let id = interpreter
        .timers
        .schedule(callback, delay, args.collect(), repeat);
    Ok(Value::Number(f64::from(id)))
}

fn set_timeout(interpreter: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    schedule(interpreter, args, false)
}

fn set_interval(interpreter: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    schedule(interpreter, args, true)
}

/// Unknown handles are ignored
fn clear_timer(interpreter: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let id = number(&args, 0);
    if id.fract() == 0.0 && (1.0..=f64::from(u32::MAX)).contains(&id) {
        interpreter.timers.cancel(id as u32);
    }
    Ok(Value::Undefined)
}
