//! Native functions available to every script, host API included.
use std::{collections::BTreeMap, rc::Rc};

use super::{
    RuntimeError,
    interp::{Interpreter, MAX_LIST_LEN},
    scope::{Scope, ScopeRef},
    value::{Builtin, NativeFn, Value},
};
use crate::capture;

const BUILTINS: &[(&str, NativeFn)] = &[
    ("print", print),
    ("eprint", eprint),
    ("str", to_str),
    ("int", to_int),
    ("float", to_float),
    ("len", len),
    ("range", range),
    ("push", push),
    ("keys", keys),
    ("contains", contains),
    ("type", type_of),
    ("join", join),
    ("env", env),
    ("set_result", set_result),
    ("publish", publish),
    ("upload_asset", upload_asset),
    ("cacheable", cacheable),
];

/// Root scope holding every builtin.
pub fn scope() -> ScopeRef {
    let root = Scope::root();
    {
        let mut s = root.borrow_mut();
        for &(name, func) in BUILTINS {
            s.declare(Rc::from(name), Value::Builtin(Builtin { name, func }));
        }
    }
    root
}

fn arity(it: &Interpreter, name: &str, args: &[Value], min: usize, max: usize) -> Result<(), RuntimeError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min} to {max}")
    };
    Err(it.error(
        "TypeError",
        format!("{name}() takes {expected} argument(s) but {} were given", args.len()),
    ))
}

fn expect_str<'a>(it: &Interpreter, name: &str, value: &'a Value) -> Result<&'a str, RuntimeError> {
    value.as_str().ok_or_else(|| {
        it.error(
            "TypeError",
            format!("{name}() expects a string, got '{}'", value.type_name()),
        )
    })
}

fn line_of(args: &[Value]) -> String {
    let mut line = args.iter().map(Value::to_string).collect::<Vec<_>>().join(" ");
    line.push('\n');
    line
}

fn print(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    capture::write_stdout(&line_of(&args));
    Ok(Value::Null)
}

fn eprint(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    capture::write_stderr(&line_of(&args));
    Ok(Value::Null)
}

fn to_str(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "str", &args, 1, 1)?;
    Ok(Value::str(args[0].to_string()))
}

fn to_int(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "int", &args, 1, 1)?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) => float_to_int(it, *f),
        Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| {
            it.error("ValueError", format!("invalid literal for int(): {:?}", &**s))
        }),
        other => Err(it.error(
            "TypeError",
            format!("int() argument must be a string or a number, not '{}'", other.type_name()),
        )),
    }
}

fn float_to_int(it: &Interpreter, f: f64) -> Result<Value, RuntimeError> {
    if f.is_nan() {
        return Err(it.error("ValueError", "cannot convert float NaN to integer"));
    }
    let t = f.trunc();
    // i64::MIN converts exactly; i64::MAX rounds up to 2^63
    if t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Ok(Value::Int(t as i64))
    } else {
        Err(it.error("OverflowError", format!("cannot convert float {f:e} to integer")))
    }
}

fn to_float(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "float", &args, 1, 1)?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| {
            it.error("ValueError", format!("could not convert string to float: {:?}", &**s))
        }),
        other => Err(it.error(
            "TypeError",
            format!("float() argument must be a string or a number, not '{}'", other.type_name()),
        )),
    }
}

fn len(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "len", &args, 1, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Map(entries) => entries.borrow().len(),
        other => {
            return Err(it.error(
                "TypeError",
                format!("object of type '{}' has no len()", other.type_name()),
            ));
        }
    };
    Ok(Value::Int(n as i64))
}

fn range(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "range", &args, 1, 3)?;
    let mut ints = Vec::with_capacity(args.len());
    for arg in &args {
        match arg.as_int() {
            Some(i) => ints.push(i),
            None => {
                return Err(it.error(
                    "TypeError",
                    format!("range() expects integers, got '{}'", arg.type_name()),
                ));
            }
        }
    }
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(it.error("TypeError", "range() takes 1 to 3 argument(s)")),
    };
    if step == 0 {
        return Err(it.error("ValueError", "range() step must not be zero"));
    }

    let span = if step > 0 {
        (i128::from(stop) - i128::from(start)).max(0)
    } else {
        (i128::from(start) - i128::from(stop)).max(0)
    };
    let step_abs = i128::from(step).abs();
    let count = usize::try_from((span + step_abs - 1) / step_abs).ok();
    it.check_size("range", count, MAX_LIST_LEN)?;

    let mut out = Vec::with_capacity(count.unwrap_or(0));
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(Value::Int(i));
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::list(out))
}

fn push(it: &mut Interpreter, mut args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "push", &args, 2, 2)?;
    let item = args.pop().unwrap_or_default();
    match &args[0] {
        Value::List(items) => {
            items.borrow_mut().push(item);
            Ok(Value::Null)
        }
        other => Err(it.error(
            "TypeError",
            format!("push() expects a list, got '{}'", other.type_name()),
        )),
    }
}

fn keys(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "keys", &args, 1, 1)?;
    match &args[0] {
        Value::Map(entries) => Ok(Value::list(entries.borrow().keys().map(Value::str).collect())),
        other => Err(it.error(
            "TypeError",
            format!("keys() expects a map, got '{}'", other.type_name()),
        )),
    }
}

fn contains(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "contains", &args, 2, 2)?;
    let found = match (&args[0], &args[1]) {
        (Value::List(items), needle) => items.borrow().iter().any(|v| v.equals(needle)),
        (Value::Map(entries), Value::Str(k)) => entries.borrow().contains_key(&**k),
        (Value::Str(s), Value::Str(sub)) => s.contains(&**sub),
        (container, needle) => {
            return Err(it.error(
                "TypeError",
                format!(
                    "contains() cannot look for '{}' in '{}'",
                    needle.type_name(),
                    container.type_name()
                ),
            ));
        }
    };
    Ok(Value::Bool(found))
}

fn type_of(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "type", &args, 1, 1)?;
    Ok(Value::str(args[0].type_name()))
}

fn join(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "join", &args, 1, 2)?;
    let sep = match args.get(1) {
        Some(v) => expect_str(it, "join", v)?,
        None => "",
    };
    match &args[0] {
        Value::List(items) => Ok(Value::str(
            items
                .borrow()
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(sep),
        )),
        other => Err(it.error(
            "TypeError",
            format!("join() expects a list, got '{}'", other.type_name()),
        )),
    }
}

/// `env()` returns the whole scoped environment, `env(key)` one value or `null`.
fn env(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "env", &args, 0, 1)?;
    let env = it.runtime().host.env();
    match args.first() {
        None => Ok(Value::map(
            env.iter()
                .map(|(k, v)| (k.to_string(), Value::str(v)))
                .collect::<BTreeMap<_, _>>(),
        )),
        Some(key) => {
            let key = expect_str(it, "env", key)?;
            Ok(env.get(key).map(Value::str).unwrap_or_default())
        }
    }
}

fn set_result(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "set_result", &args, 1, 1)?;
    it.runtime().host.set_result(args[0].to_string());
    Ok(Value::Null)
}

fn publish(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "publish", &args, 2, 2)?;
    let name = expect_str(it, "publish", &args[0])?;
    let doc = args[1]
        .to_json()
        .map_err(|e| it.error("TypeError", format!("publish(): {e}")))?;
    it.runtime()
        .host
        .publish(name, &doc)
        .map(Value::str)
        .map_err(|e| it.error("HostError", e.to_string()))
}

fn upload_asset(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "upload_asset", &args, 2, 2)?;
    let name = expect_str(it, "upload_asset", &args[0])?;
    let content = args[1].to_string();
    let id = it
        .runtime()
        .host
        .upload_asset(name, content.as_bytes())
        .map_err(|e| it.error("HostError", e.to_string()))?;
    i64::try_from(id)
        .map(Value::Int)
        .map_err(|_| it.error("OverflowError", "asset id does not fit an int"))
}

fn cacheable(it: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
    arity(it, "cacheable", &args, 0, 1)?;
    let flag = args.first().is_none_or(Value::is_truthy);
    it.runtime().host.set_cacheable(flag);
    Ok(Value::Null)
}
