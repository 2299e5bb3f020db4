use std::fs;
use std::io::{self, Write};

use crate::env::ROOT;
use crate::error::{LispError, Result};
use crate::eval::Machine;
use crate::printer;
use crate::reader::{self, Reader};
use crate::stream::Source;
use crate::symbol::sym;
use crate::value::{EnvId, Value};

/// Signature shared by every built-in: the machine, the frame the call was
/// evaluated in, and the already-evaluated argument vector.
pub type PrimFn = fn(&mut Machine, EnvId, &[Value]) -> Result<Value>;

/// One entry in the built-in table. The table index is the Builtin value's
/// identity for `eq?`.
pub struct Builtin {
    pub name: &'static str,
    pub func: PrimFn,
}

const TABLE: &[(&str, PrimFn)] = &[
    ("eq?", prim_eq),
    ("null?", prim_null_p),
    ("cons?", prim_cons_p),
    ("list?", prim_list_p),
    ("symbol?", prim_symbol_p),
    ("int?", prim_int_p),
    ("string?", prim_string_p),
    ("proc?", prim_proc_p),
    ("+", prim_add),
    ("-", prim_sub),
    ("*", prim_mul),
    ("/", prim_div),
    ("mod", prim_mod),
    ("=", prim_num_eq),
    ("<", prim_num_lt),
    ("car", prim_car),
    ("cdr", prim_cdr),
    ("cons", prim_cons),
    ("print", prim_print),
    ("println", prim_println),
    ("print-to-string", prim_print_to_string),
    ("gensym", prim_gensym),
    ("bound?", prim_bound_p),
    ("eval", prim_eval),
    ("read", prim_read),
    ("load", prim_load),
    ("macroexpand-all", prim_macroexpand_all),
    ("env-print", prim_env_print),
    ("env-print-all", prim_env_print_all),
    ("get-time", prim_get_time),
];

/// Bind the self-evaluating symbols and every built-in into the root frame.
pub fn install(m: &mut Machine) {
    for id in [sym::NULL, sym::T, sym::F, sym::EXIT] {
        m.envs.bind(ROOT, id, Value::Symbol(id));
    }
    for &(name, func) in TABLE {
        let bid = m.register_builtin(name, func);
        let name_sym = m.symbols.intern(name);
        m.envs.bind(ROOT, name_sym, Value::Builtin(bid));
    }
}

fn bool_val(b: bool) -> Value {
    Value::Symbol(if b { sym::T } else { sym::F })
}

fn want(name: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(LispError::Arity(format!(
            "'{}' expects {} argument(s)",
            name, n
        )));
    }
    Ok(())
}

fn int_arg(name: &str, val: Value) -> Result<i64> {
    val.as_int()
        .ok_or_else(|| LispError::Type(format!("'{}' expects integers", name)))
}

// ============================================================================
// Identity and type predicates
// ============================================================================

/// Pairwise object identity: integers by value, everything else by arena id.
/// Two equal string literals are distinct objects and compare false.
fn prim_eq(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(LispError::Arity("'eq?' expects at least one argument".into()));
    }
    Ok(bool_val(args.windows(2).all(|w| w[0] == w[1])))
}

fn prim_null_p(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("null?", args, 1)?;
    Ok(bool_val(args[0].is_null()))
}

fn prim_cons_p(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("cons?", args, 1)?;
    Ok(bool_val(args[0].is_cons()))
}

fn prim_list_p(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("list?", args, 1)?;
    Ok(bool_val(args[0].is_cons() || args[0].is_null()))
}

fn prim_symbol_p(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("symbol?", args, 1)?;
    Ok(bool_val(args[0].is_symbol()))
}

fn prim_int_p(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("int?", args, 1)?;
    Ok(bool_val(matches!(args[0], Value::Int(_))))
}

fn prim_string_p(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("string?", args, 1)?;
    Ok(bool_val(matches!(args[0], Value::Str(_))))
}

/// Procedures are Procs and built-ins; macros are not procedures.
fn prim_proc_p(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("proc?", args, 1)?;
    Ok(bool_val(matches!(
        args[0],
        Value::Proc(_) | Value::Builtin(_)
    )))
}

// ============================================================================
// Arithmetic
// ============================================================================

fn prim_add(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    let mut value: i64 = 0;
    for &arg in args {
        value = value.wrapping_add(int_arg("+", arg)?);
    }
    Ok(Value::Int(value))
}

fn prim_sub(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(LispError::Arity("'-' expects at least one argument".into()));
    }
    let first = int_arg("-", args[0])?;
    if args.len() == 1 {
        return Ok(Value::Int(first.wrapping_neg()));
    }
    let mut value = first;
    for &arg in &args[1..] {
        value = value.wrapping_sub(int_arg("-", arg)?);
    }
    Ok(Value::Int(value))
}

fn prim_mul(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    let mut value: i64 = 1;
    for &arg in args {
        value = value.wrapping_mul(int_arg("*", arg)?);
    }
    Ok(Value::Int(value))
}

fn prim_div(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(LispError::Arity("'/' expects at least one argument".into()));
    }
    let mut value = int_arg("/", args[0])?;
    for &arg in &args[1..] {
        let divisor = int_arg("/", arg)?;
        if divisor == 0 {
            return Err(LispError::Runtime("dividing by zero".into()));
        }
        value = value.wrapping_div(divisor);
    }
    Ok(Value::Int(value))
}

fn prim_mod(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("mod", args, 2)?;
    let value = int_arg("mod", args[0])?;
    let divisor = int_arg("mod", args[1])?;
    if divisor == 0 {
        return Err(LispError::Runtime("dividing by zero".into()));
    }
    Ok(Value::Int(value.wrapping_rem(divisor)))
}

/// Comparison chains return t on success and null (not f) on failure.
fn compare_chain(name: &str, args: &[Value], ok: fn(i64, i64) -> bool) -> Result<Value> {
    if args.is_empty() {
        return Err(LispError::Arity(format!(
            "'{}' expects at least one argument",
            name
        )));
    }
    let mut ints = Vec::with_capacity(args.len());
    for &arg in args {
        ints.push(int_arg(name, arg)?);
    }
    for pair in ints.windows(2) {
        if !ok(pair[0], pair[1]) {
            return Ok(Value::null());
        }
    }
    Ok(Value::Symbol(sym::T))
}

fn prim_num_eq(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    compare_chain("=", args, |a, b| a == b)
}

fn prim_num_lt(_m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    compare_chain("<", args, |a, b| a < b)
}

// ============================================================================
// Lists
// ============================================================================

fn prim_car(m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("car", args, 1)?;
    match args[0] {
        Value::Cons(id) => Ok(m.heap.car(id)),
        _ => Err(LispError::Type("'car' expects a cons".into())),
    }
}

fn prim_cdr(m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("cdr", args, 1)?;
    match args[0] {
        Value::Cons(id) => Ok(m.heap.cdr(id)),
        _ => Err(LispError::Type("'cdr' expects a cons".into())),
    }
}

fn prim_cons(m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("cons", args, 2)?;
    m.heap.cons(args[0], args[1])
}

// ============================================================================
// I/O
// ============================================================================

fn write_stdout(text: &str) -> Result<()> {
    let mut out = io::stdout();
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| LispError::Runtime(format!("write failed: {}", e)))
}

fn prim_print(m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    for &arg in args {
        let text = printer::print_val(arg, &m.heap, &m.symbols);
        write_stdout(&text)?;
    }
    Ok(Value::null())
}

fn prim_println(m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    for &arg in args {
        let mut text = printer::print_val(arg, &m.heap, &m.symbols);
        text.push('\n');
        write_stdout(&text)?;
    }
    Ok(Value::null())
}

fn prim_print_to_string(m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    let mut text = String::new();
    for &arg in args {
        text.push_str(&printer::print_val(arg, &m.heap, &m.symbols));
    }
    let id = m.heap.alloc_str(text);
    Ok(Value::Str(id))
}

// ============================================================================
// Reflection and system
// ============================================================================

/// A fresh uninterned symbol: "#g<n>" bare, "#<prefix><n>" with a string
/// prefix. The counter is process-monotonic.
fn prim_gensym(m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    let name = match args {
        [] => format!("#g{}", m.gensyms),
        [arg] => {
            let id = arg
                .as_str()
                .ok_or_else(|| LispError::Type("'gensym' expects a string prefix".into()))?;
            format!("#{}{}", m.heap.string(id), m.gensyms)
        }
        _ => {
            return Err(LispError::Arity(
                "'gensym' expects at most one argument".into(),
            ));
        }
    };
    m.gensyms += 1;
    Ok(Value::Symbol(m.symbols.fresh(name)))
}

fn prim_bound_p(m: &mut Machine, env: EnvId, args: &[Value]) -> Result<Value> {
    want("bound?", args, 1)?;
    let name = args[0]
        .as_symbol()
        .ok_or_else(|| LispError::Type("'bound?' expects a symbol".into()))?;
    Ok(bool_val(m.envs.lookup(env, name).is_some()))
}

fn prim_eval(m: &mut Machine, env: EnvId, args: &[Value]) -> Result<Value> {
    want("eval", args, 1)?;
    m.eval_top_in(env, args[0])
}

/// Read one form from standard input. Parse failure and end of input both
/// yield null, the reader's distinguished "no value".
fn prim_read(m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("read", args, 0)?;
    let mut reader = Reader::new(Source::stdin(), &mut m.heap, &mut m.symbols);
    match reader.read() {
        Ok(Some(val)) => Ok(val),
        Ok(None) | Err(_) => Ok(Value::null()),
    }
}

/// Read-eval every top-level form of a file. Returns t on completion and
/// null when the file cannot be opened or fails to parse; evaluation errors
/// are reported and the load continues with the next form.
fn prim_load(m: &mut Machine, env: EnvId, args: &[Value]) -> Result<Value> {
    want("load", args, 1)?;
    let path = args[0]
        .as_str()
        .ok_or_else(|| LispError::Type("'load' expects a string path".into()))?;
    let source = match fs::read_to_string(m.heap.string(path)) {
        Ok(text) => text,
        Err(_) => return Ok(Value::null()),
    };

    let mut pos = 0;
    loop {
        match reader::read_one_at(&source, pos, &mut m.heap, &mut m.symbols) {
            Ok(Some((form, next))) => {
                pos = next;
                if let Err(e) = m.eval_top_in(env, form) {
                    eprintln!("Exception error: {}", e);
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("{}", e);
                return Ok(Value::null());
            }
        }
    }
    Ok(Value::Symbol(sym::T))
}

fn prim_macroexpand_all(m: &mut Machine, env: EnvId, args: &[Value]) -> Result<Value> {
    want("macroexpand-all", args, 1)?;
    m.macro_expand(env, args[0])
}

fn format_frame(m: &Machine, env: EnvId) -> String {
    let mut out = String::from("{");
    for (name, val) in m.envs.bindings(env) {
        out.push_str(m.symbols.name(name));
        out.push(':');
        out.push_str(&printer::print_val(val, &m.heap, &m.symbols));
        out.push(',');
    }
    out.push('}');
    out
}

fn format_chain(m: &Machine, env: EnvId) -> String {
    // The root frame is elided; it holds every built-in.
    if m.envs.outer(env).is_none() {
        return "{...}".to_string();
    }
    let mut out = String::from("{");
    for (name, val) in m.envs.bindings(env) {
        out.push_str(m.symbols.name(name));
        out.push(':');
        out.push_str(&printer::print_val(val, &m.heap, &m.symbols));
        out.push(',');
    }
    if let Some(lex) = m.envs.lex(env) {
        out.push_str("#lex:");
        out.push_str(&format_chain(m, lex));
    }
    if let Some(outer) = m.envs.outer(env) {
        out.push_str("#outer:");
        out.push_str(&format_chain(m, outer));
    }
    out.push('}');
    out
}

fn prim_env_print(m: &mut Machine, env: EnvId, args: &[Value]) -> Result<Value> {
    want("env-print", args, 0)?;
    let text = format_frame(m, env);
    write_stdout(&text)?;
    write_stdout("\n")?;
    Ok(Value::null())
}

fn prim_env_print_all(m: &mut Machine, env: EnvId, args: &[Value]) -> Result<Value> {
    want("env-print-all", args, 0)?;
    let text = format_chain(m, env);
    write_stdout(&text)?;
    write_stdout("\n")?;
    Ok(Value::null())
}

fn prim_get_time(m: &mut Machine, _env: EnvId, args: &[Value]) -> Result<Value> {
    want("get-time", args, 0)?;
    Ok(Value::Int(m.start.elapsed().as_millis() as i64))
}
