use std::time::Instant;

use crate::env::{EnvTable, ROOT};
use crate::error::{LispError, Result};
use crate::heap::Heap;
use crate::primitives::{self, Builtin, PrimFn};
use crate::printer;
use crate::reader;
use crate::symbol::{sym, SymbolTable};
use crate::value::{BuiltinId, EnvId, SymbolId, Value};

/// The interpreter machine. All runtime state lives here: the value heap,
/// the symbol table, the environment frame arena, and the built-in table.
pub struct Machine {
    pub heap: Heap,
    pub symbols: SymbolTable,
    pub envs: EnvTable,
    pub builtins: Vec<Builtin>,
    /// Monotonic counter behind `gensym`.
    pub gensyms: u64,
    /// Interpreter start time, reported by `get-time`.
    pub start: Instant,
    /// Print every dispatched form to stderr.
    pub trace: bool,
}

/// What a special form hands back to the evaluator loop: a finished value,
/// or a form to continue with (the tail position of the dispatched form).
enum Step {
    Done(Value),
    Tail { env: EnvId, form: Value, tail: bool },
}

impl Machine {
    pub fn new(heap_capacity: usize) -> Self {
        let mut m = Machine {
            heap: Heap::new(heap_capacity),
            symbols: SymbolTable::new(),
            envs: EnvTable::new(),
            builtins: Vec::new(),
            gensyms: 0,
            start: Instant::now(),
            trace: false,
        };
        primitives::install(&mut m);
        m
    }

    pub fn register_builtin(&mut self, name: &'static str, func: PrimFn) -> BuiltinId {
        let id = BuiltinId(self.builtins.len() as u32);
        self.builtins.push(Builtin { name, func });
        id
    }

    // ========================================================================
    // Top-level entry points
    // ========================================================================

    /// Expand and evaluate a form in the root frame.
    pub fn eval_top(&mut self, form: Value) -> Result<Value> {
        self.eval_top_in(ROOT, form)
    }

    /// Expand and evaluate a form in the given frame. The `eval` built-in
    /// reifies this against the calling frame.
    pub fn eval_top_in(&mut self, env: EnvId, form: Value) -> Result<Value> {
        let expanded = self.macro_expand(env, form)?;
        self.eval(env, expanded, false)
    }

    /// Read and evaluate every form in a string, returning the last value
    /// (`null` for empty input).
    pub fn eval_str(&mut self, input: &str) -> Result<Value> {
        let mut pos = 0;
        let mut last = Value::null();
        while let Some((form, next)) =
            reader::read_one_at(input, pos, &mut self.heap, &mut self.symbols)?
        {
            pos = next;
            last = self.eval_top(form)?;
        }
        Ok(last)
    }

    // ========================================================================
    // Macro expansion
    // ========================================================================

    /// Fully expand all macro forms. A pure rewrite prior to evaluation:
    /// macros see only syntax, never dynamic values.
    pub fn macro_expand(&mut self, env: EnvId, form: Value) -> Result<Value> {
        let Value::Cons(id) = form else {
            return Ok(form);
        };

        let head = self.heap.car(id);

        // Quoted forms are opaque to expansion.
        if head == Value::Symbol(sym::QUOTE) {
            return Ok(form);
        }

        if let Value::Symbol(op) = head {
            if let Some(Value::Macro(pid)) = self.envs.lookup(env, op) {
                let rec = *self.heap.proc(pid);
                let args = self.heap.cdr(id);
                let argv = self
                    .heap
                    .list_to_vec(args)
                    .ok_or_else(|| LispError::Runtime("improper macro argument list".into()))?;
                let frame = self.envs.create(env, Some(rec.env));
                self.bind_params(frame, rec.params, &argv)?;
                let expanded = self.eval(frame, rec.body, false)?;
                return self.macro_expand(env, expanded);
            }
        }

        let car = self.macro_expand(env, self.heap.car(id))?;
        let cdr = self.macro_expand(env, self.heap.cdr(id))?;
        self.heap.cons(car, cdr)
    }

    // ========================================================================
    // The evaluator
    // ========================================================================

    /// Evaluate a form. Tail positions iterate instead of recursing, so a
    /// tail-recursive program runs in constant native stack; the frame-merge
    /// policy below keeps the environment chain constant as well.
    pub fn eval(&mut self, env: EnvId, form: Value, tail: bool) -> Result<Value> {
        let mut env = env;
        let mut form = form;
        let mut tail = tail;

        loop {
            if self.trace {
                eprintln!(
                    "eval: {}",
                    printer::print_val(form, &self.heap, &self.symbols)
                );
            }

            match form {
                Value::Int(_) | Value::Str(_) => return Ok(form),

                Value::Symbol(id) => {
                    return self
                        .envs
                        .lookup(env, id)
                        .ok_or_else(|| LispError::Unbound(self.symbols.name(id).to_string()));
                }

                Value::Cons(id) => {
                    let head = self.heap.car(id);
                    let args = self.heap.cdr(id);

                    if let Value::Symbol(op) = head {
                        if let Some(step) = self.special_form(env, op, args, tail)? {
                            match step {
                                Step::Done(v) => return Ok(v),
                                Step::Tail {
                                    env: e,
                                    form: f,
                                    tail: t,
                                } => {
                                    env = e;
                                    form = f;
                                    tail = t;
                                    continue;
                                }
                            }
                        }
                    }

                    let callee = self.eval(env, head, false)?;
                    match callee {
                        Value::Proc(pid) => {
                            let rec = *self.heap.proc(pid);
                            let argv = self.eval_args(env, args)?;

                            // Tail-call merge: reuse the current frame when it
                            // has not been closed over, adopting the callee's
                            // captured frame as the lex link.
                            let target = if tail && !self.envs.is_closed(env) {
                                self.envs.set_lex(env, Some(rec.env));
                                env
                            } else {
                                self.envs.create(env, Some(rec.env))
                            };
                            self.bind_params(target, rec.params, &argv)?;

                            env = target;
                            form = rec.body;
                            tail = true;
                            continue;
                        }
                        Value::Builtin(bid) => {
                            let argv = self.eval_args(env, args)?;
                            if self.trace {
                                eprintln!("call: {}", self.builtins[bid.0 as usize].name);
                            }
                            let func = self.builtins[bid.0 as usize].func;
                            return func(self, env, &argv);
                        }
                        Value::Macro(_) => {
                            return Err(LispError::Type(
                                "macro applied without expansion".into(),
                            ));
                        }
                        other => {
                            return Err(LispError::NotCallable(printer::print_val(
                                other,
                                &self.heap,
                                &self.symbols,
                            )));
                        }
                    }
                }

                // Procs, macros, and built-ins handed straight to eval are
                // self-evaluating.
                _ => return Ok(form),
            }
        }
    }

    /// Evaluate the argument forms of an application, left to right, in the
    /// caller's frame. The form list must be proper.
    fn eval_args(&mut self, env: EnvId, args: Value) -> Result<Vec<Value>> {
        let forms = self
            .heap
            .list_to_vec(args)
            .ok_or_else(|| LispError::Runtime("improper argument list in application".into()))?;
        let mut out = Vec::with_capacity(forms.len());
        for form in forms {
            out.push(self.eval(env, form, false)?);
        }
        Ok(out)
    }

    /// Bind a parameter list against an argument vector in `frame`.
    /// A dotted-tail symbol takes the remaining arguments as a proper list.
    fn bind_params(&mut self, frame: EnvId, params: Value, args: &[Value]) -> Result<()> {
        let mut params = params;
        let mut i = 0;
        loop {
            match params {
                Value::Cons(pid) => {
                    let name = self
                        .heap
                        .car(pid)
                        .as_symbol()
                        .ok_or_else(|| LispError::Type("parameter is not a symbol".into()))?;
                    if i >= args.len() {
                        return Err(LispError::Arity("too few arguments".into()));
                    }
                    self.envs.bind(frame, name, args[i]);
                    i += 1;
                    params = self.heap.cdr(pid);
                }
                Value::Symbol(s) if s != sym::NULL => {
                    let rest = self.heap.list(&args[i..])?;
                    self.envs.bind(frame, s, rest);
                    return Ok(());
                }
                Value::Symbol(_) => {
                    return if i == args.len() {
                        Ok(())
                    } else {
                        Err(LispError::Arity("too many arguments".into()))
                    };
                }
                _ => return Err(LispError::Type("malformed parameter list".into())),
            }
        }
    }

    // ========================================================================
    // Special forms
    // ========================================================================

    /// Dispatch a special form by head symbol. Returns Ok(None) when the
    /// symbol names no special form and ordinary application should proceed.
    fn special_form(
        &mut self,
        env: EnvId,
        op: SymbolId,
        args: Value,
        tail: bool,
    ) -> Result<Option<Step>> {
        if op == sym::QUOTE {
            self.form_quote(args).map(Some)
        } else if op == sym::IF {
            self.form_if(env, args, tail).map(Some)
        } else if op == sym::DO {
            self.form_do(env, args, tail).map(Some)
        } else if op == sym::DEFINE {
            self.form_define(env, args).map(Some)
        } else if op == sym::SET {
            self.form_set(env, args).map(Some)
        } else if op == sym::LET {
            self.form_let(env, args, tail).map(Some)
        } else if op == sym::LET_STAR {
            self.form_let_star(env, args, tail).map(Some)
        } else if op == sym::LAMBDA {
            self.form_lambda(env, args, false).map(Some)
        } else if op == sym::MACRO {
            self.form_lambda(env, args, true).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Materialize special-form arguments; the form list must be proper.
    fn form_args(&self, name: &str, args: Value) -> Result<Vec<Value>> {
        self.heap
            .list_to_vec(args)
            .ok_or_else(|| LispError::Arity(format!("malformed '{}' form", name)))
    }

    fn form_quote(&mut self, args: Value) -> Result<Step> {
        let argv = self.form_args("quote", args)?;
        if argv.len() != 1 {
            return Err(LispError::Arity("'quote' expects 1 argument".into()));
        }
        Ok(Step::Done(argv[0]))
    }

    fn form_if(&mut self, env: EnvId, args: Value, tail: bool) -> Result<Step> {
        let argv = self.form_args("if", args)?;
        if argv.len() != 2 && argv.len() != 3 {
            return Err(LispError::Arity("'if' expects 2 or 3 arguments".into()));
        }
        let cond = self.eval(env, argv[0], false)?;
        if !cond.is_null() {
            Ok(Step::Tail {
                env,
                form: argv[1],
                tail,
            })
        } else if argv.len() == 3 {
            Ok(Step::Tail {
                env,
                form: argv[2],
                tail,
            })
        } else {
            Ok(Step::Done(Value::null()))
        }
    }

    fn form_do(&mut self, env: EnvId, args: Value, tail: bool) -> Result<Step> {
        let argv = self.form_args("do", args)?;
        let Some((&last, init)) = argv.split_last() else {
            return Ok(Step::Done(Value::null()));
        };
        for &form in init {
            self.eval(env, form, false)?;
        }
        Ok(Step::Tail {
            env,
            form: last,
            tail,
        })
    }

    fn form_define(&mut self, env: EnvId, args: Value) -> Result<Step> {
        let argv = self.form_args("define", args)?;
        if argv.len() != 2 {
            return Err(LispError::Arity("'define' expects 2 arguments".into()));
        }
        let name = argv[0]
            .as_symbol()
            .ok_or_else(|| LispError::Type("'define' expects a symbol name".into()))?;
        let val = self.eval(env, argv[1], false)?;
        self.envs.bind(ROOT, name, val);
        Ok(Step::Done(Value::Symbol(name)))
    }

    /// `set!` targets the frame the name resolves in. An unresolved name
    /// falls back to the root frame, so a stray set! acts as a top-level
    /// define.
    fn form_set(&mut self, env: EnvId, args: Value) -> Result<Step> {
        let argv = self.form_args("set!", args)?;
        if argv.len() != 2 {
            return Err(LispError::Arity("'set!' expects 2 arguments".into()));
        }
        let name = argv[0]
            .as_symbol()
            .ok_or_else(|| LispError::Type("'set!' expects a symbol name".into()))?;
        let val = self.eval(env, argv[1], false)?;
        let target = self.envs.resolve(env, name).unwrap_or(ROOT);
        self.envs.bind(target, name, val);
        Ok(Step::Done(val))
    }

    /// Parse a flat alternating binding list into (name, value-form) pairs.
    fn let_pairs(&self, name: &str, form: Value) -> Result<Vec<(SymbolId, Value)>> {
        let items = self.heap.list_to_vec(form).ok_or_else(|| {
            LispError::Runtime(format!("'{}' bindings must be a proper list", name))
        })?;
        if items.len() % 2 != 0 {
            return Err(LispError::Runtime(format!(
                "odd number of '{}' bindings",
                name
            )));
        }
        items
            .chunks(2)
            .map(|pair| {
                let sym = pair[0].as_symbol().ok_or_else(|| {
                    LispError::Type(format!("'{}' binding name is not a symbol", name))
                })?;
                Ok((sym, pair[1]))
            })
            .collect()
    }

    /// `let`: every value form is evaluated in the outer frame before any
    /// binding is installed.
    fn form_let(&mut self, env: EnvId, args: Value, tail: bool) -> Result<Step> {
        let Value::Cons(aid) = args else {
            return Err(LispError::Arity("'let' expects a binding list".into()));
        };
        let pairs = self.let_pairs("let", self.heap.car(aid))?;
        let body = self.heap.cdr(aid);

        let mut values = Vec::with_capacity(pairs.len());
        for &(_, form) in &pairs {
            values.push(self.eval(env, form, false)?);
        }

        let target = if tail && !self.envs.is_closed(env) {
            env
        } else {
            self.envs.create(env, None)
        };
        for ((name, _), val) in pairs.into_iter().zip(values) {
            self.envs.bind(target, name, val);
        }

        let form = self.heap.cons(Value::Symbol(sym::DO), body)?;
        Ok(Step::Tail {
            env: target,
            form,
            tail: true,
        })
    }

    /// `let*`: each value form is evaluated in the child frame, so it sees
    /// the bindings before it.
    fn form_let_star(&mut self, env: EnvId, args: Value, tail: bool) -> Result<Step> {
        let Value::Cons(aid) = args else {
            return Err(LispError::Arity("'let*' expects a binding list".into()));
        };
        let pairs = self.let_pairs("let*", self.heap.car(aid))?;
        let body = self.heap.cdr(aid);

        let target = if tail && !self.envs.is_closed(env) {
            env
        } else {
            self.envs.create(env, None)
        };
        for (name, form) in pairs {
            let val = self.eval(target, form, false)?;
            self.envs.bind(target, name, val);
        }

        let form = self.heap.cons(Value::Symbol(sym::DO), body)?;
        Ok(Step::Tail {
            env: target,
            form,
            tail: true,
        })
    }

    /// `lambda` and `macro` share one constructor; only the value tag
    /// differs. Constructing either closes the current frame.
    fn form_lambda(&mut self, env: EnvId, args: Value, is_macro: bool) -> Result<Step> {
        let Value::Cons(aid) = args else {
            return Err(LispError::Arity(if is_macro {
                "'macro' expects a parameter list".into()
            } else {
                "'lambda' expects a parameter list".into()
            }));
        };
        let params = self.heap.car(aid);
        let body = self.heap.cons(Value::Symbol(sym::DO), self.heap.cdr(aid))?;
        self.envs.close(env);
        let pid = self.heap.alloc_proc(params, body, env);
        Ok(Step::Done(if is_macro {
            Value::Macro(pid)
        } else {
            Value::Proc(pid)
        }))
    }
}
