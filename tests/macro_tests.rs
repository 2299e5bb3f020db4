use minilisp::printer::print_val;
use minilisp::symbol::sym;
use minilisp::{Machine, Value};

fn machine() -> Machine {
    Machine::new(1 << 20)
}

fn eval(m: &mut Machine, src: &str) -> Value {
    m.eval_str(src).unwrap()
}

fn eval_print(m: &mut Machine, src: &str) -> String {
    let v = eval(m, src);
    print_val(v, &m.heap, &m.symbols)
}

const ADDER: &str =
    "(define m (macro (a b) (cons (quote +) (cons a (cons b null)))))";

#[test]
fn macro_rewrites_before_evaluation() {
    let mut m = machine();
    eval(&mut m, ADDER);
    assert_eq!(eval(&mut m, "(m 3 4)"), Value::Int(7));
}

#[test]
fn macro_arguments_are_not_evaluated() {
    let mut m = machine();
    // The macro quotes its argument, so the unbound symbol never evaluates.
    eval(
        &mut m,
        "(define q (macro (x) (cons (quote quote) (cons x null))))",
    );
    assert_eq!(eval_print(&mut m, "(q (this is not bound))"), "(this is not bound)");
}

#[test]
fn macroexpand_all_shows_the_rewrite() {
    let mut m = machine();
    eval(&mut m, ADDER);
    assert_eq!(
        eval_print(&mut m, "(macroexpand-all (quote (m 3 4)))"),
        "(+ 3 4)"
    );
    // Expansion reaches nested positions.
    assert_eq!(
        eval_print(&mut m, "(macroexpand-all (quote (cons (m 1 2) null)))"),
        "(cons (+ 1 2) null)"
    );
}

#[test]
fn macroexpand_all_does_not_descend_into_quote() {
    let mut m = machine();
    eval(&mut m, ADDER);
    assert_eq!(
        eval_print(&mut m, "(macroexpand-all (quote (quote (m 3 4))))"),
        "(quote (m 3 4))"
    );
    // The quoted form comes back as the same object, not a copy.
    assert_eq!(
        eval(
            &mut m,
            "(define form (quote (quote (m 3 4))))
             (eq? form (macroexpand-all form))"
        ),
        Value::Symbol(sym::T)
    );
}

#[test]
fn expansion_is_repeated_until_fixpoint() {
    let mut m = machine();
    eval(&mut m, ADDER);
    // m2 expands into a use of m, which must expand in turn.
    eval(
        &mut m,
        "(define m2 (macro (a b) (cons (quote m) (cons a (cons b null)))))",
    );
    assert_eq!(eval(&mut m, "(m2 3 4)"), Value::Int(7));
    assert_eq!(
        eval_print(&mut m, "(macroexpand-all (quote (m2 3 4)))"),
        "(+ 3 4)"
    );
}

#[test]
fn macro_with_rest_parameters() {
    let mut m = machine();
    // (when2 c e1 e2 ...) -> (if c (do e1 e2 ...))
    eval(
        &mut m,
        "(define when2 (macro (c . body)
           (cons (quote if) (cons c (cons (cons (quote do) body) null)))))",
    );
    assert_eq!(eval(&mut m, "(when2 t 1 2 3)"), Value::Int(3));
    assert!(eval(&mut m, "(when2 null 1 2 3)").is_null());
}

#[test]
fn gensym_yields_distinct_printable_symbols() {
    let mut m = machine();
    assert_eq!(
        eval(&mut m, "(eq? (gensym) (gensym))"),
        Value::Symbol(sym::F)
    );
    assert_eq!(eval(&mut m, "(symbol? (gensym))"), Value::Symbol(sym::T));
    // Fresh symbols never resolve, and never collide with interned names.
    assert_eq!(eval(&mut m, "(bound? (gensym))"), Value::Symbol(sym::F));

    let mut m = machine();
    assert_eq!(eval_print(&mut m, "(gensym)"), "#g0");
    assert_eq!(eval_print(&mut m, "(gensym \"tmp\")"), "#tmp1");
    assert_eq!(eval_print(&mut m, "(gensym)"), "#g2");
}

#[test]
fn macros_are_first_class_values() {
    let mut m = machine();
    eval(&mut m, ADDER);
    assert_eq!(eval_print(&mut m, "m"), "<Macro>");
    // A macro value can be passed around like any other value.
    assert_eq!(
        eval(&mut m, "(define id (lambda (x) x)) (eq? m (id m))"),
        Value::Symbol(sym::T)
    );
}
