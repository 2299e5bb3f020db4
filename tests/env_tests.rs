use minilisp::printer::print_val;
use minilisp::symbol::sym;
use minilisp::{Machine, Value};

fn machine() -> Machine {
    Machine::new(1 << 22)
}

fn eval(m: &mut Machine, src: &str) -> Value {
    m.eval_str(src).unwrap()
}

#[test]
fn closures_capture_their_frame() {
    let mut m = machine();
    eval(
        &mut m,
        "(define make-adder (lambda (n) (lambda (x) (+ x n))))
         (define add3 (make-adder 3))",
    );
    assert_eq!(eval(&mut m, "(add3 4)"), Value::Int(7));
    assert_eq!(eval(&mut m, "((make-adder 10) 4)"), Value::Int(14));
    // The first closure's capture is undisturbed.
    assert_eq!(eval(&mut m, "(add3 4)"), Value::Int(7));
}

#[test]
fn top_level_names_resolve_dynamically_inside_closures() {
    let mut m = machine();
    eval(
        &mut m,
        "(define base 10)
         (define make (lambda (x) (lambda () (+ x base))))
         (define g (make 1))",
    );
    assert_eq!(eval(&mut m, "(g)"), Value::Int(11));

    // Rebinding the top-level name is visible through the existing closure,
    // while the lexically captured x is untouched.
    eval(&mut m, "(define base 20)");
    assert_eq!(eval(&mut m, "(g)"), Value::Int(21));
}

#[test]
fn rebinding_a_builtin_affects_existing_closures() {
    let mut m = machine();
    eval(&mut m, "(define bump (lambda (x) (+ x 1)))");
    assert_eq!(eval(&mut m, "(bump 1)"), Value::Int(2));
    eval(&mut m, "(define + -)");
    assert_eq!(eval(&mut m, "(bump 1)"), Value::Int(0));
}

#[test]
fn let_evaluates_values_in_the_outer_frame() {
    let mut m = machine();
    assert_eq!(eval(&mut m, "(let (x 2 y 3) (+ x y))"), Value::Int(5));
    // y's value form sees the outer x, not the one being bound.
    assert_eq!(
        eval(&mut m, "(let (x 1) (let (x 2 y x) y))"),
        Value::Int(1)
    );
}

#[test]
fn let_star_evaluates_values_sequentially() {
    let mut m = machine();
    assert_eq!(
        eval(&mut m, "(let (x 1) (let* (x 2 y x) y))"),
        Value::Int(2)
    );
}

#[test]
fn let_shape_violations_are_errors() {
    let mut m = machine();
    assert!(m.eval_str("(let (x) x)").is_err());
    assert!(m.eval_str("(let (1 2) 3)").is_err());
    assert!(m.eval_str("(let)").is_err());
}

#[test]
fn stateful_closure_over_a_let_frame() {
    let mut m = machine();
    eval(
        &mut m,
        "(define counter (let (n 0) (lambda () (set! n (+ n 1)))))",
    );
    assert_eq!(eval(&mut m, "(counter)"), Value::Int(1));
    assert_eq!(eval(&mut m, "(counter)"), Value::Int(2));
    assert_eq!(eval(&mut m, "(counter)"), Value::Int(3));
}

#[test]
fn tail_recursion_runs_in_constant_frame_depth() {
    let mut m = machine();
    eval(
        &mut m,
        "(define countdown (lambda (n) (if (= n 0) (quote done) (countdown (- n 1)))))",
    );

    let frames_before = m.envs.count();
    let cells_before = m.heap.total_cells();

    let v = eval(&mut m, "(countdown 1000000)");
    let id = v.as_symbol().expect("expected a symbol");
    assert_eq!(m.symbols.name(id), "done");

    // A million tail calls reuse one frame and allocate no cells.
    assert!(m.envs.count() - frames_before <= 2);
    assert!(m.heap.total_cells() - cells_before <= 8);
}

#[test]
fn tail_calls_through_let_and_do() {
    let mut m = machine();
    eval(
        &mut m,
        "(define spin (lambda (n)
           (let (next (- n 1))
             (do (if (= n 0) (quote ok) (spin next))))))",
    );
    let frames_before = m.envs.count();
    let v = eval(&mut m, "(spin 200000)");
    let id = v.as_symbol().expect("expected a symbol");
    assert_eq!(m.symbols.name(id), "ok");
    assert!(m.envs.count() - frames_before <= 3);
}

#[test]
fn closed_frames_are_not_merged_into() {
    let mut m = machine();
    // Constructing the inner lambda closes trap's frame. The tail call to
    // probe rebinds n, and with an (incorrect) merge into the closed frame
    // the captured n would read 99.
    eval(
        &mut m,
        "(define probe (lambda (n) n))
         (define trap (lambda (n)
           (do (define keep (lambda () n))
               (probe 99))))",
    );
    assert_eq!(eval(&mut m, "(trap 5)"), Value::Int(99));
    assert_eq!(eval(&mut m, "(keep)"), Value::Int(5));
}

#[test]
fn exit_and_friends_evaluate_to_themselves() {
    let mut m = machine();
    assert_eq!(eval(&mut m, "exit"), Value::Symbol(sym::EXIT));
    assert_eq!(
        print_val(eval(&mut m, "(cons exit null)"), &m.heap, &m.symbols),
        "(exit)"
    );
}
