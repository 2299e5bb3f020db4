// Property tests for the reader/printer round trip and arithmetic laws.

use minilisp::printer::print_val;
use minilisp::reader::read_str;
use minilisp::{Machine, Value};
use proptest::prelude::*;

fn machine() -> Machine {
    Machine::new(1 << 18)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // =========================================================================
    // Reader/printer round trip
    // =========================================================================

    #[test]
    fn integers_round_trip(n in any::<i64>()) {
        let mut m = machine();
        let text = n.to_string();
        let v = read_str(&text, &mut m.heap, &mut m.symbols).unwrap();
        prop_assert_eq!(v, Value::Int(n));
        prop_assert_eq!(print_val(v, &m.heap, &m.symbols), text);
    }

    #[test]
    fn symbols_round_trip(name in "[a-z+*?!][a-z0-9+*?!-]{0,8}") {
        let mut m = machine();
        let v = read_str(&name, &mut m.heap, &mut m.symbols).unwrap();
        prop_assert!(v.is_symbol());
        prop_assert_eq!(print_val(v, &m.heap, &m.symbols), name);
    }

    #[test]
    fn symbols_are_interned(name in "[a-z][a-z0-9-]{0,8}") {
        let mut m = machine();
        let a = read_str(&name, &mut m.heap, &mut m.symbols).unwrap();
        let b = read_str(&name, &mut m.heap, &mut m.symbols).unwrap();
        prop_assert_eq!(a, b);
    }

    // Lists must be non-empty: the literal () reads as the symbol null and
    // prints as "null", which is correct but not textually identical.
    #[test]
    fn integer_lists_round_trip(items in prop::collection::vec(any::<i64>(), 1..12)) {
        let mut m = machine();
        let words: Vec<String> = items.iter().map(|n| n.to_string()).collect();
        let text = format!("({})", words.join(" "));
        let v = read_str(&text, &mut m.heap, &mut m.symbols).unwrap();
        prop_assert_eq!(print_val(v, &m.heap, &m.symbols), text);
    }

    #[test]
    fn nested_lists_round_trip(
        inner in prop::collection::vec(any::<i64>(), 1..6),
        outer in prop::collection::vec(any::<i64>(), 0..6),
    ) {
        let mut m = machine();
        let inner_words: Vec<String> = inner.iter().map(|n| n.to_string()).collect();
        let mut words = vec![format!("({})", inner_words.join(" "))];
        words.extend(outer.iter().map(|n| n.to_string()));
        let text = format!("({})", words.join(" "));
        let v = read_str(&text, &mut m.heap, &mut m.symbols).unwrap();
        prop_assert_eq!(print_val(v, &m.heap, &m.symbols), text);
    }

    // =========================================================================
    // Arithmetic laws
    // =========================================================================

    #[test]
    fn add_commutative(a in -10000i64..10000, b in -10000i64..10000) {
        let mut m = machine();
        let r1 = m.eval_str(&format!("(+ {} {})", a, b)).unwrap();
        let r2 = m.eval_str(&format!("(+ {} {})", b, a)).unwrap();
        prop_assert_eq!(r1, r2);
    }

    #[test]
    fn add_identity(a in any::<i64>()) {
        let mut m = machine();
        let r = m.eval_str(&format!("(+ {} 0)", a)).unwrap();
        prop_assert_eq!(r, Value::Int(a));
    }

    #[test]
    fn mul_identity(a in any::<i64>()) {
        let mut m = machine();
        let r = m.eval_str(&format!("(* {} 1)", a)).unwrap();
        prop_assert_eq!(r, Value::Int(a));
    }

    #[test]
    fn sub_inverse_of_add(a in -10000i64..10000, b in -10000i64..10000) {
        let mut m = machine();
        let r = m.eval_str(&format!("(- (+ {} {}) {})", a, b, b)).unwrap();
        prop_assert_eq!(r, Value::Int(a));
    }

    #[test]
    fn quote_law(items in prop::collection::vec(any::<i64>(), 0..8)) {
        // (eval (quote X)) yields X for any readable X.
        let mut m = machine();
        let words: Vec<String> = items.iter().map(|n| n.to_string()).collect();
        let text = format!("({})", words.join(" "));
        let quoted = m.eval_str(&format!("(quote {})", text)).unwrap();
        let evaled = m.eval_str(&format!("(eval (quote (quote {})))", text)).unwrap();
        prop_assert_eq!(
            print_val(quoted, &m.heap, &m.symbols),
            print_val(evaled, &m.heap, &m.symbols)
        );
    }
}
