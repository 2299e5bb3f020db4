use crate::heap::Heap;
use crate::symbol::SymbolTable;
use crate::value::Value;

/// Print a value to a string.
///
/// Integers print decimal, strings print their raw characters (unescaped),
/// symbols print their bare name, and cons chains print with the standard
/// list sugar when the final cdr is `null`. Procedures, macros, and
/// built-ins print as opaque tokens.
pub fn print_val(val: Value, heap: &Heap, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    print_inner(val, heap, symbols, &mut out);
    out
}

fn print_inner(val: Value, heap: &Heap, symbols: &SymbolTable, out: &mut String) {
    match val {
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Str(id) => out.push_str(heap.string(id)),
        Value::Symbol(id) => out.push_str(symbols.name(id)),
        Value::Proc(_) => out.push_str("<Proc>"),
        Value::Macro(_) => out.push_str("<Macro>"),
        Value::Builtin(_) => out.push_str("<PredefinedProc>"),
        Value::Cons(id) => {
            out.push('(');
            print_inner(heap.car(id), heap, symbols, out);

            let mut current = heap.cdr(id);
            loop {
                if current.is_null() {
                    break;
                }
                match current {
                    Value::Cons(next) => {
                        out.push(' ');
                        print_inner(heap.car(next), heap, symbols, out);
                        current = heap.cdr(next);
                    }
                    _ => {
                        out.push_str(" . ");
                        print_inner(current, heap, symbols, out);
                        break;
                    }
                }
            }
            out.push(')');
        }
    }
}
