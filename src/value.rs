use std::fmt;

use crate::symbol::sym;

/// Unique identifier for an interned (or gensym-created) symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Index into the cons-cell arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairId(pub u32);

/// Index into the string arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrId(pub u32);

/// Index into the proc/macro arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcId(pub u32);

/// Index into the built-in procedure table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuiltinId(pub u32);

/// Index into the environment frame arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(pub u32);

/// The fundamental value: discriminant + inline payload.
/// Copy semantics — pair, string, and proc payloads live in heap arenas,
/// so `==` on two Values is exactly the object identity `eq?` observes:
/// integers compare by value, everything else by arena id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    Str(StrId),
    Symbol(SymbolId),
    Cons(PairId),
    Proc(ProcId),
    Macro(ProcId),
    Builtin(BuiltinId),
}

impl Value {
    /// The empty list is the interned symbol `null`.
    pub fn null() -> Value {
        Value::Symbol(sym::NULL)
    }

    pub fn is_null(self) -> bool {
        self == Value::Symbol(sym::NULL)
    }

    pub fn is_cons(self) -> bool {
        matches!(self, Value::Cons(_))
    }

    pub fn is_symbol(self) -> bool {
        matches!(self, Value::Symbol(_))
    }

    pub fn as_cons(self) -> Option<PairId> {
        match self {
            Value::Cons(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_symbol(self) -> Option<SymbolId> {
        match self {
            Value::Symbol(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(self) -> Option<StrId> {
        match self {
            Value::Str(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Str(id) => write!(f, "Str({})", id.0),
            Value::Symbol(id) => write!(f, "Sym({})", id.0),
            Value::Cons(id) => write!(f, "Cons({})", id.0),
            Value::Proc(id) => write!(f, "Proc({})", id.0),
            Value::Macro(id) => write!(f, "Macro({})", id.0),
            Value::Builtin(id) => write!(f, "Builtin({})", id.0),
        }
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

impl fmt::Debug for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairId({})", self.0)
    }
}

impl fmt::Debug for StrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrId({})", self.0)
    }
}

impl fmt::Debug for ProcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcId({})", self.0)
    }
}

impl fmt::Debug for BuiltinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinId({})", self.0)
    }
}

impl fmt::Debug for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvId({})", self.0)
    }
}
