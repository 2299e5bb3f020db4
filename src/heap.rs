use crate::error::{LispError, Result};
use crate::value::{EnvId, PairId, ProcId, StrId, Value};

/// A single cons cell. Cells are never mutated after construction; the
/// runtime has no set-car!/set-cdr!, so cons structure cannot become cyclic.
pub struct ConsCell {
    pub car: Value,
    pub cdr: Value,
}

/// A user-defined procedure or macro: parameter list, body form, and the
/// frame captured at construction. Which of the two it is lives in the
/// Value tag, not here.
#[derive(Clone, Copy)]
pub struct ProcRecord {
    pub params: Value,
    pub body: Value,
    pub env: EnvId,
}

/// The heap: arenas for cons cells, string payloads, and proc records.
/// PairId/StrId/ProcId are indices into the respective arenas. Nothing is
/// ever freed before interpreter shutdown; that is the accepted policy for
/// the cycles environment capture can form.
pub struct Heap {
    cells: Vec<ConsCell>,
    strings: Vec<String>,
    procs: Vec<ProcRecord>,
    capacity: usize,
}

impl Heap {
    pub fn new(capacity: usize) -> Self {
        Heap {
            cells: Vec::with_capacity(1024),
            strings: Vec::new(),
            procs: Vec::new(),
            capacity,
        }
    }

    /// Allocate a new cons cell.
    /// Returns Err(HeapOverflow) if capacity is exceeded.
    pub fn alloc(&mut self, car: Value, cdr: Value) -> Result<PairId> {
        if self.cells.len() >= self.capacity {
            return Err(LispError::HeapOverflow);
        }
        let id = PairId(self.cells.len() as u32);
        self.cells.push(ConsCell { car, cdr });
        Ok(id)
    }

    /// Allocate a cons cell and wrap it as a Value.
    pub fn cons(&mut self, car: Value, cdr: Value) -> Result<Value> {
        Ok(Value::Cons(self.alloc(car, cdr)?))
    }

    #[inline]
    pub fn car(&self, id: PairId) -> Value {
        self.cells[id.0 as usize].car
    }

    #[inline]
    pub fn cdr(&self, id: PairId) -> Value {
        self.cells[id.0 as usize].cdr
    }

    /// Allocate a string payload. Every call yields a distinct id, so two
    /// equal string literals are still distinct objects under `eq?`.
    pub fn alloc_str(&mut self, s: String) -> StrId {
        let id = StrId(self.strings.len() as u32);
        self.strings.push(s);
        id
    }

    pub fn string(&self, id: StrId) -> &str {
        &self.strings[id.0 as usize]
    }

    /// Allocate a proc/macro record.
    pub fn alloc_proc(&mut self, params: Value, body: Value, env: EnvId) -> ProcId {
        let id = ProcId(self.procs.len() as u32);
        self.procs.push(ProcRecord { params, body, env });
        id
    }

    pub fn proc(&self, id: ProcId) -> &ProcRecord {
        &self.procs[id.0 as usize]
    }

    /// Build a proper list from a slice of values.
    pub fn list(&mut self, values: &[Value]) -> Result<Value> {
        let mut result = Value::null();
        for &val in values.iter().rev() {
            result = self.cons(val, result)?;
        }
        Ok(result)
    }

    /// Returns true if this value is a proper list: a cons chain (or nothing)
    /// terminated by the symbol `null`.
    pub fn is_proper_list(&self, val: Value) -> bool {
        let mut current = val;
        loop {
            if current.is_null() {
                return true;
            }
            match current {
                Value::Cons(id) => current = self.cdr(id),
                _ => return false,
            }
        }
    }

    /// Collect a proper list into a Vec. Returns None if not a proper list.
    pub fn list_to_vec(&self, val: Value) -> Option<Vec<Value>> {
        let mut result = Vec::new();
        let mut current = val;
        loop {
            if current.is_null() {
                return Some(result);
            }
            match current {
                Value::Cons(id) => {
                    result.push(self.car(id));
                    current = self.cdr(id);
                }
                _ => return None,
            }
        }
    }

    /// Number of allocated cons cells.
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_round_trips_through_vec() {
        let mut heap = Heap::new(64);
        let items = [Value::Int(1), Value::Int(2), Value::Int(3)];
        let list = heap.list(&items).unwrap();
        assert!(heap.is_proper_list(list));
        assert_eq!(heap.list_to_vec(list).unwrap(), items);
    }

    #[test]
    fn dotted_pair_is_not_a_proper_list() {
        let mut heap = Heap::new(64);
        let pair = heap.cons(Value::Int(1), Value::Int(2)).unwrap();
        assert!(!heap.is_proper_list(pair));
        assert!(heap.list_to_vec(pair).is_none());
    }

    #[test]
    fn alloc_respects_capacity() {
        let mut heap = Heap::new(1);
        heap.cons(Value::Int(1), Value::null()).unwrap();
        assert!(matches!(
            heap.cons(Value::Int(2), Value::null()),
            Err(LispError::HeapOverflow)
        ));
    }
}
