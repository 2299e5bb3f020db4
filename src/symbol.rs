use std::collections::HashMap;

use crate::value::SymbolId;

/// Interned symbol table. Each unique symbol name maps to a unique SymbolId.
/// `(eq? (quote foo) (quote foo))` is true because both resolve to the same id.
pub struct SymbolTable {
    name_to_id: HashMap<String, SymbolId>,
    id_to_name: Vec<String>,
}

/// Well-known symbol ids, pre-interned at startup.
/// These must match the order of interning in SymbolTable::new().
pub mod sym {
    use crate::value::SymbolId;

    pub const NULL: SymbolId = SymbolId(0);
    pub const T: SymbolId = SymbolId(1);
    pub const F: SymbolId = SymbolId(2);
    pub const EXIT: SymbolId = SymbolId(3);
    pub const QUOTE: SymbolId = SymbolId(4);
    pub const IF: SymbolId = SymbolId(5);
    pub const DO: SymbolId = SymbolId(6);
    pub const DEFINE: SymbolId = SymbolId(7);
    pub const SET: SymbolId = SymbolId(8);
    pub const LET: SymbolId = SymbolId(9);
    pub const LET_STAR: SymbolId = SymbolId(10);
    pub const LAMBDA: SymbolId = SymbolId(11);
    pub const MACRO: SymbolId = SymbolId(12);
}

impl SymbolTable {
    /// Create a new symbol table with all well-known symbols pre-interned.
    /// The order MUST match the constants in the `sym` module above.
    pub fn new() -> Self {
        let names = [
            "null", "t", "f", "exit",
            "quote", "if", "do", "define", "set!", "let", "let*", "lambda", "macro",
        ];

        let mut name_to_id = HashMap::new();
        let mut id_to_name = Vec::new();

        for (i, name) in names.iter().enumerate() {
            let id = SymbolId(i as u32);
            name_to_id.insert(name.to_string(), id);
            id_to_name.push(name.to_string());
        }

        SymbolTable {
            name_to_id,
            id_to_name,
        }
    }

    /// Intern a symbol name. Returns the existing id if already interned,
    /// or creates a new one.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = SymbolId(self.id_to_name.len() as u32);
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.push(name.to_string());
        id
    }

    /// Record a name WITHOUT interning it, so the returned id is distinct
    /// from every other id, past and future. Backs `gensym`.
    pub fn fresh(&mut self, name: String) -> SymbolId {
        let id = SymbolId(self.id_to_name.len() as u32);
        self.id_to_name.push(name);
        id
    }

    /// Look up a symbol name by its id.
    pub fn name(&self, id: SymbolId) -> &str {
        &self.id_to_name[id.0 as usize]
    }

    /// Look up a symbol id by name, without interning.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.name_to_id.get(name).copied()
    }

    /// Total number of symbols, interned and fresh.
    pub fn count(&self) -> usize {
        self.id_to_name.len()
    }
}
