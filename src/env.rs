use std::collections::HashMap;

use crate::value::{EnvId, SymbolId, Value};

/// The root frame: holds built-ins and top-level definitions, and serves as
/// the oracle for dynamic scope. Always index 0, created closed so it is
/// never reused by tail-call merging.
pub const ROOT: EnvId = EnvId(0);

/// One layer of the environment chain.
///
/// `outer` links to the frame in whose evaluation this frame was created
/// (the caller, or the enclosing let); `lex` links to the frame a procedure
/// captured at construction, installed when the procedure is applied.
struct Frame {
    bindings: HashMap<SymbolId, Value>,
    outer: Option<EnvId>,
    lex: Option<EnvId>,
    closed: bool,
}

/// Arena of environment frames. Frames are handed out by index and live
/// until interpreter shutdown, which is how the cycles formed by closure
/// capture are tolerated without a tracing collector.
pub struct EnvTable {
    frames: Vec<Frame>,
}

impl EnvTable {
    pub fn new() -> Self {
        EnvTable {
            frames: vec![Frame {
                bindings: HashMap::new(),
                outer: None,
                lex: None,
                closed: true,
            }],
        }
    }

    /// Create a child frame for a let, a procedure application, or a macro
    /// expansion.
    pub fn create(&mut self, outer: EnvId, lex: Option<EnvId>) -> EnvId {
        let id = EnvId(self.frames.len() as u32);
        self.frames.push(Frame {
            bindings: HashMap::new(),
            outer: Some(outer),
            lex,
            closed: false,
        });
        id
    }

    /// Insert or overwrite a binding in this frame only.
    pub fn bind(&mut self, env: EnvId, name: SymbolId, val: Value) {
        self.frames[env.0 as usize].bindings.insert(name, val);
    }

    /// Mark a frame as closed over. Set on the frame that constructs a
    /// Proc or Macro; once set, tail-call merging into it is forbidden.
    pub fn close(&mut self, env: EnvId) {
        self.frames[env.0 as usize].closed = true;
    }

    pub fn is_closed(&self, env: EnvId) -> bool {
        self.frames[env.0 as usize].closed
    }

    /// Replace the lex link when a frame is reused by tail-call merging.
    /// A merge without a captured frame leaves the existing link alone.
    pub fn set_lex(&mut self, env: EnvId, lex: Option<EnvId>) {
        if lex.is_some() {
            self.frames[env.0 as usize].lex = lex;
        }
    }

    pub fn outer(&self, env: EnvId) -> Option<EnvId> {
        self.frames[env.0 as usize].outer
    }

    pub fn lex(&self, env: EnvId) -> Option<EnvId> {
        self.frames[env.0 as usize].lex
    }

    /// Find the frame a symbol resolves in, or None if unbound.
    ///
    /// Names bound in the root frame are special variables and resolve
    /// dynamically: only the outer (caller) chain is searched, so built-ins
    /// invoked from within a closure see subsequent top-level rebinds.
    /// Everything else resolves lexically through the captured lex chain.
    pub fn resolve(&self, env: EnvId, name: SymbolId) -> Option<EnvId> {
        if self.frames[ROOT.0 as usize].bindings.contains_key(&name) {
            self.resolve_dyn(env, name)
        } else {
            self.resolve_lex(env, name)
        }
    }

    fn resolve_dyn(&self, env: EnvId, name: SymbolId) -> Option<EnvId> {
        let mut current = Some(env);
        while let Some(id) = current {
            if self.frames[id.0 as usize].bindings.contains_key(&name) {
                return Some(id);
            }
            current = self.frames[id.0 as usize].outer;
        }
        None
    }

    fn resolve_lex(&self, env: EnvId, name: SymbolId) -> Option<EnvId> {
        let frame = &self.frames[env.0 as usize];
        if frame.bindings.contains_key(&name) {
            return Some(env);
        }
        if let Some(lex) = frame.lex {
            if let Some(found) = self.resolve_lex(lex, name) {
                return Some(found);
            }
        }
        if let Some(outer) = frame.outer {
            return self.resolve_lex(outer, name);
        }
        None
    }

    /// Resolve and fetch in one step.
    pub fn lookup(&self, env: EnvId, name: SymbolId) -> Option<Value> {
        let frame = self.resolve(env, name)?;
        self.frames[frame.0 as usize].bindings.get(&name).copied()
    }

    /// Total number of frames ever created.
    pub fn count(&self) -> usize {
        self.frames.len()
    }

    /// The bindings of one frame, sorted by symbol id for stable printing.
    pub fn bindings(&self, env: EnvId) -> Vec<(SymbolId, Value)> {
        let mut entries: Vec<(SymbolId, Value)> = self.frames[env.0 as usize]
            .bindings
            .iter()
            .map(|(&k, &v)| (k, v))
            .collect();
        entries.sort_by_key(|&(k, _)| k.0);
        entries
    }
}
