//! Symbol tables: variables, constants, macros
//!
//! Three parallel tables with linear name lookup, each bounded by a fixed
//! ceiling. Variable lookup is scoped by macro-instance context: a macro
//! body sees only its own context, and caller cells become visible through
//! parameter records inserted at expansion time. Scopes (`while`/`if`/macro
//! frames) lifetime-bound variables; killing a scope reports which records
//! died so the caller can free tape cells and warn about unused names.

/// Ceiling shared by all three tables and the control-flow stack.
pub const MAX_SYMBOLS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Cell,
    Array { len: usize },
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    /// Tape cell: the cell itself for a Cell, the block base for an Array.
    pub location: usize,
    pub kind: VarKind,
    pub scope: u32,
    /// Macro-instance id; 0 is the top level.
    pub context: u32,
    /// Set on any reference; unused records warn when killed.
    pub used: bool,
    /// Macro parameters alias a caller cell; killing them frees nothing.
    pub aliased: bool,
    pub origin: usize,
}

#[derive(Debug, Default)]
pub struct VarTable {
    entries: Vec<Variable>,
}

impl VarTable {
    pub fn new() -> Self {
        VarTable::default()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_SYMBOLS
    }

    pub fn get(&self, name: &str, context: u32) -> Option<&Variable> {
        self.entries
            .iter()
            .find(|v| v.name == name && v.context == context)
    }

    pub fn get_mut(&mut self, name: &str, context: u32) -> Option<&mut Variable> {
        self.entries
            .iter_mut()
            .find(|v| v.name == name && v.context == context)
    }

    /// Insert without any checks; callers validate first.
    pub fn insert(&mut self, var: Variable) {
        self.entries.push(var);
    }

    /// Remove every record of the given scope, returning the victims
    /// (newest first, matching their allocation order in reverse).
    pub fn kill_scope(&mut self, scope: u32) -> Vec<Variable> {
        self.drain_matching(|v| v.scope == scope)
    }

    /// Remove every record of the given context.
    pub fn kill_context(&mut self, context: u32) -> Vec<Variable> {
        self.drain_matching(|v| v.context == context)
    }

    fn drain_matching(&mut self, pred: impl Fn(&Variable) -> bool) -> Vec<Variable> {
        let mut killed = Vec::new();
        let mut i = self.entries.len();
        while i > 0 {
            i -= 1;
            if pred(&self.entries[i]) {
                killed.push(self.entries.remove(i));
            }
        }
        killed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A `define`d compile-time constant.
#[derive(Debug, Clone)]
pub struct Constant {
    pub name: String,
    pub value: i64,
    pub origin: usize,
}

#[derive(Debug, Default)]
pub struct ConstTable {
    entries: Vec<Constant>,
}

impl ConstTable {
    pub fn new() -> Self {
        ConstTable::default()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_SYMBOLS
    }

    /// First definition wins, as in the original compiler; a duplicate
    /// `define` is recorded but never found.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn insert(&mut self, constant: Constant) {
        self.entries.push(constant);
    }
}

/// A recorded macro: parameter names plus the token index of the first
/// body token (the one after the closing parenthesis).
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    pub body: usize,
    pub origin: usize,
}

#[derive(Debug, Default)]
pub struct MacroTable {
    entries: Vec<Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        MacroTable::default()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_SYMBOLS
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|m| m.name == name)
    }

    pub fn get(&self, index: usize) -> &Macro {
        &self.entries[index]
    }

    pub fn insert(&mut self, mac: Macro) {
        self.entries.push(mac);
    }
}
