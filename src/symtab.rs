//! Lexical scopes and global symbol tables.
//!
//! The parser records every declaration here: variables go into the innermost
//! open scope (or the global table at file scope), functions and prototypes
//! into tables that persist for the whole translation unit. Lookups search
//! the scope stack innermost-first, then the globals.
//!
//! Scopes are pushed on function entry and on every `{...}` block, and popped
//! strictly LIFO; popping a scope drops every local it introduced.

use crate::parser::ast::DataType;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Func,
}

/// Signature of a function or prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSignature {
    pub return_type: DataType,
    pub params: Vec<DataType>,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub declared_type: DataType,
    pub signature: Option<FuncSignature>,
}

impl Symbol {
    pub fn var(declared_type: DataType) -> Symbol {
        Symbol {
            kind: SymbolKind::Var,
            declared_type,
            signature: None,
        }
    }

    pub fn func(signature: FuncSignature) -> Symbol {
        Symbol {
            kind: SymbolKind::Func,
            declared_type: signature.return_type,
            signature: Some(signature),
        }
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    globals: FxHashMap<String, Symbol>,
    functions: FxHashMap<String, Symbol>,
    prototypes: FxHashMap<String, FuncSignature>,
    scopes: Vec<FxHashMap<String, Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop_scope(&mut self) {
        // An unmatched pop is a compiler bug, not a user error.
        if self.scopes.pop().is_none() {
            panic!("scope stack underflow: pop_scope without matching push_scope");
        }
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Insert a symbol. Variables go into the innermost open scope, or the
    /// global table at file scope; functions go into the function table.
    /// Returns `false` when the name already exists in that table.
    pub fn insert(&mut self, name: &str, symbol: Symbol) -> bool {
        let table = match symbol.kind {
            SymbolKind::Func => &mut self.functions,
            SymbolKind::Var => self.scopes.last_mut().unwrap_or(&mut self.globals),
        };
        if table.contains_key(name) {
            return false;
        }
        table.insert(name.to_string(), symbol);
        true
    }

    /// Record a function prototype. Re-declaring a prototype is allowed and
    /// overwrites the previous signature.
    pub fn insert_prototype(&mut self, name: &str, signature: FuncSignature) {
        self.prototypes.insert(name.to_string(), signature);
    }

    /// Whether `name` exists with the given kind. Variables are searched
    /// innermost scope outward and then in the globals; functions only in
    /// the function table.
    pub fn exists(&self, name: &str, kind: SymbolKind) -> bool {
        self.lookup(name, kind).is_some()
    }

    pub fn lookup(&self, name: &str, kind: SymbolKind) -> Option<&Symbol> {
        match kind {
            SymbolKind::Func => self.functions.get(name),
            SymbolKind::Var => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| scope.get(name))
                .or_else(|| self.globals.get(name)),
        }
    }

    pub fn prototype_exists(&self, name: &str) -> bool {
        self.prototypes.contains_key(name)
    }

    pub fn prototype(&self, name: &str) -> Option<&FuncSignature> {
        self.prototypes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_lookup() {
        let mut table = SymbolTable::new();
        assert!(table.insert("g", Symbol::var(DataType::Int)));

        table.push_scope();
        assert!(table.insert("x", Symbol::var(DataType::Int)));

        table.push_scope();
        assert!(table.insert("y", Symbol::var(DataType::Float)));

        // Inner scope sees everything outward, then globals.
        assert!(table.exists("y", SymbolKind::Var));
        assert!(table.exists("x", SymbolKind::Var));
        assert!(table.exists("g", SymbolKind::Var));

        table.pop_scope();
        assert!(!table.exists("y", SymbolKind::Var));
        assert!(table.exists("x", SymbolKind::Var));

        table.pop_scope();
        assert!(!table.exists("x", SymbolKind::Var));
        assert_eq!(table.scope_depth(), 0);
    }

    #[test]
    fn test_same_scope_duplicate_is_rejected() {
        let mut table = SymbolTable::new();
        table.push_scope();
        assert!(table.insert("x", Symbol::var(DataType::Int)));
        assert!(!table.insert("x", Symbol::var(DataType::Int)));

        // Shadowing in a nested scope is fine.
        table.push_scope();
        assert!(table.insert("x", Symbol::var(DataType::Float)));
        table.pop_scope();
        table.pop_scope();
    }

    #[test]
    fn test_functions_are_global() {
        let mut table = SymbolTable::new();
        let sig = FuncSignature {
            return_type: DataType::Int,
            params: vec![DataType::Int],
        };

        table.push_scope();
        assert!(table.insert("f", Symbol::func(sig.clone())));
        table.pop_scope();

        // The function table persists after the scope is gone.
        assert!(table.exists("f", SymbolKind::Func));
        assert!(!table.exists("f", SymbolKind::Var));

        table.insert_prototype("g", sig);
        assert!(table.prototype_exists("g"));
        assert!(!table.prototype_exists("f"));
    }

    #[test]
    #[should_panic(expected = "scope stack underflow")]
    fn test_unbalanced_pop_panics() {
        let mut table = SymbolTable::new();
        table.pop_scope();
    }
}
