//! The macro table: every `#define` currently in effect.

use rustc_hash::FxHashMap;

use crate::macro_def::{self, MacroDef};

/// Names the expander resolves dynamically when no stored definition
/// shadows them.
pub(crate) const DYNAMIC_MACROS: &[&str] =
    &["__LINE__", "__FILE__", "__DATE__", "__TIME__", "__COUNTER__"];

/// Mutable set of macro definitions, keyed by name.
///
/// Redefinition silently replaces the previous entry; the last definition
/// wins, matching how the directives are processed in source order.
#[derive(Debug, Default)]
pub struct MacroTable {
    map: FxHashMap<String, MacroDef>,
}

impl MacroTable {
    /// Empty table.
    pub fn new() -> Self {
        MacroTable::default()
    }

    /// Insert or replace a definition.
    pub fn define(&mut self, name: impl Into<String>, def: MacroDef) {
        let name = name.into();
        log::trace!("defining macro '{name}'");
        self.map.insert(name, def);
    }

    /// Parse `text` with the `#define` grammar and insert the result.
    /// Returns `false` if the text is not a well-formed definition.
    pub fn add_definition_line(&mut self, text: &str, line: u32) -> bool {
        match macro_def::parse_definition(text, line) {
            Some((name, def)) => {
                self.define(name, def);
                true
            }
            None => false,
        }
    }

    /// Remove a definition. Removing an unknown name is a no-op.
    pub fn undefine(&mut self, name: &str) {
        log::trace!("undefining macro '{name}'");
        self.map.remove(name);
    }

    /// Look up a definition by name.
    pub fn lookup(&self, name: &str) -> Option<&MacroDef> {
        self.map.get(name)
    }

    /// True if `name` is defined, counting the dynamic built-ins the way
    /// `defined` does.
    pub fn is_defined(&self, name: &str) -> bool {
        self.map.contains_key(name) || DYNAMIC_MACROS.contains(&name)
    }

    /// Number of stored definitions.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if no macros are stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_undefine_roundtrip() {
        let mut table = MacroTable::new();
        assert!(table.add_definition_line("A 1", 1));
        assert!(table.is_defined("A"));
        table.undefine("A");
        assert!(!table.is_defined("A"));
        // removing again stays quiet
        table.undefine("A");
    }

    #[test]
    fn last_definition_wins() {
        let mut table = MacroTable::new();
        table.add_definition_line("A 1", 1);
        table.add_definition_line("A 2", 2);
        let def = table.lookup("A").unwrap();
        assert_eq!(def.body[0].value, "2");
    }

    #[test]
    fn malformed_definitions_are_rejected() {
        let mut table = MacroTable::new();
        assert!(!table.add_definition_line("", 1));
        assert!(!table.add_definition_line("1BAD", 1));
        assert!(table.is_empty());
    }

    #[test]
    fn dynamic_builtins_count_as_defined() {
        let table = MacroTable::new();
        assert!(table.is_defined("__LINE__"));
        assert!(table.is_defined("__FILE__"));
        assert!(!table.is_defined("__LALA__"));
        assert!(table.lookup("__LINE__").is_none());
    }
}
