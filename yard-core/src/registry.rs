//! Interned names for token kinds and grammar rule tags.
//!
//! Every kind the tokenizer produces and every tag a grammar rule puts on a
//! tree node is a [`Kind`]: a small integer handed out the first time a name
//! is seen. The table is owned by one [`Registry`], so two languages built in
//! the same process never share or collide on ids.

use std::collections::HashMap;
use std::fmt;

/// Interned id of a token kind or rule tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kind(u32);

impl Kind {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bijective name <-> id table. Ids are dense, stable and never reused.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    names: Vec<String>,
    ids: HashMap<String, Kind>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, assigning the next free one on first use.
    pub fn intern(&mut self, name: &str) -> Kind {
        if let Some(kind) = self.ids.get(name) {
            return *kind;
        }
        let kind = Kind(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), kind);
        kind
    }

    /// Looks up an already interned name without assigning a new id.
    pub fn get(&self, name: &str) -> Option<Kind> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, kind: Kind) -> &str {
        self.names
            .get(kind.index())
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_ids_lazily_and_stably() {
        let mut registry = Registry::new();
        let number = registry.intern("number");
        let plus = registry.intern("+");
        assert_ne!(number, plus);
        assert_eq!(registry.intern("number"), number);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.name(plus), "+");
    }

    #[test]
    fn lookup_does_not_intern() {
        let mut registry = Registry::new();
        assert_eq!(registry.get("Expression"), None);
        assert!(registry.is_empty());
        let expression = registry.intern("Expression");
        assert_eq!(registry.get("Expression"), Some(expression));
    }

    #[test]
    fn separate_registries_do_not_share_ids() {
        let mut first = Registry::new();
        let mut second = Registry::new();
        first.intern("a");
        let b_first = first.intern("b");
        let b_second = second.intern("b");
        assert_ne!(b_first, b_second);
        assert_eq!(second.name(b_second), "b");
    }
}
