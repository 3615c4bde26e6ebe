//! Alias Cell Arena
//!
//! The per-routine universe of alias cells: the shared, single-value boxes
//! behind Fern's reference assignments. Variables never own a cell inline;
//! they hold an AliasId handle into this arena, which sidesteps ownership
//! cycles no matter how many bindings share one cell.
//!
//! Cell chaining is resolved before codegen (a cell never holds another
//! cell); the arena only hands out flat handles.

use crate::compiler::string_interning::StringId;

/// Handle for one alias cell within a routine's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AliasId(pub u32);

/// Owns the alias cells created while compiling one routine.
/// Records which variable originated each cell for diagnostics.
#[derive(Debug, Default)]
pub struct AliasArena {
    origins: Vec<StringId>,
}

impl AliasArena {
    pub fn new() -> Self {
        AliasArena::default()
    }

    /// Allocate a fresh cell, noting the variable that caused it.
    pub fn alloc(&mut self, origin: StringId) -> AliasId {
        let id = AliasId(self.origins.len() as u32);
        self.origins.push(origin);
        id
    }

    pub fn origin(&self, id: AliasId) -> Option<StringId> {
        self.origins.get(id.0 as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}
