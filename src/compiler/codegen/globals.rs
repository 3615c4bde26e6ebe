//! Global Table
//!
//! The process-wide keyed store mapping global variable names to slots.
//! A name, once resolved, returns the same slot identity for the lifetime
//! of the compilation process — routine codegen may run on parallel threads,
//! so `get_or_create` is a concurrent create-if-absent lookup.
//!
//! The table is passed as an explicit dependency into every routine context,
//! never held as ambient static state.
//!
//! Superglobals are a fixed, compile-time-recognized name set with their own
//! direct runtime access path; they never materialize a table slot.

use rustc_hash::FxHashMap;
use std::sync::{PoisonError, RwLock};

/// Stable identity of one global variable's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalSlotId(pub u32);

/// The recognized superglobal names of Fern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Superglobal {
    /// Mirror of the whole global namespace
    Globals,
    /// Process environment
    Env,
    /// Program arguments
    Args,
    /// Host/server request context
    Server,
}

impl Superglobal {
    pub const ALL: [Superglobal; 4] = [
        Superglobal::Globals,
        Superglobal::Env,
        Superglobal::Args,
        Superglobal::Server,
    ];

    pub fn from_name(name: &str) -> Option<Superglobal> {
        match name {
            "GLOBALS" => Some(Superglobal::Globals),
            "ENV" => Some(Superglobal::Env),
            "ARGS" => Some(Superglobal::Args),
            "SERVER" => Some(Superglobal::Server),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Superglobal::Globals => "GLOBALS",
            Superglobal::Env => "ENV",
            Superglobal::Args => "ARGS",
            Superglobal::Server => "SERVER",
        }
    }

    /// Immediate operand for the superglobal_load/superglobal_store intrinsics.
    pub fn selector(self) -> i32 {
        match self {
            Superglobal::Globals => 0,
            Superglobal::Env => 1,
            Superglobal::Args => 2,
            Superglobal::Server => 3,
        }
    }
}

/// Concurrent name -> slot map with create-if-absent semantics.
///
/// Keys are plain strings rather than interned IDs because the table
/// outlives any single compilation's string table.
#[derive(Debug, Default)]
pub struct GlobalTable {
    slots: RwLock<FxHashMap<String, GlobalSlotId>>,
}

impl GlobalTable {
    pub fn new() -> Self {
        GlobalTable::default()
    }

    /// Resolve a name to its slot, creating the slot on first access.
    /// Idempotent: the same name always yields the same slot identity.
    pub fn get_or_create(&self, name: &str) -> GlobalSlotId {
        if let Some(&id) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return id;
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        // Re-check under the write lock: another thread may have created
        // the slot between the read and write acquisitions.
        if let Some(&id) = slots.get(name) {
            return id;
        }
        let id = GlobalSlotId(slots.len() as u32);
        slots.insert(name.to_string(), id);
        id
    }

    /// Pure lookup without materializing a slot.
    pub fn lookup(&self, name: &str) -> Option<GlobalSlotId> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    pub fn is_superglobal(name: &str) -> bool {
        Superglobal::from_name(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let table = GlobalTable::new();
        let a = table.get_or_create("counter");
        let b = table.get_or_create("counter");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_ne!(table.get_or_create("other"), a);
    }

    #[test]
    fn lookup_does_not_materialize() {
        let table = GlobalTable::new();
        assert_eq!(table.lookup("missing"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn superglobal_name_set_is_closed() {
        for sg in Superglobal::ALL {
            assert_eq!(Superglobal::from_name(sg.name()), Some(sg));
            assert!(GlobalTable::is_superglobal(sg.name()));
        }
        assert!(!GlobalTable::is_superglobal("globals"));
        assert!(!GlobalTable::is_superglobal("counter"));
    }

    #[test]
    fn selectors_are_unique() {
        let mut selectors: Vec<i32> = Superglobal::ALL.iter().map(|s| s.selector()).collect();
        selectors.sort_unstable();
        selectors.dedup();
        assert_eq!(selectors.len(), Superglobal::ALL.len());
    }
}
