//! Function Emitter
//!
//! Owns the LIR local space and instruction stream of one routine while it
//! is being compiled. Parameters are indexed first (LIR index == WASM index
//! for those); every local allocated afterwards belongs to some Place.
//!
//! The emitter is deliberately dumb: stack discipline is the caller's
//! responsibility and is established by the Place/Reference emission
//! contract.

use crate::compiler::codegen::lir::{LirInst, LirRoutine, LirType, LocalId};
use crate::settings::INIT_SECTION_CAPACITY;

pub struct FunctionEmitter {
    name: String,
    params: Vec<LirType>,
    results: Vec<LirType>,
    locals: Vec<LirType>,
    body: Vec<LirInst>,
}

impl FunctionEmitter {
    pub fn new(name: impl Into<String>, params: Vec<LirType>, results: Vec<LirType>) -> Self {
        FunctionEmitter {
            name: name.into(),
            params,
            results,
            locals: Vec::new(),
            body: Vec::with_capacity(INIT_SECTION_CAPACITY),
        }
    }

    /// The LocalId of a routine parameter.
    ///
    /// Panics on an out-of-range index; parameter counts come from routine
    /// metadata and are fixed before codegen starts.
    pub fn param(&self, index: u32) -> LocalId {
        assert!(
            (index as usize) < self.params.len(),
            "parameter index {index} out of range for routine '{}'",
            self.name
        );
        LocalId(index)
    }

    pub fn param_count(&self) -> u32 {
        self.params.len() as u32
    }

    /// Allocate a fresh non-parameter local.
    pub fn alloc_local(&mut self, ty: LirType) -> LocalId {
        let id = LocalId(self.params.len() as u32 + self.locals.len() as u32);
        self.locals.push(ty);
        id
    }

    pub fn local_type(&self, id: LocalId) -> Option<LirType> {
        let idx = id.0 as usize;
        if idx < self.params.len() {
            self.params.get(idx).copied()
        } else {
            self.locals.get(idx - self.params.len()).copied()
        }
    }

    pub fn push(&mut self, inst: LirInst) {
        self.body.push(inst);
    }

    pub fn body(&self) -> &[LirInst] {
        &self.body
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn finish(self) -> LirRoutine {
        LirRoutine {
            name: self.name,
            params: self.params,
            results: self.results,
            locals: self.locals,
            body: self.body,
        }
    }
}
