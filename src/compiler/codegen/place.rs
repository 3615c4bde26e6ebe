//! Place abstraction
//!
//! A Place is one concrete storage location together with its emission
//! contract: Load, PrepareStore and CommitStore. The two-phase store exists
//! because WASM is a stack machine — for indirect targets (alias cells,
//! global slots, superglobals) the addressing operands must be on the
//! operand stack *before* the value is evaluated. For plain locals the
//! prepare phase is a no-op.
//!
//! A Place is owned by exactly one Variable; the only sharing mechanism is
//! the explicit alias cell, where two Places hold the same runtime cell
//! handle.

use crate::compiler::codegen::alias_arena::AliasId;
use crate::compiler::codegen::emitter::FunctionEmitter;
use crate::compiler::codegen::globals::{GlobalSlotId, Superglobal};
use crate::compiler::codegen::lir::{LirInst, LocalId, RuntimeFn};
use crate::compiler::codegen::representation::{NarrowKind, Representation};

/// The shape a place's value takes on the operand stack.
/// References compare this against the consumer's hinted shape to decide
/// which conversion intrinsics to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// One machine value of the narrow kind
    Narrow(NarrowKind),
    /// One boxed dynamic value (externref)
    Dynamic,
    /// Numeric variant pair: tag (i32) under payload bits (i64)
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
    /// Single typed WASM local
    Narrow { local: LocalId, kind: NarrowKind },

    /// WASM local holding a boxed dynamic value
    Dynamic { local: LocalId },

    /// Numeric variant: tag local (0 = int, 1 = float) plus payload bits
    Number { tag: LocalId, bits: LocalId },

    /// WASM local holding an alias cell handle; all access goes through
    /// the cell indirection
    Alias { cell_local: LocalId, cell: AliasId },

    /// Indirect binding through the GlobalTable slot's runtime cell
    GlobalSlot { slot: GlobalSlotId },

    /// Direct runtime access path for a recognized superglobal
    Superglobal { name: Superglobal },
}

impl Place {
    pub fn representation(&self) -> Representation {
        match self {
            Place::Narrow { kind, .. } => Representation::Narrow(*kind),
            Place::Dynamic { .. } => Representation::DynamicCell,
            Place::Number { .. } => Representation::NumericVariant,
            Place::Alias { .. } => Representation::AliasCell,
            // Global storage always holds full dynamic values
            Place::GlobalSlot { .. } | Place::Superglobal { .. } => Representation::DynamicCell,
        }
    }

    pub fn shape(&self) -> ValueShape {
        match self {
            Place::Narrow { kind, .. } => ValueShape::Narrow(*kind),
            Place::Number { .. } => ValueShape::Number,
            Place::Dynamic { .. }
            | Place::Alias { .. }
            | Place::GlobalSlot { .. }
            | Place::Superglobal { .. } => ValueShape::Dynamic,
        }
    }

    /// Push the place's current value in its native shape.
    /// No side effects beyond the read itself.
    pub fn emit_load(&self, f: &mut FunctionEmitter) {
        match self {
            Place::Narrow { local, .. } | Place::Dynamic { local } => {
                f.push(LirInst::LocalGet(*local));
            }
            Place::Number { tag, bits } => {
                f.push(LirInst::LocalGet(*tag));
                f.push(LirInst::LocalGet(*bits));
            }
            Place::Alias { cell_local, .. } => {
                f.push(LirInst::LocalGet(*cell_local));
                f.push(LirInst::Call(RuntimeFn::AliasGet));
            }
            Place::GlobalSlot { slot } => {
                f.push(LirInst::I32Const(slot.0 as i32));
                f.push(LirInst::Call(RuntimeFn::GlobalCell));
                f.push(LirInst::Call(RuntimeFn::AliasGet));
            }
            Place::Superglobal { name } => {
                f.push(LirInst::I32Const(name.selector()));
                f.push(LirInst::Call(RuntimeFn::SuperglobalLoad));
            }
        }
    }

    /// Materialize the storage target's addressing before the stored value
    /// is evaluated. Must be paired with `emit_commit_store` after the value
    /// (in this place's native shape) is on the stack.
    pub fn emit_prepare_store(&self, f: &mut FunctionEmitter) {
        match self {
            Place::Narrow { .. } | Place::Dynamic { .. } | Place::Number { .. } => {
                // Register-style targets need no addressing
            }
            Place::Alias { cell_local, .. } => {
                f.push(LirInst::LocalGet(*cell_local));
            }
            Place::GlobalSlot { slot } => {
                f.push(LirInst::I32Const(slot.0 as i32));
                f.push(LirInst::Call(RuntimeFn::GlobalCell));
            }
            Place::Superglobal { name } => {
                f.push(LirInst::I32Const(name.selector()));
            }
        }
    }

    /// Consume the prepared addressing (if any) and the value, performing
    /// the store.
    pub fn emit_commit_store(&self, f: &mut FunctionEmitter) {
        match self {
            Place::Narrow { local, .. } | Place::Dynamic { local } => {
                f.push(LirInst::LocalSet(*local));
            }
            Place::Number { tag, bits } => {
                // Native shape pushed tag first, so bits pops first
                f.push(LirInst::LocalSet(*bits));
                f.push(LirInst::LocalSet(*tag));
            }
            Place::Alias { .. } | Place::GlobalSlot { .. } => {
                f.push(LirInst::Call(RuntimeFn::AliasSet));
            }
            Place::Superglobal { .. } => {
                f.push(LirInst::Call(RuntimeFn::SuperglobalStore));
            }
        }
    }
}
