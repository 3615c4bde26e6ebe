//! Representation selection
//!
//! Decides the concrete storage strategy for a variable from its inferred
//! TypeMask and aliasable flag. Selection runs exactly once per variable,
//! inside `Variable::emit_init`, and specificity strictly reduces the
//! per-access conversion work the References have to emit later.

use crate::compiler::datatypes::{StaticType, TypeCategory, TypeMask, TypeSummary};
use crate::compiler::codegen::lir::LirType;
use crate::repr_log;

/// A single-category representation with a direct WASM equivalent.
/// Scalars map to WASM value types; strings, arrays and objects are
/// runtime handles, still statically typed as exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrowKind {
    Bool,
    Int,
    Float,
    Str,
    Array,
    Object,
}

impl NarrowKind {
    pub fn lir_type(self) -> LirType {
        match self {
            NarrowKind::Bool => LirType::I32,
            NarrowKind::Int => LirType::I64,
            NarrowKind::Float => LirType::F64,
            NarrowKind::Str | NarrowKind::Array | NarrowKind::Object => LirType::ExternRef,
        }
    }

    pub fn category(self) -> TypeCategory {
        match self {
            NarrowKind::Bool => TypeCategory::Bool,
            NarrowKind::Int => TypeCategory::Int,
            NarrowKind::Float => TypeCategory::Float,
            NarrowKind::Str => TypeCategory::Str,
            NarrowKind::Array => TypeCategory::Array,
            NarrowKind::Object => TypeCategory::Object,
        }
    }

    /// Null has no direct machine equivalent, so it never narrows.
    pub fn from_category(cat: TypeCategory) -> Option<NarrowKind> {
        match cat {
            TypeCategory::Null => None,
            TypeCategory::Bool => Some(NarrowKind::Bool),
            TypeCategory::Int => Some(NarrowKind::Int),
            TypeCategory::Float => Some(NarrowKind::Float),
            TypeCategory::Str => Some(NarrowKind::Str),
            TypeCategory::Array => Some(NarrowKind::Array),
            TypeCategory::Object => Some(NarrowKind::Object),
        }
    }

    pub fn of_declared(ty: StaticType) -> Option<NarrowKind> {
        match ty {
            StaticType::Bool => Some(NarrowKind::Bool),
            StaticType::Int => Some(NarrowKind::Int),
            StaticType::Float => Some(NarrowKind::Float),
            StaticType::Str => Some(NarrowKind::Str),
            StaticType::Array => Some(NarrowKind::Array),
            StaticType::Object => Some(NarrowKind::Object),
            StaticType::Dynamic => None,
        }
    }

    /// Arrays have value (copy) semantics in Fern; objects and strings are
    /// handle-shared / immutable and never need a copy on read.
    pub fn is_container(self) -> bool {
        matches!(self, NarrowKind::Array)
    }
}

/// The storage strategy chosen for one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Exactly one representable category for the whole lifetime
    Narrow(NarrowKind),
    /// Two-case int-or-float specialization (tag + payload bits)
    NumericVariant,
    /// Shared mutable cell for reference-assigned variables
    AliasCell,
    /// Universal fallback holding any value
    DynamicCell,
}

impl Representation {
    /// The selection algorithm. Order matters: the most specific strategy
    /// that is still correct wins, and DynamicCell is never picked over a
    /// specialized representation that applies.
    ///
    /// Precondition from the aliasing analysis: an aliasable variable's mask
    /// carries the REF bit, so steps 1 and 2 can never capture a variable
    /// that needs cell indirection.
    pub fn select(mask: TypeMask, aliasable: bool) -> Representation {
        debug_assert!(
            !aliasable || mask.has_ref() || mask.has_any(),
            "aliasable variable without REF bit in mask {mask}"
        );

        let repr = if let Some(kind) = mask.single_category().and_then(NarrowKind::from_category) {
            Representation::Narrow(kind)
        } else if !mask.has_any() && !mask.has_ref() && mask.is_numeric_only() {
            Representation::NumericVariant
        } else if aliasable {
            Representation::AliasCell
        } else {
            Representation::DynamicCell
        };

        repr_log!("repr select: mask {} aliasable {} -> {:?}", mask, aliasable, repr);
        repr
    }

    pub fn for_summary(summary: TypeSummary) -> Representation {
        Representation::select(summary.mask, summary.aliasable)
    }
}
