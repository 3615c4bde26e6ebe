//! References
//!
//! A Reference wraps a Place with one specific access intent and applies the
//! copy and conversion policy on top of the raw load/store contract:
//!
//! - Copy-on-read: read-for-use of a container value yields an independent
//!   copy (Fern arrays have value semantics); read-for-mutation yields the
//!   handle itself.
//! - Alias transparency: cell-backed places are indistinguishable from
//!   direct ones to the caller; the indirection lives in the Place.
//! - Conversion insertion: whenever the place's representation and the
//!   consumer's hinted category differ, the matching runtime conversion is
//!   emitted at the load or store point. Whether that conversion can succeed
//!   is the runtime's concern, never a compile-time failure here.

use crate::compiler::codegen::emitter::FunctionEmitter;
use crate::compiler::codegen::lir::{LirInst, RuntimeFn};
use crate::compiler::codegen::place::{Place, ValueShape};
use crate::compiler::codegen::representation::NarrowKind;
use crate::compiler::datatypes::TypeMask;
use crate::compiler::string_interning::{StringId, StringTable};
use crate::compiler::compiler_errors::CompileError;
use crate::return_compiler_error;

/// What the consuming expression intends to do through this reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Read-for-use: copy semantics apply to container values
    Read,
    /// Plain store
    Write,
    /// Read-for-mutation (e.g. increment): no copy on the read side
    ReadWrite,
    /// Existence check
    IsSet,
    /// Reset to the empty value
    Unset,
}

/// A Place plus one access intent. Short-lived: created by
/// `Variable::bind_reference` for a single expression-level access.
#[derive(Debug)]
pub struct Reference {
    place: Place,
    access: AccessKind,
    hint: TypeMask,
    var: StringId,
}

impl Reference {
    pub(crate) fn new(place: Place, access: AccessKind, hint: TypeMask, var: StringId) -> Self {
        Reference {
            place,
            access,
            hint,
            var,
        }
    }

    pub fn place(&self) -> &Place {
        &self.place
    }

    pub fn access(&self) -> AccessKind {
        self.access
    }

    /// The stack shape the consumer expects, derived from the type hint.
    /// The hint never changes the variable's own representation; it only
    /// steers conversion insertion.
    fn hint_shape(&self) -> ValueShape {
        if let Some(kind) = self.hint.single_category().and_then(NarrowKind::from_category) {
            ValueShape::Narrow(kind)
        } else if self.hint.is_numeric_only() {
            ValueShape::Number
        } else {
            ValueShape::Dynamic
        }
    }

    /// Load the value in the hinted shape, applying copy-on-read policy.
    pub fn emit_load(&self, f: &mut FunctionEmitter, strings: &StringTable) -> Result<(), CompileError> {
        match self.access {
            AccessKind::Read | AccessKind::ReadWrite => {}
            _ => {
                let name = self.var.resolve(strings);
                return_compiler_error!(
                    "emit_load through a {:?} reference to '{}'", self.access, name;
                    { VariableName => name, CompilationStage => "reference load" }
                );
            }
        }

        self.place.emit_load(f);
        let read_for_use = self.access == AccessKind::Read;
        emit_load_conversion(f, self.place.shape(), self.hint_shape(), read_for_use);
        Ok(())
    }

    /// Phase one of a store: materialize the target's addressing.
    /// The caller then evaluates the value (in the hinted shape) and calls
    /// `emit_store_commit`.
    pub fn emit_store_prepare(
        &self,
        f: &mut FunctionEmitter,
        strings: &StringTable,
    ) -> Result<(), CompileError> {
        self.require_writable(strings, "store prepare")?;
        self.place.emit_prepare_store(f);
        Ok(())
    }

    /// Phase two of a store: convert the hinted-shape value into the place's
    /// native shape and commit it.
    pub fn emit_store_commit(
        &self,
        f: &mut FunctionEmitter,
        strings: &StringTable,
    ) -> Result<(), CompileError> {
        self.require_writable(strings, "store commit")?;
        emit_store_conversion(f, self.hint_shape(), self.place.shape());
        self.place.emit_commit_store(f);
        Ok(())
    }

    /// Push an i32 flag: is the variable set (holding anything but empty)?
    /// Narrow and numeric representations cannot hold the empty value, so
    /// the check folds to a constant.
    pub fn emit_isset(&self, f: &mut FunctionEmitter, strings: &StringTable) -> Result<(), CompileError> {
        if self.access != AccessKind::IsSet {
            let name = self.var.resolve(strings);
            return_compiler_error!(
                "emit_isset through a {:?} reference to '{}'", self.access, name;
                { VariableName => name }
            );
        }
        match self.place.shape() {
            ValueShape::Narrow(_) | ValueShape::Number => {
                f.push(LirInst::I32Const(1));
            }
            ValueShape::Dynamic => {
                self.place.emit_load(f);
                f.push(LirInst::Call(RuntimeFn::ValueIsSet));
            }
        }
        Ok(())
    }

    /// Store the empty value. Only representable for places that can hold it.
    pub fn emit_unset(&self, f: &mut FunctionEmitter, strings: &StringTable) -> Result<(), CompileError> {
        if self.access != AccessKind::Unset {
            let name = self.var.resolve(strings);
            return_compiler_error!(
                "emit_unset through a {:?} reference to '{}'", self.access, name;
                { VariableName => name }
            );
        }
        match self.place.shape() {
            ValueShape::Narrow(_) | ValueShape::Number => {
                // Inference never selects these representations for a
                // variable that can be unset
                let name = self.var.resolve(strings);
                return_compiler_error!(
                    "unset of narrowly represented variable '{}'", name;
                    { VariableName => name, Representation => format!("{:?}", self.place.representation()) }
                );
            }
            ValueShape::Dynamic => {
                self.place.emit_prepare_store(f);
                f.push(LirInst::Call(RuntimeFn::ValueEmpty));
                self.place.emit_commit_store(f);
                Ok(())
            }
        }
    }

    fn require_writable(&self, strings: &StringTable, stage: &str) -> Result<(), CompileError> {
        match self.access {
            AccessKind::Write | AccessKind::ReadWrite => Ok(()),
            _ => {
                let name = self.var.resolve(strings);
                return_compiler_error!(
                    "{} through a {:?} reference to '{}'", stage, self.access, name;
                    { VariableName => name, CompilationStage => "reference store" }
                );
            }
        }
    }
}

fn box_fn(kind: NarrowKind) -> RuntimeFn {
    match kind {
        NarrowKind::Bool => RuntimeFn::ValueFromBool,
        NarrowKind::Int => RuntimeFn::ValueFromInt,
        NarrowKind::Float => RuntimeFn::ValueFromFloat,
        NarrowKind::Str => RuntimeFn::ValueFromStr,
        NarrowKind::Array => RuntimeFn::ValueFromArray,
        NarrowKind::Object => RuntimeFn::ValueFromObject,
    }
}

fn unbox_fn(kind: NarrowKind) -> RuntimeFn {
    match kind {
        NarrowKind::Bool => RuntimeFn::ValueToBool,
        NarrowKind::Int => RuntimeFn::ValueToInt,
        NarrowKind::Float => RuntimeFn::ValueToFloat,
        NarrowKind::Str => RuntimeFn::ValueToStr,
        NarrowKind::Array => RuntimeFn::ValueToArray,
        NarrowKind::Object => RuntimeFn::ValueToObject,
    }
}

/// Convert a loaded value from the place's native shape to the consumer's
/// hinted shape, inserting the copy-on-read intrinsic where value semantics
/// demand an independent copy.
pub(crate) fn emit_load_conversion(
    f: &mut FunctionEmitter,
    from: ValueShape,
    to: ValueShape,
    read_for_use: bool,
) {
    match (from, to) {
        (ValueShape::Narrow(k), ValueShape::Narrow(j)) if k == j => {
            if read_for_use && k.is_container() {
                f.push(LirInst::Call(RuntimeFn::ArrayCopy));
            }
        }
        (ValueShape::Narrow(k), ValueShape::Narrow(j)) => {
            // Cross-category conversions route through the dynamic box;
            // the produced value is already independent of the source.
            f.push(LirInst::Call(box_fn(k)));
            f.push(LirInst::Call(unbox_fn(j)));
        }
        (ValueShape::Narrow(k), ValueShape::Dynamic) => {
            if read_for_use && k.is_container() {
                f.push(LirInst::Call(RuntimeFn::ArrayCopy));
            }
            f.push(LirInst::Call(box_fn(k)));
        }
        (ValueShape::Narrow(k), ValueShape::Number) => {
            f.push(LirInst::Call(box_fn(k)));
            f.push(LirInst::Call(RuntimeFn::ValueToNumber));
        }
        (ValueShape::Dynamic, ValueShape::Dynamic) => {
            if read_for_use {
                f.push(LirInst::Call(RuntimeFn::ValueCopy));
            }
        }
        (ValueShape::Dynamic, ValueShape::Narrow(j)) => {
            f.push(LirInst::Call(unbox_fn(j)));
            if read_for_use && j.is_container() {
                f.push(LirInst::Call(RuntimeFn::ArrayCopy));
            }
        }
        (ValueShape::Dynamic, ValueShape::Number) => {
            f.push(LirInst::Call(RuntimeFn::ValueToNumber));
        }
        (ValueShape::Number, ValueShape::Dynamic) => {
            f.push(LirInst::Call(RuntimeFn::ValueFromNumber));
        }
        (ValueShape::Number, ValueShape::Narrow(j)) => {
            f.push(LirInst::Call(RuntimeFn::ValueFromNumber));
            f.push(LirInst::Call(unbox_fn(j)));
        }
        (ValueShape::Number, ValueShape::Number) => {}
    }
}

/// Convert a to-be-stored value from the producer's shape into the place's
/// native shape. Stores never copy; copy policy belongs to the read side.
pub(crate) fn emit_store_conversion(f: &mut FunctionEmitter, from: ValueShape, to: ValueShape) {
    match (from, to) {
        (ValueShape::Narrow(k), ValueShape::Narrow(j)) if k == j => {}
        (ValueShape::Narrow(k), ValueShape::Narrow(j)) => {
            f.push(LirInst::Call(box_fn(k)));
            f.push(LirInst::Call(unbox_fn(j)));
        }
        (ValueShape::Narrow(k), ValueShape::Dynamic) => {
            f.push(LirInst::Call(box_fn(k)));
        }
        (ValueShape::Narrow(NarrowKind::Int), ValueShape::Number) => {
            f.push(LirInst::Call(RuntimeFn::NumberFromInt));
        }
        (ValueShape::Narrow(NarrowKind::Float), ValueShape::Number) => {
            f.push(LirInst::Call(RuntimeFn::NumberFromFloat));
        }
        (ValueShape::Narrow(k), ValueShape::Number) => {
            f.push(LirInst::Call(box_fn(k)));
            f.push(LirInst::Call(RuntimeFn::ValueToNumber));
        }
        (ValueShape::Dynamic, ValueShape::Dynamic) => {}
        (ValueShape::Dynamic, ValueShape::Narrow(j)) => {
            f.push(LirInst::Call(unbox_fn(j)));
        }
        (ValueShape::Dynamic, ValueShape::Number) => {
            f.push(LirInst::Call(RuntimeFn::ValueToNumber));
        }
        (ValueShape::Number, ValueShape::Dynamic) => {
            f.push(LirInst::Call(RuntimeFn::ValueFromNumber));
        }
        (ValueShape::Number, ValueShape::Narrow(j)) => {
            f.push(LirInst::Call(RuntimeFn::ValueFromNumber));
            f.push(LirInst::Call(unbox_fn(j)));
        }
        (ValueShape::Number, ValueShape::Number) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::codegen::lir::{LirType, LocalId};

    fn setup() -> (FunctionEmitter, StringTable, StringId) {
        let mut strings = StringTable::new();
        let name = strings.intern("x");
        (FunctionEmitter::new("t", vec![], vec![]), strings, name)
    }

    #[test]
    fn matching_shapes_insert_no_conversion() {
        let (mut f, strings, var) = setup();
        let local = f.alloc_local(LirType::I64);
        let r = Reference::new(
            Place::Narrow {
                local,
                kind: NarrowKind::Int,
            },
            AccessKind::Read,
            TypeMask::INT,
            var,
        );
        r.emit_load(&mut f, &strings).unwrap();
        assert_eq!(f.body(), &[LirInst::LocalGet(local)]);
    }

    #[test]
    fn hint_mismatch_inserts_conversion_calls() {
        let (mut f, strings, var) = setup();
        let local = f.alloc_local(LirType::I64);
        let r = Reference::new(
            Place::Narrow {
                local,
                kind: NarrowKind::Int,
            },
            AccessKind::Read,
            TypeMask::STR,
            var,
        );
        r.emit_load(&mut f, &strings).unwrap();
        assert_eq!(
            f.body(),
            &[
                LirInst::LocalGet(local),
                LirInst::Call(RuntimeFn::ValueFromInt),
                LirInst::Call(RuntimeFn::ValueToStr),
            ]
        );
    }

    #[test]
    fn dynamic_read_for_use_copies() {
        let (mut f, strings, var) = setup();
        let local = f.alloc_local(LirType::ExternRef);
        let read = Reference::new(
            Place::Dynamic { local },
            AccessKind::Read,
            TypeMask::ANY,
            var,
        );
        read.emit_load(&mut f, &strings).unwrap();
        assert_eq!(
            f.body(),
            &[LirInst::LocalGet(local), LirInst::Call(RuntimeFn::ValueCopy)]
        );

        // Read-for-mutation suppresses the copy
        let mut f2 = FunctionEmitter::new("t", vec![], vec![]);
        let local2 = f2.alloc_local(LirType::ExternRef);
        let rw = Reference::new(
            Place::Dynamic { local: local2 },
            AccessKind::ReadWrite,
            TypeMask::ANY,
            var,
        );
        rw.emit_load(&mut f2, &strings).unwrap();
        assert_eq!(f2.body(), &[LirInst::LocalGet(local2)]);
    }

    #[test]
    fn isset_on_narrow_folds_to_true() {
        let (mut f, strings, var) = setup();
        let local = f.alloc_local(LirType::I64);
        let r = Reference::new(
            Place::Narrow {
                local,
                kind: NarrowKind::Int,
            },
            AccessKind::IsSet,
            TypeMask::ANY,
            var,
        );
        r.emit_isset(&mut f, &strings).unwrap();
        assert_eq!(f.body(), &[LirInst::I32Const(1)]);
    }

    #[test]
    fn unset_on_narrow_is_an_internal_error() {
        let (mut f, strings, var) = setup();
        let local = f.alloc_local(LirType::I64);
        let r = Reference::new(
            Place::Narrow {
                local,
                kind: NarrowKind::Int,
            },
            AccessKind::Unset,
            TypeMask::ANY,
            var,
        );
        let err = r.emit_unset(&mut f, &strings).unwrap_err();
        assert_eq!(err.error_type, crate::compiler::compiler_errors::ErrorType::Compiler);
    }

    #[test]
    fn load_through_write_reference_is_an_internal_error() {
        let (mut f, strings, var) = setup();
        let r = Reference::new(
            Place::Dynamic { local: LocalId(0) },
            AccessKind::Write,
            TypeMask::ANY,
            var,
        );
        assert!(r.emit_load(&mut f, &strings).is_err());
    }

    #[test]
    fn int_store_into_number_place_uses_number_from_int() {
        let (mut f, strings, var) = setup();
        let tag = f.alloc_local(LirType::I32);
        let bits = f.alloc_local(LirType::I64);
        let r = Reference::new(
            Place::Number { tag, bits },
            AccessKind::Write,
            TypeMask::INT,
            var,
        );
        r.emit_store_prepare(&mut f, &strings).unwrap();
        f.push(LirInst::I64Const(7));
        r.emit_store_commit(&mut f, &strings).unwrap();
        assert_eq!(
            f.body(),
            &[
                LirInst::I64Const(7),
                LirInst::Call(RuntimeFn::NumberFromInt),
                LirInst::LocalSet(bits),
                LirInst::LocalSet(tag),
            ]
        );
    }
}
