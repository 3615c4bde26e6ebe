//! Variable kinds and initialization
//!
//! A Variable binds one declared source variable (local, routine parameter,
//! or global) to a Place. The kind set is closed and dispatched by pattern
//! match.
//!
//! Lifecycle contract:
//! - `emit_init` runs exactly once per variable, in declaration order,
//!   before any expression of the routine body is emitted. It selects the
//!   representation, allocates storage and emits the establishing code.
//! - `bind_reference` is called by expression codegen for each access and
//!   never changes the chosen representation.
//! - A parameter may rebind its Place once, from the raw argument slot to a
//!   synthesized shadow local, during `emit_init`. That is the only mutation
//!   of the Variable -> Place relationship.
//!
//! Violations of this ordering are compiler bugs and abort the routine's
//! compilation with a diagnostic naming the variable.

use crate::codegen_log;
use crate::compiler::codegen::place::{Place, ValueShape};
use crate::compiler::codegen::reference::{AccessKind, Reference, emit_store_conversion};
use crate::compiler::codegen::representation::{NarrowKind, Representation};
use crate::compiler::codegen::routine::RoutineContext;
use crate::compiler::codegen::lir::{LirInst, LirType, RuntimeFn};
use crate::compiler::compiler_errors::CompileError;
use crate::compiler::datatypes::{StaticType, TypeMask, TypeSummary};
use crate::compiler::string_interning::StringId;
use crate::return_compiler_error;

/// Which kind of declared variable this is. Closed set; no other kinds exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Storage confined to one routine activation
    Local {
        /// Compiler-synthesized scratch temporary (first use is always a write)
        synthesized: bool,
    },
    /// Incoming argument slot, possibly shadowed during init
    Parameter { index: u32, declared: StaticType },
    /// Indirect process-wide binding; no private storage
    Global,
}

#[derive(Debug)]
pub struct Variable {
    name: StringId,
    kind: VariableKind,
    summary: TypeSummary,
    place: Option<Place>,
    initialized: bool,
}

impl Variable {
    pub fn new_local(name: StringId, summary: TypeSummary) -> Variable {
        Variable {
            name,
            kind: VariableKind::Local { synthesized: false },
            summary,
            place: None,
            initialized: false,
        }
    }

    /// A compiler-internal temporary. Same machinery as a source local, but
    /// narrow representations skip initialization because the temporary's
    /// first use is a write by construction.
    pub fn new_synthesized(name: StringId, summary: TypeSummary) -> Variable {
        Variable {
            name,
            kind: VariableKind::Local { synthesized: true },
            summary,
            place: None,
            initialized: false,
        }
    }

    pub fn new_parameter(
        name: StringId,
        index: u32,
        declared: StaticType,
        summary: TypeSummary,
    ) -> Variable {
        Variable {
            name,
            kind: VariableKind::Parameter { index, declared },
            summary,
            place: None,
            initialized: false,
        }
    }

    pub fn new_global(name: StringId) -> Variable {
        Variable {
            name,
            kind: VariableKind::Global,
            // Global storage is always fully dynamic
            summary: TypeSummary::of(TypeMask::ANY),
            place: None,
            initialized: false,
        }
    }

    pub fn name(&self) -> StringId {
        self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Fast-path direct handle to the bound Place, for callers that need no
    /// conversion or copy policy. Globals have no direct handle: every
    /// global access requires the table or superglobal indirection, so this
    /// returns None for them (and for any variable before its init).
    pub fn place(&self) -> Option<&Place> {
        self.place.as_ref()
    }

    /// Select storage, allocate it and emit the establishing code.
    pub fn emit_init(&mut self, ctx: &mut RoutineContext) -> Result<(), CompileError> {
        let name = self.name.resolve(ctx.strings);
        if self.initialized {
            return_compiler_error!(
                "emit_init called twice for variable '{}' in routine '{}'",
                name, ctx.emitter.name();
                { VariableName => name, RoutineName => ctx.emitter.name(), CompilationStage => "variable initialization" }
            );
        }

        match self.kind {
            // Synthesized temporaries take the same path: narrow init is
            // omitted for source locals too, via definite assignment
            VariableKind::Local { .. } => {
                let repr = Representation::for_summary(self.summary);
                codegen_log!("init local '{}' as {:?}", name, repr);
                self.place = Some(init_local_storage(ctx, repr, self.name));
            }
            VariableKind::Parameter { index, declared } => {
                self.place = Some(init_parameter_storage(
                    ctx,
                    self.name,
                    index,
                    declared,
                    self.summary,
                )?);
            }
            VariableKind::Global => {
                // Globals are visible process-wide whether or not a routine
                // declares them: nothing to materialize eagerly. The slot is
                // created on first bind_reference.
            }
        }

        self.initialized = true;
        Ok(())
    }

    /// Produce a Reference for one specific access. The type hint informs
    /// conversion insertion only; the variable's representation is fixed.
    pub fn bind_reference(
        &self,
        ctx: &RoutineContext,
        access: AccessKind,
        hint: TypeMask,
    ) -> Result<Reference, CompileError> {
        let name = self.name.resolve(ctx.strings);
        if !self.initialized {
            return_compiler_error!(
                "bind_reference before emit_init for variable '{}' in routine '{}'",
                name, ctx.emitter.name();
                { VariableName => name, RoutineName => ctx.emitter.name(), CompilationStage => "place binding" }
            );
        }

        let place = match self.kind {
            VariableKind::Global => match crate::compiler::codegen::globals::Superglobal::from_name(name) {
                Some(sg) => Place::Superglobal { name: sg },
                None => Place::GlobalSlot {
                    slot: ctx.globals.get_or_create(name),
                },
            },
            _ => match &self.place {
                Some(place) => place.clone(),
                None => {
                    return_compiler_error!(
                        "initialized variable '{}' has no bound place", name;
                        { VariableName => name }
                    );
                }
            },
        };

        Ok(Reference::new(place, access, hint, self.name))
    }
}

/// Allocate and initialize routine-local storage for the given
/// representation. Shared by locals and the shadow path of parameters.
fn init_local_storage(ctx: &mut RoutineContext, repr: Representation, origin: StringId) -> Place {
    match repr {
        Representation::Narrow(kind) => {
            // No establishing code: definite assignment guarantees no read
            // before the first write
            let local = ctx.emitter.alloc_local(kind.lir_type());
            Place::Narrow { local, kind }
        }
        Representation::DynamicCell => {
            // A later read through any path must observe the defined empty
            // value, never implementation-undefined storage
            let local = ctx.emitter.alloc_local(LirType::ExternRef);
            ctx.emitter.push(LirInst::Call(RuntimeFn::ValueEmpty));
            ctx.emitter.push(LirInst::LocalSet(local));
            Place::Dynamic { local }
        }
        Representation::NumericVariant => {
            // Numeric zero of the default subtype (integer)
            let tag = ctx.emitter.alloc_local(LirType::I32);
            let bits = ctx.emitter.alloc_local(LirType::I64);
            ctx.emitter.push(LirInst::I32Const(0));
            ctx.emitter.push(LirInst::LocalSet(tag));
            ctx.emitter.push(LirInst::I64Const(0));
            ctx.emitter.push(LirInst::LocalSet(bits));
            Place::Number { tag, bits }
        }
        Representation::AliasCell => {
            let cell = ctx.aliases.alloc(origin);
            let cell_local = ctx.emitter.alloc_local(LirType::ExternRef);
            ctx.emitter.push(LirInst::Call(RuntimeFn::ValueEmpty));
            ctx.emitter.push(LirInst::Call(RuntimeFn::AliasNew));
            ctx.emitter.push(LirInst::LocalSet(cell_local));
            Place::Alias { cell_local, cell }
        }
    }
}

/// Decide whether the raw parameter slot can serve as the variable's place
/// for the whole routine, or whether a shadow local must be synthesized.
fn init_parameter_storage(
    ctx: &mut RoutineContext,
    name: StringId,
    index: u32,
    declared: StaticType,
    summary: TypeSummary,
) -> Result<Place, CompileError> {
    let param_local = ctx.emitter.param(index);

    // Common case: every value the body may hold fits the declared slot.
    // Zero extra code, the place stays the parameter slot for the routine's
    // duration.
    if summary.mask.is_subset_of(declared.capability()) && !summary.aliasable {
        return Ok(match NarrowKind::of_declared(declared) {
            Some(kind) => Place::Narrow {
                local: param_local,
                kind,
            },
            None => Place::Dynamic { local: param_local },
        });
    }

    // The body assigns values outside the declared type: synthesize a shadow
    // local from the body's full mask, initialize it like any local, then
    // populate it by converting the incoming argument. The raw parameter
    // slot is never touched again after this point.
    let repr = Representation::for_summary(summary);
    codegen_log!(
        "shadowing parameter '{}' (declared {:?}) as {:?}",
        name.resolve(ctx.strings),
        declared,
        repr
    );
    let shadow = init_local_storage(ctx, repr, name);

    let incoming_shape = match NarrowKind::of_declared(declared) {
        Some(kind) => ValueShape::Narrow(kind),
        None => ValueShape::Dynamic,
    };

    shadow.emit_prepare_store(&mut ctx.emitter);
    ctx.emitter.push(LirInst::LocalGet(param_local));
    emit_store_conversion(&mut ctx.emitter, incoming_shape, shadow.shape());
    shadow.emit_commit_store(&mut ctx.emitter);

    Ok(shadow)
}
