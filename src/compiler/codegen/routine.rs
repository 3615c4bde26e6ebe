//! Routine compilation context and module driver
//!
//! One RoutineContext exists per routine being compiled: it owns the
//! function emitter and the alias-cell arena, and borrows the process-wide
//! GlobalTable plus the compilation's string table. Contexts are never
//! shared between routines; routines compile in parallel with the
//! GlobalTable as the only shared resource.
//!
//! The ordering guarantee of the subsystem lives here: `declare_variables`
//! followed by `emit_inits` runs every declared variable's initialization,
//! in declaration order, strictly before the body callback (expression
//! codegen, an external collaborator) issues any bind_reference.

use crate::compiler::codegen::alias_arena::AliasArena;
use crate::compiler::codegen::emitter::FunctionEmitter;
use crate::compiler::codegen::globals::GlobalTable;
use crate::compiler::codegen::lir::{LirRoutine, LirType};
use crate::compiler::codegen::representation::NarrowKind;
use crate::compiler::codegen::variables::Variable;
use crate::compiler::compiler_errors::CompileError;
use crate::compiler::datatypes::{RoutineTypes, StaticType};
use crate::compiler::string_interning::{StringId, StringTable};
use rayon::prelude::*;

/// A declared routine parameter: name plus declared static type, in
/// declaration order. Consumed read-only from routine metadata.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: StringId,
    pub declared: StaticType,
}

#[derive(Debug, Clone)]
pub struct RoutineSignature {
    pub name: StringId,
    pub params: Vec<ParamDecl>,
    pub results: Vec<StaticType>,
}

/// Everything the backend needs to compile one routine's variable layer:
/// the signature, the declared locals and referenced globals (both in first
/// declaration order), and the inference result.
#[derive(Debug, Clone)]
pub struct RoutineDecl {
    pub signature: RoutineSignature,
    pub locals: Vec<StringId>,
    pub globals: Vec<StringId>,
    pub types: RoutineTypes,
}

fn static_lir_type(ty: StaticType) -> LirType {
    match NarrowKind::of_declared(ty) {
        Some(kind) => kind.lir_type(),
        None => LirType::ExternRef,
    }
}

pub struct RoutineContext<'a> {
    pub emitter: FunctionEmitter,
    pub aliases: AliasArena,
    pub globals: &'a GlobalTable,
    pub strings: &'a StringTable,
}

impl<'a> RoutineContext<'a> {
    pub fn new(
        signature: &RoutineSignature,
        strings: &'a StringTable,
        globals: &'a GlobalTable,
    ) -> RoutineContext<'a> {
        let params = signature
            .params
            .iter()
            .map(|p| static_lir_type(p.declared))
            .collect();
        let results = signature
            .results
            .iter()
            .map(|ty| static_lir_type(*ty))
            .collect();
        RoutineContext {
            emitter: FunctionEmitter::new(signature.name.resolve(strings), params, results),
            aliases: AliasArena::new(),
            globals,
            strings,
        }
    }

    /// Create and immediately initialize a compiler-internal scratch
    /// temporary. Its first use is a write by construction, so a narrow
    /// summary produces no initialization code at all.
    pub fn synth_temp(
        &mut self,
        name: StringId,
        summary: crate::compiler::datatypes::TypeSummary,
    ) -> Result<Variable, CompileError> {
        let mut var = Variable::new_synthesized(name, summary);
        var.emit_init(self)?;
        Ok(var)
    }

    pub fn finish(self) -> LirRoutine {
        self.emitter.finish()
    }
}

/// Build the routine's Variables in declaration order: parameters first,
/// then locals, then referenced globals.
pub fn declare_variables(decl: &RoutineDecl) -> Vec<Variable> {
    let mut vars = Vec::with_capacity(
        decl.signature.params.len() + decl.locals.len() + decl.globals.len(),
    );
    for (index, param) in decl.signature.params.iter().enumerate() {
        vars.push(Variable::new_parameter(
            param.name,
            index as u32,
            param.declared,
            decl.types.summary(param.name),
        ));
    }
    for &name in &decl.locals {
        vars.push(Variable::new_local(name, decl.types.summary(name)));
    }
    for &name in &decl.globals {
        vars.push(Variable::new_global(name));
    }
    vars
}

/// Run every variable's initialization, in declaration order.
pub fn emit_inits(vars: &mut [Variable], ctx: &mut RoutineContext) -> Result<(), CompileError> {
    for var in vars.iter_mut() {
        var.emit_init(ctx)?;
    }
    Ok(())
}

/// Compile a set of routines into LIR, in parallel.
///
/// `emit_body` is the seam for expression/statement codegen: it receives the
/// routine's context and its initialized variables and appends the body
/// instructions. Per-routine errors are collected rather than aborting the
/// whole batch, so the driver can report everything at once.
pub fn compile_module<F>(
    decls: &[RoutineDecl],
    strings: &StringTable,
    globals: &GlobalTable,
    emit_body: F,
) -> Result<Vec<LirRoutine>, Vec<CompileError>>
where
    F: Fn(&RoutineDecl, &mut RoutineContext, &mut [Variable]) -> Result<(), CompileError> + Sync,
{
    let results: Vec<Result<LirRoutine, CompileError>> = decls
        .par_iter()
        .map(|decl| {
            let mut ctx = RoutineContext::new(&decl.signature, strings, globals);
            let mut vars = declare_variables(decl);
            emit_inits(&mut vars, &mut ctx)?;
            emit_body(decl, &mut ctx, &mut vars)?;
            Ok(ctx.finish())
        })
        .collect();

    let mut routines = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(routine) => routines.push(routine),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(routines)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::datatypes::{TypeMask, TypeSummary};

    #[test]
    fn declaration_order_is_params_locals_globals() {
        let mut strings = StringTable::new();
        let p = strings.intern("p");
        let l = strings.intern("l");
        let g = strings.intern("g");
        let decl = RoutineDecl {
            signature: RoutineSignature {
                name: strings.intern("r"),
                params: vec![ParamDecl {
                    name: p,
                    declared: StaticType::Int,
                }],
                results: vec![],
            },
            locals: vec![l],
            globals: vec![g],
            types: RoutineTypes::new(),
        };
        let vars = declare_variables(&decl);
        let names: Vec<StringId> = vars.iter().map(|v| v.name()).collect();
        assert_eq!(names, vec![p, l, g]);
    }

    #[test]
    fn synth_temp_is_initialized_on_creation() {
        let mut strings = StringTable::new();
        let name = strings.intern("r");
        let tmp = strings.intern("__t0");
        let signature = RoutineSignature {
            name,
            params: vec![],
            results: vec![],
        };
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&signature, &strings, &globals);
        let var = ctx.synth_temp(tmp, TypeSummary::of(TypeMask::INT)).unwrap();
        // Narrow temp: storage allocated, no establishing code
        assert!(var.place().is_some());
        assert!(ctx.emitter.body().is_empty());
    }
}
