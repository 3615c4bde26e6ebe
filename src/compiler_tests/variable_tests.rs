//! Variable initialization and place binding tests
//!
//! These run the emitted LIR through the test interpreter where the
//! observable behavior matters (initial values, shadow population, alias
//! sharing), and assert on instruction sequences where the contract is
//! about emitted code (narrow locals emitting nothing).

#[cfg(test)]
mod tests {
    use crate::compiler::codegen::globals::GlobalTable;
    use crate::compiler::codegen::lir::{LirInst, LocalId, RuntimeFn};
    use crate::compiler::codegen::place::Place;
    use crate::compiler::codegen::reference::AccessKind;
    use crate::compiler::codegen::representation::NarrowKind;
    use crate::compiler::codegen::routine::{ParamDecl, RoutineContext, RoutineSignature};
    use crate::compiler::codegen::variables::Variable;
    use crate::compiler::compiler_errors::ErrorType;
    use crate::compiler::datatypes::{StaticType, TypeMask, TypeSummary};
    use crate::compiler::string_interning::StringTable;
    use crate::compiler_tests::lir_eval::{RuntimeState, StackVal, Value, run_routine};

    fn signature(strings: &mut StringTable, params: Vec<ParamDecl>) -> RoutineSignature {
        RoutineSignature {
            name: strings.intern("test_routine"),
            params,
            results: vec![],
        }
    }

    #[test]
    fn narrow_local_allocates_storage_without_code() {
        let mut strings = StringTable::new();
        let x = strings.intern("x");
        let sig = signature(&mut strings, vec![]);
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let mut var = Variable::new_local(x, TypeSummary::of(TypeMask::INT));
        var.emit_init(&mut ctx).unwrap();

        assert!(matches!(
            var.place(),
            Some(Place::Narrow {
                kind: NarrowKind::Int,
                ..
            })
        ));
        assert!(ctx.emitter.body().is_empty());
    }

    #[test]
    fn dynamic_local_reads_as_the_empty_value() {
        let mut strings = StringTable::new();
        let x = strings.intern("x");
        let sig = signature(&mut strings, vec![]);
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let mut var = Variable::new_local(x, TypeSummary::of(TypeMask::ANY));
        var.emit_init(&mut ctx).unwrap();
        let read = var.bind_reference(&ctx, AccessKind::Read, TypeMask::ANY).unwrap();
        read.emit_load(&mut ctx.emitter, &strings).unwrap();

        let state = RuntimeState::new();
        let out = run_routine(&state, &ctx.finish(), vec![]);
        match out.as_slice() {
            [StackVal::Ref(h)] => assert_eq!(*h.borrow(), Value::Null),
            other => panic!("unexpected stack: {other:?}"),
        }
    }

    #[test]
    fn numeric_variant_initializes_to_integer_zero() {
        let mut strings = StringTable::new();
        let n = strings.intern("n");
        let sig = signature(&mut strings, vec![]);
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let mut var = Variable::new_local(n, TypeSummary::of(TypeMask::NUMERIC));
        var.emit_init(&mut ctx).unwrap();
        assert!(matches!(var.place(), Some(Place::Number { .. })));

        let read = var
            .bind_reference(&ctx, AccessKind::Read, TypeMask::INT)
            .unwrap();
        read.emit_load(&mut ctx.emitter, &strings).unwrap();

        let state = RuntimeState::new();
        let out = run_routine(&state, &ctx.finish(), vec![]);
        assert!(matches!(out.as_slice(), [StackVal::I64(0)]));
    }

    #[test]
    fn aliased_variables_observe_each_others_writes() {
        let mut strings = StringTable::new();
        let a = strings.intern("a");
        let sig = signature(&mut strings, vec![]);
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let aliasable = TypeSummary::aliasable(TypeMask::UNIVERSAL);
        let mut var_a = Variable::new_local(a, aliasable);
        var_a.emit_init(&mut ctx).unwrap();

        // Aliasing puts both variables behind the same cell handle; here
        // the second place shares the first variable's cell local directly,
        // the way assignment-by-alias code would arrange it.
        let place_a = var_a.place().unwrap().clone();
        let Place::Alias { cell_local, cell } = place_a else {
            panic!("aliasable summary must select a cell place");
        };
        let place_b = Place::Alias { cell_local, cell };

        // Write 11 through a, read it back through b
        let write = var_a
            .bind_reference(&ctx, AccessKind::Write, TypeMask::INT)
            .unwrap();
        write.emit_store_prepare(&mut ctx.emitter, &strings).unwrap();
        ctx.emitter.push(LirInst::I64Const(11));
        write.emit_store_commit(&mut ctx.emitter, &strings).unwrap();

        place_b.emit_load(&mut ctx.emitter);

        let state = RuntimeState::new();
        let out = run_routine(&state, &ctx.finish(), vec![]);
        match out.as_slice() {
            [StackVal::Ref(h)] => assert_eq!(*h.borrow(), Value::Int(11)),
            other => panic!("unexpected stack: {other:?}"),
        }
    }

    #[test]
    fn parameter_within_declared_type_keeps_its_slot() {
        let mut strings = StringTable::new();
        let p = strings.intern("p");
        let sig = signature(
            &mut strings,
            vec![ParamDecl {
                name: p,
                declared: StaticType::Int,
            }],
        );
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let mut var = Variable::new_parameter(p, 0, StaticType::Int, TypeSummary::of(TypeMask::INT));
        var.emit_init(&mut ctx).unwrap();

        assert_eq!(
            var.place(),
            Some(&Place::Narrow {
                local: LocalId(0),
                kind: NarrowKind::Int,
            })
        );
        assert!(ctx.emitter.body().is_empty());
    }

    #[test]
    fn widened_parameter_is_shadowed_and_populated() {
        let mut strings = StringTable::new();
        let p = strings.intern("p");
        let sig = signature(
            &mut strings,
            vec![ParamDecl {
                name: p,
                declared: StaticType::Int,
            }],
        );
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        // Body may assign a string, so the declared i64 slot cannot hold
        // every value the variable takes
        let summary = TypeSummary::of(TypeMask::INT.union(TypeMask::STR));
        let mut var = Variable::new_parameter(p, 0, StaticType::Int, summary);
        var.emit_init(&mut ctx).unwrap();

        let shadow = var.place().unwrap().clone();
        let Place::Dynamic { local } = shadow else {
            panic!("int|str shadow must be a dynamic cell, got {shadow:?}");
        };
        assert_ne!(local, LocalId(0), "shadow must not be the raw argument slot");

        // The shadow holds the boxed incoming argument after init
        let read = var
            .bind_reference(&ctx, AccessKind::Read, TypeMask::INT)
            .unwrap();
        read.emit_load(&mut ctx.emitter, &strings).unwrap();
        // The raw slot still holds the untouched argument
        ctx.emitter.push(LirInst::LocalGet(LocalId(0)));

        let state = RuntimeState::new();
        let out = run_routine(&state, &ctx.finish(), vec![StackVal::I64(7)]);
        match out.as_slice() {
            [StackVal::I64(shadowed), StackVal::I64(raw)] => {
                assert_eq!(*shadowed, 7);
                assert_eq!(*raw, 7);
            }
            other => panic!("unexpected stack: {other:?}"),
        }
    }

    #[test]
    fn int_parameter_reassigned_to_string_round_trips() {
        let mut strings = StringTable::new();
        let p = strings.intern("p");
        let sig = signature(
            &mut strings,
            vec![ParamDecl {
                name: p,
                declared: StaticType::Int,
            }],
        );
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let summary = TypeSummary::of(TypeMask::INT.union(TypeMask::STR));
        let mut var = Variable::new_parameter(p, 0, StaticType::Int, summary);
        var.emit_init(&mut ctx).unwrap();
        assert!(matches!(var.place(), Some(Place::Dynamic { .. })));

        // Body reassigns the int-declared parameter to a string literal
        let write = var
            .bind_reference(&ctx, AccessKind::Write, TypeMask::STR)
            .unwrap();
        write.emit_store_prepare(&mut ctx.emitter, &strings).unwrap();
        ctx.emitter.push(LirInst::I32Const(0));
        ctx.emitter.push(LirInst::Call(RuntimeFn::StrLiteral));
        write.emit_store_commit(&mut ctx.emitter, &strings).unwrap();

        // Return the variable's value, then the raw argument slot
        let read = var
            .bind_reference(&ctx, AccessKind::Read, TypeMask::STR)
            .unwrap();
        read.emit_load(&mut ctx.emitter, &strings).unwrap();
        ctx.emitter.push(LirInst::LocalGet(LocalId(0)));

        let mut state = RuntimeState::new();
        state.str_literals = vec!["hello".to_string()];
        let out = run_routine(&state, &ctx.finish(), vec![StackVal::I64(7)]);
        match out.as_slice() {
            [StackVal::Ref(value), StackVal::I64(raw)] => {
                assert_eq!(*value.borrow(), Value::Str("hello".to_string()));
                assert_eq!(*raw, 7, "raw argument slot must survive the reassignment");
            }
            other => panic!("unexpected stack: {other:?}"),
        }
    }

    #[test]
    fn double_initialization_is_an_internal_error() {
        let mut strings = StringTable::new();
        let x = strings.intern("x");
        let sig = signature(&mut strings, vec![]);
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let mut var = Variable::new_local(x, TypeSummary::of(TypeMask::INT));
        var.emit_init(&mut ctx).unwrap();
        let err = var.emit_init(&mut ctx).unwrap_err();
        assert_eq!(err.error_type, ErrorType::Compiler);
        assert!(err.msg.contains("'x'"));
    }

    #[test]
    fn binding_before_initialization_is_an_internal_error() {
        let mut strings = StringTable::new();
        let x = strings.intern("x");
        let sig = signature(&mut strings, vec![]);
        let globals = GlobalTable::new();
        let ctx = RoutineContext::new(&sig, &strings, &globals);

        let var = Variable::new_local(x, TypeSummary::of(TypeMask::INT));
        let err = var
            .bind_reference(&ctx, AccessKind::Read, TypeMask::INT)
            .unwrap_err();
        assert_eq!(err.error_type, ErrorType::Compiler);
    }

    #[test]
    fn globals_have_no_direct_place() {
        let mut strings = StringTable::new();
        let g = strings.intern("counter");
        let sig = signature(&mut strings, vec![]);
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let mut var = Variable::new_global(g);
        var.emit_init(&mut ctx).unwrap();
        assert!(var.place().is_none());
        assert!(ctx.emitter.body().is_empty());

        // Binding creates the table slot lazily
        assert!(globals.lookup("counter").is_none());
        let r = var
            .bind_reference(&ctx, AccessKind::Write, TypeMask::ANY)
            .unwrap();
        assert!(matches!(r.place(), Place::GlobalSlot { .. }));
        assert!(globals.lookup("counter").is_some());
    }

    #[test]
    fn synthesized_temporaries_support_write_then_read() {
        let mut strings = StringTable::new();
        let tmp = strings.intern("__tmp0");
        let sig = signature(&mut strings, vec![]);
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let var = ctx.synth_temp(tmp, TypeSummary::of(TypeMask::FLOAT)).unwrap();
        let write = var
            .bind_reference(&ctx, AccessKind::Write, TypeMask::FLOAT)
            .unwrap();
        write.emit_store_prepare(&mut ctx.emitter, &strings).unwrap();
        ctx.emitter.push(LirInst::F64Const(1.5));
        write.emit_store_commit(&mut ctx.emitter, &strings).unwrap();
        let read = var
            .bind_reference(&ctx, AccessKind::Read, TypeMask::FLOAT)
            .unwrap();
        read.emit_load(&mut ctx.emitter, &strings).unwrap();

        let state = RuntimeState::new();
        let out = run_routine(&state, &ctx.finish(), vec![]);
        match out.as_slice() {
            [StackVal::F64(v)] => assert_eq!(*v, 1.5),
            other => panic!("unexpected stack: {other:?}"),
        }
    }

    #[test]
    fn alias_init_seeds_the_cell_before_any_use() {
        let mut strings = StringTable::new();
        let r = strings.intern("r");
        let sig = signature(&mut strings, vec![]);
        let globals = GlobalTable::new();
        let mut ctx = RoutineContext::new(&sig, &strings, &globals);

        let mut var = Variable::new_local(r, TypeSummary::aliasable(TypeMask::UNIVERSAL));
        var.emit_init(&mut ctx).unwrap();

        let Some(Place::Alias { cell_local, .. }) = var.place() else {
            panic!("expected an alias cell place");
        };
        assert_eq!(
            ctx.emitter.body(),
            &[
                LirInst::Call(RuntimeFn::ValueEmpty),
                LirInst::Call(RuntimeFn::AliasNew),
                LirInst::LocalSet(*cell_local),
            ]
        );
    }
}
