//! Module encoding tests
//!
//! Every encoded module goes back through wasmparser, so these catch type
//! section mismatches, bad local indices and stack discipline errors in the
//! lowered bodies.

#[cfg(test)]
mod tests {
    use crate::compiler::codegen::encode::encode_module;
    use crate::compiler::codegen::lir::{LirInst, LirRoutine, LirType, LocalId, RuntimeFn};
    use crate::settings::Config;
    use wasmparser::{Parser, Payload};

    fn config() -> Config {
        Config {
            module_name: "test_module".to_string(),
            validate_output: true,
            export_routines: true,
        }
    }

    #[test]
    fn empty_module_with_imports_validates() {
        let bytes = encode_module(&[], &config()).unwrap();
        wasmparser::validate(&bytes).unwrap();
    }

    #[test]
    fn mixed_local_types_encode_and_validate() {
        // Locals deliberately interleaved by type so the encoder has to
        // regroup them and rewrite every index
        let routine = LirRoutine {
            name: "mixed".to_string(),
            params: vec![LirType::I64],
            results: vec![LirType::I64],
            locals: vec![
                LirType::ExternRef,
                LirType::I32,
                LirType::ExternRef,
                LirType::F64,
                LirType::I64,
            ],
            body: vec![
                LirInst::Call(RuntimeFn::ValueEmpty),
                LirInst::LocalSet(LocalId(1)),
                LirInst::I32Const(7),
                LirInst::LocalSet(LocalId(2)),
                LirInst::F64Const(1.5),
                LirInst::LocalTee(LocalId(4)),
                LirInst::I64ReinterpretF64,
                LirInst::LocalSet(LocalId(5)),
                LirInst::LocalGet(LocalId(0)),
                LirInst::Call(RuntimeFn::ValueFromInt),
                LirInst::Call(RuntimeFn::ValueToInt),
            ],
        };
        let bytes = encode_module(&[routine], &config()).unwrap();
        wasmparser::validate(&bytes).unwrap();
    }

    #[test]
    fn intrinsic_calls_lower_to_stable_import_indices() {
        let routine = LirRoutine {
            name: "calls".to_string(),
            params: vec![],
            results: vec![],
            locals: vec![LirType::ExternRef],
            body: vec![
                LirInst::Call(RuntimeFn::ValueEmpty),
                LirInst::Call(RuntimeFn::AliasNew),
                LirInst::LocalTee(LocalId(0)),
                LirInst::Call(RuntimeFn::AliasGet),
                LirInst::Call(RuntimeFn::ValueIsSet),
                LirInst::Drop,
                LirInst::LocalGet(LocalId(0)),
                LirInst::Call(RuntimeFn::ValueEmpty),
                LirInst::Call(RuntimeFn::AliasSet),
            ],
        };
        let bytes = encode_module(&[routine], &config()).unwrap();
        wasmparser::validate(&bytes).unwrap();

        // Every intrinsic is imported from the runtime module
        let mut import_count = 0;
        for payload in Parser::new(0).parse_all(&bytes) {
            if let Payload::ImportSection(reader) = payload.unwrap() {
                for import in reader.into_imports() {
                    let import = import.unwrap();
                    assert_eq!(import.module, "fern_rt");
                    import_count += 1;
                }
            }
        }
        assert_eq!(import_count, RuntimeFn::ALL.len());
    }

    #[test]
    fn routines_are_exported_by_name_when_configured() {
        let routine = LirRoutine {
            name: "entry".to_string(),
            params: vec![],
            results: vec![],
            locals: vec![],
            body: vec![],
        };

        let bytes = encode_module(&[routine.clone()], &config()).unwrap();
        let mut exported = Vec::new();
        for payload in Parser::new(0).parse_all(&bytes) {
            if let Payload::ExportSection(reader) = payload.unwrap() {
                for export in reader {
                    exported.push(export.unwrap().name.to_string());
                }
            }
        }
        assert_eq!(exported, vec!["entry".to_string()]);

        let mut private = config();
        private.export_routines = false;
        let bytes = encode_module(&[routine], &private).unwrap();
        for payload in Parser::new(0).parse_all(&bytes) {
            if let Payload::ExportSection(reader) = payload.unwrap() {
                assert_eq!(reader.count(), 0);
            }
        }
    }

    #[test]
    fn early_return_still_validates() {
        let routine = LirRoutine {
            name: "early".to_string(),
            params: vec![LirType::I32],
            results: vec![LirType::I32],
            locals: vec![],
            body: vec![
                LirInst::LocalGet(LocalId(0)),
                LirInst::Return,
            ],
        };
        let bytes = encode_module(&[routine], &config()).unwrap();
        wasmparser::validate(&bytes).unwrap();
    }
}
