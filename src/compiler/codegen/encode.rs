//! LIR to WASM module encoding
//!
//! Lowers fully compiled LirRoutines into a binary module with wasm_encoder
//! and optionally validates the result with wasmparser. Every runtime
//! intrinsic is imported from the "fern_rt" module in RuntimeFn::ALL order,
//! so intrinsic call indices are stable across builds.
//!
//! WASM requires non-parameter locals to be declared as runs of one type.
//! LIR locals are allocated in Place-creation order with types interleaved,
//! so encoding regroups them by type and rewrites every local index in the
//! body. Parameter indices pass through unchanged.

use crate::compiler::codegen::lir::{LirInst, LirRoutine, LirType, LocalId, RuntimeFn};
use crate::compiler::compiler_errors::CompileError;
use crate::settings::{Config, RUNTIME_IMPORT_MODULE};
use rustc_hash::FxHashMap;
use wasm_encoder::{
    CodeSection, EntityType, ExportKind, ExportSection, Function, FunctionSection, ImportSection,
    Instruction, Module, NameMap, NameSection, TypeSection, ValType,
};

/// Deduplicating wrapper over the type section. Identical function
/// signatures share one type index.
struct TypeTable {
    section: TypeSection,
    seen: FxHashMap<(Vec<ValType>, Vec<ValType>), u32>,
}

impl TypeTable {
    fn new() -> Self {
        TypeTable {
            section: TypeSection::new(),
            seen: FxHashMap::default(),
        }
    }

    fn index_of(&mut self, params: &[LirType], results: &[LirType]) -> u32 {
        let key = (
            params.iter().map(|t| t.val_type()).collect::<Vec<_>>(),
            results.iter().map(|t| t.val_type()).collect::<Vec<_>>(),
        );
        if let Some(&idx) = self.seen.get(&key) {
            return idx;
        }
        let idx = self.section.len();
        self.section
            .ty()
            .function(key.0.iter().copied(), key.1.iter().copied());
        self.seen.insert(key, idx);
        idx
    }
}

const LOCAL_GROUP_ORDER: [LirType; 4] =
    [LirType::I32, LirType::I64, LirType::F64, LirType::ExternRef];

/// Regrouped local declarations plus the LIR-index to WASM-index table
/// for one routine.
struct LocalLayout {
    decls: Vec<(u32, ValType)>,
    wasm_index: Vec<u32>,
}

fn layout_locals(routine: &LirRoutine) -> LocalLayout {
    let param_count = routine.params.len() as u32;
    let mut wasm_index = vec![0u32; routine.params.len() + routine.locals.len()];
    for i in 0..param_count {
        wasm_index[i as usize] = i;
    }

    let mut decls = Vec::new();
    let mut next = param_count;
    for group in LOCAL_GROUP_ORDER {
        let mut count = 0u32;
        for (offset, &ty) in routine.locals.iter().enumerate() {
            if ty == group {
                wasm_index[routine.params.len() + offset] = next;
                next += 1;
                count += 1;
            }
        }
        if count > 0 {
            decls.push((count, group.val_type()));
        }
    }

    LocalLayout { decls, wasm_index }
}

fn lower_inst<'a>(inst: &LirInst, layout: &LocalLayout) -> Instruction<'a> {
    let local = |id: LocalId| layout.wasm_index[id.0 as usize];
    match inst {
        LirInst::I32Const(v) => Instruction::I32Const(*v),
        LirInst::I64Const(v) => Instruction::I64Const(*v),
        LirInst::F64Const(v) => Instruction::F64Const((*v).into()),
        LirInst::LocalGet(id) => Instruction::LocalGet(local(*id)),
        LirInst::LocalSet(id) => Instruction::LocalSet(local(*id)),
        LirInst::LocalTee(id) => Instruction::LocalTee(local(*id)),
        LirInst::Call(f) => Instruction::Call(f.import_index()),
        LirInst::I64ReinterpretF64 => Instruction::I64ReinterpretF64,
        LirInst::F64ReinterpretI64 => Instruction::F64ReinterpretI64,
        LirInst::Drop => Instruction::Drop,
        LirInst::Return => Instruction::Return,
    }
}

/// Encode compiled routines into a complete WASM binary.
///
/// Function index space: intrinsic imports first (RuntimeFn::ALL order),
/// then the routines in the order given.
pub fn encode_module(routines: &[LirRoutine], config: &Config) -> Result<Vec<u8>, CompileError> {
    let mut types = TypeTable::new();
    let mut imports = ImportSection::new();
    let mut functions = FunctionSection::new();
    let mut exports = ExportSection::new();
    let mut code = CodeSection::new();

    for intrinsic in RuntimeFn::ALL {
        let (params, results) = intrinsic.signature();
        let type_idx = types.index_of(params, results);
        imports.import(
            RUNTIME_IMPORT_MODULE,
            intrinsic.import_name(),
            EntityType::Function(type_idx),
        );
    }

    let import_count = RuntimeFn::ALL.len() as u32;
    let mut function_names = NameMap::new();
    for (i, intrinsic) in RuntimeFn::ALL.iter().enumerate() {
        function_names.append(i as u32, intrinsic.import_name());
    }

    for (i, routine) in routines.iter().enumerate() {
        let type_idx = types.index_of(&routine.params, &routine.results);
        functions.function(type_idx);

        let layout = layout_locals(routine);
        let mut body = Function::new(layout.decls.iter().copied());
        for inst in &routine.body {
            body.instruction(&lower_inst(inst, &layout));
        }
        body.instruction(&Instruction::End);
        code.function(&body);

        let func_idx = import_count + i as u32;
        function_names.append(func_idx, &routine.name);
        if config.export_routines {
            exports.export(&routine.name, ExportKind::Func, func_idx);
        }
    }

    let mut names = NameSection::new();
    names.module(&config.module_name);
    names.functions(&function_names);

    let mut module = Module::new();
    module.section(&types.section);
    module.section(&imports);
    module.section(&functions);
    module.section(&exports);
    module.section(&code);
    module.section(&names);
    let bytes = module.finish();

    if config.validate_output {
        wasmparser::validate(&bytes).map_err(|e| {
            CompileError::validation_error(format!(
                "encoded module failed validation: {e}"
            ))
        })?;
    }

    Ok(bytes)
}
