//! LIR node definitions
//!
//! The low-level IR the place-binding subsystem emits into. It is a thin,
//! WASM-shaped instruction set: locals, constants, reinterprets and calls
//! into the Fern runtime intrinsics. Expression codegen appends to the same
//! stream; `encode` lowers it to wasm_encoder bytes.

use wasm_encoder::ValType;

/// Index of a LIR local within one routine. Parameters come first
/// (LIR index == WASM index for those), synthesized locals follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(pub u32);

/// The WASM value types this backend emits.
/// Dynamic values, alias cells and runtime handles are all externref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LirType {
    I32,
    I64,
    F64,
    ExternRef,
}

impl LirType {
    pub fn val_type(self) -> ValType {
        match self {
            LirType::I32 => ValType::I32,
            LirType::I64 => ValType::I64,
            LirType::F64 => ValType::F64,
            LirType::ExternRef => ValType::EXTERNREF,
        }
    }
}

/// Imported runtime intrinsics ("fern_rt" module).
///
/// Conversion intrinsics never fail at compile time; a coercion that cannot
/// succeed (e.g. array to int) is the runtime's contract to handle when the
/// program executes. The backend's only duty is to emit the call whenever a
/// representation and an expected category differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    /// [] -> [value]  the empty/void dynamic value
    ValueEmpty,
    /// [i32] -> [value]
    ValueFromBool,
    /// [i64] -> [value]
    ValueFromInt,
    /// [f64] -> [value]
    ValueFromFloat,
    /// [str] -> [value]
    ValueFromStr,
    /// [array] -> [value]
    ValueFromArray,
    /// [object] -> [value]
    ValueFromObject,
    /// [tag: i32, bits: i64] -> [value]
    ValueFromNumber,

    /// [value] -> [i32]
    ValueToBool,
    /// [value] -> [i64]
    ValueToInt,
    /// [value] -> [f64]
    ValueToFloat,
    /// [value] -> [str]
    ValueToStr,
    /// [value] -> [array]
    ValueToArray,
    /// [value] -> [object]
    ValueToObject,
    /// [value] -> [tag: i32, bits: i64]
    ValueToNumber,

    /// [i64] -> [tag: i32, bits: i64]
    NumberFromInt,
    /// [f64] -> [tag: i32, bits: i64]
    NumberFromFloat,

    /// [value] -> [value]  independent copy of container payloads (copy-on-read)
    ValueCopy,
    /// [array] -> [array]  independent copy of a narrow array handle
    ArrayCopy,
    /// [value] -> [i32]  false only for the empty value
    ValueIsSet,

    /// [value] -> [cell]  fresh alias cell seeded with the value
    AliasNew,
    /// [cell] -> [value]
    AliasGet,
    /// [cell, value] -> []
    AliasSet,

    /// [i32 literal id] -> [str]
    StrLiteral,

    /// [i32 slot] -> [cell]  the stable cell behind a GlobalTable slot
    GlobalCell,
    /// [i32 selector] -> [value]
    SuperglobalLoad,
    /// [i32 selector, value] -> []
    SuperglobalStore,
}

impl RuntimeFn {
    /// All intrinsics in import order. The position of a RuntimeFn in this
    /// array is its function index in the emitted module.
    pub const ALL: [RuntimeFn; 27] = [
        RuntimeFn::ValueEmpty,
        RuntimeFn::ValueFromBool,
        RuntimeFn::ValueFromInt,
        RuntimeFn::ValueFromFloat,
        RuntimeFn::ValueFromStr,
        RuntimeFn::ValueFromArray,
        RuntimeFn::ValueFromObject,
        RuntimeFn::ValueFromNumber,
        RuntimeFn::ValueToBool,
        RuntimeFn::ValueToInt,
        RuntimeFn::ValueToFloat,
        RuntimeFn::ValueToStr,
        RuntimeFn::ValueToArray,
        RuntimeFn::ValueToObject,
        RuntimeFn::ValueToNumber,
        RuntimeFn::NumberFromInt,
        RuntimeFn::NumberFromFloat,
        RuntimeFn::ValueCopy,
        RuntimeFn::ArrayCopy,
        RuntimeFn::ValueIsSet,
        RuntimeFn::AliasNew,
        RuntimeFn::AliasGet,
        RuntimeFn::AliasSet,
        RuntimeFn::StrLiteral,
        RuntimeFn::GlobalCell,
        RuntimeFn::SuperglobalLoad,
        RuntimeFn::SuperglobalStore,
    ];

    pub fn import_index(self) -> u32 {
        // ALL is small and this only runs during encoding
        RuntimeFn::ALL
            .iter()
            .position(|f| *f == self)
            .expect("every RuntimeFn is listed in ALL") as u32
    }

    pub fn import_name(self) -> &'static str {
        match self {
            RuntimeFn::ValueEmpty => "value_empty",
            RuntimeFn::ValueFromBool => "value_from_bool",
            RuntimeFn::ValueFromInt => "value_from_int",
            RuntimeFn::ValueFromFloat => "value_from_float",
            RuntimeFn::ValueFromStr => "value_from_str",
            RuntimeFn::ValueFromArray => "value_from_array",
            RuntimeFn::ValueFromObject => "value_from_object",
            RuntimeFn::ValueFromNumber => "value_from_number",
            RuntimeFn::ValueToBool => "value_to_bool",
            RuntimeFn::ValueToInt => "value_to_int",
            RuntimeFn::ValueToFloat => "value_to_float",
            RuntimeFn::ValueToStr => "value_to_str",
            RuntimeFn::ValueToArray => "value_to_array",
            RuntimeFn::ValueToObject => "value_to_object",
            RuntimeFn::ValueToNumber => "value_to_number",
            RuntimeFn::NumberFromInt => "number_from_int",
            RuntimeFn::NumberFromFloat => "number_from_float",
            RuntimeFn::ValueCopy => "value_copy",
            RuntimeFn::ArrayCopy => "array_copy",
            RuntimeFn::ValueIsSet => "value_is_set",
            RuntimeFn::AliasNew => "alias_new",
            RuntimeFn::AliasGet => "alias_get",
            RuntimeFn::AliasSet => "alias_set",
            RuntimeFn::StrLiteral => "str_literal",
            RuntimeFn::GlobalCell => "global_cell",
            RuntimeFn::SuperglobalLoad => "superglobal_load",
            RuntimeFn::SuperglobalStore => "superglobal_store",
        }
    }

    /// (params, results) of the imported function type.
    pub fn signature(self) -> (&'static [LirType], &'static [LirType]) {
        use LirType::*;
        const VALUE: &[LirType] = &[ExternRef];
        const NONE: &[LirType] = &[];
        const NUMBER: &[LirType] = &[I32, I64];
        match self {
            RuntimeFn::ValueEmpty => (NONE, VALUE),
            RuntimeFn::ValueFromBool => (&[I32], VALUE),
            RuntimeFn::ValueFromInt => (&[I64], VALUE),
            RuntimeFn::ValueFromFloat => (&[F64], VALUE),
            RuntimeFn::ValueFromStr
            | RuntimeFn::ValueFromArray
            | RuntimeFn::ValueFromObject
            | RuntimeFn::ValueCopy
            | RuntimeFn::ArrayCopy
            | RuntimeFn::AliasNew
            | RuntimeFn::AliasGet
            | RuntimeFn::ValueToStr
            | RuntimeFn::ValueToArray
            | RuntimeFn::ValueToObject => (VALUE, VALUE),
            RuntimeFn::ValueFromNumber => (NUMBER, VALUE),
            RuntimeFn::ValueToBool | RuntimeFn::ValueIsSet => (VALUE, &[I32]),
            RuntimeFn::ValueToInt => (VALUE, &[I64]),
            RuntimeFn::ValueToFloat => (VALUE, &[F64]),
            RuntimeFn::ValueToNumber => (VALUE, NUMBER),
            RuntimeFn::NumberFromInt => (&[I64], NUMBER),
            RuntimeFn::NumberFromFloat => (&[F64], NUMBER),
            RuntimeFn::AliasSet => (&[ExternRef, ExternRef], NONE),
            RuntimeFn::StrLiteral => (&[I32], VALUE),
            RuntimeFn::GlobalCell => (&[I32], VALUE),
            RuntimeFn::SuperglobalLoad => (&[I32], VALUE),
            RuntimeFn::SuperglobalStore => (&[I32, ExternRef], NONE),
        }
    }
}

/// One LIR instruction. Stack discipline follows WASM: each instruction
/// consumes and produces operand stack values exactly as its WASM lowering
/// does.
#[derive(Debug, Clone, PartialEq)]
pub enum LirInst {
    I32Const(i32),
    I64Const(i64),
    F64Const(f64),

    LocalGet(LocalId),
    LocalSet(LocalId),
    LocalTee(LocalId),

    Call(RuntimeFn),

    I64ReinterpretF64,
    F64ReinterpretI64,

    Drop,
    Return,
}

/// A fully lowered routine, ready for module encoding.
#[derive(Debug, Clone)]
pub struct LirRoutine {
    pub name: String,
    pub params: Vec<LirType>,
    pub results: Vec<LirType>,
    /// Non-parameter locals, indexed from params.len() upward
    pub locals: Vec<LirType>,
    pub body: Vec<LirInst>,
}
