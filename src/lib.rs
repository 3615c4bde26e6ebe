pub mod settings;

pub mod compiler {
    pub(crate) mod compiler_dev_logging;
    pub mod compiler_errors;
    pub mod datatypes;
    pub mod string_interning;

    pub mod codegen {
        pub mod alias_arena;
        pub mod emitter;
        pub mod encode;
        pub mod globals;
        pub mod lir;
        pub mod place;
        pub mod reference;
        pub mod representation;
        pub mod routine;
        pub mod variables;
    }
}


// Re-export the surface that expression/statement codegen (the consumer of
// this subsystem) and the compiler driver actually use.
pub use crate::compiler::codegen::encode::encode_module;
pub use crate::compiler::codegen::globals::{GlobalSlotId, GlobalTable, Superglobal};
pub use crate::compiler::codegen::lir::{LirInst, LirRoutine, LirType, RuntimeFn};
pub use crate::compiler::codegen::place::Place;
pub use crate::compiler::codegen::reference::{AccessKind, Reference};
pub use crate::compiler::codegen::representation::{NarrowKind, Representation};
pub use crate::compiler::codegen::routine::{
    ParamDecl, RoutineContext, RoutineDecl, RoutineSignature, compile_module,
};
pub use crate::compiler::codegen::variables::Variable;
pub use crate::compiler::compiler_errors::{CompileError, ErrorType, print_errors};
pub use crate::compiler::datatypes::{RoutineTypes, StaticType, TypeCategory, TypeMask, TypeSummary};
pub use crate::compiler::string_interning::{StringId, StringTable};
