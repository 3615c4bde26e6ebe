//! Type categories, inference masks and declared parameter types.
//!
//! The flow-sensitive inference pass (an external collaborator) summarizes
//! every variable of a routine as a TypeMask plus an aliasable flag. This
//! module holds those summary types; the backend only ever reads them.

use crate::compiler::string_interning::StringId;
use rustc_hash::FxHashMap;
use std::fmt::Display;
use std::ops::BitOr;

/// A concrete runtime type category a Fern value can have at a program point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Array,
    Object,
}

impl TypeCategory {
    pub const fn mask(self) -> TypeMask {
        match self {
            TypeCategory::Null => TypeMask::NULL,
            TypeCategory::Bool => TypeMask::BOOL,
            TypeCategory::Int => TypeMask::INT,
            TypeCategory::Float => TypeMask::FLOAT,
            TypeCategory::Str => TypeMask::STR,
            TypeCategory::Array => TypeMask::ARRAY,
            TypeCategory::Object => TypeMask::OBJECT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeCategory::Null => "null",
            TypeCategory::Bool => "bool",
            TypeCategory::Int => "int",
            TypeCategory::Float => "float",
            TypeCategory::Str => "str",
            TypeCategory::Array => "array",
            TypeCategory::Object => "object",
        }
    }
}

const ALL_CATEGORIES: [TypeCategory; 7] = [
    TypeCategory::Null,
    TypeCategory::Bool,
    TypeCategory::Int,
    TypeCategory::Float,
    TypeCategory::Str,
    TypeCategory::Array,
    TypeCategory::Object,
];

/// Bit set over the runtime type categories a variable may hold.
///
/// Two extra bits carry inference facts that are not categories themselves:
/// REF marks a variable that may be bound into an aliasing relationship, and
/// ANY marks a variable the inference gave up on. Either bit rules out every
/// specialized representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeMask(u16);

impl TypeMask {
    pub const EMPTY: TypeMask = TypeMask(0);
    pub const NULL: TypeMask = TypeMask(1 << 0);
    pub const BOOL: TypeMask = TypeMask(1 << 1);
    pub const INT: TypeMask = TypeMask(1 << 2);
    pub const FLOAT: TypeMask = TypeMask(1 << 3);
    pub const STR: TypeMask = TypeMask(1 << 4);
    pub const ARRAY: TypeMask = TypeMask(1 << 5);
    pub const OBJECT: TypeMask = TypeMask(1 << 6);

    /// The variable may participate in a reference (alias) binding
    pub const REF: TypeMask = TypeMask(1 << 7);

    /// The inference pass could not narrow this variable at all
    pub const ANY: TypeMask = TypeMask(1 << 8);

    pub const NUMERIC: TypeMask = TypeMask(Self::INT.0 | Self::FLOAT.0);

    /// Every bit set: the capability mask of a fully dynamic slot
    pub const UNIVERSAL: TypeMask = TypeMask(0b1_1111_1111);

    pub const fn union(self, other: TypeMask) -> TypeMask {
        TypeMask(self.0 | other.0)
    }

    pub const fn contains(self, other: TypeMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_subset_of(self, other: TypeMask) -> bool {
        self.0 & !other.0 == 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn has_any(self) -> bool {
        self.contains(TypeMask::ANY)
    }

    pub const fn has_ref(self) -> bool {
        self.contains(TypeMask::REF)
    }

    /// Non-empty and only ever an integer or a float
    pub const fn is_numeric_only(self) -> bool {
        !self.is_empty() && self.is_subset_of(TypeMask::NUMERIC)
    }

    /// The single category this mask names, if it names exactly one
    /// (the REF and ANY bits disqualify the mask entirely).
    pub fn single_category(self) -> Option<TypeCategory> {
        if self.has_any() || self.has_ref() {
            return None;
        }
        if self.0.count_ones() != 1 {
            return None;
        }
        ALL_CATEGORIES.into_iter().find(|cat| self.contains(cat.mask()))
    }
}

impl BitOr for TypeMask {
    type Output = TypeMask;

    fn bitor(self, rhs: TypeMask) -> TypeMask {
        self.union(rhs)
    }
}

impl Display for TypeMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        let mut names: Vec<&str> = ALL_CATEGORIES
            .into_iter()
            .filter(|cat| self.contains(cat.mask()))
            .map(|cat| cat.name())
            .collect();
        if self.has_ref() {
            names.push("ref");
        }
        if self.has_any() {
            names.push("any");
        }
        write!(f, "{{{}}}", names.join("|"))
    }
}

/// A parameter's declared static type, taken from routine metadata.
///
/// Fern parameter declarations are optional; an undeclared parameter is
/// `Dynamic` and arrives as a boxed dynamic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticType {
    Bool,
    Int,
    Float,
    Str,
    Array,
    Object,
    Dynamic,
}

impl StaticType {
    /// The set of runtime categories the declared slot can represent.
    /// A body mask inside this capability means the raw parameter slot
    /// suffices for the whole routine.
    pub fn capability(self) -> TypeMask {
        match self {
            StaticType::Bool => TypeMask::BOOL,
            StaticType::Int => TypeMask::INT,
            StaticType::Float => TypeMask::FLOAT,
            StaticType::Str => TypeMask::STR,
            StaticType::Array => TypeMask::ARRAY,
            StaticType::Object => TypeMask::OBJECT,
            StaticType::Dynamic => TypeMask::UNIVERSAL,
        }
    }
}

/// Per-variable summary produced by the inference pass: the mask of possible
/// runtime categories plus whether an aliasing analysis saw the variable on
/// either side of a reference assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSummary {
    pub mask: TypeMask,
    pub aliasable: bool,
}

impl TypeSummary {
    pub fn of(mask: TypeMask) -> TypeSummary {
        TypeSummary {
            mask,
            aliasable: false,
        }
    }

    pub fn aliasable(mask: TypeMask) -> TypeSummary {
        TypeSummary {
            mask,
            aliasable: true,
        }
    }
}

/// The inference result for one routine, keyed by variable name.
/// Immutable once supplied to codegen.
#[derive(Debug, Clone, Default)]
pub struct RoutineTypes {
    per_var: FxHashMap<StringId, TypeSummary>,
}

impl RoutineTypes {
    pub fn new() -> Self {
        RoutineTypes::default()
    }

    pub fn insert(&mut self, var: StringId, summary: TypeSummary) {
        self.per_var.insert(var, summary);
    }

    /// Summary for a variable. A variable the inference never saw gets the
    /// universal dynamic summary, which is always a correct fallback.
    pub fn summary(&self, var: StringId) -> TypeSummary {
        self.per_var
            .get(&var)
            .copied()
            .unwrap_or(TypeSummary::of(TypeMask::ANY))
    }
}
