use rustc_hash::FxHashMap;

/// A unique identifier for an interned string, represented as a u32 for memory efficiency.
/// Variable and routine names are always handled as StringIds inside the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringId(u32);

impl StringId {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn from_u32(id: u32) -> Self {
        Self(id)
    }

    /// Resolve this interned string using the provided StringTable.
    pub fn resolve(self, table: &StringTable) -> &str {
        table.resolve(self)
    }
}

impl std::fmt::Display for StringId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringId({})", self.0)
    }
}

/// Centralized string interner storing each unique name once.
///
/// Vec storage gives O(1) ID resolution, the reverse map gives O(1) interning.
/// One table exists per compilation and is shared read-only with every
/// routine's codegen context.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<String>,
    string_to_id: FxHashMap<String, StringId>,
}

impl StringTable {
    pub fn new() -> Self {
        StringTable::default()
    }

    /// Intern a string, returning the existing ID if it was seen before.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.string_to_id.get(s) {
            return id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.string_to_id.insert(s.to_string(), id);
        id
    }

    /// Resolve an ID back to its string.
    ///
    /// Panics if the ID did not come from this table; IDs are never
    /// constructed outside the interner in normal operation.
    pub fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
