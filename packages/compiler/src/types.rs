//! Built-in type tags and the global type table.

use indexmap::IndexMap;
use serde::Serialize;

use crate::tree::NodeId;

/// Resolved built-in tag carried on named type nodes. `UserDefined` marks a
/// name that resolved to a declaration; `Unknown` marks a name that has not
/// resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuiltinType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Isz,
    Usz,
    Bool,
    Void,
    F32,
    F64,
    UserDefined,
    Unknown,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<BuiltinType> {
        Some(match name {
            "i8" => BuiltinType::I8,
            "i16" => BuiltinType::I16,
            "i32" => BuiltinType::I32,
            "i64" => BuiltinType::I64,
            "u8" => BuiltinType::U8,
            "u16" => BuiltinType::U16,
            "u32" => BuiltinType::U32,
            "u64" => BuiltinType::U64,
            "isz" => BuiltinType::Isz,
            "usz" => BuiltinType::Usz,
            "bool" => BuiltinType::Bool,
            "void" => BuiltinType::Void,
            "f32" => BuiltinType::F32,
            "f64" => BuiltinType::F64,
            _ => return None,
        })
    }

    /// The C spelling of this type in emitted code.
    pub fn c_name(self) -> &'static str {
        match self {
            BuiltinType::I8 => "int8_t",
            BuiltinType::I16 => "int16_t",
            BuiltinType::I32 => "int32_t",
            BuiltinType::I64 => "int64_t",
            BuiltinType::U8 => "uint8_t",
            BuiltinType::U16 => "uint16_t",
            BuiltinType::U32 => "uint32_t",
            BuiltinType::U64 => "uint64_t",
            BuiltinType::Isz => "ptrdiff_t",
            BuiltinType::Usz => "size_t",
            BuiltinType::Bool => "bool",
            BuiltinType::Void => "void",
            BuiltinType::F32 => "float",
            BuiltinType::F64 => "double",
            BuiltinType::UserDefined | BuiltinType::Unknown => "",
        }
    }

    /// The Tick-side spelling, as found in the type table.
    pub fn tick_name(self) -> &'static str {
        match self {
            BuiltinType::I8 => "i8",
            BuiltinType::I16 => "i16",
            BuiltinType::I32 => "i32",
            BuiltinType::I64 => "i64",
            BuiltinType::U8 => "u8",
            BuiltinType::U16 => "u16",
            BuiltinType::U32 => "u32",
            BuiltinType::U64 => "u64",
            BuiltinType::Isz => "isz",
            BuiltinType::Usz => "usz",
            BuiltinType::Bool => "bool",
            BuiltinType::Void => "void",
            BuiltinType::F32 => "f32",
            BuiltinType::F64 => "f64",
            BuiltinType::UserDefined | BuiltinType::Unknown => "",
        }
    }

    /// Suffix used to pick the runtime helper, e.g. `i32` in
    /// `tick_checked_add_i32`.
    pub fn helper_suffix(self) -> &'static str {
        match self {
            BuiltinType::I8 => "i8",
            BuiltinType::I16 => "i16",
            BuiltinType::I32 => "i32",
            BuiltinType::I64 => "i64",
            BuiltinType::U8 => "u8",
            BuiltinType::U16 => "u16",
            BuiltinType::U32 => "u32",
            BuiltinType::U64 => "u64",
            BuiltinType::Isz => "isz",
            BuiltinType::Usz => "usz",
            _ => "",
        }
    }

    pub fn is_signed_int(self) -> bool {
        matches!(
            self,
            BuiltinType::I8
                | BuiltinType::I16
                | BuiltinType::I32
                | BuiltinType::I64
                | BuiltinType::Isz
        )
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(
            self,
            BuiltinType::U8
                | BuiltinType::U16
                | BuiltinType::U32
                | BuiltinType::U64
                | BuiltinType::Usz
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    /// Bit width of an integer type. `isz`/`usz` are treated as 64-bit; the
    /// widening table is fixed at build time.
    pub fn bit_width(self) -> Option<u32> {
        Some(match self {
            BuiltinType::I8 | BuiltinType::U8 => 8,
            BuiltinType::I16 | BuiltinType::U16 => 16,
            BuiltinType::I32 | BuiltinType::U32 => 32,
            BuiltinType::I64 | BuiltinType::U64 | BuiltinType::Isz | BuiltinType::Usz => 64,
            _ => return None,
        })
    }

    /// True when every value of `src` is representable in `dst`:
    /// signed into same-or-larger signed, unsigned into same-or-larger
    /// unsigned, unsigned into strictly larger signed.
    pub fn widens_to(src: BuiltinType, dst: BuiltinType) -> bool {
        let (Some(sw), Some(dw)) = (src.bit_width(), dst.bit_width()) else {
            return false;
        };
        if src.is_signed_int() && dst.is_signed_int() {
            dw >= sw
        } else if src.is_unsigned_int() && dst.is_unsigned_int() {
            dw >= sw
        } else if src.is_unsigned_int() && dst.is_signed_int() {
            dw > sw
        } else {
            false
        }
    }

    /// Smallest signed type holding `value`.
    pub fn smallest_signed(value: i64) -> BuiltinType {
        if value >= i8::MIN as i64 && value <= i8::MAX as i64 {
            BuiltinType::I8
        } else if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
            BuiltinType::I16
        } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
            BuiltinType::I32
        } else {
            BuiltinType::I64
        }
    }
}

/// One entry of the global type table.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub name: String,
    pub builtin: BuiltinType,
    pub decl: Option<NodeId>,
    pub is_pub: bool,
}

/// Global table of named types, keyed by source name. Pre-populated with the
/// built-ins; user-defined insertion rejects duplicates.
#[derive(Debug)]
pub struct TypeTable {
    entries: IndexMap<String, TypeEntry>,
}

const BUILTIN_NAMES: &[&str] = &[
    "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "isz", "usz", "bool", "void", "f32",
    "f64",
];

impl TypeTable {
    pub fn with_builtins() -> Self {
        let mut entries = IndexMap::new();
        for name in BUILTIN_NAMES {
            entries.insert(
                (*name).to_string(),
                TypeEntry {
                    name: (*name).to_string(),
                    builtin: BuiltinType::from_name(name).unwrap(),
                    decl: None,
                    is_pub: true,
                },
            );
        }
        TypeTable { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<(usize, &TypeEntry)> {
        self.entries.get_full(name).map(|(ix, _, e)| (ix, e))
    }

    pub fn entry(&self, slot: usize) -> &TypeEntry {
        &self.entries[slot]
    }

    /// Insert a user-defined type. `Err` carries the existing entry's slot.
    pub fn insert_user(
        &mut self,
        name: &str,
        decl: NodeId,
        is_pub: bool,
    ) -> Result<usize, usize> {
        if let Some((slot, _)) = self.lookup(name) {
            return Err(slot);
        }
        let (slot, _) = self.entries.insert_full(
            name.to_string(),
            TypeEntry {
                name: name.to_string(),
                builtin: BuiltinType::UserDefined,
                decl: Some(decl),
                is_pub,
            },
        );
        Ok(slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_prepopulated() {
        let table = TypeTable::with_builtins();
        assert!(table.lookup("i32").is_some());
        assert!(table.lookup("usz").is_some());
        assert!(table.lookup("f64").is_some());
        assert!(table.lookup("Foo").is_none());
    }

    #[test]
    fn widening_table() {
        use BuiltinType::*;
        assert!(BuiltinType::widens_to(I8, I32));
        assert!(BuiltinType::widens_to(I32, I32));
        assert!(BuiltinType::widens_to(U8, U64));
        assert!(BuiltinType::widens_to(U32, I64));
        assert!(!BuiltinType::widens_to(U32, I32));
        assert!(!BuiltinType::widens_to(I8, U64));
        assert!(!BuiltinType::widens_to(I64, I32));
        assert!(!BuiltinType::widens_to(Usz, I64));
        assert!(!BuiltinType::widens_to(F32, F64));
    }

    #[test]
    fn smallest_signed_fit() {
        assert_eq!(BuiltinType::smallest_signed(0), BuiltinType::I8);
        assert_eq!(BuiltinType::smallest_signed(-128), BuiltinType::I8);
        assert_eq!(BuiltinType::smallest_signed(128), BuiltinType::I16);
        assert_eq!(BuiltinType::smallest_signed(40000), BuiltinType::I32);
        assert_eq!(BuiltinType::smallest_signed(1 << 40), BuiltinType::I64);
    }
}
