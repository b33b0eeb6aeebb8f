//! Index and value types shared by the reference tables and the IR.

use std::fmt;

/// Index into a dex file's type table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdx(pub u32);

/// Index into a dex file's method table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodIdx(pub u32);

impl fmt::Display for TypeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type@{}", self.0)
    }
}

impl fmt::Display for MethodIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method@{}", self.0)
    }
}

/// Value type of an IR node or a prototype slot.
///
/// Class and array types all collapse into `Reference`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Void,
    Bool,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl DataType {
    /// Shorty character used in dex prototypes.
    pub const fn shorty(self) -> char {
        match self {
            Self::Void => 'V',
            Self::Bool => 'Z',
            Self::Byte => 'B',
            Self::Short => 'S',
            Self::Char => 'C',
            Self::Int => 'I',
            Self::Long => 'J',
            Self::Float => 'F',
            Self::Double => 'D',
            Self::Reference => 'L',
        }
    }

    /// Primitive type for a descriptor character (`L` and `[` are not handled here).
    pub const fn from_primitive_char(c: char) -> Option<Self> {
        match c {
            'V' => Some(Self::Void),
            'Z' => Some(Self::Bool),
            'B' => Some(Self::Byte),
            'S' => Some(Self::Short),
            'C' => Some(Self::Char),
            'I' => Some(Self::Int),
            'J' => Some(Self::Long),
            'F' => Some(Self::Float),
            'D' => Some(Self::Double),
            _ => None,
        }
    }

    /// Java source name of the type.
    pub const fn java_name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Reference => "java.lang.Object",
        }
    }

    /// Types represented as 32-bit integers in the IR.
    pub const fn is_int_like(self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Byte | Self::Short | Self::Char | Self::Int
        )
    }

    /// Check whether a value of this type may be passed where `target` is expected.
    pub const fn is_assignable_to(self, target: Self) -> bool {
        if self.is_int_like() && target.is_int_like() {
            return true;
        }
        self as u8 == target as u8
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.java_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorty_roundtrip_for_primitives() {
        for c in ['V', 'Z', 'B', 'S', 'C', 'I', 'J', 'F', 'D'] {
            let ty = DataType::from_primitive_char(c).unwrap();
            assert_eq!(ty.shorty(), c);
        }
        assert!(DataType::from_primitive_char('L').is_none());
    }

    #[test]
    fn test_int_like_assignability() {
        assert!(DataType::Bool.is_assignable_to(DataType::Int));
        assert!(DataType::Char.is_assignable_to(DataType::Short));
        assert!(!DataType::Long.is_assignable_to(DataType::Int));
        assert!(!DataType::Reference.is_assignable_to(DataType::Int));
        assert!(DataType::Reference.is_assignable_to(DataType::Reference));
    }
}
