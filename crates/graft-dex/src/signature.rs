//! Type descriptors, prototypes and method signatures.
//!
//! Descriptors follow the dex grammar: `I`, `J`, `Lpkg/Cls;`, `[I`, and
//! prototypes of the form `(<params>)<ret>`.

use std::fmt;

use crate::types::DataType;
use crate::{Result, SignatureError};

/// Descriptor of `java.lang.String`.
pub const STRING_DESCRIPTOR: &str = "Ljava/lang/String;";

/// A parsed type descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(DataType),
    /// Class descriptor including the `L` and `;`.
    Class(String),
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Parse a complete descriptor.
    pub fn parse(s: &str) -> Result<Self> {
        let (ty, rest) = Self::parse_prefix(s)?;
        if !rest.is_empty() {
            return Err(SignatureError::TrailingCharacters(s.to_string()));
        }
        Ok(ty)
    }

    /// Parse one descriptor from the front of `s`, returning the remainder.
    fn parse_prefix(s: &str) -> Result<(Self, &str)> {
        let mut chars = s.chars();
        let Some(first) = chars.next() else {
            return Err(SignatureError::EmptyDescriptor);
        };
        match first {
            'L' => {
                let end = s
                    .find(';')
                    .ok_or_else(|| SignatureError::UnterminatedClass(s.to_string()))?;
                if end < 2 {
                    return Err(SignatureError::InvalidDescriptor(s.to_string()));
                }
                Ok((Self::Class(s[..=end].to_string()), &s[end + 1..]))
            }
            '[' => {
                let (inner, rest) = Self::parse_prefix(&s[1..])?;
                if inner == Self::Primitive(DataType::Void) {
                    return Err(SignatureError::InvalidDescriptor(s.to_string()));
                }
                Ok((Self::Array(Box::new(inner)), rest))
            }
            c => DataType::from_primitive_char(c)
                .map(|ty| (Self::Primitive(ty), &s[1..]))
                .ok_or_else(|| SignatureError::InvalidDescriptor(s.to_string())),
        }
    }

    /// Value type this descriptor occupies in the IR.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Primitive(ty) => *ty,
            Self::Class(_) | Self::Array(_) => DataType::Reference,
        }
    }

    /// Java source form (`java.lang.String`, `int[]`).
    pub fn pretty(&self) -> String {
        match self {
            Self::Primitive(ty) => ty.java_name().to_string(),
            Self::Class(desc) => pretty_descriptor(desc),
            Self::Array(inner) => format!("{}[]", inner.pretty()),
        }
    }

    /// Check if this is the `java.lang.String` class.
    pub fn is_string(&self) -> bool {
        matches!(self, Self::Class(desc) if desc == STRING_DESCRIPTOR)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(ty) => write!(f, "{}", ty.shorty()),
            Self::Class(desc) => f.write_str(desc),
            Self::Array(inner) => write!(f, "[{inner}"),
        }
    }
}

/// Convert a class descriptor `Lfoo/Bar;` into `foo.Bar`.
///
/// Anything that is not a class descriptor is returned unchanged.
pub fn pretty_descriptor(descriptor: &str) -> String {
    descriptor
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
        .map_or_else(|| descriptor.to_string(), |s| s.replace('/', "."))
}

/// Method prototype: parameter types and return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Proto {
    params: Vec<TypeDescriptor>,
    ret: TypeDescriptor,
}

impl Proto {
    /// Parse a prototype descriptor such as `(ILjava/lang/String;)V`.
    pub fn parse(s: &str) -> Result<Self> {
        let mut rest = s
            .strip_prefix('(')
            .ok_or_else(|| SignatureError::MissingOpenParen(s.to_string()))?;

        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                return Err(SignatureError::MissingCloseParen(s.to_string()));
            }
            let (param, after) = TypeDescriptor::parse_prefix(rest)?;
            if param == TypeDescriptor::Primitive(DataType::Void) {
                return Err(SignatureError::InvalidDescriptor(s.to_string()));
            }
            params.push(param);
            rest = after;
        }

        let ret = TypeDescriptor::parse(rest)?;
        Ok(Self { params, ret })
    }

    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.ret
    }

    /// Shorty form: return type followed by parameters (`VIL`).
    pub fn shorty(&self) -> String {
        std::iter::once(&self.ret)
            .chain(&self.params)
            .map(|t| t.data_type().shorty())
            .collect()
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{param}")?;
        }
        write!(f, "){}", self.ret)
    }
}

/// How a method is dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    Static,
    Virtual,
    Interface,
}

impl CallKind {
    pub const fn is_static(self) -> bool {
        matches!(self, Self::Static)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Virtual => "virtual",
            Self::Interface => "interface",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully qualified method reference plus its dispatch kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    class: String,
    name: String,
    proto: Proto,
    kind: CallKind,
}

impl MethodSignature {
    /// Create a signature from its parts.
    pub fn new(class: &str, name: &str, proto: &str, kind: CallKind) -> Result<Self> {
        match TypeDescriptor::parse(class)? {
            TypeDescriptor::Class(_) => {}
            _ => return Err(SignatureError::NotAClass(class.to_string())),
        }
        Ok(Self {
            class: class.to_string(),
            name: name.to_string(),
            proto: Proto::parse(proto)?,
            kind,
        })
    }

    pub fn static_method(class: &str, name: &str, proto: &str) -> Result<Self> {
        Self::new(class, name, proto, CallKind::Static)
    }

    pub fn virtual_method(class: &str, name: &str, proto: &str) -> Result<Self> {
        Self::new(class, name, proto, CallKind::Virtual)
    }

    pub fn interface_method(class: &str, name: &str, proto: &str) -> Result<Self> {
        Self::new(class, name, proto, CallKind::Interface)
    }

    /// Parse a Dalvik-style reference `Lpkg/Cls;->name(I)V`.
    pub fn parse(reference: &str, kind: CallKind) -> Result<Self> {
        let invalid = || SignatureError::InvalidMethodReference(reference.to_string());
        let (class, member) = reference.split_once("->").ok_or_else(invalid)?;
        let paren = member.find('(').ok_or_else(invalid)?;
        if paren == 0 {
            return Err(invalid());
        }
        Self::new(class, &member[..paren], &member[paren..], kind)
    }

    /// Declaring class descriptor.
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn proto(&self) -> &Proto {
        &self.proto
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.kind.is_static()
    }

    /// Human readable name, e.g. `void foo.Bar.baz(int)` or `foo.Bar.baz`.
    pub fn pretty(&self, with_signature: bool) -> String {
        let qualified = format!("{}.{}", pretty_descriptor(&self.class), self.name);
        if !with_signature {
            return qualified;
        }
        let params: Vec<String> = self.proto.params().iter().map(TypeDescriptor::pretty).collect();
        format!(
            "{} {}({})",
            self.proto.return_type().pretty(),
            qualified,
            params.join(", ")
        )
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}{}", self.class, self.name, self.proto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptors() {
        assert_eq!(
            TypeDescriptor::parse("I").unwrap(),
            TypeDescriptor::Primitive(DataType::Int)
        );
        assert!(TypeDescriptor::parse(STRING_DESCRIPTOR).unwrap().is_string());
        let arr = TypeDescriptor::parse("[[J").unwrap();
        assert_eq!(arr.pretty(), "long[][]");
        assert_eq!(arr.data_type(), DataType::Reference);
    }

    #[test]
    fn test_bad_descriptors() {
        assert_eq!(TypeDescriptor::parse(""), Err(SignatureError::EmptyDescriptor));
        assert!(matches!(
            TypeDescriptor::parse("Ljava/lang/String"),
            Err(SignatureError::UnterminatedClass(_))
        ));
        assert!(matches!(
            TypeDescriptor::parse("Q"),
            Err(SignatureError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            TypeDescriptor::parse("II"),
            Err(SignatureError::TrailingCharacters(_))
        ));
    }

    #[test]
    fn test_proto() {
        let proto = Proto::parse("(ILjava/lang/String;[B)V").unwrap();
        assert_eq!(proto.params().len(), 3);
        assert_eq!(proto.shorty(), "VILL");
        assert_eq!(proto.to_string(), "(ILjava/lang/String;[B)V");

        assert!(matches!(
            Proto::parse("I)V"),
            Err(SignatureError::MissingOpenParen(_))
        ));
        assert!(matches!(
            Proto::parse("(I"),
            Err(SignatureError::MissingCloseParen(_))
        ));
        assert!(Proto::parse("(V)V").is_err());
    }

    #[test]
    fn test_method_signature_pretty() {
        let sig =
            MethodSignature::virtual_method("Lcom/app/Main;", "onCreate", "(Landroid/os/Bundle;)V")
                .unwrap();
        assert_eq!(sig.pretty(false), "com.app.Main.onCreate");
        assert_eq!(
            sig.pretty(true),
            "void com.app.Main.onCreate(android.os.Bundle)"
        );
        assert_eq!(
            sig.to_string(),
            "Lcom/app/Main;->onCreate(Landroid/os/Bundle;)V"
        );
    }

    #[test]
    fn test_method_signature_parse() {
        let sig = MethodSignature::parse("LLog;->trace()V", CallKind::Static).unwrap();
        assert_eq!(sig.class(), "LLog;");
        assert_eq!(sig.name(), "trace");
        assert!(sig.is_static());

        assert!(MethodSignature::parse("LLog;trace()V", CallKind::Static).is_err());
        assert!(MethodSignature::parse("LLog;->()V", CallKind::Static).is_err());
        assert!(matches!(
            MethodSignature::parse("I->trace()V", CallKind::Static),
            Err(SignatureError::NotAClass(_))
        ));
    }
}
