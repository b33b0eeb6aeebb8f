use std::fmt;

use graft_dex::DataType;
use graft_ir::{Constant, InstrId};

/// Argument of an injected call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Parameter {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
    /// An existing value of the graph, passed as is.
    Value(InstrId),
    /// The i-th declared parameter of the instrumented method (receiver excluded).
    Argument(usize),
    /// The receiver of the instrumented method.
    This,
    /// The value returned by the anchoring `Return`.
    ReturnValue,
}

impl Parameter {
    /// Immediate value of a constant parameter.
    pub const fn constant(self) -> Option<Constant> {
        Some(match self {
            Self::Boolean(v) => Constant::Bool(v),
            Self::Byte(v) => Constant::Byte(v),
            Self::Short(v) => Constant::Short(v),
            Self::Char(v) => Constant::Char(v),
            Self::Integer(v) => Constant::Int(v),
            Self::Long(v) => Constant::Long(v),
            Self::Float(v) => Constant::Float(v),
            Self::Double(v) => Constant::Double(v),
            Self::Null => Constant::Null,
            Self::Value(_) | Self::Argument(_) | Self::This | Self::ReturnValue => return None,
        })
    }

    /// Type of the parameter when it is known without looking at the graph.
    pub const fn static_type(self) -> Option<DataType> {
        match self {
            Self::This => Some(DataType::Reference),
            other => match other.constant() {
                Some(c) => Some(c.data_type()),
                None => None,
            },
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(id) => write!(f, "value {id}"),
            Self::Argument(i) => write!(f, "argument #{i}"),
            Self::This => f.write_str("this"),
            Self::ReturnValue => f.write_str("return value"),
            other => match other.constant() {
                Some(c) => write!(f, "{c}"),
                None => Ok(()),
            },
        }
    }
}
