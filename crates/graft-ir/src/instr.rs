//! Instruction IR.

use std::fmt;

use graft_dex::{DataType, MethodIdx, TypeIdx};

use crate::block::BlockId;

/// Identifier of an instruction (arena index).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(pub u32);

impl InstrId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Immediate value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constant {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
}

/// Hashable identity of a constant (type plus raw bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstantKey {
    ty: DataType,
    bits: u64,
}

impl Constant {
    pub const fn data_type(self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Byte(_) => DataType::Byte,
            Self::Short(_) => DataType::Short,
            Self::Char(_) => DataType::Char,
            Self::Int(_) => DataType::Int,
            Self::Long(_) => DataType::Long,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::Null => DataType::Reference,
        }
    }

    /// Key used to deduplicate constants within a graph.
    #[allow(clippy::cast_sign_loss)]
    pub fn key(self) -> ConstantKey {
        let bits = match self {
            Self::Bool(v) => u64::from(v),
            Self::Byte(v) => v as u64,
            Self::Short(v) => v as u64,
            Self::Char(v) => u64::from(v),
            Self::Int(v) => v as u64,
            Self::Long(v) => v as u64,
            Self::Float(v) => u64::from(v.to_bits()),
            Self::Double(v) => v.to_bits(),
            Self::Null => 0,
        };
        ConstantKey {
            ty: self.data_type(),
            bits,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}b"),
            Self::Short(v) => write!(f, "{v}s"),
            Self::Char(v) => write!(f, "'\\u{v:04x}'"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Double(v) => write!(f, "{v}d"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Dispatch kind of an invoke node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    StaticOrDirect,
    Virtual,
    Interface,
}

/// Call site payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invoke {
    pub kind: InvokeKind,
    /// Declaring class of the callee.
    pub type_idx: TypeIdx,
    /// Callee method.
    pub method_idx: MethodIdx,
    /// Pretty callee name (`void foo.Bar.baz(int)`), used for call-site matching.
    pub callee: String,
}

/// Binary arithmetic and comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Compare,
}

/// Instruction kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum InstrKind {
    /// Incoming argument. The receiver of an instance method has index 0.
    ParameterValue {
        index: u16,
        /// Explicit receiver flag, when the host knows it.
        is_this: Option<bool>,
        can_be_null: bool,
    },
    /// The `ArtMethod*` of the method being compiled.
    CurrentMethod,
    Constant(Constant),
    Invoke(Invoke),
    Binary(BinaryOp),
    If,
    Goto,
    Return,
    ReturnVoid,
    SuspendCheck,
    Other(String),
}

impl InstrKind {
    /// Block-ending instructions.
    pub const fn is_terminator(&self) -> bool {
        matches!(self, Self::Goto | Self::If | Self::Return | Self::ReturnVoid)
    }

    pub const fn is_return(&self) -> bool {
        matches!(self, Self::Return | Self::ReturnVoid)
    }

    pub const fn as_invoke(&self) -> Option<&Invoke> {
        match self {
            Self::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }

    /// Short node name for dumps and diagnostics.
    pub fn name(&self) -> &str {
        match self {
            Self::ParameterValue { .. } => "ParameterValue",
            Self::CurrentMethod => "CurrentMethod",
            Self::Constant(_) => "Constant",
            Self::Invoke(invoke) => match invoke.kind {
                InvokeKind::StaticOrDirect => "InvokeStaticOrDirect",
                InvokeKind::Virtual => "InvokeVirtual",
                InvokeKind::Interface => "InvokeInterface",
            },
            Self::Binary(_) => "Binary",
            Self::If => "If",
            Self::Goto => "Goto",
            Self::Return => "Return",
            Self::ReturnVoid => "ReturnVoid",
            Self::SuspendCheck => "SuspendCheck",
            Self::Other(name) => name,
        }
    }
}

/// Snapshot of the virtual register state at an instruction.
///
/// Read by deoptimization and debuggers, so every instruction that can
/// throw or call carries one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    pub dex_pc: u32,
    pub vregs: Vec<Option<InstrId>>,
}

impl Environment {
    pub const fn new(dex_pc: u32, vregs: Vec<Option<InstrId>>) -> Self {
        Self { dex_pc, vregs }
    }

    /// Live values referenced by the snapshot, with their vreg slot.
    pub fn values(&self) -> impl Iterator<Item = (usize, InstrId)> + '_ {
        self.vregs
            .iter()
            .enumerate()
            .filter_map(|(slot, v)| v.map(|v| (slot, v)))
    }
}

/// A use of a value: the user and the input (or vreg) slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Use {
    pub user: InstrId,
    pub index: usize,
}

/// An instruction placed in a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub kind: InstrKind,
    pub ty: DataType,
    pub block: BlockId,
    pub inputs: Vec<InstrId>,
    pub environment: Option<Environment>,
    pub dex_pc: u32,
    /// Instructions using this value as an input.
    pub uses: Vec<Use>,
    /// Environments referencing this value.
    pub env_uses: Vec<Use>,
}

/// An instruction that is about to be inserted into a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct NewInstr {
    pub kind: InstrKind,
    pub ty: DataType,
    pub inputs: Vec<InstrId>,
    pub environment: Option<Environment>,
    pub dex_pc: u32,
}

impl NewInstr {
    pub const fn new(kind: InstrKind, ty: DataType) -> Self {
        Self {
            kind,
            ty,
            inputs: Vec::new(),
            environment: None,
            dex_pc: 0,
        }
    }

    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<InstrId>) -> Self {
        self.inputs = inputs;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Option<Environment>) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub const fn with_dex_pc(mut self, dex_pc: u32) -> Self {
        self.dex_pc = dex_pc;
        self
    }
}
