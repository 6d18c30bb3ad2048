//! SPIR-V dialect: opcode table, operand schemas, binary layout sections,
//! and the (de)serializer.

mod read;
mod write;

pub use read::{deserialize, DeserializeError};
pub use write::serialize;

macro_rules! spv_ops {
    ($($name:ident = $value:expr),* $(,)?) => {
        /// SPIR-V opcodes understood by this IR. Real opcode numbers from the
        /// SPIR-V specification.
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        #[repr(u32)]
        pub enum Op {
            $($name = $value,)*
        }

        impl Op {
            pub fn from_u32(value: u32) -> Option<Op> {
                match value {
                    $($value => Some(Op::$name),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Op::$name => stringify!($name),)*
                }
            }
        }
    };
}

spv_ops! {
    Nop = 0,
    Undef = 1,
    SourceContinued = 2,
    Source = 3,
    SourceExtension = 4,
    Name = 5,
    MemberName = 6,
    String = 7,
    Line = 8,
    Extension = 10,
    ExtInstImport = 11,
    ExtInst = 12,
    MemoryModel = 14,
    EntryPoint = 15,
    ExecutionMode = 16,
    Capability = 17,
    TypeVoid = 19,
    TypeBool = 20,
    TypeInt = 21,
    TypeFloat = 22,
    TypeVector = 23,
    TypeMatrix = 24,
    TypeImage = 25,
    TypeSampler = 26,
    TypeSampledImage = 27,
    TypeArray = 28,
    TypeRuntimeArray = 29,
    TypeStruct = 30,
    TypePointer = 32,
    TypeFunction = 33,
    ConstantTrue = 41,
    ConstantFalse = 42,
    Constant = 43,
    ConstantComposite = 44,
    ConstantNull = 46,
    Function = 54,
    FunctionParameter = 55,
    FunctionEnd = 56,
    FunctionCall = 57,
    Variable = 59,
    Load = 61,
    Store = 62,
    AccessChain = 65,
    Decorate = 71,
    MemberDecorate = 72,
    VectorShuffle = 79,
    CompositeConstruct = 80,
    CompositeExtract = 81,
    CompositeInsert = 82,
    CopyObject = 83,
    ConvertFToU = 109,
    ConvertFToS = 110,
    ConvertSToF = 111,
    ConvertUToF = 112,
    UConvert = 113,
    SConvert = 114,
    FConvert = 115,
    Bitcast = 124,
    SNegate = 126,
    FNegate = 127,
    IAdd = 128,
    FAdd = 129,
    ISub = 130,
    FSub = 131,
    IMul = 132,
    FMul = 133,
    UDiv = 134,
    SDiv = 135,
    FDiv = 136,
    UMod = 137,
    SRem = 138,
    SMod = 139,
    FRem = 140,
    FMod = 141,
    IsNan = 156,
    IsInf = 157,
    LogicalEqual = 164,
    LogicalNotEqual = 165,
    LogicalOr = 166,
    LogicalAnd = 167,
    LogicalNot = 168,
    Select = 169,
    IEqual = 170,
    INotEqual = 171,
    UGreaterThan = 172,
    SGreaterThan = 173,
    UGreaterThanEqual = 174,
    SGreaterThanEqual = 175,
    ULessThan = 176,
    SLessThan = 177,
    ULessThanEqual = 178,
    SLessThanEqual = 179,
    FOrdEqual = 180,
    FUnordEqual = 181,
    FOrdNotEqual = 182,
    FUnordNotEqual = 183,
    FOrdLessThan = 184,
    FUnordLessThan = 185,
    FOrdGreaterThan = 186,
    FUnordGreaterThan = 187,
    FOrdLessThanEqual = 188,
    FUnordLessThanEqual = 189,
    FOrdGreaterThanEqual = 190,
    FUnordGreaterThanEqual = 191,
    ShiftRightLogical = 194,
    ShiftRightArithmetic = 195,
    ShiftLeftLogical = 196,
    BitwiseOr = 197,
    BitwiseXor = 198,
    BitwiseAnd = 199,
    Not = 200,
    BitFieldInsert = 201,
    BitFieldSExtract = 202,
    BitFieldUExtract = 203,
    BitReverse = 204,
    BitCount = 205,
    ControlBarrier = 224,
    MemoryBarrier = 225,
    Phi = 245,
    LoopMerge = 246,
    SelectionMerge = 247,
    Label = 248,
    Branch = 249,
    BranchConditional = 250,
    Switch = 251,
    Kill = 252,
    Return = 253,
    ReturnValue = 254,
    Unreachable = 255,
}

/// SPIR-V storage classes (the subset the recompiler emits).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(i32)]
pub enum StorageClass {
    UniformConstant = 0,
    Input = 1,
    Uniform = 2,
    Output = 3,
    Workgroup = 4,
    Private = 6,
    Function = 7,
    PushConstant = 9,
    StorageBuffer = 12,
}

impl StorageClass {
    pub fn from_i32(value: i32) -> Option<StorageClass> {
        Some(match value {
            0 => StorageClass::UniformConstant,
            1 => StorageClass::Input,
            2 => StorageClass::Uniform,
            3 => StorageClass::Output,
            4 => StorageClass::Workgroup,
            6 => StorageClass::Private,
            7 => StorageClass::Function,
            9 => StorageClass::PushConstant,
            12 => StorageClass::StorageBuffer,
            _ => return None,
        })
    }
}

/// Execution models for `OpEntryPoint`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(i32)]
pub enum ExecutionModel {
    Vertex = 0,
    Fragment = 4,
    GlCompute = 5,
}

pub const EXECUTION_MODE_ORIGIN_UPPER_LEFT: i32 = 7;
pub const EXECUTION_MODE_LOCAL_SIZE: i32 = 17;
pub const ADDRESSING_MODEL_LOGICAL: i32 = 0;
pub const MEMORY_MODEL_GLSL450: i32 = 1;
pub const CAPABILITY_SHADER: i32 = 1;
pub const CAPABILITY_INT64: i32 = 11;
pub const CAPABILITY_FLOAT64: i32 = 10;
pub const FUNCTION_CONTROL_NONE: i32 = 0;
pub const SELECTION_CONTROL_NONE: i32 = 0;
pub const LOOP_CONTROL_NONE: i32 = 0;

pub const MAGIC: u32 = 0x0723_0203;
pub const VERSION: u32 = 0x0001_0400;

impl Op {
    /// Type-declaring opcodes serialize their result id first; everything
    /// else leads with its result type.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Op::TypeVoid
                | Op::TypeBool
                | Op::TypeInt
                | Op::TypeFloat
                | Op::TypeVector
                | Op::TypeMatrix
                | Op::TypeImage
                | Op::TypeSampler
                | Op::TypeSampledImage
                | Op::TypeArray
                | Op::TypeRuntimeArray
                | Op::TypeStruct
                | Op::TypePointer
                | Op::TypeFunction
        )
    }

    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Op::Branch
                | Op::BranchConditional
                | Op::Switch
                | Op::Kill
                | Op::Return
                | Op::ReturnValue
                | Op::Unreachable
        )
    }

    pub fn is_branch(self) -> bool {
        matches!(self, Op::Branch | Op::BranchConditional | Op::Switch)
    }
}

/// Where an instruction lives in the mandated module section order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(usize)]
pub enum Section {
    Capabilities = 0,
    Extensions,
    ExtInstImports,
    MemoryModel,
    EntryPoints,
    ExecutionModes,
    Debugs,
    Annotations,
    Globals,
    Functions,
}

impl Section {
    pub const COUNT: usize = 10;

    pub const ALL: [Section; Section::COUNT] = [
        Section::Capabilities,
        Section::Extensions,
        Section::ExtInstImports,
        Section::MemoryModel,
        Section::EntryPoints,
        Section::ExecutionModes,
        Section::Debugs,
        Section::Annotations,
        Section::Globals,
        Section::Functions,
    ];

    /// The section an opcode belongs to when deserializing a module.
    pub fn of(op: Op) -> Section {
        match op {
            Op::Capability => Section::Capabilities,
            Op::Extension => Section::Extensions,
            Op::ExtInstImport => Section::ExtInstImports,
            Op::MemoryModel => Section::MemoryModel,
            Op::EntryPoint => Section::EntryPoints,
            Op::ExecutionMode => Section::ExecutionModes,
            Op::Source
            | Op::SourceContinued
            | Op::SourceExtension
            | Op::String
            | Op::Name
            | Op::MemberName
            | Op::Line => Section::Debugs,
            Op::Decorate | Op::MemberDecorate => Section::Annotations,
            op if op.is_type() => Section::Globals,
            Op::Constant
            | Op::ConstantTrue
            | Op::ConstantFalse
            | Op::ConstantComposite
            | Op::ConstantNull => Section::Globals,
            _ => Section::Functions,
        }
    }
}

/// Operand encoding patterns for the deserializer. `Rest` patterns absorb the
/// remaining words of the instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pat {
    /// One id reference.
    Id,
    /// One literal word.
    Lit,
    /// Zero-terminated string padded to a word boundary.
    Str,
    /// Context-dependent constant literal; width comes from the result type.
    ConstLit,
    /// Remaining words are id references.
    IdRest,
    /// Remaining words are literal words.
    LitRest,
    /// Remaining words are a string followed by id references (`OpEntryPoint`).
    StrThenIdRest,
    /// Remaining words are `(literal, id)` pairs (`OpSwitch`).
    PairLitIdRest,
}

pub struct Schema {
    pub has_result_type: bool,
    pub has_result: bool,
    pub operands: &'static [Pat],
}

const fn schema(has_result_type: bool, has_result: bool, operands: &'static [Pat]) -> Schema {
    Schema {
        has_result_type,
        has_result,
        operands,
    }
}

/// Word-level operand schema of `op`.
pub fn operand_schema(op: Op) -> Schema {
    use Pat::*;
    match op {
        Op::Nop | Op::FunctionEnd | Op::Kill | Op::Return | Op::Unreachable => {
            schema(false, false, &[])
        }
        Op::Undef => schema(true, true, &[]),
        Op::Source => schema(false, false, &[LitRest]),
        Op::SourceContinued | Op::SourceExtension | Op::Extension => schema(false, false, &[Str]),
        Op::Name => schema(false, false, &[Id, Str]),
        Op::MemberName => schema(false, false, &[Id, Lit, Str]),
        Op::String => schema(false, true, &[Str]),
        Op::Line => schema(false, false, &[Id, Lit, Lit]),
        Op::ExtInstImport => schema(false, true, &[Str]),
        Op::ExtInst => schema(true, true, &[Id, Lit, IdRest]),
        Op::MemoryModel => schema(false, false, &[Lit, Lit]),
        Op::EntryPoint => schema(false, false, &[Lit, Id, StrThenIdRest]),
        Op::ExecutionMode => schema(false, false, &[Id, Lit, LitRest]),
        Op::Capability => schema(false, false, &[Lit]),
        Op::TypeVoid | Op::TypeBool | Op::TypeSampler => schema(false, true, &[]),
        Op::TypeInt => schema(false, true, &[Lit, Lit]),
        Op::TypeFloat => schema(false, true, &[Lit]),
        Op::TypeVector | Op::TypeMatrix => schema(false, true, &[Id, Lit]),
        Op::TypeImage => schema(false, true, &[Id, Lit, Lit, Lit, Lit, Lit, Lit, LitRest]),
        Op::TypeSampledImage | Op::TypeRuntimeArray => schema(false, true, &[Id]),
        Op::TypeArray => schema(false, true, &[Id, Id]),
        Op::TypeStruct => schema(false, true, &[IdRest]),
        Op::TypePointer => schema(false, true, &[Lit, Id]),
        Op::TypeFunction => schema(false, true, &[Id, IdRest]),
        Op::ConstantTrue | Op::ConstantFalse | Op::ConstantNull => schema(true, true, &[]),
        Op::Constant => schema(true, true, &[ConstLit]),
        Op::ConstantComposite => schema(true, true, &[IdRest]),
        Op::Function => schema(true, true, &[Lit, Id]),
        Op::FunctionParameter => schema(true, true, &[]),
        Op::FunctionCall => schema(true, true, &[Id, IdRest]),
        Op::Variable => schema(true, true, &[Lit, IdRest]),
        Op::Load => schema(true, true, &[Id, LitRest]),
        Op::Store => schema(false, false, &[Id, Id, LitRest]),
        Op::AccessChain => schema(true, true, &[Id, IdRest]),
        Op::Decorate => schema(false, false, &[Id, Lit, LitRest]),
        Op::MemberDecorate => schema(false, false, &[Id, Lit, Lit, LitRest]),
        Op::VectorShuffle => schema(true, true, &[Id, Id, LitRest]),
        Op::CompositeConstruct => schema(true, true, &[IdRest]),
        Op::CompositeExtract => schema(true, true, &[Id, LitRest]),
        Op::CompositeInsert => schema(true, true, &[Id, Id, LitRest]),
        Op::CopyObject => schema(true, true, &[Id]),
        Op::ConvertFToU
        | Op::ConvertFToS
        | Op::ConvertSToF
        | Op::ConvertUToF
        | Op::UConvert
        | Op::SConvert
        | Op::FConvert
        | Op::Bitcast
        | Op::SNegate
        | Op::FNegate
        | Op::LogicalNot
        | Op::Not
        | Op::IsNan
        | Op::IsInf
        | Op::BitReverse
        | Op::BitCount => schema(true, true, &[Id]),
        Op::IAdd
        | Op::FAdd
        | Op::ISub
        | Op::FSub
        | Op::IMul
        | Op::FMul
        | Op::UDiv
        | Op::SDiv
        | Op::FDiv
        | Op::UMod
        | Op::SRem
        | Op::SMod
        | Op::FRem
        | Op::FMod
        | Op::LogicalEqual
        | Op::LogicalNotEqual
        | Op::LogicalOr
        | Op::LogicalAnd
        | Op::IEqual
        | Op::INotEqual
        | Op::UGreaterThan
        | Op::SGreaterThan
        | Op::UGreaterThanEqual
        | Op::SGreaterThanEqual
        | Op::ULessThan
        | Op::SLessThan
        | Op::ULessThanEqual
        | Op::SLessThanEqual
        | Op::FOrdEqual
        | Op::FUnordEqual
        | Op::FOrdNotEqual
        | Op::FUnordNotEqual
        | Op::FOrdLessThan
        | Op::FUnordLessThan
        | Op::FOrdGreaterThan
        | Op::FUnordGreaterThan
        | Op::FOrdLessThanEqual
        | Op::FUnordLessThanEqual
        | Op::FOrdGreaterThanEqual
        | Op::FUnordGreaterThanEqual
        | Op::ShiftRightLogical
        | Op::ShiftRightArithmetic
        | Op::ShiftLeftLogical
        | Op::BitwiseOr
        | Op::BitwiseXor
        | Op::BitwiseAnd => schema(true, true, &[Id, Id]),
        Op::Select | Op::BitFieldSExtract | Op::BitFieldUExtract => {
            schema(true, true, &[Id, Id, Id])
        }
        Op::BitFieldInsert => schema(true, true, &[Id, Id, Id, Id]),
        Op::ControlBarrier => schema(false, false, &[Id, Id, Id]),
        Op::MemoryBarrier => schema(false, false, &[Id, Id]),
        Op::Phi => schema(true, true, &[IdRest]),
        Op::LoopMerge => schema(false, false, &[Id, Id, Lit, LitRest]),
        Op::SelectionMerge => schema(false, false, &[Id, Lit]),
        Op::Label => schema(false, true, &[]),
        Op::Branch => schema(false, false, &[Id]),
        Op::BranchConditional => schema(false, false, &[Id, Id, Id, LitRest]),
        Op::Switch => schema(false, false, &[Id, Id, PairLitIdRest]),
        Op::ReturnValue => schema(false, false, &[Id]),
    }
}
