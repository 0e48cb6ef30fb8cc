use anyhow::Result;
use java_string::JavaString;
use crate::class_constants::atype;
use crate::error::bail_format;
use crate::pool::entry::{DynamicRef, MemberRef, MethodHandle};
use crate::tree::attribute::Attribute;
use crate::tree::class::ClassName;
use crate::tree::frame::FrameData;

/// A stack map frame attached to an instruction.
pub type Frame = FrameData<Label>;

#[derive(Debug, Clone, PartialEq)]
pub struct InstructionListEntry {
	pub label: Option<Label>,
	pub frame: Option<Frame>,
	pub instruction: Instruction,
}

impl InstructionListEntry {
	pub fn new(instruction: Instruction) -> InstructionListEntry {
		InstructionListEntry { label: None, frame: None, instruction }
	}

	pub fn labeled(label: Label, instruction: Instruction) -> InstructionListEntry {
		InstructionListEntry { label: Some(label), frame: None, instruction }
	}
}

/// Represents the code of a method.
///
/// The `StackMapTable`, `LineNumberTable`, `LocalVariableTable` and `LocalVariableTypeTable` attributes are represented
/// by the frames of the instructions, [`Code::line_numbers`] and [`Code::local_variables`]. All other attributes of the
/// code stay in [`Code::attributes`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Code {
	pub max_stack: u16,
	pub max_locals: u16,

	pub instructions: Vec<InstructionListEntry>,
	pub exception_table: Vec<Exception>,
	/// The label for the offset right after the last instruction.
	pub last_label: Option<Label>,

	pub line_numbers: Option<Vec<(Label, u16)>>,
	pub local_variables: Option<Vec<Lv>>,

	pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
	pub start: Label,
	pub end: Label,
	pub handler: Label,
	pub catch: Option<ClassName>,
}

/// Represents an index of a local variable.
///
/// If the local variable is of type `double` or `long`, it also occupies
/// the [`LvIndex`] with `index = index + 1`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LvIndex {
	pub index: u16,
}

/// A row of the `LocalVariableTable` or of the `LocalVariableTypeTable`.
///
/// Rows of the first have a [`Lv::descriptor`], rows of the second a [`Lv::signature`].
#[derive(Debug, Clone, PartialEq)]
pub struct Lv {
	pub range: LabelRange,
	pub name: JavaString,
	pub descriptor: Option<JavaString>,
	pub signature: Option<JavaString>,
	pub index: LvIndex,
}

/// Represents a bytecode offset of an opcode using a method-local id.
///
/// For example, take this piece of bytecode:
/// ```txt,ignore
/// 0x19 0x03 0xb1
/// ```
/// Javap would output this as (`0x19` is `aload`, and `0xb1` is `return`):
/// ```txt,ignore
/// 0: aload 3
/// 2: return
/// ```
/// Here only `0` and `2` are valid bytecode offsets, `1` would be the offset of the operand of the `aload` instruction.
/// Therefore, there can only be labels for these two offsets.
///
/// Note that the length of the bytecode is also a "valid" bytecode offset, see [`Code::last_label`].
///
/// The id does **not** correspond to the bytecode offset in any direct way. When reading, labels are numbered in the
/// order they're discovered. When writing, any ids can be used as long as each label is placed only once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
	id: u32,
}

impl Label {
	pub const fn new(id: u32) -> Label {
		Label { id }
	}

	pub fn id(&self) -> u32 {
		self.id
	}
}

/// Represents a range of bytecode offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRange {
	/// The start label, inclusive.
	pub start: Label,
	/// The end label, exclusive.
	pub end: Label,
}

/// Represents an instruction of the JVM.
///
/// Each instruction can either:
/// - hold no additional data, like [`Instruction::Nop`],
/// - hold some immediate value, like [`Instruction::BiPush`],
/// - hold a [local variable index][LvIndex], like [`Instruction::ILoad`] (note that this also represents the `iload_0` instruction for example),
/// - hold a [`Label`] for jumps, like [`Instruction::IfEq`] (this also represents `goto_w` and `jsr_w` for the unconditional jumps),
/// - or hold other data the instruction needs.
///
/// Which of the encodings of an instruction is used is decided when writing.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
	Nop,
	AConstNull,
	IConstM1, IConst0, IConst1, IConst2, IConst3, IConst4, IConst5,
	LConst0, LConst1,
	FConst0, FConst1, FConst2,
	DConst0, DConst1,
	BiPush(i8),
	SiPush(i16),
	Ldc(Loadable),
	ILoad(LvIndex), LLoad(LvIndex), FLoad(LvIndex), DLoad(LvIndex), ALoad(LvIndex),
	IALoad, LALoad, FALoad, DALoad, AALoad, BALoad, CALoad, SALoad,
	IStore(LvIndex), LStore(LvIndex), FStore(LvIndex), DStore(LvIndex), AStore(LvIndex),
	IAStore, LAStore, FAStore, DAStore, AAStore, BAStore, CAStore, SAStore,
	Pop, Pop2,
	Dup, DupX1, DupX2,
	Dup2, Dup2X1, Dup2X2,
	Swap,
	IAdd, LAdd, FAdd, DAdd,
	ISub, LSub, FSub, DSub,
	IMul, LMul, FMul, DMul,
	IDiv, LDiv, FDiv, DDiv,
	IRem, LRem, FRem, DRem,
	INeg, LNeg, FNeg, DNeg,
	IShl, LShl,
	IShr, LShr,
	IUShr, LUShr,
	IAnd, LAnd,
	IOr, LOr,
	IXor, LXor,
	IInc(LvIndex, i16),
	I2L, I2F, I2D,
	L2I, L2F, L2D,
	F2I, F2L, F2D,
	D2I, D2L, D2F,
	I2B, I2C, I2S,
	LCmp,
	FCmpL, FCmpG,
	DCmpL, DCmpG,
	IfEq(Label), IfNe(Label), IfLt(Label), IfGe(Label), IfGt(Label), IfLe(Label),
	IfICmpEq(Label), IfICmpNe(Label), IfICmpLt(Label), IfICmpGe(Label), IfICmpGt(Label), IfICmpLe(Label),
	IfACmpEq(Label), IfACmpNe(Label),
	Goto(Label),
	Jsr(Label),
	Ret(LvIndex),
	TableSwitch {
		default: Label,
		low: i32,
		high: i32,
		/// Must hold exactly `high - low + 1` labels.
		table: Vec<Label>,
	},
	LookupSwitch {
		default: Label,
		/// Note that these must be ordered by key.
		pairs: Vec<(i32, Label)>
	},
	IReturn, LReturn, FReturn, DReturn, AReturn,
	Return,
	GetStatic(MemberRef),
	PutStatic(MemberRef),
	GetField(MemberRef),
	PutField(MemberRef),
	InvokeVirtual(MemberRef),
	/// The bool is `true` iff it's on an interface, so if it referenced an `InterfaceMethodRef` constant pool entry.
	InvokeSpecial(MemberRef, bool),
	/// The bool is `true` iff it's on an interface, so if it referenced an `InterfaceMethodRef` constant pool entry.
	InvokeStatic(MemberRef, bool),
	/// Always references an `InterfaceMethodRef` constant pool entry.
	InvokeInterface(MemberRef),
	InvokeDynamic(DynamicRef),
	New(ClassName),
	NewArray(ArrayType),
	ANewArray(ClassName),
	ArrayLength,
	AThrow,
	CheckCast(ClassName),
	InstanceOf(ClassName),
	MonitorEnter, MonitorExit,
	MultiANewArray(ClassName, u8),
	IfNull(Label), IfNonNull(Label),
}

/// A constant that can be loaded with `ldc` or passed to a bootstrap method.
///
/// Floating point constants are equal if their bits are, like the constant pool entries they are stored in.
#[derive(Debug, Clone)]
pub enum Loadable {
	Integer(i32),
	Float(f32),
	Long(i64),
	Double(f64),
	Class(ClassName),
	String(JavaString),
	MethodHandle(MethodHandle),
	/// A method descriptor.
	MethodType(JavaString),
	Dynamic(DynamicRef),
}

impl PartialEq for Loadable {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Loadable::Integer(a), Loadable::Integer(b)) => a == b,
			(Loadable::Float(a), Loadable::Float(b)) => a.to_bits() == b.to_bits(),
			(Loadable::Long(a), Loadable::Long(b)) => a == b,
			(Loadable::Double(a), Loadable::Double(b)) => a.to_bits() == b.to_bits(),
			(Loadable::Class(a), Loadable::Class(b)) => a == b,
			(Loadable::String(a), Loadable::String(b)) => a == b,
			(Loadable::MethodHandle(a), Loadable::MethodHandle(b)) => a == b,
			(Loadable::MethodType(a), Loadable::MethodType(b)) => a == b,
			(Loadable::Dynamic(a), Loadable::Dynamic(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for Loadable {}

impl Loadable {
	/// `true` for the constants that take two constant pool slots and must be loaded with `ldc2_w`.
	pub fn is_wide(&self) -> bool {
		matches!(self, Loadable::Long(_) | Loadable::Double(_))
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArrayType {
	Boolean,
	Char,
	Float,
	Double,
	Byte,
	Short,
	Int,
	Long,
}

impl ArrayType {
	pub(crate) fn from_atype(atype: u8) -> Result<ArrayType> {
		match atype {
			atype::T_BOOLEAN => Ok(ArrayType::Boolean),
			atype::T_CHAR    => Ok(ArrayType::Char),
			atype::T_FLOAT   => Ok(ArrayType::Float),
			atype::T_DOUBLE  => Ok(ArrayType::Double),
			atype::T_BYTE    => Ok(ArrayType::Byte),
			atype::T_SHORT   => Ok(ArrayType::Short),
			atype::T_INT     => Ok(ArrayType::Int),
			atype::T_LONG    => Ok(ArrayType::Long),
			_ => bail_format!("unknown array type {atype:#x}"),
		}
	}

	pub(crate) fn to_atype(self) -> u8 {
		match self {
			ArrayType::Boolean => atype::T_BOOLEAN,
			ArrayType::Char    => atype::T_CHAR,
			ArrayType::Float   => atype::T_FLOAT,
			ArrayType::Double  => atype::T_DOUBLE,
			ArrayType::Byte    => atype::T_BYTE,
			ArrayType::Short   => atype::T_SHORT,
			ArrayType::Int     => atype::T_INT,
			ArrayType::Long    => atype::T_LONG,
		}
	}
}
