use std::collections::HashSet;
use anyhow::{anyhow, Context, Result};
use java_string::JavaStr;
use log::trace;
use crate::class_constants::opcode;
use crate::error::{bail_capacity, bail_consistency, bail_format, capacity_error};
use crate::instruction_list::labels::LabelOffsets;
use crate::pool::ConstantPool;
use crate::tree::attribute::{Attribute, AttributeValue, CodeAttribute, ExceptionTableEntry, LineNumber, LocalVariable};
use crate::tree::frame::StackMapFrame;
use crate::tree::method::code::{Code, Instruction, Label, Loadable, LvIndex};
use crate::ClassWrite;

fn compute_signed_offset(opcode_pos: u16, target: u16) -> i32 {
	(target as i32) - (opcode_pos as i32)
}

fn align_to_4_byte_boundary(w: &mut Vec<u8>) -> Result<()> {
	match w.len() & 0b11 {
		0 => Ok(()),
		1 => w.write_u8_slice(&[0, 0, 0]),
		2 => w.write_u8_slice(&[0, 0]),
		_ => w.write_u8_slice(&[0]),
	}
}

fn put_i16_at(w: &mut [u8], pos: usize, value: i16) {
	w[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
}

fn put_i32_at(w: &mut [u8], pos: usize, value: i32) {
	w[pos..pos + 4].copy_from_slice(&value.to_be_bytes());
}

/// A branch whose target wasn't placed yet, so that the branch offset must be written in later.
struct UnwrittenLabel {
	/// The bytecode offset the branch offset is relative to.
	opcode_pos: u16,
	/// The index of the instruction in the instruction list, stable over all attempts.
	instruction_index: usize,
	label: Label,
	/// Where the branch offset goes.
	label_write_pos: usize,
	/// If `true`, space for an [`i32`] is reserved, otherwise for an [`i16`].
	wide: bool,
}

/// One attempt of writing the bytecode.
struct Attempt<'a> {
	w: Vec<u8>,
	/// The indices of the instructions whose branch didn't fit into an [`i16`] in an earlier attempt.
	wide: &'a HashSet<usize>,
	unwritten: Vec<UnwrittenLabel>,
}

impl Attempt<'_> {
	/// Writes a conditional branch.
	///
	/// There's no wide form of these, so a far branch becomes the opposite condition jumping over a `goto_w` to the
	/// target.
	fn if_helper(&mut self, labels: &LabelOffsets, opcode_pos: u16, instruction_index: usize, label: Label, opcode: u8, opposite_opcode: u8) -> Result<()> {
		if let Some(target) = labels.get(&label) {
			if let Ok(branch) = i16::try_from(compute_signed_offset(opcode_pos, target)) {
				self.w.write_u8(opcode)?;
				self.w.write_i16(branch)?;
			} else {
				self.w.write_u8(opposite_opcode)?;
				// skip this instruction and the goto_w
				self.w.write_i16(1 + 2 + 1 + 4)?;
				self.w.write_u8(opcode::GOTO_W)?;
				self.w.write_i32(compute_signed_offset(opcode_pos.saturating_add(1 + 2), target))?;
			}
		} else if self.wide.contains(&instruction_index) {
			self.unwritten.push(UnwrittenLabel {
				// relative to the goto_w
				opcode_pos: opcode_pos.saturating_add(1 + 2),
				instruction_index,
				label,
				label_write_pos: opcode_pos as usize + 1 + 2 + 1,
				wide: true,
			});
			self.w.write_u8(opposite_opcode)?;
			self.w.write_i16(1 + 2 + 1 + 4)?;
			self.w.write_u8(opcode::GOTO_W)?;
			self.w.write_i32(i32::MAX)?;
		} else {
			self.unwritten.push(UnwrittenLabel {
				opcode_pos,
				instruction_index,
				label,
				label_write_pos: opcode_pos as usize + 1,
				wide: false,
			});
			self.w.write_u8(opcode)?;
			self.w.write_i16(i16::MAX)?;
		}
		Ok(())
	}

	/// Writes `goto` or `jsr`, switching to `goto_w` or `jsr_w` for far branches.
	fn goto_helper(&mut self, labels: &LabelOffsets, opcode_pos: u16, instruction_index: usize, label: Label, opcode: u8, wide_opcode: u8) -> Result<()> {
		if let Some(target) = labels.get(&label) {
			let branch = compute_signed_offset(opcode_pos, target);
			if let Ok(branch) = i16::try_from(branch) {
				self.w.write_u8(opcode)?;
				self.w.write_i16(branch)?;
			} else {
				self.w.write_u8(wide_opcode)?;
				self.w.write_i32(branch)?;
			}
		} else {
			let wide = self.wide.contains(&instruction_index);
			self.unwritten.push(UnwrittenLabel {
				opcode_pos,
				instruction_index,
				label,
				label_write_pos: opcode_pos as usize + 1,
				wide,
			});
			if wide {
				self.w.write_u8(wide_opcode)?;
				self.w.write_i32(i32::MAX)?;
			} else {
				self.w.write_u8(opcode)?;
				self.w.write_i16(i16::MAX)?;
			}
		}
		Ok(())
	}

	/// Writes a switch target, always as an [`i32`], at the current end of the bytecode.
	fn switch_helper(&mut self, labels: &LabelOffsets, opcode_pos: u16, instruction_index: usize, label: Label) -> Result<()> {
		let branch = if let Some(target) = labels.get(&label) {
			compute_signed_offset(opcode_pos, target)
		} else {
			self.unwritten.push(UnwrittenLabel {
				opcode_pos,
				instruction_index,
				label,
				label_write_pos: self.w.len(),
				wide: true,
			});
			i32::MAX
		};
		self.w.write_i32(branch)
	}

	/// Writes one of the instructions taking a local variable index, choosing the shortest encoding.
	///
	/// `short_opcode` is the opcode for index `0`, if there are such opcodes.
	fn local_variable(&mut self, opcode: u8, short_opcode: Option<u8>, index: LvIndex) -> Result<()> {
		match (short_opcode, u8::try_from(index.index)) {
			(Some(short_opcode), Ok(index @ 0..=3)) => self.w.write_u8(short_opcode + index),
			(_, Ok(index)) => {
				self.w.write_u8(opcode)?;
				self.w.write_u8(index)
			},
			(_, Err(_)) => {
				self.w.write_u8(opcode::WIDE)?;
				self.w.write_u8(opcode)?;
				self.w.write_u16(index.index)
			},
		}
	}

	fn load(&mut self, opcode: u8, index: LvIndex) -> Result<()> {
		self.local_variable(opcode, Some(((opcode - opcode::ILOAD) << 2) + opcode::ILOAD_0), index)
	}

	fn store(&mut self, opcode: u8, index: LvIndex) -> Result<()> {
		self.local_variable(opcode, Some(((opcode - opcode::ISTORE) << 2) + opcode::ISTORE_0), index)
	}

	fn write_instruction(&mut self, labels: &LabelOffsets, opcode_pos: u16, instruction_index: usize, instruction: &Instruction, operand: u16) -> Result<()> {
		let w = &mut self.w;
		match instruction {
			Instruction::Nop => w.write_u8(opcode::NOP)?,
			Instruction::AConstNull => w.write_u8(opcode::ACONST_NULL)?,
			Instruction::IConstM1 => w.write_u8(opcode::ICONST_M1)?,
			Instruction::IConst0 => w.write_u8(opcode::ICONST_0)?,
			Instruction::IConst1 => w.write_u8(opcode::ICONST_1)?,
			Instruction::IConst2 => w.write_u8(opcode::ICONST_2)?,
			Instruction::IConst3 => w.write_u8(opcode::ICONST_3)?,
			Instruction::IConst4 => w.write_u8(opcode::ICONST_4)?,
			Instruction::IConst5 => w.write_u8(opcode::ICONST_5)?,
			Instruction::LConst0 => w.write_u8(opcode::LCONST_0)?,
			Instruction::LConst1 => w.write_u8(opcode::LCONST_1)?,
			Instruction::FConst0 => w.write_u8(opcode::FCONST_0)?,
			Instruction::FConst1 => w.write_u8(opcode::FCONST_1)?,
			Instruction::FConst2 => w.write_u8(opcode::FCONST_2)?,
			Instruction::DConst0 => w.write_u8(opcode::DCONST_0)?,
			Instruction::DConst1 => w.write_u8(opcode::DCONST_1)?,
			&Instruction::BiPush(byte) => {
				w.write_u8(opcode::BIPUSH)?;
				w.write_i8(byte)?;
			},
			&Instruction::SiPush(short) => {
				w.write_u8(opcode::SIPUSH)?;
				w.write_i16(short)?;
			},
			Instruction::Ldc(loadable) => {
				if needs_ldc2_w(loadable) {
					w.write_u8(opcode::LDC2_W)?;
					w.write_u16(operand)?;
				} else if let Ok(operand) = u8::try_from(operand) {
					w.write_u8(opcode::LDC)?;
					w.write_u8(operand)?;
				} else {
					w.write_u8(opcode::LDC_W)?;
					w.write_u16(operand)?;
				}
			},
			&Instruction::ILoad(index) => self.load(opcode::ILOAD, index)?,
			&Instruction::LLoad(index) => self.load(opcode::LLOAD, index)?,
			&Instruction::FLoad(index) => self.load(opcode::FLOAD, index)?,
			&Instruction::DLoad(index) => self.load(opcode::DLOAD, index)?,
			&Instruction::ALoad(index) => self.load(opcode::ALOAD, index)?,
			Instruction::IALoad => w.write_u8(opcode::IALOAD)?,
			Instruction::LALoad => w.write_u8(opcode::LALOAD)?,
			Instruction::FALoad => w.write_u8(opcode::FALOAD)?,
			Instruction::DALoad => w.write_u8(opcode::DALOAD)?,
			Instruction::AALoad => w.write_u8(opcode::AALOAD)?,
			Instruction::BALoad => w.write_u8(opcode::BALOAD)?,
			Instruction::CALoad => w.write_u8(opcode::CALOAD)?,
			Instruction::SALoad => w.write_u8(opcode::SALOAD)?,
			&Instruction::IStore(index) => self.store(opcode::ISTORE, index)?,
			&Instruction::LStore(index) => self.store(opcode::LSTORE, index)?,
			&Instruction::FStore(index) => self.store(opcode::FSTORE, index)?,
			&Instruction::DStore(index) => self.store(opcode::DSTORE, index)?,
			&Instruction::AStore(index) => self.store(opcode::ASTORE, index)?,
			Instruction::IAStore => w.write_u8(opcode::IASTORE)?,
			Instruction::LAStore => w.write_u8(opcode::LASTORE)?,
			Instruction::FAStore => w.write_u8(opcode::FASTORE)?,
			Instruction::DAStore => w.write_u8(opcode::DASTORE)?,
			Instruction::AAStore => w.write_u8(opcode::AASTORE)?,
			Instruction::BAStore => w.write_u8(opcode::BASTORE)?,
			Instruction::CAStore => w.write_u8(opcode::CASTORE)?,
			Instruction::SAStore => w.write_u8(opcode::SASTORE)?,
			Instruction::Pop => w.write_u8(opcode::POP)?,
			Instruction::Pop2 => w.write_u8(opcode::POP2)?,
			Instruction::Dup => w.write_u8(opcode::DUP)?,
			Instruction::DupX1 => w.write_u8(opcode::DUP_X1)?,
			Instruction::DupX2 => w.write_u8(opcode::DUP_X2)?,
			Instruction::Dup2 => w.write_u8(opcode::DUP2)?,
			Instruction::Dup2X1 => w.write_u8(opcode::DUP2_X1)?,
			Instruction::Dup2X2 => w.write_u8(opcode::DUP2_X2)?,
			Instruction::Swap => w.write_u8(opcode::SWAP)?,
			Instruction::IAdd => w.write_u8(opcode::IADD)?,
			Instruction::LAdd => w.write_u8(opcode::LADD)?,
			Instruction::FAdd => w.write_u8(opcode::FADD)?,
			Instruction::DAdd => w.write_u8(opcode::DADD)?,
			Instruction::ISub => w.write_u8(opcode::ISUB)?,
			Instruction::LSub => w.write_u8(opcode::LSUB)?,
			Instruction::FSub => w.write_u8(opcode::FSUB)?,
			Instruction::DSub => w.write_u8(opcode::DSUB)?,
			Instruction::IMul => w.write_u8(opcode::IMUL)?,
			Instruction::LMul => w.write_u8(opcode::LMUL)?,
			Instruction::FMul => w.write_u8(opcode::FMUL)?,
			Instruction::DMul => w.write_u8(opcode::DMUL)?,
			Instruction::IDiv => w.write_u8(opcode::IDIV)?,
			Instruction::LDiv => w.write_u8(opcode::LDIV)?,
			Instruction::FDiv => w.write_u8(opcode::FDIV)?,
			Instruction::DDiv => w.write_u8(opcode::DDIV)?,
			Instruction::IRem => w.write_u8(opcode::IREM)?,
			Instruction::LRem => w.write_u8(opcode::LREM)?,
			Instruction::FRem => w.write_u8(opcode::FREM)?,
			Instruction::DRem => w.write_u8(opcode::DREM)?,
			Instruction::INeg => w.write_u8(opcode::INEG)?,
			Instruction::LNeg => w.write_u8(opcode::LNEG)?,
			Instruction::FNeg => w.write_u8(opcode::FNEG)?,
			Instruction::DNeg => w.write_u8(opcode::DNEG)?,
			Instruction::IShl => w.write_u8(opcode::ISHL)?,
			Instruction::LShl => w.write_u8(opcode::LSHL)?,
			Instruction::IShr => w.write_u8(opcode::ISHR)?,
			Instruction::LShr => w.write_u8(opcode::LSHR)?,
			Instruction::IUShr => w.write_u8(opcode::IUSHR)?,
			Instruction::LUShr => w.write_u8(opcode::LUSHR)?,
			Instruction::IAnd => w.write_u8(opcode::IAND)?,
			Instruction::LAnd => w.write_u8(opcode::LAND)?,
			Instruction::IOr => w.write_u8(opcode::IOR)?,
			Instruction::LOr => w.write_u8(opcode::LOR)?,
			Instruction::IXor => w.write_u8(opcode::IXOR)?,
			Instruction::LXor => w.write_u8(opcode::LXOR)?,
			&Instruction::IInc(index, value) => {
				match (u8::try_from(index.index), i8::try_from(value)) {
					(Ok(index), Ok(value)) => {
						w.write_u8(opcode::IINC)?;
						w.write_u8(index)?;
						w.write_i8(value)?;
					},
					_ => {
						w.write_u8(opcode::WIDE)?;
						w.write_u8(opcode::IINC)?;
						w.write_u16(index.index)?;
						w.write_i16(value)?;
					},
				}
			},
			Instruction::I2L => w.write_u8(opcode::I2L)?,
			Instruction::I2F => w.write_u8(opcode::I2F)?,
			Instruction::I2D => w.write_u8(opcode::I2D)?,
			Instruction::L2I => w.write_u8(opcode::L2I)?,
			Instruction::L2F => w.write_u8(opcode::L2F)?,
			Instruction::L2D => w.write_u8(opcode::L2D)?,
			Instruction::F2I => w.write_u8(opcode::F2I)?,
			Instruction::F2L => w.write_u8(opcode::F2L)?,
			Instruction::F2D => w.write_u8(opcode::F2D)?,
			Instruction::D2I => w.write_u8(opcode::D2I)?,
			Instruction::D2L => w.write_u8(opcode::D2L)?,
			Instruction::D2F => w.write_u8(opcode::D2F)?,
			Instruction::I2B => w.write_u8(opcode::I2B)?,
			Instruction::I2C => w.write_u8(opcode::I2C)?,
			Instruction::I2S => w.write_u8(opcode::I2S)?,
			Instruction::LCmp => w.write_u8(opcode::LCMP)?,
			Instruction::FCmpL => w.write_u8(opcode::FCMPL)?,
			Instruction::FCmpG => w.write_u8(opcode::FCMPG)?,
			Instruction::DCmpL => w.write_u8(opcode::DCMPL)?,
			Instruction::DCmpG => w.write_u8(opcode::DCMPG)?,
			&Instruction::IfEq(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IFEQ, opcode::IFNE)?,
			&Instruction::IfNe(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IFNE, opcode::IFEQ)?,
			&Instruction::IfLt(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IFLT, opcode::IFGE)?,
			&Instruction::IfGe(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IFGE, opcode::IFLT)?,
			&Instruction::IfGt(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IFGT, opcode::IFLE)?,
			&Instruction::IfLe(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IFLE, opcode::IFGT)?,
			&Instruction::IfICmpEq(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IF_ICMPEQ, opcode::IF_ICMPNE)?,
			&Instruction::IfICmpNe(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IF_ICMPNE, opcode::IF_ICMPEQ)?,
			&Instruction::IfICmpLt(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IF_ICMPLT, opcode::IF_ICMPGE)?,
			&Instruction::IfICmpGe(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IF_ICMPGE, opcode::IF_ICMPLT)?,
			&Instruction::IfICmpGt(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IF_ICMPGT, opcode::IF_ICMPLE)?,
			&Instruction::IfICmpLe(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IF_ICMPLE, opcode::IF_ICMPGT)?,
			&Instruction::IfACmpEq(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IF_ACMPEQ, opcode::IF_ACMPNE)?,
			&Instruction::IfACmpNe(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IF_ACMPNE, opcode::IF_ACMPEQ)?,
			&Instruction::Goto(label) => self.goto_helper(labels, opcode_pos, instruction_index, label, opcode::GOTO, opcode::GOTO_W)?,
			&Instruction::Jsr(label) => self.goto_helper(labels, opcode_pos, instruction_index, label, opcode::JSR, opcode::JSR_W)?,
			&Instruction::Ret(index) => self.local_variable(opcode::RET, None, index)?,
			Instruction::TableSwitch { default, low, high, table } => {
				w.write_u8(opcode::TABLESWITCH)?;
				align_to_4_byte_boundary(w)?;
				self.switch_helper(labels, opcode_pos, instruction_index, *default)?;
				self.w.write_i32(*low)?;
				self.w.write_i32(*high)?;
				for &label in table {
					self.switch_helper(labels, opcode_pos, instruction_index, label)?;
				}
			},
			Instruction::LookupSwitch { default, pairs } => {
				w.write_u8(opcode::LOOKUPSWITCH)?;
				align_to_4_byte_boundary(w)?;
				self.switch_helper(labels, opcode_pos, instruction_index, *default)?;
				self.w.write_usize_as_u32(pairs.len())?;
				for &(key, label) in pairs {
					self.w.write_i32(key)?;
					self.switch_helper(labels, opcode_pos, instruction_index, label)?;
				}
			},
			Instruction::IReturn => w.write_u8(opcode::IRETURN)?,
			Instruction::LReturn => w.write_u8(opcode::LRETURN)?,
			Instruction::FReturn => w.write_u8(opcode::FRETURN)?,
			Instruction::DReturn => w.write_u8(opcode::DRETURN)?,
			Instruction::AReturn => w.write_u8(opcode::ARETURN)?,
			Instruction::Return => w.write_u8(opcode::RETURN)?,
			Instruction::GetStatic(_) => write_with_operand(w, opcode::GETSTATIC, operand)?,
			Instruction::PutStatic(_) => write_with_operand(w, opcode::PUTSTATIC, operand)?,
			Instruction::GetField(_) => write_with_operand(w, opcode::GETFIELD, operand)?,
			Instruction::PutField(_) => write_with_operand(w, opcode::PUTFIELD, operand)?,
			Instruction::InvokeVirtual(_) => write_with_operand(w, opcode::INVOKEVIRTUAL, operand)?,
			Instruction::InvokeSpecial(..) => write_with_operand(w, opcode::INVOKESPECIAL, operand)?,
			Instruction::InvokeStatic(..) => write_with_operand(w, opcode::INVOKESTATIC, operand)?,
			Instruction::InvokeInterface(method) => {
				write_with_operand(w, opcode::INVOKEINTERFACE, operand)?;
				w.write_u8(invoke_interface_count(&method.descriptor)?)?;
				w.write_u8(0)?;
			},
			Instruction::InvokeDynamic(_) => {
				write_with_operand(w, opcode::INVOKEDYNAMIC, operand)?;
				w.write_u16(0)?;
			},
			Instruction::New(_) => write_with_operand(w, opcode::NEW, operand)?,
			Instruction::NewArray(array_type) => {
				w.write_u8(opcode::NEWARRAY)?;
				w.write_u8(array_type.to_atype())?;
			},
			Instruction::ANewArray(_) => write_with_operand(w, opcode::ANEWARRAY, operand)?,
			Instruction::ArrayLength => w.write_u8(opcode::ARRAYLENGTH)?,
			Instruction::AThrow => w.write_u8(opcode::ATHROW)?,
			Instruction::CheckCast(_) => write_with_operand(w, opcode::CHECKCAST, operand)?,
			Instruction::InstanceOf(_) => write_with_operand(w, opcode::INSTANCEOF, operand)?,
			Instruction::MonitorEnter => w.write_u8(opcode::MONITORENTER)?,
			Instruction::MonitorExit => w.write_u8(opcode::MONITOREXIT)?,
			&Instruction::MultiANewArray(_, dimensions) => {
				write_with_operand(w, opcode::MULTIANEWARRAY, operand)?;
				w.write_u8(dimensions)?;
			},
			&Instruction::IfNull(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IFNULL, opcode::IFNONNULL)?,
			&Instruction::IfNonNull(label) => self.if_helper(labels, opcode_pos, instruction_index, label, opcode::IFNONNULL, opcode::IFNULL)?,
		}
		Ok(())
	}

	/// Writes the branch offsets that weren't known while writing.
	///
	/// Returns the index of an instruction whose branch offset doesn't fit, if there's one.
	fn resolve(&mut self, labels: &LabelOffsets) -> Result<Option<usize>> {
		for unwritten in &self.unwritten {
			let target = labels.try_get(&unwritten.label)?;
			if target as usize >= self.w.len() {
				bail_consistency!("instruction {} branches to label {:?} after the last instruction", unwritten.instruction_index, unwritten.label);
			}
			let branch = compute_signed_offset(unwritten.opcode_pos, target);

			if unwritten.wide {
				put_i32_at(&mut self.w, unwritten.label_write_pos, branch);
			} else if let Ok(branch) = i16::try_from(branch) {
				put_i16_at(&mut self.w, unwritten.label_write_pos, branch);
			} else {
				trace!("branch offset {branch} of instruction {} doesn't fit into an i16, writing it wide", unwritten.instruction_index);
				return Ok(Some(unwritten.instruction_index));
			}
		}
		Ok(None)
	}
}

fn write_with_operand(w: &mut Vec<u8>, opcode: u8, operand: u16) -> Result<()> {
	w.write_u8(opcode)?;
	w.write_u16(operand)
}

fn needs_ldc2_w(loadable: &Loadable) -> bool {
	match loadable {
		Loadable::Long(_) | Loadable::Double(_) => true,
		Loadable::Dynamic(dynamic) => matches!(dynamic.descriptor.as_bytes().first(), Some(b'J' | b'D')),
		_ => false,
	}
}

/// Computes the `count` operand of `invokeinterface`: the size of all arguments, plus one for the receiver.
fn invoke_interface_count(descriptor: &JavaStr) -> Result<u8> {
	let Some(arguments) = descriptor.as_bytes().strip_prefix(b"(") else {
		bail_format!("malformed method descriptor {descriptor:?}");
	};
	let mut iter = arguments.iter();
	let mut slots: usize = 1;
	loop {
		let mut byte = iter.next();
		let mut array = false;
		while byte == Some(&b'[') {
			array = true;
			byte = iter.next();
		}
		slots += match byte {
			Some(b')') if !array => break,
			Some(b'J' | b'D') if !array => 2,
			Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => 1,
			Some(b'L') => {
				if !iter.any(|&b| b == b';') {
					bail_format!("malformed method descriptor {descriptor:?}");
				}
				1
			},
			_ => bail_format!("malformed method descriptor {descriptor:?}"),
		};
	}
	u8::try_from(slots)
		.map_err(|_| capacity_error!("arguments of {descriptor:?} take {slots} slots, at most 255 are allowed for `invokeinterface`"))
}

/// Puts the constant pool entry the instruction references, and checks the switches.
///
/// Returns the constant pool index, or `0` if the instruction doesn't reference the constant pool.
fn put_operand(instruction: &Instruction, pool: &mut ConstantPool) -> Result<u16> {
	Ok(match instruction {
		Instruction::Ldc(loadable) => pool.put_loadable(loadable)?,
		Instruction::GetStatic(field) | Instruction::PutStatic(field) |
		Instruction::GetField(field) | Instruction::PutField(field) => pool.put_field_ref(field)?,
		Instruction::InvokeVirtual(method) => pool.put_method_ref(method)?,
		Instruction::InvokeSpecial(method, is_interface) |
		Instruction::InvokeStatic(method, is_interface) => pool.put_method_ref_or_interface_method_ref(method, *is_interface)?,
		Instruction::InvokeInterface(method) => {
			invoke_interface_count(&method.descriptor)?;
			pool.put_interface_method_ref(method)?
		},
		Instruction::InvokeDynamic(dynamic) => pool.put_invoke_dynamic(dynamic)?,
		Instruction::New(class) | Instruction::ANewArray(class) |
		Instruction::CheckCast(class) | Instruction::InstanceOf(class) |
		Instruction::MultiANewArray(class, _) => pool.put_class(class)?,
		Instruction::TableSwitch { low, high, table, .. } => {
			let expected = *high as i64 - *low as i64 + 1;
			if expected < 0 || table.len() as i64 != expected {
				bail_format!("`tableswitch` from {low} to {high} must have {expected} targets, got {}", table.len());
			}
			0
		},
		Instruction::LookupSwitch { pairs, .. } => {
			if let Some(pair) = pairs.windows(2).find(|pair| pair[0].0 >= pair[1].0) {
				bail_format!("`lookupswitch` keys must be strictly ascending, got {} before {}", pair[0].0, pair[1].0);
			}
			0
		},
		_ => 0,
	})
}

/// Turns a list of instructions back into the raw bytecode of a `Code` attribute, putting all referenced constants
/// into the constant pool.
///
/// Branches are written in their short form where the branch offset fits, and in their wide form otherwise. Local
/// variable instructions use the shortest form of their index.
///
/// The `LineNumberTable`, `LocalVariableTable`, `LocalVariableTypeTable` and `StackMapTable` attributes are created
/// from [`Code::line_numbers`], [`Code::local_variables`] and the frames of the instructions. They come before the
/// attributes from [`Code::attributes`].
pub fn encode(code: &Code, pool: &mut ConstantPool) -> Result<CodeAttribute> {
	let operands = code.instructions.iter()
		.enumerate()
		.map(|(index, entry)| put_operand(&entry.instruction, pool)
			.with_context(|| anyhow!("for instruction {index}: {:?}", entry.instruction)))
		.collect::<Result<Vec<_>>>()?;

	// Indices of instructions, not bytecode offsets, since these are stable over all attempts.
	let mut wide: HashSet<usize> = HashSet::new();
	let mut labels = LabelOffsets::new();

	let (bytecode, frame_offsets) = loop {
		labels.next_attempt();

		let mut attempt = Attempt { w: Vec::new(), wide: &wide, unwritten: Vec::new() };
		let mut frame_offsets = Vec::new();

		for (instruction_index, (entry, &operand)) in code.instructions.iter().zip(&operands).enumerate() {
			let opcode_pos = u16::try_from(attempt.w.len())
				.map_err(|_| capacity_error!("bytecode exceeds {} bytes", CodeAttribute::MAX_CODE_LENGTH))?;

			if let Some(label) = entry.label {
				labels.place(label, opcode_pos)?;
			}
			if entry.frame.is_some() {
				frame_offsets.push(opcode_pos);
			}

			attempt.write_instruction(&labels, opcode_pos, instruction_index, &entry.instruction, operand)
				.with_context(|| anyhow!("while writing instruction {instruction_index}: {:?}", entry.instruction))?;
		}

		if let Some(last_label) = code.last_label {
			let end = u16::try_from(attempt.w.len())
				.map_err(|_| capacity_error!("bytecode exceeds {} bytes", CodeAttribute::MAX_CODE_LENGTH))?;
			labels.place(last_label, end)?;
		}

		let widen = attempt.resolve(&labels)?;
		let Attempt { w, .. } = attempt;
		match widen {
			Some(instruction_index) => {
				wide.insert(instruction_index);
			},
			None => break (w, frame_offsets),
		}
	};

	if bytecode.is_empty() {
		bail_format!("cannot write code without any instructions");
	}
	if bytecode.len() > CodeAttribute::MAX_CODE_LENGTH {
		bail_capacity!("bytecode of {} bytes is too long, at most {} bytes are allowed", bytecode.len(), CodeAttribute::MAX_CODE_LENGTH);
	}

	let exception_table = code.exception_table.iter()
		.map(|exception| -> Result<ExceptionTableEntry> { Ok(ExceptionTableEntry {
			start_pc: labels.try_get(&exception.start)?,
			end_pc: labels.try_get(&exception.end)?,
			handler_pc: labels.try_get(&exception.handler)?,
			catch_type: exception.catch.clone(),
		}) })
		.collect::<Result<Vec<_>>>()
		.context("while writing the exception table")?;

	let mut attributes = Vec::new();

	if let Some(line_numbers) = &code.line_numbers {
		let line_numbers = line_numbers.iter()
			.map(|(label, line_number)| -> Result<LineNumber> { Ok(LineNumber { start_pc: labels.try_get(label)?, line_number: *line_number }) })
			.collect::<Result<Vec<_>>>()
			.context("while writing the line numbers")?;
		attributes.extend(Attribute::from_value(AttributeValue::LineNumberTable(line_numbers)));
	}

	if let Some(local_variables) = &code.local_variables {
		let mut descriptors = Vec::new();
		let mut signatures = Vec::new();
		for lv in local_variables {
			if lv.descriptor.is_none() && lv.signature.is_none() {
				bail_consistency!("local variable {:?} at index {} has neither a descriptor nor a signature", lv.name, lv.index.index);
			}
			let (start_pc, length) = labels.try_get_range(&lv.range)
				.with_context(|| anyhow!("for local variable {:?}", lv.name))?;
			let row = |descriptor: &JavaStr| LocalVariable {
				start_pc,
				length,
				name: lv.name.clone(),
				descriptor: descriptor.to_owned(),
				index: lv.index.index,
			};
			descriptors.extend(lv.descriptor.as_deref().map(&row));
			signatures.extend(lv.signature.as_deref().map(&row));
		}
		if !descriptors.is_empty() || signatures.is_empty() {
			attributes.extend(Attribute::from_value(AttributeValue::LocalVariableTable(descriptors)));
		}
		if !signatures.is_empty() {
			attributes.extend(Attribute::from_value(AttributeValue::LocalVariableTypeTable(signatures)));
		}
	}

	let frames = code.instructions.iter()
		.filter_map(|entry| entry.frame.as_ref())
		.zip(frame_offsets)
		.scan(None, |previous: &mut Option<u16>, (frame, offset)| {
			let offset_delta = match *previous {
				None => offset,
				Some(previous) => offset - previous - 1,
			};
			*previous = Some(offset);
			Some(frame.clone().try_map(|label| labels.try_get(&label))
				.map(|data| StackMapFrame { offset_delta, data }))
		})
		.collect::<Result<Vec<_>>>()
		.context("while writing the stack map frames")?;
	if !frames.is_empty() {
		attributes.extend(Attribute::from_value(AttributeValue::StackMapTable(frames)));
	}

	attributes.extend(code.attributes.iter().cloned());

	Ok(CodeAttribute {
		max_stack: code.max_stack,
		max_locals: code.max_locals,
		code: bytecode,
		exception_table,
		attributes,
	})
}
