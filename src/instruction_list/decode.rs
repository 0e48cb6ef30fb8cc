use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;
use anyhow::{anyhow, Context, Result};
use crate::class_constants::opcode;
use crate::error::{bail_format, format_error};
use crate::instruction_list::labels::OffsetLabels;
use crate::pool::ConstantPool;
use crate::tree::attribute::{AttributeValue, CodeAttribute};
use crate::tree::frame::StackMapFrame;
use crate::tree::method::code::{ArrayType, Code, Exception, Frame, Instruction, InstructionListEntry, Label, Lv, LvIndex};
use crate::ClassRead;

trait CodeReadHelper: ClassRead {
	fn read_u8_as_local_variable(&mut self) -> Result<LvIndex> {
		Ok(LvIndex { index: self.read_u8()? as u16 })
	}
	fn read_u16_as_local_variable(&mut self) -> Result<LvIndex> {
		Ok(LvIndex { index: self.read_u16()? })
	}

	fn read_i16_as_branch_target(&mut self, opcode_pos: u16) -> Result<u16> {
		let branch = self.read_i16()?;
		opcode_pos.checked_add_signed(branch)
			.ok_or_else(|| format_error!("branch offset {branch} from bytecode offset {opcode_pos} goes out of bounds"))
	}

	fn read_i32_as_branch_target(&mut self, opcode_pos: u16) -> Result<u16> {
		let branch = self.read_i32()?;
		(opcode_pos as u32).checked_add_signed(branch)
			.and_then(|target| u16::try_from(target).ok())
			.ok_or_else(|| format_error!("branch offset {branch} from bytecode offset {opcode_pos} goes out of bounds"))
	}

	/// Skips the padding after a `tableswitch` or `lookupswitch` opcode, so that the next read is 4-byte aligned.
	fn align_to_4_byte_boundary(&mut self) -> Result<()> {
		let padding = (4 - self.marker()? % 4) % 4;
		for _ in 0..padding {
			self.read_u8()?;
		}
		Ok(())
	}
}

impl<T: ClassRead> CodeReadHelper for T {}

/// Iterates over the bytecode, calling `f` with a reader positioned at each opcode.
///
/// Errors from `f` get the bytecode offset attached.
fn for_each_opcode(bytecode: &[u8], mut f: impl FnMut(&mut Cursor<&[u8]>, u16) -> Result<()>) -> Result<()> {
	let mut r = Cursor::new(bytecode);
	while (r.position() as usize) < bytecode.len() {
		// the bytecode length was checked to fit into an u16
		let opcode_pos = r.position() as u16;
		f(&mut r, opcode_pos)
			.with_context(|| anyhow!("at bytecode offset {opcode_pos}"))?;
	}
	Ok(())
}

/// Creates the labels of all branch and switch targets, and returns the offsets at which instructions start.
fn discover_labels(bytecode: &[u8], labels: &mut OffsetLabels) -> Result<HashSet<u16>> {
	let mut starts = HashSet::new();
	for_each_opcode(bytecode, |r, opcode_pos| {
		starts.insert(opcode_pos);
		match r.read_u8()? {
			opcode::NOP..=opcode::DCONST_1 |
			opcode::ILOAD_0..=opcode::SALOAD |
			opcode::ISTORE_0..=opcode::LXOR |
			opcode::I2L..=opcode::DCMPG |
			opcode::IRETURN..=opcode::RETURN |
			opcode::ARRAYLENGTH |
			opcode::ATHROW |
			opcode::MONITORENTER |
			opcode::MONITOREXIT => {},
			opcode::BIPUSH |
			opcode::LDC |
			opcode::ILOAD..=opcode::ALOAD |
			opcode::ISTORE..=opcode::ASTORE |
			opcode::RET |
			opcode::NEWARRAY => {
				r.read_n::<1>()?;
			},
			opcode::SIPUSH |
			opcode::LDC_W |
			opcode::LDC2_W |
			opcode::IINC |
			opcode::GETSTATIC..=opcode::INVOKESTATIC |
			opcode::NEW |
			opcode::ANEWARRAY |
			opcode::CHECKCAST |
			opcode::INSTANCEOF => {
				r.read_n::<2>()?;
			},
			opcode::MULTIANEWARRAY => {
				r.read_n::<3>()?;
			},
			opcode::INVOKEINTERFACE |
			opcode::INVOKEDYNAMIC => {
				r.read_n::<4>()?;
			},
			opcode::WIDE => match r.read_u8()? {
				opcode::ILOAD..=opcode::ALOAD |
				opcode::ISTORE..=opcode::ASTORE |
				opcode::RET => {
					r.read_n::<2>()?;
				},
				opcode::IINC => {
					r.read_n::<4>()?;
				},
				wide_opcode => bail_format!("unknown wide opcode {wide_opcode:#x}"),
			},
			opcode::IFEQ..=opcode::JSR |
			opcode::IFNULL |
			opcode::IFNONNULL => {
				labels.get_or_create(r.read_i16_as_branch_target(opcode_pos)?)?;
			},
			opcode::GOTO_W |
			opcode::JSR_W => {
				labels.get_or_create(r.read_i32_as_branch_target(opcode_pos)?)?;
			},
			opcode::TABLESWITCH => {
				r.align_to_4_byte_boundary()?;
				labels.get_or_create(r.read_i32_as_branch_target(opcode_pos)?)?;
				let low = r.read_i32()?;
				let high = r.read_i32()?;
				if low > high {
					bail_format!("in tableswitch `low` must be lower or equal to `high`, it's low={low} and high={high}");
				}
				for _ in low..=high {
					labels.get_or_create(r.read_i32_as_branch_target(opcode_pos)?)?;
				}
			},
			opcode::LOOKUPSWITCH => {
				r.align_to_4_byte_boundary()?;
				labels.get_or_create(r.read_i32_as_branch_target(opcode_pos)?)?;
				let npairs = r.read_i32()?;
				if npairs < 0 {
					bail_format!("in lookupswitch `npairs` must not be negative, it's {npairs}");
				}
				for _ in 0..npairs {
					let _key = r.read_i32()?;
					labels.get_or_create(r.read_i32_as_branch_target(opcode_pos)?)?;
				}
			},
			opcode => bail_format!("unknown opcode {opcode:#x}"),
		}
		Ok(())
	})?;
	Ok(starts)
}

/// The nested attributes of the code that are turned into labels.
#[derive(Default)]
struct Tables {
	frames: Option<Vec<StackMapFrame>>,
	line_numbers: Option<Vec<(Label, u16)>>,
	local_variables: Option<Vec<Lv>>,
}

/// Turns the raw bytecode of a `Code` attribute into a list of instructions.
///
/// Every bytecode offset referenced by a branch, the exception table, a stack map frame, or one of the debug tables
/// becomes a [`Label`] on the instruction starting there. Referencing an offset where no instruction starts is an error.
pub fn decode(code: &CodeAttribute, pool: &ConstantPool) -> Result<Code> {
	let bytecode = &code.code[..];
	let code_length = match u16::try_from(bytecode.len()) {
		Ok(0) | Err(_) => bail_format!("`code_length` must be greater than zero and less than 65536, got {}", bytecode.len()),
		Ok(code_length) => code_length,
	};

	let mut labels = OffsetLabels::new(code_length);
	let starts = discover_labels(bytecode, &mut labels)?;

	let exception_table = code.exception_table.iter()
		.map(|entry| -> Result<Exception> { Ok(Exception {
			start: labels.get_or_create(entry.start_pc)?,
			end: labels.get_or_create_end(entry.end_pc as u32)?,
			handler: labels.get_or_create(entry.handler_pc)?,
			catch: entry.catch_type.clone(),
		}) })
		.collect::<Result<Vec<_>>>()
		.context("while reading the exception table")?;

	let mut tables = Tables::default();
	let mut attributes = Vec::new();
	for attribute in &code.attributes {
		match &attribute.value {
			AttributeValue::StackMapTable(frames) => {
				if tables.frames.replace(frames.clone()).is_some() {
					bail_format!("only one `StackMapTable` attribute is allowed");
				}
			},
			AttributeValue::LineNumberTable(line_numbers) => {
				let table = tables.line_numbers.get_or_insert_with(Vec::new);
				for line in line_numbers {
					table.push((labels.get_or_create(line.start_pc)?, line.line_number));
				}
			},
			AttributeValue::LocalVariableTable(rows) | AttributeValue::LocalVariableTypeTable(rows) => {
				let is_type_table = matches!(attribute.value, AttributeValue::LocalVariableTypeTable(_));
				let table = tables.local_variables.get_or_insert_with(Vec::new);
				for row in rows {
					let (descriptor, signature) = if is_type_table {
						(None, Some(row.descriptor.clone()))
					} else {
						(Some(row.descriptor.clone()), None)
					};
					table.push(Lv {
						range: labels.get_or_create_range(row.start_pc, row.length)?,
						name: row.name.clone(),
						descriptor,
						signature,
						index: LvIndex { index: row.index },
					});
				}
			},
			_ => attributes.push(attribute.clone()),
		}
	}

	let mut frames = BTreeMap::new();
	let mut offset: Option<u16> = None;
	for (i, frame) in tables.frames.into_iter().flatten().enumerate() {
		let next = match offset {
			None => Some(frame.offset_delta),
			Some(offset) => offset.checked_add(frame.offset_delta).and_then(|x| x.checked_add(1)),
		};
		let Some(next) = next else {
			bail_format!("offset of stack map frame {i} overflows");
		};
		offset = Some(next);

		let data: Frame = frame.data.try_map(|pc| labels.get_or_create(pc))
			.with_context(|| anyhow!("in stack map frame {i}"))?;
		frames.insert(next, data);
	}

	// every label must be at an instruction, or right after the last one
	let mut misplaced: Vec<u16> = labels.offsets()
		.filter(|pc| *pc != code_length && !starts.contains(pc))
		.collect();
	misplaced.sort_unstable();
	if let Some(pc) = misplaced.first() {
		bail_format!("bytecode offset {pc} is referenced, but no instruction starts there");
	}
	if let Some(pc) = frames.keys().find(|pc| !starts.contains(*pc)) {
		bail_format!("stack map frame at bytecode offset {pc} isn't at the start of an instruction");
	}

	let mut instructions = Vec::with_capacity(starts.len());
	for_each_opcode(bytecode, |r, opcode_pos| {
		let instruction = read_instruction(r, opcode_pos, pool, &labels)?;
		instructions.push(InstructionListEntry {
			label: labels.get(opcode_pos),
			frame: frames.remove(&opcode_pos),
			instruction,
		});
		Ok(())
	})?;

	Ok(Code {
		max_stack: code.max_stack,
		max_locals: code.max_locals,
		instructions,
		exception_table,
		last_label: labels.get(code_length),
		line_numbers: tables.line_numbers,
		local_variables: tables.local_variables,
		attributes,
	})
}

fn target(labels: &OffsetLabels, pc: u16) -> Result<Label> {
	labels.get(pc)
		.ok_or_else(|| anyhow!("no label at bytecode offset {pc}, even though all branch targets got one"))
}

fn read_instruction(r: &mut Cursor<&[u8]>, opcode_pos: u16, pool: &ConstantPool, labels: &OffsetLabels) -> Result<Instruction> {
	let branch = |r: &mut Cursor<&[u8]>| target(labels, r.read_i16_as_branch_target(opcode_pos)?);
	let branch_wide = |r: &mut Cursor<&[u8]>| target(labels, r.read_i32_as_branch_target(opcode_pos)?);

	Ok(match r.read_u8()? {
		opcode::NOP         => Instruction::Nop,
		opcode::ACONST_NULL => Instruction::AConstNull,
		opcode::ICONST_M1   => Instruction::IConstM1,
		opcode::ICONST_0    => Instruction::IConst0,
		opcode::ICONST_1    => Instruction::IConst1,
		opcode::ICONST_2    => Instruction::IConst2,
		opcode::ICONST_3    => Instruction::IConst3,
		opcode::ICONST_4    => Instruction::IConst4,
		opcode::ICONST_5    => Instruction::IConst5,
		opcode::LCONST_0    => Instruction::LConst0,
		opcode::LCONST_1    => Instruction::LConst1,
		opcode::FCONST_0    => Instruction::FConst0,
		opcode::FCONST_1    => Instruction::FConst1,
		opcode::FCONST_2    => Instruction::FConst2,
		opcode::DCONST_0    => Instruction::DConst0,
		opcode::DCONST_1    => Instruction::DConst1,
		opcode::BIPUSH      => Instruction::BiPush(r.read_i8()?),
		opcode::SIPUSH      => Instruction::SiPush(r.read_i16()?),
		opcode::LDC         => Instruction::Ldc(pool.get_loadable(r.read_u8()? as u16)?),
		opcode::LDC_W       => Instruction::Ldc(pool.get_loadable(r.read_u16()?)?),
		opcode::LDC2_W      => Instruction::Ldc(pool.get_loadable(r.read_u16()?)?),
		opcode::ILOAD       => Instruction::ILoad(r.read_u8_as_local_variable()?),
		opcode::LLOAD       => Instruction::LLoad(r.read_u8_as_local_variable()?),
		opcode::FLOAD       => Instruction::FLoad(r.read_u8_as_local_variable()?),
		opcode::DLOAD       => Instruction::DLoad(r.read_u8_as_local_variable()?),
		opcode::ALOAD       => Instruction::ALoad(r.read_u8_as_local_variable()?),
		opcode @ opcode::ILOAD_0..=opcode::ALOAD_3 => {
			let shifted = opcode - opcode::ILOAD_0;
			let index = LvIndex { index: (shifted & 0b11) as u16 };
			match opcode::ILOAD + (shifted >> 2) {
				opcode::ILOAD => Instruction::ILoad(index),
				opcode::LLOAD => Instruction::LLoad(index),
				opcode::FLOAD => Instruction::FLoad(index),
				opcode::DLOAD => Instruction::DLoad(index),
				_ => Instruction::ALoad(index),
			}
		},
		opcode::IALOAD => Instruction::IALoad,
		opcode::LALOAD => Instruction::LALoad,
		opcode::FALOAD => Instruction::FALoad,
		opcode::DALOAD => Instruction::DALoad,
		opcode::AALOAD => Instruction::AALoad,
		opcode::BALOAD => Instruction::BALoad,
		opcode::CALOAD => Instruction::CALoad,
		opcode::SALOAD => Instruction::SALoad,
		opcode::ISTORE => Instruction::IStore(r.read_u8_as_local_variable()?),
		opcode::LSTORE => Instruction::LStore(r.read_u8_as_local_variable()?),
		opcode::FSTORE => Instruction::FStore(r.read_u8_as_local_variable()?),
		opcode::DSTORE => Instruction::DStore(r.read_u8_as_local_variable()?),
		opcode::ASTORE => Instruction::AStore(r.read_u8_as_local_variable()?),
		opcode @ opcode::ISTORE_0..=opcode::ASTORE_3 => {
			let shifted = opcode - opcode::ISTORE_0;
			let index = LvIndex { index: (shifted & 0b11) as u16 };
			match opcode::ISTORE + (shifted >> 2) {
				opcode::ISTORE => Instruction::IStore(index),
				opcode::LSTORE => Instruction::LStore(index),
				opcode::FSTORE => Instruction::FStore(index),
				opcode::DSTORE => Instruction::DStore(index),
				_ => Instruction::AStore(index),
			}
		},
		opcode::IASTORE => Instruction::IAStore,
		opcode::LASTORE => Instruction::LAStore,
		opcode::FASTORE => Instruction::FAStore,
		opcode::DASTORE => Instruction::DAStore,
		opcode::AASTORE => Instruction::AAStore,
		opcode::BASTORE => Instruction::BAStore,
		opcode::CASTORE => Instruction::CAStore,
		opcode::SASTORE => Instruction::SAStore,
		opcode::POP     => Instruction::Pop,
		opcode::POP2    => Instruction::Pop2,
		opcode::DUP     => Instruction::Dup,
		opcode::DUP_X1  => Instruction::DupX1,
		opcode::DUP_X2  => Instruction::DupX2,
		opcode::DUP2    => Instruction::Dup2,
		opcode::DUP2_X1 => Instruction::Dup2X1,
		opcode::DUP2_X2 => Instruction::Dup2X2,
		opcode::SWAP    => Instruction::Swap,
		opcode::IADD    => Instruction::IAdd,
		opcode::LADD    => Instruction::LAdd,
		opcode::FADD    => Instruction::FAdd,
		opcode::DADD    => Instruction::DAdd,
		opcode::ISUB    => Instruction::ISub,
		opcode::LSUB    => Instruction::LSub,
		opcode::FSUB    => Instruction::FSub,
		opcode::DSUB    => Instruction::DSub,
		opcode::IMUL    => Instruction::IMul,
		opcode::LMUL    => Instruction::LMul,
		opcode::FMUL    => Instruction::FMul,
		opcode::DMUL    => Instruction::DMul,
		opcode::IDIV    => Instruction::IDiv,
		opcode::LDIV    => Instruction::LDiv,
		opcode::FDIV    => Instruction::FDiv,
		opcode::DDIV    => Instruction::DDiv,
		opcode::IREM    => Instruction::IRem,
		opcode::LREM    => Instruction::LRem,
		opcode::FREM    => Instruction::FRem,
		opcode::DREM    => Instruction::DRem,
		opcode::INEG    => Instruction::INeg,
		opcode::LNEG    => Instruction::LNeg,
		opcode::FNEG    => Instruction::FNeg,
		opcode::DNEG    => Instruction::DNeg,
		opcode::ISHL    => Instruction::IShl,
		opcode::LSHL    => Instruction::LShl,
		opcode::ISHR    => Instruction::IShr,
		opcode::LSHR    => Instruction::LShr,
		opcode::IUSHR   => Instruction::IUShr,
		opcode::LUSHR   => Instruction::LUShr,
		opcode::IAND    => Instruction::IAnd,
		opcode::LAND    => Instruction::LAnd,
		opcode::IOR     => Instruction::IOr,
		opcode::LOR     => Instruction::LOr,
		opcode::IXOR    => Instruction::IXor,
		opcode::LXOR    => Instruction::LXor,
		opcode::IINC    => Instruction::IInc(r.read_u8_as_local_variable()?, r.read_i8()? as i16),
		opcode::I2L     => Instruction::I2L,
		opcode::I2F     => Instruction::I2F,
		opcode::I2D     => Instruction::I2D,
		opcode::L2I     => Instruction::L2I,
		opcode::L2F     => Instruction::L2F,
		opcode::L2D     => Instruction::L2D,
		opcode::F2I     => Instruction::F2I,
		opcode::F2L     => Instruction::F2L,
		opcode::F2D     => Instruction::F2D,
		opcode::D2I     => Instruction::D2I,
		opcode::D2L     => Instruction::D2L,
		opcode::D2F     => Instruction::D2F,
		opcode::I2B     => Instruction::I2B,
		opcode::I2C     => Instruction::I2C,
		opcode::I2S     => Instruction::I2S,
		opcode::LCMP    => Instruction::LCmp,
		opcode::FCMPL   => Instruction::FCmpL,
		opcode::FCMPG   => Instruction::FCmpG,
		opcode::DCMPL   => Instruction::DCmpL,
		opcode::DCMPG   => Instruction::DCmpG,
		opcode::IFEQ      => Instruction::IfEq(branch(r)?),
		opcode::IFNE      => Instruction::IfNe(branch(r)?),
		opcode::IFLT      => Instruction::IfLt(branch(r)?),
		opcode::IFGE      => Instruction::IfGe(branch(r)?),
		opcode::IFGT      => Instruction::IfGt(branch(r)?),
		opcode::IFLE      => Instruction::IfLe(branch(r)?),
		opcode::IF_ICMPEQ => Instruction::IfICmpEq(branch(r)?),
		opcode::IF_ICMPNE => Instruction::IfICmpNe(branch(r)?),
		opcode::IF_ICMPLT => Instruction::IfICmpLt(branch(r)?),
		opcode::IF_ICMPGE => Instruction::IfICmpGe(branch(r)?),
		opcode::IF_ICMPGT => Instruction::IfICmpGt(branch(r)?),
		opcode::IF_ICMPLE => Instruction::IfICmpLe(branch(r)?),
		opcode::IF_ACMPEQ => Instruction::IfACmpEq(branch(r)?),
		opcode::IF_ACMPNE => Instruction::IfACmpNe(branch(r)?),
		opcode::GOTO      => Instruction::Goto(branch(r)?),
		opcode::JSR       => Instruction::Jsr(branch(r)?),
		opcode::RET       => Instruction::Ret(r.read_u8_as_local_variable()?),
		opcode::TABLESWITCH => {
			r.align_to_4_byte_boundary()?;
			let default = branch_wide(r)?;
			let low = r.read_i32()?;
			let high = r.read_i32()?;
			// checked while discovering the labels
			let table = (low..=high)
				.map(|_| branch_wide(r))
				.collect::<Result<_>>()?;
			Instruction::TableSwitch { default, low, high, table }
		},
		opcode::LOOKUPSWITCH => {
			r.align_to_4_byte_boundary()?;
			let default = branch_wide(r)?;
			let npairs = r.read_i32()?;
			let pairs = (0..npairs)
				.map(|_| -> Result<(i32, Label)> { Ok((r.read_i32()?, branch_wide(r)?)) })
				.collect::<Result<_>>()?;
			Instruction::LookupSwitch { default, pairs }
		},
		opcode::IRETURN => Instruction::IReturn,
		opcode::LRETURN => Instruction::LReturn,
		opcode::FRETURN => Instruction::FReturn,
		opcode::DRETURN => Instruction::DReturn,
		opcode::ARETURN => Instruction::AReturn,
		opcode::RETURN  => Instruction::Return,
		opcode::GETSTATIC     => Instruction::GetStatic(pool.get_field_ref(r.read_u16()?)?.clone()),
		opcode::PUTSTATIC     => Instruction::PutStatic(pool.get_field_ref(r.read_u16()?)?.clone()),
		opcode::GETFIELD      => Instruction::GetField(pool.get_field_ref(r.read_u16()?)?.clone()),
		opcode::PUTFIELD      => Instruction::PutField(pool.get_field_ref(r.read_u16()?)?.clone()),
		opcode::INVOKEVIRTUAL => Instruction::InvokeVirtual(pool.get_method_ref(r.read_u16()?)?.clone()),
		opcode::INVOKESPECIAL => {
			let (method_ref, is_interface) = pool.get_method_ref_or_interface_method_ref(r.read_u16()?)?;
			Instruction::InvokeSpecial(method_ref.clone(), is_interface)
		},
		opcode::INVOKESTATIC => {
			let (method_ref, is_interface) = pool.get_method_ref_or_interface_method_ref(r.read_u16()?)?;
			Instruction::InvokeStatic(method_ref.clone(), is_interface)
		},
		opcode::INVOKEINTERFACE => {
			let method_ref = pool.get_interface_method_ref(r.read_u16()?)?.clone();
			// the count is derived from the descriptor when writing
			let _count = r.read_u8()?;
			let _zero = r.read_u8()?;
			Instruction::InvokeInterface(method_ref)
		},
		opcode::INVOKEDYNAMIC => {
			let invoke_dynamic = pool.get_invoke_dynamic(r.read_u16()?)?.clone();
			let _zero = r.read_u16()?;
			Instruction::InvokeDynamic(invoke_dynamic)
		},
		opcode::NEW          => Instruction::New(pool.get_class(r.read_u16()?)?.clone()),
		opcode::NEWARRAY     => Instruction::NewArray(ArrayType::from_atype(r.read_u8()?)?),
		opcode::ANEWARRAY    => Instruction::ANewArray(pool.get_class(r.read_u16()?)?.clone()),
		opcode::ARRAYLENGTH  => Instruction::ArrayLength,
		opcode::ATHROW       => Instruction::AThrow,
		opcode::CHECKCAST    => Instruction::CheckCast(pool.get_class(r.read_u16()?)?.clone()),
		opcode::INSTANCEOF   => Instruction::InstanceOf(pool.get_class(r.read_u16()?)?.clone()),
		opcode::MONITORENTER => Instruction::MonitorEnter,
		opcode::MONITOREXIT  => Instruction::MonitorExit,
		opcode::WIDE => match r.read_u8()? {
			opcode::ILOAD  => Instruction::ILoad( r.read_u16_as_local_variable()?),
			opcode::LLOAD  => Instruction::LLoad( r.read_u16_as_local_variable()?),
			opcode::FLOAD  => Instruction::FLoad( r.read_u16_as_local_variable()?),
			opcode::DLOAD  => Instruction::DLoad( r.read_u16_as_local_variable()?),
			opcode::ALOAD  => Instruction::ALoad( r.read_u16_as_local_variable()?),
			opcode::ISTORE => Instruction::IStore(r.read_u16_as_local_variable()?),
			opcode::LSTORE => Instruction::LStore(r.read_u16_as_local_variable()?),
			opcode::FSTORE => Instruction::FStore(r.read_u16_as_local_variable()?),
			opcode::DSTORE => Instruction::DStore(r.read_u16_as_local_variable()?),
			opcode::ASTORE => Instruction::AStore(r.read_u16_as_local_variable()?),
			opcode::RET    => Instruction::Ret(   r.read_u16_as_local_variable()?),
			opcode::IINC   => Instruction::IInc(r.read_u16_as_local_variable()?, r.read_i16()?),
			wide_opcode => bail_format!("unknown wide opcode {wide_opcode:#x}"),
		},
		opcode::MULTIANEWARRAY => Instruction::MultiANewArray(pool.get_class(r.read_u16()?)?.clone(), r.read_u8()?),
		opcode::IFNULL    => Instruction::IfNull(branch(r)?),
		opcode::IFNONNULL => Instruction::IfNonNull(branch(r)?),
		opcode::GOTO_W    => Instruction::Goto(branch_wide(r)?),
		opcode::JSR_W     => Instruction::Jsr(branch_wide(r)?),
		opcode => bail_format!("unknown opcode {opcode:#x}"),
	})
}
