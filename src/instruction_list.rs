//! Converting between the raw bytecode of a `Code` attribute and a list of instructions.
//!
//! In the instruction list, branch targets, exception handlers, stack map frames and the debug tables all refer to
//! [`Label`](crate::tree::method::code::Label)s placed on the instructions instead of to bytecode offsets. This way
//! instructions can be added or removed without fixing up any offsets.

mod labels;
mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::class_constants::opcode;
	use crate::error::{kind_of, ErrorKind};
	use crate::instruction_list::{decode, encode};
	use crate::pool::ConstantPool;
	use crate::pool::entry::MemberRef;
	use crate::tree::attribute::{Attribute, AttributeValue, CodeAttribute, LineNumber};
	use crate::tree::class::ClassName;
	use crate::tree::frame::{FrameData, StackMapFrame, VerificationType};
	use crate::tree::method::code::{Code, Exception, Instruction, InstructionListEntry, Label, LabelRange, Loadable, Lv, LvIndex};

	fn code(instructions: Vec<InstructionListEntry>) -> Code {
		Code {
			max_stack: 2,
			max_locals: 2,
			instructions,
			..Code::default()
		}
	}

	fn raw(bytecode: Vec<u8>, attributes: Vec<Attribute>) -> CodeAttribute {
		CodeAttribute {
			max_stack: 2,
			max_locals: 2,
			code: bytecode,
			exception_table: Vec::new(),
			attributes,
		}
	}

	fn at(label: u32, instruction: Instruction) -> InstructionListEntry {
		InstructionListEntry::labeled(Label::new(label), instruction)
	}

	fn plain(instruction: Instruction) -> InstructionListEntry {
		InstructionListEntry::new(instruction)
	}

	#[test]
	fn short_forms() -> Result<()> {
		let mut pool = ConstantPool::new();
		let code = code(vec![
			plain(Instruction::ILoad(LvIndex { index: 0 })),
			plain(Instruction::AStore(LvIndex { index: 3 })),
			plain(Instruction::DLoad(LvIndex { index: 4 })),
			plain(Instruction::LStore(LvIndex { index: 300 })),
			plain(Instruction::IInc(LvIndex { index: 1 }, -1)),
			plain(Instruction::IInc(LvIndex { index: 1 }, 200)),
			plain(Instruction::Return),
		]);

		let attribute = encode(&code, &mut pool)?;
		assert_eq!(attribute.code, vec![
			opcode::ILOAD_0,
			opcode::ASTORE_3,
			opcode::DLOAD, 4,
			opcode::WIDE, opcode::LSTORE, 1, 44,
			opcode::IINC, 1, 0xff,
			opcode::WIDE, opcode::IINC, 0, 1, 0, 200,
			opcode::RETURN,
		]);
		assert_eq!(decode(&attribute, &pool)?, code);
		Ok(())
	}

	#[test]
	fn ldc_forms() -> Result<()> {
		let mut pool = ConstantPool::new();
		for i in 0..300 {
			pool.put_integer(i)?;
		}
		let code = code(vec![
			plain(Instruction::Ldc(Loadable::Integer(5))),
			plain(Instruction::Ldc(Loadable::Integer(1000))),
			plain(Instruction::Ldc(Loadable::Long(1))),
			plain(Instruction::Return),
		]);

		let attribute = encode(&code, &mut pool)?;
		assert_eq!(attribute.code, vec![
			opcode::LDC, 6,
			opcode::LDC_W, 1, 45,
			opcode::LDC2_W, 1, 46,
			opcode::RETURN,
		]);
		assert_eq!(decode(&attribute, &pool)?, code);
		Ok(())
	}

	#[test]
	fn float_constants_keep_their_bits() -> Result<()> {
		let mut pool = ConstantPool::new();
		let code = code(vec![
			plain(Instruction::Ldc(Loadable::Float(f32::NAN))),
			plain(Instruction::Ldc(Loadable::Float(f32::from_bits(0x7fc0_0001)))),
			plain(Instruction::Ldc(Loadable::Float(-0.0))),
			plain(Instruction::Ldc(Loadable::Float(0.0))),
			plain(Instruction::Ldc(Loadable::Double(f64::NAN))),
			plain(Instruction::Ldc(Loadable::Double(-0.0))),
			plain(Instruction::Return),
		]);

		let attribute = encode(&code, &mut pool)?;
		// each of the floats is a separate constant
		assert_eq!(&attribute.code[1..6], &[1, opcode::LDC, 2, opcode::LDC, 3]);
		assert_eq!(decode(&attribute, &pool)?, code);

		assert_eq!(Loadable::Float(f32::NAN), Loadable::Float(f32::NAN));
		assert_ne!(Loadable::Float(-0.0), Loadable::Float(0.0));
		assert_ne!(Loadable::Double(-0.0), Loadable::Double(0.0));
		Ok(())
	}

	#[test]
	fn far_forward_branches() -> Result<()> {
		let mut pool = ConstantPool::new();
		let mut instructions = vec![
			plain(Instruction::IConst0),
			plain(Instruction::IfEq(Label::new(0))),
			plain(Instruction::Goto(Label::new(0))),
		];
		instructions.extend((0..40000).map(|_| plain(Instruction::Nop)));
		instructions.push(at(0, Instruction::Return));

		let attribute = encode(&code(instructions), &mut pool)?;
		let bytecode = &attribute.code;

		// 1: ifne +8, 4: goto_w, 9: goto_w, 14: nops
		let target: i32 = 1 + 8 + 5 + 40000;
		assert_eq!(&bytecode[1..4], &[opcode::IFNE, 0, 8]);
		assert_eq!(bytecode[4], opcode::GOTO_W);
		assert_eq!(&bytecode[5..9], &(target - 4).to_be_bytes());
		assert_eq!(bytecode[9], opcode::GOTO_W);
		assert_eq!(&bytecode[10..14], &(target - 9).to_be_bytes());
		assert_eq!(bytecode.len(), target as usize + 1);

		let decoded = decode(&attribute, &pool)?;
		assert_eq!(decoded.instructions[1].instruction, Instruction::IfNe(Label::new(0)));
		assert_eq!(decoded.instructions[2].instruction, Instruction::Goto(Label::new(1)));
		assert_eq!(decoded.instructions[3].label, Some(Label::new(0)));
		assert_eq!(decoded.instructions.last().map(|entry| entry.label), Some(Some(Label::new(1))));
		Ok(())
	}

	#[test]
	fn far_backward_branch() -> Result<()> {
		let mut pool = ConstantPool::new();
		let mut instructions = vec![at(0, Instruction::Nop)];
		instructions.extend((0..40000).map(|_| plain(Instruction::Nop)));
		instructions.push(plain(Instruction::Goto(Label::new(0))));

		let attribute = encode(&code(instructions), &mut pool)?;
		assert_eq!(&attribute.code[40001..], &[opcode::GOTO_W, 0xff, 0xff, 0x63, 0xbf]);
		Ok(())
	}

	#[test]
	fn switch_padding() -> Result<()> {
		let mut pool = ConstantPool::new();
		let code = code(vec![
			plain(Instruction::Nop),
			plain(Instruction::TableSwitch {
				default: Label::new(0),
				low: 0,
				high: 1,
				table: vec![Label::new(0), Label::new(1)],
			}),
			at(0, Instruction::Return),
			at(1, Instruction::Return),
		]);

		let attribute = encode(&code, &mut pool)?;
		assert_eq!(attribute.code, vec![
			opcode::NOP,
			opcode::TABLESWITCH, 0, 0,
			0, 0, 0, 23,
			0, 0, 0, 0,
			0, 0, 0, 1,
			0, 0, 0, 23,
			0, 0, 0, 24,
			opcode::RETURN,
			opcode::RETURN,
		]);
		assert_eq!(decode(&attribute, &pool)?, code);
		Ok(())
	}

	#[test]
	fn switch_checks() {
		let mut pool = ConstantPool::new();

		let table = code(vec![
			plain(Instruction::TableSwitch { default: Label::new(0), low: 0, high: 2, table: vec![Label::new(0)] }),
			at(0, Instruction::Return),
		]);
		assert_eq!(kind_of(&encode(&table, &mut pool).unwrap_err()), Some(ErrorKind::Format));

		let lookup = code(vec![
			plain(Instruction::LookupSwitch { default: Label::new(0), pairs: vec![(3, Label::new(0)), (1, Label::new(0))] }),
			at(0, Instruction::Return),
		]);
		assert_eq!(kind_of(&encode(&lookup, &mut pool).unwrap_err()), Some(ErrorKind::Format));
	}

	#[test]
	fn frame_offsets() -> Result<()> {
		let mut pool = ConstantPool::new();
		let mut code = code(vec![
			plain(Instruction::IConst0),
			plain(Instruction::IfEq(Label::new(0))),
			plain(Instruction::Nop),
			at(0, Instruction::IConst1),
			plain(Instruction::IReturn),
		]);
		code.instructions[3].frame = Some(FrameData::Same);
		code.instructions[4].frame = Some(FrameData::SameLocals1StackItem(VerificationType::Integer));

		let attribute = encode(&code, &mut pool)?;
		assert_eq!(attribute.attributes, vec![
			Attribute::new("StackMapTable", AttributeValue::StackMapTable(vec![
				StackMapFrame { offset_delta: 5, data: FrameData::Same },
				StackMapFrame { offset_delta: 0, data: FrameData::SameLocals1StackItem(VerificationType::Integer) },
			])),
		]);
		assert_eq!(decode(&attribute, &pool)?, code);
		Ok(())
	}

	#[test]
	fn uninitialized_in_frame() -> Result<()> {
		let mut pool = ConstantPool::new();
		let object = ClassName::try_from("java/lang/Object")?;
		let mut code = code(vec![
			plain(Instruction::IConst0),
			plain(Instruction::IfEq(Label::new(1))),
			at(0, Instruction::New(object.clone())),
			plain(Instruction::Dup),
			at(1, Instruction::Pop),
			plain(Instruction::Return),
		]);
		code.instructions[4].frame = Some(FrameData::Full {
			locals: vec![],
			stack: vec![VerificationType::Uninitialized(Label::new(0))],
		});

		let attribute = encode(&code, &mut pool)?;
		let Some(AttributeValue::StackMapTable(frames)) = attribute.attributes.first().map(|a| &a.value) else {
			panic!("expected a stack map table, got {:?}", attribute.attributes);
		};
		assert_eq!(frames, &vec![StackMapFrame {
			offset_delta: 8,
			data: FrameData::Full { locals: vec![], stack: vec![VerificationType::Uninitialized(4)] },
		}]);

		// labels get numbered by discovery: the branch target comes first
		let decoded = decode(&attribute, &pool)?;
		assert_eq!(decoded.instructions[2].label, Some(Label::new(1)));
		assert_eq!(decoded.instructions[4].label, Some(Label::new(0)));
		Ok(())
	}

	#[test]
	fn bad_branch_target() {
		let pool = ConstantPool::new();
		// the goto targets its own operand
		let attribute = raw(vec![opcode::GOTO, 0, 2, opcode::RETURN], vec![]);
		assert_eq!(kind_of(&decode(&attribute, &pool).unwrap_err()), Some(ErrorKind::Format));

		let attribute = raw(vec![opcode::GOTO, 0x7f, 0xff, opcode::RETURN], vec![]);
		assert_eq!(kind_of(&decode(&attribute, &pool).unwrap_err()), Some(ErrorKind::Format));
	}

	#[test]
	fn frame_not_at_instruction() {
		let pool = ConstantPool::new();
		let attribute = raw(vec![opcode::BIPUSH, 5, opcode::POP, opcode::RETURN], vec![
			Attribute::new("StackMapTable", AttributeValue::StackMapTable(vec![
				StackMapFrame { offset_delta: 1, data: FrameData::Same },
			])),
		]);
		assert_eq!(kind_of(&decode(&attribute, &pool).unwrap_err()), Some(ErrorKind::Format));
	}

	#[test]
	fn unknown_opcode() {
		let pool = ConstantPool::new();
		let attribute = raw(vec![opcode::BREAKPOINT], vec![]);
		assert_eq!(kind_of(&decode(&attribute, &pool).unwrap_err()), Some(ErrorKind::Format));
	}

	#[test]
	fn unplaced_label() {
		let mut pool = ConstantPool::new();
		let code = code(vec![plain(Instruction::Goto(Label::new(9)))]);
		assert_eq!(kind_of(&encode(&code, &mut pool).unwrap_err()), Some(ErrorKind::Consistency));

		let code = self::code(vec![
			at(0, Instruction::Nop),
			at(0, Instruction::Return),
		]);
		assert_eq!(kind_of(&encode(&code, &mut pool).unwrap_err()), Some(ErrorKind::Consistency));
	}

	#[test]
	fn empty_code() {
		let mut pool = ConstantPool::new();
		assert_eq!(kind_of(&encode(&code(vec![]), &mut pool).unwrap_err()), Some(ErrorKind::Format));
	}

	#[test]
	fn invoke_interface_count() -> Result<()> {
		let mut pool = ConstantPool::new();
		let list = ClassName::try_from("java/util/List")?;
		let code = code(vec![
			plain(Instruction::InvokeInterface(MemberRef::new(list.clone(), "set", "(ILjava/lang/Object;)Ljava/lang/Object;"))),
			plain(Instruction::InvokeInterface(MemberRef::new(list.clone(), "x", "(J[D[[Ljava/lang/String;D)V"))),
			plain(Instruction::Return),
		]);

		let attribute = encode(&code, &mut pool)?;
		assert_eq!(attribute.code[3..5], [3, 0]);
		assert_eq!(attribute.code[8..10], [7, 0]);
		assert_eq!(decode(&attribute, &pool)?, code);

		let broken = self::code(vec![
			plain(Instruction::InvokeInterface(MemberRef::new(list, "x", "(Ljava/lang/Object"))),
			plain(Instruction::Return),
		]);
		assert_eq!(kind_of(&encode(&broken, &mut pool).unwrap_err()), Some(ErrorKind::Format));
		Ok(())
	}

	#[test]
	fn debug_tables() -> Result<()> {
		let mut pool = ConstantPool::new();
		let mut code = code(vec![
			at(0, Instruction::ALoad(LvIndex { index: 0 })),
			at(1, Instruction::AReturn),
		]);
		code.last_label = Some(Label::new(2));
		code.exception_table = vec![Exception { start: Label::new(0), end: Label::new(1), handler: Label::new(1), catch: None }];
		code.line_numbers = Some(vec![(Label::new(0), 7), (Label::new(1), 8)]);
		code.local_variables = Some(vec![
			Lv {
				range: LabelRange { start: Label::new(0), end: Label::new(2) },
				name: "this".into(),
				descriptor: Some("Ljava/util/List;".into()),
				signature: Some("Ljava/util/List<TT;>;".into()),
				index: LvIndex { index: 0 },
			},
		]);
		code.attributes = vec![Attribute::unknown("Custom", vec![1, 2])];

		let attribute = encode(&code, &mut pool)?;
		let names: Vec<_> = attribute.attributes.iter().map(|a| a.value.name()).collect();
		assert_eq!(names, vec![Some("LineNumberTable"), Some("LocalVariableTable"), Some("LocalVariableTypeTable"), None]);
		assert_eq!(attribute.attributes[0].value, AttributeValue::LineNumberTable(vec![
			LineNumber { start_pc: 0, line_number: 7 },
			LineNumber { start_pc: 1, line_number: 8 },
		]));
		assert_eq!(attribute.exception_table[0].end_pc, 1);

		// decoding splits the row into one for each table
		let decoded = decode(&attribute, &pool)?;
		let local_variables = decoded.local_variables.as_ref().map(|lvs| lvs.len());
		assert_eq!(local_variables, Some(2));
		assert_eq!(encode(&decoded, &mut pool)?, attribute);

		code.local_variables = Some(vec![Lv {
			range: LabelRange { start: Label::new(0), end: Label::new(2) },
			name: "x".into(),
			descriptor: None,
			signature: None,
			index: LvIndex { index: 1 },
		}]);
		assert_eq!(kind_of(&encode(&code, &mut pool).unwrap_err()), Some(ErrorKind::Consistency));
		Ok(())
	}

	#[test]
	fn round_trip() -> Result<()> {
		let mut pool = ConstantPool::new();
		let system = ClassName::try_from("java/lang/System")?;
		let mut code = code(vec![
			plain(Instruction::GetStatic(MemberRef::new(system, "out", "Ljava/io/PrintStream;"))),
			plain(Instruction::ILoad(LvIndex { index: 1 })),
			plain(Instruction::LookupSwitch {
				default: Label::new(0),
				pairs: vec![(-5, Label::new(1)), (100, Label::new(0))],
			}),
			at(1, Instruction::Ldc(Loadable::String("x".into()))),
			plain(Instruction::Pop),
			at(0, Instruction::Pop),
			plain(Instruction::Return),
		]);
		code.instructions[3].frame = Some(FrameData::SameLocals1StackItem(VerificationType::Object(ClassName::try_from("java/io/PrintStream")?)));
		code.instructions[5].frame = Some(FrameData::Same);

		let first = encode(&code, &mut pool)?;
		let decoded = decode(&first, &pool)?;
		let second = encode(&decoded, &mut pool)?;
		assert_eq!(first, second);
		Ok(())
	}
}
