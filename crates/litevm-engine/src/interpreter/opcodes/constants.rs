use crate::interpreter::{Frame, OpcodeResult};
use crate::opcode::{ConstOperand, Instruction, Opcode};
use crate::value::Value;
use crate::vm::Vm;
use crate::VmResult;

impl Vm {
    pub(in crate::interpreter) fn exec_constant_ops(
        &mut self,
        frame: &mut Frame,
        instr: &Instruction,
    ) -> VmResult<OpcodeResult> {
        match instr.op {
            Opcode::Nop => {}

            Opcode::AconstNull => frame.push(Value::Ref(None)),

            Opcode::Iconst | Opcode::Bipush | Opcode::Sipush => {
                let literal = instr.value_arg(0)?;
                frame.push(Value::Int(literal as i32));
            }

            Opcode::Ldc => {
                let constant = self.resolve_ldc(instr.const_arg()?);
                frame.push(constant);
            }

            Opcode::Pop => {
                frame.pop()?;
            }

            Opcode::Dup => {
                let top = frame.peek()?;
                frame.push(top);
            }

            _ => unreachable!("not a constant opcode: {:?}", instr.op),
        }
        Ok(OpcodeResult::Continue)
    }

    fn resolve_ldc(&mut self, constant: &ConstOperand) -> Value {
        match constant {
            ConstOperand::Int { value } => Value::Int(*value),
            ConstOperand::Long { value } => Value::Long(*value),
            ConstOperand::Float { value } => Value::Float(*value),
            ConstOperand::Double { value } => Value::Double(*value),
            ConstOperand::String { value } => {
                let handle = self.heap.intern_string(value);
                Value::Ref(Some(handle))
            }
            ConstOperand::Class { value } => {
                // Class literals materialize as java/lang/Class objects
                // carrying the referenced name.
                let handle = self.heap.allocate_object("java/lang/Class");
                let name = crate::value::RawValue::Str(value.clone());
                let _ = self.heap.set_instance_field(handle, "name", name);
                Value::Ref(Some(handle))
            }
            ConstOperand::Null => Value::Ref(None),
        }
    }
}
