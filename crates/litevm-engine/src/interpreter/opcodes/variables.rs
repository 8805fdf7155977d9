use tracing::trace;

use crate::interpreter::{Frame, OpcodeResult};
use crate::opcode::{Instruction, Opcode};
use crate::value::Value;
use crate::vm::Vm;
use crate::VmResult;

impl Vm {
    pub(in crate::interpreter) fn exec_variable_ops(
        &mut self,
        frame: &mut Frame,
        instr: &Instruction,
    ) -> VmResult<OpcodeResult> {
        match instr.op {
            Opcode::Iload => {
                let index = instr.value_arg(0)? as usize;
                let value = match frame.local(index)? {
                    Value::Void => Value::Int(0),
                    value => value,
                };
                frame.push(value);
            }

            Opcode::Aload => {
                let index = instr.value_arg(0)? as usize;
                let value = match frame.local(index)? {
                    Value::Void => Value::Ref(None),
                    value => value,
                };
                frame.push(value);
            }

            Opcode::Istore | Opcode::Astore => {
                let index = instr.value_arg(0)? as usize;
                let value = frame.pop()?;
                trace!(index, ?value, "store local");
                frame.set_local(index, value)?;
            }

            Opcode::Iinc => {
                let index = instr.value_arg(0)? as usize;
                let delta = instr.value_arg(1)? as i32;
                let current = frame.local(index)?.to_i32();
                frame.set_local(index, Value::Int(current.wrapping_add(delta)))?;
            }

            _ => unreachable!("not a variable opcode: {:?}", instr.op),
        }
        Ok(OpcodeResult::Continue)
    }
}
