use crate::heap::Handle;
use crate::interpreter::{Frame, OpcodeResult};
use crate::opcode::{Instruction, Opcode};
use crate::value::Value;
use crate::vm::Vm;
use crate::{VmError, VmResult};

impl Vm {
    /// Object allocation and field access. Field access on a null or
    /// non-object target is host-fatal: it marks a malformed program, not a
    /// recoverable guest condition.
    pub(in crate::interpreter) fn exec_object_ops(
        &mut self,
        frame: &mut Frame,
        instr: &Instruction,
    ) -> VmResult<OpcodeResult> {
        match instr.op {
            Opcode::New => {
                let type_ref = instr.type_arg()?;
                let class_name = type_ref.class_name.as_deref().unwrap_or("java/lang/Object");
                let handle = self.heap.allocate_object(class_name);
                frame.push(Value::Ref(Some(handle)));
            }

            Opcode::Getstatic => {
                let member = instr.member_arg()?.clone();
                let raw = self.static_field(&member.class_name, &member.name, &member.descriptor);
                let value = self.wrap_from_type(&member.descriptor, &raw)?;
                frame.push(value);
            }

            Opcode::Putstatic => {
                let member = instr.member_arg()?.clone();
                let value = frame.pop()?;
                let raw = self.unwrap_value(&value);
                self.set_static_field(&member.class_name, &member.name, raw);
            }

            Opcode::Getfield => {
                let member = instr.member_arg()?.clone();
                let target = require_object(frame.pop_ref()?)?;
                let raw = self
                    .heap
                    .get_instance_field(target, &member.name, &member.descriptor)?;
                let value = self.wrap_from_type(&member.descriptor, &raw)?;
                frame.push(value);
            }

            Opcode::Putfield => {
                let member = instr.member_arg()?.clone();
                let value = frame.pop()?;
                let raw = self.unwrap_value(&value);
                let target = require_object(frame.pop_ref()?)?;
                self.heap.set_instance_field(target, &member.name, raw)?;
            }

            _ => unreachable!("not an object opcode: {:?}", instr.op),
        }
        Ok(OpcodeResult::Continue)
    }
}

fn require_object(handle: Option<Handle>) -> VmResult<Handle> {
    handle.ok_or_else(|| VmError::NotAnObject("null".to_string()))
}
