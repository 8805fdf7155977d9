use crate::interpreter::{Frame, OpcodeResult};
use crate::opcode::{Instruction, Opcode};
use crate::value::Value;
use crate::vm::Vm;
use crate::VmResult;

impl Vm {
    pub(in crate::interpreter) fn exec_control_flow_ops(
        &mut self,
        frame: &mut Frame,
        instr: &Instruction,
    ) -> VmResult<OpcodeResult> {
        match instr.op {
            Opcode::Goto => Ok(OpcodeResult::Jump(instr.target_arg()?)),

            Opcode::IfIcmpeq
            | Opcode::IfIcmpne
            | Opcode::IfIcmplt
            | Opcode::IfIcmple
            | Opcode::IfIcmpgt
            | Opcode::IfIcmpge => {
                let target = instr.target_arg()?;
                let b = frame.pop_i32()?;
                let a = frame.pop_i32()?;
                let taken = match instr.op {
                    Opcode::IfIcmpeq => a == b,
                    Opcode::IfIcmpne => a != b,
                    Opcode::IfIcmplt => a < b,
                    Opcode::IfIcmple => a <= b,
                    Opcode::IfIcmpgt => a > b,
                    Opcode::IfIcmpge => a >= b,
                    _ => unreachable!(),
                };
                Ok(if taken {
                    OpcodeResult::Jump(target)
                } else {
                    OpcodeResult::Continue
                })
            }

            Opcode::Ifeq
            | Opcode::Ifne
            | Opcode::Iflt
            | Opcode::Ifle
            | Opcode::Ifgt
            | Opcode::Ifge => {
                let target = instr.target_arg()?;
                let value = frame.pop_i32()?;
                let taken = match instr.op {
                    Opcode::Ifeq => value == 0,
                    Opcode::Ifne => value != 0,
                    Opcode::Iflt => value < 0,
                    Opcode::Ifle => value <= 0,
                    Opcode::Ifgt => value > 0,
                    Opcode::Ifge => value >= 0,
                    _ => unreachable!(),
                };
                Ok(if taken {
                    OpcodeResult::Jump(target)
                } else {
                    OpcodeResult::Continue
                })
            }

            Opcode::Return => Ok(OpcodeResult::Return(Value::Void)),

            Opcode::Ireturn | Opcode::Areturn => Ok(OpcodeResult::Return(frame.pop()?)),

            Opcode::Athrow => {
                // Throwing null is itself a guest NullPointerException.
                match frame.pop_ref()? {
                    Some(exception) => Ok(OpcodeResult::Throw(exception)),
                    None => {
                        let exception = self.instantiate_builtin_exception(
                            "java/lang/NullPointerException",
                            "Throwing null",
                        );
                        Ok(OpcodeResult::Throw(exception))
                    }
                }
            }

            _ => unreachable!("not a control-flow opcode: {:?}", instr.op),
        }
    }
}
