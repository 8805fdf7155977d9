use crate::interpreter::{Frame, OpcodeResult};
use crate::opcode::{Instruction, Opcode};
use crate::value::Value;
use crate::vm::Vm;
use crate::VmResult;

impl Vm {
    /// 32-bit integer arithmetic and bitwise rules. Add, subtract, and
    /// multiply wrap to two's complement; division and remainder by zero
    /// raise a catchable guest `ArithmeticException`, never a host fault.
    pub(in crate::interpreter) fn exec_arithmetic_ops(
        &mut self,
        frame: &mut Frame,
        instr: &Instruction,
    ) -> VmResult<OpcodeResult> {
        if instr.op == Opcode::Ineg {
            let a = frame.pop_i32()?;
            frame.push(Value::Int(a.wrapping_neg()));
            return Ok(OpcodeResult::Continue);
        }

        let b = frame.pop_i32()?;
        let a = frame.pop_i32()?;
        let result = match instr.op {
            Opcode::Iadd => a.wrapping_add(b),
            Opcode::Isub => a.wrapping_sub(b),
            Opcode::Imul => a.wrapping_mul(b),
            Opcode::Idiv => {
                if b == 0 {
                    let exception = self
                        .instantiate_builtin_exception("java/lang/ArithmeticException", "Division by zero");
                    return Ok(OpcodeResult::Throw(exception));
                }
                a.wrapping_div(b)
            }
            Opcode::Irem => {
                if b == 0 {
                    let exception = self
                        .instantiate_builtin_exception("java/lang/ArithmeticException", "Division by zero");
                    return Ok(OpcodeResult::Throw(exception));
                }
                a.wrapping_rem(b)
            }
            Opcode::Iand => a & b,
            Opcode::Ior => a | b,
            Opcode::Ixor => a ^ b,
            _ => unreachable!("not an arithmetic opcode: {:?}", instr.op),
        };
        frame.push(Value::Int(result));
        Ok(OpcodeResult::Continue)
    }
}
