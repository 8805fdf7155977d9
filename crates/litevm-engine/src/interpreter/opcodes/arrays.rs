use crate::descriptor::descriptor_from_primitive_token;
use crate::heap::Handle;
use crate::interpreter::{Frame, OpcodeResult};
use crate::opcode::{Instruction, Opcode, TypeRef};
use crate::value::Value;
use crate::vm::Vm;
use crate::{VmError, VmResult};

/// Component character an array load/store operates on, derived from the
/// opcode (not from the array's own tag, matching the instruction set's
/// typed-access contract).
fn component_of(op: Opcode) -> char {
    match op {
        Opcode::Iaload | Opcode::Iastore => 'I',
        Opcode::Laload | Opcode::Lastore => 'J',
        Opcode::Faload | Opcode::Fastore => 'F',
        Opcode::Daload | Opcode::Dastore => 'D',
        Opcode::Baload | Opcode::Bastore => 'B',
        Opcode::Caload | Opcode::Castore => 'C',
        Opcode::Saload | Opcode::Sastore => 'S',
        _ => 'A',
    }
}

fn component_kind(component: char) -> crate::descriptor::Kind {
    crate::descriptor::kind_of(&component.to_string())
}

fn require_array(handle: Option<Handle>) -> VmResult<Handle> {
    handle.ok_or_else(|| VmError::NotAnArray("null".to_string()))
}

impl Vm {
    pub(in crate::interpreter) fn exec_array_ops(
        &mut self,
        frame: &mut Frame,
        instr: &Instruction,
    ) -> VmResult<OpcodeResult> {
        match instr.op {
            Opcode::Newarray => {
                let length = frame.pop_i32()?;
                let descriptor = primitive_descriptor(instr.type_arg()?);
                let handle = self.heap.allocate_array(&descriptor, length)?;
                frame.push(Value::Ref(Some(handle)));
            }

            Opcode::Anewarray => {
                let length = frame.pop_i32()?;
                let descriptor = reference_descriptor(instr.type_arg()?);
                let handle = self.heap.allocate_array(&descriptor, length)?;
                frame.push(Value::Ref(Some(handle)));
            }

            Opcode::Arraylength => {
                let array = require_array(frame.pop_ref()?)?;
                let length = self.heap.array_length(array)?;
                frame.push(Value::Int(length as i32));
            }

            Opcode::Iaload
            | Opcode::Laload
            | Opcode::Faload
            | Opcode::Daload
            | Opcode::Baload
            | Opcode::Caload
            | Opcode::Saload
            | Opcode::Aaload => {
                let component = component_of(instr.op);
                let index = frame.pop_i32()?;
                let array = require_array(frame.pop_ref()?)?;
                let raw = self.heap.array_load(array, component, index)?;
                let value = self.wrap_raw(component_kind(component), &raw)?;
                frame.push(value);
            }

            Opcode::Iastore
            | Opcode::Lastore
            | Opcode::Fastore
            | Opcode::Dastore
            | Opcode::Bastore
            | Opcode::Castore
            | Opcode::Sastore
            | Opcode::Aastore => {
                let component = component_of(instr.op);
                let value = frame.pop()?;
                let raw = self.unwrap_value(&value);
                let index = frame.pop_i32()?;
                let array = require_array(frame.pop_ref()?)?;
                self.heap.array_store(array, component, index, raw)?;
            }

            _ => unreachable!("not an array opcode: {:?}", instr.op),
        }
        Ok(OpcodeResult::Continue)
    }
}

/// `NEWARRAY` component descriptor: explicit descriptor, else primitive
/// token, defaulting to `int`.
fn primitive_descriptor(type_ref: &TypeRef) -> String {
    if let Some(descriptor) = &type_ref.descriptor {
        return descriptor.clone();
    }
    let token = type_ref.token.as_deref().unwrap_or("int");
    descriptor_from_primitive_token(token).to_string()
}

/// `ANEWARRAY` component descriptor: explicit descriptor, else
/// `L<className>;`, defaulting to `java/lang/Object`.
fn reference_descriptor(type_ref: &TypeRef) -> String {
    if let Some(descriptor) = &type_ref.descriptor {
        return descriptor.clone();
    }
    let class_name = type_ref.class_name.as_deref().unwrap_or("java/lang/Object");
    format!("L{class_name};")
}
