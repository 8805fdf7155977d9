//! Execution engine
//!
//! One [`Frame`] per invocation: fixed locals, a growable operand stack, and
//! an instruction pointer. The dispatch loop threads a tagged
//! [`OpcodeResult`] through every step instead of using host unwinding, so
//! a matched handler-table entry can mutate the frame (reset the stack,
//! move the pointer) and resume the same loop. Host-fatal faults travel as
//! `Err(VmError)` and are never visible to guest handler tables; guest
//! exceptions travel as `OpcodeResult::Throw` signal values.

mod opcodes;

use std::sync::Arc;

use tracing::trace;

use crate::class::MethodDef;
use crate::heap::Handle;
use crate::opcode::{Instruction, Opcode};
use crate::value::Value;
use crate::vm::Vm;
use crate::{VmError, VmResult};

/// Per-invocation execution context.
#[derive(Debug)]
pub(crate) struct Frame {
    locals: Vec<Value>,
    stack: Vec<Value>,
    ip: usize,
}

impl Frame {
    fn new(max_locals: usize) -> Self {
        Self {
            // Unset slots read as Void until a load substitutes the
            // kind-appropriate default.
            locals: vec![Value::Void; max_locals],
            stack: Vec::new(),
            ip: 0,
        }
    }

    /// Copy a value onto the stack. `Value` is `Copy`, so slot and stack
    /// never share storage.
    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> VmResult<Value> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    pub(crate) fn peek(&self) -> VmResult<Value> {
        self.stack.last().copied().ok_or(VmError::StackUnderflow)
    }

    pub(crate) fn pop_i32(&mut self) -> VmResult<i32> {
        Ok(self.pop()?.to_i32())
    }

    pub(crate) fn pop_ref(&mut self) -> VmResult<Option<Handle>> {
        self.pop()?.as_ref_handle()
    }

    pub(crate) fn set_local(&mut self, index: usize, value: Value) -> VmResult<()> {
        let slot = self
            .locals
            .get_mut(index)
            .ok_or(VmError::InvalidLocal(index))?;
        *slot = value;
        Ok(())
    }

    pub(crate) fn local(&self, index: usize) -> VmResult<Value> {
        self.locals
            .get(index)
            .copied()
            .ok_or(VmError::InvalidLocal(index))
    }
}

/// Outcome of dispatching one instruction.
#[derive(Debug)]
pub(crate) enum OpcodeResult {
    /// Fall through to the next instruction
    Continue,
    /// Transfer control to an instruction index
    Jump(usize),
    /// Complete the invocation with a value (`Value::Void` for void returns)
    Return(Value),
    /// Guest exception signal carrying the thrown reference
    Throw(Handle),
}

/// Completion of one method invocation.
#[derive(Debug)]
pub(crate) enum MethodOutcome {
    /// Normal completion
    Returned(Value),
    /// A guest exception escaped this frame
    Threw(Handle),
}

impl Vm {
    /// Run one method to completion. `receiver` seeds local 0 for instance
    /// methods; arguments fill the following slots. Nested invokes recurse
    /// through this same entry.
    pub(crate) fn execute_method(
        &mut self,
        method: &Arc<MethodDef>,
        args: Vec<Value>,
        receiver: Option<Value>,
    ) -> VmResult<MethodOutcome> {
        trace!(method = %method.name, descriptor = %method.descriptor, "executing method");

        let implicit_receiver = !method.is_static();
        let needed = args.len() + usize::from(implicit_receiver);
        let mut frame = Frame::new(method.max_locals.max(needed));

        let mut slot = 0;
        if implicit_receiver {
            frame.set_local(slot, receiver.unwrap_or(Value::Ref(None)))?;
            slot += 1;
        }
        for arg in args {
            frame.set_local(slot, arg)?;
            slot += 1;
        }

        while frame.ip < method.instructions.len() {
            if let Some(budget) = self.options.max_steps {
                self.steps += 1;
                if self.steps > budget {
                    return Err(VmError::StepBudgetExceeded(budget));
                }
            }

            let instr = &method.instructions[frame.ip];
            match self.dispatch(&mut frame, instr)? {
                OpcodeResult::Continue => frame.ip += 1,
                OpcodeResult::Jump(target) => frame.ip = target,
                OpcodeResult::Return(value) => return Ok(MethodOutcome::Returned(value)),
                OpcodeResult::Throw(exception) => {
                    if self.resume_at_handler(&mut frame, method, exception) {
                        continue;
                    }
                    return Ok(MethodOutcome::Threw(exception));
                }
            }
        }

        // Pointer ran past the end: implicit void return.
        Ok(MethodOutcome::Returned(Value::Void))
    }

    /// Scan the frame's handler table for an entry covering the throwing
    /// instruction whose type matches the thrown object (or is a
    /// catch-all). On match the operand stack is reset to exactly the
    /// thrown reference and the pointer moves to the handler target.
    fn resume_at_handler(
        &mut self,
        frame: &mut Frame,
        method: &MethodDef,
        exception: Handle,
    ) -> bool {
        for handler in &method.exception_handlers {
            if frame.ip < handler.start || frame.ip >= handler.end {
                continue;
            }
            if !self.handler_type_matches(handler.catch_type.as_deref(), exception) {
                continue;
            }
            trace!(
                ip = frame.ip,
                target = handler.handler,
                "guest exception caught by handler table"
            );
            frame.stack.clear();
            frame.push(Value::Ref(Some(exception)));
            frame.ip = handler.handler;
            return true;
        }
        false
    }

    fn handler_type_matches(&self, catch_type: Option<&str>, exception: Handle) -> bool {
        let Some(target) = catch_type else {
            // Untyped entries are catch-alls.
            return true;
        };
        match self.heap.runtime_class_name(exception) {
            Some(class_name) => self.classes.is_subclass_of(class_name, target),
            // Arrays carry no class tag; only java/lang/Object matches.
            None => crate::class::normalize_class_name(target) == "java/lang/Object",
        }
    }

    /// Execute a single instruction. The match is exhaustive over the closed
    /// opcode set: an opcode without an execution rule is a compile error,
    /// not a runtime fallback.
    fn dispatch(&mut self, frame: &mut Frame, instr: &Instruction) -> VmResult<OpcodeResult> {
        match instr.op {
            // =========================================================
            // Constants & Stack Manipulation
            // =========================================================
            Opcode::Nop
            | Opcode::AconstNull
            | Opcode::Iconst
            | Opcode::Bipush
            | Opcode::Sipush
            | Opcode::Ldc
            | Opcode::Pop
            | Opcode::Dup => self.exec_constant_ops(frame, instr),

            // =========================================================
            // Locals
            // =========================================================
            Opcode::Iload | Opcode::Aload | Opcode::Istore | Opcode::Astore | Opcode::Iinc => {
                self.exec_variable_ops(frame, instr)
            }

            // =========================================================
            // Integer Arithmetic & Bitwise
            // =========================================================
            Opcode::Iadd
            | Opcode::Isub
            | Opcode::Imul
            | Opcode::Idiv
            | Opcode::Irem
            | Opcode::Ineg
            | Opcode::Iand
            | Opcode::Ior
            | Opcode::Ixor => self.exec_arithmetic_ops(frame, instr),

            // =========================================================
            // Objects & Fields
            // =========================================================
            Opcode::New
            | Opcode::Getstatic
            | Opcode::Putstatic
            | Opcode::Getfield
            | Opcode::Putfield => self.exec_object_ops(frame, instr),

            // =========================================================
            // Arrays
            // =========================================================
            Opcode::Newarray
            | Opcode::Anewarray
            | Opcode::Arraylength
            | Opcode::Iaload
            | Opcode::Laload
            | Opcode::Faload
            | Opcode::Daload
            | Opcode::Baload
            | Opcode::Caload
            | Opcode::Saload
            | Opcode::Aaload
            | Opcode::Iastore
            | Opcode::Lastore
            | Opcode::Fastore
            | Opcode::Dastore
            | Opcode::Bastore
            | Opcode::Castore
            | Opcode::Sastore
            | Opcode::Aastore => self.exec_array_ops(frame, instr),

            // =========================================================
            // Control Flow, Returns, Throw
            // =========================================================
            Opcode::Goto
            | Opcode::IfIcmpeq
            | Opcode::IfIcmpne
            | Opcode::IfIcmplt
            | Opcode::IfIcmple
            | Opcode::IfIcmpgt
            | Opcode::IfIcmpge
            | Opcode::Ifeq
            | Opcode::Ifne
            | Opcode::Iflt
            | Opcode::Ifle
            | Opcode::Ifgt
            | Opcode::Ifge
            | Opcode::Return
            | Opcode::Ireturn
            | Opcode::Areturn
            | Opcode::Athrow => self.exec_control_flow_ops(frame, instr),

            // =========================================================
            // Invokes
            // =========================================================
            Opcode::Invokestatic | Opcode::Invokevirtual | Opcode::Invokespecial => {
                self.exec_call_ops(frame, instr)
            }
        }
    }
}
