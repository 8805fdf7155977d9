use tracing::{debug, trace};

use crate::bridge::BridgeArgs;
use crate::class::normalize_class_name;
use crate::descriptor;
use crate::interpreter::{Frame, MethodOutcome, OpcodeResult};
use crate::opcode::{Instruction, MemberRef, Opcode};
use crate::value::{RawValue, Value};
use crate::vm::Vm;
use crate::{VmError, VmResult};

impl Vm {
    /// Invoke instructions. A bridge registered for the exact
    /// `(class, "name:descriptor")` key always wins over bytecode on static
    /// and virtual calls; special calls (constructors, private dispatch)
    /// only ever resolve bytecode. A `Throw` signal from the callee
    /// propagates to this frame's loop untouched.
    pub(in crate::interpreter) fn exec_call_ops(
        &mut self,
        frame: &mut Frame,
        instr: &Instruction,
    ) -> VmResult<OpcodeResult> {
        let member = instr.member_arg()?.clone();
        let call_args = self.collect_call_arguments(frame, &member.descriptor)?;

        match instr.op {
            Opcode::Invokestatic => {
                if let Some(bridge) =
                    self.bridges
                        .get(&member.class_name, &member.name, &member.descriptor)
                {
                    debug!(class = %member.class_name, method = %member.name, "static bridge dispatch");
                    let raw_args: Vec<RawValue> =
                        call_args.iter().map(|v| self.unwrap_value(v)).collect();
                    let result = bridge(
                        &mut self.heap,
                        BridgeArgs {
                            receiver: None,
                            args: &raw_args,
                        },
                    )?;
                    self.push_raw_return(frame, &member.descriptor, &result)?;
                    return Ok(OpcodeResult::Continue);
                }

                let method = self
                    .classes
                    .lookup_method(&member.class_name, &member.name, &member.descriptor)
                    .ok_or_else(|| missing_target(&member))?;
                match self.execute_method(&method, call_args, None)? {
                    MethodOutcome::Returned(value) => {
                        self.push_wrapped_return(frame, &member.descriptor, value)?;
                        Ok(OpcodeResult::Continue)
                    }
                    MethodOutcome::Threw(exception) => Ok(OpcodeResult::Throw(exception)),
                }
            }

            Opcode::Invokevirtual => {
                let receiver = frame.pop_ref()?;

                if let Some(bridge) =
                    self.bridges
                        .get(&member.class_name, &member.name, &member.descriptor)
                {
                    debug!(class = %member.class_name, method = %member.name, "virtual bridge dispatch");
                    let raw_receiver = self.unwrap_value(&Value::Ref(receiver));
                    let raw_args: Vec<RawValue> =
                        call_args.iter().map(|v| self.unwrap_value(v)).collect();
                    let result = bridge(
                        &mut self.heap,
                        BridgeArgs {
                            receiver: Some(raw_receiver),
                            args: &raw_args,
                        },
                    )?;
                    self.push_raw_return(frame, &member.descriptor, &result)?;
                    return Ok(OpcodeResult::Continue);
                }

                let runtime_class = receiver
                    .and_then(|handle| self.heap.runtime_class_name(handle))
                    .unwrap_or(member.class_name.as_str())
                    .to_string();
                let method = self
                    .classes
                    .resolve_virtual_target(
                        &runtime_class,
                        &member.class_name,
                        &member.name,
                        &member.descriptor,
                    )
                    .ok_or_else(|| missing_target(&member))?;
                match self.execute_method(&method, call_args, Some(Value::Ref(receiver)))? {
                    MethodOutcome::Returned(value) => {
                        self.push_wrapped_return(frame, &member.descriptor, value)?;
                        Ok(OpcodeResult::Continue)
                    }
                    MethodOutcome::Threw(exception) => Ok(OpcodeResult::Throw(exception)),
                }
            }

            Opcode::Invokespecial => {
                let receiver = frame.pop_ref()?;

                let Some(method) =
                    self.classes
                        .lookup_method(&member.class_name, &member.name, &member.descriptor)
                else {
                    // Missing java/lang/Object.<init> is the implicit
                    // trivial constructor; every other missing special
                    // target is host-fatal.
                    if normalize_class_name(&member.class_name) == "java/lang/Object"
                        && member.name == "<init>"
                    {
                        return Ok(OpcodeResult::Continue);
                    }
                    return Err(missing_target(&member));
                };
                match self.execute_method(&method, call_args, Some(Value::Ref(receiver)))? {
                    MethodOutcome::Returned(value) => {
                        self.push_wrapped_return(frame, &member.descriptor, value)?;
                        Ok(OpcodeResult::Continue)
                    }
                    MethodOutcome::Threw(exception) => Ok(OpcodeResult::Throw(exception)),
                }
            }

            _ => unreachable!("not an invoke opcode: {:?}", instr.op),
        }
    }

    /// Pop the callee's arguments (they sit last-argument-topmost) and
    /// convert each to its declared parameter kind.
    fn collect_call_arguments(
        &mut self,
        frame: &mut Frame,
        descriptor: &str,
    ) -> VmResult<Vec<Value>> {
        let arg_types = descriptor::parse_argument_types(descriptor)?;
        trace!(descriptor, count = arg_types.len(), "collecting call arguments");
        let mut args = vec![Value::Void; arg_types.len()];
        for (i, token) in arg_types.iter().enumerate().rev() {
            let value = frame.pop()?;
            args[i] = value.convert(descriptor::kind_of(token))?;
        }
        Ok(args)
    }

    /// Re-wrap a bridge's raw result per the descriptor's return type and
    /// push it; `void` results are discarded.
    fn push_raw_return(
        &mut self,
        frame: &mut Frame,
        descriptor: &str,
        raw: &RawValue,
    ) -> VmResult<()> {
        let return_token = descriptor::return_type(descriptor)?.to_string();
        if return_token == "V" {
            return Ok(());
        }
        let value = self.wrap_from_type(&return_token, raw)?;
        frame.push(value);
        Ok(())
    }

    /// Push a bytecode callee's completion value, converted to the declared
    /// return kind; `void` returns push nothing.
    fn push_wrapped_return(
        &mut self,
        frame: &mut Frame,
        descriptor: &str,
        value: Value,
    ) -> VmResult<()> {
        let return_token = descriptor::return_type(descriptor)?;
        let kind = descriptor::kind_of(return_token);
        if kind == crate::descriptor::Kind::Void {
            return Ok(());
        }
        frame.push(value.convert(kind)?);
        Ok(())
    }
}

fn missing_target(member: &MemberRef) -> VmError {
    VmError::MissingInvokeTarget {
        class_name: member.class_name.clone(),
        method_name: member.name.clone(),
        descriptor: member.descriptor.clone(),
    }
}
