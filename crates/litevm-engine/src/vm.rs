//! Runtime facade
//!
//! One [`Vm`] owns every piece of mutable runtime state: the class registry
//! (immutable after bootstrap), the heap, the static field table, and the
//! bridge registry. They are explicit instance fields, never globals, so
//! independent runtime instances coexist without interference. Execution is
//! single-threaded and fully synchronous; nested invokes recurse on the
//! caller's own call path.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::bridge::{BridgeHandler, BridgeRegistry};
use crate::class::{normalize_class_name, ClassMetadata, ClassRegistry, Manifest};
use crate::descriptor::{self, Kind};
use crate::heap::{Handle, Heap};
use crate::interpreter::MethodOutcome;
use crate::value::{RawValue, Value};
use crate::{VmError, VmResult};

/// Tunables for one runtime instance.
#[derive(Debug, Clone, Default)]
pub struct VmOptions {
    /// Optional instruction budget per top-level invocation; a safety net
    /// against manifests that branch forever. `None` means unlimited.
    pub max_steps: Option<u64>,
}

/// A LiteVM runtime instance.
pub struct Vm {
    pub(crate) classes: ClassRegistry,
    pub(crate) heap: Heap,
    pub(crate) statics: FxHashMap<(String, String), RawValue>,
    pub(crate) bridges: BridgeRegistry,
    pub(crate) options: VmOptions,
    pub(crate) steps: u64,
}

impl Vm {
    /// Build a runtime from a manifest with default options.
    pub fn bootstrap(manifest: Manifest) -> Self {
        Self::bootstrap_with_options(manifest, VmOptions::default())
    }

    /// Build a runtime from a manifest.
    pub fn bootstrap_with_options(manifest: Manifest, options: VmOptions) -> Self {
        Self {
            classes: ClassRegistry::from_manifest(manifest),
            heap: Heap::new(),
            statics: FxHashMap::default(),
            bridges: BridgeRegistry::new(),
            options,
            steps: 0,
        }
    }

    /// Register a native handler under `(className, "methodName:descriptor")`.
    pub fn register_bridge(&mut self, class_name: &str, signature: &str, handler: BridgeHandler) {
        debug!(class = class_name, signature, "bridge registered");
        self.bridges.register(class_name, signature, handler);
    }

    /// The heap, for hosts that need to allocate receivers or inspect
    /// results.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable heap access for hosts.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Names of all registered classes.
    pub fn list_classes(&self) -> Vec<String> {
        self.classes.list_classes()
    }

    /// Defensive-copy metadata snapshot of one class.
    pub fn get_class_metadata(&self, class_name: &str) -> Option<ClassMetadata> {
        self.classes.metadata(class_name)
    }

    /// Invoke a static method and return its raw unwrapped result.
    ///
    /// Host-fatal conditions (unknown method, argument arity mismatch, any
    /// malformed-program fault hit during execution) surface as their own
    /// [`VmError`] variants; a guest exception nobody caught surfaces as
    /// [`VmError::UncaughtException`].
    pub fn invoke_static(
        &mut self,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
        raw_args: &[RawValue],
    ) -> VmResult<RawValue> {
        let method = self
            .classes
            .lookup_method(class_name, method_name, descriptor)
            .ok_or_else(|| VmError::UnknownMethod {
                class_name: class_name.to_string(),
                method_name: method_name.to_string(),
                descriptor: descriptor.to_string(),
            })?;
        let args = self.wrap_args_from_descriptor(descriptor, raw_args)?;
        self.steps = 0;
        match self.execute_method(&method, args, None)? {
            MethodOutcome::Returned(value) => Ok(self.unwrap_value(&value)),
            MethodOutcome::Threw(exception) => Err(self.uncaught_exception(exception)),
        }
    }

    /// Invoke a virtual method on `receiver` and return its raw unwrapped
    /// result. Resolution starts at the receiver's runtime class and falls
    /// back to the declared class.
    pub fn invoke_virtual(
        &mut self,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
        receiver: Handle,
        raw_args: &[RawValue],
    ) -> VmResult<RawValue> {
        let runtime_class = self
            .heap
            .runtime_class_name(receiver)
            .unwrap_or(class_name)
            .to_string();
        let method = self
            .classes
            .resolve_virtual_target(&runtime_class, class_name, method_name, descriptor)
            .ok_or_else(|| VmError::UnknownMethod {
                class_name: class_name.to_string(),
                method_name: method_name.to_string(),
                descriptor: descriptor.to_string(),
            })?;
        let args = self.wrap_args_from_descriptor(descriptor, raw_args)?;
        self.steps = 0;
        match self.execute_method(&method, args, Some(Value::Ref(Some(receiver))))? {
            MethodOutcome::Returned(value) => Ok(self.unwrap_value(&value)),
            MethodOutcome::Threw(exception) => Err(self.uncaught_exception(exception)),
        }
    }

    // ===== Value boundary helpers =====

    /// Wrap a raw datum per a type descriptor, interning raw strings into
    /// the heap when the target is a reference.
    pub(crate) fn wrap_from_type(&mut self, type_token: &str, raw: &RawValue) -> VmResult<Value> {
        self.wrap_raw(descriptor::kind_of(type_token), raw)
    }

    pub(crate) fn wrap_raw(&mut self, kind: Kind, raw: &RawValue) -> VmResult<Value> {
        if kind == Kind::Ref {
            if let RawValue::Str(text) = raw {
                let handle = self.heap.intern_string(text);
                return Ok(Value::Ref(Some(handle)));
            }
        }
        Value::wrap(kind, raw)
    }

    /// Unwrap a value to its raw datum, resolving references to interned
    /// strings back into literal text so bridges and hosts see strings.
    pub(crate) fn unwrap_value(&self, value: &Value) -> RawValue {
        match value.unwrap_raw() {
            RawValue::Ref(handle) => match self.heap.string_value(handle) {
                Some(text) => RawValue::Str(text.to_string()),
                None => RawValue::Ref(handle),
            },
            raw => raw,
        }
    }

    /// Validate arity against the descriptor and wrap each argument to its
    /// declared parameter kind.
    pub(crate) fn wrap_args_from_descriptor(
        &mut self,
        descriptor: &str,
        raw_args: &[RawValue],
    ) -> VmResult<Vec<Value>> {
        let arg_types = descriptor::parse_argument_types(descriptor)?;
        if arg_types.len() != raw_args.len() {
            return Err(VmError::ArityMismatch {
                expected: arg_types.len(),
                actual: raw_args.len(),
            });
        }
        arg_types
            .iter()
            .zip(raw_args)
            .map(|(token, raw)| self.wrap_from_type(token, raw))
            .collect()
    }

    // ===== Static fields =====

    /// Read a static field, creating it with the descriptor default on first
    /// access. Shared across all invocations and objects.
    pub fn static_field(&mut self, class_name: &str, field_name: &str, descriptor: &str) -> RawValue {
        let key = (normalize_class_name(class_name), field_name.to_string());
        self.statics
            .entry(key)
            .or_insert_with(|| descriptor::kind_of(descriptor).default_raw())
            .clone()
    }

    /// Write a static field.
    pub fn set_static_field(&mut self, class_name: &str, field_name: &str, value: RawValue) {
        let key = (normalize_class_name(class_name), field_name.to_string());
        self.statics.insert(key, value);
    }

    // ===== Guest exceptions =====

    /// Allocate a built-in exception object carrying `message` (mirrored
    /// into `detailMessage`).
    pub(crate) fn instantiate_builtin_exception(
        &mut self,
        class_name: &str,
        message: &str,
    ) -> Handle {
        debug!(class = class_name, message, "raising built-in guest exception");
        let handle = self.heap.allocate_object(class_name);
        let object_fields = [("message", message), ("detailMessage", message)];
        for (field, text) in object_fields {
            // Fresh allocation of a known object; the writes cannot fail.
            let _ = self
                .heap
                .set_instance_field(handle, field, RawValue::Str(text.to_string()));
        }
        handle
    }

    /// Render a guest exception that escaped the outermost frame as the
    /// distinct host-visible error, carrying the original object.
    pub(crate) fn uncaught_exception(&mut self, exception: Handle) -> VmError {
        let class_name = self
            .heap
            .runtime_class_name(exception)
            .unwrap_or("java/lang/Throwable")
            .to_string();
        let message = match self.heap.get_instance_field(exception, "message", "Ljava/lang/String;")
        {
            Ok(RawValue::Str(text)) => text,
            Ok(RawValue::Ref(handle)) => self
                .heap
                .string_value(handle)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };
        VmError::UncaughtException {
            class_name,
            message,
            exception,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_fields_default_then_stick() {
        let mut vm = Vm::bootstrap(Vec::new());
        assert_eq!(vm.static_field("pkg/Counter", "value", "J"), RawValue::Long(0));
        vm.set_static_field("pkg.Counter", "value", RawValue::Long(5));
        // Spellings collapse to one key.
        assert_eq!(vm.static_field("pkg/Counter", "value", "J"), RawValue::Long(5));
    }

    #[test]
    fn test_wrap_string_interns() {
        let mut vm = Vm::bootstrap(Vec::new());
        let value = vm
            .wrap_from_type("Ljava/lang/String;", &RawValue::Str("hi".to_string()))
            .unwrap();
        let Value::Ref(Some(handle)) = value else {
            panic!("expected interned ref, got {value:?}");
        };
        assert_eq!(vm.heap.string_value(handle), Some("hi"));
        assert_eq!(vm.unwrap_value(&value), RawValue::Str("hi".to_string()));
    }

    #[test]
    fn test_builtin_exception_carries_message() {
        let mut vm = Vm::bootstrap(Vec::new());
        let handle = vm.instantiate_builtin_exception("java/lang/ArithmeticException", "Division by zero");
        let error = vm.uncaught_exception(handle);
        match error {
            VmError::UncaughtException {
                class_name,
                message,
                exception,
            } => {
                assert_eq!(class_name, "java/lang/ArithmeticException");
                assert_eq!(message, "Division by zero");
                assert_eq!(exception, handle);
            }
            other => panic!("expected UncaughtException, got {other:?}"),
        }
    }

    #[test]
    fn test_invoke_unknown_method_is_host_fatal() {
        let mut vm = Vm::bootstrap(Vec::new());
        let error = vm
            .invoke_static("Missing", "main", "()V", &[])
            .unwrap_err();
        assert!(matches!(error, VmError::UnknownMethod { .. }));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut vm = Vm::bootstrap(Vec::new());
        let error = vm
            .wrap_args_from_descriptor("(II)V", &[RawValue::Int(1)])
            .unwrap_err();
        assert!(matches!(
            error,
            VmError::ArityMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }
}
