//! Bridge dispatch
//!
//! A bridge is a host-provided native function standing in for a bytecode
//! method body, keyed by `(class name, "methodName:descriptor")`. The
//! registry is populated at setup and read-only during execution; on static
//! and virtual invokes it is consulted before any bytecode lookup.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::class::normalize_class_name;
use crate::heap::Heap;
use crate::value::RawValue;
use crate::VmResult;

/// Raw call payload handed to a bridge: unwrapped arguments plus, for
/// virtual bridges, the unwrapped receiver.
#[derive(Debug)]
pub struct BridgeArgs<'a> {
    /// Receiver for virtual calls, `None` for static calls
    pub receiver: Option<RawValue>,
    /// Unwrapped arguments in declaration order
    pub args: &'a [RawValue],
}

/// Native handler. Receives the heap so it can allocate result objects or
/// read string arguments; returns a raw result that the engine re-wraps per
/// the descriptor's return type (discarded for `void` descriptors).
pub type BridgeHandler = Rc<dyn Fn(&mut Heap, BridgeArgs<'_>) -> VmResult<RawValue>>;

/// Registry mapping `(class, signature)` to native handlers.
#[derive(Default)]
pub struct BridgeRegistry {
    handlers: FxHashMap<(String, String), BridgeHandler>,
}

impl std::fmt::Debug for BridgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BridgeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `className` and a `"methodName:descriptor"`
    /// signature. A later registration for the same key replaces the
    /// earlier one.
    pub fn register(&mut self, class_name: &str, signature: &str, handler: BridgeHandler) {
        self.handlers.insert(
            (normalize_class_name(class_name), signature.to_string()),
            handler,
        );
    }

    /// Handler for an exact `(class, method, descriptor)` key, if any.
    pub fn get(
        &self,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
    ) -> Option<BridgeHandler> {
        let key = (
            normalize_class_name(class_name),
            format!("{method_name}:{descriptor}"),
        );
        self.handlers.get(&key).cloned()
    }

    /// Registered `(class, signature)` keys, for diagnostics.
    pub fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.handlers
            .keys()
            .map(|(class, signature)| (class.as_str(), signature.as_str()))
    }
}
