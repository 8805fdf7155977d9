//! LiteVM core runtime
//!
//! This crate provides a minimal bytecode virtual machine:
//! - Class manifest registry with superclass-chain method resolution
//! - Tagged value model with JVM descriptor-driven coercion
//! - Monotonic heap of objects, arrays, and interned strings
//! - Bytecode interpreter with guest exception handler tables
//! - Bridge registry dispatching native host functions by (class, signature)

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bridge;
pub mod class;
pub mod descriptor;
pub mod heap;
pub mod interpreter;
pub mod opcode;
pub mod value;
pub mod vm;

pub use bridge::{BridgeArgs, BridgeHandler, BridgeRegistry};
pub use class::{
    ClassEntry, ClassMetadata, ClassRegistry, ExceptionHandler, FieldEntry, FieldMetadata,
    Manifest, MethodEntry, MethodMetadata,
};
pub use descriptor::Kind;
pub use heap::{Handle, Heap, HeapEntity};
pub use opcode::{ConstOperand, Instruction, MemberRef, Opcode, Operand, TypeRef};
pub use value::{RawValue, Value};
pub use vm::{Vm, VmOptions};

/// VM execution errors
///
/// Every variant except [`VmError::UncaughtException`] is host-fatal: it marks
/// a malformed program or API misuse, aborts the top-level invocation, and is
/// never visible to guest handler tables. `UncaughtException` is the top-level
/// rendering of a guest `throw` that escaped the outermost frame; it carries
/// the original exception object so callers can inspect it.
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// Operand stack popped while empty
    #[error("Stack underflow")]
    StackUnderflow,

    /// Value kind mismatch (e.g. arithmetic on a reference)
    #[error("Type error: {0}")]
    TypeError(String),

    /// Unterminated or otherwise unparsable type descriptor
    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// Class name not present in the manifest
    #[error("Unknown class {0}")]
    UnknownClass(String),

    /// Method not found anywhere on the superclass chain
    #[error("Unknown method {class_name}.{method_name}{descriptor}")]
    UnknownMethod {
        /// Class the lookup started from
        class_name: String,
        /// Method name
        method_name: String,
        /// Method descriptor
        descriptor: String,
    },

    /// Invoke instruction found neither a bridge nor a bytecode target
    #[error("Missing invoke target {class_name}.{method_name}{descriptor}")]
    MissingInvokeTarget {
        /// Declared class of the call site
        class_name: String,
        /// Method name
        method_name: String,
        /// Method descriptor
        descriptor: String,
    },

    /// Argument count does not match the descriptor's parameter count
    #[error("Expected {expected} arguments but received {actual}")]
    ArityMismatch {
        /// Parameter count from the descriptor
        expected: usize,
        /// Arguments supplied by the caller
        actual: usize,
    },

    /// Field access on something that is not an object
    #[error("Expected an object, found {0}")]
    NotAnObject(String),

    /// Array access on something that is not an array
    #[error("Expected an array, found {0}")]
    NotAnArray(String),

    /// Array index outside `[0, length)`
    #[error("Array index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// Requested index
        index: i32,
        /// Array length
        length: usize,
    },

    /// Array allocation with a negative length
    #[error("Negative array length {0}")]
    NegativeArrayLength(i32),

    /// Instruction operand has the wrong shape for its opcode
    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    /// Local slot index outside the frame's `max_locals`
    #[error("Local index {0} out of range")]
    InvalidLocal(usize),

    /// Configured step budget exhausted without the method completing
    #[error("Step budget of {0} instructions exceeded")]
    StepBudgetExceeded(u64),

    /// A guest exception escaped the outermost frame
    #[error("Uncaught guest exception {class_name}: {message}")]
    UncaughtException {
        /// Runtime class of the thrown object
        class_name: String,
        /// Contents of its `message` field, if any
        message: String,
        /// Heap handle of the original exception object
        exception: Handle,
    },
}

/// VM result alias
pub type VmResult<T> = Result<T, VmError>;
