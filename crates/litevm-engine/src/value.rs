//! Tagged value model
//!
//! Two representations cross the engine:
//! - [`Value`] is the wrapped form living on operand stacks and in locals.
//!   It is `Copy`, so pushes and stores never alias a slot.
//! - [`RawValue`] is the unwrapped form crossing the host boundary: bridge
//!   arguments and results, field/array/static storage, and the result of a
//!   top-level invocation. `RawValue::Str` carries literal text; wrapping it
//!   as a `Ref` requires interning it into the heap first, which is the
//!   `Vm`'s job.

use crate::descriptor::Kind;
use crate::heap::Handle;
use crate::{VmError, VmResult};

/// Wrapped stack/local value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 32-bit two's-complement integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// IEEE-754 single precision
    Float(f32),
    /// IEEE-754 double precision
    Double(f64),
    /// Null or a heap handle
    Ref(Option<Handle>),
    /// No value (void return)
    Void,
}

/// Unwrapped host-boundary datum.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Null reference
    Null,
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Single-precision float
    Float(f32),
    /// Double-precision float
    Double(f64),
    /// Heap handle
    Ref(Handle),
    /// Literal text not yet interned into the heap
    Str(String),
}

/// Truncate an f64 to a 32-bit integer with modulo-2^32 semantics.
/// Non-finite inputs normalize to 0.
fn f64_to_i32(f: f64) -> i32 {
    if !f.is_finite() {
        return 0;
    }
    let t = f.trunc() % 4_294_967_296.0;
    t as i64 as i32
}

fn f64_to_i64(f: f64) -> i64 {
    if !f.is_finite() {
        return 0;
    }
    f.trunc() as i64
}

impl Kind {
    /// Default wrapped value for this kind (`0`, `null`, or void).
    pub fn default_value(self) -> Value {
        match self {
            Kind::Int => Value::Int(0),
            Kind::Long => Value::Long(0),
            Kind::Float => Value::Float(0.0),
            Kind::Double => Value::Double(0.0),
            Kind::Ref => Value::Ref(None),
            Kind::Void => Value::Void,
        }
    }

    /// Default raw datum for this kind, used for unset fields, fresh array
    /// slots, and unset statics.
    pub fn default_raw(self) -> RawValue {
        match self {
            Kind::Int => RawValue::Int(0),
            Kind::Long => RawValue::Long(0),
            Kind::Float => RawValue::Float(0.0),
            Kind::Double => RawValue::Double(0.0),
            Kind::Ref | Kind::Void => RawValue::Null,
        }
    }
}

impl RawValue {
    /// Numeric view as a 32-bit integer. References, strings, and null all
    /// coerce to 0, matching the wrap-time normalization of `Int`.
    pub fn to_i32(&self) -> i32 {
        match self {
            RawValue::Int(i) => *i,
            RawValue::Long(l) => *l as i32,
            RawValue::Float(f) => f64_to_i32(*f as f64),
            RawValue::Double(d) => f64_to_i32(*d),
            RawValue::Null | RawValue::Ref(_) | RawValue::Str(_) => 0,
        }
    }

    /// Numeric view as a 64-bit integer.
    pub fn to_i64(&self) -> i64 {
        match self {
            RawValue::Int(i) => *i as i64,
            RawValue::Long(l) => *l,
            RawValue::Float(f) => f64_to_i64(*f as f64),
            RawValue::Double(d) => f64_to_i64(*d),
            RawValue::Null | RawValue::Ref(_) | RawValue::Str(_) => 0,
        }
    }

    /// Numeric view as a double.
    pub fn to_f64(&self) -> f64 {
        match self {
            RawValue::Int(i) => *i as f64,
            RawValue::Long(l) => *l as f64,
            RawValue::Float(f) => *f as f64,
            RawValue::Double(d) => *d,
            RawValue::Null | RawValue::Ref(_) | RawValue::Str(_) => 0.0,
        }
    }

    /// Short tag name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Int(_) => "int",
            RawValue::Long(_) => "long",
            RawValue::Float(_) => "float",
            RawValue::Double(_) => "double",
            RawValue::Ref(_) => "ref",
            RawValue::Str(_) => "string",
        }
    }
}

impl Value {
    /// Kind tag of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Int(_) => Kind::Int,
            Value::Long(_) => Kind::Long,
            Value::Float(_) => Kind::Float,
            Value::Double(_) => Kind::Double,
            Value::Ref(_) => Kind::Ref,
            Value::Void => Kind::Void,
        }
    }

    /// Wrap a raw datum as the given kind, applying the kind's canonical
    /// normalization (32-bit truncation, single-precision rounding, null
    /// coalescing).
    ///
    /// `RawValue::Str` cannot be wrapped here: a string must be interned into
    /// the heap before it can become a `Ref`. Wrapping any non-reference raw
    /// as `Ref` is a host-fatal type error.
    pub fn wrap(kind: Kind, raw: &RawValue) -> VmResult<Value> {
        Ok(match kind {
            Kind::Int => Value::Int(raw.to_i32()),
            Kind::Long => Value::Long(raw.to_i64()),
            Kind::Float => Value::Float(raw.to_f64() as f32),
            Kind::Double => Value::Double(raw.to_f64()),
            Kind::Ref => match raw {
                RawValue::Null => Value::Ref(None),
                RawValue::Ref(handle) => Value::Ref(Some(*handle)),
                other => {
                    return Err(VmError::TypeError(format!(
                        "cannot wrap {} as a reference",
                        other.kind_name()
                    )))
                }
            },
            Kind::Void => Value::Void,
        })
    }

    /// Unwrap back to a raw datum. `Long` stays 64-bit; `Void` unwraps to
    /// null. The inverse of [`Value::wrap`] up to normalization.
    pub fn unwrap_raw(&self) -> RawValue {
        match self {
            Value::Int(i) => RawValue::Int(*i),
            Value::Long(l) => RawValue::Long(*l),
            Value::Float(f) => RawValue::Float(*f),
            Value::Double(d) => RawValue::Double(*d),
            Value::Ref(Some(handle)) => RawValue::Ref(*handle),
            Value::Ref(None) | Value::Void => RawValue::Null,
        }
    }

    /// Convert to a target kind: a copy if the kinds already match, otherwise
    /// unwrap-then-rewrap. Converting a non-reference to `Ref` is host-fatal.
    pub fn convert(&self, kind: Kind) -> VmResult<Value> {
        if self.kind() == kind {
            return Ok(*self);
        }
        if kind == Kind::Ref {
            return Err(VmError::TypeError(format!(
                "expected a reference, found {:?}",
                self.kind()
            )));
        }
        Value::wrap(kind, &self.unwrap_raw())
    }

    /// Integer view used by arithmetic and comparison operands.
    pub fn to_i32(&self) -> i32 {
        match self {
            Value::Int(i) => *i,
            Value::Long(l) => *l as i32,
            Value::Float(f) => f64_to_i32(*f as f64),
            Value::Double(d) => f64_to_i32(*d),
            Value::Ref(_) | Value::Void => 0,
        }
    }

    /// Reference payload, or a type error for non-reference values.
    pub fn as_ref_handle(&self) -> VmResult<Option<Handle>> {
        match self {
            Value::Ref(handle) => Ok(*handle),
            other => Err(VmError::TypeError(format!(
                "expected reference on stack, found {:?}",
                other.kind()
            ))),
        }
    }
}
