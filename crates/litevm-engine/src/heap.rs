//! Heap and object model
//!
//! The heap is an arena of entities addressed by integer [`Handle`]s.
//! Handles are stable, cheap to copy, and never dangle: allocation is
//! monotonic and nothing is ever freed for the lifetime of the runtime
//! instance (there is no collector). Entities are an explicit tagged variant
//! over `Object`, `Array`, and `Str` — checked structurally, never by
//! property probing.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::class::normalize_class_name;
use crate::descriptor::kind_of;
use crate::value::RawValue;
use crate::{VmError, VmResult};

/// Class name every interned string entity reports.
pub const STRING_CLASS: &str = "java/lang/String";

/// Stable integer id of a heap entity. Ids start at 1; they are unique for
/// the lifetime of the runtime instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(u64);

impl Handle {
    /// Construct from a raw id.
    pub fn from_raw(id: u64) -> Self {
        Handle(id)
    }

    /// Raw id.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Object record: class tag plus lazily populated field storage.
#[derive(Debug)]
pub struct HeapObject {
    /// Normalized runtime class name
    pub class_name: String,
    /// Field storage; unset fields materialize their descriptor default on
    /// first read
    pub fields: FxHashMap<String, RawValue>,
}

/// Array record: component descriptor plus fixed-length data.
#[derive(Debug)]
pub struct HeapArray {
    /// Component type descriptor
    pub component: String,
    /// Element storage, pre-filled with the component default
    pub data: Vec<RawValue>,
}

/// Tagged heap entity.
#[derive(Debug)]
pub enum HeapEntity {
    /// Class instance
    Object(HeapObject),
    /// Primitive or reference array
    Array(HeapArray),
    /// Interned string
    Str(String),
}

impl HeapEntity {
    fn kind_name(&self) -> &'static str {
        match self {
            HeapEntity::Object(_) => "object",
            HeapEntity::Array(_) => "array",
            HeapEntity::Str(_) => "string",
        }
    }
}

/// Arena of heap entities owned by one runtime instance.
#[derive(Debug, Default)]
pub struct Heap {
    entities: Vec<HeapEntity>,
}

impl Heap {
    /// Empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entity: HeapEntity) -> Handle {
        self.entities.push(entity);
        Handle(self.entities.len() as u64)
    }

    /// Entity behind a handle. A handle this heap never issued is host-fatal.
    pub fn entity(&self, handle: Handle) -> VmResult<&HeapEntity> {
        self.entities
            .get(handle.0.wrapping_sub(1) as usize)
            .ok_or_else(|| VmError::TypeError(format!("invalid heap handle {handle}")))
    }

    fn entity_mut(&mut self, handle: Handle) -> VmResult<&mut HeapEntity> {
        self.entities
            .get_mut(handle.0.wrapping_sub(1) as usize)
            .ok_or_else(|| VmError::TypeError(format!("invalid heap handle {handle}")))
    }

    /// Allocate an object with empty field storage.
    pub fn allocate_object(&mut self, class_name: &str) -> Handle {
        self.push(HeapEntity::Object(HeapObject {
            class_name: normalize_class_name(class_name),
            fields: FxHashMap::default(),
        }))
    }

    /// Allocate an array of `length` slots pre-filled with the component
    /// kind's default. A negative length is host-fatal.
    pub fn allocate_array(&mut self, component: &str, length: i32) -> VmResult<Handle> {
        if length < 0 {
            return Err(VmError::NegativeArrayLength(length));
        }
        let default = kind_of(component).default_raw();
        Ok(self.push(HeapEntity::Array(HeapArray {
            component: component.to_string(),
            data: vec![default; length as usize],
        })))
    }

    /// Intern a string as a heap entity.
    pub fn intern_string(&mut self, text: &str) -> Handle {
        self.push(HeapEntity::Str(text.to_string()))
    }

    /// Text of a string entity, if the handle points at one.
    pub fn string_value(&self, handle: Handle) -> Option<&str> {
        match self.entity(handle).ok()? {
            HeapEntity::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Runtime class name of an entity: the class tag for objects,
    /// `java/lang/String` for interned strings, none for arrays.
    pub fn runtime_class_name(&self, handle: Handle) -> Option<&str> {
        match self.entity(handle).ok()? {
            HeapEntity::Object(object) => Some(&object.class_name),
            HeapEntity::Str(_) => Some(STRING_CLASS),
            HeapEntity::Array(_) => None,
        }
    }

    fn object_mut(&mut self, handle: Handle) -> VmResult<&mut HeapObject> {
        match self.entity_mut(handle)? {
            HeapEntity::Object(object) => Ok(object),
            other => Err(VmError::NotAnObject(other.kind_name().to_string())),
        }
    }

    /// Read an instance field. An unset field is initialized to the
    /// descriptor's default and that default persists, so repeated reads are
    /// stable.
    pub fn get_instance_field(
        &mut self,
        handle: Handle,
        field_name: &str,
        descriptor: &str,
    ) -> VmResult<RawValue> {
        let default = kind_of(descriptor).default_raw();
        let object = self.object_mut(handle)?;
        Ok(object
            .fields
            .entry(field_name.to_string())
            .or_insert(default)
            .clone())
    }

    /// Write an instance field.
    pub fn set_instance_field(
        &mut self,
        handle: Handle,
        field_name: &str,
        value: RawValue,
    ) -> VmResult<()> {
        let object = self.object_mut(handle)?;
        object.fields.insert(field_name.to_string(), value);
        Ok(())
    }

    fn array(&self, handle: Handle) -> VmResult<&HeapArray> {
        match self.entity(handle)? {
            HeapEntity::Array(array) => Ok(array),
            other => Err(VmError::NotAnArray(other.kind_name().to_string())),
        }
    }

    fn array_slot(&mut self, handle: Handle, index: i32) -> VmResult<&mut RawValue> {
        match self.entity_mut(handle)? {
            HeapEntity::Array(array) => {
                let length = array.data.len();
                if index < 0 || index as usize >= length {
                    return Err(VmError::IndexOutOfBounds { index, length });
                }
                Ok(&mut array.data[index as usize])
            }
            other => Err(VmError::NotAnArray(other.kind_name().to_string())),
        }
    }

    /// Array length; non-arrays are host-fatal.
    pub fn array_length(&self, handle: Handle) -> VmResult<usize> {
        Ok(self.array(handle)?.data.len())
    }

    /// Bounds-checked array load, narrowed per the component character of
    /// the load instruction (`I`/`B`/`S`/`C` integral, `Z` to 0/1).
    pub fn array_load(&mut self, handle: Handle, component: char, index: i32) -> VmResult<RawValue> {
        let value = self.array_slot(handle, index)?.clone();
        Ok(match component {
            'I' | 'B' | 'S' | 'C' => RawValue::Int(value.to_i32()),
            'Z' => RawValue::Int(if value.to_i32() != 0 { 1 } else { 0 }),
            _ => value,
        })
    }

    /// Bounds-checked array store; the incoming raw value is coerced to the
    /// component kind before writing. `byte` slots mask to 8 bits, `long`
    /// slots promote to 64-bit, `float` slots round to single precision,
    /// `double` slots keep full precision.
    pub fn array_store(
        &mut self,
        handle: Handle,
        component: char,
        index: i32,
        value: RawValue,
    ) -> VmResult<()> {
        let coerced = match component {
            'I' | 'S' | 'C' => RawValue::Int(value.to_i32()),
            'B' => RawValue::Int(value.to_i32() & 0xff),
            'Z' => RawValue::Int(if value.to_i32() != 0 { 1 } else { 0 }),
            'J' => RawValue::Long(value.to_i64()),
            'F' => RawValue::Float(value.to_f64() as f32),
            'D' => RawValue::Double(value.to_f64()),
            _ => value,
        };
        *self.array_slot(handle, index)? = coerced;
        Ok(())
    }
}
