//! Class manifest and method registry
//!
//! The registry is built once at bootstrap from an already-parsed manifest
//! and is immutable afterwards. Normalized class names (`.`/`\` collapsed to
//! `/`) are the canonical keys everywhere: registry lookups, heap class
//! tags, and bridge keys.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::opcode::Instruction;

/// Bootstrap input: an ordered sequence of class entries.
pub type Manifest = Vec<ClassEntry>;

/// One class of the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    /// Class name; separators are normalized at registration
    pub class_name: String,
    /// Superclass name; absent (or self-referential) for the root
    #[serde(default)]
    pub super_name: Option<String>,
    /// Declared fields
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
    /// Declared methods
    #[serde(default)]
    pub methods: Vec<MethodEntry>,
}

/// Field declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEntry {
    /// Field name
    pub name: String,
    /// JVM type descriptor
    pub descriptor: String,
    /// Access flags (`ACC_STATIC`, ...)
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Method declaration with its flat instruction body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodEntry {
    /// Method name
    pub name: String,
    /// JVM method descriptor
    pub descriptor: String,
    /// Access flags; `ACC_STATIC` marks static methods
    #[serde(default)]
    pub flags: Vec<String>,
    /// Local slot count, including receiver and parameters
    #[serde(default)]
    pub max_locals: usize,
    /// Ordered instruction list
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    /// Guest exception handler table
    #[serde(default)]
    pub exception_handlers: Vec<ExceptionHandler>,
}

/// One handler-table entry: instructions in `[start, end)` are covered; a
/// matching throw resumes at `handler` with the thrown reference as the only
/// stack operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionHandler {
    /// First covered instruction index (inclusive)
    pub start: usize,
    /// Last covered instruction index (exclusive)
    pub end: usize,
    /// Resume target
    pub handler: usize,
    /// Exception class to match; `None` is a catch-all
    #[serde(default, rename = "type")]
    pub catch_type: Option<String>,
}

/// Registered method, immutable after load.
#[derive(Debug)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// JVM method descriptor
    pub descriptor: String,
    /// Access flags
    pub flags: Vec<String>,
    /// Local slot count
    pub max_locals: usize,
    /// Instruction body
    pub instructions: Vec<Instruction>,
    /// Handler table
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodDef {
    /// Whether the method carries `ACC_STATIC`.
    pub fn is_static(&self) -> bool {
        self.flags.iter().any(|f| f == "ACC_STATIC")
    }
}

/// Registered class, immutable after load.
#[derive(Debug)]
pub struct ClassDef {
    /// Normalized class name
    pub name: String,
    /// Normalized superclass name, if any
    pub super_name: Option<String>,
    /// Methods keyed by (name, descriptor)
    methods: FxHashMap<(String, String), Arc<MethodDef>>,
    /// Field metadata in declaration order
    pub fields: Vec<FieldMetadata>,
}

/// Read-only method signature snapshot for external tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadata {
    /// Method name
    pub name: String,
    /// JVM method descriptor
    pub descriptor: String,
    /// Access flags
    pub flags: Vec<String>,
}

/// Read-only field signature snapshot for external tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    /// Field name
    pub name: String,
    /// JVM type descriptor
    pub descriptor: String,
    /// Access flags
    pub flags: Vec<String>,
}

/// Defensive-copy class snapshot for external tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMetadata {
    /// Normalized class name
    pub class_name: String,
    /// Normalized superclass name, if any
    pub super_name: Option<String>,
    /// Method signatures
    pub methods: Vec<MethodMetadata>,
    /// Field signatures
    pub fields: Vec<FieldMetadata>,
}

/// Collapse `.` and `\` separators to `/` so two spellings of the same class
/// always hit one registry key.
pub fn normalize_class_name(name: &str) -> String {
    name.replace(['.', '\\'], "/")
}

/// Class table with superclass-chain method resolution.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: FxHashMap<String, ClassDef>,
}

impl ClassRegistry {
    /// Build the immutable class table from a manifest.
    pub fn from_manifest(manifest: Manifest) -> Self {
        let mut classes = FxHashMap::default();
        for entry in manifest {
            let name = normalize_class_name(&entry.class_name);
            let super_name = entry.super_name.as_deref().map(normalize_class_name);

            let mut methods = FxHashMap::default();
            for method in entry.methods {
                methods.insert(
                    (method.name.clone(), method.descriptor.clone()),
                    Arc::new(MethodDef {
                        name: method.name,
                        descriptor: method.descriptor,
                        flags: method.flags,
                        max_locals: method.max_locals,
                        instructions: method.instructions,
                        exception_handlers: method.exception_handlers,
                    }),
                );
            }

            let fields = entry
                .fields
                .into_iter()
                .map(|f| FieldMetadata {
                    name: f.name,
                    descriptor: f.descriptor,
                    flags: f.flags,
                })
                .collect();

            classes.insert(
                name.clone(),
                ClassDef {
                    name,
                    super_name,
                    methods,
                    fields,
                },
            );
        }
        Self { classes }
    }

    /// Look a class up by (possibly unnormalized) name.
    pub fn get(&self, class_name: &str) -> Option<&ClassDef> {
        self.classes.get(&normalize_class_name(class_name))
    }

    /// Walk the superclass chain starting at `class_name`, returning the
    /// first method matching (name, descriptor). Stops when a class has no
    /// super or its super names itself (cycle guard). Absence is not an
    /// error.
    pub fn lookup_method(
        &self,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
    ) -> Option<Arc<MethodDef>> {
        let key = (method_name.to_string(), descriptor.to_string());
        let mut current = self.get(class_name);
        while let Some(class) = current {
            if let Some(method) = class.methods.get(&key) {
                return Some(Arc::clone(method));
            }
            match &class.super_name {
                Some(super_name) if *super_name != class.name => {
                    current = self.get(super_name);
                }
                _ => break,
            }
        }
        None
    }

    /// Resolve a virtual call: runtime (dynamic) class first, then the
    /// statically declared class as a fallback for receivers whose exact
    /// class is unknown.
    pub fn resolve_virtual_target(
        &self,
        runtime_class: &str,
        declared_class: &str,
        method_name: &str,
        descriptor: &str,
    ) -> Option<Arc<MethodDef>> {
        if let Some(method) = self.lookup_method(runtime_class, method_name, descriptor) {
            return Some(method);
        }
        if normalize_class_name(declared_class) != normalize_class_name(runtime_class) {
            return self.lookup_method(declared_class, method_name, descriptor);
        }
        None
    }

    /// Whether `class_name` is `target` or inherits from it. Walks the same
    /// chain as [`ClassRegistry::lookup_method`]; `java/lang/Object` matches
    /// everything. Used for exception-handler type matching.
    pub fn is_subclass_of(&self, class_name: &str, target: &str) -> bool {
        let target = normalize_class_name(target);
        if target == "java/lang/Object" {
            return true;
        }
        let mut current_name = normalize_class_name(class_name);
        loop {
            if current_name == target {
                return true;
            }
            match self.classes.get(&current_name) {
                Some(class) => match &class.super_name {
                    Some(super_name) if *super_name != class.name => {
                        current_name = super_name.clone();
                    }
                    _ => return false,
                },
                None => return false,
            }
        }
    }

    /// Names of all registered classes.
    pub fn list_classes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Defensive-copy snapshot of one class, or `None` if unregistered.
    pub fn metadata(&self, class_name: &str) -> Option<ClassMetadata> {
        let class = self.get(class_name)?;
        let mut methods: Vec<MethodMetadata> = class
            .methods
            .values()
            .map(|m| MethodMetadata {
                name: m.name.clone(),
                descriptor: m.descriptor.clone(),
                flags: m.flags.clone(),
            })
            .collect();
        methods.sort_by(|a, b| (&a.name, &a.descriptor).cmp(&(&b.name, &b.descriptor)));
        Some(ClassMetadata {
            class_name: class.name.clone(),
            super_name: class.super_name.clone(),
            methods,
            fields: class.fields.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, descriptor: &str) -> MethodEntry {
        MethodEntry {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            flags: vec!["ACC_STATIC".to_string()],
            max_locals: 0,
            instructions: Vec::new(),
            exception_handlers: Vec::new(),
        }
    }

    fn class(name: &str, super_name: Option<&str>, methods: Vec<MethodEntry>) -> ClassEntry {
        ClassEntry {
            class_name: name.to_string(),
            super_name: super_name.map(str::to_string),
            fields: Vec::new(),
            methods,
        }
    }

    #[test]
    fn test_normalized_names_collapse() {
        let registry = ClassRegistry::from_manifest(vec![class(
            "com.example.Point",
            None,
            vec![method("origin", "()V")],
        )]);
        assert!(registry.get("com/example/Point").is_some());
        assert!(registry.get("com.example.Point").is_some());
        assert!(registry
            .lookup_method("com\\example\\Point", "origin", "()V")
            .is_some());
    }

    #[test]
    fn test_lookup_walks_super_chain() {
        let registry = ClassRegistry::from_manifest(vec![
            class("Base", None, vec![method("foo", "()V")]),
            class("Derived", Some("Base"), vec![]),
        ]);
        assert!(registry.lookup_method("Derived", "foo", "()V").is_some());
        assert!(registry.lookup_method("Derived", "foo", "(I)V").is_none());
    }

    #[test]
    fn test_self_super_cycle_guard() {
        let registry = ClassRegistry::from_manifest(vec![class(
            "Loop",
            Some("Loop"),
            vec![method("foo", "()V")],
        )]);
        assert!(registry.lookup_method("Loop", "bar", "()V").is_none());
    }

    #[test]
    fn test_virtual_resolution_prefers_runtime_class() {
        let registry = ClassRegistry::from_manifest(vec![
            class("Base", None, vec![method("foo", "()V")]),
            class("Derived", Some("Base"), vec![method("foo", "()V")]),
        ]);
        let target = registry
            .resolve_virtual_target("Derived", "Base", "foo", "()V")
            .unwrap();
        // Both define foo()V; the Derived copy wins by chain order.
        assert_eq!(target.name, "foo");
        assert!(registry
            .resolve_virtual_target("Unknown", "Base", "foo", "()V")
            .is_some());
    }

    #[test]
    fn test_is_subclass_of() {
        let registry = ClassRegistry::from_manifest(vec![
            class("Base", None, vec![]),
            class("Derived", Some("Base"), vec![]),
        ]);
        assert!(registry.is_subclass_of("Derived", "Base"));
        assert!(registry.is_subclass_of("Derived", "Derived"));
        assert!(!registry.is_subclass_of("Base", "Derived"));
        assert!(registry.is_subclass_of("Base", "java/lang/Object"));
    }

    #[test]
    fn test_metadata_snapshot() {
        let registry = ClassRegistry::from_manifest(vec![ClassEntry {
            class_name: "Point".to_string(),
            super_name: None,
            fields: vec![FieldEntry {
                name: "x".to_string(),
                descriptor: "I".to_string(),
                flags: Vec::new(),
            }],
            methods: vec![method("origin", "()V")],
        }]);
        let meta = registry.metadata("Point").unwrap();
        assert_eq!(meta.class_name, "Point");
        assert_eq!(meta.fields[0].descriptor, "I");
        assert_eq!(meta.methods[0].name, "origin");
        assert!(registry.metadata("Missing").is_none());
        assert_eq!(registry.list_classes(), vec!["Point".to_string()]);
    }

    #[test]
    fn test_manifest_deserializes_from_json() {
        let json = r#"[{
            "className": "Sample",
            "superName": "java/lang/Object",
            "methods": [{
                "name": "main",
                "descriptor": "()I",
                "flags": ["ACC_STATIC"],
                "maxLocals": 1,
                "instructions": [
                    {"op": "ICONST", "args": [{"Value": 41}]},
                    {"op": "ICONST", "args": [{"Value": 1}]},
                    {"op": "IADD", "args": []},
                    {"op": "IRETURN", "args": []}
                ],
                "exceptionHandlers": [
                    {"start": 0, "end": 3, "handler": 3, "type": "java/lang/ArithmeticException"}
                ]
            }]
        }]"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        let registry = ClassRegistry::from_manifest(manifest);
        let main = registry.lookup_method("Sample", "main", "()I").unwrap();
        assert!(main.is_static());
        assert_eq!(main.instructions.len(), 4);
        assert_eq!(
            main.exception_handlers[0].catch_type.as_deref(),
            Some("java/lang/ArithmeticException")
        );
    }
}
