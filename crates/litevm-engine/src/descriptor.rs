//! JVM-style type descriptor parsing
//!
//! Parsing is purely lexical: a descriptor like `(I[JLjava/lang/String;)V`
//! is split into argument tokens and a return token without checking that
//! any referenced class exists.

use crate::{VmError, VmResult};
use serde::{Deserialize, Serialize};

/// Runtime value category, distinct from the full class type.
///
/// `boolean`, `byte`, `char`, `short`, and `int` all collapse to [`Kind::Int`];
/// arrays of anything (including primitives) are [`Kind::Ref`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// 32-bit two's-complement integer
    Int,
    /// 64-bit integer
    Long,
    /// IEEE-754 single precision
    Float,
    /// IEEE-754 double precision
    Double,
    /// Null or a heap handle
    Ref,
    /// No value
    Void,
}

/// Classify a single type token.
pub fn kind_of(token: &str) -> Kind {
    let Some(first) = token.chars().next() else {
        return Kind::Void;
    };
    match first {
        '[' => Kind::Ref,
        'Z' | 'B' | 'C' | 'S' | 'I' => Kind::Int,
        'J' => Kind::Long,
        'F' => Kind::Float,
        'D' => Kind::Double,
        'V' => Kind::Void,
        _ => Kind::Ref,
    }
}

/// Split a method descriptor `(ArgTypes)ReturnType` into ordered argument
/// type tokens.
pub fn parse_argument_types(descriptor: &str) -> VmResult<Vec<String>> {
    let bytes = descriptor.as_bytes();
    let open = descriptor
        .find('(')
        .ok_or_else(|| VmError::MalformedDescriptor(descriptor.to_string()))?;
    let mut types = Vec::new();
    let mut index = open + 1;
    loop {
        match bytes.get(index) {
            Some(b')') => break,
            Some(_) => {}
            None => return Err(VmError::MalformedDescriptor(descriptor.to_string())),
        }
        let start = index;
        while bytes.get(index) == Some(&b'[') {
            index += 1;
        }
        match bytes.get(index) {
            Some(b'L') => {
                while bytes.get(index) != Some(&b';') {
                    if index >= bytes.len() {
                        return Err(VmError::MalformedDescriptor(descriptor.to_string()));
                    }
                    index += 1;
                }
                index += 1;
            }
            Some(_) => index += 1,
            None => return Err(VmError::MalformedDescriptor(descriptor.to_string())),
        }
        types.push(descriptor[start..index].to_string());
    }
    Ok(types)
}

/// Return type token of a method descriptor.
pub fn return_type(descriptor: &str) -> VmResult<&str> {
    let close = descriptor
        .find(')')
        .ok_or_else(|| VmError::MalformedDescriptor(descriptor.to_string()))?;
    Ok(&descriptor[close + 1..])
}

/// Parameter count of a method descriptor.
pub fn argument_count(descriptor: &str) -> VmResult<usize> {
    Ok(parse_argument_types(descriptor)?.len())
}

/// Map a primitive token (`"int"`, `"long"`, ...) to its one-letter
/// descriptor. Used by `NEWARRAY` operands that name the component type by
/// token instead of descriptor. Unknown tokens map to `I`.
pub fn descriptor_from_primitive_token(token: &str) -> &'static str {
    match token.to_ascii_lowercase().as_str() {
        "boolean" => "Z",
        "byte" => "B",
        "char" => "C",
        "short" => "S",
        "long" => "J",
        "float" => "F",
        "double" => "D",
        _ => "I",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of_primitives() {
        assert_eq!(kind_of("I"), Kind::Int);
        assert_eq!(kind_of("Z"), Kind::Int);
        assert_eq!(kind_of("B"), Kind::Int);
        assert_eq!(kind_of("C"), Kind::Int);
        assert_eq!(kind_of("S"), Kind::Int);
        assert_eq!(kind_of("J"), Kind::Long);
        assert_eq!(kind_of("F"), Kind::Float);
        assert_eq!(kind_of("D"), Kind::Double);
        assert_eq!(kind_of("V"), Kind::Void);
    }

    #[test]
    fn test_kind_of_refs() {
        assert_eq!(kind_of("Ljava/lang/String;"), Kind::Ref);
        assert_eq!(kind_of("[I"), Kind::Ref);
        assert_eq!(kind_of("[[Ljava/lang/Object;"), Kind::Ref);
    }

    #[test]
    fn test_parse_argument_types() {
        let types = parse_argument_types("(I[JLjava/lang/String;)V").unwrap();
        assert_eq!(types, vec!["I", "[J", "Ljava/lang/String;"]);
    }

    #[test]
    fn test_parse_empty_arguments() {
        assert!(parse_argument_types("()I").unwrap().is_empty());
    }

    #[test]
    fn test_return_type() {
        assert_eq!(return_type("(II)I").unwrap(), "I");
        assert_eq!(return_type("()V").unwrap(), "V");
        assert_eq!(
            return_type("(I)Ljava/lang/Object;").unwrap(),
            "Ljava/lang/Object;"
        );
    }

    #[test]
    fn test_malformed_descriptor() {
        assert!(parse_argument_types("(Ljava/lang/String").is_err());
        assert!(parse_argument_types("I").is_err());
        assert!(return_type("II").is_err());
    }

    #[test]
    fn test_primitive_tokens() {
        assert_eq!(descriptor_from_primitive_token("byte"), "B");
        assert_eq!(descriptor_from_primitive_token("LONG"), "J");
        assert_eq!(descriptor_from_primitive_token("whatever"), "I");
    }
}
