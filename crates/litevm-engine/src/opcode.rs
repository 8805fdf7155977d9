//! Instruction set
//!
//! [`Opcode`] is a closed enumeration: the dispatch loop matches it
//! exhaustively, so adding an opcode without an execution rule fails to
//! compile instead of falling through a runtime default case.
//! [`Opcode::ALL`] is the canonical registry tooling can enumerate to diff
//! against a reference instruction list or to compute usage statistics over
//! a loaded manifest, without any source scanning.

use serde::{Deserialize, Serialize};

use crate::{VmError, VmResult};

/// Manifest instruction opcode.
///
/// Mnemonics follow the JVM spelling (`IF_ICMPEQ`, `ACONST_NULL`, ...); the
/// serde representation uses those mnemonics verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Opcode {
    // ===== Constants =====
    Nop,
    AconstNull,
    Iconst,
    Bipush,
    Sipush,
    Ldc,

    // ===== Allocation =====
    New,
    Newarray,
    Anewarray,

    // ===== Locals =====
    Iload,
    Aload,
    Istore,
    Astore,
    Iinc,

    // ===== Integer arithmetic =====
    Iadd,
    Isub,
    Imul,
    Idiv,
    Irem,
    Ineg,

    // ===== Integer bitwise =====
    Iand,
    Ior,
    Ixor,

    // ===== Stack manipulation =====
    Pop,
    Dup,

    // ===== Fields =====
    Getstatic,
    Putstatic,
    Getfield,
    Putfield,

    // ===== Arrays =====
    Arraylength,
    Iaload,
    Laload,
    Faload,
    Daload,
    Baload,
    Caload,
    Saload,
    Aaload,
    Iastore,
    Lastore,
    Fastore,
    Dastore,
    Bastore,
    Castore,
    Sastore,
    Aastore,

    // ===== Exceptions =====
    Athrow,

    // ===== Control flow =====
    Goto,
    IfIcmpeq,
    IfIcmpne,
    IfIcmplt,
    IfIcmple,
    IfIcmpgt,
    IfIcmpge,
    Ifeq,
    Ifne,
    Iflt,
    Ifle,
    Ifgt,
    Ifge,

    // ===== Returns =====
    Return,
    Ireturn,
    Areturn,

    // ===== Invokes =====
    Invokestatic,
    Invokevirtual,
    Invokespecial,
}

impl Opcode {
    /// Every opcode the dispatcher supports, in declaration order.
    pub const ALL: &'static [Opcode] = &[
        Opcode::Nop,
        Opcode::AconstNull,
        Opcode::Iconst,
        Opcode::Bipush,
        Opcode::Sipush,
        Opcode::Ldc,
        Opcode::New,
        Opcode::Newarray,
        Opcode::Anewarray,
        Opcode::Iload,
        Opcode::Aload,
        Opcode::Istore,
        Opcode::Astore,
        Opcode::Iinc,
        Opcode::Iadd,
        Opcode::Isub,
        Opcode::Imul,
        Opcode::Idiv,
        Opcode::Irem,
        Opcode::Ineg,
        Opcode::Iand,
        Opcode::Ior,
        Opcode::Ixor,
        Opcode::Pop,
        Opcode::Dup,
        Opcode::Getstatic,
        Opcode::Putstatic,
        Opcode::Getfield,
        Opcode::Putfield,
        Opcode::Arraylength,
        Opcode::Iaload,
        Opcode::Laload,
        Opcode::Faload,
        Opcode::Daload,
        Opcode::Baload,
        Opcode::Caload,
        Opcode::Saload,
        Opcode::Aaload,
        Opcode::Iastore,
        Opcode::Lastore,
        Opcode::Fastore,
        Opcode::Dastore,
        Opcode::Bastore,
        Opcode::Castore,
        Opcode::Sastore,
        Opcode::Aastore,
        Opcode::Athrow,
        Opcode::Goto,
        Opcode::IfIcmpeq,
        Opcode::IfIcmpne,
        Opcode::IfIcmplt,
        Opcode::IfIcmple,
        Opcode::IfIcmpgt,
        Opcode::IfIcmpge,
        Opcode::Ifeq,
        Opcode::Ifne,
        Opcode::Iflt,
        Opcode::Ifle,
        Opcode::Ifgt,
        Opcode::Ifge,
        Opcode::Return,
        Opcode::Ireturn,
        Opcode::Areturn,
        Opcode::Invokestatic,
        Opcode::Invokevirtual,
        Opcode::Invokespecial,
    ];

    /// JVM-style mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::AconstNull => "ACONST_NULL",
            Opcode::Iconst => "ICONST",
            Opcode::Bipush => "BIPUSH",
            Opcode::Sipush => "SIPUSH",
            Opcode::Ldc => "LDC",
            Opcode::New => "NEW",
            Opcode::Newarray => "NEWARRAY",
            Opcode::Anewarray => "ANEWARRAY",
            Opcode::Iload => "ILOAD",
            Opcode::Aload => "ALOAD",
            Opcode::Istore => "ISTORE",
            Opcode::Astore => "ASTORE",
            Opcode::Iinc => "IINC",
            Opcode::Iadd => "IADD",
            Opcode::Isub => "ISUB",
            Opcode::Imul => "IMUL",
            Opcode::Idiv => "IDIV",
            Opcode::Irem => "IREM",
            Opcode::Ineg => "INEG",
            Opcode::Iand => "IAND",
            Opcode::Ior => "IOR",
            Opcode::Ixor => "IXOR",
            Opcode::Pop => "POP",
            Opcode::Dup => "DUP",
            Opcode::Getstatic => "GETSTATIC",
            Opcode::Putstatic => "PUTSTATIC",
            Opcode::Getfield => "GETFIELD",
            Opcode::Putfield => "PUTFIELD",
            Opcode::Arraylength => "ARRAYLENGTH",
            Opcode::Iaload => "IALOAD",
            Opcode::Laload => "LALOAD",
            Opcode::Faload => "FALOAD",
            Opcode::Daload => "DALOAD",
            Opcode::Baload => "BALOAD",
            Opcode::Caload => "CALOAD",
            Opcode::Saload => "SALOAD",
            Opcode::Aaload => "AALOAD",
            Opcode::Iastore => "IASTORE",
            Opcode::Lastore => "LASTORE",
            Opcode::Fastore => "FASTORE",
            Opcode::Dastore => "DASTORE",
            Opcode::Bastore => "BASTORE",
            Opcode::Castore => "CASTORE",
            Opcode::Sastore => "SASTORE",
            Opcode::Aastore => "AASTORE",
            Opcode::Athrow => "ATHROW",
            Opcode::Goto => "GOTO",
            Opcode::IfIcmpeq => "IF_ICMPEQ",
            Opcode::IfIcmpne => "IF_ICMPNE",
            Opcode::IfIcmplt => "IF_ICMPLT",
            Opcode::IfIcmple => "IF_ICMPLE",
            Opcode::IfIcmpgt => "IF_ICMPGT",
            Opcode::IfIcmpge => "IF_ICMPGE",
            Opcode::Ifeq => "IFEQ",
            Opcode::Ifne => "IFNE",
            Opcode::Iflt => "IFLT",
            Opcode::Ifle => "IFLE",
            Opcode::Ifgt => "IFGT",
            Opcode::Ifge => "IFGE",
            Opcode::Return => "RETURN",
            Opcode::Ireturn => "IRETURN",
            Opcode::Areturn => "ARETURN",
            Opcode::Invokestatic => "INVOKESTATIC",
            Opcode::Invokevirtual => "INVOKEVIRTUAL",
            Opcode::Invokespecial => "INVOKESPECIAL",
        }
    }

    /// Look an opcode up by mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        Opcode::ALL.iter().copied().find(|op| op.mnemonic() == mnemonic)
    }
}

/// Constant literal carried by an `LDC` operand, tagged with its own kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConstOperand {
    /// Integer constant
    Int {
        /// literal
        value: i32,
    },
    /// Long constant
    Long {
        /// literal
        value: i64,
    },
    /// Float constant
    Float {
        /// literal
        value: f32,
    },
    /// Double constant
    Double {
        /// literal
        value: f64,
    },
    /// String constant, interned into the heap on push
    String {
        /// literal
        value: String,
    },
    /// Class literal, materialized as a `java/lang/Class` object
    Class {
        /// referenced class name
        value: String,
    },
    /// Null constant
    Null,
}

/// Type operand for allocation instructions (`NEW`, `NEWARRAY`, `ANEWARRAY`).
///
/// Resolution order for the component/target descriptor mirrors the manifest
/// format: an explicit `descriptor` wins, then a primitive `token`
/// (`"int"`, `"byte"`, ...), then `L<class_name>;`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeRef {
    /// Referenced class name, if any
    pub class_name: Option<String>,
    /// Explicit type descriptor, if any
    pub descriptor: Option<String>,
    /// Primitive token, if any
    pub token: Option<String>,
}

/// Member reference operand for field and invoke instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    /// Declaring (or declared call-site) class
    pub class_name: String,
    /// Method or field name
    pub name: String,
    /// JVM type descriptor of the member
    pub descriptor: String,
}

/// Opcode-specific instruction argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Immediate integer: local slot index, constant literal, or `IINC` delta
    Value(i64),
    /// Branch target, as an instruction index
    Target(usize),
    /// Tagged constant literal
    Const(ConstOperand),
    /// Class/array type reference
    Type(TypeRef),
    /// Field or method reference
    Member(MemberRef),
}

/// One instruction of a method body: an opcode plus its opcode-specific
/// argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Opcode
    pub op: Opcode,
    /// Arguments; shape depends on the opcode
    #[serde(default)]
    pub args: Vec<Operand>,
}

impl Instruction {
    /// Instruction with no arguments.
    pub fn new(op: Opcode) -> Self {
        Self { op, args: Vec::new() }
    }

    /// Instruction with an explicit argument list.
    pub fn with_args(op: Opcode, args: Vec<Operand>) -> Self {
        Self { op, args }
    }

    /// `ICONST`-family constant push.
    pub fn iconst(value: i32) -> Self {
        Self::with_args(Opcode::Iconst, vec![Operand::Value(value as i64)])
    }

    /// Local-slot instruction (`ILOAD`, `ISTORE`, `ALOAD`, `ASTORE`).
    pub fn local(op: Opcode, index: usize) -> Self {
        Self::with_args(op, vec![Operand::Value(index as i64)])
    }

    /// Branch instruction with a target instruction index.
    pub fn jump(op: Opcode, target: usize) -> Self {
        Self::with_args(op, vec![Operand::Target(target)])
    }

    /// `IINC` with slot index and delta.
    pub fn iinc(index: usize, delta: i32) -> Self {
        Self::with_args(
            Opcode::Iinc,
            vec![Operand::Value(index as i64), Operand::Value(delta as i64)],
        )
    }

    /// `LDC` with a tagged constant.
    pub fn ldc(constant: ConstOperand) -> Self {
        Self::with_args(Opcode::Ldc, vec![Operand::Const(constant)])
    }

    /// Field or invoke instruction with a member reference.
    pub fn member(op: Opcode, class_name: &str, name: &str, descriptor: &str) -> Self {
        Self::with_args(
            op,
            vec![Operand::Member(MemberRef {
                class_name: class_name.to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })],
        )
    }

    /// Allocation instruction with a type reference.
    pub fn type_ref(op: Opcode, type_ref: TypeRef) -> Self {
        Self::with_args(op, vec![Operand::Type(type_ref)])
    }

    fn arg(&self, index: usize) -> VmResult<&Operand> {
        self.args.get(index).ok_or_else(|| {
            VmError::InvalidOperand(format!(
                "{} expects an argument at position {}",
                self.op.mnemonic(),
                index
            ))
        })
    }

    /// Immediate integer argument at `index`.
    pub fn value_arg(&self, index: usize) -> VmResult<i64> {
        match self.arg(index)? {
            Operand::Value(v) => Ok(*v),
            other => Err(VmError::InvalidOperand(format!(
                "{} expects an immediate value, found {:?}",
                self.op.mnemonic(),
                other
            ))),
        }
    }

    /// Branch target argument.
    pub fn target_arg(&self) -> VmResult<usize> {
        match self.arg(0)? {
            Operand::Target(t) => Ok(*t),
            // Accept a plain value too; targets are just instruction indices.
            Operand::Value(v) if *v >= 0 => Ok(*v as usize),
            other => Err(VmError::InvalidOperand(format!(
                "{} expects a branch target, found {:?}",
                self.op.mnemonic(),
                other
            ))),
        }
    }

    /// Tagged constant argument (`LDC`).
    pub fn const_arg(&self) -> VmResult<&ConstOperand> {
        match self.arg(0)? {
            Operand::Const(c) => Ok(c),
            other => Err(VmError::InvalidOperand(format!(
                "{} expects a constant operand, found {:?}",
                self.op.mnemonic(),
                other
            ))),
        }
    }

    /// Type reference argument (allocation instructions).
    pub fn type_arg(&self) -> VmResult<&TypeRef> {
        match self.arg(0)? {
            Operand::Type(t) => Ok(t),
            other => Err(VmError::InvalidOperand(format!(
                "{} expects a type reference, found {:?}",
                self.op.mnemonic(),
                other
            ))),
        }
    }

    /// Member reference argument (field and invoke instructions).
    pub fn member_arg(&self) -> VmResult<&MemberRef> {
        match self.arg(0)? {
            Operand::Member(m) => Ok(m),
            other => Err(VmError::InvalidOperand(format!(
                "{} expects a member reference, found {:?}",
                self.op.mnemonic(),
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_complete_and_unique() {
        assert_eq!(Opcode::ALL.len(), 66);
        let mut seen = std::collections::HashSet::new();
        for op in Opcode::ALL {
            assert!(seen.insert(op.mnemonic()), "duplicate {}", op.mnemonic());
        }
    }

    #[test]
    fn test_mnemonic_round_trip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(*op));
        }
        assert_eq!(Opcode::from_mnemonic("TABLESWITCH"), None);
    }

    #[test]
    fn test_serde_uses_mnemonics() {
        let json = serde_json::to_string(&Opcode::IfIcmpeq).unwrap();
        assert_eq!(json, "\"IF_ICMPEQ\"");
        let op: Opcode = serde_json::from_str("\"ACONST_NULL\"").unwrap();
        assert_eq!(op, Opcode::AconstNull);
    }

    #[test]
    fn test_operand_accessors() {
        let instr = Instruction::iconst(7);
        assert_eq!(instr.value_arg(0).unwrap(), 7);
        assert!(instr.member_arg().is_err());

        let instr = Instruction::jump(Opcode::Goto, 4);
        assert_eq!(instr.target_arg().unwrap(), 4);

        let instr = Instruction::member(Opcode::Getfield, "Point", "x", "I");
        let member = instr.member_arg().unwrap();
        assert_eq!(member.class_name, "Point");
        assert_eq!(member.descriptor, "I");
    }

    #[test]
    fn test_missing_argument_is_invalid_operand() {
        let instr = Instruction::new(Opcode::Iload);
        assert!(matches!(
            instr.value_arg(0),
            Err(crate::VmError::InvalidOperand(_))
        ));
    }
}
