//! Bridge dispatch semantics at invoke sites: precedence over bytecode,
//! raw argument/receiver unwrapping, and void-result discarding.

use std::rc::Rc;

use litevm_engine::{
    ClassEntry, ConstOperand, Instruction, Manifest, MethodEntry, Opcode, Operand, RawValue,
    TypeRef, Vm,
};

fn static_method(
    name: &str,
    descriptor: &str,
    max_locals: usize,
    instructions: Vec<Instruction>,
) -> MethodEntry {
    MethodEntry {
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        flags: vec!["ACC_STATIC".to_string()],
        max_locals,
        instructions,
        exception_handlers: Vec::new(),
    }
}

fn app_class(methods: Vec<MethodEntry>) -> ClassEntry {
    ClassEntry {
        class_name: "demo/App".to_string(),
        super_name: Some("java/lang/Object".to_string()),
        fields: Vec::new(),
        methods,
    }
}

#[test]
fn test_bridge_takes_precedence_over_bytecode() {
    // f() has a bytecode body answering 1, but a bridge under the same key
    // answers 2; the invoke site must pick the bridge.
    let manifest: Manifest = vec![app_class(vec![
        static_method(
            "f",
            "()I",
            0,
            vec![Instruction::iconst(1), Instruction::new(Opcode::Ireturn)],
        ),
        static_method(
            "call",
            "()I",
            0,
            vec![
                Instruction::member(Opcode::Invokestatic, "demo/App", "f", "()I"),
                Instruction::new(Opcode::Ireturn),
            ],
        ),
    ])];
    let mut vm = Vm::bootstrap(manifest);
    vm.register_bridge(
        "demo/App",
        "f:()I",
        Rc::new(|_heap, _call| Ok(RawValue::Int(2))),
    );

    let result = vm.invoke_static("demo/App", "call", "()I", &[]).unwrap();
    assert_eq!(result, RawValue::Int(2));
}

#[test]
fn test_top_level_invoke_ignores_bridges() {
    // Bridge-first dispatch applies at invoke instructions only; the public
    // entry point always runs bytecode.
    let manifest: Manifest = vec![app_class(vec![static_method(
        "f",
        "()I",
        0,
        vec![Instruction::iconst(1), Instruction::new(Opcode::Ireturn)],
    )])];
    let mut vm = Vm::bootstrap(manifest);
    vm.register_bridge(
        "demo/App",
        "f:()I",
        Rc::new(|_heap, _call| Ok(RawValue::Int(2))),
    );

    let result = vm.invoke_static("demo/App", "f", "()I", &[]).unwrap();
    assert_eq!(result, RawValue::Int(1));
}

#[test]
fn test_bridge_receives_unwrapped_string_arguments() {
    let manifest: Manifest = vec![app_class(vec![static_method(
        "measure",
        "()I",
        0,
        vec![
            Instruction::ldc(ConstOperand::String {
                value: "hello".to_string(),
            }),
            Instruction::member(
                Opcode::Invokestatic,
                "host/Text",
                "length",
                "(Ljava/lang/String;)I",
            ),
            Instruction::new(Opcode::Ireturn),
        ],
    )])];
    let mut vm = Vm::bootstrap(manifest);
    vm.register_bridge(
        "host/Text",
        "length:(Ljava/lang/String;)I",
        Rc::new(|_heap, call| match call.args.first() {
            Some(RawValue::Str(text)) => Ok(RawValue::Int(text.len() as i32)),
            other => panic!("expected a string argument, got {other:?}"),
        }),
    );

    let result = vm.invoke_static("demo/App", "measure", "()I", &[]).unwrap();
    assert_eq!(result, RawValue::Int(5));
}

#[test]
fn test_void_bridge_result_is_discarded() {
    // The handler misbehaves and returns a value; a void descriptor means
    // nothing lands on the caller's stack.
    let manifest: Manifest = vec![app_class(vec![static_method(
        "noisy",
        "()I",
        0,
        vec![
            Instruction::iconst(5),
            Instruction::member(Opcode::Invokestatic, "host/Log", "write", "(I)V"),
            Instruction::iconst(3),
            Instruction::new(Opcode::Ireturn),
        ],
    )])];
    let mut vm = Vm::bootstrap(manifest);
    vm.register_bridge(
        "host/Log",
        "write:(I)V",
        Rc::new(|_heap, _call| Ok(RawValue::Int(99))),
    );

    let result = vm.invoke_static("demo/App", "noisy", "()I", &[]).unwrap();
    assert_eq!(result, RawValue::Int(3));
}

#[test]
fn test_virtual_bridge_receives_raw_receiver() {
    let manifest: Manifest = vec![app_class(vec![static_method(
        "run",
        "()I",
        0,
        vec![
            Instruction::type_ref(
                Opcode::New,
                TypeRef {
                    class_name: Some("demo/Widget".to_string()),
                    ..TypeRef::default()
                },
            ),
            Instruction::member(Opcode::Invokevirtual, "demo/Widget", "id", "()I"),
            Instruction::new(Opcode::Ireturn),
        ],
    )])];
    let mut vm = Vm::bootstrap(manifest);
    vm.register_bridge(
        "demo/Widget",
        "id:()I",
        Rc::new(|heap, call| match call.receiver {
            Some(RawValue::Ref(handle)) => {
                assert_eq!(heap.runtime_class_name(handle), Some("demo/Widget"));
                Ok(RawValue::Int(1))
            }
            other => panic!("expected an object receiver, got {other:?}"),
        }),
    );

    let result = vm.invoke_static("demo/App", "run", "()I", &[]).unwrap();
    assert_eq!(result, RawValue::Int(1));
}

#[test]
fn test_invokespecial_never_consults_bridges() {
    // A bridge under the constructor key must not shadow the bytecode body.
    let manifest: Manifest = vec![ClassEntry {
        class_name: "demo/Widget".to_string(),
        super_name: Some("java/lang/Object".to_string()),
        fields: Vec::new(),
        methods: vec![
            MethodEntry {
                name: "<init>".to_string(),
                descriptor: "()V".to_string(),
                flags: Vec::new(),
                max_locals: 1,
                instructions: vec![
                    Instruction::local(Opcode::Aload, 0),
                    Instruction::with_args(Opcode::Sipush, vec![Operand::Value(5)]),
                    Instruction::member(Opcode::Putfield, "demo/Widget", "x", "I"),
                    Instruction::new(Opcode::Return),
                ],
                exception_handlers: Vec::new(),
            },
            static_method(
                "make",
                "()I",
                0,
                vec![
                    Instruction::type_ref(
                        Opcode::New,
                        TypeRef {
                            class_name: Some("demo/Widget".to_string()),
                            ..TypeRef::default()
                        },
                    ),
                    Instruction::new(Opcode::Dup),
                    Instruction::member(Opcode::Invokespecial, "demo/Widget", "<init>", "()V"),
                    Instruction::member(Opcode::Getfield, "demo/Widget", "x", "I"),
                    Instruction::new(Opcode::Ireturn),
                ],
            ),
        ],
    }];
    let mut vm = Vm::bootstrap(manifest);
    vm.register_bridge(
        "demo/Widget",
        "<init>:()V",
        Rc::new(|_heap, _call| panic!("constructor bridge must not run")),
    );

    let result = vm.invoke_static("demo/Widget", "make", "()I", &[]).unwrap();
    assert_eq!(result, RawValue::Int(5));
}
