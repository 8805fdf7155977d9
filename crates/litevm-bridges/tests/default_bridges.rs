//! End-to-end checks for the default bridge stubs: guest bytecode invokes
//! each bridge key and the host inspects what came back.

use std::rc::Rc;

use litevm_bridges::{
    install_default_bridges, AUDIO_CONTEXT_CLASS, SOCKET_CONNECTION_CLASS, WEBGL_CONTEXT_CLASS,
};
use litevm_engine::{
    ClassEntry, Instruction, Manifest, MethodEntry, Opcode, RawValue, Vm,
};

fn static_method(name: &str, descriptor: &str, max_locals: usize, instructions: Vec<Instruction>) -> MethodEntry {
    MethodEntry {
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        flags: vec!["ACC_STATIC".to_string()],
        max_locals,
        instructions,
        exception_handlers: Vec::new(),
    }
}

fn boot_manifest(methods: Vec<MethodEntry>) -> Manifest {
    vec![ClassEntry {
        class_name: "demo/Boot".to_string(),
        super_name: Some("java/lang/Object".to_string()),
        fields: Vec::new(),
        methods,
    }]
}

#[test]
fn test_webgl_context_is_tagged_and_keeps_canvas_id() {
    let manifest = boot_manifest(vec![static_method(
        "openGl",
        "(Ljava/lang/String;)Ljava/lang/Object;",
        1,
        vec![
            Instruction::local(Opcode::Aload, 0),
            Instruction::member(
                Opcode::Invokestatic,
                "litevm/bridge/WebGL",
                "createContext",
                "(Ljava/lang/String;)Ljava/lang/Object;",
            ),
            Instruction::new(Opcode::Areturn),
        ],
    )]);
    let mut vm = Vm::bootstrap(manifest);
    install_default_bridges(&mut vm);

    let result = vm
        .invoke_static(
            "demo/Boot",
            "openGl",
            "(Ljava/lang/String;)Ljava/lang/Object;",
            &[RawValue::Str("canvas-main".to_string())],
        )
        .unwrap();
    let RawValue::Ref(context) = result else {
        panic!("expected a context reference, got {result:?}");
    };
    assert_eq!(vm.heap().runtime_class_name(context), Some(WEBGL_CONTEXT_CLASS));
    assert_eq!(
        vm.heap_mut()
            .get_instance_field(context, "canvasId", "Ljava/lang/String;")
            .unwrap(),
        RawValue::Str("canvas-main".to_string())
    );
}

#[test]
fn test_webaudio_context_is_tagged() {
    let manifest = boot_manifest(vec![static_method(
        "openAudio",
        "()Ljava/lang/Object;",
        0,
        vec![
            Instruction::member(
                Opcode::Invokestatic,
                "litevm/bridge/WebAudio",
                "createContext",
                "()Ljava/lang/Object;",
            ),
            Instruction::new(Opcode::Areturn),
        ],
    )]);
    let mut vm = Vm::bootstrap(manifest);
    install_default_bridges(&mut vm);

    let result = vm
        .invoke_static("demo/Boot", "openAudio", "()Ljava/lang/Object;", &[])
        .unwrap();
    let RawValue::Ref(context) = result else {
        panic!("expected a context reference, got {result:?}");
    };
    assert_eq!(vm.heap().runtime_class_name(context), Some(AUDIO_CONTEXT_CLASS));
}

#[test]
fn test_websocket_connect_records_url() {
    let manifest = boot_manifest(vec![static_method(
        "dial",
        "(Ljava/lang/String;)Ljava/lang/Object;",
        1,
        vec![
            Instruction::local(Opcode::Aload, 0),
            Instruction::member(
                Opcode::Invokestatic,
                "litevm/bridge/WebSocket",
                "connect",
                "(Ljava/lang/String;)Ljava/lang/Object;",
            ),
            Instruction::new(Opcode::Areturn),
        ],
    )]);
    let mut vm = Vm::bootstrap(manifest);
    install_default_bridges(&mut vm);

    let result = vm
        .invoke_static(
            "demo/Boot",
            "dial",
            "(Ljava/lang/String;)Ljava/lang/Object;",
            &[RawValue::Str("wss://example".to_string())],
        )
        .unwrap();
    let RawValue::Ref(connection) = result else {
        panic!("expected a connection reference, got {result:?}");
    };
    assert_eq!(
        vm.heap().runtime_class_name(connection),
        Some(SOCKET_CONNECTION_CLASS)
    );
    assert_eq!(
        vm.heap_mut()
            .get_instance_field(connection, "url", "Ljava/lang/String;")
            .unwrap(),
        RawValue::Str("wss://example".to_string())
    );
}

#[test]
fn test_file_read_text_returns_empty_string() {
    let manifest = boot_manifest(vec![static_method(
        "readConfig",
        "(Ljava/lang/String;)Ljava/lang/String;",
        1,
        vec![
            Instruction::local(Opcode::Aload, 0),
            Instruction::member(
                Opcode::Invokestatic,
                "litevm/bridge/File",
                "readText",
                "(Ljava/lang/String;)Ljava/lang/String;",
            ),
            Instruction::new(Opcode::Areturn),
        ],
    )]);
    let mut vm = Vm::bootstrap(manifest);
    install_default_bridges(&mut vm);

    let result = vm
        .invoke_static(
            "demo/Boot",
            "readConfig",
            "(Ljava/lang/String;)Ljava/lang/String;",
            &[RawValue::Str("path/config.json".to_string())],
        )
        .unwrap();
    assert_eq!(result, RawValue::Str(String::new()));
}

#[test]
fn test_file_write_text_is_void() {
    let manifest = boot_manifest(vec![static_method(
        "save",
        "(Ljava/lang/String;Ljava/lang/String;)V",
        2,
        vec![
            Instruction::local(Opcode::Aload, 0),
            Instruction::local(Opcode::Aload, 1),
            Instruction::member(
                Opcode::Invokestatic,
                "litevm/bridge/File",
                "writeText",
                "(Ljava/lang/String;Ljava/lang/String;)V",
            ),
            Instruction::new(Opcode::Return),
        ],
    )]);
    let mut vm = Vm::bootstrap(manifest);
    install_default_bridges(&mut vm);

    let result = vm
        .invoke_static(
            "demo/Boot",
            "save",
            "(Ljava/lang/String;Ljava/lang/String;)V",
            &[
                RawValue::Str("path/save.dat".to_string()),
                RawValue::Str("payload".to_string()),
            ],
        )
        .unwrap();
    assert_eq!(result, RawValue::Null);
}

#[test]
fn test_host_override_replaces_stub() {
    let manifest = boot_manifest(vec![static_method(
        "readConfig",
        "(Ljava/lang/String;)Ljava/lang/String;",
        1,
        vec![
            Instruction::local(Opcode::Aload, 0),
            Instruction::member(
                Opcode::Invokestatic,
                "litevm/bridge/File",
                "readText",
                "(Ljava/lang/String;)Ljava/lang/String;",
            ),
            Instruction::new(Opcode::Areturn),
        ],
    )]);
    let mut vm = Vm::bootstrap(manifest);
    install_default_bridges(&mut vm);
    // Same key, registered later: the override wins.
    vm.register_bridge(
        "litevm/bridge/File",
        "readText:(Ljava/lang/String;)Ljava/lang/String;",
        Rc::new(|_heap, _call| Ok(RawValue::Str("{\"level\": 3}".to_string()))),
    );

    let result = vm
        .invoke_static(
            "demo/Boot",
            "readConfig",
            "(Ljava/lang/String;)Ljava/lang/String;",
            &[RawValue::Str("path/config.json".to_string())],
        )
        .unwrap();
    assert_eq!(result, RawValue::Str("{\"level\": 3}".to_string()));
}
