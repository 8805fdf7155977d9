//! Default host bridges for the LiteVM runtime.
//!
//! These are loggable stubs for the platform surfaces guest programs most
//! often reach for (graphics, audio, sockets, files). Hosts embedding the
//! runtime in a real environment register their own handlers under the same
//! keys; registration order means the last writer wins, so installing the
//! stubs first and overriding selectively is the expected pattern.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

use std::rc::Rc;

use tracing::debug;

use litevm_engine::{BridgeArgs, RawValue, Vm};

/// Class name the WebGL stub tags its context objects with.
pub const WEBGL_CONTEXT_CLASS: &str = "litevm/bridge/WebGLContext";
/// Class name the WebAudio stub tags its context objects with.
pub const AUDIO_CONTEXT_CLASS: &str = "litevm/bridge/AudioContext";
/// Class name the WebSocket stub tags its connection objects with.
pub const SOCKET_CONNECTION_CLASS: &str = "litevm/bridge/SocketConnection";

/// Register the default stub bridges on a runtime.
///
/// Every stub allocates a tagged heap object (or returns a string) and logs
/// the call; none of them touch anything outside the VM. The exact keys:
///
/// * `litevm/bridge/WebGL` — `createContext:(Ljava/lang/String;)Ljava/lang/Object;`
/// * `litevm/bridge/WebAudio` — `createContext:()Ljava/lang/Object;`
/// * `litevm/bridge/WebSocket` — `connect:(Ljava/lang/String;)Ljava/lang/Object;`
/// * `litevm/bridge/File` — `readText:(Ljava/lang/String;)Ljava/lang/String;`
/// * `litevm/bridge/File` — `writeText:(Ljava/lang/String;Ljava/lang/String;)V`
pub fn install_default_bridges(vm: &mut Vm) {
    vm.register_bridge(
        "litevm/bridge/WebGL",
        "createContext:(Ljava/lang/String;)Ljava/lang/Object;",
        Rc::new(|heap, call: BridgeArgs<'_>| {
            let canvas_id = string_arg(&call, 0);
            debug!(canvas_id, "WebGL.createContext");
            let context = heap.allocate_object(WEBGL_CONTEXT_CLASS);
            heap.set_instance_field(context, "canvasId", RawValue::Str(canvas_id))?;
            Ok(RawValue::Ref(context))
        }),
    );

    vm.register_bridge(
        "litevm/bridge/WebAudio",
        "createContext:()Ljava/lang/Object;",
        Rc::new(|heap, _call: BridgeArgs<'_>| {
            debug!("WebAudio.createContext");
            Ok(RawValue::Ref(heap.allocate_object(AUDIO_CONTEXT_CLASS)))
        }),
    );

    vm.register_bridge(
        "litevm/bridge/WebSocket",
        "connect:(Ljava/lang/String;)Ljava/lang/Object;",
        Rc::new(|heap, call: BridgeArgs<'_>| {
            let url = string_arg(&call, 0);
            debug!(url, "WebSocket.connect");
            let connection = heap.allocate_object(SOCKET_CONNECTION_CLASS);
            heap.set_instance_field(connection, "url", RawValue::Str(url))?;
            Ok(RawValue::Ref(connection))
        }),
    );

    vm.register_bridge(
        "litevm/bridge/File",
        "readText:(Ljava/lang/String;)Ljava/lang/String;",
        Rc::new(|_heap, call: BridgeArgs<'_>| {
            let path = string_arg(&call, 0);
            debug!(path, "File.readText -> \"\"");
            Ok(RawValue::Str(String::new()))
        }),
    );

    vm.register_bridge(
        "litevm/bridge/File",
        "writeText:(Ljava/lang/String;Ljava/lang/String;)V",
        Rc::new(|_heap, call: BridgeArgs<'_>| {
            let path = string_arg(&call, 0);
            debug!(path, "File.writeText");
            Ok(RawValue::Null)
        }),
    );
}

/// Positional string argument, or empty when absent or not a string.
fn string_arg(call: &BridgeArgs<'_>, index: usize) -> String {
    match call.args.get(index) {
        Some(RawValue::Str(text)) => text.clone(),
        _ => String::new(),
    }
}
