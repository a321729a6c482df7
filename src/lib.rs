//! mirror-ngin
//!
//! Real-time 3D rendering demos on top of `wgpu` and `cgmath`, for native and
//! WASM. A small engine layer loads meshes and textures, animates scenes
//! through an event loop and renders every frame in up to four passes: a
//! shadow map from a light, a planar mirror reflection into an offscreen
//! target, the main lit scene with a cubemap skybox, and a post-processing
//! pass with depth of field, fog, contrast and vignette.
//!
//! High-level modules
//! - `camera`: camera types, the orbit controller and per-pass camera uniforms
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: engine data models (meshes, instances, textures)
//! - `flow`: high level flow control (scenes / update loops)
//! - `math`: rotations, euler angles and plane reflection
//! - `pipelines`: the phong, skybox, shadow, mirror and post pipelines
//! - `resources`: helpers to load textures/models and create GPU resources
//! - `render`: render composition and the per-frame pass sequence
//! - `scenes`: the `lighting` and `sakura` demos
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod math;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scenes;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
pub use wgpu;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Entry point of the lighting demo in the browser.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start_lighting() -> Result<(), JsValue> {
    let lighting: flow::FlowConstructor<(), ()> =
        scenes::lighting::constructor(scenes::lighting::LightingParams::default());
    flow::run(vec![lighting]).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}

/// Entry point of the sakura demo in the browser.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start_sakura() -> Result<(), JsValue> {
    let sakura: flow::FlowConstructor<(), ()> =
        scenes::sakura::constructor(scenes::sakura::SakuraParams::default());
    flow::run(vec![sakura]).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
