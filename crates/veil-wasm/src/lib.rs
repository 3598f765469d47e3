//! Veil WASM - WebAssembly bindings for the Veil region blur editor
//!
//! This crate exposes the veil-core editing session to JavaScript/TypeScript.
//!
//! # Module Structure
//!
//! - `session` - `JsEditorSession`: adjustments, pointer handling, canvas
//!   presentation and export
//! - `sink` - adapter from JS persistence callbacks to the core sink trait
//! - `logger` - forwards `log` records to the browser console
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsEditorSession, JsRedraw } from '@veil/wasm';
//!
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const session = new JsEditorSession(bytes, innerWidth, innerHeight, slotIndex);
//! session.present(canvas);
//!
//! canvas.onpointerdown = (e) => {
//!   if (session.pointer_down(e.offsetX, e.offsetY) !== JsRedraw.None) {
//!     session.present(canvas);
//!   }
//! };
//!
//! await session.export(
//!   (index, file) => api.replaceImage(index, file),
//!   (file) => api.uploadImage(file),
//! );
//! ```

use wasm_bindgen::prelude::*;

mod logger;
mod session;
mod sink;

pub use logger::set_log_level;
pub use session::{JsEditorSession, JsRedraw};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    logger::install();
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Convert any displayable error into a JS exception value.
pub(crate) fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}
