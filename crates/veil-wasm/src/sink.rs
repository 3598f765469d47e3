//! Persistence through JavaScript callbacks.

use js_sys::{Array, Function, Promise, Uint8Array};
use veil_core::{ExportedFile, ImageSink, PersistError};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, FilePropertyBag};

/// Calls `on_replace(index, file)` or `on_upload(file)` and waits for the
/// returned value to settle.
///
/// A callback may return a plain value or a promise. A rejection, a thrown
/// exception or a resolved `false` counts as a failure.
pub(crate) struct JsImageSink {
    on_replace: Function,
    on_upload: Function,
}

impl JsImageSink {
    pub(crate) fn new(on_replace: Function, on_upload: Function) -> Self {
        Self {
            on_replace,
            on_upload,
        }
    }
}

impl ImageSink for JsImageSink {
    async fn replace(&mut self, index: usize, file: ExportedFile) -> Result<(), PersistError> {
        let index = JsValue::from_f64(index as f64);
        let js_file = to_js_file(&file)?;
        let returned = self
            .on_replace
            .call2(&JsValue::NULL, &index, &js_file)
            .map_err(|e| PersistError::Rejected(describe(&e)))?;
        settle(returned).await
    }

    async fn upload(&mut self, file: ExportedFile) -> Result<(), PersistError> {
        let js_file = to_js_file(&file)?;
        let returned = self
            .on_upload
            .call1(&JsValue::NULL, &js_file)
            .map_err(|e| PersistError::Rejected(describe(&e)))?;
        settle(returned).await
    }
}

/// Build a browser `File` from the encoded bytes.
fn to_js_file(file: &ExportedFile) -> Result<File, PersistError> {
    let bytes = Uint8Array::from(&file.bytes[..]);
    let parts = Array::of1(&bytes);
    let options = FilePropertyBag::new();
    options.set_type(file.mime);
    File::new_with_u8_array_sequence_and_options(&parts, &file.file_name, &options)
        .map_err(|e| PersistError::Unavailable(describe(&e)))
}

async fn settle(returned: JsValue) -> Result<(), PersistError> {
    let outcome = JsFuture::from(Promise::resolve(&returned))
        .await
        .map_err(|e| PersistError::Rejected(describe(&e)))?;

    if outcome.as_bool() == Some(false) {
        return Err(PersistError::Rejected(
            "persistence callback returned false".to_string(),
        ));
    }
    Ok(())
}

/// Best-effort human readable text for a JS error value.
fn describe(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{:?}", value)
}
