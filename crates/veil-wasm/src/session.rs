//! `JsEditorSession`: the editing session as seen from JavaScript.
//!
//! The session lives in an `Rc<RefCell<_>>` so the export promise can keep
//! a handle to it. No borrow is held across an await; while a save is
//! pending the core rejects edits with a "save in progress" error.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Promise};
use veil_core::export::deliver;
use veil_core::{
    EditTarget, Editor, EditorConfig, EditorSession, InteractionMode, Point, Redraw, SessionError,
    Viewport,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::Clamped;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::sink::JsImageSink;
use crate::to_js;

/// What the host has to repaint after an event.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsRedraw {
    None = 0,
    /// Only the draw preview outline changed
    Preview = 1,
    /// The stage pixels changed
    Stage = 2,
}

impl From<Redraw> for JsRedraw {
    fn from(redraw: Redraw) -> Self {
        match redraw {
            Redraw::None => JsRedraw::None,
            Redraw::Preview => JsRedraw::Preview,
            Redraw::Stage => JsRedraw::Stage,
        }
    }
}

/// An image opened for editing.
#[wasm_bindgen]
pub struct JsEditorSession {
    editor: Rc<RefCell<Editor>>,
}

#[wasm_bindgen]
impl JsEditorSession {
    /// Open encoded image bytes for editing.
    ///
    /// # Arguments
    /// * `bytes` - Encoded image (JPEG, PNG, WebP, BMP or GIF)
    /// * `viewport_width`, `viewport_height` - Size of the host viewport
    /// * `index` - Slot to replace on export; omit or pass a negative value
    ///   to upload a new image instead
    /// * `config` - Optional partial `EditorConfig` object
    #[wasm_bindgen(constructor)]
    pub fn new(
        bytes: &[u8],
        viewport_width: u32,
        viewport_height: u32,
        index: Option<i32>,
        config: JsValue,
    ) -> Result<JsEditorSession, JsValue> {
        let config: EditorConfig = if config.is_undefined() || config.is_null() {
            EditorConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(to_js)?
        };
        let target = index.map_or(EditTarget::New, |i| EditTarget::from_slot(i64::from(i)));

        let mut editor = Editor::new(config);
        editor
            .open(bytes, Viewport::new(viewport_width, viewport_height), target)
            .map_err(to_js)?;

        Ok(JsEditorSession {
            editor: Rc::new(RefCell::new(editor)),
        })
    }

    /// Display surface width in pixels
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> Result<u32, JsValue> {
        self.read(|s| s.image().display_width())
    }

    /// Display surface height in pixels
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> Result<u32, JsValue> {
        self.read(|s| s.image().display_height())
    }

    #[wasm_bindgen(getter)]
    pub fn natural_width(&self) -> Result<u32, JsValue> {
        self.read(|s| s.image().natural_width())
    }

    #[wasm_bindgen(getter)]
    pub fn natural_height(&self) -> Result<u32, JsValue> {
        self.read(|s| s.image().natural_height())
    }

    /// Display size divided by natural size
    #[wasm_bindgen(getter)]
    pub fn scale(&self) -> Result<f64, JsValue> {
        self.read(|s| s.image().scale())
    }

    /// Whether the session is still open
    #[wasm_bindgen(getter)]
    pub fn is_open(&self) -> bool {
        self.editor.borrow().session().is_some()
    }

    #[wasm_bindgen(getter)]
    pub fn is_saving(&self) -> Result<bool, JsValue> {
        self.read(EditorSession::is_saving)
    }

    /// Counter bumped on every change to the stage pixels
    #[wasm_bindgen(getter)]
    pub fn revision(&self) -> Result<f64, JsValue> {
        self.read(|s| s.revision() as f64)
    }

    // ----------------------------------------------------------------
    // Global adjustments
    // ----------------------------------------------------------------

    #[wasm_bindgen(getter)]
    pub fn brightness(&self) -> Result<f32, JsValue> {
        self.read(|s| s.adjustments().brightness())
    }

    #[wasm_bindgen(getter)]
    pub fn contrast(&self) -> Result<f32, JsValue> {
        self.read(|s| s.adjustments().contrast())
    }

    #[wasm_bindgen(getter)]
    pub fn global_blur(&self) -> Result<f32, JsValue> {
        self.read(|s| s.adjustments().global_blur_radius())
    }

    /// Set brightness (-100 to 100), returning the clamped value
    pub fn set_brightness(&self, value: f32) -> Result<f32, JsValue> {
        self.write(|s| s.set_brightness(value))
    }

    /// Set contrast (-100 to 100), returning the clamped value
    pub fn set_contrast(&self, value: f32) -> Result<f32, JsValue> {
        self.write(|s| s.set_contrast(value))
    }

    /// Set the global blur radius (0 to 40), returning the clamped value
    pub fn set_global_blur(&self, value: f32) -> Result<f32, JsValue> {
        self.write(|s| s.set_global_blur(value))
    }

    /// Call when a slider drag ends so the next change is a new undo step
    pub fn finish_adjustment(&self) -> Result<(), JsValue> {
        self.write(|s| {
            s.finish_adjustment();
            Ok(())
        })
    }

    // ----------------------------------------------------------------
    // Regions
    // ----------------------------------------------------------------

    /// `"select"` or `"draw"`
    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> Result<String, JsValue> {
        self.read(|s| mode_name(s.mode()).to_string())
    }

    pub fn set_mode(&self, mode: &str) -> Result<JsRedraw, JsValue> {
        let mode = parse_mode(mode)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown interaction mode: {}", mode)))?;
        self.write(|s| s.set_mode(mode)).map(JsRedraw::from)
    }

    pub fn toggle_mode(&self) -> Result<JsRedraw, JsValue> {
        self.write(EditorSession::toggle_mode).map(JsRedraw::from)
    }

    #[wasm_bindgen(getter)]
    pub fn brush_strength(&self) -> Result<u32, JsValue> {
        self.read(EditorSession::brush_strength)
    }

    /// Set the brush strength for new regions, returning the clamped value
    pub fn set_brush_strength(&self, strength: u32) -> Result<u32, JsValue> {
        self.write(|s| s.set_brush_strength(strength))
    }

    pub fn pointer_down(&self, x: i32, y: i32) -> Result<JsRedraw, JsValue> {
        self.write(|s| s.pointer_down(Point::new(x, y)))
            .map(JsRedraw::from)
    }

    pub fn pointer_move(&self, x: i32, y: i32) -> Result<JsRedraw, JsValue> {
        self.write(|s| s.pointer_move(Point::new(x, y)))
            .map(JsRedraw::from)
    }

    pub fn pointer_up(&self, x: i32, y: i32) -> Result<JsRedraw, JsValue> {
        self.write(|s| s.pointer_up(Point::new(x, y)))
            .map(JsRedraw::from)
    }

    /// Double click / double tap: deletes the topmost region in select mode
    pub fn double_activate(&self, x: i32, y: i32) -> Result<JsRedraw, JsValue> {
        self.write(|s| s.double_activate(Point::new(x, y)))
            .map(JsRedraw::from)
    }

    pub fn clear_regions(&self) -> Result<JsRedraw, JsValue> {
        self.write(EditorSession::clear_regions).map(JsRedraw::from)
    }

    /// Regions in paint order as `{id, creation_index, x, y, width, height, blur_strength}`
    pub fn regions(&self) -> Result<JsValue, JsValue> {
        let snapshots = self.read(EditorSession::region_snapshots)?;
        serde_wasm_bindgen::to_value(&snapshots).map_err(to_js)
    }

    /// Live draw preview as `{x, y, width, height}`, or `null`
    pub fn preview_rect(&self) -> Result<JsValue, JsValue> {
        match self.read(EditorSession::preview_rect)? {
            Some(rect) => serde_wasm_bindgen::to_value(&rect).map_err(to_js),
            None => Ok(JsValue::NULL),
        }
    }

    // ----------------------------------------------------------------
    // History
    // ----------------------------------------------------------------

    pub fn undo(&self) -> Result<bool, JsValue> {
        self.write(EditorSession::undo)
    }

    pub fn redo(&self) -> Result<bool, JsValue> {
        self.write(EditorSession::redo)
    }

    #[wasm_bindgen(getter)]
    pub fn can_undo(&self) -> Result<bool, JsValue> {
        self.read(EditorSession::can_undo)
    }

    #[wasm_bindgen(getter)]
    pub fn can_redo(&self) -> Result<bool, JsValue> {
        self.read(EditorSession::can_redo)
    }

    // ----------------------------------------------------------------
    // Presentation and export
    // ----------------------------------------------------------------

    /// Copy of the composed stage as RGB bytes (3 per pixel, row-major)
    pub fn stage_pixels(&self) -> Result<Vec<u8>, JsValue> {
        self.read(|s| s.stage().as_raw().clone())
    }

    /// Draw the stage, plus the dashed draw preview if any, onto a canvas.
    ///
    /// The canvas is resized to the display surface. If the canvas cannot
    /// provide a 2D context the session is closed and an error is thrown.
    pub fn present(&self, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
        let context = match context_2d(canvas) {
            Ok(context) => context,
            Err(message) => {
                log::error!("{}; closing the editing session", message);
                self.editor.borrow_mut().close();
                return Err(JsValue::from_str(&message));
            }
        };

        let editor = self.editor.borrow();
        let session = editor
            .session()
            .ok_or_else(|| to_js(SessionError::Closed))?;
        let stage = session.stage();
        let (width, height) = stage.dimensions();

        if canvas.width() != width {
            canvas.set_width(width);
        }
        if canvas.height() != height {
            canvas.set_height(height);
        }

        let rgba = rgb_to_rgba(stage.as_raw());
        let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(rgba.as_slice()), width, height)?;
        context.put_image_data(&data, 0.0, 0.0)?;

        if let Some(rect) = session.preview_rect() {
            let dash = Array::of2(&JsValue::from_f64(6.0), &JsValue::from_f64(4.0));
            context.set_line_dash(&dash)?;
            context.stroke_rect(
                f64::from(rect.x) + 0.5,
                f64::from(rect.y) + 0.5,
                f64::from(rect.width),
                f64::from(rect.height),
            );
            context.set_line_dash(&Array::new())?;
        }
        Ok(())
    }

    /// Flatten the image and hand it to the matching callback.
    ///
    /// `on_replace(index, file)` is called when editing an existing slot,
    /// `on_upload(file)` otherwise; either may return a promise. The
    /// returned promise resolves once persistence succeeds, after which the
    /// session is closed. On failure it rejects and the session stays
    /// editable, so `export` can be called again.
    pub fn export(&self, on_replace: Function, on_upload: Function) -> Promise {
        let editor = Rc::clone(&self.editor);
        future_to_promise(async move {
            let (ticket, target, file) = editor.borrow_mut().begin_export().map_err(to_js)?;

            let mut sink = JsImageSink::new(on_replace, on_upload);
            let outcome = deliver(&mut sink, target, file).await;

            editor
                .borrow_mut()
                .finish_export(ticket, outcome)
                .map(|()| JsValue::UNDEFINED)
                .map_err(to_js)
        })
    }

    /// Discard the session without saving
    pub fn close(&self) -> bool {
        self.editor.borrow_mut().close()
    }
}

impl JsEditorSession {
    fn read<T>(&self, f: impl FnOnce(&EditorSession) -> T) -> Result<T, JsValue> {
        let editor = self.editor.borrow();
        let session = editor
            .session()
            .ok_or_else(|| to_js(SessionError::Closed))?;
        Ok(f(session))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut EditorSession) -> Result<T, SessionError>,
    ) -> Result<T, JsValue> {
        let mut editor = self.editor.borrow_mut();
        let session = editor.active().map_err(to_js)?;
        f(session).map_err(to_js)
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, String> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|context| context.dyn_into::<CanvasRenderingContext2d>().ok())
        .ok_or_else(|| "2D canvas context unavailable".to_string())
}

fn parse_mode(mode: &str) -> Option<InteractionMode> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "select" => Some(InteractionMode::Select),
        "draw" => Some(InteractionMode::Draw),
        _ => None,
    }
}

fn mode_name(mode: InteractionMode) -> &'static str {
    match mode {
        InteractionMode::Select => "select",
        InteractionMode::Draw => "draw",
    }
}

/// Expand RGB pixels to opaque RGBA for `ImageData`.
fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for pixel in rgb.chunks_exact(3) {
        rgba.extend_from_slice(pixel);
        rgba.push(255);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redraw_conversion() {
        assert_eq!(JsRedraw::from(Redraw::None), JsRedraw::None);
        assert_eq!(JsRedraw::from(Redraw::Preview), JsRedraw::Preview);
        assert_eq!(JsRedraw::from(Redraw::Stage), JsRedraw::Stage);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("draw"), Some(InteractionMode::Draw));
        assert_eq!(parse_mode(" Select "), Some(InteractionMode::Select));
        assert_eq!(parse_mode("erase"), None);
        assert_eq!(mode_name(InteractionMode::Draw), "draw");
    }

    #[test]
    fn test_rgb_to_rgba() {
        assert_eq!(
            rgb_to_rgba(&[1, 2, 3, 4, 5, 6]),
            vec![1, 2, 3, 255, 4, 5, 6, 255]
        );
        assert!(rgb_to_rgba(&[]).is_empty());
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use veil_core::export::encode_png;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn png(width: u32, height: u32) -> Vec<u8> {
        let pixels: Vec<u8> = (0..width * height)
            .flat_map(|i| {
                let v = if (i / 4) % 2 == 0 { 230 } else { 30 };
                [v, v, v]
            })
            .collect();
        encode_png(&pixels, width, height).unwrap()
    }

    fn open(index: Option<i32>) -> JsEditorSession {
        JsEditorSession::new(&png(400, 250), 1000, 1000, index, JsValue::UNDEFINED).unwrap()
    }

    #[wasm_bindgen_test]
    fn test_open_and_draw() {
        let session = open(None);
        assert_eq!(session.width().unwrap(), 600);
        assert_eq!(session.height().unwrap(), 375);

        session.set_mode("draw").unwrap();
        assert_eq!(session.pointer_down(50, 50).unwrap(), JsRedraw::Preview);
        assert!(!session.preview_rect().unwrap().is_null());
        session.pointer_move(10, 10).unwrap();
        assert_eq!(session.pointer_up(10, 10).unwrap(), JsRedraw::Stage);

        let regions = Array::from(&session.regions().unwrap());
        assert_eq!(regions.length(), 1);
    }

    #[wasm_bindgen_test]
    fn test_brightness_clamped() {
        let session = open(None);
        assert_eq!(session.set_brightness(150.0).unwrap(), 100.0);
        assert_eq!(session.brightness().unwrap(), 100.0);
    }

    #[wasm_bindgen_test]
    fn test_invalid_bytes_throw() {
        let result = JsEditorSession::new(b"nope", 1000, 1000, None, JsValue::UNDEFINED);
        assert!(result.is_err());
    }

    #[wasm_bindgen_test]
    fn test_closed_session_throws() {
        let session = open(None);
        assert!(session.close());
        assert!(!session.is_open());
        assert!(session.set_contrast(10.0).is_err());
    }

    #[wasm_bindgen_test]
    async fn test_export_uploads_new_image() {
        let session = open(None);
        let on_replace = Function::new_with_args("index, file", "throw new Error('unexpected replace')");
        let on_upload = Function::new_with_args(
            "file",
            "return file instanceof File && file.type === 'image/png';",
        );

        JsFuture::from(session.export(on_replace, on_upload))
            .await
            .unwrap();
        assert!(!session.is_open());
    }

    #[wasm_bindgen_test]
    async fn test_failed_export_keeps_session() {
        let session = open(Some(2));
        session.set_contrast(20.0).unwrap();
        let on_replace = Function::new_with_args("index, file", "return Promise.reject('offline');");
        let on_upload = Function::new_no_args("return true;");

        let result = JsFuture::from(session.export(on_replace, on_upload)).await;
        assert!(result.is_err());
        assert!(session.is_open());
        assert!(!session.is_saving().unwrap());
        assert_eq!(session.contrast().unwrap(), 20.0);
    }
}
