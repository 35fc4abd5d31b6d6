//! View handles for the live editor and the read view.

use js_sys::Function;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use embedwidth_browser::{
    LiveSession, PassReport, ReadSession, SessionHandle, Signal, ValidatedConfig, WidthConfig,
    mount_live, mount_read,
};

use crate::bridge::{EditorBridge, FileBridge};
use crate::types::ViewUpdate;

/// Parse and validate a host configuration object. `undefined` and `null`
/// select the defaults.
fn parse_config(config: JsValue) -> Result<ValidatedConfig, JsError> {
    let config: WidthConfig = if config.is_undefined() || config.is_null() {
        WidthConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?
    };
    config
        .validate()
        .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))
}

fn report_to_js(report: Option<PassReport>) -> Result<JsValue, JsError> {
    match report {
        Some(report) => serde_wasm_bindgen::to_value(&report)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e))),
        None => Ok(JsValue::UNDEFINED),
    }
}

/// Width annotations for one live editor view.
#[wasm_bindgen]
pub struct JsLiveView {
    handle: SessionHandle<LiveSession<EditorBridge>>,
}

#[wasm_bindgen]
impl JsLiveView {
    /// Start annotating embeds under `content_dom`. The marker class goes on
    /// `view_dom`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        content_dom: Element,
        view_dom: Element,
        doc_text: Function,
        pos_at_dom: Function,
        config: JsValue,
    ) -> Result<JsLiveView, JsError> {
        let config = parse_config(config)?;
        let bridge = EditorBridge::new(doc_text, pos_at_dom);
        let handle = mount_live(content_dom, view_dom, bridge, &config)
            .map_err(|e| JsError::new(&format!("Failed to mount view: {}", e)))?;
        tracing::debug!("live view mounted");
        Ok(Self { handle })
    }

    /// Forward an editor view update.
    pub fn update(&self, update: ViewUpdate) {
        for signal in update.signals() {
            self.handle.signal(signal);
        }
    }

    #[wasm_bindgen(js_name = layoutChanged)]
    pub fn layout_changed(&self) {
        self.handle.signal(Signal::LayoutChanged);
    }

    #[wasm_bindgen(js_name = activeViewChanged)]
    pub fn active_view_changed(&self) {
        self.handle.signal(Signal::ActiveViewChanged);
    }

    /// Run a pass immediately and return its report.
    #[wasm_bindgen(js_name = reconcileNow)]
    pub fn reconcile_now(&self) -> Result<JsValue, JsError> {
        report_to_js(self.handle.reconcile_now())
    }

    /// Early guess at the marker state: whether the source holds any width
    /// directive. The marker itself is only set by a pass.
    #[wasm_bindgen(getter, js_name = directiveHint)]
    pub fn directive_hint(&self) -> bool {
        self.handle.directive_hint().unwrap_or(false)
    }

    /// Stop observing and cancel pending passes. Annotations already written stay.
    pub fn destroy(&self) {
        self.handle.teardown();
        tracing::debug!("live view destroyed");
    }
}

/// Width annotations for one rendered read view.
#[wasm_bindgen]
pub struct JsReadView {
    handle: SessionHandle<ReadSession<FileBridge>>,
}

#[wasm_bindgen]
impl JsReadView {
    /// Start annotating embeds under `pane`, which also carries the marker class.
    #[wasm_bindgen(constructor)]
    pub fn new(
        pane: Element,
        file_content: Function,
        config: JsValue,
    ) -> Result<JsReadView, JsError> {
        let config = parse_config(config)?;
        let bridge = FileBridge::new(file_content);
        let handle = mount_read(pane.clone(), pane, bridge, &config)
            .map_err(|e| JsError::new(&format!("Failed to mount view: {}", e)))?;
        tracing::debug!("read view mounted");
        Ok(Self { handle })
    }

    /// A section rendered from source lines `line_start..=line_end`.
    #[wasm_bindgen(js_name = sectionRendered)]
    pub fn section_rendered(&self, element: Element, line_start: u32, line_end: u32) {
        if let Some(bridge) = self.handle.source() {
            bridge.record_section(element, line_start as usize, line_end as usize);
        }
        self.handle.signal(Signal::DocumentChanged);
    }

    #[wasm_bindgen(js_name = layoutChanged)]
    pub fn layout_changed(&self) {
        self.handle.signal(Signal::LayoutChanged);
    }

    #[wasm_bindgen(js_name = activeViewChanged)]
    pub fn active_view_changed(&self) {
        self.handle.signal(Signal::ActiveViewChanged);
    }

    #[wasm_bindgen(js_name = reconcileNow)]
    pub fn reconcile_now(&self) -> Result<JsValue, JsError> {
        report_to_js(self.handle.reconcile_now())
    }

    #[wasm_bindgen(getter, js_name = directiveHint)]
    pub fn directive_hint(&self) -> bool {
        self.handle.directive_hint().unwrap_or(false)
    }

    pub fn destroy(&self) {
        self.handle.teardown();
        tracing::debug!("read view destroyed");
    }
}
