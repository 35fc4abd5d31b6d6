//! WASM bindings for embedwidth.
//!
//! Exposes a handle per view (`JsLiveView` for the editor, `JsReadView` for
//! rendered notes) plus stateless helpers for checking directive text.

mod bridge;
mod types;
mod view;

pub use bridge::*;
pub use types::*;
pub use view::*;

use wasm_bindgen::prelude::*;

use embedwidth_core::DirectiveSet;

/// Initialize panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use tracing::Level;
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    // Per-node trace output is too chatty for the console.
    let filter =
        EnvFilter::new("warn,embedwidth_core=debug,embedwidth_browser=debug,embedwidth_js=debug");

    let reg = Registry::default().with(filter).with(wasm_layer);

    let _ = set_global_default(reg);
}

fn directive_set(directives: Option<Vec<String>>) -> Result<DirectiveSet, JsError> {
    match directives {
        Some(keywords) => DirectiveSet::new(&keywords)
            .map_err(|e| JsError::new(&format!("Invalid directives: {}", e))),
        None => Ok(DirectiveSet::default()),
    }
}

/// The directive carried by one embed reference's text, if any.
#[wasm_bindgen(js_name = matchDirective)]
pub fn match_directive(
    snippet: &str,
    directives: Option<Vec<String>>,
) -> Result<Option<String>, JsError> {
    let set = directive_set(directives)?;
    Ok(set
        .match_snippet(snippet)
        .map(|directive| directive.keyword().to_string()))
}

/// Whether any embed reference in `text` carries a directive.
#[wasm_bindgen(js_name = hasAnyDirective)]
pub fn has_any_directive(text: &str, directives: Option<Vec<String>>) -> Result<bool, JsError> {
    let set = directive_set(directives)?;
    Ok(embedwidth_core::has_any_directive(text, &set))
}
