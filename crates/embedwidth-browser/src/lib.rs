//! Browser DOM layer for embedwidth.
//!
//! This crate implements the `embedwidth-core` platform traits on top of
//! `web-sys`. It assumes a `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `dom`: embed elements and their container, read and annotated in place
//! - `platform`: `requestAnimationFrame` / `setTimeout` scheduling
//! - `observer`: `MutationObserver` subscriptions under a container root
//! - `session`: mounting sessions and keeping them reachable from callbacks
//!
//! # Re-exports
//!
//! This crate re-exports `embedwidth-core` for convenience, so consumers
//! only need to depend on `embedwidth-browser`.

// Re-export core crate
pub use embedwidth_core;
pub use embedwidth_core::*;

pub mod dom;
pub mod observer;
pub mod platform;
pub mod session;

pub use dom::{DomContainer, DomEmbed};
pub use observer::{DomMutationSource, DomSubscription};
pub use platform::{BrowserPlatform, SessionSink, SinkSlot};
pub use session::{LiveSession, ReadSession, SessionHandle, mount_live, mount_read};

use wasm_bindgen::JsValue;

/// Convert a thrown JS value into a platform error.
pub fn js_error(value: JsValue) -> PlatformError {
    match value.as_string() {
        Some(message) => PlatformError(message),
        None => PlatformError(format!("{value:?}")),
    }
}
