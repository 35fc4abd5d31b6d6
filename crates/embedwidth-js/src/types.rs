//! Types exposed to JavaScript via wasm-bindgen.

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

use embedwidth_core::Signal;

/// What changed in an editor view since the last update.
///
/// Mirrors the flags of an editor view update; omitted flags are false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewUpdate {
    pub doc_changed: bool,
    pub viewport_changed: bool,
    pub geometry_changed: bool,
    pub focus_changed: bool,
}

impl ViewUpdate {
    /// Scheduler signals for the set flags.
    pub fn signals(&self) -> impl Iterator<Item = Signal> {
        [
            (self.doc_changed, Signal::DocumentChanged),
            (self.viewport_changed, Signal::ViewportChanged),
            (self.geometry_changed, Signal::GeometryChanged),
            (self.focus_changed, Signal::FocusChanged),
        ]
        .into_iter()
        .filter_map(|(set, signal)| set.then_some(signal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_signals() {
        let update = ViewUpdate {
            doc_changed: true,
            focus_changed: true,
            ..Default::default()
        };
        let signals: Vec<_> = update.signals().collect();
        assert_eq!(signals, [Signal::DocumentChanged, Signal::FocusChanged]);
        assert_eq!(ViewUpdate::default().signals().count(), 0);
    }
}
