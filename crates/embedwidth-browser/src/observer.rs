//! Subtree mutation observation.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MutationObserver, MutationObserverInit};

use embedwidth_core::{MutationSource, ObserveFilter, PlatformError, Signal};

use crate::js_error;
use crate::platform::SinkSlot;

/// Delivers `Signal::DomMutated` for changes under a container root.
#[derive(Debug, Clone)]
pub struct DomMutationSource {
    sink: SinkSlot,
}

impl DomMutationSource {
    pub fn new(sink: SinkSlot) -> Self {
        Self { sink }
    }
}

/// A connected observer. Disconnected by [`MutationSource::unsubscribe`].
pub struct DomSubscription {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array)>,
}

impl MutationSource<Element> for DomMutationSource {
    type Subscription = DomSubscription;

    fn subscribe(
        &self,
        root: &Element,
        filter: &ObserveFilter,
    ) -> Result<DomSubscription, PlatformError> {
        let sink = self.sink.clone();
        let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |records: js_sys::Array| {
            tracing::trace!(records = records.length(), "container subtree mutated");
            sink.deliver(|session| session.signal(Signal::DomMutated));
        });

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(js_error)?;

        let init = MutationObserverInit::new();
        init.set_child_list(filter.child_list);
        init.set_subtree(filter.subtree);
        if !filter.attributes.is_empty() {
            let names: js_sys::Array = filter
                .attributes
                .iter()
                .map(|name| JsValue::from_str(name))
                .collect();
            init.set_attributes(true);
            init.set_attribute_filter(&names);
        }

        observer
            .observe_with_options(root, &init)
            .map_err(js_error)?;
        tracing::debug!(attributes = ?filter.attributes, "mutation observer connected");

        Ok(DomSubscription {
            observer,
            _callback: callback,
        })
    }

    fn unsubscribe(&self, subscription: DomSubscription) {
        subscription.observer.disconnect();
        tracing::debug!("mutation observer disconnected");
    }
}
