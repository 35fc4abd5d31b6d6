//! Embed elements and their container.
//!
//! Nodes are looked up fresh from the container root on every pass. An
//! element handle is only kept for the duration of one pass; the host is
//! free to replace embeds between passes.

use std::rc::Rc;

use smol_str::SmolStr;
use wasm_bindgen::JsCast;
use web_sys::Element;

use embedwidth_core::{Container, Directive, DomNames, EmbedNode, PlatformError};

use crate::js_error;

/// One rendered embed element.
#[derive(Debug, Clone)]
pub struct DomEmbed {
    element: Element,
    names: Rc<DomNames>,
}

impl DomEmbed {
    pub fn new(element: Element, names: Rc<DomNames>) -> Self {
        Self { element, names }
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl EmbedNode for DomEmbed {
    fn identifier(&self) -> Option<SmolStr> {
        self.element
            .get_attribute(&self.names.identifier_attribute)
            .map(SmolStr::from)
    }

    fn directive(&self) -> Option<SmolStr> {
        self.element
            .get_attribute(&self.names.directive_attribute)
            .map(SmolStr::from)
    }

    fn set_directive(&self, directive: Option<&Directive>) {
        let attribute = &self.names.directive_attribute;
        let result = match directive {
            Some(directive) => self.element.set_attribute(attribute, directive.keyword()),
            None => self.element.remove_attribute(attribute),
        };
        if let Err(e) = result {
            tracing::warn!(attribute = %attribute, error = ?e, "failed to write embed annotation");
        }
    }
}

/// The subtree of one view instance plus the element carrying its marker class.
#[derive(Debug, Clone)]
pub struct DomContainer {
    root: Element,
    marker_target: Element,
    names: Rc<DomNames>,
}

impl DomContainer {
    /// Fails if the embed selector is rejected by the browser.
    pub fn new(
        root: Element,
        marker_target: Element,
        names: Rc<DomNames>,
    ) -> Result<Self, PlatformError> {
        root.query_selector_all(&names.embed_selector)
            .map_err(js_error)?;
        Ok(Self {
            root,
            marker_target,
            names,
        })
    }

    pub fn names(&self) -> &DomNames {
        &self.names
    }

    pub fn marker_target(&self) -> &Element {
        &self.marker_target
    }
}

impl Container for DomContainer {
    type Node = DomEmbed;
    type Root = Element;

    fn root(&self) -> &Element {
        &self.root
    }

    fn embed_nodes(&self) -> Vec<DomEmbed> {
        // Single querySelectorAll per pass.
        let node_list = match self.root.query_selector_all(&self.names.embed_selector) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = ?e, "embed query failed");
                return Vec::new();
            }
        };

        (0..node_list.length())
            .filter_map(|i| node_list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| DomEmbed::new(element, self.names.clone()))
            .collect()
    }

    fn marker(&self) -> bool {
        self.marker_target
            .class_list()
            .contains(&self.names.marker_class)
    }

    fn set_marker(&self, active: bool) {
        let class_list = self.marker_target.class_list();
        if let Err(e) = class_list.toggle_with_force(&self.names.marker_class, active) {
            tracing::warn!(error = ?e, "failed to toggle container marker");
        }
    }
}
