//! WASM browser tests for embedwidth-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

#![cfg(all(target_arch = "wasm32", target_os = "unknown"))]

use std::cell::RefCell;

use gloo_timers::future::TimeoutFuture;
use wasm_bindgen_test::*;
use web_sys::{Document, Element};

use embedwidth_browser::{
    Container, DomContainer, DomEmbed, EmbedNode, Phase, SourceProvider, ValidatedConfig,
    mount_live, mount_read,
};

wasm_bindgen_test_configure!(run_in_browser);

/// Source text without a position mapping.
struct TextSource(RefCell<String>);

impl TextSource {
    fn new(text: &str) -> Self {
        Self(RefCell::new(text.to_string()))
    }
}

impl SourceProvider<DomEmbed> for TextSource {
    fn source_text(&self) -> Option<String> {
        Some(self.0.borrow().clone())
    }
}

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

/// A marker element wrapping a content root, attached to the body.
fn view() -> (Element, Element) {
    let doc = document();
    let marker = doc.create_element("div").unwrap();
    let root = doc.create_element("div").unwrap();
    marker.append_child(&root).unwrap();
    doc.body().unwrap().append_child(&marker).unwrap();
    (root, marker)
}

fn embed(root: &Element, src: &str) -> Element {
    let el = document().create_element("span").unwrap();
    el.set_class_name("internal-embed");
    el.set_attribute("src", src).unwrap();
    root.append_child(&el).unwrap();
    el
}

async fn settle(ms: u32) {
    TimeoutFuture::new(ms).await;
}

// === DOM adapters ===

#[wasm_bindgen_test]
fn test_container_queries_embeds() {
    let (root, marker) = view();
    embed(&root, "a.png");
    embed(&root, "b.png");
    let plain = document().create_element("span").unwrap();
    root.append_child(&plain).unwrap();

    let config = ValidatedConfig::default();
    let container =
        DomContainer::new(root, marker.clone(), std::rc::Rc::new(config.names.clone())).unwrap();
    let nodes = container.embed_nodes();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[1].identifier().as_deref(), Some("b.png"));

    container.set_marker(true);
    assert!(marker.class_list().contains("has-custom-width"));
    container.set_marker(false);
    assert!(!container.marker());
}

#[wasm_bindgen_test]
fn test_embed_annotation_round_trip() {
    let (root, _marker) = view();
    let el = embed(&root, "a.png");
    let config = ValidatedConfig::default();
    let node = DomEmbed::new(el.clone(), std::rc::Rc::new(config.names.clone()));

    node.set_directive(config.directives.get("max"));
    assert_eq!(el.get_attribute("data-width").as_deref(), Some("max"));
    node.set_directive(None);
    assert!(!el.has_attribute("data-width"));
}

#[wasm_bindgen_test]
fn test_invalid_selector_rejected() {
    let (root, marker) = view();
    let mut names = ValidatedConfig::default().names;
    names.embed_selector = "[[[".into();
    assert!(DomContainer::new(root, marker, std::rc::Rc::new(names)).is_err());
}

// === Sessions ===

#[wasm_bindgen_test]
async fn test_live_session_annotates_and_observes() {
    let (root, marker) = view();
    let wide = embed(&root, "a.png");
    let text = "![[a.png|wide]]\n![[b.png|full]]";

    let config = ValidatedConfig::default();
    let handle = mount_live(root.clone(), marker.clone(), TextSource::new(text), &config).unwrap();
    settle(40).await;
    assert_eq!(wide.get_attribute("data-width").as_deref(), Some("wide"));
    assert!(marker.class_list().contains("has-custom-width"));

    // Mounted after the initial pass; picked up through mutation observation.
    let full = embed(&root, "b.png");
    settle(40).await;
    assert_eq!(full.get_attribute("data-width").as_deref(), Some("full"));

    assert_eq!(handle.directive_hint(), Some(true));
    handle.teardown();
    assert_eq!(handle.phase(), Some(Phase::TornDown));
}

#[wasm_bindgen_test]
async fn test_dropped_session_stops_writing() {
    let (root, marker) = view();
    let el = embed(&root, "a.png");

    let source = TextSource::new("![[a.png|max]]");
    let handle = mount_live(root.clone(), marker, source, &ValidatedConfig::default()).unwrap();
    // Dropped before the first frame.
    drop(handle);
    settle(120).await;
    assert!(!el.has_attribute("data-width"));

    // No observer is left behind either.
    let late = embed(&root, "a.png");
    settle(40).await;
    assert!(!late.has_attribute("data-width"));
    assert!(!el.has_attribute("data-width"));
}

#[wasm_bindgen_test]
async fn test_read_session_uses_identifiers() {
    let (root, marker) = view();
    let a = embed(&root, "a.png");
    let b = embed(&root, "b.png");
    let text = "![[a.png]] ![[b.png|wide]]";

    let config = ValidatedConfig::default();
    let handle = mount_read(root, marker.clone(), TextSource::new(text), &config).unwrap();
    settle(40).await;
    assert!(!a.has_attribute("data-width"));
    assert_eq!(b.get_attribute("data-width").as_deref(), Some("wide"));
    assert!(marker.class_list().contains("has-custom-width"));

    handle.source().unwrap().0.replace("![[a.png]] ![[b.png]]".to_string());
    let report = handle.reconcile_now().unwrap();
    assert_eq!(report.annotated, 0);
    assert_eq!(handle.directive_hint(), Some(false));
    assert!(!b.has_attribute("data-width"));
    assert!(!marker.class_list().contains("has-custom-width"));
}
