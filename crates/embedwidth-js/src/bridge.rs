//! Source providers backed by host callbacks.

use std::cell::RefCell;
use std::ops::Range;

use js_sys::Function;
use wasm_bindgen::JsValue;
use web_sys::{Element, Node};

use embedwidth_browser::{DomEmbed, PlatformError, SourceProvider, js_error};
use embedwidth_core::text;

/// Live editor: full document text plus a DOM-to-position mapping.
pub struct EditorBridge {
    doc_text: Function,
    pos_at_dom: Function,
}

impl EditorBridge {
    /// `doc_text()` returns the document as a string. `pos_at_dom(el)`
    /// returns the element's UTF-16 document offset, `null` when unmapped,
    /// and may throw.
    pub fn new(doc_text: Function, pos_at_dom: Function) -> Self {
        Self {
            doc_text,
            pos_at_dom,
        }
    }
}

impl SourceProvider<DomEmbed> for EditorBridge {
    fn source_text(&self) -> Option<String> {
        call_for_text(&self.doc_text)
    }

    fn position_of(&self, node: &DomEmbed, source: &str) -> Result<Option<usize>, PlatformError> {
        let value = self
            .pos_at_dom
            .call1(&JsValue::NULL, node.element())
            .map_err(js_error)?;
        let Some(position) = value.as_f64() else {
            return Ok(None);
        };
        if position < 0.0 || position.fract() != 0.0 {
            return Err(PlatformError(format!("invalid position {position}")));
        }

        text::utf16_to_byte(source, position as usize)
            .map(Some)
            .ok_or_else(|| PlatformError(format!("position {position} past end of document")))
    }
}

#[derive(Debug)]
struct RenderedSection {
    element: Element,
    first_line: usize,
    last_line: usize,
    /// Seen in the document at least once.
    attached: bool,
}

impl RenderedSection {
    /// Sections arrive detached and are inserted later. One that was in the
    /// document and has left it was re-rendered or scrolled away.
    fn is_gone(&mut self) -> bool {
        let connected = self.element.is_connected();
        self.attached |= connected;
        self.attached && !connected
    }
}

/// Read view: file content plus the line ranges of rendered sections.
pub struct FileBridge {
    file_content: Function,
    sections: RefCell<Vec<RenderedSection>>,
}

impl FileBridge {
    /// `file_content()` returns the file text, or `null` while it is unavailable.
    pub fn new(file_content: Function) -> Self {
        Self {
            file_content,
            sections: RefCell::default(),
        }
    }

    /// Remember which source lines (zero-based, inclusive) `element` was
    /// rendered from. `element` may still be detached. Sections that have
    /// left the document are forgotten.
    pub fn record_section(&self, element: Element, first_line: usize, last_line: usize) {
        let mut sections = self.sections.borrow_mut();
        sections.retain_mut(|s| s.element != element && !s.is_gone());
        let attached = element.is_connected();
        sections.push(RenderedSection {
            element,
            first_line,
            last_line,
            attached,
        });
    }
}

impl SourceProvider<DomEmbed> for FileBridge {
    fn source_text(&self) -> Option<String> {
        call_for_text(&self.file_content)
    }

    fn scope_of(&self, node: &DomEmbed, source: &str) -> Option<Range<usize>> {
        let target: &Node = node.element();
        let sections = self.sections.borrow();
        let section = sections.iter().find(|s| s.element.contains(Some(target)))?;
        text::lines_range(source, section.first_line, section.last_line)
    }
}

fn call_for_text(function: &Function) -> Option<String> {
    match function.call0(&JsValue::NULL) {
        Ok(value) => value.as_string(),
        Err(e) => {
            tracing::debug!(error = ?e, "source callback threw");
            None
        }
    }
}

#[cfg(all(test, target_arch = "wasm32", target_os = "unknown"))]
mod tests {
    use std::rc::Rc;

    use wasm_bindgen_test::*;
    use web_sys::Document;

    use embedwidth_browser::{DomEmbed, ValidatedConfig, mount_live, mount_read};

    use super::*;

    wasm_bindgen_test_configure!(run_in_browser);

    /// `posAtDom` stub: reads the offset from a `data-pos` attribute,
    /// `null` when the attribute is missing.
    fn pos_from_attribute() -> Function {
        Function::new_with_args(
            "el",
            "const pos = el.getAttribute('data-pos'); return pos === null ? null : Number(pos);",
        )
    }

    fn text_fn(text: &str) -> Function {
        Function::new_no_args(&format!("return {text:?};"))
    }

    fn document() -> Document {
        web_sys::window().unwrap().document().unwrap()
    }

    fn embed_el(src: &str, pos: Option<&str>) -> Element {
        let el = document().create_element("span").unwrap();
        el.set_class_name("internal-embed");
        el.set_attribute("src", src).unwrap();
        if let Some(pos) = pos {
            el.set_attribute("data-pos", pos).unwrap();
        }
        el
    }

    fn dom_embed(el: &Element) -> DomEmbed {
        DomEmbed::new(el.clone(), Rc::new(ValidatedConfig::default().names))
    }

    fn attached_view() -> (Element, Element) {
        let doc = document();
        let marker = doc.create_element("div").unwrap();
        let root = doc.create_element("div").unwrap();
        marker.append_child(&root).unwrap();
        doc.body().unwrap().append_child(&marker).unwrap();
        (root, marker)
    }

    // === EditorBridge ===

    #[wasm_bindgen_test]
    fn test_position_converted_from_utf16() {
        // The emoji is two UTF-16 units and four bytes.
        let text = "🎉 ![[a.png|wide]]";
        let bridge = EditorBridge::new(text_fn(text), pos_from_attribute());
        let node = dom_embed(&embed_el("a.png", Some("3")));

        assert_eq!(bridge.source_text().as_deref(), Some(text));
        assert_eq!(bridge.position_of(&node, text), Ok(Some(5)));
    }

    #[wasm_bindgen_test]
    fn test_unmapped_position_is_unknown() {
        let bridge = EditorBridge::new(text_fn("![[a.png]]"), pos_from_attribute());
        let node = dom_embed(&embed_el("a.png", None));
        assert_eq!(bridge.position_of(&node, "![[a.png]]"), Ok(None));
    }

    #[wasm_bindgen_test]
    fn test_bad_positions_are_errors() {
        let text = "![[a.png]]";
        let bridge = EditorBridge::new(text_fn(text), pos_from_attribute());
        for pos in ["1.5", "-1", "999"] {
            let node = dom_embed(&embed_el("a.png", Some(pos)));
            assert!(bridge.position_of(&node, text).is_err(), "{pos}");
        }

        let throwing = Function::new_with_args("el", "throw new Error('not in view');");
        let bridge = EditorBridge::new(text_fn(text), throwing);
        let node = dom_embed(&embed_el("a.png", Some("0")));
        assert!(bridge.position_of(&node, text).is_err());
    }

    #[wasm_bindgen_test]
    fn test_live_shared_line_through_positions() {
        let text = "🎉 ![[a.png]] ![[b.png|full]]";
        let (root, marker) = attached_view();
        let a = embed_el("a.png", Some("3"));
        let b = embed_el("b.png", Some("14"));
        root.append_child(&a).unwrap();
        root.append_child(&b).unwrap();

        let bridge = EditorBridge::new(text_fn(text), pos_from_attribute());
        let handle = mount_live(root, marker.clone(), bridge, &ValidatedConfig::default()).unwrap();
        let report = handle.reconcile_now().unwrap();

        assert_eq!(report.annotated, 1);
        assert_eq!(report.unresolved, 0);
        assert!(!a.has_attribute("data-width"));
        assert_eq!(b.get_attribute("data-width").as_deref(), Some("full"));
        assert!(marker.class_list().contains("has-custom-width"));
    }

    // === FileBridge ===

    const DUPLICATES: &str = "![[a.png|wide]]\n\n![[a.png|full]]";

    fn section(embed: &Element) -> Element {
        let el = document().create_element("div").unwrap();
        el.append_child(embed).unwrap();
        el
    }

    #[wasm_bindgen_test]
    fn test_detached_sections_are_kept() {
        let bridge = FileBridge::new(text_fn(DUPLICATES));
        let first = embed_el("a.png", None);
        let second = embed_el("a.png", None);
        let first_section = section(&first);
        let second_section = section(&second);

        // Post-processors see sections before they are inserted.
        bridge.record_section(first_section.clone(), 0, 0);
        bridge.record_section(second_section.clone(), 2, 2);

        let (root, _marker) = attached_view();
        root.append_child(&first_section).unwrap();
        root.append_child(&second_section).unwrap();

        assert_eq!(
            bridge.scope_of(&dom_embed(&first), DUPLICATES),
            text::lines_range(DUPLICATES, 0, 0)
        );
        assert_eq!(
            bridge.scope_of(&dom_embed(&second), DUPLICATES),
            text::lines_range(DUPLICATES, 2, 2)
        );
    }

    #[wasm_bindgen_test]
    fn test_removed_sections_are_forgotten() {
        let bridge = FileBridge::new(text_fn(DUPLICATES));
        let first = embed_el("a.png", None);
        let first_section = section(&first);
        bridge.record_section(first_section.clone(), 0, 0);

        let (root, _marker) = attached_view();
        root.append_child(&first_section).unwrap();
        bridge.record_section(section(&embed_el("a.png", None)), 2, 2);
        assert!(bridge.scope_of(&dom_embed(&first), DUPLICATES).is_some());

        // Re-rendered: the old section leaves the document.
        first_section.remove();
        bridge.record_section(section(&embed_el("a.png", None)), 0, 0);
        assert_eq!(bridge.scope_of(&dom_embed(&first), DUPLICATES), None);
    }

    #[wasm_bindgen_test]
    fn test_read_view_duplicates_follow_sections() {
        let (root, marker) = attached_view();
        let bridge = FileBridge::new(text_fn(DUPLICATES));
        let first = embed_el("a.png", None);
        let second = embed_el("a.png", None);
        let first_section = section(&first);
        let second_section = section(&second);
        bridge.record_section(first_section.clone(), 0, 0);
        bridge.record_section(second_section.clone(), 2, 2);
        root.append_child(&first_section).unwrap();
        root.append_child(&second_section).unwrap();

        let handle = mount_read(root, marker, bridge, &ValidatedConfig::default()).unwrap();
        let report = handle.reconcile_now().unwrap();

        assert_eq!(report.annotated, 2);
        assert_eq!(first.get_attribute("data-width").as_deref(), Some("wide"));
        assert_eq!(second.get_attribute("data-width").as_deref(), Some("full"));
    }
}
