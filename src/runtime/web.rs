//! Browser [`Dom`] over `web-sys`, and the wasm export that injects the
//! payload global a render emitted.
//!
//! The page loads the `wasm-bindgen` module and calls `injectPayloads` with
//! the global's name; [`crate::transport::bootstrap_script`] emits that call.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::oneshot;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, EventTarget, HtmlTemplateElement, Node, NodeList};

use super::dom::{Dom, DomError, ScriptOutcome};
use super::{InjectionReport, Injector};
use crate::parse::ParseError;

type Slot<T> = Rc<RefCell<Option<oneshot::Sender<T>>>>;

fn js_message(err: &JsValue) -> String {
    err.dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{err:?}"))
}

fn host(err: JsValue) -> DomError {
    DomError::Host(js_message(&err))
}

fn collect(list: &NodeList) -> Vec<Node> {
    (0..list.length()).filter_map(|i| list.item(i)).collect()
}

/// Send `value` through `slot` the first time `event` fires on `target`.
fn listen<T: 'static>(
    target: &EventTarget,
    event: &str,
    slot: &Slot<T>,
    value: T,
) -> Result<(), JsValue> {
    let slot = Rc::clone(slot);
    let callback = Closure::once_into_js(move || {
        if let Some(tx) = slot.borrow_mut().take() {
            let _ = tx.send(value);
        }
    });
    target.add_event_listener_with_callback(event, callback.unchecked_ref())
}

/// The live document of a browser window.
#[derive(Debug, Clone)]
pub struct WebDom {
    document: Document,
}

impl WebDom {
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// # Errors
    ///
    /// Returns [`DomError::Host`] outside a window context.
    pub fn from_window() -> Result<Self, DomError> {
        web_sys::window()
            .and_then(|window| window.document())
            .map(Self::new)
            .ok_or_else(|| DomError::Host("no window document".to_owned()))
    }
}

impl Dom for WebDom {
    type Node = Node;

    fn is_loading(&self) -> bool {
        self.document.ready_state() == "loading"
    }

    fn on_ready(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if !self.is_loading() {
            let _ = tx.send(());
            return rx;
        }
        let slot = Rc::new(RefCell::new(Some(tx)));
        if let Err(err) = listen(&self.document, "DOMContentLoaded", &slot, ()) {
            tracing::warn!(error = %js_message(&err), "cannot listen for DOMContentLoaded");
            slot.borrow_mut().take();
        }
        rx
    }

    fn query_selector(&self, selector: &str) -> Result<Option<Node>, DomError> {
        self.document
            .query_selector(selector)
            .map(|found| found.map(Node::from))
            .map_err(|err| DomError::Selector(ParseError::new(js_message(&err))))
    }

    fn parse_fragment(&self, html: &str) -> Result<Vec<Node>, DomError> {
        let template = self
            .document
            .create_element("template")
            .map_err(host)?
            .dyn_into::<HtmlTemplateElement>()
            .map_err(|_| DomError::Host("template element unsupported".to_owned()))?;
        template.set_inner_html(html);
        Ok(collect(&template.content().child_nodes()))
    }

    fn tag_name(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>().map(Element::local_name)
    }

    fn attributes(&self, node: &Node) -> Vec<(String, String)> {
        let Some(element) = node.dyn_ref::<Element>() else {
            return Vec::new();
        };
        element
            .get_attribute_names()
            .iter()
            .filter_map(|name| name.as_string())
            .filter_map(|name| element.get_attribute(&name).map(|value| (name, value)))
            .collect()
    }

    fn text_content(&self, node: &Node) -> String {
        node.text_content().unwrap_or_default()
    }

    fn child_nodes(&self, node: &Node) -> Vec<Node> {
        collect(&node.child_nodes())
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn first_child(&self, node: &Node) -> Option<Node> {
        node.first_child()
    }

    fn next_sibling(&self, node: &Node) -> Option<Node> {
        node.next_sibling()
    }

    fn create_element(&self, tag: &str) -> Result<Node, DomError> {
        self.document
            .create_element(tag)
            .map(Node::from)
            .map_err(host)
    }

    fn set_attribute(&self, node: &Node, name: &str, value: &str) -> Result<(), DomError> {
        node.dyn_ref::<Element>()
            .ok_or(DomError::HierarchyRequest)?
            .set_attribute(name, value)
            .map_err(host)
    }

    fn set_text(&self, node: &Node, text: &str) -> Result<(), DomError> {
        node.set_text_content(Some(text));
        Ok(())
    }

    fn clone_shallow(&self, node: &Node) -> Result<Node, DomError> {
        node.clone_node().map_err(host)
    }

    fn insert_before(
        &self,
        parent: &Node,
        child: &Node,
        reference: Option<&Node>,
    ) -> Result<(), DomError> {
        parent
            .insert_before(child, reference)
            .map(|_| ())
            .map_err(host)
    }

    fn remove_children(&self, node: &Node) -> Result<(), DomError> {
        while let Some(child) = node.first_child() {
            node.remove_child(&child).map_err(host)?;
        }
        Ok(())
    }

    fn on_script_settled(&self, script: &Node) -> oneshot::Receiver<ScriptOutcome> {
        let (tx, rx) = oneshot::channel();
        let slot = Rc::new(RefCell::new(Some(tx)));
        let wired = listen(script, "load", &slot, ScriptOutcome::Loaded)
            .and_then(|()| listen(script, "error", &slot, ScriptOutcome::Failed));
        if let Err(err) = wired {
            tracing::warn!(error = %js_message(&err), "cannot listen for script load");
            slot.borrow_mut().take();
        }
        rx
    }
}

/// Inject the payload array stored at `window[global]` into the page.
///
/// Resolves to the run summary. An unset global injects nothing.
///
/// # Errors
///
/// Rejects outside a window or when the global is not a payload array.
#[wasm_bindgen(js_name = injectPayloads)]
pub async fn inject_payloads(global: String) -> Result<String, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let value = js_sys::Reflect::get(&window, &JsValue::from_str(&global))?;
    if value.is_undefined() || value.is_null() {
        tracing::debug!(%global, "payload global unset");
        return Ok(InjectionReport::default().to_string());
    }
    let json = String::from(js_sys::JSON::stringify(&value)?);
    let dom = WebDom::from_window().map_err(|err| JsValue::from_str(&err.to_string()))?;
    let report = Injector::new(&dom)
        .run_json(&json)
        .await
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(report.to_string())
}
