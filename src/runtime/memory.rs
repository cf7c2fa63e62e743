//! An in-memory document implementing [`Dom`].
//!
//! Script handling follows browser rules closely enough for the injector
//! to be observed without a browser: scripts created by the parser never
//! run, a script created with [`Dom::create_element`] runs when it is first
//! connected to the body, and an external script stays pending until the
//! host calls [`MemoryDom::settle_script`].

use std::cell::RefCell;
use std::collections::HashMap;

use tokio::sync::oneshot;

use super::dom::{Dom, DomError, ScriptOutcome};
use crate::parse::{
    self, Combinator, ComplexSelector, HtmlNode, escape_attr, escape_text, is_raw_text, is_void,
};

/// Handle to a node of a [`MemoryDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One entry of the execution log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRun {
    /// Inline script body, recorded when the script is connected.
    Inline(String),
    /// External script `src`, recorded when it loads.
    External(String),
}

#[derive(Debug, Clone)]
enum Data {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        already_started: bool,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    data: Data,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct PendingScript {
    node: NodeId,
    src: String,
}

#[derive(Debug)]
struct Inner {
    nodes: Vec<NodeData>,
    body: NodeId,
    loading: bool,
    ready_waiters: Vec<oneshot::Sender<()>>,
    pending: Vec<PendingScript>,
    settle_waiters: HashMap<NodeId, Vec<oneshot::Sender<ScriptOutcome>>>,
    executed: Vec<ScriptRun>,
}

impl Inner {
    fn new(loading: bool) -> Self {
        let body = NodeData {
            data: Data::Element {
                tag: "body".to_owned(),
                attrs: Vec::new(),
                already_started: false,
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![body],
            body: NodeId(0),
            loading,
            ready_waiters: Vec::new(),
            pending: Vec::new(),
            settle_waiters: HashMap::new(),
            executed: Vec::new(),
        }
    }

    fn alloc(&mut self, data: Data) -> NodeId {
        self.nodes.push(NodeData {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn get(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.nodes.get(id.0).ok_or(DomError::ForeignNode)
    }

    /// Materialize parsed nodes. Every script built here counts as started.
    fn build(&mut self, parsed: Vec<HtmlNode>, parent: Option<NodeId>) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(parsed.len());
        for node in parsed {
            let (data, children) = match node {
                HtmlNode::Element {
                    tag,
                    attrs,
                    children,
                } => (
                    Data::Element {
                        tag,
                        attrs,
                        already_started: true,
                    },
                    children,
                ),
                HtmlNode::Text(text) => (Data::Text(text), Vec::new()),
                HtmlNode::Comment(body) => (Data::Comment(body), Vec::new()),
            };
            let id = self.alloc(data);
            self.nodes[id.0].parent = parent;
            let kids = self.build(children, Some(id));
            self.nodes[id.0].children = kids;
            ids.push(id);
        }
        ids
    }

    fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, Data::Element { .. })
    }

    fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            Data::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node.0].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn is_connected(&self, id: NodeId) -> bool {
        self.is_inclusive_ancestor(self.body, id)
    }

    /// Node and its descendants in document order.
    fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    fn text_content(&self, id: NodeId) -> String {
        match &self.nodes[id.0].data {
            Data::Text(text) => text.clone(),
            Data::Comment(_) => String::new(),
            Data::Element { .. } => self
                .subtree(id)
                .into_iter()
                .filter_map(|n| match &self.nodes[n.0].data {
                    Data::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.get(parent)?;
        self.get(child)?;
        if let Some(reference) = reference {
            if self.get(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild);
            }
        }
        if !self.is_element(parent) || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        let reference = match reference {
            Some(r) if r == child => self.next_sibling(child),
            other => other,
        };

        self.detach(child);
        let siblings = &mut self.nodes[parent.0].children;
        let index = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);

        if self.is_connected(parent) {
            self.run_connected_scripts(child);
        }
        Ok(())
    }

    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id.0].parent?;
        let siblings = &self.nodes[parent.0].children;
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    fn run_connected_scripts(&mut self, root: NodeId) {
        for id in self.subtree(root) {
            let src = match &mut self.nodes[id.0].data {
                Data::Element {
                    tag,
                    attrs,
                    already_started,
                } if tag.as_str() == "script" && !*already_started => {
                    *already_started = true;
                    attrs
                        .iter()
                        .find(|(k, _)| k == "src")
                        .map(|(_, v)| v.clone())
                }
                _ => continue,
            };
            match src {
                Some(src) => {
                    tracing::debug!(%src, "external script started loading");
                    self.pending.push(PendingScript { node: id, src });
                }
                None => {
                    let body = self.text_content(id);
                    self.executed.push(ScriptRun::Inline(body));
                }
            }
        }
    }

    fn matches_complex(&self, id: NodeId, selector: &ComplexSelector, index: usize) -> bool {
        let Some(tag) = self.tag(id) else {
            return false;
        };
        let attrs = match &self.nodes[id.0].data {
            Data::Element { attrs, .. } => attrs.as_slice(),
            _ => &[],
        };
        if !selector.compounds[index].matches(tag, attrs) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match selector.combinators[index - 1] {
            Combinator::Child => self.nodes[id.0]
                .parent
                .is_some_and(|p| self.matches_complex(p, selector, index - 1)),
            Combinator::Descendant => {
                let mut ancestor = self.nodes[id.0].parent;
                while let Some(a) = ancestor {
                    if self.matches_complex(a, selector, index - 1) {
                        return true;
                    }
                    ancestor = self.nodes[a.0].parent;
                }
                false
            }
        }
    }

    fn query_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let list = parse::parse_selector(selector)?;
        Ok(self
            .subtree(self.body)
            .into_iter()
            .filter(|&id| {
                list.0
                    .iter()
                    .any(|complex| self.matches_complex(id, complex, complex.compounds.len() - 1))
            })
            .collect())
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].data {
            Data::Text(text) => {
                let raw = self.nodes[id.0]
                    .parent
                    .and_then(|p| self.tag(p))
                    .is_some_and(is_raw_text);
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            Data::Comment(body) => {
                out.push_str("<!--");
                out.push_str(body);
                out.push_str("-->");
            }
            Data::Element { tag, attrs, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                self.write_children(id, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn write_children(&self, id: NodeId, out: &mut String) {
        for &child in &self.nodes[id.0].children {
            self.write_node(child, out);
        }
    }
}

/// Single-threaded in-memory document rooted at a `<body>` element.
///
/// Nodes live in an append-only arena: detached nodes, including those
/// dropped by [`Dom::remove_children`] and every [`Dom::parse_fragment`]
/// result, are never freed. Use one `MemoryDom` per page render.
///
/// ```
/// use snippet_injector::runtime::{Dom, MemoryDom};
///
/// let dom = MemoryDom::new("<main><p class=\"lead\">hi</p></main>");
/// let lead = dom.query_selector("main > .lead").unwrap().unwrap();
/// assert_eq!(dom.outer_html(lead), "<p class=\"lead\">hi</p>");
/// ```
#[derive(Debug)]
pub struct MemoryDom {
    inner: RefCell<Inner>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new("")
    }
}

impl MemoryDom {
    /// A document that has finished loading, with `body_html` as the body.
    #[must_use]
    pub fn new(body_html: &str) -> Self {
        Self::with_state(body_html, false)
    }

    /// A document still loading; [`Dom::on_ready`] waits for [`Self::fire_ready`].
    #[must_use]
    pub fn loading(body_html: &str) -> Self {
        Self::with_state(body_html, true)
    }

    fn with_state(body_html: &str, loading: bool) -> Self {
        let mut inner = Inner::new(loading);
        let body = inner.body;
        let children = inner.build(parse::parse_html(body_html), Some(body));
        inner.nodes[body.0].children = children;
        Self {
            inner: RefCell::new(inner),
        }
    }

    /// Mark the document interactive and wake every ready waiter.
    pub fn fire_ready(&self) {
        let waiters = {
            let mut inner = self.inner.borrow_mut();
            inner.loading = false;
            std::mem::take(&mut inner.ready_waiters)
        };
        for tx in waiters {
            let _ = tx.send(());
        }
    }

    #[must_use]
    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    #[must_use]
    pub fn body_html(&self) -> String {
        self.inner_html(self.body())
    }

    #[must_use]
    pub fn inner_html(&self, node: NodeId) -> String {
        let inner = self.inner.borrow();
        let mut out = String::new();
        if inner.get(node).is_ok() {
            inner.write_children(node, &mut out);
        }
        out
    }

    #[must_use]
    pub fn outer_html(&self, node: NodeId) -> String {
        let inner = self.inner.borrow();
        let mut out = String::new();
        if inner.get(node).is_ok() {
            inner.write_node(node, &mut out);
        }
        out
    }

    /// Every element matching `selector`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::Selector`] if the selector does not parse.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        self.inner.borrow().query_all(selector)
    }

    /// `src` of each external script that started loading and has not settled.
    #[must_use]
    pub fn pending_scripts(&self) -> Vec<String> {
        self.inner
            .borrow()
            .pending
            .iter()
            .map(|p| p.src.clone())
            .collect()
    }

    /// Finish the oldest pending script loading `src`.
    ///
    /// Returns `false` if no such script is pending.
    pub fn settle_script(&self, src: &str, outcome: ScriptOutcome) -> bool {
        let waiters = {
            let mut inner = self.inner.borrow_mut();
            let Some(index) = inner.pending.iter().position(|p| p.src == src) else {
                return false;
            };
            let script = inner.pending.remove(index);
            if outcome == ScriptOutcome::Loaded {
                inner.executed.push(ScriptRun::External(script.src));
            }
            inner
                .settle_waiters
                .remove(&script.node)
                .unwrap_or_default()
        };
        for tx in waiters {
            let _ = tx.send(outcome);
        }
        true
    }

    /// Scripts that ran, in execution order.
    #[must_use]
    pub fn executed(&self) -> Vec<ScriptRun> {
        self.inner.borrow().executed.clone()
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn is_loading(&self) -> bool {
        self.inner.borrow().loading
    }

    fn on_ready(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.borrow_mut();
        if inner.loading {
            inner.ready_waiters.push(tx);
        } else {
            let _ = tx.send(());
        }
        rx
    }

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    fn parse_fragment(&self, html: &str) -> Result<Vec<NodeId>, DomError> {
        Ok(self.inner.borrow_mut().build(parse::parse_html(html), None))
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        let inner = self.inner.borrow();
        inner.get(*node).ok()?;
        inner.tag(*node).map(str::to_owned)
    }

    fn attributes(&self, node: &NodeId) -> Vec<(String, String)> {
        match self.inner.borrow().get(*node).map(|n| &n.data) {
            Ok(Data::Element { attrs, .. }) => attrs.clone(),
            _ => Vec::new(),
        }
    }

    fn text_content(&self, node: &NodeId) -> String {
        let inner = self.inner.borrow();
        if inner.get(*node).is_err() {
            return String::new();
        }
        inner.text_content(*node)
    }

    fn child_nodes(&self, node: &NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .get(*node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.inner.borrow().get(*node).ok()?.parent
    }

    fn first_child(&self, node: &NodeId) -> Option<NodeId> {
        self.inner.borrow().get(*node).ok()?.children.first().copied()
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let inner = self.inner.borrow();
        inner.get(*node).ok()?;
        inner.next_sibling(*node)
    }

    fn create_element(&self, tag: &str) -> Result<NodeId, DomError> {
        Ok(self.inner.borrow_mut().alloc(Data::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            already_started: false,
        }))
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.get(*node)?;
        let Data::Element { attrs, .. } = &mut inner.nodes[node.0].data else {
            return Err(DomError::HierarchyRequest);
        };
        let name = name.to_ascii_lowercase();
        match attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => value.clone_into(v),
            None => attrs.push((name, value.to_owned())),
        }
        Ok(())
    }

    fn set_text(&self, node: &NodeId, text: &str) -> Result<(), DomError> {
        self.remove_children(node)?;
        let mut inner = self.inner.borrow_mut();
        let text_node = inner.alloc(Data::Text(text.to_owned()));
        // A text child never starts a script, so skip the connected walk.
        inner.nodes[node.0].children.push(text_node);
        inner.nodes[text_node.0].parent = Some(*node);
        Ok(())
    }

    fn clone_shallow(&self, node: &NodeId) -> Result<NodeId, DomError> {
        let mut inner = self.inner.borrow_mut();
        let data = inner.get(*node)?.data.clone();
        Ok(inner.alloc(data))
    }

    fn insert_before(
        &self,
        parent: &NodeId,
        child: &NodeId,
        reference: Option<&NodeId>,
    ) -> Result<(), DomError> {
        self.inner
            .borrow_mut()
            .insert_before(*parent, *child, reference.copied())
    }

    fn remove_children(&self, node: &NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.get(*node)?;
        if !inner.is_element(*node) {
            return Err(DomError::HierarchyRequest);
        }
        let children = std::mem::take(&mut inner.nodes[node.0].children);
        for child in children {
            inner.nodes[child.0].parent = None;
        }
        Ok(())
    }

    fn on_script_settled(&self, script: &NodeId) -> oneshot::Receiver<ScriptOutcome> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .borrow_mut()
            .settle_waiters
            .entry(*script)
            .or_default()
            .push(tx);
        rx
    }
}
