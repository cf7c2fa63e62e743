//! Client-side injection of transported payloads into a document.
//!
//! [`Injector::run`] inserts each payload's markup at its selector and
//! activates the scripts inside it in document order. An external script
//! holds back the nodes after it until it loads or fails; every other node
//! is followed by a single cooperative yield. Payloads are isolated: a
//! failure is logged, recorded in the [`InjectionReport`] and the run moves
//! on to the next payload.
//!
//! [`MemoryDom`] runs the injector anywhere. With the `web` feature,
//! `WebDom` drives a browser document and `injectPayloads` is exported to
//! JavaScript through `wasm-bindgen`.

mod dom;
mod memory;
#[cfg(feature = "web")]
mod web;

use std::fmt;

use thiserror::Error;

pub use dom::{Dom, DomError, ScriptOutcome};
pub use memory::{MemoryDom, NodeId, ScriptRun};
#[cfg(feature = "web")]
pub use web::{WebDom, inject_payloads};

use crate::StandardPosition;
use crate::transport::{self, EncodedPayload, TransportError};

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("no element matches selector '{selector}'")]
    SelectorMiss { selector: String },

    #[error(transparent)]
    Decode(#[from] TransportError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// What happened to one payload.
#[derive(Debug)]
pub enum PayloadOutcome {
    /// `nodes` top-level nodes were inserted; `scripts` scripts were rebuilt.
    Inserted { nodes: usize, scripts: usize },
    Skipped(InjectError),
}

impl PayloadOutcome {
    #[must_use]
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted { .. })
    }
}

/// One [`PayloadOutcome`] per payload, in payload order.
#[derive(Debug, Default)]
pub struct InjectionReport {
    pub outcomes: Vec<PayloadOutcome>,
}

impl InjectionReport {
    #[must_use]
    pub fn inserted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_inserted()).count()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.inserted()
    }
}

impl fmt::Display for InjectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} payloads: {} inserted, {} skipped",
            self.outcomes.len(),
            self.inserted(),
            self.skipped()
        )
    }
}

/// Runs payloads against a borrowed [`Dom`].
///
/// Only top-level external scripts hold back later nodes. A `src` script
/// nested inside another element is rebuilt and runs, but its siblings are
/// inserted without waiting for it to load.
#[derive(Debug)]
pub struct Injector<'d, D: Dom> {
    dom: &'d D,
}

impl<'d, D: Dom> Injector<'d, D> {
    #[must_use]
    pub fn new(dom: &'d D) -> Self {
        Self { dom }
    }

    /// Decode the transported JSON array and run it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Json`] if `json` is not a payload array.
    /// Nothing is inserted in that case.
    pub async fn run_json(&self, json: &str) -> Result<InjectionReport, TransportError> {
        let payloads = transport::from_json(json)?;
        Ok(self.run(&payloads).await)
    }

    /// Wait for the document to be ready, then inject `payloads` in order.
    pub async fn run(&self, payloads: &[EncodedPayload]) -> InjectionReport {
        if self.dom.is_loading() {
            tracing::debug!("document loading, waiting for ready");
            if self.dom.on_ready().await.is_err() {
                tracing::warn!("ready signal dropped, injecting anyway");
            }
        }

        let mut report = InjectionReport {
            outcomes: Vec::with_capacity(payloads.len()),
        };
        for (index, payload) in payloads.iter().enumerate() {
            let outcome = match self.inject(payload).await {
                Ok((nodes, scripts)) => PayloadOutcome::Inserted { nodes, scripts },
                Err(err) => {
                    tracing::warn!(
                        index,
                        selector = %payload.selector,
                        error = %err,
                        "payload skipped"
                    );
                    PayloadOutcome::Skipped(err)
                }
            };
            report.outcomes.push(outcome);
        }
        tracing::info!(
            payloads = payloads.len(),
            inserted = report.inserted(),
            skipped = report.skipped(),
            "injection finished"
        );
        report
    }

    async fn inject(&self, payload: &EncodedPayload) -> Result<(usize, usize), InjectError> {
        let dom = self.dom;
        let target = dom
            .query_selector(&payload.selector)?
            .ok_or_else(|| InjectError::SelectorMiss {
                selector: payload.selector.clone(),
            })?;
        let code = transport::decode_code(&payload.code)?;
        let nodes = dom.parse_fragment(&code)?;

        // Anchors are taken before anything moves so every node lands at
        // the same place, in fragment order.
        let position = StandardPosition::from_str_or_append(&payload.position);
        let (parent, reference) = match position {
            StandardPosition::Append => (target, None),
            StandardPosition::Replace => {
                dom.remove_children(&target)?;
                (target, None)
            }
            StandardPosition::Prepend => {
                let first = dom.first_child(&target);
                (target, first)
            }
            StandardPosition::Before => {
                let parent = dom.parent(&target).ok_or(DomError::Detached)?;
                (parent, Some(target))
            }
            StandardPosition::After => {
                let parent = dom.parent(&target).ok_or(DomError::Detached)?;
                let next = dom.next_sibling(&target);
                (parent, next)
            }
        };

        let mut scripts = 0;
        for node in &nodes {
            if self.is_script(node) {
                let fresh = self.rebuild_script(node)?;
                scripts += 1;
                if let Some(src) = external_src(&dom.attributes(&fresh)) {
                    let settled = dom.on_script_settled(&fresh);
                    dom.insert_before(&parent, &fresh, reference.as_ref())?;
                    match settled.await {
                        Ok(ScriptOutcome::Loaded) => tracing::debug!(%src, "external script loaded"),
                        Ok(ScriptOutcome::Failed) => {
                            tracing::warn!(%src, "external script failed to load");
                        }
                        Err(_) => tracing::warn!(%src, "external script never settled"),
                    }
                    continue;
                }
                dom.insert_before(&parent, &fresh, reference.as_ref())?;
            } else if self.contains_script(node) {
                let copy = self.clone_activating(node, &mut scripts)?;
                dom.insert_before(&parent, &copy, reference.as_ref())?;
            } else {
                dom.insert_before(&parent, node, reference.as_ref())?;
            }
            tokio::task::yield_now().await;
        }
        tracing::debug!(
            selector = %payload.selector,
            %position,
            nodes = nodes.len(),
            scripts,
            "payload inserted"
        );
        Ok((nodes.len(), scripts))
    }

    fn is_script(&self, node: &D::Node) -> bool {
        self.dom.tag_name(node).as_deref() == Some("script")
    }

    fn contains_script(&self, node: &D::Node) -> bool {
        self.dom
            .child_nodes(node)
            .iter()
            .any(|child| self.is_script(child) || self.contains_script(child))
    }

    /// A new script element carrying the attributes and text of `script`.
    fn rebuild_script(&self, script: &D::Node) -> Result<D::Node, DomError> {
        let fresh = self.dom.create_element("script")?;
        for (name, value) in self.dom.attributes(script) {
            self.dom.set_attribute(&fresh, &name, &value)?;
        }
        let text = self.dom.text_content(script);
        if !text.is_empty() {
            self.dom.set_text(&fresh, &text)?;
        }
        Ok(fresh)
    }

    /// Structural copy of `node` with every nested script rebuilt.
    /// Nested external scripts are not awaited.
    fn clone_activating(&self, node: &D::Node, scripts: &mut usize) -> Result<D::Node, DomError> {
        if self.is_script(node) {
            *scripts += 1;
            return self.rebuild_script(node);
        }
        let copy = self.dom.clone_shallow(node)?;
        for child in self.dom.child_nodes(node) {
            let child = self.clone_activating(&child, scripts)?;
            self.dom.append_child(&copy, &child)?;
        }
        Ok(copy)
    }
}

fn external_src(attrs: &[(String, String)]) -> Option<String> {
    attrs
        .iter()
        .find(|(name, _)| name == "src")
        .map(|(_, value)| value.clone())
}
