use std::fmt;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::parse::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error(transparent)]
    Selector(#[from] ParseError),

    #[error("target has no parent to insert beside")]
    Detached,

    #[error("node handle does not belong to this document")]
    ForeignNode,

    #[error("node cannot be inserted there")]
    HierarchyRequest,

    #[error("reference node is not a child of the parent")]
    NotAChild,

    /// A host document rejected the call; carries its message.
    #[error("document error: {0}")]
    Host(String),
}

/// How an external script finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutcome {
    Loaded,
    Failed,
}

/// The document operations the runtime injector needs.
///
/// Node handles are cheap to clone. Methods take `&self`: implementations
/// keep their own interior mutability and must not hold a borrow across
/// the receivers they hand out.
pub trait Dom {
    type Node: Clone + fmt::Debug;

    /// Whether the document is still parsing.
    fn is_loading(&self) -> bool;

    /// Resolves once the document is interactive. Resolves immediately if
    /// it already is.
    fn on_ready(&self) -> oneshot::Receiver<()>;

    /// First element matching `selector` in document order.
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Node>, DomError>;

    /// Parse markup into detached nodes. Scripts produced here never run.
    fn parse_fragment(&self, html: &str) -> Result<Vec<Self::Node>, DomError>;

    /// Lowercase tag name, `None` for text and comments.
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    fn attributes(&self, node: &Self::Node) -> Vec<(String, String)>;

    fn text_content(&self, node: &Self::Node) -> String;

    fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    fn create_element(&self, tag: &str) -> Result<Self::Node, DomError>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;

    /// Replace the children of `node` with a single text node.
    fn set_text(&self, node: &Self::Node, text: &str) -> Result<(), DomError>;

    /// Copy of the node without its children. Text and comment data is
    /// kept, and so is a script's started state: a cloned script that
    /// already ran will not run again.
    fn clone_shallow(&self, node: &Self::Node) -> Result<Self::Node, DomError>;

    /// Insert `child` into `parent` before `reference`, or last when it is
    /// `None`. A child that already has a parent is moved.
    fn insert_before(
        &self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), DomError>;

    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    fn remove_children(&self, node: &Self::Node) -> Result<(), DomError>;

    /// Resolves when the external `script` loads or fails. Register before
    /// inserting the script so a synchronous settle is not missed.
    fn on_script_settled(&self, script: &Self::Node) -> oneshot::Receiver<ScriptOutcome>;
}
