use serde::{Deserialize, Serialize};

use super::position::StandardPosition;

/// The minimal unit handed to the client runtime for one matched rule.
///
/// `code` is already variant-resolved and alignment-wrapped. It is base64
/// encoded only at the transport boundary, see [`crate::transport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionPayload {
    pub selector: String,
    pub position: StandardPosition,
    pub code: String,
}

impl InjectionPayload {
    pub fn new(selector: impl Into<String>, position: StandardPosition, code: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            position,
            code: code.into(),
        }
    }

    /// A payload is deliverable only with a selector and non-blank code.
    #[must_use]
    pub fn is_deliverable(&self) -> bool {
        !self.selector.trim().is_empty() && !self.code.trim().is_empty()
    }
}
