use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::RecordError;

/// DOM-runtime placement relative to a selector's target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardPosition {
    /// Last child of the target.
    #[default]
    Append,
    /// Before the target's first child.
    Prepend,
    /// Previous sibling of the target.
    Before,
    /// Next sibling of the target.
    After,
    /// Clear the target, then append.
    Replace,
}

impl StandardPosition {
    pub const ALL: [StandardPosition; 5] = [
        StandardPosition::Append,
        StandardPosition::Prepend,
        StandardPosition::Before,
        StandardPosition::After,
        StandardPosition::Replace,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StandardPosition::Append => "append",
            StandardPosition::Prepend => "prepend",
            StandardPosition::Before => "before",
            StandardPosition::After => "after",
            StandardPosition::Replace => "replace",
        }
    }

    /// Lenient parse used by the client runtime: anything unknown appends.
    #[must_use]
    pub fn from_str_or_append(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for StandardPosition {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StandardPosition::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| RecordError::UnknownPosition {
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for StandardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side placement inside the rendered main content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentPosition {
    BeforePost,
    BeforeContent,
    AfterContent,
    BeforeParagraph,
    AfterParagraph,
    BeforeImage,
    AfterImage,
}

impl ContentPosition {
    pub const ALL: [ContentPosition; 7] = [
        ContentPosition::BeforePost,
        ContentPosition::BeforeContent,
        ContentPosition::AfterContent,
        ContentPosition::BeforeParagraph,
        ContentPosition::AfterParagraph,
        ContentPosition::BeforeImage,
        ContentPosition::AfterImage,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentPosition::BeforePost => "before_post",
            ContentPosition::BeforeContent => "before_content",
            ContentPosition::AfterContent => "after_content",
            ContentPosition::BeforeParagraph => "before_paragraph",
            ContentPosition::AfterParagraph => "after_paragraph",
            ContentPosition::BeforeImage => "before_image",
            ContentPosition::AfterImage => "after_image",
        }
    }

    /// Whether `paragraph_number` is meaningful for this position.
    #[must_use]
    pub fn uses_paragraph(self) -> bool {
        matches!(
            self,
            ContentPosition::BeforeParagraph | ContentPosition::AfterParagraph
        )
    }
}

impl FromStr for ContentPosition {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentPosition::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| RecordError::UnknownPosition {
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for ContentPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule's placement. The family decides the injection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Position {
    Standard(StandardPosition),
    Content(ContentPosition),
}

impl Position {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Standard(p) => p.as_str(),
            Position::Content(p) => p.as_str(),
        }
    }

    #[must_use]
    pub fn is_content(self) -> bool {
        matches!(self, Position::Content(_))
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::Standard(StandardPosition::Append)
    }
}

impl From<StandardPosition> for Position {
    fn from(p: StandardPosition) -> Self {
        Position::Standard(p)
    }
}

impl From<ContentPosition> for Position {
    fn from(p: ContentPosition) -> Self {
        Position::Content(p)
    }
}

impl FromStr for Position {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<StandardPosition>()
            .map(Position::Standard)
            .or_else(|_| s.parse::<ContentPosition>().map(Position::Content))
    }
}

impl TryFrom<String> for Position {
    type Error = RecordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Position> for String {
    fn from(p: Position) -> Self {
        p.as_str().to_owned()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
