use thiserror::Error;

use crate::config::ConfigError;
use crate::parse::ParseError;
use crate::runtime::DomError;
use crate::transport::TransportError;
use crate::RecordError;

/// Unified error type covering records, configuration, transport and I/O.
///
/// Returned by convenience loaders like
/// [`InMemoryRuleStore::from_json()`](crate::InMemoryRuleStore::from_json)
/// and [`InMemoryRuleStore::from_file()`](crate::InMemoryRuleStore::from_file).
#[derive(Debug, Error)]
pub enum InjectorError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid rule JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
