//! Rule matching and snippet injection for rendered pages.
//!
//! A [`Rule`] pairs a piece of markup with where it goes and when it fires.
//! The [`Planner`] evaluates rules against a [`PageContext`] and routes each
//! match either to the content splicer (server side, see [`splice`]) or to
//! a transport payload for the client [`runtime`].

pub mod align;
mod config;
mod error;
mod evaluate;
pub mod parse;
mod plan;
pub mod runtime;
pub mod splice;
mod store;
pub mod transport;
mod types;
pub mod variant;

pub use config::{ConfigError, EngineConfig};
pub use error::InjectorError;
pub use evaluate::{MatchOutcome, explain, matches};
pub use plan::{ContentSplice, PayloadFilter, Planner, RenderPlan};
pub use store::{InMemoryRuleStore, RuleStore};
pub use types::{
    Alignment, ContentPosition, DeviceTarget, Incompleteness, InjectionPayload, MatchMode,
    PageContext, Position, RecordError, Rule, RuleBuilder, RuleId, RuleRecord, StandardPosition,
    StoredRule, Variant, rules_from_json,
};
