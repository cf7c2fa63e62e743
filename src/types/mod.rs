mod context;
mod error;
mod mode;
mod payload;
mod position;
mod record;
mod rule;

pub use context::PageContext;
pub use error::RecordError;
pub use mode::{Alignment, DeviceTarget, MatchMode};
pub use payload::InjectionPayload;
pub use position::{ContentPosition, Position, StandardPosition};
pub use record::{RuleRecord, StoredRule, rules_from_json};
pub use rule::{Incompleteness, Rule, RuleBuilder, RuleId, Variant};
