use serde::{Deserialize, Serialize};

use super::error::RecordError;
use super::mode::{Alignment, DeviceTarget, MatchMode};
use super::position::Position;
use super::rule::{Rule, RuleId, Variant};

/// Flat import/export shape of a rule, one active variant per record.
///
/// Enum-valued columns are kept as strings so that a record can be read
/// from any tabular source before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub name: String,
    pub active: bool,
    pub match_mode: String,
    pub page_id: u64,
    pub category_id: u64,
    pub selector: String,
    pub position: String,
    pub paragraph_number: u32,
    pub device_target: String,
    pub alignment: String,
    pub variant_name: String,
    pub variant_code: String,
}

impl RuleRecord {
    pub const COLUMNS: [&'static str; 12] = [
        "name",
        "active",
        "match_mode",
        "page_id",
        "category_id",
        "selector",
        "position",
        "paragraph_number",
        "device_target",
        "alignment",
        "variant_name",
        "variant_code",
    ];

    /// Build a record from `(column, value)` pairs such as a spreadsheet row.
    /// Missing columns take the rule defaults; unknown columns are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidInteger`] for unparsable numeric columns.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, RecordError> {
        let mut record = Rule::builder("").build().to_record();
        for (column, value) in pairs {
            let value = value.trim();
            match column.trim() {
                "name" => record.name = value.to_owned(),
                "active" => record.active = parse_flag(value),
                "match_mode" => record.match_mode = value.to_owned(),
                "page_id" => record.page_id = parse_int(column, value)?,
                "category_id" => record.category_id = parse_int(column, value)?,
                "selector" => record.selector = value.to_owned(),
                "position" => record.position = value.to_owned(),
                "paragraph_number" => {
                    record.paragraph_number = parse_int(column, value)?;
                }
                "device_target" => record.device_target = value.to_owned(),
                "alignment" => record.alignment = value.to_owned(),
                "variant_name" => record.variant_name = value.to_owned(),
                "variant_code" => record.variant_code = value.to_owned(),
                _ => {}
            }
        }
        Ok(record)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_int<T: std::str::FromStr + Default>(column: &str, value: &str) -> Result<T, RecordError> {
    if value.is_empty() {
        return Ok(T::default());
    }
    value.parse().map_err(|_| RecordError::InvalidInteger {
        field: column.to_owned(),
        value: value.to_owned(),
    })
}

impl Rule {
    /// Validate a flat record into a rule. The rule id stays unassigned.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when an enum column holds an unknown value.
    pub fn from_record(record: &RuleRecord) -> Result<Rule, RecordError> {
        let variant_name = if record.variant_name.is_empty() {
            "Default"
        } else {
            record.variant_name.as_str()
        };
        Ok(Rule::builder(&record.name)
            .active(record.active)
            .match_mode(record.match_mode.parse()?)
            .page_id(record.page_id)
            .category_id(record.category_id)
            .selector(&record.selector)
            .position(record.position.parse::<Position>()?)
            .paragraph(record.paragraph_number)
            .device(record.device_target.parse()?)
            .alignment(record.alignment.parse()?)
            .variant(variant_name, &record.variant_code)
            .build())
    }

    /// Export as a flat record carrying the active variant.
    #[must_use]
    pub fn to_record(&self) -> RuleRecord {
        let variant = self.active_variant();
        RuleRecord {
            name: self.name.clone(),
            active: self.active,
            match_mode: self.match_mode.as_str().to_owned(),
            page_id: self.page_id,
            category_id: self.category_id,
            selector: self.selector.clone(),
            position: self.position.as_str().to_owned(),
            paragraph_number: self.paragraph_number,
            device_target: self.device_target.as_str().to_owned(),
            alignment: self.alignment.as_str().to_owned(),
            variant_name: variant.name.clone(),
            variant_code: variant.code.clone(),
        }
    }
}

/// At-rest rule shape as persisted by the admin layer.
///
/// Accepts both the current layout (`variants` + `active_variant`) and the
/// legacy one with a single top-level `code`. Migration happens here, once,
/// so matching and injection only ever see a populated variant list.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredRule {
    #[serde(default)]
    pub id: RuleId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub page_id: u64,
    #[serde(default)]
    pub category_id: u64,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default = "default_paragraph")]
    pub paragraph_number: u32,
    #[serde(default)]
    pub device_target: DeviceTarget,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub active_variant: usize,
    #[serde(default)]
    pub code: Option<String>,
}

fn default_active() -> bool {
    true
}

fn default_paragraph() -> u32 {
    1
}

impl From<StoredRule> for Rule {
    fn from(stored: StoredRule) -> Self {
        let mut variants = stored.variants;
        if variants.is_empty() {
            if let Some(code) = stored.code {
                variants.push(Variant::new("Default", code));
            }
        }
        Rule::builder(&stored.name)
            .id(stored.id)
            .active(stored.active)
            .match_mode(stored.match_mode)
            .page_id(stored.page_id)
            .category_id(stored.category_id)
            .selector(&stored.selector)
            .position(stored.position)
            .paragraph(stored.paragraph_number)
            .device(stored.device_target)
            .alignment(stored.alignment)
            .variants(variants)
            .active_variant(stored.active_variant)
            .build()
    }
}

/// Load an ordered rule list from its JSON at-rest form.
///
/// # Errors
///
/// Returns the underlying JSON error for malformed input or unknown enum values.
pub fn rules_from_json(json: &str) -> Result<Vec<Rule>, serde_json::Error> {
    let stored: Vec<StoredRule> = serde_json::from_str(json)?;
    Ok(stored.into_iter().map(Rule::from).collect())
}
