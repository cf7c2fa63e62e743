use std::collections::HashSet;
use std::path::Path;

use crate::{InjectorError, Rule, RuleId, RuleRecord, rules_from_json};

/// Source of the ordered rule collection for a render.
///
/// The engine only reads from a store. Iteration order matters: matched
/// content rules are spliced in this order.
pub trait RuleStore {
    fn list_rules(&self) -> Vec<Rule>;
}

impl RuleStore for Vec<Rule> {
    fn list_rules(&self) -> Vec<Rule> {
        self.clone()
    }
}

impl<S: RuleStore + ?Sized> RuleStore for &S {
    fn list_rules(&self) -> Vec<Rule> {
        (**self).list_rules()
    }
}

/// Insertion-ordered store kept in memory.
///
/// Ids start at 1, increase monotonically and are never handed out twice,
/// even after the rule holding them is removed.
#[derive(Debug, Clone)]
pub struct InMemoryRuleStore {
    rules: Vec<Rule>,
    next_id: u64,
    retired: HashSet<RuleId>,
}

impl Default for InMemoryRuleStore {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            next_id: 1,
            retired: HashSet::new(),
        }
    }
}

impl InMemoryRuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rule under a fresh id, ignoring any id it already carries.
    pub fn insert(&mut self, mut rule: Rule) -> RuleId {
        let id = RuleId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        rule.set_id(id);
        self.rules.push(rule);
        id
    }

    /// Store a rule keeping its id when that id is in use by no rule and
    /// was never retired by [`Self::remove`]. Otherwise the rule gets a
    /// fresh id. Later inserts never hand a kept id out.
    pub fn restore(&mut self, rule: Rule) -> RuleId {
        let id = rule.id();
        if id == RuleId::UNASSIGNED || self.retired.contains(&id) || self.get(id).is_some() {
            return self.insert(rule);
        }
        // The top id would leave nothing for later inserts.
        let Some(after) = id.0.checked_add(1) else {
            return self.insert(rule);
        };
        self.next_id = self.next_id.max(after);
        self.rules.push(rule);
        id
    }

    /// Load the JSON at-rest form, migrating legacy single-code rules.
    ///
    /// # Errors
    ///
    /// Returns [`InjectorError::Json`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self, InjectorError> {
        let mut store = Self::new();
        for rule in rules_from_json(json)? {
            store.restore(rule);
        }
        Ok(store)
    }

    /// # Errors
    ///
    /// Returns [`InjectorError::Io`] if the file cannot be read, or the
    /// errors of [`Self::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InjectorError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Import flat records; each gets a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`InjectorError::Record`] for the first record that does not
    /// convert. Nothing is imported in that case.
    pub fn import_records<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a RuleRecord>,
    ) -> Result<Vec<RuleId>, InjectorError> {
        let rules = records
            .into_iter()
            .map(Rule::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules.into_iter().map(|rule| self.insert(rule)).collect())
    }

    /// Every stored rule as a flat record, in order.
    #[must_use]
    pub fn export_records(&self) -> Vec<RuleRecord> {
        self.rules.iter().map(Rule::to_record).collect()
    }

    #[must_use]
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id() == id)
    }

    /// Replace the stored rule with the same id, keeping its position.
    /// Returns `false` if no rule has that id.
    pub fn update(&mut self, rule: Rule) -> bool {
        match self.rules.iter_mut().find(|r| r.id() == rule.id()) {
            Some(slot) => {
                *slot = rule;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: RuleId) -> Option<Rule> {
        let idx = self.rules.iter().position(|r| r.id() == id)?;
        self.retired.insert(id);
        Some(self.rules.remove(idx))
    }

    /// Copy a rule under a fresh id, appended at the end.
    pub fn duplicate(&mut self, id: RuleId) -> Option<RuleId> {
        let mut copy = self.get(id)?.clone();
        copy.name = format!("{} (copy)", copy.name);
        Some(self.insert(copy))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

impl RuleStore for InMemoryRuleStore {
    fn list_rules(&self) -> Vec<Rule> {
        self.rules.clone()
    }
}

impl FromIterator<Rule> for InMemoryRuleStore {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut store = Self::new();
        for rule in iter {
            store.insert(rule);
        }
        store
    }
}
