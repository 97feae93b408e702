//! Flat picker lists with idempotent insertion and sort-key ordering.
//!
//! Reference lists are re-fetched periodically, so insertion has to be a
//! no-op for identifiers that are already present. Ordering runs off a
//! dedicated sort key rather than the display text, because several pickers
//! sort by a different field than the one they show.

use std::collections::HashSet;

/// One entry of a flat picker list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOption {
    /// Identifier unique within the list.
    pub id: String,
    /// Value submitted when the option is chosen (a URL or a path).
    pub value: String,
    /// Text shown by the widget.
    pub text: String,
    /// Ordering attribute. Options inserted without one carry the empty
    /// string and therefore sort first.
    pub sort_key: String,
}

/// An ordered, deduplicated list of picker options.
#[derive(Debug, Clone, Default)]
pub struct OptionList {
    options: Vec<ListOption>,
    seen: HashSet<String>,
}

impl OptionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an option keyed by the display text. Returns `false` without
    /// touching the list if the identifier is already present.
    pub fn insert(&mut self, id: &str, value: &str, text: &str) -> bool {
        self.insert_with_key(id, value, text, Some(text))
    }

    /// Insert an option with an explicit sort key, or none at all. Returns
    /// `false` without touching the list if the identifier is already
    /// present.
    pub fn insert_with_key(
        &mut self,
        id: &str,
        value: &str,
        text: &str,
        sort_key: Option<&str>,
    ) -> bool {
        if !self.seen.insert(id.to_string()) {
            return false;
        }

        self.options.push(ListOption {
            id: id.to_string(),
            value: value.to_string(),
            text: text.to_string(),
            sort_key: sort_key.unwrap_or_default().to_string(),
        });

        true
    }

    /// Reorder all options ascending by sort key. The sort is stable, so
    /// options sharing a key keep their insertion order.
    pub fn sort(&mut self) {
        self.options.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    }

    pub fn get(&self, id: &str) -> Option<&ListOption> {
        self.options.iter().find(|option| option.id == id)
    }

    /// The submit value carried by the option with this identifier.
    pub fn value_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|option| option.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
