//! Filter chips.
//!
//! Chips are toggleable search terms, typically item tags such as
//! `Tag:Graph`. Enabled chips are OR'ed together and AND'ed with whatever
//! the user typed.

use crate::query::escape_filter_text;
use serde::{Deserialize, Serialize};

/// One chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChip {
    pub text: String,
    pub enabled: bool,
}

impl FilterChip {
    /// Creates an enabled chip.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            enabled: true,
        }
    }
}

/// Ordered set of chips. Chips are unique by text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterChips {
    chips: Vec<FilterChip>,
}

impl FilterChips {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an enabled chip. Returns false if an equal chip already exists.
    pub fn add(&mut self, text: &str) -> bool {
        if self.find(text).is_some() {
            return false;
        }
        self.chips.push(FilterChip::new(text));
        true
    }

    /// Removes a chip. Returns false if it was not present.
    pub fn remove(&mut self, text: &str) -> bool {
        let before = self.chips.len();
        self.chips.retain(|chip| chip.text != text);
        self.chips.len() != before
    }

    pub fn find(&self, text: &str) -> Option<&FilterChip> {
        self.chips.iter().find(|chip| chip.text == text)
    }

    /// Returns the existing chip or appends a new enabled one.
    pub fn find_or_add(&mut self, text: &str) -> &mut FilterChip {
        let index = match self.chips.iter().position(|chip| chip.text == text) {
            Some(index) => index,
            None => {
                self.chips.push(FilterChip::new(text));
                self.chips.len() - 1
            }
        };
        &mut self.chips[index]
    }

    /// Enables or disables a chip. Returns false if it was not present.
    pub fn set_enabled(&mut self, text: &str, enabled: bool) -> bool {
        match self.chips.iter_mut().find(|chip| chip.text == text) {
            Some(chip) => {
                chip.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Flips a chip, returning its new state.
    pub fn toggle(&mut self, text: &str) -> Option<bool> {
        let chip = self.chips.iter_mut().find(|chip| chip.text == text)?;
        chip.enabled = !chip.enabled;
        Some(chip.enabled)
    }

    pub fn clear(&mut self) {
        self.chips.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterChip> {
        self.chips.iter()
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Renders the enabled chips as `(a || b)`, or an empty string when
    /// none is enabled.
    pub fn expression(&self) -> String {
        let terms: Vec<String> = self
            .chips
            .iter()
            .filter(|chip| chip.enabled)
            .map(|chip| escape_filter_text(&chip.text))
            .collect();

        if terms.is_empty() {
            String::new()
        } else {
            format!("({})", terms.join(" || "))
        }
    }
}

/// Combines the typed query with a chip expression.
pub fn compose_query(user_query: &str, chip_expression: &str) -> String {
    let user_query = user_query.trim();
    match (user_query.is_empty(), chip_expression.is_empty()) {
        (true, true) => String::new(),
        (false, true) => user_query.to_string(),
        (true, false) => chip_expression.to_string(),
        (false, false) => format!("({}) && {}", user_query, chip_expression),
    }
}
