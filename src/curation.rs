//! Human review of parsed candidates before they are saved.
//!
//! Mirrors the import screen: rows can be selected, removed and given a
//! category, then the selection is turned into drafts for the inventory
//! service. Nothing here touches storage.

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::heuristics::ParsedItem;
use serde::Serialize;
use std::collections::BTreeSet;
use time::{Date, Duration};
use tracing::{debug, info};

/// A curated item ready to be created as a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub section: String,
    pub quantity: u32,
    pub unit: String,
    pub expiry_days: Option<u32>,
}

impl ProductDraft {
    /// Expiration date for a first batch received on `today`.
    pub fn expires_on(&self, today: Date) -> Option<Date> {
        self.expiry_days
            .and_then(|days| today.checked_add(Duration::days(i64::from(days))))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportSession {
    items: Vec<ParsedItem>,
    selected: BTreeSet<usize>,
}

impl ImportSession {
    pub fn new(items: Vec<ParsedItem>) -> Self {
        Self {
            items,
            selected: BTreeSet::new(),
        }
    }

    pub fn items(&self) -> &[ParsedItem] {
        &self.items
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn toggle_selection(&mut self, index: usize) {
        if index >= self.items.len() {
            return;
        }
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    /// Select every row, or clear the selection if everything is selected.
    pub fn toggle_select_all(&mut self) {
        if self.selected.len() == self.items.len() {
            self.selected.clear();
        } else {
            self.selected = (0..self.items.len()).collect();
        }
    }

    /// Remove a row. Indices shift, so the selection is cleared.
    pub fn remove(&mut self, index: usize) -> Option<ParsedItem> {
        if index >= self.items.len() {
            return None;
        }
        self.selected.clear();
        Some(self.items.remove(index))
    }

    /// Set (or with a blank `category`, clear) one row's category.
    pub fn assign_category(&mut self, index: usize, category: &str) -> bool {
        let category = normalize_category(category);
        match self.items.get_mut(index) {
            Some(item) => {
                item.suggested_category = category;
                true
            }
            None => false,
        }
    }

    /// Apply `category` to every selected row; returns how many changed.
    pub fn assign_category_to_selected(&mut self, category: &str) -> usize {
        let category = normalize_category(category);
        for &index in &self.selected {
            if let Some(item) = self.items.get_mut(index) {
                item.suggested_category = category.clone();
            }
        }
        debug!(rows = self.selected.len(), ?category, "Bulk category assigned");
        self.selected.len()
    }

    pub fn selected_items(&self) -> Vec<&ParsedItem> {
        self.selected
            .iter()
            .filter_map(|&index| self.items.get(index))
            .collect()
    }

    /// Turn the selection into product drafts.
    pub fn drafts(&self, config: &ImportConfig) -> Result<Vec<ProductDraft>, ImportError> {
        let selected = self.selected_items();
        if selected.is_empty() {
            return Err(ImportError::NothingSelected);
        }

        let drafts: Vec<ProductDraft> = selected
            .into_iter()
            .map(|item| ProductDraft {
                name: item.name.clone(),
                section: item
                    .suggested_category
                    .clone()
                    .unwrap_or_else(|| config.default_section.clone()),
                quantity: item.quantity,
                unit: item.unit.clone(),
                expiry_days: config.default_expiry_days,
            })
            .collect();

        info!(drafts = drafts.len(), total = self.items.len(), "Drafts prepared");
        Ok(drafts)
    }
}

fn normalize_category(category: &str) -> Option<String> {
    let trimmed = category.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
