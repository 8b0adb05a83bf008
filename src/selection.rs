//! County selection for comparisons.

use serde::Serialize;
use thiserror::Error;

/// Maximum number of counties that can be compared at once.
pub const MAX_SELECTION: usize = 5;

/// Minimum number of counties a comparison needs.
pub const MIN_COMPARISON: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("at most {} counties can be compared; remove one before adding '{0}'", MAX_SELECTION)]
    Full(String),

    #[error("select at least {} counties to compare (currently {0})", MIN_COMPARISON)]
    TooFew(usize),
}

/// A selected county.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedCounty {
    pub code: String,
    pub name: String,
}

/// What a [`Selection::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// Insertion-ordered set of county codes, capped at [`MAX_SELECTION`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    items: Vec<SelectedCounty>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `code` if selected, otherwise append it.
    ///
    /// Adding to a full selection fails and leaves it unchanged.
    pub fn toggle(&mut self, code: &str, name: &str) -> Result<Toggled, SelectionError> {
        if self.remove(code) {
            return Ok(Toggled::Removed);
        }

        if self.items.len() >= MAX_SELECTION {
            return Err(SelectionError::Full(code.to_string()));
        }

        self.items.push(SelectedCounty {
            code: code.to_string(),
            name: name.to_string(),
        });
        Ok(Toggled::Added)
    }

    /// Remove `code`. Returns whether it was selected.
    pub fn remove(&mut self, code: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|c| c.code != code);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedCounty> {
        self.items.iter()
    }

    /// Selected codes in insertion order.
    pub fn codes(&self) -> Vec<String> {
        self.items.iter().map(|c| c.code.clone()).collect()
    }

    /// Fails unless enough counties are selected to compare.
    pub fn ensure_comparable(&self) -> Result<(), SelectionError> {
        if self.items.len() < MIN_COMPARISON {
            return Err(SelectionError::TooFew(self.items.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_selection() -> Selection {
        let mut selection = Selection::new();
        for i in 0..MAX_SELECTION {
            selection
                .toggle(&format!("C{}", i), &format!("County {}", i))
                .unwrap();
        }
        selection
    }

    #[test]
    fn test_toggle_adds_in_order() {
        let mut selection = Selection::new();
        assert_eq!(selection.toggle("B", "Bee").unwrap(), Toggled::Added);
        assert_eq!(selection.toggle("A", "Ay").unwrap(), Toggled::Added);
        assert_eq!(selection.codes(), vec!["B", "A"]);
    }

    #[test]
    fn test_toggle_full_rejects_sixth() {
        let mut selection = full_selection();
        let err = selection.toggle("NEW", "New").unwrap_err();
        assert_eq!(err, SelectionError::Full("NEW".to_string()));
        assert_eq!(selection.len(), MAX_SELECTION);
        assert!(!selection.codes().contains(&"NEW".to_string()));
        assert_eq!(selection.codes()[0], "C0");
    }

    #[test]
    fn test_toggle_selected_removes() {
        let mut selection = full_selection();
        assert_eq!(selection.toggle("C2", "County 2").unwrap(), Toggled::Removed);
        assert_eq!(selection.len(), MAX_SELECTION - 1);
        assert!(!selection.codes().contains(&"C2".to_string()));
    }

    #[test]
    fn test_toggle_twice_never_duplicates() {
        let mut selection = Selection::new();
        selection.toggle("A", "A").unwrap();
        selection.toggle("A", "A").unwrap();
        selection.toggle("A", "A").unwrap();
        assert_eq!(selection.codes(), vec!["A"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut selection = full_selection();
        assert!(selection.remove("C4"));
        assert!(!selection.remove("C4"));
        selection.clear();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_ensure_comparable() {
        let mut selection = Selection::new();
        selection.toggle("A", "A").unwrap();
        assert_eq!(
            selection.ensure_comparable(),
            Err(SelectionError::TooFew(1))
        );
        selection.toggle("B", "B").unwrap();
        assert!(selection.ensure_comparable().is_ok());
    }
}
