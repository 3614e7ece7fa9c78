//! Scoreboard objectives and per-holder scores.

use indexmap::IndexMap;
use std::collections::HashMap;

/// All objectives of one machine.
///
/// Scores only exist on objectives that were created with
/// `scoreboard objectives add`; writes to unknown objectives fail.
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    objectives: IndexMap<String, HashMap<String, i32>>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an objective. Returns `false` if it already exists.
    pub fn add_objective(&mut self, name: &str) -> bool {
        if self.objectives.contains_key(name) {
            return false;
        }
        self.objectives.insert(name.to_string(), HashMap::new());
        true
    }

    pub fn has_objective(&self, name: &str) -> bool {
        self.objectives.contains_key(name)
    }

    pub fn get(&self, holder: &str, objective: &str) -> Option<i32> {
        self.objectives.get(objective)?.get(holder).copied()
    }

    /// Set a score. Returns `false` if the objective does not exist.
    pub fn set(&mut self, holder: &str, objective: &str, value: i32) -> bool {
        match self.objectives.get_mut(objective) {
            Some(scores) => {
                scores.insert(holder.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Remove one score. Returns whether it was set.
    pub fn reset(&mut self, holder: &str, objective: &str) -> bool {
        self.objectives
            .get_mut(objective)
            .is_some_and(|scores| scores.remove(holder).is_some())
    }

    /// Remove a holder from every objective.
    pub fn reset_all(&mut self, holder: &str) -> bool {
        let mut removed = false;
        for scores in self.objectives.values_mut() {
            removed |= scores.remove(holder).is_some();
        }
        removed
    }

    /// Holders with a score on `objective`, sorted.
    pub fn holders(&self, objective: &str) -> Vec<&str> {
        let mut holders: Vec<&str> = self
            .objectives
            .get(objective)
            .map(|scores| scores.keys().map(String::as_str).collect())
            .unwrap_or_default();
        holders.sort_unstable();
        holders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_objective_rejects_writes() {
        let mut board = Scoreboard::new();
        assert!(!board.set("x", "var", 1));
        assert_eq!(board.get("x", "var"), None);
    }

    #[test]
    fn test_set_get_reset() {
        let mut board = Scoreboard::new();
        assert!(board.add_objective("var"));
        assert!(!board.add_objective("var"));
        board.set("v1", "var", 7);
        assert_eq!(board.get("v1", "var"), Some(7));
        assert!(board.reset("v1", "var"));
        assert!(!board.reset("v1", "var"));
        assert_eq!(board.get("v1", "var"), None);
    }

    #[test]
    fn test_holders_sorted() {
        let mut board = Scoreboard::new();
        board.add_objective("var");
        board.set("b", "var", 1);
        board.set("a", "var", 2);
        assert_eq!(board.holders("var"), vec!["a", "b"]);
        assert!(board.reset_all("a"));
        assert_eq!(board.holders("var"), vec!["b"]);
    }
}
