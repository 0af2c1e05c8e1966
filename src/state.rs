//! Persistent application state
//!
//! Stores favorites, saved gigs, analysis history, and generated gigs in a
//! single flat JSON document. Loading tolerates a missing or corrupt file by
//! falling back to the default empty state; saving rewrites the whole
//! document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur when persisting state
#[derive(Debug, Error)]
pub enum StateError {
    /// Writing the state file failed
    #[error("failed to write state file: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the state failed
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The persisted document layout
///
/// BTreeMaps keep the file diff-stable across saves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Favorite keywords, in insertion order
    #[serde(default)]
    pub favorites: Vec<String>,
    /// Saved gig payloads keyed by keyword
    #[serde(default)]
    pub saved_gigs: BTreeMap<String, Value>,
    /// Keyword analysis results keyed by keyword
    #[serde(default)]
    pub analysis_history: BTreeMap<String, Value>,
    /// Generated gig listings keyed by keyword
    #[serde(default)]
    pub generated_gigs: BTreeMap<String, Value>,
}

/// Manages loading and saving application state to a JSON file
#[derive(Debug, Clone)]
pub struct StateManager {
    state_file: PathBuf,
}

impl StateManager {
    /// Creates a state manager backed by the given file
    pub fn new(state_file: PathBuf) -> Self {
        Self { state_file }
    }

    /// Loads the current state
    ///
    /// A missing or unparseable file yields the default empty state; a seller
    /// losing history beats the tool refusing to start.
    pub fn load(&self) -> AppState {
        match fs::read_to_string(&self.state_file) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    warn!("state file is corrupt, starting fresh: {e}");
                    AppState::default()
                }
            },
            Err(_) => AppState::default(),
        }
    }

    /// Saves the full state document
    pub fn save(&self, state: &AppState) -> Result<(), StateError> {
        if let Some(parent) = self.state_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.state_file, json)?;
        Ok(())
    }

    /// Returns the favorite keywords
    pub fn favorites(&self) -> Vec<String> {
        self.load().favorites
    }

    /// Adds a keyword to favorites; already-present keywords are left alone
    pub fn add_favorite(&self, keyword: &str) -> Result<(), StateError> {
        let mut state = self.load();
        if !state.favorites.iter().any(|k| k == keyword) {
            state.favorites.push(keyword.to_string());
            self.save(&state)?;
        }
        Ok(())
    }

    /// Removes a keyword from favorites if present
    pub fn remove_favorite(&self, keyword: &str) -> Result<(), StateError> {
        let mut state = self.load();
        let before = state.favorites.len();
        state.favorites.retain(|k| k != keyword);
        if state.favorites.len() != before {
            self.save(&state)?;
        }
        Ok(())
    }

    /// Stores a saved gig payload for a keyword
    pub fn save_gig(&self, keyword: &str, gig: Value) -> Result<(), StateError> {
        let mut state = self.load();
        state.saved_gigs.insert(keyword.to_string(), gig);
        self.save(&state)
    }

    /// Deletes a saved gig for a keyword
    pub fn delete_gig(&self, keyword: &str) -> Result<(), StateError> {
        let mut state = self.load();
        if state.saved_gigs.remove(keyword).is_some() {
            self.save(&state)?;
        }
        Ok(())
    }

    /// Records an analysis result in the history
    pub fn add_to_history(&self, keyword: &str, analysis: Value) -> Result<(), StateError> {
        let mut state = self.load();
        state.analysis_history.insert(keyword.to_string(), analysis);
        self.save(&state)
    }

    /// Returns the analysis history
    pub fn analysis_history(&self) -> BTreeMap<String, Value> {
        self.load().analysis_history
    }

    /// Records a generated gig listing
    pub fn add_generated_gig(&self, keyword: &str, gig: Value) -> Result<(), StateError> {
        let mut state = self.load();
        state.generated_gigs.insert(keyword.to_string(), gig);
        self.save(&state)
    }

    /// Returns the generated gig listings
    pub fn generated_gigs(&self) -> BTreeMap<String, Value> {
        self.load().generated_gigs
    }

    /// Resets everything to the default empty state
    pub fn clear(&self) -> Result<(), StateError> {
        self.save(&AppState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_state() -> (StateManager, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let manager = StateManager::new(temp_dir.path().join("app_state.json"));
        (manager, temp_dir)
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let (manager, _temp_dir) = create_test_state();
        assert_eq!(manager.load(), AppState::default());
    }

    #[test]
    fn test_load_corrupt_file_returns_default() {
        let (manager, temp_dir) = create_test_state();
        fs::write(temp_dir.path().join("app_state.json"), "{not json").unwrap();

        assert_eq!(manager.load(), AppState::default());
    }

    #[test]
    fn test_favorites_add_is_idempotent() {
        let (manager, _temp_dir) = create_test_state();

        manager.add_favorite("logo design").unwrap();
        manager.add_favorite("logo design").unwrap();
        manager.add_favorite("seo").unwrap();

        assert_eq!(manager.favorites(), vec!["logo design", "seo"]);
    }

    #[test]
    fn test_favorites_remove() {
        let (manager, _temp_dir) = create_test_state();
        manager.add_favorite("logo design").unwrap();
        manager.add_favorite("seo").unwrap();

        manager.remove_favorite("logo design").unwrap();

        assert_eq!(manager.favorites(), vec!["seo"]);
        // Removing an absent keyword is a no-op
        manager.remove_favorite("absent").unwrap();
        assert_eq!(manager.favorites(), vec!["seo"]);
    }

    #[test]
    fn test_saved_gigs_roundtrip() {
        let (manager, _temp_dir) = create_test_state();
        let gig = json!({"title": "I will design a logo", "price": 50});

        manager.save_gig("logo design", gig.clone()).unwrap();

        assert_eq!(manager.load().saved_gigs["logo design"], gig);

        manager.delete_gig("logo design").unwrap();
        assert!(manager.load().saved_gigs.is_empty());
    }

    #[test]
    fn test_history_and_generated_gigs_persist_across_managers() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("app_state.json");

        {
            let manager = StateManager::new(path.clone());
            manager
                .add_to_history("seo", json!({"trend": "Growing"}))
                .unwrap();
            manager
                .add_generated_gig("seo", json!({"title": "I will do SEO"}))
                .unwrap();
        }

        let manager = StateManager::new(path);
        assert_eq!(manager.analysis_history()["seo"], json!({"trend": "Growing"}));
        assert_eq!(
            manager.generated_gigs()["seo"],
            json!({"title": "I will do SEO"})
        );
    }

    #[test]
    fn test_clear_resets_everything() {
        let (manager, _temp_dir) = create_test_state();
        manager.add_favorite("seo").unwrap();
        manager.save_gig("seo", json!({})).unwrap();

        manager.clear().unwrap();

        assert_eq!(manager.load(), AppState::default());
    }
}
