use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use indexmap::{map::Values, IndexMap};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::track::Track;

const HISTORY_FILE: &str = "tracks.json";
const MAX_TRACKS: usize = 200;

/// Tracks seen across invocations, keyed by id in first-seen order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackHistory {
    tracks: IndexMap<String, Track>,
}

impl TrackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces known ids in place and appends new ones.
    pub fn merge<I: IntoIterator<Item = Track>>(&mut self, tracks: I) {
        for track in tracks {
            self.tracks.insert(track.id.clone(), track);
        }
        if self.tracks.len() > MAX_TRACKS {
            let overflow = self.tracks.len() - MAX_TRACKS;
            self.tracks.drain(0..overflow);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn iter(&self) -> Values<'_, String, Track> {
        self.tracks.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.tracks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "Tunecraft", "Tunecraft")
            .ok_or_else(|| anyhow!("unable to determine config directory"))?;
        Ok(dirs.config_dir().join(HISTORY_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read track history at {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse track history {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("failed to encode track history")?;
        fs::write(path, data)
            .with_context(|| format!("failed to write track history to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::UNTITLED;
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    fn track(id: &str, status: &str) -> Track {
        Track {
            id: id.into(),
            title: UNTITLED.into(),
            status: Some(status.into()),
            model_name: None,
            created_at: None,
            audio_url: None,
            image_url: None,
            lyrics: None,
            error_message: None,
            extras: Map::new(),
        }
    }

    #[test]
    fn merge_replaces_in_place_and_appends() {
        let mut history = TrackHistory::new();
        history.merge([track("a", "queued"), track("b", "queued")]);
        history.merge([track("c", "queued"), track("a", "complete")]);

        assert_eq!(history.ids(), vec!["a", "b", "c"]);
        assert_eq!(history.get("a").unwrap().status.as_deref(), Some("complete"));
    }

    #[test]
    fn oldest_entries_are_dropped_past_the_cap() {
        let mut history = TrackHistory::new();
        history.merge((0..MAX_TRACKS + 3).map(|index| track(&format!("t{index}"), "complete")));
        assert_eq!(history.len(), MAX_TRACKS);
        assert!(history.get("t0").is_none());
        assert_eq!(history.iter().next().unwrap().id, "t3");
    }

    #[test]
    fn survives_a_save_load_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(HISTORY_FILE);

        let mut history = TrackHistory::new();
        let mut finished = track("a", "complete");
        finished.audio_url = Some("https://cdn/a.mp3".into());
        finished.extras.insert("tags".into(), "lofi".into());
        history.merge([finished, track("b", "streaming")]);
        history.save_to(&path).unwrap();

        let loaded = TrackHistory::load_from(&path).unwrap();
        assert_eq!(loaded, history);
    }

    #[test]
    fn missing_file_is_an_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = TrackHistory::load_from(&dir.path().join(HISTORY_FILE)).unwrap();
        assert!(loaded.is_empty());
    }
}
