use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Bucket for help lines that no script metadata claims
pub const UNREFERENCED: &str = "UnReferenced";

/// Describes a loaded script and the commands it answers to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptMetadata {
    pub name: String,
    pub description: Option<String>,
    pub commands: Vec<String>,
    pub notes: Option<String>,
    pub author: Option<String>,
}

impl ScriptMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }
}

/// Collects help text and script metadata for the robot
#[derive(Default)]
pub struct HelpCatalog {
    entries: RwLock<Vec<ScriptMetadata>>,
}

impl HelpCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add loose help lines, skipping ones already listed
    pub fn add_help<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let index = match entries.iter().position(|e| e.name == UNREFERENCED) {
            Some(i) => i,
            None => {
                entries.push(
                    ScriptMetadata::new(UNREFERENCED).with_description(
                        "Commands not referenced in a script file's summary details",
                    ),
                );
                entries.len() - 1
            }
        };

        let bucket = &mut entries[index];
        for line in lines {
            let line = line.into();
            if !bucket.commands.contains(&line) {
                bucket.commands.push(line);
            }
        }
    }

    /// Add metadata, replacing any earlier entry with the same name
    pub fn add_metadata(&self, metadata: ScriptMetadata) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|e| e.name == metadata.name) {
            Some(existing) => *existing = metadata,
            None => entries.push(metadata),
        }
    }

    /// All non-empty help lines, in registration order
    pub fn commands(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flat_map(|e| e.commands.iter())
            .filter(|c| !c.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> Vec<ScriptMetadata> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Names of every script with metadata, excluding the loose bucket
    pub fn script_names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.name != UNREFERENCED)
            .map(|e| e.name.clone())
            .collect()
    }
}
