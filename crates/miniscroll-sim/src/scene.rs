use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use miniscroll_api::Vector;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SceneLoadError {
    #[error("Scene file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to parse scene: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("IO error reading scene: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Section '{section}' inherits from undefined section '{parent}'")]
    UnknownParent { section: String, parent: String },
    #[error("Spawn refers to undefined section '{0}'")]
    UnknownSpawnSection(String),
    #[error("Clock '{0}' has a negative multiplier")]
    NegativeClock(String),
}

/// A config section: optional parent and its own key/value pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionDef {
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSetDef {
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockDef {
    #[serde(default = "default_multiplier")]
    pub multiplier: f32,
}

fn default_multiplier() -> f32 {
    1.0
}

/// Objects to create when the scene starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnDef {
    pub section: String,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Per-object overrides, readable through the object's instance section
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

fn default_count() -> u32 {
    1
}

/// One side of a scripted contact, by section name: the first live object
/// created from that section is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactDef {
    pub first: String,
    #[serde(default)]
    pub first_part: String,
    pub second: String,
    #[serde(default)]
    pub second_part: String,
    #[serde(default)]
    pub position: Vector,
    #[serde(default)]
    pub normal: Vector,
}

/// Things to do before a given tick runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub tick: u64,
    #[serde(default)]
    pub press: Vec<String>,
    #[serde(default)]
    pub spawn: Vec<String>,
    /// Sections whose live objects are all deleted
    #[serde(default)]
    pub despawn: Vec<String>,
    #[serde(default)]
    pub collide: Vec<ContactDef>,
    #[serde(default)]
    pub separate: Vec<ContactDef>,
}

/// Everything a [`SimEngine`](crate::SimEngine) needs to stand in for a game's
/// config and a scripted play session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub sections: BTreeMap<String, SectionDef>,
    #[serde(default)]
    pub input_sets: BTreeMap<String, InputSetDef>,
    #[serde(default)]
    pub clocks: BTreeMap<String, ClockDef>,
    #[serde(default)]
    pub spawn: Vec<SpawnDef>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self, SceneLoadError> {
        if !path.exists() {
            return Err(SceneLoadError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let scene = Self::parse(&content)?;
        info!(
            target: "miniscroll::sim",
            "Loaded scene from {} ({} sections, {} spawns, {} script steps)",
            path.display(),
            scene.sections.len(),
            scene.spawn.len(),
            scene.script.len()
        );
        Ok(scene)
    }

    pub fn parse(content: &str) -> Result<Self, SceneLoadError> {
        let scene: Scene = toml::from_str(content)?;
        scene.validate()?;
        Ok(scene)
    }

    fn validate(&self) -> Result<(), SceneLoadError> {
        for (name, section) in &self.sections {
            if let Some(parent) = &section.parent {
                if !self.sections.contains_key(parent) {
                    return Err(SceneLoadError::UnknownParent {
                        section: name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            if let Some(set) = section.values.get("Input") {
                if !self.input_sets.contains_key(set) {
                    warn!(target: "miniscroll::sim", "Section '{}' uses undefined input set '{}'", name, set);
                }
            }
        }

        let step_spawns = self.script.iter().flat_map(|step| step.spawn.iter());
        for section in self.spawn.iter().map(|s| &s.section).chain(step_spawns) {
            if !self.sections.contains_key(section) {
                return Err(SceneLoadError::UnknownSpawnSection(section.clone()));
            }
        }

        for (name, clock) in &self.clocks {
            if clock.multiplier < 0.0 {
                return Err(SceneLoadError::NegativeClock(name.clone()));
            }
        }
        Ok(())
    }

    /// Script steps scheduled for `tick`
    pub fn steps_at(&self, tick: u64) -> impl Iterator<Item = &ScriptStep> + '_ {
        self.script.iter().filter(move |step| step.tick == tick)
    }
}
