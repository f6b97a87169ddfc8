use crate::Cli;
use anyhow::{Context, Result};
use glyphfield_input::OrbitControls;
use glyphfield_scene::{PerspectiveCamera, SceneConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "glyphfield".into(),
            width: 1280,
            height: 720,
        }
    }
}

/// Demo settings, read from an optional JSON file and overridden by flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub font: PathBuf,
    pub texture: PathBuf,
    /// Scatter seed. Entropy when absent.
    pub seed: Option<u64>,
    pub window: WindowConfig,
    pub scene: SceneConfig,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            font: PathBuf::from("assets/fonts/FZFW ZhuZi MinchoS B_Regular.json"),
            texture: PathBuf::from("assets/textures/matcaps/1.png"),
            seed: None,
            window: WindowConfig::default(),
            scene: SceneConfig::default(),
            camera: PerspectiveCamera::default(),
            controls: OrbitControls::default(),
        }
    }
}

impl DemoConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// The config file named by `--config` (or defaults), with flags applied.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail once the window is up.
    pub fn validate(&self) -> Result<()> {
        self.controls.validate().context("controls")?;
        self.scene.scatter.validate().context("scatter")?;
        Ok(())
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(font) = &cli.font {
            self.font = font.clone();
        }
        if let Some(texture) = &cli.texture {
            self.texture = texture.clone();
        }
        if let Some(text) = &cli.text {
            self.scene.text = text.clone();
        }
        if let Some(seed) = cli.seed {
            self.seed = Some(seed);
        }
        if let Some(count) = cli.count {
            self.scene.scatter.count = count;
        }
    }
}
