use crate::{MatcapMaterial, Mesh, MeshId, Scene, SceneError, ScatterParams, populate_scatter};
use glam::Vec3;
use glyphfield_assets::{AssetError, Font, MatcapTexture};
use glyphfield_geometry::{Geometry, TextParams, TorusParams, build_text, torus};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

/// Everything that decides what goes into the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub text: String,
    pub text_params: TextParams,
    pub torus: TorusParams,
    pub scatter: ScatterParams,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            text: "にんげんになりたいですわ".into(),
            text_params: TextParams::default(),
            torus: TorusParams::default(),
            scatter: ScatterParams::default(),
        }
    }
}

/// Edge length of the procedural matcap used when the texture fails to load.
pub const FALLBACK_MATCAP_SIZE: u32 = 256;

/// The loaded matcap, or a procedural one if loading failed.
pub fn matcap_or_fallback(result: Result<MatcapTexture, AssetError>) -> MatcapTexture {
    match result {
        Ok(texture) => texture,
        Err(e) => {
            tracing::warn!("matcap texture unavailable, using fallback: {e}");
            MatcapTexture::fallback(FALLBACK_MATCAP_SIZE)
        }
    }
}

/// What happened to the text mesh during setup.
#[derive(Debug, Clone, PartialEq)]
pub enum TextStatus {
    Built {
        mesh: MeshId,
        /// Translation applied by centering.
        offset: Vec3,
        missing: Vec<char>,
    },
    /// The font did not load; the scene holds the scatter only.
    FontFailed(String),
    /// The font loaded but the text could not be extruded.
    GeometryFailed(String),
}

impl TextStatus {
    pub fn is_built(&self) -> bool {
        matches!(self, TextStatus::Built { .. })
    }

    pub fn mesh(&self) -> Option<MeshId> {
        match self {
            TextStatus::Built { mesh, .. } => Some(*mesh),
            _ => None,
        }
    }
}

/// The populated demo scene and the handles shared by its meshes.
#[derive(Debug)]
pub struct DemoScene {
    pub scene: Scene,
    pub material: Arc<MatcapMaterial>,
    pub torus: Arc<Geometry>,
    pub text: TextStatus,
    pub scatter: Vec<MeshId>,
}

impl DemoScene {
    /// Wait for the font, then build the scene. The text is extruded once,
    /// after the font future resolves.
    pub async fn load<F, R>(
        font: F,
        matcap: MatcapTexture,
        config: &SceneConfig,
        rng: &mut R,
    ) -> Result<Self, SceneError>
    where
        F: Future<Output = Result<Font, AssetError>>,
        R: Rng + ?Sized,
    {
        let font = font.await;
        Self::assemble(font, matcap, config, rng)
    }

    /// Build the scene from an already resolved font load.
    ///
    /// A failed font or text build leaves the scene without text but still
    /// scattered. Only invalid torus or scatter parameters are errors.
    pub fn assemble<R: Rng + ?Sized>(
        font: Result<Font, AssetError>,
        matcap: MatcapTexture,
        config: &SceneConfig,
        rng: &mut R,
    ) -> Result<Self, SceneError> {
        let mut scene = Scene::new();
        let material = Arc::new(MatcapMaterial::new("matcap", matcap));

        let text = match font {
            Ok(font) => add_text(&mut scene, &font, &material, config),
            Err(e) => {
                tracing::error!("font load failed, rendering without text: {e}");
                TextStatus::FontFailed(e.to_string())
            }
        };

        let torus = Arc::new(torus(&config.torus)?);
        let scatter = populate_scatter(&mut scene, &torus, &material, &config.scatter, rng)?;

        tracing::info!(
            meshes = scene.len(),
            text = text.is_built(),
            "scene ready"
        );

        Ok(Self {
            scene,
            material,
            torus,
            text,
            scatter,
        })
    }
}

fn add_text(
    scene: &mut Scene,
    font: &Font,
    material: &Arc<MatcapMaterial>,
    config: &SceneConfig,
) -> TextStatus {
    let mut text = match build_text(&config.text, font, &config.text_params) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("text geometry failed, rendering without text: {e}");
            return TextStatus::GeometryFailed(e.to_string());
        }
    };
    let offset = text.center();
    tracing::debug!(
        ?offset,
        error = ?text.centering_error(),
        "text centered"
    );

    let mesh = scene.add(Mesh::new("text", Arc::new(text.geometry), material.clone()));
    TextStatus::Built {
        mesh,
        offset,
        missing: text.missing,
    }
}
