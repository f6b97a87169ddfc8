use crate::config::DemoConfig;
use glyphfield_assets::{AssetError, Font, LoadHandle, MatcapTexture, load_font, load_texture};
use glyphfield_scene::{DemoScene, SceneConfig, SceneError, matcap_or_fallback};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Asset loads in flight. Polled once per frame; builds the scene when the
/// font and the texture have both arrived. Never blocks.
pub struct SceneLoader {
    font: LoadHandle<Font>,
    texture: LoadHandle<MatcapTexture>,
    font_result: Option<Result<Font, AssetError>>,
    matcap: Option<MatcapTexture>,
    config: SceneConfig,
    rng: StdRng,
}

impl SceneLoader {
    /// Start both loads. Returns immediately.
    pub fn start(config: &DemoConfig) -> Self {
        let texture = load_texture(&config.texture);
        let font = load_font(&config.font);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(font, texture, config.scene.clone(), rng)
    }

    pub fn new(
        font: LoadHandle<Font>,
        texture: LoadHandle<MatcapTexture>,
        config: SceneConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            font,
            texture,
            font_result: None,
            matcap: None,
            config,
            rng,
        }
    }

    /// `None` while either load is running. Yields the scene once; callers
    /// drop the loader afterwards.
    pub fn poll(&mut self) -> Option<Result<DemoScene, SceneError>> {
        if self.font_result.is_none() {
            self.font_result = self.font.try_take();
        }
        if self.matcap.is_none() {
            self.matcap = self.texture.try_take().map(matcap_or_fallback);
        }
        if self.font_result.is_none() || self.matcap.is_none() {
            return None;
        }

        let font = self.font_result.take()?;
        let matcap = self.matcap.take()?;
        Some(DemoScene::assemble(font, matcap, &self.config, &mut self.rng))
    }
}
