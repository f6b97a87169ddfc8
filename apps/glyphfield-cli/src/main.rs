use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec2;
use glyphfield_assets::{Font, MatcapTexture, load_font, load_texture};
use glyphfield_common::Aabb;
use glyphfield_geometry::{TextParams, build_text};
use glyphfield_input::{Action, OrbitControls};
use glyphfield_render::{DebugTextRenderer, RenderLoop, Viewport};
use glyphfield_scene::{
    DemoScene, FALLBACK_MATCAP_SIZE, PerspectiveCamera, SceneConfig, matcap_or_fallback,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glyphfield-cli", about = "Headless glyphfield tools")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a typeface font's metrics
    FontInfo {
        /// Typeface JSON font
        font: PathBuf,
    },
    /// Build the text geometry and report its size
    Text {
        /// Typeface JSON font
        font: PathBuf,
        /// Text to extrude
        #[arg(long)]
        text: Option<String>,
    },
    /// Set up the scene and run frames through the text renderer
    Frames {
        /// Typeface JSON font
        font: PathBuf,
        /// Number of frames to run
        #[arg(short, long, default_value = "3")]
        frames: u64,
        /// Scatter seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Matcap texture; a procedural one is used when absent
        #[arg(long)]
        texture: Option<PathBuf>,
        /// Print every mesh transform
        #[arg(long)]
        list: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::FontInfo { font } => print!("{}", font_info(&font)?),
        Commands::Text { font, text } => print!("{}", text_report(&font, text)?),
        Commands::Frames {
            font,
            frames,
            seed,
            texture,
            list,
        } => print!("{}", run_frames(&font, texture.as_deref(), frames, seed, list)?),
    }

    Ok(())
}

fn font_info(path: &Path) -> anyhow::Result<String> {
    let font = Font::from_path(path).with_context(|| format!("loading {}", path.display()))?;
    let b = &font.bounds;
    Ok(format!(
        "family: {}\nresolution: {}\nglyphs: {}\nline height: {:.3}\nbounds: x {}..{} y {}..{}\n",
        font.family_name,
        font.resolution,
        font.glyph_count(),
        font.line_height(),
        b.x_min,
        b.x_max,
        b.y_min,
        b.y_max
    ))
}

fn fmt_aabb(aabb: &Aabb) -> String {
    let (min, max) = (aabb.min, aabb.max);
    format!(
        "({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
        min.x, min.y, min.z, max.x, max.y, max.z
    )
}

fn text_report(path: &Path, text: Option<String>) -> anyhow::Result<String> {
    let font = Font::from_path(path).with_context(|| format!("loading {}", path.display()))?;
    let text = text.unwrap_or_else(|| SceneConfig::default().text);
    let mut built = build_text(&text, &font, &TextParams::default())?;

    let mut out = format!(
        "text: {text}\nvertices: {}\ntriangles: {}\n",
        built.geometry.vertex_count(),
        built.geometry.triangle_count()
    );
    if !built.missing.is_empty() {
        let missing: String = built.missing.iter().collect();
        out += &format!("missing glyphs: {missing}\n");
    }
    out += &format!("bounds: {}\n", fmt_aabb(&built.geometry.bounding_box()));
    let offset = built.center();
    let error = built.centering_error();
    out += &format!(
        "centered: {}\noffset: ({:.3}, {:.3}, {:.3})\ncentering error: ({:.4}, {:.4}, {:.4})\n",
        fmt_aabb(&built.geometry.bounding_box()),
        offset.x,
        offset.y,
        offset.z,
        error.x,
        error.y,
        error.z
    );
    Ok(out)
}

fn run_frames(
    font: &Path,
    texture: Option<&Path>,
    frames: u64,
    seed: u64,
    list: bool,
) -> anyhow::Result<String> {
    let matcap = match texture {
        Some(path) => matcap_or_fallback(pollster::block_on(load_texture(path))),
        None => MatcapTexture::fallback(FALLBACK_MATCAP_SIZE),
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let demo = pollster::block_on(DemoScene::load(
        load_font(font),
        matcap,
        &SceneConfig::default(),
        &mut rng,
    ))?;

    let viewport = Viewport::new(1280, 720, 1.0);
    let mut camera = PerspectiveCamera::default();
    viewport.apply_to(&mut camera);
    let mut controls = OrbitControls::new(&camera);
    controls.set_viewport_height(viewport.size().1 as f32);
    // A small drag so the damped glide shows up across frames.
    controls.handle(Action::Rotate(Vec2::new(40.0, 0.0)), &camera);

    let mut renderer = DebugTextRenderer::new();
    renderer.list_meshes = list;
    let mut render_loop = RenderLoop::new();
    let last = render_loop.run_for(frames, &mut controls, &mut camera, |camera| {
        let out = glyphfield_render::Renderer::render(&mut renderer, &demo.scene, camera);
        tracing::debug!("{out}");
        out
    });

    let stats = render_loop.stats();
    let mut out = last.unwrap_or_default();
    out += &format!(
        "frames: {} camera moves: {} elapsed: {:.1} ms\n",
        stats.frames,
        stats.camera_moves,
        render_loop.elapsed().as_secs_f64() * 1000.0
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn font_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "familyName": "Cli Test",
                "resolution": 1000,
                "underlineThickness": 50,
                "boundingBox": {{ "xMin": 0, "xMax": 800, "yMin": -200, "yMax": 800 }},
                "glyphs": {{ "A": {{ "ha": 800, "o": "m 0 0 l 700 0 l 700 700 l 0 700 l 0 0" }} }}
            }}"#
        )
        .unwrap();
        file
    }

    #[test]
    fn font_info_reports_metrics() {
        let file = font_file();
        let out = font_info(file.path()).unwrap();
        assert!(out.contains("family: Cli Test"));
        assert!(out.contains("glyphs: 1"));
    }

    #[test]
    fn text_report_counts_and_missing() {
        let file = font_file();
        let out = text_report(file.path(), Some("AB".into())).unwrap();
        assert!(out.contains("missing glyphs: B"));
        assert!(out.contains("centered:"));
    }

    #[test]
    fn frames_without_text_still_scatter() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_frames(&dir.path().join("missing.json"), None, 2, 7, false).unwrap();
        assert!(out.contains("=== Frame 2 ==="));
        assert!(out.contains("Meshes: 200"));
        assert!(out.contains("frames: 2 camera moves: 2"));
    }

    #[test]
    fn missing_font_is_an_error_for_font_info() {
        let dir = tempfile::tempdir().unwrap();
        assert!(font_info(&dir.path().join("missing.json")).is_err());
    }
}
