use glyphfield_render::RenderError;

/// Get the next surface texture to draw into.
///
/// `RenderError::SurfaceLost` means the surface must be reconfigured and the
/// frame skipped.
pub fn acquire_frame(surface: &wgpu::Surface<'_>) -> Result<wgpu::SurfaceTexture, RenderError> {
    surface.get_current_texture().map_err(surface_error)
}

fn surface_error(error: wgpu::SurfaceError) -> RenderError {
    match error {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => RenderError::SurfaceLost,
        wgpu::SurfaceError::Timeout => RenderError::Timeout,
        wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
        other => RenderError::Surface(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_and_outdated_mean_reconfigure() {
        assert!(matches!(surface_error(wgpu::SurfaceError::Lost), RenderError::SurfaceLost));
        assert!(matches!(
            surface_error(wgpu::SurfaceError::Outdated),
            RenderError::SurfaceLost
        ));
    }

    #[test]
    fn other_errors_keep_their_kind() {
        assert!(matches!(surface_error(wgpu::SurfaceError::Timeout), RenderError::Timeout));
        assert!(matches!(
            surface_error(wgpu::SurfaceError::OutOfMemory),
            RenderError::OutOfMemory
        ));
    }
}
