use glyphfield_assets::MatcapTexture;

/// Matcap material: shading comes entirely from the lit-sphere texture,
/// looked up by view-space normal and multiplied by `color`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcapMaterial {
    pub name: String,
    pub matcap: MatcapTexture,
    pub color: [f32; 4],
}

impl MatcapMaterial {
    pub fn new(name: impl Into<String>, matcap: MatcapTexture) -> Self {
        Self {
            name: name.into(),
            matcap,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}
