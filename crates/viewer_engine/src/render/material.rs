//! Material binding convention
//!
//! Set 0 carries the per-frame uniform block. Set 1 carries one material: a
//! sampled image per [`TextureRole`] plus one sampler shared by all of them.

/// Descriptor set holding the per-frame uniform block
pub const FRAME_SET: u32 = 0;

/// Binding of the uniform block inside [`FRAME_SET`]
pub const FRAME_UNIFORM_BINDING: u32 = 0;

/// Descriptor set holding material textures
pub const MATERIAL_SET: u32 = 1;

/// Binding of the shared sampler inside [`MATERIAL_SET`]
pub const SAMPLER_BINDING: u32 = 3;

/// Semantic role of a material texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    /// Base colour (`map_Kd`)
    Diffuse,
    /// Specular mask (`map_Ks`)
    Specular,
    /// Tangent-space normal map (`map_Bump` / `norm`)
    Normal,
}

impl TextureRole {
    /// Every role in binding order
    pub const ALL: [Self; 3] = [Self::Diffuse, Self::Specular, Self::Normal];

    /// Binding index inside [`MATERIAL_SET`]
    pub fn binding(self) -> u32 {
        match self {
            Self::Diffuse => 0,
            Self::Specular => 1,
            Self::Normal => 2,
        }
    }

    /// Role bound at `binding`, if any
    pub fn from_binding(binding: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.binding() == binding)
    }

    /// RGBA8 texel bound when a material has no texture for this role
    ///
    /// White diffuse keeps the lighting colour, black specular disables
    /// highlights, and (128, 128, 255) is the unperturbed tangent-space normal.
    pub fn placeholder_color(self) -> [u8; 4] {
        match self {
            Self::Diffuse => [255, 255, 255, 255],
            Self::Specular => [0, 0, 0, 255],
            Self::Normal => [128, 128, 255, 255],
        }
    }

    /// Whether texels hold sRGB-encoded colour rather than linear data
    pub fn is_color(self) -> bool {
        matches!(self, Self::Diffuse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_bindings_round_trip() {
        for role in TextureRole::ALL {
            assert_eq!(TextureRole::from_binding(role.binding()), Some(role));
        }
        assert_eq!(TextureRole::from_binding(SAMPLER_BINDING), None);
    }
}
