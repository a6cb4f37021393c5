//! Vertex format shared by the OBJ loader, the GPU upload path and the shader
//! interface check

/// 3D vertex data structure for rendering
///
/// `#[repr(C)]` keeps the layout stable for GPU buffer uploads. Equality and
/// hashing both compare the bit patterns of the floats so identical OBJ
/// corners collapse into one vertex during loading. [`Vertex::new`] folds
/// `-0.0` into `0.0`, so signed zeros collapse too.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates, origin at the top-left of the image
    pub tex_coord: [f32; 2],
}

// Safe to implement Pod and Zeroable for Vertex since it only contains f32 arrays
unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.bits().eq(other.bits())
    }
}

impl Eq for Vertex {}

impl std::hash::Hash for Vertex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for bits in self.bits() {
            bits.hash(state);
        }
    }
}

impl Vertex {
    /// Create a vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position: position.map(unsigned_zero),
            normal: normal.map(unsigned_zero),
            tex_coord: tex_coord.map(unsigned_zero),
        }
    }

    fn bits(&self) -> impl Iterator<Item = u32> + '_ {
        self.position
            .iter()
            .chain(&self.normal)
            .chain(&self.tex_coord)
            .map(|value| value.to_bits())
    }
}

fn unsigned_zero(value: f32) -> f32 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

/// One float vertex attribute inside [`Vertex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Number of f32 components
    pub components: u8,
    /// Byte offset inside [`Vertex`]
    pub offset: u32,
}

/// Attributes the vertex stage may read, in location order
pub const VERTEX_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute { location: 0, components: 3, offset: 0 },
    VertexAttribute { location: 1, components: 3, offset: 12 },
    VertexAttribute { location: 2, components: 2, offset: 24 },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_attribute_offsets_match_struct_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        let last = VERTEX_ATTRIBUTES[2];
        assert_eq!(
            last.offset as usize + last.components as usize * 4,
            std::mem::size_of::<Vertex>()
        );
    }

    #[test]
    fn test_identical_vertices_deduplicate() {
        let a = Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.5]);
        let b = a;
        let c = Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.25]);

        let unique: HashSet<Vertex> = [a, b, c].into_iter().collect();
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_signed_zero_corners_are_one_vertex() {
        let negative = Vertex::new([-0.0, 1.0, 0.0], [0.0, -0.0, -1.0], [-0.0, 0.5]);
        let positive = Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, -1.0], [0.0, 0.5]);

        assert_eq!(negative, positive);
        assert!(negative.position[0].is_sign_positive());
        let unique: HashSet<Vertex> = [negative, positive].into_iter().collect();
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn test_equality_agrees_with_hash_for_raw_fields() {
        let mut raw = Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2]);
        raw.position[0] = -0.0;
        let canonical = Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2]);

        assert_ne!(raw, canonical);
        let unique: HashSet<Vertex> = [raw, canonical].into_iter().collect();
        assert_eq!(unique.len(), 2);
    }
}
