//! Reflected uniform block layout and its host-side shadow copy

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::foundation::math::Mat4;

/// Type of a uniform block member, as far as uploads are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// `float`
    Scalar,
    /// `vec3`
    Vec3,
    /// `mat4`
    Mat4,
    /// Any other member type; present but never written
    Unsupported,
}

impl UniformKind {
    /// Bytes written for this kind
    pub fn size(self) -> usize {
        match self {
            Self::Scalar => 4,
            Self::Vec3 => 12,
            Self::Mat4 => 64,
            Self::Unsupported => 0,
        }
    }
}

/// One member of the uniform block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    /// GLSL member name
    pub name: String,
    /// Byte offset inside the block
    pub offset: u32,
    /// Member type
    pub kind: UniformKind,
}

impl UniformField {
    /// Shorthand constructor
    pub fn new(name: impl Into<String>, offset: u32, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            offset,
            kind,
        }
    }
}

/// Layout of a uniform block with a name index built once
#[derive(Debug, Clone, Default)]
pub struct UniformLayout {
    group: u32,
    binding: u32,
    size: u32,
    fields: Vec<UniformField>,
    index: HashMap<String, usize>,
}

impl UniformLayout {
    /// Layout of a block at `group`/`binding` spanning `size` bytes
    pub fn new(group: u32, binding: u32, size: u32, fields: Vec<UniformField>) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name.clone(), i))
            .collect();
        Self {
            group,
            binding,
            size,
            fields,
            index,
        }
    }

    /// Descriptor set of the block
    pub fn group(&self) -> u32 {
        self.group
    }

    /// Binding inside the set
    pub fn binding(&self) -> u32 {
        self.binding
    }

    /// Block size in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Members in declaration order
    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Cached slot for `name`
    pub fn slot(&self, name: &str) -> Option<&UniformField> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Same location, size and members
    pub fn matches(&self, other: &Self) -> bool {
        self.group == other.group
            && self.binding == other.binding
            && self.size == other.size
            && self.fields == other.fields
    }
}

/// Value handed to a uniform upload
#[derive(Debug, Clone, Copy)]
pub enum UniformValue<'a> {
    /// `float`
    Scalar(f32),
    /// `vec3`
    Vec3([f32; 3]),
    /// `mat4`, column-major
    Mat4(&'a Mat4),
}

impl UniformValue<'_> {
    /// Kind this value can be written to
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Scalar(_) => UniformKind::Scalar,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Mat4(_) => UniformKind::Mat4,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Scalar(value) => bytemuck::bytes_of(value),
            Self::Vec3(value) => bytemuck::bytes_of(value),
            Self::Mat4(matrix) => bytemuck::cast_slice(matrix.as_slice()),
        }
    }
}

/// Result of a uniform upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformStatus {
    /// The value was stored
    Written,
    /// The program has no uniform with this name
    Absent,
    /// The uniform exists with a different type
    Mismatched,
}

/// Typed uniform uploads keyed by GLSL name
///
/// Misses are never errors: an absent or mismatched name leaves every other
/// uniform untouched and reports it through [`UniformStatus`].
pub trait UniformSink {
    /// Upload a `float`
    fn set_scalar(&mut self, name: &str, value: f32) -> UniformStatus;

    /// Upload a `vec3`
    fn set_vec3(&mut self, name: &str, x: f32, y: f32, z: f32) -> UniformStatus;

    /// Upload a `mat4`
    fn set_mat4(&mut self, name: &str, matrix: &Mat4) -> UniformStatus;
}

/// Host copy of a uniform block
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
    reported: HashSet<String>,
}

impl UniformBlock {
    /// Zero-filled block for `layout`
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0; layout.size() as usize];
        Self {
            layout,
            bytes,
            reported: HashSet::new(),
        }
    }

    /// Store `value` in the slot named `name`
    pub fn write(&mut self, name: &str, value: UniformValue<'_>) -> UniformStatus {
        let Some(field) = self.layout.slot(name) else {
            if self.reported.insert(name.to_string()) {
                log::debug!("Uniform '{}' is not active in this program; ignoring", name);
            }
            return UniformStatus::Absent;
        };

        if field.kind != value.kind() {
            if self.reported.insert(name.to_string()) {
                log::debug!(
                    "Uniform '{}' is {:?}, not {:?}; ignoring",
                    name,
                    field.kind,
                    value.kind()
                );
            }
            return UniformStatus::Mismatched;
        }

        let start = field.offset as usize;
        let source = value.bytes();
        match self.bytes.get_mut(start..start + source.len()) {
            Some(target) => {
                target.copy_from_slice(source);
                UniformStatus::Written
            }
            None => UniformStatus::Mismatched,
        }
    }

    /// Byte range written for `name`
    pub fn field_range(&self, name: &str) -> Option<Range<usize>> {
        self.layout.slot(name).map(|field| {
            let start = field.offset as usize;
            start..start + field.kind.size()
        })
    }

    /// Whole block as uploaded to the GPU
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reflected layout
    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }
}

impl UniformSink for UniformBlock {
    fn set_scalar(&mut self, name: &str, value: f32) -> UniformStatus {
        self.write(name, UniformValue::Scalar(value))
    }

    fn set_vec3(&mut self, name: &str, x: f32, y: f32, z: f32) -> UniformStatus {
        self.write(name, UniformValue::Vec3([x, y, z]))
    }

    fn set_mat4(&mut self, name: &str, matrix: &Mat4) -> UniformStatus {
        self.write(name, UniformValue::Mat4(matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> UniformLayout {
        UniformLayout::new(
            0,
            0,
            96,
            vec![
                UniformField::new("total_time", 0, UniformKind::Scalar),
                UniformField::new("ambient_light_color", 16, UniformKind::Vec3),
                UniformField::new("model", 32, UniformKind::Mat4),
            ],
        )
    }

    fn read_f32(block: &UniformBlock, offset: usize) -> f32 {
        bytemuck::pod_read_unaligned(&block.bytes()[offset..offset + 4])
    }

    #[test]
    fn test_written_values_land_at_reflected_offsets() {
        let mut block = UniformBlock::new(layout());
        assert_eq!(block.set_scalar("total_time", 2.5), UniformStatus::Written);
        assert_eq!(block.set_vec3("ambient_light_color", 0.1, 0.2, 0.3), UniformStatus::Written);

        assert_eq!(read_f32(&block, 0), 2.5);
        assert_eq!(read_f32(&block, 16), 0.1);
        assert_eq!(read_f32(&block, 24), 0.3);
    }

    #[test]
    fn test_mat4_is_column_major() {
        let mut block = UniformBlock::new(layout());
        let matrix = Mat4::new_translation(&crate::foundation::math::Vec3::new(7.0, 8.0, 9.0));
        assert_eq!(block.set_mat4("model", &matrix), UniformStatus::Written);

        // Translation sits in the fourth column: floats 12..15
        assert_eq!(read_f32(&block, 32 + 12 * 4), 7.0);
        assert_eq!(read_f32(&block, 32 + 14 * 4), 9.0);
        assert_eq!(read_f32(&block, 32), 1.0);
    }

    #[test]
    fn test_absent_uniform_leaves_other_bytes_unchanged() {
        let mut block = UniformBlock::new(layout());
        block.set_scalar("total_time", 1.0);
        block.set_mat4("model", &Mat4::identity());
        let before = block.bytes().to_vec();

        assert_eq!(block.set_scalar("delta_time", 0.5), UniformStatus::Absent);
        assert_eq!(block.set_mat4("projection", &Mat4::zeros()), UniformStatus::Absent);
        assert_eq!(block.set_scalar("delta_time", 0.5), UniformStatus::Absent);
        assert_eq!(block.bytes(), before.as_slice());
    }

    #[test]
    fn test_type_mismatch_is_not_written() {
        let mut block = UniformBlock::new(layout());
        let before = block.bytes().to_vec();

        assert_eq!(block.set_scalar("model", 3.0), UniformStatus::Mismatched);
        assert_eq!(block.set_vec3("total_time", 1.0, 1.0, 1.0), UniformStatus::Mismatched);
        assert_eq!(block.bytes(), before.as_slice());
    }

    #[test]
    fn test_field_range_covers_kind_size() {
        let block = UniformBlock::new(layout());
        assert_eq!(block.field_range("model"), Some(32..96));
        assert_eq!(block.field_range("ambient_light_color"), Some(16..28));
        assert_eq!(block.field_range("missing"), None);
    }

    #[test]
    fn test_layout_match_compares_members() {
        assert!(layout().matches(&layout()));
        let shifted = UniformLayout::new(0, 0, 96, vec![UniformField::new("total_time", 4, UniformKind::Scalar)]);
        assert!(!layout().matches(&shifted));
    }
}
