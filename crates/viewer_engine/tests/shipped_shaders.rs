//! The viewer's own GLSL sources compile, link and expose the frame block
//! at the offsets the uniform upload relies on.

use std::path::Path;

use viewer_engine::foundation::math::Mat4;
use viewer_engine::foundation::time::FrameTimer;
use viewer_engine::render::material::TextureRole;
use viewer_engine::render::shader::compiler::{compile_source, link};
use viewer_engine::render::shader::{ShaderStage, UniformBlock, UniformKind};
use viewer_engine::render::{Camera, FrameUniforms, SceneSettings};

const VERTEX_SOURCE: &str = include_str!("../../../viewer_app/shaders/vertex.glsl");
const FRAGMENT_SOURCE: &str = include_str!("../../../viewer_app/shaders/fragment.glsl");

fn linked_block() -> UniformBlock {
    let vertex = compile_source(ShaderStage::Vertex, Path::new("vertex.glsl"), VERTEX_SOURCE).unwrap();
    let fragment = compile_source(ShaderStage::Fragment, Path::new("fragment.glsl"), FRAGMENT_SOURCE).unwrap();
    let interface = link(&vertex, &fragment).unwrap();
    UniformBlock::new(interface.uniforms)
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

#[test]
fn shipped_shaders_link_with_every_material_role() {
    let vertex = compile_source(ShaderStage::Vertex, Path::new("vertex.glsl"), VERTEX_SOURCE).unwrap();
    let fragment = compile_source(ShaderStage::Fragment, Path::new("fragment.glsl"), FRAGMENT_SOURCE).unwrap();
    assert!(!vertex.spirv.is_empty());
    assert!(!fragment.spirv.is_empty());

    let interface = link(&vertex, &fragment).unwrap();
    for role in TextureRole::ALL {
        assert!(interface.material_roles.contains(&role), "{role:?} not sampled");
    }
    let mut locations: Vec<u32> = interface.vertex_inputs.iter().map(|input| input.location).collect();
    locations.sort_unstable();
    assert_eq!(locations, vec![0, 1, 2]);
}

#[test]
fn frame_block_uses_std140_offsets() {
    let block = linked_block();
    let layout = block.layout();

    let expected = [
        ("total_time", 0, UniformKind::Scalar),
        ("delta_time", 4, UniformKind::Scalar),
        ("ambient_light_color", 16, UniformKind::Vec3),
        ("diffuse_light_color", 32, UniformKind::Vec3),
        ("diffuse_light_position", 48, UniformKind::Vec3),
        ("model", 64, UniformKind::Mat4),
        ("normal_mat", 128, UniformKind::Mat4),
        ("view", 192, UniformKind::Mat4),
        ("projection", 256, UniformKind::Mat4),
    ];
    for (name, offset, kind) in expected {
        let field = layout.slot(name).unwrap_or_else(|| panic!("{name} not reflected"));
        assert_eq!((field.offset, field.kind), (offset, kind), "{name}");
    }
    assert_eq!(layout.size(), 320);
}

#[test]
fn composed_frame_fills_the_whole_block() {
    let mut block = linked_block();
    let mut timer = FrameTimer::starting_at(0.0);
    timer.advance(1.5);
    timer.advance(2.0);

    let uniforms = FrameUniforms::compose(&Camera::default(), &timer, &SceneSettings::default(), 4.0 / 3.0);
    assert_eq!(uniforms.upload(&mut block), 9);

    let bytes = block.bytes();
    assert_eq!(read_f32(bytes, 0), 2.0);
    assert_eq!(read_f32(bytes, 4), 0.5);
    // Ambient light defaults to 0.1 grey, point light sits at (0, 15, 10)
    assert_eq!(read_f32(bytes, 16), 0.1);
    assert_eq!(read_f32(bytes, 52), 15.0);
    assert_eq!(read_f32(bytes, 56), 10.0);

    // Translation lands in the last column of the model matrix
    let model = uniforms.model;
    assert_eq!(read_f32(bytes, 64 + 48), model[(0, 3)]);
    assert_eq!(read_f32(bytes, 64 + 52), model[(1, 3)]);

    let view = Camera::default().view_matrix();
    assert_eq!(read_f32(bytes, 192 + 56), view[(2, 3)]);
    assert_ne!(uniforms.projection, Mat4::identity());
}
