//! GLSL to SPIR-V compilation, reflection and stage linking

use std::path::{Path, PathBuf};

use naga::back::spv;
use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Module, Scalar, ScalarKind, TypeInner, VectorSize};

use crate::render::material::{
    TextureRole, FRAME_SET, FRAME_UNIFORM_BINDING, MATERIAL_SET, SAMPLER_BINDING,
};
use crate::render::mesh::VERTEX_ATTRIBUTES;
use crate::render::shader::uniforms::{UniformField, UniformKind, UniformLayout};
use crate::render::shader::{ShaderError, ShaderStage};

/// Scalar or vector type crossing a stage boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceType {
    /// 1 for scalars, 2-4 for vectors
    pub components: u8,
    /// Component type
    pub kind: ScalarKind,
}

/// A `layout(location = N)` input or output
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceVariable {
    /// Location slot
    pub location: u32,
    /// Declared name, when naga kept it
    pub name: Option<String>,
    /// Value type, or `None` for types that cannot cross a stage boundary
    pub ty: Option<InterfaceType>,
}

/// A texture or sampler binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSlot {
    /// Declared name
    pub name: Option<String>,
    /// Descriptor set
    pub group: u32,
    /// Binding inside the set
    pub binding: u32,
}

/// Everything a stage exposes to the rest of the pipeline
#[derive(Debug, Clone, Default)]
pub struct StageInterface {
    /// Location inputs
    pub inputs: Vec<InterfaceVariable>,
    /// Location outputs
    pub outputs: Vec<InterfaceVariable>,
    /// Uniform blocks
    pub uniform_blocks: Vec<UniformLayout>,
    /// Sampled images
    pub textures: Vec<ResourceSlot>,
    /// Samplers
    pub samplers: Vec<ResourceSlot>,
    /// Resources in address spaces the program does not support
    pub unsupported: Vec<String>,
}

/// One compiled stage: SPIR-V plus its reflected interface
#[derive(Debug, Clone)]
pub struct CompiledStage {
    /// Stage kind
    pub stage: ShaderStage,
    /// Source file, for diagnostics
    pub path: PathBuf,
    /// SPIR-V words
    pub spirv: Vec<u32>,
    /// Reflected interface
    pub interface: StageInterface,
}

/// What a linked program needs from the rest of the renderer
#[derive(Debug, Clone)]
pub struct ProgramInterface {
    /// The frame uniform block (empty if neither stage declares one)
    pub uniforms: UniformLayout,
    /// Vertex attributes the program reads
    pub vertex_inputs: Vec<InterfaceVariable>,
    /// Material roles the fragment stage samples
    pub material_roles: Vec<TextureRole>,
}

/// Read, compile and reflect a GLSL 450 source file
pub fn compile_file(stage: ShaderStage, path: &Path) -> Result<CompiledStage, ShaderError> {
    let source = std::fs::read_to_string(path).map_err(|e| ShaderError::Compile {
        stage,
        path: path.to_path_buf(),
        log: format!("cannot read source: {e}"),
    })?;
    compile_source(stage, path, &source)
}

/// Compile and reflect GLSL 450 `source`; `path` is only used in errors
pub fn compile_source(stage: ShaderStage, path: &Path, source: &str) -> Result<CompiledStage, ShaderError> {
    let compile_error = |log: String| ShaderError::Compile {
        stage,
        path: path.to_path_buf(),
        log,
    };

    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage.naga()), source)
        .map_err(|errors| compile_error(errors.emit_to_string(source)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| compile_error(error.emit_to_string(source)))?;

    // The projection already targets Vulkan clip space; no coordinate flip here
    let options = spv::Options {
        lang_version: (1, 0),
        flags: spv::WriterFlags::empty(),
        ..Default::default()
    };
    let spirv = spv::write_vec(&module, &info, &options, None)
        .map_err(|error| compile_error(format!("SPIR-V generation failed: {error}")))?;

    let interface = reflect(&module, stage);
    log::debug!(
        "Compiled {} shader {} ({} words, {} inputs, {} outputs)",
        stage,
        path.display(),
        spirv.len(),
        interface.inputs.len(),
        interface.outputs.len()
    );

    Ok(CompiledStage {
        stage,
        path: path.to_path_buf(),
        spirv,
        interface,
    })
}

/// Check that two stages form a program following the binding convention
///
/// Every problem found is reported, one per line of the link log.
pub fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<ProgramInterface, ShaderError> {
    let mut problems = Vec::new();
    let mut uniforms: Option<UniformLayout> = None;

    for stage in [vertex, fragment] {
        let interface = &stage.interface;
        for resource in &interface.unsupported {
            problems.push(format!("{} stage: unsupported resource {}", stage.stage, resource));
        }

        for block in &interface.uniform_blocks {
            if (block.group(), block.binding()) != (FRAME_SET, FRAME_UNIFORM_BINDING) {
                problems.push(format!(
                    "{} stage: uniform block at set {} binding {}; the frame block lives at set {} binding {}",
                    stage.stage,
                    block.group(),
                    block.binding(),
                    FRAME_SET,
                    FRAME_UNIFORM_BINDING
                ));
                continue;
            }
            match &uniforms {
                None => uniforms = Some(block.clone()),
                Some(existing) if !existing.matches(block) => problems.push(format!(
                    "{} stage: frame uniform block layout differs from the other stage",
                    stage.stage
                )),
                Some(_) => {}
            }
        }
    }

    if !vertex.interface.textures.is_empty() || !vertex.interface.samplers.is_empty() {
        problems.push("vertex stage: material textures are only available to the fragment stage".to_string());
    }

    let mut material_roles = Vec::new();
    for texture in &fragment.interface.textures {
        let role = (texture.group == MATERIAL_SET)
            .then(|| TextureRole::from_binding(texture.binding))
            .flatten();
        match role {
            Some(role) => material_roles.push(role),
            None => problems.push(format!(
                "fragment stage: texture {} at set {} binding {} is not a material role binding",
                display_name(&texture.name),
                texture.group,
                texture.binding
            )),
        }
    }
    for sampler in &fragment.interface.samplers {
        if (sampler.group, sampler.binding) != (MATERIAL_SET, SAMPLER_BINDING) {
            problems.push(format!(
                "fragment stage: sampler {} at set {} binding {}; the material sampler lives at set {} binding {}",
                display_name(&sampler.name),
                sampler.group,
                sampler.binding,
                MATERIAL_SET,
                SAMPLER_BINDING
            ));
        }
    }

    for input in &vertex.interface.inputs {
        let attribute = VERTEX_ATTRIBUTES
            .iter()
            .find(|attribute| attribute.location == input.location);
        let expected = attribute.map(|attribute| InterfaceType {
            components: attribute.components,
            kind: ScalarKind::Float,
        });
        if attribute.is_none() {
            problems.push(format!(
                "vertex input {} at location {} has no matching vertex attribute",
                display_name(&input.name),
                input.location
            ));
        } else if input.ty != expected {
            problems.push(format!(
                "vertex input {} at location {} is {}, the vertex attribute is {}",
                display_name(&input.name),
                input.location,
                display_type(input.ty),
                display_type(expected)
            ));
        }
    }

    for input in &fragment.interface.inputs {
        match vertex
            .interface
            .outputs
            .iter()
            .find(|output| output.location == input.location)
        {
            None => problems.push(format!(
                "fragment input {} at location {} is not written by the vertex stage",
                display_name(&input.name),
                input.location
            )),
            Some(output) if output.ty != input.ty || input.ty.is_none() => problems.push(format!(
                "fragment input {} at location {} is {} but the vertex stage writes {}",
                display_name(&input.name),
                input.location,
                display_type(input.ty),
                display_type(output.ty)
            )),
            Some(_) => {}
        }
    }

    if !problems.is_empty() {
        return Err(ShaderError::Link {
            log: problems.join("\n"),
        });
    }

    Ok(ProgramInterface {
        uniforms: uniforms.unwrap_or_else(|| UniformLayout::new(FRAME_SET, FRAME_UNIFORM_BINDING, 0, Vec::new())),
        vertex_inputs: vertex.interface.inputs.clone(),
        material_roles,
    })
}

fn display_name(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("<unnamed>")
}

fn display_type(ty: Option<InterfaceType>) -> String {
    match ty {
        Some(InterfaceType { components: 1, kind }) => format!("{kind:?}"),
        Some(InterfaceType { components, kind }) => format!("{kind:?}x{components}"),
        None => "an unsupported type".to_string(),
    }
}

fn reflect(module: &Module, stage: ShaderStage) -> StageInterface {
    let mut interface = StageInterface::default();

    for (_, global) in module.global_variables.iter() {
        let name = global.name.clone();
        match (global.space, &global.binding) {
            (AddressSpace::Uniform, Some(binding)) => {
                let layout = match &module.types[global.ty].inner {
                    TypeInner::Struct { members, span } => {
                        let fields = members
                            .iter()
                            .map(|member| UniformField {
                                name: member.name.clone().unwrap_or_default(),
                                offset: member.offset,
                                kind: uniform_kind(&module.types[member.ty].inner),
                            })
                            .collect();
                        UniformLayout::new(binding.group, binding.binding, *span, fields)
                    }
                    _ => {
                        interface
                            .unsupported
                            .push(format!("non-block uniform {}", display_name(&name)));
                        continue;
                    }
                };
                interface.uniform_blocks.push(layout);
            }
            (AddressSpace::Handle, Some(binding)) => {
                let slot = ResourceSlot {
                    name,
                    group: binding.group,
                    binding: binding.binding,
                };
                match module.types[global.ty].inner {
                    TypeInner::Image { .. } => interface.textures.push(slot),
                    TypeInner::Sampler { .. } => interface.samplers.push(slot),
                    _ => interface
                        .unsupported
                        .push(format!("handle {}", display_name(&slot.name))),
                }
            }
            (AddressSpace::Storage { .. }, _) | (AddressSpace::PushConstant, _) => {
                interface
                    .unsupported
                    .push(format!("{:?} {}", global.space, display_name(&name)));
            }
            _ => {}
        }
    }

    let Some(entry_point) = module
        .entry_points
        .iter()
        .find(|entry_point| entry_point.stage == stage.naga())
    else {
        return interface;
    };

    for argument in &entry_point.function.arguments {
        collect_locations(
            module,
            argument.name.clone(),
            argument.ty,
            argument.binding.as_ref(),
            &mut interface.inputs,
        );
    }
    if let Some(result) = &entry_point.function.result {
        collect_locations(module, None, result.ty, result.binding.as_ref(), &mut interface.outputs);
    }

    interface.inputs.sort_by_key(|variable| variable.location);
    interface.outputs.sort_by_key(|variable| variable.location);
    interface
}

/// Gather location bindings, flattening struct members; built-ins are skipped
fn collect_locations(
    module: &Module,
    name: Option<String>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
    into: &mut Vec<InterfaceVariable>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => into.push(InterfaceVariable {
            location: *location,
            name,
            ty: interface_type(&module.types[ty].inner),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.name.clone(), member.ty, member.binding.as_ref(), into);
                }
            }
        }
    }
}

fn interface_type(inner: &TypeInner) -> Option<InterfaceType> {
    match *inner {
        TypeInner::Scalar(scalar) => Some(InterfaceType {
            components: 1,
            kind: scalar.kind,
        }),
        TypeInner::Vector { size, scalar } => Some(InterfaceType {
            components: size as u8,
            kind: scalar.kind,
        }),
        _ => None,
    }
}

fn uniform_kind(inner: &TypeInner) -> UniformKind {
    match *inner {
        TypeInner::Scalar(scalar) if scalar == Scalar::F32 => UniformKind::Scalar,
        TypeInner::Vector { size: VectorSize::Tri, scalar } if scalar == Scalar::F32 => UniformKind::Vec3,
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar == Scalar::F32 => UniformKind::Mat4,
        _ => UniformKind::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"#version 450
layout(set = 0, binding = 0) uniform FrameUniforms {
    float total_time;
    float delta_time;
    vec3 ambient_light_color;
    mat4 model;
} frame;

layout(location = 0) in vec3 in_position;
layout(location = 2) in vec2 in_uv;

layout(location = 0) out vec2 frag_uv;
layout(location = 1) out float frag_time;

void main() {
    frag_uv = in_uv;
    frag_time = frame.total_time;
    gl_Position = frame.model * vec4(in_position, 1.0);
}
"#;

    const FRAGMENT: &str = r#"#version 450
layout(set = 0, binding = 0) uniform FrameUniforms {
    float total_time;
    float delta_time;
    vec3 ambient_light_color;
    mat4 model;
} frame;

layout(set = 1, binding = 0) uniform texture2D diffuse_map;
layout(set = 1, binding = 3) uniform sampler material_sampler;

layout(location = 0) in vec2 frag_uv;

layout(location = 0) out vec4 out_color;

void main() {
    vec3 base = texture(sampler2D(diffuse_map, material_sampler), frag_uv).rgb;
    out_color = vec4(base * frame.ambient_light_color, 1.0);
}
"#;

    fn compile(stage: ShaderStage, source: &str) -> CompiledStage {
        compile_source(stage, Path::new("test.glsl"), source).unwrap()
    }

    #[test]
    fn test_reflects_std140_offsets() {
        let vertex = compile(ShaderStage::Vertex, VERTEX);
        let block = &vertex.interface.uniform_blocks[0];

        assert_eq!(block.slot("total_time").map(|f| f.offset), Some(0));
        assert_eq!(block.slot("delta_time").map(|f| f.offset), Some(4));
        assert_eq!(block.slot("ambient_light_color").map(|f| (f.offset, f.kind)), Some((16, UniformKind::Vec3)));
        assert_eq!(block.slot("model").map(|f| (f.offset, f.kind)), Some((32, UniformKind::Mat4)));
        assert_eq!(block.size(), 96);
    }

    #[test]
    fn test_reflects_locations_and_builtins_are_skipped() {
        let vertex = compile(ShaderStage::Vertex, VERTEX);
        let inputs: Vec<u32> = vertex.interface.inputs.iter().map(|v| v.location).collect();
        let outputs: Vec<u32> = vertex.interface.outputs.iter().map(|v| v.location).collect();
        assert_eq!(inputs, vec![0, 2]);
        assert_eq!(outputs, vec![0, 1]);
        assert_eq!(
            vertex.interface.inputs[1].ty,
            Some(InterfaceType {
                components: 2,
                kind: ScalarKind::Float
            })
        );
        assert!(!vertex.spirv.is_empty());
    }

    #[test]
    fn test_link_accepts_matching_stages() {
        let program = link(&compile(ShaderStage::Vertex, VERTEX), &compile(ShaderStage::Fragment, FRAGMENT)).unwrap();
        assert_eq!(program.material_roles, vec![TextureRole::Diffuse]);
        assert_eq!(program.uniforms.fields().len(), 4);
    }

    #[test]
    fn test_syntax_error_names_stage_and_path() {
        let err = compile_source(ShaderStage::Fragment, Path::new("broken.frag"), "#version 450\nvoid main( {").unwrap_err();
        match err {
            ShaderError::Compile { stage, path, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(path, PathBuf::from("broken.frag"));
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_a_compile_error() {
        let err = compile_file(ShaderStage::Vertex, Path::new("does/not/exist.vert")).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
    }

    #[test]
    fn test_link_rejects_unwritten_fragment_input() {
        let fragment = FRAGMENT.replace(
            "layout(location = 0) in vec2 frag_uv;",
            "layout(location = 0) in vec2 frag_uv;\nlayout(location = 5) in vec3 frag_extra;",
        )
        .replace("frag_uv).rgb", "frag_uv).rgb + frag_extra");
        let err = link(&compile(ShaderStage::Vertex, VERTEX), &compile(ShaderStage::Fragment, &fragment)).unwrap_err();
        match err {
            ShaderError::Link { log } => assert!(log.contains("location 5"), "{log}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_link_rejects_type_mismatch_across_stages() {
        let fragment = FRAGMENT
            .replace("in vec2 frag_uv", "in vec3 frag_uv")
            .replace("frag_uv).rgb", "frag_uv.xy).rgb");
        let err = link(&compile(ShaderStage::Vertex, VERTEX), &compile(ShaderStage::Fragment, &fragment)).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
    }

    #[test]
    fn test_link_rejects_texture_off_the_role_bindings() {
        let fragment = FRAGMENT.replace("set = 1, binding = 0) uniform texture2D", "set = 1, binding = 7) uniform texture2D");
        let err = link(&compile(ShaderStage::Vertex, VERTEX), &compile(ShaderStage::Fragment, &fragment)).unwrap_err();
        match err {
            ShaderError::Link { log } => assert!(log.contains("binding 7"), "{log}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_link_rejects_different_block_layouts() {
        let fragment = FRAGMENT.replacen("float delta_time;", "float delta_time;\n    float extra;", 1);
        let err = link(&compile(ShaderStage::Vertex, VERTEX), &compile(ShaderStage::Fragment, &fragment)).unwrap_err();
        match err {
            ShaderError::Link { log } => assert!(log.contains("layout differs"), "{log}"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
