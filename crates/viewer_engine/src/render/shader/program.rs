//! Linked shader program: pipeline, per-frame uniform buffers and uploads

use std::marker::PhantomData;
use std::path::Path;

use ash::vk;

use crate::foundation::math::Mat4;
use crate::render::material::{FRAME_SET, FRAME_UNIFORM_BINDING};
use crate::render::shader::compiler::{self, ProgramInterface};
use crate::render::shader::uniforms::{UniformBlock, UniformLayout, UniformSink, UniformStatus, UniformValue};
use crate::render::shader::{ShaderError, ShaderStage};
use crate::render::vulkan::{
    DescriptorPool, DescriptorSetWriter, Frame, GpuContext, GraphicsPipeline, ShaderModule, UniformBuffer,
    VulkanResult,
};

/// One linked vertex + fragment program
///
/// Uniform values live in a host shadow of the frame block. Setting them on
/// the program itself only touches the shadow; [`activate`](Self::activate)
/// flushes the shadow into the frame's uniform buffer and returns an
/// [`ActiveProgram`] whose writes also go straight to that buffer. The guard
/// cannot outlive the frame, so a buffer the GPU may still be reading is
/// never written.
pub struct ShaderProgram {
    pipeline: GraphicsPipeline,
    uniform_buffers: Vec<UniformBuffer>,
    frame_sets: Vec<vk::DescriptorSet>,
    _descriptor_pool: DescriptorPool,
    block: UniformBlock,
    interface: ProgramInterface,
}

impl ShaderProgram {
    /// Compile both GLSL files, link them and build the pipeline
    pub fn compile_and_link(
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        gpu: GpuContext<'_>,
    ) -> Result<Self, ShaderError> {
        let vertex = compiler::compile_file(ShaderStage::Vertex, vertex_path.as_ref())?;
        let fragment = compiler::compile_file(ShaderStage::Fragment, fragment_path.as_ref())?;
        let interface = compiler::link(&vertex, &fragment)?;

        let vertex_module = ShaderModule::from_words(gpu.device.clone(), &vertex.spirv)?;
        let fragment_module = ShaderModule::from_words(gpu.device.clone(), &fragment.spirv)?;
        let pipeline = GraphicsPipeline::new(
            gpu.device.clone(),
            gpu.render_pass,
            &vertex_module,
            &fragment_module,
            &[gpu.frame_layout, gpu.material_layout],
        )
        .map_err(|e| ShaderError::Link {
            log: format!("pipeline creation failed: {e}"),
        })?;

        let block_size = u64::from(interface.uniforms.size()).max(16);
        let uniform_buffers = (0..gpu.frames_in_flight)
            .map(|_| UniformBuffer::new(gpu, block_size))
            .collect::<Result<Vec<_>, _>>()?;

        let descriptor_pool = DescriptorPool::for_frame_uniforms(gpu.device.clone(), gpu.frames_in_flight as u32)?;
        let frame_sets = descriptor_pool.allocate_descriptor_sets(&vec![gpu.frame_layout; gpu.frames_in_flight])?;
        frame_sets
            .iter()
            .zip(&uniform_buffers)
            .fold(DescriptorSetWriter::new(), |writer, (&set, buffer)| {
                writer.write_uniform_buffer(set, FRAME_UNIFORM_BINDING, buffer.handle(), block_size)
            })
            .update(gpu.device);

        log::info!(
            "Linked shader program {} + {} ({} uniforms, {} material roles)",
            vertex.path.display(),
            fragment.path.display(),
            interface.uniforms.fields().len(),
            interface.material_roles.len()
        );

        Ok(Self {
            pipeline,
            uniform_buffers,
            frame_sets,
            _descriptor_pool: descriptor_pool,
            block: UniformBlock::new(interface.uniforms.clone()),
            interface,
        })
    }

    /// Bind this program on `frame` and flush the shadow block into the
    /// frame's uniform buffer
    ///
    /// Uploads through the returned guard reach the GPU for this frame.
    pub fn activate<'p, 'f>(&'p mut self, frame: &mut Frame<'f>) -> ActiveProgram<'p, 'f> {
        let index = frame.index();
        let allocated = self.uniform_buffers.len();
        let (Some(&set), Some(buffer)) = (self.frame_sets.get(index), self.uniform_buffers.get_mut(index)) else {
            log::error!(
                "Frame slot {} has no uniform buffer ({} allocated)",
                index,
                allocated
            );
            return ActiveProgram {
                block: &mut self.block,
                buffer: None,
                _frame: PhantomData,
            };
        };

        frame.bind_pipeline(self.pipeline.handle(), self.pipeline.layout());
        frame.bind_descriptor_set(FRAME_SET, set);
        if let Err(e) = buffer.write_bytes(0, self.block.bytes()) {
            log::error!("Uniform flush failed: {}", e);
        }
        ActiveProgram {
            block: &mut self.block,
            buffer: Some(buffer),
            _frame: PhantomData,
        }
    }

    /// Reflected frame uniform block
    pub fn uniform_layout(&self) -> &UniformLayout {
        self.block.layout()
    }

    /// Linked interface
    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }
}

/// Values set outside a frame wait in the shadow block for the next activation
impl UniformSink for ShaderProgram {
    fn set_scalar(&mut self, name: &str, value: f32) -> UniformStatus {
        write_through::<UniformBuffer>(&mut self.block, None, name, UniformValue::Scalar(value))
    }

    fn set_vec3(&mut self, name: &str, x: f32, y: f32, z: f32) -> UniformStatus {
        write_through::<UniformBuffer>(&mut self.block, None, name, UniformValue::Vec3([x, y, z]))
    }

    fn set_mat4(&mut self, name: &str, matrix: &Mat4) -> UniformStatus {
        write_through::<UniformBuffer>(&mut self.block, None, name, UniformValue::Mat4(matrix))
    }
}

/// A program bound on one frame; see [`ShaderProgram::activate`]
pub struct ActiveProgram<'p, 'f> {
    block: &'p mut UniformBlock,
    buffer: Option<&'p mut UniformBuffer>,
    _frame: PhantomData<&'f ()>,
}

impl UniformSink for ActiveProgram<'_, '_> {
    fn set_scalar(&mut self, name: &str, value: f32) -> UniformStatus {
        write_through(self.block, self.buffer.as_deref_mut(), name, UniformValue::Scalar(value))
    }

    fn set_vec3(&mut self, name: &str, x: f32, y: f32, z: f32) -> UniformStatus {
        write_through(self.block, self.buffer.as_deref_mut(), name, UniformValue::Vec3([x, y, z]))
    }

    fn set_mat4(&mut self, name: &str, matrix: &Mat4) -> UniformStatus {
        write_through(self.block, self.buffer.as_deref_mut(), name, UniformValue::Mat4(matrix))
    }
}

/// Mapped memory a written field is mirrored into
trait UniformTarget {
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> VulkanResult<()>;
}

impl UniformTarget for UniformBuffer {
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> VulkanResult<()> {
        Self::write_bytes(self, offset, bytes)
    }
}

/// Write `value` into the shadow block and, when there is one, into `target`
fn write_through<T: UniformTarget + ?Sized>(
    block: &mut UniformBlock,
    target: Option<&mut T>,
    name: &str,
    value: UniformValue<'_>,
) -> UniformStatus {
    let status = block.write(name, value);
    if status != UniformStatus::Written {
        return status;
    }

    if let (Some(target), Some(range)) = (target, block.field_range(name)) {
        if let Err(e) = target.write_bytes(range.start, &block.bytes()[range]) {
            log::error!("Uniform '{}' upload failed: {}", name, e);
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shader::uniforms::{UniformField, UniformKind};

    impl UniformTarget for Vec<u8> {
        fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> VulkanResult<()> {
            self[offset..offset + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }
    }

    fn block() -> UniformBlock {
        UniformBlock::new(UniformLayout::new(
            FRAME_SET,
            FRAME_UNIFORM_BINDING,
            32,
            vec![
                UniformField::new("total_time", 0, UniformKind::Scalar),
                UniformField::new("ambient_light_color", 16, UniformKind::Vec3),
            ],
        ))
    }

    #[test]
    fn test_write_without_target_stays_in_shadow() {
        let mut block = block();
        let status = write_through::<Vec<u8>>(&mut block, None, "total_time", UniformValue::Scalar(2.5));

        assert_eq!(status, UniformStatus::Written);
        assert_eq!(&block.bytes()[0..4], &2.5f32.to_le_bytes());
    }

    #[test]
    fn test_write_with_target_mirrors_only_the_field() {
        let mut block = block();
        let mut mapped = vec![0xAA; 32];
        let status = write_through(
            &mut block,
            Some(&mut mapped),
            "ambient_light_color",
            UniformValue::Vec3([1.0, 2.0, 3.0]),
        );

        assert_eq!(status, UniformStatus::Written);
        assert_eq!(&mapped[16..20], &1.0f32.to_le_bytes());
        assert_eq!(&mapped[24..28], &3.0f32.to_le_bytes());
        assert!(mapped[..16].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_absent_or_mismatched_write_leaves_target_alone() {
        let mut block = block();
        let mut mapped = vec![0xAA; 32];

        let absent = write_through(&mut block, Some(&mut mapped), "view", UniformValue::Scalar(1.0));
        let mismatched = write_through(&mut block, Some(&mut mapped), "total_time", UniformValue::Vec3([1.0; 3]));

        assert_eq!(absent, UniformStatus::Absent);
        assert_eq!(mismatched, UniformStatus::Mismatched);
        assert!(mapped.iter().all(|&b| b == 0xAA));
    }
}
