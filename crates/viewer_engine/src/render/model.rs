//! GPU-resident model and its draw submission
//!
//! A [`Model`] is an ordered list of sub-meshes, each with its own vertex and
//! index buffer and one material descriptor set. Drawing walks the list in
//! load order and records through a [`DrawTarget`]; it never touches uniforms.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ash::vk;

use crate::assets::{AssetError, ImageData, MaterialData, ModelData, ObjLoader};
use crate::render::material::{TextureRole, SAMPLER_BINDING};
use crate::render::vulkan::{
    DescriptorPool, DescriptorSetWriter, GpuContext, IndexBuffer, Sampler, Texture, VertexBuffer,
    VulkanError,
};

/// Where draw submissions are recorded
///
/// Implemented by the renderer's frame; tests substitute a recorder.
pub trait DrawTarget {
    /// Bind a material descriptor set (set 1)
    fn bind_material(&mut self, material: vk::DescriptorSet);

    /// Bind a sub-mesh's vertex and 32-bit index buffers
    fn bind_geometry(&mut self, vertex_buffer: vk::Buffer, index_buffer: vk::Buffer);

    /// Issue one indexed draw
    fn draw_indexed(&mut self, index_count: u32);
}

/// What one [`Model::draw`] submitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Indexed draws issued
    pub draw_calls: usize,
    /// Sub-meshes skipped because they have no indices
    pub skipped: usize,
}

/// One drawable range of the model
#[derive(Debug, Clone)]
pub struct SubMesh {
    name: String,
    index_count: u32,
    vertex_buffer: vk::Buffer,
    index_buffer: vk::Buffer,
    material: Option<usize>,
}

impl SubMesh {
    pub(crate) fn new(
        name: impl Into<String>,
        index_count: u32,
        vertex_buffer: vk::Buffer,
        index_buffer: vk::Buffer,
        material: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            index_count,
            vertex_buffer,
            index_buffer,
            material,
        }
    }

    /// Group or object name from the source file
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of indices drawn
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Index into the model's materials, `None` for the placeholder material
    pub fn material(&self) -> Option<usize> {
        self.material
    }
}

// Owns the GPU objects the handles in `Model` point at
struct ModelResources {
    _descriptor_pool: DescriptorPool,
    _sampler: Sampler,
    _textures: Vec<Texture>,
    _index_buffers: Vec<IndexBuffer>,
    _vertex_buffers: Vec<VertexBuffer>,
}

/// Loaded, immutable model
pub struct Model {
    meshes: Vec<SubMesh>,
    materials: Vec<vk::DescriptorSet>,
    default_material: vk::DescriptorSet,
    _resources: Option<ModelResources>,
}

impl Model {
    /// Load an OBJ file with its materials and textures and upload everything
    pub fn load(path: impl AsRef<Path>, gpu: GpuContext<'_>) -> Result<Self, AssetError> {
        let data = ObjLoader::load_obj(path)?;
        Self::from_data(&data, gpu)
    }

    /// Unit cube with placeholder textures, for when the real model fails
    pub fn fallback_cube(gpu: GpuContext<'_>) -> Result<Self, AssetError> {
        Self::from_data(&ModelData::unit_cube(), gpu)
    }

    /// Upload parsed model data
    pub fn from_data(data: &ModelData, gpu: GpuContext<'_>) -> Result<Self, AssetError> {
        let mut vertex_buffers = Vec::with_capacity(data.meshes.len());
        let mut index_buffers = Vec::with_capacity(data.meshes.len());
        let mut meshes = Vec::with_capacity(data.meshes.len());
        for mesh in &data.meshes {
            mesh.check_indices()?;
            let vertex_buffer = VertexBuffer::new(gpu, &mesh.vertices)?;
            let index_buffer = IndexBuffer::new(gpu, &mesh.indices)?;
            meshes.push(SubMesh::new(
                mesh.name.clone(),
                index_buffer.index_count(),
                vertex_buffer.handle(),
                index_buffer.handle(),
                mesh.material.filter(|&index| index < data.materials.len()),
            ));
            vertex_buffers.push(vertex_buffer);
            index_buffers.push(index_buffer);
        }

        let mut textures = TextureSet::new(gpu)?;
        let material_views = data
            .materials
            .iter()
            .map(|material| textures.material_views(material))
            .collect::<Result<Vec<_>, _>>()?;
        let default_views = TextureRole::ALL.map(|role| textures.placeholder(role));

        let sampler = Sampler::new(gpu)?;
        let descriptor_pool = DescriptorPool::for_materials(gpu.device.clone(), material_views.len() as u32 + 1)?;
        let layouts = vec![gpu.material_layout; material_views.len() + 1];
        let mut sets = descriptor_pool.allocate_descriptor_sets(&layouts)?;

        let writer = sets
            .iter()
            .zip(material_views.iter().chain(std::iter::once(&default_views)))
            .fold(DescriptorSetWriter::new(), |writer, (&set, views)| {
                TextureRole::ALL
                    .iter()
                    .zip(views)
                    .fold(writer, |writer, (role, &view)| {
                        writer.write_sampled_image(set, role.binding(), view)
                    })
                    .write_sampler(set, SAMPLER_BINDING, sampler.handle())
            });
        writer.update(gpu.device);

        let Some(default_material) = sets.pop() else {
            return Err(AssetError::Upload(VulkanError::InvalidOperation {
                reason: "No descriptor set for the default material".to_string(),
            }));
        };

        log::info!(
            "Uploaded model: {} sub-mesh(es), {} material(s), {} texture(s)",
            meshes.len(),
            sets.len(),
            textures.textures.len()
        );

        Ok(Self {
            meshes,
            materials: sets,
            default_material,
            _resources: Some(ModelResources {
                _descriptor_pool: descriptor_pool,
                _sampler: sampler,
                _textures: textures.textures,
                _index_buffers: index_buffers,
                _vertex_buffers: vertex_buffers,
            }),
        })
    }

    /// Model over existing handles, owning no GPU memory
    #[cfg(test)]
    pub(crate) fn from_parts(
        meshes: Vec<SubMesh>,
        materials: Vec<vk::DescriptorSet>,
        default_material: vk::DescriptorSet,
    ) -> Self {
        Self {
            meshes,
            materials,
            default_material,
            _resources: None,
        }
    }

    /// Record every sub-mesh in load order
    ///
    /// The caller must already have activated a program and uploaded its
    /// uniforms. Sub-meshes without indices are skipped.
    pub fn draw<T: DrawTarget + ?Sized>(&self, target: &mut T) -> DrawStats {
        let mut stats = DrawStats::default();
        for mesh in &self.meshes {
            if mesh.index_count == 0 {
                stats.skipped += 1;
                continue;
            }

            let material = mesh
                .material
                .and_then(|index| self.materials.get(index))
                .copied()
                .unwrap_or(self.default_material);
            target.bind_material(material);
            target.bind_geometry(mesh.vertex_buffer, mesh.index_buffer);
            target.draw_indexed(mesh.index_count);
            stats.draw_calls += 1;
        }
        stats
    }

    /// Sub-meshes in draw order
    pub fn meshes(&self) -> &[SubMesh] {
        &self.meshes
    }

    /// Total indices across sub-meshes
    pub fn index_count(&self) -> u64 {
        self.meshes.iter().map(|mesh| u64::from(mesh.index_count)).sum()
    }
}

/// Uploads textures once per (file, role kind) and hands out views
struct TextureSet<'a> {
    gpu: GpuContext<'a>,
    textures: Vec<Texture>,
    by_path: HashMap<(PathBuf, bool), usize>,
    placeholders: [usize; 3],
}

impl<'a> TextureSet<'a> {
    fn new(gpu: GpuContext<'a>) -> Result<Self, AssetError> {
        let mut textures = Vec::with_capacity(TextureRole::ALL.len());
        for role in TextureRole::ALL {
            textures.push(Texture::solid_color(gpu, role.placeholder_color(), format_for(role))?);
        }
        Ok(Self {
            gpu,
            textures,
            by_path: HashMap::new(),
            placeholders: [0, 1, 2],
        })
    }

    fn placeholder(&self, role: TextureRole) -> vk::ImageView {
        self.textures[self.placeholders[role.binding() as usize]].view()
    }

    fn material_views(&mut self, material: &MaterialData) -> Result<[vk::ImageView; 3], AssetError> {
        let mut views = [vk::ImageView::null(); 3];
        for role in TextureRole::ALL {
            views[role.binding() as usize] = match material.texture(role) {
                Some(path) => self.load_file(path, role)?,
                None if role == TextureRole::Diffuse && material.diffuse_color != [1.0; 3] => {
                    let [r, g, b] = material.diffuse_color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
                    let texture = Texture::solid_color(self.gpu, [r, g, b, 255], format_for(role))?;
                    self.push(texture)
                }
                None => self.placeholder(role),
            };
        }
        Ok(views)
    }

    fn load_file(&mut self, path: &Path, role: TextureRole) -> Result<vk::ImageView, AssetError> {
        let key = (path.to_path_buf(), role.is_color());
        if let Some(&index) = self.by_path.get(&key) {
            return Ok(self.textures[index].view());
        }

        let image = ImageData::from_file(path)?;
        let texture = Texture::from_image(self.gpu, &image, format_for(role))?;
        let view = self.push(texture);
        self.by_path.insert(key, self.textures.len() - 1);
        log::debug!("Loaded {:?} texture {:?}", role, path);
        Ok(view)
    }

    fn push(&mut self, texture: Texture) -> vk::ImageView {
        let view = texture.view();
        self.textures.push(texture);
        view
    }
}

fn format_for(role: TextureRole) -> vk::Format {
    if role.is_color() {
        vk::Format::R8G8B8A8_SRGB
    } else {
        vk::Format::R8G8B8A8_UNORM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[derive(Debug, PartialEq)]
    enum Command {
        Material(u64),
        Geometry(u64, u64),
        Draw(u32),
    }

    #[derive(Default)]
    struct Recorder {
        commands: Vec<Command>,
    }

    impl DrawTarget for Recorder {
        fn bind_material(&mut self, material: vk::DescriptorSet) {
            self.commands.push(Command::Material(material.as_raw()));
        }

        fn bind_geometry(&mut self, vertex_buffer: vk::Buffer, index_buffer: vk::Buffer) {
            self.commands
                .push(Command::Geometry(vertex_buffer.as_raw(), index_buffer.as_raw()));
        }

        fn draw_indexed(&mut self, index_count: u32) {
            self.commands.push(Command::Draw(index_count));
        }
    }

    fn buffer(raw: u64) -> vk::Buffer {
        vk::Buffer::from_raw(raw)
    }

    fn set(raw: u64) -> vk::DescriptorSet {
        vk::DescriptorSet::from_raw(raw)
    }

    #[test]
    fn test_draws_in_load_order_with_materials() {
        let model = Model::from_parts(
            vec![
                SubMesh::new("body", 36, buffer(1), buffer(2), Some(1)),
                SubMesh::new("glass", 6, buffer(3), buffer(4), Some(0)),
            ],
            vec![set(10), set(11)],
            set(99),
        );

        let mut recorder = Recorder::default();
        let stats = model.draw(&mut recorder);

        assert_eq!(stats, DrawStats { draw_calls: 2, skipped: 0 });
        assert_eq!(
            recorder.commands,
            vec![
                Command::Material(11),
                Command::Geometry(1, 2),
                Command::Draw(36),
                Command::Material(10),
                Command::Geometry(3, 4),
                Command::Draw(6),
            ]
        );
    }

    #[test]
    fn test_zero_index_submesh_issues_no_draw() {
        let model = Model::from_parts(
            vec![
                SubMesh::new("empty", 0, buffer(1), buffer(2), None),
                SubMesh::new("cube", 36, buffer(3), buffer(4), None),
            ],
            Vec::new(),
            set(99),
        );

        let mut recorder = Recorder::default();
        let stats = model.draw(&mut recorder);

        assert_eq!(stats, DrawStats { draw_calls: 1, skipped: 1 });
        assert_eq!(
            recorder.commands,
            vec![Command::Material(99), Command::Geometry(3, 4), Command::Draw(36)]
        );
    }

    #[test]
    fn test_missing_material_uses_placeholder_set() {
        let model = Model::from_parts(
            vec![SubMesh::new("orphan", 3, buffer(1), buffer(2), Some(5))],
            vec![set(10)],
            set(99),
        );

        let mut recorder = Recorder::default();
        model.draw(&mut recorder);
        assert_eq!(recorder.commands[0], Command::Material(99));
        assert_eq!(model.index_count(), 3);
    }

    #[test]
    fn test_texture_formats_follow_role() {
        assert_eq!(format_for(TextureRole::Diffuse), vk::Format::R8G8B8A8_SRGB);
        assert_eq!(format_for(TextureRole::Specular), vk::Format::R8G8B8A8_UNORM);
        assert_eq!(format_for(TextureRole::Normal), vk::Format::R8G8B8A8_UNORM);
    }
}
