//! OBJ file loader for 3D models
//!
//! Produces one [`SubMeshData`] per `o`/`g`/`usemtl` group. Every group owns
//! its vertices, so its indices never reach into another group's buffer.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::assets::{AssetError, MtlData, MtlParser, ParseIssue};
use crate::render::material::TextureRole;
use crate::render::mesh::Vertex;

/// Geometry of one sub-mesh, ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct SubMeshData {
    /// Group or object name from the OBJ file
    pub name: String,
    /// Deduplicated vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
    /// Index into [`ModelData::materials`]; `None` draws with placeholders
    pub material: Option<usize>,
}

impl SubMeshData {
    /// Check that every index addresses one of this sub-mesh's own vertices
    pub fn check_indices(&self) -> Result<(), AssetError> {
        match self
            .indices
            .iter()
            .find(|&&index| index as usize >= self.vertices.len())
        {
            Some(&index) => Err(AssetError::InvalidIndex {
                mesh: self.name.clone(),
                index,
                vertex_count: self.vertices.len(),
            }),
            None => Ok(()),
        }
    }
}

/// Material referenced by at least one sub-mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    /// Name from the MTL file
    pub name: String,
    /// Kd, used as a flat diffuse colour when there is no diffuse map
    pub diffuse_color: [f32; 3],
    /// Diffuse map resolved against the MTL directory
    pub diffuse_map: Option<PathBuf>,
    /// Specular map resolved against the MTL directory
    pub specular_map: Option<PathBuf>,
    /// Normal map resolved against the MTL directory
    pub normal_map: Option<PathBuf>,
}

impl MaterialData {
    /// Texture file for `role`, if the material has one
    pub fn texture(&self, role: TextureRole) -> Option<&Path> {
        match role {
            TextureRole::Diffuse => self.diffuse_map.as_deref(),
            TextureRole::Specular => self.specular_map.as_deref(),
            TextureRole::Normal => self.normal_map.as_deref(),
        }
    }

    fn from_mtl(mtl: &MtlData, dir: &Path) -> Self {
        let resolve = |map: &Option<String>| map.as_ref().map(|file| dir.join(file));
        Self {
            name: mtl.name.clone(),
            diffuse_color: mtl.diffuse,
            diffuse_map: resolve(&mtl.diffuse_map),
            specular_map: resolve(&mtl.specular_map),
            normal_map: resolve(&mtl.normal_map),
        }
    }
}

/// CPU-side model: sub-meshes in file order plus the materials they use
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    /// Sub-meshes in draw order
    pub meshes: Vec<SubMeshData>,
    /// Materials in order of first use
    pub materials: Vec<MaterialData>,
}

impl ModelData {
    /// Unit cube centred on the origin with per-face normals and UVs
    pub fn unit_cube() -> Self {
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // normal, u axis, v axis
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u_axis, v_axis) in faces {
            let base = vertices.len() as u32;
            for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let position = std::array::from_fn(|i| {
                    0.5 * normal[i] + (u - 0.5) * u_axis[i] + (v - 0.5) * v_axis[i]
                });
                vertices.push(Vertex::new(position, normal, [u, v]));
            }
            // Counter-clockwise seen from outside
            indices.extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
        }

        Self {
            meshes: vec![SubMeshData {
                name: "cube".to_string(),
                vertices,
                indices,
                material: None,
            }],
            materials: Vec::new(),
        }
    }
}

/// Group of faces as written in the OBJ file, before material resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ObjGroup {
    /// Group or object name
    pub name: String,
    /// `usemtl` name in effect for the group
    pub material: Option<String>,
    /// Deduplicated vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

/// Result of parsing OBJ text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjDocument {
    /// Non-empty groups in file order
    pub groups: Vec<ObjGroup>,
    /// `mtllib` file names in file order
    pub material_libraries: Vec<String>,
}

/// Loader entry points
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file and the material libraries it references
    ///
    /// Texture paths are resolved but not decoded.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<ModelData, AssetError> {
        let path = path.as_ref();
        log::info!("Loading model {:?}", path);

        let source = read_text(path)?;
        let document = Self::parse_obj(&source).map_err(|issue| issue.at(path))?;
        if document.groups.is_empty() {
            return Err(AssetError::Empty {
                path: path.to_path_buf(),
            });
        }

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut library: Vec<(MtlData, PathBuf)> = Vec::new();
        for name in &document.material_libraries {
            let library_path = base_dir.join(name.replace('\\', "/"));
            if !library_path.is_file() {
                return Err(AssetError::MissingMaterialLibrary {
                    path: path.to_path_buf(),
                    library: library_path,
                });
            }
            let contents = read_text(&library_path)?;
            let parsed = MtlParser::parse(&contents).map_err(|issue| issue.at(&library_path))?;
            let library_dir = library_path
                .parent()
                .map_or_else(|| base_dir.to_path_buf(), Path::to_path_buf);
            log::debug!("Parsed {} material(s) from {:?}", parsed.len(), library_path);
            library.extend(parsed.into_iter().map(|mtl| (mtl, library_dir.clone())));
        }

        let mut by_name: HashMap<&str, usize> = HashMap::new();
        for (index, (mtl, _)) in library.iter().enumerate() {
            by_name.entry(mtl.name.as_str()).or_insert(index);
        }

        let mut model = ModelData::default();
        let mut used: HashMap<usize, usize> = HashMap::new();
        for group in document.groups {
            let material = match &group.material {
                None => None,
                Some(name) => {
                    let library_index = *by_name.get(name.as_str()).ok_or_else(|| {
                        AssetError::UnknownMaterial {
                            path: path.to_path_buf(),
                            name: name.clone(),
                        }
                    })?;
                    let index = *used.entry(library_index).or_insert_with(|| {
                        let (mtl, dir) = &library[library_index];
                        model.materials.push(MaterialData::from_mtl(mtl, dir));
                        model.materials.len() - 1
                    });
                    Some(index)
                }
            };

            model.meshes.push(SubMeshData {
                name: group.name,
                vertices: group.vertices,
                indices: group.indices,
                material,
            });
        }

        log::info!(
            "Loaded {:?}: {} sub-mesh(es), {} material(s)",
            path,
            model.meshes.len(),
            model.materials.len()
        );
        Ok(model)
    }

    /// Parse OBJ text
    ///
    /// Polygons are fan-triangulated, negative indices count back from the
    /// most recent element, and faces without normals get a flat face normal.
    pub fn parse_obj(source: &str) -> Result<ObjDocument, ParseIssue> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut document = ObjDocument::default();
        let mut current = GroupBuilder::new("default".to_string(), None);
        let mut warned: HashSet<String> = HashSet::new();

        for (line_index, raw_line) in source.lines().enumerate() {
            let line_num = line_index + 1;
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(command) = tokens.next() else {
                continue;
            };

            match command {
                "v" => {
                    let [x, y, z] = parse_floats::<3>(&mut tokens, 3, line_num, command)?;
                    positions.push([x, y, z]);
                }
                "vt" => {
                    let [u, v] = parse_floats::<2>(&mut tokens, 1, line_num, command)?;
                    // OBJ puts the UV origin bottom-left, Vulkan images start top-left
                    tex_coords.push([u, 1.0 - v]);
                }
                "vn" => {
                    let normal = parse_floats::<3>(&mut tokens, 3, line_num, command)?;
                    normals.push(normal);
                }
                "f" => {
                    let corners = tokens
                        .map(|token| {
                            parse_corner(
                                token,
                                [positions.len(), tex_coords.len(), normals.len()],
                                line_num,
                            )
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    if corners.len() < 3 {
                        return Err(ParseIssue::new(line_num, "face needs at least 3 vertices"));
                    }
                    current.add_face(&corners, &positions, &tex_coords, &normals);
                }
                "o" | "g" => {
                    let name = tokens.collect::<Vec<_>>().join(" ");
                    let name = if name.is_empty() { "unnamed".to_string() } else { name };
                    let material = current.material.clone();
                    current = current.split(&mut document, name, material);
                }
                "usemtl" => {
                    let material = tokens
                        .next()
                        .ok_or_else(|| ParseIssue::new(line_num, "usemtl missing material name"))?
                        .to_string();
                    let name = current.name.clone();
                    current = current.split(&mut document, name, Some(material));
                }
                "mtllib" => {
                    document
                        .material_libraries
                        .extend(tokens.map(str::to_string));
                }
                "s" => {}
                other => {
                    if warned.insert(other.to_string()) {
                        log::warn!("Ignoring unsupported OBJ statement '{}' (line {})", other, line_num);
                    }
                }
            }
        }

        current.finish(&mut document);
        Ok(document)
    }
}

fn read_text(path: &Path) -> Result<String, AssetError> {
    std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read up to `N` floats; at least `required` must be present, the rest default to 0
fn parse_floats<const N: usize>(
    tokens: &mut std::str::SplitWhitespace<'_>,
    required: usize,
    line_num: usize,
    command: &str,
) -> Result<[f32; N], ParseIssue> {
    let mut values = [0.0; N];
    for (index, slot) in values.iter_mut().enumerate() {
        match tokens.next() {
            Some(token) => {
                *slot = token
                    .parse::<f32>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| {
                        ParseIssue::new(line_num, format!("{command} has invalid number '{token}'"))
                    })?;
            }
            None if index < required => {
                return Err(ParseIssue::new(
                    line_num,
                    format!("{command} needs at least {required} values"),
                ));
            }
            None => break,
        }
    }
    Ok(values)
}

/// Zero-based (position, tex_coord, normal) indices of one face corner
type Corner = (usize, Option<usize>, Option<usize>);

fn parse_corner(token: &str, counts: [usize; 3], line_num: usize) -> Result<Corner, ParseIssue> {
    let mut parts = token.split('/');
    let position = parts
        .next()
        .filter(|part| !part.is_empty())
        .ok_or_else(|| ParseIssue::new(line_num, format!("face corner '{token}' has no position")))?;
    let position = resolve_index(position, counts[0], line_num)?;

    let mut optional = |count: usize| -> Result<Option<usize>, ParseIssue> {
        match parts.next() {
            Some(part) if !part.is_empty() => resolve_index(part, count, line_num).map(Some),
            _ => Ok(None),
        }
    };
    let tex_coord = optional(counts[1])?;
    let normal = optional(counts[2])?;
    Ok((position, tex_coord, normal))
}

/// Convert a 1-based (or negative, relative) OBJ index to a 0-based one
fn resolve_index(raw: &str, count: usize, line_num: usize) -> Result<usize, ParseIssue> {
    let value: i64 = raw
        .parse()
        .map_err(|_| ParseIssue::new(line_num, format!("invalid index '{raw}'")))?;
    let count_i = count as i64;
    let resolved = match value {
        v if v > 0 && v <= count_i => v - 1,
        v if v < 0 && -v <= count_i => count_i + v,
        _ => {
            return Err(ParseIssue::new(
                line_num,
                format!("index {value} out of range ({count} defined)"),
            ))
        }
    };
    Ok(resolved as usize)
}

/// Newell's method, robust for non-planar polygons
fn face_normal(corners: &[Corner], positions: &[[f32; 3]]) -> [f32; 3] {
    let mut normal = [0.0f32; 3];
    for (i, corner) in corners.iter().enumerate() {
        let current = positions[corner.0];
        let next = positions[corners[(i + 1) % corners.len()].0];
        normal[0] += (current[1] - next[1]) * (current[2] + next[2]);
        normal[1] += (current[2] - next[2]) * (current[0] + next[0]);
        normal[2] += (current[0] - next[0]) * (current[1] + next[1]);
    }
    let length = normal.iter().map(|n| n * n).sum::<f32>().sqrt();
    if length > f32::EPSILON {
        normal.map(|n| n / length)
    } else {
        [0.0, 1.0, 0.0]
    }
}

struct GroupBuilder {
    name: String,
    material: Option<String>,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    lookup: HashMap<Vertex, u32>,
}

impl GroupBuilder {
    fn new(name: String, material: Option<String>) -> Self {
        Self {
            name,
            material,
            vertices: Vec::new(),
            indices: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Start a new group, keeping this one only if it has faces
    fn split(mut self, document: &mut ObjDocument, name: String, material: Option<String>) -> Self {
        if self.indices.is_empty() {
            self.name = name;
            self.material = material;
            self
        } else {
            self.finish(document);
            Self::new(name, material)
        }
    }

    fn finish(self, document: &mut ObjDocument) {
        if self.indices.is_empty() {
            return;
        }
        log::debug!(
            "OBJ group '{}': {} vertices, {} indices",
            self.name,
            self.vertices.len(),
            self.indices.len()
        );
        document.groups.push(ObjGroup {
            name: self.name,
            material: self.material,
            vertices: self.vertices,
            indices: self.indices,
        });
    }

    fn add_face(
        &mut self,
        corners: &[Corner],
        positions: &[[f32; 3]],
        tex_coords: &[[f32; 2]],
        normals: &[[f32; 3]],
    ) {
        let flat_normal = if corners.iter().all(|corner| corner.2.is_some()) {
            None
        } else {
            Some(face_normal(corners, positions))
        };

        let corner_indices: Vec<u32> = corners
            .iter()
            .map(|&(position, tex_coord, normal)| {
                let vertex = Vertex::new(
                    positions[position],
                    normal
                        .map(|n| normals[n])
                        .or(flat_normal)
                        .unwrap_or([0.0, 1.0, 0.0]),
                    tex_coord.map_or([0.0, 0.0], |t| tex_coords[t]),
                );
                self.intern(vertex)
            })
            .collect();

        for i in 1..corner_indices.len() - 1 {
            self.indices.extend_from_slice(&[
                corner_indices[0],
                corner_indices[i],
                corner_indices[i + 1],
            ]);
        }
    }

    fn intern(&mut self, vertex: Vertex) -> u32 {
        if let Some(&index) = self.lookup.get(&vertex) {
            return index;
        }
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        self.lookup.insert(vertex, index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let document = ObjLoader::parse_obj(QUAD).unwrap();
        assert_eq!(document.groups.len(), 1);

        let group = &document.groups[0];
        assert_eq!(group.vertices.len(), 4);
        assert_eq!(group.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(group.vertices[0].normal, [0.0, 0.0, 1.0]);
        // v flipped to a top-left origin
        assert_eq!(group.vertices[0].tex_coord, [0.0, 1.0]);
        assert_eq!(group.vertices[2].tex_coord, [1.0, 0.0]);
    }

    #[test]
    fn test_shared_corners_deduplicate() {
        let obj = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1
f 1//1 3//1 4//1
";
        let group = &ObjLoader::parse_obj(obj).unwrap().groups[0];
        assert_eq!(group.vertices.len(), 4);
        assert_eq!(group.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
f -3 -2 -1
";
        let group = &ObjLoader::parse_obj(obj).unwrap().groups[0];
        assert_eq!(group.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(group.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_normals_get_flat_face_normal() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
";
        let group = &ObjLoader::parse_obj(obj).unwrap().groups[0];
        for vertex in &group.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
            assert_eq!(vertex.tex_coord, [0.0, 0.0]);
        }
    }

    #[test]
    fn test_usemtl_and_objects_split_groups() {
        let obj = "\
mtllib scene.mtl
v 0 0 0
v 1 0 0
v 0 1 0
o Left
usemtl Red
f 1 2 3
usemtl Blue
f 1 3 2
o Right
f 3 2 1
g
";
        let document = ObjLoader::parse_obj(obj).unwrap();
        assert_eq!(document.material_libraries, vec!["scene.mtl".to_string()]);

        let summary: Vec<(&str, Option<&str>)> = document
            .groups
            .iter()
            .map(|g| (g.name.as_str(), g.material.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![("Left", Some("Red")), ("Left", Some("Blue")), ("Right", Some("Blue"))]
        );
        for group in &document.groups {
            assert_eq!(group.vertices.len(), 3);
        }
    }

    #[test]
    fn test_out_of_range_index_reports_line() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\n\nf 1 2 4\n";
        let issue = ObjLoader::parse_obj(obj).unwrap_err();
        assert_eq!(issue.line, 5);
        assert!(issue.message.contains("out of range"));

        let issue = ObjLoader::parse_obj("v 0 0 0\nf 0 1 1\n").unwrap_err();
        assert_eq!(issue.line, 2);
    }

    #[test]
    fn test_malformed_statements_are_rejected() {
        assert!(ObjLoader::parse_obj("v 1 2\n").is_err());
        assert!(ObjLoader::parse_obj("v 1 nan 2\n").is_err());
        assert!(ObjLoader::parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n").is_err());
    }

    #[test]
    fn test_unsupported_statements_are_skipped() {
        let obj = format!("{QUAD}l 1 2\ncurv 0 1 1 2\n");
        let document = ObjLoader::parse_obj(&obj).unwrap();
        assert_eq!(document.groups.len(), 1);
    }

    #[test]
    fn test_unit_cube_faces_point_outward() {
        let cube = ModelData::unit_cube();
        let mesh = &cube.meshes[0];
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        mesh.check_indices().unwrap();

        for triangle in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| {
                nalgebra::Vector3::from(mesh.vertices[triangle[i] as usize].position)
            });
            let winding = (b - a).cross(&(c - a));
            let normal = nalgebra::Vector3::from(mesh.vertices[triangle[0] as usize].normal);
            assert!(winding.dot(&normal) > 0.0);
            assert!((a.dot(&normal) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_check_indices_rejects_foreign_vertices() {
        let mesh = SubMeshData {
            name: "broken".to_string(),
            vertices: vec![Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2]); 3],
            indices: vec![0, 1, 3],
            material: None,
        };
        assert!(matches!(
            mesh.check_indices(),
            Err(AssetError::InvalidIndex { index: 3, vertex_count: 3, .. })
        ));
    }
}
