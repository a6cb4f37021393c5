//! Loading OBJ files and their material libraries from disk

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use viewer_engine::assets::{AssetError, ObjLoader};
use viewer_engine::render::material::TextureRole;

/// Write `contents` to `name` under `dir`, creating parent directories
fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

const TWO_PART_OBJ: &str = "\
mtllib materials/parts.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
o Body
usemtl Painted
f 1/1 2/2 3/3 4/4
o Trim
usemtl Bare
f -4/1 -3/2 -2/3
";

const PARTS_MTL: &str = "\
newmtl Painted
Kd 0.9 0.2 0.2
map_Kd textures/paint.png
map_Ks spec.png
newmtl Bare
Kd 0.5 0.5 0.5
";

#[test]
fn sub_meshes_keep_file_order_and_resolve_textures() {
    let dir = tempfile::tempdir().unwrap();
    let obj = write(&dir, "model.obj", TWO_PART_OBJ);
    write(&dir, "materials/parts.mtl", PARTS_MTL);

    let model = ObjLoader::load_obj(&obj).unwrap();
    let names: Vec<&str> = model.meshes.iter().map(|mesh| mesh.name.as_str()).collect();
    assert_eq!(names, vec!["Body", "Trim"]);

    let body = &model.meshes[0];
    assert_eq!(body.indices.len(), 6);
    assert_eq!(body.vertices.len(), 4);
    body.check_indices().unwrap();
    model.meshes[1].check_indices().unwrap();

    let painted = &model.materials[body.material.unwrap()];
    assert_eq!(painted.name, "Painted");
    assert_eq!(
        painted.texture(TextureRole::Diffuse),
        Some(dir.path().join("materials/textures/paint.png").as_path())
    );
    assert_eq!(
        painted.texture(TextureRole::Specular),
        Some(dir.path().join("materials/spec.png").as_path())
    );
    assert_eq!(painted.texture(TextureRole::Normal), None);

    let bare = &model.materials[model.meshes[1].material.unwrap()];
    assert_eq!(bare.diffuse_color, [0.5, 0.5, 0.5]);
}

#[test]
fn missing_material_library_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let obj = write(&dir, "model.obj", TWO_PART_OBJ);

    match ObjLoader::load_obj(&obj) {
        Err(AssetError::MissingMaterialLibrary { library, .. }) => {
            assert!(library.ends_with("materials/parts.mtl"), "{library:?}");
        }
        other => panic!("expected a missing library error, got {other:?}"),
    }
}

#[test]
fn unknown_material_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "materials/parts.mtl", "newmtl Painted\n");
    let obj = write(&dir, "model.obj", TWO_PART_OBJ);

    match ObjLoader::load_obj(&obj) {
        Err(AssetError::UnknownMaterial { name, .. }) => assert_eq!(name, "Bare"),
        other => panic!("expected an unknown material error, got {other:?}"),
    }
}

#[test]
fn missing_file_and_empty_model_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ObjLoader::load_obj(dir.path().join("absent.obj")),
        Err(AssetError::Io { .. })
    ));

    let empty = write(&dir, "empty.obj", "# nothing here\nv 0 0 0\n");
    assert!(matches!(ObjLoader::load_obj(&empty), Err(AssetError::Empty { .. })));
}

#[test]
fn out_of_range_face_reports_file_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let obj = write(&dir, "bad.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\n\nf 1 2 9\n");

    match ObjLoader::load_obj(&obj) {
        Err(AssetError::Parse { path, line, .. }) => {
            assert_eq!(path, obj);
            assert_eq!(line, 5);
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}
