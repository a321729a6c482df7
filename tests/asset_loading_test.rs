use mirror_ngin::resources;

#[tokio::test]
async fn obj_quad_is_triangulated() {
    let meshes = resources::load_mesh_obj("plane.obj").await.unwrap();
    assert_eq!(meshes.len(), 1);

    let plane = &meshes[0];
    assert_eq!(plane.vertex_count(), 4);
    assert_eq!(plane.triangle_count(), 2);
    assert_eq!(plane.normals.len(), 12);
    assert_eq!(plane.uvs.len(), 8);
    plane.validate().unwrap();

    // every normal of the quad points up
    for normal in plane.normals.chunks(3) {
        assert_eq!(normal, [0.0, 1.0, 0.0]);
    }
}

#[tokio::test]
async fn obj_uvs_are_flipped_for_wgpu() {
    let meshes = resources::load_mesh_obj("plane.obj").await.unwrap();
    let vs: Vec<f32> = meshes[0].uvs.chunks(2).map(|uv| uv[1]).collect();
    // vt 0 0 is the bottom left of the image, which wgpu samples at v = 1
    assert!(vs.contains(&1.0));
    assert!(vs.contains(&0.0));
    assert_eq!(meshes[0].uvs[1], 1.0);
}

#[tokio::test]
async fn load_mesh_picks_parser_by_extension() {
    let by_extension = resources::load_mesh("plane.obj").await.unwrap();
    let direct = resources::load_mesh_obj("plane.obj").await.unwrap();
    assert_eq!(by_extension, direct);

    let err = resources::load_mesh("plane.fbx").await.unwrap_err();
    assert!(format!("{err:#}").contains("Unsupported mesh format"));
}

#[tokio::test]
async fn missing_files_are_reported() {
    let err = resources::load_mesh("does_not_exist.obj").await.unwrap_err();
    assert!(format!("{err:#}").contains("does_not_exist.obj"));

    assert!(resources::load_image("does_not_exist.png").await.is_err());
}
