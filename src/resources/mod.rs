use std::io::{BufReader, Cursor};

use anyhow::Context as _;

use crate::data_structures::{
    mesh_data::MeshData,
    model::{self, MaterialParams, material_layout},
    texture::Texture,
};

/**
 * This module contains all logic for loading mesh/textures/etc. from external files.
 */
pub mod mesh;
pub mod texture;

pub use texture::{CubemapFaces, load_binary, load_cubemap, load_image, load_string, load_texture};

/// Read every mesh in an `.obj` file. Materials referenced by the file are
/// ignored; demos pick their textures explicitly.
pub async fn load_mesh_obj(file_name: &str) -> anyhow::Result<Vec<MeshData>> {
    let obj_text: String = load_string(file_name).await?;
    let obj_cursor = Cursor::new(obj_text);
    let mut obj_reader = BufReader::new(obj_cursor);

    let (models, _) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            log::info!("Ignoring material library {p} referenced by an obj file");
            Err(tobj::LoadError::OpenFileFailed)
        },
    )
    .await
    .with_context(|| format!("Could not parse {file_name}"))?;

    Ok(mesh::obj_to_mesh_data(models, file_name))
}

/// Read every mesh primitive of a `.gltf` or `.glb` file.
pub async fn load_mesh_gltf(file_name: &str) -> anyhow::Result<Vec<MeshData>> {
    let gltf_bytes = load_binary(file_name).await?;
    let gltf_reader = BufReader::new(Cursor::new(gltf_bytes));
    let gltf = gltf::Gltf::from_reader(gltf_reader)
        .with_context(|| format!("Could not parse {file_name}"))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .with_context(|| format!("{file_name} references a missing binary chunk"))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(uri).await?;
                buffer_data.push(bin);
            }
        }
    }

    Ok(mesh::gltf_to_mesh_data(&gltf.document, &buffer_data, file_name))
}

/// Load mesh data, choosing the parser by file extension.
pub async fn load_mesh(file_name: &str) -> anyhow::Result<Vec<MeshData>> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("obj") => load_mesh_obj(file_name).await,
        Some("gltf") | Some("glb") => load_mesh_gltf(file_name).await,
        _ => anyhow::bail!("Unsupported mesh format: {file_name}"),
    }
}

/// Upload meshes and give all of them one material.
pub fn build_model(
    device: &wgpu::Device,
    meshes: &[MeshData],
    name: &str,
    diffuse_texture: Texture,
    params: MaterialParams,
) -> anyhow::Result<model::Model> {
    let skipped = meshes.iter().filter(|data| data.is_empty()).count();
    if skipped > 0 {
        log::warn!("{name}: skipping {skipped} mesh(es) without triangles");
    }
    anyhow::ensure!(skipped < meshes.len(), "{name} contains no drawable meshes");
    let layout = material_layout(device);
    let meshes = meshes
        .iter()
        .filter(|data| !data.is_empty())
        .map(|data| {
            let mut mesh = data.upload(device)?;
            mesh.material = 0;
            Ok(mesh)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let materials = vec![model::Material::new(
        device,
        name,
        diffuse_texture,
        params,
        &layout,
    )];
    Ok(model::Model { meshes, materials })
}

/// Load a mesh file and a texture and combine them into a lit model.
pub async fn load_model(
    mesh_file: &str,
    texture_file: &str,
    params: MaterialParams,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<model::Model> {
    let meshes = load_mesh(mesh_file).await?;
    let diffuse = load_texture(texture_file, false, device, queue, None).await?;
    let model = build_model(device, &meshes, mesh_file, diffuse, params)?;
    log::info!(
        "Loaded {} with {} mesh(es), {} triangles",
        mesh_file,
        model.meshes.len(),
        meshes.iter().map(MeshData::triangle_count).sum::<usize>()
    );
    Ok(model)
}
