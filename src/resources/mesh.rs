use crate::data_structures::mesh_data::MeshData;

/**
 * Converts tobj's output into `MeshData`.
 *
 * tobj is run with `single_index`, so positions, normals and texcoords share
 * the index buffer. Texture v is flipped because OBJ puts v = 0 at the bottom.
 */
pub fn obj_to_mesh_data(models: Vec<tobj::Model>, file_name: &str) -> Vec<MeshData> {
    models
        .into_iter()
        .map(|m| {
            let name = if m.name.is_empty() {
                file_name.to_string()
            } else {
                format!("{file_name}:{}", m.name)
            };
            MeshData {
                name,
                positions: m.mesh.positions,
                normals: m.mesh.normals,
                uvs: m.mesh.texcoords,
                indices: m.mesh.indices,
                material: m.mesh.material_id.unwrap_or(0),
            }
            .flip_v()
        })
        .collect()
}

/// Pull positions, normals, uvs and indices out of every primitive of every
/// mesh in a glTF document. Primitives without indices are drawn in order.
pub fn gltf_to_mesh_data(
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    file_name: &str,
) -> Vec<MeshData> {
    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

            let positions: Vec<f32> = match reader.read_positions() {
                Some(positions) => positions.flatten().collect(),
                None => {
                    log::warn!(
                        "Primitive {} of mesh {:?} in {} has no positions and is skipped",
                        primitive.index(),
                        mesh.name(),
                        file_name
                    );
                    continue;
                }
            };
            let normals: Vec<f32> = reader
                .read_normals()
                .map(|normals| normals.flatten().collect())
                .unwrap_or_default();
            let uvs: Vec<f32> = reader
                .read_tex_coords(0)
                .map(|uvs| uvs.into_f32().flatten().collect())
                .unwrap_or_default();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..(positions.len() / 3) as u32).collect(),
            };

            meshes.push(MeshData {
                name: format!("{file_name}:{}", mesh.name().unwrap_or("mesh")),
                positions,
                normals,
                uvs,
                indices,
                material: primitive.material().index().unwrap_or(0),
            });
        }
    }
    meshes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obj_meshes_keep_indices_and_flip_v() {
        let obj = "o quad\n\
                   v 0 0 0\nv 1 0 0\nv 1 1 0\n\
                   vt 0 0\nvt 1 0\nvt 1 1\n\
                   vn 0 0 1\n\
                   f 1/1/1 2/2/1 3/3/1\n";
        let (models, _) = tobj::load_obj_buf(
            &mut std::io::BufReader::new(obj.as_bytes()),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Err(tobj::LoadError::OpenFileFailed),
        )
        .unwrap();

        let meshes = obj_to_mesh_data(models, "quad.obj");
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.name, "quad.obj:quad");
        mesh.validate().unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.uvs, vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(&mesh.normals[..3], &[0.0, 0.0, 1.0]);
    }
}
