use std::io::{BufRead, Cursor};
use std::path::PathBuf;

use cfg_if::cfg_if;

use crate::error::{EngineError, EngineResult};
use crate::vk_types::mesh::Mesh;
use crate::vk_types::vertex::Vertex;

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Where shaders and meshes come from. A platform asset manager plugs in here.
pub trait AssetSource {
    fn read_bytes(&self, path: &str) -> EngineResult<Vec<u8>>;
}

/// Assets laid out under a directory on disk.
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for AssetDir {
    fn read_bytes(&self, path: &str) -> EngineResult<Vec<u8>> {
        let full_path = self.root.join(path);
        std::fs::read(&full_path).map_err(|source| EngineError::Asset {
            path: full_path,
            source,
        })
    }
}

/// Validates and re-aligns SPIR-V bytecode, swapping endianness if needed.
pub fn read_spirv(path: &str, bytes: &[u8]) -> EngineResult<Vec<u32>> {
    let invalid = |reason: &str| EngineError::InvalidSpirv {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if bytes.len() < 4 || bytes.len() % 4 != 0 {
        return Err(invalid("size is not a non-zero multiple of 4"));
    }
    let first_word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if first_word != SPIRV_MAGIC && first_word != SPIRV_MAGIC.swap_bytes() {
        return Err(invalid("missing SPIR-V magic number"));
    }
    ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| invalid(&e.to_string()))
}

impl Mesh {
    /// Loads every shape of an OBJ file as one flat, triangulated vertex list.
    pub fn load_from_obj<R: BufRead>(name: &str, reader: &mut R) -> EngineResult<Mesh> {
        let options = tobj::LoadOptions {
            triangulate: true,
            ..Default::default()
        };
        let (models, materials) =
            tobj::load_obj_buf(reader, &options, |_| Err(tobj::LoadError::OpenFileFailed))
                .map_err(|source| EngineError::Obj {
                    path: name.to_string(),
                    source,
                })?;
        // materials are not used, but a broken mtllib is still worth a warning
        if let Err(e) = materials {
            log::warn!("{}: materials not loaded: {}", name, e);
        }

        let mut vertices = Vec::new();
        for model in &models {
            let mesh = &model.mesh;
            vertices.reserve(mesh.indices.len());
            for (corner, &index) in mesh.indices.iter().enumerate() {
                let p = 3 * index as usize;
                let position = [
                    mesh.positions[p],
                    mesh.positions[p + 1],
                    mesh.positions[p + 2],
                ];
                let normal = mesh
                    .normal_indices
                    .get(corner)
                    .map(|&n| {
                        let n = 3 * n as usize;
                        [mesh.normals[n], mesh.normals[n + 1], mesh.normals[n + 2]]
                    })
                    .unwrap_or_default();
                cfg_if! {
                    if #[cfg(feature = "vertex_normals")] {
                        let color = normal;
                    } else {
                        let color = [1.0, 1.0, 1.0];
                    }
                }
                vertices.push(Vertex {
                    position,
                    normal,
                    color,
                });
            }
        }
        log::info!(
            "Loaded {} with {} shapes, {} vertices",
            name,
            models.len(),
            vertices.len()
        );
        Ok(Mesh {
            vertices,
            ..Default::default()
        })
    }
}

pub fn load_mesh(assets: &dyn AssetSource, path: &str) -> EngineResult<Mesh> {
    let bytes = assets.read_bytes(path)?;
    Mesh::load_from_obj(path, &mut Cursor::new(bytes))
}
