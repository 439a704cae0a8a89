//! OBJ import for 3D models
//!
//! Faces must already be triangles. Quads, polygons, lines and points are
//! rejected instead of being re-triangulated, so what is drawn is exactly
//! what the file describes.

use crate::render::vertex::{ImportedVertex, MeshVertex};
use std::io::{BufRead, Read};
use std::path::Path;
use thiserror::Error;

/// Default color for files without vertex colors
const DEFAULT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Errors raised while importing a mesh
#[derive(Error, Debug)]
pub enum ImportError {
    /// The importer could not read or parse the file
    #[error("Importer failure: {0}")]
    Load(#[from] tobj::LoadError),

    /// A face with other than three vertices was found
    #[error("Model '{model}' has a face with {arity} vertices; only triangles are supported")]
    NonTriangularFace {
        /// Name of the model inside the file
        model: String,
        /// Vertex count of the offending face
        arity: u32,
    },

    /// The file held no triangles
    #[error("No triangles found")]
    Empty,

    /// Combined geometry exceeds the `u32` index range
    #[error("Mesh has too many vertices for 32-bit indices")]
    TooManyVertices,
}

/// Flat triangle list produced by the importer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    /// Vertices with position, normal, color and texture coordinate
    pub vertices: Vec<ImportedVertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl ImportedMesh {
    /// Narrow every vertex to the shape `V`
    pub fn to_vertices<V: MeshVertex>(&self) -> Vec<V> {
        self.vertices.iter().map(V::from_imported).collect()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Load an OBJ file
///
/// Material libraries are resolved relative to the file's directory.
pub fn import_obj<P: AsRef<Path>>(path: P) -> Result<ImportedMesh, ImportError> {
    let path = path.as_ref();
    log::info!("Importing {}", path.display());

    let text = std::fs::read_to_string(path).map_err(|_| tobj::LoadError::OpenFileFailed)?;
    reject_point_elements(&text)?;

    let directory = path.parent().unwrap_or_else(|| Path::new(""));
    let mut bytes = text.as_bytes();
    let (models, materials) = tobj::load_obj_buf(&mut bytes, &load_options(), |library| {
        tobj::load_mtl(directory.join(library))
    })?;
    if let Err(err) = materials {
        log::debug!("No materials for {}: {}", path.display(), err);
    }

    flatten(&models)
}

/// Load OBJ text from a reader; material libraries are not resolved
pub fn import_obj_from_reader<R: BufRead>(reader: &mut R) -> Result<ImportedMesh, ImportError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|_| tobj::LoadError::ReadError)?;
    reject_point_elements(&text)?;

    let mut bytes = text.as_bytes();
    let (models, _) = tobj::load_obj_buf(&mut bytes, &load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })?;

    flatten(&models)
}

/// Fail on `p` records, which the OBJ parser would otherwise skip
fn reject_point_elements(text: &str) -> Result<(), ImportError> {
    let mut model = String::from("unnamed");
    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("o") => model = tokens.collect::<Vec<_>>().join(" "),
            Some("p") => return Err(ImportError::NonTriangularFace { model, arity: 1 }),
            _ => {}
        }
    }
    Ok(())
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: false,
        ..Default::default()
    }
}

/// Merge all models into one triangle list
fn flatten(models: &[tobj::Model]) -> Result<ImportedMesh, ImportError> {
    let mut mesh = ImportedMesh::default();

    for model in models {
        let source = &model.mesh;

        if let Some(&arity) = source.face_arities.iter().find(|&&arity| arity != 3) {
            return Err(ImportError::NonTriangularFace {
                model: model.name.clone(),
                arity,
            });
        }
        if source.indices.len() % 3 != 0 {
            return Err(ImportError::NonTriangularFace {
                model: model.name.clone(),
                arity: (source.indices.len() % 3) as u32,
            });
        }

        let base = u32::try_from(mesh.vertices.len()).map_err(|_| ImportError::TooManyVertices)?;
        let vertex_count = source.positions.len() / 3;
        let has_normals = source.normals.len() == source.positions.len();
        let has_colors = source.vertex_color.len() == source.positions.len();
        let has_tex_coords = source.texcoords.len() / 2 == vertex_count;

        for i in 0..vertex_count {
            mesh.vertices.push(ImportedVertex {
                position: triple(&source.positions, i),
                normal: if has_normals {
                    triple(&source.normals, i)
                } else {
                    [0.0; 3]
                },
                color: if has_colors {
                    let [r, g, b] = triple(&source.vertex_color, i);
                    [r, g, b, 1.0]
                } else {
                    DEFAULT_COLOR
                },
                tex_coord: if has_tex_coords {
                    [source.texcoords[i * 2], source.texcoords[i * 2 + 1]]
                } else {
                    [0.0; 2]
                },
            });
        }

        let first_index = mesh.indices.len();
        for &index in &source.indices {
            let index = base.checked_add(index).ok_or(ImportError::TooManyVertices)?;
            mesh.indices.push(index);
        }

        if !has_normals {
            log::warn!("Model '{}' has no normals; generating smooth normals", model.name);
            generate_smooth_normals(
                &mut mesh.vertices[base as usize..],
                &mesh.indices[first_index..],
                base,
            );
        }
    }

    if mesh.indices.is_empty() {
        return Err(ImportError::Empty);
    }
    u32::try_from(mesh.vertices.len()).map_err(|_| ImportError::TooManyVertices)?;

    log::info!(
        "Imported {} vertices, {} triangles from {} model(s)",
        mesh.vertices.len(),
        mesh.triangle_count(),
        models.len()
    );
    Ok(mesh)
}

fn triple(values: &[f32], vertex: usize) -> [f32; 3] {
    [values[vertex * 3], values[vertex * 3 + 1], values[vertex * 3 + 2]]
}

/// Area-weighted vertex normals from the triangles that share each vertex
fn generate_smooth_normals(vertices: &mut [ImportedVertex], indices: &[u32], base: u32) {
    use crate::foundation::math::Vec3;

    let mut sums = vec![Vec3::zeros(); vertices.len()];
    for triangle in indices.chunks_exact(3) {
        let local = [
            (triangle[0] - base) as usize,
            (triangle[1] - base) as usize,
            (triangle[2] - base) as usize,
        ];
        let [a, b, c] = local.map(|i| Vec3::from(vertices[i].position));

        // Cross product length is twice the triangle area
        let face_normal = (b - a).cross(&(c - a));
        for i in local {
            sums[i] += face_normal;
        }
    }

    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        let normal = sum.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
        vertex.normal = [normal.x, normal.y, normal.z];
    }
}
