//! Vertex types for mesh resources
//!
//! Mesh resources are generic over any vertex satisfying [`MeshVertex`]: plain
//! old data with a position and, optionally, a texture coordinate. Two shapes
//! ship with the engine; the importer can produce either.

use bytemuck::{Pod, Zeroable};

/// Component format of a single vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    /// Two 32-bit floats
    Float2,
    /// Three 32-bit floats
    Float3,
    /// Four 32-bit floats
    Float4,
}

impl VertexFormat {
    /// Size in bytes
    pub const fn size(self) -> u32 {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
        }
    }
}

/// One attribute of a vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Byte offset inside the vertex
    pub offset: u32,
    /// Component format
    pub format: VertexFormat,
}

impl VertexAttribute {
    /// Attribute at `location`, `offset` bytes into the vertex
    pub const fn new(location: u32, offset: u32, format: VertexFormat) -> Self {
        Self {
            location,
            offset,
            format,
        }
    }
}

/// A vertex as produced by the importer, before it is narrowed to a shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedVertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// Linear RGBA color
    pub color: [f32; 4],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

/// Capability set every uploadable vertex type provides
pub trait MeshVertex: Pod {
    /// Attribute layout, ordered by location
    const ATTRIBUTES: &'static [VertexAttribute];

    /// Position in model space
    fn position(&self) -> [f32; 3];

    /// Texture coordinate, for shapes that carry one
    fn tex_coord(&self) -> Option<[f32; 2]> {
        None
    }

    /// Narrow an imported vertex to this shape
    fn from_imported(vertex: &ImportedVertex) -> Self;

    /// Byte stride between consecutive vertices
    fn stride() -> u32 {
        std::mem::size_of::<Self>() as u32
    }
}

/// Vertex with position, normal and color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColoredVertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// Linear RGBA color
    pub color: [f32; 4],
}

impl ColoredVertex {
    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 4]) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }
}

impl MeshVertex for ColoredVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute::new(0, 0, VertexFormat::Float3),
        VertexAttribute::new(1, 12, VertexFormat::Float3),
        VertexAttribute::new(2, 24, VertexFormat::Float4),
    ];

    fn position(&self) -> [f32; 3] {
        self.position
    }

    fn from_imported(vertex: &ImportedVertex) -> Self {
        Self::new(vertex.position, vertex.normal, vertex.color)
    }
}

/// Vertex with position, normal, color and texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// Linear RGBA color
    pub color: [f32; 4],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

impl MeshVertex for TexturedVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute::new(0, 0, VertexFormat::Float3),
        VertexAttribute::new(1, 12, VertexFormat::Float3),
        VertexAttribute::new(2, 24, VertexFormat::Float4),
        VertexAttribute::new(3, 40, VertexFormat::Float2),
    ];

    fn position(&self) -> [f32; 3] {
        self.position
    }

    fn tex_coord(&self) -> Option<[f32; 2]> {
        Some(self.tex_coord)
    }

    fn from_imported(vertex: &ImportedVertex) -> Self {
        Self {
            position: vertex.position,
            normal: vertex.normal,
            color: vertex.color,
            tex_coord: vertex.tex_coord,
        }
    }
}
