//! # Instanced Engine
//!
//! Instanced model rendering on Vulkan: meshes are uploaded once and drawn
//! any number of times, each instance reading its own model matrix from a
//! shared dynamic uniform buffer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use instanced_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = VulkanContext::new("demo", cfg!(debug_assertions))?;
//!     let mut repository = ModelRepository::new(&context, 64)?;
//!
//!     let mesh = import_obj("models/cube.obj")?;
//!     let vertices = mesh.to_vertices::<ColoredVertex>();
//!     let cube = repository.add_resource(&context, &vertices, &mesh.indices)?;
//!     let instances = repository.create_instances(cube, 4)?;
//!     repository.translate(instances[1], &Vec3::new(2.0, 0.0, 0.0))?;
//!
//!     repository.flush_dynamic_buffer(&context)?;
//!     let mut stats = DrawStats::default();
//!     repository.draw(&mut stats);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{import_obj, ImportError, ImportedMesh},
        config::{Config, ConfigError, EngineConfig},
        foundation::math::{Mat4, Vec3},
        render::{
            instancing::{
                IdSource, InstanceId, InstancingError, InstancingResult, ModelRepository,
                ResourceId,
            },
            vulkan::{VulkanContext, VulkanError},
            ColoredVertex, DrawRecorder, DrawStats, GpuDevice, MeshVertex, TexturedVertex, Window,
        },
    };
}
