//! Instanced model subsystem
//!
//! Stores mesh resources once on the device and draws any number of
//! instances of them, each with its own model matrix. All matrices share one
//! dynamic uniform buffer; a draw selects its matrix by dynamic offset.
//!
//! # Architecture
//!
//! ```text
//! ModelRepository
//!         ├── MeshResource (one per ResourceId, vertex + index regions)
//!         ├── TransformSlotPool (aligned matrix slots, free-slot allocator)
//!         └── IdSource (resource and instance counters)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut repository = ModelRepository::new(&context, 256)?;
//! let teapot = repository.add_resource(&context, &vertices, &indices)?;
//! let spawned = repository.create_instances(teapot, 10)?;
//!
//! repository.translate(spawned[0], &Vec3::new(1.0, 0.0, 0.0))?;
//! repository.flush_dynamic_buffer(&context)?;
//! repository.draw(&mut recorder);
//! ```

pub mod error;
pub mod ids;
pub mod mesh_resource;
pub mod repository;
pub mod slots;
pub mod transform_pool;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{InstancingError, InstancingResult};
pub use ids::{IdCounter, IdSource, InstanceId, ResourceId};
pub use mesh_resource::MeshResource;
pub use repository::ModelRepository;
pub use slots::{FreeSlots, HostSlotBuffer, SlotLayout, SlotView, SlotViewMut};
pub use transform_pool::{TransformDescriptorInfo, TransformSlotPool};
