//! Model repository
//!
//! Owns mesh resources and the transform slot pool, and keeps three
//! relationships consistent:
//!
//! ```text
//! ResourceId ──> MeshResource + { InstanceId } + { dynamic offset }
//! InstanceId ──> (ResourceId, slot)
//! slot       ──> matrix in the shared dynamic uniform buffer
//! ```
//!
//! Per frame the expected order is: mutate transforms, then
//! [`ModelRepository::flush_dynamic_buffer`], then [`ModelRepository::draw`].

use crate::foundation::math::{compose_rotation, compose_scale, compose_translation, Mat4, Vec3};
use crate::render::device::{DrawRecorder, GpuDevice};
use crate::render::instancing::transform_pool::{TransformDescriptorInfo, TransformSlotPool};
use crate::render::instancing::{
    IdSource, InstanceId, InstancingError, InstancingResult, MeshResource, ResourceId,
};
use crate::render::vertex::MeshVertex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// A registered resource with the instances drawn from it
struct ResourceEntry<B> {
    mesh: MeshResource<B>,
    instances: Vec<InstanceId>,
    offsets: BTreeSet<u32>,
}

/// Where a live instance lives
#[derive(Debug, Clone, Copy)]
struct InstanceRecord {
    resource: ResourceId,
    slot: u32,
    dynamic_offset: u32,
}

/// Registry of mesh resources and their transformable instances
pub struct ModelRepository<B> {
    ids: Arc<IdSource>,
    pool: TransformSlotPool<B>,
    resources: BTreeMap<ResourceId, ResourceEntry<B>>,
    instances: HashMap<InstanceId, InstanceRecord>,
}

impl<B> ModelRepository<B> {
    /// Create a repository with its own id source
    pub fn new<D>(device: &D, transform_capacity: u32) -> InstancingResult<Self>
    where
        D: GpuDevice<Buffer = B>,
    {
        Self::with_id_source(device, transform_capacity, Arc::new(IdSource::new()))
    }

    /// Create a repository issuing ids from a shared source
    pub fn with_id_source<D>(
        device: &D,
        transform_capacity: u32,
        ids: Arc<IdSource>,
    ) -> InstancingResult<Self>
    where
        D: GpuDevice<Buffer = B>,
    {
        Ok(Self::from_pool(TransformSlotPool::new(device, transform_capacity)?, ids))
    }

    /// Create a repository around an existing pool
    pub fn from_pool(pool: TransformSlotPool<B>, ids: Arc<IdSource>) -> Self {
        Self {
            ids,
            pool,
            resources: BTreeMap::new(),
            instances: HashMap::new(),
        }
    }

    /// Upload a mesh and register it as a resource
    pub fn add_resource<D, V>(
        &mut self,
        device: &D,
        vertices: &[V],
        indices: &[u32],
    ) -> InstancingResult<ResourceId>
    where
        D: GpuDevice<Buffer = B>,
        V: MeshVertex,
    {
        let mesh = MeshResource::new(device, vertices, indices)?;
        let id = self.ids.next_resource()?;

        self.resources.insert(
            id,
            ResourceEntry {
                mesh,
                instances: Vec::new(),
                offsets: BTreeSet::new(),
            },
        );

        log::info!(
            "Registered {} ({} vertices, {} indices)",
            id,
            vertices.len(),
            indices.len()
        );
        Ok(id)
    }

    /// Drop a resource that has no live instances
    pub fn remove_resource(&mut self, id: ResourceId) -> InstancingResult<()> {
        let entry = self.resources.get(&id).ok_or_else(|| InstancingError::invalid_handle(id))?;
        if !entry.instances.is_empty() {
            return Err(InstancingError::ResourceInUse {
                resource: id.to_string(),
                live_instances: entry.instances.len(),
            });
        }

        self.resources.remove(&id);
        log::info!("Removed {}", id);
        Ok(())
    }

    /// Create one instance of `resource` with an identity transform
    pub fn create_instance(&mut self, resource: ResourceId) -> InstancingResult<InstanceId> {
        if !self.resources.contains_key(&resource) {
            return Err(InstancingError::invalid_handle(resource));
        }
        let id = self.ids.next_instance()?;
        self.spawn(resource, id)
    }

    /// Create `count` instances of `resource`
    ///
    /// Either all instances are created or none: the call fails with
    /// `PoolExhausted` up front when fewer than `count` slots are free, and
    /// every id is issued before any slot is taken.
    pub fn create_instances(
        &mut self,
        resource: ResourceId,
        count: u32,
    ) -> InstancingResult<Vec<InstanceId>> {
        if !self.resources.contains_key(&resource) {
            return Err(InstancingError::invalid_handle(resource));
        }
        if count > self.pool.free_count() {
            return Err(InstancingError::PoolExhausted {
                capacity: self.pool.capacity(),
                requested: count,
            });
        }

        let ids = (0..count)
            .map(|_| self.ids.next_instance())
            .collect::<InstancingResult<Vec<_>>>()?;
        for &id in &ids {
            self.spawn(resource, id)?;
        }
        Ok(ids)
    }

    /// Destroy a live instance and free its slot
    pub fn destroy_instance(&mut self, id: InstanceId) -> InstancingResult<()> {
        let record = self
            .instances
            .remove(&id)
            .ok_or_else(|| InstancingError::invalid_handle(id))?;

        if let Some(entry) = self.resources.get_mut(&record.resource) {
            entry.instances.retain(|&instance| instance != id);
            entry.offsets.remove(&record.dynamic_offset);
        }
        self.pool.free_slot(record.slot)?;

        log::debug!("Destroyed {} (slot {})", id, record.slot);
        Ok(())
    }

    /// Destroy several instances
    ///
    /// Every id is validated first, so an unknown or repeated id leaves all
    /// instances alive.
    pub fn destroy_instances(&mut self, ids: &[InstanceId]) -> InstancingResult<()> {
        let mut seen = HashSet::with_capacity(ids.len());
        for &id in ids {
            if !self.instances.contains_key(&id) || !seen.insert(id) {
                return Err(InstancingError::invalid_handle(id));
            }
        }

        ids.iter().try_for_each(|&id| self.destroy_instance(id))
    }

    /// Replace the model matrix of an instance
    pub fn set_model_matrix(&mut self, id: InstanceId, matrix: &Mat4) -> InstancingResult<()> {
        let slot = self.slot_of(id)?;
        self.pool.write(slot, matrix)
    }

    /// Current model matrix of an instance
    pub fn model_matrix(&self, id: InstanceId) -> InstancingResult<Mat4> {
        self.pool.read(self.slot_of(id)?)
    }

    /// Right-multiply an instance's matrix by a translation
    pub fn translate(&mut self, id: InstanceId, offset: &Vec3) -> InstancingResult<()> {
        self.update_matrix(id, |matrix| Ok(compose_translation(matrix, offset)))
    }

    /// Right-multiply an instance's matrix by a non-uniform scale
    pub fn scale(&mut self, id: InstanceId, factors: &Vec3) -> InstancingResult<()> {
        self.update_matrix(id, |matrix| Ok(compose_scale(matrix, factors)))
    }

    /// Right-multiply an instance's matrix by a rotation of `angle` radians
    pub fn rotate(&mut self, id: InstanceId, axis: &Vec3, angle: f32) -> InstancingResult<()> {
        self.update_matrix(id, |matrix| {
            compose_rotation(matrix, axis, angle).ok_or(InstancingError::DegenerateAxis)
        })
    }

    /// Push every transform slot to the device
    pub fn flush_dynamic_buffer<D>(&self, device: &D) -> InstancingResult<()>
    where
        D: GpuDevice<Buffer = B>,
    {
        self.pool.flush(device)
    }

    /// Replay one draw per live instance, resource by resource
    pub fn draw<R>(&self, target: &mut R)
    where
        R: DrawRecorder<B>,
    {
        for entry in self.resources.values() {
            entry.mesh.draw(&entry.offsets, target);
        }
        log::trace!(
            "Recorded {} instance draws across {} resources",
            self.instances.len(),
            self.resources.len()
        );
    }

    /// Resource an instance was created from
    pub fn resource_of(&self, id: InstanceId) -> InstancingResult<ResourceId> {
        self.record(id).map(|record| record.resource)
    }

    /// Dynamic offset of an instance's slot
    pub fn dynamic_offset(&self, id: InstanceId) -> InstancingResult<u32> {
        self.record(id).map(|record| record.dynamic_offset)
    }

    /// Live instances of a resource, in creation order
    pub fn instances_of(&self, resource: ResourceId) -> InstancingResult<&[InstanceId]> {
        self.resources
            .get(&resource)
            .map(|entry| entry.instances.as_slice())
            .ok_or_else(|| InstancingError::invalid_handle(resource))
    }

    /// Mesh behind a resource id
    pub fn mesh(&self, resource: ResourceId) -> InstancingResult<&MeshResource<B>> {
        self.resources
            .get(&resource)
            .map(|entry| &entry.mesh)
            .ok_or_else(|| InstancingError::invalid_handle(resource))
    }

    /// Whether `id` names a live instance
    pub fn contains_instance(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Registered resource ids in ascending order
    pub fn resource_ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources.keys().copied()
    }

    /// Number of registered resources
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Number of live instances
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Transform slots still available
    pub fn free_slot_count(&self) -> u32 {
        self.pool.free_count()
    }

    /// Descriptor range for binding the transform buffer
    pub const fn descriptor_info(&self) -> TransformDescriptorInfo<'_, B> {
        self.pool.descriptor_info()
    }

    /// The transform pool
    pub const fn pool(&self) -> &TransformSlotPool<B> {
        &self.pool
    }

    fn spawn(&mut self, resource: ResourceId, id: InstanceId) -> InstancingResult<InstanceId> {
        let slot = self.pool.allocate_slot()?;
        let dynamic_offset = self.pool.dynamic_offset(slot)?;
        self.pool.write(slot, &Mat4::identity())?;

        self.instances.insert(
            id,
            InstanceRecord {
                resource,
                slot,
                dynamic_offset,
            },
        );
        if let Some(entry) = self.resources.get_mut(&resource) {
            entry.instances.push(id);
            entry.offsets.insert(dynamic_offset);
        }

        log::debug!("Created {} of {} in slot {}", id, resource, slot);
        Ok(id)
    }

    fn record(&self, id: InstanceId) -> InstancingResult<InstanceRecord> {
        self.instances
            .get(&id)
            .copied()
            .ok_or_else(|| InstancingError::invalid_handle(id))
    }

    fn slot_of(&self, id: InstanceId) -> InstancingResult<u32> {
        self.record(id).map(|record| record.slot)
    }

    fn update_matrix<F>(&mut self, id: InstanceId, compose: F) -> InstancingResult<()>
    where
        F: FnOnce(&Mat4) -> InstancingResult<Mat4>,
    {
        let slot = self.slot_of(id)?;
        let updated = compose(&self.pool.read(slot)?)?;
        self.pool.write(slot, &updated)
    }
}
