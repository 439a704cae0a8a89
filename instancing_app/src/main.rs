//! Instancing demo application
//!
//! Uploads one mesh, spawns a row of instances and spins them every frame.
//! Each frame runs the repository's mutate, flush, draw cycle; draws go to a
//! counting recorder and the totals are logged once per second.
//!
//! Usage: `instancing_demo [config.toml|config.ron]`

use instanced_engine::assets::import_obj;
use instanced_engine::config::{Config, EngineConfig};
use instanced_engine::foundation::logging;
use instanced_engine::foundation::math::{translation_of, Vec3};
use instanced_engine::render::instancing::{InstanceId, ModelRepository, ResourceId};
use instanced_engine::render::vulkan::{Buffer, VulkanContext};
use instanced_engine::render::{ColoredVertex, DrawStats, Window};
use std::error::Error;

/// Radians per second each instance spins about the y axis
const SPIN_RATE: f32 = 0.8;
/// Seconds between replacing the oldest instance with a new one
const RECYCLE_INTERVAL: f64 = 2.0;

fn builtin_triangle() -> (Vec<ColoredVertex>, Vec<u32>) {
    let normal = [0.0, 0.0, 1.0];
    let vertices = vec![
        ColoredVertex::new([-0.5, -0.5, 0.0], normal, [1.0, 0.2, 0.2, 1.0]),
        ColoredVertex::new([0.5, -0.5, 0.0], normal, [0.2, 1.0, 0.2, 1.0]),
        ColoredVertex::new([0.0, 0.5, 0.0], normal, [0.2, 0.2, 1.0, 1.0]),
    ];
    (vertices, vec![0, 1, 2])
}

struct InstancingApp {
    // Declared before the context so device buffers are released first
    repository: ModelRepository<Buffer>,
    context: VulkanContext,
    window: Window,
    resource: ResourceId,
    instances: Vec<InstanceId>,
    stats: DrawStats,
}

impl InstancingApp {
    fn new(config: &EngineConfig) -> Result<Self, Box<dyn Error>> {
        let window = Window::from_config(&config.window)?;
        let context = VulkanContext::new(&config.app_name, config.enable_validation)?;
        let mut repository = ModelRepository::new(&context, config.repository.transform_capacity)?;

        let resource = match &config.repository.model_path {
            Some(path) => {
                log::info!("Loading model from {}", path);
                let mesh = import_obj(path)?;
                let vertices = mesh.to_vertices::<ColoredVertex>();
                repository.add_resource(&context, &vertices, &mesh.indices)?
            }
            None => {
                let (vertices, indices) = builtin_triangle();
                repository.add_resource(&context, &vertices, &indices)?
            }
        };

        let instances =
            repository.create_instances(resource, config.repository.instances_per_resource)?;
        let spacing = config.repository.instance_spacing;
        for (index, &instance) in instances.iter().enumerate() {
            repository.translate(instance, &Vec3::new(index as f32 * spacing, 0.0, 0.0))?;
        }

        Ok(Self {
            repository,
            context,
            window,
            resource,
            instances,
            stats: DrawStats::default(),
        })
    }

    /// Replace the oldest instance; the new one reuses its slot and position
    fn recycle_oldest(&mut self) -> Result<(), Box<dyn Error>> {
        if self.instances.is_empty() {
            return Ok(());
        }
        let oldest = self.instances.remove(0);
        let offset = self.repository.dynamic_offset(oldest)?;
        let position = translation_of(&self.repository.model_matrix(oldest)?);
        self.repository.destroy_instance(oldest)?;

        let replacement = self.repository.create_instance(self.resource)?;
        self.repository.translate(replacement, &position)?;
        log::debug!(
            "Recycled {} (offset {}) as {} (offset {})",
            oldest,
            offset,
            replacement,
            self.repository.dynamic_offset(replacement)?
        );
        self.instances.push(replacement);
        Ok(())
    }

    fn run(&mut self) -> Result<(), Box<dyn Error>> {
        let axis = Vec3::y();
        let mut last_frame = self.window.time();
        let mut last_report = last_frame;
        let mut last_recycle = last_frame;
        let mut frames = 0u32;

        while self.window.pump() {
            let now = self.window.time();
            let delta = (now - last_frame) as f32;
            last_frame = now;

            for &instance in &self.instances {
                self.repository.rotate(instance, &axis, delta * SPIN_RATE)?;
            }
            if now - last_recycle >= RECYCLE_INTERVAL {
                self.recycle_oldest()?;
                last_recycle = now;
            }

            self.repository.flush_dynamic_buffer(&self.context)?;
            self.stats.reset();
            self.repository.draw(&mut self.stats);
            frames += 1;

            if now - last_report >= 1.0 {
                log::info!(
                    "{} fps, {} draws/frame, {} indices/frame, {} free slots",
                    frames,
                    self.stats.draw_calls,
                    self.stats.indices,
                    self.repository.free_slot_count()
                );
                frames = 0;
                last_report = now;
            }
        }

        self.context.wait_idle()?;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            EngineConfig::load_from_file(&path)?
        }
        None => EngineConfig::default(),
    };

    let mut app = InstancingApp::new(&config)?;
    app.run()?;

    log::info!("Demo finished with {} live instances", app.repository.instance_count());
    Ok(())
}
