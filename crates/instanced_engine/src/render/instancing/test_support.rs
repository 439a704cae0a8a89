//! Recording fake device used by the instancing tests

use crate::render::device::{
    expect_single_command_buffer, BufferCopy, BufferUsage, DrawRecorder, GpuDevice, MemoryLocation,
};
use crate::render::instancing::{InstancingError, InstancingResult};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Buffer handed out by [`FakeDevice`]
#[derive(Debug)]
pub struct FakeBuffer {
    pub id: u64,
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
    live: Rc<Cell<usize>>,
}

impl Drop for FakeBuffer {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

/// In-memory device that keeps buffer contents and counts operations
pub struct FakeDevice {
    alignment: u64,
    next_id: Cell<u64>,
    live: Rc<Cell<usize>>,
    contents: RefCell<HashMap<u64, Vec<u8>>>,
    created: RefCell<Vec<(u64, BufferUsage, MemoryLocation)>>,
    writes: Cell<usize>,
    submissions: Cell<usize>,
    command_buffers_per_allocation: Cell<usize>,
}

impl FakeDevice {
    pub fn new(alignment: u64) -> Self {
        Self {
            alignment,
            next_id: Cell::new(1),
            live: Rc::new(Cell::new(0)),
            contents: RefCell::new(HashMap::new()),
            created: RefCell::new(Vec::new()),
            writes: Cell::new(0),
            submissions: Cell::new(0),
            command_buffers_per_allocation: Cell::new(1),
        }
    }

    /// Make one-shot allocations return `count` command buffers
    pub fn set_command_buffers_per_allocation(&self, count: usize) {
        self.command_buffers_per_allocation.set(count);
    }

    pub fn buffer_contents(&self, buffer: &FakeBuffer) -> Vec<u8> {
        self.contents.borrow().get(&buffer.id).cloned().unwrap_or_default()
    }

    pub fn live_buffers(&self) -> usize {
        self.live.get()
    }

    pub fn created(&self) -> Vec<(u64, BufferUsage, MemoryLocation)> {
        self.created.borrow().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn submissions(&self) -> usize {
        self.submissions.get()
    }
}

impl GpuDevice for FakeDevice {
    type Buffer = FakeBuffer;

    fn min_uniform_buffer_offset_alignment(&self) -> u64 {
        self.alignment
    }

    fn create_buffer(
        &self,
        size: u64,
        usage: BufferUsage,
        location: MemoryLocation,
    ) -> InstancingResult<FakeBuffer> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.live.set(self.live.get() + 1);
        self.contents.borrow_mut().insert(id, vec![0; size as usize]);
        self.created.borrow_mut().push((size, usage, location));

        Ok(FakeBuffer {
            id,
            size,
            usage,
            location,
            live: Rc::clone(&self.live),
        })
    }

    fn write_buffer(&self, buffer: &FakeBuffer, offset: u64, data: &[u8]) -> InstancingResult<()> {
        if buffer.location != MemoryLocation::HostVisible {
            return Err(InstancingError::Upload {
                reason: "buffer is not host visible".to_string(),
            });
        }

        let mut contents = self.contents.borrow_mut();
        let bytes = contents.get_mut(&buffer.id).expect("buffer created by this device");
        let start = offset as usize;
        bytes[start..start + data.len()].copy_from_slice(data);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn copy_buffers(&self, copies: &[BufferCopy<'_, FakeBuffer>]) -> InstancingResult<()> {
        let allocated = vec![(); self.command_buffers_per_allocation.get()];
        expect_single_command_buffer(allocated)?;

        let mut contents = self.contents.borrow_mut();
        for copy in copies {
            let src = copy.src_offset as usize;
            let dst = copy.dst_offset as usize;
            let size = copy.size as usize;
            let data = contents[&copy.src.id][src..src + size].to_vec();
            contents
                .get_mut(&copy.dst.id)
                .expect("buffer created by this device")[dst..dst + size]
                .copy_from_slice(&data);
        }
        self.submissions.set(self.submissions.get() + 1);
        Ok(())
    }
}

/// One recorded draw-time command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    BindVertexBuffer { buffer: u64, offset: u64 },
    BindIndexBuffer { buffer: u64, offset: u64 },
    BindTransform { dynamic_offset: u32 },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
}

/// Draw recorder that keeps every command
#[derive(Debug, Default)]
pub struct RecordingTarget {
    pub commands: Vec<DrawCommand>,
}

impl RecordingTarget {
    pub fn draws(&self) -> Vec<&DrawCommand> {
        self.commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::DrawIndexed { .. }))
            .collect()
    }

    /// Dynamic offset bound for each draw, in draw order
    pub fn offsets_per_draw(&self) -> Vec<u32> {
        let mut bound = None;
        let mut offsets = Vec::new();
        for command in &self.commands {
            match command {
                DrawCommand::BindTransform { dynamic_offset } => bound = Some(*dynamic_offset),
                DrawCommand::DrawIndexed { .. } => {
                    offsets.push(bound.expect("transform bound before draw"));
                }
                _ => {}
            }
        }
        offsets
    }
}

impl DrawRecorder<FakeBuffer> for RecordingTarget {
    fn bind_vertex_buffer(&mut self, buffer: &FakeBuffer, offset: u64) {
        self.commands.push(DrawCommand::BindVertexBuffer {
            buffer: buffer.id,
            offset,
        });
    }

    fn bind_index_buffer(&mut self, buffer: &FakeBuffer, offset: u64) {
        self.commands.push(DrawCommand::BindIndexBuffer {
            buffer: buffer.id,
            offset,
        });
    }

    fn bind_transform(&mut self, dynamic_offset: u32) {
        self.commands.push(DrawCommand::BindTransform { dynamic_offset });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.commands.push(DrawCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }
}
