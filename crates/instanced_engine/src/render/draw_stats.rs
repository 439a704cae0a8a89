//! Draw counters
//!
//! A [`DrawRecorder`] that records nothing and only counts, for frame
//! statistics and for loops that have no pipeline to draw with.

use crate::render::device::DrawRecorder;

/// Per-frame draw call counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrawStats {
    /// Indexed draws issued
    pub draw_calls: u32,
    /// Indices submitted across all draws
    pub indices: u64,
    /// Transform binds
    pub transform_binds: u32,
    /// Vertex and index buffer binds
    pub buffer_binds: u32,
}

impl DrawStats {
    /// Zero all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl<B> DrawRecorder<B> for DrawStats {
    fn bind_vertex_buffer(&mut self, _buffer: &B, _offset: u64) {
        self.buffer_binds += 1;
    }

    fn bind_index_buffer(&mut self, _buffer: &B, _offset: u64) {
        self.buffer_binds += 1;
    }

    fn bind_transform(&mut self, _dynamic_offset: u32) {
        self.transform_binds += 1;
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.draw_calls += 1;
        self.indices += u64::from(index_count) * u64::from(instance_count);
    }
}
