// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Buffer objects.
//!
//! Data uploads go through `GL_COPY_WRITE_BUFFER` so that updating an index
//! buffer never rebinds the element buffer of whatever vertex array is bound.

use super::api::GlApi;
use super::conversions::IntoGl;
use carrot_core::rhi::{
    Buffer, BufferDescriptor, BufferMapping, BufferType, BufferUsage, GraphicsApi, NativeHandle,
    Resource, ResourceError, UniformBuffer,
};
use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

const UPLOAD_TARGET: u32 = glow::COPY_WRITE_BUFFER;

fn check_range(offset: usize, len: usize, size: usize) -> Result<(), ResourceError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(ResourceError::OutOfBounds { offset, len, size }),
    }
}

/// A vertex, index or uniform buffer.
#[derive(Debug)]
pub struct GlBuffer {
    gl: Rc<dyn GlApi>,
    handle: Cell<u32>,
    label: Option<String>,
    buffer_type: BufferType,
    usage: BufferUsage,
    size: usize,
    mapped: Cell<bool>,
    release_pending: Cell<bool>,
}

impl GlBuffer {
    pub(crate) fn new(gl: Rc<dyn GlApi>, descriptor: &BufferDescriptor<'_>) -> Result<Self, ResourceError> {
        if let Some(data) = descriptor.initial_data {
            if data.len() != descriptor.size {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "initial data is {} bytes but the buffer size is {}",
                    data.len(),
                    descriptor.size
                )));
            }
        }

        let handle = gl.create_buffer().map_err(ResourceError::BackendError)?;
        let usage = descriptor.usage.into_gl();
        gl.bind_buffer(UPLOAD_TARGET, handle);
        match descriptor.initial_data {
            Some(data) => gl.buffer_data(UPLOAD_TARGET, data, usage),
            None => gl.buffer_data_size(UPLOAD_TARGET, descriptor.size, usage),
        }
        gl.bind_buffer(UPLOAD_TARGET, 0);

        log::debug!(
            "GlBuffer: created {:?} buffer #{} '{}' ({} bytes)",
            descriptor.buffer_type,
            handle,
            descriptor.label.as_deref().unwrap_or("unnamed"),
            descriptor.size
        );

        Ok(Self {
            gl,
            handle: Cell::new(handle),
            label: descriptor.label.as_ref().map(|l| l.to_string()),
            buffer_type: descriptor.buffer_type,
            usage: descriptor.usage,
            size: descriptor.size,
            mapped: Cell::new(false),
            release_pending: Cell::new(false),
        })
    }

    /// The usage hint the buffer was created with.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// The debug label, if one was given.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns `true` while a [`BufferMapping`] is alive.
    pub fn is_mapped(&self) -> bool {
        self.mapped.get()
    }

    pub(crate) fn raw(&self) -> u32 {
        self.handle.get()
    }
}

impl Resource for GlBuffer {
    fn native_handle(&self) -> NativeHandle {
        NativeHandle::from_u32(self.handle.get())
    }

    /// Deletes the buffer. While a [`BufferMapping`] is alive the deletion
    /// is deferred until the mapping ends.
    fn release(&self) {
        let handle = self.handle.get();
        if handle == 0 {
            return;
        }
        if self.mapped.get() {
            log::warn!("GlBuffer: release of #{handle} deferred until it is unmapped");
            self.release_pending.set(true);
            return;
        }
        self.handle.set(0);
        self.gl.delete_buffer(handle);
        log::debug!("GlBuffer: released #{handle}");
    }

    fn backend(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }
}

impl Buffer for GlBuffer {
    fn update_data(&self, data: &[u8], offset: usize) -> Result<(), ResourceError> {
        let handle = self.handle.get();
        if handle == 0 {
            return Err(ResourceError::Released);
        }
        if self.mapped.get() {
            log::warn!("GlBuffer: update of #{handle} rejected while mapped");
            return Err(ResourceError::Mapped(format!("#{handle}")));
        }
        check_range(offset, data.len(), self.size)?;
        if data.is_empty() {
            return Ok(());
        }
        self.gl.bind_buffer(UPLOAD_TARGET, handle);
        self.gl.buffer_sub_data(UPLOAD_TARGET, offset, data);
        self.gl.bind_buffer(UPLOAD_TARGET, 0);
        Ok(())
    }

    fn map(&self) -> Option<BufferMapping<'_>> {
        let handle = self.handle.get();
        if handle == 0 || self.size == 0 || self.mapped.get() {
            return None;
        }
        self.gl.bind_buffer(UPLOAD_TARGET, handle);
        let ptr = self.gl.map_buffer_range(
            UPLOAD_TARGET,
            0,
            self.size,
            glow::MAP_READ_BIT | glow::MAP_WRITE_BIT,
        );
        self.gl.bind_buffer(UPLOAD_TARGET, 0);
        let ptr = NonNull::new(ptr)?;
        self.mapped.set(true);
        // SAFETY: the driver keeps the range valid until `unmap`, which the
        // guard calls on drop; `mapped` blocks any other access meanwhile.
        Some(unsafe { BufferMapping::new(self, ptr, self.size) })
    }

    fn unmap(&self) {
        let handle = self.handle.get();
        if handle == 0 || !self.mapped.replace(false) {
            return;
        }
        self.gl.bind_buffer(UPLOAD_TARGET, handle);
        self.gl.unmap_buffer(UPLOAD_TARGET);
        self.gl.bind_buffer(UPLOAD_TARGET, 0);
        if self.release_pending.replace(false) {
            self.release();
        }
    }

    fn size(&self) -> usize {
        self.size
    }

    fn buffer_type(&self) -> BufferType {
        self.buffer_type
    }
}

impl Drop for GlBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

/// A buffer bound to an indexed `GL_UNIFORM_BUFFER` binding point.
#[derive(Debug)]
pub struct GlUniformBuffer {
    gl: Rc<dyn GlApi>,
    handle: Cell<u32>,
    size: usize,
    binding: Cell<u32>,
}

impl GlUniformBuffer {
    pub(crate) fn new(gl: Rc<dyn GlApi>, size: usize, binding: u32) -> Result<Self, ResourceError> {
        if size == 0 {
            return Err(ResourceError::InvalidDescriptor(
                "uniform buffers cannot be empty".to_string(),
            ));
        }
        let handle = gl.create_buffer().map_err(ResourceError::BackendError)?;
        gl.bind_buffer(glow::UNIFORM_BUFFER, handle);
        gl.buffer_data_size(glow::UNIFORM_BUFFER, size, glow::DYNAMIC_DRAW);
        gl.bind_buffer(glow::UNIFORM_BUFFER, 0);
        gl.bind_buffer_base(glow::UNIFORM_BUFFER, binding, handle);
        log::debug!("GlUniformBuffer: created #{handle} ({size} bytes) at binding {binding}");
        Ok(Self {
            gl,
            handle: Cell::new(handle),
            size,
            binding: Cell::new(binding),
        })
    }
}

impl Resource for GlUniformBuffer {
    fn native_handle(&self) -> NativeHandle {
        NativeHandle::from_u32(self.handle.get())
    }

    fn release(&self) {
        let handle = self.handle.replace(0);
        if handle != 0 {
            self.gl.delete_buffer(handle);
            log::debug!("GlUniformBuffer: released #{handle}");
        }
    }

    fn backend(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }
}

impl UniformBuffer for GlUniformBuffer {
    fn update(&self, data: &[u8], offset: usize) -> Result<(), ResourceError> {
        let handle = self.handle.get();
        if handle == 0 {
            return Err(ResourceError::Released);
        }
        check_range(offset, data.len(), self.size)?;
        if data.is_empty() {
            return Ok(());
        }
        self.gl.bind_buffer(glow::UNIFORM_BUFFER, handle);
        self.gl.buffer_sub_data(glow::UNIFORM_BUFFER, offset, data);
        self.gl.bind_buffer(glow::UNIFORM_BUFFER, 0);
        Ok(())
    }

    fn bind(&self, binding: u32) {
        let handle = self.handle.get();
        if handle == 0 {
            log::warn!("GlUniformBuffer: bind after release ignored");
            return;
        }
        self.gl.bind_buffer_base(glow::UNIFORM_BUFFER, binding, handle);
        self.binding.set(binding);
    }

    fn binding(&self) -> u32 {
        self.binding.get()
    }

    fn size(&self) -> usize {
        self.size
    }
}

impl Drop for GlUniformBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::opengl::HeadlessGl;

    fn headless() -> (Rc<HeadlessGl>, Rc<dyn GlApi>) {
        let gl = Rc::new(HeadlessGl::new());
        let api: Rc<dyn GlApi> = gl.clone();
        (gl, api)
    }

    #[test]
    fn initial_data_must_match_size() {
        let (_, api) = headless();
        let descriptor = BufferDescriptor {
            size: 16,
            initial_data: Some(&[0u8; 8]),
            ..Default::default()
        };
        assert!(matches!(
            GlBuffer::new(api, &descriptor),
            Err(ResourceError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn update_writes_at_offset() {
        let (gl, api) = headless();
        let buffer = GlBuffer::new(
            api,
            &BufferDescriptor::with_data(BufferType::Vertex, BufferUsage::Dynamic, &[0u8; 8]),
        )
        .unwrap();
        buffer.update_data(&[7, 7], 4).unwrap();
        assert_eq!(gl.buffer_contents(buffer.raw()), Some(vec![0, 0, 0, 0, 7, 7, 0, 0]));
        assert_eq!(
            buffer.update_data(&[1, 2, 3], 6),
            Err(ResourceError::OutOfBounds { offset: 6, len: 3, size: 8 })
        );
    }

    #[test]
    fn mapping_guard_unmaps_on_drop() {
        let (gl, api) = headless();
        let buffer = GlBuffer::new(
            api,
            &BufferDescriptor::with_data(BufferType::Vertex, BufferUsage::Dynamic, &[0u8; 4]),
        )
        .unwrap();
        {
            let mut view = buffer.map().expect("mappable");
            view[0] = 42;
            assert!(buffer.map().is_none());
            assert!(matches!(buffer.update_data(&[1], 0), Err(ResourceError::Mapped(_))));
        }
        assert!(!buffer.is_mapped());
        assert!(!gl.is_buffer_mapped(buffer.raw()));
        assert_eq!(gl.buffer_contents(buffer.raw()).unwrap()[0], 42);
    }

    #[test]
    fn release_waits_for_the_mapping_to_end() {
        let (gl, api) = headless();
        let buffer = GlBuffer::new(
            api,
            &BufferDescriptor::with_data(BufferType::Vertex, BufferUsage::Dynamic, &[0u8; 4]),
        )
        .unwrap();
        let handle = buffer.raw();
        {
            let mut view = buffer.map().expect("mappable");
            buffer.release();
            assert!(buffer.is_valid());
            assert!(gl.is_buffer(handle));
            view[0] = 42;
            assert_eq!(view[0], 42);
        }
        assert!(!buffer.is_valid());
        assert!(!gl.is_buffer(handle));
        assert_eq!(gl.live_buffer_count(), 0);
        assert_eq!(buffer.update_data(&[1], 0), Err(ResourceError::Released));
    }

    #[test]
    fn release_is_idempotent() {
        let (gl, api) = headless();
        let buffer = GlBuffer::new(
            api,
            &BufferDescriptor { size: 4, ..Default::default() },
        )
        .unwrap();
        buffer.release();
        buffer.release();
        assert!(!buffer.is_valid());
        assert_eq!(gl.live_buffer_count(), 0);
        assert_eq!(buffer.update_data(&[1], 0), Err(ResourceError::Released));
    }

    #[test]
    fn uniform_buffer_binds_at_creation() {
        let (gl, api) = headless();
        let ubo = GlUniformBuffer::new(api, 64, 3).unwrap();
        assert_eq!(gl.indexed_uniform_buffer(3), ubo.native_handle().as_u32());
        ubo.bind(5);
        assert_eq!(ubo.binding(), 5);
        assert_eq!(gl.indexed_uniform_buffer(5), ubo.native_handle().as_u32());
    }

    #[test]
    fn empty_uniform_buffer_is_rejected() {
        let (_, api) = headless();
        assert!(matches!(
            GlUniformBuffer::new(api, 0, 0),
            Err(ResourceError::InvalidDescriptor(_))
        ));
    }
}
