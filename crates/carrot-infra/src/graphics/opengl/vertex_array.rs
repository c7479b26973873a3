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

use super::api::GlApi;
use carrot_core::rhi::traits::ensure_backend;
use carrot_core::rhi::{
    Buffer, BufferType, GraphicsApi, NativeHandle, Resource, ResourceError, VertexArray,
    VertexAttribute,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// A vertex array object.
///
/// Vertex buffers are registered per binding slot; an attribute reads from
/// the buffer registered at its `binding`. Buffers are referenced by name
/// and must outlive the vertex array.
#[derive(Debug)]
pub struct GlVertexArray {
    gl: Rc<dyn GlApi>,
    handle: Cell<u32>,
    vertex_buffers: RefCell<BTreeMap<u32, u32>>,
    index_buffer: Cell<u32>,
}

impl GlVertexArray {
    pub(crate) fn new(gl: Rc<dyn GlApi>) -> Result<Self, ResourceError> {
        let handle = gl.create_vertex_array().map_err(ResourceError::BackendError)?;
        log::debug!("GlVertexArray: created #{handle}");
        Ok(Self {
            gl,
            handle: Cell::new(handle),
            vertex_buffers: RefCell::new(BTreeMap::new()),
            index_buffer: Cell::new(0),
        })
    }

    /// The buffer registered at `binding`, 0 if none.
    pub fn vertex_buffer(&self, binding: u32) -> u32 {
        self.vertex_buffers.borrow().get(&binding).copied().unwrap_or(0)
    }

    /// The element buffer, 0 if none.
    pub fn index_buffer(&self) -> u32 {
        self.index_buffer.get()
    }

    fn live_handle(&self) -> Result<u32, ResourceError> {
        match self.handle.get() {
            0 => Err(ResourceError::Released),
            handle => Ok(handle),
        }
    }
}

impl Resource for GlVertexArray {
    fn native_handle(&self) -> NativeHandle {
        NativeHandle::from_u32(self.handle.get())
    }

    fn release(&self) {
        let handle = self.handle.replace(0);
        if handle != 0 {
            self.gl.delete_vertex_array(handle);
            self.vertex_buffers.borrow_mut().clear();
            self.index_buffer.set(0);
            log::debug!("GlVertexArray: released #{handle}");
        }
    }

    fn backend(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }
}

impl VertexArray for GlVertexArray {
    fn bind(&self) {
        let handle = self.handle.get();
        if handle == 0 {
            log::warn!("GlVertexArray: bind after release ignored");
            return;
        }
        self.gl.bind_vertex_array(handle);
    }

    fn unbind(&self) {
        self.gl.bind_vertex_array(0);
    }

    fn set_vertex_buffer(&self, buffer: &dyn Buffer, binding: u32) -> Result<(), ResourceError> {
        ensure_backend(buffer, GraphicsApi::OpenGl)
            .inspect_err(|e| log::error!("GlVertexArray: buffer rejected: {e}"))?;
        self.live_handle()?;
        if buffer.buffer_type() != BufferType::Vertex {
            log::warn!(
                "GlVertexArray: {:?} buffer {} registered as a vertex source",
                buffer.buffer_type(),
                buffer.native_handle()
            );
        }
        self.vertex_buffers
            .borrow_mut()
            .insert(binding, buffer.native_handle().as_u32());
        Ok(())
    }

    fn set_index_buffer(&self, buffer: &dyn Buffer) -> Result<(), ResourceError> {
        ensure_backend(buffer, GraphicsApi::OpenGl)
            .inspect_err(|e| log::error!("GlVertexArray: buffer rejected: {e}"))?;
        let handle = self.live_handle()?;
        let raw = buffer.native_handle().as_u32();
        self.gl.bind_vertex_array(handle);
        self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, raw);
        self.gl.bind_vertex_array(0);
        self.index_buffer.set(raw);
        Ok(())
    }

    fn set_vertex_attribute(&self, attribute: &VertexAttribute) -> Result<(), ResourceError> {
        let handle = self.live_handle()?;
        if !attribute.is_valid() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "vertex attribute {} has {} components, expected 1 to 4",
                attribute.location, attribute.component_count
            )));
        }
        let source = self.vertex_buffer(attribute.binding);
        if source == 0 {
            log::warn!(
                "GlVertexArray: attribute {} reads binding {} with no buffer registered",
                attribute.location,
                attribute.binding
            );
        }

        self.gl.bind_vertex_array(handle);
        self.gl.bind_buffer(glow::ARRAY_BUFFER, source);
        self.gl.enable_vertex_attrib_array(attribute.location);
        self.gl.vertex_attrib_pointer_f32(
            attribute.location,
            attribute.component_count as i32,
            glow::FLOAT,
            attribute.normalized,
            attribute.stride as i32,
            attribute.offset as i32,
        );
        self.gl.bind_vertex_array(0);
        self.gl.bind_buffer(glow::ARRAY_BUFFER, 0);
        Ok(())
    }
}

impl Drop for GlVertexArray {
    fn drop(&mut self) {
        self.release();
    }
}
