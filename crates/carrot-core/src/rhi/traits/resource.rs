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

//! The typed resource interfaces handed out by a [`RenderDevice`](super::RenderDevice).
//!
//! Resources are reference-counted (`Rc<dyn …>`) and use interior mutability,
//! so every method takes `&self`. They are tied to the thread that owns the
//! graphics context.

use crate::rhi::api::{BufferType, GraphicsApi, NativeHandle, ShaderStage, TextureFormat, VertexAttribute};
use crate::rhi::error::{ResourceError, ShaderError};
use crate::rhi::reflection::{ProgramReflection, UniformBlockInfo, UniformVariableInfo};
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::rc::Rc;

/// The lifecycle shared by every GPU resource.
pub trait Resource: Debug {
    /// Returns the backend object name. [`NativeHandle::NULL`] once released.
    fn native_handle(&self) -> NativeHandle;

    /// Returns `true` while the resource holds a live backend object.
    fn is_valid(&self) -> bool {
        !self.native_handle().is_null()
    }

    /// Destroys the backend object. Calling it again is a no-op.
    ///
    /// Implementations also call this from `Drop`.
    fn release(&self);

    /// The graphics API that created this resource.
    fn backend(&self) -> GraphicsApi;
}

/// Checks that `resource` was created by `expected`.
///
/// ## Errors
/// * `ResourceError::BackendMismatch` - If the resource belongs to another backend.
pub fn ensure_backend(resource: &dyn Resource, expected: GraphicsApi) -> Result<(), ResourceError> {
    let found = resource.backend();
    if found == expected {
        Ok(())
    } else {
        Err(ResourceError::BackendMismatch { expected, found })
    }
}

/// A linear block of GPU memory.
pub trait Buffer: Resource {
    /// Writes `data` at byte `offset`.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `offset + data.len()` exceeds [`Buffer::size`].
    fn update_data(&self, data: &[u8], offset: usize) -> Result<(), ResourceError>;

    /// Maps the whole buffer for CPU read/write access.
    ///
    /// Returns `None` if the backend refuses the mapping or the buffer is
    /// already mapped. The returned guard unmaps on drop. A `release` issued
    /// while the guard is alive only takes effect once it is dropped.
    fn map(&self) -> Option<BufferMapping<'_>>;

    /// Ends a mapping. A no-op when the buffer is not mapped.
    fn unmap(&self);

    /// The size of the buffer in bytes.
    fn size(&self) -> usize;

    /// The binding target the buffer was created for.
    fn buffer_type(&self) -> BufferType;
}

/// A scoped CPU view of a mapped [`Buffer`]. Unmaps the buffer when dropped.
pub struct BufferMapping<'a> {
    buffer: &'a dyn Buffer,
    ptr: NonNull<u8>,
    len: usize,
}

impl<'a> BufferMapping<'a> {
    /// Wraps a mapped pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes until
    /// `buffer.unmap()` is called, and nothing else may access that memory
    /// while the guard is alive.
    pub unsafe fn new(buffer: &'a dyn Buffer, ptr: NonNull<u8>, len: usize) -> Self {
        Self { buffer, ptr, len }
    }
}

impl Deref for BufferMapping<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: guaranteed by the contract of `BufferMapping::new`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for BufferMapping<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: guaranteed by the contract of `BufferMapping::new`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for BufferMapping<'_> {
    fn drop(&mut self) {
        self.buffer.unmap();
    }
}

impl Debug for BufferMapping<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferMapping")
            .field("buffer", &self.buffer.native_handle())
            .field("len", &self.len)
            .finish()
    }
}

/// A single shader stage.
pub trait Shader: Resource {
    /// Compiles the source given at creation.
    /// ## Errors
    /// * `ShaderError::CompilationError` - The compiler rejected the source; the log
    ///   is also available through [`Shader::compile_errors`].
    /// * `ShaderError::UnsupportedSource` - The backend cannot consume the payload.
    fn compile(&self) -> Result<(), ShaderError>;

    /// The info log of the last failed compile. Empty otherwise.
    fn compile_errors(&self) -> String;

    /// The stage this shader runs in.
    fn stage(&self) -> ShaderStage;

    /// Returns `true` after a successful [`Shader::compile`].
    fn is_compiled(&self) -> bool;
}

/// A linked set of shader stages plus its uniform block reflection.
pub trait ShaderProgram: Resource {
    /// Attaches a compiled shader. Attaching the same shader twice is a no-op.
    /// ## Errors
    /// * `ResourceError::BackendMismatch` - The shader belongs to another backend.
    fn attach_shader(&self, shader: &dyn Shader) -> Result<(), ResourceError>;

    /// Detaches a previously attached shader. Unknown shaders are ignored.
    fn detach_shader(&self, shader: &dyn Shader);

    /// Links the attached shaders and rebuilds the uniform block reflection.
    ///
    /// On success every attached shader is detached and the previous
    /// reflection (with its buffers) is replaced. On failure the previous
    /// reflection stays in place.
    /// ## Errors
    /// * `ShaderError::LinkError` - The linker rejected the program.
    fn link(&self) -> Result<(), ShaderError>;

    /// The info log of the last failed link. Empty otherwise.
    fn link_errors(&self) -> String;

    /// Returns `true` once a link has succeeded. A later failed link keeps it `true`.
    fn is_linked(&self) -> bool;

    /// Makes this the current program.
    fn bind(&self);

    /// Clears the current program.
    fn unbind(&self);

    /// Sets a `float` uniform in the default block.
    fn set_uniform_float(&self, name: &str, value: f32);
    /// Sets a `vec2` uniform in the default block.
    fn set_uniform_vec2(&self, name: &str, x: f32, y: f32);
    /// Sets a `vec3` uniform in the default block.
    fn set_uniform_vec3(&self, name: &str, x: f32, y: f32, z: f32);
    /// Sets a `vec4` uniform in the default block.
    fn set_uniform_vec4(&self, name: &str, x: f32, y: f32, z: f32, w: f32);
    /// Sets an `int` (or sampler) uniform in the default block.
    fn set_uniform_int(&self, name: &str, value: i32);
    /// Sets a `bool` uniform in the default block.
    fn set_uniform_bool(&self, name: &str, value: bool);
    /// Sets a column-major `mat4` uniform in the default block.
    fn set_uniform_matrix4(&self, name: &str, value: &[f32; 16]);

    /// The active uniform blocks with their assigned bindings, as of the last link.
    fn uniform_blocks(&self) -> Vec<UniformBlockInfo>;

    /// The active uniforms, both loose and block members, as of the last link.
    fn uniform_variables(&self) -> Vec<UniformVariableInfo>;

    /// The reflection cache built by the last successful link.
    fn reflection(&self) -> Option<Rc<ProgramReflection>>;
}

/// A two-dimensional image.
pub trait Texture: Resource {
    /// Re-specifies the image. `None` allocates storage without uploading.
    /// ## Errors
    /// * `ResourceError::InvalidDescriptor` - If `pixels` is shorter than the image.
    fn update_data(&self, pixels: Option<&[u8]>, width: u32, height: u32) -> Result<(), ResourceError>;

    /// Binds the texture to texture unit `slot`.
    fn bind(&self, slot: u32);

    /// Unbinds the texture from the unit it was last bound to.
    fn unbind(&self);

    /// Width in texels.
    fn width(&self) -> u32;

    /// Height in texels.
    fn height(&self) -> u32;

    /// The texel format.
    fn format(&self) -> TextureFormat;
}

/// An off-screen render target.
///
/// Attachments created by the framebuffer itself are owned by it. Textures
/// attached later are only referenced and must be kept alive by the caller.
pub trait Framebuffer: Resource {
    /// Makes this the current draw target.
    fn bind(&self);

    /// Restores the default framebuffer.
    fn unbind(&self);

    /// Attaches `texture` at color attachment `attachment`.
    /// ## Errors
    /// * `ResourceError::BackendMismatch` - The texture belongs to another backend.
    fn attach_color_texture(&self, texture: &dyn Texture, attachment: u32) -> Result<(), ResourceError>;

    /// Attaches `texture` as the depth attachment.
    /// ## Errors
    /// * `ResourceError::BackendMismatch` - The texture belongs to another backend.
    fn attach_depth_texture(&self, texture: &dyn Texture) -> Result<(), ResourceError>;

    /// Returns `true` if the backend reports the attachment set as complete.
    fn is_complete(&self) -> bool;

    /// The color texture owned at `attachment`, if any.
    fn color_texture(&self, attachment: u32) -> Option<Rc<dyn Texture>>;

    /// The owned depth texture, if any.
    fn depth_texture(&self) -> Option<Rc<dyn Texture>>;
}

/// Vertex input state: vertex buffers, an index buffer and attribute layout.
pub trait VertexArray: Resource {
    /// Makes this the current vertex array.
    fn bind(&self);

    /// Clears the current vertex array.
    fn unbind(&self);

    /// Registers `buffer` as the source for attributes using `binding`.
    /// ## Errors
    /// * `ResourceError::BackendMismatch` - The buffer belongs to another backend.
    fn set_vertex_buffer(&self, buffer: &dyn Buffer, binding: u32) -> Result<(), ResourceError>;

    /// Sets the element buffer used by indexed draws.
    /// ## Errors
    /// * `ResourceError::BackendMismatch` - The buffer belongs to another backend.
    fn set_index_buffer(&self, buffer: &dyn Buffer) -> Result<(), ResourceError>;

    /// Enables and describes one attribute. The buffer registered for
    /// `attribute.binding` is the attribute source.
    /// ## Errors
    /// * `ResourceError::InvalidDescriptor` - If the component count is not 1 to 4.
    fn set_vertex_attribute(&self, attribute: &VertexAttribute) -> Result<(), ResourceError>;
}

/// A buffer bound to an indexed uniform binding point.
pub trait UniformBuffer: Resource {
    /// Writes `data` at byte `offset`.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `offset + data.len()` exceeds [`UniformBuffer::size`].
    fn update(&self, data: &[u8], offset: usize) -> Result<(), ResourceError>;

    /// Binds the whole buffer to `binding` and remembers it.
    fn bind(&self, binding: u32);

    /// The binding point the buffer was last bound to.
    fn binding(&self) -> u32;

    /// The size of the buffer in bytes.
    fn size(&self) -> usize;
}
