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

use super::resource::{Buffer, Framebuffer, Shader, ShaderProgram, Texture, UniformBuffer, VertexArray};
use crate::rhi::api::*;
use crate::rhi::error::{RenderError, ResourceError};
use std::ffi::c_void;
use std::fmt::Debug;
use std::rc::Rc;

/// Resolves a native API function name to its address, as supplied by the
/// windowing layer (e.g. `glfwGetProcAddress`).
pub type ProcAddressLoader<'a> = &'a mut dyn FnMut(&str) -> *const c_void;

/// The backend device: sole creator of resources and owner of pipeline state.
///
/// Every call runs immediately on the thread that owns the graphics context.
pub trait RenderDevice: Debug {
    /// Loads the backend entry points and prepares the device.
    /// ## Arguments
    /// * `loader` - Resolves native function names to addresses.
    /// ## Errors
    /// * `RenderError::InitializationFailed` - If the entry points cannot be loaded.
    /// * `RenderError::UnsupportedBackend` - If the backend has no implementation.
    fn initialize(&self, loader: ProcAddressLoader<'_>) -> Result<(), RenderError>;

    /// Marks the device as uninitialized. Live resources keep their handles.
    fn shutdown(&self);

    /// Returns `true` between a successful `initialize` and `shutdown`.
    fn is_initialized(&self) -> bool;

    /// The graphics API this device drives.
    fn graphics_api(&self) -> GraphicsApi;

    /// Creates a buffer.
    /// ## Arguments
    /// * `descriptor` - Type, usage, size and optional initial contents.
    /// ## Returns
    /// A shared handle to the new buffer.
    /// ## Errors
    /// * `ResourceError::NotInitialized` - Before `initialize`.
    /// * `ResourceError::InvalidDescriptor` - If the initial data does not match `size`.
    fn create_buffer(&self, descriptor: &BufferDescriptor<'_>) -> Result<Rc<dyn Buffer>, ResourceError>;

    /// Creates an uncompiled shader from its source payload.
    /// ## Errors
    /// * `ResourceError::NotInitialized` - Before `initialize`.
    fn create_shader(&self, descriptor: &ShaderDescriptor<'_>) -> Result<Rc<dyn Shader>, ResourceError>;

    /// Creates an empty shader program.
    /// ## Errors
    /// * `ResourceError::NotInitialized` - Before `initialize`.
    fn create_shader_program(&self) -> Result<Rc<dyn ShaderProgram>, ResourceError>;

    /// Creates a 2D texture.
    /// ## Errors
    /// * `ResourceError::NotInitialized` - Before `initialize`.
    /// * `ResourceError::InvalidDescriptor` - If the initial data is shorter than the image.
    fn create_texture(&self, descriptor: &TextureDescriptor<'_>) -> Result<Rc<dyn Texture>, ResourceError>;

    /// Creates a framebuffer with its default attachments.
    /// ## Errors
    /// * `ResourceError::NotInitialized` - Before `initialize`.
    fn create_framebuffer(&self, descriptor: &FramebufferDescriptor) -> Result<Rc<dyn Framebuffer>, ResourceError>;

    /// Creates an empty vertex array.
    /// ## Errors
    /// * `ResourceError::NotInitialized` - Before `initialize`.
    fn create_vertex_array(&self) -> Result<Rc<dyn VertexArray>, ResourceError>;

    /// Creates a uniform buffer of `size` bytes already bound to `binding`.
    /// ## Errors
    /// * `ResourceError::NotInitialized` - Before `initialize`.
    /// * `ResourceError::InvalidDescriptor` - If `size` is zero.
    fn create_uniform_buffer(&self, size: usize, binding: u32) -> Result<Rc<dyn UniformBuffer>, ResourceError>;

    /// Sets the viewport rectangle.
    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32);
    /// Sets the scissor rectangle.
    fn set_scissor(&self, x: i32, y: i32, width: u32, height: u32);
    /// Enables or disables the depth test.
    fn set_depth_test(&self, enabled: bool);
    /// Enables or disables depth writes.
    fn set_depth_write(&self, enabled: bool);
    /// Sets the depth comparison function.
    fn set_depth_func(&self, func: CompareFunction);
    /// Enables or disables blending.
    fn set_blend(&self, enabled: bool);
    /// Sets the source and destination blend factors.
    fn set_blend_func(&self, src: BlendFactor, dst: BlendFactor);
    /// Sets the blend equation.
    fn set_blend_op(&self, op: BlendOperation);
    /// Sets the face culling mode.
    fn set_cull_mode(&self, mode: CullMode);

    /// Sets the color used by subsequent color clears.
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    /// Sets the depth used by subsequent depth clears.
    fn clear_depth(&self, depth: f32);
    /// Clears the selected attachments of the bound framebuffer.
    fn clear(&self, flags: ClearFlags);

    /// Draws `vertex_count` vertices starting at `start_vertex` with whatever is bound.
    fn draw(&self, topology: PrimitiveTopology, vertex_count: u32, start_vertex: u32);

    /// Draws `index_count` 32-bit indices starting at index `start_index`.
    fn draw_indexed(&self, topology: PrimitiveTopology, index_count: u32, start_index: u32);

    /// A snapshot of the fixed-function state last applied through this device.
    fn pipeline_state(&self) -> PipelineState;
}
