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

use std::fmt::Debug;

/// The subset of OpenGL the backend uses.
///
/// Object names are plain `u32`s where `0` means "none", and enum arguments
/// are the usual GL constants (re-exported by `glow`). Uniform locations are
/// `None` when a name is not an active uniform, matching GL's `-1`.
///
/// Implementations must only be called from the thread owning the context.
pub trait GlApi: Debug {
    // --- Buffers ---

    /// `glGenBuffers`.
    fn create_buffer(&self) -> Result<u32, String>;
    /// `glDeleteBuffers`.
    fn delete_buffer(&self, buffer: u32);
    /// `glBindBuffer`.
    fn bind_buffer(&self, target: u32, buffer: u32);
    /// `glBindBufferBase`.
    fn bind_buffer_base(&self, target: u32, index: u32, buffer: u32);
    /// `glBufferData` with no initial contents.
    fn buffer_data_size(&self, target: u32, size: usize, usage: u32);
    /// `glBufferData` with initial contents.
    fn buffer_data(&self, target: u32, data: &[u8], usage: u32);
    /// `glBufferSubData`.
    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]);
    /// `glMapBufferRange`. Null on failure.
    fn map_buffer_range(&self, target: u32, offset: usize, length: usize, access: u32) -> *mut u8;
    /// `glUnmapBuffer`.
    fn unmap_buffer(&self, target: u32);

    // --- Shaders and programs ---

    /// `glCreateShader`.
    fn create_shader(&self, stage: u32) -> Result<u32, String>;
    /// `glDeleteShader`.
    fn delete_shader(&self, shader: u32);
    /// `glShaderSource` with a single string.
    fn shader_source(&self, shader: u32, source: &str);
    /// `glCompileShader`.
    fn compile_shader(&self, shader: u32);
    /// `GL_COMPILE_STATUS`.
    fn shader_compile_status(&self, shader: u32) -> bool;
    /// `glGetShaderInfoLog`.
    fn shader_info_log(&self, shader: u32) -> String;

    /// `glCreateProgram`.
    fn create_program(&self) -> Result<u32, String>;
    /// `glDeleteProgram`.
    fn delete_program(&self, program: u32);
    /// `glAttachShader`.
    fn attach_shader(&self, program: u32, shader: u32);
    /// `glDetachShader`.
    fn detach_shader(&self, program: u32, shader: u32);
    /// `glLinkProgram`.
    fn link_program(&self, program: u32);
    /// `GL_LINK_STATUS`.
    fn program_link_status(&self, program: u32) -> bool;
    /// `glGetProgramInfoLog`.
    fn program_info_log(&self, program: u32) -> String;
    /// `glUseProgram`.
    fn use_program(&self, program: u32);

    // --- Program introspection ---

    /// `glGetProgramiv`.
    fn program_parameter(&self, program: u32, pname: u32) -> i32;
    /// `glGetActiveUniformBlockName`.
    fn active_uniform_block_name(&self, program: u32, block_index: u32) -> String;
    /// `glGetActiveUniformBlockiv`.
    fn active_uniform_block_parameter(&self, program: u32, block_index: u32, pname: u32) -> i32;
    /// `glUniformBlockBinding`.
    fn uniform_block_binding(&self, program: u32, block_index: u32, binding: u32);
    /// `glGetActiveUniform`: the name and array size of uniform `index`.
    fn active_uniform(&self, program: u32, index: u32) -> Option<(String, i32)>;
    /// `glGetActiveUniformsiv`.
    fn active_uniforms_parameter(&self, program: u32, indices: &[u32], pname: u32) -> Vec<i32>;

    // --- Default-block uniforms ---

    /// `glGetUniformLocation`.
    fn uniform_location(&self, program: u32, name: &str) -> Option<u32>;
    /// `glUniform1f`.
    fn uniform_1_f32(&self, location: u32, x: f32);
    /// `glUniform2f`.
    fn uniform_2_f32(&self, location: u32, x: f32, y: f32);
    /// `glUniform3f`.
    fn uniform_3_f32(&self, location: u32, x: f32, y: f32, z: f32);
    /// `glUniform4f`.
    fn uniform_4_f32(&self, location: u32, x: f32, y: f32, z: f32, w: f32);
    /// `glUniform1i`.
    fn uniform_1_i32(&self, location: u32, x: i32);
    /// `glUniformMatrix4fv`, column-major, one matrix.
    fn uniform_matrix_4_f32(&self, location: u32, value: &[f32; 16]);

    // --- Textures ---

    /// `glGenTextures`.
    fn create_texture(&self) -> Result<u32, String>;
    /// `glDeleteTextures`.
    fn delete_texture(&self, texture: u32);
    /// `glActiveTexture` with `GL_TEXTURE0 + unit`.
    fn active_texture(&self, unit: u32);
    /// `glBindTexture`.
    fn bind_texture(&self, target: u32, texture: u32);
    /// `glTexImage2D` at level 0.
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: u32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    /// `glTexParameteri`.
    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32);
    /// `glGenerateMipmap`.
    fn generate_mipmap(&self, target: u32);

    // --- Framebuffers ---

    /// `glGenFramebuffers`.
    fn create_framebuffer(&self) -> Result<u32, String>;
    /// `glDeleteFramebuffers`.
    fn delete_framebuffer(&self, framebuffer: u32);
    /// `glBindFramebuffer`.
    fn bind_framebuffer(&self, target: u32, framebuffer: u32);
    /// `glFramebufferTexture2D` at level 0.
    fn framebuffer_texture_2d(&self, target: u32, attachment: u32, tex_target: u32, texture: u32);
    /// `glCheckFramebufferStatus`.
    fn check_framebuffer_status(&self, target: u32) -> u32;

    // --- Vertex arrays ---

    /// `glGenVertexArrays`.
    fn create_vertex_array(&self) -> Result<u32, String>;
    /// `glDeleteVertexArrays`.
    fn delete_vertex_array(&self, vertex_array: u32);
    /// `glBindVertexArray`.
    fn bind_vertex_array(&self, vertex_array: u32);
    /// `glEnableVertexAttribArray`.
    fn enable_vertex_attrib_array(&self, index: u32);
    /// `glVertexAttribPointer` sourcing from the bound `GL_ARRAY_BUFFER`.
    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );

    // --- Fixed-function state and draws ---

    /// `glViewport`.
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// `glScissor`.
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    /// `glEnable`.
    fn enable(&self, cap: u32);
    /// `glDisable`.
    fn disable(&self, cap: u32);
    /// `glDepthMask`.
    fn depth_mask(&self, enabled: bool);
    /// `glDepthFunc`.
    fn depth_func(&self, func: u32);
    /// `glBlendFunc`.
    fn blend_func(&self, src: u32, dst: u32);
    /// `glBlendEquation`.
    fn blend_equation(&self, mode: u32);
    /// `glCullFace`.
    fn cull_face(&self, mode: u32);
    /// `glClearColor`.
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    /// `glClearDepth`.
    fn clear_depth(&self, depth: f64);
    /// `glClear`.
    fn clear(&self, mask: u32);
    /// `glDrawArrays`.
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    /// `glDrawElements` with a byte offset into the bound element buffer.
    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32);

    /// `glGetString(GL_VERSION)`, if a context is current.
    fn version(&self) -> Option<String>;
}
