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

//! [`GlApi`] on top of a real OpenGL context loaded through `glow`.

use super::api::GlApi;
use glow::HasContext;
use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroU32;

/// A loaded OpenGL function table.
pub struct GlowContext {
    gl: glow::Context,
}

impl fmt::Debug for GlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlowContext").finish_non_exhaustive()
    }
}

impl GlowContext {
    /// Loads every entry point through `loader`.
    ///
    /// # Safety
    ///
    /// A GL context must be current on this thread, and `loader` must return
    /// valid function pointers for that context (or null for missing ones).
    pub unsafe fn from_loader(loader: &mut dyn FnMut(&str) -> *const c_void) -> Self {
        let gl = glow::Context::from_loader_function(|name| loader(name));
        Self { gl }
    }

    /// Wraps an already loaded `glow` context.
    pub fn from_glow(gl: glow::Context) -> Self {
        Self { gl }
    }
}

fn buffer(name: u32) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(name).map(glow::NativeBuffer)
}

fn shader(name: u32) -> Option<glow::NativeShader> {
    NonZeroU32::new(name).map(glow::NativeShader)
}

fn program(name: u32) -> Option<glow::NativeProgram> {
    NonZeroU32::new(name).map(glow::NativeProgram)
}

fn texture(name: u32) -> Option<glow::NativeTexture> {
    NonZeroU32::new(name).map(glow::NativeTexture)
}

fn framebuffer(name: u32) -> Option<glow::NativeFramebuffer> {
    NonZeroU32::new(name).map(glow::NativeFramebuffer)
}

fn vertex_array(name: u32) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(name).map(glow::NativeVertexArray)
}

fn location(loc: u32) -> glow::NativeUniformLocation {
    glow::NativeUniformLocation(loc)
}

// SAFETY (whole impl): `GlowContext` is only constructed with a current
// context, and every name passed in was produced by that same context.
impl GlApi for GlowContext {
    fn create_buffer(&self) -> Result<u32, String> {
        unsafe { self.gl.create_buffer().map(|b| b.0.get()) }
    }

    fn delete_buffer(&self, name: u32) {
        if let Some(b) = buffer(name) {
            unsafe { self.gl.delete_buffer(b) }
        }
    }

    fn bind_buffer(&self, target: u32, name: u32) {
        unsafe { self.gl.bind_buffer(target, buffer(name)) }
    }

    fn bind_buffer_base(&self, target: u32, index: u32, name: u32) {
        unsafe { self.gl.bind_buffer_base(target, index, buffer(name)) }
    }

    fn buffer_data_size(&self, target: u32, size: usize, usage: u32) {
        unsafe { self.gl.buffer_data_size(target, size as i32, usage) }
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, offset as i32, data) }
    }

    fn map_buffer_range(&self, target: u32, offset: usize, length: usize, access: u32) -> *mut u8 {
        unsafe {
            self.gl
                .map_buffer_range(target, offset as i32, length as i32, access)
        }
    }

    fn unmap_buffer(&self, target: u32) {
        unsafe { self.gl.unmap_buffer(target) }
    }

    fn create_shader(&self, stage: u32) -> Result<u32, String> {
        unsafe { self.gl.create_shader(stage).map(|s| s.0.get()) }
    }

    fn delete_shader(&self, name: u32) {
        if let Some(s) = shader(name) {
            unsafe { self.gl.delete_shader(s) }
        }
    }

    fn shader_source(&self, name: u32, source: &str) {
        if let Some(s) = shader(name) {
            unsafe { self.gl.shader_source(s, source) }
        }
    }

    fn compile_shader(&self, name: u32) {
        if let Some(s) = shader(name) {
            unsafe { self.gl.compile_shader(s) }
        }
    }

    fn shader_compile_status(&self, name: u32) -> bool {
        shader(name).is_some_and(|s| unsafe { self.gl.get_shader_compile_status(s) })
    }

    fn shader_info_log(&self, name: u32) -> String {
        shader(name)
            .map(|s| unsafe { self.gl.get_shader_info_log(s) })
            .unwrap_or_default()
    }

    fn create_program(&self) -> Result<u32, String> {
        unsafe { self.gl.create_program().map(|p| p.0.get()) }
    }

    fn delete_program(&self, name: u32) {
        if let Some(p) = program(name) {
            unsafe { self.gl.delete_program(p) }
        }
    }

    fn attach_shader(&self, prog: u32, shdr: u32) {
        if let (Some(p), Some(s)) = (program(prog), shader(shdr)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }

    fn detach_shader(&self, prog: u32, shdr: u32) {
        if let (Some(p), Some(s)) = (program(prog), shader(shdr)) {
            unsafe { self.gl.detach_shader(p, s) }
        }
    }

    fn link_program(&self, name: u32) {
        if let Some(p) = program(name) {
            unsafe { self.gl.link_program(p) }
        }
    }

    fn program_link_status(&self, name: u32) -> bool {
        program(name).is_some_and(|p| unsafe { self.gl.get_program_link_status(p) })
    }

    fn program_info_log(&self, name: u32) -> String {
        program(name)
            .map(|p| unsafe { self.gl.get_program_info_log(p) })
            .unwrap_or_default()
    }

    fn use_program(&self, name: u32) {
        unsafe { self.gl.use_program(program(name)) }
    }

    fn program_parameter(&self, name: u32, pname: u32) -> i32 {
        program(name)
            .map(|p| unsafe { self.gl.get_program_parameter_i32(p, pname) })
            .unwrap_or(0)
    }

    fn active_uniform_block_name(&self, name: u32, block_index: u32) -> String {
        program(name)
            .map(|p| unsafe { self.gl.get_active_uniform_block_name(p, block_index) })
            .unwrap_or_default()
    }

    fn active_uniform_block_parameter(&self, name: u32, block_index: u32, pname: u32) -> i32 {
        program(name)
            .map(|p| unsafe {
                self.gl
                    .get_active_uniform_block_parameter_i32(p, block_index, pname)
            })
            .unwrap_or(0)
    }

    fn uniform_block_binding(&self, name: u32, block_index: u32, binding: u32) {
        if let Some(p) = program(name) {
            unsafe { self.gl.uniform_block_binding(p, block_index, binding) }
        }
    }

    fn active_uniform(&self, name: u32, index: u32) -> Option<(String, i32)> {
        let p = program(name)?;
        unsafe { self.gl.get_active_uniform(p, index) }.map(|u| (u.name, u.size))
    }

    fn active_uniforms_parameter(&self, name: u32, indices: &[u32], pname: u32) -> Vec<i32> {
        match program(name) {
            Some(p) => unsafe { self.gl.get_active_uniforms_parameter(p, indices, pname) },
            None => vec![-1; indices.len()],
        }
    }

    fn uniform_location(&self, name: u32, uniform: &str) -> Option<u32> {
        let p = program(name)?;
        unsafe { self.gl.get_uniform_location(p, uniform) }.map(|loc| loc.0)
    }

    fn uniform_1_f32(&self, loc: u32, x: f32) {
        unsafe { self.gl.uniform_1_f32(Some(&location(loc)), x) }
    }

    fn uniform_2_f32(&self, loc: u32, x: f32, y: f32) {
        unsafe { self.gl.uniform_2_f32(Some(&location(loc)), x, y) }
    }

    fn uniform_3_f32(&self, loc: u32, x: f32, y: f32, z: f32) {
        unsafe { self.gl.uniform_3_f32(Some(&location(loc)), x, y, z) }
    }

    fn uniform_4_f32(&self, loc: u32, x: f32, y: f32, z: f32, w: f32) {
        unsafe { self.gl.uniform_4_f32(Some(&location(loc)), x, y, z, w) }
    }

    fn uniform_1_i32(&self, loc: u32, x: i32) {
        unsafe { self.gl.uniform_1_i32(Some(&location(loc)), x) }
    }

    fn uniform_matrix_4_f32(&self, loc: u32, value: &[f32; 16]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(&location(loc)), false, value)
        }
    }

    fn create_texture(&self) -> Result<u32, String> {
        unsafe { self.gl.create_texture().map(|t| t.0.get()) }
    }

    fn delete_texture(&self, name: u32) {
        if let Some(t) = texture(name) {
            unsafe { self.gl.delete_texture(t) }
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, target: u32, name: u32) {
        unsafe { self.gl.bind_texture(target, texture(name)) }
    }

    fn tex_image_2d(
        &self,
        target: u32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        unsafe {
            self.gl.tex_image_2d(
                target,
                0,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            )
        }
    }

    fn tex_parameter_i32(&self, target: u32, pname: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, pname, value) }
    }

    fn generate_mipmap(&self, target: u32) {
        unsafe { self.gl.generate_mipmap(target) }
    }

    fn create_framebuffer(&self) -> Result<u32, String> {
        unsafe { self.gl.create_framebuffer().map(|f| f.0.get()) }
    }

    fn delete_framebuffer(&self, name: u32) {
        if let Some(f) = framebuffer(name) {
            unsafe { self.gl.delete_framebuffer(f) }
        }
    }

    fn bind_framebuffer(&self, target: u32, name: u32) {
        unsafe { self.gl.bind_framebuffer(target, framebuffer(name)) }
    }

    fn framebuffer_texture_2d(&self, target: u32, attachment: u32, tex_target: u32, name: u32) {
        unsafe {
            self.gl
                .framebuffer_texture_2d(target, attachment, tex_target, texture(name), 0)
        }
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        unsafe { self.gl.check_framebuffer_status(target) }
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        unsafe { self.gl.create_vertex_array().map(|v| v.0.get()) }
    }

    fn delete_vertex_array(&self, name: u32) {
        if let Some(v) = vertex_array(name) {
            unsafe { self.gl.delete_vertex_array(v) }
        }
    }

    fn bind_vertex_array(&self, name: u32) {
        unsafe { self.gl.bind_vertex_array(vertex_array(name)) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset)
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.scissor(x, y, width, height) }
    }

    fn enable(&self, cap: u32) {
        unsafe { self.gl.enable(cap) }
    }

    fn disable(&self, cap: u32) {
        unsafe { self.gl.disable(cap) }
    }

    fn depth_mask(&self, enabled: bool) {
        unsafe { self.gl.depth_mask(enabled) }
    }

    fn depth_func(&self, func: u32) {
        unsafe { self.gl.depth_func(func) }
    }

    fn blend_func(&self, src: u32, dst: u32) {
        unsafe { self.gl.blend_func(src, dst) }
    }

    fn blend_equation(&self, mode: u32) {
        unsafe { self.gl.blend_equation(mode) }
    }

    fn cull_face(&self, mode: u32) {
        unsafe { self.gl.cull_face(mode) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear_depth(&self, depth: f64) {
        unsafe { self.gl.clear_depth_f64(depth) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, element_type, offset) }
    }

    fn version(&self) -> Option<String> {
        let version = unsafe { self.gl.get_parameter_string(glow::VERSION) };
        (!version.is_empty()).then_some(version)
    }
}
