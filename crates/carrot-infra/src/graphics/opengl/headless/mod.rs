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

//! A software implementation of [`GlApi`].
//!
//! `HeadlessGl` keeps every GL object in memory: buffers hold their bytes,
//! shaders are parsed for their uniform declarations, programs are "linked"
//! by merging the stages' declarations and laying blocks out with std140
//! rules. Nothing is rasterized; draws and clears are recorded instead.
//!
//! Besides the [`GlApi`] surface it exposes inspection methods so tests can
//! check what the backend actually sent to "the GPU".

mod glsl;

use self::glsl::{BlockDecl, LooseUniform};
use super::api::GlApi;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// A default-block uniform value as last set through `glUniform*`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `glUniform1f`.
    Float(f32),
    /// `glUniform2f`.
    Vec2([f32; 2]),
    /// `glUniform3f`.
    Vec3([f32; 3]),
    /// `glUniform4f`.
    Vec4([f32; 4]),
    /// `glUniform1i`.
    Int(i32),
    /// `glUniformMatrix4fv`.
    Mat4([f32; 16]),
}

/// A recorded `glDrawArrays` / `glDrawElements` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// The primitive mode.
    pub mode: u32,
    /// First vertex, or byte offset into the element buffer for indexed draws.
    pub first: i32,
    /// Vertex or index count.
    pub count: i32,
    /// `true` for `glDrawElements`.
    pub indexed: bool,
    /// The program in use.
    pub program: u32,
    /// The vertex array bound.
    pub vertex_array: u32,
    /// The draw framebuffer bound.
    pub framebuffer: u32,
}

/// One vertex attribute slot of a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttribPointer {
    /// The `GL_ARRAY_BUFFER` bound when the pointer was specified.
    pub buffer: u32,
    /// Component count.
    pub size: i32,
    /// Component type.
    pub data_type: u32,
    /// Fixed-point normalization.
    pub normalized: bool,
    /// Byte stride.
    pub stride: i32,
    /// Byte offset.
    pub offset: i32,
    /// Whether the array is enabled.
    pub enabled: bool,
}

/// The fixed-function state last set through the API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFunctionState {
    /// `glViewport`.
    pub viewport: [i32; 4],
    /// `glScissor`.
    pub scissor: [i32; 4],
    /// `glDepthMask`.
    pub depth_mask: bool,
    /// `glDepthFunc`.
    pub depth_func: u32,
    /// `glBlendFunc` source and destination.
    pub blend_func: (u32, u32),
    /// `glBlendEquation`.
    pub blend_equation: u32,
    /// `glCullFace`.
    pub cull_face: u32,
    /// `glClearColor`.
    pub clear_color: [f32; 4],
    /// `glClearDepth`.
    pub clear_depth: f64,
}

impl Default for FixedFunctionState {
    fn default() -> Self {
        Self {
            viewport: [0; 4],
            scissor: [0; 4],
            depth_mask: true,
            depth_func: glow::LESS,
            blend_func: (glow::ONE, glow::ZERO),
            blend_equation: glow::FUNC_ADD,
            cull_face: glow::BACK,
            clear_color: [0.0; 4],
            clear_depth: 1.0,
        }
    }
}

#[derive(Debug, Default)]
struct BufferObject {
    data: Vec<u8>,
    mapped: bool,
    uploads: usize,
}

#[derive(Debug)]
struct ShaderObject {
    source: String,
    compiled: bool,
    info_log: String,
    layout: glsl::ShaderLayout,
    delete_pending: bool,
}

#[derive(Debug, Clone)]
struct ActiveUniform {
    name: String,
    size: i32,
    block_index: i32,
    offset: i32,
}

impl ActiveUniform {
    fn is_loose(&self) -> bool {
        self.block_index < 0
    }

    /// GL accepts both `arr` and `arr[0]` for the first element.
    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.name.strip_suffix("[0]") == Some(name)
    }
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<u32>,
    linked: bool,
    // Set by the first successful link; a failed relink keeps the previous executable.
    executable: bool,
    info_log: String,
    blocks: Vec<BlockDecl>,
    block_bindings: Vec<u32>,
    uniforms: Vec<ActiveUniform>,
    values: BTreeMap<String, UniformValue>,
    writes: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
struct TextureObject {
    width: i32,
    height: i32,
    internal_format: i32,
    data: Option<Vec<u8>>,
    params: BTreeMap<u32, i32>,
    mipmapped: bool,
}

#[derive(Debug, Default)]
struct VertexArrayObject {
    element_buffer: u32,
    attributes: BTreeMap<u32, AttribPointer>,
}

#[derive(Debug, Default)]
struct State {
    next_name: u32,
    fail_allocations: bool,

    buffers: BTreeMap<u32, BufferObject>,
    buffer_bindings: BTreeMap<u32, u32>,
    indexed_uniform_buffers: BTreeMap<u32, u32>,

    shaders: BTreeMap<u32, ShaderObject>,
    programs: BTreeMap<u32, ProgramObject>,
    current_program: u32,

    textures: BTreeMap<u32, TextureObject>,
    active_unit: u32,
    texture_units: BTreeMap<u32, u32>,

    framebuffers: BTreeMap<u32, BTreeMap<u32, u32>>,
    bound_framebuffer: u32,

    vertex_arrays: BTreeMap<u32, VertexArrayObject>,
    bound_vertex_array: u32,

    capabilities: BTreeSet<u32>,
    fixed: FixedFunctionState,
    clears: Vec<u32>,
    draws: Vec<DrawCall>,
}

impl State {
    fn allocate(&mut self) -> Result<u32, String> {
        if self.fail_allocations {
            return Err("GL_OUT_OF_MEMORY".to_string());
        }
        self.next_name += 1;
        Ok(self.next_name)
    }

    fn bound_buffer(&self, target: u32) -> u32 {
        if target == glow::ELEMENT_ARRAY_BUFFER && self.bound_vertex_array != 0 {
            return self
                .vertex_arrays
                .get(&self.bound_vertex_array)
                .map_or(0, |vao| vao.element_buffer);
        }
        self.buffer_bindings.get(&target).copied().unwrap_or(0)
    }

    fn bound_buffer_mut(&mut self, target: u32) -> Option<&mut BufferObject> {
        let name = self.bound_buffer(target);
        self.buffers.get_mut(&name)
    }

    fn bound_texture_mut(&mut self) -> Option<&mut TextureObject> {
        let name = self.texture_units.get(&self.active_unit).copied()?;
        self.textures.get_mut(&name)
    }

    fn current_program_mut(&mut self) -> Option<&mut ProgramObject> {
        let current = self.current_program;
        self.programs.get_mut(&current)
    }

    fn set_uniform(&mut self, location: u32, value: UniformValue) {
        let Some(program) = self.current_program_mut() else {
            log::warn!("HeadlessGl: glUniform* with no program in use");
            return;
        };
        let Some(uniform) = program
            .uniforms
            .get(location as usize)
            .filter(|u| u.is_loose())
        else {
            log::warn!("HeadlessGl: glUniform* on invalid location {location}");
            return;
        };
        let name = uniform.name.clone();
        *program.writes.entry(name.clone()).or_default() += 1;
        program.values.insert(name, value);
    }

    fn link(&mut self, name: u32) {
        let Some(attached) = self.programs.get(&name).map(|p| p.attached.clone()) else {
            return;
        };
        let result = self.merge_stages(&attached);
        let Some(program) = self.programs.get_mut(&name) else {
            return;
        };
        match result {
            Ok((blocks, loose)) => {
                program.values.clear();
                program.writes.clear();
                let mut uniforms = Vec::new();
                for (index, block) in blocks.iter().enumerate() {
                    for (member, reported) in block.reported_names() {
                        uniforms.push(ActiveUniform {
                            name: reported,
                            size: member.array_len.unwrap_or(1) as i32,
                            block_index: index as i32,
                            offset: member.offset as i32,
                        });
                    }
                }
                for uniform in loose {
                    let reported = match uniform.array_len {
                        Some(_) => format!("{}[0]", uniform.name),
                        None => uniform.name,
                    };
                    uniforms.push(ActiveUniform {
                        name: reported,
                        size: uniform.array_len.unwrap_or(1) as i32,
                        block_index: -1,
                        offset: -1,
                    });
                }
                program.block_bindings = blocks.iter().map(|b| b.binding.unwrap_or(0)).collect();
                program.blocks = blocks;
                program.uniforms = uniforms;
                program.linked = true;
                program.executable = true;
                program.info_log.clear();
            }
            Err(message) => {
                program.linked = false;
                program.info_log = format!("error: {message}");
            }
        }
    }

    fn merge_stages(&self, attached: &[u32]) -> Result<(Vec<BlockDecl>, Vec<LooseUniform>), String> {
        if attached.is_empty() {
            return Err("no shaders attached to the program".to_string());
        }
        let mut blocks: Vec<BlockDecl> = Vec::new();
        let mut loose: Vec<LooseUniform> = Vec::new();
        for shader_name in attached {
            let shader = self
                .shaders
                .get(shader_name)
                .filter(|s| s.compiled)
                .ok_or_else(|| format!("shader {shader_name} is not compiled"))?;
            for block in &shader.layout.blocks {
                match blocks.iter().find(|b| b.name == block.name) {
                    Some(existing) if !existing.same_layout(block) => {
                        return Err(format!(
                            "uniform block '{}' is declared differently between stages",
                            block.name
                        ));
                    }
                    Some(_) => {}
                    None => blocks.push(block.clone()),
                }
            }
            for uniform in &shader.layout.uniforms {
                match loose.iter().find(|u| u.name == uniform.name) {
                    Some(existing) if existing != uniform => {
                        return Err(format!(
                            "uniform '{}' is declared with different types",
                            uniform.name
                        ));
                    }
                    Some(_) => {}
                    None => loose.push(uniform.clone()),
                }
            }
        }
        Ok((blocks, loose))
    }
}

/// A software OpenGL 3.3 core "context".
#[derive(Debug, Default)]
pub struct HeadlessGl {
    state: RefCell<State>,
}

impl HeadlessGl {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every `glGen*` / `glCreate*` fails with `GL_OUT_OF_MEMORY`.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.state.borrow_mut().fail_allocations = fail;
    }

    /// The number of buffer objects alive.
    pub fn live_buffer_count(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// The number of program objects alive.
    pub fn live_program_count(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// The number of shader objects alive (deletion of attached shaders is deferred).
    pub fn live_shader_count(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    /// The number of texture objects alive.
    pub fn live_texture_count(&self) -> usize {
        self.state.borrow().textures.len()
    }

    /// Returns `true` if `name` is a live buffer.
    pub fn is_buffer(&self, name: u32) -> bool {
        self.state.borrow().buffers.contains_key(&name)
    }

    /// A copy of a buffer's data store.
    pub fn buffer_contents(&self, name: u32) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&name).map(|b| b.data.clone())
    }

    /// A buffer's data store read as `f32`s.
    pub fn buffer_f32s(&self, name: u32) -> Option<Vec<f32>> {
        self.state
            .borrow()
            .buffers
            .get(&name)
            .map(|b| bytemuck::pod_collect_to_vec(&b.data))
    }

    /// How many `glBufferData` / `glBufferSubData` calls hit a buffer.
    pub fn buffer_upload_count(&self, name: u32) -> usize {
        self.state.borrow().buffers.get(&name).map_or(0, |b| b.uploads)
    }

    /// Returns `true` while a buffer is mapped.
    pub fn is_buffer_mapped(&self, name: u32) -> bool {
        self.state.borrow().buffers.get(&name).is_some_and(|b| b.mapped)
    }

    /// The buffer bound to indexed uniform binding `index`, 0 if none.
    pub fn indexed_uniform_buffer(&self, index: u32) -> u32 {
        self.state
            .borrow()
            .indexed_uniform_buffers
            .get(&index)
            .copied()
            .unwrap_or(0)
    }

    /// The binding point of block `block_index` in `program`.
    pub fn program_block_binding(&self, program: u32, block_index: u32) -> Option<u32> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.block_bindings.get(block_index as usize).copied())
    }

    /// The shaders currently attached to `program`.
    pub fn attached_shaders(&self, program: u32) -> Vec<u32> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.attached.clone())
            .unwrap_or_default()
    }

    /// The value last written to default-block uniform `name` of `program`.
    ///
    /// Arrays are reported under their first element, e.g. `weights[0]`.
    pub fn uniform_value(&self, program: u32, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        let program = state.programs.get(&program)?;
        let uniform = program.uniforms.iter().find(|u| u.answers_to(name))?;
        program.values.get(&uniform.name).copied()
    }

    /// How many `glUniform*` calls hit uniform `name` of `program` since its last link.
    pub fn uniform_write_count(&self, program: u32, name: &str) -> usize {
        let state = self.state.borrow();
        let Some(program) = state.programs.get(&program) else {
            return 0;
        };
        program
            .uniforms
            .iter()
            .find(|u| u.answers_to(name))
            .and_then(|u| program.writes.get(&u.name).copied())
            .unwrap_or(0)
    }

    /// Total `glUniform*` calls that hit `program` since its last link.
    pub fn total_uniform_writes(&self, program: u32) -> usize {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map_or(0, |p| p.writes.values().sum())
    }

    /// The program in use.
    pub fn current_program(&self) -> u32 {
        self.state.borrow().current_program
    }

    /// The vertex array bound.
    pub fn bound_vertex_array(&self) -> u32 {
        self.state.borrow().bound_vertex_array
    }

    /// The framebuffer bound.
    pub fn bound_framebuffer(&self) -> u32 {
        self.state.borrow().bound_framebuffer
    }

    /// The texture bound to `unit`, 0 if none.
    pub fn texture_on_unit(&self, unit: u32) -> u32 {
        self.state
            .borrow()
            .texture_units
            .get(&unit)
            .copied()
            .unwrap_or(0)
    }

    /// The size of texture `name`.
    pub fn texture_size(&self, name: u32) -> Option<(i32, i32)> {
        self.state
            .borrow()
            .textures
            .get(&name)
            .map(|t| (t.width, t.height))
    }

    /// The internal format of texture `name`.
    pub fn texture_internal_format(&self, name: u32) -> Option<i32> {
        self.state.borrow().textures.get(&name).map(|t| t.internal_format)
    }

    /// The texels last uploaded to texture `name`.
    pub fn texture_data(&self, name: u32) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .textures
            .get(&name)
            .and_then(|t| t.data.clone())
    }

    /// A `glTexParameteri` value of texture `name`.
    pub fn texture_parameter(&self, name: u32, pname: u32) -> Option<i32> {
        self.state
            .borrow()
            .textures
            .get(&name)
            .and_then(|t| t.params.get(&pname).copied())
    }

    /// Returns `true` once `glGenerateMipmap` ran on texture `name`.
    pub fn texture_has_mipmaps(&self, name: u32) -> bool {
        self.state.borrow().textures.get(&name).is_some_and(|t| t.mipmapped)
    }

    /// The texture attached at `attachment` of framebuffer `name`, 0 if none.
    pub fn framebuffer_attachment(&self, name: u32, attachment: u32) -> u32 {
        self.state
            .borrow()
            .framebuffers
            .get(&name)
            .and_then(|a| a.get(&attachment).copied())
            .unwrap_or(0)
    }

    /// Attribute slot `index` of vertex array `name`.
    pub fn vertex_attribute(&self, name: u32, index: u32) -> Option<AttribPointer> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&name)
            .and_then(|vao| vao.attributes.get(&index).copied())
    }

    /// The element buffer recorded in vertex array `name`.
    pub fn element_buffer(&self, name: u32) -> u32 {
        self.state
            .borrow()
            .vertex_arrays
            .get(&name)
            .map_or(0, |vao| vao.element_buffer)
    }

    /// Returns `true` if capability `cap` is enabled.
    pub fn is_enabled(&self, cap: u32) -> bool {
        self.state.borrow().capabilities.contains(&cap)
    }

    /// The fixed-function state.
    pub fn fixed_function(&self) -> FixedFunctionState {
        self.state.borrow().fixed
    }

    /// Every `glClear` mask, in call order.
    pub fn clears(&self) -> Vec<u32> {
        self.state.borrow().clears.clone()
    }

    /// Every draw, in call order.
    pub fn draws(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }
}

impl GlApi for HeadlessGl {
    fn create_buffer(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.buffers.insert(name, BufferObject::default());
        Ok(name)
    }

    fn delete_buffer(&self, name: u32) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(&name).is_none() {
            return;
        }
        state.buffer_bindings.retain(|_, b| *b != name);
        state.indexed_uniform_buffers.retain(|_, b| *b != name);
        for vao in state.vertex_arrays.values_mut() {
            if vao.element_buffer == name {
                vao.element_buffer = 0;
            }
        }
    }

    fn bind_buffer(&self, target: u32, name: u32) {
        let mut state = self.state.borrow_mut();
        if target == glow::ELEMENT_ARRAY_BUFFER && state.bound_vertex_array != 0 {
            let current = state.bound_vertex_array;
            if let Some(vao) = state.vertex_arrays.get_mut(&current) {
                vao.element_buffer = name;
            }
            return;
        }
        state.buffer_bindings.insert(target, name);
    }

    fn bind_buffer_base(&self, target: u32, index: u32, name: u32) {
        let mut state = self.state.borrow_mut();
        if target == glow::UNIFORM_BUFFER {
            state.indexed_uniform_buffers.insert(index, name);
        }
        state.buffer_bindings.insert(target, name);
    }

    fn buffer_data_size(&self, target: u32, size: usize, _usage: u32) {
        if let Some(buffer) = self.state.borrow_mut().bound_buffer_mut(target) {
            buffer.data = vec![0; size];
            buffer.mapped = false;
            buffer.uploads += 1;
        }
    }

    fn buffer_data(&self, target: u32, data: &[u8], _usage: u32) {
        if let Some(buffer) = self.state.borrow_mut().bound_buffer_mut(target) {
            buffer.data = data.to_vec();
            buffer.mapped = false;
            buffer.uploads += 1;
        }
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let Some(buffer) = state.bound_buffer_mut(target) else {
            return;
        };
        match buffer.data.get_mut(offset..offset + data.len()) {
            Some(dst) if !buffer.mapped => {
                dst.copy_from_slice(data);
                buffer.uploads += 1;
            }
            _ => log::warn!("HeadlessGl: glBufferSubData rejected (GL_INVALID_VALUE)"),
        }
    }

    fn map_buffer_range(&self, target: u32, offset: usize, length: usize, _access: u32) -> *mut u8 {
        let mut state = self.state.borrow_mut();
        let Some(buffer) = state.bound_buffer_mut(target) else {
            return std::ptr::null_mut();
        };
        if buffer.mapped || offset + length > buffer.data.len() {
            return std::ptr::null_mut();
        }
        buffer.mapped = true;
        buffer.data[offset..].as_mut_ptr()
    }

    fn unmap_buffer(&self, target: u32) {
        if let Some(buffer) = self.state.borrow_mut().bound_buffer_mut(target) {
            buffer.mapped = false;
        }
    }

    fn create_shader(&self, _stage: u32) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.shaders.insert(
            name,
            ShaderObject {
                source: String::new(),
                compiled: false,
                info_log: String::new(),
                layout: glsl::ShaderLayout::default(),
                delete_pending: false,
            },
        );
        Ok(name)
    }

    fn delete_shader(&self, name: u32) {
        let mut state = self.state.borrow_mut();
        let attached = state.programs.values().any(|p| p.attached.contains(&name));
        if attached {
            if let Some(shader) = state.shaders.get_mut(&name) {
                shader.delete_pending = true;
            }
        } else {
            state.shaders.remove(&name);
        }
    }

    fn shader_source(&self, name: u32, source: &str) {
        if let Some(shader) = self.state.borrow_mut().shaders.get_mut(&name) {
            shader.source = source.to_string();
        }
    }

    fn compile_shader(&self, name: u32) {
        if let Some(shader) = self.state.borrow_mut().shaders.get_mut(&name) {
            match glsl::parse(&shader.source) {
                Ok(layout) => {
                    shader.layout = layout;
                    shader.compiled = true;
                    shader.info_log.clear();
                }
                Err(e) => {
                    shader.layout = glsl::ShaderLayout::default();
                    shader.compiled = false;
                    shader.info_log = format!("{e}\n");
                }
            }
        }
    }

    fn shader_compile_status(&self, name: u32) -> bool {
        self.state.borrow().shaders.get(&name).is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, name: u32) -> String {
        self.state
            .borrow()
            .shaders
            .get(&name)
            .map(|s| s.info_log.clone())
            .unwrap_or_default()
    }

    fn create_program(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.programs.insert(name, ProgramObject::default());
        Ok(name)
    }

    fn delete_program(&self, name: u32) {
        let mut state = self.state.borrow_mut();
        let Some(program) = state.programs.remove(&name) else {
            return;
        };
        if state.current_program == name {
            state.current_program = 0;
        }
        for shader in program.attached {
            if state.shaders.get(&shader).is_some_and(|s| s.delete_pending) {
                state.shaders.remove(&shader);
            }
        }
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        if !state.shaders.contains_key(&shader) {
            return;
        }
        if let Some(p) = state.programs.get_mut(&program) {
            if !p.attached.contains(&shader) {
                p.attached.push(shader);
            }
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(p) = state.programs.get_mut(&program) {
            p.attached.retain(|s| *s != shader);
        }
        let still_attached = state.programs.values().any(|p| p.attached.contains(&shader));
        if !still_attached && state.shaders.get(&shader).is_some_and(|s| s.delete_pending) {
            state.shaders.remove(&shader);
        }
    }

    fn link_program(&self, name: u32) {
        self.state.borrow_mut().link(name);
    }

    fn program_link_status(&self, name: u32) -> bool {
        self.state.borrow().programs.get(&name).is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, name: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&name)
            .map(|p| p.info_log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, name: u32) {
        let mut state = self.state.borrow_mut();
        if name == 0 || state.programs.get(&name).is_some_and(|p| p.executable) {
            state.current_program = name;
        } else {
            log::warn!("HeadlessGl: glUseProgram({name}) on an unlinked program");
        }
    }

    fn program_parameter(&self, name: u32, pname: u32) -> i32 {
        let state = self.state.borrow();
        let Some(program) = state.programs.get(&name) else {
            return 0;
        };
        match pname {
            glow::ACTIVE_UNIFORM_BLOCKS => program.blocks.len() as i32,
            glow::ACTIVE_UNIFORMS => program.uniforms.len() as i32,
            glow::LINK_STATUS => program.linked as i32,
            glow::ATTACHED_SHADERS => program.attached.len() as i32,
            _ => 0,
        }
    }

    fn active_uniform_block_name(&self, name: u32, block_index: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&name)
            .and_then(|p| p.blocks.get(block_index as usize))
            .map(|b| b.name.clone())
            .unwrap_or_default()
    }

    fn active_uniform_block_parameter(&self, name: u32, block_index: u32, pname: u32) -> i32 {
        let state = self.state.borrow();
        let Some(program) = state.programs.get(&name) else {
            return 0;
        };
        let Some(block) = program.blocks.get(block_index as usize) else {
            return 0;
        };
        match pname {
            glow::UNIFORM_BLOCK_DATA_SIZE => block.size as i32,
            glow::UNIFORM_BLOCK_BINDING => program.block_bindings[block_index as usize] as i32,
            glow::UNIFORM_BLOCK_ACTIVE_UNIFORMS => block.members.len() as i32,
            _ => 0,
        }
    }

    fn uniform_block_binding(&self, name: u32, block_index: u32, binding: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(slot) = state
            .programs
            .get_mut(&name)
            .and_then(|p| p.block_bindings.get_mut(block_index as usize))
        {
            *slot = binding;
        }
    }

    fn active_uniform(&self, name: u32, index: u32) -> Option<(String, i32)> {
        self.state
            .borrow()
            .programs
            .get(&name)
            .and_then(|p| p.uniforms.get(index as usize))
            .map(|u| (u.name.clone(), u.size))
    }

    fn active_uniforms_parameter(&self, name: u32, indices: &[u32], pname: u32) -> Vec<i32> {
        let state = self.state.borrow();
        let program = state.programs.get(&name);
        indices
            .iter()
            .map(|index| {
                let Some(uniform) = program.and_then(|p| p.uniforms.get(*index as usize)) else {
                    return -1;
                };
                match pname {
                    glow::UNIFORM_BLOCK_INDEX => uniform.block_index,
                    glow::UNIFORM_OFFSET => uniform.offset,
                    glow::UNIFORM_SIZE => uniform.size,
                    _ => -1,
                }
            })
            .collect()
    }

    fn uniform_location(&self, name: u32, uniform: &str) -> Option<u32> {
        let state = self.state.borrow();
        let program = state.programs.get(&name).filter(|p| p.executable)?;
        program
            .uniforms
            .iter()
            .position(|u| u.is_loose() && u.answers_to(uniform))
            .map(|index| index as u32)
    }

    fn uniform_1_f32(&self, location: u32, x: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Float(x));
    }

    fn uniform_2_f32(&self, location: u32, x: f32, y: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Vec2([x, y]));
    }

    fn uniform_3_f32(&self, location: u32, x: f32, y: f32, z: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Vec3([x, y, z]));
    }

    fn uniform_4_f32(&self, location: u32, x: f32, y: f32, z: f32, w: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Vec4([x, y, z, w]));
    }

    fn uniform_1_i32(&self, location: u32, x: i32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Int(x));
    }

    fn uniform_matrix_4_f32(&self, location: u32, value: &[f32; 16]) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Mat4(*value));
    }

    fn create_texture(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.textures.insert(name, TextureObject::default());
        Ok(name)
    }

    fn delete_texture(&self, name: u32) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(&name).is_none() {
            return;
        }
        state.texture_units.retain(|_, t| *t != name);
        for attachments in state.framebuffers.values_mut() {
            attachments.retain(|_, t| *t != name);
        }
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().active_unit = unit;
    }

    fn bind_texture(&self, _target: u32, name: u32) {
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;
        if name == 0 {
            state.texture_units.remove(&unit);
        } else {
            state.texture_units.insert(unit, name);
        }
    }

    fn tex_image_2d(
        &self,
        _target: u32,
        internal_format: i32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: Option<&[u8]>,
    ) {
        if let Some(texture) = self.state.borrow_mut().bound_texture_mut() {
            texture.width = width;
            texture.height = height;
            texture.internal_format = internal_format;
            texture.data = pixels.map(<[u8]>::to_vec);
            texture.mipmapped = false;
        }
    }

    fn tex_parameter_i32(&self, _target: u32, pname: u32, value: i32) {
        if let Some(texture) = self.state.borrow_mut().bound_texture_mut() {
            texture.params.insert(pname, value);
        }
    }

    fn generate_mipmap(&self, _target: u32) {
        if let Some(texture) = self.state.borrow_mut().bound_texture_mut() {
            texture.mipmapped = true;
        }
    }

    fn create_framebuffer(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.framebuffers.insert(name, BTreeMap::new());
        Ok(name)
    }

    fn delete_framebuffer(&self, name: u32) {
        let mut state = self.state.borrow_mut();
        state.framebuffers.remove(&name);
        if state.bound_framebuffer == name {
            state.bound_framebuffer = 0;
        }
    }

    fn bind_framebuffer(&self, _target: u32, name: u32) {
        self.state.borrow_mut().bound_framebuffer = name;
    }

    fn framebuffer_texture_2d(&self, _target: u32, attachment: u32, _tex_target: u32, texture: u32) {
        let mut state = self.state.borrow_mut();
        let bound = state.bound_framebuffer;
        if let Some(attachments) = state.framebuffers.get_mut(&bound) {
            if texture == 0 {
                attachments.remove(&attachment);
            } else {
                attachments.insert(attachment, texture);
            }
        }
    }

    fn check_framebuffer_status(&self, _target: u32) -> u32 {
        let state = self.state.borrow();
        if state.bound_framebuffer == 0 {
            return glow::FRAMEBUFFER_COMPLETE;
        }
        let Some(attachments) = state.framebuffers.get(&state.bound_framebuffer) else {
            return glow::FRAMEBUFFER_UNDEFINED;
        };
        if attachments.is_empty() {
            return glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }
        let all_sized = attachments.values().all(|t| {
            state
                .textures
                .get(t)
                .is_some_and(|t| t.width > 0 && t.height > 0)
        });
        if all_sized {
            glow::FRAMEBUFFER_COMPLETE
        } else {
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        }
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate()?;
        state.vertex_arrays.insert(name, VertexArrayObject::default());
        Ok(name)
    }

    fn delete_vertex_array(&self, name: u32) {
        let mut state = self.state.borrow_mut();
        state.vertex_arrays.remove(&name);
        if state.bound_vertex_array == name {
            state.bound_vertex_array = 0;
        }
    }

    fn bind_vertex_array(&self, name: u32) {
        self.state.borrow_mut().bound_vertex_array = name;
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        let bound = state.bound_vertex_array;
        if let Some(vao) = state.vertex_arrays.get_mut(&bound) {
            vao.attributes.entry(index).or_default().enabled = true;
        }
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
        let mut state = self.state.borrow_mut();
        let buffer = state.bound_buffer(glow::ARRAY_BUFFER);
        let bound = state.bound_vertex_array;
        if let Some(vao) = state.vertex_arrays.get_mut(&bound) {
            let slot = vao.attributes.entry(index).or_default();
            slot.buffer = buffer;
            slot.size = size;
            slot.data_type = data_type;
            slot.normalized = normalized;
            slot.stride = stride;
            slot.offset = offset;
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state.borrow_mut().fixed.viewport = [x, y, width, height];
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state.borrow_mut().fixed.scissor = [x, y, width, height];
    }

    fn enable(&self, cap: u32) {
        self.state.borrow_mut().capabilities.insert(cap);
    }

    fn disable(&self, cap: u32) {
        self.state.borrow_mut().capabilities.remove(&cap);
    }

    fn depth_mask(&self, enabled: bool) {
        self.state.borrow_mut().fixed.depth_mask = enabled;
    }

    fn depth_func(&self, func: u32) {
        self.state.borrow_mut().fixed.depth_func = func;
    }

    fn blend_func(&self, src: u32, dst: u32) {
        self.state.borrow_mut().fixed.blend_func = (src, dst);
    }

    fn blend_equation(&self, mode: u32) {
        self.state.borrow_mut().fixed.blend_equation = mode;
    }

    fn cull_face(&self, mode: u32) {
        self.state.borrow_mut().fixed.cull_face = mode;
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.state.borrow_mut().fixed.clear_color = [r, g, b, a];
    }

    fn clear_depth(&self, depth: f64) {
        self.state.borrow_mut().fixed.clear_depth = depth;
    }

    fn clear(&self, mask: u32) {
        self.state.borrow_mut().clears.push(mask);
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        let mut state = self.state.borrow_mut();
        let draw = DrawCall {
            mode,
            first,
            count,
            indexed: false,
            program: state.current_program,
            vertex_array: state.bound_vertex_array,
            framebuffer: state.bound_framebuffer,
        };
        state.draws.push(draw);
    }

    fn draw_elements(&self, mode: u32, count: i32, _element_type: u32, offset: i32) {
        let mut state = self.state.borrow_mut();
        let draw = DrawCall {
            mode,
            first: offset,
            count,
            indexed: true,
            program: state.current_program,
            vertex_array: state.bound_vertex_array,
            framebuffer: state.bound_framebuffer,
        };
        state.draws.push(draw);
    }

    fn version(&self) -> Option<String> {
        Some("3.3.0 Headless".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "layout(binding = 1) uniform Light { vec3 lightPos; } light;\n\
                      uniform float scale;\n\
                      void main() {}";
    const FS: &str = "uniform Light { vec3 lightPos; } light;\n\
                      uniform sampler2D albedoMap;\n\
                      void main() {}";

    fn compiled(gl: &HeadlessGl, source: &str) -> u32 {
        let shader = gl.create_shader(glow::VERTEX_SHADER).unwrap();
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        assert!(gl.shader_compile_status(shader), "{}", gl.shader_info_log(shader));
        shader
    }

    #[test]
    fn link_merges_stage_declarations() {
        let gl = HeadlessGl::new();
        let program = gl.create_program().unwrap();
        gl.attach_shader(program, compiled(&gl, VS));
        gl.attach_shader(program, compiled(&gl, FS));
        gl.link_program(program);

        assert!(gl.program_link_status(program));
        assert_eq!(gl.program_parameter(program, glow::ACTIVE_UNIFORM_BLOCKS), 1);
        assert_eq!(gl.active_uniform_block_name(program, 0), "Light");
        assert_eq!(
            gl.active_uniform_block_parameter(program, 0, glow::UNIFORM_BLOCK_BINDING),
            1
        );
        assert_eq!(
            gl.active_uniform_block_parameter(program, 0, glow::UNIFORM_BLOCK_DATA_SIZE),
            16
        );
        // One block member plus two loose uniforms.
        assert_eq!(gl.program_parameter(program, glow::ACTIVE_UNIFORMS), 3);
        assert_eq!(gl.active_uniform(program, 0), Some(("Light.lightPos".to_string(), 1)));
        assert_eq!(
            gl.active_uniforms_parameter(program, &[0, 1], glow::UNIFORM_BLOCK_INDEX),
            vec![0, -1]
        );
    }

    #[test]
    fn link_fails_on_mismatched_blocks() {
        let gl = HeadlessGl::new();
        let program = gl.create_program().unwrap();
        gl.attach_shader(program, compiled(&gl, VS));
        gl.attach_shader(
            program,
            compiled(&gl, "uniform Light { vec4 lightPos; }; void main() {}"),
        );
        gl.link_program(program);
        assert!(!gl.program_link_status(program));
        assert!(gl.program_info_log(program).contains("Light"));
    }

    #[test]
    fn link_fails_without_shaders() {
        let gl = HeadlessGl::new();
        let program = gl.create_program().unwrap();
        gl.link_program(program);
        assert!(!gl.program_link_status(program));
    }

    #[test]
    fn failed_relink_keeps_the_previous_executable() {
        let gl = HeadlessGl::new();
        let program = gl.create_program().unwrap();
        gl.attach_shader(program, compiled(&gl, VS));
        gl.link_program(program);
        assert!(gl.program_link_status(program));

        gl.attach_shader(
            program,
            compiled(&gl, "uniform Light { vec4 lightPos; }; void main() {}"),
        );
        gl.link_program(program);
        assert!(!gl.program_link_status(program));

        gl.use_program(program);
        assert_eq!(gl.current_program(), program);
        let location = gl.uniform_location(program, "scale").unwrap();
        gl.uniform_1_f32(location, 1.5);
        assert_eq!(gl.uniform_value(program, "scale"), Some(UniformValue::Float(1.5)));
    }

    #[test]
    fn uniform_writes_are_recorded() {
        let gl = HeadlessGl::new();
        let program = gl.create_program().unwrap();
        gl.attach_shader(program, compiled(&gl, VS));
        gl.link_program(program);
        gl.use_program(program);

        let location = gl.uniform_location(program, "scale").unwrap();
        gl.uniform_1_f32(location, 2.5);
        assert_eq!(gl.uniform_value(program, "scale"), Some(UniformValue::Float(2.5)));
        assert_eq!(gl.uniform_write_count(program, "scale"), 1);
        // Block members have no location.
        assert_eq!(gl.uniform_location(program, "Light.lightPos"), None);
    }

    #[test]
    fn element_buffer_binding_is_vertex_array_state() {
        let gl = HeadlessGl::new();
        let vao = gl.create_vertex_array().unwrap();
        let ibo = gl.create_buffer().unwrap();
        gl.bind_vertex_array(vao);
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, ibo);
        gl.bind_vertex_array(0);
        assert_eq!(gl.element_buffer(vao), ibo);
    }

    #[test]
    fn mapped_buffer_exposes_its_store() {
        let gl = HeadlessGl::new();
        let buffer = gl.create_buffer().unwrap();
        gl.bind_buffer(glow::COPY_WRITE_BUFFER, buffer);
        gl.buffer_data(glow::COPY_WRITE_BUFFER, &[1, 2, 3, 4], glow::STATIC_DRAW);
        let ptr = gl.map_buffer_range(glow::COPY_WRITE_BUFFER, 0, 4, glow::MAP_WRITE_BIT);
        assert!(!ptr.is_null());
        // A second map of the same buffer fails.
        assert!(gl
            .map_buffer_range(glow::COPY_WRITE_BUFFER, 0, 4, glow::MAP_WRITE_BIT)
            .is_null());
        unsafe { *ptr = 9 };
        gl.unmap_buffer(glow::COPY_WRITE_BUFFER);
        assert_eq!(gl.buffer_contents(buffer), Some(vec![9, 2, 3, 4]));
    }

    #[test]
    fn buffer_reads_back_as_floats() {
        let gl = HeadlessGl::new();
        let buffer = gl.create_buffer().unwrap();
        gl.bind_buffer(glow::ARRAY_BUFFER, buffer);
        gl.buffer_data(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&[0.5f32, -1.25]),
            glow::STATIC_DRAW,
        );
        let floats = gl.buffer_f32s(buffer).unwrap();
        approx::assert_relative_eq!(floats[0], 0.5);
        approx::assert_relative_eq!(floats[1], -1.25);
        assert_eq!(gl.buffer_upload_count(buffer), 1);
    }

    #[test]
    fn allocation_failures_can_be_forced() {
        let gl = HeadlessGl::new();
        gl.set_fail_allocations(true);
        assert!(gl.create_buffer().is_err());
        gl.set_fail_allocations(false);
        assert!(gl.create_buffer().is_ok());
    }
}
