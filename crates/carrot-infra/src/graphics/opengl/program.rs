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

//! Shader programs and their uniform block reflection.

use super::api::GlApi;
use super::buffer::GlUniformBuffer;
use carrot_core::rhi::reflection::BlockBinder;
use carrot_core::rhi::traits::ensure_backend;
use carrot_core::rhi::{
    GraphicsApi, NativeHandle, ProgramReflection, Resource, ResourceError, RhiSettings, Shader,
    ShaderError, ShaderProgram, UniformBlockInfo, UniformBuffer, UniformVariableInfo,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Applies block bindings and allocates block buffers for one program.
struct ProgramBinder<'a> {
    gl: &'a Rc<dyn GlApi>,
    program: u32,
}

impl BlockBinder for ProgramBinder<'_> {
    fn set_block_binding(&self, block_index: u32, binding: u32) {
        self.gl.uniform_block_binding(self.program, block_index, binding);
    }

    fn allocate_block_buffer(
        &self,
        size: usize,
        binding: u32,
    ) -> Result<Rc<dyn UniformBuffer>, ResourceError> {
        let buffer = GlUniformBuffer::new(self.gl.clone(), size, binding)?;
        Ok(Rc::new(buffer))
    }
}

fn non_negative(value: Option<&i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(*v).ok())
}

/// A GLSL program object.
///
/// A successful [`ShaderProgram::link`] rebuilds the [`ProgramReflection`]:
/// every active uniform block gets a unique binding and its own uniform buffer.
/// Default-block uniform locations are looked up lazily and cached until
/// the next link.
#[derive(Debug)]
pub struct GlProgram {
    gl: Rc<dyn GlApi>,
    settings: Rc<RhiSettings>,
    handle: Cell<u32>,
    attached: RefCell<Vec<u32>>,
    linked: Cell<bool>,
    link_errors: RefCell<String>,
    blocks: RefCell<Vec<UniformBlockInfo>>,
    variables: RefCell<Vec<UniformVariableInfo>>,
    reflection: RefCell<Option<Rc<ProgramReflection>>>,
    locations: RefCell<HashMap<String, Option<u32>>>,
}

impl GlProgram {
    pub(crate) fn new(gl: Rc<dyn GlApi>, settings: Rc<RhiSettings>) -> Result<Self, ResourceError> {
        let handle = gl.create_program().map_err(ResourceError::BackendError)?;
        log::debug!("GlProgram: created #{handle}");
        Ok(Self {
            gl,
            settings,
            handle: Cell::new(handle),
            attached: RefCell::new(Vec::new()),
            linked: Cell::new(false),
            link_errors: RefCell::new(String::new()),
            blocks: RefCell::new(Vec::new()),
            variables: RefCell::new(Vec::new()),
            reflection: RefCell::new(None),
            locations: RefCell::new(HashMap::new()),
        })
    }

    /// The number of shaders currently attached.
    pub fn attached_count(&self) -> usize {
        self.attached.borrow().len()
    }

    fn query_blocks(&self, program: u32) -> Vec<UniformBlockInfo> {
        let count = self.gl.program_parameter(program, glow::ACTIVE_UNIFORM_BLOCKS).max(0) as u32;
        (0..count)
            .map(|index| {
                let param = |pname| self.gl.active_uniform_block_parameter(program, index, pname);
                UniformBlockInfo {
                    name: self.gl.active_uniform_block_name(program, index),
                    block_index: index,
                    size: param(glow::UNIFORM_BLOCK_DATA_SIZE).max(0) as usize,
                    binding: param(glow::UNIFORM_BLOCK_BINDING).max(0) as u32,
                }
            })
            .collect()
    }

    fn query_variables(&self, program: u32) -> Vec<UniformVariableInfo> {
        let count = self.gl.program_parameter(program, glow::ACTIVE_UNIFORMS).max(0) as u32;
        let indices: Vec<u32> = (0..count).collect();
        let block_indices =
            self.gl.active_uniforms_parameter(program, &indices, glow::UNIFORM_BLOCK_INDEX);
        let offsets = self.gl.active_uniforms_parameter(program, &indices, glow::UNIFORM_OFFSET);

        indices
            .iter()
            .filter_map(|&index| {
                let (name, size) = self.gl.active_uniform(program, index)?;
                let slot = index as usize;
                Some(UniformVariableInfo {
                    name,
                    block_index: non_negative(block_indices.get(slot)),
                    offset: non_negative(offsets.get(slot)),
                    array_size: size.max(1) as u32,
                })
            })
            .collect()
    }

    fn location(&self, name: &str) -> Option<u32> {
        let handle = self.handle.get();
        if handle == 0 || !self.linked.get() {
            return None;
        }
        if let Some(cached) = self.locations.borrow().get(name) {
            return *cached;
        }
        let location = self.gl.uniform_location(handle, name);
        if location.is_none() {
            log::debug!("GlProgram: uniform '{name}' not found in program #{handle}");
        }
        self.locations.borrow_mut().insert(name.to_string(), location);
        location
    }
}

impl Resource for GlProgram {
    fn native_handle(&self) -> NativeHandle {
        NativeHandle::from_u32(self.handle.get())
    }

    fn release(&self) {
        let handle = self.handle.replace(0);
        if handle == 0 {
            return;
        }
        // Block buffers go first; they may outlive the program through shared handles.
        self.reflection.borrow_mut().take();
        self.attached.borrow_mut().clear();
        self.locations.borrow_mut().clear();
        self.linked.set(false);
        self.gl.delete_program(handle);
        log::debug!("GlProgram: released #{handle}");
    }

    fn backend(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }
}

impl ShaderProgram for GlProgram {
    fn attach_shader(&self, shader: &dyn Shader) -> Result<(), ResourceError> {
        ensure_backend(shader, GraphicsApi::OpenGl)
            .inspect_err(|e| log::error!("GlProgram: attach rejected: {e}"))?;
        let program = self.handle.get();
        let handle = shader.native_handle().as_u32();
        if program == 0 || handle == 0 {
            return Err(ResourceError::Released);
        }
        let mut attached = self.attached.borrow_mut();
        if attached.contains(&handle) {
            log::debug!("GlProgram: shader #{handle} already attached to #{program}");
            return Ok(());
        }
        self.gl.attach_shader(program, handle);
        attached.push(handle);
        Ok(())
    }

    fn detach_shader(&self, shader: &dyn Shader) {
        let handle = shader.native_handle().as_u32();
        let mut attached = self.attached.borrow_mut();
        if let Some(position) = attached.iter().position(|s| *s == handle) {
            attached.remove(position);
            self.gl.detach_shader(self.handle.get(), handle);
        }
    }

    fn link(&self) -> Result<(), ShaderError> {
        let program = self.handle.get();
        if program == 0 {
            return Err(ShaderError::LinkError {
                details: "program has been released".to_string(),
            });
        }

        self.gl.link_program(program);
        if !self.gl.program_link_status(program) {
            let details = self.settings.clamp_info_log(self.gl.program_info_log(program));
            log::error!("GlProgram: link of #{program} failed: {details}");
            *self.link_errors.borrow_mut() = details.clone();
            // The last good executable, its locations and reflection stay in use.
            return Err(ShaderError::LinkError { details });
        }

        for shader in self.attached.borrow_mut().drain(..) {
            self.gl.detach_shader(program, shader);
        }

        let blocks = self.query_blocks(program);
        let variables = self.query_variables(program);
        let binder = ProgramBinder { gl: &self.gl, program };
        let reflection = ProgramReflection::build(
            &blocks,
            &variables,
            &self.settings.block_roles,
            &binder,
        );
        if self.settings.log_reflection {
            reflection.log_summary(self.native_handle());
        }

        *self.blocks.borrow_mut() = reflection.blocks().iter().map(|b| b.info().clone()).collect();
        *self.variables.borrow_mut() = variables;
        // Replacing the cache drops the previous link's block buffers.
        *self.reflection.borrow_mut() = Some(Rc::new(reflection));
        self.locations.borrow_mut().clear();
        self.link_errors.borrow_mut().clear();
        self.linked.set(true);

        log::debug!(
            "GlProgram: linked #{program} ({} uniform blocks)",
            self.blocks.borrow().len()
        );
        Ok(())
    }

    fn link_errors(&self) -> String {
        self.link_errors.borrow().clone()
    }

    fn is_linked(&self) -> bool {
        self.linked.get()
    }

    fn bind(&self) {
        if self.linked.get() {
            self.gl.use_program(self.handle.get());
        } else {
            log::warn!("GlProgram: bind of unlinked program #{} ignored", self.handle.get());
        }
    }

    fn unbind(&self) {
        self.gl.use_program(0);
    }

    fn set_uniform_float(&self, name: &str, value: f32) {
        if let Some(location) = self.location(name) {
            self.gl.uniform_1_f32(location, value);
        }
    }

    fn set_uniform_vec2(&self, name: &str, x: f32, y: f32) {
        if let Some(location) = self.location(name) {
            self.gl.uniform_2_f32(location, x, y);
        }
    }

    fn set_uniform_vec3(&self, name: &str, x: f32, y: f32, z: f32) {
        if let Some(location) = self.location(name) {
            self.gl.uniform_3_f32(location, x, y, z);
        }
    }

    fn set_uniform_vec4(&self, name: &str, x: f32, y: f32, z: f32, w: f32) {
        if let Some(location) = self.location(name) {
            self.gl.uniform_4_f32(location, x, y, z, w);
        }
    }

    fn set_uniform_int(&self, name: &str, value: i32) {
        if let Some(location) = self.location(name) {
            self.gl.uniform_1_i32(location, value);
        }
    }

    fn set_uniform_bool(&self, name: &str, value: bool) {
        self.set_uniform_int(name, i32::from(value));
    }

    fn set_uniform_matrix4(&self, name: &str, value: &[f32; 16]) {
        if let Some(location) = self.location(name) {
            self.gl.uniform_matrix_4_f32(location, value);
        }
    }

    fn uniform_blocks(&self) -> Vec<UniformBlockInfo> {
        self.blocks.borrow().clone()
    }

    fn uniform_variables(&self) -> Vec<UniformVariableInfo> {
        self.variables.borrow().clone()
    }

    fn reflection(&self) -> Option<Rc<ProgramReflection>> {
        self.reflection.borrow().clone()
    }
}

impl Drop for GlProgram {
    fn drop(&mut self) {
        self.release();
    }
}
