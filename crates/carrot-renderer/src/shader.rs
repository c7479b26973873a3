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

//! A linked vertex + fragment program with reflection-aware uploads.

use anyhow::Context;
use carrot_core::rhi::{
    global_device, BlockRole, ProgramReflection, ReflectedBlock, RenderDevice, Resource, ResourceError,
    ShaderDescriptor, ShaderError, ShaderProgram, ShaderSource, ShaderStage,
};
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Where a [`Shader`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderState {
    /// No program has linked yet.
    Unlinked,
    /// A linked program is in use.
    Linked,
    /// Released; terminal.
    Released,
}

#[derive(Debug)]
struct SourcePaths {
    vertex: PathBuf,
    fragment: PathBuf,
}

/// A vertex + fragment shader pair linked into one program.
///
/// A failed rebuild keeps the previous program (and its uniform buffers)
/// in use, so a broken edit never leaves the shader unusable.
#[derive(Debug)]
pub struct Shader {
    device: Rc<dyn RenderDevice>,
    paths: Option<SourcePaths>,
    program: RefCell<Option<Rc<dyn ShaderProgram>>>,
    state: Cell<ShaderState>,
}

fn is_spirv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("spv"))
}

fn load_source(path: &Path) -> Result<ShaderSource<'static>, ShaderError> {
    let load_error = |reason: String| ShaderError::LoadError {
        path: path.display().to_string(),
        source_error: reason,
    };
    let bytes = std::fs::read(path).map_err(|e| load_error(e.to_string()))?;
    if bytes.is_empty() {
        return Err(load_error("file is empty".to_string()));
    }
    if is_spirv(path) {
        return Ok(ShaderSource::SpirV(Cow::Owned(bytes)));
    }
    String::from_utf8(bytes)
        .map(|text| ShaderSource::Glsl(Cow::Owned(text)))
        .map_err(|e| load_error(e.to_string()))
}

fn borrowed<'a>(source: &'a ShaderSource<'_>) -> ShaderSource<'a> {
    match source {
        ShaderSource::Glsl(text) => ShaderSource::Glsl(Cow::Borrowed(text.as_ref())),
        ShaderSource::SpirV(bytes) => ShaderSource::SpirV(Cow::Borrowed(bytes.as_ref())),
    }
}

/// Writes each named field into `block`'s staging copy, then uploads the block once.
fn write_fields<T: bytemuck::NoUninit>(
    reflection: &ProgramReflection,
    block: &ReflectedBlock,
    fields: &[(&str, &T)],
) -> Result<(), ResourceError> {
    for &(name, value) in fields {
        match reflection.resolve_in_block(block, name) {
            Some(offset) => block.write_value(offset, value)?,
            None => log::debug!("Shader: block '{}' has no member '{}'", block.name(), name),
        }
    }
    block.flush()?;
    Ok(())
}

impl Shader {
    /// Creates an empty shader on `device`. Call [`Shader::compile`] to build it.
    pub fn new(device: Rc<dyn RenderDevice>) -> Self {
        Self {
            device,
            paths: None,
            program: RefCell::new(None),
            state: Cell::new(ShaderState::Unlinked),
        }
    }

    /// Creates an empty shader on the device registered with
    /// [`set_global_device`](carrot_core::rhi::set_global_device).
    /// ## Errors
    /// * `ResourceError::NotInitialized` - If no global device is set.
    pub fn from_global_device() -> Result<Self, ResourceError> {
        global_device()
            .map(Self::new)
            .ok_or(ResourceError::NotInitialized)
    }

    /// Loads, compiles and links a shader from two files.
    ///
    /// Files ending in `.spv` are read as SPIR-V binaries, anything else as GLSL.
    /// ## Errors
    /// Fails if a file cannot be read or the build fails.
    pub fn from_files(
        device: Rc<dyn RenderDevice>,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let shader = Self {
            device,
            paths: Some(SourcePaths {
                vertex: vertex_path.as_ref().to_path_buf(),
                fragment: fragment_path.as_ref().to_path_buf(),
            }),
            program: RefCell::new(None),
            state: Cell::new(ShaderState::Unlinked),
        };
        shader.reload()?;
        Ok(shader)
    }

    /// Re-reads the source files and rebuilds the program.
    /// ## Errors
    /// Fails if the shader was not created from files, a file cannot be read,
    /// or the build fails. The previous program stays in use on failure.
    pub fn reload(&self) -> anyhow::Result<()> {
        let paths = self
            .paths
            .as_ref()
            .context("shader was not created from files")?;
        let vertex = load_source(&paths.vertex)?;
        let fragment = load_source(&paths.fragment)?;
        self.compile(&vertex, &fragment).with_context(|| {
            format!(
                "failed to build shader from '{}' and '{}'",
                paths.vertex.display(),
                paths.fragment.display()
            )
        })?;
        log::info!(
            "Shader: loaded '{}' + '{}'",
            paths.vertex.display(),
            paths.fragment.display()
        );
        Ok(())
    }

    /// Compiles both stages, links them and swaps the new program in.
    /// ## Errors
    /// * `ResourceError::Released` - After [`Shader::release`].
    /// * `ResourceError::Shader` - A stage failed to compile or the program failed to link.
    /// * Any creation error from the device.
    pub fn compile(&self, vertex: &ShaderSource<'_>, fragment: &ShaderSource<'_>) -> Result<(), ResourceError> {
        if self.state.get() == ShaderState::Released {
            return Err(ResourceError::Released);
        }
        let program = self.build_program(vertex, fragment).inspect_err(|e| {
            log::error!("Shader: build failed, keeping the previous program: {e}");
        })?;

        if let Some(previous) = self.program.replace(Some(program)) {
            previous.release();
        }
        self.state.set(ShaderState::Linked);
        Ok(())
    }

    /// [`Shader::compile`] for two GLSL strings.
    /// ## Errors
    /// See [`Shader::compile`].
    pub fn compile_glsl(&self, vertex: &str, fragment: &str) -> Result<(), ResourceError> {
        self.compile(
            &ShaderSource::Glsl(Cow::Borrowed(vertex)),
            &ShaderSource::Glsl(Cow::Borrowed(fragment)),
        )
    }

    fn stage_label(&self, stage: ShaderStage) -> String {
        let path = self.paths.as_ref().map(|p| match stage {
            ShaderStage::Fragment => &p.fragment,
            _ => &p.vertex,
        });
        match path.and_then(|p| p.file_name()) {
            Some(name) => name.to_string_lossy().into_owned(),
            None => format!("{stage:?}").to_lowercase(),
        }
    }

    fn build_program(
        &self,
        vertex: &ShaderSource<'_>,
        fragment: &ShaderSource<'_>,
    ) -> Result<Rc<dyn ShaderProgram>, ResourceError> {
        let program = self.device.create_shader_program()?;
        for (stage, source) in [(ShaderStage::Vertex, vertex), (ShaderStage::Fragment, fragment)] {
            let label = self.stage_label(stage);
            let shader = self.device.create_shader(&ShaderDescriptor {
                label: Some(&label),
                stage,
                source: borrowed(source),
                entry_point: "main",
            })?;
            shader.compile()?;
            program.attach_shader(shader.as_ref())?;
        }
        program.link()?;
        Ok(program)
    }

    /// The lifecycle state.
    pub fn state(&self) -> ShaderState {
        self.state.get()
    }

    /// Returns `true` while a linked program is in use.
    pub fn is_linked(&self) -> bool {
        self.state.get() == ShaderState::Linked
    }

    /// The program in use.
    pub fn program(&self) -> Option<Rc<dyn ShaderProgram>> {
        self.program.borrow().clone()
    }

    /// The reflection cache of the program in use.
    pub fn reflection(&self) -> Option<Rc<ProgramReflection>> {
        self.program.borrow().as_ref().and_then(|p| p.reflection())
    }

    /// The device the shader was created on.
    pub fn device(&self) -> &Rc<dyn RenderDevice> {
        &self.device
    }

    /// The source files, if the shader was created with [`Shader::from_files`].
    pub fn source_paths(&self) -> Option<(&Path, &Path)> {
        self.paths
            .as_ref()
            .map(|p| (p.vertex.as_path(), p.fragment.as_path()))
    }

    /// Makes the program current and points every binding it uses back at
    /// its own block buffers. A no-op while unlinked.
    pub fn bind(&self) {
        let program = self.program.borrow();
        let Some(program) = program.as_ref().filter(|_| self.is_linked()) else {
            log::debug!("Shader: bind of an unlinked shader has no effect");
            return;
        };
        program.bind();
        if let Some(reflection) = program.reflection() {
            for block in reflection.blocks() {
                if let Some(buffer) = block.buffer() {
                    buffer.bind(block.binding());
                }
            }
        }
    }

    /// Clears the current program.
    pub fn unbind(&self) {
        if let Some(program) = self.program.borrow().as_ref() {
            program.unbind();
        }
    }

    fn with_program(&self, call: impl FnOnce(&dyn ShaderProgram)) {
        if let Some(program) = self.program.borrow().as_ref() {
            call(program.as_ref());
        }
    }

    /// Sets a default-block `float`. The shader must be bound.
    pub fn set_float(&self, name: &str, value: f32) {
        self.with_program(|p| p.set_uniform_float(name, value));
    }

    /// Sets a default-block `vec2`. The shader must be bound.
    pub fn set_vec2(&self, name: &str, x: f32, y: f32) {
        self.with_program(|p| p.set_uniform_vec2(name, x, y));
    }

    /// Sets a default-block `vec3`. The shader must be bound.
    pub fn set_vec3(&self, name: &str, x: f32, y: f32, z: f32) {
        self.with_program(|p| p.set_uniform_vec3(name, x, y, z));
    }

    /// Sets a default-block `vec4`. The shader must be bound.
    pub fn set_vec4(&self, name: &str, x: f32, y: f32, z: f32, w: f32) {
        self.with_program(|p| p.set_uniform_vec4(name, x, y, z, w));
    }

    /// Sets a default-block `int` or sampler. The shader must be bound.
    pub fn set_int(&self, name: &str, value: i32) {
        self.with_program(|p| p.set_uniform_int(name, value));
    }

    /// Sets a default-block `bool`. The shader must be bound.
    pub fn set_bool(&self, name: &str, value: bool) {
        self.with_program(|p| p.set_uniform_bool(name, value));
    }

    /// Sets a default-block column-major `mat4`. The shader must be bound.
    pub fn set_matrix4(&self, name: &str, value: &[f32; 16]) {
        self.with_program(|p| p.set_uniform_matrix4(name, value));
    }

    /// Uploads the model, view and projection matrices.
    ///
    /// With a per-frame block the three matrices are written into its staging
    /// copy and uploaded in one transfer. Without one they go out as three
    /// `mat4` uniforms named `model`, `view` and `projection`; the shader must
    /// then be bound.
    /// ## Errors
    /// Propagates a failed block upload.
    pub fn set_per_frame_matrices(
        &self,
        model: &[f32; 16],
        view: &[f32; 16],
        projection: &[f32; 16],
    ) -> Result<(), ResourceError> {
        let Some(program) = self.program() else {
            return Ok(());
        };
        let fields = [("model", model), ("view", view), ("projection", projection)];
        if let Some(reflection) = program.reflection() {
            if let Some(block) = reflection.block_by_role(BlockRole::PerFrame) {
                return write_fields(&reflection, block, &fields);
            }
        }
        for (name, matrix) in fields {
            program.set_uniform_matrix4(name, matrix);
        }
        Ok(())
    }

    /// Uploads the light position, light color and camera position.
    ///
    /// Same policy as [`Shader::set_per_frame_matrices`], with the fields
    /// `lightPos`, `lightColor` and `viewPos` of the light block.
    /// ## Errors
    /// Propagates a failed block upload.
    pub fn set_light_data(
        &self,
        light_pos: [f32; 3],
        light_color: [f32; 3],
        view_pos: [f32; 3],
    ) -> Result<(), ResourceError> {
        let Some(program) = self.program() else {
            return Ok(());
        };
        let fields = [
            ("lightPos", &light_pos),
            ("lightColor", &light_color),
            ("viewPos", &view_pos),
        ];
        if let Some(reflection) = program.reflection() {
            if let Some(block) = reflection.block_by_role(BlockRole::Light) {
                return write_fields(&reflection, block, &fields);
            }
        }
        for (name, [x, y, z]) in fields {
            program.set_uniform_vec3(name, *x, *y, *z);
        }
        Ok(())
    }

    /// Uploads a packed material block from its start.
    ///
    /// Returns `false` when the program has no material block.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `bytes` is larger than the block.
    pub fn update_material_block(&self, bytes: &[u8]) -> Result<bool, ResourceError> {
        let Some(reflection) = self.reflection() else {
            return Ok(false);
        };
        match reflection.block_by_role(BlockRole::Material) {
            Some(block) => block.upload(bytes).map(|_| true),
            None => Ok(false),
        }
    }

    /// The byte offset of a block member, through all name resolution tiers.
    pub fn ubo_offset(&self, field: &str) -> Option<u32> {
        self.reflection()?.offset_of(field)
    }

    /// Releases the program and its block buffers. Terminal.
    pub fn release(&self) {
        if self.state.replace(ShaderState::Released) == ShaderState::Released {
            return;
        }
        if let Some(program) = self.program.borrow_mut().take() {
            program.release();
        }
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spirv_is_detected_by_extension() {
        assert!(is_spirv(Path::new("shaders/lit.frag.spv")));
        assert!(is_spirv(Path::new("LIT.SPV")));
        assert!(!is_spirv(Path::new("shaders/lit.frag")));
        assert!(!is_spirv(Path::new("spv")));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_source(Path::new("/definitely/not/here.vert")).unwrap_err();
        assert!(matches!(err, ShaderError::LoadError { ref path, .. } if path.ends_with("here.vert")));
    }
}
