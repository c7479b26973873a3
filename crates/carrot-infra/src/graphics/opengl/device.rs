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
use super::buffer::{GlBuffer, GlUniformBuffer};
use super::conversions::IntoGl;
use super::framebuffer::GlFramebuffer;
use super::glow_api::GlowContext;
use super::program::GlProgram;
use super::shader::GlShader;
use super::texture::GlTexture;
use super::vertex_array::GlVertexArray;
use carrot_core::rhi::*;
use std::cell::RefCell;
use std::rc::Rc;

/// The OpenGL 3.3 core implementation of [`RenderDevice`].
///
/// All GL calls go through a [`GlApi`] table installed by
/// [`RenderDevice::initialize`] (a real context) or
/// [`OpenGlDevice::initialize_with_api`] (any table, e.g. [`HeadlessGl`](super::HeadlessGl)).
#[derive(Debug)]
pub struct OpenGlDevice {
    gl: RefCell<Option<Rc<dyn GlApi>>>,
    settings: Rc<RhiSettings>,
    state: RefCell<PipelineState>,
}

impl OpenGlDevice {
    /// Creates an uninitialized device.
    pub fn new(settings: RhiSettings) -> Self {
        Self {
            gl: RefCell::new(None),
            settings: Rc::new(settings),
            state: RefCell::new(PipelineState::default()),
        }
    }

    /// Initializes the device on top of an existing GL function table.
    /// ## Errors
    /// * `RenderError::InitializationFailed` - If the table reports no GL version.
    pub fn initialize_with_api(&self, gl: Rc<dyn GlApi>) -> Result<(), RenderError> {
        let version = gl.version().ok_or_else(|| {
            RenderError::InitializationFailed(
                "GL_VERSION is unavailable; is a context current on this thread?".to_string(),
            )
        })?;
        *self.gl.borrow_mut() = Some(gl);
        log::info!("OpenGlDevice: initialized (GL {version})");
        Ok(())
    }

    /// The settings shared with every resource this device creates.
    pub fn settings(&self) -> &RhiSettings {
        &self.settings
    }

    fn api(&self) -> Result<Rc<dyn GlApi>, ResourceError> {
        self.gl.borrow().clone().ok_or(ResourceError::NotInitialized)
    }

    /// Records `update` and applies it when a GL table is installed.
    fn apply(&self, update: impl FnOnce(&mut PipelineState), gl_call: impl FnOnce(&dyn GlApi)) {
        update(&mut *self.state.borrow_mut());
        match self.gl.borrow().as_deref() {
            Some(gl) => gl_call(gl),
            None => log::warn!("OpenGlDevice: state change before initialize is only recorded"),
        }
    }

    fn with_gl(&self, call: impl FnOnce(&dyn GlApi)) {
        match self.gl.borrow().as_deref() {
            Some(gl) => call(gl),
            None => log::warn!("OpenGlDevice: call ignored, device is not initialized"),
        }
    }
}

/// Converts a count or extent to the `GLint`/`GLsizei` GL expects.
fn gl_int(value: u32, what: &str) -> Option<i32> {
    let converted = i32::try_from(value).ok();
    if converted.is_none() {
        log::error!("OpenGlDevice: {what} {value} exceeds the GL integer range, call skipped");
    }
    converted
}

fn gl_rect(width: u32, height: u32, what: &str) -> Option<(i32, i32)> {
    Some((gl_int(width, what)?, gl_int(height, what)?))
}

impl Default for OpenGlDevice {
    fn default() -> Self {
        Self::new(RhiSettings::default())
    }
}

impl RenderDevice for OpenGlDevice {
    fn initialize(&self, loader: ProcAddressLoader<'_>) -> Result<(), RenderError> {
        if self.is_initialized() {
            log::warn!("OpenGlDevice: already initialized");
            return Ok(());
        }
        // SAFETY: the loader comes from the windowing layer and resolves
        // entry points of the context current on this thread.
        let context = unsafe { GlowContext::from_loader(loader) };
        self.initialize_with_api(Rc::new(context))
    }

    fn shutdown(&self) {
        if self.gl.borrow_mut().take().is_some() {
            log::info!("OpenGlDevice: shut down");
        }
    }

    fn is_initialized(&self) -> bool {
        self.gl.borrow().is_some()
    }

    fn graphics_api(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor<'_>) -> Result<Rc<dyn Buffer>, ResourceError> {
        Ok(Rc::new(GlBuffer::new(self.api()?, descriptor)?))
    }

    fn create_shader(&self, descriptor: &ShaderDescriptor<'_>) -> Result<Rc<dyn Shader>, ResourceError> {
        Ok(Rc::new(GlShader::new(self.api()?, self.settings.clone(), descriptor)?))
    }

    fn create_shader_program(&self) -> Result<Rc<dyn ShaderProgram>, ResourceError> {
        Ok(Rc::new(GlProgram::new(self.api()?, self.settings.clone())?))
    }

    fn create_texture(&self, descriptor: &TextureDescriptor<'_>) -> Result<Rc<dyn Texture>, ResourceError> {
        Ok(Rc::new(GlTexture::new(self.api()?, descriptor)?))
    }

    fn create_framebuffer(&self, descriptor: &FramebufferDescriptor) -> Result<Rc<dyn Framebuffer>, ResourceError> {
        Ok(Rc::new(GlFramebuffer::new(self.api()?, descriptor)?))
    }

    fn create_vertex_array(&self) -> Result<Rc<dyn VertexArray>, ResourceError> {
        Ok(Rc::new(GlVertexArray::new(self.api()?)?))
    }

    fn create_uniform_buffer(&self, size: usize, binding: u32) -> Result<Rc<dyn UniformBuffer>, ResourceError> {
        Ok(Rc::new(GlUniformBuffer::new(self.api()?, size, binding)?))
    }

    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        let Some((w, h)) = gl_rect(width, height, "viewport extent") else {
            return;
        };
        let rect = Viewport { x, y, width, height };
        self.apply(|s| s.viewport = rect, |gl| gl.viewport(x, y, w, h));
    }

    fn set_scissor(&self, x: i32, y: i32, width: u32, height: u32) {
        let Some((w, h)) = gl_rect(width, height, "scissor extent") else {
            return;
        };
        let rect = Viewport { x, y, width, height };
        self.apply(|s| s.scissor = rect, |gl| gl.scissor(x, y, w, h));
    }

    fn set_depth_test(&self, enabled: bool) {
        self.apply(
            |s| s.depth_test = enabled,
            |gl| match enabled {
                true => gl.enable(glow::DEPTH_TEST),
                false => gl.disable(glow::DEPTH_TEST),
            },
        );
    }

    fn set_depth_write(&self, enabled: bool) {
        self.apply(|s| s.depth_write = enabled, |gl| gl.depth_mask(enabled));
    }

    fn set_depth_func(&self, func: CompareFunction) {
        self.apply(|s| s.depth_func = func, |gl| gl.depth_func(func.into_gl()));
    }

    fn set_blend(&self, enabled: bool) {
        self.apply(
            |s| s.blend = enabled,
            |gl| match enabled {
                true => gl.enable(glow::BLEND),
                false => gl.disable(glow::BLEND),
            },
        );
    }

    fn set_blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        self.apply(
            |s| {
                s.blend_src = src;
                s.blend_dst = dst;
            },
            |gl| gl.blend_func(src.into_gl(), dst.into_gl()),
        );
    }

    fn set_blend_op(&self, op: BlendOperation) {
        self.apply(|s| s.blend_op = op, |gl| gl.blend_equation(op.into_gl()));
    }

    fn set_cull_mode(&self, mode: CullMode) {
        self.apply(
            |s| s.cull_mode = mode,
            |gl| match mode.into_gl() {
                Some(face) => {
                    gl.enable(glow::CULL_FACE);
                    gl.cull_face(face);
                }
                None => gl.disable(glow::CULL_FACE),
            },
        );
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.apply(
            |s| s.clear_color = [r, g, b, a],
            |gl| gl.clear_color(r, g, b, a),
        );
    }

    fn clear_depth(&self, depth: f32) {
        self.apply(|s| s.clear_depth = depth, |gl| gl.clear_depth(f64::from(depth)));
    }

    fn clear(&self, flags: ClearFlags) {
        if flags.is_empty() {
            return;
        }
        self.with_gl(|gl| gl.clear(flags.into_gl()));
    }

    fn draw(&self, topology: PrimitiveTopology, vertex_count: u32, start_vertex: u32) {
        let (Some(first), Some(count)) = (
            gl_int(start_vertex, "start vertex"),
            gl_int(vertex_count, "vertex count"),
        ) else {
            return;
        };
        self.with_gl(|gl| gl.draw_arrays(topology.into_gl(), first, count));
    }

    fn draw_indexed(&self, topology: PrimitiveTopology, index_count: u32, start_index: u32) {
        let byte_offset = start_index.checked_mul(std::mem::size_of::<u32>() as u32);
        let (Some(count), Some(offset)) = (
            gl_int(index_count, "index count"),
            byte_offset.and_then(|bytes| gl_int(bytes, "index byte offset")),
        ) else {
            if byte_offset.is_none() {
                log::error!("OpenGlDevice: start index {start_index} overflows the byte offset, call skipped");
            }
            return;
        };
        self.with_gl(|gl| gl.draw_elements(topology.into_gl(), count, glow::UNSIGNED_INT, offset));
    }

    fn pipeline_state(&self) -> PipelineState {
        *self.state.borrow()
    }
}

impl Drop for OpenGlDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::opengl::HeadlessGl;

    const VERTEX: &str = r#"
        #version 330 core
        layout(std140, binding = 0) uniform PerFrame {
            mat4 model;
            mat4 view;
            mat4 projection;
        };
        layout(location = 0) in vec3 aPos;
        void main() {
            gl_Position = projection * view * model * vec4(aPos, 1.0);
        }
    "#;

    const FRAGMENT: &str = r#"
        #version 330 core
        layout(std140, binding = 0) uniform Light {
            vec3 lightPos;
            vec3 lightColor;
            vec3 viewPos;
        } light;
        uniform vec3 tint;
        out vec4 FragColor;
        void main() {
            FragColor = vec4(light.lightColor * tint, 1.0);
        }
    "#;

    fn device() -> (OpenGlDevice, Rc<HeadlessGl>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let gl = Rc::new(HeadlessGl::new());
        let device = OpenGlDevice::default();
        device.initialize_with_api(gl.clone()).unwrap();
        (device, gl)
    }

    fn program(device: &OpenGlDevice) -> Rc<dyn ShaderProgram> {
        let program = device.create_shader_program().unwrap();
        for (stage, source) in [(ShaderStage::Vertex, VERTEX), (ShaderStage::Fragment, FRAGMENT)] {
            let shader = device.create_shader(&ShaderDescriptor::glsl(stage, source)).unwrap();
            shader.compile().unwrap();
            program.attach_shader(shader.as_ref()).unwrap();
        }
        program.link().unwrap();
        program
    }

    #[test]
    fn creation_requires_initialize() {
        let device = OpenGlDevice::default();
        assert!(!device.is_initialized());
        assert_eq!(
            device.create_vertex_array().unwrap_err(),
            ResourceError::NotInitialized
        );
        assert_eq!(
            device.create_buffer(&BufferDescriptor::default()).unwrap_err(),
            ResourceError::NotInitialized
        );
    }

    #[test]
    fn shutdown_stops_creation() {
        let (device, _gl) = device();
        device.shutdown();
        assert!(matches!(
            device.create_shader_program(),
            Err(ResourceError::NotInitialized)
        ));
    }

    #[test]
    fn link_detaches_shaders_and_assigns_unique_bindings() {
        let (device, gl) = device();
        let program = program(&device);
        let raw = program.native_handle().as_u32();

        assert!(gl.attached_shaders(raw).is_empty());
        let blocks = program.uniform_blocks();
        let bindings: Vec<(String, u32)> = blocks.iter().map(|b| (b.name.clone(), b.binding)).collect();
        assert_eq!(
            bindings,
            vec![("PerFrame".to_string(), 0), ("Light".to_string(), 1)]
        );
        assert_eq!(gl.program_block_binding(raw, 1), Some(1));

        let reflection = program.reflection().unwrap();
        let per_frame = reflection.block_by_role(BlockRole::PerFrame).unwrap();
        let light = reflection.block_by_role(BlockRole::Light).unwrap();
        assert_eq!(gl.indexed_uniform_buffer(0), per_frame.buffer_handle().as_u32());
        assert_eq!(gl.indexed_uniform_buffer(1), light.buffer_handle().as_u32());
    }

    #[test]
    fn colliding_blocks_keep_separate_storage() {
        let (device, gl) = device();
        let program = program(&device);
        let reflection = program.reflection().unwrap();
        let per_frame = reflection.block_by_role(BlockRole::PerFrame).unwrap();
        let light = reflection.block_by_role(BlockRole::Light).unwrap();

        per_frame.upload(&[1u8; 192]).unwrap();
        light.upload(&[2u8; 48]).unwrap();
        assert_eq!(
            gl.buffer_contents(per_frame.buffer_handle().as_u32()),
            Some(vec![1u8; 192])
        );
    }

    #[test]
    fn cache_resolves_all_name_forms() {
        let (device, _gl) = device();
        let program = program(&device);
        let reflection = program.reflection().unwrap();

        let full = reflection.lookup("Light.lightPos").unwrap();
        assert_eq!(reflection.lookup("lightPos"), Some(full));
        assert_eq!(reflection.resolve("lightPos"), Some(full));
        assert_eq!(reflection.offset_of("viewPos"), Some(32));
        assert_eq!(reflection.offset_of("projection"), Some(128));
        // Loose uniforms stay out of the cache.
        assert_eq!(reflection.lookup("tint"), None);
    }

    #[test]
    fn relink_replaces_block_buffers() {
        let (device, gl) = device();
        let program = program(&device);
        assert_eq!(gl.live_buffer_count(), 2);

        for (stage, source) in [(ShaderStage::Vertex, VERTEX), (ShaderStage::Fragment, FRAGMENT)] {
            let shader = device.create_shader(&ShaderDescriptor::glsl(stage, source)).unwrap();
            shader.compile().unwrap();
            program.attach_shader(shader.as_ref()).unwrap();
        }
        program.link().unwrap();
        assert_eq!(gl.live_buffer_count(), 2);

        program.release();
        assert_eq!(gl.live_buffer_count(), 0);
    }

    #[test]
    fn failed_link_keeps_previous_reflection() {
        let (device, gl) = device();
        let program = program(&device);
        let before = program.reflection().unwrap();

        let err = program.link().unwrap_err();
        assert!(matches!(err, ShaderError::LinkError { .. }));
        assert!(!program.link_errors().is_empty());
        assert!(Rc::ptr_eq(&before, &program.reflection().unwrap()));

        // The last good executable stays usable.
        assert!(program.is_linked());
        program.bind();
        let raw = program.native_handle().as_u32();
        assert_eq!(gl.current_program(), raw);
        program.set_uniform_vec3("tint", 1.0, 0.5, 0.25);
        assert_eq!(
            gl.uniform_value(raw, "tint"),
            Some(crate::graphics::opengl::headless::UniformValue::Vec3([1.0, 0.5, 0.25]))
        );
    }

    #[test]
    fn compile_failure_reports_log() {
        let (device, _gl) = device();
        let shader = device
            .create_shader(&ShaderDescriptor::glsl(ShaderStage::Fragment, "void main() { vec3 x = ; "))
            .unwrap();
        assert!(matches!(
            shader.compile(),
            Err(ShaderError::CompilationError { .. })
        ));
        assert!(!shader.compile_errors().is_empty());
    }

    #[test]
    fn default_uniforms_use_cached_locations() {
        let (device, gl) = device();
        let program = program(&device);
        program.bind();
        program.set_uniform_vec3("tint", 1.0, 0.5, 0.25);
        program.set_uniform_float("missing", 1.0);
        let raw = program.native_handle().as_u32();
        assert_eq!(
            gl.uniform_value(raw, "tint"),
            Some(crate::graphics::opengl::headless::UniformValue::Vec3([1.0, 0.5, 0.25]))
        );
        assert_eq!(gl.total_uniform_writes(raw), 1);
    }

    fn release_twice<R: Resource + ?Sized>(resource: &R) {
        assert!(resource.is_valid());
        resource.release();
        resource.release();
        assert!(!resource.is_valid());
    }

    #[test]
    fn release_is_idempotent_for_every_kind() {
        let (device, gl) = device();
        let buffer = device
            .create_buffer(&BufferDescriptor { size: 16, ..Default::default() })
            .unwrap();
        let shader = device
            .create_shader(&ShaderDescriptor::glsl(ShaderStage::Vertex, VERTEX))
            .unwrap();
        let program = device.create_shader_program().unwrap();
        let texture = device
            .create_texture(&TextureDescriptor { width: 4, height: 4, ..Default::default() })
            .unwrap();
        let framebuffer = device
            .create_framebuffer(&FramebufferDescriptor { width: 4, height: 4, has_depth_stencil: true })
            .unwrap();
        let vertex_array = device.create_vertex_array().unwrap();
        let uniform_buffer = device.create_uniform_buffer(64, 2).unwrap();

        release_twice(buffer.as_ref());
        release_twice(shader.as_ref());
        release_twice(program.as_ref());
        release_twice(texture.as_ref());
        release_twice(framebuffer.as_ref());
        release_twice(vertex_array.as_ref());
        release_twice(uniform_buffer.as_ref());

        assert_eq!(gl.live_buffer_count(), 0);
        assert_eq!(gl.live_shader_count(), 0);
        assert_eq!(gl.live_texture_count(), 0);
        assert_eq!(gl.live_program_count(), 0);
    }

    #[test]
    fn pipeline_state_is_recorded_and_applied() {
        let (device, gl) = device();
        device.set_viewport(0, 0, 800, 600);
        device.set_depth_test(true);
        device.set_blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        device.set_cull_mode(CullMode::Front);
        device.clear_color(0.1, 0.2, 0.3, 1.0);

        let state = device.pipeline_state();
        assert_eq!(state.viewport, Viewport { x: 0, y: 0, width: 800, height: 600 });
        assert!(state.depth_test);
        assert_eq!(state.cull_mode, CullMode::Front);

        let fixed = gl.fixed_function();
        assert_eq!(fixed.viewport, [0, 0, 800, 600]);
        assert_eq!(fixed.blend_func, (glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA));
        assert_eq!(fixed.cull_face, glow::FRONT);
        assert!(gl.is_enabled(glow::DEPTH_TEST));
        assert!(gl.is_enabled(glow::CULL_FACE));

        device.set_cull_mode(CullMode::None);
        assert!(!gl.is_enabled(glow::CULL_FACE));
    }

    #[test]
    fn draws_use_what_is_bound() {
        let (device, gl) = device();
        let vao = device.create_vertex_array().unwrap();
        let indices = [0u32, 1, 2, 2, 3, 0];
        let ibo = device
            .create_buffer(&BufferDescriptor::with_data(
                BufferType::Index,
                BufferUsage::Static,
                bytemuck::cast_slice(&indices),
            ))
            .unwrap();
        vao.set_index_buffer(ibo.as_ref()).unwrap();
        vao.bind();
        device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        device.draw_indexed(PrimitiveTopology::TriangleList, 3, 3);

        let draws = gl.draws();
        assert_eq!(draws.len(), 1);
        assert!(draws[0].indexed);
        assert_eq!(draws[0].first, 12);
        assert_eq!(draws[0].vertex_array, vao.native_handle().as_u32());
        assert_eq!(gl.element_buffer(vao.native_handle().as_u32()), ibo.native_handle().as_u32());
        assert_eq!(gl.clears(), vec![glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT]);
    }

    #[test]
    fn out_of_range_counts_are_skipped() {
        let (device, gl) = device();
        device.set_viewport(0, 0, 640, 480);
        device.set_viewport(0, 0, u32::MAX, 480);
        assert_eq!(gl.fixed_function().viewport, [0, 0, 640, 480]);
        assert_eq!(device.pipeline_state().viewport.width, 640);

        device.draw(PrimitiveTopology::TriangleList, u32::MAX, 0);
        device.draw_indexed(PrimitiveTopology::TriangleList, 3, u32::MAX / 2);
        device.draw_indexed(PrimitiveTopology::TriangleList, 1 << 31, 0);
        assert!(gl.draws().is_empty());

        device.draw(PrimitiveTopology::TriangleList, 3, 0);
        assert_eq!(gl.draws().len(), 1);
    }

    #[test]
    fn vertex_attribute_reads_registered_buffer() {
        let (device, gl) = device();
        let vao = device.create_vertex_array().unwrap();
        let vertices = [0.0f32; 9];
        let vbo = device
            .create_buffer(&BufferDescriptor::with_data(
                BufferType::Vertex,
                BufferUsage::Static,
                bytemuck::cast_slice(&vertices),
            ))
            .unwrap();
        vao.set_vertex_buffer(vbo.as_ref(), 0).unwrap();
        vao.set_vertex_attribute(&VertexAttribute::float(0, 3, 0, 12)).unwrap();

        let attribute = gl.vertex_attribute(vao.native_handle().as_u32(), 0).unwrap();
        assert_eq!(attribute.buffer, vbo.native_handle().as_u32());
        assert_eq!(attribute.size, 3);
        assert!(attribute.enabled);

        assert!(matches!(
            vao.set_vertex_attribute(&VertexAttribute::float(1, 5, 0, 0)),
            Err(ResourceError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn backend_failures_surface_as_errors() {
        let (device, gl) = device();
        gl.set_fail_allocations(true);
        assert!(matches!(
            device.create_texture(&TextureDescriptor::default()),
            Err(ResourceError::BackendError(_))
        ));
    }
}
