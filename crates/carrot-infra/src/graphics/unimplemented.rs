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

use carrot_core::rhi::*;
use std::cell::RefCell;
use std::rc::Rc;

/// The device handed out for graphics APIs without a backend.
///
/// `initialize` fails with [`RenderError::UnsupportedBackend`] and every
/// creation fails with [`ResourceError::Unsupported`]. State setters are
/// recorded so [`RenderDevice::pipeline_state`] stays meaningful; draws and
/// clears do nothing.
#[derive(Debug)]
pub struct UnimplementedDevice {
    api: GraphicsApi,
    state: RefCell<PipelineState>,
}

impl UnimplementedDevice {
    /// Creates the stand-in for `api`.
    pub fn new(api: GraphicsApi) -> Self {
        Self {
            api,
            state: RefCell::new(PipelineState::default()),
        }
    }

    fn unsupported<T: ?Sized>(&self) -> Result<Rc<T>, ResourceError> {
        log::error!("UnimplementedDevice: cannot create resources for {}", self.api);
        Err(ResourceError::Unsupported(self.api))
    }

    fn record(&self, update: impl FnOnce(&mut PipelineState)) {
        update(&mut *self.state.borrow_mut());
    }
}

impl RenderDevice for UnimplementedDevice {
    fn initialize(&self, _loader: ProcAddressLoader<'_>) -> Result<(), RenderError> {
        log::error!("UnimplementedDevice: the {} backend is not implemented", self.api);
        Err(RenderError::UnsupportedBackend(self.api))
    }

    fn shutdown(&self) {}

    fn is_initialized(&self) -> bool {
        false
    }

    fn graphics_api(&self) -> GraphicsApi {
        self.api
    }

    fn create_buffer(&self, _descriptor: &BufferDescriptor<'_>) -> Result<Rc<dyn Buffer>, ResourceError> {
        self.unsupported()
    }

    fn create_shader(&self, _descriptor: &ShaderDescriptor<'_>) -> Result<Rc<dyn Shader>, ResourceError> {
        self.unsupported()
    }

    fn create_shader_program(&self) -> Result<Rc<dyn ShaderProgram>, ResourceError> {
        self.unsupported()
    }

    fn create_texture(&self, _descriptor: &TextureDescriptor<'_>) -> Result<Rc<dyn Texture>, ResourceError> {
        self.unsupported()
    }

    fn create_framebuffer(&self, _descriptor: &FramebufferDescriptor) -> Result<Rc<dyn Framebuffer>, ResourceError> {
        self.unsupported()
    }

    fn create_vertex_array(&self) -> Result<Rc<dyn VertexArray>, ResourceError> {
        self.unsupported()
    }

    fn create_uniform_buffer(&self, _size: usize, _binding: u32) -> Result<Rc<dyn UniformBuffer>, ResourceError> {
        self.unsupported()
    }

    fn set_viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.record(|s| s.viewport = Viewport { x, y, width, height });
    }

    fn set_scissor(&self, x: i32, y: i32, width: u32, height: u32) {
        self.record(|s| s.scissor = Viewport { x, y, width, height });
    }

    fn set_depth_test(&self, enabled: bool) {
        self.record(|s| s.depth_test = enabled);
    }

    fn set_depth_write(&self, enabled: bool) {
        self.record(|s| s.depth_write = enabled);
    }

    fn set_depth_func(&self, func: CompareFunction) {
        self.record(|s| s.depth_func = func);
    }

    fn set_blend(&self, enabled: bool) {
        self.record(|s| s.blend = enabled);
    }

    fn set_blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        self.record(|s| {
            s.blend_src = src;
            s.blend_dst = dst;
        });
    }

    fn set_blend_op(&self, op: BlendOperation) {
        self.record(|s| s.blend_op = op);
    }

    fn set_cull_mode(&self, mode: CullMode) {
        self.record(|s| s.cull_mode = mode);
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(|s| s.clear_color = [r, g, b, a]);
    }

    fn clear_depth(&self, depth: f32) {
        self.record(|s| s.clear_depth = depth);
    }

    fn clear(&self, _flags: ClearFlags) {}

    fn draw(&self, _topology: PrimitiveTopology, _vertex_count: u32, _start_vertex: u32) {}

    fn draw_indexed(&self, _topology: PrimitiveTopology, _index_count: u32, _start_index: u32) {}

    fn pipeline_state(&self) -> PipelineState {
        *self.state.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_void;

    #[test]
    fn initialize_reports_unsupported_backend() {
        let device = UnimplementedDevice::new(GraphicsApi::DirectX12);
        let mut loader = |_: &str| std::ptr::null::<c_void>();
        assert_eq!(
            device.initialize(&mut loader),
            Err(RenderError::UnsupportedBackend(GraphicsApi::DirectX12))
        );
        assert!(!device.is_initialized());
    }

    #[test]
    fn creation_is_unsupported() {
        let device = UnimplementedDevice::new(GraphicsApi::Vulkan);
        assert!(matches!(
            device.create_shader_program(),
            Err(ResourceError::Unsupported(GraphicsApi::Vulkan))
        ));
        assert!(matches!(
            device.create_uniform_buffer(16, 0),
            Err(ResourceError::Unsupported(GraphicsApi::Vulkan))
        ));
    }

    #[test]
    fn state_is_recorded() {
        let device = UnimplementedDevice::new(GraphicsApi::Metal);
        device.set_blend(true);
        device.set_depth_func(CompareFunction::LessEqual);
        let state = device.pipeline_state();
        assert!(state.blend);
        assert_eq!(state.depth_func, CompareFunction::LessEqual);
    }
}
