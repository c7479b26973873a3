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
use super::conversions::IntoGl;
use carrot_core::rhi::{
    GraphicsApi, NativeHandle, Resource, ResourceError, RhiSettings, Shader, ShaderDescriptor,
    ShaderError, ShaderSource, ShaderStage,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug)]
enum StoredSource {
    Glsl(String),
    SpirV(Vec<u8>),
}

/// A single GLSL shader stage.
///
/// The source is kept so the shader can be compiled (or recompiled) at any time.
#[derive(Debug)]
pub struct GlShader {
    gl: Rc<dyn GlApi>,
    settings: Rc<RhiSettings>,
    handle: Cell<u32>,
    stage: ShaderStage,
    label: String,
    source: StoredSource,
    compiled: Cell<bool>,
    errors: RefCell<String>,
}

impl GlShader {
    pub(crate) fn new(
        gl: Rc<dyn GlApi>,
        settings: Rc<RhiSettings>,
        descriptor: &ShaderDescriptor<'_>,
    ) -> Result<Self, ResourceError> {
        let handle = gl
            .create_shader(descriptor.stage.into_gl())
            .map_err(ResourceError::BackendError)?;
        let source = match &descriptor.source {
            ShaderSource::Glsl(text) => StoredSource::Glsl(text.to_string()),
            ShaderSource::SpirV(bytes) => StoredSource::SpirV(bytes.to_vec()),
        };
        let label = descriptor
            .label
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?} shader #{handle}", descriptor.stage));
        log::debug!("GlShader: created '{label}'");
        Ok(Self {
            gl,
            settings,
            handle: Cell::new(handle),
            stage: descriptor.stage,
            label,
            source,
            compiled: Cell::new(false),
            errors: RefCell::new(String::new()),
        })
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn raw(&self) -> u32 {
        self.handle.get()
    }

    fn fail(&self, error: ShaderError) -> Result<(), ShaderError> {
        self.compiled.set(false);
        *self.errors.borrow_mut() = match &error {
            ShaderError::CompilationError { details, .. } => details.clone(),
            other => other.to_string(),
        };
        log::error!("GlShader: {error}");
        Err(error)
    }
}

impl Resource for GlShader {
    fn native_handle(&self) -> NativeHandle {
        NativeHandle::from_u32(self.handle.get())
    }

    fn release(&self) {
        let handle = self.handle.replace(0);
        if handle != 0 {
            self.gl.delete_shader(handle);
            self.compiled.set(false);
            log::debug!("GlShader: released '{}'", self.label);
        }
    }

    fn backend(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }
}

impl Shader for GlShader {
    fn compile(&self) -> Result<(), ShaderError> {
        let handle = self.handle.get();
        if handle == 0 {
            return self.fail(ShaderError::CompilationError {
                label: self.label.clone(),
                details: "shader has been released".to_string(),
            });
        }
        let text = match &self.source {
            StoredSource::Glsl(text) => text,
            StoredSource::SpirV(bytes) => {
                return self.fail(ShaderError::UnsupportedSource {
                    backend: GraphicsApi::OpenGl,
                    reason: format!("{}-byte SPIR-V module needs GL_ARB_gl_spirv", bytes.len()),
                });
            }
        };

        self.gl.shader_source(handle, text);
        self.gl.compile_shader(handle);
        if !self.gl.shader_compile_status(handle) {
            let details = self.settings.clamp_info_log(self.gl.shader_info_log(handle));
            return self.fail(ShaderError::CompilationError {
                label: self.label.clone(),
                details,
            });
        }

        self.errors.borrow_mut().clear();
        self.compiled.set(true);
        log::debug!("GlShader: compiled '{}'", self.label);
        Ok(())
    }

    fn compile_errors(&self) -> String {
        self.errors.borrow().clone()
    }

    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn is_compiled(&self) -> bool {
        self.compiled.get()
    }
}

impl Drop for GlShader {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::opengl::HeadlessGl;
    use std::borrow::Cow;

    fn shader(source: ShaderSource<'_>) -> GlShader {
        let descriptor = ShaderDescriptor {
            label: Some("test.frag"),
            stage: ShaderStage::Fragment,
            source,
            entry_point: "main",
        };
        GlShader::new(Rc::new(HeadlessGl::new()), Rc::new(RhiSettings::default()), &descriptor)
            .unwrap()
    }

    #[test]
    fn compile_success_clears_errors() {
        let shader = shader(ShaderSource::Glsl(Cow::Borrowed("void main() {}")));
        shader.compile().unwrap();
        assert!(shader.is_compiled());
        assert!(shader.compile_errors().is_empty());
    }

    #[test]
    fn compile_failure_keeps_the_log() {
        let shader = shader(ShaderSource::Glsl(Cow::Borrowed("void main() {")));
        let err = shader.compile().unwrap_err();
        assert!(matches!(err, ShaderError::CompilationError { ref label, .. } if label == "test.frag"));
        assert!(!shader.is_compiled());
        assert!(shader.compile_errors().contains("error"));
    }

    #[test]
    fn spirv_is_rejected() {
        let shader = shader(ShaderSource::SpirV(Cow::Owned(vec![3, 2, 35, 7])));
        assert!(matches!(
            shader.compile(),
            Err(ShaderError::UnsupportedSource { backend: GraphicsApi::OpenGl, .. })
        ));
        assert!(shader.compile_errors().contains("SPIR-V"));
    }
}
