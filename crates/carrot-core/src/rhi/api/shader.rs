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

//! Shader stages, source payloads and the shader descriptor.

use std::borrow::Cow;

/// Defines the programmable stage in the graphics pipeline a shader is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex shader stage.
    Vertex,
    /// The fragment (or pixel) shader stage.
    Fragment,
    /// The geometry shader stage.
    Geometry,
    /// The compute shader stage.
    Compute,
}

/// The shader payload handed to the backend compiler.
#[derive(Debug, Clone)]
pub enum ShaderSource<'a> {
    /// GLSL source text.
    Glsl(Cow<'a, str>),
    /// A SPIR-V binary module.
    SpirV(Cow<'a, [u8]>),
}

impl ShaderSource<'_> {
    /// Returns `true` for binary payloads.
    pub fn is_binary(&self) -> bool {
        matches!(self, ShaderSource::SpirV(_))
    }
}

/// A descriptor used to create a [`Shader`](crate::rhi::Shader).
#[derive(Debug, Clone)]
pub struct ShaderDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The stage the shader runs in.
    pub stage: ShaderStage,
    /// The source text or binary.
    pub source: ShaderSource<'a>,
    /// The entry point, used by binary formats. GLSL always enters at `main`.
    pub entry_point: &'a str,
}

impl<'a> ShaderDescriptor<'a> {
    /// Creates a descriptor for a GLSL shader.
    pub fn glsl(stage: ShaderStage, source: &'a str) -> Self {
        Self {
            label: None,
            stage,
            source: ShaderSource::Glsl(Cow::Borrowed(source)),
            entry_point: "main",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glsl_descriptor_creation() {
        let source_code = "void main() {}";
        let descriptor = ShaderDescriptor::glsl(ShaderStage::Fragment, source_code);

        assert_eq!(descriptor.stage, ShaderStage::Fragment);
        assert_eq!(descriptor.entry_point, "main");
        assert!(!descriptor.source.is_binary());
        let ShaderSource::Glsl(ref text) = descriptor.source else {
            panic!("expected a GLSL payload");
        };
        assert_eq!(text.as_ref(), source_code);
    }

    #[test]
    fn spirv_is_binary() {
        let source = ShaderSource::SpirV(Cow::Owned(vec![0x03, 0x02, 0x23, 0x07]));
        assert!(source.is_binary());
    }
}
