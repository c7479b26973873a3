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

use carrot_core::rhi::{
    BlendFactor, BlendOperation, BufferType, BufferUsage, ClearFlags, CompareFunction, CullMode,
    PrimitiveTopology, ShaderStage, TextureFilter, TextureFormat, TextureWrap,
};

/// A local extension trait to convert the RHI types into OpenGL enums.
/// This keeps an idiomatic `.into_gl()` syntax next to the call sites.
pub trait IntoGl<T> {
    /// Consumes self and converts it into an OpenGL value.
    fn into_gl(self) -> T;
}

/// The three enums `glTexImage2D` needs to describe a texel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlTextureFormat {
    pub internal_format: i32,
    pub format: u32,
    pub ty: u32,
}

// --- Buffers ---

impl IntoGl<u32> for BufferType {
    fn into_gl(self) -> u32 {
        match self {
            BufferType::Vertex => glow::ARRAY_BUFFER,
            BufferType::Index => glow::ELEMENT_ARRAY_BUFFER,
            BufferType::Uniform => glow::UNIFORM_BUFFER,
        }
    }
}

impl IntoGl<u32> for BufferUsage {
    fn into_gl(self) -> u32 {
        match self {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
            BufferUsage::Stream => glow::STREAM_DRAW,
        }
    }
}

// --- Shaders ---

impl IntoGl<u32> for ShaderStage {
    fn into_gl(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
            ShaderStage::Compute => glow::COMPUTE_SHADER,
        }
    }
}

// --- Textures ---

impl IntoGl<GlTextureFormat> for TextureFormat {
    fn into_gl(self) -> GlTextureFormat {
        let (internal_format, format, ty) = match self {
            TextureFormat::Rgb8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
            TextureFormat::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
            TextureFormat::Rgba16Float => (glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
            TextureFormat::Rgba32Float => (glow::RGBA32F, glow::RGBA, glow::FLOAT),
            TextureFormat::Depth24Stencil8 => (
                glow::DEPTH24_STENCIL8,
                glow::DEPTH_STENCIL,
                glow::UNSIGNED_INT_24_8,
            ),
            TextureFormat::Depth32Float => {
                (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT)
            }
        };
        GlTextureFormat {
            internal_format: internal_format as i32,
            format,
            ty,
        }
    }
}

impl IntoGl<i32> for TextureFilter {
    fn into_gl(self) -> i32 {
        (match self {
            TextureFilter::Nearest => glow::NEAREST,
            TextureFilter::Linear => glow::LINEAR,
            TextureFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
            TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
        }) as i32
    }
}

impl IntoGl<i32> for TextureWrap {
    fn into_gl(self) -> i32 {
        (match self {
            TextureWrap::Repeat => glow::REPEAT,
            TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
            TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        }) as i32
    }
}

// --- Pipeline state ---

impl IntoGl<u32> for PrimitiveTopology {
    fn into_gl(self) -> u32 {
        match self {
            PrimitiveTopology::TriangleList => glow::TRIANGLES,
            PrimitiveTopology::TriangleStrip => glow::TRIANGLE_STRIP,
            PrimitiveTopology::LineList => glow::LINES,
            PrimitiveTopology::LineStrip => glow::LINE_STRIP,
            PrimitiveTopology::PointList => glow::POINTS,
        }
    }
}

impl IntoGl<u32> for CompareFunction {
    fn into_gl(self) -> u32 {
        match self {
            CompareFunction::Never => glow::NEVER,
            CompareFunction::Less => glow::LESS,
            CompareFunction::Equal => glow::EQUAL,
            CompareFunction::LessEqual => glow::LEQUAL,
            CompareFunction::Greater => glow::GREATER,
            CompareFunction::NotEqual => glow::NOTEQUAL,
            CompareFunction::GreaterEqual => glow::GEQUAL,
            CompareFunction::Always => glow::ALWAYS,
        }
    }
}

impl IntoGl<u32> for BlendFactor {
    fn into_gl(self) -> u32 {
        match self {
            BlendFactor::Zero => glow::ZERO,
            BlendFactor::One => glow::ONE,
            BlendFactor::SrcColor => glow::SRC_COLOR,
            BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
            BlendFactor::DstColor => glow::DST_COLOR,
            BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
            BlendFactor::SrcAlpha => glow::SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DstAlpha => glow::DST_ALPHA,
            BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        }
    }
}

impl IntoGl<u32> for BlendOperation {
    fn into_gl(self) -> u32 {
        match self {
            BlendOperation::Add => glow::FUNC_ADD,
            BlendOperation::Subtract => glow::FUNC_SUBTRACT,
            BlendOperation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
            BlendOperation::Min => glow::MIN,
            BlendOperation::Max => glow::MAX,
        }
    }
}

/// `None` means face culling is disabled.
impl IntoGl<Option<u32>> for CullMode {
    fn into_gl(self) -> Option<u32> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(glow::FRONT),
            CullMode::Back => Some(glow::BACK),
        }
    }
}

impl IntoGl<u32> for ClearFlags {
    fn into_gl(self) -> u32 {
        let mut mask = 0;
        if self.contains(ClearFlags::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if self.contains(ClearFlags::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if self.contains(ClearFlags::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_flags_to_mask() {
        let mask: u32 = (ClearFlags::COLOR | ClearFlags::DEPTH).into_gl();
        assert_eq!(mask, glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        let none: u32 = ClearFlags::NONE.into_gl();
        assert_eq!(none, 0);
    }

    #[test]
    fn cull_none_disables_culling() {
        let mode: Option<u32> = CullMode::None.into_gl();
        assert_eq!(mode, None);
        let back: Option<u32> = CullMode::Back.into_gl();
        assert_eq!(back, Some(glow::BACK));
    }

    #[test]
    fn depth_format_uses_packed_type() {
        let gl: GlTextureFormat = TextureFormat::Depth24Stencil8.into_gl();
        assert_eq!(gl.internal_format, glow::DEPTH24_STENCIL8 as i32);
        assert_eq!(gl.format, glow::DEPTH_STENCIL);
        assert_eq!(gl.ty, glow::UNSIGNED_INT_24_8);
    }
}
