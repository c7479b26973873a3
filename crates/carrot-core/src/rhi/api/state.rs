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

//! Fixed-function pipeline state: depth, blending, culling, viewport and clears.

use std::ops::BitOr;

/// Defines how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Every three vertices form an independent triangle.
    #[default]
    TriangleList,
    /// Each vertex after the first two forms a triangle with the previous two.
    TriangleStrip,
    /// Every two vertices form an independent line.
    LineList,
    /// Each vertex after the first forms a line with the previous one.
    LineStrip,
    /// Each vertex is a point.
    PointList,
}

/// A comparison function used for depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// The test never passes.
    Never,
    /// Passes if the new value is less than the existing value.
    #[default]
    Less,
    /// Passes if the new value is equal to the existing value.
    Equal,
    /// Passes if the new value is less than or equal to the existing value.
    LessEqual,
    /// Passes if the new value is greater than the existing value.
    Greater,
    /// Passes if the new value is not equal to the existing value.
    NotEqual,
    /// Passes if the new value is greater than or equal to the existing value.
    GreaterEqual,
    /// The test always passes.
    Always,
}

/// A factor applied to a color or alpha term in the blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// The operation combining the weighted source and destination terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOperation {
    /// `src + dst`
    #[default]
    Add,
    /// `src - dst`
    Subtract,
    /// `dst - src`
    ReverseSubtract,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

/// Which triangle faces are discarded before rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    #[default]
    None,
    /// Cull front-facing triangles.
    Front,
    /// Cull back-facing triangles.
    Back,
}

/// A rectangle in window coordinates, origin at the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: i32,
    /// Bottom edge in pixels.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Selects the attachments cleared by [`RenderDevice::clear`](crate::rhi::RenderDevice::clear).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClearFlags {
    bits: u32,
}

impl ClearFlags {
    /// Clear nothing.
    pub const NONE: Self = Self { bits: 0 };
    /// Clear the color attachment.
    pub const COLOR: Self = Self { bits: 1 << 0 };
    /// Clear the depth attachment.
    pub const DEPTH: Self = Self { bits: 1 << 1 };
    /// Clear the stencil attachment.
    pub const STENCIL: Self = Self { bits: 1 << 2 };
    /// Clear color and depth, the per-frame default.
    pub const COLOR_DEPTH: Self = Self {
        bits: Self::COLOR.bits | Self::DEPTH.bits,
    };

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if every flag in `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if no flag is set.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl BitOr for ClearFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A snapshot of the fixed-function state last applied by a device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineState {
    /// The active viewport.
    pub viewport: Viewport,
    /// The scissor rectangle.
    pub scissor: Viewport,
    /// Whether the depth test is enabled.
    pub depth_test: bool,
    /// Whether depth writes are enabled.
    pub depth_write: bool,
    /// The depth comparison function.
    pub depth_func: CompareFunction,
    /// Whether blending is enabled.
    pub blend: bool,
    /// Source blend factor.
    pub blend_src: BlendFactor,
    /// Destination blend factor.
    pub blend_dst: BlendFactor,
    /// Blend equation.
    pub blend_op: BlendOperation,
    /// Face culling mode.
    pub cull_mode: CullMode,
    /// The color used by color clears.
    pub clear_color: [f32; 4],
    /// The depth used by depth clears.
    pub clear_depth: f32,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            scissor: Viewport::default(),
            depth_test: false,
            depth_write: true,
            depth_func: CompareFunction::Less,
            blend: false,
            blend_src: BlendFactor::One,
            blend_dst: BlendFactor::Zero,
            blend_op: BlendOperation::Add,
            cull_mode: CullMode::None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_flags_combine() {
        let flags = ClearFlags::COLOR | ClearFlags::DEPTH;
        assert_eq!(flags, ClearFlags::COLOR_DEPTH);
        assert!(flags.contains(ClearFlags::COLOR));
        assert!(!flags.contains(ClearFlags::STENCIL));
        assert!(ClearFlags::NONE.is_empty());
    }

    #[test]
    fn pipeline_state_defaults_match_gl() {
        let state = PipelineState::default();
        assert!(!state.depth_test);
        assert!(state.depth_write);
        assert_eq!(state.depth_func, CompareFunction::Less);
        assert_eq!(state.blend_src, BlendFactor::One);
        assert_eq!(state.blend_dst, BlendFactor::Zero);
    }
}
