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

//! The framebuffer descriptor.

/// A descriptor used to create a [`Framebuffer`](crate::rhi::Framebuffer).
///
/// The framebuffer creates and owns one RGBA8 color attachment of the given
/// size, plus a depth/stencil attachment when `has_depth_stencil` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferDescriptor {
    /// Width of the attachments in pixels.
    pub width: u32,
    /// Height of the attachments in pixels.
    pub height: u32,
    /// Whether a `Depth24Stencil8` attachment is created.
    pub has_depth_stencil: bool,
}

impl Default for FramebufferDescriptor {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            has_depth_stencil: true,
        }
    }
}
