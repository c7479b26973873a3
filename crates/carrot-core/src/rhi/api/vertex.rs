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

//! Vertex attribute layout.

/// Describes a single vertex attribute fed from a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexAttribute {
    /// The input location in the vertex shader (e.g. `layout(location = 0)`).
    pub location: u32,
    /// The vertex buffer binding slot the attribute reads from.
    pub binding: u32,
    /// Byte offset of the attribute from the start of the vertex.
    pub offset: u32,
    /// Number of `f32` components, 1 to 4.
    pub component_count: u32,
    /// Byte distance between consecutive vertices. 0 means tightly packed.
    pub stride: u32,
    /// Whether integer data is normalized to `[0, 1]` / `[-1, 1]`.
    pub normalized: bool,
}

impl VertexAttribute {
    /// Creates a non-normalized float attribute.
    pub const fn float(location: u32, component_count: u32, offset: u32, stride: u32) -> Self {
        Self {
            location,
            binding: 0,
            offset,
            component_count,
            stride,
            normalized: false,
        }
    }

    /// Returns `true` when the component count is one GL accepts.
    pub const fn is_valid(&self) -> bool {
        self.component_count >= 1 && self.component_count <= 4
    }
}
