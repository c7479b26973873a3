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

//! Buffer kinds, usage hints and the buffer descriptor.

use std::borrow::Cow;

/// The binding target a buffer is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferType {
    /// Per-vertex attribute data.
    #[default]
    Vertex,
    /// Element indices (32-bit unsigned).
    Index,
    /// Uniform block storage.
    Uniform,
}

/// A hint describing how often the buffer contents change.
///
/// The driver uses it to place the buffer in the most suitable memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    /// Data is uploaded once and rarely changes.
    #[default]
    Static,
    /// Data changes occasionally.
    Dynamic,
    /// Data changes every frame.
    Stream,
}

/// A descriptor used to create a [`Buffer`](crate::rhi::Buffer).
///
/// When `initial_data` is provided its length must equal `size`.
#[derive(Debug, Clone, Default)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The binding target of the buffer.
    pub buffer_type: BufferType,
    /// How often the contents are expected to change.
    pub usage: BufferUsage,
    /// The total size of the buffer in bytes.
    pub size: usize,
    /// Bytes uploaded at creation. `None` leaves the storage uninitialized.
    pub initial_data: Option<&'a [u8]>,
}

impl<'a> BufferDescriptor<'a> {
    /// Creates a descriptor whose size and initial contents come from `data`.
    pub fn with_data(buffer_type: BufferType, usage: BufferUsage, data: &'a [u8]) -> Self {
        Self {
            label: None,
            buffer_type,
            usage,
            size: data.len(),
            initial_data: Some(data),
        }
    }
}
