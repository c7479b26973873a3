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

//! Provides the public, backend-agnostic rendering contracts.
//!
//! This module defines the "common language" for all GPU work. It contains the
//! abstract `traits` (like [`RenderDevice`] and [`ShaderProgram`]), the
//! descriptors used to create resources (like [`BufferDescriptor`]), the error
//! hierarchy, and the [`reflection`] cache that maps uniform names to byte
//! offsets inside per-program uniform buffers.
//!
//! This module defines the 'what'. The 'how' lives in a concrete backend in
//! the `carrot-infra` crate (the OpenGL device), and the `carrot-renderer`
//! crate builds shaders and materials on top of these traits without knowing
//! which backend is active.

pub mod api;
pub mod error;
pub mod global;
pub mod reflection;
pub mod settings;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::error::{RenderError, ResourceError, ShaderError};
pub use self::global::{global_device, set_global_device};
pub use self::reflection::{
    BlockRole, BlockRoleMap, ProgramReflection, ReflectedBlock, UniformBlockInfo,
    UniformVarLocation, UniformVariableInfo,
};
pub use self::settings::RhiSettings;
pub use self::traits::{
    Buffer, BufferMapping, Framebuffer, ProcAddressLoader, RenderDevice, Resource, Shader,
    ShaderProgram, Texture, UniformBuffer, VertexArray,
};
