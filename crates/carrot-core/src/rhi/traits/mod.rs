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

//! Defines the core contracts of the render hardware interface.
//!
//! - [`RenderDevice`]: The factory for every GPU resource and the owner of pipeline state.
//! - [`Resource`]: The lifecycle shared by every resource (handle, validity, release).
//! - [`Buffer`], [`Shader`], [`ShaderProgram`], [`Texture`], [`Framebuffer`],
//!   [`VertexArray`], [`UniformBuffer`]: The typed resource interfaces.

mod device;
mod resource;

pub use self::device::{ProcAddressLoader, RenderDevice};
pub use self::resource::*;
