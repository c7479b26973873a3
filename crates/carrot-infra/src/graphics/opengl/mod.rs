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

//! The OpenGL backend.
//!
//! Every GL call goes through the [`GlApi`] function table. [`GlowContext`]
//! implements it on top of a real context loaded with `glow`;
//! [`HeadlessGl`] implements it in software so the backend runs without a GPU.

mod api;
mod buffer;
mod conversions;
mod device;
mod framebuffer;
mod glow_api;
pub mod headless;
mod program;
mod shader;
mod texture;
mod vertex_array;

pub use self::api::GlApi;
pub use self::buffer::{GlBuffer, GlUniformBuffer};
pub use self::device::OpenGlDevice;
pub use self::framebuffer::GlFramebuffer;
pub use self::glow_api::GlowContext;
pub use self::headless::HeadlessGl;
pub use self::program::GlProgram;
pub use self::shader::GlShader;
pub use self::texture::GlTexture;
pub use self::vertex_array::GlVertexArray;
