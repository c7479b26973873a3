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

//! # Carrot Renderer
//!
//! The layer the editor and game code talk to: a [`Shader`] owns a linked
//! program and knows how to upload per-frame and light data through the
//! program's reflected uniform blocks, a [`Material`] is a named parameter set
//! bound onto a shader, and a [`MaterialLibrary`] keeps materials by name.

#![warn(missing_docs)]

pub mod material;
pub mod material_library;
pub mod shader;

pub use self::material::{Material, ParameterValue};
pub use self::material_library::MaterialLibrary;
pub use self::shader::{Shader, ShaderState};
