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

//! Graphics API identifiers and opaque native handles.

use std::fmt;

/// A backend-agnostic representation of a graphics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum GraphicsApi {
    /// OpenGL 3.3+ core profile.
    #[default]
    OpenGl,
    /// Vulkan API.
    Vulkan,
    /// Microsoft's DirectX 11 API.
    DirectX11,
    /// Microsoft's DirectX 12 API.
    DirectX12,
    /// Apple's Metal API.
    Metal,
}

impl fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphicsApi::OpenGl => "OpenGL",
            GraphicsApi::Vulkan => "Vulkan",
            GraphicsApi::DirectX11 => "Direct3D 11",
            GraphicsApi::DirectX12 => "Direct3D 12",
            GraphicsApi::Metal => "Metal",
        };
        f.write_str(name)
    }
}

/// The backend-specific identifier wrapped by a resource.
///
/// For OpenGL this is the object name returned by `glGen*` / `glCreate*`.
/// Zero means "not created" or "released".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    /// The handle of a resource that does not exist (never created, or released).
    pub const NULL: Self = Self(0);

    /// Returns `true` if this handle refers to no backend object.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Builds a handle from a 32-bit object name.
    pub const fn from_u32(raw: u32) -> Self {
        Self(raw as u64)
    }

    /// Returns the handle as a 32-bit object name.
    ///
    /// Handles created by 32-bit backends always fit; anything larger maps to 0.
    pub fn as_u32(self) -> u32 {
        u32::try_from(self.0).unwrap_or(0)
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
