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

//! Uniform block reflection for linked shader programs.
//!
//! After a successful link the backend enumerates the program's active
//! uniform blocks and uniforms ([`UniformBlockInfo`], [`UniformVariableInfo`]).
//! [`ProgramReflection::build`] turns that raw listing into a cache owned by
//! the program:
//!
//! 1. every block gets a unique binding point ([`BindingAllocator`]),
//! 2. every non-empty block gets one backing [`UniformBuffer`](crate::rhi::UniformBuffer)
//!    plus a CPU staging copy ([`ReflectedBlock`]),
//! 3. every block member is indexed by its full name, its bracket-stripped
//!    name and its short name ([`cache_keys`]),
//! 4. blocks are tagged with a [`BlockRole`] through a configurable [`BlockRoleMap`].
//!
//! Name lookups that miss the exact keys fall back to suffix matching
//! ([`resolve_uniform`]).

mod binding;
mod cache;
mod naming;
mod roles;

pub use self::binding::BindingAllocator;
pub use self::cache::{BlockBinder, ProgramReflection, ReflectedBlock};
pub use self::naming::{cache_keys, resolve_uniform, strip_array_suffix};
pub use self::roles::{BlockRole, BlockRoleMap, BlockRoleRule, NamePattern};

use crate::rhi::api::NativeHandle;

/// An active uniform block as enumerated by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformBlockInfo {
    /// The block name as declared in the shader (not the instance name).
    pub name: String,
    /// The backend's index for the block within the program.
    pub block_index: u32,
    /// The size of the block's data store in bytes.
    pub size: usize,
    /// The binding point. Before reflection this is the binding the shader
    /// declares (0 when none); afterwards it is the assigned binding.
    pub binding: u32,
}

/// An active uniform as enumerated by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformVariableInfo {
    /// The decorated name (`Block.member`, `lights[0].color`, ...).
    pub name: String,
    /// The block the uniform lives in. `None` for the default block.
    pub block_index: Option<u32>,
    /// Byte offset inside the block. `None` for the default block.
    pub offset: Option<u32>,
    /// Number of array elements, 1 for non-arrays.
    pub array_size: u32,
}

impl UniformVariableInfo {
    /// Returns `true` for uniforms stored in a uniform block.
    pub fn is_block_member(&self) -> bool {
        self.block_index.is_some() && self.offset.is_some()
    }
}

/// Where a block member lives: the backing buffer and the byte offset in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformVarLocation {
    /// Native handle of the uniform buffer backing the block.
    pub buffer: NativeHandle,
    /// Byte offset of the member inside that buffer.
    pub offset: u32,
}
