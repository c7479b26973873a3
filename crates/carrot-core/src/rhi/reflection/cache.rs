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

use super::binding::BindingAllocator;
use super::naming::{cache_keys, resolve_uniform};
use super::roles::{BlockRole, BlockRoleMap};
use super::{UniformBlockInfo, UniformVarLocation, UniformVariableInfo};
use crate::rhi::api::NativeHandle;
use crate::rhi::error::ResourceError;
use crate::rhi::traits::{Resource, UniformBuffer};
use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// The backend operations reflection needs while building a cache.
pub trait BlockBinder {
    /// Points block `block_index` of the program at binding `binding`.
    fn set_block_binding(&self, block_index: u32, binding: u32);

    /// Creates a uniform buffer of `size` bytes bound to `binding`.
    /// ## Errors
    /// Any `ResourceError` from the device; the block is then left without a buffer.
    fn allocate_block_buffer(
        &self,
        size: usize,
        binding: u32,
    ) -> Result<Rc<dyn UniformBuffer>, ResourceError>;
}

/// One uniform block of a linked program, with its backing buffer and a
/// CPU staging copy of the block contents.
///
/// Writes land in the staging copy first; [`ReflectedBlock::flush`] pushes
/// the whole block to the GPU in a single update.
#[derive(Debug)]
pub struct ReflectedBlock {
    info: UniformBlockInfo,
    role: Option<BlockRole>,
    buffer: Option<Rc<dyn UniformBuffer>>,
    staging: RefCell<Vec<u8>>,
    dirty: Cell<bool>,
}

impl ReflectedBlock {
    fn new(info: UniformBlockInfo, role: Option<BlockRole>, buffer: Option<Rc<dyn UniformBuffer>>) -> Self {
        let staging = vec![0u8; info.size];
        Self {
            info,
            role,
            buffer,
            staging: RefCell::new(staging),
            dirty: Cell::new(false),
        }
    }

    /// The block name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// The backend block index.
    pub fn block_index(&self) -> u32 {
        self.info.block_index
    }

    /// The binding point assigned during reflection.
    pub fn binding(&self) -> u32 {
        self.info.binding
    }

    /// The block size in bytes.
    pub fn size(&self) -> usize {
        self.info.size
    }

    /// The role assigned by the [`BlockRoleMap`], if any.
    pub fn role(&self) -> Option<BlockRole> {
        self.role
    }

    /// The backing buffer. `None` for empty blocks or failed allocations.
    pub fn buffer(&self) -> Option<&Rc<dyn UniformBuffer>> {
        self.buffer.as_ref()
    }

    /// Native handle of the backing buffer, [`NativeHandle::NULL`] without one.
    pub fn buffer_handle(&self) -> NativeHandle {
        self.buffer
            .as_ref()
            .map_or(NativeHandle::NULL, |buffer| buffer.native_handle())
    }

    /// The reflected info with the assigned binding.
    pub fn info(&self) -> &UniformBlockInfo {
        &self.info
    }

    /// The current staging contents.
    pub fn staging(&self) -> Ref<'_, [u8]> {
        Ref::map(self.staging.borrow(), Vec::as_slice)
    }

    /// Returns `true` if the staging copy has writes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Zeroes the staging copy and marks it for upload.
    pub fn clear(&self) {
        self.staging.borrow_mut().fill(0);
        self.dirty.set(true);
    }

    /// Copies `bytes` into the staging copy at `offset`.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write runs past the block end.
    pub fn write(&self, offset: u32, bytes: &[u8]) -> Result<(), ResourceError> {
        let offset = offset as usize;
        let mut staging = self.staging.borrow_mut();
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= staging.len())
            .ok_or(ResourceError::OutOfBounds {
                offset,
                len: bytes.len(),
                size: staging.len(),
            })?;
        staging[offset..end].copy_from_slice(bytes);
        self.dirty.set(true);
        Ok(())
    }

    /// Copies a plain value (a matrix, a vector, a scalar) into the staging copy.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the value runs past the block end.
    pub fn write_value<T: bytemuck::NoUninit>(&self, offset: u32, value: &T) -> Result<(), ResourceError> {
        self.write(offset, bytemuck::bytes_of(value))
    }

    /// Uploads the staging copy if it has pending writes.
    ///
    /// Returns `true` when an upload happened.
    /// ## Errors
    /// Propagates the buffer's update error; the block stays dirty.
    pub fn flush(&self) -> Result<bool, ResourceError> {
        if !self.dirty.get() {
            return Ok(false);
        }
        let Some(buffer) = self.buffer.as_ref() else {
            return Ok(false);
        };
        buffer.update(&self.staging.borrow(), 0)?;
        self.dirty.set(false);
        Ok(true)
    }

    /// Replaces the start of the block with `bytes` and uploads immediately.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `bytes` is larger than the block.
    pub fn upload(&self, bytes: &[u8]) -> Result<(), ResourceError> {
        self.write(0, bytes)?;
        self.flush().map(|_| ())
    }
}

/// The reflection cache of one linked program.
///
/// Built once per successful link and owned by the program; dropping it
/// releases the block buffers.
#[derive(Debug, Default)]
pub struct ProgramReflection {
    blocks: Vec<ReflectedBlock>,
    slot_buffers: Vec<NativeHandle>,
    vars: BTreeMap<String, UniformVarLocation>,
}

impl ProgramReflection {
    /// Builds the cache from a backend listing.
    ///
    /// ## Arguments
    /// * `blocks` - Active uniform blocks in enumeration order, with their declared bindings.
    /// * `variables` - Active uniforms. Default-block uniforms are ignored.
    /// * `roles` - Decides each block's [`BlockRole`].
    /// * `binder` - Applies bindings and allocates one buffer per non-empty block.
    pub fn build(
        blocks: &[UniformBlockInfo],
        variables: &[UniformVariableInfo],
        roles: &BlockRoleMap,
        binder: &dyn BlockBinder,
    ) -> Self {
        let mut allocator = BindingAllocator::new();
        let mut reflection = Self::default();

        for block in blocks {
            let binding = allocator.assign(block.binding);
            binder.set_block_binding(block.block_index, binding);

            let buffer = if block.size > 0 {
                match binder.allocate_block_buffer(block.size, binding) {
                    Ok(buffer) => Some(buffer),
                    Err(e) => {
                        log::error!(
                            "Failed to allocate uniform buffer for block '{}' (binding {}): {}",
                            block.name,
                            binding,
                            e
                        );
                        None
                    }
                }
            } else {
                None
            };

            if let Some(buffer) = buffer.as_ref() {
                let slot = binding as usize;
                if reflection.slot_buffers.len() <= slot {
                    reflection.slot_buffers.resize(slot + 1, NativeHandle::NULL);
                }
                reflection.slot_buffers[slot] = buffer.native_handle();
            }

            let info = UniformBlockInfo {
                binding,
                ..block.clone()
            };
            let role = roles.classify(&info.name);
            log::debug!(
                "Uniform block '{}' (index {}) -> binding {}, {} bytes, role {:?}",
                info.name,
                info.block_index,
                binding,
                info.size,
                role
            );
            reflection.blocks.push(ReflectedBlock::new(info, role, buffer));
        }

        let members: Vec<(&str, UniformVarLocation)> = variables
            .iter()
            .filter_map(|var| {
                let (Some(block_index), Some(offset)) = (var.block_index, var.offset) else {
                    return None;
                };
                let buffer = reflection
                    .blocks
                    .iter()
                    .find(|b| b.block_index() == block_index)
                    .and_then(ReflectedBlock::buffer)?;
                let location = UniformVarLocation {
                    buffer: buffer.native_handle(),
                    offset,
                };
                Some((var.name.as_str(), location))
            })
            .collect();

        // Full names first so a derived name can never take a key that is
        // some member's full name. Within each pass the first entry wins.
        for &(name, location) in &members {
            reflection.vars.entry(name.to_string()).or_insert(location);
        }
        for &(name, location) in &members {
            for key in cache_keys(name).into_iter().skip(1) {
                reflection.vars.entry(key.to_string()).or_insert(location);
            }
        }

        reflection
    }

    /// All reflected blocks in enumeration order.
    pub fn blocks(&self) -> &[ReflectedBlock] {
        &self.blocks
    }

    /// The first block with a buffer that carries `role`.
    pub fn block_by_role(&self, role: BlockRole) -> Option<&ReflectedBlock> {
        self.blocks
            .iter()
            .find(|b| b.role == Some(role) && b.buffer.is_some())
    }

    /// The block called `name`.
    pub fn block_by_name(&self, name: &str) -> Option<&ReflectedBlock> {
        self.blocks.iter().find(|b| b.name() == name)
    }

    /// The block backed by the buffer `handle`.
    pub fn block_for_buffer(&self, handle: NativeHandle) -> Option<&ReflectedBlock> {
        if handle.is_null() {
            return None;
        }
        self.blocks.iter().find(|b| b.buffer_handle() == handle)
    }

    /// Exact-key lookup.
    pub fn lookup(&self, name: &str) -> Option<UniformVarLocation> {
        self.vars.get(name).copied()
    }

    /// Resolves `field` through all lookup tiers.
    pub fn resolve(&self, field: &str) -> Option<UniformVarLocation> {
        resolve_uniform(field, &self.vars, |_| true).map(|(_, loc)| *loc)
    }

    /// Resolves `field` among the members of `block` and returns its offset.
    pub fn resolve_in_block(&self, block: &ReflectedBlock, field: &str) -> Option<u32> {
        let handle = block.buffer_handle();
        if handle.is_null() {
            return None;
        }
        resolve_uniform(field, &self.vars, |loc| loc.buffer == handle).map(|(_, loc)| loc.offset)
    }

    /// The byte offset of `field`, through all lookup tiers.
    pub fn offset_of(&self, field: &str) -> Option<u32> {
        self.resolve(field).map(|loc| loc.offset)
    }

    /// Buffer handles indexed by binding point. Unused bindings hold [`NativeHandle::NULL`].
    pub fn slot_buffers(&self) -> &[NativeHandle] {
        &self.slot_buffers
    }

    /// The number of allocated block buffers.
    pub fn buffer_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.buffer.is_some()).count()
    }

    /// Every cached name with its location, in key order.
    pub fn variables(&self) -> impl Iterator<Item = (&str, &UniformVarLocation)> {
        self.vars.iter().map(|(name, loc)| (name.as_str(), loc))
    }

    /// Returns `true` when no block received a buffer.
    pub fn is_empty(&self) -> bool {
        self.buffer_count() == 0
    }

    /// Dumps the variable cache at trace level.
    pub fn log_summary(&self, program: NativeHandle) {
        if self.is_empty() {
            return;
        }
        log::trace!("Uniform cache for program {}:", program);
        for (name, loc) in &self.vars {
            log::trace!("  - {} (buffer {}, offset {})", name, loc.buffer, loc.offset);
        }
    }
}
