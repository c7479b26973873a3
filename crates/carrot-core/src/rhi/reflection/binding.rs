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

use std::collections::BTreeSet;

/// Hands out unique uniform binding points within one program.
///
/// A block keeps the binding it declares when no earlier block took it;
/// otherwise it gets the lowest binding still free.
#[derive(Debug, Default, Clone)]
pub struct BindingAllocator {
    used: BTreeSet<u32>,
}

impl BindingAllocator {
    /// Creates an allocator with no binding in use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves and returns a binding, preferring `declared`.
    pub fn assign(&mut self, declared: u32) -> u32 {
        let binding = if self.used.contains(&declared) {
            (0..).find(|b| !self.used.contains(b)).unwrap_or(declared)
        } else {
            declared
        };
        self.used.insert(binding);
        binding
    }

    /// Returns `true` if `binding` has been handed out.
    pub fn is_used(&self, binding: u32) -> bool {
        self.used.contains(&binding)
    }

    /// The number of bindings handed out.
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Returns `true` if no binding has been handed out.
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_binding_is_kept_when_free() {
        let mut alloc = BindingAllocator::new();
        assert_eq!(alloc.assign(3), 3);
        assert_eq!(alloc.assign(1), 1);
        assert!(alloc.is_used(3));
        assert_eq!(alloc.len(), 2);
    }

    #[test]
    fn collision_takes_lowest_free_binding() {
        let mut alloc = BindingAllocator::new();
        assert_eq!(alloc.assign(0), 0);
        assert_eq!(alloc.assign(0), 1);
        assert_eq!(alloc.assign(2), 2);
        assert_eq!(alloc.assign(1), 3);
    }

    #[test]
    fn n_blocks_get_n_distinct_bindings() {
        let mut alloc = BindingAllocator::new();
        let bindings: BTreeSet<u32> = (0..8).map(|_| alloc.assign(0)).collect();
        assert_eq!(bindings.len(), 8);
        assert_eq!(bindings, (0..8).collect());
    }
}
