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

//! A name-keyed registry of materials.

use crate::material::Material;
use crate::shader::Shader;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Owns materials by name. Iteration is in name order.
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: BTreeMap<String, Rc<RefCell<Material>>>,
}

impl MaterialLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a material named `name` using `shader`.
    ///
    /// An existing material of the same name is replaced; handles to the old
    /// one stay valid but are no longer reachable through the library.
    pub fn create(&mut self, name: &str, shader: Rc<Shader>) -> Rc<RefCell<Material>> {
        let material = Rc::new(RefCell::new(Material::new(name, shader)));
        if self
            .materials
            .insert(name.to_owned(), Rc::clone(&material))
            .is_some()
        {
            log::warn!("MaterialLibrary: replaced existing material '{name}'");
        } else {
            log::debug!("MaterialLibrary: created material '{name}'");
        }
        material
    }

    /// Looks a material up by name.
    pub fn get(&self, name: &str) -> Option<Rc<RefCell<Material>>> {
        self.materials.get(name).cloned()
    }

    /// Removes a material and returns it.
    pub fn remove(&mut self, name: &str) -> Option<Rc<RefCell<Material>>> {
        self.materials.remove(name)
    }

    /// Returns `true` if a material named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    /// The material names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }

    /// The materials in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<RefCell<Material>>)> {
        self.materials.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The number of materials.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Returns `true` when the library holds no material.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Drops every material.
    pub fn clear(&mut self) {
        self.materials.clear();
    }
}
