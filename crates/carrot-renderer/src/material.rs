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

//! Named shader parameters and their per-bind upload.

use crate::shader::Shader;
use carrot_core::rhi::{
    NativeHandle, ProgramReflection, ReflectedBlock, ResourceError, ShaderProgram, Texture,
};
use std::collections::BTreeMap;
use std::rc::Rc;

/// The value of one material parameter.
#[derive(Debug, Clone)]
pub enum ParameterValue {
    /// A `float`.
    Float(f32),
    /// A `vec2`.
    Vec2([f32; 2]),
    /// A `vec3`.
    Vec3([f32; 3]),
    /// A `vec4`.
    Vec4([f32; 4]),
    /// An `int`.
    Int(i32),
    /// A `bool`, packed as a 4-byte int inside blocks.
    Bool(bool),
    /// A column-major `mat4`.
    Matrix4([f32; 16]),
    /// A sampled 2D texture. Never packed into a block.
    Texture2D(Rc<dyn Texture>),
}

impl ParameterValue {
    /// The number of bytes the value occupies inside a uniform block.
    pub fn byte_size(&self) -> usize {
        match self {
            ParameterValue::Float(_) | ParameterValue::Int(_) | ParameterValue::Bool(_) => 4,
            ParameterValue::Vec2(_) => 8,
            ParameterValue::Vec3(_) => 12,
            ParameterValue::Vec4(_) => 16,
            ParameterValue::Matrix4(_) => 64,
            ParameterValue::Texture2D(_) => 0,
        }
    }

    /// The raw bytes written into a uniform block. `None` for textures.
    pub fn packed_bytes(&self) -> Option<Vec<u8>> {
        let bytes = match self {
            ParameterValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Vec2(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Vec3(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Vec4(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Int(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Bool(v) => bytemuck::bytes_of(&i32::from(*v)).to_vec(),
            ParameterValue::Matrix4(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Texture2D(_) => return None,
        };
        Some(bytes)
    }

    /// Writes the value through the program's default-block setter.
    /// Textures are handled by [`Material::bind`] and ignored here.
    fn apply(&self, program: &dyn ShaderProgram, name: &str) {
        match self {
            ParameterValue::Float(v) => program.set_uniform_float(name, *v),
            ParameterValue::Vec2([x, y]) => program.set_uniform_vec2(name, *x, *y),
            ParameterValue::Vec3([x, y, z]) => program.set_uniform_vec3(name, *x, *y, *z),
            ParameterValue::Vec4([x, y, z, w]) => program.set_uniform_vec4(name, *x, *y, *z, *w),
            ParameterValue::Int(v) => program.set_uniform_int(name, *v),
            ParameterValue::Bool(v) => program.set_uniform_bool(name, *v),
            ParameterValue::Matrix4(m) => program.set_uniform_matrix4(name, m),
            ParameterValue::Texture2D(_) => {}
        }
    }
}

/// A shader plus the parameter values it is drawn with.
///
/// Parameters are kept sorted by name, which is also the order they are
/// uploaded and texture units are handed out in.
#[derive(Debug)]
pub struct Material {
    name: String,
    shader: Rc<Shader>,
    parameters: BTreeMap<String, ParameterValue>,
}

impl Material {
    /// Creates a material with no parameters.
    pub fn new(name: impl Into<String>, shader: Rc<Shader>) -> Self {
        Self {
            name: name.into(),
            shader,
            parameters: BTreeMap::new(),
        }
    }

    /// The material's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shader the material draws with.
    pub fn shader(&self) -> &Rc<Shader> {
        &self.shader
    }

    /// Sets a parameter, replacing any previous value of that name.
    pub fn set_parameter(&mut self, name: &str, value: ParameterValue) {
        match self.parameters.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.parameters.insert(name.to_owned(), value);
            }
        }
    }

    /// Sets a `float` parameter.
    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set_parameter(name, ParameterValue::Float(value));
    }

    /// Sets a `vec2` parameter.
    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) {
        self.set_parameter(name, ParameterValue::Vec2(value));
    }

    /// Sets a `vec3` parameter.
    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) {
        self.set_parameter(name, ParameterValue::Vec3(value));
    }

    /// Sets a `vec4` parameter.
    pub fn set_vec4(&mut self, name: &str, value: [f32; 4]) {
        self.set_parameter(name, ParameterValue::Vec4(value));
    }

    /// Sets an `int` parameter.
    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set_parameter(name, ParameterValue::Int(value));
    }

    /// Sets a `bool` parameter.
    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set_parameter(name, ParameterValue::Bool(value));
    }

    /// Sets a column-major `mat4` parameter.
    pub fn set_matrix4(&mut self, name: &str, value: [f32; 16]) {
        self.set_parameter(name, ParameterValue::Matrix4(value));
    }

    /// Sets a sampler parameter. The material keeps the texture alive.
    pub fn set_texture(&mut self, name: &str, texture: Rc<dyn Texture>) {
        self.set_parameter(name, ParameterValue::Texture2D(texture));
    }

    /// The current value of a parameter.
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(name)
    }

    /// Removes a parameter and returns its last value.
    pub fn remove_parameter(&mut self, name: &str) -> Option<ParameterValue> {
        self.parameters.remove(name)
    }

    /// The parameters in upload order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The number of parameters.
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Binds the shader and uploads every parameter.
    ///
    /// Every block a parameter resolves into starts from zeroes, so members
    /// this material does not set never keep another material's values. Block
    /// members are written into that block's staging copy and each touched
    /// block is uploaded once. The rest go through one default-block uniform
    /// call each, as do values too large for the member they resolve to.
    /// Textures are bound to consecutive units from 0 and their sampler is
    /// set to the unit.
    /// ## Errors
    /// Returns the first failed block upload, after every touched block was
    /// attempted.
    pub fn bind(&self) -> Result<(), ResourceError> {
        if !self.shader.is_linked() {
            log::warn!("Material: '{}' bound with an unlinked shader", self.name);
            return Ok(());
        }
        self.shader.bind();
        let Some(program) = self.shader.program() else {
            return Ok(());
        };
        let reflection = program.reflection();
        let mut touched: Vec<NativeHandle> = Vec::new();
        let mut unit = 0u32;

        for (name, value) in &self.parameters {
            if let ParameterValue::Texture2D(texture) = value {
                texture.bind(unit);
                program.set_uniform_int(name, unit as i32);
                unit += 1;
                continue;
            }
            let target = reflection
                .as_deref()
                .and_then(|reflection| block_member(reflection, name));
            let (Some((block, offset)), Some(bytes)) = (target, value.packed_bytes()) else {
                value.apply(program.as_ref(), name);
                continue;
            };

            let handle = block.buffer_handle();
            if !touched.contains(&handle) {
                block.clear();
                touched.push(handle);
            }
            if let Err(e) = block.write(offset, &bytes) {
                log::warn!(
                    "Material: '{}' parameter '{}' does not fit block '{}': {}",
                    self.name,
                    name,
                    block.name(),
                    e
                );
                value.apply(program.as_ref(), name);
            }
        }

        let mut result = Ok(());
        if let Some(reflection) = reflection.as_deref() {
            for handle in touched {
                let Some(block) = reflection.block_for_buffer(handle) else {
                    continue;
                };
                if let Err(e) = block.flush() {
                    log::error!("Material: upload of block '{}' failed: {}", block.name(), e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }

    /// Unbinds the material's textures and the shader.
    pub fn unbind(&self) {
        for value in self.parameters.values() {
            if let ParameterValue::Texture2D(texture) = value {
                texture.unbind();
            }
        }
        self.shader.unbind();
    }
}

/// The block and byte offset `name` resolves to. `None` when it is not a
/// member of a block with a buffer.
fn block_member<'r>(reflection: &'r ProgramReflection, name: &str) -> Option<(&'r ReflectedBlock, u32)> {
    let location = reflection.resolve(name)?;
    let block = reflection.block_for_buffer(location.buffer)?;
    Some((block, location.offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_packs_as_a_four_byte_int() {
        let value = ParameterValue::Bool(true);
        assert_eq!(value.packed_bytes(), Some(1i32.to_ne_bytes().to_vec()));
        assert_eq!(value.byte_size(), 4);
    }

    #[test]
    fn packed_size_matches_byte_size() {
        let values = [
            ParameterValue::Float(0.5),
            ParameterValue::Vec2([1.0, 2.0]),
            ParameterValue::Vec3([1.0, 2.0, 3.0]),
            ParameterValue::Vec4([1.0; 4]),
            ParameterValue::Int(-3),
            ParameterValue::Matrix4([0.0; 16]),
        ];
        for value in &values {
            let bytes = value.packed_bytes().expect("scalar values pack");
            assert_eq!(bytes.len(), value.byte_size(), "{value:?}");
        }
    }

    #[test]
    fn vec3_packs_in_component_order() {
        let bytes = ParameterValue::Vec3([1.0, 2.0, 3.0])
            .packed_bytes()
            .expect("vec3 packs");
        let floats: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
        assert_eq!(floats, vec![1.0, 2.0, 3.0]);
    }
}
