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

mod common;

use carrot_core::rhi::{BlockRole, RenderDevice, Resource, Texture, TextureDescriptor};
use carrot_infra::graphics::opengl::headless::UniformValue;
use carrot_infra::graphics::opengl::HeadlessGl;
use carrot_renderer::{Material, MaterialLibrary, ParameterValue, Shader};
use common::*;
use std::rc::Rc;

fn linked_shader() -> (Rc<Shader>, Rc<HeadlessGl>) {
    let (device, gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();
    (Rc::new(shader), gl)
}

fn texture(device: &dyn RenderDevice) -> Rc<dyn Texture> {
    device
        .create_texture(&TextureDescriptor {
            width: 2,
            height: 2,
            ..Default::default()
        })
        .unwrap()
}

fn program_handle(shader: &Shader) -> u32 {
    shader.program().unwrap().native_handle().as_u32()
}

#[test]
fn block_parameters_are_packed_and_uploaded_once() {
    let (shader, gl) = linked_shader();
    let mut material = Material::new("brick", shader.clone());
    material.set_vec4("albedo", [0.8, 0.2, 0.1, 1.0]);
    material.set_float("roughness", 0.5);
    material.set_bool("metallic", true);

    let reflection = shader.reflection().unwrap();
    let block = reflection.block_by_role(BlockRole::Material).unwrap();
    let handle = block.buffer_handle().as_u32();
    let before = gl.buffer_upload_count(handle);

    material.bind().unwrap();

    assert_eq!(gl.buffer_upload_count(handle), before + 1);
    let bytes = gl.buffer_contents(handle).unwrap();
    let floats: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
    assert_eq!(&floats[0..4], &[0.8, 0.2, 0.1, 1.0]);
    assert_eq!(floats[4], 0.5);
    let metallic = shader.ubo_offset("metallic").unwrap() as usize;
    assert_eq!(&bytes[metallic..metallic + 4], &1i32.to_ne_bytes());

    let program = program_handle(&shader);
    assert_eq!(gl.total_uniform_writes(program), 0);
}

#[test]
fn oversized_parameter_does_not_stop_the_bind() {
    let (shader, gl) = linked_shader();
    let mut material = Material::new("mistyped", shader.clone());
    material.set_vec4("albedo", [0.8, 0.2, 0.1, 1.0]);
    // `metallic` is a bool at offset 20 of a 32-byte block.
    material.set_matrix4("metallic", IDENTITY);
    material.set_float("roughness", 0.5);
    material.set_vec3("tint", [1.0, 0.5, 0.25]);

    material.bind().unwrap();

    let reflection = shader.reflection().unwrap();
    let block = reflection.block_by_role(BlockRole::Material).unwrap();
    assert!(!block.is_dirty());
    let bytes = gl.buffer_contents(block.buffer_handle().as_u32()).unwrap();
    let floats: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
    assert_eq!(&floats[0..4], &[0.8, 0.2, 0.1, 1.0]);
    assert_eq!(floats[4], 0.5);
    assert_eq!(&bytes[20..24], &0i32.to_ne_bytes());

    let program = program_handle(&shader);
    assert_eq!(gl.uniform_write_count(program, "tint"), 1);
}

#[test]
fn materials_sharing_a_shader_do_not_leak_values() {
    let (shader, gl) = linked_shader();
    let mut rough = Material::new("rough", shader.clone());
    rough.set_vec4("albedo", [1.0, 0.0, 0.0, 1.0]);
    rough.set_float("roughness", 0.9);
    rough.set_bool("metallic", true);
    let mut plain = Material::new("plain", shader.clone());
    plain.set_vec4("albedo", [0.0, 1.0, 0.0, 1.0]);

    rough.bind().unwrap();
    plain.bind().unwrap();

    let reflection = shader.reflection().unwrap();
    let handle = reflection
        .block_by_role(BlockRole::Material)
        .unwrap()
        .buffer_handle()
        .as_u32();
    let bytes = gl.buffer_contents(handle).unwrap();
    let floats: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
    assert_eq!(&floats[0..4], &[0.0, 1.0, 0.0, 1.0]);
    assert_eq!(floats[4], 0.0);
    assert_eq!(&bytes[20..24], &0i32.to_ne_bytes());

    rough.bind().unwrap();
    let floats = gl.buffer_f32s(handle).unwrap();
    assert_eq!(floats[4], 0.9);
}

#[test]
fn loose_parameters_are_written_once_per_bind() {
    let (shader, gl) = linked_shader();
    let mut material = Material::new("tinted", shader.clone());
    material.set_vec3("tint", [1.0, 0.5, 0.25]);
    material.set_float("roughness", 0.3);
    let program = program_handle(&shader);

    material.bind().unwrap();
    assert_eq!(gl.uniform_write_count(program, "tint"), 1);
    assert_eq!(
        gl.uniform_value(program, "tint"),
        Some(UniformValue::Vec3([1.0, 0.5, 0.25]))
    );

    material.bind().unwrap();
    assert_eq!(gl.uniform_write_count(program, "tint"), 2);
    assert_eq!(gl.total_uniform_writes(program), 2);
}

#[test]
fn textures_get_consecutive_units_in_name_order() {
    let (shader, gl) = linked_shader();
    let normal = texture(shader.device().as_ref());
    let diffuse = texture(shader.device().as_ref());
    let mut material = Material::new("textured", shader.clone());
    material.set_texture("normalMap", normal.clone());
    material.set_texture("diffuseMap", diffuse.clone());

    material.bind().unwrap();

    let program = program_handle(&shader);
    assert_eq!(gl.texture_on_unit(0), diffuse.native_handle().as_u32());
    assert_eq!(gl.texture_on_unit(1), normal.native_handle().as_u32());
    assert_eq!(gl.uniform_value(program, "diffuseMap"), Some(UniformValue::Int(0)));
    assert_eq!(gl.uniform_value(program, "normalMap"), Some(UniformValue::Int(1)));

    material.unbind();
    assert_eq!(gl.texture_on_unit(0), 0);
    assert_eq!(gl.current_program(), 0);
}

#[test]
fn setting_a_parameter_again_replaces_it() {
    let (shader, _gl) = linked_shader();
    let mut material = Material::new("m", shader);
    material.set_float("roughness", 0.1);
    material.set_float("roughness", 0.9);
    assert_eq!(material.parameter_count(), 1);
    assert!(matches!(
        material.parameter("roughness"),
        Some(ParameterValue::Float(v)) if *v == 0.9
    ));

    assert!(material.remove_parameter("roughness").is_some());
    assert!(material.parameter("roughness").is_none());
}

#[test]
fn binding_with_an_unlinked_shader_does_nothing() {
    let (device, gl) = device();
    let shader = Rc::new(Shader::new(device));
    let mut material = Material::new("pending", shader);
    material.set_vec3("tint", [1.0, 1.0, 1.0]);

    material.bind().unwrap();
    assert_eq!(gl.current_program(), 0);
}

#[test]
fn library_keeps_materials_by_name() {
    let (shader, _gl) = linked_shader();
    let mut library = MaterialLibrary::new();
    assert!(library.is_empty());

    library.create("wood", shader.clone());
    let first = library.create("stone", shader.clone());
    first.borrow_mut().set_float("roughness", 0.7);
    assert_eq!(library.names().collect::<Vec<_>>(), vec!["stone", "wood"]);

    let replaced = library.create("stone", shader.clone());
    assert_eq!(library.len(), 2);
    assert!(Rc::ptr_eq(&library.get("stone").unwrap(), &replaced));
    assert_eq!(replaced.borrow().parameter_count(), 0);

    assert!(library.remove("wood").is_some());
    assert!(!library.contains("wood"));
    assert!(library.get("wood").is_none());
    assert_eq!(library.iter().count(), 1);
}
