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

use carrot_core::rhi::{set_global_device, BlockRole, Resource, ResourceError, ShaderError};
use carrot_infra::graphics::opengl::headless::UniformValue;
use carrot_renderer::{Shader, ShaderState};
use common::*;

fn program_handle(shader: &Shader) -> u32 {
    shader.program().expect("linked").native_handle().as_u32()
}

#[test]
fn per_frame_matrices_land_at_reflected_offsets() {
    let (device, gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();

    shader
        .set_per_frame_matrices(&IDENTITY, &IDENTITY, &IDENTITY)
        .unwrap();

    let reflection = shader.reflection().unwrap();
    let block = reflection.block_by_role(BlockRole::PerFrame).unwrap();
    let floats = gl.buffer_f32s(block.buffer_handle().as_u32()).unwrap();
    for field in ["model", "view", "projection"] {
        let start = shader.ubo_offset(field).unwrap() as usize / 4;
        assert_eq!(&floats[start..start + 16], &IDENTITY, "{field}");
    }
    assert_eq!(shader.ubo_offset("projection"), Some(128));
}

#[test]
fn per_frame_matrices_are_one_upload() {
    let (device, gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();
    let handle = shader
        .reflection()
        .unwrap()
        .block_by_role(BlockRole::PerFrame)
        .unwrap()
        .buffer_handle()
        .as_u32();

    let before = gl.buffer_upload_count(handle);
    shader
        .set_per_frame_matrices(&IDENTITY, &IDENTITY, &IDENTITY)
        .unwrap();
    assert_eq!(gl.buffer_upload_count(handle), before + 1);
}

#[test]
fn light_data_goes_through_the_light_block() {
    let (device, gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();

    shader
        .set_light_data([1.0, 2.0, 3.0], [0.5, 0.5, 0.5], [0.0, 0.0, 5.0])
        .unwrap();

    let reflection = shader.reflection().unwrap();
    let block = reflection.block_by_role(BlockRole::Light).unwrap();
    let floats = gl.buffer_f32s(block.buffer_handle().as_u32()).unwrap();
    assert_eq!(&floats[0..3], &[1.0, 2.0, 3.0]);
    assert_eq!(&floats[4..7], &[0.5, 0.5, 0.5]);
    assert_eq!(&floats[8..11], &[0.0, 0.0, 5.0]);
}

#[test]
fn missing_role_blocks_fall_back_to_loose_uniforms() {
    let (device, gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(PLAIN_VERTEX, PLAIN_FRAGMENT).unwrap();
    assert_eq!(shader.reflection().unwrap().buffer_count(), 0);
    shader.bind();

    shader
        .set_per_frame_matrices(&IDENTITY, &IDENTITY, &IDENTITY)
        .unwrap();
    shader
        .set_light_data([1.0, 2.0, 3.0], [1.0, 1.0, 1.0], [0.0, 0.0, 0.0])
        .unwrap();

    let program = program_handle(&shader);
    for name in ["model", "view", "projection"] {
        assert_eq!(gl.uniform_write_count(program, name), 1, "{name}");
        assert_eq!(gl.uniform_value(program, name), Some(UniformValue::Mat4(IDENTITY)));
    }
    assert_eq!(
        gl.uniform_value(program, "lightPos"),
        Some(UniformValue::Vec3([1.0, 2.0, 3.0]))
    );
    assert_eq!(gl.uniform_write_count(program, "viewPos"), 1);
}

#[test]
fn material_block_upload_is_bounded() {
    let (device, gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();
    let reflection = shader.reflection().unwrap();
    let block = reflection.block_by_role(BlockRole::Material).unwrap();

    let packed: Vec<u8> = bytemuck::cast_slice(&[0.25f32, 0.5, 0.75, 1.0]).to_vec();
    assert!(shader.update_material_block(&packed).unwrap());
    let floats = gl.buffer_f32s(block.buffer_handle().as_u32()).unwrap();
    assert_eq!(&floats[0..4], &[0.25, 0.5, 0.75, 1.0]);

    let oversized = vec![0u8; block.size() + 4];
    assert!(matches!(
        shader.update_material_block(&oversized),
        Err(ResourceError::OutOfBounds { .. })
    ));

    let plain = Shader::new(shader.device().clone());
    plain.compile_glsl(PLAIN_VERTEX, PLAIN_FRAGMENT).unwrap();
    assert!(!plain.update_material_block(&packed).unwrap());
}

#[test]
fn offsets_resolve_through_every_name_form() {
    let (device, _gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();

    assert_eq!(shader.ubo_offset("viewPos"), Some(32));
    assert_eq!(shader.ubo_offset("Light.viewPos"), Some(32));
    assert_eq!(shader.ubo_offset("roughness"), Some(16));
    assert_eq!(shader.ubo_offset("tint"), None);
}

#[test]
fn state_machine() {
    let (device, gl) = device();
    let shader = Shader::new(device);
    assert_eq!(shader.state(), ShaderState::Unlinked);
    shader.bind();
    assert_eq!(gl.current_program(), 0);

    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();
    assert_eq!(shader.state(), ShaderState::Linked);
    shader.bind();
    assert_eq!(gl.current_program(), program_handle(&shader));
    shader.unbind();
    assert_eq!(gl.current_program(), 0);

    shader.release();
    assert_eq!(shader.state(), ShaderState::Released);
    assert!(shader.program().is_none());
    assert_eq!(gl.live_program_count(), 0);
    assert_eq!(gl.live_buffer_count(), 0);
    assert_eq!(
        shader.compile_glsl(VERTEX, FRAGMENT),
        Err(ResourceError::Released)
    );
    shader.release();
}

#[test]
fn bind_restores_block_bindings() {
    let (device, gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();
    let reflection = shader.reflection().unwrap();
    let per_frame = reflection.block_by_role(BlockRole::PerFrame).unwrap();

    let intruder = shader
        .device()
        .create_uniform_buffer(16, per_frame.binding())
        .unwrap();
    assert_eq!(
        gl.indexed_uniform_buffer(per_frame.binding()),
        intruder.native_handle().as_u32()
    );

    shader.bind();
    assert_eq!(
        gl.indexed_uniform_buffer(per_frame.binding()),
        per_frame.buffer_handle().as_u32()
    );
}

#[test]
fn failed_compile_keeps_the_last_good_program() {
    let (device, gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();
    let good = program_handle(&shader);

    let err = shader.compile_glsl(VERTEX, BROKEN).unwrap_err();
    let ResourceError::Shader(ShaderError::CompilationError { details, .. }) = err else {
        panic!("expected a compilation error, got {err:?}");
    };
    assert!(!details.is_empty());

    assert!(shader.is_linked());
    assert_eq!(program_handle(&shader), good);
    assert_eq!(gl.live_program_count(), 1);
    assert_eq!(gl.live_shader_count(), 0);
}

#[test]
fn recompiling_replaces_the_program_without_leaks() {
    let (device, gl) = device();
    let shader = Shader::new(device);
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();
    let first = program_handle(&shader);
    assert_eq!(gl.live_buffer_count(), 3);

    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();
    assert_ne!(program_handle(&shader), first);
    assert_eq!(gl.live_program_count(), 1);
    assert_eq!(gl.live_buffer_count(), 3);

    shader.compile_glsl(PLAIN_VERTEX, PLAIN_FRAGMENT).unwrap();
    assert_eq!(gl.live_buffer_count(), 0);
}

#[test]
fn files_are_loaded_and_reloaded() {
    let (device, _gl) = device();
    let dir = tempfile::tempdir().unwrap();
    let vertex = dir.path().join("lit.vert");
    let fragment = dir.path().join("lit.frag");
    std::fs::write(&vertex, VERTEX).unwrap();
    std::fs::write(&fragment, FRAGMENT).unwrap();

    let shader = Shader::from_files(device, &vertex, &fragment).unwrap();
    assert!(shader.is_linked());
    let first = program_handle(&shader);

    std::fs::write(&fragment, BROKEN).unwrap();
    assert!(shader.reload().is_err());
    assert_eq!(program_handle(&shader), first);

    std::fs::write(&fragment, PLAIN_FRAGMENT).unwrap();
    shader.reload().unwrap();
    assert_ne!(program_handle(&shader), first);
    assert!(shader.reflection().unwrap().block_by_role(BlockRole::Light).is_none());
}

#[test]
fn spirv_files_are_rejected_by_gl() {
    let (device, _gl) = device();
    let dir = tempfile::tempdir().unwrap();
    let vertex = dir.path().join("lit.vert.spv");
    let fragment = dir.path().join("lit.frag");
    std::fs::write(&vertex, [0x03u8, 0x02, 0x23, 0x07]).unwrap();
    std::fs::write(&fragment, FRAGMENT).unwrap();

    let err = Shader::from_files(device, &vertex, &fragment).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResourceError>(),
        Some(ResourceError::Shader(ShaderError::UnsupportedSource { .. }))
    ));
}

#[test]
fn unreadable_files_are_load_errors() {
    let (device, _gl) = device();
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.vert");
    std::fs::write(&empty, "").unwrap();
    let missing = dir.path().join("missing.frag");

    let err = Shader::from_files(device.clone(), &empty, &missing).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShaderError>(),
        Some(ShaderError::LoadError { .. })
    ));

    let shader = Shader::new(device);
    assert!(shader.reload().is_err());
}

#[test]
fn global_device_is_used_when_set() {
    set_global_device(None);
    assert!(matches!(
        Shader::from_global_device(),
        Err(ResourceError::NotInitialized)
    ));

    let (device, _gl) = device();
    set_global_device(Some(device));
    let shader = Shader::from_global_device().unwrap();
    shader.compile_glsl(VERTEX, FRAGMENT).unwrap();
    assert!(shader.is_linked());
    set_global_device(None);
}
