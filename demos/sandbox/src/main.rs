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

// Carrot Sandbox
// Draws one textured quad into an off-screen target and logs what the GL saw.

use std::mem;
use std::rc::Rc;

use anyhow::{Context, Result};
use carrot_core::rhi::*;
use carrot_infra::graphics::opengl::HeadlessGl;
use carrot_infra::create_device;
use carrot_renderer::{MaterialLibrary, Shader};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

const VERTEX: &str = r#"
    #version 330 core
    layout(std140, binding = 0) uniform PerFrame {
        mat4 model;
        mat4 view;
        mat4 projection;
    };
    layout(location = 0) in vec3 aPos;
    layout(location = 1) in vec2 aUv;
    out vec2 vUv;
    void main() {
        vUv = aUv;
        gl_Position = projection * view * model * vec4(aPos, 1.0);
    }
"#;

const FRAGMENT: &str = r#"
    #version 330 core
    layout(std140, binding = 1) uniform Light {
        vec3 lightPos;
        vec3 lightColor;
        vec3 viewPos;
    } light;
    layout(std140, binding = 2) uniform Material {
        vec4 albedo;
        float roughness;
    };
    uniform vec3 tint;
    uniform sampler2D diffuseMap;
    in vec2 vUv;
    out vec4 FragColor;
    void main() {
        vec4 base = texture(diffuseMap, vUv) * albedo;
        FragColor = vec4(base.rgb * light.lightColor * tint, base.a);
    }
"#;

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    uv: [f32; 2],
}

impl Vertex {
    fn attributes() -> [VertexAttribute; 2] {
        let stride = mem::size_of::<Vertex>() as u32;
        [
            VertexAttribute::float(0, 3, 0, stride),
            VertexAttribute::float(1, 2, mem::size_of::<[f32; 3]>() as u32, stride),
        ]
    }
}

const QUAD: [Vertex; 4] = [
    Vertex { position: [-0.5, -0.5, 0.0], uv: [0.0, 0.0] },
    Vertex { position: [0.5, -0.5, 0.0], uv: [1.0, 0.0] },
    Vertex { position: [0.5, 0.5, 0.0], uv: [1.0, 1.0] },
    Vertex { position: [-0.5, 0.5, 0.0], uv: [0.0, 1.0] },
];

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Reads RHI settings from the JSON file given as first argument, if any.
fn load_settings() -> Result<RhiSettings> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(RhiSettings::default());
    };
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file '{path}'"))?;
    RhiSettings::from_json_str(&json).with_context(|| format!("invalid settings in '{path}'"))
}

fn checkerboard() -> Vec<u8> {
    [[255u8, 255, 255, 255], [40, 40, 40, 255], [40, 40, 40, 255], [255, 255, 255, 255]].concat()
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let backend = create_device(GraphicsApi::OpenGl, load_settings()?);
    let gl = Rc::new(HeadlessGl::new());
    backend
        .as_opengl()
        .context("the OpenGL backend is not compiled in")?
        .initialize_with_api(gl.clone())?;
    let device = backend.as_render_device();
    set_global_device(Some(device.clone()));

    let shader = Rc::new(Shader::from_global_device()?);
    shader.compile_glsl(VERTEX, FRAGMENT)?;

    let pixels = checkerboard();
    let checker = device.create_texture(&TextureDescriptor {
        label: Some("checker"),
        width: 2,
        height: 2,
        min_filter: TextureFilter::Nearest,
        mag_filter: TextureFilter::Nearest,
        initial_data: Some(&pixels),
        ..Default::default()
    })?;

    let mut library = MaterialLibrary::new();
    let brick = library.create("brick", shader.clone());
    {
        let mut brick = brick.borrow_mut();
        brick.set_vec4("albedo", [0.8, 0.35, 0.2, 1.0]);
        brick.set_float("roughness", 0.6);
        brick.set_vec3("tint", [1.0, 0.95, 0.9]);
        brick.set_texture("diffuseMap", checker);
    }

    let vertices = device.create_buffer(&BufferDescriptor::with_data(
        BufferType::Vertex,
        BufferUsage::Static,
        bytemuck::cast_slice(&QUAD),
    ))?;
    let indices = device.create_buffer(&BufferDescriptor::with_data(
        BufferType::Index,
        BufferUsage::Static,
        bytemuck::cast_slice(&QUAD_INDICES),
    ))?;
    let quad = device.create_vertex_array()?;
    quad.set_vertex_buffer(vertices.as_ref(), 0)?;
    quad.set_index_buffer(indices.as_ref())?;
    for attribute in &Vertex::attributes() {
        quad.set_vertex_attribute(attribute)?;
    }

    let target = device.create_framebuffer(&FramebufferDescriptor {
        width: WIDTH,
        height: HEIGHT,
        has_depth_stencil: true,
    })?;
    target.bind();
    device.set_viewport(0, 0, WIDTH, HEIGHT);
    device.set_depth_test(true);
    device.set_cull_mode(CullMode::Back);
    device.clear_color(0.1, 0.1, 0.12, 1.0);
    device.clear(ClearFlags::COLOR_DEPTH);

    shader.set_per_frame_matrices(&IDENTITY, &IDENTITY, &IDENTITY)?;
    shader.set_light_data([2.0, 2.0, 2.0], [1.0, 1.0, 1.0], [0.0, 0.0, 3.0])?;
    for (name, material) in library.iter() {
        log::info!("Sandbox: drawing with material '{name}'");
        material.borrow().bind()?;
        quad.bind();
        device.draw_indexed(PrimitiveTopology::TriangleList, QUAD_INDICES.len() as u32, 0);
        material.borrow().unbind();
    }
    quad.unbind();
    target.unbind();

    log::info!(
        "Sandbox: {} draw call(s), {} clear(s), target complete: {}",
        gl.draws().len(),
        gl.clears().len(),
        target.is_complete()
    );
    if let Some(reflection) = shader.reflection() {
        reflection.log_summary(shader.program().map_or(NativeHandle::NULL, |p| p.native_handle()));
    }

    library.clear();
    shader.release();
    set_global_device(None);
    Ok(())
}
