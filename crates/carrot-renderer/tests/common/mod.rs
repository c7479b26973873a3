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

#![allow(dead_code)]

use carrot_core::rhi::RenderDevice;
use carrot_infra::graphics::opengl::{HeadlessGl, OpenGlDevice};
use std::rc::Rc;

pub const VERTEX: &str = r#"
    #version 330 core
    layout(std140, binding = 0) uniform PerFrame {
        mat4 model;
        mat4 view;
        mat4 projection;
    };
    layout(location = 0) in vec3 aPos;
    void main() {
        gl_Position = projection * view * model * vec4(aPos, 1.0);
    }
"#;

pub const FRAGMENT: &str = r#"
    #version 330 core
    layout(std140, binding = 0) uniform Light {
        vec3 lightPos;
        vec3 lightColor;
        vec3 viewPos;
    } light;
    layout(std140, binding = 1) uniform Material {
        vec4 albedo;
        float roughness;
        bool metallic;
    };
    uniform vec3 tint;
    uniform sampler2D diffuseMap;
    uniform sampler2D normalMap;
    out vec4 FragColor;
    void main() {
        FragColor = albedo * vec4(light.lightColor * tint, 1.0);
    }
"#;

/// A fragment shader without any uniform block.
pub const PLAIN_FRAGMENT: &str = r#"
    #version 330 core
    uniform vec3 lightPos;
    uniform vec3 lightColor;
    uniform vec3 viewPos;
    out vec4 FragColor;
    void main() {
        FragColor = vec4(lightColor, 1.0);
    }
"#;

/// A vertex shader that takes its matrices as loose uniforms.
pub const PLAIN_VERTEX: &str = r#"
    #version 330 core
    uniform mat4 model;
    uniform mat4 view;
    uniform mat4 projection;
    layout(location = 0) in vec3 aPos;
    void main() {
        gl_Position = projection * view * model * vec4(aPos, 1.0);
    }
"#;

pub const BROKEN: &str = "#version 330 core\nvoid main( {\n";

pub const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

pub fn device() -> (Rc<dyn RenderDevice>, Rc<HeadlessGl>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Rc::new(HeadlessGl::new());
    let device = Rc::new(OpenGlDevice::default());
    device
        .initialize_with_api(gl.clone())
        .expect("headless GL initializes");
    (device, gl)
}
