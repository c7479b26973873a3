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

use super::api::GlApi;
use super::conversions::{GlTextureFormat, IntoGl};
use carrot_core::rhi::{
    GraphicsApi, NativeHandle, Resource, ResourceError, Texture, TextureDescriptor, TextureFormat,
};
use std::cell::Cell;
use std::rc::Rc;

/// A `GL_TEXTURE_2D` object.
#[derive(Debug)]
pub struct GlTexture {
    gl: Rc<dyn GlApi>,
    handle: Cell<u32>,
    width: Cell<u32>,
    height: Cell<u32>,
    format: TextureFormat,
    mipmapped: bool,
    bound_unit: Cell<Option<u32>>,
}

fn check_pixels(
    pixels: Option<&[u8]>,
    width: u32,
    height: u32,
    format: TextureFormat,
) -> Result<(), ResourceError> {
    let needed = width as usize * height as usize * format.bytes_per_pixel();
    match pixels {
        Some(data) if data.len() < needed => Err(ResourceError::InvalidDescriptor(format!(
            "{width}x{height} {format:?} texture needs {needed} bytes, got {}",
            data.len()
        ))),
        _ => Ok(()),
    }
}

impl GlTexture {
    pub(crate) fn new(gl: Rc<dyn GlApi>, descriptor: &TextureDescriptor<'_>) -> Result<Self, ResourceError> {
        check_pixels(
            descriptor.initial_data,
            descriptor.width,
            descriptor.height,
            descriptor.format,
        )?;
        let handle = gl.create_texture().map_err(ResourceError::BackendError)?;

        gl.bind_texture(glow::TEXTURE_2D, handle);
        let params = [
            (glow::TEXTURE_MIN_FILTER, descriptor.min_filter.into_gl()),
            (glow::TEXTURE_MAG_FILTER, descriptor.mag_filter.into_gl()),
            (glow::TEXTURE_WRAP_S, descriptor.wrap_s.into_gl()),
            (glow::TEXTURE_WRAP_T, descriptor.wrap_t.into_gl()),
        ];
        for (pname, value) in params {
            gl.tex_parameter_i32(glow::TEXTURE_2D, pname, value);
        }
        gl.bind_texture(glow::TEXTURE_2D, 0);

        let texture = Self {
            gl,
            handle: Cell::new(handle),
            width: Cell::new(0),
            height: Cell::new(0),
            format: descriptor.format,
            mipmapped: descriptor.generate_mipmaps,
            bound_unit: Cell::new(None),
        };
        texture.specify(descriptor.initial_data, descriptor.width, descriptor.height);

        log::debug!(
            "GlTexture: created #{handle} '{}' {}x{} {:?}",
            descriptor.label.unwrap_or("unnamed"),
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        Ok(texture)
    }

    fn specify(&self, pixels: Option<&[u8]>, width: u32, height: u32) {
        let handle = self.handle.get();
        let GlTextureFormat {
            internal_format,
            format,
            ty,
        } = self.format.into_gl();
        self.gl.bind_texture(glow::TEXTURE_2D, handle);
        self.gl.tex_image_2d(
            glow::TEXTURE_2D,
            internal_format,
            width as i32,
            height as i32,
            format,
            ty,
            pixels,
        );
        if self.mipmapped && pixels.is_some() {
            self.gl.generate_mipmap(glow::TEXTURE_2D);
        }
        self.gl.bind_texture(glow::TEXTURE_2D, 0);
        self.width.set(width);
        self.height.set(height);
    }
}

impl Resource for GlTexture {
    fn native_handle(&self) -> NativeHandle {
        NativeHandle::from_u32(self.handle.get())
    }

    fn release(&self) {
        let handle = self.handle.replace(0);
        if handle != 0 {
            self.gl.delete_texture(handle);
            self.bound_unit.set(None);
            log::debug!("GlTexture: released #{handle}");
        }
    }

    fn backend(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }
}

impl Texture for GlTexture {
    fn update_data(&self, pixels: Option<&[u8]>, width: u32, height: u32) -> Result<(), ResourceError> {
        if self.handle.get() == 0 {
            return Err(ResourceError::Released);
        }
        check_pixels(pixels, width, height, self.format)?;
        self.specify(pixels, width, height);
        Ok(())
    }

    fn bind(&self, slot: u32) {
        let handle = self.handle.get();
        if handle == 0 {
            log::warn!("GlTexture: bind after release ignored");
            return;
        }
        self.gl.active_texture(slot);
        self.gl.bind_texture(glow::TEXTURE_2D, handle);
        self.bound_unit.set(Some(slot));
    }

    fn unbind(&self) {
        if let Some(slot) = self.bound_unit.take() {
            self.gl.active_texture(slot);
            self.gl.bind_texture(glow::TEXTURE_2D, 0);
        }
    }

    fn width(&self) -> u32 {
        self.width.get()
    }

    fn height(&self) -> u32 {
        self.height.get()
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for GlTexture {
    fn drop(&mut self) {
        self.release();
    }
}
