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
use super::texture::GlTexture;
use carrot_core::rhi::traits::ensure_backend;
use carrot_core::rhi::{
    Framebuffer, FramebufferDescriptor, GraphicsApi, NativeHandle, Resource, ResourceError,
    Texture, TextureDescriptor, TextureFilter, TextureFormat, TextureWrap,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// An off-screen render target.
///
/// Owns an `Rgba8` color texture at attachment 0 and, when requested, a
/// `Depth24Stencil8` texture. Textures attached afterwards are referenced by
/// name only.
#[derive(Debug)]
pub struct GlFramebuffer {
    gl: Rc<dyn GlApi>,
    handle: Cell<u32>,
    width: u32,
    height: u32,
    owned_colors: RefCell<BTreeMap<u32, Rc<GlTexture>>>,
    owned_depth: RefCell<Option<Rc<GlTexture>>>,
}

fn attachment_texture(
    gl: &Rc<dyn GlApi>,
    label: &str,
    width: u32,
    height: u32,
    format: TextureFormat,
) -> Result<Rc<GlTexture>, ResourceError> {
    let descriptor = TextureDescriptor {
        label: Some(label),
        width,
        height,
        format,
        min_filter: TextureFilter::Linear,
        mag_filter: TextureFilter::Linear,
        wrap_s: TextureWrap::ClampToEdge,
        wrap_t: TextureWrap::ClampToEdge,
        generate_mipmaps: false,
        initial_data: None,
    };
    Ok(Rc::new(GlTexture::new(gl.clone(), &descriptor)?))
}

impl GlFramebuffer {
    pub(crate) fn new(gl: Rc<dyn GlApi>, descriptor: &FramebufferDescriptor) -> Result<Self, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "framebuffer size {}x{} has a zero dimension",
                descriptor.width, descriptor.height
            )));
        }
        let color = attachment_texture(
            &gl,
            "framebuffer color",
            descriptor.width,
            descriptor.height,
            TextureFormat::Rgba8,
        )?;
        let depth = if descriptor.has_depth_stencil {
            Some(attachment_texture(
                &gl,
                "framebuffer depth-stencil",
                descriptor.width,
                descriptor.height,
                TextureFormat::Depth24Stencil8,
            )?)
        } else {
            None
        };

        let handle = gl.create_framebuffer().map_err(ResourceError::BackendError)?;
        gl.bind_framebuffer(glow::FRAMEBUFFER, handle);
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            color.native_handle().as_u32(),
        );
        if let Some(depth) = &depth {
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::DEPTH_STENCIL_ATTACHMENT,
                glow::TEXTURE_2D,
                depth.native_handle().as_u32(),
            );
        }
        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        gl.bind_framebuffer(glow::FRAMEBUFFER, 0);
        if status != glow::FRAMEBUFFER_COMPLETE {
            log::warn!("GlFramebuffer: #{handle} incomplete after creation (status {status:#x})");
        }

        log::debug!(
            "GlFramebuffer: created #{handle} {}x{} (depth-stencil: {})",
            descriptor.width,
            descriptor.height,
            descriptor.has_depth_stencil
        );
        Ok(Self {
            gl,
            handle: Cell::new(handle),
            width: descriptor.width,
            height: descriptor.height,
            owned_colors: RefCell::new(BTreeMap::from([(0, color)])),
            owned_depth: RefCell::new(depth),
        })
    }

    /// The size the framebuffer was created with.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn attach(&self, attachment: u32, texture: u32) -> Result<(), ResourceError> {
        let handle = self.handle.get();
        if handle == 0 {
            return Err(ResourceError::Released);
        }
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, handle);
        self.gl
            .framebuffer_texture_2d(glow::FRAMEBUFFER, attachment, glow::TEXTURE_2D, texture);
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, 0);
        Ok(())
    }
}

impl Resource for GlFramebuffer {
    fn native_handle(&self) -> NativeHandle {
        NativeHandle::from_u32(self.handle.get())
    }

    fn release(&self) {
        let handle = self.handle.replace(0);
        if handle == 0 {
            return;
        }
        self.gl.delete_framebuffer(handle);
        self.owned_colors.borrow_mut().clear();
        self.owned_depth.borrow_mut().take();
        log::debug!("GlFramebuffer: released #{handle}");
    }

    fn backend(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }
}

impl Framebuffer for GlFramebuffer {
    fn bind(&self) {
        let handle = self.handle.get();
        if handle == 0 {
            log::warn!("GlFramebuffer: bind after release ignored");
            return;
        }
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, handle);
    }

    fn unbind(&self) {
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, 0);
    }

    fn attach_color_texture(&self, texture: &dyn Texture, attachment: u32) -> Result<(), ResourceError> {
        ensure_backend(texture, GraphicsApi::OpenGl)
            .inspect_err(|e| log::error!("GlFramebuffer: attach rejected: {e}"))?;
        self.attach(glow::COLOR_ATTACHMENT0 + attachment, texture.native_handle().as_u32())?;
        // A borrowed texture replaces the owned one at this slot.
        self.owned_colors.borrow_mut().remove(&attachment);
        Ok(())
    }

    fn attach_depth_texture(&self, texture: &dyn Texture) -> Result<(), ResourceError> {
        ensure_backend(texture, GraphicsApi::OpenGl)
            .inspect_err(|e| log::error!("GlFramebuffer: attach rejected: {e}"))?;
        let point = if texture.format().has_stencil() {
            glow::DEPTH_STENCIL_ATTACHMENT
        } else {
            glow::DEPTH_ATTACHMENT
        };
        self.attach(point, texture.native_handle().as_u32())?;
        self.owned_depth.borrow_mut().take();
        Ok(())
    }

    fn is_complete(&self) -> bool {
        let handle = self.handle.get();
        if handle == 0 {
            return false;
        }
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, handle);
        let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, 0);
        status == glow::FRAMEBUFFER_COMPLETE
    }

    fn color_texture(&self, attachment: u32) -> Option<Rc<dyn Texture>> {
        self.owned_colors
            .borrow()
            .get(&attachment)
            .map(|t| t.clone() as Rc<dyn Texture>)
    }

    fn depth_texture(&self) -> Option<Rc<dyn Texture>> {
        self.owned_depth
            .borrow()
            .as_ref()
            .map(|t| t.clone() as Rc<dyn Texture>)
    }
}

impl Drop for GlFramebuffer {
    fn drop(&mut self) {
        self.release();
    }
}
