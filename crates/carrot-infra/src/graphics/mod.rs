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

//! Render devices and the factory that picks one per graphics API.

#[cfg(feature = "opengl")]
pub mod opengl;
mod unimplemented;

pub use self::unimplemented::UnimplementedDevice;

use carrot_core::rhi::{GraphicsApi, RenderDevice, RhiSettings};
use std::rc::Rc;

/// Every device this crate can hand out.
#[derive(Debug, Clone)]
pub enum Device {
    /// The OpenGL 3.3 core backend.
    #[cfg(feature = "opengl")]
    OpenGl(Rc<opengl::OpenGlDevice>),
    /// A graphics API without a backend.
    Unimplemented(Rc<UnimplementedDevice>),
}

impl Device {
    /// The graphics API this device drives.
    pub fn graphics_api(&self) -> GraphicsApi {
        self.as_render_device().graphics_api()
    }

    /// The device as the backend-agnostic trait object.
    pub fn as_render_device(&self) -> Rc<dyn RenderDevice> {
        match self {
            #[cfg(feature = "opengl")]
            Device::OpenGl(device) => device.clone(),
            Device::Unimplemented(device) => device.clone(),
        }
    }

    /// The OpenGL device, if this is one.
    #[cfg(feature = "opengl")]
    pub fn as_opengl(&self) -> Option<&Rc<opengl::OpenGlDevice>> {
        match self {
            Device::OpenGl(device) => Some(device),
            Device::Unimplemented(_) => None,
        }
    }

    /// Returns `true` if `api` has a real backend in this build.
    pub fn is_supported(api: GraphicsApi) -> bool {
        cfg!(feature = "opengl") && api == GraphicsApi::OpenGl
    }
}

/// Creates the device for `api`. The device still has to be initialized.
///
/// APIs without a backend get an [`UnimplementedDevice`], whose
/// `initialize` reports the missing backend.
#[cfg_attr(not(feature = "opengl"), allow(unused_variables))]
pub fn create_device(api: GraphicsApi, settings: RhiSettings) -> Device {
    match api {
        #[cfg(feature = "opengl")]
        GraphicsApi::OpenGl => Device::OpenGl(Rc::new(opengl::OpenGlDevice::new(settings))),
        other => {
            log::warn!("Requested graphics API {other} is not implemented yet");
            Device::Unimplemented(Rc::new(UnimplementedDevice::new(other)))
        }
    }
}
