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

//! The process-wide default device.
//!
//! The slot is thread-local: a device and its resources belong to the render
//! thread, and other threads always observe an empty slot.

use super::traits::RenderDevice;
use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    static GLOBAL_DEVICE: RefCell<Option<Rc<dyn RenderDevice>>> = const { RefCell::new(None) };
}

/// Installs (or with `None`, clears) the default device for this thread.
pub fn set_global_device(device: Option<Rc<dyn RenderDevice>>) {
    match &device {
        Some(d) => log::debug!("Global render device set ({})", d.graphics_api()),
        None => log::debug!("Global render device cleared"),
    }
    GLOBAL_DEVICE.with(|slot| *slot.borrow_mut() = device);
}

/// Returns the default device for this thread, if one is installed.
pub fn global_device() -> Option<Rc<dyn RenderDevice>> {
    GLOBAL_DEVICE.with(|slot| slot.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_starts_empty_on_new_thread() {
        let empty = std::thread::spawn(|| global_device().is_none())
            .join()
            .unwrap();
        assert!(empty);
    }

    #[test]
    fn clearing_an_empty_slot_is_fine() {
        set_global_device(None);
        assert!(global_device().is_none());
    }
}
