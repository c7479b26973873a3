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

//! Texture formats, sampling state and the texture descriptor.

/// The format of the texels in a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// Three 8-bit unsigned normalized channels.
    Rgb8,
    /// Four 8-bit unsigned normalized channels.
    #[default]
    Rgba8,
    /// Four 16-bit float channels.
    Rgba16Float,
    /// Four 32-bit float channels.
    Rgba32Float,
    /// 24-bit depth with an 8-bit stencil.
    Depth24Stencil8,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Returns the size of a single texel in bytes.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::Depth24Stencil8 => 4,
            TextureFormat::Depth32Float => 4,
        }
    }

    /// Returns `true` if this is a depth (or depth/stencil) format.
    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::Depth24Stencil8 | TextureFormat::Depth32Float
        )
    }

    /// Returns `true` if the format carries a stencil component.
    pub const fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8)
    }
}

/// Defines the filtering mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    /// Point sampling.
    Nearest,
    /// Linear interpolation between the nearest texels.
    #[default]
    Linear,
    /// Point sampling from the nearest mipmap level.
    NearestMipmapNearest,
    /// Trilinear filtering.
    LinearMipmapLinear,
}

impl TextureFilter {
    /// Returns `true` if the filter samples from mipmap levels.
    pub const fn uses_mipmaps(self) -> bool {
        matches!(
            self,
            TextureFilter::NearestMipmapNearest | TextureFilter::LinearMipmapLinear
        )
    }
}

/// Defines how texture coordinates are handled outside the `[0, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrap {
    /// Coordinates wrap around. `1.1` becomes `0.1`.
    #[default]
    Repeat,
    /// Coordinates are clamped to the edge. `1.1` becomes `1.0`.
    ClampToEdge,
    /// Coordinates wrap around, mirroring at each integer boundary.
    MirroredRepeat,
}

/// A descriptor used to create a [`Texture`](crate::rhi::Texture).
///
/// When `initial_data` is provided it must hold at least
/// `width * height * format.bytes_per_pixel()` bytes.
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// The texel format.
    pub format: TextureFormat,
    /// Minification filter.
    pub min_filter: TextureFilter,
    /// Magnification filter.
    pub mag_filter: TextureFilter,
    /// Horizontal wrap mode.
    pub wrap_s: TextureWrap,
    /// Vertical wrap mode.
    pub wrap_t: TextureWrap,
    /// Generate the full mip chain after the initial upload.
    pub generate_mipmaps: bool,
    /// Tightly packed texel rows uploaded at creation.
    pub initial_data: Option<&'a [u8]>,
}

impl Default for TextureDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            width: 0,
            height: 0,
            format: TextureFormat::Rgba8,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            generate_mipmaps: false,
            initial_data: None,
        }
    }
}

impl TextureDescriptor<'_> {
    /// The number of bytes a full upload of this texture requires.
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_pixel_matches_format() {
        assert_eq!(TextureFormat::Rgb8.bytes_per_pixel(), 3);
        assert_eq!(TextureFormat::Rgba32Float.bytes_per_pixel(), 16);
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(TextureFormat::Depth24Stencil8.has_stencil());
    }

    #[test]
    fn default_descriptor() {
        let desc = TextureDescriptor {
            width: 4,
            height: 2,
            ..Default::default()
        };
        assert_eq!(desc.format, TextureFormat::Rgba8);
        assert_eq!(desc.wrap_s, TextureWrap::Repeat);
        assert_eq!(desc.byte_size(), 32);
    }
}
