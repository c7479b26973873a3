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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! [`ShaderError`] is the most specific, it converts into [`ResourceError`],
//! which in turn converts into the top-level [`RenderError`].

use super::api::GraphicsApi;

/// An error related to loading, compiling or linking shaders.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    /// An error occurred while trying to load the shader source from a path.
    #[error("Failed to load shader source from '{path}': {source_error}")]
    LoadError {
        /// The path of the file that failed to load.
        path: String,
        /// The underlying I/O error, rendered as text.
        source_error: String,
    },
    /// The shader source failed to compile.
    #[error("Shader compilation failed for '{label}': {details}")]
    CompilationError {
        /// A descriptive label for the shader.
        label: String,
        /// The compiler info log.
        details: String,
    },
    /// The program failed to link.
    #[error("Program link failed: {details}")]
    LinkError {
        /// The linker info log.
        details: String,
    },
    /// The source payload is not accepted by the active backend.
    #[error("Shader source format not supported by {backend}: {reason}")]
    UnsupportedSource {
        /// The backend that rejected the source.
        backend: GraphicsApi,
        /// Why the payload was rejected.
        reason: String,
    },
}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// The device has not been initialized yet (or was shut down).
    #[error("Render device is not initialized")]
    NotInitialized,
    /// The backend cannot create this kind of resource.
    #[error("Operation not supported by the {0} backend")]
    Unsupported(GraphicsApi),
    /// The descriptor cannot be honoured as a whole.
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
    /// A write would run past the end of the resource.
    #[error("Out of bounds access: offset {offset} + length {len} exceeds size {size}")]
    OutOfBounds {
        /// The requested byte offset.
        offset: usize,
        /// The requested byte length.
        len: usize,
        /// The size of the resource in bytes.
        size: usize,
    },
    /// A resource created by a different backend was passed in.
    #[error("Resource belongs to the {found} backend, expected {expected}")]
    BackendMismatch {
        /// The backend of the receiving object.
        expected: GraphicsApi,
        /// The backend of the resource passed in.
        found: GraphicsApi,
    },
    /// The resource was used after `release()`.
    #[error("Resource has been released")]
    Released,
    /// The buffer is mapped and cannot be modified through the API.
    #[error("Buffer {0} is mapped")]
    Mapped(String),
    /// The native API reported a failure.
    #[error("Backend error: {0}")]
    BackendError(String),
    /// A shader-specific failure.
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// The top-level error type for the rendering subsystem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The device failed to initialize.
    #[error("Failed to initialize render device: {0}")]
    InitializationFailed(String),
    /// The requested graphics API has no implementation.
    #[error("The {0} backend is not implemented")]
    UnsupportedBackend(GraphicsApi),
    /// A resource operation failed.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::Resource(ResourceError::Shader(err))
    }
}
