// Copyright 2025 STARGA Inc.
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at:
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Part of the WEFT project (Workgraph Engine For Tensors).

//! Session: the root resource owner.
//!
//! A [`Session`] wraps one backend connection. Shared tensors and graphs are
//! created through it and keep it alive; dropping every handle releases the
//! backend resources in turn. One session per process is the intended usage,
//! but that is a convention, not an enforced global.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::{TensorDescriptor, TensorMeta};
use crate::error::{Error, Result};
use crate::exec::{Backend, GRAPH_ENTRIES, SESSION_ENTRIES};
use crate::graph::Graph;
use crate::tensor::{bytes_of, Element, SharedTensor};

pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) backend: Arc<dyn Backend>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Opens a session over `backend`. Fails with a binding-resolution error
    /// if the backend does not resolve every session-level entry point.
    pub fn new(backend: Arc<dyn Backend>) -> Result<Session> {
        for &entry in SESSION_ENTRIES {
            if !backend.supports(entry) {
                return Err(Error::BindingResolution { entry: entry.name() });
            }
        }
        log::info!("session opened");
        Ok(Session {
            inner: Arc::new(SessionInner { backend }),
        })
    }

    /// Creates a zero-filled shared tensor.
    pub fn create_tensor(&self, desc: &TensorDescriptor) -> Result<SharedTensor> {
        desc.validate()?;
        let meta = TensorMeta::Described(desc.clone());
        let handle = self.inner.backend.create_tensor(&meta, None)?;
        Ok(SharedTensor::new(Arc::clone(&self.inner), handle, meta))
    }

    /// Creates a shared tensor seeded with `values`, tiled across the store
    /// when shorter than the tensor.
    pub fn create_tensor_with<T: Element>(
        &self,
        desc: &TensorDescriptor,
        values: &[T],
    ) -> Result<SharedTensor> {
        desc.validate()?;
        if desc.elem != T::ELEM {
            return Err(Error::Validation(format!(
                "tensor holds {}, initializer provides {}",
                desc.elem.name(),
                T::ELEM.name()
            )));
        }
        let bytes = bytes_of(values);
        let tensor_bytes = desc.byte_len();
        if bytes.is_empty() || tensor_bytes % bytes.len() != 0 {
            return Err(Error::SizeMismatch {
                tensor_bytes,
                data_bytes: bytes.len(),
            });
        }
        let meta = TensorMeta::Described(desc.clone());
        let handle = self.inner.backend.create_tensor(&meta, Some(&bytes))?;
        Ok(SharedTensor::new(Arc::clone(&self.inner), handle, meta))
    }

    /// Registers a renderable scene asset (a glTF blob) as a shared tensor.
    pub fn create_scene_asset(&self, bytes: &[u8]) -> Result<SharedTensor> {
        if bytes.is_empty() {
            return Err(Error::validation("scene asset must not be empty"));
        }
        let meta = TensorMeta::SceneAsset;
        let handle = self.inner.backend.create_tensor(&meta, Some(bytes))?;
        Ok(SharedTensor::new(Arc::clone(&self.inner), handle, meta))
    }

    /// Creates an empty graph. Fails with a binding-resolution error if the
    /// backend does not resolve every graph-level entry point.
    pub fn create_graph(&self) -> Result<Graph> {
        for &entry in GRAPH_ENTRIES {
            if !self.inner.backend.supports(entry) {
                return Err(Error::BindingResolution { entry: entry.name() });
            }
        }
        Graph::new(Arc::clone(&self.inner))
    }
}
