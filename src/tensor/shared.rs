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

use std::sync::Arc;

use crate::descriptor::{TensorDescriptor, TensorMeta};
use crate::error::{Error, Result};
use crate::exec::TensorHandle;
use crate::session::SessionInner;
use crate::tensor::{bytes_of, Element};

/// Session-owned tensor, visible to every graph of its session.
///
/// Handles are cheap to clone; the backing tensor is released when the last
/// clone drops.
#[derive(Clone)]
pub struct SharedTensor {
    pub(crate) inner: Arc<SharedInner>,
}

pub(crate) struct SharedInner {
    pub(crate) session: Arc<SessionInner>,
    pub(crate) handle: TensorHandle,
    pub(crate) meta: TensorMeta,
}

impl Drop for SharedInner {
    fn drop(&mut self) {
        self.session.backend.destroy_tensor(self.handle);
    }
}

impl SharedTensor {
    pub(crate) fn new(session: Arc<SessionInner>, handle: TensorHandle, meta: TensorMeta) -> Self {
        SharedTensor {
            inner: Arc::new(SharedInner {
                session,
                handle,
                meta,
            }),
        }
    }

    pub fn meta(&self) -> &TensorMeta {
        &self.inner.meta
    }

    pub fn descriptor(&self) -> Option<&TensorDescriptor> {
        self.inner.meta.descriptor()
    }

    pub(crate) fn handle(&self) -> TensorHandle {
        self.inner.handle
    }

    pub(crate) fn session(&self) -> &Arc<SessionInner> {
        &self.inner.session
    }

    /// Overwrites the tensor's contents with `data`, tiling it across the
    /// backing store when shorter. The store's byte size must be a whole
    /// multiple of `data.len()`.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let desc = self
            .descriptor()
            .ok_or_else(|| Error::Unsupported("scene assets cannot be written".into()))?;
        check_tile(desc.byte_len(), data.len())?;
        self.inner.session.backend.reset_tensor(self.inner.handle, data)
    }

    /// Typed variant of [`write`](Self::write). The element type must match
    /// the descriptor.
    pub fn write_values<T: Element>(&self, values: &[T]) -> Result<()> {
        let desc = self
            .descriptor()
            .ok_or_else(|| Error::Unsupported("scene assets cannot be written".into()))?;
        if desc.elem != T::ELEM {
            return Err(Error::Validation(format!(
                "tensor holds {}, write provides {}",
                desc.elem.name(),
                T::ELEM.name()
            )));
        }
        let bytes = bytes_of(values);
        check_tile(desc.byte_len(), bytes.len())?;
        self.inner.session.backend.reset_tensor(self.inner.handle, &bytes)
    }

    /// Snapshot of the tensor's raw bytes.
    pub fn read(&self) -> Result<Vec<u8>> {
        if self.descriptor().is_none() {
            return Err(Error::Unsupported("scene assets cannot be read".into()));
        }
        self.inner.session.backend.read_tensor(self.inner.handle)
    }

    /// Snapshot of the tensor as typed scalars, channels interleaved.
    pub fn read_values<T: Element>(&self) -> Result<Vec<T>> {
        let desc = self
            .descriptor()
            .ok_or_else(|| Error::Unsupported("scene assets cannot be read".into()))?;
        if desc.elem != T::ELEM {
            return Err(Error::Validation(format!(
                "tensor holds {}, read requests {}",
                desc.elem.name(),
                T::ELEM.name()
            )));
        }
        Ok(T::from_bytes(&self.read()?))
    }

    /// Creates a new zero-filled shared tensor with the same descriptor.
    /// Contents are not carried over; copy data through an assignment graph.
    pub fn copy(&self) -> Result<SharedTensor> {
        if self.descriptor().is_none() {
            return Err(Error::Unsupported("scene assets cannot be copied".into()));
        }
        let meta = self.inner.meta.clone();
        let handle = self.inner.session.backend.create_tensor(&meta, None)?;
        Ok(SharedTensor::new(
            Arc::clone(&self.inner.session),
            handle,
            meta,
        ))
    }
}

pub(crate) fn check_tile(tensor_bytes: usize, data_bytes: usize) -> Result<()> {
    if data_bytes == 0 || tensor_bytes % data_bytes != 0 {
        Err(Error::SizeMismatch {
            tensor_bytes,
            data_bytes,
        })
    } else {
        Ok(())
    }
}
