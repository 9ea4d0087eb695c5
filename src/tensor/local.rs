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
use crate::exec::{Relation, TensorHandle};
use crate::graph::GraphInner;
use crate::tensor::shared::check_tile;
use crate::tensor::slice::{Compare, Slice};
use crate::tensor::{bytes_of, Element};

/// Graph-scoped tensor: either backed by graph-local storage or a
/// placeholder that a submission binds to a shared tensor.
#[derive(Clone)]
pub struct LocalTensor {
    pub(crate) inner: Arc<LocalInner>,
}

pub(crate) struct LocalInner {
    pub(crate) graph: Arc<GraphInner>,
    pub(crate) handle: TensorHandle,
    pub(crate) meta: TensorMeta,
    pub(crate) placeholder: bool,
}

impl LocalTensor {
    pub(crate) fn new(
        graph: Arc<GraphInner>,
        handle: TensorHandle,
        meta: TensorMeta,
        placeholder: bool,
    ) -> Self {
        LocalTensor {
            inner: Arc::new(LocalInner {
                graph,
                handle,
                meta,
                placeholder,
            }),
        }
    }

    pub fn meta(&self) -> &TensorMeta {
        &self.inner.meta
    }

    pub fn descriptor(&self) -> Option<&TensorDescriptor> {
        self.inner.meta.descriptor()
    }

    pub fn is_placeholder(&self) -> bool {
        self.inner.placeholder
    }

    pub(crate) fn handle(&self) -> TensorHandle {
        self.inner.handle
    }

    pub(crate) fn graph(&self) -> &Arc<GraphInner> {
        &self.inner.graph
    }

    pub(crate) fn graph_id(&self) -> u64 {
        self.inner.graph.id()
    }

    fn described(&self) -> Result<&TensorDescriptor> {
        self.descriptor()
            .ok_or_else(|| Error::Unsupported("scene assets have no element data".into()))
    }

    fn writable(&self) -> Result<&TensorDescriptor> {
        if self.inner.placeholder {
            return Err(Error::Unsupported(
                "placeholders have no storage to write; bind a shared tensor instead".into(),
            ));
        }
        self.described()
    }

    /// Overwrites the tensor's graph-local storage, tiling `data` when it is
    /// shorter than the store. Placeholders cannot be written.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let desc = self.writable()?;
        check_tile(desc.byte_len(), data.len())?;
        self.inner
            .graph
            .backend()
            .reset_tensor(self.inner.handle, data)
    }

    /// Typed variant of [`write`](Self::write).
    pub fn write_values<T: Element>(&self, values: &[T]) -> Result<()> {
        let desc = self.writable()?;
        if desc.elem != T::ELEM {
            return Err(Error::Validation(format!(
                "tensor holds {}, write provides {}",
                desc.elem.name(),
                T::ELEM.name()
            )));
        }
        let bytes = bytes_of(values);
        check_tile(desc.byte_len(), bytes.len())?;
        self.inner
            .graph
            .backend()
            .reset_tensor(self.inner.handle, &bytes)
    }

    /// Region view with one `[begin, end)` range per dimension. A negative
    /// `end` extends to the far boundary (`-1` selects the full extent).
    pub fn slice(&self, ranges: &[[i32; 2]]) -> Result<Slice> {
        let rank = self.described()?.dimensions.len();
        if ranges.len() != rank {
            return Err(Error::Validation(format!(
                "slice has {} range(s), tensor has {rank} dimension(s)",
                ranges.len()
            )));
        }
        let flat: Vec<i32> = ranges.iter().flatten().copied().collect();
        let desc = TensorDescriptor::ranges(rank as u32, false);
        let tensor = self.inner.graph.alloc_backed(&desc, &bytes_of(&flat))?;
        Ok(Slice::new(self.clone(), tensor))
    }

    /// Like [`slice`](Self::slice) with an explicit step per dimension.
    /// A negative step walks backwards from `begin`.
    pub fn slice_stepped(&self, ranges: &[[i32; 3]]) -> Result<Slice> {
        let rank = self.described()?.dimensions.len();
        if ranges.len() != rank {
            return Err(Error::Validation(format!(
                "slice has {} range(s), tensor has {rank} dimension(s)",
                ranges.len()
            )));
        }
        if ranges.iter().any(|r| r[2] == 0) {
            return Err(Error::validation("slice step must be non-zero"));
        }
        let flat: Vec<i32> = ranges.iter().flatten().copied().collect();
        let desc = TensorDescriptor::ranges(rank as u32, true);
        let tensor = self.inner.graph.alloc_backed(&desc, &bytes_of(&flat))?;
        Ok(Slice::new(self.clone(), tensor))
    }

    /// Single-element view: index `i` in each dimension becomes the range
    /// `[i, i + 1)`.
    pub fn element(&self, index: &[i32]) -> Result<Slice> {
        let ranges: Vec<[i32; 2]> = index.iter().map(|&i| [i, i + 1]).collect();
        self.slice(&ranges)
    }

    /// Region view driven by another tensor with slice usage, so the region
    /// can be computed earlier in the same graph.
    pub fn slice_by(&self, ranges: &LocalTensor) -> Result<Slice> {
        self.described()?;
        let range_desc = ranges
            .descriptor()
            .ok_or_else(|| Error::validation("range tensor must be a described tensor"))?;
        if range_desc.usage != crate::descriptor::Usage::Slice {
            return Err(Error::validation("range tensor must have slice usage"));
        }
        Ok(Slice::new(self.clone(), ranges.clone()))
    }

    /// Comparison against another tensor of the same graph.
    pub fn cmp(&self, relation: Relation, other: &LocalTensor) -> Compare {
        Compare::new(self.clone(), other.clone(), relation)
    }

    pub fn gt(&self, other: &LocalTensor) -> Compare {
        self.cmp(Relation::Gt, other)
    }

    pub fn ge(&self, other: &LocalTensor) -> Compare {
        self.cmp(Relation::Ge, other)
    }

    pub fn lt(&self, other: &LocalTensor) -> Compare {
        self.cmp(Relation::Lt, other)
    }

    pub fn le(&self, other: &LocalTensor) -> Compare {
        self.cmp(Relation::Le, other)
    }

    pub fn eq(&self, other: &LocalTensor) -> Compare {
        self.cmp(Relation::Eq, other)
    }

    pub fn ne(&self, other: &LocalTensor) -> Compare {
        self.cmp(Relation::Ne, other)
    }

    /// Comparison against literal values; materializes them as an anonymous
    /// tensor with this tensor's descriptor.
    pub fn cmp_values<T: Element>(&self, relation: Relation, values: &[T]) -> Result<Compare> {
        let desc = self.described()?.clone();
        if desc.elem != T::ELEM {
            return Err(Error::Validation(format!(
                "tensor holds {}, comparison provides {}",
                desc.elem.name(),
                T::ELEM.name()
            )));
        }
        let bytes = bytes_of(values);
        check_tile(desc.byte_len(), bytes.len())?;
        let literal = self.inner.graph.alloc_backed(&desc, &bytes)?;
        Ok(Compare::new(self.clone(), literal, relation))
    }

    pub fn gt_values<T: Element>(&self, values: &[T]) -> Result<Compare> {
        self.cmp_values(Relation::Gt, values)
    }

    pub fn lt_values<T: Element>(&self, values: &[T]) -> Result<Compare> {
        self.cmp_values(Relation::Lt, values)
    }

    pub fn eq_values<T: Element>(&self, values: &[T]) -> Result<Compare> {
        self.cmp_values(Relation::Eq, values)
    }
}
