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

use crate::descriptor::{TensorDescriptor, Usage};
use crate::error::{Error, Result};
use crate::exec::Relation;
use crate::tensor::{bytes_of, LocalTensor};

/// Region view over a [`LocalTensor`]: per-dimension ranges plus an optional
/// channel selection. The ranges themselves are tensors, so a slice computed
/// by an earlier node can drive a later assignment.
#[derive(Clone)]
pub struct Slice {
    pub(crate) target: LocalTensor,
    pub(crate) ranges: LocalTensor,
    pub(crate) channel: Option<LocalTensor>,
}

impl Slice {
    pub(crate) fn new(target: LocalTensor, ranges: LocalTensor) -> Self {
        Slice {
            target,
            ranges,
            channel: None,
        }
    }

    pub fn target(&self) -> &LocalTensor {
        &self.target
    }

    /// Restricts the view to one channel.
    pub fn channel(self, index: i32) -> Result<Slice> {
        self.channels_range([index, index + 1])
    }

    /// Restricts the view to the channels in `[begin, end)`. A negative end
    /// extends to the last channel.
    pub fn channels_range(self, range: [i32; 2]) -> Result<Slice> {
        let desc = TensorDescriptor::ranges(1, false);
        let tensor = self
            .target
            .graph()
            .alloc_backed(&desc, &bytes_of(&range))?;
        Ok(Slice {
            channel: Some(tensor),
            ..self
        })
    }

    /// Channel selection with an explicit step.
    pub fn channels_stepped(self, range: [i32; 3]) -> Result<Slice> {
        if range[2] == 0 {
            return Err(Error::validation("channel step must be non-zero"));
        }
        let desc = TensorDescriptor::ranges(1, true);
        let tensor = self
            .target
            .graph()
            .alloc_backed(&desc, &bytes_of(&range))?;
        Ok(Slice {
            channel: Some(tensor),
            ..self
        })
    }

    /// Channel selection driven by another slice-usage tensor.
    pub fn channels_by(self, ranges: &LocalTensor) -> Result<Slice> {
        let desc = ranges
            .descriptor()
            .ok_or_else(|| Error::validation("channel range tensor must be described"))?;
        if desc.usage != Usage::Slice || desc.dimensions != [1] {
            return Err(Error::validation(
                "channel range tensor must have slice usage over one dimension",
            ));
        }
        Ok(Slice {
            channel: Some(ranges.clone()),
            ..self
        })
    }
}

/// A deferred comparison between two tensors, consumed by the `compare`
/// graph operator.
#[derive(Clone)]
pub struct Compare {
    pub(crate) left: LocalTensor,
    pub(crate) right: LocalTensor,
    pub(crate) relation: Relation,
}

impl Compare {
    pub(crate) fn new(left: LocalTensor, right: LocalTensor, relation: Relation) -> Self {
        Compare {
            left,
            right,
            relation,
        }
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }
}
