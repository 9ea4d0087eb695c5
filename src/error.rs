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

//! Crate-wide error taxonomy.
//!
//! Every fallible surface in the engine returns [`Error`]. Construction-time
//! problems (bad descriptors, malformed slices, operands from the wrong
//! graph) are reported before anything reaches the execution layer; runtime
//! problems surface either here (submission) or through a run's status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A descriptor, slice, comparison or operator argument is malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An operand tensor belongs to a different graph than the one being
    /// built. Graphs may only reference their own local tensors.
    #[error("operand belongs to graph #{actual}, expected graph #{expected}")]
    CrossGraphReference { expected: u64, actual: u64 },

    /// A required execution-layer entry point could not be resolved.
    #[error("execution layer does not provide `{entry}`")]
    BindingResolution { entry: &'static str },

    /// A placeholder referenced by the graph has no binding table entry.
    #[error("placeholder tensor #{tensor} is not bound to a shared tensor")]
    UnboundPlaceholder { tensor: u64 },

    /// The tensor's byte size is not a whole multiple of the supplied data.
    #[error("tensor holds {tensor_bytes} bytes, not a multiple of the {data_bytes}-byte input")]
    SizeMismatch {
        tensor_bytes: usize,
        data_bytes: usize,
    },

    /// The operation does not apply to this kind of tensor.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The execution layer rejected a request, with its native status code.
    #[error("executor rejected the request (status {code}): {message}")]
    ExecutorRejection { code: i32, message: String },
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub(crate) fn rejection(code: i32, msg: impl Into<String>) -> Self {
        Error::ExecutorRejection {
            code,
            message: msg.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
