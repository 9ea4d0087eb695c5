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

//! WEFT: a tensor pipeline graph engine.
//!
//! Clients describe computation as graphs of operator nodes over typed
//! tensors, then submit runs against a [`Backend`](exec::Backend) that owns
//! storage and scheduling. A [`Session`] is the root resource owner; shared
//! tensors cross graph boundaries through per-run binding tables.
//!
//! ```no_run
//! use std::sync::Arc;
//! use weft::{BindingTable, ElemType, Session, TensorDescriptor};
//! use weft::exec::host::HostBackend;
//!
//! # fn main() -> weft::Result<()> {
//! let session = Session::new(Arc::new(HostBackend::new()))?;
//! let desc = TensorDescriptor::scalars(4, ElemType::F32);
//! let input = session.create_tensor_with(&desc, &[1.0f32, 2.0, 3.0, 4.0])?;
//! let output = session.create_tensor(&desc)?;
//!
//! let graph = session.create_graph()?;
//! let a = graph.create_placeholder(&desc)?;
//! let b = graph.create_placeholder(&desc)?;
//! graph.arithmetic("{0} * 2", &[&a], &b)?;
//!
//! let mut bindings = BindingTable::new();
//! bindings.bind(&a, &input)?;
//! bindings.bind(&b, &output)?;
//! let run = graph.submit(&bindings, None, None)?;
//! run.wait();
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
pub mod error;
pub mod exec;
pub mod expr;
pub mod graph;
pub mod run;
pub mod session;
pub mod tensor;

pub use descriptor::{ElemType, TensorDescriptor, TensorMeta, Usage};
pub use error::{Error, Result};
pub use exec::{
    ElementwiseOp, MaterialAttribute, NormalizeKind, Relation, RunStatus, SortAxis, Typeface,
};
pub use graph::{
    AffinePoints, Graph, MaterialValues, Operand, RenderCommand, TensorOrLiteral, ANIMATION_STOP,
};
pub use run::{BindingTable, Run};
pub use session::Session;
pub use tensor::{Compare, Element, LocalTensor, SharedTensor, Slice};
