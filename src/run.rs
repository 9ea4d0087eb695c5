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

//! Submission protocol types.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::exec::{Completion, RunStatus, RunTicket};
use crate::tensor::{LocalTensor, SharedTensor};

/// Placeholder-to-shared substitutions for one submission.
///
/// The table owns clones of the shared tensors it references, so bound
/// tensors stay alive at least until the table is dropped.
#[derive(Default)]
pub struct BindingTable {
    pub(crate) entries: HashMap<u64, SharedTensor>,
}

impl BindingTable {
    pub fn new() -> Self {
        BindingTable::default()
    }

    /// Binds `placeholder` to `shared` for the runs this table is submitted
    /// with. Rebinding a placeholder replaces the previous entry.
    pub fn bind(&mut self, placeholder: &LocalTensor, shared: &SharedTensor) -> Result<&mut Self> {
        if !placeholder.is_placeholder() {
            return Err(Error::validation(
                "only placeholder tensors can be bound to shared tensors",
            ));
        }
        match (placeholder.descriptor(), shared.descriptor()) {
            (Some(p), Some(s)) => {
                if p.byte_len() != s.byte_len() || p.elem != s.elem {
                    return Err(Error::Validation(format!(
                        "binding shape mismatch: placeholder {:?}x{} {} vs shared {:?}x{} {}",
                        p.dimensions,
                        p.channels,
                        p.elem.name(),
                        s.dimensions,
                        s.channels,
                        s.elem.name()
                    )));
                }
            }
            (None, None) => {}
            _ => {
                return Err(Error::validation(
                    "scene-asset placeholders can only be bound to scene assets",
                ));
            }
        }
        self.entries
            .insert(placeholder.handle().0, shared.clone());
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Handle to one accepted run.
///
/// Runs of the same graph execute in submission order; a run of another
/// graph is ordered against this one only when submitted with this run as
/// its `wait_for`.
#[derive(Debug, Clone)]
pub struct Run {
    pub(crate) id: u64,
    pub(crate) completion: Arc<Completion>,
}

impl Run {
    pub(crate) fn from_ticket(ticket: RunTicket) -> Self {
        Run {
            id: ticket.id,
            completion: ticket.completion,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Blocks until the run finishes.
    pub fn wait(&self) -> RunStatus {
        self.completion.wait()
    }

    /// Outcome so far, `None` while the run is still queued or executing.
    pub fn status(&self) -> Option<RunStatus> {
        self.completion.poll()
    }
}
