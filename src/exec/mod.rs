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

//! Execution-layer boundary.
//!
//! The engine never executes tensors itself; it drives a [`Backend`] that
//! owns tensor storage and graph scheduling. [`HostBackend`](host::HostBackend)
//! is the in-process reference implementation; production deployments
//! substitute a backend that forwards to an external executor.
//!
//! Each backend advertises the [`Entry`] points it resolves. The engine
//! checks the required set up front (session-level entries when the session
//! is opened, graph-level entries when a graph is created) so a partial
//! backend fails fast instead of at first use.

pub mod host;

use std::sync::{Arc, Condvar, Mutex};

use crate::descriptor::TensorMeta;
use crate::error::Result;

/// Opaque backend identifier for a tensor, shared or graph-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorHandle(pub u64);

/// Opaque backend identifier for a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphHandle(pub u64);

/// Opaque backend identifier for an operator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u64);

/// Resolvable execution-layer entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    CreateTensor,
    DestroyTensor,
    ResetTensor,
    ReadTensor,
    CreateGraph,
    DestroyGraph,
    CreateLocalTensor,
    CreateOperator,
    SetOperandByName,
    SetOperandByIndex,
    SetResultByName,
    ExecuteGraph,
}

impl Entry {
    pub fn name(self) -> &'static str {
        match self {
            Entry::CreateTensor => "create_tensor",
            Entry::DestroyTensor => "destroy_tensor",
            Entry::ResetTensor => "reset_tensor",
            Entry::ReadTensor => "read_tensor",
            Entry::CreateGraph => "create_graph",
            Entry::DestroyGraph => "destroy_graph",
            Entry::CreateLocalTensor => "create_local_tensor",
            Entry::CreateOperator => "create_operator",
            Entry::SetOperandByName => "set_operand_by_name",
            Entry::SetOperandByIndex => "set_operand_by_index",
            Entry::SetResultByName => "set_result_by_name",
            Entry::ExecuteGraph => "execute_graph",
        }
    }
}

/// Entries a session needs before any tensor work can happen.
pub const SESSION_ENTRIES: &[Entry] = &[
    Entry::CreateTensor,
    Entry::DestroyTensor,
    Entry::ResetTensor,
    Entry::ReadTensor,
];

/// Entries a graph needs for building and submission.
pub const GRAPH_ENTRIES: &[Entry] = &[
    Entry::CreateGraph,
    Entry::DestroyGraph,
    Entry::CreateLocalTensor,
    Entry::CreateOperator,
    Entry::SetOperandByName,
    Entry::SetOperandByIndex,
    Entry::SetResultByName,
    Entry::ExecuteGraph,
];

/// Comparison relation for `compare` nodes and condition slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Per-scalar binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementwiseOp {
    Min,
    Max,
    Multiply,
    Or,
    And,
}

/// Normalization flavors for the `normalize` operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeKind {
    L1,
    L2,
    MinMax,
    Inf,
}

/// Axis for whole-matrix sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortAxis {
    Row,
    Column,
}

/// Material channel addressed by a material-update render command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialAttribute {
    BaseColorTexture,
    BaseColorFactor,
    MetallicFactor,
    RoughnessFactor,
    EmissiveTexture,
    EmissiveFactor,
}

/// Typeface for text rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Typeface {
    Default,
    SansSerif,
    Serif,
    Monospace,
    Handwriting,
}

/// Scalar encoding on the model side of a model-inference I/O pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEncoding {
    UFixed8,
    SFixed8,
    UFixed16,
    Int32,
    Float32,
}

/// One model input or output: the engine-side binding name, the name inside
/// the model package, and the model-side scalar encoding.
#[derive(Debug, Clone)]
pub struct IoMap {
    pub binding: String,
    pub model_name: String,
    pub encoding: ModelEncoding,
}

/// Render command discriminator carried to the backend.
#[derive(Debug, Clone)]
pub enum RenderKind {
    Show,
    UpdateTextures,
    UpdateAnimation,
    UpdatePose,
    UpdateNodePoses,
    UpdateMaterial(MaterialAttribute),
    DrawText {
        locale: String,
        typeface: Typeface,
        canvas_width: u32,
        canvas_height: u32,
    },
}

/// Operator type plus its immediate configuration, as handed to the backend.
/// Tensor operands and results are attached separately by name or index.
#[derive(Debug, Clone)]
pub enum OpConfig {
    Assignment,
    /// Whole-tensor copy with element type conversion; no slice views.
    Convert,
    Arithmetic { expression: String },
    Compare(Relation),
    Elementwise(ElementwiseOp),
    All,
    Any,
    ArgMax,
    Norm,
    Normalize(NormalizeKind),
    SortVector,
    SortMatrix(SortAxis),
    InvertMatrix,
    Svd,
    SwapHwcChw,
    ConvertColor { flag: i32 },
    Nms { threshold: f32 },
    EstimateAffine,
    ApplyAffine,
    ApplyAffinePoints,
    SolvePnp,
    UvToCamera,
    CameraToWorld,
    CameraAccess,
    MakeTransform,
    RunModel {
        package: Arc<[u8]>,
        model_name: String,
        inputs: Vec<IoMap>,
        outputs: Vec<IoMap>,
    },
    LoadTexture,
    Render(RenderKind),
}

impl OpConfig {
    pub fn name(&self) -> &'static str {
        match self {
            OpConfig::Assignment => "assignment",
            OpConfig::Convert => "convert",
            OpConfig::Arithmetic { .. } => "arithmetic",
            OpConfig::Compare(_) => "compare",
            OpConfig::Elementwise(_) => "elementwise",
            OpConfig::All => "all",
            OpConfig::Any => "any",
            OpConfig::ArgMax => "argmax",
            OpConfig::Norm => "norm",
            OpConfig::Normalize(_) => "normalize",
            OpConfig::SortVector => "sort_vector",
            OpConfig::SortMatrix(_) => "sort_matrix",
            OpConfig::InvertMatrix => "invert_matrix",
            OpConfig::Svd => "svd",
            OpConfig::SwapHwcChw => "swap_hwc_chw",
            OpConfig::ConvertColor { .. } => "convert_color",
            OpConfig::Nms { .. } => "nms",
            OpConfig::EstimateAffine => "estimate_affine",
            OpConfig::ApplyAffine => "apply_affine",
            OpConfig::ApplyAffinePoints => "apply_affine_points",
            OpConfig::SolvePnp => "solve_pnp",
            OpConfig::UvToCamera => "uv_to_camera",
            OpConfig::CameraToWorld => "camera_to_world",
            OpConfig::CameraAccess => "camera_access",
            OpConfig::MakeTransform => "make_transform",
            OpConfig::RunModel { .. } => "run_model",
            OpConfig::LoadTexture => "load_texture",
            OpConfig::Render(_) => "render",
        }
    }
}

/// How one run finished.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Completed,
    /// The condition tensor held only zeros; the graph body did not run.
    Skipped,
    Failed(String),
}

/// One-shot completion signal for a run. Set exactly once by the backend.
#[derive(Debug, Default)]
pub struct Completion {
    state: Mutex<Option<RunStatus>>,
    done: Condvar,
}

impl Completion {
    pub fn new() -> Arc<Self> {
        Arc::new(Completion::default())
    }

    /// Records the outcome and wakes all waiters. Later calls are ignored.
    pub fn finish(&self, status: RunStatus) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.is_none() {
            *state = Some(status);
            self.done.notify_all();
        }
    }

    /// Blocks until the run finishes.
    pub fn wait(&self) -> RunStatus {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(status) = state.as_ref() {
                return status.clone();
            }
            state = self.done.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Returns the outcome if the run has already finished.
    pub fn poll(&self) -> Option<RunStatus> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Accepted run: an identifier and the signal that will carry its outcome.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub id: u64,
    pub completion: Arc<Completion>,
}

/// Everything the backend needs to start one run.
pub struct ExecuteParams {
    /// Placeholder tensor -> shared tensor substitutions.
    pub bindings: Vec<(TensorHandle, TensorHandle)>,
    /// If set, the run must not start before this earlier run finishes.
    pub wait_for: Option<Arc<Completion>>,
    /// If set, the run body is skipped unless this shared tensor holds at
    /// least one non-zero byte when the run starts.
    pub condition: Option<TensorHandle>,
}

/// Contract between the engine and an execution layer.
///
/// Backends queue runs of the same graph in submission order. Runs of
/// different graphs may overlap; callers order them with `wait_for`.
pub trait Backend: Send + Sync {
    /// Whether this backend resolves the given entry point.
    fn supports(&self, entry: Entry) -> bool;

    /// Creates a shared tensor. `initial` seeds (and, if shorter than the
    /// tensor, tiles into) the backing store; `None` zero-fills. For scene
    /// assets `initial` carries the asset bytes.
    fn create_tensor(&self, meta: &TensorMeta, initial: Option<&[u8]>) -> Result<TensorHandle>;

    fn destroy_tensor(&self, tensor: TensorHandle);

    /// Overwrites a shared tensor's contents, tiling `data` across the store.
    /// The engine has already checked divisibility.
    fn reset_tensor(&self, tensor: TensorHandle, data: &[u8]) -> Result<()>;

    /// Snapshot of a shared tensor's backing bytes.
    fn read_tensor(&self, tensor: TensorHandle) -> Result<Vec<u8>>;

    fn create_graph(&self) -> Result<GraphHandle>;

    fn destroy_graph(&self, graph: GraphHandle);

    /// Creates a graph-local tensor, backed or placeholder.
    fn create_local_tensor(
        &self,
        graph: GraphHandle,
        meta: &TensorMeta,
        placeholder: bool,
    ) -> Result<TensorHandle>;

    fn create_operator(&self, graph: GraphHandle, config: OpConfig) -> Result<NodeHandle>;

    fn set_operand_by_name(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        tensor: TensorHandle,
        name: &str,
    ) -> Result<()>;

    fn set_operand_by_index(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        tensor: TensorHandle,
        index: u32,
    ) -> Result<()>;

    fn set_result_by_name(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        tensor: TensorHandle,
        name: &str,
    ) -> Result<()>;

    /// Queues one run of the graph. Returns as soon as the run is accepted.
    fn execute_graph(&self, graph: GraphHandle, params: ExecuteParams) -> Result<RunTicket>;
}
