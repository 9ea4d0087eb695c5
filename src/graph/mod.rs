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

//! Graph construction.
//!
//! A [`Graph`] is a fluent builder over operator nodes. Every operator
//! method returns `Ok(&Self)` so graphs read as chains:
//!
//! ```ignore
//! graph
//!     .arithmetic("({0} + {1}) / 2", &[&a, &b], &mean)?
//!     .assign(&mean, &out)?;
//! ```
//!
//! Operands must be local tensors of the same graph; anything else is a
//! cross-graph reference error. Placeholders referenced by at least one node
//! are recorded so submission can insist on a complete binding table.

mod render;

pub use render::{MaterialValues, RenderCommand, TensorOrLiteral, ANIMATION_STOP};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::descriptor::{ElemType, TensorDescriptor, TensorMeta};
use crate::error::{Error, Result};
use crate::exec::{
    Backend, ExecuteParams, GraphHandle, IoMap, ModelEncoding, NodeHandle, NormalizeKind,
    OpConfig, SortAxis,
};
pub use crate::exec::{ElementwiseOp, Relation};
use crate::run::{BindingTable, Run};
use crate::session::SessionInner;
use crate::tensor::{bytes_of, Compare, Element, LocalTensor, SharedTensor, Slice};

pub struct Graph {
    pub(crate) inner: Arc<GraphInner>,
}

pub(crate) struct GraphInner {
    pub(crate) session: Arc<SessionInner>,
    pub(crate) handle: GraphHandle,
    referenced: Mutex<HashSet<u64>>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph").field("id", &self.id()).finish()
    }
}

impl GraphInner {
    pub(crate) fn backend(&self) -> &dyn Backend {
        self.session.backend.as_ref()
    }

    pub(crate) fn id(&self) -> u64 {
        self.handle.0
    }

    pub(crate) fn alloc_local(
        self: &Arc<Self>,
        meta: TensorMeta,
        placeholder: bool,
    ) -> Result<LocalTensor> {
        let handle = self
            .backend()
            .create_local_tensor(self.handle, &meta, placeholder)?;
        Ok(LocalTensor::new(Arc::clone(self), handle, meta, placeholder))
    }

    /// Backed local tensor seeded with raw bytes; used for literals, slice
    /// ranges and other anonymous helpers.
    pub(crate) fn alloc_backed(
        self: &Arc<Self>,
        desc: &TensorDescriptor,
        bytes: &[u8],
    ) -> Result<LocalTensor> {
        desc.validate()?;
        let tensor = self.alloc_local(TensorMeta::Described(desc.clone()), false)?;
        self.backend().reset_tensor(tensor.handle(), bytes)?;
        Ok(tensor)
    }
}

impl Drop for GraphInner {
    fn drop(&mut self) {
        self.session.backend.destroy_graph(self.handle);
    }
}

/// Operator argument: a whole tensor or a slice view of one.
pub enum Operand {
    Tensor(LocalTensor),
    Slice(Slice),
}

impl From<&LocalTensor> for Operand {
    fn from(t: &LocalTensor) -> Self {
        Operand::Tensor(t.clone())
    }
}

impl From<LocalTensor> for Operand {
    fn from(t: LocalTensor) -> Self {
        Operand::Tensor(t)
    }
}

impl From<&Slice> for Operand {
    fn from(s: &Slice) -> Self {
        Operand::Slice(s.clone())
    }
}

impl From<Slice> for Operand {
    fn from(s: Slice) -> Self {
        Operand::Slice(s)
    }
}

/// Point triple for affine estimation: a tensor computed in the graph or a
/// literal of three 2-D points.
pub enum AffinePoints {
    Tensor(LocalTensor),
    Literal([f32; 6]),
}

impl From<&LocalTensor> for AffinePoints {
    fn from(t: &LocalTensor) -> Self {
        AffinePoints::Tensor(t.clone())
    }
}

impl From<[f32; 6]> for AffinePoints {
    fn from(points: [f32; 6]) -> Self {
        AffinePoints::Literal(points)
    }
}

impl Graph {
    pub(crate) fn new(session: Arc<SessionInner>) -> Result<Graph> {
        let handle = session.backend.create_graph()?;
        log::debug!("graph #{} created", handle.0);
        Ok(Graph {
            inner: Arc::new(GraphInner {
                session,
                handle,
                referenced: Mutex::new(HashSet::new()),
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.inner.id()
    }

    // ---- local tensor factories ----

    /// Backed local tensor, zero-filled.
    pub fn create_local(&self, desc: &TensorDescriptor) -> Result<LocalTensor> {
        desc.validate()?;
        self.inner
            .alloc_local(TensorMeta::Described(desc.clone()), false)
    }

    /// Backed local tensor seeded with `values` (tiled when shorter).
    pub fn create_local_with<T: Element>(
        &self,
        desc: &TensorDescriptor,
        values: &[T],
    ) -> Result<LocalTensor> {
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
        self.inner.alloc_backed(desc, &bytes)
    }

    /// Placeholder local tensor, to be bound to a shared tensor per run.
    pub fn create_placeholder(&self, desc: &TensorDescriptor) -> Result<LocalTensor> {
        desc.validate()?;
        self.inner
            .alloc_local(TensorMeta::Described(desc.clone()), true)
    }

    /// Placeholder for a renderable scene asset.
    pub fn create_scene_placeholder(&self) -> Result<LocalTensor> {
        self.inner.alloc_local(TensorMeta::SceneAsset, true)
    }

    /// Placeholder shaped like `shared`, so the tensor can be bound to it
    /// (or to any other compatible shared tensor) at submission time. Works
    /// for data tensors and scene assets alike.
    pub fn create_placeholder_like(&self, shared: &SharedTensor) -> Result<LocalTensor> {
        if !Arc::ptr_eq(shared.session(), &self.inner.session) {
            return Err(Error::validation(
                "template tensor belongs to another session",
            ));
        }
        self.inner.alloc_local(shared.meta().clone(), true)
    }

    // ---- node plumbing ----

    fn check(&self, tensor: &LocalTensor) -> Result<()> {
        let actual = tensor.graph_id();
        let expected = self.inner.id();
        if actual != expected {
            return Err(Error::CrossGraphReference { expected, actual });
        }
        Ok(())
    }

    fn mark(&self, tensor: &LocalTensor) {
        if tensor.is_placeholder() {
            self.inner
                .referenced
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(tensor.handle().0);
        }
    }

    fn node(&self, config: OpConfig) -> Result<NodeHandle> {
        self.inner.backend().create_operator(self.inner.handle, config)
    }

    fn operand(&self, node: NodeHandle, tensor: &LocalTensor, name: &str) -> Result<()> {
        self.check(tensor)?;
        self.mark(tensor);
        self.inner
            .backend()
            .set_operand_by_name(self.inner.handle, node, tensor.handle(), name)
    }

    fn operand_opt(
        &self,
        node: NodeHandle,
        tensor: Option<&LocalTensor>,
        name: &str,
    ) -> Result<()> {
        match tensor {
            Some(t) => self.operand(node, t, name),
            None => Ok(()),
        }
    }

    fn operand_at(&self, node: NodeHandle, tensor: &LocalTensor, index: u32) -> Result<()> {
        self.check(tensor)?;
        self.mark(tensor);
        self.inner
            .backend()
            .set_operand_by_index(self.inner.handle, node, tensor.handle(), index)
    }

    fn result(&self, node: NodeHandle, tensor: &LocalTensor, name: &str) -> Result<()> {
        self.check(tensor)?;
        self.mark(tensor);
        self.inner
            .backend()
            .set_result_by_name(self.inner.handle, node, tensor.handle(), name)
    }

    fn result_opt(
        &self,
        node: NodeHandle,
        tensor: Option<&LocalTensor>,
        name: &str,
    ) -> Result<()> {
        match tensor {
            Some(t) => self.result(node, t, name),
            None => Ok(()),
        }
    }

    // ---- data movement ----

    /// Copies `src` into `dst` with element conversion. Either side may be a
    /// whole tensor or a slice view; selections must cover the same number
    /// of elements and channels.
    pub fn assign(&self, src: impl Into<Operand>, dst: impl Into<Operand>) -> Result<&Self> {
        let node = self.node(OpConfig::Assignment)?;
        match src.into() {
            Operand::Tensor(t) => self.operand(node, &t, "src")?,
            Operand::Slice(s) => {
                self.operand(node, &s.target, "src")?;
                self.operand(node, &s.ranges, "src slices")?;
                self.operand_opt(node, s.channel.as_ref(), "src channel slice")?;
            }
        }
        match dst.into() {
            Operand::Tensor(t) => self.result(node, &t, "dst")?,
            Operand::Slice(s) => {
                self.operand(node, &s.ranges, "dst slices")?;
                self.operand_opt(node, s.channel.as_ref(), "dst channel slice")?;
                self.result(node, &s.target, "dst")?;
            }
        }
        Ok(self)
    }

    /// Copies `src` into `dst` converting the element type. Unlike
    /// [`assign`](Self::assign) this takes whole tensors only; the scalar
    /// counts must match.
    pub fn convert(&self, src: &LocalTensor, dst: &LocalTensor) -> Result<&Self> {
        match (src.descriptor(), dst.descriptor()) {
            (Some(s), Some(d)) if s.scalar_count() != d.scalar_count() => {
                return Err(Error::Validation(format!(
                    "convert source has {} scalar(s), destination has {}",
                    s.scalar_count(),
                    d.scalar_count()
                )));
            }
            (Some(_), Some(_)) => {}
            _ => {
                return Err(Error::validation("convert applies to data tensors only"));
            }
        }
        let node = self.node(OpConfig::Convert)?;
        self.operand(node, src, "src")?;
        self.result(node, dst, "dst")?;
        Ok(self)
    }

    /// Per-scalar arithmetic. `expression` references operands positionally
    /// as `{0}`, `{1}`, ... and supports `+ - * /`, unary minus and
    /// parentheses.
    pub fn arithmetic(
        &self,
        expression: &str,
        operands: &[&LocalTensor],
        result: &LocalTensor,
    ) -> Result<&Self> {
        let node = self.node(OpConfig::Arithmetic {
            expression: expression.to_owned(),
        })?;
        for (i, op) in operands.iter().enumerate() {
            self.operand_at(node, op, i as u32)?;
        }
        self.result(node, result, "result")?;
        Ok(self)
    }

    /// Evaluates a [`Compare`] per scalar, writing 1 or 0 into `result`.
    pub fn compare(&self, compare: &Compare, result: &LocalTensor) -> Result<&Self> {
        let node = self.node(OpConfig::Compare(compare.relation))?;
        self.operand(node, &compare.left, "operand0")?;
        self.operand(node, &compare.right, "operand1")?;
        self.result(node, result, "result")?;
        Ok(self)
    }

    /// Per-scalar min/max/multiply/or/and of two tensors.
    pub fn elementwise(
        &self,
        op: ElementwiseOp,
        a: &LocalTensor,
        b: &LocalTensor,
        result: &LocalTensor,
    ) -> Result<&Self> {
        let node = self.node(OpConfig::Elementwise(op))?;
        self.operand(node, a, "operand0")?;
        self.operand(node, b, "operand1")?;
        self.result(node, result, "result")?;
        Ok(self)
    }

    /// Writes 1 into `result` when every scalar of `operand` is non-zero.
    pub fn all(&self, operand: &LocalTensor, result: &LocalTensor) -> Result<&Self> {
        let node = self.node(OpConfig::All)?;
        self.operand(node, operand, "operand")?;
        self.result(node, result, "result")?;
        Ok(self)
    }

    /// Writes 1 into `result` when any scalar of `operand` is non-zero.
    pub fn any(&self, operand: &LocalTensor, result: &LocalTensor) -> Result<&Self> {
        let node = self.node(OpConfig::Any)?;
        self.operand(node, operand, "operand")?;
        self.result(node, result, "result")?;
        Ok(self)
    }

    // ---- reductions and rearrangement ----

    /// Per-channel index of the largest element.
    pub fn argmax(&self, src: &LocalTensor, result: &LocalTensor) -> Result<&Self> {
        let node = self.node(OpConfig::ArgMax)?;
        self.operand(node, src, "operand")?;
        self.result(node, result, "result")?;
        Ok(self)
    }

    /// Frobenius norm of `src`.
    pub fn norm(&self, src: &LocalTensor, result: &LocalTensor) -> Result<&Self> {
        let node = self.node(OpConfig::Norm)?;
        self.operand(node, src, "operand0")?;
        self.result(node, result, "result0")?;
        Ok(self)
    }

    pub fn normalize(
        &self,
        kind: NormalizeKind,
        src: &LocalTensor,
        result: &LocalTensor,
    ) -> Result<&Self> {
        let node = self.node(OpConfig::Normalize(kind))?;
        self.operand(node, src, "operand0")?;
        self.result(node, result, "result")?;
        Ok(self)
    }

    /// Ascending sort of a vector. At least one output must be requested.
    pub fn sort_vector(
        &self,
        src: &LocalTensor,
        sorted: Option<&LocalTensor>,
        indices: Option<&LocalTensor>,
    ) -> Result<&Self> {
        require_output(sorted, indices)?;
        let node = self.node(OpConfig::SortVector)?;
        self.operand(node, src, "input")?;
        self.result_opt(node, sorted, "sorted")?;
        self.result_opt(node, indices, "indices")?;
        Ok(self)
    }

    /// Sorts each row of a matrix independently.
    pub fn sort_rows(
        &self,
        src: &LocalTensor,
        sorted: Option<&LocalTensor>,
        indices: Option<&LocalTensor>,
    ) -> Result<&Self> {
        require_output(sorted, indices)?;
        let node = self.node(OpConfig::SortMatrix(SortAxis::Row))?;
        self.operand(node, src, "input")?;
        self.result_opt(node, sorted, "sorted")?;
        self.result_opt(node, indices, "indices")?;
        Ok(self)
    }

    /// Sorts each column of a matrix independently.
    pub fn sort_columns(
        &self,
        src: &LocalTensor,
        sorted: Option<&LocalTensor>,
        indices: Option<&LocalTensor>,
    ) -> Result<&Self> {
        require_output(sorted, indices)?;
        let node = self.node(OpConfig::SortMatrix(SortAxis::Column))?;
        self.operand(node, src, "operand0")?;
        self.result_opt(node, sorted, "sorted")?;
        self.result_opt(node, indices, "indices")?;
        Ok(self)
    }

    pub fn invert_matrix(&self, src: &LocalTensor, result: &LocalTensor) -> Result<&Self> {
        let node = self.node(OpConfig::InvertMatrix)?;
        self.operand(node, src, "operand")?;
        self.result(node, result, "result")?;
        Ok(self)
    }

    /// Singular value decomposition. At least one of `w`, `u`, `vt` must be
    /// requested.
    pub fn svd(
        &self,
        src: &LocalTensor,
        w: Option<&LocalTensor>,
        u: Option<&LocalTensor>,
        vt: Option<&LocalTensor>,
    ) -> Result<&Self> {
        if w.is_none() && u.is_none() && vt.is_none() {
            return Err(Error::validation("svd needs at least one output"));
        }
        let node = self.node(OpConfig::Svd)?;
        self.operand(node, src, "src")?;
        self.result_opt(node, w, "w")?;
        self.result_opt(node, u, "u")?;
        self.result_opt(node, vt, "vt")?;
        Ok(self)
    }

    /// Reorders an interleaved HWC image into planar CHW.
    pub fn swap_hwc_chw(&self, src: &LocalTensor, result: &LocalTensor) -> Result<&Self> {
        let node = self.node(OpConfig::SwapHwcChw)?;
        self.operand(node, src, "operand0")?;
        self.result(node, result, "result0")?;
        Ok(self)
    }

    // ---- vision and geometry ----

    /// Color space conversion; `flag` selects the conversion in the
    /// executor's convention.
    pub fn convert_color(
        &self,
        flag: i32,
        src: &LocalTensor,
        result: &LocalTensor,
    ) -> Result<&Self> {
        let node = self.node(OpConfig::ConvertColor { flag })?;
        self.operand(node, src, "src")?;
        self.result(node, result, "dst")?;
        Ok(self)
    }

    /// Non-maximum suppression over detection boxes. At least one output
    /// must be requested.
    #[allow(clippy::too_many_arguments)]
    pub fn nms(
        &self,
        threshold: f32,
        scores: &LocalTensor,
        boxes: &LocalTensor,
        out_scores: Option<&LocalTensor>,
        out_boxes: Option<&LocalTensor>,
        out_indices: Option<&LocalTensor>,
    ) -> Result<&Self> {
        if out_scores.is_none() && out_boxes.is_none() && out_indices.is_none() {
            return Err(Error::validation("nms needs at least one output"));
        }
        let node = self.node(OpConfig::Nms { threshold })?;
        self.operand(node, scores, "scores")?;
        self.operand(node, boxes, "boxes")?;
        self.result_opt(node, out_scores, "scores")?;
        self.result_opt(node, out_boxes, "boxes")?;
        self.result_opt(node, out_indices, "indices")?;
        Ok(self)
    }

    /// Estimates a 2x3 affine transform from three point correspondences.
    pub fn estimate_affine(
        &self,
        src: impl Into<AffinePoints>,
        dst: impl Into<AffinePoints>,
        result: &LocalTensor,
    ) -> Result<&Self> {
        let node = self.node(OpConfig::EstimateAffine)?;
        for (points, name) in [(src.into(), "src"), (dst.into(), "dst")] {
            match points {
                AffinePoints::Tensor(t) => self.operand(node, &t, name)?,
                AffinePoints::Literal(raw) => {
                    let desc = TensorDescriptor::points2(3, ElemType::F32);
                    let literal = self.inner.alloc_backed(&desc, &bytes_of(&raw))?;
                    self.operand(node, &literal, name)?;
                }
            }
        }
        self.result(node, result, "result")?;
        Ok(self)
    }

    /// Warps an image by an affine transform.
    pub fn apply_affine(
        &self,
        affine: &LocalTensor,
        src_image: &LocalTensor,
        dst_image: &LocalTensor,
    ) -> Result<&Self> {
        let node = self.node(OpConfig::ApplyAffine)?;
        self.operand(node, affine, "affine")?;
        self.operand(node, src_image, "src image")?;
        self.result(node, dst_image, "dst image")?;
        Ok(self)
    }

    /// Maps a point array through an affine transform.
    pub fn apply_affine_points(
        &self,
        affine: &LocalTensor,
        src_points: &LocalTensor,
        dst_points: &LocalTensor,
    ) -> Result<&Self> {
        let node = self.node(OpConfig::ApplyAffinePoints)?;
        self.operand(node, affine, "affine")?;
        self.operand(node, src_points, "src points")?;
        self.result(node, dst_points, "dst points")?;
        Ok(self)
    }

    /// Perspective-n-point pose estimation. At least one output must be
    /// requested.
    pub fn solve_pnp(
        &self,
        object_points: &LocalTensor,
        image_points: &LocalTensor,
        camera_matrix: &LocalTensor,
        rotation: Option<&LocalTensor>,
        translation: Option<&LocalTensor>,
    ) -> Result<&Self> {
        if rotation.is_none() && translation.is_none() {
            return Err(Error::validation("solve_pnp needs at least one output"));
        }
        let node = self.node(OpConfig::SolvePnp)?;
        self.operand(node, object_points, "object points")?;
        self.operand(node, image_points, "image points")?;
        self.operand(node, camera_matrix, "camera matrix")?;
        self.result_opt(node, rotation, "rotation")?;
        self.result_opt(node, translation, "translation")?;
        Ok(self)
    }

    /// Lifts 2-D image coordinates into 3-D camera-space points.
    #[allow(clippy::too_many_arguments)]
    pub fn uv_to_camera(
        &self,
        uv: &LocalTensor,
        timestamp: &LocalTensor,
        camera_intrinsic: &LocalTensor,
        left_image: &LocalTensor,
        right_image: Option<&LocalTensor>,
        point_xyz: &LocalTensor,
    ) -> Result<&Self> {
        let node = self.node(OpConfig::UvToCamera)?;
        self.operand(node, uv, "uv")?;
        self.operand(node, timestamp, "timestamp")?;
        self.operand(node, camera_intrinsic, "camera intrinsic")?;
        self.operand(node, left_image, "left image")?;
        self.operand_opt(node, right_image, "right image")?;
        self.result(node, point_xyz, "point_xyz")?;
        Ok(self)
    }

    /// Camera-space to world-space transforms at a capture timestamp. At
    /// least one eye must be requested.
    pub fn camera_to_world(
        &self,
        timestamp: &LocalTensor,
        left_transform: Option<&LocalTensor>,
        right_transform: Option<&LocalTensor>,
    ) -> Result<&Self> {
        if left_transform.is_none() && right_transform.is_none() {
            return Err(Error::validation("camera_to_world needs at least one output"));
        }
        let node = self.node(OpConfig::CameraToWorld)?;
        self.operand(node, timestamp, "timestamp")?;
        self.result_opt(node, left_transform, "left")?;
        self.result_opt(node, right_transform, "right")?;
        Ok(self)
    }

    /// Latest camera frames plus capture metadata. At least one output must
    /// be requested.
    pub fn camera_access(
        &self,
        left_image: Option<&LocalTensor>,
        right_image: Option<&LocalTensor>,
        timestamp: Option<&LocalTensor>,
        camera_matrix: Option<&LocalTensor>,
    ) -> Result<&Self> {
        if left_image.is_none()
            && right_image.is_none()
            && timestamp.is_none()
            && camera_matrix.is_none()
        {
            return Err(Error::validation("camera_access needs at least one output"));
        }
        let node = self.node(OpConfig::CameraAccess)?;
        self.result_opt(node, left_image, "left image")?;
        self.result_opt(node, right_image, "right image")?;
        self.result_opt(node, timestamp, "timestamp")?;
        self.result_opt(node, camera_matrix, "camera matrix")?;
        Ok(self)
    }

    /// Composes a 4x4 transform from rotation, translation and an optional
    /// per-axis scale.
    pub fn make_transform(
        &self,
        rotation: &LocalTensor,
        translation: &LocalTensor,
        scale: Option<&LocalTensor>,
        result: &LocalTensor,
    ) -> Result<&Self> {
        let node = self.node(OpConfig::MakeTransform)?;
        self.operand(node, rotation, "rotation")?;
        self.operand(node, translation, "translation")?;
        self.operand_opt(node, scale, "scale")?;
        self.result(node, result, "result")?;
        Ok(self)
    }

    // ---- models and rendering ----

    /// Runs a packaged inference model. `operands` and `results` key the
    /// engine-side tensors by the model's I/O names; `*_aliases` rename an
    /// I/O when the model package uses a different internal node name.
    /// Float64 tensors are not accepted on either side.
    #[allow(clippy::too_many_arguments)]
    pub fn run_model(
        &self,
        package: &[u8],
        model_name: &str,
        operands: &HashMap<String, LocalTensor>,
        operand_aliases: &HashMap<String, String>,
        results: &HashMap<String, LocalTensor>,
        result_aliases: &HashMap<String, String>,
    ) -> Result<&Self> {
        let inputs = io_maps(operands, operand_aliases)?;
        let outputs = io_maps(results, result_aliases)?;
        let node = self.node(OpConfig::RunModel {
            package: Arc::from(package),
            model_name: model_name.to_owned(),
            inputs,
            outputs,
        })?;
        for (name, tensor) in operands {
            self.operand(node, tensor, name)?;
        }
        for (name, tensor) in results {
            self.result(node, tensor, name)?;
        }
        Ok(self)
    }

    /// Decodes an image tensor into a new texture of a scene asset, writing
    /// the texture id into `texture_id`.
    pub fn load_texture(
        &self,
        scene: &LocalTensor,
        image: &LocalTensor,
        texture_id: &LocalTensor,
    ) -> Result<&Self> {
        if scene.descriptor().is_some() {
            return Err(Error::validation("load_texture target must be a scene asset"));
        }
        let node = self.node(OpConfig::LoadTexture)?;
        self.operand(node, scene, "gltf")?;
        self.operand(node, image, "rgb image")?;
        self.result(node, texture_id, "texture ID")?;
        Ok(self)
    }

    // ---- submission ----

    /// Queues one run of this graph.
    ///
    /// `bindings` must cover every placeholder referenced by a node. The run
    /// starts after `wait_for` (if given) finishes; runs of this graph also
    /// queue behind its earlier submissions. With a `condition`, the body is
    /// skipped unless the tensor holds a non-zero scalar when the run
    /// starts. The engine does not detect data races between graphs touching
    /// the same shared tensor; order such runs with `wait_for`.
    pub fn submit(
        &self,
        bindings: &BindingTable,
        wait_for: Option<&Run>,
        condition: Option<&SharedTensor>,
    ) -> Result<Run> {
        for shared in bindings.entries.values() {
            if !Arc::ptr_eq(shared.session(), &self.inner.session) {
                return Err(Error::validation(
                    "binding table references a tensor from another session",
                ));
            }
        }
        let referenced = self
            .inner
            .referenced
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut pairs = Vec::with_capacity(referenced.len());
        for &id in referenced.iter() {
            match bindings.entries.get(&id) {
                Some(shared) => pairs.push((crate::exec::TensorHandle(id), shared.handle())),
                None => return Err(Error::UnboundPlaceholder { tensor: id }),
            }
        }
        drop(referenced);
        if let Some(cond) = condition {
            if !Arc::ptr_eq(cond.session(), &self.inner.session) {
                return Err(Error::validation(
                    "condition tensor belongs to another session",
                ));
            }
            if cond.descriptor().is_none() {
                return Err(Error::validation("condition tensor must be a data tensor"));
            }
        }
        let params = ExecuteParams {
            bindings: pairs,
            wait_for: wait_for.map(|r| Arc::clone(&r.completion)),
            condition: condition.map(SharedTensor::handle),
        };
        let ticket = self
            .inner
            .backend()
            .execute_graph(self.inner.handle, params)?;
        log::debug!("graph #{} accepted run #{}", self.inner.id(), ticket.id);
        Ok(Run::from_ticket(ticket))
    }
}

fn require_output(a: Option<&LocalTensor>, b: Option<&LocalTensor>) -> Result<()> {
    if a.is_none() && b.is_none() {
        Err(Error::validation("sort needs at least one output"))
    } else {
        Ok(())
    }
}

fn io_maps(
    tensors: &HashMap<String, LocalTensor>,
    aliases: &HashMap<String, String>,
) -> Result<Vec<IoMap>> {
    let mut maps = Vec::with_capacity(tensors.len());
    for (name, tensor) in tensors {
        let desc = tensor.descriptor().ok_or_else(|| {
            Error::validation("model inference does not accept scene assets")
        })?;
        let encoding = match desc.elem {
            ElemType::U8 => ModelEncoding::UFixed8,
            ElemType::I8 => ModelEncoding::SFixed8,
            ElemType::I16 => {
                log::warn!("model io `{name}`: i16 is encoded as unsigned 16-bit fixed point");
                ModelEncoding::UFixed16
            }
            ElemType::U16 => ModelEncoding::UFixed16,
            ElemType::I32 => ModelEncoding::Int32,
            ElemType::F32 => ModelEncoding::Float32,
            ElemType::F64 => {
                return Err(Error::Validation(format!(
                    "model io `{name}`: f64 tensors are not supported"
                )));
            }
        };
        maps.push(IoMap {
            binding: name.clone(),
            model_name: aliases.get(name).unwrap_or(name).clone(),
            encoding,
        });
    }
    Ok(maps)
}
