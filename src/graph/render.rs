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

//! Render commands.
//!
//! A [`RenderCommand`] targets a scene-asset placeholder and becomes one
//! operator node. Literal arguments are materialized as anonymous backed
//! tensors, so a command can mix tensors computed in the graph with plain
//! values.

use std::sync::Arc;

use crate::descriptor::{ElemType, TensorDescriptor, Usage};
use crate::error::{Error, Result};
use crate::exec::{MaterialAttribute, OpConfig, RenderKind, Typeface};
use crate::graph::{Graph, GraphInner};
use crate::tensor::{bytes_of, LocalTensor};

/// Passing this as the animation timer literal stops playback.
pub const ANIMATION_STOP: f32 = -1.0;

/// A render command argument: a tensor computed in the graph or a literal.
pub enum TensorOrLiteral<T> {
    Tensor(LocalTensor),
    Literal(T),
}

impl<T> From<&LocalTensor> for TensorOrLiteral<T> {
    fn from(t: &LocalTensor) -> Self {
        TensorOrLiteral::Tensor(t.clone())
    }
}

impl<T> TensorOrLiteral<T> {
    pub fn value(v: T) -> Self {
        TensorOrLiteral::Literal(v)
    }
}

/// Values for a material update, literal or computed.
pub enum MaterialValues {
    Tensor(LocalTensor),
    Floats(Vec<f32>),
    TextureIds(Vec<u16>),
    Colors(Vec<[u8; 4]>),
}

/// One mutation of a rendered scene asset.
pub enum RenderCommand {
    /// Places the asset in the world (or hides it) with a 4x4 pose.
    Show {
        target: LocalTensor,
        pose: LocalTensor,
        view_locked: TensorOrLiteral<bool>,
        visible: Option<TensorOrLiteral<bool>>,
    },
    /// Replaces texture contents with a decoded image tensor.
    UpdateTextures {
        target: LocalTensor,
        texture_ids: TensorOrLiteral<Vec<u16>>,
        contents: LocalTensor,
    },
    /// Selects the playing animation and its timer; a negative timer stops
    /// playback.
    UpdateAnimation {
        target: LocalTensor,
        animation: TensorOrLiteral<u16>,
        timer: TensorOrLiteral<f32>,
    },
    UpdatePose {
        target: LocalTensor,
        pose: LocalTensor,
    },
    /// Overwrites local transforms of individual scene nodes.
    UpdateNodePoses {
        target: LocalTensor,
        node_ids: TensorOrLiteral<Vec<u16>>,
        poses: LocalTensor,
    },
    UpdateMaterial {
        target: LocalTensor,
        material_ids: TensorOrLiteral<Vec<u16>>,
        attribute: MaterialAttribute,
        values: MaterialValues,
    },
    /// Rasterizes text into a texture of the asset.
    DrawText {
        target: LocalTensor,
        locale: String,
        typeface: Typeface,
        canvas_width: u32,
        canvas_height: u32,
        text: TensorOrLiteral<String>,
        origin: TensorOrLiteral<(f32, f32)>,
        font_size: TensorOrLiteral<f32>,
        colors: TensorOrLiteral<[[u8; 4]; 2]>,
        texture: TensorOrLiteral<u16>,
    },
}

/// Literal types that can stand in for a render operand tensor.
pub(crate) trait RenderLiteral {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor>;
}

fn scalar_desc(len: u32, elem: ElemType) -> TensorDescriptor {
    TensorDescriptor::scalars(len, elem)
}

impl RenderLiteral for bool {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor> {
        graph.alloc_backed(&scalar_desc(1, ElemType::U8), &[u8::from(self)])
    }
}

impl RenderLiteral for u16 {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor> {
        graph.alloc_backed(&scalar_desc(1, ElemType::U16), &bytes_of(&[self]))
    }
}

impl RenderLiteral for f32 {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor> {
        graph.alloc_backed(&scalar_desc(1, ElemType::F32), &bytes_of(&[self]))
    }
}

impl RenderLiteral for Vec<u16> {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor> {
        if self.is_empty() {
            return Err(Error::validation("id list must not be empty"));
        }
        graph.alloc_backed(&scalar_desc(self.len() as u32, ElemType::U16), &bytes_of(&self))
    }
}

impl RenderLiteral for Vec<f32> {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor> {
        if self.is_empty() {
            return Err(Error::validation("value list must not be empty"));
        }
        graph.alloc_backed(&scalar_desc(self.len() as u32, ElemType::F32), &bytes_of(&self))
    }
}

impl RenderLiteral for Vec<[u8; 4]> {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor> {
        if self.is_empty() {
            return Err(Error::validation("color list must not be empty"));
        }
        let desc = TensorDescriptor::rgba_colors(self.len() as u32);
        let flat: Vec<u8> = self.into_iter().flatten().collect();
        graph.alloc_backed(&desc, &flat)
    }
}

impl RenderLiteral for [[u8; 4]; 2] {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor> {
        let desc = TensorDescriptor::rgba_colors(2);
        let flat: Vec<u8> = self.into_iter().flatten().collect();
        graph.alloc_backed(&desc, &flat)
    }
}

impl RenderLiteral for (f32, f32) {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor> {
        let desc = TensorDescriptor::points2(1, ElemType::F32);
        graph.alloc_backed(&desc, &bytes_of(&[self.0, self.1]))
    }
}

impl RenderLiteral for String {
    fn materialize(self, graph: &Arc<GraphInner>) -> Result<LocalTensor> {
        if self.is_empty() {
            return Err(Error::validation("text must not be empty"));
        }
        // Two i8 channels per glyph slot; the second channel mirrors the
        // first when filled by tiling.
        let desc = TensorDescriptor {
            dimensions: vec![self.len() as u32],
            channels: 2,
            usage: Usage::ScalarArray,
            elem: ElemType::I8,
        };
        graph.alloc_backed(&desc, self.as_bytes())
    }
}

impl Graph {
    fn render_arg<T: RenderLiteral>(
        &self,
        arg: TensorOrLiteral<T>,
    ) -> Result<LocalTensor> {
        match arg {
            TensorOrLiteral::Tensor(t) => Ok(t),
            TensorOrLiteral::Literal(v) => v.materialize(&self.inner),
        }
    }

    /// Appends one render command as an operator node. The target must be a
    /// scene-asset tensor of this graph.
    pub fn render(&self, command: RenderCommand) -> Result<&Self> {
        match command {
            RenderCommand::Show {
                target,
                pose,
                view_locked,
                visible,
            } => {
                let node = self.render_node(&target, RenderKind::Show)?;
                self.operand(node, &pose, "world pose")?;
                let view_locked = self.render_arg(view_locked)?;
                self.operand(node, &view_locked, "view locked")?;
                if let Some(visible) = visible {
                    let visible = self.render_arg(visible)?;
                    self.operand(node, &visible, "visible")?;
                }
            }
            RenderCommand::UpdateTextures {
                target,
                texture_ids,
                contents,
            } => {
                let node = self.render_node(&target, RenderKind::UpdateTextures)?;
                self.operand(node, &contents, "rgb image")?;
                let ids = self.render_arg(texture_ids)?;
                self.operand(node, &ids, "texture ID")?;
            }
            RenderCommand::UpdateAnimation {
                target,
                animation,
                timer,
            } => {
                let node = self.render_node(&target, RenderKind::UpdateAnimation)?;
                let animation = self.render_arg(animation)?;
                self.operand(node, &animation, "animation ID")?;
                let timer = self.render_arg(timer)?;
                self.operand(node, &timer, "animation timer")?;
            }
            RenderCommand::UpdatePose { target, pose } => {
                let node = self.render_node(&target, RenderKind::UpdatePose)?;
                self.operand(node, &pose, "world pose")?;
            }
            RenderCommand::UpdateNodePoses {
                target,
                node_ids,
                poses,
            } => {
                let node = self.render_node(&target, RenderKind::UpdateNodePoses)?;
                self.operand(node, &poses, "transform")?;
                let ids = self.render_arg(node_ids)?;
                self.operand(node, &ids, "node ID")?;
            }
            RenderCommand::UpdateMaterial {
                target,
                material_ids,
                attribute,
                values,
            } => {
                let node = self.render_node(&target, RenderKind::UpdateMaterial(attribute))?;
                let ids = self.render_arg(material_ids)?;
                self.operand(node, &ids, "material ID")?;
                let values = match values {
                    MaterialValues::Tensor(t) => t,
                    MaterialValues::Floats(v) => v.materialize(&self.inner)?,
                    MaterialValues::TextureIds(v) => v.materialize(&self.inner)?,
                    MaterialValues::Colors(v) => v.materialize(&self.inner)?,
                };
                self.operand(node, &values, "value")?;
            }
            RenderCommand::DrawText {
                target,
                locale,
                typeface,
                canvas_width,
                canvas_height,
                text,
                origin,
                font_size,
                colors,
                texture,
            } => {
                let node = self.render_node(
                    &target,
                    RenderKind::DrawText {
                        locale,
                        typeface,
                        canvas_width,
                        canvas_height,
                    },
                )?;
                let text = self.render_arg(text)?;
                self.operand(node, &text, "text")?;
                let origin = self.render_arg(origin)?;
                self.operand(node, &origin, "start")?;
                let colors = self.render_arg(colors)?;
                self.operand(node, &colors, "colors")?;
                let texture = self.render_arg(texture)?;
                self.operand(node, &texture, "texture ID")?;
                let font_size = self.render_arg(font_size)?;
                self.operand(node, &font_size, "font size")?;
            }
        }
        Ok(self)
    }

    fn render_node(
        &self,
        target: &LocalTensor,
        kind: RenderKind,
    ) -> Result<crate::exec::NodeHandle> {
        if target.descriptor().is_some() {
            return Err(Error::validation(
                "render commands target scene-asset tensors",
            ));
        }
        let node = self.node(OpConfig::Render(kind))?;
        self.operand(node, target, "gltf")?;
        Ok(node)
    }
}
