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

//! Tensor shape and type descriptors.
//!
//! A [`TensorDescriptor`] fixes a tensor's dimensions, per-element channel
//! count, element type and usage kind at creation time; none of these change
//! over the tensor's lifetime. [`TensorMeta`] wraps a descriptor or marks a
//! tensor as an opaque scene asset with no describable shape.

use crate::error::{Error, Result};

/// Scalar element types the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElemType {
    I8,
    U8,
    I16,
    U16,
    I32,
    F32,
    F64,
}

impl ElemType {
    /// Width of one scalar in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            ElemType::I8 | ElemType::U8 => 1,
            ElemType::I16 | ElemType::U16 => 2,
            ElemType::I32 | ElemType::F32 => 4,
            ElemType::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElemType::I8 => "i8",
            ElemType::U8 => "u8",
            ElemType::I16 => "i16",
            ElemType::U16 => "u16",
            ElemType::I32 => "i32",
            ElemType::F32 => "f32",
            ElemType::F64 => "f64",
        }
    }
}

/// What a tensor's contents mean to operators that care.
///
/// Usage constrains the legal dimension/channel combinations, checked by
/// [`TensorDescriptor::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Usage {
    /// Two or more dimensions, 1 to 4 channels.
    Matrix,
    /// Flat array of scalars, 1 to 4 channels.
    ScalarArray,
    /// Per-dimension `[begin, end]` or `[begin, end, step]` ranges.
    Slice,
    /// One element of 4 channels (seconds, milliseconds, microseconds,
    /// nanoseconds).
    Timestamp,
    /// RGB or RGBA color data.
    Color,
    /// 2-D or 3-D points.
    Point,
}

impl Usage {
    pub fn name(self) -> &'static str {
        match self {
            Usage::Matrix => "matrix",
            Usage::ScalarArray => "scalar array",
            Usage::Slice => "slice",
            Usage::Timestamp => "timestamp",
            Usage::Color => "color",
            Usage::Point => "point",
        }
    }
}

/// Shape, channel count, element type and usage of one tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TensorDescriptor {
    pub dimensions: Vec<u32>,
    pub channels: u8,
    pub usage: Usage,
    pub elem: ElemType,
}

impl TensorDescriptor {
    /// Builds and validates a descriptor in one step.
    pub fn new(dimensions: Vec<u32>, channels: u8, usage: Usage, elem: ElemType) -> Result<Self> {
        let desc = TensorDescriptor {
            dimensions,
            channels,
            usage,
            elem,
        };
        desc.validate()?;
        Ok(desc)
    }

    /// A matrix of `rows x cols` with the given channel count.
    pub fn matrix(rows: u32, cols: u32, channels: u8, elem: ElemType) -> Self {
        TensorDescriptor {
            dimensions: vec![rows, cols],
            channels,
            usage: Usage::Matrix,
            elem,
        }
    }

    /// A flat scalar array of `len` single-channel elements.
    pub fn scalars(len: u32, elem: ElemType) -> Self {
        TensorDescriptor {
            dimensions: vec![len],
            channels: 1,
            usage: Usage::ScalarArray,
            elem,
        }
    }

    /// An array of `len` 2-D points.
    pub fn points2(len: u32, elem: ElemType) -> Self {
        TensorDescriptor {
            dimensions: vec![len],
            channels: 2,
            usage: Usage::Point,
            elem,
        }
    }

    /// An array of `len` RGB colors.
    pub fn rgb_colors(len: u32) -> Self {
        TensorDescriptor {
            dimensions: vec![len],
            channels: 3,
            usage: Usage::Color,
            elem: ElemType::U8,
        }
    }

    /// An array of `len` RGBA colors.
    pub fn rgba_colors(len: u32) -> Self {
        TensorDescriptor {
            dimensions: vec![len],
            channels: 4,
            usage: Usage::Color,
            elem: ElemType::U8,
        }
    }

    /// A timestamp: one element, four i32 channels.
    pub fn timestamp() -> Self {
        TensorDescriptor {
            dimensions: vec![1],
            channels: 4,
            usage: Usage::Timestamp,
            elem: ElemType::I32,
        }
    }

    /// Per-dimension ranges over a `rank`-dimensional target, `[begin, end]`
    /// per dimension, or `[begin, end, step]` when `with_step` is set.
    pub fn ranges(rank: u32, with_step: bool) -> Self {
        TensorDescriptor {
            dimensions: vec![rank],
            channels: if with_step { 3 } else { 2 },
            usage: Usage::Slice,
            elem: ElemType::I32,
        }
    }

    /// Checks the usage-specific shape rules.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions.is_empty() {
            return Err(Error::validation("tensor must have at least one dimension"));
        }
        if self.dimensions.iter().any(|&d| d == 0) {
            return Err(Error::validation("tensor dimensions must be non-zero"));
        }
        let rank = self.dimensions.len();
        let ch = self.channels;
        let ok = match self.usage {
            Usage::Matrix => rank >= 2 && (1..=4).contains(&ch),
            Usage::ScalarArray => rank == 1 && (1..=4).contains(&ch),
            Usage::Slice => rank == 1 && (ch == 2 || ch == 3) && self.elem == ElemType::I32,
            Usage::Timestamp => self.dimensions == [1] && ch == 4 && self.elem == ElemType::I32,
            Usage::Color => rank == 1 && (ch == 3 || ch == 4),
            Usage::Point => rank == 1 && (ch == 2 || ch == 3),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "{} usage does not admit dimensions {:?} with {} channel(s) of {}",
                self.usage.name(),
                self.dimensions,
                ch,
                self.elem.name(),
            )))
        }
    }

    /// Number of elements (product of dimensions, channels not included).
    pub fn element_count(&self) -> usize {
        self.dimensions.iter().map(|&d| d as usize).product()
    }

    /// Number of scalars, channels included.
    pub fn scalar_count(&self) -> usize {
        self.element_count() * self.channels as usize
    }

    /// Total backing-store size in bytes.
    pub fn byte_len(&self) -> usize {
        self.scalar_count() * self.elem.byte_width()
    }
}

/// What a tensor is: a described data tensor or an opaque scene asset.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorMeta {
    Described(TensorDescriptor),
    /// Renderable asset (a glTF blob). Has no shape; cannot be written,
    /// read or sliced, only referenced by render operators.
    SceneAsset,
}

impl TensorMeta {
    pub fn descriptor(&self) -> Option<&TensorDescriptor> {
        match self {
            TensorMeta::Described(d) => Some(d),
            TensorMeta::SceneAsset => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_needs_two_dimensions() {
        let desc = TensorDescriptor {
            dimensions: vec![8],
            channels: 1,
            usage: Usage::Matrix,
            elem: ElemType::F32,
        };
        assert!(desc.validate().is_err());
        assert!(TensorDescriptor::matrix(3, 3, 1, ElemType::F32).validate().is_ok());
    }

    #[test]
    fn slice_descriptor_is_i32_only() {
        let mut desc = TensorDescriptor::ranges(2, false);
        assert!(desc.validate().is_ok());
        desc.elem = ElemType::F32;
        assert!(desc.validate().is_err());
        desc.elem = ElemType::I32;
        desc.channels = 4;
        assert!(desc.validate().is_err());
    }

    #[test]
    fn timestamp_shape_is_fixed() {
        assert!(TensorDescriptor::timestamp().validate().is_ok());
        let desc = TensorDescriptor {
            dimensions: vec![2],
            channels: 4,
            usage: Usage::Timestamp,
            elem: ElemType::I32,
        };
        assert!(desc.validate().is_err());
    }

    #[test]
    fn zero_dimension_rejected() {
        let desc = TensorDescriptor::scalars(0, ElemType::U8);
        assert!(desc.validate().is_err());
    }

    #[test]
    fn byte_len_counts_channels() {
        let desc = TensorDescriptor::matrix(4, 5, 3, ElemType::F32);
        assert_eq!(desc.element_count(), 20);
        assert_eq!(desc.byte_len(), 20 * 3 * 4);
    }
}
