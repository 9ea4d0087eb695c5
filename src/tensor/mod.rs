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

//! Tensor handles.
//!
//! [`SharedTensor`]s are session-owned and writable from outside any graph;
//! [`LocalTensor`]s belong to one graph and are either backed by graph-local
//! storage or placeholders filled in at submission time. [`Slice`] and
//! [`Compare`] are lightweight views used as operator arguments.

mod local;
mod shared;
mod slice;

pub use local::LocalTensor;
pub use shared::SharedTensor;
pub use slice::{Compare, Slice};

use crate::descriptor::ElemType;

/// Scalar types that can back a tensor write or read.
pub trait Element: Copy {
    const ELEM: ElemType;

    fn extend_bytes(values: &[Self], out: &mut Vec<u8>);
    fn from_bytes(bytes: &[u8]) -> Vec<Self>;
}

macro_rules! impl_element {
    ($ty:ty, $elem:expr) => {
        impl Element for $ty {
            const ELEM: ElemType = $elem;

            fn extend_bytes(values: &[Self], out: &mut Vec<u8>) {
                for v in values {
                    out.extend_from_slice(&v.to_ne_bytes());
                }
            }

            fn from_bytes(bytes: &[u8]) -> Vec<Self> {
                bytes
                    .chunks_exact(std::mem::size_of::<Self>())
                    .map(|chunk| {
                        let mut buf = [0u8; std::mem::size_of::<Self>()];
                        buf.copy_from_slice(chunk);
                        Self::from_ne_bytes(buf)
                    })
                    .collect()
            }
        }
    };
}

impl_element!(i8, ElemType::I8);
impl_element!(u8, ElemType::U8);
impl_element!(i16, ElemType::I16);
impl_element!(u16, ElemType::U16);
impl_element!(i32, ElemType::I32);
impl_element!(f32, ElemType::F32);
impl_element!(f64, ElemType::F64);

pub(crate) fn bytes_of<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * std::mem::size_of::<T>());
    T::extend_bytes(values, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_round_trip() {
        let values = [1.5f32, -2.0, 0.0];
        let bytes = bytes_of(&values);
        assert_eq!(bytes.len(), 12);
        assert_eq!(f32::from_bytes(&bytes), values);
    }

    #[test]
    fn u8_is_identity() {
        assert_eq!(bytes_of(&[7u8, 8, 9]), vec![7, 8, 9]);
    }
}
