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

use weft::exec::host::HostBackend;
use weft::{ElemType, Error, Session, TensorDescriptor};

fn session() -> Session {
    Session::new(Arc::new(HostBackend::new())).unwrap()
}

#[test]
fn create_and_read_back() {
    let s = session();
    let desc = TensorDescriptor::scalars(4, ElemType::F32);
    let t = s.create_tensor_with(&desc, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(t.read_values::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn new_tensor_is_zeroed() {
    let s = session();
    let desc = TensorDescriptor::matrix(2, 3, 1, ElemType::I32);
    let t = s.create_tensor(&desc).unwrap();
    assert_eq!(t.read_values::<i32>().unwrap(), vec![0; 6]);
}

#[test]
fn short_write_tiles() {
    let s = session();
    let desc = TensorDescriptor::scalars(6, ElemType::U8);
    let t = s.create_tensor(&desc).unwrap();
    t.write(&[7, 8]).unwrap();
    assert_eq!(t.read().unwrap(), vec![7, 8, 7, 8, 7, 8]);
}

#[test]
fn indivisible_write_is_rejected() {
    let s = session();
    let desc = TensorDescriptor::scalars(6, ElemType::U8);
    let t = s.create_tensor(&desc).unwrap();
    let err = t.write(&[1, 2, 3, 4]).unwrap_err();
    assert!(matches!(
        err,
        Error::SizeMismatch {
            tensor_bytes: 6,
            data_bytes: 4
        }
    ));
    assert!(t.write(&[]).is_err());
}

#[test]
fn typed_write_checks_element_type() {
    let s = session();
    let desc = TensorDescriptor::scalars(4, ElemType::F32);
    let t = s.create_tensor(&desc).unwrap();
    let err = t.write_values(&[1i32, 2, 3, 4]).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn tiled_initializer() {
    let s = session();
    let desc = TensorDescriptor::matrix(2, 2, 1, ElemType::I32);
    let t = s.create_tensor_with(&desc, &[5i32, 6]).unwrap();
    assert_eq!(t.read_values::<i32>().unwrap(), vec![5, 6, 5, 6]);
}

#[test]
fn copy_yields_an_empty_slot() {
    let s = session();
    let desc = TensorDescriptor::scalars(3, ElemType::I32);
    let a = s.create_tensor_with(&desc, &[1i32, 2, 3]).unwrap();
    let b = a.copy().unwrap();
    assert_eq!(b.descriptor(), a.descriptor());
    assert_eq!(b.read_values::<i32>().unwrap(), vec![0, 0, 0]);
    b.write_values(&[4i32, 5, 6]).unwrap();
    assert_eq!(a.read_values::<i32>().unwrap(), vec![1, 2, 3]);
}

#[test]
fn scene_asset_copy_is_rejected() {
    let s = session();
    let asset = s.create_scene_asset(b"glTF....").unwrap();
    assert!(matches!(asset.copy(), Err(Error::Unsupported(_))));
}

#[test]
fn invalid_descriptor_is_rejected_at_creation() {
    let s = session();
    let desc = TensorDescriptor {
        dimensions: vec![4],
        channels: 1,
        usage: weft::Usage::Matrix,
        elem: ElemType::F32,
    };
    assert!(matches!(s.create_tensor(&desc), Err(Error::Validation(_))));
}

#[test]
fn scene_assets_cannot_be_written_or_read() {
    let s = session();
    let asset = s.create_scene_asset(b"glTF....").unwrap();
    assert!(asset.descriptor().is_none());
    assert!(matches!(asset.write(&[1]), Err(Error::Unsupported(_))));
    assert!(matches!(asset.read(), Err(Error::Unsupported(_))));
    assert!(s.create_scene_asset(&[]).is_err());
}
