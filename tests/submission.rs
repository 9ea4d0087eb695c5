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
use weft::{BindingTable, ElemType, Error, RunStatus, Session, TensorDescriptor};

fn session() -> Session {
    Session::new(Arc::new(HostBackend::new())).unwrap()
}

#[test]
fn unbound_placeholder_is_rejected_at_submit() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(2, ElemType::F32);
    let p = g.create_placeholder(&desc).unwrap();
    let out = g.create_local(&desc).unwrap();
    g.assign(&p, &out).unwrap();
    let err = g.submit(&BindingTable::new(), None, None).unwrap_err();
    assert!(matches!(err, Error::UnboundPlaceholder { .. }));
}

#[test]
fn unreferenced_placeholders_need_no_binding() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(2, ElemType::F32);
    // Created but never used by a node.
    let _unused = g.create_placeholder(&desc).unwrap();
    let a = g.create_local_with(&desc, &[1.0f32]).unwrap();
    let b = g.create_local(&desc).unwrap();
    g.assign(&a, &b).unwrap();
    let run = g.submit(&BindingTable::new(), None, None).unwrap();
    assert_eq!(run.wait(), RunStatus::Completed);
}

#[test]
fn binding_validates_shape_and_kind() {
    let s = session();
    let g = s.create_graph().unwrap();
    let small = TensorDescriptor::scalars(2, ElemType::F32);
    let large = TensorDescriptor::scalars(4, ElemType::F32);
    let p = g.create_placeholder(&small).unwrap();
    let backed = g.create_local(&small).unwrap();
    let shared = s.create_tensor(&large).unwrap();

    let mut bindings = BindingTable::new();
    assert!(matches!(
        bindings.bind(&p, &shared),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        bindings.bind(&backed, &shared),
        Err(Error::Validation(_))
    ));

    let fitting = s.create_tensor(&small).unwrap();
    bindings.bind(&p, &fitting).unwrap();
    assert_eq!(bindings.len(), 1);
}

#[test]
fn same_graph_runs_are_serialized() {
    let s = session();
    let desc = TensorDescriptor::scalars(1, ElemType::I32);
    let counter = s.create_tensor(&desc).unwrap();

    // Non-atomic read-modify-write; only FIFO execution keeps every
    // increment.
    let g = s.create_graph().unwrap();
    let p = g.create_placeholder(&desc).unwrap();
    g.arithmetic("{0} + 1", &[&p], &p).unwrap();

    let mut bindings = BindingTable::new();
    bindings.bind(&p, &counter).unwrap();

    let runs: Vec<_> = (0..32)
        .map(|_| g.submit(&bindings, None, None).unwrap())
        .collect();
    for run in &runs {
        assert_eq!(run.wait(), RunStatus::Completed);
    }
    assert_eq!(counter.read_values::<i32>().unwrap(), vec![32]);
}

#[test]
fn wait_for_orders_runs_across_graphs() {
    let s = session();
    let desc = TensorDescriptor::scalars(1, ElemType::I32);
    let value = s.create_tensor_with(&desc, &[5i32]).unwrap();

    let doubler = s.create_graph().unwrap();
    let p1 = doubler.create_placeholder(&desc).unwrap();
    doubler.arithmetic("{0} * 2", &[&p1], &p1).unwrap();

    let incrementer = s.create_graph().unwrap();
    let p2 = incrementer.create_placeholder(&desc).unwrap();
    incrementer.arithmetic("{0} + 1", &[&p2], &p2).unwrap();

    let mut b1 = BindingTable::new();
    b1.bind(&p1, &value).unwrap();
    let mut b2 = BindingTable::new();
    b2.bind(&p2, &value).unwrap();

    let first = doubler.submit(&b1, None, None).unwrap();
    let second = incrementer.submit(&b2, Some(&first), None).unwrap();
    assert_eq!(second.wait(), RunStatus::Completed);
    assert_eq!(value.read_values::<i32>().unwrap(), vec![11]);
}

#[test]
fn zero_condition_skips_the_run() {
    let s = session();
    let desc = TensorDescriptor::scalars(1, ElemType::I32);
    let value = s.create_tensor_with(&desc, &[3i32]).unwrap();
    let gate = s.create_tensor(&TensorDescriptor::scalars(1, ElemType::U8)).unwrap();

    let g = s.create_graph().unwrap();
    let p = g.create_placeholder(&desc).unwrap();
    g.arithmetic("{0} + 1", &[&p], &p).unwrap();
    let mut bindings = BindingTable::new();
    bindings.bind(&p, &value).unwrap();

    let run = g.submit(&bindings, None, Some(&gate)).unwrap();
    assert_eq!(run.wait(), RunStatus::Skipped);
    assert_eq!(value.read_values::<i32>().unwrap(), vec![3]);

    gate.write(&[1]).unwrap();
    let run = g.submit(&bindings, None, Some(&gate)).unwrap();
    assert_eq!(run.wait(), RunStatus::Completed);
    assert_eq!(value.read_values::<i32>().unwrap(), vec![4]);
}

#[test]
fn negative_zero_condition_still_skips() {
    let s = session();
    let desc = TensorDescriptor::scalars(1, ElemType::I32);
    let value = s.create_tensor_with(&desc, &[3i32]).unwrap();
    let gate = s
        .create_tensor(&TensorDescriptor::scalars(1, ElemType::F32))
        .unwrap();
    // Sign bit set, numerically zero.
    gate.write_values(&[-0.0f32]).unwrap();

    let g = s.create_graph().unwrap();
    let p = g.create_placeholder(&desc).unwrap();
    g.arithmetic("{0} + 1", &[&p], &p).unwrap();
    let mut bindings = BindingTable::new();
    bindings.bind(&p, &value).unwrap();

    let run = g.submit(&bindings, None, Some(&gate)).unwrap();
    assert_eq!(run.wait(), RunStatus::Skipped);
    assert_eq!(value.read_values::<i32>().unwrap(), vec![3]);
}

#[test]
fn device_only_operator_fails_the_run() {
    let s = session();
    let g = s.create_graph().unwrap();
    let ts = g.create_local(&TensorDescriptor::timestamp()).unwrap();
    let left = g
        .create_local(&TensorDescriptor::matrix(4, 4, 1, ElemType::F32))
        .unwrap();
    g.camera_to_world(&ts, Some(&left), None).unwrap();
    let run = g.submit(&BindingTable::new(), None, None).unwrap();
    assert!(matches!(run.wait(), RunStatus::Failed(_)));
}

#[test]
fn status_resolves_after_wait() {
    let s = session();
    let desc = TensorDescriptor::scalars(1, ElemType::F32);
    let g = s.create_graph().unwrap();
    let a = g.create_local_with(&desc, &[1.0f32]).unwrap();
    let b = g.create_local(&desc).unwrap();
    g.assign(&a, &b).unwrap();
    let run = g.submit(&BindingTable::new(), None, None).unwrap();
    let status = run.wait();
    assert_eq!(status, RunStatus::Completed);
    assert_eq!(run.status(), Some(RunStatus::Completed));
}
