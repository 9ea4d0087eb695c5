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

use std::collections::HashMap;
use std::sync::Arc;

use weft::exec::host::HostBackend;
use weft::exec::{
    Backend, Entry, ExecuteParams, GraphHandle, NodeHandle, OpConfig, RunTicket, TensorHandle,
};
use weft::{BindingTable, ElemType, Error, NormalizeKind, Session, TensorDescriptor, TensorMeta};

fn session() -> Session {
    Session::new(Arc::new(HostBackend::new())).unwrap()
}

#[test]
fn builder_chains() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(4, ElemType::F32);
    let a = g.create_local(&desc).unwrap();
    let b = g.create_local(&desc).unwrap();
    let c = g.create_local(&desc).unwrap();
    g.arithmetic("({0} + {1}) / 2", &[&a, &b], &c)
        .unwrap()
        .assign(&c, &a)
        .unwrap()
        .normalize(NormalizeKind::L2, &a, &b)
        .unwrap();
}

#[test]
fn cross_graph_operand_is_rejected() {
    let s = session();
    let g1 = s.create_graph().unwrap();
    let g2 = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(2, ElemType::F32);
    let foreign = g1.create_local(&desc).unwrap();
    let out = g2.create_local(&desc).unwrap();
    let err = g2.assign(&foreign, &out).unwrap_err();
    assert!(matches!(err, Error::CrossGraphReference { .. }));
}

#[test]
fn slice_rank_must_match() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::matrix(3, 4, 1, ElemType::F32);
    let t = g.create_local(&desc).unwrap();
    assert!(matches!(t.slice(&[[0, 2]]), Err(Error::Validation(_))));
    assert!(t.slice(&[[0, 2], [1, 3]]).is_ok());
    assert!(t.slice_stepped(&[[0, 2, 0], [0, -1, 1]]).is_err());
}

#[test]
fn placeholders_cannot_be_written() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(2, ElemType::F32);
    let p = g.create_placeholder(&desc).unwrap();
    assert!(matches!(
        p.write_values(&[1.0f32, 2.0]),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn placeholder_like_mirrors_shared_tensors() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(3, ElemType::F32);
    let shared = s.create_tensor(&desc).unwrap();
    let p = g.create_placeholder_like(&shared).unwrap();
    assert!(p.is_placeholder());
    assert_eq!(p.descriptor(), Some(&desc));
    BindingTable::new().bind(&p, &shared).unwrap();

    let asset = s.create_scene_asset(b"glTF....").unwrap();
    let sp = g.create_placeholder_like(&asset).unwrap();
    assert!(sp.is_placeholder());
    assert!(sp.descriptor().is_none());
    BindingTable::new().bind(&sp, &asset).unwrap();

    let other = session();
    let foreign = other.create_tensor(&desc).unwrap();
    assert!(matches!(
        g.create_placeholder_like(&foreign),
        Err(Error::Validation(_))
    ));
}

#[test]
fn convert_takes_whole_data_tensors_only() {
    let s = session();
    let g = s.create_graph().unwrap();
    let a = g
        .create_local(&TensorDescriptor::scalars(4, ElemType::I32))
        .unwrap();
    let shorter = g
        .create_local(&TensorDescriptor::scalars(3, ElemType::F32))
        .unwrap();
    assert!(matches!(
        g.convert(&a, &shorter),
        Err(Error::Validation(_))
    ));
    let scene = g.create_scene_placeholder().unwrap();
    assert!(matches!(g.convert(&a, &scene), Err(Error::Validation(_))));
}

#[test]
fn sort_requires_an_output() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(8, ElemType::F32);
    let v = g.create_local(&desc).unwrap();
    assert!(matches!(
        g.sort_vector(&v, None, None),
        Err(Error::Validation(_))
    ));
}

#[test]
fn model_io_rejects_f64() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(4, ElemType::F64);
    let t = g.create_local(&desc).unwrap();
    let mut operands = HashMap::new();
    operands.insert("input".to_owned(), t);
    let err = g
        .run_model(
            b"qnn-context",
            "detector",
            &operands,
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn load_texture_needs_scene_target() {
    let s = session();
    let g = s.create_graph().unwrap();
    let image = g
        .create_local(&TensorDescriptor::matrix(8, 8, 3, ElemType::U8))
        .unwrap();
    let id = g
        .create_local(&TensorDescriptor::scalars(1, ElemType::U16))
        .unwrap();
    let err = g.load_texture(&image, &image, &id).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let scene = g.create_scene_placeholder().unwrap();
    g.load_texture(&scene, &image, &id).unwrap();
}

#[test]
fn malformed_arithmetic_is_rejected_at_build() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(2, ElemType::F32);
    let a = g.create_local(&desc).unwrap();
    let out = g.create_local(&desc).unwrap();
    let err = g.arithmetic("{0} +", &[&a], &out).unwrap_err();
    assert!(matches!(err, Error::ExecutorRejection { .. }));
}

#[test]
fn oversized_expression_is_rejected() {
    let s = session();
    let g = s.create_graph().unwrap();
    let desc = TensorDescriptor::scalars(2, ElemType::F32);
    let a = g.create_local(&desc).unwrap();
    let out = g.create_local(&desc).unwrap();
    let huge = format!("{}{}", "1 + ".repeat(1024), "{0}");
    assert!(huge.len() > 2048);
    let err = g.arithmetic(&huge, &[&a], &out).unwrap_err();
    assert!(matches!(err, Error::ExecutorRejection { .. }));
}

/// Backend that resolves nothing, for entry-point checks.
struct EmptyBackend;

impl Backend for EmptyBackend {
    fn supports(&self, _entry: Entry) -> bool {
        false
    }

    fn create_tensor(
        &self,
        _meta: &TensorMeta,
        _initial: Option<&[u8]>,
    ) -> weft::Result<TensorHandle> {
        Err(Error::Unsupported("empty backend".into()))
    }

    fn destroy_tensor(&self, _tensor: TensorHandle) {}

    fn reset_tensor(&self, _tensor: TensorHandle, _data: &[u8]) -> weft::Result<()> {
        Err(Error::Unsupported("empty backend".into()))
    }

    fn read_tensor(&self, _tensor: TensorHandle) -> weft::Result<Vec<u8>> {
        Err(Error::Unsupported("empty backend".into()))
    }

    fn create_graph(&self) -> weft::Result<GraphHandle> {
        Err(Error::Unsupported("empty backend".into()))
    }

    fn destroy_graph(&self, _graph: GraphHandle) {}

    fn create_local_tensor(
        &self,
        _graph: GraphHandle,
        _meta: &TensorMeta,
        _placeholder: bool,
    ) -> weft::Result<TensorHandle> {
        Err(Error::Unsupported("empty backend".into()))
    }

    fn create_operator(&self, _graph: GraphHandle, _config: OpConfig) -> weft::Result<NodeHandle> {
        Err(Error::Unsupported("empty backend".into()))
    }

    fn set_operand_by_name(
        &self,
        _graph: GraphHandle,
        _node: NodeHandle,
        _tensor: TensorHandle,
        _name: &str,
    ) -> weft::Result<()> {
        Err(Error::Unsupported("empty backend".into()))
    }

    fn set_operand_by_index(
        &self,
        _graph: GraphHandle,
        _node: NodeHandle,
        _tensor: TensorHandle,
        _index: u32,
    ) -> weft::Result<()> {
        Err(Error::Unsupported("empty backend".into()))
    }

    fn set_result_by_name(
        &self,
        _graph: GraphHandle,
        _node: NodeHandle,
        _tensor: TensorHandle,
        _name: &str,
    ) -> weft::Result<()> {
        Err(Error::Unsupported("empty backend".into()))
    }

    fn execute_graph(
        &self,
        _graph: GraphHandle,
        _params: ExecuteParams,
    ) -> weft::Result<RunTicket> {
        Err(Error::Unsupported("empty backend".into()))
    }
}

#[test]
fn missing_entry_points_fail_session_creation() {
    let err = Session::new(Arc::new(EmptyBackend)).unwrap_err();
    assert!(matches!(err, Error::BindingResolution { .. }));
}

/// Host backend with the graph execution entry point masked out.
struct NoExecBackend(HostBackend);

impl Backend for NoExecBackend {
    fn supports(&self, entry: Entry) -> bool {
        entry != Entry::ExecuteGraph
    }

    fn create_tensor(
        &self,
        meta: &TensorMeta,
        initial: Option<&[u8]>,
    ) -> weft::Result<TensorHandle> {
        self.0.create_tensor(meta, initial)
    }

    fn destroy_tensor(&self, tensor: TensorHandle) {
        self.0.destroy_tensor(tensor)
    }

    fn reset_tensor(&self, tensor: TensorHandle, data: &[u8]) -> weft::Result<()> {
        self.0.reset_tensor(tensor, data)
    }

    fn read_tensor(&self, tensor: TensorHandle) -> weft::Result<Vec<u8>> {
        self.0.read_tensor(tensor)
    }

    fn create_graph(&self) -> weft::Result<GraphHandle> {
        self.0.create_graph()
    }

    fn destroy_graph(&self, graph: GraphHandle) {
        self.0.destroy_graph(graph)
    }

    fn create_local_tensor(
        &self,
        graph: GraphHandle,
        meta: &TensorMeta,
        placeholder: bool,
    ) -> weft::Result<TensorHandle> {
        self.0.create_local_tensor(graph, meta, placeholder)
    }

    fn create_operator(&self, graph: GraphHandle, config: OpConfig) -> weft::Result<NodeHandle> {
        self.0.create_operator(graph, config)
    }

    fn set_operand_by_name(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        tensor: TensorHandle,
        name: &str,
    ) -> weft::Result<()> {
        self.0.set_operand_by_name(graph, node, tensor, name)
    }

    fn set_operand_by_index(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        tensor: TensorHandle,
        index: u32,
    ) -> weft::Result<()> {
        self.0.set_operand_by_index(graph, node, tensor, index)
    }

    fn set_result_by_name(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        tensor: TensorHandle,
        name: &str,
    ) -> weft::Result<()> {
        self.0.set_result_by_name(graph, node, tensor, name)
    }

    fn execute_graph(&self, graph: GraphHandle, params: ExecuteParams) -> weft::Result<RunTicket> {
        self.0.execute_graph(graph, params)
    }
}

#[test]
fn missing_graph_entry_fails_graph_creation() {
    let s = Session::new(Arc::new(NoExecBackend(HostBackend::new()))).unwrap();
    let desc = TensorDescriptor::scalars(2, ElemType::F32);
    assert!(s.create_tensor(&desc).is_ok());
    let err = s.create_graph().unwrap_err();
    assert!(matches!(
        err,
        Error::BindingResolution {
            entry: "execute_graph"
        }
    ));
}
