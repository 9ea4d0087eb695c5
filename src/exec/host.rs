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

//! In-process reference backend.
//!
//! `HostBackend` keeps tensor storage in plain memory and runs each graph on
//! a dedicated worker thread, so runs of one graph execute in submission
//! order while runs of different graphs overlap freely. It implements the
//! data-movement operators (assignment, arithmetic, compare, elementwise,
//! all/any); operators that need a device executor (model inference, camera
//! access, rendering, the vision/geometry family) are accepted at build time
//! and fail the run that reaches them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::descriptor::{ElemType, TensorDescriptor, TensorMeta, Usage};
use crate::error::{Error, Result};
use crate::expr::Expr;

use super::{
    Backend, Completion, ElementwiseOp, Entry, ExecuteParams, GraphHandle, NodeHandle, OpConfig,
    Relation, RunStatus, RunTicket, TensorHandle,
};

/// Longest arithmetic expression the backend accepts, in bytes.
const MAX_EXPRESSION_LEN: usize = 2048;

const STATUS_BAD_EXPRESSION: i32 = -2;
const STATUS_UNKNOWN_HANDLE: i32 = -4;
const STATUS_GRAPH_GONE: i32 = -5;
const STATUS_BAD_SIZE: i32 = -7;

#[derive(Clone)]
struct TensorCell {
    meta: TensorMeta,
    placeholder: bool,
    data: Arc<Mutex<Vec<u8>>>,
}

#[derive(Clone)]
struct Node {
    config: OpConfig,
    expr: Option<Expr>,
    by_name: Vec<(String, u64)>,
    by_index: Vec<(u32, u64)>,
    results: Vec<(String, u64)>,
}

struct Job {
    run_id: u64,
    bindings: HashMap<u64, u64>,
    wait_for: Option<Arc<Completion>>,
    condition: Option<u64>,
    ticket: Arc<Completion>,
}

struct GraphCell {
    nodes: Arc<Mutex<Vec<Node>>>,
    locals: Vec<u64>,
    sender: Sender<Job>,
    // Worker exits when the sender side is dropped.
    _worker: JoinHandle<()>,
}

type TensorMap = Arc<Mutex<HashMap<u64, TensorCell>>>;

/// Reference backend holding all state in process memory.
pub struct HostBackend {
    tensors: TensorMap,
    graphs: Mutex<HashMap<u64, GraphCell>>,
    next_id: AtomicU64,
    next_run: AtomicU64,
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBackend {
    pub fn new() -> Self {
        HostBackend {
            tensors: Arc::new(Mutex::new(HashMap::new())),
            graphs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            next_run: AtomicU64::new(1),
        }
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn insert_tensor(&self, meta: &TensorMeta, placeholder: bool, data: Vec<u8>) -> TensorHandle {
        let id = self.fresh_id();
        let cell = TensorCell {
            meta: meta.clone(),
            placeholder,
            data: Arc::new(Mutex::new(data)),
        };
        lock(&self.tensors).insert(id, cell);
        TensorHandle(id)
    }

    fn storage_for(&self, meta: &TensorMeta, initial: Option<&[u8]>) -> Result<Vec<u8>> {
        match meta {
            TensorMeta::SceneAsset => Ok(initial.map(<[u8]>::to_vec).unwrap_or_default()),
            TensorMeta::Described(desc) => {
                let mut data = vec![0u8; desc.byte_len()];
                if let Some(init) = initial {
                    tile_into(&mut data, init)
                        .map_err(|msg| Error::rejection(STATUS_BAD_SIZE, msg))?;
                }
                Ok(data)
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn tile_into(store: &mut [u8], data: &[u8]) -> std::result::Result<(), String> {
    if data.is_empty() || store.len() % data.len() != 0 {
        return Err(format!(
            "store of {} bytes cannot tile input of {} bytes",
            store.len(),
            data.len()
        ));
    }
    for chunk in store.chunks_mut(data.len()) {
        chunk.copy_from_slice(data);
    }
    Ok(())
}

impl Backend for HostBackend {
    fn supports(&self, _entry: Entry) -> bool {
        true
    }

    fn create_tensor(&self, meta: &TensorMeta, initial: Option<&[u8]>) -> Result<TensorHandle> {
        let data = self.storage_for(meta, initial)?;
        let handle = self.insert_tensor(meta, false, data);
        log::debug!("host: created shared tensor #{}", handle.0);
        Ok(handle)
    }

    fn destroy_tensor(&self, tensor: TensorHandle) {
        lock(&self.tensors).remove(&tensor.0);
    }

    fn reset_tensor(&self, tensor: TensorHandle, data: &[u8]) -> Result<()> {
        let cell = lookup(&self.tensors, tensor.0)
            .ok_or_else(|| Error::rejection(STATUS_UNKNOWN_HANDLE, "unknown tensor handle"))?;
        let mut store = lock(&cell.data);
        tile_into(&mut store, data).map_err(|msg| Error::rejection(STATUS_BAD_SIZE, msg))
    }

    fn read_tensor(&self, tensor: TensorHandle) -> Result<Vec<u8>> {
        let cell = lookup(&self.tensors, tensor.0)
            .ok_or_else(|| Error::rejection(STATUS_UNKNOWN_HANDLE, "unknown tensor handle"))?;
        let store = lock(&cell.data);
        Ok(store.clone())
    }

    fn create_graph(&self) -> Result<GraphHandle> {
        let id = self.fresh_id();
        let nodes: Arc<Mutex<Vec<Node>>> = Arc::new(Mutex::new(Vec::new()));
        let (sender, receiver) = mpsc::channel();
        let worker_nodes = Arc::clone(&nodes);
        let worker_tensors = Arc::clone(&self.tensors);
        let worker = thread::Builder::new()
            .name(format!("weft-graph-{id}"))
            .spawn(move || run_worker(id, worker_nodes, worker_tensors, receiver))
            .map_err(|e| Error::rejection(STATUS_GRAPH_GONE, format!("worker spawn: {e}")))?;
        lock(&self.graphs).insert(
            id,
            GraphCell {
                nodes,
                locals: Vec::new(),
                sender,
                _worker: worker,
            },
        );
        log::debug!("host: created graph #{id}");
        Ok(GraphHandle(id))
    }

    fn destroy_graph(&self, graph: GraphHandle) {
        let cell = lock(&self.graphs).remove(&graph.0);
        if let Some(cell) = cell {
            let mut tensors = lock(&self.tensors);
            for id in cell.locals {
                tensors.remove(&id);
            }
        }
    }

    fn create_local_tensor(
        &self,
        graph: GraphHandle,
        meta: &TensorMeta,
        placeholder: bool,
    ) -> Result<TensorHandle> {
        let data = if placeholder {
            Vec::new()
        } else {
            self.storage_for(meta, None)?
        };
        let handle = self.insert_tensor(meta, placeholder, data);
        let mut graphs = lock(&self.graphs);
        let cell = graphs
            .get_mut(&graph.0)
            .ok_or_else(|| Error::rejection(STATUS_GRAPH_GONE, "graph already destroyed"))?;
        cell.locals.push(handle.0);
        Ok(handle)
    }

    fn create_operator(&self, graph: GraphHandle, config: OpConfig) -> Result<NodeHandle> {
        let expr = match &config {
            OpConfig::Arithmetic { expression } => {
                if expression.len() > MAX_EXPRESSION_LEN {
                    return Err(Error::rejection(
                        STATUS_BAD_SIZE,
                        format!("expression exceeds {MAX_EXPRESSION_LEN} bytes"),
                    ));
                }
                let parsed = crate::expr::parse(expression)
                    .map_err(|msg| Error::rejection(STATUS_BAD_EXPRESSION, msg))?;
                Some(parsed)
            }
            _ => None,
        };
        let node = Node {
            config,
            expr,
            by_name: Vec::new(),
            by_index: Vec::new(),
            results: Vec::new(),
        };
        let graphs = lock(&self.graphs);
        let cell = graphs
            .get(&graph.0)
            .ok_or_else(|| Error::rejection(STATUS_GRAPH_GONE, "graph already destroyed"))?;
        let mut nodes = lock(&cell.nodes);
        nodes.push(node);
        Ok(NodeHandle(nodes.len() as u64 - 1))
    }

    fn set_operand_by_name(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        tensor: TensorHandle,
        name: &str,
    ) -> Result<()> {
        self.with_node(graph, node, |n| {
            n.by_name.push((name.to_owned(), tensor.0));
        })
    }

    fn set_operand_by_index(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        tensor: TensorHandle,
        index: u32,
    ) -> Result<()> {
        self.with_node(graph, node, |n| {
            n.by_index.push((index, tensor.0));
        })
    }

    fn set_result_by_name(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        tensor: TensorHandle,
        name: &str,
    ) -> Result<()> {
        self.with_node(graph, node, |n| {
            n.results.push((name.to_owned(), tensor.0));
        })
    }

    fn execute_graph(&self, graph: GraphHandle, params: ExecuteParams) -> Result<RunTicket> {
        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        let ticket = Completion::new();
        let job = Job {
            run_id,
            bindings: params.bindings.iter().map(|(p, s)| (p.0, s.0)).collect(),
            wait_for: params.wait_for,
            condition: params.condition.map(|t| t.0),
            ticket: Arc::clone(&ticket),
        };
        let graphs = lock(&self.graphs);
        let cell = graphs
            .get(&graph.0)
            .ok_or_else(|| Error::rejection(STATUS_GRAPH_GONE, "graph already destroyed"))?;
        cell.sender
            .send(job)
            .map_err(|_| Error::rejection(STATUS_GRAPH_GONE, "graph worker is gone"))?;
        Ok(RunTicket {
            id: run_id,
            completion: ticket,
        })
    }
}

impl HostBackend {
    fn with_node(
        &self,
        graph: GraphHandle,
        node: NodeHandle,
        f: impl FnOnce(&mut Node),
    ) -> Result<()> {
        let graphs = lock(&self.graphs);
        let cell = graphs
            .get(&graph.0)
            .ok_or_else(|| Error::rejection(STATUS_GRAPH_GONE, "graph already destroyed"))?;
        let mut nodes = lock(&cell.nodes);
        let node = nodes
            .get_mut(node.0 as usize)
            .ok_or_else(|| Error::rejection(STATUS_UNKNOWN_HANDLE, "unknown operator handle"))?;
        f(node);
        Ok(())
    }
}

fn lookup(tensors: &TensorMap, id: u64) -> Option<TensorCell> {
    lock(tensors).get(&id).cloned()
}

fn run_worker(
    graph_id: u64,
    nodes: Arc<Mutex<Vec<Node>>>,
    tensors: TensorMap,
    receiver: Receiver<Job>,
) {
    while let Ok(job) = receiver.recv() {
        if let Some(earlier) = &job.wait_for {
            earlier.wait();
        }
        if let Some(cond) = job.condition {
            match lookup(&tensors, cond) {
                Some(cell) => {
                    let armed = match &cell.meta {
                        TensorMeta::Described(desc) => {
                            let store = lock(&cell.data);
                            (0..desc.scalar_count())
                                .any(|i| read_scalar(&store, desc.elem, i) != 0.0)
                        }
                        TensorMeta::SceneAsset => {
                            job.ticket.finish(RunStatus::Failed(
                                "condition tensor is not a data tensor".into(),
                            ));
                            continue;
                        }
                    };
                    if !armed {
                        log::debug!("graph #{graph_id} run #{}: condition zero, skipped", job.run_id);
                        job.ticket.finish(RunStatus::Skipped);
                        continue;
                    }
                }
                None => {
                    job.ticket
                        .finish(RunStatus::Failed("condition tensor is gone".into()));
                    continue;
                }
            }
        }
        let snapshot = lock(&nodes).clone();
        let mut outcome = RunStatus::Completed;
        for (idx, node) in snapshot.iter().enumerate() {
            if let Err(msg) = exec_node(node, &job.bindings, &tensors) {
                log::error!(
                    "graph #{graph_id} run #{}: node {idx} ({}) failed: {msg}",
                    job.run_id,
                    node.config.name()
                );
                outcome = RunStatus::Failed(format!("node {idx} ({}): {msg}", node.config.name()));
                break;
            }
        }
        if matches!(outcome, RunStatus::Completed) {
            log::debug!("graph #{graph_id} run #{} completed", job.run_id);
        }
        job.ticket.finish(outcome);
    }
}

type ExecResult<T> = std::result::Result<T, String>;

/// A tensor resolved for one run: descriptor plus its backing store.
struct Resolved {
    desc: TensorDescriptor,
    data: Arc<Mutex<Vec<u8>>>,
}

impl Resolved {
    fn scalar_count(&self) -> usize {
        self.desc.scalar_count()
    }

    fn read(&self, i: usize) -> f64 {
        read_scalar(&lock(&self.data), self.desc.elem, i)
    }

    fn write(&self, i: usize, v: f64) {
        write_scalar(&mut lock(&self.data), self.desc.elem, i, v);
    }
}

fn resolve(
    id: u64,
    bindings: &HashMap<u64, u64>,
    tensors: &TensorMap,
) -> ExecResult<Resolved> {
    let cell = match lookup(tensors, id) {
        Some(cell) if cell.placeholder => {
            let bound = bindings
                .get(&id)
                .ok_or_else(|| format!("placeholder #{id} has no binding"))?;
            lookup(tensors, *bound).ok_or_else(|| format!("bound tensor #{bound} is gone"))?
        }
        Some(cell) => cell,
        None => return Err(format!("tensor #{id} is gone")),
    };
    match cell.meta {
        TensorMeta::Described(desc) => Ok(Resolved {
            desc,
            data: cell.data,
        }),
        TensorMeta::SceneAsset => Err("scene assets carry no host-readable data".into()),
    }
}

fn exec_node(node: &Node, bindings: &HashMap<u64, u64>, tensors: &TensorMap) -> ExecResult<()> {
    let named = |name: &str| -> Option<u64> {
        node.by_name
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    };
    let result = |name: &str| -> ExecResult<u64> {
        node.results
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
            .ok_or_else(|| format!("result `{name}` is not attached"))
    };

    match &node.config {
        OpConfig::Assignment => {
            let src_id = named("src").ok_or("operand `src` is not attached")?;
            let src = resolve(src_id, bindings, tensors)?;
            let dst = resolve(result("dst")?, bindings, tensors)?;
            let src_view = view_of(
                &src,
                named("src slices"),
                named("src channel slice"),
                bindings,
                tensors,
            )?;
            let dst_view = view_of(
                &dst,
                named("dst slices"),
                named("dst channel slice"),
                bindings,
                tensors,
            )?;
            copy_view(&src, &src_view, &dst, &dst_view)
        }
        OpConfig::Convert => {
            let src = resolve(
                named("src").ok_or("operand `src` is not attached")?,
                bindings,
                tensors,
            )?;
            let dst = resolve(result("dst")?, bindings, tensors)?;
            let n = dst.scalar_count();
            if src.scalar_count() != n {
                return Err(format!(
                    "convert source has {} scalar(s), destination has {n}",
                    src.scalar_count()
                ));
            }
            for i in 0..n {
                let v = src.read(i);
                dst.write(i, v);
            }
            Ok(())
        }
        OpConfig::Arithmetic { .. } => {
            let expr = node.expr.as_ref().ok_or("expression was not parsed")?;
            exec_arithmetic(expr, node, bindings, tensors)
        }
        OpConfig::Compare(rel) => {
            let a = resolve(
                named("operand0").ok_or("operand `operand0` is not attached")?,
                bindings,
                tensors,
            )?;
            let b = resolve(
                named("operand1").ok_or("operand `operand1` is not attached")?,
                bindings,
                tensors,
            )?;
            let out = resolve(result("result")?, bindings, tensors)?;
            let n = out.scalar_count();
            check_broadcast(a.scalar_count(), n, "operand0")?;
            check_broadcast(b.scalar_count(), n, "operand1")?;
            for i in 0..n {
                let l = a.read(i % a.scalar_count());
                let r = b.read(i % b.scalar_count());
                let hit = match rel {
                    Relation::Lt => l < r,
                    Relation::Le => l <= r,
                    Relation::Gt => l > r,
                    Relation::Ge => l >= r,
                    Relation::Eq => l == r,
                    Relation::Ne => l != r,
                };
                out.write(i, if hit { 1.0 } else { 0.0 });
            }
            Ok(())
        }
        OpConfig::Elementwise(op) => {
            let a = resolve(
                named("operand0").ok_or("operand `operand0` is not attached")?,
                bindings,
                tensors,
            )?;
            let b = resolve(
                named("operand1").ok_or("operand `operand1` is not attached")?,
                bindings,
                tensors,
            )?;
            let out = resolve(result("result")?, bindings, tensors)?;
            let n = out.scalar_count();
            check_broadcast(a.scalar_count(), n, "operand0")?;
            check_broadcast(b.scalar_count(), n, "operand1")?;
            for i in 0..n {
                let l = a.read(i % a.scalar_count());
                let r = b.read(i % b.scalar_count());
                let v = match op {
                    ElementwiseOp::Min => l.min(r),
                    ElementwiseOp::Max => l.max(r),
                    ElementwiseOp::Multiply => l * r,
                    ElementwiseOp::Or => {
                        if l != 0.0 || r != 0.0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    ElementwiseOp::And => {
                        if l != 0.0 && r != 0.0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                };
                out.write(i, v);
            }
            Ok(())
        }
        OpConfig::All | OpConfig::Any => {
            let input = resolve(
                named("operand").ok_or("operand `operand` is not attached")?,
                bindings,
                tensors,
            )?;
            let out = resolve(result("result")?, bindings, tensors)?;
            let mut all = true;
            let mut any = false;
            for i in 0..input.scalar_count() {
                if input.read(i) != 0.0 {
                    any = true;
                } else {
                    all = false;
                }
            }
            let hit = if matches!(node.config, OpConfig::All) {
                all
            } else {
                any
            };
            out.write(0, if hit { 1.0 } else { 0.0 });
            Ok(())
        }
        other => Err(format!(
            "operator `{}` requires a device executor",
            other.name()
        )),
    }
}

fn check_broadcast(have: usize, want: usize, name: &str) -> ExecResult<()> {
    if have == want || have == 1 || (want > 0 && want % have == 0) {
        Ok(())
    } else {
        Err(format!(
            "operand `{name}` has {have} scalars, result expects {want}"
        ))
    }
}

fn exec_arithmetic(
    expr: &Expr,
    node: &Node,
    bindings: &HashMap<u64, u64>,
    tensors: &TensorMap,
) -> ExecResult<()> {
    let mut indexed: Vec<(u32, u64)> = node.by_index.clone();
    indexed.sort_by_key(|(i, _)| *i);
    let mut operands = Vec::with_capacity(indexed.len());
    for (_, id) in &indexed {
        operands.push(resolve(*id, bindings, tensors)?);
    }
    if let Some(max) = expr.max_operand() {
        if max >= operands.len() {
            return Err(format!(
                "expression references operand {{{max}}}, only {} attached",
                operands.len()
            ));
        }
    }
    let out = resolve(
        node.results
            .iter()
            .find(|(n, _)| n == "result")
            .map(|(_, id)| *id)
            .ok_or("result `result` is not attached")?,
        bindings,
        tensors,
    )?;
    let n = out.scalar_count();
    for op in &operands {
        check_broadcast(op.scalar_count(), n, "arithmetic operand")?;
    }
    for i in 0..n {
        let v = expr.eval(&|j| {
            let op = &operands[j];
            op.read(i % op.scalar_count())
        });
        out.write(i, v);
    }
    Ok(())
}

/// Element positions and channel indices selected on one tensor.
struct View {
    positions: Vec<usize>,
    channels: Vec<usize>,
}

fn view_of(
    target: &Resolved,
    ranges_id: Option<u64>,
    channel_id: Option<u64>,
    bindings: &HashMap<u64, u64>,
    tensors: &TensorMap,
) -> ExecResult<View> {
    let dims: Vec<usize> = target.desc.dimensions.iter().map(|&d| d as usize).collect();
    let positions = match ranges_id {
        None => (0..target.desc.element_count()).collect(),
        Some(id) => {
            let slice = resolve(id, bindings, tensors)?;
            let lists = decode_ranges(&slice, &dims)?;
            flatten(&lists, &dims)
        }
    };
    let ch_total = target.desc.channels as usize;
    let channels = match channel_id {
        None => (0..ch_total).collect(),
        Some(id) => {
            let slice = resolve(id, bindings, tensors)?;
            let lists = decode_ranges(&slice, &[ch_total])?;
            lists.into_iter().next().unwrap_or_default()
        }
    };
    Ok(View {
        positions,
        channels,
    })
}

/// Decodes a slice tensor into one index list per target dimension.
fn decode_ranges(slice: &Resolved, dims: &[usize]) -> ExecResult<Vec<Vec<usize>>> {
    if slice.desc.usage != Usage::Slice {
        return Err("slice operand does not have slice usage".into());
    }
    let rank = slice.desc.element_count();
    if rank != dims.len() {
        return Err(format!(
            "slice covers {rank} dimension(s), target has {}",
            dims.len()
        ));
    }
    let ch = slice.desc.channels as usize;
    let store = lock(&slice.data);
    let mut lists = Vec::with_capacity(rank);
    for (d, &len) in dims.iter().enumerate() {
        let begin = read_scalar(&store, ElemType::I32, d * ch) as i64;
        let end = read_scalar(&store, ElemType::I32, d * ch + 1) as i64;
        let step = if ch == 3 {
            read_scalar(&store, ElemType::I32, d * ch + 2) as i64
        } else {
            1
        };
        lists.push(expand_range(begin, end, step, len)?);
    }
    Ok(lists)
}

/// Expands one `[begin, end, step]` triple over a dimension of length `len`.
/// A negative `end` selects up to the far boundary in the step's direction.
fn expand_range(begin: i64, end: i64, step: i64, len: usize) -> ExecResult<Vec<usize>> {
    if step == 0 {
        return Err("slice step must be non-zero".into());
    }
    if begin < 0 || begin as usize >= len {
        return Err(format!("slice begin {begin} out of range for length {len}"));
    }
    let mut out = Vec::new();
    if step > 0 {
        let stop = if end < 0 {
            (len as i64 + end + 1).min(len as i64)
        } else {
            end.min(len as i64)
        };
        let mut i = begin;
        while i < stop {
            out.push(i as usize);
            i += step;
        }
    } else {
        let stop = if end < 0 { -1 } else { end };
        let mut i = begin;
        while i > stop {
            out.push(i as usize);
            i += step;
        }
    }
    Ok(out)
}

/// Cartesian product of per-dimension index lists, flattened row-major.
fn flatten(lists: &[Vec<usize>], dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    for d in (0..dims.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * dims[d + 1];
    }
    let total: usize = lists.iter().map(Vec::len).product();
    let mut out = Vec::with_capacity(total);
    let mut odometer = vec![0usize; lists.len()];
    if lists.iter().any(Vec::is_empty) {
        return out;
    }
    loop {
        let flat: usize = odometer
            .iter()
            .zip(lists)
            .zip(&strides)
            .map(|((&pos, list), &stride)| list[pos] * stride)
            .sum();
        out.push(flat);
        let mut d = lists.len();
        loop {
            if d == 0 {
                return out;
            }
            d -= 1;
            odometer[d] += 1;
            if odometer[d] < lists[d].len() {
                break;
            }
            odometer[d] = 0;
        }
    }
}

fn copy_view(src: &Resolved, sv: &View, dst: &Resolved, dv: &View) -> ExecResult<()> {
    if sv.positions.len() != dv.positions.len() || sv.channels.len() != dv.channels.len() {
        return Err(format!(
            "selection mismatch: {}x{} source vs {}x{} destination",
            sv.positions.len(),
            sv.channels.len(),
            dv.positions.len(),
            dv.channels.len()
        ));
    }
    let src_ch = src.desc.channels as usize;
    let dst_ch = dst.desc.channels as usize;
    // Read everything first so overlapping src/dst selections stay sound.
    let mut staged = Vec::with_capacity(sv.positions.len() * sv.channels.len());
    for &pos in &sv.positions {
        for &ch in &sv.channels {
            staged.push(src.read(pos * src_ch + ch));
        }
    }
    let mut it = staged.into_iter();
    for &pos in &dv.positions {
        for &ch in &dv.channels {
            if let Some(v) = it.next() {
                dst.write(pos * dst_ch + ch, v);
            }
        }
    }
    Ok(())
}

fn read_scalar(bytes: &[u8], elem: ElemType, i: usize) -> f64 {
    let w = elem.byte_width();
    let at = i * w;
    match elem {
        ElemType::I8 => bytes[at] as i8 as f64,
        ElemType::U8 => bytes[at] as f64,
        ElemType::I16 => {
            let mut b = [0u8; 2];
            b.copy_from_slice(&bytes[at..at + 2]);
            i16::from_ne_bytes(b) as f64
        }
        ElemType::U16 => {
            let mut b = [0u8; 2];
            b.copy_from_slice(&bytes[at..at + 2]);
            u16::from_ne_bytes(b) as f64
        }
        ElemType::I32 => {
            let mut b = [0u8; 4];
            b.copy_from_slice(&bytes[at..at + 4]);
            i32::from_ne_bytes(b) as f64
        }
        ElemType::F32 => {
            let mut b = [0u8; 4];
            b.copy_from_slice(&bytes[at..at + 4]);
            f32::from_ne_bytes(b) as f64
        }
        ElemType::F64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[at..at + 8]);
            f64::from_ne_bytes(b)
        }
    }
}

fn write_scalar(bytes: &mut [u8], elem: ElemType, i: usize, v: f64) {
    let w = elem.byte_width();
    let at = i * w;
    match elem {
        ElemType::I8 => bytes[at] = (v as i8) as u8,
        ElemType::U8 => bytes[at] = v as u8,
        ElemType::I16 => bytes[at..at + 2].copy_from_slice(&(v as i16).to_ne_bytes()),
        ElemType::U16 => bytes[at..at + 2].copy_from_slice(&(v as u16).to_ne_bytes()),
        ElemType::I32 => bytes[at..at + 4].copy_from_slice(&(v as i32).to_ne_bytes()),
        ElemType::F32 => bytes[at..at + 4].copy_from_slice(&(v as f32).to_ne_bytes()),
        ElemType::F64 => bytes[at..at + 8].copy_from_slice(&v.to_ne_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_range_forward() {
        assert_eq!(expand_range(0, 3, 1, 5).unwrap(), vec![0, 1, 2]);
        assert_eq!(expand_range(1, -1, 2, 6).unwrap(), vec![1, 3, 5]);
        assert_eq!(expand_range(0, -1, 1, 4).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn expand_range_backward() {
        assert_eq!(expand_range(3, -1, -1, 5).unwrap(), vec![3, 2, 1, 0]);
        assert_eq!(expand_range(4, 1, -2, 5).unwrap(), vec![4, 2]);
    }

    #[test]
    fn expand_range_rejects_bad_input() {
        assert!(expand_range(0, 3, 0, 5).is_err());
        assert!(expand_range(-1, 3, 1, 5).is_err());
        assert!(expand_range(5, 6, 1, 5).is_err());
    }

    #[test]
    fn flatten_row_major() {
        let lists = vec![vec![0, 2], vec![1]];
        assert_eq!(flatten(&lists, &[3, 4]), vec![1, 9]);
    }

    #[test]
    fn tiling_repeats_pattern() {
        let mut store = vec![0u8; 6];
        tile_into(&mut store, &[1, 2, 3]).unwrap();
        assert_eq!(store, vec![1, 2, 3, 1, 2, 3]);
        assert!(tile_into(&mut store, &[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn scalar_round_trip() {
        let mut bytes = vec![0u8; 8];
        write_scalar(&mut bytes, ElemType::F32, 1, 2.5);
        assert_eq!(read_scalar(&bytes, ElemType::F32, 1), 2.5);
        write_scalar(&mut bytes, ElemType::I16, 0, -3.0);
        assert_eq!(read_scalar(&bytes, ElemType::I16, 0), -3.0);
    }
}
