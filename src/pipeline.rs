//! The pipeline graph and its coder registry.

use crate::coders::{Coder, CoderRegistry};
use crate::node::Node;
use crate::node_id::NodeId;
use crate::type_token::{TypeTag, vec_ops_for};
use crate::window::WindowedValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A deferred-execution graph of transforms.
///
/// Cloning is cheap and yields another handle to the same graph. Nothing is
/// executed until a collection is collected.
pub struct Pipeline {
    pub(crate) inner: Arc<Mutex<PipelineInner>>,
}

pub(crate) struct PipelineInner {
    pub next_id: u64,
    pub nodes: HashMap<NodeId, Node>,
    pub coders: CoderRegistry,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PipelineInner {
                next_id: 0,
                nodes: HashMap::new(),
                coders: CoderRegistry::with_standard_coders(),
            })),
        }
    }
}

/// Allow `Pipeline` cloning.
impl Clone for Pipeline {
    fn clone(&self) -> Self {
        Pipeline { inner: Arc::clone(&self.inner) }
    }
}

impl Pipeline {
    fn lock(&self) -> MutexGuard<'_, PipelineInner> {
        // Every mutation is a single insert, so a poisoned graph is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert_node(&self, node: Node) -> NodeId {
        let mut g = self.lock();
        let id = NodeId::new(g.next_id);
        g.next_id += 1;
        g.nodes.insert(id, node);
        id
    }

    pub(crate) fn add_source<T: Clone + Send + Sync + 'static>(
        &self,
        data: Vec<WindowedValue<T>>,
    ) -> NodeId {
        self.insert_node(Node::Source {
            payload: Arc::new(data),
            vec_ops: vec_ops_for::<WindowedValue<T>>(),
            elem_tag: TypeTag::of::<T>(),
        })
    }

    /// Copy of the graph, for the runner.
    pub(crate) fn snapshot(&self) -> HashMap<NodeId, Node> {
        self.lock().nodes.clone()
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    /// Snapshot of the coder registry used by transforms built on this pipeline.
    pub fn coder_registry(&self) -> CoderRegistry {
        self.lock().coders.clone()
    }

    /// Register (or replace) the coder used for `T` by later transforms.
    pub fn register_coder<T: 'static>(&self, coder: Arc<dyn Coder<T>>) {
        self.lock().coders.register::<T>(coder);
    }
}
