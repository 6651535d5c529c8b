//! Graph nodes evaluated by the [`Runner`](crate::runner::Runner).
//!
//! Every node reads and writes bundles of `Vec<WindowedValue<T>>`, type-erased
//! as [`Partition`]s. Typed closures built by the collection API do the
//! downcasting, so the runner itself never needs to know element types.

use crate::node_id::NodeId;
use crate::type_token::{Partition, TypeTag, VecOps};
use std::any::Any;
use std::sync::Arc;

/// A per-bundle, stateless transformation.
pub(crate) trait DynOp: Send + Sync {
    fn apply(&self, input: &dyn Any) -> anyhow::Result<Partition>;
}

/// Grouping phase run on every input bundle independently.
pub(crate) type LocalFn = Arc<dyn Fn(&dyn Any) -> anyhow::Result<Partition> + Send + Sync>;

/// Grouping phase that merges all local results and re-splits them into at
/// most `n` output bundles.
pub(crate) type MergeFn =
    Arc<dyn Fn(Vec<Partition>, usize) -> anyhow::Result<Vec<Partition>> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Node {
    /// In-memory elements, split into bundles at run time.
    Source {
        payload: Arc<dyn Any + Send + Sync>,
        vec_ops: Arc<dyn VecOps>,
        elem_tag: TypeTag,
    },

    /// A chain of element-wise ops, fused per bundle.
    Stateless {
        input: NodeId,
        ops: Vec<Arc<dyn DynOp>>,
    },

    /// Group `(K, V)` by key and window: `local` per bundle, then `merge`.
    GroupByKey {
        input: NodeId,
        local: LocalFn,
        merge: MergeFn,
    },

    /// Concatenation of the bundles of several same-typed nodes.
    Flatten { inputs: Vec<NodeId> },
}

impl Node {
    pub(crate) fn inputs(&self) -> Vec<NodeId> {
        match self {
            Node::Source { .. } => Vec::new(),
            Node::Stateless { input, .. } | Node::GroupByKey { input, .. } => vec![*input],
            Node::Flatten { inputs } => inputs.clone(),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Node::Source { .. } => "source",
            Node::Stateless { .. } => "stateless",
            Node::GroupByKey { .. } => "group_by_key",
            Node::Flatten { .. } => "flatten",
        }
    }
}
