//! Type tags and type-erased bundle helpers.
//!
//! This module provides:
//! - [`Partition`] / [`Bundle`]: the type-erased buffers the runner moves
//!   between nodes. A bundle always holds a `Vec<WindowedValue<T>>`.
//! - [`TypeTag`]: a lightweight runtime type identifier attached to sources so
//!   type mismatches surface with a readable name.
//! - [`VecOps`]: a type-erased interface for the `Vec` operations the runner
//!   needs on source payloads (length and splitting).

use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

/// A freshly produced, exclusively owned buffer.
pub(crate) type Partition = Box<dyn Any + Send + Sync>;

/// A finished buffer; shared when a node feeds several consumers.
pub(crate) type Bundle = Arc<dyn Any + Send + Sync>;

/// A lightweight runtime type tag for debugging and error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    /// Stable Rust type identifier.
    pub id: TypeId,
    /// Human-readable type name (best-effort).
    pub name: &'static str,
}

impl TypeTag {
    /// Construct a tag for `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

/// Type-erased helpers for `Vec<E>` source payloads.
///
/// Implementations return `None` when `data` is not the `Vec<E>` they expect.
pub(crate) trait VecOps: Send + Sync {
    fn len(&self, data: &dyn Any) -> Option<usize>;

    /// Split `data` into up to `n` contiguous bundles, preserving order.
    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>>;
}

struct VecOpsImpl<E>(PhantomData<fn() -> E>);

impl<E: Clone + Send + Sync + 'static> VecOps for VecOpsImpl<E> {
    fn len(&self, data: &dyn Any) -> Option<usize> {
        data.downcast_ref::<Vec<E>>().map(Vec::len)
    }

    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>> {
        let v = data.downcast_ref::<Vec<E>>()?;
        let len = v.len();

        if n <= 1 || len <= 1 {
            return Some(vec![Box::new(v.clone())]);
        }

        let chunk = len.div_ceil(n);
        let parts = v
            .chunks(chunk)
            .map(|c| Box::new(c.to_vec()) as Partition)
            .collect();
        Some(parts)
    }
}

/// Create a type-erased `VecOps` for `Vec<E>`.
pub(crate) fn vec_ops_for<E: Clone + Send + Sync + 'static>() -> Arc<dyn VecOps> {
    Arc::new(VecOpsImpl::<E>(PhantomData))
}
