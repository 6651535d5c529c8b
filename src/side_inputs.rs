//! Read-only broadcast values visible to every combine invocation.
//!
//! A [`SideInput<T>`] holds a list of values per window. Combine transforms
//! register the side inputs they read with `with_side_inputs`; before the
//! first `add_input` of a `(key, window)` group the executor resolves every
//! registered side input for that window into a [`CombineContext`], which the
//! keyed combiner then reads. Nothing in this module is ever mutated after
//! construction.

use crate::window::BoundedWindow;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SIDE_INPUT_ID: AtomicU64 = AtomicU64::new(0);

/// Per-window broadcast values.
///
/// Lookups for a window with no values of its own fall back to the values
/// in the global window, so a side input built with [`side_vec`] is visible
/// from every window.
pub struct SideInput<T> {
    id: u64,
    by_window: Arc<HashMap<BoundedWindow, Arc<Vec<T>>>>,
}

impl<T> Clone for SideInput<T> {
    fn clone(&self) -> Self {
        Self { id: self.id, by_window: Arc::clone(&self.by_window) }
    }
}

impl<T> SideInput<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Values visible from `window`.
    pub fn values_for(&self, window: &BoundedWindow) -> Arc<Vec<T>> {
        self.by_window
            .get(window)
            .or_else(|| self.by_window.get(&BoundedWindow::Global))
            .cloned()
            .unwrap_or_default()
    }
}

/// Side input whose values are visible from every window.
pub fn side_vec<T: Send + Sync + 'static>(v: Vec<T>) -> SideInput<T> {
    side_windowed(vec![(BoundedWindow::Global, v)])
}

/// Side input with distinct values per window.
pub fn side_windowed<T: Send + Sync + 'static>(
    per_window: Vec<(BoundedWindow, Vec<T>)>,
) -> SideInput<T> {
    let mut by_window: HashMap<BoundedWindow, Vec<T>> = HashMap::new();
    for (w, vs) in per_window {
        by_window.entry(w).or_default().extend(vs);
    }
    SideInput {
        id: NEXT_SIDE_INPUT_ID.fetch_add(1, Ordering::Relaxed),
        by_window: Arc::new(by_window.into_iter().map(|(w, v)| (w, Arc::new(v))).collect()),
    }
}

/// Type-erased side input, so transforms can hold a list of mixed types.
trait ErasedSideInput: Send + Sync {
    fn id(&self) -> u64;
    fn resolve(&self, window: &BoundedWindow) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Send + Sync + 'static> ErasedSideInput for SideInput<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn resolve(&self, window: &BoundedWindow) -> Arc<dyn Any + Send + Sync> {
        self.values_for(window)
    }
}

/// The side inputs registered on one transform.
#[derive(Clone, Default)]
pub struct SideInputs(Vec<Arc<dyn ErasedSideInput>>);

impl SideInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy with `side` appended.
    pub fn and<T: Send + Sync + 'static>(&self, side: &SideInput<T>) -> Self {
        let mut v = self.0.clone();
        v.push(Arc::new(side.clone()));
        SideInputs(v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve every registered side input for `window`.
    pub fn resolve(&self, window: BoundedWindow) -> CombineContext {
        let resolved = self.0.iter().map(|s| (s.id(), s.resolve(&window))).collect();
        CombineContext { window, resolved }
    }
}

impl<T: Send + Sync + 'static> From<&SideInput<T>> for SideInputs {
    fn from(side: &SideInput<T>) -> Self {
        SideInputs::new().and(side)
    }
}

/// Ambient context of one `(key, window)` combine group.
pub struct CombineContext {
    window: BoundedWindow,
    resolved: HashMap<u64, Arc<dyn Any + Send + Sync>>,
}

impl CombineContext {
    /// Context of the global window with no side inputs.
    pub fn global() -> Self {
        Self::for_window(BoundedWindow::Global)
    }

    pub fn for_window(window: BoundedWindow) -> Self {
        Self { window, resolved: HashMap::new() }
    }

    pub fn window(&self) -> &BoundedWindow {
        &self.window
    }

    /// Values of `side` for this group's window, or `None` when `side` was
    /// not registered on the transform running this combine.
    pub fn side_input<T: Send + Sync + 'static>(&self, side: &SideInput<T>) -> Option<&[T]> {
        self.resolved
            .get(&side.id())
            .and_then(|v| v.downcast_ref::<Vec<T>>())
            .map(|v| v.as_slice())
    }
}
