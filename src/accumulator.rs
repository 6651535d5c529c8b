//! Accumulator shapes shared by several combiners and transforms.

use serde::{Deserialize, Serialize};

/// A single value that may not have been set yet.
///
/// The accumulator of generic binary combiners: empty until the first input
/// arrives. Modeled as an `Option` so an absent holder has no value to read.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Holder<V>(Option<V>);

impl<V> Holder<V> {
    pub fn empty() -> Self {
        Holder(None)
    }

    pub fn of(value: V) -> Self {
        Holder(Some(value))
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    pub fn value(&self) -> Option<&V> {
        self.0.as_ref()
    }

    pub fn set(&mut self, value: V) {
        self.0 = Some(value);
    }

    pub fn take(&mut self) -> Option<V> {
        self.0.take()
    }

    pub fn into_inner(self) -> Option<V> {
        self.0
    }
}

impl<V> Default for Holder<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V> From<Option<V>> for Holder<V> {
    fn from(v: Option<V>) -> Self {
        Holder(v)
    }
}

/// Either a raw input or a partial accumulator, never both.
///
/// Lets one combine stage accept freshly grouped inputs next to accumulators
/// that were pre-combined elsewhere (hot-key shards, lifted bundles).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputOrAccum<I, A> {
    Input(I),
    Accum(A),
}

impl<I, A> InputOrAccum<I, A> {
    pub fn is_input(&self) -> bool {
        matches!(self, InputOrAccum::Input(_))
    }

    pub fn is_accum(&self) -> bool {
        matches!(self, InputOrAccum::Accum(_))
    }
}
