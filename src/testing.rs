//! Helpers for testing pipelines and combiners.
//!
//! ```
//! use ironbeam_combine::*;
//! use ironbeam_combine::combiners::Sum;
//! use ironbeam_combine::testing::*;
//!
//! let p = TestPipeline::new();
//! let out = from_vec(&p, vec![("b", 2u64), ("a", 1), ("b", 3)])
//!     .apply(Combine::per_key(Sum::<u64>::new()))?
//!     .collect_par(None, Some(2))?;
//! assert_kv_collections_equal(out, vec![("a", 1), ("b", 5)]);
//!
//! assert_combine_fn_consistent(&Sum::<u64>::new(), &[1, 2, 3, 4, 5]);
//! # anyhow::Result::<()>::Ok(())
//! ```

pub mod assertions;

pub use assertions::*;

use crate::pipeline::Pipeline;

/// A pipeline for tests; derefs to [`Pipeline`].
pub struct TestPipeline {
    pipeline: Pipeline,
}

impl TestPipeline {
    pub fn new() -> Self {
        Self { pipeline: Pipeline::default() }
    }

    /// Number of nodes added so far.
    pub fn node_count(&self) -> usize {
        self.pipeline.node_count()
    }
}

impl Default for TestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestPipeline {
    type Target = Pipeline;

    fn deref(&self) -> &Self::Target {
        &self.pipeline
    }
}

impl AsRef<Pipeline> for TestPipeline {
    fn as_ref(&self) -> &Pipeline {
        &self.pipeline
    }
}
