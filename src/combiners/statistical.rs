//! Statistical combiners: `Mean`

use crate::coders::{Coder, CoderRegistry, F64Coder, KvCoder, U64Coder};
use crate::combine_fn::CombineFn;
use crate::error::CoderError;
use std::sync::Arc;

/* ===================== Mean ===================== */

/// Arithmetic mean of values as `f64`.
///
/// Values must be convertible into `f64` via `Into<f64>`.
///
/// - Accumulator: `(sum_f64, count_u64)`
/// - Output: `f64`
///
/// Empty groups produce `0.0`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mean;

impl<V> CombineFn<V, (f64, u64), f64> for Mean
where
    V: Into<f64>,
{
    fn create_accumulator(&self) -> (f64, u64) {
        (0.0, 0)
    }

    fn add_input(&self, acc: (f64, u64), v: V) -> (f64, u64) {
        (acc.0 + v.into(), acc.1 + 1)
    }

    fn merge_accumulators(&self, accs: Vec<(f64, u64)>) -> (f64, u64) {
        accs.into_iter()
            .fold((0.0, 0), |acc, other| (acc.0 + other.0, acc.1 + other.1))
    }

    #[allow(clippy::cast_precision_loss)]
    fn extract_output(&self, acc: (f64, u64)) -> f64 {
        if acc.1 == 0 {
            0.0
        } else {
            acc.0 / (acc.1 as f64)
        }
    }

    fn accumulator_coder(
        &self,
        _registry: &CoderRegistry,
        _input_coder: Option<&Arc<dyn Coder<V>>>,
    ) -> Result<Arc<dyn Coder<(f64, u64)>>, CoderError> {
        Ok(Arc::new(KvCoder::new(Arc::new(F64Coder), Arc::new(U64Coder))))
    }

    fn output_coder(
        &self,
        _registry: &CoderRegistry,
        _input_coder: Option<&Arc<dyn Coder<V>>>,
    ) -> Result<Arc<dyn Coder<f64>>, CoderError> {
        Ok(Arc::new(F64Coder))
    }
}
