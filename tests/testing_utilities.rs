use ironbeam_combine::combine_fn::CombineFn;
use ironbeam_combine::combiners::Sum;
use ironbeam_combine::testing::*;
use ironbeam_combine::*;

#[test]
fn test_pipeline_counts_nodes() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    assert_eq!(p.node_count(), 0);
    let doubled = from_vec(&p, vec![1, 2, 3]).map(|x: &i32| x * 2);
    assert_eq!(p.node_count(), 2);
    assert_collections_equal(&doubled.collect_seq()?, &[2, 4, 6]);
    Ok(())
}

#[test]
#[should_panic(expected = "Collection length mismatch")]
fn unordered_equal_detects_length_mismatch() {
    assert_collections_unordered_equal(&[1, 2], &[1, 2, 3]);
}

/// Drops every merged accumulator but the first.
struct ForgetfulSum;

impl CombineFn<i64, i64, i64> for ForgetfulSum {
    fn create_accumulator(&self) -> i64 {
        0
    }
    fn add_input(&self, acc: i64, input: i64) -> i64 {
        acc + input
    }
    fn merge_accumulators(&self, accs: Vec<i64>) -> i64 {
        accs.into_iter().next().unwrap_or(0)
    }
    fn extract_output(&self, acc: i64) -> i64 {
        acc
    }
}

#[test]
#[should_panic(expected = "differs from a single pass")]
fn combine_fn_consistency_catches_lossy_merges() {
    assert_combine_fn_consistent(&ForgetfulSum, &[1, 2, 3]);
}

#[test]
fn combine_fn_consistency_accepts_lawful_combiners() {
    assert_combine_fn_consistent(&Sum::<i64>::new(), &[]);
    assert_combine_fn_consistent(&Sum::<i64>::new(), &[5, -5, 7]);
}
