use ironbeam_combine::coders::{Coder, CoderRegistry, I64Coder, KvCoder, StringUtf8Coder};
use ironbeam_combine::combine_fn::{CombineFn, KeyedCombineFn};
use ironbeam_combine::combiners::{Count, Max, Mean, Sum, binary_combine_fn};
use ironbeam_combine::testing::*;
use ironbeam_combine::*;
use std::sync::Arc;

fn sales(p: &Pipeline) -> PCollection<(String, u64)> {
    let rows = (0..200u64).map(|i| (format!("k{}", i % 7), i)).collect();
    from_vec(p, rows)
}

fn expected_sales() -> Vec<(String, u64)> {
    (0..7u64)
        .map(|k| (format!("k{k}"), (0..200u64).filter(|i| i % 7 == k).sum()))
        .collect()
}

#[test]
fn per_key_sum_sequential_and_parallel_agree() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let seq = sales(&p).apply(Combine::per_key(Sum::<u64>::new()))?.collect_seq()?;
    let par = sales(&p)
        .apply(Combine::per_key(Sum::<u64>::new()))?
        .collect_par(Some(4), Some(16))?;

    assert_kv_collections_equal(seq, expected_sales());
    assert_kv_collections_equal(par, expected_sales());
    Ok(())
}

#[test]
fn one_output_per_key() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let out = from_vec(&p, vec![("a", 1u32), ("b", 2), ("a", 3), ("c", 4), ("a", 5)])
        .apply(Combine::per_key(Count))?
        .collect_par(None, Some(3))?;
    assert_kv_collections_equal(out, vec![("a", 3), ("b", 1), ("c", 1)]);
    Ok(())
}

#[test]
fn lifting_and_few_keys_do_not_change_results() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let lifted = sales(&p)
        .apply(Combine::per_key(Sum::<u64>::new()).with_combiner_lifting())?
        .collect_par(None, Some(9))?;
    let few = sales(&p)
        .apply(Combine::per_key(Sum::<u64>::new()).with_few_keys(true))?
        .collect_par(None, Some(9))?;
    let shorthand = sales(&p).combine_values_lifted(Sum::<u64>::new())?.collect_seq()?;

    assert_kv_collections_equal(lifted, expected_sales());
    assert_kv_collections_equal(few, expected_sales());
    assert_kv_collections_equal(shorthand, expected_sales());
    Ok(())
}

#[test]
fn lifted_mean_merges_partial_accumulators() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let data: Vec<(u32, u32)> = (1..=100u32).map(|i| (i % 2, i)).collect();
    let out = from_vec(&p, data)
        .apply(Combine::per_key(Mean).with_combiner_lifting())?
        .collect_par(None, Some(10))?;
    assert_kv_collections_equal(out, vec![(0, 51.0), (1, 50.0)]);
    Ok(())
}

#[test]
fn per_key_respects_windows() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let events = from_timestamped(
        &p,
        vec![
            Timestamped::new(1_000, ("a", 1u64)),
            Timestamped::new(2_000, ("a", 2)),
            Timestamped::new(12_000, ("a", 10)),
            Timestamped::new(3_000, ("b", 5)),
        ],
    );
    let out = events
        .window_into(WindowFn::fixed(10_000)?)
        .apply(Combine::per_key(Sum::<u64>::new()))?
        .collect_windowed_par(None, Some(2))?;

    let first = BoundedWindow::Interval(IntervalWindow::new(0, 10_000));
    let second = BoundedWindow::Interval(IntervalWindow::new(10_000, 20_000));
    assert_values_per_window(
        &out,
        vec![(first, vec![("a", 3), ("b", 5)]), (second, vec![("a", 10)])],
    );
    assert_all(&out, |wv| wv.timestamp == wv.window.max_timestamp());
    Ok(())
}

#[test]
fn output_coder_is_derived_from_key_and_combiner() -> anyhow::Result<()> {
    #[derive(Clone)]
    struct Opaque;

    let p = TestPipeline::new();
    let counted = from_vec(&p, vec![("x".to_string(), Opaque), ("y".to_string(), Opaque)])
        .apply(Combine::per_key(Count))?;
    assert_eq!(
        counted.coder().map(|c| c.describe()),
        Some("KvCoder(StringUtf8Coder, U64Coder)".to_string())
    );
    Ok(())
}

#[test]
fn unavailable_output_coder_is_deferred() -> anyhow::Result<()> {
    #[derive(Clone, Debug, PartialEq)]
    struct Opaque(u64);

    let p = TestPipeline::new();
    let out = from_vec(&p, vec![("k".to_string(), Opaque(1)), ("k".to_string(), Opaque(2))])
        .apply(Combine::per_key_fn(|v: Vec<Opaque>| Opaque(v.iter().map(|o| o.0).sum())))?;
    assert!(out.coder().is_none());
    assert_eq!(out.collect_seq()?, vec![("k".to_string(), Opaque(3))]);
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
struct Celsius(i64);

struct CelsiusCoder;

impl Coder<Celsius> for CelsiusCoder {
    fn encode(&self, value: &Celsius, out: &mut dyn std::io::Write) -> Result<(), CoderError> {
        I64Coder.encode(&value.0, out)
    }

    fn decode(&self, input: &mut dyn std::io::Read) -> Result<Celsius, CoderError> {
        I64Coder.decode(input).map(Celsius)
    }

    fn describe(&self) -> String {
        "CelsiusCoder".to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[test]
fn registered_coder_binds_the_output() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    p.register_coder::<Celsius>(Arc::new(CelsiusCoder));
    let out = from_vec(&p, vec![("k".to_string(), Celsius(-3)), ("k".to_string(), Celsius(11))])
        .apply(Combine::per_key_fn(|v: Vec<Celsius>| Celsius(v.iter().map(|c| c.0).max().unwrap_or(0))))?;
    assert_eq!(
        out.coder().map(|c| c.describe()),
        Some("KvCoder(StringUtf8Coder, CelsiusCoder)".to_string())
    );
    assert_eq!(out.collect_seq()?, vec![("k".to_string(), Celsius(11))]);
    Ok(())
}

fn readings(p: &Pipeline) -> PCollection<(String, Celsius)> {
    let key: Arc<dyn Coder<String>> = Arc::new(StringUtf8Coder);
    let value: Arc<dyn Coder<Celsius>> = Arc::new(CelsiusCoder);
    from_vec(
        p,
        vec![
            ("oslo".to_string(), Celsius(-4)),
            ("oslo".to_string(), Celsius(2)),
            ("rome".to_string(), Celsius(17)),
        ],
    )
    .set_coder(Arc::new(KvCoder::new(key, value)))
}

#[test]
fn grouping_carries_the_input_coder() {
    let p = TestPipeline::new();
    let grouped = readings(&p).group_by_key();
    assert_eq!(
        grouped.coder().map(|c| c.describe()),
        Some("KvCoder(StringUtf8Coder, IterableCoder(CelsiusCoder))".to_string())
    );
}

#[test]
fn input_coder_reaches_the_combiner_on_every_path() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let warmest = Combine::per_key(binary_combine_fn(|a: &Celsius, b: &Celsius| {
        if a.0 >= b.0 { a.clone() } else { b.clone() }
    }));
    let expected = vec![("oslo".to_string(), Some(Celsius(2))), ("rome".to_string(), Some(Celsius(17)))];

    for transform in [
        warmest.clone(),
        warmest.with_combiner_lifting(),
        warmest.with_hot_key_fanout_const(3),
    ] {
        let out = readings(&p).apply(transform)?;
        assert_eq!(
            out.coder().map(|c| c.describe()),
            Some("KvCoder(StringUtf8Coder, NullableCoder(CelsiusCoder))".to_string())
        );
        assert_kv_collections_equal(out.collect_par(None, Some(2))?, expected.clone());
    }
    Ok(())
}

struct BrokenOutputCoder;

impl CombineFn<u64, u64, u64> for BrokenOutputCoder {
    fn create_accumulator(&self) -> u64 {
        0
    }
    fn add_input(&self, acc: u64, input: u64) -> u64 {
        acc + input
    }
    fn merge_accumulators(&self, accs: Vec<u64>) -> u64 {
        accs.into_iter().sum()
    }
    fn extract_output(&self, acc: u64) -> u64 {
        acc
    }
    fn output_coder(
        &self,
        _registry: &CoderRegistry,
        _input_coder: Option<&Arc<dyn Coder<u64>>>,
    ) -> Result<Arc<dyn Coder<u64>>, CoderError> {
        Err(CoderError::NonDeterministic { coder: "Broken".into(), reason: "test".into() })
    }
}

#[test]
fn output_coder_failures_other_than_unavailable_propagate() {
    let p = TestPipeline::new();
    let err = from_vec(&p, vec![("k".to_string(), 1u64)])
        .apply(Combine::per_key(BrokenOutputCoder))
        .err()
        .expect("apply should fail");
    assert!(matches!(err.downcast_ref::<CoderError>(), Some(CoderError::NonDeterministic { .. })));
}

/// Keeps the largest value, but never more than the key's length.
struct CappedByKeyLength;

impl KeyedCombineFn<String, u64, Option<u64>, u64> for CappedByKeyLength {
    fn create_accumulator(&self, _key: &String, _ctx: &CombineContext) -> Option<u64> {
        None
    }
    fn add_input(&self, key: &String, acc: Option<u64>, input: u64, _ctx: &CombineContext) -> Option<u64> {
        let capped = input.min(key.len() as u64);
        Some(acc.map_or(capped, |a| a.max(capped)))
    }
    fn merge_accumulators(&self, _key: &String, accs: Vec<Option<u64>>, _ctx: &CombineContext) -> Option<u64> {
        accs.into_iter().flatten().max()
    }
    fn extract_output(&self, _key: &String, acc: Option<u64>, _ctx: &CombineContext) -> u64 {
        acc.unwrap_or(0)
    }
}

#[test]
fn keyed_combiner_sees_the_key() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let data = vec![("ab".to_string(), 9u64), ("abcd".to_string(), 3), ("abcd".to_string(), 7)];
    let direct = from_vec(&p, data.clone())
        .apply(Combine::per_key_keyed(CappedByKeyLength))?
        .collect_seq()?;
    let lifted = from_vec(&p, data)
        .apply(Combine::per_key_keyed(CappedByKeyLength).with_combiner_lifting())?
        .collect_par(None, Some(3))?;

    let expected = vec![("ab".to_string(), 2), ("abcd".to_string(), 4)];
    assert_kv_collections_equal(direct, expected.clone());
    assert_kv_collections_equal(lifted, expected);
    Ok(())
}

#[test]
fn transform_is_reusable_and_describes_itself() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let t = Combine::per_key::<_, String, u64, _, _>(Max::<u64>::new()).with_few_keys(true);
    let modified = t.with_combiner_lifting();

    assert!(t.name().starts_with("Combine.PerKey("));
    assert_eq!(t.display_data()["combiner_lifting"], false);
    assert_eq!(modified.display_data()["combiner_lifting"], true);
    assert!(!t.has_fanout());

    let a = sales(&p).apply(t.clone())?.collect_seq()?;
    let b = sales(&p).apply(t)?.collect_seq()?;
    assert_kv_collections_equal(a, b);
    Ok(())
}
