use ironbeam_combine::combiners::{Accumulator, AccumulatingCombineFn, Count, Max, Mean, Sum};
use ironbeam_combine::testing::*;
use ironbeam_combine::*;
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn single_hot_key_sums_correctly() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let data = vec![("k".to_string(), 1u64); 1_000];
    let out = from_vec(&p, data)
        .apply(Combine::per_key(Sum::<u64>::new()).with_hot_key_fanout_const(4))?
        .collect_par(Some(4), Some(8))?;
    assert_eq!(out, vec![("k".to_string(), 1_000)]);
    Ok(())
}

#[test]
fn skewed_keys_match_the_plain_combine() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let mut data: Vec<(String, u64)> = (0..5_000u64).map(|i| ("hot".to_string(), i)).collect();
    data.extend((0..300u64).map(|i| (format!("cold{}", i % 30), i)));

    let plain = from_vec(&p, data.clone())
        .apply(Combine::per_key(Sum::<u64>::new()))?
        .collect_seq()?;
    let spread = from_vec(&p, data)
        .apply(
            Combine::per_key(Sum::<u64>::new())
                .with_hot_key_fanout(|k: &String| if k == "hot" { 8 } else { 0 }),
        )?
        .collect_par(None, Some(12))?;

    assert_eq!(spread.len(), 31);
    assert_kv_collections_equal(spread, plain);
    Ok(())
}

#[test]
fn empty_input_produces_nothing() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let out = from_vec(&p, Vec::<(String, u64)>::new())
        .apply(Combine::per_key(Count).with_hot_key_fanout_const(3))?
        .collect_par(None, Some(4))?;
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn fixed_nonce_seed_is_reproducible() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let data: Vec<(u32, u32)> = (0..400u32).map(|i| (i % 3, i)).collect();
    let t = Combine::per_key(Max::<u32>::new())
        .with_hot_key_fanout_const(5)
        .with_nonce_seed(Arc::new(FixedNonceSeed(42)));
    assert!(t.has_fanout());

    let first = from_vec(&p, data.clone()).apply(t.clone())?.collect_par(None, Some(6))?;
    let second = from_vec(&p, data).apply(t)?.collect_par(None, Some(6))?;
    assert_kv_collections_equal(first.clone(), vec![(0, Some(399)), (1, Some(397)), (2, Some(398))]);
    assert_kv_collections_equal(first, second);
    Ok(())
}

#[test]
fn spread_of_one_takes_the_plain_path() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let out = from_vec(&p, vec![("a", 1u64), ("a", 2), ("b", 3)])
        .apply(Combine::per_key(Sum::<u64>::new()).with_hot_key_fanout_const(1))?
        .collect_seq()?;
    assert_kv_collections_equal(out, vec![("a", 3), ("b", 3)]);
    Ok(())
}

#[test]
fn fanout_respects_windows_and_keeps_the_strategy() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let events: Vec<Timestamped<(&str, u32)>> = (0..60i64)
        .map(|i| Timestamped::new(i * 1_000, ("k", (i % 5) as u32)))
        .collect();
    let input = from_timestamped(&p, events)
        .window_into(WindowFn::fixed(20_000)?)
        .with_accumulation_mode(AccumulationMode::AccumulatingFiredPanes);
    let strategy = input.windowing_strategy();

    let spread = input
        .clone()
        .apply(Combine::per_key(Mean).with_hot_key_fanout_const(4))?;
    assert_eq!(spread.windowing_strategy(), strategy);

    let spread = spread.collect_windowed_par(None, Some(5))?;
    let plain = input.apply(Combine::per_key(Mean))?.collect_windowed_seq()?;
    assert_eq!(spread.len(), 3);
    let mut spread: Vec<_> = spread.into_iter().map(|wv| (wv.window, wv.value.1, wv.timestamp)).collect();
    let mut plain: Vec<_> = plain.into_iter().map(|wv| (wv.window, wv.value.1, wv.timestamp)).collect();
    spread.sort_by(|a, b| a.0.cmp(&b.0));
    plain.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(spread, plain);
    Ok(())
}

#[derive(Clone, Default)]
struct Tally(u64);

impl Accumulator<u64, u64> for Tally {
    fn add_input(&mut self, input: u64) {
        self.0 += input;
    }
    fn merge_accumulator(&mut self, other: Self) {
        self.0 += other.0;
    }
    fn extract_output(&self) -> u64 {
        self.0
    }
}

#[test]
fn uncodable_accumulator_is_a_configuration_error() {
    let p = TestPipeline::new();
    let err = from_vec(&p, vec![("k".to_string(), 1u64)])
        .apply(
            Combine::per_key(AccumulatingCombineFn::<Tally, u64, u64>::new())
                .with_hot_key_fanout_const(2),
        )
        .err()
        .expect("fan-out without an accumulator coder must fail");
    match err.downcast_ref::<CombineError>() {
        Some(CombineError::AccumulatorCoder(cause)) => assert!(cause.is_cannot_provide()),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("unable to determine accumulator coder"));
}

#[test]
fn uncodable_accumulator_is_fine_without_fanout() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let out = from_vec(&p, vec![("k".to_string(), 1u64), ("k".to_string(), 2)])
        .apply(Combine::per_key(AccumulatingCombineFn::<Tally, u64, u64>::new()))?
        .collect_par(None, Some(2))?;
    assert_eq!(out, vec![("k".to_string(), 3)]);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn fanout_never_changes_the_result(
        data in proptest::collection::vec((0u32..6, 0u64..1_000), 0..300),
        spread in 0usize..7,
        partitions in 1usize..9,
        seed in any::<u64>(),
    ) {
        let p = TestPipeline::new();
        let plain = from_vec(&p, data.clone())
            .apply(Combine::per_key(Sum::<u64>::new()))
            .and_then(|c| c.collect_seq());
        let spread_out = from_vec(&p, data)
            .apply(
                Combine::per_key(Sum::<u64>::new())
                    .with_hot_key_fanout(move |k: &u32| if k % 2 == 0 { spread } else { 0 })
                    .with_nonce_seed(Arc::new(FixedNonceSeed(seed))),
            )
            .and_then(|c| c.collect_par(None, Some(partitions)));
        let (mut plain, mut spread_out) = (plain.unwrap(), spread_out.unwrap());
        plain.sort();
        spread_out.sort();
        prop_assert_eq!(spread_out, plain);
    }
}
