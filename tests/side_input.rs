use ironbeam_combine::combine_fn::KeyedCombineFn;
use ironbeam_combine::combiners::Sum;
use ironbeam_combine::testing::*;
use ironbeam_combine::*;

/// Sums only the values at or above a threshold read from a side input.
struct SumAbove {
    threshold: SideInput<u64>,
}

impl SumAbove {
    fn threshold(&self, ctx: &CombineContext) -> u64 {
        ctx.side_input(&self.threshold)
            .and_then(|v| v.first().copied())
            .unwrap_or(0)
    }
}

impl KeyedCombineFn<String, u64, u64, u64> for SumAbove {
    fn create_accumulator(&self, _key: &String, _ctx: &CombineContext) -> u64 {
        0
    }
    fn add_input(&self, _key: &String, acc: u64, input: u64, ctx: &CombineContext) -> u64 {
        if input >= self.threshold(ctx) { acc + input } else { acc }
    }
    fn merge_accumulators(&self, _key: &String, accs: Vec<u64>, _ctx: &CombineContext) -> u64 {
        accs.into_iter().sum()
    }
    fn extract_output(&self, _key: &String, acc: u64, _ctx: &CombineContext) -> u64 {
        acc
    }
}

fn keyed_values(p: &Pipeline) -> PCollection<(String, u64)> {
    from_vec(p, (1..=10u64).map(|v| ("k".to_string(), v)).collect())
}

#[test]
fn combiner_reads_registered_side_input() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let threshold = side_vec(vec![8u64]);
    let t = Combine::per_key_keyed(SumAbove { threshold: threshold.clone() }).with_side_inputs(&threshold);
    assert_eq!(t.side_inputs().len(), 1);

    let out = keyed_values(&p).apply(t)?.collect_par(None, Some(3))?;
    assert_eq!(out, vec![("k".to_string(), 8 + 9 + 10)]);
    Ok(())
}

#[test]
fn unregistered_side_input_is_not_visible() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let threshold = side_vec(vec![8u64]);
    let out = keyed_values(&p)
        .apply(Combine::per_key_keyed(SumAbove { threshold }))?
        .collect_seq()?;
    assert_eq!(out, vec![("k".to_string(), 55)]);
    Ok(())
}

#[test]
fn side_input_values_follow_the_window() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let first = BoundedWindow::Interval(IntervalWindow::new(0, 10_000));
    let second = BoundedWindow::Interval(IntervalWindow::new(10_000, 20_000));
    let threshold = side_windowed(vec![(first, vec![5u64]), (second, vec![100])]);

    let events = (1..=10u64)
        .map(|v| Timestamped::new(1_000, ("k".to_string(), v)))
        .chain((1..=10u64).map(|v| Timestamped::new(15_000, ("k".to_string(), v * 20))))
        .collect();
    let out = from_timestamped(&p, events)
        .window_into(WindowFn::fixed(10_000)?)
        .apply(Combine::per_key_keyed(SumAbove { threshold: threshold.clone() }).with_side_inputs(&threshold))?
        .collect_windowed_seq()?;

    assert_values_per_window(
        &out,
        vec![
            (first, vec![("k".to_string(), 5 + 6 + 7 + 8 + 9 + 10)]),
            (second, vec![("k".to_string(), 100 + 120 + 140 + 160 + 180 + 200)]),
        ],
    );
    Ok(())
}

#[test]
fn global_side_input_is_visible_from_every_window() {
    let side = side_vec(vec![1u8, 2]);
    let window = BoundedWindow::Interval(IntervalWindow::new(0, 10));
    assert_eq!(*side.values_for(&window), vec![1, 2]);
    let ctx = SideInputs::from(&side).resolve(window);
    assert_eq!(ctx.window(), &window);
    assert_eq!(ctx.side_input(&side), Some(&[1u8, 2][..]));
}

#[test]
fn side_inputs_survive_lifting_and_fanout() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let threshold = side_vec(vec![6u64]);
    let base = Combine::per_key_keyed(SumAbove { threshold: threshold.clone() }).with_side_inputs(&threshold);

    let lifted = keyed_values(&p).apply(base.with_combiner_lifting())?.collect_par(None, Some(4))?;
    let spread = keyed_values(&p)
        .apply(base.with_hot_key_fanout_const(3))?
        .collect_par(None, Some(4))?;

    let expected = vec![("k".to_string(), 6 + 7 + 8 + 9 + 10)];
    assert_eq!(lifted, expected);
    assert_eq!(spread, expected);
    Ok(())
}

#[test]
fn grouped_values_and_globally_accept_side_inputs() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let unused = side_vec(vec!["ignored".to_string()]);

    let grouped = keyed_values(&p)
        .group_by_key()
        .apply(Combine::grouped_values(Sum::<u64>::new()).with_side_inputs(&unused))?
        .collect_seq()?;
    assert_eq!(grouped, vec![("k".to_string(), 55)]);

    let t = Combine::globally(Sum::<u64>::new()).with_side_inputs(&unused);
    assert_eq!(t.side_inputs().len(), 1);
    let total = from_vec(&p, vec![1u64, 2]).apply(t)?.collect_seq()?;
    assert_eq!(total, vec![3]);
    Ok(())
}
