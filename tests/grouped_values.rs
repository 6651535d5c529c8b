use ironbeam_combine::combiners::{Count, Max, Sum};
use ironbeam_combine::testing::*;
use ironbeam_combine::*;

#[test]
fn grouped_values_matches_per_key() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let data: Vec<(u32, u64)> = (0..500u64).map(|i| ((i % 11) as u32, i * 3)).collect();

    let grouped = from_vec(&p, data.clone())
        .group_by_key()
        .apply(Combine::grouped_values(Sum::<u64>::new()))?
        .collect_par(None, Some(7))?;
    let per_key = from_vec(&p, data).apply(Combine::per_key(Sum::<u64>::new()))?.collect_seq()?;
    assert_kv_collections_equal(grouped, per_key);
    Ok(())
}

#[test]
fn grouped_input_built_by_hand() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let out = from_vec(&p, vec![("a", vec![3i32, 9, 1]), ("b", vec![]), ("c", vec![-4])])
        .apply(Combine::grouped_values(Max::<i32>::new()))?
        .collect_seq()?;
    assert_kv_collections_equal(out, vec![("a", Some(9)), ("b", None), ("c", Some(-4))]);
    Ok(())
}

#[test]
fn closure_and_shorthand_forms() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let grouped = from_vec(&p, vec![("x", 1i64), ("y", 2), ("x", 4)]).group_by_key();

    let product = grouped
        .clone()
        .apply(Combine::grouped_values_fn(|v: Vec<i64>| v.into_iter().product::<i64>()))?
        .collect_seq()?;
    assert_kv_collections_equal(product, vec![("x", 4), ("y", 2)]);

    let counts = grouped.combine_grouped(Count)?.collect_seq()?;
    assert_kv_collections_equal(counts, vec![("x", 2), ("y", 1)]);
    Ok(())
}

#[test]
fn outputs_are_stamped_at_end_of_window() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let out = from_timestamped(&p, vec![Timestamped::new(1_234, ("k", 1u64)), Timestamped::new(9_999, ("k", 2))])
        .window_into(WindowFn::fixed(10_000)?)
        .group_by_key()
        .apply(Combine::grouped_values(Sum::<u64>::new()))?
        .collect_windowed_seq()?;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].value, ("k", 3));
    assert_eq!(out[0].timestamp, 9_999);
    Ok(())
}

#[test]
fn describes_itself() {
    let t = Combine::grouped_values::<_, &str, u64, u64, u64>(Sum::<u64>::new());
    assert!(t.name().starts_with("Combine.GroupedValues("));
    assert_eq!(t.display_data()["side_inputs"], 0);
}

struct Labelled;

impl ironbeam_combine::combine_fn::KeyedCombineFn<&'static str, i32, Vec<i32>, String> for Labelled {
    fn create_accumulator(&self, _key: &&'static str, _ctx: &CombineContext) -> Vec<i32> {
        Vec::new()
    }

    fn add_input(&self, _key: &&'static str, mut acc: Vec<i32>, input: i32, _ctx: &CombineContext) -> Vec<i32> {
        acc.push(input);
        acc
    }

    fn merge_accumulators(&self, _key: &&'static str, accs: Vec<Vec<i32>>, _ctx: &CombineContext) -> Vec<i32> {
        accs.concat()
    }

    fn extract_output(&self, key: &&'static str, mut acc: Vec<i32>, _ctx: &CombineContext) -> String {
        acc.sort();
        let parts: Vec<String> = acc.iter().map(i32::to_string).collect();
        format!("{key}:{}", parts.join(","))
    }
}

#[test]
fn keyed_combiner_over_groups() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let out = from_vec(&p, vec![("a", 3), ("b", 1), ("a", 2)])
        .group_by_key()
        .apply(Combine::grouped_values_keyed(Labelled))?
        .collect_seq()?;
    assert_kv_collections_equal(out, vec![("a", "a:2,3".to_string()), ("b", "b:1".to_string())]);
    Ok(())
}
