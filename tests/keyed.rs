use ironbeam_combine::coders::{KvCoder, U64Coder};
use ironbeam_combine::testing::*;
use ironbeam_combine::*;
use std::sync::Arc;

#[test]
fn key_value_helpers() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let words = from_vec(&p, vec!["apple", "avocado", "banana"]);
    let keyed = words.key_by(|w: &&str| w.chars().next().unwrap_or('?'));

    let mut keys = keyed.clone().keys().collect_seq()?;
    keys.sort();
    assert_eq!(keys, vec!['a', 'a', 'b']);

    let lengths = keyed.clone().map_values(|w: &&str| w.len()).values().collect_seq()?;
    assert_collections_unordered_equal(&lengths, &[5, 7, 6]);

    let grouped = keyed.group_by_key().collect_par(None, Some(3))?;
    let mut grouped: Vec<(char, Vec<&str>)> =
        grouped.into_iter().map(|(k, mut v)| { v.sort(); (k, v) }).collect();
    grouped.sort();
    assert_eq!(grouped, vec![('a', vec!["apple", "avocado"]), ('b', vec!["banana"])]);
    Ok(())
}

#[test]
fn with_key_builds_a_kv_coder() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let keyed = from_vec(&p, vec![1u64, 2]).with_key("k".to_string());
    assert_eq!(
        keyed.coder().map(|c| c.describe()),
        Some("KvCoder(StringUtf8Coder, U64Coder)".to_string())
    );
    assert_eq!(keyed.clone().values().coder().map(|c| c.describe()), Some("U64Coder".to_string()));
    assert_kv_collections_equal(keyed.collect_seq()?, vec![("k".to_string(), 1), ("k".to_string(), 2)]);
    Ok(())
}

#[test]
fn group_by_key_ships_values_through_the_coder() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let opts = GroupByKeyOptions {
        few_keys: true,
        value_coder: Some(Arc::new(U64Coder) as Arc<dyn coders::Coder<u64>>),
    };
    let out = from_vec(&p, vec![(1u8, 10u64), (1, 20), (2, 5)])
        .group_by_key_with(opts)
        .collect_par(None, Some(4))?;
    let mut out: Vec<(u8, u64)> = out.into_iter().map(|(k, v)| (k, v.iter().sum())).collect();
    out.sort();
    assert_eq!(out, vec![(1, 30), (2, 5)]);

    let coder: Arc<dyn coders::Coder<(String, u64)>> =
        Arc::new(KvCoder::new(Arc::new(coders::StringUtf8Coder), Arc::new(U64Coder)));
    let explicit = from_vec(&p, vec![("a".to_string(), 1u64), ("a".to_string(), 2)])
        .set_coder(coder)
        .group_by_key()
        .collect_seq()?;
    assert_eq!(explicit, vec![("a".to_string(), vec![1, 2])]);
    Ok(())
}
