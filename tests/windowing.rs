use ironbeam_combine::testing::*;
use ironbeam_combine::*;

#[test]
fn fixed_windows_assign_by_timestamp() -> anyhow::Result<()> {
    let p = TestPipeline::new();
    let out = from_timestamped(
        &p,
        vec![Timestamped::new(0, 'a'), Timestamped::new(9_999, 'b'), Timestamped::new(10_000, 'c')],
    )
    .window_into(WindowFn::fixed(10_000)?)
    .collect_windowed_seq()?;

    assert_values_per_window(
        &out,
        vec![
            (BoundedWindow::Interval(IntervalWindow::new(0, 10_000)), vec!['a', 'b']),
            (BoundedWindow::Interval(IntervalWindow::new(10_000, 20_000)), vec!['c']),
        ],
    );
    assert_eq!(out[0].timestamp, 0);
    Ok(())
}

#[test]
fn negative_timestamps_and_offsets() {
    let w = WindowFn::fixed_with_offset(10, 3).unwrap();
    assert_eq!(w.assign(3), BoundedWindow::Interval(IntervalWindow::new(3, 13)));
    assert_eq!(w.assign(2), BoundedWindow::Interval(IntervalWindow::new(-7, 3)));
    assert_eq!(WindowFn::fixed(10).unwrap().assign(-1), BoundedWindow::Interval(IntervalWindow::new(-10, 0)));
    assert_eq!(WindowFn::Global.assign(123), BoundedWindow::Global);
}

#[test]
fn window_display_names() {
    assert_eq!(WindowFn::Global.to_string(), "GlobalWindows");
    assert!(WindowFn::fixed(60_000).unwrap().to_string().starts_with("FixedWindows"));
    assert_eq!(BoundedWindow::Global.to_string(), "GlobalWindow");
    assert_eq!(BoundedWindow::Interval(IntervalWindow::new(0, 5)).to_string(), "[0, 5)");
}

#[test]
fn window_compatibility() {
    assert!(WindowFn::Global.is_compatible(&WindowFn::Global));
    assert!(WindowFn::fixed(5).unwrap().is_compatible(&WindowFn::fixed(5).unwrap()));
    assert!(!WindowFn::fixed(5).unwrap().is_compatible(&WindowFn::fixed(6).unwrap()));
    assert!(!WindowFn::fixed(5).unwrap().is_compatible(&WindowFn::Global));
}

#[test]
fn end_of_window_timestamps() {
    assert_eq!(BoundedWindow::Interval(IntervalWindow::new(0, 10)).max_timestamp(), 9);
    assert_eq!(BoundedWindow::Global.max_timestamp(), window::GLOBAL_WINDOW_MAX_TIMESTAMP);
}

#[test]
fn accumulation_mode_is_carried_through_rewindowing() {
    let p = TestPipeline::new();
    let c = from_vec(&p, vec![1u8])
        .with_accumulation_mode(AccumulationMode::AccumulatingFiredPanes)
        .window_into(WindowFn::fixed(100).unwrap());
    assert_eq!(
        c.windowing_strategy(),
        WindowingStrategy {
            window_fn: WindowFn::fixed(100).unwrap(),
            mode: AccumulationMode::AccumulatingFiredPanes,
        }
    );
    assert_eq!(WindowingStrategy::default(), WindowingStrategy::of(WindowFn::Global));
}

#[test]
fn flatten_rejects_mixed_windowing() {
    let p = TestPipeline::new();
    let global = from_vec(&p, vec![1u8]);
    let fixed = from_vec(&p, vec![2u8]).window_into(WindowFn::fixed(10).unwrap());
    assert!(flatten(&[global.clone(), fixed]).is_err());
    assert!(flatten::<u8>(&[]).is_err());
    assert!(flatten(&[global.clone(), global]).is_ok());
}

#[test]
fn fixed_windows_need_a_positive_size() {
    for size_ms in [0, -5] {
        match WindowFn::fixed(size_ms) {
            Err(CombineError::NonPositiveWindowSize { size_ms: got }) => assert_eq!(got, size_ms),
            other => panic!("size {size_ms} accepted: {other:?}"),
        }
    }
    let fixed = FixedWindows::new(60_000, -1_000).unwrap();
    assert_eq!((fixed.size_ms(), fixed.offset_ms()), (60_000, -1_000));
}

#[test]
fn serialized_window_fns_are_validated_on_read() {
    let fixed = WindowFn::fixed_with_offset(10, 3).unwrap();
    let json = serde_json::to_string(&fixed).unwrap();
    assert_eq!(serde_json::from_str::<WindowFn>(&json).unwrap(), fixed);

    let zero = json.replace("[10,3]", "[0,3]");
    assert_ne!(zero, json);
    assert!(serde_json::from_str::<WindowFn>(&zero).is_err());
}
