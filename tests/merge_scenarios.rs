use chrono::{DateTime, TimeZone, Utc};
use sortweave::sinks::VecSink;
use sortweave::sources::VecSource;
use sortweave::{AsyncMergeEngine, MergeConfig, MergeError, SourceId, SyncMergeEngine, Timestamped};
use std::time::Duration;

fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_test_writer()
    .with_max_level(tracing::Level::DEBUG)
    .try_init();
}

fn at(secs: i64) -> DateTime<Utc> {
  Utc.timestamp_opt(secs, 0).unwrap()
}

fn labelled(label: &'static str, times: &[i64]) -> VecSource<String> {
  VecSource::new(
    times
      .iter()
      .map(|&t| Timestamped::new(format!("{label}{t}"), at(t)))
      .collect(),
  )
}

fn tagged(sink: &VecSink<String>) -> Vec<(String, usize)> {
  sink
    .records()
    .into_iter()
    .map(|record| (record.payload().clone(), record.source().index()))
    .collect()
}

fn expected_interleave() -> Vec<(String, usize)> {
  [("a1", 0), ("b2", 1), ("b3", 1), ("a5", 0), ("b8", 1), ("a9", 0)]
    .into_iter()
    .map(|(payload, source)| (payload.to_string(), source))
    .collect()
}

#[test]
fn two_sources_merge_in_timestamp_order() {
  init_tracing();
  let mut sink = VecSink::new();
  SyncMergeEngine::new(vec![labelled("a", &[1, 5, 9]), labelled("b", &[2, 3, 8])])
    .run(&mut sink)
    .unwrap();
  assert_eq!(tagged(&sink), expected_interleave());
  assert_eq!(sink.done_calls(), 1);
}

#[tokio::test]
async fn two_async_sources_merge_in_timestamp_order() {
  init_tracing();
  let a = labelled("a", &[1, 5, 9]).with_latency(Duration::from_millis(2));
  let b = labelled("b", &[2, 3, 8]);
  let mut sink = VecSink::new();
  AsyncMergeEngine::new(vec![a, b]).run(&mut sink).await.unwrap();
  assert_eq!(tagged(&sink), expected_interleave());
  assert_eq!(sink.done_calls(), 1);
}

#[tokio::test]
async fn empty_source_contributes_nothing() {
  let mut sync_sink = VecSink::new();
  SyncMergeEngine::new(vec![VecSource::empty(), labelled("b", &[1, 2, 3])])
    .run(&mut sync_sink)
    .unwrap();

  let mut async_sink = VecSink::new();
  AsyncMergeEngine::new(vec![VecSource::empty(), labelled("b", &[1, 2, 3])])
    .run(&mut async_sink)
    .await
    .unwrap();

  for sink in [&sync_sink, &async_sink] {
    assert_eq!(sink.payloads(), vec!["b1", "b2", "b3"]);
    assert_eq!(sink.done_calls(), 1);
  }
}

#[tokio::test]
async fn failing_source_aborts_the_merge() {
  init_tracing();
  let build = || {
    vec![
      labelled("a", &[1, 4]),
      labelled("b", &[2, 6]).failing_at(1, "checksum mismatch"),
      labelled("c", &[3]),
    ]
  };

  let mut sync_sink = VecSink::new();
  let sync_err = SyncMergeEngine::new(build()).run(&mut sync_sink).unwrap_err();

  let mut async_sink = VecSink::new();
  let async_err = AsyncMergeEngine::new(build())
    .run(&mut async_sink)
    .await
    .unwrap_err();

  for (err, sink) in [(sync_err, &sync_sink), (async_err, &async_sink)] {
    assert!(matches!(err, MergeError::Source { source_id, .. } if source_id == SourceId(1)));
    assert_eq!(sink.done_calls(), 0);
    assert!(sink.payloads().starts_with(&["a1".to_string()]));
    assert!(!sink.payloads().contains(&"b6".to_string()));
  }
  assert_eq!(sync_sink.payloads(), vec!["a1", "b2"]);
}

#[tokio::test]
async fn equal_timestamps_keep_source_order() {
  let mut sync_sink = VecSink::new();
  SyncMergeEngine::new(vec![labelled("a", &[5]), labelled("b", &[5])])
    .run(&mut sync_sink)
    .unwrap();

  let mut async_sink = VecSink::new();
  let slow_first = labelled("a", &[5]).with_latency(Duration::from_millis(5));
  AsyncMergeEngine::new(vec![slow_first, labelled("b", &[5])])
    .run(&mut async_sink)
    .await
    .unwrap();

  for sink in [&sync_sink, &async_sink] {
    let sources: Vec<_> = sink.records().iter().map(|r| r.source().index()).collect();
    assert_eq!(sources, vec![0, 1]);
  }
}

#[tokio::test]
async fn high_water_mark_bounds_prefetching() {
  init_tracing();
  let high_water_mark = 2;
  let sources: Vec<_> = (0..5u64)
    .map(|index| {
      let times: Vec<i64> = (0..100).map(|n| n * 3 + index as i64 % 3).collect();
      VecSource::new(times.iter().map(|&t| Timestamped::new(t, at(t))).collect())
        .with_latency(Duration::from_millis(index % 2))
    })
    .collect();
  let probes: Vec<_> = sources.iter().map(VecSource::probe).collect();

  let mut sink = VecSink::new();
  let config = MergeConfig::default()
    .with_name("scenario_5")
    .with_high_water_mark(high_water_mark);
  let stats = AsyncMergeEngine::with_config(sources, config)
    .run(&mut sink)
    .await
    .unwrap();

  assert_eq!(stats.emitted, 500);
  assert!(stats.peak_buffered <= high_water_mark + probes.len());
  assert!(probes.iter().all(|probe| probe.max_outstanding() == 1));
  assert!(sink.times().windows(2).all(|pair| pair[0] <= pair[1]));
  assert_eq!(sink.done_calls(), 1);
}
