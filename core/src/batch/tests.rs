use std::convert::Infallible;

use super::*;
use crate::CanonicalTrack;

fn listen(listened_at: i64, name: &str) -> Listen {
    Listen::new(listened_at, CanonicalTrack::from_source_fields("Lansdowne", name, None::<String>, None).unwrap())
}

fn ascending(n: i64) -> Vec<Listen> { (1..=n).map(|ts| listen(ts, "Burn Brighter")).collect() }

#[derive(Default)]
struct Recorder {
    reports: Vec<(usize, usize)>,
    finished: Option<Summary>,
}

impl Progress for Recorder {
    fn batch_done(&mut self, submitted: usize, total: usize) { self.reports.push((submitted, total)) }

    fn done(&mut self, summary: &Summary) { self.finished = Some(*summary) }
}

#[test]
fn test_sort_stable_newest_first() {
    let mut listens = vec![listen(5, "a"), listen(10, "b"), listen(5, "c"), listen(1, "d"), listen(10, "e")];
    order_newest_first(&mut listens);

    let order: Vec<_> = listens.iter().map(|l| (l.listened_at(), l.track().track_name())).collect();
    assert_eq!(order, [(10, "b"), (10, "e"), (5, "a"), (5, "c"), (1, "d")]);
}

#[test]
fn test_batch_counts_partition() {
    for n in [1, 199, 200, 201, 399, 400, 401, 1000] {
        let mut listens = ascending(n);
        order_newest_first(&mut listens);

        let chunks: Vec<_> = batches(&listens, MAX_BATCH_SIZE).collect();
        assert_eq!(chunks.len(), (n as usize).div_ceil(MAX_BATCH_SIZE), "n = {n}");
        assert!(chunks.iter().all(|c| c.len() <= MAX_BATCH_SIZE));

        let flattened: Vec<i64> = chunks.iter().flat_map(|c| c.iter().map(Listen::listened_at)).collect();
        let expected: Vec<i64> = (1..=n).rev().collect();
        assert_eq!(flattened, expected, "n = {n}");
    }
}

#[test]
fn test_batch_size_clamped() {
    let listens = ascending(450);
    assert_eq!(batches(&listens, 1000).count(), 3);
    assert_eq!(batches(&listens, 0).count(), 450);
}

#[test]
fn test_submit_all_450() {
    let mut seen: Vec<Vec<i64>> = Vec::new();
    let mut progress = Recorder::default();
    let summary = submit_all(
        ascending(450),
        MAX_BATCH_SIZE,
        |batch| {
            seen.push(batch.iter().map(Listen::listened_at).collect());
            Ok::<_, Infallible>(())
        },
        &mut progress,
    );

    let sizes: Vec<_> = seen.iter().map(Vec::len).collect();
    assert_eq!(sizes, [200, 200, 50]);
    assert_eq!(seen[0], (251..=450).rev().collect::<Vec<_>>());
    assert_eq!(seen[2], (1..=50).rev().collect::<Vec<_>>());

    assert_eq!(progress.reports, [(200, 450), (400, 450), (450, 450)]);
    assert_eq!(progress.finished, Some(summary));
    assert!(summary.is_complete());
    assert_eq!(summary.accepted(), 450);
}

#[test]
fn test_submit_all_empty() {
    let mut calls = 0;
    let mut progress = Recorder::default();
    let summary = submit_all(
        Vec::new(),
        MAX_BATCH_SIZE,
        |_| {
            calls += 1;
            Ok::<_, Infallible>(())
        },
        &mut progress,
    );

    assert_eq!(calls, 0);
    assert!(progress.reports.is_empty());
    assert_eq!(summary, Summary::default());
    assert_eq!(progress.finished, Some(Summary::default()));
}

#[test]
fn test_submit_all_continues_after_failure() {
    let mut calls = 0;
    let summary = submit_all(
        ascending(450),
        MAX_BATCH_SIZE,
        |_| {
            calls += 1;
            if calls == 1 { Err("rate limited") } else { Ok(()) }
        },
        &mut (),
    );

    assert_eq!(calls, 3);
    assert_eq!(summary.failed_batches, 1);
    assert_eq!(summary.failed_listens, 200);
    assert_eq!(summary.accepted(), 250);
    assert!(!summary.is_complete());
}
