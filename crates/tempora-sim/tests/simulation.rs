//! End-to-end simulation runs over small streams.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempora_core::formats::predictions::PredictionRecord;
use tempora_core::formats::scores::read_score_file;
use tempora_core::{
    CapacityPolicy, DecayKernel, Edge, EdgeRecord, EdgeStream, Error, NodeIndex, StreamGraph,
};
use tempora_rank::{
    DecayedIndegree, DecayedIndegreeParams, OnlineRank, OnlineRankParams, RankComputer,
    ScoreTable, SnapshotContext, StaticWindow, StaticWindowParams, TemporalKatz,
    TemporalKatzParams, TemporalPageRank, TemporalPageRankParams, TruncatedTemporalKatz,
    TruncatedTemporalKatzParams,
};
use tempora_sim::{
    EdgeSimulator, ExportScope, FileExporter, GraphSimulator, MemorySink, PredictionTable,
    ReplayOrder, RunOptions, SimError, TimeType,
};

const RECORDS: [(i64, u64, u64); 8] = [
    (100, 1, 2),
    (130, 3, 2),
    (170, 2, 4),
    (210, 4, 1),
    (260, 1, 3),
    (290, 2, 3),
    (420, 3, 4),
    (450, 4, 2),
];

const BOUNDARIES: [i64; 4] = [200, 300, 400, 500];

fn stream() -> EdgeStream {
    EdgeStream::from_records(RECORDS.iter().map(|&(t, s, d)| EdgeRecord::new(t, s, d)))
}

fn kernel() -> DecayKernel {
    DecayKernel::exponential(100.0, 0.5).unwrap()
}

fn tk_params() -> TemporalKatzParams {
    TemporalKatzParams::new(0.5, kernel()).unwrap()
}

/// One computer of every family.
fn computers(stream: &EdgeStream) -> Vec<Box<dyn RankComputer>> {
    let nodes = NodeIndex::new(stream.nodes());
    let known = stream.distinct_edges();
    let min_time = 0;
    let tk = tk_params();
    let did_batch = DecayedIndegreeParams::new(kernel())
        .unwrap()
        .with_batch_part(format!("{}/tk", tk.label()))
        .unwrap();
    vec![
        Box::new(TemporalKatz::new(nodes.clone(), vec![tk]).unwrap()),
        Box::new(
            TruncatedTemporalKatz::new(
                nodes.clone(),
                vec![TruncatedTemporalKatzParams::new(0.5, kernel()).unwrap()],
                2,
            )
            .unwrap(),
        ),
        Box::new(
            TemporalPageRank::new(nodes.clone(), vec![TemporalPageRankParams::default()]).unwrap(),
        ),
        Box::new(
            OnlineRank::new(
                nodes.clone(),
                &known,
                vec![OnlineRankParams::default()],
                CapacityPolicy::default(),
                min_time,
            )
            .unwrap(),
        ),
        Box::new(
            DecayedIndegree::new(
                nodes,
                &known,
                vec![DecayedIndegreeParams::new(kernel()).unwrap(), did_batch],
                CapacityPolicy::default(),
                min_time,
            )
            .unwrap(),
        ),
        Box::new(
            StaticWindow::new(vec![
                StaticWindowParams::pagerank(0, 0.85, 100).unwrap(),
                StaticWindowParams::indegree(1),
                StaticWindowParams::harmonic(2),
                StaticWindowParams::negative_beta(0),
            ])
            .unwrap(),
        ),
    ]
}

fn simulator() -> GraphSimulator {
    let stream = stream();
    let computers = computers(&stream);
    let mut sim = GraphSimulator::new(stream, TimeType::Epoch);
    for computer in computers {
        sim.register(computer).unwrap();
    }
    sim
}

fn collect_files(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(next) = pending.pop() {
        for entry in fs::read_dir(&next).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let bytes = fs::read(&path).unwrap();
                files.insert(path.strip_prefix(dir).unwrap().to_path_buf(), bytes);
            }
        }
    }
    files
}

#[test]
fn test_every_label_exported_at_every_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = simulator();
    let labels: Vec<(String, &'static str)> = sim
        .computers()
        .iter()
        .flat_map(|c| {
            let prefix = match c.name() {
                "temporal_katz" => "tk",
                "truncated_temporal_katz" => "ttk",
                "temporal_pagerank" => "tpr",
                "online_rank" => "olr",
                "decayed_indegree" => "did",
                _ => "",
            };
            c.labels().into_iter().map(move |l| (l, prefix))
        })
        .filter(|(_, prefix)| !prefix.is_empty())
        .collect();
    assert!(!labels.is_empty());

    let mut sink = FileExporter::new(dir.path());
    let stats = sim
        .run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut sink)
        .unwrap();
    assert_eq!(stats.len(), BOUNDARIES.len());
    assert_eq!(
        stats.iter().map(|s| s.snapshot_edges).collect::<Vec<_>>(),
        vec![3, 3, 0, 2]
    );

    for (label, prefix) in &labels {
        for index in 0..BOUNDARIES.len() {
            let path = sink.table_path(&ExportScope::Original, label, prefix, index);
            assert!(path.exists(), "missing {}", path.display());
        }
    }
}

#[test]
fn test_empty_interval_still_exports() {
    let mut sim = simulator();
    let mut sink = MemorySink::new();
    sim.run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut sink)
        .unwrap();
    let label = tk_params().label();
    assert_eq!(sink.indices(&ExportScope::Original, &label), vec![0, 1, 2, 3]);

    // the one-interval window is empty at boundary 400, but cumulative indegree is not
    let indeg = StaticWindowParams::indegree(1).label();
    let spr = StaticWindowParams::pagerank(0, 0.85, 100).unwrap().label();
    assert!(sink.get(&ExportScope::Original, &indeg, 2).unwrap().is_empty());
    assert!(!sink.get(&ExportScope::Original, &spr, 2).unwrap().is_empty());
}

#[test]
fn test_runs_are_byte_identical() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    for dir in [&first, &second] {
        let mut sink = FileExporter::new(dir.path());
        simulator()
            .run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut sink)
            .unwrap();
    }
    let a = collect_files(first.path());
    let b = collect_files(second.path());
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn test_scores_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = FileExporter::new(dir.path());
    let mut memory = MemorySink::new();
    simulator()
        .run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut files)
        .unwrap();
    simulator()
        .run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut memory)
        .unwrap();

    let label = tk_params().label();
    for index in 0..BOUNDARIES.len() {
        let path = files.table_path(&ExportScope::Original, &label, "tk", index);
        let on_disk = read_score_file(&path).unwrap();
        let table = memory.get(&ExportScope::Original, &label, index).unwrap();
        assert_eq!(on_disk.len(), table.len());
        for (node, score) in table.rows() {
            let read = on_disk[node];
            assert!((read - score).abs() <= 1e-12 * score.abs().max(1.0));
        }
    }
}

fn predictions() -> PredictionTable {
    let row = |interval, src, trg, rating| PredictionRecord {
        interval,
        edge: Edge::new(src, trg),
        rating,
    };
    PredictionTable::from_records([
        row(1, 1, 4, 0.9),
        row(1, 3, 1, 0.4),
        row(2, 2, 1, 0.7),
        row(3, 4, 3, 0.2),
    ])
}

fn final_tables(computers: &mut [Box<dyn RankComputer>]) -> Vec<ScoreTable> {
    let graph = StreamGraph::new();
    let ctx = SnapshotContext {
        index: 99,
        time: 1_000,
        total: &graph,
        snapshot: &graph,
    };
    // batch scores of decayed indegree are only reloaded by live exports
    computers
        .iter_mut()
        .filter(|c| !matches!(c.name(), "static_window" | "decayed_indegree"))
        .flat_map(|c| c.save_snapshot(&ctx).unwrap())
        .collect()
}

#[test]
fn test_replay_leaves_live_state_untouched() {
    let mut plain = simulator();
    plain
        .run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut MemorySink::new())
        .unwrap();

    let mut replayed = simulator();
    let replay =
        EdgeSimulator::new("lr", ReplayOrder::RatingWeighted, predictions(), 10, None).unwrap();
    let scope = replay.scope();
    replayed.add_replay(replay).unwrap();
    let mut sink = MemorySink::new();
    replayed
        .run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut sink)
        .unwrap();

    // replays replace the live export and write the next interval's index
    let label = tk_params().label();
    assert!(sink.indices(&ExportScope::Original, &label).is_empty());
    assert_eq!(sink.indices(&scope, &label), vec![1, 2, 3]);

    let mut a = plain.into_computers();
    let mut b = replayed.into_computers();
    assert_eq!(final_tables(&mut a), final_tables(&mut b));
}

#[test]
fn test_duplicate_replay_rejected() {
    let mut sim = simulator();
    let make = || {
        EdgeSimulator::new("lr", ReplayOrder::Descending, predictions(), 0, Some(1)).unwrap()
    };
    sim.add_replay(make()).unwrap();
    assert!(matches!(sim.add_replay(make()), Err(SimError::DuplicateReplay(_))));
}

#[test]
fn test_edge_capacity_is_fatal() {
    let stream = stream();
    let nodes = NodeIndex::new(stream.nodes());
    // only two edges known in advance, exactly two slots
    let known = vec![Edge::new(1, 2), Edge::new(3, 2)];
    let olr = OnlineRank::new(
        nodes,
        &known,
        vec![OnlineRankParams::default()],
        CapacityPolicy::Fixed { ratio: 1.0 },
        0,
    )
    .unwrap();
    let mut sim = GraphSimulator::new(stream, TimeType::Epoch);
    sim.register(Box::new(olr)).unwrap();
    let err = sim
        .run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut MemorySink::new())
        .unwrap_err();
    assert!(matches!(
        err,
        SimError::Core(Error::EdgeCapacityExceeded { capacity: 2 })
    ));
}

#[test]
fn test_growable_capacity_accepts_unknown_edges() {
    let stream = stream();
    let nodes = NodeIndex::new(stream.nodes());
    let olr = OnlineRank::new(
        nodes,
        &[],
        vec![OnlineRankParams::default()],
        CapacityPolicy::Growable,
        0,
    )
    .unwrap();
    let mut sim = GraphSimulator::new(stream, TimeType::Epoch);
    sim.register(Box::new(olr)).unwrap();
    let stats = sim
        .run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut MemorySink::new())
        .unwrap();
    assert_eq!(stats.last().unwrap().total_edges, RECORDS.len());
}

#[test]
fn test_missing_batch_part_fails_export() {
    let stream = stream();
    let nodes = NodeIndex::new(stream.nodes());
    let params = DecayedIndegreeParams::new(kernel())
        .unwrap()
        .with_batch_part("tk_b0.99_Const(1.00)/tk")
        .unwrap();
    let did = DecayedIndegree::new(
        nodes,
        &stream.distinct_edges(),
        vec![params],
        CapacityPolicy::default(),
        0,
    )
    .unwrap();
    let mut sim = GraphSimulator::new(stream, TimeType::Epoch);
    sim.register(Box::new(did)).unwrap();
    let err = sim
        .run_with_boundaries(&BOUNDARIES, RunOptions::default(), &mut MemorySink::new())
        .unwrap_err();
    assert!(matches!(err, SimError::Core(Error::MissingInput(_))));
}

#[test]
fn test_index_mode_counts_edges() {
    let stream = stream();
    let computers = computers(&stream);
    let mut sim = GraphSimulator::new(stream, TimeType::Index);
    for computer in computers {
        sim.register(computer).unwrap();
    }
    let stats = sim
        .run_with_boundaries(&[3, 6, 9], RunOptions::default(), &mut MemorySink::new())
        .unwrap();
    assert_eq!(
        stats.iter().map(|s| s.snapshot_edges).collect::<Vec<_>>(),
        vec![3, 3, 2]
    );
}
