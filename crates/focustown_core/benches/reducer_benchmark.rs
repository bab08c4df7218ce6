//! # Reducer Benchmark
//!
//! The reducer runs once per enqueue and once per pending command on every
//! reconciliation, so replaying a long queue is the hot path.
//!
//! Run with: `cargo bench --package focustown_core`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use focustown_core::{
    apply_command, find_next_open_slot, BuildingKind, Command, CommandFactory, CommandKind,
    Footprint, Timestamp, TownState, TOWN_HALL_ID,
};

fn clock() -> Timestamp {
    0
}

/// A mixed queue: mostly claims and task updates, some placements.
fn mixed_queue(len: usize) -> Vec<Command> {
    let factory = CommandFactory::with_clock(clock);
    (0..len)
        .map(|i| match i % 4 {
            0 => factory.claim_production(TOWN_HALL_ID),
            1 => factory.update_task_progress("task-water", 1),
            2 => factory.place_building(format!("decor-{i}"), BuildingKind::Decor, 0, 0, 0),
            _ => Command::new(
                format!("move-{i}"),
                0,
                CommandKind::MoveBuilding {
                    building_id: "farm-1".to_string(),
                    x: i32::try_from(i % 3).unwrap_or(0),
                    y: 6,
                    rot: None,
                },
            ),
        })
        .collect()
}

fn bench_single_apply(c: &mut Criterion) {
    let town = TownState::initial(0);
    let claim = CommandFactory::with_clock(clock).claim_production(TOWN_HALL_ID);

    c.bench_function("apply_claim_production", |b| {
        b.iter(|| black_box(apply_command(black_box(&town), black_box(&claim), 1)));
    });
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay_queue");

    for len in [16usize, 128, 1024] {
        let queue = mixed_queue(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &queue, |b, queue| {
            b.iter(|| {
                let mut state = TownState::initial(0);
                for command in queue {
                    if let Ok(applied) = apply_command(&state, command, 1) {
                        state = applied.state;
                    }
                }
                black_box(state)
            });
        });
    }

    group.finish();
}

fn bench_open_slot(c: &mut Criterion) {
    let town = TownState::initial(0);
    c.bench_function("find_next_open_slot_3x3", |b| {
        b.iter(|| black_box(find_next_open_slot(&town, Footprint::new(3, 3))));
    });
}

criterion_group!(benches, bench_single_apply, bench_replay, bench_open_slot);
criterion_main!(benches);
