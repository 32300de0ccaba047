use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::runtime::Builder;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use crate::events::VisibilityWindow;
use crate::frames::GroundStation;
use crate::scheduler::error::{ConcurrencyError, TaskError};
use crate::scheduler::task::PairVisibilityTask;
use crate::scheduler::types::{SatResult, Satellite, SimulationContext};

struct Shared {
    satellites: Vec<Satellite>,
    stations: Vec<GroundStation>,
    ctx: SimulationContext,
    cancelled: AtomicBool,
}

struct PairOutcome {
    task: PairVisibilityTask,
    result: Result<Vec<VisibilityWindow>, TaskError>,
}

/// Computes every satellite/station and satellite/satellite window on a pool
/// of `ctx.workers` threads.
///
/// Returns one [`SatResult`] per satellite in input order. Pairs that fail,
/// have no windows, or are still running when `ctx.timeout` expires are left
/// out of the result and logged. Must be called outside of an async context.
pub fn compute_all(
    satellites: &[Satellite],
    stations: &[GroundStation],
    ctx: &SimulationContext,
) -> Result<Vec<SatResult>, ConcurrencyError> {
    let tasks = PairVisibilityTask::enumerate(satellites.len(), stations.len());
    let workers = ctx.workers.max(1);
    info!(
        "Computing {} pair(s) for {} satellite(s) and {} ground station(s) on {} worker(s)",
        tasks.len(),
        satellites.len(),
        stations.len(),
        workers
    );

    for satellite in satellites {
        let coarse = !ctx.ground_detector.validate_for_period(satellite.period_s)
            || !ctx.inter_satellite_detector.validate_for_period(satellite.period_s);
        if coarse {
            debug!("Coarse check interval applies to satellite #{}", satellite.index);
        }
    }

    let shared = Arc::new(Shared {
        satellites: satellites.to_vec(),
        stations: stations.to_vec(),
        ctx: ctx.clone(),
        cancelled: AtomicBool::new(false),
    });

    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(workers)
        .thread_name("satvis-worker")
        .enable_time()
        .build()?;

    let deadline = ctx.timeout.and_then(|timeout| {
        let deadline = Instant::now().checked_add(timeout);
        if deadline.is_none() {
            warn!("Timeout of {:?} is out of range; running without a deadline", timeout);
        }
        deadline
    });
    let joined = runtime.block_on(join_all(tasks, Arc::clone(&shared), deadline));
    // Abandoned units may still be running; do not wait for them.
    runtime.shutdown_background();
    let outcomes = joined?;

    Ok(aggregate(&shared, outcomes))
}

async fn join_all(
    tasks: Vec<PairVisibilityTask>,
    shared: Arc<Shared>,
    deadline: Option<Instant>,
) -> Result<Vec<PairOutcome>, ConcurrencyError> {
    let mut set = JoinSet::new();
    for (position, &task) in tasks.iter().enumerate() {
        let shared = Arc::clone(&shared);
        set.spawn_blocking(move || (position, run_isolated(task, &shared)));
    }

    let mut finished = vec![false; tasks.len()];
    let mut outcomes = Vec::with_capacity(set.len());
    loop {
        let next = match deadline {
            Some(deadline) => {
                let joined = timeout_at(deadline, set.join_next()).await;
                match joined {
                    Ok(next) => next,
                    Err(_) => {
                        shared.cancelled.store(true, Ordering::Relaxed);
                        warn!(
                            "Deadline expired; abandoning {} unfinished pair(s)",
                            set.len()
                        );
                        for (task, _) in tasks.iter().zip(&finished).filter(|(_, done)| !**done) {
                            warn!(
                                "Abandoned {}",
                                task.describe(&shared.satellites, &shared.stations)
                            );
                        }
                        set.abort_all();
                        break;
                    }
                }
            }
            None => set.join_next().await,
        };

        match next {
            Some(Ok((position, outcome))) => {
                finished[position] = true;
                outcomes.push(outcome);
            }
            Some(Err(err)) => return Err(ConcurrencyError::Interrupted(err.to_string())),
            None => break,
        }
    }
    Ok(outcomes)
}

fn run_isolated(task: PairVisibilityTask, shared: &Shared) -> PairOutcome {
    if shared.cancelled.load(Ordering::Relaxed) {
        return PairOutcome {
            task,
            result: Err(TaskError::Abandoned),
        };
    }
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        task.run(&shared.satellites, &shared.stations, &shared.ctx)
    }));
    let result = match result {
        Ok(windows) => windows.map_err(TaskError::from),
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    };
    PairOutcome { task, result }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn aggregate(shared: &Shared, outcomes: Vec<PairOutcome>) -> Vec<SatResult> {
    let satellites = &shared.satellites;
    let stations = &shared.stations;
    let mut results: Vec<SatResult> = satellites
        .iter()
        .map(|s| SatResult::new(s.index, s.name.clone()))
        .collect();

    let total = outcomes.len();
    let mut failed = 0;
    for PairOutcome { task, result } in outcomes {
        let windows = match result {
            Ok(windows) => windows,
            Err(err) => {
                failed += 1;
                warn!("Skipping {}: {}", task.describe(satellites, stations), err);
                continue;
            }
        };
        if windows.is_empty() {
            continue;
        }

        let entry = &mut results[task.owner()];
        match task {
            PairVisibilityTask::Ground { station, .. } => {
                entry
                    .ground_stations
                    .insert(stations[station].id.clone(), windows);
            }
            PairVisibilityTask::InterSatellite { secondary, .. } => {
                entry
                    .inter_satellite
                    .insert(satellites[secondary].index, windows);
            }
        }
    }

    info!(
        "Finished {} pair(s): {} failed, {} window(s) found",
        total,
        failed,
        results.iter().map(SatResult::window_count).sum::<usize>()
    );
    results
}
