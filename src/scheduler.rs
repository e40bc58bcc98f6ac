use std::{future::Future, time::Duration};

use tokio::time::{self, MissedTickBehavior};

use crate::{
    config::FailurePolicy,
    etl::{self, Fault, QuoteSink, SpotPriceSource},
    logging,
};

/// 迴圈結束時的統計
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles whose row was committed.
    pub completed: u64,
    /// Cycles that ended in a fault under [`FailurePolicy::Continue`].
    pub failed: u64,
}

/// Runs one cycle per `interval` tick until `shutdown` resolves.
///
/// The first cycle starts immediately. `shutdown` is raced against both the
/// wait and the cycle itself; a cycle cut short keeps whatever it already
/// committed, and an open transaction is rolled back when it is dropped.
///
/// # Errors
/// Returns the first fault when `policy` is [`FailurePolicy::Halt`].
pub async fn run<S, K, F>(
    source: &S,
    sink: &K,
    interval: Duration,
    policy: FailurePolicy,
    shutdown: F,
) -> Result<RunSummary, Fault>
where
    S: SpotPriceSource + ?Sized,
    K: QuoteSink + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = RunSummary::default();

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        logging::info_console("Running the ETL pipeline...".to_string());

        let outcome = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            outcome = etl::run_cycle(source, sink) => outcome,
        };

        match outcome {
            Ok(row) => {
                summary.completed += 1;
                logging::info_file_async(format!("Cycle stored row {}", row.id));
                logging::info_console(next_run_message("finished", interval));
            }
            Err(fault) => {
                logging::error_console(fault.to_string());
                logging::error_file_async(format!("{:?}", fault));

                if policy == FailurePolicy::Halt {
                    return Err(fault);
                }

                summary.failed += 1;
                logging::info_console(next_run_message("failed", interval));
            }
        }
    }

    logging::info_console("Execution interrupted by the user.".to_string());
    logging::info_file_async(format!("Stopped after {:?}", summary));

    Ok(summary)
}

/// The ticker counts from the start of the last cycle, so the real wait is
/// the interval minus however long the cycle took.
fn next_run_message(outcome: &str, interval: Duration) -> String {
    format!(
        "Pipeline {}. Next run in at most {} seconds...",
        outcome,
        interval.as_secs_f64()
    )
}
