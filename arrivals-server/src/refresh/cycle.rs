//! One refresh: poll, project, merge, filter, cap.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{Board, Now, StopId};
use crate::feed::{ArrivalProjector, ScheduleIndex, ServiceCalendarResolver};
use crate::filter::RouteStopFilter;
use crate::realtime::{
    FeedMessage, ParseContext, RealtimeError, RealtimeSnapshot, RealtimeSource, merge,
};

use super::channel::{BoardSender, PublishError};
use super::timer::Task;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("failed to publish board: {0}")]
    Publish(#[from] PublishError),
}

/// State carried from one refresh to the next.
///
/// Only the realtime snapshot changes between cycles, and only on a
/// successful poll, when it is replaced as a whole.
pub struct RefreshCycle<S> {
    index: Arc<ScheduleIndex>,
    stop_ids: HashSet<StopId>,
    filter: RouteStopFilter,
    source: S,
    display_lines: usize,
    candidate_count: usize,
    realtime: Option<RealtimeSnapshot>,
}

impl<S: RealtimeSource> RefreshCycle<S> {
    pub fn new(
        index: Arc<ScheduleIndex>,
        filter: RouteStopFilter,
        source: S,
        display_lines: usize,
        candidate_count: usize,
    ) -> Self {
        Self {
            stop_ids: index.stop_ids(),
            index,
            filter,
            source,
            display_lines,
            candidate_count,
            realtime: None,
        }
    }

    /// Last successfully parsed realtime state, if any.
    pub fn realtime(&self) -> Option<&RealtimeSnapshot> {
        self.realtime.as_ref()
    }

    /// Poll the realtime source and compute the board for `now`.
    pub async fn run(&mut self, now: Now) -> Board {
        let polled = self.poll().await;
        self.update(polled, now)
    }

    pub async fn poll(&self) -> Result<FeedMessage, RealtimeError> {
        self.source.fetch().await
    }

    /// Fold a poll result into the realtime state and compute the board.
    ///
    /// A failed poll leaves the previous realtime state in use. Before the
    /// first successful poll the board is schedule-only.
    pub fn update(&mut self, polled: Result<FeedMessage, RealtimeError>, now: Now) -> Board {
        let days = ServiceCalendarResolver::new(self.index.calendars()).service_days(&now);

        match polled {
            Ok(feed) => {
                let ctx = ParseContext::new(&self.index, &days, now);
                self.realtime = Some(merge::parse(&feed, &ctx));
            }
            Err(e) => warn!(
                error = %e,
                have_previous = self.realtime.is_some(),
                "realtime poll failed; keeping previous state"
            ),
        }

        let projected = ArrivalProjector::new(&self.index).project(
            &days,
            &self.stop_ids,
            now.time_of_day(),
            self.candidate_count,
        );

        let empty = RealtimeSnapshot::default();
        let snapshot = self.realtime.as_ref().unwrap_or(&empty);
        let mut arrivals = merge::apply(&self.index, &projected, snapshot, &now);
        self.filter.retain(&mut arrivals);
        arrivals.truncate(self.display_lines);

        debug!(
            projected = projected.len(),
            published = arrivals.len(),
            "refresh cycle complete"
        );
        Board::new(now.wall(), arrivals)
    }
}

type Clock = Box<dyn Fn() -> Now + Send>;

/// A [`RefreshCycle`] driven by the wall clock, publishing each board.
pub struct RefreshTask<S> {
    cycle: RefreshCycle<S>,
    sender: BoardSender,
    clock: Clock,
}

impl<S> RefreshTask<S> {
    pub fn new(cycle: RefreshCycle<S>, sender: BoardSender) -> Self {
        Self {
            cycle,
            sender,
            clock: Box::new(Now::local),
        }
    }

    /// Read "now" from `clock` instead of the local wall clock.
    pub fn with_clock(mut self, clock: impl Fn() -> Now + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
}

impl<S: RealtimeSource + 'static> Task for RefreshTask<S> {
    type Error = CycleError;

    async fn run(&mut self) -> Result<(), CycleError> {
        // A slow poll must not age the clock due times are computed from
        let polled = self.cycle.poll().await;
        let board = self.cycle.update(polled, (self.clock)());
        self.sender.publish(board)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArrivalTime;
    use crate::feed::fixture;
    use crate::refresh::board_channel;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Hands out queued poll results, failing once they run out.
    struct ScriptedSource {
        polls: Mutex<VecDeque<Result<FeedMessage, RealtimeError>>>,
    }

    impl ScriptedSource {
        fn new(polls: Vec<Result<FeedMessage, RealtimeError>>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
            }
        }
    }

    impl RealtimeSource for ScriptedSource {
        async fn fetch(&self) -> Result<FeedMessage, RealtimeError> {
            self.polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(RealtimeError::RateLimited))
        }
    }

    /// Sets a flag once polled, after yielding to the scheduler.
    struct FlagSource {
        polled: Arc<AtomicBool>,
    }

    impl RealtimeSource for FlagSource {
        async fn fetch(&self) -> Result<FeedMessage, RealtimeError> {
            tokio::task::yield_now().await;
            self.polled.store(true, Ordering::SeqCst);
            Err(RealtimeError::RateLimited)
        }
    }

    fn feed(entities: serde_json::Value) -> Result<FeedMessage, RealtimeError> {
        Ok(serde_json::from_value(json!({ "entity": entities })).unwrap())
    }

    fn cancel_t1_delay_t2() -> Result<FeedMessage, RealtimeError> {
        feed(json!([
            { "id": "1", "trip_update": { "trip": { "trip_id": "T1", "schedule_relationship": "CANCELED" } } },
            { "id": "2", "trip_update": {
                "trip": { "trip_id": "T2", "schedule_relationship": "SCHEDULED" },
                "stop_time_update": [{ "stop_id": "S", "arrival": { "delay": 120 } }]
            } }
        ]))
    }

    fn cycle(polls: Vec<Result<FeedMessage, RealtimeError>>) -> RefreshCycle<ScriptedSource> {
        RefreshCycle::new(
            Arc::new(fixture::index()),
            RouteStopFilter::default(),
            ScriptedSource::new(polls),
            5,
            15,
        )
    }

    fn summary(arrivals: &[ArrivalTime]) -> Vec<(&str, i64)> {
        arrivals
            .iter()
            .map(|a| (a.route.as_str(), a.due_in_seconds))
            .collect()
    }

    #[tokio::test]
    async fn schedule_only_when_realtime_never_succeeded() {
        let mut cycle = cycle(vec![Err(RealtimeError::Unauthorized)]);
        let board = cycle.run(fixture::monday_morning()).await;
        assert_eq!(
            summary(&board.arrivals),
            [("15A", 300), ("46A", 900), ("15A", 1500)]
        );
        assert!(cycle.realtime().is_none());
    }

    #[tokio::test]
    async fn failed_poll_keeps_previous_state() {
        let now = fixture::monday_morning();
        let mut cycle = cycle(vec![cancel_t1_delay_t2(), Err(RealtimeError::RateLimited)]);

        let fresh = cycle.run(now).await;
        let stale = cycle.run(now).await;

        assert_eq!(summary(&fresh.arrivals), [("46A", 1020), ("15A", 1500)]);
        assert_eq!(fresh, stale);
    }

    #[tokio::test]
    async fn empty_successful_poll_replaces_state() {
        let now = fixture::monday_morning();
        let mut cycle = cycle(vec![cancel_t1_delay_t2(), feed(json!([]))]);

        cycle.run(now).await;
        let board = cycle.run(now).await;
        assert_eq!(
            summary(&board.arrivals),
            [("15A", 300), ("46A", 900), ("15A", 1500)]
        );
        assert_eq!(cycle.realtime(), Some(&RealtimeSnapshot::default()));
    }

    #[tokio::test]
    async fn filters_then_caps() {
        let filter = RouteStopFilter::new(HashMap::from([(
            StopId::new("S"),
            HashSet::from(["46A".to_string()]),
        )]));
        let mut cycle = RefreshCycle::new(
            Arc::new(fixture::index()),
            filter,
            ScriptedSource::new(vec![]),
            1,
            3,
        );
        let board = cycle.run(fixture::monday_morning()).await;
        assert_eq!(summary(&board.arrivals), [("46A", 900)]);
    }

    #[tokio::test]
    async fn task_reads_clock_after_poll_returns() {
        let polled = Arc::new(AtomicBool::new(false));
        let clock_after_poll = Arc::new(AtomicBool::new(false));

        let source = FlagSource {
            polled: polled.clone(),
        };
        let cycle = RefreshCycle::new(
            Arc::new(fixture::index()),
            RouteStopFilter::default(),
            source,
            5,
            15,
        );
        let (tx, mut rx) = board_channel(2);
        let seen = clock_after_poll.clone();
        let mut task = RefreshTask::new(cycle, tx).with_clock(move || {
            seen.store(polled.load(Ordering::SeqCst), Ordering::SeqCst);
            fixture::monday_morning()
        });

        task.run().await.unwrap();
        assert!(clock_after_poll.load(Ordering::SeqCst));
        let board = rx.try_recv().unwrap();
        assert_eq!(summary(&board.arrivals)[0], ("15A", 300));
    }

    #[tokio::test]
    async fn task_publishes_each_board() {
        let (tx, mut rx) = board_channel(2);
        let mut task = RefreshTask::new(cycle(vec![]), tx);
        task.run().await.unwrap();
        assert!(rx.try_recv().is_some());

        drop(rx);
        assert!(matches!(
            task.run().await,
            Err(CycleError::Publish(PublishError::NoConsumer))
        ));
    }
}
