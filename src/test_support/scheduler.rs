use std::sync::Mutex;
use std::time::Duration;

use crate::platform::scheduler::{ScheduledTask, Scheduler};

struct PendingTask {
    due: Duration,
    sequence: u64,
    task: ScheduledTask,
}

#[derive(Default)]
struct State {
    now: Duration,
    next_sequence: u64,
    pending: Vec<PendingTask>,
}

/// Deterministic scheduler driven by virtual time.
///
/// Tasks run in due-time order, ties broken by scheduling order. Nothing runs until the test
/// calls [`run_next_turn`](Self::run_next_turn) or [`advance`](Self::advance).
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<State>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Runs every task already due, including zero-delay ones.
    pub fn run_next_turn(&self) {
        while let Some(task) = self.pop_due() {
            task();
        }
    }

    /// Moves virtual time forward, running tasks as they become due.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().unwrap().now + by;
        loop {
            self.run_next_turn();
            let mut state = self.state.lock().unwrap();
            let next_due = state
                .pending
                .iter()
                .map(|pending| pending.due)
                .filter(|due| *due <= target)
                .min();
            match next_due {
                Some(due) => state.now = due,
                None => {
                    state.now = target;
                    break;
                }
            }
        }
    }

    fn pop_due(&self) -> Option<ScheduledTask> {
        let mut state = self.state.lock().unwrap();
        let now = state.now;
        let index = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, pending)| pending.due <= now)
            .min_by_key(|(_, pending)| (pending.due, pending.sequence))
            .map(|(index, _)| index)?;
        Some(state.pending.remove(index).task)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        let mut state = self.state.lock().unwrap();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let due = state.now + delay;
        state.pending.push(PendingTask {
            due,
            sequence,
            task,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> ScheduledTask) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let task_log = log.clone();
        let make = move |label: &'static str| {
            let log = task_log.clone();
            Box::new(move || log.lock().unwrap().push(label)) as ScheduledTask
        };
        (log, make)
    }

    #[test]
    fn tasks_run_in_due_order() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        scheduler.schedule(Duration::from_millis(30), task("slow"));
        scheduler.schedule(Duration::ZERO, task("next-turn"));
        scheduler.schedule(Duration::from_millis(10), task("fast"));

        scheduler.run_next_turn();
        assert_eq!(*log.lock().unwrap(), vec!["next-turn"]);

        scheduler.advance(Duration::from_millis(30));
        assert_eq!(*log.lock().unwrap(), vec!["next-turn", "fast", "slow"]);
        assert_eq!(scheduler.pending(), 0);
    }
}
