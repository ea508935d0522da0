//! Deferred work for the single-threaded surface runtime
//!
//! Two kinds of deferral exist: "next tick" tasks (finish a deferred mount,
//! position after first layout) and timers (expire transient feedback). The
//! clock is virtual and only moves through `advance`, which keeps every
//! interleaving reproducible in tests and in the scenario runner.
//!
//! Tasks carry ids, not state. Whoever runs a task must look the surface up
//! again and check its lifecycle state before acting, since any number of
//! opens and closes may have happened since it was queued.

use std::collections::VecDeque;
use std::time::Duration;

use crate::surface::SurfaceId;

/// A unit of deferred work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Move a staged surface under the document root
    FinishMount(SurfaceId),
    /// Compute and apply placement now that the surface has been laid out
    Position(SurfaceId),
    /// Drop transient feedback, unless newer feedback replaced it
    ClearFeedback { surface: SurfaceId, generation: u64 },
}

#[derive(Debug, Clone)]
struct Timer {
    deadline: Duration,
    seq: u64,
    task: Task,
}

#[derive(Debug, Default, Clone)]
pub struct Scheduler {
    now: Duration,
    ready: VecDeque<Task>,
    timers: Vec<Timer>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Run `task` on the next tick
    pub fn schedule_tick(&mut self, task: Task) {
        self.ready.push_back(task);
    }

    /// Run `task` once `delay` has elapsed on the virtual clock
    pub fn schedule_after(&mut self, delay: Duration, task: Task) {
        self.seq += 1;
        self.timers.push(Timer {
            deadline: self.now + delay,
            seq: self.seq,
            task,
        });
    }

    /// Take every task queued so far; tasks queued while these run wait for
    /// the following tick
    pub fn take_tick(&mut self) -> Vec<Task> {
        self.ready.drain(..).collect()
    }

    /// Move the clock forward and queue every timer that came due, in
    /// deadline order
    pub fn advance(&mut self, delta: Duration) {
        self.now += delta;
        let now = self.now;
        let mut due: Vec<Timer> = Vec::new();
        self.timers.retain(|timer| {
            if timer.deadline <= now {
                due.push(timer.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| (t.deadline, t.seq));
        self.ready.extend(due.into_iter().map(|t| t.task));
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    pub fn pending_ticks(&self) -> usize {
        self.ready.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.ready.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_tasks_run_in_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_tick(Task::Position(SurfaceId(1)));
        scheduler.schedule_tick(Task::FinishMount(SurfaceId(2)));

        assert_eq!(
            scheduler.take_tick(),
            vec![
                Task::Position(SurfaceId(1)),
                Task::FinishMount(SurfaceId(2))
            ]
        );
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_timers_fire_only_when_due() {
        let mut scheduler = Scheduler::new();
        let task = Task::ClearFeedback {
            surface: SurfaceId(1),
            generation: 1,
        };
        scheduler.schedule_after(Duration::from_millis(2000), task);

        scheduler.advance(Duration::from_millis(1999));
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.next_deadline(), Some(Duration::from_millis(2000)));

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(scheduler.take_tick(), vec![task]);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn test_due_timers_ordered_by_deadline() {
        let mut scheduler = Scheduler::new();
        let late = Task::ClearFeedback {
            surface: SurfaceId(1),
            generation: 1,
        };
        let early = Task::ClearFeedback {
            surface: SurfaceId(2),
            generation: 1,
        };
        scheduler.schedule_after(Duration::from_millis(500), late);
        scheduler.schedule_after(Duration::from_millis(100), early);

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(scheduler.take_tick(), vec![early, late]);
    }
}
