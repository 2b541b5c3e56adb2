use std::collections::HashSet;

use log::debug;

use crate::types::Value;

/// Upper bound on callbacks fired while draining one run
pub const MAX_TIMER_FIRINGS: usize = 10_000;

#[derive(Debug)]
pub struct Task {
    pub id: u32,
    pub due: f64,
    seq: u64,
    pub callback: Value,
    pub args: Vec<Value>,
    /// Period of a repeating task
    pub interval: Option<f64>,
}

/// Virtual queue behind `m2a9it` and `tkrar`. Tasks fire in order
/// of due time, then scheduling order, against a virtual clock that
/// only moves when a task fires.
#[derive(Debug, Default)]
pub struct TimerQueue {
    tasks: Vec<Task>,
    cancelled: HashSet<u32>,
    next_id: u32,
    next_seq: u64,
    clock: f64,
}

impl TimerQueue {
    /// Milliseconds of virtual time elapsed so far
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Queues a callback and returns its handle
    pub fn schedule(&mut self, callback: Value, delay: f64, args: Vec<Value>, repeat: bool) -> u32 {
        let delay = if delay.is_nan() || delay < 0.0 {
            0.0
        } else {
            delay
        };
        self.next_id += 1;
        let id = self.next_id;
        debug!("Schedule timer {id} in {delay}ms (repeat: {repeat})");
        let task = Task {
            id,
            due: self.clock + delay,
            seq: 0,
            callback,
            args,
            interval: repeat.then_some(delay),
        };
        self.push(task);
        id
    }

    /// Cancels a task. Cancelling a running interval stops it from
    /// being queued again.
    pub fn cancel(&mut self, id: u32) {
        debug!("Cancel timer {id}");
        self.tasks.retain(|task| task.id != id);
        self.cancelled.insert(id);
    }

    pub fn is_cancelled(&self, id: u32) -> bool {
        self.cancelled.contains(&id)
    }

    /// Removes the next task to fire and advances the clock to it
    pub fn pop(&mut self) -> Option<Task> {
        let next = self
            .tasks
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;
        let task = self.tasks.remove(next);
        self.clock = self.clock.max(task.due);
        Some(task)
    }

    /// Queues the next firing of an interval that just ran
    pub fn requeue(&mut self, mut task: Task) {
        let Some(interval) = task.interval else {
            return;
        };
        if self.is_cancelled(task.id) {
            return;
        }
        task.due = self.clock + interval;
        self.push(task);
    }

    fn push(&mut self, mut task: Task) {
        self.next_seq += 1;
        task.seq = self.next_seq;
        self.tasks.push(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(queue: &mut TimerQueue) -> Vec<(u32, f64)> {
        let mut fired = vec![];
        while let Some(task) = queue.pop() {
            fired.push((task.id, queue.clock()));
        }
        fired
    }

    #[test]
    fn fires_by_due_time_then_schedule_order() {
        let mut queue = TimerQueue::default();
        let a = queue.schedule(Value::Null, 20.0, vec![], false);
        let b = queue.schedule(Value::Null, 10.0, vec![], false);
        let c = queue.schedule(Value::Null, 10.0, vec![], false);
        let d = queue.schedule(Value::Null, -5.0, vec![], false);
        assert_eq!(order(&mut queue), vec![(d, 0.0), (b, 10.0), (c, 10.0), (a, 20.0)]);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut queue = TimerQueue::default();
        let a = queue.schedule(Value::Null, 5.0, vec![], false);
        let b = queue.schedule(Value::Null, 1.0, vec![], false);
        queue.cancel(b);
        assert_eq!(order(&mut queue), vec![(a, 5.0)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn intervals_requeue_until_cancelled() {
        let mut queue = TimerQueue::default();
        let id = queue.schedule(Value::Null, 10.0, vec![], true);
        let mut fired = vec![];
        while let Some(task) = queue.pop() {
            fired.push(queue.clock());
            if fired.len() == 3 {
                queue.cancel(task.id);
            }
            queue.requeue(task);
        }
        assert_eq!(fired, vec![10.0, 20.0, 30.0]);
        assert!(queue.is_cancelled(id));
    }
}
