// Virtual clock base: 2024-01-01T00:00:00Z. Wall-clock time is never
// read; every timestamp in the harness is an offset from this epoch.
pub(crate) const CLOCK_EPOCH_MS: i64 = 1_704_067_200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RequestId(pub(crate) usize);

#[derive(Debug)]
pub(crate) enum TaskKind {
    RequestCompletion(RequestId),
}

#[derive(Debug)]
pub(crate) struct ScheduledTask {
    pub(crate) due_ms: i64,
    pub(crate) order: i64,
    pub(crate) kind: TaskKind,
}

#[derive(Debug)]
pub(crate) struct Scheduler {
    pub(crate) now_ms: i64,
    tasks: Vec<ScheduledTask>,
    next_order: i64,
    next_request_id: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            now_ms: 0,
            tasks: Vec::new(),
            next_order: 0,
            next_request_id: 1,
        }
    }
}

impl Scheduler {
    pub(crate) fn allocate_request_id(&mut self) -> RequestId {
        let id = RequestId(self.next_request_id);
        self.next_request_id = self.next_request_id.saturating_add(1);
        id
    }

    pub(crate) fn schedule_at(&mut self, due_ms: i64, kind: TaskKind) {
        let order = self.next_order;
        self.next_order += 1;
        self.tasks.push(ScheduledTask {
            due_ms,
            order,
            kind,
        });
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.tasks.len()
    }

    // Earliest (due, order) task with due <= limit, removed from the queue.
    pub(crate) fn take_next_due(&mut self, limit_ms: i64) -> Option<ScheduledTask> {
        let index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due_ms <= limit_ms)
            .min_by_key(|(_, task)| (task.due_ms, task.order))
            .map(|(index, _)| index)?;
        Some(self.tasks.swap_remove(index))
    }

    pub(crate) fn take_next(&mut self) -> Option<ScheduledTask> {
        self.take_next_due(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_run_in_due_then_fifo_order() {
        let mut scheduler = Scheduler::default();
        let a = scheduler.allocate_request_id();
        let b = scheduler.allocate_request_id();
        let c = scheduler.allocate_request_id();
        scheduler.schedule_at(50, TaskKind::RequestCompletion(a));
        scheduler.schedule_at(10, TaskKind::RequestCompletion(b));
        scheduler.schedule_at(10, TaskKind::RequestCompletion(c));

        let order = std::iter::from_fn(|| scheduler.take_next())
            .map(|task| match task.kind {
                TaskKind::RequestCompletion(id) => id,
            })
            .collect::<Vec<_>>();
        assert_eq!(order, vec![b, c, a]);
    }

    #[test]
    fn take_next_due_respects_the_limit() {
        let mut scheduler = Scheduler::default();
        let id = scheduler.allocate_request_id();
        scheduler.schedule_at(100, TaskKind::RequestCompletion(id));
        assert!(scheduler.take_next_due(99).is_none());
        assert!(scheduler.take_next_due(100).is_some());
        assert_eq!(scheduler.pending_len(), 0);
    }
}
