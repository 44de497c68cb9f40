//! `task` channel diff.

use super::{sync, StatusTracker};
use crate::runtime::StatSnapshot;
use mk_protocol::status::StatusTask;

fn seeded() -> StatusTask {
    StatusTask {
        echo_serial_number: Some(0),
        exec_state: Some(0),
        file: Some(String::new()),
        input_timeout: Some(false),
        optional_stop: Some(false),
        read_line: Some(0),
        task_mode: Some(0),
        task_paused: Some(0),
        task_state: Some(0),
    }
}

impl StatusTracker {
    /// Diff the task channel; returns the delta when anything changed.
    pub fn update_task(&mut self, stat: &StatSnapshot) -> Option<StatusTask> {
        if self.task_first {
            self.task = seeded();
            self.task_first = false;
        }

        let base = &mut self.task;
        let mut tx = StatusTask::default();
        let mut modified = false;

        modified |= sync(
            &mut base.echo_serial_number,
            stat.echo_serial_number,
            &mut tx.echo_serial_number,
        );
        modified |= sync(&mut base.exec_state, stat.exec_state, &mut tx.exec_state);
        modified |= sync(&mut base.file, stat.file.clone(), &mut tx.file);
        modified |= sync(
            &mut base.input_timeout,
            stat.input_timeout,
            &mut tx.input_timeout,
        );
        modified |= sync(
            &mut base.optional_stop,
            stat.optional_stop,
            &mut tx.optional_stop,
        );
        modified |= sync(&mut base.read_line, stat.read_line, &mut tx.read_line);
        modified |= sync(&mut base.task_mode, stat.task_mode, &mut tx.task_mode);
        modified |= sync(&mut base.task_paused, stat.task_paused, &mut tx.task_paused);
        modified |= sync(&mut base.task_state, stat.task_state, &mut tx.task_state);

        modified.then_some(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConfig;

    #[test]
    fn first_run_emits_only_nonzero_fields() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let stat = StatSnapshot {
            task_state: 2,
            file: "part.ngc".to_owned(),
            ..StatSnapshot::default()
        };
        let delta = tracker.update_task(&stat).unwrap();
        assert_eq!(delta.task_state, Some(2));
        assert_eq!(delta.file.as_deref(), Some("part.ngc"));
        assert_eq!(delta.task_mode, None);
        assert_eq!(delta.read_line, None);
    }

    #[test]
    fn identical_poll_emits_nothing() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let stat = StatSnapshot {
            task_mode: 1,
            ..StatSnapshot::default()
        };
        assert!(tracker.update_task(&stat).is_some());
        assert!(tracker.update_task(&stat).is_none());
        assert!(tracker.update_task(&stat).is_none());
    }

    #[test]
    fn baseline_accumulates_across_polls() {
        let mut tracker = StatusTracker::new(&DisplayConfig::default());
        let mut stat = StatSnapshot::default();
        let _ = tracker.update_task(&stat);
        stat.read_line = 42;
        let delta = tracker.update_task(&stat).unwrap();
        assert_eq!(delta.read_line, Some(42));
        assert_eq!(delta.file, None);
        assert_eq!(tracker.task_baseline().read_line, Some(42));
    }
}
