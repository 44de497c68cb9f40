//! `interp` channel diff.

use super::{sync, sync_codes, sync_settings, StatusTracker};
use crate::runtime::StatSnapshot;
use mk_protocol::status::StatusInterp;

fn seeded() -> StatusInterp {
    StatusInterp {
        command: Some(String::new()),
        gcodes: Vec::new(),
        interp_state: Some(0),
        interpreter_errcode: Some(0),
        mcodes: Vec::new(),
        settings: Vec::new(),
    }
}

impl StatusTracker {
    /// Diff the interpreter channel; returns the delta when anything
    /// changed.
    pub fn update_interp(&mut self, stat: &StatSnapshot) -> Option<StatusInterp> {
        if self.interp_first {
            self.interp = seeded();
            self.interp_first = false;
        }

        let base = &mut self.interp;
        let mut tx = StatusInterp::default();
        let mut modified = false;

        modified |= sync(&mut base.command, stat.command.clone(), &mut tx.command);
        modified |= sync_codes(&mut base.gcodes, &stat.gcodes, &mut tx.gcodes);
        modified |= sync(
            &mut base.interp_state,
            stat.interp_state,
            &mut tx.interp_state,
        );
        modified |= sync(
            &mut base.interpreter_errcode,
            stat.interpreter_errcode,
            &mut tx.interpreter_errcode,
        );
        modified |= sync_codes(&mut base.mcodes, &stat.mcodes, &mut tx.mcodes);
        modified |= sync_settings(&mut base.settings, &stat.settings, &mut tx.settings);

        modified.then_some(tx)
    }
}
