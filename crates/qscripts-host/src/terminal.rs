use std::io::{self, Write};

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use qscripts_core::{ActiveScriptSession, HostHooks};
use tracing::debug;

/// Host hooks for a terminal: clearing wipes the screen, the view is the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalHooks;

impl HostHooks for TerminalHooks {
    fn clear_output(&mut self) {
        let mut stdout = io::stdout();
        execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0)).ok();
        stdout.flush().ok();
    }

    fn refresh_view(&mut self, session: &ActiveScriptSession) {
        debug!(
            target: "qscripts",
            "{}: {} index files, {} dependencies{}",
            session.script_path().display(),
            session.index_files.len(),
            session.dependencies.len(),
            if session.is_trigger_based() { ", trigger mode" } else { "" }
        );
    }
}
