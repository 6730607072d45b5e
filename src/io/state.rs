use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ops::nav::Cursor;
use crate::ops::timer::Countdown;

const STATE_FILE: &str = ".cursor.json";

/// Session state the CLI keeps between invocations (written to .cursor.json).
/// Not part of the document; losing it only costs the current position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cursor: Cursor,
    /// Month shown by `stride calendar` with no arguments, as `YYYY-MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_month: Option<String>,
    /// Pomodoro preset last chosen, in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pomodoro_minutes: Option<u32>,
}

impl SessionState {
    pub fn countdown(&self, default_minutes: u32) -> Countdown {
        Countdown::new(self.pomodoro_minutes.unwrap_or(default_minutes))
    }
}

/// Read .cursor.json from the data directory
pub fn read_session(dir: &Path) -> Option<SessionState> {
    let content = fs::read_to_string(dir.join(STATE_FILE)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write .cursor.json to the data directory
pub fn write_session(dir: &Path, state: &SessionState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(dir.join(STATE_FILE), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::ops::nav::View;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut state = SessionState {
            calendar_month: Some("2025-02".into()),
            pomodoro_minutes: Some(5),
            ..Default::default()
        };
        state.cursor.open_phase("p1");
        state.cursor.open_week("w1");

        write_session(dir.path(), &state).unwrap();
        let loaded = read_session(dir.path()).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.cursor.view, View::Week);
        assert_eq!(loaded.countdown(25).preset_minutes(), 5);
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_session(dir.path()).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STATE_FILE), "not json {{{").unwrap();
        assert!(read_session(dir.path()).is_none());
    }

    #[test]
    fn serde_defaults_on_empty_object() {
        let state: SessionState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.cursor, Cursor::home());
        assert!(state.calendar_month.is_none());
        assert_eq!(state.countdown(25).display(), "25:00");
    }
}
