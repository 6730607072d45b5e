use chrono::{DateTime, Utc};

use crate::model::document::{ArchiveEntry, Document};
use crate::util::clock::stamp;

/// Error type for archive operations
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("phase not found: {0}")]
    PhaseNotFound(String),
    #[error("no archived phase with id {0}")]
    NotArchived(String),
    #[error("an active phase already uses id {0}")]
    IdInUse(String),
}

/// Move a phase, with everything under it, into the archive
pub fn archive_phase(doc: &mut Document, phase_id: &str, now: DateTime<Utc>) -> Result<(), ArchiveError> {
    let idx = doc
        .phases
        .iter()
        .position(|p| p.id == phase_id)
        .ok_or_else(|| ArchiveError::PhaseNotFound(phase_id.to_string()))?;
    let phase = doc.phases.remove(idx);
    tracing::info!(phase_id, title = %phase.title, "archived phase");
    doc.archive.push(ArchiveEntry {
        phase,
        archived_at: stamp(now),
    });
    Ok(())
}

/// Put an archived phase back at the end of the plan
pub fn restore_phase(doc: &mut Document, phase_id: &str) -> Result<(), ArchiveError> {
    if doc.phase(phase_id).is_some() {
        return Err(ArchiveError::IdInUse(phase_id.to_string()));
    }
    let idx = doc
        .archive
        .iter()
        .position(|e| e.phase.id == phase_id)
        .ok_or_else(|| ArchiveError::NotArchived(phase_id.to_string()))?;
    let entry = doc.archive.remove(idx);
    doc.phases.push(entry.phase);
    Ok(())
}

/// Delete an archived phase for good
pub fn purge_archived(doc: &mut Document, phase_id: &str) -> Result<(), ArchiveError> {
    let before = doc.archive.len();
    doc.archive.retain(|e| e.phase.id != phase_id);
    if doc.archive.len() == before {
        return Err(ArchiveError::NotArchived(phase_id.to_string()));
    }
    tracing::info!(phase_id, "purged archived phase");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::ops::tree_ops::{create_phase, create_week};
    use crate::util::clock::IdGenerator;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn archive_and_restore_round_trip() {
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        let a = create_phase(&mut doc, &mut ids, now(), "A").unwrap();
        let b = create_phase(&mut doc, &mut ids, now(), "B").unwrap();
        create_week(&mut doc, &mut ids, now(), &a, "W1").unwrap();

        archive_phase(&mut doc, &a, now()).unwrap();
        assert_eq!(doc.phases.len(), 1);
        assert_eq!(doc.archive[0].phase.weeks.len(), 1);
        assert_eq!(doc.archive[0].archived_at, "2025-04-01T12:00:00Z");

        restore_phase(&mut doc, &a).unwrap();
        assert!(doc.archive.is_empty());
        // Restored phases go to the end.
        assert_eq!(doc.phases[0].id, b);
        assert_eq!(doc.phases[1].id, a);
    }

    #[test]
    fn unknown_ids_error() {
        let mut doc = Document::default();
        assert!(matches!(
            archive_phase(&mut doc, "x", now()),
            Err(ArchiveError::PhaseNotFound(_))
        ));
        assert!(matches!(restore_phase(&mut doc, "x"), Err(ArchiveError::NotArchived(_))));
        assert!(matches!(purge_archived(&mut doc, "x"), Err(ArchiveError::NotArchived(_))));
    }

    #[test]
    fn purge_is_permanent() {
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        let a = create_phase(&mut doc, &mut ids, now(), "A").unwrap();
        archive_phase(&mut doc, &a, now()).unwrap();
        purge_archived(&mut doc, &a).unwrap();
        assert!(doc.archive.is_empty());
        assert!(restore_phase(&mut doc, &a).is_err());
    }
}
