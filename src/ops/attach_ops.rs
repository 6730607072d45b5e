use std::path::Path;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use regex::Regex;

use crate::model::document::{Document, FileAttachment};

/// Error type for attachment operations
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("invalid YouTube URL: {0}")]
    InvalidVideoUrl(String),
    #[error("links must start with http:// or https://: {0}")]
    InvalidLink(String),
    #[error("{name} is {size} bytes; attachments are limited to {limit} bytes")]
    FileTooLarge { name: String, size: u64, limit: u64 },
    #[error("{0} can only be attached to a day")]
    Unsupported(&'static str),
    #[error("nothing to attach to: the focused node no longer exists")]
    MissingTarget,
    #[error("no {kind} at index {index}")]
    NoSuchEntry { kind: &'static str, index: usize },
}

/// What carries the materials: a single task (by position) or a whole day
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachTarget {
    Task {
        phase_id: String,
        week_id: String,
        day_id: String,
        index: usize,
    },
    Day {
        phase_id: String,
        week_id: String,
        day_id: String,
    },
}

/// Mutable view over one target's materials. Tasks have no files or links.
pub struct MaterialsMut<'a> {
    pub notes: &'a mut Vec<String>,
    pub videos: &'a mut Vec<String>,
    pub files: Option<&'a mut Vec<FileAttachment>>,
    pub links: Option<&'a mut Vec<String>>,
    pub time_spent: &'a mut u64,
}

pub fn materials_mut<'a>(doc: &'a mut Document, target: &AttachTarget) -> Option<MaterialsMut<'a>> {
    match target {
        AttachTarget::Task {
            phase_id,
            week_id,
            day_id,
            index,
        } => {
            let task = doc.day_mut(phase_id, week_id, day_id)?.tasks.get_mut(*index)?;
            Some(MaterialsMut {
                notes: &mut task.notes,
                videos: &mut task.videos,
                files: None,
                links: None,
                time_spent: &mut task.time_spent,
            })
        }
        AttachTarget::Day {
            phase_id,
            week_id,
            day_id,
        } => {
            let day = doc.day_mut(phase_id, week_id, day_id)?;
            Some(MaterialsMut {
                notes: &mut day.notes,
                videos: &mut day.videos,
                files: Some(&mut day.files),
                links: Some(&mut day.links),
                time_spent: &mut day.time_spent,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// Append an empty note to be filled in. Returns its index.
pub fn add_note(notes: &mut Vec<String>) -> usize {
    notes.push(String::new());
    notes.len() - 1
}

pub fn edit_note(notes: &mut [String], index: usize, text: &str) -> Result<(), AttachError> {
    let note = notes.get_mut(index).ok_or(AttachError::NoSuchEntry {
        kind: "note",
        index,
    })?;
    *note = text.to_string();
    Ok(())
}

/// Remove an entry from any materials list
pub fn remove_at<T>(items: &mut Vec<T>, index: usize, kind: &'static str) -> Result<T, AttachError> {
    if index < items.len() {
        Ok(items.remove(index))
    } else {
        Err(AttachError::NoSuchEntry { kind, index })
    }
}

// ---------------------------------------------------------------------------
// Videos
// ---------------------------------------------------------------------------

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*").unwrap()
});

/// Pull the 11-character video id out of a YouTube URL
pub fn extract_video_id(url: &str) -> Option<String> {
    let caps = VIDEO_ID_RE.captures(url)?;
    let id = caps.get(2)?.as_str();
    (id.len() == 11).then(|| id.to_string())
}

pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

pub fn add_video(videos: &mut Vec<String>, url: &str) -> Result<(), AttachError> {
    let url = url.trim();
    if extract_video_id(url).is_none() {
        tracing::warn!(url, "rejected video url");
        return Err(AttachError::InvalidVideoUrl(url.to_string()));
    }
    videos.push(url.to_string());
    Ok(())
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

pub fn is_valid_link(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn add_link(links: &mut Vec<String>, url: &str) -> Result<(), AttachError> {
    let url = url.trim();
    if !is_valid_link(url) {
        tracing::warn!(url, "rejected link");
        return Err(AttachError::InvalidLink(url.to_string()));
    }
    links.push(url.to_string());
    Ok(())
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Encode file content as an inline attachment, enforcing `limit` bytes
pub fn encode_file(
    name: &str,
    mime_type: &str,
    content: &[u8],
    limit: u64,
) -> Result<FileAttachment, AttachError> {
    let size = content.len() as u64;
    if size > limit {
        return Err(AttachError::FileTooLarge {
            name: name.to_string(),
            size,
            limit,
        });
    }
    Ok(FileAttachment {
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        size_bytes: size,
        data: format!("data:{};base64,{}", mime_type, BASE64.encode(content)),
    })
}

/// Decode the payload of an inline attachment
pub fn decode_file(file: &FileAttachment) -> Option<Vec<u8>> {
    let (_, payload) = file.data.split_once(";base64,")?;
    BASE64.decode(payload).ok()
}

/// Best-effort MIME type from a file extension
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

pub fn add_file(
    files: Option<&mut Vec<FileAttachment>>,
    file: FileAttachment,
) -> Result<(), AttachError> {
    let files = files.ok_or(AttachError::Unsupported("files"))?;
    files.push(file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::ops::tree_ops::{add_checklist_item, create_day, create_phase, create_week, ChecklistRef};
    use crate::util::clock::IdGenerator;

    #[test]
    fn video_id_from_watch_and_short_urls() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ?start=30").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn video_id_rejects_non_video_urls() {
        assert_eq!(extract_video_id("https://example.com"), None);
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn add_video_validates() {
        let mut videos = Vec::new();
        assert!(matches!(
            add_video(&mut videos, "https://example.com"),
            Err(AttachError::InvalidVideoUrl(_))
        ));
        assert!(videos.is_empty());
        add_video(&mut videos, " https://youtu.be/dQw4w9WgXcQ ").unwrap();
        assert_eq!(videos, vec!["https://youtu.be/dQw4w9WgXcQ"]);
        assert_eq!(embed_url("dQw4w9WgXcQ"), "https://www.youtube.com/embed/dQw4w9WgXcQ");
    }

    #[test]
    fn links_need_http_scheme() {
        let mut links = Vec::new();
        assert!(add_link(&mut links, "ftp://example.com").is_err());
        assert!(add_link(&mut links, "example.com").is_err());
        add_link(&mut links, "https://doc.rust-lang.org/book/").unwrap();
        add_link(&mut links, "http://localhost:8080").unwrap();
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn notes_add_edit_remove() {
        let mut notes = Vec::new();
        assert_eq!(add_note(&mut notes), 0);
        edit_note(&mut notes, 0, "first draft").unwrap();
        assert_eq!(add_note(&mut notes), 1);
        assert!(edit_note(&mut notes, 5, "x").is_err());
        assert_eq!(remove_at(&mut notes, 0, "note").unwrap(), "first draft");
        assert_eq!(notes, vec![String::new()]);
        assert!(matches!(
            remove_at(&mut notes, 3, "note"),
            Err(AttachError::NoSuchEntry { kind: "note", index: 3 })
        ));
    }

    #[test]
    fn files_encode_and_enforce_limit() {
        let file = encode_file("hello.txt", "text/plain", b"hello", 1024).unwrap();
        assert_eq!(file.size_bytes, 5);
        assert_eq!(file.data, "data:text/plain;base64,aGVsbG8=");
        assert_eq!(decode_file(&file).unwrap(), b"hello");

        let err = encode_file("big.bin", "application/octet-stream", &[0u8; 11], 10).unwrap_err();
        assert!(matches!(err, AttachError::FileTooLarge { size: 11, limit: 10, .. }));
    }

    #[test]
    fn mime_guess() {
        assert_eq!(guess_mime_type(Path::new("notes.MD")), "text/plain");
        assert_eq!(guess_mime_type(Path::new("scan.pdf")), "application/pdf");
        assert_eq!(guess_mime_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn task_targets_have_no_files_or_links() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        let p = create_phase(&mut doc, &mut ids, now, "P").unwrap();
        let w = create_week(&mut doc, &mut ids, now, &p, "W").unwrap();
        let d = create_day(&mut doc, &mut ids, now, &p, &w, "D").unwrap();
        let list = ChecklistRef::Tasks {
            phase_id: p.clone(),
            week_id: w.clone(),
            day_id: d.clone(),
        };
        add_checklist_item(&mut doc, &list, "watch lecture");

        let task = AttachTarget::Task {
            phase_id: p.clone(),
            week_id: w.clone(),
            day_id: d.clone(),
            index: 0,
        };
        let m = materials_mut(&mut doc, &task).unwrap();
        assert!(m.files.is_none() && m.links.is_none());
        let file = encode_file("a.txt", "text/plain", b"a", 10).unwrap();
        assert!(matches!(add_file(m.files, file), Err(AttachError::Unsupported("files"))));

        let day = AttachTarget::Day {
            phase_id: p,
            week_id: w,
            day_id: d,
        };
        let m = materials_mut(&mut doc, &day).unwrap();
        add_link(m.links.unwrap(), "https://example.com").unwrap();
        assert_eq!(doc.phases[0].weeks[0].days[0].links.len(), 1);
    }
}
