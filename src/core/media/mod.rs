//! Media File Helpers
//!
//! Recognized media/image extensions, recursive folder expansion,
//! sibling-image resolution for video synthesis and temporary artifact
//! path generation.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::core::CoreResult;

/// Audio extensions accepted without transcoding
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "aac", "m4a", "wma"];

/// Video extensions accepted as input (transcoded to audio first)
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "ts", "mkv", "wmv", "flv", "webm", "rmvb",
];

/// Image extensions usable as a video background
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| extensions.contains(&e.as_str()))
}

/// Whether the file can be fed to an ASR engine directly
pub fn is_audio_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

/// Whether the file is accepted as processing input at all
pub fn is_media_file(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS) || has_extension(path, VIDEO_EXTENSIONS)
}

/// Expands a file or directory argument into the media files it names.
///
/// Directories are walked recursively; non-media files are skipped.
/// The result preserves walk order so batch tables stay stable.
pub fn collect_media_files(input: &Path) -> Vec<PathBuf> {
    if input.is_dir() {
        WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_media_file(path))
            .collect()
    } else if is_media_file(input) {
        vec![input.to_path_buf()]
    } else {
        debug!("Skipping non-media input: {}", input.display());
        Vec::new()
    }
}

/// Finds an image sharing the input's basename (`clip.mp4` → `clip.png`),
/// trying extensions in priority order.
pub fn sibling_image(input: &Path) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| input.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

/// Generates a unique sibling path for a temporary artifact:
/// `<stem>_<uuid8>.<ext>` next to the input file.
pub fn unique_sibling_path(input: &Path, ext: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    let short_id = &uuid::Uuid::new_v4().to_string()[..8];
    input.with_file_name(format!("{stem}_{short_id}.{ext}"))
}

/// Bundled fallback background image, materialized to the temp
/// directory on first use.
pub fn placeholder_image() -> CoreResult<PathBuf> {
    const PLACEHOLDER_PNG: &[u8] = include_bytes!("../../../assets/placeholder.png");

    let path = std::env::temp_dir().join("mediascribe_placeholder.png");
    if !path.is_file() {
        std::fs::write(&path, PLACEHOLDER_PNG)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_recognition() {
        assert!(is_audio_file(Path::new("/a/b.MP3")));
        assert!(is_audio_file(Path::new("voice.wav")));
        assert!(!is_audio_file(Path::new("clip.mp4")));
        assert!(is_media_file(Path::new("clip.mp4")));
        assert!(is_media_file(Path::new("clip.RMVB")));
        assert!(!is_media_file(Path::new("notes.txt")));
        assert!(!is_media_file(Path::new("noext")));
    }

    #[test]
    fn test_collect_media_files_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("skip.log"), b"x").unwrap();
        std::fs::write(sub.join("b.mp4"), b"x").unwrap();

        let files = collect_media_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.mp3", "b.mp4"]);
    }

    #[test]
    fn test_collect_media_files_single() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("a.wav");
        std::fs::write(&media, b"x").unwrap();
        assert_eq!(collect_media_files(&media), vec![media.clone()]);
        assert!(collect_media_files(&dir.path().join("a.doc")).is_empty());
    }

    #[test]
    fn test_sibling_image_priority() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"x").unwrap();

        assert_eq!(sibling_image(&input), None);

        std::fs::write(dir.path().join("clip.jpg"), b"x").unwrap();
        assert_eq!(sibling_image(&input), Some(dir.path().join("clip.jpg")));

        // png wins over jpg
        std::fs::write(dir.path().join("clip.png"), b"x").unwrap();
        assert_eq!(sibling_image(&input), Some(dir.path().join("clip.png")));
    }

    #[test]
    fn test_unique_sibling_path() {
        let a = unique_sibling_path(Path::new("/media/talk.mp4"), "mp3");
        let b = unique_sibling_path(Path::new("/media/talk.mp4"), "mp3");
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(Path::new("/media")));
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("talk_"));
        assert!(name.ends_with(".mp3"));
    }

    #[test]
    fn test_placeholder_image_materializes() {
        let path = placeholder_image().unwrap();
        assert!(path.is_file());
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
