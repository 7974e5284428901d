//! FFmpeg Detection
//!
//! Locates a system-installed ffmpeg binary and reads its version.

use std::path::PathBuf;
use std::process::Command;

use crate::core::{CoreError, CoreResult};

/// Information about the detected FFmpeg installation
#[derive(Debug, Clone)]
pub struct FfmpegInfo {
    /// Path to the ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// FFmpeg version string
    pub version: String,
}

/// Detect FFmpeg from the system PATH or common install locations
pub fn detect_system_ffmpeg() -> CoreResult<FfmpegInfo> {
    let ffmpeg_path = which_ffmpeg()?;
    let version = get_ffmpeg_version(&ffmpeg_path)?;

    Ok(FfmpegInfo {
        ffmpeg_path,
        version,
    })
}

fn which_ffmpeg() -> CoreResult<PathBuf> {
    #[cfg(target_os = "windows")]
    let binary_name = "ffmpeg.exe";

    #[cfg(not(target_os = "windows"))]
    let binary_name = "ffmpeg";

    // Try common locations first
    for dir in common_ffmpeg_dirs() {
        let candidate = dir.join(binary_name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // Fall back to PATH search using `where` (Windows) or `which` (Unix)
    #[cfg(target_os = "windows")]
    let lookup = Command::new("where").arg("ffmpeg").output();

    #[cfg(not(target_os = "windows"))]
    let lookup = Command::new("which").arg("ffmpeg").output();

    let output = lookup.map_err(|_| CoreError::FfmpegNotFound)?;
    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = stdout.lines().next() {
            return Ok(PathBuf::from(first_line.trim()));
        }
    }

    Err(CoreError::FfmpegNotFound)
}

fn common_ffmpeg_dirs() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from(r"C:\ffmpeg\bin"),
            PathBuf::from(r"C:\Program Files\ffmpeg\bin"),
        ]
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/opt/homebrew/bin"),
            PathBuf::from("/usr/local/bin"),
        ]
    }

    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    {
        vec![PathBuf::from("/usr/bin"), PathBuf::from("/usr/local/bin")]
    }
}

fn get_ffmpeg_version(path: &PathBuf) -> CoreResult<String> {
    let output = Command::new(path)
        .arg("-version")
        .output()
        .map_err(|_| CoreError::FfmpegNotFound)?;

    if !output.status.success() {
        return Err(CoreError::FfmpegNotFound);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    // First line: "ffmpeg version 6.0 Copyright ..."
    let version = stdout
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("ffmpeg version "))
        .map(|rest| rest.split_whitespace().next().unwrap_or(rest).to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_dirs_not_empty() {
        assert!(!common_ffmpeg_dirs().is_empty());
    }

    #[test]
    fn test_version_on_missing_binary() {
        let result = get_ffmpeg_version(&PathBuf::from("/nonexistent/ffmpeg"));
        assert!(matches!(result, Err(CoreError::FfmpegNotFound)));
    }
}
