//! File-backed frame source.

use crate::pcd::PcdReader;
use crate::{Error, Result};
use scenegrasp_core::{FrameHeader, FrameSource, RawFrame};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Lists the `.pcd` files of `dir` in lexicographic order.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub fn list_pcd_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pcd = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pcd"));
        if is_pcd && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Replays PCD files as frames.
///
/// The topic names either a single `.pcd` file or a directory whose `.pcd`
/// files are replayed in lexicographic order.
#[derive(Debug)]
pub struct DirectorySource {
    topic: String,
    files: Vec<PathBuf>,
    cursor: usize,
    seq: u64,
    repeat: bool,
}

impl DirectorySource {
    /// Opens the file or directory named by `topic`.
    ///
    /// # Errors
    /// Returns an error if the path does not exist or cannot be listed.
    pub fn open(topic: impl Into<String>) -> Result<Self> {
        let topic = topic.into();
        let path = Path::new(&topic);
        let files = if path.is_dir() {
            list_pcd_files(path)?
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file or directory: {topic}"),
            )));
        };

        log::debug!("source {topic}: {} file(s)", files.len());
        Ok(Self {
            topic,
            files,
            cursor: 0,
            seq: 0,
            repeat: false,
        })
    }

    /// Starts over from the first file once the last one is delivered.
    #[must_use]
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn read(&mut self, path: &Path) -> Result<RawFrame> {
        let frame_id = path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        let mut header = FrameHeader::new(self.seq, frame_id);
        header.stamp_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
        self.seq += 1;
        PcdReader::open(path)?.read_frame(header)
    }
}

impl FrameSource for DirectorySource {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn next_frame(&mut self) -> scenegrasp_core::Result<Option<RawFrame>> {
        if self.cursor >= self.files.len() {
            if !self.repeat || self.files.is_empty() {
                return Ok(None);
            }
            self.cursor = 0;
        }
        let path = self.files[self.cursor].clone();
        self.cursor += 1;
        self.read(&path)
            .map(Some)
            .map_err(|e| scenegrasp_core::Error::Source(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcd::{write_pcd, DataFormat};
    use scenegrasp_core::{Point, PointSet};
    use tempfile::tempdir;

    fn cloud(z: f32) -> PointSet {
        vec![Point::new(0.0, 0.0, z), Point::new(0.1, 0.0, z)].into()
    }

    #[test]
    fn test_replays_in_order() {
        let dir = tempdir().unwrap();
        write_pcd(dir.path().join("b.pcd"), &cloud(2.0), DataFormat::Binary).unwrap();
        write_pcd(dir.path().join("a.pcd"), &cloud(1.0), DataFormat::Ascii).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = DirectorySource::open(dir.path().to_string_lossy()).unwrap();
        assert_eq!(source.files().len(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.header.frame_id, "a");
        assert_eq!(first.header.seq, 0);
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.header.frame_id, "b");
        assert_eq!(second.header.seq, 1);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_repeat_wraps_around() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("only.pcd");
        write_pcd(&file, &cloud(1.0), DataFormat::Binary).unwrap();

        let mut source = DirectorySource::open(file.to_string_lossy())
            .unwrap()
            .with_repeat(true);
        for seq in 0..3 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.header.seq, seq);
        }
    }

    #[test]
    fn test_missing_topic() {
        assert!(DirectorySource::open("/definitely/not/here").is_err());
    }

    #[test]
    fn test_empty_directory_repeat_ends() {
        let dir = tempdir().unwrap();
        let mut source = DirectorySource::open(dir.path().to_string_lossy())
            .unwrap()
            .with_repeat(true);
        assert!(source.next_frame().unwrap().is_none());
    }
}
