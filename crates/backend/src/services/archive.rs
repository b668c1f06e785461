//! Site files archive export.
//!
//! Zips the generated site directory and streams it incrementally into the
//! response body. Entries are walked in sorted order so identical inputs
//! produce identical archives.

use std::io;
use std::path::{Path, PathBuf};

use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use axum::body::Body;
use thiserror::Error;
use tokio::io::DuplexStream;
use tokio_util::io::ReaderStream;

const STREAM_BUFFER_BYTES: usize = 64 * 1024;

/// Errors that can occur while producing the archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading a source file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Writing the archive failed.
    #[error("zip error: {0}")]
    Zip(#[from] async_zip::error::ZipError),
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// List the files under `root` as sorted root-relative paths.
///
/// The directory itself is not nested; its contents sit at the archive
/// root.
///
/// # Errors
///
/// Returns error if a directory cannot be read.
pub fn collect_entries(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    collect_into(root, Path::new(""), &mut entries)?;
    entries.sort();
    Ok(entries)
}

fn collect_into(root: &Path, relative: &Path, entries: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(root.join(relative))? {
        let entry = entry?;
        let child = relative.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_into(root, &child, entries)?;
        } else if file_type.is_file() {
            entries.push(child);
        }
    }
    Ok(())
}

/// Stream a zip of `entries` (relative to `root`) as a response body.
///
/// The archive is produced incrementally; it is never buffered whole. A
/// failure after bytes are in flight closes the writer, which terminates
/// the response stream mid-transfer.
#[must_use]
pub fn zip_stream(root: PathBuf, entries: Vec<PathBuf>) -> Body {
    let (writer, reader) = tokio::io::duplex(STREAM_BUFFER_BYTES);

    tokio::spawn(async move {
        if let Err(error) = write_archive(&root, &entries, writer).await {
            tracing::error!(error = %error, "site files archive stream aborted");
        }
    });

    Body::from_stream(ReaderStream::new(reader))
}

async fn write_archive(
    root: &Path,
    entries: &[PathBuf],
    writer: DuplexStream,
) -> Result<(), ArchiveError> {
    let mut zip = ZipFileWriter::with_tokio(writer);

    for relative in entries {
        let data = tokio::fs::read(root.join(relative)).await?;
        let name = relative.to_string_lossy().replace('\\', "/");
        let entry = ZipEntryBuilder::new(name.into(), Compression::Deflate);
        zip.write_entry_whole(entry, &data).await?;
    }

    zip.close().await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
        assert!(!constant_time_compare("hello", "helloo"));
    }

    #[test]
    fn test_collect_entries_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/site.css"), "body {}").unwrap();

        let entries = collect_entries(dir.path()).unwrap();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("assets/site.css"),
                PathBuf::from("index.html"),
            ]
        );
    }

    #[tokio::test]
    async fn test_write_archive_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/site.css"), "body {}").unwrap();

        let root = dir.path().to_path_buf();
        let entries = collect_entries(&root).unwrap();

        let (writer, mut reader) = tokio::io::duplex(STREAM_BUFFER_BYTES);
        let producer = tokio::spawn(async move { write_archive(&root, &entries, writer).await });

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await.unwrap();
        producer.await.unwrap().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["assets/site.css", "index.html"]);

        let mut contents = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("index.html").unwrap(),
            &mut contents,
        )
        .unwrap();
        assert_eq!(contents, "<html></html>");
    }
}
