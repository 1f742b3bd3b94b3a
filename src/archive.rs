//! Folder archival for folder encryption.
//!
//! A folder is zipped next to itself (`folder.zip`) and the archive is what
//! gets encrypted. The archive is a temporary file owned by [`TempArchive`],
//! which removes it when dropped.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::paths::archive_output_path;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("`{0}` is not a directory")]
    NotADirectory(PathBuf),

    #[error("archive I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Archive file that is deleted when this guard goes out of scope.
#[derive(Debug)]
pub struct TempArchive {
    path: PathBuf,
}

impl TempArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary archive"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove temporary archive"
            ),
        }
    }
}

struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

/// Zips `directory` into a fresh, collision-free `<directory>.zip`.
///
/// Entries are stored relative to the folder root in sorted order with a
/// fixed timestamp, so archiving the same tree twice yields identical bytes.
/// On failure the partial archive is removed.
pub fn archive_directory(directory: &Path) -> Result<TempArchive, ArchiveError> {
    if !directory.is_dir() {
        return Err(ArchiveError::NotADirectory(directory.to_path_buf()));
    }

    let mut entries = Vec::new();
    collect_entries(directory, "", &mut entries)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let archive_path = archive_output_path(directory);
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&archive_path)?;

    // From here on the guard owns the file, so every error path cleans up.
    let archive = TempArchive { path: archive_path };
    write_zip(file, &entries)?;

    debug!(
        path = %archive.path.display(),
        entries = entries.len(),
        "created temporary archive"
    );
    Ok(archive)
}

fn collect_entries(dir: &Path, prefix: &str, entries: &mut Vec<Entry>) -> io::Result<()> {
    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        let name = format!("{prefix}{}", dir_entry.file_name().to_string_lossy());

        let file_type = dir_entry.file_type()?;
        let is_dir = if file_type.is_symlink() {
            // Follow links to files; linked folders could form cycles.
            let target = fs::metadata(&path)?;
            if target.is_dir() {
                warn!(path = %path.display(), "skipping symlinked folder");
                continue;
            }
            false
        } else {
            file_type.is_dir()
        };

        if is_dir {
            let child_prefix = format!("{name}/");
            collect_entries(&path, &child_prefix, entries)?;
            entries.push(Entry {
                name: child_prefix,
                path,
                is_dir: true,
            });
        } else {
            entries.push(Entry {
                name,
                path,
                is_dir: false,
            });
        }
    }
    Ok(())
}

fn write_zip(file: File, entries: &[Entry]) -> Result<(), ArchiveError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(BufWriter::new(file));

    for entry in entries {
        if entry.is_dir {
            zip.add_directory(entry.name.as_str(), options)?;
        } else {
            zip.start_file(entry.name.as_str(), options)?;
            let mut source = File::open(&entry.path)?;
            io::copy(&mut source, &mut zip)?;
        }
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
