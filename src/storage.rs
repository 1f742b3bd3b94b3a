//! File persistence for plaintext and encrypted outputs.

use getrandom::fill;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A single file on disk, read whole and written atomically.
#[derive(Clone, Debug)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns `true` if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the entire file into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Writes `data` to a file that must not exist yet.
    ///
    /// This method ensures crash-safety and never clobbers by:
    /// 1. Writing data to a temporary file with random name
    /// 2. Syncing the temporary file to disk
    /// 3. Moving it into place, failing if the target appeared meanwhile
    /// 4. Syncing the parent directory (best effort) so the move is persisted
    ///
    /// If a crash occurs during save, either no output or the complete
    /// output is present, never a partial one at the final path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or already exists. An
    /// error always means nothing was left at the final path.
    pub fn save_new(&self, data: &[u8]) -> io::Result<()> {
        let tmp_path = self.random_tmp_path()?;

        // securely create temp file (fail if exists)
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        let written = tmp_file.write_all(data).and_then(|()| tmp_file.sync_all());
        drop(tmp_file);

        if let Err(e) = written.and_then(|()| rename_noclobber(&tmp_path, &self.path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        sync_parent_dir(&self.path);
        Ok(())
    }

    /// Removes the file.
    pub fn remove(&self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }

    /// Returns the path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Generates a unique temporary file path in the same directory.
    ///
    /// Uses cryptographically secure random bytes to avoid name collisions.
    /// Format: `.filename.tmp.<randomhex>`
    fn random_tmp_path(&self) -> io::Result<PathBuf> {
        let mut buf = [0u8; 8]; // 64 bit entropy
        fill(&mut buf).map_err(|e| io::Error::other(format!("OS random generator unavailable: {e}")))?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
            .to_string_lossy();

        let tmp_name = format!(".{}.tmp.{}", file_name, hex::encode(buf));

        Ok(self.path.with_file_name(tmp_name))
    }
}

/// Moves `from` to `to` unless `to` exists.
///
/// Uses Windows `MoveFileExW` without `MOVEFILE_REPLACE_EXISTING`, plus
/// `MOVEFILE_WRITE_THROUGH` so the move is flushed before returning.
#[cfg(target_os = "windows")]
pub fn rename_noclobber(from: &Path, to: &Path) -> io::Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{
        MOVEFILE_COPY_ALLOWED, MOVEFILE_WRITE_THROUGH, MoveFileExW,
    };

    fn to_wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let from_w = to_wide(from.as_os_str());
    let to_w = to_wide(to.as_os_str());

    // SAFETY:
    // - Strings are valid UTF-16 and null-terminated
    // - Pointers remain valid during the call
    // - Windows does not retain the pointers after return
    let result = unsafe {
        MoveFileExW(
            from_w.as_ptr(),
            to_w.as_ptr(),
            MOVEFILE_WRITE_THROUGH | MOVEFILE_COPY_ALLOWED,
        )
    };

    if result == 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Moves `from` to `to` unless `to` exists.
///
/// On Unix, `link()` fails with `EEXIST` instead of replacing the target.
/// Filesystems without hard links fall back to check-then-rename. Once the
/// link exists the move has succeeded, so a leftover source only warns.
#[cfg(not(target_os = "windows"))]
pub fn rename_noclobber(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(from) {
                warn!(path = %from.display(), error = %e, "failed to remove source after link");
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(_) => {
            if to.symlink_metadata().is_ok() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "output file already exists",
                ));
            }
            fs::rename(from, to)
        }
    }
}

/// Flushes the directory entry of `path`. Failure only warns: the file is
/// already complete at its final path.
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
            warn!(path = %parent.display(), error = %e, "failed to sync directory");
        }
    }

    #[cfg(not(unix))]
    let _ = path;
}
