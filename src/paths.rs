//! Output path naming and display helpers.
//!
//! Every generated path is collision free: when the natural name is taken,
//! `-1`, `-2`, ... is inserted before the original extension until a free
//! name is found. Nothing here ever overwrites an existing file.

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

use directories::BaseDirs;

/// Extension given to encrypted files.
pub const ENCRYPTED_FILE_EXTENSION: &str = "deadbolt";
/// Older extension, still accepted when decrypting.
pub const LEGACY_ENCRYPTED_FILE_EXTENSION: &str = "dbolt";
/// Extension of folder archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

const MAX_PRETTY_LEN: usize = 60;

/// Returns `true` if the path carries one of the encrypted-file extensions.
pub fn is_encrypted_file_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        ext == ENCRYPTED_FILE_EXTENSION || ext == LEGACY_ENCRYPTED_FILE_EXTENSION
    })
}

/// `file.txt` -> `file.txt.deadbolt`, then `file-1.txt.deadbolt`, ...
pub fn encrypted_output_path(input: &Path) -> PathBuf {
    let name = file_name(input);
    let (stem, ext) = split_name(name);

    first_free(|counter| {
        let mut candidate = match counter {
            None => name.to_os_string(),
            Some(n) => numbered(stem, n, ext),
        };
        candidate.push(".");
        candidate.push(ENCRYPTED_FILE_EXTENSION);
        input.with_file_name(candidate)
    })
}

/// `file.txt.deadbolt` (or `.dbolt`) -> `file.txt`, then `file-1.txt`, ...
pub fn decrypted_output_path(encrypted: &Path) -> PathBuf {
    let name = if is_encrypted_file_path(encrypted) {
        encrypted.file_stem().unwrap_or_else(|| file_name(encrypted))
    } else {
        file_name(encrypted)
    };
    let (stem, ext) = split_name(name);

    first_free(|counter| {
        let candidate = match counter {
            None => name.to_os_string(),
            Some(n) => numbered(stem, n, ext),
        };
        encrypted.with_file_name(candidate)
    })
}

/// `folder` -> `folder.zip`, then `folder-1.zip`, ...
pub fn archive_output_path(directory: &Path) -> PathBuf {
    let name = file_name(directory);

    first_free(|counter| {
        let mut candidate = match counter {
            None => name.to_os_string(),
            Some(n) => numbered(name, n, None),
        };
        candidate.push(".");
        candidate.push(ARCHIVE_EXTENSION);
        directory.with_file_name(candidate)
    })
}

/// Shortens a path for display.
///
/// The home directory is collapsed to `~`, and paths longer than 60
/// characters keep only their first directory and final component.
pub fn pretty_path(path: impl AsRef<Path>) -> String {
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    pretty_path_with_home(path.as_ref(), home.as_deref())
}

fn pretty_path_with_home(path: &Path, home: Option<&Path>) -> String {
    let relative_to_home = home
        .filter(|home| !home.as_os_str().is_empty())
        .and_then(|home| path.strip_prefix(home).ok());

    let pretty = match relative_to_home {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~{}{}", std::path::MAIN_SEPARATOR, rest.display()),
        None => path.display().to_string(),
    };

    if pretty.chars().count() <= MAX_PRETTY_LEN {
        return pretty;
    }

    let sep = std::path::MAIN_SEPARATOR;
    let mut normal = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .map(|c| c.as_os_str().to_string_lossy().into_owned());

    let last = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let first = match relative_to_home {
        Some(rest) => {
            let first = rest
                .components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("~{sep}{first}")
        }
        None => normal.next().unwrap_or_default(),
    };

    format!("{first}{sep}...{sep}{last}")
}

fn file_name(path: &Path) -> &OsStr {
    path.file_name().unwrap_or(OsStr::new("deadbolt-output"))
}

/// Splits `name.ext` into (`name`, Some(`ext`)). Dotfiles keep their dot in
/// the stem.
fn split_name(name: &OsStr) -> (&OsStr, Option<&OsStr>) {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => (stem, Some(ext)),
        _ => (name, None),
    }
}

fn numbered(stem: &OsStr, counter: u32, ext: Option<&OsStr>) -> OsString {
    let mut name = stem.to_os_string();
    name.push(format!("-{counter}"));
    if let Some(ext) = ext {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Walks `None, Some(1), Some(2), ...` until `candidate` names a free path.
fn first_free(candidate: impl Fn(Option<u32>) -> PathBuf) -> PathBuf {
    let mut path = candidate(None);
    let mut counter = 1;

    // symlink_metadata also sees dangling symlinks, which `exists` misses.
    while path.symlink_metadata().is_ok() {
        path = candidate(Some(counter));
        counter += 1;
    }

    path
}
