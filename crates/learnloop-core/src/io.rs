use crate::error::{LearnError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

const BACKUP_SUFFIX: &str = ".bak";

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting state files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    atomic_write_with(path, |w| w.write_all(data))
}

/// Atomically write whatever `write` produces to `path`.
///
/// The writer is backed by a tempfile created next to `path`, so the final
/// rename never crosses a filesystem boundary. If `write` fails, or anything
/// before the rename fails, the tempfile is removed and `path` is left as it
/// was.
pub fn atomic_write_with<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let fail = |source| LearnError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(fail)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp_")
        .tempfile_in(dir)
        .map_err(fail)?;
    {
        let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
        write(&mut writer).map_err(fail)?;
        writer.flush().map_err(fail)?;
    }
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    tracing::debug!(path = %path.display(), "atomic write complete");
    Ok(())
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Copy `path` byte-for-byte to `<path>.bak`, replacing any older backup.
///
/// Returns `None` when there is nothing to back up.
pub fn backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let bak = backup_path(path);
    std::fs::copy(path, &bak).map_err(|source| LearnError::WriteFailure {
        path: bak.clone(),
        source,
    })?;
    tracing::debug!(backup = %bak.display(), "backed up store");
    Ok(Some(bak))
}

/// Read a file that must exist, mapping "not found" to `MissingFile`.
pub fn read_required(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LearnError::MissingFile(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
