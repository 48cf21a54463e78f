use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .try_init();
    });
}

// -------- robust open/create with backoff (spreadsheets are often held open by office apps) --------

/// Return true for transient/retriable I/O errors seen when another process
/// (spreadsheet app, AV scanner, sync client) briefly holds the file.
fn is_retriable_io_error(e: &io::Error) -> bool {
    match e.raw_os_error() {
        // Windows: 5 access denied, 32 sharing violation, 33 lock violation,
        // 1224 user-mapped section open.
        Some(5) | Some(32) | Some(33) | Some(1224) => true,
        _ => e.kind() == io::ErrorKind::Interrupted,
    }
}

fn with_backoff<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("retries exhausted")))
}

/// Open a file with retries/backoff for transient errors.
pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, || File::open(path))
}

/// Create a file with retries/backoff for transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, || File::create(path))
}

/// Sibling temp path used while an output file is being written.
pub fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".inprogress");
    dest.with_file_name(name)
}

/// Atomically replace `dest` with `tmp`.
/// If rename fails (e.g., the destination is locked), fall back to copy+remove.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let tries = 20usize;
    let delay_ms = 50u64;
    match with_backoff(tries, delay_ms, || fs::rename(tmp, dest)) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::warn!("rename {} -> {} failed ({}), copying instead", tmp.display(), dest.display(), rename_err);
            with_backoff(tries, delay_ms, || fs::copy(tmp, dest))
                .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
            with_backoff(tries, delay_ms, || match fs::remove_file(tmp) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            })
            .with_context(|| format!("remove {}", tmp.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_path_keeps_directory_and_name() {
        let p = staging_path(Path::new("/tmp/out/recs.csv"));
        assert_eq!(p, Path::new("/tmp/out/recs.csv.inprogress"));
    }
}
