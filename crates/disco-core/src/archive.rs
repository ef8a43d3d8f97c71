use crate::costs::upgrades::{UPGRADES_DIR, UPGRADE_FILE_SUFFIX};
use crate::error::DiscoError;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use zip::ZipArchive;

pub const PROJECT_ZIP: &str = "pydss_project/project.zip";
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(60);
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lock held by the existence of a file.
///
/// The lock file is created with create-new semantics and removed on drop,
/// so it works across processes on shared filesystems.
#[derive(Debug)]
pub struct SoftLock {
    path: PathBuf,
}

impl SoftLock {
    pub fn acquire(path: &Path, timeout: Duration) -> Result<SoftLock, DiscoError> {
        let start = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    return Ok(SoftLock {
                        path: path.to_path_buf(),
                    })
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if start.elapsed() >= timeout {
                        return Err(DiscoError::LockTimeout(path.to_path_buf()));
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SoftLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

fn lock_path_for(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Extract one archive entry to `dest` unless it already exists.
///
/// Returns whether this call performed the extraction. Concurrent callers
/// serialize on `<dest>.lock`; the file appears at `dest` atomically.
pub fn extract_entry_locked(
    zip_path: &Path,
    entry_name: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<bool, DiscoError> {
    let parent = dest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent)?;

    let _lock = SoftLock::acquire(&lock_path_for(dest), timeout)?;
    if dest.exists() {
        debug!(dest = %dest.display(), "already extracted");
        return Ok(false);
    }

    let mut archive = ZipArchive::new(File::open(zip_path)?)?;
    let mut entry = archive.by_name(entry_name)?;
    let mut tmp = NamedTempFile::new_in(&parent)?;
    io::copy(&mut entry, &mut tmp)?;
    tmp.persist(dest).map_err(|e| DiscoError::Io(e.error))?;
    Ok(true)
}

/// Archive entries that hold upgrade results (`.../upgrades/*_upgrades.json`).
pub fn upgrade_entries(zip_path: &Path) -> Result<Vec<String>, DiscoError> {
    let archive = ZipArchive::new(File::open(zip_path)?)?;
    let marker = format!("{UPGRADES_DIR}/");
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| name.contains(&marker) && name.ends_with(UPGRADE_FILE_SUFFIX))
        .map(str::to_string)
        .collect();
    names.sort();
    Ok(names)
}

/// Extract every upgrade-results file of a project archive into
/// `<dest_dir>/upgrades/`.
pub fn extract_upgrades(zip_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, DiscoError> {
    let mut extracted = Vec::new();
    for entry in upgrade_entries(zip_path)? {
        let file_name = entry.rsplit('/').next().unwrap_or(&entry);
        let dest = dest_dir.join(UPGRADES_DIR).join(file_name);
        if extract_entry_locked(zip_path, &entry, &dest, DEFAULT_LOCK_TIMEOUT)? {
            info!(entry = %entry, dest = %dest.display(), "extracted upgrade results");
        }
        extracted.push(dest);
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_lock_excludes_second_holder() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("x.lock");
        let lock = SoftLock::acquire(&lock_path, Duration::from_millis(10)).unwrap();
        let err = SoftLock::acquire(&lock_path, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, DiscoError::LockTimeout(_)));
        drop(lock);
        assert!(!lock_path.exists());
        assert!(SoftLock::acquire(&lock_path, Duration::from_millis(10)).is_ok());
    }

    #[test]
    fn test_extract_upgrades_once() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("project.zip");
        write_zip(
            &zip_path,
            &[
                ("Exports/upgrades/thermal_upgrades.json", "[]"),
                ("Exports/upgrades/voltage_upgrades.json", "[]"),
                ("Scenarios/pf1/simulation.toml", ""),
            ],
        );

        let out = dir.path().join("job1");
        let files = extract_upgrades(&zip_path, &out).unwrap();
        assert_eq!(files.len(), 2);
        assert!(out.join("upgrades/thermal_upgrades.json").is_file());

        // second extraction is a no-op
        let dest = out.join("upgrades/thermal_upgrades.json");
        let extracted = extract_entry_locked(
            &zip_path,
            "Exports/upgrades/thermal_upgrades.json",
            &dest,
            DEFAULT_LOCK_TIMEOUT,
        )
        .unwrap();
        assert!(!extracted);
        assert!(!lock_path_for(&dest).exists());
    }

    #[test]
    fn test_concurrent_extraction_happens_once() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("project.zip");
        write_zip(&zip_path, &[("upgrades/thermal_upgrades.json", "[]")]);
        let dest = dir.path().join("shared/thermal_upgrades.json");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let zip_path = zip_path.clone();
                let dest = dest.clone();
                thread::spawn(move || {
                    extract_entry_locked(
                        &zip_path,
                        "upgrades/thermal_upgrades.json",
                        &dest,
                        DEFAULT_LOCK_TIMEOUT,
                    )
                    .unwrap()
                })
            })
            .collect();
        let extracted: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(extracted, 1);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "[]");
    }
}
