//! File-backed persistence of solved tables.
//!
//! All file work is serialized through one dedicated worker thread so that
//! extension, mapping, copying, truncation and close happen in a fixed
//! order. The controller submits two kinds of work item: *prepare*
//! (extend the table file to the mapped size, map it writable, write the
//! initial metadata sidecar) and *save* (copy the winning assignment into
//! the mapping, flush, wait for the verifier, stamp the final metadata,
//! truncate to exact size). The save step never persists an unverified
//! table: a failed verification removes both artefacts.

pub(crate) mod header;

#[cfg(test)]
mod tests;

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;

use memmap2::MmapMut;
use tracing::{debug, warn};

use crate::error::{MaguroError, Result};
use crate::event::Event;
use crate::persist::header::TableInfoHeader;
use crate::timers::{IntervalTimer, TimerSnapshot};

/// Derives the metadata sidecar path for a table file by appending
/// `.info` to the full file name.
///
/// # Examples
/// ```
/// use maguro_core::info_sidecar_path;
///
/// let info = info_sidecar_path("keys.pht".as_ref());
/// assert_eq!(info.to_str(), Some("keys.pht.info"));
/// ```
#[must_use]
pub fn info_sidecar_path(table_path: &Path) -> PathBuf {
    let mut name = table_path.as_os_str().to_os_string();
    name.push(".info");
    PathBuf::from(name)
}

enum FileWork {
    Prepare {
        mapped_len: u64,
        header: Box<TableInfoHeader>,
    },
    Save {
        assigned: Vec<u32>,
        header: Box<TableInfoHeader>,
    },
    /// Rewrite the metadata sidecar with final statistics when the build
    /// ends without a solution, so exhaustion metrics are persisted.
    Finalize {
        header: Box<TableInfoHeader>,
    },
    Shutdown,
}

/// Verification result handed to the save step.
struct VerifyHandoff {
    snapshot: TimerSnapshot,
    passed: bool,
}

#[derive(Default)]
struct Shared {
    prepared: Event,
    saved: Event,
    verified: Event,
    verify_handoff: Mutex<Option<VerifyHandoff>>,
    prepare_snapshot: Mutex<Option<TimerSnapshot>>,
    save_snapshot: Mutex<Option<TimerSnapshot>>,
    error: Mutex<Option<MaguroError>>,
}

/// Handle to the dedicated file-work thread.
pub(crate) struct FileWorker {
    sender: mpsc::Sender<FileWork>,
    handle: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
    table_path: PathBuf,
    info_path: PathBuf,
}

impl FileWorker {
    /// Spawns the file-work thread for `table_path`.
    pub(crate) fn spawn(table_path: &Path) -> Result<Self> {
        let info_path = info_sidecar_path(table_path);
        let shared = Arc::new(Shared::default());
        let (sender, receiver) = mpsc::channel();

        let thread_shared = Arc::clone(&shared);
        let thread_table = table_path.to_path_buf();
        let thread_info = info_path.clone();
        let handle = std::thread::Builder::new()
            .name("maguro-file-work".to_owned())
            .spawn(move || run(&thread_table, &thread_info, &thread_shared, &receiver))
            .map_err(|source| MaguroError::FileWork {
                stage: "spawn",
                path: table_path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            sender,
            handle: Some(handle),
            shared,
            table_path: table_path.to_path_buf(),
            info_path,
        })
    }

    pub(crate) fn table_path(&self) -> &Path {
        &self.table_path
    }

    pub(crate) fn info_path(&self) -> &Path {
        &self.info_path
    }

    /// Queues file preparation for a (possibly resized) table.
    pub(crate) fn submit_prepare(&self, mapped_len: u64, header: TableInfoHeader) -> Result<()> {
        self.shared.prepared.reset();
        self.send(FileWork::Prepare {
            mapped_len,
            header: Box::new(header),
        })
    }

    /// Queues the save of the winning assignment.
    pub(crate) fn submit_save(&self, assigned: Vec<u32>, header: TableInfoHeader) -> Result<()> {
        self.shared.saved.reset();
        self.send(FileWork::Save {
            assigned,
            header: Box::new(header),
        })
    }

    /// Queues a final sidecar rewrite for a build that found no solution.
    pub(crate) fn submit_finalize(&self, header: TableInfoHeader) -> Result<()> {
        self.shared.saved.reset();
        self.send(FileWork::Finalize {
            header: Box::new(header),
        })
    }

    /// Hands the verifier outcome to the pending save step.
    pub(crate) fn complete_verification(&self, snapshot: TimerSnapshot, passed: bool) {
        let mut handoff = self
            .shared
            .verify_handoff
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *handoff = Some(VerifyHandoff { snapshot, passed });
        drop(handoff);
        self.shared.verified.set();
    }

    /// Blocks until preparation completed, surfacing any file error.
    pub(crate) fn wait_prepared(&self) -> Result<()> {
        self.shared.prepared.wait();
        self.take_error()
    }

    /// Blocks until the save step completed, surfacing any file error.
    pub(crate) fn wait_saved(&self) -> Result<()> {
        self.shared.saved.wait();
        self.take_error()
    }

    /// Prepare and save timings measured on the file-work thread.
    pub(crate) fn timings(&self) -> (TimerSnapshot, TimerSnapshot) {
        let prepare = self
            .shared
            .prepare_snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or_default();
        let save = self
            .shared
            .save_snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or_default();
        (prepare, save)
    }

    fn send(&self, work: FileWork) -> Result<()> {
        self.sender
            .send(work)
            .map_err(|_| MaguroError::FileWork {
                stage: "submit",
                path: self.table_path.clone(),
                source: io::Error::other("file worker exited early"),
            })
    }

    fn take_error(&self) -> Result<()> {
        let mut slot = self.shared.error.lock().unwrap_or_else(|e| e.into_inner());
        match slot.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Drop for FileWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(FileWork::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct PreparedFile {
    file: File,
    mapping: MmapMut,
}

fn run(
    table_path: &Path,
    info_path: &Path,
    shared: &Shared,
    receiver: &mpsc::Receiver<FileWork>,
) {
    let mut prepared: Option<PreparedFile> = None;

    while let Ok(work) = receiver.recv() {
        match work {
            FileWork::Prepare { mapped_len, header } => {
                let timer = IntervalTimer::start();
                // Drop any mapping from a previous (smaller) size first.
                prepared = None;
                match prepare(table_path, info_path, mapped_len, &header) {
                    Ok(state) => {
                        let mut snapshot = shared
                            .prepare_snapshot
                            .lock()
                            .unwrap_or_else(|e| e.into_inner());
                        *snapshot = Some(timer.snapshot());
                        prepared = Some(state);
                        debug!(mapped_len, path = %table_path.display(), "output file prepared");
                    }
                    Err(source) => record_error(shared, "prepare", table_path, source),
                }
                shared.prepared.set();
            }
            FileWork::Save { assigned, header } => {
                let timer = IntervalTimer::start();
                let state = prepared.take();
                if let Err(source) =
                    save(state, table_path, info_path, &assigned, *header, shared, &timer)
                {
                    record_error(shared, "save", table_path, source);
                }
                shared.saved.set();
            }
            FileWork::Finalize { header } => {
                prepared = None;
                if let Err(source) = finalize(info_path, &header) {
                    record_error(shared, "finalize", table_path, source);
                }
                shared.saved.set();
            }
            FileWork::Shutdown => break,
        }
    }
}

fn finalize(info_path: &Path, header: &TableInfoHeader) -> io::Result<()> {
    let mut info = File::create(info_path)?;
    header.write_to(&mut info)?;
    info.sync_all()
}

fn record_error(shared: &Shared, stage: &'static str, path: &Path, source: io::Error) {
    warn!(stage, path = %path.display(), error = %source, "file work failed");
    let mut slot = shared.error.lock().unwrap_or_else(|e| e.into_inner());
    *slot = Some(MaguroError::FileWork {
        stage,
        path: path.to_path_buf(),
        source,
    });
}

fn prepare(
    table_path: &Path,
    info_path: &Path,
    mapped_len: u64,
    header: &TableInfoHeader,
) -> io::Result<PreparedFile> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(table_path)?;
    file.set_len(mapped_len)?;
    // SAFETY: the mapping is private to the file worker and outlives no
    // access; the file stays open for the mapping's lifetime.
    let mapping = unsafe { MmapMut::map_mut(&file)? };

    let mut info = File::create(info_path)?;
    header.write_to(&mut info)?;
    info.sync_all()?;

    Ok(PreparedFile { file, mapping })
}

fn save(
    state: Option<PreparedFile>,
    table_path: &Path,
    info_path: &Path,
    assigned: &[u32],
    mut header: TableInfoHeader,
    shared: &Shared,
    timer: &IntervalTimer,
) -> io::Result<()> {
    let PreparedFile { file, mut mapping } = state
        .ok_or_else(|| io::Error::other("save submitted before the output file was prepared"))?;

    let byte_len = assigned.len() * size_of::<u32>();
    if mapping.len() < byte_len {
        return Err(io::Error::other(
            "prepared mapping is smaller than the solved table",
        ));
    }
    for (chunk, value) in mapping[..byte_len].chunks_exact_mut(4).zip(assigned) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    mapping.flush()?;

    let save_snapshot = timer.snapshot();
    {
        let mut slot = shared
            .save_snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *slot = Some(save_snapshot);
    }

    // The verifier runs concurrently on the controller thread; its timing
    // belongs in the header, so wait for it before stamping.
    shared.verified.wait();
    let handoff = shared
        .verify_handoff
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take();
    let Some(handoff) = handoff else {
        return Err(io::Error::other("verification completed without a result"));
    };

    drop(mapping);
    if !handoff.passed {
        // Never leave an incorrect table behind.
        drop(file);
        let _ = fs::remove_file(table_path);
        let _ = fs::remove_file(info_path);
        warn!(path = %table_path.display(), "verification failed, artefacts removed");
        return Ok(());
    }

    header.verify_timer = handoff.snapshot;
    header.save_timer = save_snapshot;
    header.prepare_timer = shared
        .prepare_snapshot
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .unwrap_or_default();

    file.set_len(byte_len as u64)?;
    file.sync_all()?;
    drop(file);

    let mut info = File::create(info_path)?;
    header.write_to(&mut info)?;
    info.sync_all()?;
    debug!(bytes = byte_len, path = %table_path.display(), "table persisted");
    Ok(())
}
