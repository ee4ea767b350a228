use std::{
    fs, io,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};

use tokio::{
    task::{self, JoinHandle},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

pub const TEMP_PREFIX: &str = "tmp";
pub const TEXT_SUFFIX: &str = ".txt";
pub const AUDIO_SUFFIX: &str = ".mp3";

/// Writes `tmp*` files into a directory and leaves them for the reaper.
#[derive(Debug, Clone)]
pub struct TempStore {
    dir: PathBuf,
}

impl TempStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn persist(&self, bytes: Vec<u8>, suffix: &'static str) -> Result<PathBuf, ServiceError> {
        let dir = self.dir.clone();
        task::spawn_blocking(move || -> Result<PathBuf, ServiceError> {
            let mut file = tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .suffix(suffix)
                .tempfile_in(&dir)?;
            file.write_all(&bytes)?;
            let (_, path) = file.keep().map_err(|e| ServiceError::Io(e.error))?;
            Ok(path)
        })
        .await
        .map_err(|err| ServiceError::Other(format!("temp file task failed: {err}")))?
    }
}

#[derive(Debug, Clone)]
pub struct TempEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub modified: SystemTime,
}

/// The filesystem operations the reaper needs.
pub trait TempFs: Send + Sync {
    fn list(&self, dir: &Path) -> io::Result<Vec<TempEntry>>;

    fn remove(&self, path: &Path) -> io::Result<()>;
}

pub struct OsTempFs;

impl TempFs for OsTempFs {
    fn list(&self, dir: &Path) -> io::Result<Vec<TempEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let Ok(entry) = entry else { continue };
            let Ok(metadata) = entry.metadata() else { continue };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else { continue };
            entries.push(TempEntry {
                path: entry.path(),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                modified,
            });
        }
        Ok(entries)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[derive(Debug, Clone)]
pub struct ReapPolicy {
    pub prefix: String,
    pub suffixes: Vec<String>,
    pub max_age: Duration,
}

impl ReapPolicy {
    /// Matches the text and audio files written through [`TempStore`].
    pub fn story_downloads(max_age: Duration) -> Self {
        Self {
            prefix: TEMP_PREFIX.into(),
            suffixes: vec![TEXT_SUFFIX.into(), AUDIO_SUFFIX.into()],
            max_age,
        }
    }

    fn is_expired(&self, entry: &TempEntry, now: SystemTime) -> bool {
        let name = entry.file_name.as_str();
        if !name.starts_with(&self.prefix) || !self.suffixes.iter().any(|s| name.ends_with(s.as_str())) {
            return false;
        }
        // mtime in the future counts as fresh
        now.duration_since(entry.modified)
            .map(|age| age > self.max_age)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

pub struct TempFileReaper {
    dir: PathBuf,
    fs: Arc<dyn TempFs>,
    policy: ReapPolicy,
    interval: Duration,
}

impl TempFileReaper {
    pub fn new(
        dir: impl Into<PathBuf>,
        fs: Arc<dyn TempFs>,
        policy: ReapPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            dir: dir.into(),
            fs,
            policy,
            interval,
        }
    }

    /// One best-effort pass. Failures are counted, never returned.
    pub fn sweep(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        let entries = match self.fs.list(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(dir = %self.dir.display(), error = %err, "temp dir listing failed");
                return report;
            }
        };

        for entry in entries {
            report.scanned += 1;
            if !self.policy.is_expired(&entry, now) {
                continue;
            }
            match self.fs.remove(&entry.path) {
                Ok(()) => report.removed += 1,
                Err(err) => {
                    tracing::debug!(path = %entry.path.display(), error = %err, "temp file removal failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Sweeps once per interval, starting one interval from now.
    pub fn start(self) -> ReaperHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let reaper = Arc::new(self);

        let join = tokio::spawn(async move {
            let period = reaper.interval;
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let sweeper = reaper.clone();
                        match task::spawn_blocking(move || sweeper.sweep(SystemTime::now())).await {
                            Ok(report) if report.removed > 0 || report.failed > 0 => {
                                tracing::info!(
                                    removed = report.removed,
                                    failed = report.failed,
                                    scanned = report.scanned,
                                    "temp files reaped"
                                );
                            }
                            Ok(_) => {}
                            Err(err) => tracing::warn!(error = %err, "temp sweep task failed"),
                        }
                    }
                }
            }
            tracing::debug!("temp file reaper stopped");
        });

        ReaperHandle { cancel, join }
    }
}

pub struct ReaperHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl ReaperHandle {
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.join.await {
            tracing::warn!(error = %err, "temp file reaper did not shut down cleanly");
        }
    }
}
