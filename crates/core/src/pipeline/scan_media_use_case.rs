use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::content_analyser::{AnalyseError, ContentAnalyser};
use crate::shared::paths::is_image;

const QUEUE_DEPTH_PER_WORKER: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn of(path: &Path) -> Self {
        if is_image(path) {
            Self::Image
        } else {
            Self::Video
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug)]
pub struct ScanReport {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub verdict: Result<bool, AnalyseError>,
}

/// Analyses a batch of images and videos on a fixed set of worker threads.
///
/// Layout: `feeder → [worker × jobs] → collector`. Reports come back in
/// input order whatever order the workers finish in.
pub struct ScanMediaUseCase {
    analyser: Arc<ContentAnalyser>,
    jobs: usize,
    trim_start: usize,
    trim_end: Option<usize>,
}

impl ScanMediaUseCase {
    pub fn new(analyser: Arc<ContentAnalyser>, jobs: usize) -> Self {
        Self {
            analyser,
            jobs: jobs.max(1),
            trim_start: 0,
            trim_end: None,
        }
    }

    /// Restrict video analysis to frames `trim_start..trim_end`.
    pub fn with_trim(mut self, trim_start: usize, trim_end: Option<usize>) -> Self {
        self.trim_start = trim_start;
        self.trim_end = trim_end;
        self
    }

    pub fn execute(&self, inputs: &[PathBuf]) -> Vec<ScanReport> {
        let (job_tx, job_rx) =
            crossbeam_channel::bounded::<(usize, &Path)>(self.jobs * QUEUE_DEPTH_PER_WORKER);
        let (report_tx, report_rx) = crossbeam_channel::unbounded::<(usize, ScanReport)>();

        std::thread::scope(|s| {
            for _ in 0..self.jobs {
                let job_rx = job_rx.clone();
                let report_tx = report_tx.clone();
                s.spawn(move || {
                    for (index, path) in job_rx {
                        if report_tx.send((index, self.scan_one(path))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(report_tx);

            for (index, path) in inputs.iter().enumerate() {
                if job_tx.send((index, path.as_path())).is_err() {
                    break;
                }
            }
            drop(job_tx);
        });

        let mut slots: Vec<Option<ScanReport>> = inputs.iter().map(|_| None).collect();
        for (index, report) in report_rx {
            slots[index] = Some(report);
        }
        slots.into_iter().flatten().collect()
    }

    fn scan_one(&self, path: &Path) -> ScanReport {
        let kind = MediaKind::of(path);
        let verdict = match kind {
            MediaKind::Image => self.analyser.analyse_image(path),
            MediaKind::Video => self
                .analyser
                .analyse_video(path, self.trim_start, self.trim_end),
        };
        log::debug!("{kind} {}: {verdict:?}", path.display());
        ScanReport {
            path: path.to_path_buf(),
            kind,
            verdict,
        }
    }
}
