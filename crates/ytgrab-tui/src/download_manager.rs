//! Background probe/download execution.
//!
//! One task at most is in flight per flow session. Results come back over
//! the app channel tagged with a generation number; back-navigation bumps
//! the generation and aborts the task, so an outcome that races the
//! teardown is recognizably stale and dropped by the receiver.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use ytgrab_core::format::{Format, TrackKind};
use ytgrab_core::runner::Runner;

pub enum WorkResult {
    Probe(Result<Vec<Format>, String>),
    Download(Result<(), String>),
}

pub struct WorkMessage {
    pub generation: u64,
    pub result: WorkResult,
}

pub struct DownloadManager {
    runner: Arc<Runner>,
    tx: mpsc::Sender<WorkMessage>,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl DownloadManager {
    pub fn new(runner: Arc<Runner>, tx: mpsc::Sender<WorkMessage>) -> Self {
        Self {
            runner,
            tx,
            generation: 0,
            handle: None,
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Abort any in-flight task and invalidate its pending outcome.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("aborting in-flight yt-dlp task (generation {})", self.generation);
            handle.abort();
        }
        self.generation += 1;
    }

    pub fn start_probe(&mut self, url: String, kind: TrackKind) {
        self.cancel();
        let generation = self.generation;
        let runner = self.runner.clone();
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            let result = runner.probe(&url, kind).await.map_err(|e| e.to_string());
            let _ = tx
                .send(WorkMessage {
                    generation,
                    result: WorkResult::Probe(result),
                })
                .await;
        }));
    }

    pub fn start_download(&mut self, url: String, format_id: String, kind: TrackKind) {
        self.cancel();
        let generation = self.generation;
        let runner = self.runner.clone();
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            let result = runner
                .download(&url, &format_id, kind)
                .await
                .map_err(|e| e.to_string());
            let _ = tx
                .send(WorkMessage {
                    generation,
                    result: WorkResult::Download(result),
                })
                .await;
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn broken_runner() -> Arc<Runner> {
        let scratch = std::env::temp_dir().join("ytgrab-dm-test");
        Arc::new(Runner::new(
            PathBuf::from("/nonexistent/yt-dlp"),
            None,
            scratch.join("assets"),
            scratch.join("output.log"),
        ))
    }

    #[tokio::test]
    async fn probe_failure_arrives_with_current_generation() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut manager = DownloadManager::new(broken_runner(), tx);

        manager.start_probe(
            "https://example/watch".to_string(),
            TrackKind::Video,
        );
        let msg = rx.recv().await.unwrap();
        assert!(manager.is_current(msg.generation));
        match msg.result {
            WorkResult::Probe(Err(e)) => assert!(e.contains("yt-dlp"), "{e}"),
            _ => panic!("expected probe failure"),
        }
    }

    #[tokio::test]
    async fn cancel_invalidates_pending_outcome() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut manager = DownloadManager::new(broken_runner(), tx);

        manager.start_probe("https://example/watch".to_string(), TrackKind::Audio);
        manager.cancel();

        // The task may have sent its message before the abort landed; either
        // way its generation no longer matches.
        if let Ok(msg) = rx.try_recv() {
            assert!(!manager.is_current(msg.generation));
        }
    }

    #[tokio::test]
    async fn new_work_supersedes_old_generation() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut manager = DownloadManager::new(broken_runner(), tx);

        manager.start_probe("https://one".to_string(), TrackKind::Video);
        let first = rx.recv().await.unwrap();
        manager.start_download(
            "https://two".to_string(),
            "best".to_string(),
            TrackKind::Video,
        );
        assert!(!manager.is_current(first.generation));

        let second = rx.recv().await.unwrap();
        assert!(manager.is_current(second.generation));
        assert!(matches!(second.result, WorkResult::Download(Err(_))));
    }
}
