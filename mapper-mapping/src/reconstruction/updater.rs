//! Background worker meshing chunk snapshots for asynchronous map updates.

use super::meshing::mesh_snapshots;
use super::volume::ChunkSnapshot;
use mapper_data::{Chunk, ChunkKey, MapType};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// One asynchronous update request.
#[derive(Debug, Clone)]
pub struct UpdateJob {
    pub id: u64,
    pub snapshots: Vec<ChunkSnapshot>,
    pub map_type: MapType,
    pub resolution: f32,
}

/// Result of an [`UpdateJob`].
#[derive(Debug)]
pub struct UpdateResult {
    pub id: u64,
    pub outcome: Result<Vec<(ChunkKey, Chunk)>, String>,
}

/// Owns the meshing thread and its channels.
///
/// The thread exits once the updater is dropped.
pub struct ChunkUpdater {
    jobs: Option<Sender<UpdateJob>>,
    results: Receiver<UpdateResult>,
    handle: Option<JoinHandle<()>>,
}

impl ChunkUpdater {
    pub fn spawn() -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<UpdateJob>();
        let (result_tx, result_rx) = mpsc::channel::<UpdateResult>();

        let handle = thread::Builder::new()
            .name("chunk-updater".to_string())
            .spawn(move || run(job_rx, result_tx))?;

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }

    /// Queue a job. Returns `false` if the worker is gone.
    pub fn submit(&self, job: UpdateJob) -> bool {
        match &self.jobs {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    /// Non-blocking check for a finished job.
    pub fn try_recv(&self) -> Result<UpdateResult, TryRecvError> {
        self.results.try_recv()
    }

    /// An updater whose worker is already gone.
    #[cfg(test)]
    pub(crate) fn stopped() -> Self {
        let (_, results) = mpsc::channel();
        Self {
            jobs: None,
            results,
            handle: None,
        }
    }
}

impl Drop for ChunkUpdater {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Chunk updater thread panicked");
            }
        }
    }
}

fn run(jobs: Receiver<UpdateJob>, results: Sender<UpdateResult>) {
    while let Ok(job) = jobs.recv() {
        debug!("Meshing {} chunks for update {}", job.snapshots.len(), job.id);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            mesh_snapshots(&job.snapshots, job.map_type, job.resolution)
        }))
        .map_err(|_| format!("meshing update {} panicked", job.id));

        if results.send(UpdateResult { id: job.id, outcome }).is_err() {
            break;
        }
    }
    debug!("Chunk updater stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruction::volume::VoxelSample;
    use glam::Vec3;
    use std::time::{Duration, Instant};

    fn wait(updater: &ChunkUpdater) -> UpdateResult {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match updater.try_recv() {
                Ok(result) => return result,
                Err(TryRecvError::Empty) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(2));
                }
                Err(e) => panic!("no result from updater: {e}"),
            }
        }
    }

    #[test]
    fn test_job_round_trip_through_worker() {
        let updater = ChunkUpdater::spawn().unwrap();
        let samples = (0..9)
            .map(|i| VoxelSample {
                position: Vec3::new((i % 3) as f32 * 0.1, (i / 3) as f32 * 0.1, 0.0),
                color: [1, 2, 3],
                weight: 1,
            })
            .collect();
        assert!(updater.submit(UpdateJob {
            id: 7,
            snapshots: vec![ChunkSnapshot { key: [0, 0, 0], samples }],
            map_type: MapType::Mesh,
            resolution: 0.1,
        }));

        let result = wait(&updater);
        assert_eq!(result.id, 7);
        let chunks = result.outcome.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].1.vertex_count(), 9);
    }

    #[test]
    fn test_empty_try_recv_does_not_block() {
        let updater = ChunkUpdater::spawn().unwrap();
        assert!(matches!(updater.try_recv(), Err(TryRecvError::Empty)));
    }
}
