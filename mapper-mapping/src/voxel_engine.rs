//! CPU mapping engine built on the voxel volume and the chunk updater.

use crate::engine::{
    FilterReport, MappingEngine, MappingError, TextureReport, UpdateStatus,
};
use crate::ingest::backproject;
use crate::postprocess::{KeyframeStore, filter_map};
use crate::reconstruction::{ChunkUpdater, UpdateJob, VoxelVolume, mesh_snapshots};
use mapper_data::{
    CameraParameters, Chunk, ChunkKey, Frame, IncrementalMap, MapType, MappingParameters,
    MappingState, MeshFilter, TextureFormat, TrackingState,
};
use std::collections::BTreeMap;
use std::sync::mpsc::TryRecvError;
use tracing::{debug, info, warn};

/// Depth pixels skipped between samples in each direction.
const DEFAULT_PIXEL_STRIDE: u32 = 2;

/// Mapping engine fusing depth frames into a [`VoxelVolume`].
///
/// The volume lives on the caller's thread. Update requests ship snapshots
/// of changed chunks to a [`ChunkUpdater`] and results are collected by
/// polling, so no call blocks except [`extract_whole`](MappingEngine::extract_whole).
pub struct VoxelMappingEngine {
    calibration: CameraParameters,
    pixel_stride: u32,
    params: Option<MappingParameters>,
    state: MappingState,
    volume: VoxelVolume,
    updater: Option<ChunkUpdater>,
    pending: Option<u64>,
    // Meshed chunks not yet merged into a map. Survives across requests.
    ready: BTreeMap<ChunkKey, Chunk>,
    failure: Option<String>,
    keyframes: KeyframeStore,
    next_job: u64,
}

impl VoxelMappingEngine {
    pub fn new(calibration: CameraParameters) -> Self {
        let defaults = MappingParameters::default();
        Self {
            calibration,
            pixel_stride: DEFAULT_PIXEL_STRIDE,
            params: None,
            state: MappingState::NotEnabled,
            volume: VoxelVolume::with_memory_budget(
                defaults.resolution_meters,
                defaults.max_memory_mb,
            ),
            updater: None,
            pending: None,
            ready: BTreeMap::new(),
            failure: None,
            keyframes: KeyframeStore::new(calibration),
            next_job: 0,
        }
    }

    pub fn with_pixel_stride(mut self, stride: u32) -> Self {
        self.pixel_stride = stride.max(1);
        self
    }

    pub fn voxel_count(&self) -> usize {
        self.volume.voxel_count()
    }

    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    fn enabled_params(&self) -> Result<MappingParameters, MappingError> {
        self.params.ok_or(MappingError::NotEnabled)
    }

    fn updater(&mut self) -> Result<&ChunkUpdater, MappingError> {
        if self.updater.is_none() {
            self.updater = Some(ChunkUpdater::spawn()?);
        }
        self.updater.as_ref().ok_or(MappingError::NotEnabled)
    }

    fn drain_results(&mut self) {
        let Some(updater) = self.updater.as_ref() else {
            return;
        };
        loop {
            match updater.try_recv() {
                Ok(result) if Some(result.id) == self.pending => {
                    self.pending = None;
                    match result.outcome {
                        Ok(chunks) => {
                            debug!("Update {} meshed {} chunks", result.id, chunks.len());
                            self.ready.extend(chunks);
                        }
                        Err(reason) => {
                            warn!("Update {} failed: {}", result.id, reason);
                            self.failure = Some(reason);
                        }
                    }
                }
                Ok(result) => debug!("Discarding stale update {}", result.id),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.pending.take().is_some() {
                        self.failure = Some("meshing worker stopped".to_string());
                    }
                    self.updater = None;
                    break;
                }
            }
        }
    }
}

impl MappingEngine for VoxelMappingEngine {
    #[tracing::instrument(skip_all)]
    fn enable(&mut self, params: MappingParameters) -> Result<(), MappingError> {
        if self.params.is_some() {
            return Err(MappingError::AlreadyEnabled);
        }
        params.validate()?;

        self.volume = VoxelVolume::with_memory_budget(params.resolution_meters, params.max_memory_mb);
        self.ready.clear();
        self.failure = None;
        self.pending = None;
        self.keyframes.clear();
        self.params = Some(params);
        self.state = MappingState::Initializing;

        info!(
            "Spatial mapping enabled: resolution {:.3} m, range {:.1} m, {:?}",
            params.resolution_meters, params.range_meters, params.map_type
        );
        Ok(())
    }

    fn disable(&mut self) {
        if self.params.take().is_none() {
            return;
        }
        self.volume.clear();
        self.ready.clear();
        self.failure = None;
        self.pending = None;
        self.keyframes.clear();
        self.state = MappingState::NotEnabled;
        info!("Spatial mapping disabled");
    }

    fn ingest(&mut self, frame: &Frame) {
        let Some(params) = self.params else {
            return;
        };
        if frame.tracking_state != TrackingState::Ok || frame.depth.is_none() {
            return;
        }

        let points = backproject(frame, &self.calibration, params.range_meters, self.pixel_stride);
        let stats = self.volume.integrate(&points);

        if stats.dropped > 0 {
            if self.state != MappingState::NotEnoughMemory {
                warn!(
                    "Voxel budget of {} MB exhausted, dropping new geometry",
                    params.max_memory_mb
                );
            }
            self.state = MappingState::NotEnoughMemory;
        } else if stats.integrated() > 0 && self.state == MappingState::Initializing {
            self.state = MappingState::Running;
        }

        if params.save_texture {
            self.keyframes.consider(frame);
        }
    }

    fn request_update_async(&mut self) {
        let Some(params) = self.params else {
            debug!("Update requested while mapping is disabled");
            return;
        };
        self.drain_results();
        if self.pending.is_some() {
            debug!("Update already pending, request ignored");
            return;
        }

        let keys = if params.use_chunk_only {
            self.volume.take_dirty()
        } else {
            self.volume.take_dirty();
            self.volume.all_keys()
        };
        let snapshots = self.volume.snapshot(&keys);

        let id = self.next_job;
        self.next_job += 1;
        let job = UpdateJob {
            id,
            snapshots,
            map_type: params.map_type,
            resolution: params.resolution_meters,
        };

        let submitted = match self.updater() {
            Ok(updater) => updater.submit(job),
            Err(e) => {
                warn!("Cannot start meshing worker: {}", e);
                false
            }
        };
        if submitted {
            debug!("Requested update {} for {} chunks", id, keys.len());
            self.failure = None;
            self.pending = Some(id);
        } else {
            self.updater = None;
            self.failure = Some("meshing worker unavailable".to_string());
        }
    }

    fn poll_update_status(&mut self) -> UpdateStatus {
        self.drain_results();
        if self.pending.is_some() {
            UpdateStatus::Pending
        } else if !self.ready.is_empty() {
            UpdateStatus::Success
        } else if self.failure.is_some() {
            UpdateStatus::Failure
        } else {
            UpdateStatus::Idle
        }
    }

    fn retrieve_update_async(&mut self, map: &mut IncrementalMap) -> Result<usize, MappingError> {
        self.drain_results();
        if self.ready.is_empty() {
            return Err(match self.failure.take() {
                Some(reason) => MappingError::UpdateFailed(reason),
                None => MappingError::NoUpdateAvailable,
            });
        }

        if let Some(params) = self.params {
            map.set_map_type(params.map_type);
        }
        let ready = std::mem::take(&mut self.ready);
        let count = ready.len();
        for (key, chunk) in ready {
            map.upsert_chunk(key, chunk);
        }
        map.prune_empty();
        debug!("Merged {} chunks, map holds {} chunks", count, map.chunk_count());
        Ok(count)
    }

    #[tracing::instrument(skip_all)]
    fn extract_whole(&mut self, map: &mut IncrementalMap) -> Result<(), MappingError> {
        let params = self.enabled_params()?;
        let snapshots = self.volume.snapshot(&self.volume.all_keys());
        let chunks = mesh_snapshots(&snapshots, params.map_type, params.resolution_meters);

        map.set_map_type(params.map_type);
        map.replace_all(chunks.into_iter().filter(|(_, chunk)| !chunk.is_empty()));
        self.ready.clear();

        info!(
            "Extracted whole map: {} chunks, {} vertices, {} triangles",
            map.chunk_count(),
            map.vertex_count(),
            map.triangle_count()
        );
        Ok(())
    }

    fn state(&self) -> MappingState {
        self.state
    }

    fn clear(&mut self, map: &mut IncrementalMap) {
        map.clear();
        if let Some(params) = self.params {
            map.set_map_type(params.map_type);
        }
    }

    fn filter(
        &mut self,
        map: &mut IncrementalMap,
        filter: MeshFilter,
    ) -> Result<FilterReport, MappingError> {
        if map.map_type() != MapType::Mesh {
            return Err(MappingError::NotAMesh);
        }
        Ok(filter_map(map, filter))
    }

    fn apply_texture(
        &mut self,
        map: &mut IncrementalMap,
        format: TextureFormat,
    ) -> Result<TextureReport, MappingError> {
        if map.map_type() != MapType::Mesh {
            return Err(MappingError::NotAMesh);
        }
        self.keyframes.apply(map, format)
    }
}
