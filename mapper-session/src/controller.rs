//! The per-frame control loop.

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::display::{DisplaySink, RenderState};
use crate::error::StartupError;
use crate::gate::PeriodicGate;
use crate::persistence::Persistence;
use crate::session::{Phase, Session, SessionStats};
use mapper_capture::FrameSource;
use mapper_data::{Frame, IncrementalMap, MapType, MappingState, Transform};
use mapper_mapping::{MappingEngine, UpdateStatus};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Idle pacing when the source does not report a frame rate.
const IDLE_FPS: f32 = 30.0;

/// What a call to [`SessionController::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was processed and shown.
    Rendered { toggled: bool },
    /// No frame this tick.
    Skipped,
    /// The session is over.
    Stopped,
}

/// Drives one mapping run: pulls frames, feeds the engine, paces update
/// requests and retrievals, and finalizes the map when the user toggles
/// mapping off.
///
/// Only the display ends the loop. Running out of frames just skips ticks.
///
/// The controller owns the [`Session`] and the [`IncrementalMap`]. The map
/// is only ever changed through [`MappingEngine`] calls.
pub struct SessionController<S, E, D, P, C>
where
    S: FrameSource,
    E: MappingEngine,
    D: DisplaySink,
    P: Persistence,
    C: Clock,
{
    source: S,
    engine: E,
    display: D,
    persistence: P,
    clock: C,
    config: SessionConfig,
    session: Session,
    map: IncrementalMap,
    gate: PeriodicGate,
    shut_down: bool,
}

impl<S, E, D, P, C> SessionController<S, E, D, P, C>
where
    S: FrameSource,
    E: MappingEngine,
    D: DisplaySink,
    P: Persistence,
    C: Clock,
{
    /// Enable tracking on `source` and enter `Capturing`.
    #[tracing::instrument(skip_all)]
    pub fn start(
        mut source: S,
        engine: E,
        mut display: D,
        persistence: P,
        clock: C,
        config: SessionConfig,
    ) -> Result<Self, StartupError> {
        config.validate()?;
        source
            .enable_pose_tracking()
            .map_err(StartupError::EnableTracking)?;

        let mut session = Session::new(&config);
        display.init(&source.calibration(), session.map_type);
        session.phase = Phase::Capturing;

        info!(
            "Session started: request every {:.2}s, retrieve every {:.2}s, output {}",
            session.request_interval_seconds,
            session.update_period_seconds,
            config.output_path.display()
        );

        Ok(Self {
            gate: PeriodicGate::new(session.update_period_seconds),
            map: IncrementalMap::new(session.map_type),
            source,
            engine,
            display,
            persistence,
            clock,
            config,
            session,
            shut_down: false,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats
    }

    pub fn map(&self) -> &IncrementalMap {
        &self.map
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Run one iteration of the loop.
    pub fn tick(&mut self) -> TickOutcome {
        if self.session.phase == Phase::Stopped {
            return TickOutcome::Stopped;
        }
        self.session.stats.ticks += 1;
        let now = self.clock.now();

        let outcome = match self.source.pull() {
            Ok(Some(frame)) => {
                let toggled = self.process(&frame, now);
                TickOutcome::Rendered { toggled }
            }
            Ok(None) => {
                debug!("No frame available");
                self.session.stats.skipped_ticks += 1;
                TickOutcome::Skipped
            }
            Err(e) => {
                warn!("Frame grab failed: {}", e);
                self.session.stats.skipped_ticks += 1;
                TickOutcome::Skipped
            }
        };

        if !self.display.is_available() {
            info!("Display closed");
            self.shutdown();
            return TickOutcome::Stopped;
        }
        outcome
    }

    fn process(&mut self, frame: &Frame, now: f64) -> bool {
        self.session.tracking_state = frame.tracking_state;

        if self.session.phase == Phase::Mapping {
            self.engine.ingest(frame);
            self.session.mapping_state = self.engine.state();
            self.maybe_request(now);
            self.maybe_retrieve(now);
        }

        let state = RenderState {
            pose: frame.pose,
            tracking_state: self.session.tracking_state,
            mapping_state: self.session.mapping_state,
            phase: self.session.phase,
        };
        let toggled = self.display.render(frame, &state);
        if toggled {
            self.toggle();
        }
        toggled
    }

    fn maybe_request(&mut self, now: f64) {
        let elapsed = now - self.session.last_request_time;
        if elapsed > self.session.request_interval_seconds
            && self.display.chunks_ready()
            && self.engine.poll_update_status() != UpdateStatus::Pending
        {
            self.engine.request_update_async();
            self.session.last_request_time = now;
            self.session.stats.requests += 1;
            debug!("Requested map update at {:.3}s", now);
        }
    }

    fn maybe_retrieve(&mut self, now: f64) {
        match self.engine.poll_update_status() {
            UpdateStatus::Success if self.gate.fire(now) => {
                match self.engine.retrieve_update_async(&mut self.map) {
                    Ok(count) => {
                        self.display.notify_chunks_updated(&self.map);
                        self.map.reset_updated();
                        self.session.stats.retrievals += 1;
                        debug!("Retrieved {} updated chunks", count);
                    }
                    Err(e) => warn!("Map retrieval failed: {}", e),
                }
            }
            UpdateStatus::Failure => debug!("Last map update failed, retrying on next request"),
            _ => {}
        }
    }

    /// Start mapping if inactive, otherwise finalize.
    pub fn toggle(&mut self) {
        match self.session.phase {
            Phase::Mapping => self.finalize(),
            Phase::Capturing => self.activate(),
            phase => debug!("Toggle ignored in phase {}", phase),
        }
    }

    fn activate(&mut self) {
        self.source.reset_pose(Transform::IDENTITY);

        let params = self.session.mapping_parameters(&self.config.mapping);
        if let Err(e) = self.engine.enable(params) {
            error!("Failed to enable spatial mapping: {}", e);
            return;
        }
        self.engine.clear(&mut self.map);
        self.display.clear_cached_mesh();
        self.gate.reset();

        self.session.last_request_time = self.clock.now().max(self.session.last_request_time);
        self.session.mapping_state = self.engine.state();
        self.session.mapping_active = true;
        self.session.phase = Phase::Mapping;
        info!("Spatial mapping started");
    }

    /// Extract, post-process and export the map, then stop mapping.
    ///
    /// Does nothing unless mapping is active.
    pub fn finalize(&mut self) {
        if !self.session.mapping_active {
            return;
        }
        self.session.phase = Phase::Finalizing;
        info!("Finalizing map");

        if let Err(e) = self.engine.extract_whole(&mut self.map) {
            warn!("Whole map extraction failed: {}", e);
        }

        if self.session.map_type == MapType::Mesh {
            match self.engine.filter(&mut self.map, self.config.mesh_filter) {
                Ok(report) => debug!(
                    "Mesh filter removed {} triangles, {} vertices",
                    report.removed_triangles, report.removed_vertices
                ),
                Err(e) => warn!("Mesh filtering failed: {}", e),
            }
            self.display.clear_cached_mesh();

            if self.session.save_texture {
                match self
                    .engine
                    .apply_texture(&mut self.map, self.config.texture_format)
                {
                    Ok(report) => debug!(
                        "Textured {} vertices from {} keyframes",
                        report.textured_vertices, report.keyframes
                    ),
                    Err(e) => warn!("Texturing failed: {}", e),
                }
            }
        }

        let path = self.config.output_path.clone();
        match self.persistence.export(&self.map, &path) {
            Ok(()) => info!("Map saved to {}", path.display()),
            Err(e) => {
                error!("Failed to save map to {}: {}", path.display(), e);
                self.session.stats.export_failures += 1;
            }
        }

        self.engine.disable();
        self.session.mapping_state = MappingState::NotEnabled;
        self.session.mapping_active = false;
        self.session.phase = Phase::Capturing;
        self.session.stats.finalizes += 1;
    }

    /// Tick until the session stops, then release everything.
    ///
    /// A source that has run dry keeps the loop alive until the display
    /// closes; those idle ticks are paced at the source's frame rate.
    pub fn run(&mut self) -> SessionStats {
        let mut exhausted_logged = false;
        loop {
            match self.tick() {
                TickOutcome::Stopped => break,
                TickOutcome::Skipped if !self.source.is_active() => {
                    if !exhausted_logged {
                        info!("Frame source exhausted, waiting for the display to close");
                        exhausted_logged = true;
                    }
                    let fps = self.source.frame_rate().filter(|f| *f > 0.0).unwrap_or(IDLE_FPS);
                    std::thread::sleep(Duration::from_secs_f32(1.0 / fps));
                }
                _ => {}
            }
        }
        self.shutdown();
        self.session.stats
    }

    /// Disable mapping and tracking, clear the map and close the source.
    ///
    /// Mapping still active at this point is discarded, not exported.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if self.session.mapping_active {
            self.engine.disable();
            self.session.mapping_active = false;
            self.session.mapping_state = MappingState::NotEnabled;
        }
        self.source.disable_pose_tracking();
        self.map.clear();
        self.source.close();
        self.session.phase = Phase::Stopped;

        let stats = self.session.stats;
        info!(
            "Session stopped after {} ticks ({} skipped): {} requests, {} retrievals, {} maps finalized",
            stats.ticks, stats.skipped_ticks, stats.requests, stats.retrievals, stats.finalizes
        );
    }
}
