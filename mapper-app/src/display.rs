//! Display sinks for the command-line mapper.
//!
//! There is no window: the terminal sink reports status through the log
//! and takes commands from stdin, the scripted sink replays toggles at
//! fixed frames for unattended runs.

use mapper_data::{CameraParameters, Frame, IncrementalMap, MapType, MappingState, TrackingState};
use mapper_session::{DisplaySink, Phase, RenderState};
use std::cell::Cell;
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tracing::{debug, info, warn};

/// Commands typed on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleMapping,
    Quit,
}

/// Map one line of input to a command. An empty line toggles.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "m" | "map" | "space" => Some(Command::ToggleMapping),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Status {
    tracking: TrackingState,
    mapping: MappingState,
    phase: Phase,
}

/// Interactive sink driven by stdin.
///
/// Commands are drained both when a frame is shown and when availability is
/// polled, so `q` still quits after the source has run dry.
pub struct TerminalDisplay {
    commands: Receiver<Command>,
    pending_toggle: Cell<bool>,
    available: Cell<bool>,
    last_status: Option<Status>,
    frames: u64,
    chunks: usize,
    triangles: usize,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("stdin-commands".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    match parse_command(&line) {
                        Some(command) => {
                            if tx.send(command).is_err() {
                                break;
                            }
                        }
                        None => eprintln!(
                            "Unknown command {:?} (Enter/m: toggle mapping, q: quit)",
                            line.trim()
                        ),
                    }
                }
            });
        if let Err(e) = spawned {
            warn!("Keyboard input unavailable: {}", e);
        }
        Self::with_commands(rx)
    }

    fn with_commands(commands: Receiver<Command>) -> Self {
        Self {
            commands,
            pending_toggle: Cell::new(false),
            available: Cell::new(true),
            last_status: None,
            frames: 0,
            chunks: 0,
            triangles: 0,
        }
    }

    fn drain(&self) {
        while self.available.get() {
            match self.commands.try_recv() {
                Ok(Command::ToggleMapping) => self.pending_toggle.set(!self.pending_toggle.get()),
                Ok(Command::Quit) => self.available.set(false),
                // Stdin closed: keep running, ctrl-c still ends the process.
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for TerminalDisplay {
    fn init(&mut self, calibration: &CameraParameters, map_type: MapType) {
        info!(
            "Camera {}x{} (fx {:.1}), building a {:?}",
            calibration.width, calibration.height, calibration.fx, map_type
        );
        info!("Press Enter to start/stop spatial mapping, q + Enter to quit");
    }

    fn render(&mut self, frame: &Frame, state: &RenderState) -> bool {
        self.frames += 1;
        let status = Status {
            tracking: state.tracking_state,
            mapping: state.mapping_state,
            phase: state.phase,
        };
        if self.last_status != Some(status) {
            info!(
                "{} | tracking {} | mapping {}",
                status.phase, status.tracking, status.mapping
            );
            self.last_status = Some(status);
        }
        let t = state.pose.translation;
        debug!(
            "Frame {} ({} shown) at ({:.2}, {:.2}, {:.2})",
            frame.frame_number, self.frames, t.x, t.y, t.z
        );
        self.drain();
        self.pending_toggle.replace(false) && self.available.get()
    }

    // Updates are consumed synchronously in notify_chunks_updated.
    fn chunks_ready(&self) -> bool {
        true
    }

    fn notify_chunks_updated(&mut self, map: &IncrementalMap) {
        let updated = map.updated_chunks().count();
        self.chunks = map.chunk_count();
        self.triangles = map.triangle_count();
        info!(
            "Map: {} chunks ({} updated), {} triangles",
            self.chunks, updated, self.triangles
        );
    }

    fn clear_cached_mesh(&mut self) {
        self.chunks = 0;
        self.triangles = 0;
    }

    fn is_available(&self) -> bool {
        self.drain();
        self.available.get()
    }
}

/// Sink toggling mapping on fixed frames, for unattended runs.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDisplay {
    toggle_at: Vec<u64>,
    max_frames: Option<u64>,
    frames: u64,
    updates: usize,
}

impl ScriptedDisplay {
    pub fn new(toggle_at: Vec<u64>, max_frames: Option<u64>) -> Self {
        Self {
            toggle_at,
            max_frames,
            frames: 0,
            updates: 0,
        }
    }
}

impl DisplaySink for ScriptedDisplay {
    fn render(&mut self, _frame: &Frame, state: &RenderState) -> bool {
        let toggle = self.toggle_at.contains(&self.frames);
        if toggle {
            info!("Scripted toggle at frame {} ({})", self.frames, state.phase);
        }
        self.frames += 1;
        toggle
    }

    // Updates are consumed synchronously in notify_chunks_updated.
    fn chunks_ready(&self) -> bool {
        true
    }

    fn notify_chunks_updated(&mut self, map: &IncrementalMap) {
        self.updates += 1;
        debug!("Map update {}: {} chunks", self.updates, map.chunk_count());
    }

    fn clear_cached_mesh(&mut self) {}

    fn is_available(&self) -> bool {
        self.max_frames.is_none_or(|max| self.frames < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapper_data::Transform;

    fn frame() -> Frame {
        Frame::new(
            image::RgbImage::new(1, 1),
            Transform::IDENTITY,
            TrackingState::Ok,
            0.0,
            0,
        )
    }

    fn state() -> RenderState {
        RenderState {
            pose: Transform::IDENTITY,
            tracking_state: TrackingState::Ok,
            mapping_state: MappingState::NotEnabled,
            phase: Phase::Capturing,
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(""), Some(Command::ToggleMapping));
        assert_eq!(parse_command(" M \n"), Some(Command::ToggleMapping));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("hello"), None);
    }

    #[test]
    fn test_terminal_toggles_and_quits() {
        let (tx, rx) = mpsc::channel();
        let mut display = TerminalDisplay::with_commands(rx);
        assert!(!display.render(&frame(), &state()));

        tx.send(Command::ToggleMapping).unwrap();
        assert!(display.render(&frame(), &state()));

        // Two toggles in one frame cancel out.
        tx.send(Command::ToggleMapping).unwrap();
        tx.send(Command::ToggleMapping).unwrap();
        assert!(!display.render(&frame(), &state()));

        tx.send(Command::Quit).unwrap();
        display.render(&frame(), &state());
        assert!(!display.is_available());
    }

    #[test]
    fn test_terminal_quits_without_frames() {
        let (tx, rx) = mpsc::channel();
        let display = TerminalDisplay::with_commands(rx);
        assert!(display.is_available());
        tx.send(Command::ToggleMapping).unwrap();
        tx.send(Command::Quit).unwrap();
        assert!(!display.is_available());
    }

    #[test]
    fn test_terminal_keeps_toggle_polled_between_frames() {
        let (tx, rx) = mpsc::channel();
        let mut display = TerminalDisplay::with_commands(rx);
        tx.send(Command::ToggleMapping).unwrap();
        assert!(display.is_available());
        assert!(display.render(&frame(), &state()));
        assert!(!display.render(&frame(), &state()));
    }

    #[test]
    fn test_terminal_survives_closed_stdin() {
        let (tx, rx) = mpsc::channel::<Command>();
        drop(tx);
        let mut display = TerminalDisplay::with_commands(rx);
        assert!(!display.render(&frame(), &state()));
        assert!(display.is_available());
    }

    #[test]
    fn test_scripted_toggles_and_stops() {
        let mut display = ScriptedDisplay::new(vec![1, 3], Some(4));
        let toggles: Vec<bool> = (0..4).map(|_| display.render(&frame(), &state())).collect();
        assert_eq!(toggles, vec![false, true, false, true]);
        assert!(!display.is_available());
        assert_eq!(display.frames, 4);
    }
}
