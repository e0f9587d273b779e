use arena_engine::{DrawSurface, FrameClock, InputSnapshot, Viewport};
use tracing::info;

use super::arena::{LocalActorSpec, PeerTransport, Session};
use super::config::ArenaConfig;

/// Per-frame driver: clamps the raw timestamp into a delta, then runs one update
/// and one render of the active session. Frames before a session exists only
/// move the clock.
pub(crate) struct SimulationLoop {
    clock: FrameClock,
    session: Option<Session>,
    frames_run: u64,
}

impl SimulationLoop {
    pub(crate) fn new(max_frame_delta: f32) -> Self {
        Self {
            clock: FrameClock::new(max_frame_delta),
            session: None,
            frames_run: 0,
        }
    }

    pub(crate) fn start_session(
        &mut self,
        config: ArenaConfig,
        spec: LocalActorSpec,
        room_id: &str,
        transport: Box<dyn PeerTransport>,
    ) {
        self.end_session();
        self.session = Some(Session::start(config, spec, room_id, transport));
    }

    /// Returns how many scheduled tasks were cancelled, or `None` without a session.
    pub(crate) fn end_session(&mut self) -> Option<usize> {
        let mut session = self.session.take()?;
        let cancelled = session.end();
        info!(frames_run = self.frames_run, "simulation_stopped");
        self.frames_run = 0;
        Some(cancelled)
    }

    /// Returns whether a simulation step ran.
    pub(crate) fn advance(
        &mut self,
        raw_timestamp_seconds: f64,
        input: &InputSnapshot,
        surface: &mut dyn DrawSurface,
    ) -> bool {
        let dt = self.clock.advance(raw_timestamp_seconds);
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.local_player_id().is_none() {
            return false;
        }

        let (width, height) = surface.size();
        session.update(dt, input, Viewport { width, height });
        session.render(surface);
        self.frames_run += 1;
        true
    }

    pub(crate) fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub(crate) fn frames_run(&self) -> u64 {
        self.frames_run
    }
}
