use arena_engine::{DrawSurface, InputAction, InputSnapshot, Scene, SceneCommand};
use tracing::info;

use super::arena::{LocalActorSpec, LoopbackTransport, SessionOutcome};
use super::config::ArenaConfig;
use super::room::RoomIdentity;
use super::sim_loop::SimulationLoop;

/// Binds the simulation loop to the engine window: the session starts on load
/// and ends on unload.
pub(crate) struct ArenaScene {
    config: ArenaConfig,
    room: RoomIdentity,
    sim: SimulationLoop,
    reported_outcome: SessionOutcome,
}

impl ArenaScene {
    pub(crate) fn new(config: ArenaConfig, room: RoomIdentity) -> Self {
        let sim = SimulationLoop::new(config.session.max_frame_delta);
        Self {
            config,
            room,
            sim,
            reported_outcome: SessionOutcome::Active,
        }
    }
}

impl Scene for ArenaScene {
    fn load(&mut self) {
        let spec = LocalActorSpec::from_config(&self.config.session);
        self.sim.start_session(
            self.config.clone(),
            spec,
            &self.room.room_id,
            Box::new(LoopbackTransport::default()),
        );
        self.reported_outcome = SessionOutcome::Active;
    }

    fn frame(
        &mut self,
        raw_timestamp_seconds: f64,
        input: &InputSnapshot,
        surface: &mut dyn DrawSurface,
    ) -> SceneCommand {
        if input.quit_requested() || input.was_pressed(InputAction::Quit) {
            return SceneCommand::Quit;
        }
        self.sim.advance(raw_timestamp_seconds, input, surface);

        if let Some(session) = self.sim.session() {
            let outcome = session.outcome();
            if outcome != self.reported_outcome {
                info!(
                    room_id = session.room_id(),
                    seed = session.seed(),
                    "spectating_after_elimination"
                );
                self.reported_outcome = outcome;
            }
        }
        SceneCommand::None
    }

    fn unload(&mut self) {
        self.sim.end_session();
    }

    fn debug_title(&self) -> Option<String> {
        self.sim.session().map(|session| session.status_line())
    }

    fn actor_count(&self) -> usize {
        self.sim
            .session()
            .map(|session| session.registry().len())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use arena_engine::{BlendMode, Rgba, ScreenRect, TextAlign, Vec2};

    use super::*;

    struct NullSurface;

    impl DrawSurface for NullSurface {
        fn size(&self) -> (u32, u32) {
            (320, 240)
        }
        fn clear(&mut self, _color: Rgba) {}
        fn fill_rect(&mut self, _rect: ScreenRect, _color: Rgba) {}
        fn stroke_rect(&mut self, _rect: ScreenRect, _color: Rgba, _line_width: f32) {}
        fn fill_ellipse(&mut self, _center: Vec2, _radii: Vec2, _color: Rgba) {}
        fn stroke_ellipse(&mut self, _center: Vec2, _radii: Vec2, _color: Rgba, _width: f32) {}
        fn stroke_polyline(&mut self, _points: &[Vec2], _color: Rgba, _line_width: f32) {}
        fn fill_polygon(&mut self, _points: &[Vec2], _color: Rgba) {}
        fn text(&mut self, _anchor: Vec2, _text: &str, _align: TextAlign, _color: Rgba) {}
        fn set_alpha(&mut self, _alpha: f32) {}
        fn set_blend_mode(&mut self, _mode: BlendMode) {}
    }

    fn scene() -> ArenaScene {
        let mut config = ArenaConfig::default();
        config.session.seed = Some(21);
        config.peers.initial_bots = 3;
        ArenaScene::new(
            config,
            RoomIdentity {
                room_id: "SECTOR42XYZ".to_string(),
                region: None,
                linked: true,
            },
        )
    }

    #[test]
    fn load_starts_session_and_title_reports_room() {
        let mut scene = scene();
        assert_eq!(scene.debug_title(), None);
        scene.load();

        let title = scene.debug_title().expect("title after load");
        assert!(title.starts_with("SECTOR SECTOR42"));
        assert!(title.contains("ALIVE 4"));
        assert!(scene.actor_count() > 4);
    }

    #[test]
    fn quit_request_returns_quit_command() {
        let mut scene = scene();
        scene.load();
        let quit = InputSnapshot::empty().with_action_pressed(InputAction::Quit);
        assert_eq!(scene.frame(0.016, &quit, &mut NullSurface), SceneCommand::Quit);
    }

    #[test]
    fn unload_ends_session() {
        let mut scene = scene();
        scene.load();
        assert_eq!(scene.frame(0.016, &InputSnapshot::empty(), &mut NullSurface), SceneCommand::None);
        scene.unload();
        assert_eq!(scene.debug_title(), None);
        assert_eq!(scene.actor_count(), 0);
    }
}
