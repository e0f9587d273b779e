use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arena_engine::{LoopConfig, Scene};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::arena::resolve_seed;
use super::config::load_config_from_env;
use super::room::{magnet_link, resolve_room, sector_hash, RegionTag};
use super::scene::ArenaScene;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "arena_startup");

    let mut config = load_config_from_env();
    let seed = resolve_seed(&config.session);
    config.session.seed = Some(seed);

    let mut room_rng = ChaCha8Rng::seed_from_u64(seed);
    let room = resolve_room(config.session.room_link.as_deref(), &mut room_rng);

    let loop_config = LoopConfig {
        window_title: format!("Arena | SECTOR {}", room.room_id),
        max_frame_delta: Duration::from_secs_f32(config.session.max_frame_delta),
        ..LoopConfig::default()
    };

    AppWiring {
        config: loop_config,
        scene: Box::new(ArenaScene::new(config, room)),
    }
}

/// `make-link [seed] [region]`: prints a fresh shareable room link.
pub(crate) fn make_link(args: &[String]) -> ExitCode {
    init_tracing();

    let seed = args
        .first()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| format!("Sector-{}", rand::thread_rng().gen_range(0..9999)));
    let region = match args.get(1) {
        Some(raw) => RegionTag::parse(raw).unwrap_or_else(|| {
            warn!(value = raw.as_str(), "unknown region tag; detecting from time zone");
            RegionTag::detect()
        }),
        None => RegionTag::detect(),
    };

    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let hash = sector_hash(&seed, timestamp_ms);
    info!(seed = seed.as_str(), region = region.as_str(), "room_link_created");
    println!("{}", magnet_link("", &hash, region));
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
