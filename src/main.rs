//! Landmark Guard entry point
//!
//! Headless driver: plays one idle-mode round against an in-process scene,
//! feeding scripted viewport changes through the layout engine, then records
//! the result on the local leaderboard.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use landmark_guard::consts::{DEFAULT_MAP_HEIGHT, DEFAULT_MAP_WIDTH, SIM_DT};
use landmark_guard::highscores::{HighScoreEntry, HighScores};
use landmark_guard::layout::{RelayoutOutcome, RelayoutTrigger};
use landmark_guard::platform::{DeviceContext, FixedViewport};
use landmark_guard::scene::HeadlessScene;
use landmark_guard::sim::GameEvent;
use landmark_guard::{GameSession, Settings, Tuning};

const TUNING_PATH: &str = "tuning.json";
const SETTINGS_PATH: &str = "settings.json";
const HIGHSCORES_PATH: &str = "highscores.json";

/// Upper bound on simulated frames (round length plus slack)
const MAX_FRAMES: usize = 90 * 60;

/// A viewport change the driver applies at a given round time (seconds)
struct ViewportScript {
    at: f64,
    trigger: RelayoutTrigger,
    apply: fn(&mut FixedViewport),
}

const SCRIPT: [ViewportScript; 4] = [
    ViewportScript {
        at: 10.0,
        trigger: RelayoutTrigger::Resize,
        apply: |v| v.resize(1024.0, 700.0),
    },
    ViewportScript {
        at: 20.0,
        trigger: RelayoutTrigger::OrientationChange,
        apply: |v| v.context = DeviceContext::touch(390.0, 844.0),
    },
    ViewportScript {
        at: 30.0,
        trigger: RelayoutTrigger::OrientationChange,
        apply: |v| v.rotate(),
    },
    ViewportScript {
        at: 40.0,
        trigger: RelayoutTrigger::FullscreenToggle,
        apply: |v| v.set_fullscreen(true),
    },
];

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Landmark Guard (headless) starting...");

    let tuning = Tuning::load_or_default(Path::new(TUNING_PATH));
    let settings = Settings::load(Path::new(SETTINGS_PATH));
    let mut highscores = HighScores::load_or_new(Path::new(HIGHSCORES_PATH));

    let seed = now_ms() as u64;
    log::info!(
        "Team '{}' on {} (seed {})",
        settings.team_name,
        settings.difficulty.as_str(),
        seed
    );

    let mut session = GameSession::new(&tuning, &settings, seed, HeadlessScene::new());
    if let Err(e) = session.initialize_map(DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT) {
        log::error!("Map initialization failed: {}", e);
        return;
    }

    let mut viewport = FixedViewport::new(DeviceContext::desktop(1280.0, 800.0));
    let mut clock = 0.0;
    if let RelayoutOutcome::Failed { error, .. } = session.start(clock, &viewport) {
        log::error!("Initial layout failed: {}", error);
        return;
    }

    session.set_idle_mode(true);
    session.start_round();

    let frame_ms = SIM_DT * 1000.0;
    let mut next_script = 0;
    let mut saves = 0;
    let mut losses = 0;
    let mut relayouts = 0;

    for _ in 0..MAX_FRAMES {
        clock += frame_ms;

        let round_time = tuning.game.round_secs - session.state().time_left;
        if let Some(step) = SCRIPT.get(next_script) {
            if round_time >= step.at {
                (step.apply)(&mut viewport);
                session.on_viewport_event(step.trigger, clock);
                next_script += 1;
            }
        }

        let report = session.frame(clock, &viewport);
        match report.relayout {
            Some(RelayoutOutcome::Applied(r)) => {
                relayouts += 1;
                log::info!(
                    "{:?}: {}x{} scale {:.3} -> {:.3}",
                    r.trigger,
                    r.device.viewport_width,
                    r.device.viewport_height,
                    r.previous_scale,
                    r.scale
                );
            }
            Some(RelayoutOutcome::Failed { trigger, error }) => {
                log::warn!("{:?} relayout failed: {}", trigger, error);
            }
            None => {}
        }

        for event in &report.events {
            match event {
                GameEvent::LandmarkSaved { .. } => saves += 1,
                GameEvent::LandmarkDestroyed { .. } => losses += 1,
                _ => {}
            }
        }

        if session.is_round_over() {
            break;
        }
    }

    let Some(result) = session.round_result() else {
        log::warn!("Round did not finish");
        return;
    };

    println!("{}", result.tier.message());
    println!(
        "Final score {} with {} landmarks saved ({} saves, {} losses, {} relayouts)",
        result.final_score, result.landmarks_saved, saves, losses, relayouts
    );

    let entry = HighScoreEntry {
        team: settings.team_name.clone(),
        score: result.final_score,
        landmarks_saved: result.landmarks_saved as u32,
        difficulty: settings.difficulty,
        timestamp: now_ms(),
    };
    match highscores.record(entry) {
        Some(rank) => println!("New high score! Rank #{}", rank),
        None => println!("Top score to beat: {:?}", highscores.top_score()),
    }
    if let Some(avg) = highscores.stats.average_score() {
        println!(
            "{} games played, average score {:.1}",
            highscores.stats.games_played, avg
        );
    }

    if let Err(e) = highscores.save(Path::new(HIGHSCORES_PATH)) {
        log::error!("Failed to save high scores: {}", e);
    }
}
