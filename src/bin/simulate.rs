use chrono::{SecondsFormat, Utc};
use clap::Parser;
use maze_chase_sim::collision::blocked_at;
use maze_chase_sim::config::{Preset, SimConfig};
use maze_chase_sim::engine::GameEngine;
use maze_chase_sim::error::SimResult;
use maze_chase_sim::pathfinding::shortest_path;
use maze_chase_sim::types::{Intent, Outcome, RuntimeEvent, ZombieState};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FPS: u32 = 60;
const DEFAULT_MAX_SECS: f32 = 90.0;
const WAYPOINT_DEADBAND: f32 = 0.05;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    level: Option<u32>,
    #[arg(long)]
    preset: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    autopilot: Option<bool>,
    #[arg(long)]
    max_secs: Option<f32>,
    #[arg(long)]
    fps: Option<u32>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    level: u32,
    preset: Preset,
    #[serde(rename = "configFile", skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    autopilot: bool,
    #[serde(rename = "maxSecs")]
    max_secs: f32,
    fps: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    level: u32,
    preset: Option<Preset>,
    #[serde(rename = "configFile")]
    config_file: Option<String>,
    autopilot: bool,
    outcome: Outcome,
    #[serde(rename = "elapsedSecs")]
    elapsed_secs: f32,
    ticks: u64,
    #[serde(rename = "mainPathLength")]
    main_path_length: usize,
    #[serde(rename = "capturedBy")]
    captured_by: Option<u32>,
    zombies: usize,
    #[serde(rename = "stateChanges")]
    state_changes: usize,
    #[serde(rename = "chaseStarts")]
    chase_starts: usize,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageElapsedSecs")]
    average_elapsed_secs: f32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let base_config = match cli.config.as_deref().map(SimConfig::load).transpose() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load config");
            std::process::exit(2);
        }
    };

    let scenarios = match resolve_scenarios(&cli) {
        Ok(scenarios) => scenarios,
        Err(err) => {
            error!(error = %err, "invalid arguments");
            std::process::exit(2);
        }
    };
    let started_at = Utc::now();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = default_run_id(seed_hint, started_at.timestamp_millis());
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_elapsed = 0.0f32;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        info!(
            run = %run_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            level = scenario.level,
            preset = ?scenario.preset,
            config_file = ?scenario.config_file,
            "scenario started"
        );
        let config = base_config
            .clone()
            .unwrap_or_else(|| SimConfig::preset(scenario.preset));
        let scenario_run = match run_scenario(&scenario, config) {
            Ok(run) => run,
            Err(err) => {
                error!(scenario = %scenario.name, error = %err, "scenario could not start");
                has_anomaly = true;
                continue;
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            warn!(
                scenario = %scenario.name,
                seed = scenario.seed,
                tick = anomaly.tick,
                message = %anomaly.message,
                "anomaly detected"
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_elapsed += scenario_run.result.elapsed_secs;
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome))
            .or_insert(0) += 1;

        info!(
            scenario = %scenario.name,
            outcome = ?scenario_run.result.outcome,
            elapsed = scenario_run.result.elapsed_secs,
            ticks = scenario_run.result.ticks,
            anomalies = scenario_run.anomaly_records.len(),
            "scenario finished"
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(err) => error!(scenario = %scenario.name, error = %err, "result line did not serialize"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        run_id,
        format_timestamp(started_at),
        format_timestamp(Utc::now()),
        scenario_results,
        outcome_counts,
        total_anomalies,
        total_elapsed,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &summary) {
            error!(path = %path.display(), error = %err, "summary write failed");
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    info!(
        run = %summary.run_id,
        scenarios = summary.scenario_count,
        anomalies = summary.anomaly_count,
        average_elapsed = summary.average_elapsed_secs,
        summary_out = ?summary_out_written,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_scenario(scenario: &Scenario, config: SimConfig) -> SimResult<ScenarioRunResult> {
    let mut engine = GameEngine::new(config, scenario.level, scenario.seed)?;
    let fps = scenario.fps.max(1);
    let dt = 1.0 / fps as f32;
    let step_secs = dt.min(engine.config().max_delta_secs);
    let tick_limit = (scenario.max_secs.max(0.0) / step_secs).ceil() as u64;

    let mut state_changes = 0;
    let mut chase_starts = 0;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();

    while !engine.is_ended() && engine.elapsed_secs() < scenario.max_secs {
        let intent = if scenario.autopilot {
            autopilot_intent(&engine)
        } else {
            Intent::none()
        };
        engine.step(dt, intent);
        let snapshot = engine.build_snapshot(true);

        for message in collect_anomalies(&engine) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        if snapshot.tick > tick_limit.saturating_mul(2).max(1) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }

        for event in &snapshot.events {
            if let RuntimeEvent::ZombieStateChanged { to, .. } = event {
                state_changes += 1;
                if *to == ZombieState::Chase {
                    chase_starts += 1;
                }
            }
        }
    }

    let summary = engine.build_summary();
    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            level: summary.level,
            preset: scenario.config_file.is_none().then_some(scenario.preset),
            config_file: scenario.config_file.clone(),
            autopilot: scenario.autopilot,
            outcome: summary.outcome,
            elapsed_secs: (summary.elapsed_secs * 1000.0).round() / 1000.0,
            ticks: summary.ticks,
            main_path_length: summary.main_path_length,
            captured_by: summary.captured_by,
            zombies: engine.zombies().len(),
            state_changes,
            chase_starts,
            anomalies,
        },
        anomaly_records,
    })
}

// Walks toward the next cell of the main path, or back onto it via BFS when pushed off.
fn autopilot_intent(engine: &GameEngine) -> Intent {
    let world = engine.world();
    let pos = engine.player();
    let here = pos.cell();
    let exit = world.exit.cell();
    let next = match world.main_path.iter().position(|cell| *cell == here) {
        Some(idx) => world.main_path.get(idx + 1).copied().unwrap_or(exit),
        None => shortest_path(&world.maze, here, exit)
            .get(1)
            .copied()
            .unwrap_or(exit),
    };
    let goal = next.center();
    Intent {
        up: goal.z < pos.z - WAYPOINT_DEADBAND,
        down: goal.z > pos.z + WAYPOINT_DEADBAND,
        left: goal.x < pos.x - WAYPOINT_DEADBAND,
        right: goal.x > pos.x + WAYPOINT_DEADBAND,
    }
}

fn collect_anomalies(engine: &GameEngine) -> Vec<String> {
    let mut anomalies = Vec::new();
    let world = engine.world();
    let policy = engine.config().collision.policy();

    let player = engine.player();
    if !(player.x.is_finite() && player.z.is_finite()) {
        anomalies.push(format!("player position not finite: {player:?}"));
    } else if blocked_at(player, &world.maze, &policy) {
        anomalies.push(format!("player inside blocked region: {:?}", player.cell()));
    }

    for zombie in engine.zombies() {
        if world.main_path_set.contains(zombie.cell()) {
            anomalies.push(format!("zombie {} on main path", zombie.id));
        }
        if !world.maze.in_bounds(zombie.cell().x, zombie.cell().z) {
            anomalies.push(format!("zombie {} outside the maze", zombie.id));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Result<Vec<Scenario>, String> {
    let seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let preset = match cli.preset.as_deref() {
        Some(value) => Preset::parse(value)
            .ok_or_else(|| format!("unknown preset {value:?}, expected classic or rounded"))?,
        None => Preset::Rounded,
    };
    let config_file = cli
        .config
        .as_ref()
        .map(|path| path.to_string_lossy().to_string());
    let fps = cli.fps.unwrap_or(DEFAULT_FPS).clamp(1, 240);
    let max_secs = cli.max_secs.unwrap_or(DEFAULT_MAX_SECS).clamp(1.0, 3_600.0);

    if cli.single
        || cli.level.is_some()
        || cli.preset.is_some()
        || cli.autopilot.is_some()
        || config_file.is_some()
    {
        let level = cli.level.unwrap_or(1).max(1);
        let label = if config_file.is_some() {
            "config"
        } else {
            preset_key(preset)
        };
        return Ok(vec![Scenario {
            name: format!("custom-{label}-level{level}"),
            seed,
            level,
            preset,
            config_file,
            autopilot: cli.autopilot.unwrap_or(true),
            max_secs,
            fps,
        }]);
    }

    Ok(vec![
        Scenario {
            name: "classic-level1-autopilot".to_string(),
            seed,
            level: 1,
            preset: Preset::Classic,
            config_file: None,
            autopilot: true,
            max_secs,
            fps,
        },
        Scenario {
            name: "rounded-level1-autopilot".to_string(),
            seed: seed.wrapping_add(1),
            level: 1,
            preset: Preset::Rounded,
            config_file: None,
            autopilot: true,
            max_secs,
            fps,
        },
        Scenario {
            name: "rounded-level3-idle".to_string(),
            seed: seed.wrapping_add(2),
            level: 3,
            preset: Preset::Rounded,
            config_file: None,
            autopilot: false,
            max_secs,
            fps,
        },
    ])
}

fn preset_key(preset: Preset) -> &'static str {
    match preset {
        Preset::Classic => "classic",
        Preset::Rounded => "rounded",
    }
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn format_timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn build_run_summary(
    run_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_elapsed_secs: f32,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_elapsed_secs = if scenario_count == 0 {
        0.0
    } else {
        total_elapsed_secs / scenario_count as f32
    };
    RunSummary {
        run_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_elapsed_secs,
        outcome_counts,
        scenarios,
    }
}

fn outcome_key(outcome: Outcome) -> String {
    match outcome {
        Outcome::Playing => "timeout",
        Outcome::Captured => "captured",
        Outcome::Exited => "exited",
    }
    .to_string()
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_scenario_result(outcome: Outcome, elapsed_secs: f32) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            level: 1,
            preset: Some(Preset::Rounded),
            config_file: None,
            autopilot: true,
            outcome,
            elapsed_secs,
            ticks: 0,
            main_path_length: 10,
            captured_by: None,
            zombies: 2,
            state_changes: 0,
            chase_starts: 0,
            anomalies: Vec::new(),
        }
    }

    fn scenario(autopilot: bool, preset: Preset, level: u32, seed: u32) -> Scenario {
        Scenario {
            name: "test".to_string(),
            seed,
            level,
            preset,
            config_file: None,
            autopilot,
            max_secs: 30.0,
            fps: 60,
        }
    }

    #[test]
    fn default_run_id_contains_seed_and_timestamp() {
        assert_eq!(default_run_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_elapsed() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            "a".to_string(),
            "b".to_string(),
            vec![
                make_scenario_result(Outcome::Exited, 20.0),
                make_scenario_result(Outcome::Captured, 40.0),
            ],
            BTreeMap::from([("exited".to_string(), 1usize), ("captured".to_string(), 1usize)]),
            1,
            60.0,
        );
        assert_eq!(summary.average_elapsed_secs, 30.0);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("maze-chase-missing-{}", Utc::now().timestamp_millis()))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            "a".to_string(),
            "b".to_string(),
            vec![make_scenario_result(Outcome::Playing, 90.0)],
            BTreeMap::from([("timeout".to_string(), 1usize)]),
            0,
            90.0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same anomaly".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same anomaly".to_string());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tick, 10);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn idle_scenario_runs_without_anomalies() {
        let scenario = scenario(false, Preset::Rounded, 1, 99);
        let run = run_scenario(&scenario, SimConfig::preset(Preset::Rounded)).expect("valid scenario");
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
        assert!(run.result.ticks > 0);
    }

    #[test]
    fn autopilot_reaches_the_exit_without_zombies_in_the_way() {
        let mut config = SimConfig::preset(Preset::Classic);
        // Frozen zombies still spawn but never leave their cells.
        config.zombies.chase_speed = 0.0;
        config.zombies.confused_speed = 0.0;
        config.zombies.roam_speed = 0.0;
        let mut scenario = scenario(true, Preset::Classic, 1, 7);
        scenario.max_secs = 120.0;
        let run = run_scenario(&scenario, config).expect("valid scenario");
        assert_eq!(run.result.outcome, Outcome::Exited);
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
    }

    #[test]
    fn flags_select_a_single_custom_scenario() {
        let cli = Cli::parse_from(["simulate", "--seed", "5", "--level", "2", "--preset", "classic"]);
        let scenarios = resolve_scenarios(&cli).expect("known preset");
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].level, 2);
        assert_eq!(scenarios[0].preset, Preset::Classic);
        assert_eq!(scenarios[0].seed, 5);
        assert_eq!(scenarios[0].name, "custom-classic-level2");

        let defaults = resolve_scenarios(&Cli::parse_from(["simulate", "--seed", "5"])).expect("no flags");
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults[1].seed, 6);
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let cli = Cli::parse_from(["simulate", "--seed", "5", "--preset", "square"]);
        let err = resolve_scenarios(&cli).unwrap_err();
        assert!(err.contains("square"), "{err}");
    }

    #[test]
    fn config_file_runs_are_labelled_by_file_instead_of_preset() {
        let cli = Cli::parse_from(["simulate", "--seed", "3", "--config", "tuning.json"]);
        let scenarios = resolve_scenarios(&cli).expect("config flag alone is valid");
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name, "custom-config-level1");
        assert_eq!(scenarios[0].config_file.as_deref(), Some("tuning.json"));

        let mut scenario = scenarios[0].clone();
        scenario.autopilot = false;
        scenario.max_secs = 1.0;
        let run = run_scenario(&scenario, SimConfig::default()).expect("valid scenario");
        assert_eq!(run.result.preset, None);
        assert_eq!(run.result.config_file.as_deref(), Some("tuning.json"));
        let line = serde_json::to_value(&run.result).expect("serializes");
        assert_eq!(line["preset"], serde_json::Value::Null);
        assert_eq!(line["configFile"], "tuning.json");
    }
}
