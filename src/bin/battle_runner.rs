//! Headless Battle Runner
//!
//! Runs AI vs AI skirmishes and prints a JSON (or text) summary.

use clap::Parser;
use serde::Serialize;

use iron_front::battle::{
    ai::{load_personality, AiCommander, AiPersonality},
    Action, BattleMap, BattleOutcome, BattleState, Battlefield, GridCoord, Nation, Rules, Team,
    TeamProfile, TerrainType, UnitType, Weather,
};
use iron_front::core::BattleConfig;

/// Headless Battle Runner - AI vs AI skirmishes
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run AI vs AI skirmishes and print the result")]
struct Args {
    /// Player-side AI personality name (loaded from data/ai_personalities/)
    #[arg(long, default_value = "default")]
    friendly: String,

    /// Enemy AI personality name (loaded from data/ai_personalities/)
    #[arg(long, default_value = "default")]
    enemy: String,

    /// Map width in tiles
    #[arg(long, default_value_t = 16)]
    map_width: u32,

    /// Map height in tiles
    #[arg(long, default_value_t = 16)]
    map_height: u32,

    /// Turn limit before the battle is a draw (overrides the config file)
    #[arg(long)]
    max_turns: Option<u32>,

    /// Battle configuration TOML
    #[arg(long)]
    config: Option<String>,

    /// Weather: clear, overcast, rain, fog or storm
    #[arg(long, default_value = "clear")]
    weather: String,

    /// Player nation: british, french, german or american
    #[arg(long, default_value = "british")]
    player_nation: String,

    /// Enemy nation: british, french, german or american
    #[arg(long, default_value = "german")]
    enemy_nation: String,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print the battle log to stderr
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Disable fog of war for both AIs when planning movement
    #[arg(long)]
    no_fog: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct BattleResult {
    outcome: BattleOutcome,
    turns: u32,
    player_survivors: usize,
    enemy_survivors: usize,
    player_units: usize,
    enemy_units: usize,
    player_reinforcement_points: u32,
    enemy_reinforcement_points: u32,
    objectives_player: u32,
    objectives_enemy: u32,
    rejected_actions: usize,
    friendly_personality: String,
    enemy_personality: String,
    seed: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("iron_front=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(message) = run(&args) {
        eprintln!("error: {}", message);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), String> {
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut config = match &args.config {
        Some(path) => BattleConfig::load(path).map_err(|e| format!("config {}: {}", path, e))?,
        None => BattleConfig::default(),
    };
    if let Some(max_turns) = args.max_turns {
        config.battle.max_turns = max_turns;
    }
    config.validate().map_err(|e| e.to_string())?;

    let weather = Weather::from_name(&args.weather).ok_or_else(|| format!("unknown weather '{}'", args.weather))?;
    let player_nation = Nation::from_name(&args.player_nation)
        .ok_or_else(|| format!("unknown nation '{}'", args.player_nation))?;
    let enemy_nation = Nation::from_name(&args.enemy_nation)
        .ok_or_else(|| format!("unknown nation '{}'", args.enemy_nation))?;

    // Load personalities
    let mut friendly_personality = load_personality(&args.friendly).unwrap_or_else(|e| {
        tracing::warn!(name = %args.friendly, error = %e, "using default personality");
        AiPersonality::default()
    });
    let mut enemy_personality = load_personality(&args.enemy).unwrap_or_else(|e| {
        tracing::warn!(name = %args.enemy, error = %e, "using default personality");
        AiPersonality::default()
    });

    if args.no_fog {
        friendly_personality.difficulty.ignores_fog_of_war = true;
        enemy_personality.difficulty.ignores_fog_of_war = true;
    }

    let mut friendly_ai = AiCommander::with_seed(friendly_personality.clone(), seed);
    let enemy_ai = AiCommander::with_seed(enemy_personality.clone(), seed.wrapping_add(1));

    let mut field = skirmish_field(args.map_width.max(12), args.map_height.max(8)).with_weather(weather);
    field.player_profile = TeamProfile::for_nation(player_nation);
    field.enemy_profile = TeamProfile::for_nation(enemy_nation);

    let mut state = BattleState::new(field, Rules::with_config(config), seed).with_enemy_ai(enemy_ai);

    let mut printed = 0;
    while !state.is_finished() {
        state.play_ai_turn(&mut friendly_ai, Team::Player);
        if !state.is_finished() {
            state.apply_action(Action::EndTurn).map_err(|e| e.to_string())?;
        }

        if args.verbose {
            for event in state.log.iter().skip(printed) {
                eprintln!("  [{}] {}", event.turn, event.description);
            }
            printed = state.log.len();
        }
    }

    let units = &state.field.units;
    let result = BattleResult {
        outcome: state.outcome,
        turns: state.turn,
        player_survivors: units.living_on(Team::Player).count(),
        enemy_survivors: units.living_on(Team::Enemy).count(),
        player_units: units.iter().filter(|u| u.team == Team::Player).count(),
        enemy_units: units.iter().filter(|u| u.team == Team::Enemy).count(),
        player_reinforcement_points: state.player.reinforcements.points,
        enemy_reinforcement_points: state.enemy.reinforcements.points,
        objectives_player: state.field.map.objectives_held_by(Team::Player),
        objectives_enemy: state.field.map.objectives_held_by(Team::Enemy),
        rejected_actions: state
            .log
            .iter()
            .filter(|e| matches!(e.event_type, iron_front::battle::BattleEventType::ActionRejected { .. }))
            .count(),
        friendly_personality: friendly_personality.name,
        enemy_personality: enemy_personality.name,
        seed,
    };

    match args.format.as_str() {
        "text" => {
            println!("Battle Result");
            println!("=============");
            println!("Outcome: {:?}", result.outcome);
            println!("Turns: {}", result.turns);
            println!("Player survivors: {}/{}", result.player_survivors, result.player_units);
            println!("Enemy survivors: {}/{}", result.enemy_survivors, result.enemy_units);
            println!(
                "Objectives held: player {}, enemy {}",
                result.objectives_player, result.objectives_enemy
            );
            println!(
                "Reinforcement points: player {}, enemy {}",
                result.player_reinforcement_points, result.enemy_reinforcement_points
            );
            println!("Rejected actions: {}", result.rejected_actions);
            println!();
            println!("Personalities: {} vs {}", result.friendly_personality, result.enemy_personality);
            println!("Seed: {}", result.seed);
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
            println!("{}", json);
        }
    }
    Ok(())
}

/// Two lines facing each other across no man's land, with a wood on one
/// flank, a hill on the other and a farmhouse objective in the middle
fn skirmish_field(width: u32, height: u32) -> Battlefield {
    let (w, h) = (width as i32, height as i32);
    let mut map = BattleMap::new(width, height);

    map.fill(GridCoord::new(1, h / 2 - 1), GridCoord::new(2, h / 2 + 1), TerrainType::Forest);
    map.fill(GridCoord::new(w - 3, h / 2 - 1), GridCoord::new(w - 2, h / 2), TerrainType::Hill);
    map.fill(GridCoord::new(w / 2 - 2, h / 2), GridCoord::new(w / 2 - 1, h / 2), TerrainType::Mud);
    map.fill(GridCoord::new(0, 1), GridCoord::new(w - 1, 1), TerrainType::Trench);
    map.fill(GridCoord::new(0, h - 2), GridCoord::new(w - 1, h - 2), TerrainType::Trench);
    map.add_objective(GridCoord::new(w / 2, h / 2), "Farmhouse");

    map.player_deployment = (0..w).map(|x| GridCoord::new(x, 0)).collect();
    map.enemy_deployment = (0..w).map(|x| GridCoord::new(x, h - 1)).collect();

    let mut field = Battlefield::new(map);
    let line = [
        UnitType::Infantry,
        UnitType::MachineGunner,
        UnitType::Officer,
        UnitType::Infantry,
        UnitType::Medic,
        UnitType::Sniper,
    ];
    let start = (w - line.len() as i32 * 2) / 2;
    for (i, unit_type) in line.iter().enumerate() {
        let x = start + i as i32 * 2;
        field.units.spawn(*unit_type, Team::Player, GridCoord::new(x, 1));
        field.units.spawn(*unit_type, Team::Enemy, GridCoord::new(x, h - 2));
    }
    field
}
