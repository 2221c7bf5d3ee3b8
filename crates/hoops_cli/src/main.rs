//! hoops CLI
//!
//! Runs single games or whole rounds from JSON / YAML request files.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use hoops_core::api::{build_registry, merge_round_meta, simulate_request, simulate_round, Fixture, GameRequest};
use hoops_core::models::{GameResult, MetaStore, RuleSet, TeamSide};

/// Preset used when a request carries no rules.
const RULES_PRESET_ENV: &str = "HOOPS_RULES_PRESET";

#[derive(Parser)]
#[command(name = "hoops")]
#[command(about = "Simulate 3-on-3 games with governed rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one game from a request file
    Simulate {
        /// Request file (.json, .yaml or .yml)
        #[arg(long)]
        input: PathBuf,

        /// Override the request seed
        #[arg(long)]
        seed: Option<u64>,

        /// Write the full JSON response here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print every possession
        #[arg(long, default_value = "false")]
        log: bool,
    },

    /// Simulate a round of fixtures in parallel
    Batch {
        /// Round file (.json, .yaml or .yml)
        #[arg(long)]
        input: PathBuf,

        /// Write the merged meta store here
        #[arg(long)]
        meta_out: Option<PathBuf>,
    },

    /// Print the RuleSet JSON schema
    Schema,

    /// Print a rule preset and its parameter names
    Rules {
        /// default, high_scoring or grind
        #[arg(long, default_value = "default")]
        preset: String,
    },
}

#[derive(Deserialize)]
struct RoundFile {
    #[serde(default)]
    rules: Option<RuleSet>,
    #[serde(default)]
    effects: Vec<Value>,
    #[serde(default)]
    meta: Option<MetaStore>,
    fixtures: Vec<Fixture>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { input, seed, out, log } => {
            let mut request: GameRequest = load(&input)?;
            request.rules = Some(resolve_rules(request.rules.take())?);
            if let Some(seed) = seed {
                request.seed = seed;
            }

            println!("🏀 Simulating {} vs {} (seed {})", request.home.id, request.away.id, request.seed);
            let response = simulate_request(request)?;

            if log {
                print_possessions(&response.result);
            }
            print_summary(&response.result);
            if !response.dirty_keys.is_empty() {
                println!("   Meta keys written: {}", response.dirty_keys.len());
            }

            if let Some(path) = out {
                std::fs::write(&path, serde_json::to_string_pretty(&response)?)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("\n📄 Response saved to: {}", path.display());
            }
        }

        Commands::Batch { input, meta_out } => {
            let round: RoundFile = load(&input)?;
            let rules = resolve_rules(round.rules)?;
            let registry = build_registry(&round.effects)?;
            let mut meta = round.meta.unwrap_or_default();

            println!("🏀 Simulating {} fixtures", round.fixtures.len());
            let games = simulate_round(&round.fixtures, &rules, registry.effects(), &meta)?;
            for game in &games {
                print_summary(&game.result);
            }

            merge_round_meta(&mut meta, &games);
            println!("\n✅ Round complete, {} meta keys written", meta.dirty_keys().count());
            if let Some(path) = meta_out {
                std::fs::write(&path, serde_json::to_string_pretty(&meta)?)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("📄 Meta saved to: {}", path.display());
            }
        }

        Commands::Schema => {
            println!("{}", hoops_core::api::rule_set_schema_json()?);
        }

        Commands::Rules { preset } => {
            let rules = RuleSet::preset(&preset).ok_or_else(|| anyhow!("unknown rules preset '{preset}'"))?;
            println!("{}", serde_json::to_string_pretty(&rules)?);
            println!("\nParameters: {}", RuleSet::param_names().join(", "));
        }
    }

    Ok(())
}

/// Deserialize a JSON or YAML file, chosen by extension.
fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
        _ => serde_json::from_str(&text)?,
    };
    Ok(parsed)
}

/// Request rules, else the `HOOPS_RULES_PRESET` preset, else defaults.
fn resolve_rules(rules: Option<RuleSet>) -> Result<RuleSet> {
    if let Some(rules) = rules {
        return Ok(rules);
    }
    match std::env::var(RULES_PRESET_ENV) {
        Ok(name) => RuleSet::preset(&name).ok_or_else(|| anyhow!("{RULES_PRESET_ENV}: unknown preset '{name}'")),
        Err(_) => Ok(RuleSet::default()),
    }
}

fn print_summary(result: &GameResult) {
    println!("\n✅ {} {} - {} {}", result.home_team_id, result.home_score, result.away_score, result.away_team_id);
    let quarters: Vec<String> =
        result.quarter_scores.iter().map(|q| format!("Q{} {}-{}", q.quarter, q.home, q.away)).collect();
    println!("   {}", quarters.join("  "));
    match result.elam_target {
        Some(target) if result.capped => println!("   Elam target {target} not reached (safety cap)"),
        Some(target) => println!("   Elam target {target}"),
        None => {}
    }
    println!("   Possessions: {}", result.total_possessions);

    for side in [TeamSide::Home, TeamSide::Away] {
        if let Some(top) = result.box_scores_for(side).max_by_key(|line| line.points) {
            println!(
                "   Top scorer ({:?}): {} {} pts, {} reb, {} ast",
                side,
                top.name,
                top.points,
                top.rebounds(),
                top.assists
            );
        }
    }
    for note in &result.narratives {
        println!("   📣 [{}] {}", note.effect_id, note.text);
    }
}

fn print_possessions(result: &GameResult) {
    for p in &result.possession_log {
        let clock = p.clock_remaining.map(|c| format!("{c:>3}s")).unwrap_or_else(|| "elam".to_string());
        println!(
            "Q{} {} #{:<3} {:?} {:?} {:?} +{} ({}-{}){}",
            p.quarter,
            clock,
            p.index,
            p.offense,
            p.scheme,
            p.outcome,
            p.points,
            p.home_score,
            p.away_score,
            if p.effects_fired.is_empty() { String::new() } else { format!(" [{}]", p.effects_fired.join(", ")) }
        );
    }
}
