use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use lantern::config::EngineConfig;
use lantern::engine::{Engine, TurnResult};
use lantern::line_editor::{LineEditor, ReadResult};
use lantern::types::EntityId;
use lantern::ui;
use lantern::world::World;

const DEMO_WORLD: &str = include_str!("../data/worlds/demo.yaml");

/// Play a story world from the terminal, printing the semantic events
/// each command produces.
#[derive(Debug, ClapParser)]
#[command(name = "lantern", version, about)]
struct Args {
    /// Story world (YAML). Defaults to the built-in demo.
    #[arg(long)]
    world: Option<PathBuf>,

    /// Engine config (YAML).
    #[arg(long, default_value = "lantern.yaml")]
    config: PathBuf,

    /// Act as this entity instead of the story's player.
    #[arg(long)]
    actor: Option<String>,

    /// Print events as JSON lines.
    #[arg(long)]
    json: bool,

    /// Run these commands in order and exit instead of prompting.
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{} {}", ui::red("error:"), msg);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let config = EngineConfig::load(&args.config).map_err(|e| e.to_string())?;
    let yaml = match &args.world {
        Some(path) => std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => DEMO_WORLD.to_string(),
    };
    let story = World::from_yaml(&yaml).map_err(|e| e.to_string())?;
    let actor = args
        .actor
        .map(EntityId::new)
        .or_else(|| config.default_actor.clone())
        .unwrap_or(story.player);
    let mut engine = Engine::with_config(story.world, config);
    if !engine.world().is_actor(&actor) {
        return Err(format!("'{}' is not an actor in this world", actor));
    }

    if !args.commands.is_empty() {
        for command in &args.commands {
            let result = engine.submit_command(&actor, command);
            print_turn(command, &result, args.json);
        }
        return Ok(());
    }

    repl(&mut engine, &actor, args.json)
}

fn repl(engine: &mut Engine, actor: &EntityId, json: bool) -> Result<(), String> {
    let mut editor = LineEditor::new().map_err(|e| e.to_string())?;
    if !json {
        println!(
            "{}\n",
            ui::banner("lantern", env!("CARGO_PKG_VERSION"), "type a command, or 'quit' to leave")
        );
    }
    loop {
        let line = match editor.read_line(&format!("{} ", ui::bold(">"))) {
            ReadResult::Line(line) => line,
            ReadResult::Interrupted => continue,
            ReadResult::Eof => break,
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "q" | "exit") {
            break;
        }
        editor.add_history(input);
        let result = engine.submit_command(actor, input);
        print_turn(input, &result, json);
    }
    Ok(())
}

fn print_turn(input: &str, result: &TurnResult, json: bool) {
    if json {
        for ev in &result.events {
            match serde_json::to_string(ev) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("{} {}", ui::red("error:"), e),
            }
        }
        return;
    }
    println!("{}", ui::dim(&format!("turn {}: {}", result.turn, input)));
    for ev in &result.events {
        println!("{}", ui::event_line(ev));
    }
    println!();
}
