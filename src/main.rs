use anyhow::Result;
use cartage::agent::AgentKind;
use cartage::cartridge::CartridgeRepository;
use cartage::orchestrator::{AgentSpec, Migrator};
use cartage::phase::PhaseRepository;
use cartage::ui::PENCIL;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cartage")]
#[command(version, about = "Agent-driven cartridge migration orchestrator")]
struct Cli {
    /// Path to the cartridge workspace (or a single cartridge with -s)
    #[arg(short = 'p', long = "path")]
    path: Option<PathBuf>,

    /// Agent used for AI-driven phases (copilot or claude_code)
    #[arg(short = 'a', long = "agent")]
    agent: Option<String>,

    /// Model identifier passed to the agent
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// Treat the path as a single cartridge instead of a workspace
    #[arg(short = 's', long = "single")]
    single: bool,

    /// Directory holding config.json and instructions/
    #[arg(long, default_value = "phases")]
    phases_dir: PathBuf,

    /// Root directory for per-session logs
    #[arg(long, default_value = "logs")]
    logs_dir: PathBuf,
}

fn print_usage() {
    eprintln!("Usage: cartage -p <path> -a <agent> [-m <model>] [-s]");
    eprintln!("  -p <path>    : Path to cartridge(s)");
    eprintln!("  -a <agent>   : Agent type (copilot or claude_code)");
    eprintln!("  -m <model>   : Model to use (optional)");
    eprintln!("  -s           : Single cartridge mode (optional)");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    // A missing or unrecognized agent name gets the same usage error as
    // a missing path.
    let agent = cli.agent.as_deref().and_then(AgentKind::parse);
    let (Some(path), Some(agent)) = (cli.path, agent) else {
        print_usage();
        std::process::exit(1);
    };

    let cartridges = CartridgeRepository::discover(&path, cli.single)?;
    if cli.single {
        println!("Single cartridge mode: {}", path.display());
    } else {
        println!("Workspace mode: Found {} cartridges", cartridges.len());
    }

    let phase_repo = PhaseRepository::new(
        cli.phases_dir.join("config.json"),
        cli.phases_dir.join("instructions"),
    );

    let migrator = Migrator::new(
        cartridges,
        phase_repo,
        AgentSpec::new(agent, cli.model),
        &cli.logs_dir,
    )?;
    println!("{PENCIL}Logging to: {}", migrator.session_dir().display());

    migrator.migrate().await?;
    Ok(())
}
