use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;

use schblock::config::EditorConfig;
use schblock::editor::{EditorSession, MessageLevel, NullCanvas};
use schblock::logger::init_logger;
use schblock::model::Schematic;
use schblock::script::{load_script, replay};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay block editing commands against a schematic JSON file", long_about = None)]
struct Cli {
    /// Schematic document (JSON)
    #[arg(value_name = "SCHEMATIC_FILE")]
    schematic_file: Utf8PathBuf,

    /// Interaction script (JSON array of actions)
    #[arg(short, long, value_name = "SCRIPT_FILE")]
    script: Utf8PathBuf,

    /// Editor configuration (JSON); defaults are used when absent
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<Utf8PathBuf>,

    /// Write the edited document here instead of stdout
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<Utf8PathBuf>,
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EditorConfig::load_or_default(path),
        None => EditorConfig::default(),
    };

    let json = std::fs::read_to_string(&cli.schematic_file)
        .with_context(|| format!("Open {}", cli.schematic_file))?;
    let schematic: Schematic = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", cli.schematic_file))?;
    let actions = load_script(&cli.script)?;

    let mut session = EditorSession::new(schematic, config);
    session.schematic.test_dangling_ends();
    replay(&mut session, &mut NullCanvas, &actions);

    let messages = session.take_messages();
    let errors = messages
        .iter()
        .filter(|m| m.level == MessageLevel::Error)
        .count();
    if errors > 0 {
        tracing::warn!(errors, total = messages.len(), "replay finished with errors");
    }

    let out = serde_json::to_string_pretty(&session.schematic)?;
    match &cli.output {
        Some(path) => std::fs::write(path, out).with_context(|| format!("Write {}", path))?,
        None => println!("{}", out),
    }
    Ok(())
}
