use std::io::BufRead;
use std::io::Write;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use wealthrag::config::AppConfig;
use wealthrag::rag::ChatTurn;
use wealthrag::rag::RagPipeline;

#[derive(Parser)]
#[command(name = "wealthrag")]
#[command(about = "WealthRAG CLI for grounded question answering over the wealth-event knowledge base")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the config file (defaults to config.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the grounded answer
    Ask {
        /// The question to answer
        question: String,
        /// Print pipeline diagnostics after the answer
        #[arg(short, long)]
        diagnostics: bool,
    },
    /// Interactive chat over a growing conversation
    Chat,
    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    if cli.verbose {
        wealthrag::logging::init_logging_with_level("debug")?;
    } else {
        wealthrag::logging::init_logging_with_config(Some(&config))?;
    }

    match cli.command {
        Commands::Ask {
            question,
            diagnostics,
        } => {
            let pipeline = RagPipeline::from_config(&config)?;
            let turns = vec![ChatTurn::user(question)];
            let response = pipeline.process_chat_request(&turns).await?;

            println!("{}", response.answer);
            if diagnostics {
                println!();
                println!(
                    "--- diagnostics ---\n{}",
                    serde_json::to_string_pretty(&response.diagnostics)?
                );
            }
        }
        Commands::Chat => {
            let pipeline = RagPipeline::from_config(&config)?;
            run_chat_loop(&pipeline).await?;
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_chat_loop(pipeline: &RagPipeline) -> Result<()> {
    println!("WealthRAG chat - empty line to exit");

    let stdin = std::io::stdin();
    let mut turns: Vec<ChatTurn> = Vec::new();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        turns.push(ChatTurn::user(question));
        let response = pipeline.process_chat_request(&turns).await?;
        println!("{}", response.answer);
        turns.push(ChatTurn::assistant(response.answer));
    }

    Ok(())
}
