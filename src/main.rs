use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use url::Url;

use nova_concierge::concierge::{Chain, CheckoutOutcome, Concierge, DispatchOutcome};
use nova_concierge::config::load_config;
use nova_concierge::render::render_analysis;

const AUDIO_EXTENSIONS: [&str; 4] = ["wav", "mp3", "m4a", "ogg"];

#[derive(Parser, Debug)]
#[command(author, version, about = "Nova: voice-first Web3 concierge over MCP agents")]
struct Args {
    /// MCP tool host endpoint (overrides CORAL_SERVER_URL)
    #[arg(long)]
    mcp_url: Option<Url>,

    /// Mint relay base URL (overrides CROSSMINT_SERVER_URL)
    #[arg(long)]
    mint_url: Option<Url>,

    /// Where synthesized speech is written (defaults to the temp dir)
    #[arg(long)]
    speech_out: Option<PathBuf>,
}

/// One line typed at the prompt.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Use typed text as the transcript
    Say {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Transcribe an audio file (wav, mp3, m4a, ogg)
    Listen {
        path: PathBuf,
        /// Transcription model
        #[arg(long)]
        model: Option<String>,
    },
    /// Show the current transcript
    Transcript,
    /// Discover agents on the MCP host
    Tools,
    /// Select an agent by name, or "manual" for free text to the analyst
    Use { tool: Option<String> },
    /// Edit the structured NFT query form
    Form {
        #[arg(long)]
        collection: Option<String>,
        #[arg(long)]
        chain: Option<Chain>,
        #[arg(long)]
        max_price: Option<f64>,
        /// Comma-separated trait filters
        #[arg(long)]
        traits: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        /// Buyer email for checkout
        #[arg(long)]
        email: Option<String>,
    },
    /// Send the request to the selected agent
    Send,
    /// Request a checkout URL for a rarity candidate
    Checkout {
        /// 1-based index into the rarity table
        #[arg(long)]
        pick: Option<usize>,
        /// Quantity to mint if the relay fallback is used
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Show the flow state
    State,
    /// Leave Nova
    #[command(alias = "exit")]
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::info!("🚀 Starting Nova concierge");

    let mut config = load_config().context("Failed to load configuration")?;
    if let Some(url) = args.mcp_url {
        config.mcp_url = url;
    }
    if let Some(url) = args.mint_url {
        config.mint_relay_url = url;
    }
    let mut concierge = Concierge::from_config(&config).context("Failed to create concierge")?;
    if let Some(path) = args.speech_out {
        concierge = concierge.with_speech_path(path);
    }

    println!("🎧 Nova is ready. MCP host: {}", config.mcp_url);
    println!("   Type 'help' for commands, 'quit' to exit");

    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("nova> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let command = match parse_line(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(e)) => {
                rl.add_history_entry(line.as_str()).ok();
                e.print().ok();
                continue;
            }
        };
        rl.add_history_entry(line.as_str()).ok();

        if matches!(command, Command::Quit) {
            break;
        }
        if let Err(e) = run_command(&mut concierge, command).await {
            println!("❌ {}", e);
        }
    }

    println!("\n👋 Goodbye!");
    Ok(())
}

async fn run_command(concierge: &mut Concierge, command: Command) -> nova_concierge::Result<()> {
    match command {
        Command::Say { text } => {
            concierge.capture_text(&text.join(" "))?;
            println!("✅ Using typed input");
        }
        Command::Listen { path, model } => {
            let audio = read_audio(&path).await?;
            let transcript = concierge.capture_audio(audio, model.as_deref()).await?;
            println!("✅ Transcription complete: {}", transcript);
        }
        Command::Transcript => match &concierge.context().transcript {
            Some(t) => println!("Transcript: {}", t),
            None => println!("No transcript yet"),
        },
        Command::Tools => {
            let tools = concierge.discover().await?;
            println!("Found {} tools", tools.len());
            for tool in tools {
                println!(
                    "- {}: {}",
                    tool.name,
                    tool.description.as_deref().unwrap_or("")
                );
            }
        }
        Command::Use { tool } => {
            let selection = concierge.select_tool(tool.as_deref())?;
            if selection.uses_structured_form() {
                println!("Structured NFT search (edit with 'form', send with 'send')");
            } else {
                println!("Unstructured query: the transcript goes to the selected agent");
            }
        }
        Command::Form {
            collection,
            chain,
            max_price,
            traits,
            limit,
            email,
        } => {
            let form = concierge.form_mut();
            if let Some(v) = collection {
                form.collection_slug = v;
            }
            if let Some(v) = chain {
                form.chain = v;
            }
            if let Some(v) = max_price {
                form.max_price = v;
            }
            if let Some(v) = traits {
                form.traits = v;
            }
            if let Some(v) = limit {
                form.limit = v;
            }
            if let Some(v) = email {
                form.buyer_email = Some(v);
            }
            println!("{:#?}", form);
        }
        Command::Send => {
            let request = concierge.build_request()?;
            println!(
                "Calling {} with: {}",
                request.target_tool,
                request.arguments_value()
            );
            print_dispatch(concierge.dispatch().await?);
        }
        Command::Checkout { pick, qty } => match concierge.request_checkout(pick, qty).await? {
            CheckoutOutcome::CheckoutUrl { url, .. } => {
                println!("✅ Checkout URL received");
                println!("{}", url);
            }
            CheckoutOutcome::Minted { response, .. } => {
                println!("✅ Server-side mint request created");
                println!("{}", pretty(&response));
            }
        },
        Command::State => println!("State: {}", concierge.state()),
        Command::Quit => {}
    }
    Ok(())
}

fn print_dispatch(outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Rendered { raw, analysis, .. } => {
            log::debug!("Agent raw response: {}", raw);
            println!("✅ Structured analysis received");
            println!("{}", render_analysis(&analysis));
            if !analysis.rarity_scores.is_empty() {
                println!(
                    "Use 'checkout --pick N --qty N' (1-{} candidates)",
                    analysis.rarity_scores.len()
                );
            }
        }
        DispatchOutcome::Spoken { raw, text, audio, .. } => {
            log::debug!("Agent raw response: {}", raw);
            println!("🗣️  {}", text);
            if let Some(path) = audio {
                println!("🔊 Speech saved to {}", path.display());
            }
        }
    }
}

async fn read_audio(path: &Path) -> nova_concierge::Result<Vec<u8>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        return Err(nova_concierge::ConciergeError::InvalidInput(format!(
            "Unsupported audio type '{}'; use one of {}",
            ext,
            AUDIO_EXTENSIONS.join(", ")
        )));
    }
    Ok(tokio::fs::read(path).await?)
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Parse one prompt line; `None` for a blank line.
fn parse_line(line: &str) -> Option<std::result::Result<Command, clap::Error>> {
    let words = split_words(line);
    if words.is_empty() {
        return None;
    }
    Some(Line::try_parse_from(words).map(|line| line.command))
}

/// Split a prompt line into words, keeping double-quoted runs together.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_word = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
