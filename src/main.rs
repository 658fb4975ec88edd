use anyhow::Result;
use clap::Parser;
use oswald_client::conversation::{ImageAttachment, TranscriptFile};
use oswald_client::ui::TerminalUI;
use oswald_client::{
    logging, ClientConfig, ConversationStore, HttpTransport, SendOutcome, StreamDriver,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat with the Oswald agent server", long_about = None)]
struct Args {
    /// Send this prompt, print the answer and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Image file to attach to the first prompt (can be repeated)
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the chat server
    #[arg(long)]
    server_url: Option<String>,

    #[arg(long)]
    api_version: Option<String>,

    #[arg(long)]
    user_id: Option<String>,

    /// Parse an unterminated last event line when the stream ends
    #[arg(long)]
    flush_partial_line: bool,

    /// Resume the conversation from this file and save it after every send
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn save_transcript(transcript: Option<&TranscriptFile>, store: &ConversationStore) -> Result<()> {
    if let Some(file) = transcript {
        file.save(store)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // The interactive session logs to a file so log lines do not end up
    // inside the streamed answer
    let log_file = if args.prompt.is_some() {
        None
    } else {
        Some(logging::default_log_file())
    };
    logging::setup_logging(args.verbose, log_file);

    let mut config = ClientConfig::load(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        config.server_url = server_url;
    }
    if let Some(api_version) = args.api_version {
        config.api_version = api_version;
    }
    if let Some(user_id) = args.user_id {
        config.user_id = user_id;
    }
    if args.flush_partial_line {
        config.flush_partial_line = true;
    }

    let transcript = args.transcript.map(TranscriptFile::new);
    let store = match &transcript {
        Some(file) => file.load()?,
        None => ConversationStore::new(),
    };

    let transport = HttpTransport::from_config(&config)?;
    info!("Using endpoint {}", transport.endpoint());
    let driver = StreamDriver::new(store, Box::new(transport), config.user_id.clone())
        .with_flush_partial_line(config.flush_partial_line);

    let mut images = args
        .images
        .iter()
        .map(|path| ImageAttachment::from_path(path))
        .collect::<Result<Vec<_>>>()?;

    let mut ui = if std::io::stdout().is_terminal() {
        TerminalUI::new()
    } else {
        TerminalUI::plain()
    };
    ui.render(&driver.store().snapshot(), &mut std::io::stdout())?;

    if let Some(prompt) = args.prompt {
        let outcome = ui.send(&driver, &prompt, images).await??;
        save_transcript(transcript.as_ref(), driver.store())?;
        if let SendOutcome::Failed { note, .. } = outcome {
            anyhow::bail!("Response failed: {}", note);
        }
        return Ok(());
    }

    while let Some(prompt) = ui.read_prompt().await? {
        if prompt == "/quit" || prompt == "/exit" {
            break;
        }

        // Attachments go with the first prompt that is actually sent
        let attachments = if prompt.is_empty() {
            Vec::new()
        } else {
            std::mem::take(&mut images)
        };

        match ui.send(&driver, &prompt, attachments).await? {
            Ok(SendOutcome::Failed { note, .. }) => warn!("Send failed: {}", note),
            Ok(_) => {}
            Err(rejected) => eprintln!("{}", rejected),
        }
        save_transcript(transcript.as_ref(), driver.store())?;
    }

    Ok(())
}
