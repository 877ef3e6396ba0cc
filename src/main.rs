use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use quillcast::config::Config;
use quillcast::editor::{ChangePublisher, EditIntent, EditorController, NullPublisher};
use quillcast::sanitize::sanitize_html;
use quillcast::session::{EditorSession, SessionView};
use quillcast::sync::{spawn_subscriber, HttpPublisher, RemoteSyncBridge, SubscriberOptions};

#[derive(Parser)]
#[command(name = "quillcast")]
#[command(about = "Rich-text editing shared live through a pub/sub relay", version)]
#[command(after_help = "Editing commands (one per line on stdin for `quillcast edit`):
   <text>                 insert text at the cursor
   ::<text>               insert ':<text>'
   :enter                 split the block at the cursor
   :bs / :del             delete backward / forward
   :tab / :untab          indent / outdent a list item
   :block <type>          toggle a block type, e.g. :block header-one
   :style <STYLE>         toggle an inline style, e.g. :style BOLD
   :key <command>         run a key command, e.g. :key backspace-word
   :select <key> <off> [<key> <off>]
                          move the selection")]
struct Cli {
    /// Config file (defaults to ./quillcast.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay: REST ingress, WebSocket channels and the static pages
    Serve {
        /// Address to bind, e.g. 0.0.0.0:8000
        #[arg(long)]
        bind: Option<String>,
    },

    /// Edit a document from stdin, publishing every change
    Edit {
        /// Channel to publish to and follow
        #[arg(long)]
        channel: Option<String>,

        /// Relay address, e.g. 127.0.0.1:8000
        #[arg(long)]
        relay: Option<String>,
    },

    /// Print the shared preview whenever a peer changes it
    Follow {
        #[arg(long)]
        channel: Option<String>,

        #[arg(long)]
        relay: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    let _guard = quillcast::logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            quillcast::server::start(&config).await?;
        }

        Commands::Edit { channel, relay } => {
            apply_client_flags(&mut config, channel, relay);
            edit(config).await?;
        }

        Commands::Follow { channel, relay } => {
            apply_client_flags(&mut config, channel, relay);
            follow(config).await?;
        }
    }

    Ok(())
}

fn apply_client_flags(config: &mut Config, channel: Option<String>, relay: Option<String>) {
    if let Some(channel) = channel {
        config.channel = channel;
    }
    if let Some(relay) = relay {
        config.relay.address = relay;
    }
}

fn start_session<P: ChangePublisher + 'static>(
    config: &Config,
    publisher: P,
    intents: mpsc::Receiver<EditIntent>,
) -> Result<(
    tokio::task::JoinHandle<EditorSession<P>>,
    watch::Receiver<SessionView>,
)> {
    let (signal_tx, signal_rx) = mpsc::channel(64);
    spawn_subscriber(
        SubscriberOptions {
            url: config.relay.socket_url()?,
            channel: config.channel.clone(),
            policy: config.sync.reconnect.clone(),
        },
        signal_tx,
    );

    let session = EditorSession::new(
        EditorController::new(publisher),
        RemoteSyncBridge::new(config.channel.clone(), config.sync.bridge_options()),
    );
    let (view_tx, view_rx) = watch::channel(session.view());
    let handle = tokio::spawn(session.run(intents, signal_rx, view_tx));
    Ok((handle, view_rx))
}

async fn edit(config: Config) -> Result<()> {
    let publisher = HttpPublisher::new(&config.relay.http_url()?)?;
    let (intent_tx, intent_rx) = mpsc::channel(64);
    let (session, mut views) = start_session(&config, publisher, intent_rx)?;

    println!(
        "{} Editing channel {} via {}",
        "✎".bright_green(),
        config.channel.bright_white(),
        config.relay.address.bright_blue()
    );

    let printer = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            print_view(&view);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.parse::<EditIntent>() {
            Ok(intent) => {
                if intent_tx.send(intent).await.is_err() {
                    break;
                }
            }
            Err(err) => eprintln!("{} {}", "✗".red(), err),
        }
    }

    // Closing stdin ends the session; the subscriber keeps its side open,
    // so stop waiting on it here.
    drop(intent_tx);
    session.abort();
    printer.abort();
    Ok(())
}

async fn follow(config: Config) -> Result<()> {
    let (_intent_tx, intent_rx) = mpsc::channel::<EditIntent>(1);
    let (session, mut views) = start_session(&config, NullPublisher, intent_rx)?;

    println!(
        "{} Following channel {} on {}",
        "👀".bright_cyan(),
        config.channel.bright_white(),
        config.relay.address.bright_blue()
    );

    let mut last_preview = String::new();
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if view.preview_html != last_preview {
                    last_preview = view.preview_html.clone();
                    println!("{}", "─".repeat(40).dimmed());
                    println!("{}", sanitize_html(&view.preview_html));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.abort();
    Ok(())
}

fn print_view(view: &SessionView) {
    let state = &view.state;
    let selection = state.selection();
    println!(
        "{} [{}] rev {} · cursor {}:{}",
        "•".bright_blue(),
        view.connection,
        view.revision,
        selection.focus_key,
        selection.focus_offset
    );
    for block in state.content().blocks() {
        println!(
            "  {} {:<20} {}",
            block.key().dimmed(),
            block.block_type().as_str().yellow(),
            block.text()
        );
    }
    println!("  {}", sanitize_html(&view.preview_html).bright_white());
}
