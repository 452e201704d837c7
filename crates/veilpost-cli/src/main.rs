//! Veilpost CLI
//!
//! Thin wrapper around veilpost-core for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a scripted decryption session for a post
//! veilpost decrypt --script post.json --posted-by person:twitter.com/alice \
//!     --whoami person:twitter.com/bob --payload --text "🎼 ..." --image https://img/1.png
//!
//! # Encrypt a comment for a decrypted post
//! veilpost comment encrypt --iv 010203 --post-text "hi" "nice post"
//!
//! # Decrypt a comment
//! veilpost comment decrypt --iv 010203 --post-text "hi" <base64>
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use veilpost_core::decrypt::{
    render_text, select_views, DecryptionScript, PresentationContext, ScriptedDecryptionService,
};
use veilpost_core::{CommentCodec, DecryptConfig, DecryptionOrchestrator, PostContext, ProfileIdentifier};

/// Veilpost - progressive decryption of encrypted posts
#[derive(Parser)]
#[command(name = "veilpost")]
#[command(version = "0.1.0")]
#[command(about = "Veilpost - progressive decryption of encrypted posts")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted decryption session and print what the reader sees
    Decrypt {
        /// Script of decryption items per content unit
        #[arg(short, long)]
        script: PathBuf,

        /// Profile that posted (person:network/user)
        #[arg(long)]
        posted_by: String,

        /// Author claimed inside the payload
        #[arg(long)]
        claimed_author: Option<String>,

        /// Viewing profile
        #[arg(long)]
        whoami: String,

        /// Post URL
        #[arg(long)]
        url: Option<String>,

        /// Raw post text
        #[arg(long, default_value = "")]
        text: String,

        /// Link mentioned in the post (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,

        /// Attached image URL (repeatable)
        #[arg(long = "image")]
        images: Vec<String>,

        /// The post text carries a decodable payload
        #[arg(long)]
        payload: bool,
    },

    /// Comment encryption for a decrypted post
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },
}

#[derive(Subcommand)]
enum CommentAction {
    /// Encrypt a comment
    Encrypt {
        /// Post initialization vector (hex)
        #[arg(long, default_value = "")]
        iv: String,
        /// Decrypted post text
        #[arg(long)]
        post_text: String,
        /// Comment to encrypt
        comment: String,
    },
    /// Decrypt a comment
    Decrypt {
        /// Post initialization vector (hex)
        #[arg(long, default_value = "")]
        iv: String,
        /// Decrypted post text
        #[arg(long)]
        post_text: String,
        /// Encrypted comment (base64)
        comment: String,
    },
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Parse a profile identifier from `person:network/user`
fn parse_profile(s: &str) -> Result<ProfileIdentifier> {
    s.parse()
        .map_err(|e| anyhow::anyhow!("Invalid profile '{}': {}", s, e))
}

/// Parse an initialization vector from hex
fn parse_iv(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| anyhow::anyhow!("Invalid iv '{}': {}", s, e))
}

fn load_config(path: Option<&PathBuf>) -> Result<DecryptConfig> {
    match path {
        Some(path) => DecryptConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(DecryptConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = load_config(cli.config.as_ref())?;
    tracing::debug!(?config, "Loaded configuration");

    match cli.command {
        Commands::Decrypt {
            script,
            posted_by,
            claimed_author,
            whoami,
            url,
            text,
            links,
            images,
            payload,
        } => {
            let script = DecryptionScript::from_json_file(&script)
                .with_context(|| format!("Failed to load script {}", script.display()))?;
            let whoami = parse_profile(&whoami)?;

            let mut post = PostContext::new(parse_profile(&posted_by)?, text)
                .with_mentioned_links(links)
                .with_images(images)
                .with_payload(payload);
            if let Some(url) = url {
                post = post.with_url(url);
            }
            if let Some(author) = claimed_author {
                post = post.with_claimed_author(parse_profile(&author)?);
            }
            let post = Arc::new(post);

            let service = Arc::new(ScriptedDecryptionService::new(script));
            let orchestrator = DecryptionOrchestrator::new(service, post.clone(), config.clone());
            orchestrator.update(post.inputs(&whoami));
            orchestrator
                .wait()
                .await
                .context("Decryption session aborted")?;

            let ctx = PresentationContext::for_post(
                &post,
                &whoami,
                None,
                config.recipient_settle_delay(),
            );
            let views = select_views(&orchestrator.snapshot(), &ctx);
            if views.is_empty() {
                println!("Not a secret post");
            } else {
                print!("{}", render_text(&views));
            }

            if let Some(codec) = post.comments().get() {
                println!("Comment iv: {}", hex::encode(codec.iv()));
            }
        }

        Commands::Comment { action } => match action {
            CommentAction::Encrypt {
                iv,
                post_text,
                comment,
            } => {
                let codec = CommentCodec::new(&parse_iv(&iv)?, &post_text)?;
                println!("{}", codec.encrypt_comment(&comment)?);
            }
            CommentAction::Decrypt {
                iv,
                post_text,
                comment,
            } => {
                let codec = CommentCodec::new(&parse_iv(&iv)?, &post_text)?;
                println!("{}", codec.decrypt_comment(&comment)?);
            }
        },
    }

    Ok(())
}
