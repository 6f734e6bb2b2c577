use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use duochat::commands::{CommandOutcome, execute, parse_command};
use duochat::{ChatConfig, ChatEvent, ChatSessionHandle, ProviderId, build_session};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duochat")]
#[command(about = "A terminal chat client with credential rotation and automatic failover")]
#[command(
    long_about = "duochat holds a streaming conversation with a primary LLM service and \
falls back to a second one when the primary is unavailable. Rate-limited requests are \
retried with the next API key in the pool.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY     Gemini keys, comma or semicolon separated\n\
  ZHIPU_API_KEY      Zhipu GLM keys\n\
  DEEPSEEK_API_KEY   DeepSeek keys\n\
  OPENAI_API_KEY     OpenAI keys\n\
  PRIMARY_SERVICE    Primary provider (default gemini)\n\
  FALLBACK_SERVICE   Fallback provider, or none (default zhipu)\n\
  RUST_LOG           Log filter for stderr output (default info)\n\n\
Type /help inside the session for commands."
)]
struct Args {
    /// Path to a TOML config file (defaults to the platform config directory)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Primary provider: gemini, zhipu, deepseek, or openai
    #[arg(short, long, value_name = "PROVIDER", value_parser = parse_provider)]
    primary: Option<ProviderId>,
}

fn parse_provider(value: &str) -> Result<ProviderId, String> {
    ProviderId::parse(value).ok_or_else(|| format!("unknown provider `{value}`"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let session = match load_config(&args).and_then(|config| Ok(build_session(&config)?)) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    run_repl(session).await
}

fn load_config(args: &Args) -> Result<ChatConfig, Box<dyn Error>> {
    let mut config = ChatConfig::read(args.config.as_deref())?;
    if let Some(primary) = args.primary {
        config.set_primary(primary);
    }
    config.validate()?;
    Ok(config)
}

async fn run_repl(session: ChatSessionHandle) -> Result<(), Box<dyn Error>> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    {
        let orchestrator = session.lock().await;
        let banner = format!(
            "duochat | {} | {} | /help for commands, /exit to quit\n",
            orchestrator.service_name(),
            orchestrator.model()
        );
        stdout.write_all(banner.as_bytes()).await?;
    }

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        if let Some(command) = parse_command(&line) {
            let outcome = {
                let mut orchestrator = session.lock().await;
                execute(&mut orchestrator, command)
            };
            match outcome {
                CommandOutcome::Reply(reply) => {
                    stdout.write_all(format!("{reply}\n").as_bytes()).await?;
                }
                CommandOutcome::Exit => break,
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        let mut events = session.submit(line).await;
        while let Some(event) = events.recv().await {
            render_event(&mut stdout, event).await?;
        }
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

async fn render_event<W>(out: &mut W, event: ChatEvent) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let text = match event {
        ChatEvent::TextFragment(fragment) => fragment,
        ChatEvent::ReconnectAttempt {
            attempt,
            max_attempts,
        } => format!("\n[rate limited, reconnecting {attempt}/{max_attempts}]\n"),
        ChatEvent::TokenStats { turn_tokens } => format!("\n[{turn_tokens} tokens]\n"),
        ChatEvent::SystemNotice(notice) => format!("\n[{notice}]\n"),
        ChatEvent::Error { message, .. } => format!("\n[error] {message}\n"),
    };

    out.write_all(text.as_bytes()).await?;
    out.flush().await
}
