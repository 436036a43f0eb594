//! talks CLI: paced, turn-by-turn model conversations in the terminal

use clap::{Parser, Subcommand};
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use talks_engine::{
    Config, ControllerOptions, ConversationController, ConversationEvent, HttpTurnService,
    Message, MessageOrigin, Pacer, TokioPacer, TurnService, CONFIG_DIR,
};
use tracing_subscriber::EnvFilter;

/// Watch two models talk about a topic, one turn at a time
#[derive(Parser)]
#[command(name = "talks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the TUI (default when no command specified)
    Tui {
        #[command(flatten)]
        server: ServerArgs,

        /// Start a conversation on this topic right away
        #[arg(long)]
        topic: Option<String>,

        /// Turns per run
        #[arg(long)]
        max_turns: Option<u32>,
    },

    /// Stream a conversation to stdout without the TUI
    Run {
        #[command(flatten)]
        server: ServerArgs,

        /// Topic of the conversation
        #[arg(long)]
        topic: String,

        /// Number of turns
        #[arg(long)]
        turns: Option<u32>,
    },

    /// Discard the remote conversation session
    Reset {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Initialize .talks/ directory and config
    Init,
}

/// Flags shared by commands that talk to the server.
#[derive(clap::Args, Default)]
struct ServerArgs {
    /// Base URL of the conversation server
    #[arg(long)]
    server: Option<String>,

    /// Wait between turns, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
}

impl ServerArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.server_url.clone_from(server);
        }
        if let Some(delay) = self.delay_ms {
            config.pacing_delay_ms = delay;
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        None => cmd_tui(&ServerArgs::default(), None, None),
        Some(Commands::Tui {
            server,
            topic,
            max_turns,
        }) => cmd_tui(&server, topic.as_deref(), max_turns),
        Some(Commands::Run {
            server,
            topic,
            turns,
        }) => cmd_run(&server, &topic, turns),
        Some(Commands::Reset { server }) => cmd_reset(&server),
        Some(Commands::Init) => cmd_init(),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Log to `.talks/talks.log` so output doesn't corrupt the screen.
fn init_file_logging() {
    let dir = Path::new(CONFIG_DIR);
    if std::fs::create_dir_all(dir).is_err() {
        return;
    }
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("talks.log"))
    {
        Ok(file) => file,
        Err(_) => return,
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
}

fn load_config() -> Config {
    let path = Config::path_in(Path::new("."));
    match Config::load_or_default(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    }
}

fn http_service(config: &Config) -> HttpTurnService {
    match HttpTurnService::new(&config.server_url, config.request_timeout()) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Failed to create HTTP client: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_tui(server: &ServerArgs, topic: Option<&str>, max_turns: Option<u32>) {
    init_file_logging();

    let mut config = load_config();
    server.apply(&mut config);
    if let Some(max_turns) = max_turns {
        config.max_turns = max_turns;
    }

    let rt = runtime();
    if let Err(e) = rt.block_on(talks_tui::run_tui(&config, topic)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_run(server: &ServerArgs, topic: &str, turns: Option<u32>) {
    init_stderr_logging();

    let mut config = load_config();
    server.apply(&mut config);
    if let Some(turns) = turns {
        config.max_turns = turns;
    }

    let service = http_service(&config);
    let rt = runtime();
    let streamed = rt.block_on(stream_conversation(
        &config,
        Arc::new(service),
        Arc::new(TokioPacer),
        topic,
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
        &mut std::io::stdout(),
    ));
    if let Err(e) = streamed {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Lines printed for one appended message.
///
/// `turn_count` is the count before the append, so turns are numbered from 1.
fn message_lines(message: &Message, turn_count: u32, origin: MessageOrigin) -> Vec<String> {
    match origin {
        MessageOrigin::History => vec![format!("{}: {}", message.speaker, message.text)],
        MessageOrigin::Turn => vec![
            String::new(),
            format!("--- Turn {} ---", turn_count + 1),
            format!("{}: {}", message.header(), message.text),
        ],
    }
}

/// Drive a conversation to the end, writing every message to `out` as it lands.
///
/// When `interrupt` resolves the run is paused. A turn already requested is
/// still waited for and printed before returning.
async fn stream_conversation<W: Write>(
    config: &Config,
    service: Arc<dyn TurnService>,
    pacer: Arc<dyn Pacer>,
    topic: &str,
    interrupt: impl Future<Output = ()>,
    out: &mut W,
) -> Result<(), String> {
    let (mut controller, mut events) =
        ConversationController::new(service, pacer, ControllerOptions::from(config));

    if !controller.start(topic) {
        return Err("topic must not be empty".into());
    }

    tokio::pin!(interrupt);
    let mut interrupted = false;
    loop {
        while let Ok(event) = events.try_recv() {
            match event {
                ConversationEvent::MessageAppended {
                    index,
                    turn_count,
                    origin,
                } => {
                    let Some(message) = controller.transcript().get(index) else {
                        continue;
                    };
                    for line in message_lines(message, turn_count, origin) {
                        writeln!(out, "{line}").map_err(|e| e.to_string())?;
                    }
                }
                ConversationEvent::Failed(failure) => return Err(failure.to_string()),
                ConversationEvent::Completed { .. } => {
                    writeln!(out, "\nConversation finished.").map_err(|e| e.to_string())?;
                    return Ok(());
                }
                _ => {}
            }
        }

        if !controller.is_busy() {
            break;
        }

        tokio::select! {
            biased;
            () = &mut interrupt, if !interrupted => {
                controller.pause();
                interrupted = true;
            }
            _ = controller.next_event() => {}
        }
    }

    writeln!(
        out,
        "\nConversation paused after {} turn(s).",
        controller.turn_count()
    )
    .map_err(|e| e.to_string())
}

fn cmd_reset(server: &ServerArgs) {
    init_stderr_logging();

    let mut config = load_config();
    server.apply(&mut config);

    let service = http_service(&config);
    let rt = runtime();
    match rt.block_on(service.reset_session()) {
        Ok(()) => println!("Conversation reset on {}", config.server_url),
        Err(e) => {
            eprintln!("Failed to reset conversation: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_init() {
    init_stderr_logging();

    let config_path = Config::path_in(Path::new("."));
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return;
    }

    match Config::default().save(&config_path) {
        Ok(()) => println!("Created {}", config_path.display()),
        Err(e) => {
            eprintln!("Failed to write config: {e}");
            std::process::exit(1);
        }
    }

    println!("\nInitialization complete!");
    println!("Edit {} to point talks at your server", config_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use talks_engine::testing::{ScriptedService, ScriptedTurn};
    use talks_engine::ImmediatePacer;

    async fn stream(service: ScriptedService, max_turns: u32) -> (Result<(), String>, String) {
        let config = Config {
            max_turns,
            ..Config::default()
        };
        let mut out = Vec::new();
        let result = stream_conversation(
            &config,
            Arc::new(service),
            Arc::new(ImmediatePacer),
            "space travel",
            std::future::pending(),
            &mut out,
        )
        .await;
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_message_lines_number_turns_from_one() {
        let message = Message::new("Model A", "hello").with_model("llama3");
        let lines = message_lines(&message, 0, MessageOrigin::Turn);
        assert_eq!(lines[1], "--- Turn 1 ---");
        assert_eq!(lines[2], "Model A (llama3): hello");

        let moderator = Message::new("Moderator", "Topic: space travel").with_model("System");
        assert_eq!(
            message_lines(&moderator, 0, MessageOrigin::History),
            vec!["Moderator: Topic: space travel".to_string()]
        );
    }

    #[tokio::test]
    async fn test_stream_conversation_prints_numbered_turns() {
        let (result, output) = stream(ScriptedService::new(), 2).await;
        assert!(result.is_ok());

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Moderator: Topic: space travel");
        assert!(lines.contains(&"--- Turn 1 ---"));
        assert!(lines.contains(&"Model A: turn 1"));
        assert!(lines.contains(&"--- Turn 2 ---"));
        assert!(lines.contains(&"Model B: turn 2"));
        assert!(!output.contains("--- Turn 0 ---"));
        assert!(!output.contains("--- Turn 3 ---"));
        assert_eq!(lines.last(), Some(&"Conversation finished."));
    }

    #[tokio::test]
    async fn test_stream_conversation_reports_failed_turn() {
        let service = ScriptedService::new().with_turns([
            ScriptedTurn::Message(Message::new("Model A", "one")),
            ScriptedTurn::Error("rate limited".into()),
        ]);
        let (result, output) = stream(service, 20).await;

        let error = result.unwrap_err();
        assert!(error.contains("rate limited"));
        assert!(output.contains("--- Turn 1 ---"));
        assert!(!output.contains("--- Turn 2 ---"));
        assert!(!output.contains("Conversation finished."));
    }

    #[tokio::test]
    async fn test_stream_conversation_interrupt_prints_in_flight_turn() {
        let service = Arc::new(ScriptedService::new());
        let config = Config {
            max_turns: 20,
            ..Config::default()
        };

        // Fires once the topic is accepted, while the first turn is requested
        let watched = Arc::clone(&service);
        let interrupt = async move {
            while watched.initialize_calls() == 0 {
                tokio::task::yield_now().await;
            }
        };

        let mut out = Vec::new();
        let result = stream_conversation(
            &config,
            Arc::clone(&service) as Arc<dyn TurnService>,
            Arc::new(ImmediatePacer),
            "space travel",
            interrupt,
            &mut out,
        )
        .await;
        assert!(result.is_ok());

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("--- Turn 1 ---"));
        assert!(output.contains("Model A: turn 1"));
        assert!(!output.contains("--- Turn 2 ---"));
        assert!(output.ends_with("Conversation paused after 1 turn(s).\n"));
        assert_eq!(service.next_turn_calls(), 1);
    }

    #[tokio::test]
    async fn test_stream_conversation_rejects_empty_topic() {
        let config = Config::default();
        let mut out = Vec::new();
        let result = stream_conversation(
            &config,
            Arc::new(ScriptedService::new()),
            Arc::new(ImmediatePacer),
            "   ",
            std::future::pending(),
            &mut out,
        )
        .await;
        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_cli_parses_default_to_tui() {
        let cli = Cli::try_parse_from(["talks"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "talks",
            "run",
            "--topic",
            "space travel",
            "--turns",
            "4",
            "--delay-ms",
            "0",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run {
                server,
                topic,
                turns,
            }) => {
                assert_eq!(topic, "space travel");
                assert_eq!(turns, Some(4));
                assert_eq!(server.delay_ms, Some(0));
                assert!(server.server.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_run_requires_topic() {
        assert!(Cli::try_parse_from(["talks", "run"]).is_err());
    }

    #[test]
    fn test_server_args_override_config() {
        let args = ServerArgs {
            server: Some("http://localhost:9000".into()),
            delay_ms: Some(10),
        };
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.server_url, "http://localhost:9000");
        assert_eq!(config.pacing_delay_ms, 10);
        assert_eq!(config.max_turns, Config::default().max_turns);
    }

    #[test]
    fn test_cli_parses_tui_flags() {
        let cli = Cli::try_parse_from([
            "talks",
            "tui",
            "--server",
            "http://example.test",
            "--max-turns",
            "6",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Tui {
                server,
                topic,
                max_turns,
            }) => {
                assert_eq!(server.server.as_deref(), Some("http://example.test"));
                assert!(topic.is_none());
                assert_eq!(max_turns, Some(6));
            }
            _ => panic!("expected tui command"),
        }
    }
}
