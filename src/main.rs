use clap::Parser;
use gossipd::config::{self, Config};
use gossipd::{InboundMessage, Message, Node, PeerAddress};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gossipd")]
#[command(about = "Gossip overlay node", long_about = None)]
struct Args {
    /// Identifier announced to other nodes
    node_id: Option<String>,

    /// Port to listen on
    port: Option<u16>,

    /// Bootstrap node IP
    bootstrap_ip: Option<String>,

    /// Bootstrap node port
    bootstrap_port: Option<u16>,

    #[arg(short, long)]
    config: Option<String>,

    /// IP other nodes should use to reach us (default: resolved from hostname)
    #[arg(long)]
    advertise_ip: Option<String>,

    #[arg(long)]
    listen_addr: Option<String>,

    /// Re-flood received broadcasts to our own neighbors
    #[arg(long)]
    relay: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    generate_config: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    Send {
        target: PeerAddress,
        content: String,
    },
    Broadcast(String),
    Status,
    Discover,
    Exit,
}

fn parse_command(line: &str) -> Result<CliCommand, String> {
    let line = line.trim();
    let (action, args) = match line.split_once(' ') {
        Some((action, args)) => (action, Some(args.trim())),
        None => (line, None),
    };

    match (action.to_uppercase().as_str(), args) {
        ("EXIT", _) => Ok(CliCommand::Exit),
        ("STATUS", _) => Ok(CliCommand::Status),
        ("DISCOVER", _) => Ok(CliCommand::Discover),
        ("BROADCAST", Some(text)) if !text.is_empty() => Ok(CliCommand::Broadcast(text.to_string())),
        ("SEND", Some(args)) => {
            let usage = || "Usage: send <target_ip> <target_port> <content>".to_string();
            let mut parts = args.splitn(3, ' ');
            let ip = parts.next().filter(|s| !s.is_empty()).ok_or_else(usage)?;
            let port = parts
                .next()
                .and_then(|p| p.parse::<u16>().ok())
                .ok_or_else(usage)?;
            let content = parts.next().filter(|s| !s.is_empty()).ok_or_else(usage)?;
            Ok(CliCommand::Send {
                target: PeerAddress::new(ip, port),
                content: content.to_string(),
            })
        }
        ("SEND", None) | ("BROADCAST", _) => Err(format!("Invalid or incomplete command: {}", action)),
        _ => Err(format!("Unknown command: {}", action)),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(|| "gossipd.toml".to_string());

    if args.generate_config {
        match Config::default().save_to_file(&config_path) {
            Ok(_) => {
                println!("✅ Generated default config at: {}", config_path);
                return;
            }
            Err(e) => {
                eprintln!("❌ Failed to generate config: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut config = match &args.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(cfg) => {
                println!("✓ Loaded configuration from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("❌ Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    if let Some(node_id) = &args.node_id {
        config.node.node_id = node_id.clone();
    }
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(listen) = &args.listen_addr {
        config.network.listen_address = listen.clone();
    }
    if args.relay {
        config.network.relay_broadcasts = true;
    }
    match (&args.bootstrap_ip, args.bootstrap_port) {
        (Some(ip), Some(port)) => {
            config.network.bootstrap = Some(PeerAddress::new(ip.as_str(), port).to_string());
        }
        (Some(_), None) => {
            eprintln!("Usage: gossipd <node_id> <port> [bootstrap_ip bootstrap_port]");
            std::process::exit(1);
        }
        _ => {}
    }
    match &args.advertise_ip {
        Some(ip) => config.node.advertise_ip = ip.clone(),
        // A config file decides for itself; otherwise use the hostname's address
        None if args.config.is_none() => config.node.advertise_ip = resolve_local_ip().await,
        None => {}
    }

    setup_logging(&config.logging, args.verbose, &config.node.node_id);

    println!(
        "\n🚀 gossipd v{} | node {}",
        env!("CARGO_PKG_VERSION"),
        config.node.node_id
    );

    let node = match Node::start(config).await {
        Ok(node) => node,
        Err(e) => {
            eprintln!("❌ Failed to start node: {}", e);
            eprintln!("   (Port may already be in use)");
            std::process::exit(1);
        }
    };

    println!("✓ Listening as {}", node.identity());
    println!("Type 'exit' to stop the node.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut inbox_poll = tokio::time::interval(Duration::from_millis(200));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("🛑 Shutdown signal received");
                break;
            }

            _ = inbox_poll.tick() => {
                for entry in node.received_messages() {
                    print_inbound(&entry);
                }
            }

            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(CliCommand::Exit) => break,
                    Ok(command) => run_command(&node, command).await,
                    Err(e) => println!("{}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    }

    node.stop().await;
}

async fn run_command(node: &Node, command: CliCommand) {
    match command {
        CliCommand::Send { target, content } => {
            if let Err(e) = node.send_message(&target, &content).await {
                println!("❌ {}", e);
            }
        }
        CliCommand::Broadcast(text) => match node.broadcast(&text).await {
            Ok(delivered) => println!("📢 Broadcast delivered to {} neighbor(s)", delivered),
            Err(e) => println!("❌ {}", e),
        },
        CliCommand::Status => println!("{}", node.status()),
        CliCommand::Discover => println!("Neighbors: {:?}", node.discover()),
        CliCommand::Exit => {}
    }
}

fn print_inbound(entry: &InboundMessage) {
    let source = match &entry.message {
        Message::Send { source, .. } | Message::Broadcast { source, .. } => source.as_str(),
        _ => "-",
    };
    match &entry.plaintext {
        Some(text) => println!(
            "Received: {} from {} ({}): {}",
            entry.message.command(),
            source,
            entry.remote,
            text
        ),
        None => println!(
            "Received: {} from {}",
            entry.message.command(),
            entry.remote
        ),
    }
}

/// First IPv4 address the machine's hostname resolves to.
async fn resolve_local_ip() -> String {
    if let Some(host) = hostname::get().ok().and_then(|h| h.into_string().ok()) {
        if let Ok(addrs) = tokio::net::lookup_host((host.as_str(), 0)).await {
            if let Some(ip) = addrs.map(|a| a.ip()).find(|ip| ip.is_ipv4()) {
                return ip.to_string();
            }
        }
    }
    "127.0.0.1".to_string()
}

fn setup_logging(config: &config::LoggingConfig, verbose: bool, node_id: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose { "trace" } else { &config.level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_thread_ids(false)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .with_timer(NodeTimer {
                    node_id: node_id.to_string(),
                })
                .compact()
                .init();
        }
    }
}

// UTC time plus node id, so interleaved logs from several local nodes stay readable
struct NodeTimer {
    node_id: String,
}

impl tracing_subscriber::fmt::time::FormatTime for NodeTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        use chrono::Utc;
        let now = Utc::now();

        // Format: "YYYY-MM-DD HH:MM:SS.mmm [node]"
        write!(
            w,
            "{}.{:03} [{}]",
            now.format("%Y-%m-%d %H:%M:%S"),
            now.timestamp_subsec_millis(),
            self.node_id
        )
    }
}
