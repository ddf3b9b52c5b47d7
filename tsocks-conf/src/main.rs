use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::LevelFilter;
use tsocks_conf::logging::{init_logging, LogOptions};
use tsocks_conf::{
    CollectingSink, ConfigLoader, ConfigValidator, LoadStatus, ProxyConfig, RouteDecision,
    Severity, SystemResolver, TracingSink,
};

#[derive(Parser, Debug)]
#[command(name = "tsocks-check")]
#[command(about = "Check a tsocks configuration file and query its routing decisions")]
struct Args {
    /// Config file path
    #[arg(long, short = 'c', env = "TSOCKS_CONF_FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Append log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Prefix log lines with the time and process id
    #[arg(long)]
    timestamps: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report every rejected line and suspicious setting
    Verify,
    /// Print the loaded configuration in evaluation order
    Dump {
        #[arg(long, value_enum, default_value_t = DumpFormat::Text)]
        format: DumpFormat,
    },
    /// Show how a connection to DEST:PORT would be made
    Route {
        dest: Ipv4Addr,
        port: u16,
        /// Resolve the selected server's address
        #[arg(long)]
        resolve: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DumpFormat {
    Text,
    Toml,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let mut log_options = LogOptions::from_env();
    if args.verbose {
        log_options.level = LevelFilter::DEBUG;
    }
    if args.log_file.is_some() {
        log_options.file = args.log_file.clone();
    }
    log_options.timestamps |= args.timestamps;
    init_logging(&log_options)?;

    match args.command {
        Command::Verify => verify(args.config),
        Command::Dump { format } => {
            let loaded = ConfigLoader::load_or_default(args.config, &TracingSink);
            match format {
                DumpFormat::Text => print_text(&loaded.config),
                DumpFormat::Toml => print!("{}", loaded.config.to_toml()?),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Route {
            dest,
            port,
            resolve,
        } => {
            let loaded = ConfigLoader::load_or_default(args.config, &TracingSink);
            let decision = loaded.config.route(dest, port);
            println!("{}:{} {}", dest, port, decision);

            if let (RouteDecision::Proxy(server), true) = (decision, resolve) {
                let server = server.clone();
                let addr = tokio::task::spawn_blocking(move || {
                    server.socket_addr(&SystemResolver::default())
                })
                .await
                .context("resolver task failed")??;
                println!("server address {}", addr);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn verify(path: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let sink = CollectingSink::new();
    let loaded = ConfigLoader::load_or_default(path, &sink);

    for message in sink.with_severity(Severity::Warning) {
        println!("warning: {}", message);
    }
    if let LoadStatus::Missing(e) = &loaded.status {
        println!("warning: {}", e);
    }
    for diagnostic in &loaded.diagnostics {
        println!("error: {}", diagnostic);
    }
    for warning in ConfigValidator::validate(&loaded.config) {
        println!("warning: {}", warning);
    }

    if loaded.has_errors() {
        return Ok(ExitCode::FAILURE);
    }

    println!(
        "configuration OK: {} path(s), {} local network(s)",
        loaded.config.paths.len(),
        loaded.config.local_nets.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn print_text(config: &ProxyConfig) {
    println!("default server: {}", config.default_server);
    print_credentials(&config.default_server);

    println!("local networks:");
    for net in &config.local_nets {
        match net.to_ipnet() {
            Some(cidr) => println!("  {} ({})", net, cidr),
            None => println!("  {}", net),
        }
    }

    if !config.paths.is_empty() {
        println!("paths:");
    }
    for path in &config.paths {
        println!("  path from line {}: {}", path.line, path);
        print_credentials(path);
        for net in &path.reaches {
            println!("    reaches {}", net);
        }
    }
}

fn print_credentials(server: &tsocks_conf::ServerProfile) {
    if let Some(user) = &server.default_user {
        println!("    default user: {}", user);
    }
    if server.default_pass.is_some() {
        println!("    default password: ********");
    }
}
