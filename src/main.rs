use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use mailpilot::{
    AppState, Config, create_router, dashboard,
    optimizer::{self, ContentOptimizer, OptimizationRequest},
    recipients, startup_checks,
    store::Store,
    templates::{self, TemplateDraft},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Show recipient and sent-email totals
    Stats,

    /// Manage recipients
    #[command(subcommand)]
    Recipients(RecipientCommands),

    /// Manage email templates
    #[command(subcommand)]
    Templates(TemplateCommands),

    /// Render a template for one recipient
    Preview {
        #[arg(short, long)]
        template: String,

        #[arg(short, long)]
        recipient: Option<String>,
    },

    /// Ask the configured AI provider to rewrite a subject and body
    Optimize {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        goal: String,
        #[arg(long)]
        audience: String,
    },
}

#[derive(Subcommand, Debug)]
enum RecipientCommands {
    /// List all recipients
    List,
    /// Import recipients from a CSV file with an 'email' column
    Import { file: PathBuf },
    /// Add a single recipient
    Add {
        email: String,
        /// Personalization field, e.g. --field firstName=Ann
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Delete a recipient by id
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum TemplateCommands {
    /// List all templates
    List,
    /// Create a template
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },
    /// Delete a template by id
    Delete { id: String },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("invalid field '{}', expected name=value", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        Some(Commands::Stats) => handle_stats(config).await,
        Some(Commands::Recipients(cmd)) => handle_recipient_command(config, cmd).await,
        Some(Commands::Templates(cmd)) => handle_template_command(config, cmd).await,
        Some(Commands::Preview {
            template,
            recipient,
        }) => handle_preview(config, template, recipient).await,
        Some(Commands::Optimize {
            subject,
            body,
            goal,
            audience,
        }) => {
            handle_optimize(
                config,
                OptimizationRequest::new(subject, body, goal, audience),
            )
            .await
        }
        None => run_server(config, None, None, None).await,
    }
}

fn load_config(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        info!("Configuration loaded from: {:?}", config_path);
        Ok(toml_edit::de::from_str::<Config>(&config_content)?)
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

async fn handle_stats(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(&config.store.data_directory).await?;
    let stats = dashboard::dashboard(&store).await?;

    println!("Total recipients: {}", stats.total_recipients);
    println!("Emails sent: {}", stats.emails_sent);
    Ok(())
}

async fn handle_recipient_command(
    config: Config,
    cmd: RecipientCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(&config.store.data_directory).await?;

    match cmd {
        RecipientCommands::List => {
            let all = recipients::list_recipients(&store).await?;
            if all.is_empty() {
                println!("No recipients uploaded yet");
                return Ok(());
            }
            let columns = recipients::display_columns(&all);
            println!("id\t{}", columns.join("\t"));
            for recipient in &all {
                let values: Vec<&str> = columns
                    .iter()
                    .map(|column| match column.as_str() {
                        "email" => recipient.email.as_str(),
                        other => recipient.field(other).unwrap_or("-"),
                    })
                    .collect();
                println!("{}\t{}", recipient.id, values.join("\t"));
            }
        }
        RecipientCommands::Import { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            match recipients::import_csv(&store, &text).await {
                Ok(summary) => println!(
                    "{} recipients processed from {}: {} added, {} already present",
                    summary.processed,
                    file.display(),
                    summary.added,
                    summary.skipped
                ),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        RecipientCommands::Add { email, fields } => {
            let recipient = recipients::add_recipient(&store, &email, fields).await?;
            println!("Added recipient '{}' ({})", recipient.email, recipient.id);
        }
        RecipientCommands::Delete { id } => match recipients::delete_recipient(&store, &id).await {
            Ok(removed) => println!("Removed recipient '{}'", removed.email),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

async fn handle_template_command(
    config: Config,
    cmd: TemplateCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(&config.store.data_directory).await?;

    match cmd {
        TemplateCommands::List => {
            let all = templates::list_templates(&store).await?;
            if all.is_empty() {
                println!("No templates yet");
            }
            for template in &all {
                println!(
                    "{}\t{}\t{}\t{}",
                    template.id,
                    template.name,
                    template.subject,
                    template.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        TemplateCommands::Add {
            name,
            subject,
            body,
        } => {
            let template =
                templates::create_template(&store, TemplateDraft::new(name, subject, body))
                    .await?;
            println!("Created template '{}' ({})", template.name, template.id);
        }
        TemplateCommands::Delete { id } => match templates::delete_template(&store, &id).await {
            Ok(removed) => println!("Removed template '{}'", removed.name),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

async fn handle_preview(
    config: Config,
    template_id: String,
    recipient_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(&config.store.data_directory).await?;
    let template = templates::get_template(&store, &template_id).await?;

    let recipient = match recipient_id {
        Some(id) => {
            let found = recipients::list_recipients(&store)
                .await?
                .into_iter()
                .find(|r| r.id == id);
            if found.is_none() {
                eprintln!("Error: Recipient '{}' not found", id);
                std::process::exit(1);
            }
            found
        }
        None => None,
    };

    let preview = templates::preview(&template.subject, &template.body, recipient.as_ref());
    println!("Subject: {}\n\n{}", preview.subject, preview.body);
    Ok(())
}

async fn handle_optimize(
    config: Config,
    request: OptimizationRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(optimizer_config) = &config.optimizer else {
        eprintln!("Error: no [optimizer] section in configuration");
        std::process::exit(1);
    };

    let optimizer = ContentOptimizer::new(optimizer::create_provider(optimizer_config)?);
    let result = optimizer.optimize(&request).await?;

    println!("Optimized Subject: {}", result.optimized_subject);
    println!("Optimized Body:\n{}", result.optimized_body);
    println!("Explanation: {}", result.explanation);
    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Data directory: {:?}", config.store.data_directory);

    // Perform startup checks
    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app = create_router(AppState::new(config).await?);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
