//! Quotewire CLI and relay server entry point.
//!
//! Binary name: `qwire`
//!
//! Parses CLI arguments, then either starts the relay HTTP server or
//! runs the interactive terminal chat client against one.

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use quotewire_infra::config::{load_relay_config, resolve_data_dir};
use quotewire_infra::webhook::WebhookDispatcher;
use quotewire_types::session::UserContext;

use quotewire_api::cli::{self, Cli, Commands};
use quotewire_api::http;
use quotewire_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,quotewire=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "qwire", &mut std::io::stdout());
        return Ok(());
    }

    match cli.command {
        Commands::Serve { port, host, memory } => {
            let state = AppState::init(memory).await?;

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Quotewire relay listening on {}",
                console::style("*").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Chat {
            server,
            name,
            tech_id,
            role,
        } => {
            let data_dir = resolve_data_dir();
            let config = load_relay_config(&data_dir).await;

            let user = name.map(|handle| {
                let ctx = UserContext::new(handle, tech_id.unwrap_or_else(|| "0".to_string()));
                match role {
                    Some(role) => ctx.with_role(role),
                    None => ctx,
                }
            });

            cli::chat::run_chat(&config, &server, user).await?;
        }

        Commands::Feedback { name, message } => {
            let data_dir = resolve_data_dir();
            let config = load_relay_config(&data_dir).await;
            let dispatcher = WebhookDispatcher::new(
                config.webhook.url.clone(),
                config.webhook.feedback_url.clone(),
                config.webhook.source.clone(),
            );

            match dispatcher.send_feedback(&name, &message).await {
                Ok(()) => {
                    if cli.json {
                        println!("{}", serde_json::json!({ "status": "sent" }));
                    } else {
                        println!("  {} Feedback sent.", console::style("*").cyan().bold());
                    }
                }
                Err(e) => {
                    if cli.json {
                        eprintln!(
                            "{}",
                            serde_json::json!({ "status": "error", "error": e.to_string() })
                        );
                    } else {
                        eprintln!(
                            "  {} Could not send feedback: {e}",
                            console::style("!").red().bold()
                        );
                    }
                    std::process::exit(1);
                }
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
