//! # Meme Viber
//!
//! Command-line host for the Meme Viber editor.

use anyhow::Context;
use clap::Parser;
use meme_app::{
    export_board, load_script, AppConfig, CliArgs, Command, DonationFlow, DonationForm,
    PaymentClient, Session,
};
use meme_core::Editor;
use meme_renderer::Renderer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels.
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,meme_core=debug,meme_renderer=debug,meme_app=debug")
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = AppConfig::from(&args);
    tracing::debug!(?config, "Resolved configuration");

    match args.command {
        Command::Render { out, format, force } => {
            let editor = Editor::restore(config.editor_config(), config.persistence());
            let renderer = Renderer::new(config.renderer_config());
            let path = export_board(&editor, &renderer, format, out.as_deref(), force)
                .context("Failed to export board")?;
            println!("{}", path.display());
        }

        Command::Replay {
            script,
            out,
            format,
        } => {
            let events = load_script(&script)
                .with_context(|| format!("Failed to load {}", script.display()))?;
            let editor = Editor::restore(config.editor_config(), config.persistence());
            let session = Session::new(editor, config.autosave_every);

            tokio::select! {
                result = session.replay(events) => {
                    result.context("Replay failed")?;
                }
                _ = tokio::signal::ctrl_c() => {
                    // The dropped replay future has already stopped autosave.
                    tracing::warn!("Interrupted, saving before exit");
                    session.close().context("Final save failed")?;
                    return Ok(());
                }
            }

            if let Some(out) = out {
                let renderer = Renderer::new(config.renderer_config());
                let path = session
                    .editor()
                    .with(|editor| export_board(editor, &renderer, format, Some(&out), false))
                    .context("Failed to export board")?;
                println!("{}", path.display());
            }
        }

        Command::Reset => {
            config
                .persistence()
                .clear()
                .context("Failed to clear saved board")?;
            tracing::info!(dir = %config.storage_dir.display(), "Saved board cleared");
        }

        Command::Donate {
            phone,
            amount,
            name,
        } => {
            let client = PaymentClient::new(&config.payment_endpoint, config.payment_timeout)
                .context("Failed to create payment client")?;
            let flow = DonationFlow::new(client);
            let form = DonationForm {
                phone,
                amount,
                name,
            };
            match flow.submit(&form).await {
                Ok(_) => println!("Thank you for your donation!"),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
