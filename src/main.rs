use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use medfeedback::config::FeedbackConfig;
use medfeedback::dialog::DialogConfig;
use medfeedback::error::{classify, ApiFailure, Entity, ErrorContext};
use medfeedback::logging::{init_logging, LogLevel, LoggingConfig};
use medfeedback::ui::FeedbackRenderer;
use medfeedback::FeedbackHub;

#[derive(Parser, Debug)]
#[command(name = "medfeedback")]
#[command(version)]
#[command(about = "Toasts, dialogs and retry-with-backoff for the patient-records admin")]
struct Cli {
    /// Disable colors (also respects NO_COLOR environment variable)
    #[arg(long, global = true)]
    no_color: bool,

    /// Suppress log output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Map an API failure to the message a user would see
    Classify {
        /// HTTP status of the failed response (0 for a network failure)
        #[arg(long, short)]
        status: Option<u16>,

        /// Backend or client error message
        #[arg(long, short)]
        message: Option<String>,

        /// Raw client error as JSON, e.g. '{"response":{"status":409}}'
        #[arg(long, conflicts_with_all = ["status", "message"])]
        json: Option<String>,

        /// Record type the request was about
        #[arg(long, short)]
        entity: Option<Entity>,
    },
    /// Print the effective configuration as JSON
    Config {
        /// Path to a TOML configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Run a scripted save-fail-retry-confirm scenario
    Demo {
        /// Path to a TOML configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Multiplier applied to retry delays (0 runs without waiting)
        #[arg(long, default_value = "1.0", value_name = "FACTOR")]
        time_scale: f64,
    },
}

fn load_config(path: Option<&Path>) -> Result<FeedbackConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => FeedbackConfig::load(path)?,
        None => FeedbackConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let logging = if cli.quiet {
        LoggingConfig::new().with_level(LogLevel::Off)
    } else {
        LoggingConfig::from_verbosity(cli.verbose)
    };
    init_logging(logging);

    let use_color = !cli.no_color && std::env::var("NO_COLOR").is_err();
    let renderer = FeedbackRenderer::new().with_colors(use_color);

    match cli.command {
        Commands::Classify {
            status,
            message,
            json,
            entity,
        } => {
            let failure = match json {
                Some(json) => ApiFailure::from_json(&json)?,
                None => ApiFailure::new(status, message),
            };
            let category = classify(&failure);
            println!("{}: {}", category, category.user_message(entity));
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Demo { config, time_scale } => {
            if !time_scale.is_finite() || time_scale < 0.0 {
                eprintln!("--time-scale must be a non-negative number, got {}", time_scale);
                return Ok(ExitCode::from(2));
            }
            let mut config = load_config(config.as_deref())?;
            scale_retry(&mut config, time_scale);
            run_demo(FeedbackHub::new(config), &renderer).await;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn scale_retry(config: &mut FeedbackConfig, factor: f64) {
    let scale = |ms: u64| (ms as f64 * factor).round() as u64;
    config.retry.initial_delay_ms = scale(config.retry.initial_delay_ms);
    config.retry.max_delay_ms = scale(config.retry.max_delay_ms);
}

async fn run_demo(hub: FeedbackHub, renderer: &FeedbackRenderer) {
    // The backend refuses connections for the first three calls.
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let save = move || {
        let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if call <= 3 {
                Err(ApiFailure::network(format!("connect ECONNREFUSED (call {})", call)))
            } else {
                Ok(format!("medico-{}", 40 + call))
            }
        }
    };
    let controller = hub.retry_controller(save.clone());

    println!("== Saving doctor ==");
    if let Err(failure) = save().await {
        hub.errors().handle_api_error(
            &failure,
            ErrorContext::new()
                .entity(Entity::Medico)
                .retry(controller.retry_callback()),
        );
    }
    let toasts = hub.notifications().list();
    println!("{}", renderer.render_notifications(&toasts));

    println!();
    println!("== User clicks the toast action ==");
    let mut progress = controller.subscribe();
    if let Some(toast) = toasts.iter().find(|t| t.action().is_some()) {
        hub.notifications().invoke_action(toast.id());
    }
    while progress.changed().await.is_ok() {
        let state = progress.borrow_and_update().clone();
        println!("{}", renderer.render_retry(&state, controller.config()));
        if state.is_settled() {
            break;
        }
    }
    if let Some(id) = controller.state().data {
        hub.notifications().success(format!("Médico salvo ({}).", id));
    }
    println!("{}", renderer.render_notifications(&hub.notifications().list()));

    println!();
    println!("== Deleting a doctor with linked exams ==");
    let response = hub.dialogs().show_confirm(
        DialogConfig::new()
            .title("Excluir médico")
            .message("Deseja realmente excluir este médico?")
            .confirm_label("Excluir")
            .on_confirm(|| async { Err::<(), _>(ApiFailure::with_status(409)) }),
    );
    println!("{}", renderer.render_dialogs(&hub.dialogs().dialogs()));

    let id = response.id();
    if let Err(err) = hub.dialogs().confirm(id).await {
        eprintln!("{}", err);
    }
    if !response.await {
        hub.errors().medico_delete_blocked();
    }
    println!("{}", renderer.render_dialogs(&hub.dialogs().dialogs()));
    println!("{}", renderer.render_notifications(&hub.notifications().list()));
}
