//! eziolcd: command-line control for the EZIO-G500 panel.
//!
//! ```text
//! eziolcd [--port PATH] [--config FILE] [-v...] [--dry-run] <command>
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ezio::config::Config;
use ezio::display::system_status_template;
use ezio::link::hex_preview;
use ezio::menu::{MenuEngine, MetricsFeed, SystemMenuBuilder};
use ezio::provider::MetricsProvider;
use ezio::providers::{ReplayMetrics, SystemMetrics};
use ezio::status::StatusEngine;
use ezio::status::text::draw_bar;
use ezio::{ButtonSource, Display, Ezio, Led, LedColor, MemoryPortHandle};

#[derive(Parser, Debug)]
#[command(name = "eziolcd", version, about = "Control the EZIO-G500 front-panel LCD")]
struct Cli {
    /// Serial port of the panel (overrides the configuration file)
    #[arg(long, value_name = "PATH", global = true)]
    port: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Send everything to an in-memory port instead of the device
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show text using the panel's built-in text mode
    Text {
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Clear the panel
    Clear,
    /// Set the backlight level
    Backlight { level: u8 },
    /// Set an LED color
    Led {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=3))]
        led: u8,
        /// off, red, green or orange
        color: LedColor,
    },
    /// Show the system status page once
    Status,
    /// Run the rotating status display until interrupted
    Daemon {
        /// Play metrics from a YAML replay script instead of the host
        #[arg(long, value_name = "FILE")]
        replay: Option<PathBuf>,
        /// Metrics refresh interval (overrides the configuration file)
        #[arg(long, value_name = "SECS")]
        refresh: Option<u64>,
    },
    /// Print button presses until interrupted
    Buttons,
    /// Run the interactive menu
    Menu,
    /// Cycle through drawing and LED demos
    Demo,
    /// Write text to the port without any command bytes
    Raw {
        #[arg(required = true)]
        text: Vec<String>,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves once Ctrl-C (or SIGTERM on Unix) is received.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(error) => warn!("SIGTERM handler unavailable: {}", error),
        }
    }
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!("Ctrl-C handler unavailable: {}", error);
        std::future::pending::<()>().await;
    }
}

fn open_display(cli: &Cli, config: &Config) -> anyhow::Result<(Display, Option<MemoryPortHandle>)> {
    if cli.dry_run {
        info!("Dry run: writing to memory instead of {}", config.link.port.display());
        let (display, port) = Ezio::dry_run(config.link.options());
        return Ok((display, Some(port)));
    }
    let display = Ezio::open_config(config)
        .with_context(|| format!("opening {}", config.link.port.display()))?;
    Ok((display, None))
}

fn report_dry_run(port: Option<&MemoryPortHandle>) {
    if let Some(port) = port {
        let written = port.written();
        println!("dry run: {} bytes [{}]", written.len(), hex_preview(&written));
    }
}

fn metrics_provider(
    config: &Config,
    replay: Option<&PathBuf>,
) -> anyhow::Result<Box<dyn MetricsProvider>> {
    Ok(match replay {
        Some(path) => Box::new(
            ReplayMetrics::load(path)
                .with_context(|| format!("loading replay {}", path.display()))?,
        ),
        None => Box::new(SystemMetrics::with_descriptions(config.interfaces.clone())),
    })
}

async fn goodbye(display: &mut Display) -> ezio::Result<()> {
    display.clear();
    display.draw_rect(0, 0, 128, 64);
    display.print(40, 28, "GOODBYE");
    display.update().await
}

async fn cmd_text(display: &mut Display, message: &str) -> anyhow::Result<()> {
    let link = display.device_mut();
    link.init().await?;
    link.home().await?;
    link.clear().await?;
    link.write_text(message).await?;
    link.flush().await.context("sending text")
}

async fn cmd_clear(display: &mut Display) -> anyhow::Result<()> {
    let link = display.device_mut();
    link.init().await?;
    link.home().await?;
    link.clear().await?;
    link.flush().await.context("clearing panel")
}

async fn cmd_backlight(display: &mut Display, level: u8) -> anyhow::Result<()> {
    display.device_mut().init().await?;
    display.set_backlight(level).await.context("setting backlight")
}

async fn cmd_led(display: &mut Display, number: u8, color: LedColor) -> anyhow::Result<()> {
    let led = Led::from_number(number)
        .ok_or_else(|| ezio::LcdError::invalid_argument("LED number must be 1-3"))?;
    display.device_mut().init().await?;
    display.set_led(led, color).await.with_context(|| format!("setting {led} {color}"))
}

async fn cmd_status(display: &mut Display, config: &Config) -> anyhow::Result<()> {
    let mut provider = SystemMetrics::with_descriptions(config.interfaces.clone());
    let metrics = provider.get_metrics().await.context("collecting metrics")?;
    system_status_template(&metrics).render(display).await?;
    Ok(())
}

async fn cmd_daemon(
    display: Display,
    config: &Config,
    replay: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let provider = metrics_provider(config, replay)?;
    let port = display.device().path().to_path_buf();
    info!(
        "Starting status daemon on {} (refresh {:?}, rotate {:?})",
        port.display(),
        config.status.refresh_interval(),
        config.status.rotate_interval()
    );

    let shared = display.into_shared();
    let mut engine = StatusEngine::spawn(shared.clone(), provider, config.status.clone());
    shutdown_signal().await;
    engine.stop().await;
    info!("Status daemon stopped after {} frames", engine.frames());

    shared.lock().await.close().await?;
    Ok(())
}

async fn cmd_buttons(display: &mut Display, config: &Config) -> anyhow::Result<()> {
    let session = display.device_mut().start_session().context("starting button session")?;
    let source = ButtonSource::with_config(
        session,
        config.buttons.poll_interval(),
        config.buttons.queue_capacity,
    );
    let (mut events, mut poller) = source.channel();

    println!("Press buttons on the panel. Ctrl-C to exit.");
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            button = events.recv() => match button {
                Some(button) => println!("Button pressed: {} (0x{:02X})", button, button.code()),
                None => break,
            },
        }
    }
    poller.stop().await;
    Ok(())
}

async fn cmd_menu(mut display: Display, config: &Config) -> anyhow::Result<()> {
    let session = display.device_mut().start_session().context("starting button session")?;
    let source = ButtonSource::with_config(
        session,
        config.buttons.poll_interval(),
        config.buttons.queue_capacity,
    );
    let (events, mut poller) = source.channel();

    let shared = display.into_shared();
    let feed = MetricsFeed::new(SystemMetrics::with_descriptions(config.interfaces.clone()));
    let tree = SystemMenuBuilder::new(shared.clone(), feed)
        .visible_rows(config.menu.visible_rows)
        .build()
        .await;
    let mut engine =
        MenuEngine::new(tree, shared.clone()).with_failure_policy(config.menu.failure_policy);

    let outcome = tokio::select! {
        result = engine.run(events) => result,
        _ = shutdown_signal() => {
            debug!("Interrupted, leaving menu");
            goodbye(&mut *shared.lock().await).await
        }
    };
    poller.stop().await;
    shared.lock().await.close().await?;
    outcome.context("menu")
}

async fn cmd_demo(display: &mut Display) -> anyhow::Result<()> {
    let pause = Duration::from_secs(2);

    println!("Demo 1: graphics text");
    display.clear();
    display.draw_rect(0, 0, 128, 64);
    display.print(5, 5, "EZIO-G500");
    display.print(5, 25, "RUST DRIVER");
    display.print(5, 45, "DEMO MODE");
    display.update().await?;
    tokio::time::sleep(pause).await;

    println!("Demo 2: drawing primitives");
    display.clear();
    display.draw_rect(0, 0, 128, 64);
    display.draw_line(0, 0, 127, 63);
    display.draw_line(127, 0, 0, 63);
    display.frame_buffer_mut().draw_circle(64, 32, 20, true);
    display.frame_buffer_mut().fill_round_rect(36, 24, 56, 16, 4, false);
    display.print(40, 28, "GRAPHICS");
    display.update().await?;
    tokio::time::sleep(pause).await;

    println!("Demo 3: progress bar");
    for step in 0..=20 {
        let percent = f64::from(step) * 5.0;
        display.clear();
        display.draw_rect(0, 0, 128, 64);
        display.print(35, 8, "LOADING...");
        draw_bar(display.frame_buffer_mut(), 10, 25, 108, 12, percent);
        display.print(52, 45, &format!("{percent:.0}%"));
        display.update().await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!("Demo 4: LED cycling");
    for led in Led::ALL {
        for color in [LedColor::Red, LedColor::Green, LedColor::Orange] {
            display.set_led(led, color).await?;
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        display.set_led(led, LedColor::Off).await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    display.clear();
    display.draw_rect(0, 0, 128, 64);
    display.print(15, 28, "DEMO COMPLETE");
    display.update().await?;
    Ok(())
}

async fn cmd_raw(display: &mut Display, text: &str) -> anyhow::Result<()> {
    let link = display.device_mut();
    link.write_text(text).await?;
    link.flush().await.context("writing raw text")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config =
        Config::load_or_default(cli.config.as_deref()).context("loading configuration")?;
    if let Some(port) = &cli.port {
        config.link.port = port.clone();
    }
    if let Command::Daemon { refresh: Some(secs), .. } = &cli.command {
        config.status.refresh_interval_ms = secs.saturating_mul(1000);
    }

    let (mut display, dry_run) = open_display(&cli, &config)?;

    match &cli.command {
        Command::Text { message } => cmd_text(&mut display, &message.join(" ")).await?,
        Command::Clear => cmd_clear(&mut display).await?,
        Command::Backlight { level } => cmd_backlight(&mut display, *level).await?,
        Command::Led { led, color } => cmd_led(&mut display, *led, *color).await?,
        Command::Status => cmd_status(&mut display, &config).await?,
        Command::Daemon { replay, .. } => {
            cmd_daemon(display, &config, replay.as_ref()).await?;
            report_dry_run(dry_run.as_ref());
            return Ok(());
        }
        Command::Buttons => cmd_buttons(&mut display, &config).await?,
        Command::Menu => {
            cmd_menu(display, &config).await?;
            report_dry_run(dry_run.as_ref());
            return Ok(());
        }
        Command::Demo => cmd_demo(&mut display).await?,
        Command::Raw { text } => cmd_raw(&mut display, &text.join(" ")).await?,
    }

    display.close().await.context("closing panel")?;
    report_dry_run(dry_run.as_ref());
    Ok(())
}
