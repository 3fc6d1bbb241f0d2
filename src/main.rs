use color_eyre::{eyre::eyre, Result};
use dualshock::config::Config;
use dualshock::controller::ControllerHandle;
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    color_eyre::install()?;

    let config_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;
    setup_logging(&config.logging.level)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let shutdown_timeout = config.controller.shutdown_timeout();
    let result = runtime.block_on(run(config));

    // A reader detached by stop() may still sit in a blocking read
    runtime.shutdown_timeout(shutdown_timeout);
    result
}

async fn run(config: Config) -> Result<()> {
    info!("Opening controller device {}", config.device.path.display());
    let device = File::open(&config.device.path)
        .map_err(|e| eyre!("Failed to open {}: {}", config.device.path.display(), e))?;

    let mut controller = ControllerHandle::start(device, Some(config.controller.clone()))?;

    let mut errors = controller.errors()?;
    let error_log = tokio::spawn(async move {
        while let Some(e) = errors.recv().await {
            warn!("Controller error: {}", e);
        }
    });

    let stopper = controller.stopper();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received"),
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
        stopper.stop();
    });

    let mut last_buttons = None;
    controller
        .listen(|state| {
            debug!("{:?}", state);
            let buttons = (
                state.cross,
                state.circle,
                state.square,
                state.triangle,
                state.dpad(),
                state.ps_home,
            );
            if last_buttons != Some(buttons) {
                info!(
                    "Buttons: {:?}, sticks L{:?} R{:?}, battery {}",
                    buttons, state.left_stick, state.right_stick, state.battery_level
                );
                last_buttons = Some(buttons);
            }
        })
        .await;

    // Stopping ends the error stream, so the logger drains and exits
    controller.stop().await;
    error_log.await?;
    Ok(())
}

fn setup_logging(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .map_err(|e| eyre!("Invalid log level {:?}: {}", level, e))?;
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
    Ok(())
}
