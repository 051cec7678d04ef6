use color_eyre::{eyre::eyre, Result};
use gcbridge::{
    ControllerRegistry, GilrsDevice, PendingDiscovery, RegistryError, RegistryEvent,
    SessionSettings,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let settings = SessionSettings::load().await?;
    setup_logging(&settings);
    info!("Starting input session with settings: {:?}", settings);

    let shutdown = CancellationToken::new();
    let device = Arc::new(
        GilrsDevice::spawn(settings.gilrs_settings(), shutdown.clone())
            .await
            .map_err(|e| eyre!("Failed to start device layer: {}", e))?,
    );

    let mut registry = ControllerRegistry::new(device.clone());
    registry.initialize();
    let mut registry_events = registry.subscribe();

    for controller in registry.enumerate() {
        info!("Controller present at start-up: {}", controller.handle());
    }

    let mut discovery = None;
    if settings.wireless_discovery {
        match registry.start_wireless_discovery() {
            Ok(pending) => discovery = Some(pending),
            Err(e) => warn!("Could not start wireless discovery: {}", e),
        }
    }

    let mut ticker = tokio::time::interval(settings.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Entering input loop, press Ctrl+C to quit");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                registry.tick();
                handle_registry_events(&registry, &mut registry_events, &settings);
                report_edges(&mut registry, &settings);

                if !device.is_running() {
                    error!("Gilrs collector stopped unexpectedly");
                    break;
                }
            }
            result = wait_for_discovery(&mut discovery) => {
                discovery = None;
                match result {
                    Ok(()) => info!("Wireless discovery finished, {} controller(s) known", registry.len()),
                    Err(e) => warn!("Wireless discovery ended early: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down input session");
                break;
            }
        }
    }

    for controller in registry.controllers() {
        info!("Still connected at shutdown: {}", controller.handle());
    }

    shutdown.cancel();
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn setup_logging(settings: &SessionSettings) {
    FmtSubscriber::builder()
        .with_max_level(settings.max_level())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

async fn wait_for_discovery(pending: &mut Option<PendingDiscovery>) -> Result<(), RegistryError> {
    match pending {
        Some(pending) => pending.await,
        None => std::future::pending().await,
    }
}

fn handle_registry_events(
    registry: &ControllerRegistry,
    events: &mut mpsc::UnboundedReceiver<RegistryEvent>,
    settings: &SessionSettings,
) {
    while let Ok(event) = events.try_recv() {
        let handle = event.handle();
        match &event {
            RegistryEvent::ControllerConnected(_) => {
                info!("Controller connected: {}", handle);
                let Some(color) = settings.light_color else {
                    continue;
                };
                if let Some(controller) = registry.get(&handle.id) {
                    controller.set_light_color(color.red, color.green, color.blue);
                }
            }
            RegistryEvent::ControllerDisconnected { last_state, .. } => {
                info!(
                    "Controller disconnected: {} (battery {:.0}%)",
                    handle,
                    last_state.battery_level * 100.0
                );
            }
        }
    }
}

fn report_edges(registry: &mut ControllerRegistry, settings: &SessionSettings) {
    for controller in registry.controllers_mut() {
        for &input in &settings.watched_inputs {
            if controller.button_down(input, settings.button_threshold) {
                info!(
                    "{}: {} pressed ({:.2})",
                    controller.handle(),
                    input,
                    controller.input_value(input)
                );
            } else if controller.button_up(input, settings.button_threshold) {
                info!("{}: {} released", controller.handle(), input);
            }
        }

        debug!(
            "{}: battery {:.0}% ({:?})",
            controller.id(),
            controller.battery_level() * 100.0,
            controller.battery_state()
        );
    }
}
