use log::LevelFilter;
use rustyperipheral::Result;

#[tokio::main]
async fn main() {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run().await {
        log::error!("{error}");
        std::process::exit(1);
    }
}

#[cfg(target_os = "macos")]
async fn run() -> Result<()> {
    use rustyperipheral::api::peripheral_event::PeripheralEvent;
    use rustyperipheral::catalog::Catalog;
    use rustyperipheral::config::PeripheralConfig;
    use rustyperipheral::corebluetooth::CoreBluetoothPeripheral;
    use rustyperipheral::data_source::SyntheticSource;
    use rustyperipheral::peripheral::Peripheral;
    use tokio::sync::mpsc;

    let config = PeripheralConfig::default();
    let (sender_tx, receiver_rx) = mpsc::channel::<PeripheralEvent>(config.event_buffer);
    let manager = CoreBluetoothPeripheral::new(sender_tx)?;
    let peripheral = Peripheral::new(
        manager,
        SyntheticSource::standard(),
        Catalog::standard(),
        config,
    );

    tokio::select! {
        result = peripheral.run(receiver_rx) => result,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutting down");
            peripheral.shutdown().await;
            Ok(())
        }
    }
}

#[cfg(not(target_os = "macos"))]
async fn run() -> Result<()> {
    use rustyperipheral::{Error, ErrorType};

    Err(Error::from_string(
        "no Bluetooth transport for this platform, try `cargo run --example simulated`"
            .to_string(),
        ErrorType::Precondition,
    ))
}
