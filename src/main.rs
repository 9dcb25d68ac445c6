use log::{error, info};
use p1gateway::hal::serial::SerialLineSource;
use p1gateway::hal::ControlLines;
use p1gateway::hub::{ChannelSink, JsonLogSink};
use p1gateway::{Config, P1Reader};
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let default_filter = std::env::var("P1GW_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let config = Config::load()?;

    let lines = SerialLineSource::open(&config.serial.port, config.serial.baud)?;

    #[cfg(feature = "gpio")]
    let control: Box<dyn ControlLines> = Box::new(p1gateway::hal::gpio::GpioControlLines::new(
        config.gpio.data_request_pin,
        config.gpio.output_enable_pin,
    )?);
    #[cfg(not(feature = "gpio"))]
    let control: Box<dyn ControlLines> = Box::new(p1gateway::NullControlLines);

    let mut reader = P1Reader::new(config.p1.clone(), Box::new(lines), control);

    // every completed snapshot goes to the log as JSON and onto a channel
    // for downstream consumers
    reader.hub_mut().subscribe(Box::new(JsonLogSink));
    let (sink, mut snapshots) = ChannelSink::new(10);
    reader.hub_mut().subscribe(Box::new(sink));

    tokio::spawn(async move {
        while let Some(record) = snapshots.recv().await {
            info!(
                "New measurement: tariff {} used_t1={} used_t2={} delivered={}",
                record.tariff_indicator,
                record.electricity_used_tariff1,
                record.electricity_used_tariff2,
                record.actual_power_delivered
            );
        }
        error!("Snapshot channel closed");
    });

    info!("P1 gateway started, polling every {}s", config.p1.interval);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    loop {
        ticker.tick().await;
        reader.tick(Instant::now());
    }
}
