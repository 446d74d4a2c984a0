//! Command-line sender for CHORDS measurements.
//!
//! Usage: `tochords <config_file>`
//!
//! Starts the background sender, submits a sample weather record ten times
//! at one second intervals, then reports the queue length every second.

use std::{env, process::ExitCode, thread, time::Duration};

use chrono::Local;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tochords::{ChordsClient, ChordsConfig, ClientError, Measurement};

const SAMPLE_RECORD: &str = r#"{
    "inst_id": "1",
    "vars": {
        "at": 1511459453,
        "lcount": 0,
        "ldist": 0,
        "pres": 769.2000000000001,
        "rh": 30,
        "tdry": 13.91,
        "vbat": 3.47
    }
}"#;
const SAMPLE_SUBMISSIONS: usize = 10;
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    setup_logging();

    let args: Vec<String> = env::args().collect();
    let [_, config_path] = args.as_slice() else {
        let program = args.first().map_or("tochords", String::as_str);
        eprintln!("Usage: {program} config_file");
        return ExitCode::from(1);
    };

    let config = match ChordsConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(1);
        }
    };
    let sample = match Measurement::from_json(SAMPLE_RECORD) {
        Ok(m) => m,
        Err(e) => {
            error!("sample record rejected: {e}");
            return ExitCode::from(1);
        }
    };

    let client = ChordsClient::from_config(&config);
    let _sender = client.start();
    info!("sending to {} (max_queue {})", config.chords_host, client.max_queue());

    for _ in 0..SAMPLE_SUBMISSIONS {
        match client.submit_measurement(&sample) {
            Ok(()) => {}
            Err(ClientError::Queue(e)) => warn!("{e}"),
            Err(e) => {
                error!("{e}");
                return ExitCode::from(1);
            }
        }
        thread::sleep(STATUS_INTERVAL);
    }

    loop {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        println!("{now} Queue length: {:05}", client.waiting());
        thread::sleep(STATUS_INTERVAL);
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
