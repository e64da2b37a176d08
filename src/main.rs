use log::{info, warn};
use snafu::ErrorCompat;

use clap::Parser;

mod args;
mod mapping;

fn main() {
    let args = args::Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    info!("args: {:?}", args);

    match mapping::run_cli(&args) {
        Ok(summary) => {
            match mapping::summary_json(&summary) {
                Ok(js) => println!("summary:{}", js),
                Err(e) => warn!("Could not print the run summary: {}", e),
            }
        }
        Err(e) => {
            warn!("Error occured {:?}", e);
            eprintln!("An error occured: {}", e);
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("trace: {}", bt);
            }
            std::process::exit(1);
        }
    }
}
