use crisprank::param;
use crisprank::run;
use flexi_logger::{Duplicate, FileSpec, Logger, LoggerHandle};
use log::{error, info};
use std::error::Error;
use std::process;

fn start_logger(param: &param::Param) -> Result<LoggerHandle, Box<dyn Error>> {
    let logger = Logger::try_with_str(&param.general.log_level)?;
    let handle = if param.general.log_base.is_empty() {
        logger.start()?
    } else {
        logger
            .log_to_file(
                FileSpec::default()
                    .basename(&param.general.log_base)
                    .suffix(&param.general.log_suffix)
                    .use_timestamp(true),
            )
            .duplicate_to_stderr(Duplicate::Info)
            .start()?
    };
    Ok(handle)
}

fn main() {
    let param_path = std::env::args().nth(1).unwrap_or_else(|| "param.yaml".to_string());

    let param = match param::get(param_path.clone()) {
        Ok(param) => param,
        Err(e) => {
            eprintln!("Cannot read parameters from {}: {}", param_path, e);
            process::exit(1);
        }
    };

    let _logger = match start_logger(&param) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Cannot start logging: {}", e);
            process::exit(1);
        }
    };

    info!("crisprank v{} with parameters {}", crisprank::report::version(), param_path);

    let report = match run(&param) {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    println!("{}", report.display(param.general.display_colorful));

    if !param.output.directory.is_empty() {
        if let Err(e) = report.export_csv(&param.output.directory) {
            error!("CSV export to {} failed: {}", param.output.directory, e);
            process::exit(1);
        }
    }

    if !param.output.save_report.is_empty() {
        match report.save_auto(&param.output.save_report) {
            Ok(()) => info!("Report saved to {}", param.output.save_report),
            Err(e) => {
                error!("Cannot save report to {}: {}", param.output.save_report, e);
                process::exit(1);
            }
        }
    }
}
