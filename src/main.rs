//! src/main.rs

use std::panic;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use disk_verifier::logging::current_timestamp;
use disk_verifier::{
    run_procedure, BlockStatus, DeviceInfo, Logger, Procedure, ReadTest, ScanConfig, ScanError,
    ScanSummary,
};

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Test device with reading.
    ReadTest {
        #[clap(long)]
        path: PathBuf,
        #[clap(
            long,
            default_value = "ata",
            help = "select operation API: \"posix\" for POSIX read(), \"ata\" for ATA \"READ VERIFY EXT\" command"
        )]
        api: String,
        #[clap(long, default_value_t = 0, help = "set LBA address to begin from")]
        start_lba: u64,
        #[clap(long, help = "Print one JSON object per chunk on stdout.")]
        json: bool,
        #[clap(long, default_value = "disk_verify.log")]
        log_file: PathBuf,
    },
}

fn setup_signal_handler(log: &Logger) {
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C; stopping after the current chunk...");
        STOP_REQUESTED.store(true, Ordering::SeqCst);
    }) {
        log.warn(format!("Could not install Ctrl+C handler: {e}"));
    }
}

fn report_summary(log: &Logger, summary: &ScanSummary) {
    log.info("--- Read Test Summary ---");
    for status in BlockStatus::ALL {
        log.info(format!("  {:<8} {}", status.as_str(), summary.count(status)));
    }
    if let (Some(min), Some(max)) = (summary.min_access_us, summary.max_access_us) {
        log.info(format!("  Access time: min {} us, max {} us, total {:.2?}", min, max, summary.total_access_time()));
    }
    if summary.submission_errors > 0 {
        log.info(format!("  Submission failures: {}", summary.submission_errors));
    }
}

fn read_test(
    log: &mut Logger,
    path: PathBuf,
    api: String,
    start_lba: u64,
    json: bool,
) -> Result<ScanSummary, ScanError> {
    let info = DeviceInfo::query(&path).map_err(|e| {
        log.fatal(format!("Could not determine capacity of {}: {}", path.display(), e));
        ScanError::Resource {
            what: format!("probing {}", path.display()),
            source: e,
        }
    })?;
    log.info(format!("Device {}: {} blocks of 512 bytes", info.path.display(), info.capacity_blocks));

    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta_precise}) {wide_msg}") {
        pb.set_style(style.progress_chars("##-"));
    }
    log.attach_progress(pb.clone());

    let config = ScanConfig { mode: api, start_lba };
    let test = match ReadTest::open(&config, &info, log.clone()) {
        Ok(t) => t,
        Err(e) => {
            pb.finish_and_clear();
            log.detach_progress();
            return Err(e);
        }
    };
    pb.set_length(test.progress().total_chunks);

    let step_log = log.clone();
    let summary = run_procedure(test, &STOP_REQUESTED, log, |report, progress| {
        pb.set_position(progress.completed_chunks);
        if !report.status.is_ok() {
            step_log.warn(format!("lba {}: {} ({} us)", report.lba, report.status, report.elapsed_us));
        }
        if json {
            pb.suspend(|| println!("{}", report.to_json()));
        }
    });

    if summary.interrupted {
        pb.abandon_with_message("Read test interrupted.");
    } else {
        pb.finish_with_message("Read test completed.");
    }
    log.detach_progress();
    if json {
        println!("{}", summary.to_json());
    }
    Ok(summary)
}

fn main_logic(cli: Cli, log: &mut Logger) -> Result<bool, ScanError> {
    setup_signal_handler(log);
    log.info(format!("CLI Command: {:?}", cli));
    match cli.command {
        Commands::ReadTest { path, api, start_lba, json, log_file: _ } => {
            let summary = read_test(log, path, api, start_lba, json)?;
            report_summary(log, &summary);
            Ok(summary.bad_chunks() == 0 && summary.submission_errors == 0 && !summary.interrupted)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let log_path = match &cli.command {
        Commands::ReadTest { log_file, .. } => log_file.clone(),
    };
    let mut log = match Logger::with_file(&log_path) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[{}] Failed to open log file '{}': {}. Further logs will only go to stderr.", current_timestamp(), log_path.display(), e);
            Logger::default()
        }
    };
    let panic_log = log.clone();
    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| main_logic(cli, &mut log)));
    let exit_code = match result {
        Ok(Ok(true)) => {
            panic_log.info("Read test completed; all chunks OK.");
            0
        }
        Ok(Ok(false)) => {
            panic_log.info("Read test finished with bad chunks or was interrupted.");
            1
        }
        Ok(Err(e)) => {
            panic_log.fatal(format!("Read test failed: {}", e));
            1
        }
        Err(payload) => {
            let mut msg = "A critical error occurred: read test panicked!".to_string();
            if let Some(s) = payload.downcast_ref::<String>() {
                msg.push_str(&format!("\nPanic message: {}", s));
            } else if let Some(s) = payload.downcast_ref::<&str>() {
                msg.push_str(&format!("\nPanic message: {}", s));
            }
            panic_log.fatal(msg);
            101
        }
    };
    process::exit(exit_code);
}
