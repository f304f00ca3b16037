use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use gradeflow::config::default_database_path;
use gradeflow::{load_config, Config, Database, GradeflowError, Pipeline, Trigger, WorkerPool};

/// Process submissions, or re-apply the plagiarism penalty after a severity change.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON config file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Only recompute the final score of completed submissions
    #[arg(long)]
    recompute: bool,
    /// Submission ids to process
    #[arg(required = true)]
    submission_ids: Vec<String>,
}

fn run(args: Args) -> Result<usize, GradeflowError> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let db_path = config
        .database_path
        .as_ref()
        .map(PathBuf::from)
        .or_else(default_database_path)
        .ok_or_else(|| gradeflow::PersistenceError::Unavailable(
            "no database_path configured and no home directory found".to_string(),
        ))?;
    let db = Database::open(&db_path)?;

    let pipeline = Arc::new(Pipeline::from_config(
        &config,
        Arc::new(db.clone()),
        Arc::new(db),
    )?);
    let pool = WorkerPool::new(pipeline, config.worker_count, config.queue_capacity());

    for id in &args.submission_ids {
        if args.recompute {
            pool.submit_recompute(id)?;
        } else {
            pool.submit_for_processing(id)?;
        }
    }

    let mut failures = 0;
    for _ in 0..args.submission_ids.len() {
        let Some(result) = pool.recv_result() else {
            break;
        };
        match &result.outcome {
            Ok(report) if report.error.is_none() => log::info!(
                "{}: {} (final score {:?}, plagiarism {:?})",
                report.submission_id,
                report.status,
                report.final_score,
                report.plagiarism_result
            ),
            Ok(report) => {
                failures += 1;
                log::error!(
                    "{}: {} ({})",
                    report.submission_id,
                    report.status,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
            Err(e) => {
                failures += 1;
                log::error!("{}: {}", result.submission_id, e);
            }
        }
    }

    pool.wait();
    Ok(failures)
}

fn main() -> ExitCode {
    if let Err(e) = gradeflow::logging::init_tracing("info") {
        eprintln!("Failed to initialise logging: {}", e);
    }

    let args = Args::parse();

    if let Err(e) = ctrlc::set_handler(|| {
        log::warn!("Interrupted; in-flight submissions stay in Processing");
        std::process::exit(130);
    }) {
        log::warn!("Failed to install signal handler: {}", e);
    }

    match run(args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            log::error!("{} submission(s) failed", failures);
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
