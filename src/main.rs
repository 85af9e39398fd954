use clap::Parser;
use exr_inspect::analysis::{AnalysisReport, ComparisonResult};
use exr_inspect::app::{ComparisonSummary, ReportSummary};
use exr_inspect::{AnalysisService, AnalysisSession, AppError, Configuration, FileDecoder, Slot};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "exr-inspect")]
#[command(version, about = "Bit-depth, color encoding and scope analysis for HDR images", long_about = None)]
struct Cli {
    /// Image to analyze, prompted for on stdin when omitted
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Second image to compare against the first
    #[arg(long, value_name = "PATH")]
    compare: Option<PathBuf>,

    /// Configuration file (toml, json or yaml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a AnalysisReport,
    comparison_report: Option<&'a AnalysisReport>,
    comparison: Option<ComparisonResult>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn prompt_for_path() -> Result<Option<PathBuf>, AppError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Path to image: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let trimmed = line.trim().trim_matches('"');
    Ok((!trimmed.is_empty()).then(|| PathBuf::from(trimmed)))
}

async fn print_results(session: &AnalysisSession, json: bool) -> Result<(), AppError> {
    let Some(report) = session.report(Slot::Primary).await else {
        return Ok(());
    };
    let comparison_report = session.report(Slot::Comparison).await;
    let comparison = session.compare().await;

    if json {
        let output = JsonOutput {
            report: &report,
            comparison_report: comparison_report.as_deref(),
            comparison,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", ReportSummary(&report));
    if let (Some(other), Some(result)) = (comparison_report.as_deref(), comparison.as_ref()) {
        println!(
            "{}",
            ComparisonSummary {
                a: &report,
                b: other,
                result,
            }
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let configuration = Configuration::load(cli.config.as_deref())?;
    let service = AnalysisService::from_configuration(&configuration)?;
    let session = AnalysisSession::new(Arc::new(FileDecoder::new()), service);

    let path = match cli.path {
        Some(path) => path,
        None => match prompt_for_path().await? {
            Some(path) => path,
            None => {
                info!("No file selected");
                return Ok(());
            }
        },
    };

    if let Err(e) = session.load(Slot::Primary, &path).await {
        error!("Failed to analyze {}: {}", path.display(), e);
        return Ok(());
    }

    if let Some(compare_path) = &cli.compare {
        if let Err(e) = session.load(Slot::Comparison, compare_path).await {
            error!("Failed to analyze {}: {}", compare_path.display(), e);
        }
    }

    print_results(&session, cli.json).await
}
