mod api_client;
mod config;
mod data;
mod error;
mod export;
mod report;
mod request;
mod runner;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use config::Config;
use error::Error;
use export::ExportFormat;
use log::{error, info};
use request::Granularity;

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Report,
}

#[derive(Subcommand)]
enum Report {
    /// Campaign report grouped by country or region
    Campaigns {
        #[arg(help = "Date should be in the form YYYY-MM-DD", value_parser = validate_date)]
        start: NaiveDate,

        #[arg(help = "Date should be in the form YYYY-MM-DD", value_parser = validate_date)]
        end: NaiveDate,

        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },

    /// Creative sets joined with their campaign and ad group
    CreativeSets {
        #[arg(help = "Date should be in the form YYYY-MM-DD", value_parser = validate_date)]
        start: NaiveDate,

        #[arg(help = "Date should be in the form YYYY-MM-DD", value_parser = validate_date)]
        end: NaiveDate,

        #[arg(long, value_enum, default_value_t = Granularity::Daily)]
        granularity: Granularity,

        #[arg(long, value_enum, default_value_t = ExportFormat::Xlsx)]
        format: ExportFormat,
    },
}

fn validate_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|err| format!("Invalid date '{s}', expected YYYY-MM-DD: {err}"))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    env_logger::init();

    let result = match args.command {
        Report::Campaigns { start, end, format } => {
            runner::download_campaign_report(args.config, &start, &end, format).await
        }
        Report::CreativeSets {
            start,
            end,
            granularity,
            format,
        } => {
            runner::download_creative_sets_report(args.config, &start, &end, granularity, format)
                .await
        }
    };

    match result {
        Ok(path) => info!("Report saved to {}", path.display()),
        Err(err) => {
            error!("failed to download report: {}", err);
            std::process::exit(1);
        }
    }

    Ok(())
}
