//! Creates a draft insertion order under an existing campaign.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Datelike, Days, Local, NaiveDate};
use clap::Parser;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use dv360_auth::{DisplayVideoFactory, FactoryConfig};

#[derive(Parser, Debug)]
#[command(name = "create_insertion_order", about = "This example creates an insertion order.")]
struct Args {
    /// The ID of the parent advertiser of the insertion order to be created.
    advertiser_id: String,
    /// The ID of the campaign of the insertion order to be created.
    campaign_id: String,
    /// The display name of the insertion order to be created.
    display_name: String,
    /// Path to a client secrets JSON file
    #[arg(long)]
    client_secrets: Option<PathBuf>,
}

fn date(date: NaiveDate) -> Value {
    json!({ "year": date.year(), "month": date.month(), "day": date.day() })
}

fn insertion_order(args: &Args, today: NaiveDate) -> anyhow::Result<Value> {
    // flight runs from a week from now to two weeks from now
    let start = today
        .checked_add_days(Days::new(7))
        .ok_or_else(|| anyhow::anyhow!("start date out of range"))?;
    let end = today
        .checked_add_days(Days::new(14))
        .ok_or_else(|| anyhow::anyhow!("end date out of range"))?;

    Ok(json!({
        "campaignId": args.campaign_id,
        "displayName": args.display_name,
        "entityStatus": "ENTITY_STATUS_DRAFT",
        "pacing": {
            "pacingPeriod": "PACING_PERIOD_DAILY",
            "pacingType": "PACING_TYPE_EVEN",
            "dailyMaxMicros": 10000
        },
        "frequencyCap": {
            "maxImpressions": 10,
            "timeUnit": "TIME_UNIT_DAYS",
            "timeUnitCount": 1
        },
        "performanceGoal": {
            "performanceGoalType": "PERFORMANCE_GOAL_TYPE_CPC",
            "performanceGoalAmountMicros": 1000000
        },
        "budget": {
            "budgetUnit": "BUDGET_UNIT_CURRENCY",
            "budgetSegments": [{
                "budgetAmountMicros": 100000,
                "dateRange": {
                    "startDate": date(start),
                    "endDate": date(end)
                }
            }]
        }
    }))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let service = DisplayVideoFactory::new(FactoryConfig::from_env())
        .get_instance(args.client_secrets.clone())
        .await?;

    let body = insertion_order(&args, Local::now().date_naive())?;
    let created: Value = service
        .post_json(
            &format!("advertisers/{}/insertionOrders", args.advertiser_id),
            &body,
        )
        .await?;

    let name = created["name"].as_str().unwrap_or_default();
    println!("Insertion Order {name} was created.");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{err}");
            ExitCode::FAILURE
        }
    }
}
