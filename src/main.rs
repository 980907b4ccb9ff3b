mod command_line;
mod copy;
mod dynamodb;
mod error;
mod logging;
mod policy;
mod utils;


use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::command_line::Args;
use crate::copy::TableCopier;
use crate::dynamodb::DynamoDb;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init_logging(args.log_level())?;

    let policy = args.policy()?;

    let source_connection = args.connection(policy.source_profile.as_deref());
    let destination_connection = args.connection(policy.destination_profile.as_deref());
    info!(
        "Copying {} on {} to {} on {}",
        policy.source_table,
        source_connection.target_display(),
        policy.destination_table,
        destination_connection.target_display()
    );

    let source = DynamoDb::connect(&source_connection).await;
    let destination = DynamoDb::connect(&destination_connection).await;

    TableCopier::new(policy, Arc::new(source), Arc::new(destination))
        .run()
        .await?;
    Ok(())
}
