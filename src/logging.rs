use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn init_logging(max_level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_line_number(max_level >= Level::DEBUG)
        .with_file(max_level >= Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
