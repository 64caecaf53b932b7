use anyhow::Result;
use qcm_generator::utils::logging;
use qcm_generator::{App, Config};

fn main() -> Result<()> {
    // Initialize logging
    logging::init();

    // Load configuration
    let config = Config::from_env();

    // Initialize and run the batch
    App::initialize(config)?.run()?;

    Ok(())
}
