use tokenseq::logger::*;

fn main() -> anyhow::Result<()> {
    // $ RUST_LOG=trace cargo run --bin logger_demo
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "tokenseq=debug,logger_demo=debug".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!("application trace log");
    debug!(subject = "u1", "application debug log");
    info!("application info log");

    let invalid = LogConfig {
        filter: "=[".to_string(),
    };
    println!("Error on invalid filter: {:?}", logger.reload_from_config(&invalid).is_err());

    Ok(())
}
