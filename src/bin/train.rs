use animal_health::config::TrainConfig;
use animal_health::training;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    animal_health::init_tracing();

    let config = TrainConfig::parse();
    tracing::info!("Starting training with config: {:?}", config);

    let artifacts = training::run(&config)?;
    tracing::info!(
        model = %artifacts.info.model_name,
        accuracy = artifacts.info.accuracy,
        output_dir = %config.output_dir.display(),
        "Artifacts written"
    );
    Ok(())
}
