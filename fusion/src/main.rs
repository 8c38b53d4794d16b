use std::env;

use anyhow::Context;
use log::info;

use fusion::FusionConfig;

const CONFIG_VAR: &str = "FUSION_CONFIG";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = env::args().nth(1).or_else(|| env::var(CONFIG_VAR).ok());
    let config = match path {
        Some(path) => {
            info!("loading config from {path}");
            FusionConfig::load(&path).with_context(|| format!("loading config '{path}'"))?
        }
        None => FusionConfig::default(),
    };

    let history = fusion::train(&config)?;

    if let Some(last) = history.last() {
        info!("finished after {} epochs, loss {:.4}", last.epoch, last.train.loss);
        for (metric, value) in &last.train.metrics {
            info!("{metric} {value:.4}");
        }
    }

    Ok(())
}
