use anyhow::Result;
use clap::Parser;
use cli::Cli;
use nlm_artifacts::ClientError;
use nlm_common::NlmError;
use nlm_common::observability::init_logging;
use nlm_config::{NlmConfig, NlmConfigLoader};
mod cli;

const DEFAULT_CONFIG_FILE: &str = "nlm.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let loader = NlmConfigLoader::new();
    let loader = match &cli.config {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let cfg: NlmConfig = loader.load()?;

    let mut log_cfg = cfg.logging.to_log_config();
    log_cfg.emit_stderr |= cli.verbose;
    let log_path = init_logging(log_cfg)?;
    tracing::debug!(log_path = %log_path.display(), "nlm.logging_ready");

    let result = cli::run(cli, cfg).await;
    if let Err(err) = &result {
        tracing::error!(error = %err, "nlm.command_failed");
        if let Some(hint) = hint_for(err) {
            eprintln!("hint: {hint}");
        }
    }
    result
}

fn hint_for(err: &anyhow::Error) -> Option<String> {
    if let Some(e) = err.downcast_ref::<ClientError>() {
        return e.hint();
    }
    err.downcast_ref::<NlmError>().and_then(NlmError::hint)
}
