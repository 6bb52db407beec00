//! `scriptbox run`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use scriptbox_application::{
    CancellationToken, EnvironmentStore, ExecuteRequest, RunCollection, RunCollectionInput,
    RunCollectionOutput,
};
use scriptbox_infrastructure::{BoaScriptEngine, CollectionLoader, ReqwestHttpClient, to_json_stable};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::report;

/// Runs every collection found at `args.path`. Returns whether everything
/// passed.
pub async fn run(args: RunArgs) -> Result<bool> {
    let collections = CollectionLoader::load_path(&args.path)
        .await
        .with_context(|| format!("loading {}", args.path.display()))?;
    if collections.is_empty() {
        bail!("no collection files found in {}", args.path.display());
    }

    let client = Arc::new(ReqwestHttpClient::new().context("creating HTTP client")?);
    let overrides: IndexMap<String, String> = args.env.into_iter().collect();

    let (token, receiver) = CancellationToken::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling run");
            token.cancel();
        }
    });

    let mut outputs: Vec<RunCollectionOutput> = Vec::with_capacity(collections.len());
    for collection in collections {
        let mut limits = collection.effective_limits();
        if let Some(ms) = args.timeout_ms {
            limits = limits.with_timeout(Duration::from_millis(ms));
        }
        limits
            .validate()
            .with_context(|| format!("collection `{}`", collection.name))?;

        let use_case = RunCollection::new(ExecuteRequest::new(
            Arc::clone(&client),
            Arc::new(BoaScriptEngine::new(limits)),
            EnvironmentStore::new(),
        ));
        let name = collection.name.clone();
        let input = RunCollectionInput {
            collection,
            overrides: overrides.clone(),
        };
        let output = use_case
            .execute(input, Some(receiver.clone()))
            .await
            .with_context(|| format!("running collection `{name}`"))?;

        if !args.json {
            print!("{}", report::collection_text(&output));
        }
        outputs.push(output);
    }

    let success = outputs.iter().all(RunCollectionOutput::is_success);
    if args.json {
        print!("{}", to_json_stable(&report::collections_json(&outputs))?);
    }
    info!(collections = outputs.len(), success, "run finished");
    Ok(success)
}
