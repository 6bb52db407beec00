//! `scriptbox exec`

use std::time::Duration;

use anyhow::{Context, Result};
use scriptbox_application::{EnvironmentStore, ScriptEngine};
use scriptbox_domain::{ResponseContext, SandboxLimits};
use scriptbox_infrastructure::{BoaScriptEngine, to_json_stable};
use tokio::fs;

use crate::cli::ExecArgs;
use crate::report;

/// Runs one script file. Returns whether it completed with no failed test.
pub async fn exec(args: ExecArgs) -> Result<bool> {
    let source = fs::read_to_string(&args.script)
        .await
        .with_context(|| format!("reading {}", args.script.display()))?;

    let mut limits = SandboxLimits::default();
    if let Some(ms) = args.timeout_ms {
        limits = limits.with_timeout(Duration::from_millis(ms));
    }
    limits.validate()?;

    let response = if args.post {
        let body = match &args.body {
            Some(path) => fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?,
            None => String::new(),
        };
        let response = args
            .headers
            .into_iter()
            .fold(ResponseContext::synthetic(args.status, body), |response, (name, value)| {
                response.with_header(name, value)
            });
        Some(response)
    } else {
        None
    };

    let environment = EnvironmentStore::with_variables(args.env);
    let engine = BoaScriptEngine::new(limits);
    let env = environment.clone();
    let result = tokio::task::spawn_blocking(move || match response {
        Some(response) => engine.post_response(&source, &env, Some(&response)),
        None => engine.pre_request(&source, &env),
    })
    .await
    .context("script worker panicked")?;

    if args.json {
        print!("{}", to_json_stable(&report::exec_json(&result, &environment.snapshot()))?);
    } else {
        let label = if args.post { "post-response" } else { "pre-request" };
        let mut out = String::new();
        report::script_text(&mut out, label, &result);
        print!("{out}");
        for (key, value) in environment.snapshot() {
            println!("  env {key}={value}");
        }
        println!("{}", report::summary_line(1, result.counts()));
    }
    Ok(result.all_passed())
}
