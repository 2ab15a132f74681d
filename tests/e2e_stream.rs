
use std::sync::Arc;
use std::time::Duration;

use streamprobe::domain::{Endpoint, RunConfig};
use streamprobe::error::ProbeError;
use streamprobe::probe::{
    ProbeRequestSpec, ReqwestTransport, build_request_body, ensure_bearer, execute,
};
use streamprobe::run::TestOrchestrator;

use support_stream::{FRAME_GAP, spawn_stream_server_or_skip};

const DEADLINE: Duration = Duration::from_secs(5);

fn transport() -> Result<ReqwestTransport, String> {
    ReqwestTransport::new(DEADLINE).map_err(|err| format!("transport failed: {}", err))
}

fn spec(url: String) -> ProbeRequestSpec {
    ProbeRequestSpec {
        url,
        body: build_request_body("probe-model", 16, "Hi"),
        credential: ensure_bearer("secret"),
        timeout: DEADLINE,
    }
}

#[tokio::test]
async fn e2e_stream_measures_first_byte_and_text() -> Result<(), String> {
    let Some((url, server)) = spawn_stream_server_or_skip()? else {
        return Ok(());
    };

    let outcome = execute(&spec(format!("{}/stream", url)), &transport()?).await;
    if !outcome.success {
        return Err(format!("Probe failed: {:?}", outcome.error));
    }

    let request = server
        .requests()
        .into_iter()
        .next()
        .ok_or_else(|| "Server saw no request".to_owned())?;
    let checks = [
        (outcome.text == "Hello", "Unexpected text"),
        (
            outcome.first_byte_time < outcome.total_time,
            "First byte not before completion",
        ),
        (outcome.total_time >= FRAME_GAP, "Total time ignores the gap"),
        (outcome.stream.bytes_received > 0, "No bytes counted"),
        (outcome.stream.discarded_bytes == 0, "Unexpected discarded tail"),
        (
            request.authorization.as_deref() == Some("Bearer secret"),
            "Missing bearer credential",
        ),
        (
            request.anthropic_version.as_deref() == Some("2023-06-01"),
            "Missing version header",
        ),
        (
            request.body.contains("\"model\":\"probe-model\""),
            "Model missing from body",
        ),
        (request.body.contains("\"stream\":true"), "Stream flag missing"),
    ];
    for (ok, message) in checks {
        if !ok {
            return Err(format!("{}: {:?}", message, outcome));
        }
    }
    Ok(())
}

#[tokio::test]
async fn e2e_stream_reports_status_detail() -> Result<(), String> {
    let Some((url, _server)) = spawn_stream_server_or_skip()? else {
        return Ok(());
    };

    let outcome = execute(&spec(format!("{}/limited", url)), &transport()?).await;
    let expected = ProbeError::HttpStatus {
        status: 429,
        detail: "Slow down".to_owned(),
    };
    if outcome.success || outcome.error != Some(expected) {
        return Err(format!("Unexpected outcome: {:?}", outcome));
    }
    Ok(())
}

#[tokio::test]
async fn e2e_orchestrator_runs_every_endpoint() -> Result<(), String> {
    let Some((url, _server)) = spawn_stream_server_or_skip()? else {
        return Ok(());
    };

    let (orchestrator, _events) = TestOrchestrator::new(Arc::new(transport()?));
    let config = RunConfig {
        api_key: "secret".to_owned(),
        probes_per_endpoint: 3,
        delay_between_probes: Duration::ZERO,
        endpoints: vec![
            Endpoint::new("ok", format!("{}/stream", url)),
            Endpoint::new("limited", format!("{}/limited", url)),
        ],
        ..RunConfig::default()
    };
    let report = orchestrator
        .run(Arc::new(config))
        .await
        .map_err(|err| format!("run failed: {}", err))?;

    let rates: Vec<(String, usize, u64)> = report
        .results
        .iter()
        .map(|route| {
            let stats = route.stats();
            (
                route.endpoint.id.clone(),
                stats.total,
                stats.success_rate_x100,
            )
        })
        .collect();
    let expected = vec![
        ("ok".to_owned(), 3, 10_000),
        ("limited".to_owned(), 3, 0),
    ];
    if report.cancelled || rates != expected {
        return Err(format!("Unexpected report: {:?}", rates));
    }
    Ok(())
}
