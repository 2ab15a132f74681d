use super::*;
use crate::error::{AppError, AppResult};

fn endpoint(id: &str, enabled: bool, auth: Option<&str>) -> Endpoint {
    let mut endpoint = Endpoint::new(id, format!("http://{}.test/v1/messages", id));
    endpoint.enabled = enabled;
    endpoint.auth_header = auth.map(str::to_owned);
    endpoint
}

#[test]
fn enabled_endpoints_keep_configured_order() -> AppResult<()> {
    let config = RunConfig {
        endpoints: vec![
            endpoint("a", true, None),
            endpoint("b", false, None),
            endpoint("c", true, None),
        ],
        ..RunConfig::default()
    };
    let ids: Vec<&str> = config
        .enabled_endpoints()
        .iter()
        .map(|endpoint| endpoint.id.as_str())
        .collect();
    if ids != ["a", "c"] {
        return Err(AppError::validation(format!("Unexpected ids: {:?}", ids)));
    }
    Ok(())
}

#[test]
fn endpoint_override_wins_over_global_key() -> AppResult<()> {
    let overridden = endpoint("a", true, Some("  route-token "));
    if overridden.credential("global") != "Bearer route-token" {
        return Err(AppError::validation("Expected route credential"));
    }
    let inherited = endpoint("b", true, Some("   "));
    if inherited.credential("global") != "Bearer global" {
        return Err(AppError::validation("Expected global credential"));
    }
    Ok(())
}

#[test]
fn credential_check_ignores_disabled_endpoints() -> AppResult<()> {
    let config = RunConfig {
        endpoints: vec![endpoint("a", true, None), endpoint("b", false, Some("k"))],
        ..RunConfig::default()
    };
    if config.has_credential() {
        return Err(AppError::validation("Disabled endpoint must not count"));
    }

    let with_global = RunConfig {
        api_key: "sk-test".to_owned(),
        ..config
    };
    if !with_global.has_credential() {
        return Err(AppError::validation("Global key should be resolvable"));
    }
    Ok(())
}

#[test]
fn defaults_match_documented_values() -> AppResult<()> {
    let config = RunConfig::default();
    if config.timeout != std::time::Duration::from_secs(30)
        || config.probes_per_endpoint != 10
        || config.delay_between_probes != std::time::Duration::from_millis(200)
        || config.max_concurrent_routes != 5
        || config.max_concurrent_per_route != 10
        || config.model != DEFAULT_MODEL
        || config.max_tokens != DEFAULT_MAX_TOKENS
        || config.content != DEFAULT_CONTENT
    {
        return Err(AppError::validation(format!("Unexpected defaults: {:?}", config)));
    }
    Ok(())
}
