//! CLI commands implementation

use anyhow::{Context, Result};
use sandboxlet_core::{ContainerId, RuntimeError};
use sandboxlet_runtime::ContainerRuntimeClient;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Interval between address probes while waiting
const INSPECT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// `ps --json` output
#[derive(Debug, Serialize)]
struct PsOutput<'a> {
    containers: &'a [ContainerId],
    count: usize,
}

/// Show the runtime binary and version
pub fn version(client: &ContainerRuntimeClient) {
    println!("Binary: {}", client.binary().display());
    println!("Version: {}", client.version());
}

/// Start a container
///
/// The start runs detached inside the client; the process stays up until
/// it settles so that exiting does not kill it.
pub async fn run(client: &ContainerRuntimeClient, image: &str, args: &[String]) -> Result<()> {
    let id = client.run(image, args).await?;
    println!("{}", id);
    client.wait_for_pending_runs().await;
    Ok(())
}

/// Show a container's address, optionally waiting for it to be assigned
pub async fn inspect(client: &ContainerRuntimeClient, id: &str, wait_secs: u64) -> Result<()> {
    let id = parse_id(id)?;
    let deadline = retry_deadline(Instant::now(), wait_secs);

    loop {
        match client.inspect_ip_address(&id).await {
            Ok(addr) => {
                println!("{}", addr);
                return Ok(());
            }
            Err(e @ RuntimeError::AddressNotAvailable(_)) => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(e.into());
                }
                tokio::time::sleep(INSPECT_RETRY_INTERVAL).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Pause a container
pub async fn pause(client: &ContainerRuntimeClient, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    client.pause(&id).await?;
    println!("Container '{}' paused", id);
    Ok(())
}

/// Resume a container
pub async fn unpause(client: &ContainerRuntimeClient, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    client.unpause(&id).await?;
    println!("Container '{}' resumed", id);
    Ok(())
}

/// Remove a container
pub async fn rm(client: &ContainerRuntimeClient, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    client.rm(&id).await?;
    println!("Container '{}' removed", id);
    Ok(())
}

/// List containers
pub async fn ps(
    client: &ContainerRuntimeClient,
    filters: &[String],
    all: bool,
    json: bool,
) -> Result<()> {
    let filters = filters
        .iter()
        .map(|f| parse_filter(f))
        .collect::<Result<Vec<_>>>()?;
    let ids = client.ps(&filters, all).await?;

    if json {
        let out = PsOutput {
            containers: &ids,
            count: ids.len(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if ids.is_empty() {
        eprintln!("No containers running");
    } else {
        for id in ids {
            println!("{}", id);
        }
    }

    Ok(())
}

/// Pull images, all at once
pub async fn pull(client: &ContainerRuntimeClient, images: &[String]) -> Result<()> {
    let results = futures::future::join_all(images.iter().map(|image| client.pull(image))).await;

    let mut failed = 0;
    for (image, result) in images.iter().zip(results) {
        match result {
            Ok(()) => println!("Pulled {}", image),
            Err(e) => {
                failed += 1;
                eprintln!("Failed to pull {}: {}", image, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} pulls failed", failed, images.len());
    }
    Ok(())
}

/// Report OOM status
pub async fn oom(client: &ContainerRuntimeClient, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let killed = client.is_oom_killed(&id).await?;
    println!("{}", killed);
    Ok(())
}

/// When to stop retrying; `None` if the wait runs past what the clock can represent
fn retry_deadline(now: Instant, wait_secs: u64) -> Option<Instant> {
    now.checked_add(Duration::from_secs(wait_secs))
}

/// Helper to validate a container ID argument
fn parse_id(id: &str) -> Result<ContainerId> {
    ContainerId::parse(id).with_context(|| format!("'{}' is not a container ID", id))
}

/// Helper to split a `key=value` filter
fn parse_filter(filter: &str) -> Result<(String, String)> {
    match filter.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => anyhow::bail!("Filter '{}' must be key=value", filter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("label=app=web").unwrap(),
            ("label".to_string(), "app=web".to_string())
        );
        assert!(parse_filter("novalue").is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn test_retry_deadline() {
        let now = Instant::now();
        assert_eq!(retry_deadline(now, 0), Some(now));
        assert_eq!(retry_deadline(now, 5), Some(now + Duration::from_secs(5)));
        assert_eq!(retry_deadline(now, u64::MAX), None);
    }

    #[test]
    fn test_parse_id() {
        let session = ContainerId::session();
        assert_eq!(parse_id(session.as_str()).unwrap(), session);
        assert!(parse_id("web-1").is_err());
    }

    #[test]
    fn test_ps_json_shape() {
        let ids = vec![ContainerId::session()];
        let out = PsOutput {
            containers: &ids,
            count: 1,
        };
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["containers"][0], ids[0].as_str());
    }
}
