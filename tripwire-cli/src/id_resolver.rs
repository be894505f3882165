//! ID resolver module
//!
//! Handles resolution of execution id prefixes to full handles by querying
//! the API. This allows users to specify short, unambiguous prefixes instead
//! of full UUIDs.

use anyhow::{Context, Result, anyhow};
use tripwire_client::TripwireClient;
use tripwire_core::domain::execution::ExecutionHandle;

use crate::types::IdOrPrefix;

/// Resolve an execution ID or prefix to a full handle
///
/// If the input is already a full UUID, returns it immediately.
/// Otherwise, fetches all executions and finds the one matching the prefix.
///
/// # Errors
/// Returns an error if:
/// - No execution matches the prefix
/// - Multiple executions match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_execution_id(client: &TripwireClient, input: &str) -> Result<ExecutionHandle> {
    let prefix = match IdOrPrefix::parse(input) {
        IdOrPrefix::Full(uuid) => return Ok(ExecutionHandle(uuid)),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let executions = client
        .list_executions(None)
        .await
        .context("Failed to fetch executions for ID resolution")?;

    match_prefix(executions.iter().map(|e| e.id), &prefix)
}

/// Pick the single handle starting with `prefix`
fn match_prefix(
    handles: impl Iterator<Item = ExecutionHandle>,
    prefix: &str,
) -> Result<ExecutionHandle> {
    if prefix.is_empty() {
        return Err(anyhow!("Execution ID cannot be empty"));
    }

    let matches: Vec<ExecutionHandle> = handles
        .filter(|h| h.to_string().starts_with(prefix))
        .collect();

    match matches.len() {
        0 => Err(anyhow!(
            "No execution found with ID starting with '{}'",
            prefix
        )),
        1 => Ok(matches[0]),
        _ => {
            let ids: Vec<String> = matches.iter().map(|h| h.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple executions: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn handle(s: &str) -> ExecutionHandle {
        ExecutionHandle(Uuid::parse_str(s).unwrap())
    }

    #[test]
    fn test_match_prefix() {
        let a = handle("3f2a0000-0000-4000-8000-000000000001");
        let b = handle("3f2b0000-0000-4000-8000-000000000002");

        assert_eq!(match_prefix([a, b].into_iter(), "3f2a").unwrap(), a);
        assert!(match_prefix([a, b].into_iter(), "3f2").is_err());
        assert!(match_prefix([a, b].into_iter(), "ffff").is_err());
        assert!(match_prefix([a, b].into_iter(), "").is_err());
    }
}
