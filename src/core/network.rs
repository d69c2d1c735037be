use crate::game::midi::LoadError;
use log::{info, warn};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared ureq agent configuration for every remote fetch.
pub fn get_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(REQUEST_TIMEOUT))
        .build()
        .into()
}

/// Downloads a remote file. A 404 is reported as `NotFound`, distinct from
/// other transport failures.
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>, LoadError> {
    info!("Fetching '{}'...", url);
    let agent = get_agent();
    let response = match agent.get(url).call() {
        Ok(resp) => resp,
        Err(ureq::Error::StatusCode(404)) => {
            warn!("'{}' returned 404", url);
            return Err(LoadError::NotFound(url.to_string()));
        }
        Err(e) => {
            return Err(LoadError::Http {
                url: url.to_string(),
                message: e.to_string(),
            });
        }
    };

    let bytes = response
        .into_body()
        .read_to_vec()
        .map_err(|e| LoadError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    info!("Fetched {} bytes from '{}'", bytes.len(), url);
    Ok(bytes)
}
