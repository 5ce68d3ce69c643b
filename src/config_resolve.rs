//! Recursively resolves `ignition.config.replace`/`.append` directives into
//! one effective [`Config`] (§4.2, §2's "Merger applies ... recursively").

use log::debug;

use ignition_api::config::Config;
use ignition_api::ConfigError;

use crate::error::IgnitionError;
use crate::fetch::{self, Deadlines};

const MAX_DEPTH: usize = 16;

/// Parses `bytes` as a root config and recursively folds in every
/// `config.replace`/`config.append` directive it (transitively) declares.
///
/// `fallback_deadlines` is used only to fetch a referenced config when no
/// config has been parsed yet to supply its own `ignition.timeouts` — once a
/// level is parsed, its own declared timeouts (§3) govern the fetches it
/// triggers.
pub fn resolve(bytes: &[u8], fallback_deadlines: Deadlines, ca_bundle: Option<&[u8]>) -> Result<Config, IgnitionError> {
    resolve_depth(bytes, fallback_deadlines, ca_bundle, 0)
}

fn resolve_depth(bytes: &[u8], fallback_deadlines: Deadlines, ca_bundle: Option<&[u8]>, depth: usize) -> Result<Config, IgnitionError> {
    if depth > MAX_DEPTH {
        return Err(IgnitionError::ConfigFetch {
            uri: "<nested config>".to_string(),
            source: anyhow::anyhow!("exceeded maximum config nesting depth of {MAX_DEPTH}"),
        });
    }

    let config = Config::parse(bytes).map_err(IgnitionError::from)?;
    let deadlines = Deadlines::from_timeouts(&config.ignition.timeouts);

    if let Some(replace) = &config.ignition.config.replace {
        debug!("resolving ignition.config.replace from '{}'", replace.source);
        let replacement_bytes = fetch::fetch(replace, deadlines, ca_bundle)
            .map_err(|source| crate::error::wrap_fetch_failure(replace.source.to_string(), source))?;
        return resolve_depth(&replacement_bytes, deadlines, ca_bundle, depth + 1);
    }

    let mut effective = config.clone();
    // config.append entries don't carry their own config.append/replace once
    // substituted in per §4.2's "new wins" rule for the directive itself,
    // but the *fetched* bytes might recursively declare their own — resolve
    // each one fully before merging it in.
    let append = config.ignition.config.append.clone();
    for resource in &append {
        debug!("resolving ignition.config.append entry from '{}'", resource.source);
        let appended_bytes = match fetch::fetch_optional(resource, deadlines, ca_bundle)
            .map_err(|source| crate::error::wrap_fetch_failure(resource.source.to_string(), source))?
        {
            Some(bytes) => bytes,
            None => {
                debug!("ignition.config.append entry '{}' is optional and was not found, skipping", resource.source);
                continue;
            }
        };
        let appended = resolve_depth(&appended_bytes, deadlines, ca_bundle, depth + 1)?;
        effective = ignition_api::config::merge(effective, appended);
    }
    // the directive itself must not re-trigger on a later merge pass.
    effective.ignition.config = Default::default();

    Ok(effective)
}

/// Parses, resolves, and validates in one step — the form every stage that
/// consumes a config actually wants.
pub fn resolve_and_validate(bytes: &[u8], deadlines: Deadlines, ca_bundle: Option<&[u8]>) -> Result<Config, IgnitionError> {
    let config = resolve(bytes, deadlines, ca_bundle)?;
    let report = ignition_api::config::validate(&config);
    if report.is_fatal() {
        return Err(IgnitionError::from(ConfigError::Validate(report)));
    }
    Ok(config)
}
