//! Types for use when configuring cosync modules.

use crate::*;

/// helper transcode function
fn tc<S: serde::Serialize, D: serde::de::DeserializeOwned>(
    s: &S,
) -> CoSyncResult<D> {
    serde_json::from_str(
        &serde_json::to_string(s)
            .map_err(|e| CoSyncError::other_src("encode", e))?,
    )
    .map_err(|e| CoSyncError::decode_src("module config", e))
}

/// Denotes a type used to configure a specific cosync module.
///
/// These are startup-time values, the likes of which might be found in a
/// configuration file. Anything a module allows changing at runtime should
/// be exposed through other means.
pub trait ModConfig:
    'static
    + Sized
    + Default
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
{
}

/// Cosync configuration, a map of per-module sections keyed by module
/// name.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Config(serde_json::Map<String, serde_json::Value>);

impl Config {
    /// Add a module's default configuration parameters, e.g. when
    /// generating an example configuration file.
    pub fn add_default_module_config<M: ModConfig>(
        &mut self,
        module_name: String,
    ) -> CoSyncResult<()> {
        if self.0.contains_key(&module_name) {
            return Err(CoSyncError::other(format!(
                "Refusing to overwrite conflicting module name: {module_name}"
            )));
        }
        self.0.insert(module_name, tc(&M::default())?);
        Ok(())
    }

    /// Extract a module's configuration. This config is typically loaded
    /// from disk and can be edited by humans, so module config types
    /// should be tolerant of missing properties and set sane defaults.
    /// A missing section yields the module's defaults.
    pub fn get_module_config<M: ModConfig>(
        &self,
        module_name: &str,
    ) -> CoSyncResult<M> {
        self.0
            .get(module_name)
            .map(tc)
            .unwrap_or_else(|| Ok(M::default()))
    }
}
