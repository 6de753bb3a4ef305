//! Module discovery
//!
//! An implementation exposes one [`HardwareModule`] identified by
//! [`TV_INPUT_HARDWARE_MODULE_ID`]. The platform looks it up once by id,
//! checks its version and opens the device from it.

use crate::{ApiVersion, HalError, TvInputDevice};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Id of the TV input hardware module
pub const TV_INPUT_HARDWARE_MODULE_ID: &str = "tv_input";

/// Name of the device opened by default
pub const TV_INPUT_DEFAULT_DEVICE: &str = "default";

/// Identity of a hardware module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub id: String,
    pub name: String,
    pub author: String,
    pub module_api_version: ApiVersion,
    pub hal_api_version: ApiVersion,
}

pub trait HardwareModule: Send + Sync {
    fn info(&self) -> &ModuleInfo;

    /// Open the named device
    fn open(&self, name: &str) -> crate::Result<Box<dyn TvInputDevice>>;
}

/// In-process table of modules keyed by id
#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<dyn HardwareModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any previous one with the same id
    pub fn register(&mut self, module: Arc<dyn HardwareModule>) {
        let info = module.info();
        tracing::info!(
            "Registered module '{}' ({}, v{})",
            info.id,
            info.name,
            info.module_api_version
        );

        if let Some(previous) = self.modules.insert(info.id.clone(), module) {
            tracing::warn!("Replaced module '{}'", previous.info().id);
        }
    }

    /// Look a module up by id
    pub fn get(&self, id: &str) -> crate::Result<Arc<dyn HardwareModule>> {
        self.modules
            .get(id)
            .cloned()
            .ok_or_else(|| HalError::ModuleNotFound(id.to_string()))
    }

    /// Registered module ids
    pub fn ids(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// Look up a module, open one of its devices and check both versions
    ///
    /// A device newer than `supported` is closed again before the error is
    /// returned.
    pub fn open_device(
        &self,
        id: &str,
        name: &str,
        supported: ApiVersion,
    ) -> crate::Result<Box<dyn TvInputDevice>> {
        let module = self.get(id)?;
        module.info().module_api_version.ensure_compatible(supported)?;

        let device = module.open(name)?;
        let version = device.api_version();
        if let Err(err) = version.ensure_compatible(supported) {
            tracing::warn!(
                "Device '{}' of module '{}' reports version {}, closing",
                name,
                id,
                version
            );
            if let Err(close_err) = device.close() {
                tracing::debug!("Closing rejected device failed: {}", close_err);
            }
            return Err(err);
        }

        tracing::info!("Opened device '{}' of module '{}' (v{})", name, id, version);
        Ok(device)
    }
}
