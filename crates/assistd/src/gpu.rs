//! GPU description served by the `get_gpu_info` command.

use std::collections::BTreeMap;

use serde_json::{Value, json};

/// Source of the GPU details reported to clients.
#[cfg_attr(test, mockall::automock)]
pub trait GpuInfoProvider: Send + Sync {
    /// Returns the GPU details keyed by field name.
    fn gpu_info(&self) -> BTreeMap<String, Value>;
}

/// Fixed description of the reference hardware.
///
/// No device is queried; the values describe the card the plugins are
/// packaged for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticGpuInfo {
    vendor: String,
    model: String,
    driver_version: String,
    memory_total: String,
    cuda_cores: u32,
}

impl Default for StaticGpuInfo {
    fn default() -> Self {
        Self {
            vendor: String::from("NVIDIA"),
            model: String::from("GeForce RTX 5090"),
            driver_version: String::from("572.83"),
            memory_total: String::from("32GB"),
            cuda_cores: 17_408,
        }
    }
}

impl GpuInfoProvider for StaticGpuInfo {
    fn gpu_info(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            (String::from("vendor"), json!(self.vendor)),
            (String::from("model"), json!(self.model)),
            (String::from("driver_version"), json!(self.driver_version)),
            (String::from("memory_total"), json!(self.memory_total)),
            (String::from("cuda_cores"), json!(self.cuda_cores)),
        ])
    }
}
