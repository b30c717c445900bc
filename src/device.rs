//! # Device Detection and Management
//!
//! Handles automatic detection and selection of compute devices (CPU/GPU) for ML inference.
//! Provides fallback mechanisms and device availability checking.

use candle_core::Device;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Cached best available device to avoid repeated detection
static BEST_DEVICE: OnceLock<Device> = OnceLock::new();

/// Device preferences for model inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Automatically select the best available device
    #[default]
    Auto,
    /// Force CPU usage
    Cpu,
    /// Force CUDA GPU usage (will fallback to CPU if not available)
    Cuda,
    /// Force Metal GPU usage (will fallback to CPU if not available)
    Metal,
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "automatic" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "metal" => Ok(DevicePreference::Metal),
            _ => Err(format!("Unknown device preference: {}", s)),
        }
    }
}

/// Resolve a device from the configured preference string, with fallback.
pub fn device_from_config(device_str: &str) -> Device {
    match device_str.parse::<DevicePreference>() {
        Ok(preference) => get_device(preference),
        Err(_) => {
            warn!("Invalid device preference '{}', using auto", device_str);
            best_device()
        }
    }
}

/// Get a device matching the preference.
pub fn get_device(preference: DevicePreference) -> Device {
    match preference {
        DevicePreference::Auto => best_device(),
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => cuda_device().unwrap_or(Device::Cpu),
        DevicePreference::Metal => metal_device().unwrap_or(Device::Cpu),
    }
}

/// Best available device (detection runs once, then cached).
pub fn best_device() -> Device {
    BEST_DEVICE
        .get_or_init(|| {
            if let Some(device) = cuda_device() {
                info!("Selected CUDA GPU for ML inference");
                return device;
            }
            if let Some(device) = metal_device() {
                info!("Selected Metal GPU for ML inference");
                return device;
            }
            info!("Using CPU for ML inference (no GPU acceleration available)");
            Device::Cpu
        })
        .clone()
}

fn cuda_device() -> Option<Device> {
    match Device::new_cuda(0) {
        Ok(device) => Some(device),
        Err(e) => {
            debug!("CUDA not available: {}", e);
            None
        }
    }
}

fn metal_device() -> Option<Device> {
    match Device::new_metal(0) {
        Ok(device) => Some(device),
        Err(e) => {
            debug!("Metal not available: {}", e);
            None
        }
    }
}

/// Human-readable description for logging and health reporting.
pub fn describe(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "CPU",
        Device::Cuda(_) => "CUDA GPU",
        Device::Metal(_) => "Metal GPU",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_preference_parsing() {
        assert_eq!("auto".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
        assert_eq!("cpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cpu);
        assert_eq!("gpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda);
        assert_eq!("metal".parse::<DevicePreference>().unwrap(), DevicePreference::Metal);
        assert!("invalid".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_cpu_fallback_always_works() {
        let device = get_device(DevicePreference::Cpu);
        assert!(matches!(device, Device::Cpu));
    }

    #[test]
    fn test_invalid_config_string_falls_back() {
        // Should not panic, just pick something usable
        let device = device_from_config("quantum");
        assert!(!describe(&device).is_empty());
    }
}
