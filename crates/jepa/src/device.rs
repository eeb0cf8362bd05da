//! Device selection for model inference and probing.
//!
//! `DeviceConfig` is the backend-agnostic description that travels through
//! configs and CLI flags; [`ResolveDevice`] turns it into the concrete burn
//! device of whichever backend the binary was compiled with.

use std::fmt;
use std::str::FromStr;

use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::backend::Autodiff;
use burn::prelude::Backend;
use serde::{Deserialize, Serialize};

/// Device selection for tensor computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeviceConfig {
    /// General-purpose processor.
    #[serde(rename = "cpu")]
    #[default]
    Cpu,
    /// Accelerator. With no ordinal the backend picks its best adapter.
    #[serde(rename = "gpu")]
    Gpu {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ordinal: Option<usize>,
    },
}

impl DeviceConfig {
    /// Default device for this build.
    ///
    /// Builds without the `wgpu` feature always get `Cpu`. With `wgpu` this is
    /// an unpinned `Gpu`, which resolves to whatever adapter the runtime finds
    /// (integrated and software adapters included), so it never names a
    /// device that is not there.
    pub fn auto() -> Self {
        if has_accelerator_backend() {
            DeviceConfig::Gpu { ordinal: None }
        } else {
            DeviceConfig::Cpu
        }
    }

    pub fn is_cpu(&self) -> bool {
        matches!(self, DeviceConfig::Cpu)
    }
}

/// Whether an accelerator backend was compiled into this build. Says nothing
/// about the hardware present.
pub fn has_accelerator_backend() -> bool {
    cfg!(feature = "wgpu")
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceConfig::Cpu => write!(f, "cpu"),
            DeviceConfig::Gpu { ordinal: None } => write!(f, "gpu"),
            DeviceConfig::Gpu { ordinal: Some(n) } => write!(f, "gpu:{n}"),
        }
    }
}

impl FromStr for DeviceConfig {
    type Err = anyhow::Error;

    /// Accepts `cpu`, `gpu`, `gpu:<n>`, and the `cuda` spellings of the latter two.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "cpu" {
            return Ok(DeviceConfig::Cpu);
        }
        let (kind, ordinal) = match s.split_once(':') {
            Some((kind, n)) => {
                let ordinal = n
                    .parse::<usize>()
                    .map_err(|e| anyhow::anyhow!("Invalid device ordinal in {s:?}: {e}"))?;
                (kind.to_string(), Some(ordinal))
            }
            None => (s.clone(), None),
        };
        match kind.as_str() {
            "gpu" | "cuda" => Ok(DeviceConfig::Gpu { ordinal }),
            _ => anyhow::bail!("Unknown device {s:?} (expected cpu, gpu or gpu:<n>)"),
        }
    }
}

/// Maps a [`DeviceConfig`] onto a backend's concrete device type.
pub trait ResolveDevice: Backend {
    fn resolve_device(config: &DeviceConfig) -> anyhow::Result<Self::Device>;
}

impl ResolveDevice for NdArray<f32> {
    fn resolve_device(config: &DeviceConfig) -> anyhow::Result<Self::Device> {
        match config {
            DeviceConfig::Cpu => Ok(NdArrayDevice::Cpu),
            DeviceConfig::Gpu { .. } => anyhow::bail!(
                "Device {config} requested but this build only has the ndarray (cpu) backend; rebuild with --features wgpu"
            ),
        }
    }
}

impl<B: ResolveDevice> ResolveDevice for Autodiff<B> {
    fn resolve_device(config: &DeviceConfig) -> anyhow::Result<Self::Device> {
        B::resolve_device(config)
    }
}

#[cfg(feature = "wgpu")]
impl ResolveDevice for burn::backend::Wgpu {
    fn resolve_device(config: &DeviceConfig) -> anyhow::Result<Self::Device> {
        use burn::backend::wgpu::WgpuDevice;
        Ok(match config {
            DeviceConfig::Cpu => WgpuDevice::Cpu,
            DeviceConfig::Gpu { ordinal: None } => WgpuDevice::DefaultDevice,
            DeviceConfig::Gpu { ordinal: Some(n) } => WgpuDevice::DiscreteGpu(*n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_cpu() {
        assert_eq!(DeviceConfig::default(), DeviceConfig::Cpu);
        assert!(DeviceConfig::default().is_cpu());
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn test_auto_without_accelerator_is_cpu() {
        assert!(!has_accelerator_backend());
        assert_eq!(DeviceConfig::auto(), DeviceConfig::Cpu);
        assert_eq!(DeviceConfig::auto().to_string(), "cpu");
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceConfig::Cpu.to_string(), "cpu");
        assert_eq!(DeviceConfig::Gpu { ordinal: Some(2) }.to_string(), "gpu:2");
        assert_eq!(DeviceConfig::Gpu { ordinal: None }.to_string(), "gpu");
    }

    #[test]
    fn test_parse() {
        assert_eq!("cpu".parse::<DeviceConfig>().unwrap(), DeviceConfig::Cpu);
        assert_eq!("CPU".parse::<DeviceConfig>().unwrap(), DeviceConfig::Cpu);
        assert_eq!(
            "gpu".parse::<DeviceConfig>().unwrap(),
            DeviceConfig::Gpu { ordinal: None }
        );
        assert_eq!(
            "cuda:1".parse::<DeviceConfig>().unwrap(),
            DeviceConfig::Gpu { ordinal: Some(1) }
        );
        assert!("tpu".parse::<DeviceConfig>().is_err());
        assert!("gpu:x".parse::<DeviceConfig>().is_err());
    }

    #[test]
    fn test_display_parse_roundtrip() {
        for device in [
            DeviceConfig::Cpu,
            DeviceConfig::Gpu { ordinal: None },
            DeviceConfig::Gpu { ordinal: Some(3) },
        ] {
            assert_eq!(device.to_string().parse::<DeviceConfig>().unwrap(), device);
        }
    }

    #[test]
    fn test_deserialize_tagged() {
        let device: DeviceConfig = toml::from_str(r#"type = "cpu""#).unwrap();
        assert_eq!(device, DeviceConfig::Cpu);

        let device: DeviceConfig = toml::from_str(
            r#"
type = "gpu"
ordinal = 1
"#,
        )
        .unwrap();
        assert_eq!(device, DeviceConfig::Gpu { ordinal: Some(1) });

        let device: DeviceConfig = toml::from_str(r#"type = "gpu""#).unwrap();
        assert_eq!(device, DeviceConfig::Gpu { ordinal: None });
    }

    #[test]
    fn test_resolve_ndarray() {
        type TestBackend = NdArray<f32>;
        type TestAutodiffBackend = Autodiff<NdArray<f32>>;

        assert_eq!(
            TestBackend::resolve_device(&DeviceConfig::Cpu).unwrap(),
            NdArrayDevice::Cpu
        );
        assert_eq!(
            TestAutodiffBackend::resolve_device(&DeviceConfig::Cpu).unwrap(),
            NdArrayDevice::Cpu
        );
        assert!(TestBackend::resolve_device(&DeviceConfig::Gpu { ordinal: Some(0) }).is_err());
        assert!(TestBackend::resolve_device(&DeviceConfig::Gpu { ordinal: None }).is_err());
    }

    #[cfg(feature = "wgpu")]
    #[test]
    fn test_auto_with_accelerator_backend_is_unpinned() {
        use burn::backend::wgpu::WgpuDevice;

        assert_eq!(DeviceConfig::auto(), DeviceConfig::Gpu { ordinal: None });
        assert_eq!(
            burn::backend::Wgpu::resolve_device(&DeviceConfig::auto()).unwrap(),
            WgpuDevice::DefaultDevice
        );
        assert_eq!(
            burn::backend::Wgpu::resolve_device(&DeviceConfig::Gpu { ordinal: Some(1) }).unwrap(),
            WgpuDevice::DiscreteGpu(1)
        );
    }
}
