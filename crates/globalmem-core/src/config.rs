//! Device attach configuration

use crate::devno::MAX_MAJOR;
use crate::{Error, Result, DEFAULT_MAJOR, DEVICE_NAME};

/// Environment variable overriding the major number
pub const ENV_MAJOR: &str = "GLOBALMEM_MAJOR";
/// Environment variable selecting shared memory backing
pub const ENV_SHM: &str = "GLOBALMEM_SHM";

/// Where the device memory lives
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Backing {
    /// Process-private heap memory
    #[default]
    Heap,
    /// Named POSIX shared memory segment, visible to other processes
    Shared { os_id: String },
}

/// Parameters for [`Registry::attach`](crate::Registry::attach)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Major number; 0 asks for a dynamic one
    pub major: u32,
    /// Region name
    pub name: String,
    /// Node the device is exposed under
    pub node: String,
    pub backing: Backing,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            major: DEFAULT_MAJOR,
            name: DEVICE_NAME.to_string(),
            node: format!("/dev/{}", DEVICE_NAME),
            backing: Backing::Heap,
        }
    }
}

impl DeviceConfig {
    /// Defaults, with [`ENV_MAJOR`] and [`ENV_SHM`] applied when set
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_MAJOR) {
            self.major = raw
                .trim()
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("{}={:?}", ENV_MAJOR, raw)))?;
        }
        if let Some(os_id) = lookup(ENV_SHM) {
            self.backing = Backing::Shared { os_id };
        }
        self.validate()?;
        Ok(self)
    }

    pub fn major(mut self, major: u32) -> Self {
        self.major = major;
        self
    }

    /// Ask the registry for a free major number
    pub fn dynamic_major(self) -> Self {
        self.major(0)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn node(mut self, node: impl Into<String>) -> Self {
        self.node = node.into();
        self
    }

    pub fn shared(mut self, os_id: impl Into<String>) -> Self {
        self.backing = Backing::Shared {
            os_id: os_id.into(),
        };
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidConfig("empty device name".to_string()));
        }
        if self.node.is_empty() {
            return Err(Error::InvalidConfig("empty node name".to_string()));
        }
        if self.major > MAX_MAJOR {
            return Err(Error::InvalidConfig(format!(
                "major {} exceeds {}",
                self.major, MAX_MAJOR
            )));
        }
        if let Backing::Shared { os_id } = &self.backing {
            if os_id.is_empty() {
                return Err(Error::InvalidConfig("empty shared memory id".to_string()));
            }
        }
        Ok(())
    }
}
