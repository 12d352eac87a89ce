//! Device registration: major numbers, device memory and nodes

use crate::buffer::FixedBuffer;
use crate::config::{Backing, DeviceConfig};
use crate::devno::DevNumber;
use crate::handle::Handle;
use crate::ops::{FileOperations, GlobalMem};
use crate::storage::AccessMode;
use crate::{Error, Result};
use log::{error, info};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// Dynamic majors are handed out from here downward
pub const DYNAMIC_MAJOR_FIRST: u32 = 254;
/// Lowest dynamic major
pub const DYNAMIC_MAJOR_LAST: u32 = 234;

#[derive(Default)]
struct Inner {
    /// major -> region name
    regions: Mutex<BTreeMap<u32, String>>,
    /// node -> device
    nodes: Mutex<BTreeMap<String, Arc<GlobalMem>>>,
}

/// Table of attached devices.
///
/// Cloning is cheap and yields a view of the same table.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Reserve a major number, allocate the device memory and expose the
    /// node, in that order. A failing step undoes the earlier ones.
    pub fn attach(&self, config: &DeviceConfig) -> Result<AttachedDevice> {
        config.validate()?;

        let major = self.reserve_region(config.major, &config.name)?;

        let buffer = match allocate(&config.backing) {
            Ok(buffer) => Arc::new(buffer),
            Err(e) => {
                error!("{}: allocating device memory failed: {}", config.name, e);
                self.release_region(major);
                return Err(e);
            }
        };

        let device = match GlobalMem::new(buffer, major) {
            Ok(device) => Arc::new(device),
            Err(e) => {
                error!("{}: binding major {} failed: {}", config.name, major, e);
                self.release_region(major);
                return Err(e);
            }
        };
        if let Err(e) = self.expose_node(&config.node, Arc::clone(&device)) {
            error!("{}: exposing {} failed: {}", config.name, config.node, e);
            drop(device);
            self.release_region(major);
            return Err(e);
        }

        match device.buffer().shared_name() {
            Some(os_id) => info!(
                "{} attached as {} at {} (shared memory {})",
                config.name,
                device.devno(),
                config.node,
                os_id
            ),
            None => info!(
                "{} attached as {} at {}",
                config.name,
                device.devno(),
                config.node
            ),
        }
        Ok(AttachedDevice {
            registry: self.clone(),
            device,
            name: config.name.clone(),
            node: config.node.clone(),
        })
    }

    fn reserve_region(&self, major: u32, name: &str) -> Result<u32> {
        let mut regions = self.inner.regions.lock();
        let major = if major == 0 {
            (DYNAMIC_MAJOR_LAST..=DYNAMIC_MAJOR_FIRST)
                .rev()
                .find(|m| !regions.contains_key(m))
                .ok_or(Error::NoDynamicMajor)?
        } else if regions.contains_key(&major) {
            return Err(Error::MajorBusy(major));
        } else {
            major
        };
        regions.insert(major, name.to_string());
        Ok(major)
    }

    fn release_region(&self, major: u32) {
        self.inner.regions.lock().remove(&major);
    }

    fn expose_node(&self, node: &str, device: Arc<GlobalMem>) -> Result<()> {
        let mut nodes = self.inner.nodes.lock();
        if nodes.contains_key(node) {
            return Err(Error::NodeExists(node.to_string()));
        }
        nodes.insert(node.to_string(), device);
        Ok(())
    }

    fn remove_node(&self, node: &str) {
        self.inner.nodes.lock().remove(node);
    }

    /// Open minor `devno.minor()` of the device registered under `devno.major()`
    pub fn open(&self, devno: DevNumber, mode: AccessMode) -> Result<Handle> {
        let device = self
            .inner
            .nodes
            .lock()
            .values()
            .find(|d| d.devno().major() == devno.major())
            .cloned()
            .ok_or_else(|| Error::NoSuchDevice(devno.to_string()))?;
        device.open(devno.minor(), mode)
    }

    /// Open the device exposed at `node`
    pub fn open_node(&self, node: &str, mode: AccessMode) -> Result<Handle> {
        let device = self
            .inner
            .nodes
            .lock()
            .get(node)
            .cloned()
            .ok_or_else(|| Error::NoSuchDevice(node.to_string()))?;
        device.open(0, mode)
    }

    /// Whether `major` is reserved
    pub fn is_registered(&self, major: u32) -> bool {
        self.inner.regions.lock().contains_key(&major)
    }

    /// Names of all exposed nodes
    pub fn nodes(&self) -> Vec<String> {
        self.inner.nodes.lock().keys().cloned().collect()
    }
}

fn allocate(backing: &Backing) -> Result<FixedBuffer> {
    match backing {
        Backing::Heap => Ok(FixedBuffer::new()),
        Backing::Shared { os_id } => FixedBuffer::create_shared(os_id),
    }
}

/// An attached device. Dropping it detaches the device.
///
/// Handles opened earlier keep the memory alive until they are closed, but
/// no new handle can be opened once the node is gone.
pub struct AttachedDevice {
    registry: Registry,
    device: Arc<GlobalMem>,
    name: String,
    node: String,
}

impl AttachedDevice {
    pub fn devno(&self) -> DevNumber {
        self.device.devno()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn buffer(&self) -> &Arc<FixedBuffer> {
        self.device.buffer()
    }

    /// Entry points bound to this device
    pub fn file_operations(&self) -> Arc<dyn FileOperations> {
        self.device.clone()
    }

    /// Open minor 0
    pub fn open(&self, mode: AccessMode) -> Result<Handle> {
        self.device.open(0, mode)
    }

    /// Remove the node and release the major number
    pub fn detach(self) {}
}

impl Drop for AttachedDevice {
    fn drop(&mut self) {
        self.registry.remove_node(&self.node);
        self.registry.release_region(self.devno().major());
        info!("{} detached from {}", self.name, self.devno());
    }
}

impl std::fmt::Debug for AttachedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachedDevice")
            .field("name", &self.name)
            .field("devno", &self.devno())
            .field("node", &self.node)
            .finish()
    }
}
