//! Storage backing for the device memory

use crate::shm::SharedMemory;

/// Storage location type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Heap,
    Shared,
}

/// Access mode of an open handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn readable(self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

/// Raw bytes behind a [`FixedBuffer`](crate::FixedBuffer)
#[derive(Debug)]
pub enum BufferData {
    Heap(Box<[u8]>),
    Shared(SharedMemory),
}

impl BufferData {
    /// Zero-filled process-private storage
    pub fn zeroed(size: usize) -> Self {
        BufferData::Heap(vec![0u8; size].into_boxed_slice())
    }

    /// Get storage type
    pub fn storage_type(&self) -> StorageType {
        match self {
            BufferData::Heap(_) => StorageType::Heap,
            BufferData::Shared(_) => StorageType::Shared,
        }
    }

    /// Get size in bytes
    pub fn size(&self) -> usize {
        match self {
            BufferData::Heap(bytes) => bytes.len(),
            BufferData::Shared(shm) => shm.size(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            BufferData::Heap(bytes) => &bytes[..],
            BufferData::Shared(shm) => shm.as_slice(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            BufferData::Heap(bytes) => &mut bytes[..],
            BufferData::Shared(shm) => shm.as_mut_slice(),
        }
    }
}
