//! Partition descriptors and ESP-IDF partition tables
//!
//! The storage partition the image is written to is described by a name,
//! an offset and a size. Those come from built-in defaults that match the
//! board's 16 MiB partition layout, or from the partition table CSV that
//! the firmware was built with:
//!
//! ```text
//! # Name,   Type, SubType, Offset,   Size,     Flags
//! nvs,      data, nvs,     0x9000,   0x4000,
//! otadata,  data, ota,     0xd000,   0x2000,
//! phy_init, data, phy,     0xf000,   0x1000,
//! ota_0,    app,  ota_0,   0x10000,  0x4F0000,
//! storage,  data, spiffs,  0xA00000, 6M,
//! ```

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::size::parse_size;

/// Default flash offset of the storage partition
pub const DEFAULT_PARTITION_OFFSET: u32 = 0xA0_0000;
/// Default size of the storage partition
pub const DEFAULT_PARTITION_SIZE: u32 = 0x60_0000;
/// Default label of the storage partition
pub const DEFAULT_PARTITION_NAME: &str = "storage";
/// Default size of the generated image
pub const DEFAULT_IMAGE_SIZE: &str = "3M";

/// Flash sector size; data partitions are aligned to it
pub const SECTOR_SIZE: u32 = 0x1000;
/// Alignment of app partitions
const APP_ALIGNMENT: u32 = 0x1_0000;
/// First offset after the bootloader and partition table
const FIRST_PARTITION_OFFSET: u32 = 0x9000;

/// A named address range in flash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Partition label
    pub name: String,
    /// Start address
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
    /// Subtype column from the partition table, if loaded from one
    pub subtype: Option<String>,
}

impl Partition {
    /// Create a new partition descriptor
    pub fn new(name: impl Into<String>, offset: u32, size: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
            subtype: None,
        }
    }

    /// The built-in storage partition
    pub fn default_storage() -> Self {
        Self::new(
            DEFAULT_PARTITION_NAME,
            DEFAULT_PARTITION_OFFSET,
            DEFAULT_PARTITION_SIZE,
        )
    }

    /// First address past the end of the partition
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }

    /// Check if the start address is aligned to the given boundary
    pub fn is_aligned(&self, alignment: u32) -> bool {
        self.offset.is_multiple_of(alignment)
    }

    /// Check if this partition holds a SPIFFS filesystem
    ///
    /// Partitions not loaded from a table are assumed to.
    pub fn is_spiffs(&self) -> bool {
        self.subtype
            .as_deref()
            .is_none_or(|s| s.eq_ignore_ascii_case("spiffs"))
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::default_storage()
    }
}

/// Partitions read from an ESP-IDF partition table CSV
#[derive(Debug, Clone, Default)]
pub struct PartitionTable {
    /// Partitions in table order
    pub partitions: Vec<Partition>,
}

/// Parse a partition table number: hex with `0x`, otherwise a size with
/// an optional K/M suffix
fn parse_table_size(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex value {:?}: {}", s, e))
    } else {
        parse_size(s).map_err(|e| e.to_string())
    }
}

fn align_up(value: u32, alignment: u32) -> Option<u32> {
    value
        .checked_add(alignment - 1)
        .map(|v| v / alignment * alignment)
}

impl PartitionTable {
    /// Parse a partition table from CSV text
    pub fn from_csv_str(s: &str) -> Result<Self> {
        let mut partitions = Vec::new();
        let mut next_offset = FIRST_PARTITION_OFFSET;

        for (idx, raw) in s.lines().enumerate() {
            let line = idx + 1;
            let err = |reason: String| Error::PartitionTable { line, reason };

            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = text.split(',').map(str::trim).collect();
            if fields.len() < 5 {
                return Err(err(format!(
                    "expected at least 5 columns, found {}",
                    fields.len()
                )));
            }

            let name = fields[0];
            let kind = fields[1];
            let subtype = fields[2];
            if name.is_empty() {
                return Err(err("missing partition name".to_string()));
            }

            let size = parse_table_size(fields[4]).map_err(&err)?;
            if size == 0 {
                return Err(err(format!("partition '{}' has zero size", name)));
            }

            let offset = if fields[3].is_empty() {
                let alignment = if kind.eq_ignore_ascii_case("app") {
                    APP_ALIGNMENT
                } else {
                    SECTOR_SIZE
                };
                align_up(next_offset, alignment)
                    .ok_or_else(|| err("partition offset overflows".to_string()))?
            } else {
                parse_table_size(fields[3]).map_err(&err)?
            };

            next_offset = offset
                .checked_add(size)
                .ok_or_else(|| err(format!("partition '{}' extends past 4 GiB", name)))?;

            log::trace!(
                "Partition {}: offset 0x{:X}, size 0x{:X}",
                name,
                offset,
                size
            );

            partitions.push(Partition {
                name: name.to_string(),
                offset,
                size,
                subtype: Some(subtype.to_string()),
            });
        }

        Ok(Self { partitions })
    }

    /// Load a partition table from a CSV file
    pub fn from_csv_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_csv_str(&content)
    }

    /// Find a partition by label
    pub fn find(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Check if the table has no partitions
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}
