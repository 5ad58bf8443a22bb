//! NeXus file navigation (`NXentry` / `NXevent_data`).

use crate::{Error, Result};
use hdf5::types::VarLenUnicode;
use hdf5::{File, Group};
use std::path::Path;

/// Detector id dataset name (`uint32`).
pub const EVENT_ID: &str = "event_id";
/// Raw TOF dataset name (`float32`).
pub const EVENT_TIME_OFFSET: &str = "event_time_offset";
/// Per-pulse event offset dataset name (`uint64`).
pub const EVENT_INDEX: &str = "event_index";

/// A NeXus event file opened read-only.
pub struct NexusFile {
    entry: Group,
}

impl NexusFile {
    /// Opens a NeXus file and locates its `NXentry` group.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or has no entry group.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let entry = find_entry(&file)?;
        Ok(Self { entry })
    }

    /// Names of all `NXevent_data` bank groups under the entry, sorted.
    ///
    /// Groups are matched by `NX_class` attribute; groups without the
    /// attribute fall back to the ORNL `*_events` naming convention.
    ///
    /// # Errors
    /// Returns an error if HDF5 enumeration fails.
    pub fn bank_names(&self) -> Result<Vec<String>> {
        let mut banks = Vec::new();
        for name in self.entry.member_names()? {
            let Ok(group) = self.entry.group(&name) else {
                continue; // dataset or link, not a group
            };
            match nx_class(&group) {
                Some(class) => {
                    if class == "NXevent_data" {
                        banks.push(name);
                    }
                }
                None => {
                    if name.ends_with("_events") {
                        banks.push(name);
                    }
                }
            }
        }
        banks.sort_unstable();
        Ok(banks)
    }

    /// Opens one bank's event group.
    ///
    /// # Errors
    /// Returns an error if the group does not exist.
    pub fn bank(&self, name: &str) -> Result<Group> {
        Ok(self.entry.group(name)?)
    }

    /// Total event count of a bank, from the TOF dataset's element count.
    ///
    /// # Errors
    /// Returns an error if the TOF dataset is missing.
    pub fn bank_event_count(bank: &Group) -> Result<usize> {
        Ok(bank.dataset(EVENT_TIME_OFFSET)?.size())
    }
}

fn find_entry(file: &File) -> Result<Group> {
    for name in file.member_names()? {
        let Ok(group) = file.group(&name) else {
            continue;
        };
        if nx_class(&group).as_deref() == Some("NXentry") {
            return Ok(group);
        }
    }
    // Files written without NX_class attributes still carry the
    // conventional group name.
    file.group("entry")
        .map_err(|_| Error::InvalidFormat("no NXentry group found".to_string()))
}

fn nx_class(group: &Group) -> Option<String> {
    let attr = group.attr("NX_class").ok()?;
    let value: VarLenUnicode = attr.read_scalar().ok()?;
    Some(value.to_string())
}
