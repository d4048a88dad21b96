//! Learned-command library backed by a JSON file

use crate::error::CoreError;
use crate::model::{CommandSummary, DeviceRecord, DeviceSummary, IrCommand, LibraryFile};
use crate::name::validate_name;
use crate::persistence;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::path::PathBuf;

/// Learned commands for all devices, mirrored to a JSON file
///
/// Every successful mutation rewrites the whole file before returning.
/// A save failure is logged and the in-memory state keeps the mutation,
/// so the file can lag until the next successful write. Last writer wins;
/// there is no cross-process locking.
pub struct CommandLibrary {
    devices: DashMap<String, DeviceRecord>,
    file_path: PathBuf,
}

impl CommandLibrary {
    /// Load the library at `path`, materializing an empty file if none
    /// exists yet.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let library = Self {
            devices: DashMap::new(),
            file_path: path.into(),
        };

        match persistence::load_library(&library.file_path).await {
            Some(file) => {
                for (name, record) in file.devices {
                    library.devices.insert(name, record);
                }
            }
            None => library.save().await,
        }

        library
    }

    async fn save(&self) {
        let file = self.to_file();
        if let Err(e) = persistence::save_library(&self.file_path, &file).await {
            tracing::error!("Failed to save command library: {}", e);
        }
    }

    fn to_file(&self) -> LibraryFile {
        let mut file = LibraryFile::default();
        for entry in self.devices.iter() {
            file.devices.insert(entry.key().clone(), entry.value().clone());
        }
        file
    }

    /// Add a device entry. Existing devices keep their original record.
    pub async fn add_device(&self, name: &str) -> Result<(), CoreError> {
        let name = validate_name(name)?;

        match self.devices.entry(name.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!("Device '{}' already exists", name);
                return Ok(());
            }
            Entry::Vacant(entry) => {
                entry.insert(DeviceRecord::new());
            }
        }

        self.save().await;
        tracing::info!("Device '{}' added", name);
        Ok(())
    }

    /// Insert or overwrite a command, creating the device if needed.
    pub async fn add_command(
        &self,
        device_name: &str,
        command_name: &str,
        freq_khz: u32,
        duty: u8,
        repeat: u32,
        raw: Vec<u32>,
    ) -> Result<(), CoreError> {
        let device_name = validate_name(device_name)?;
        let command_name = validate_name(command_name)?;

        {
            let mut device = self
                .devices
                .entry(device_name.clone())
                .or_insert_with(DeviceRecord::new);
            device
                .commands
                .insert(command_name.clone(), IrCommand::new(freq_khz, duty, repeat, raw));
        }

        self.save().await;
        tracing::info!("Command '{}' added to device '{}'", command_name, device_name);
        Ok(())
    }

    /// Look up a command. Invalid or unknown names yield `None`.
    #[must_use] pub fn get_command(&self, device_name: &str, command_name: &str) -> Option<IrCommand> {
        let device_name = validate_name(device_name).ok()?;
        let command_name = validate_name(command_name).ok()?;
        self.devices
            .get(&device_name)
            .and_then(|device| device.commands.get(&command_name).cloned())
    }

    /// Summaries for every device.
    #[must_use] pub fn list_devices(&self) -> Vec<DeviceSummary> {
        self.devices
            .iter()
            .map(|entry| DeviceSummary {
                name: entry.key().clone(),
                created_at: entry.value().created_at.clone(),
                command_count: entry.value().commands.len(),
            })
            .collect()
    }

    /// Command summaries for one device, without the raw timing payloads.
    /// Unknown or invalid devices yield an empty listing.
    #[must_use] pub fn list_commands(&self, device_name: &str) -> Vec<CommandSummary> {
        let Ok(device_name) = validate_name(device_name) else {
            return Vec::new();
        };
        let Some(device) = self.devices.get(&device_name) else {
            return Vec::new();
        };

        device
            .commands
            .iter()
            .map(|(name, command)| CommandSummary {
                name: name.clone(),
                freq_khz: command.freq_khz,
                duty: command.duty,
                repeat: command.repeat,
                learned_at: command.learned_at.clone(),
            })
            .collect()
    }

    /// Delete a command. `Ok(false)` when the device or command is absent.
    pub async fn delete_command(
        &self,
        device_name: &str,
        command_name: &str,
    ) -> Result<bool, CoreError> {
        let device_name = validate_name(device_name)?;
        let command_name = validate_name(command_name)?;

        let removed = match self.devices.get_mut(&device_name) {
            Some(mut device) => {
                let removed = device.commands.remove(&command_name).is_some();
                if removed && device.commands.is_empty() {
                    tracing::info!("Device '{}' has no more commands", device_name);
                }
                removed
            }
            None => false,
        };

        if removed {
            self.save().await;
            tracing::info!("Command '{}' deleted from device '{}'", command_name, device_name);
        } else {
            tracing::warn!("Command '{}' not found in device '{}'", command_name, device_name);
        }
        Ok(removed)
    }

    /// Delete a device and all its commands. `Ok(false)` when absent.
    pub async fn delete_device(&self, name: &str) -> Result<bool, CoreError> {
        let name = validate_name(name)?;

        if self.devices.remove(&name).is_some() {
            self.save().await;
            tracing::info!("Device '{}' deleted", name);
            Ok(true)
        } else {
            tracing::warn!("Device '{}' not found", name);
            Ok(false)
        }
    }

    /// Number of devices.
    #[must_use] pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Total number of learned commands across all devices.
    #[must_use] pub fn command_count(&self) -> usize {
        self.devices
            .iter()
            .map(|entry| entry.value().commands.len())
            .sum()
    }
}
