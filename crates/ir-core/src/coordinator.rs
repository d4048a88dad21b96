//! Hub coordinator: scheduled refresh, learning capture loop, send paths
//!
//! The coordinator owns the hub client and the background tasks that keep the
//! snapshot current. Listeners subscribe through [`HubCoordinator::subscribe`]
//! and receive a [`CoordinatorEvent`] for every operation outcome and hub
//! state transition.

use crate::error::CoreError;
use crate::events::{CoordinatorEvent, EntityKind, Operation, OperationEvent};
use crate::library::CommandLibrary;
use crate::model::CommandSummary;
use crate::name::validate_name;

use dashmap::DashMap;
use extender_client::{
    CapturedSignal, ExtenderClient, HubStatus, RxInfo, SavedSlots, SendSignal, WifiStatus,
    DEFAULT_DUTY, DEFAULT_REPEAT,
};
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

const TASK_REFRESH: &str = "refresh";
const TASK_LEARN: &str = "learn";

/// Timing knobs for the refresh schedule and the learning loop
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How often the snapshot is refreshed from the hub.
    pub refresh_interval: Duration,
    /// How often the learning loop polls for a new capture.
    pub learn_poll_interval: Duration,
    /// Default learning budget when the caller gives no timeout.
    pub learn_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
            learn_poll_interval: Duration::from_secs(5),
            learn_timeout: Duration::from_secs(30),
        }
    }
}

/// Where a captured signal should be filed once it arrives
#[derive(Debug, Clone)]
pub struct LearnContext {
    pub device_name: String,
    pub command_name: String,
}

/// Firmware slot usage as published in the snapshot
#[derive(Debug, Clone, Serialize)]
pub struct StorageSummary {
    pub used: u32,
    pub max: u32,
    pub available: u32,
}

impl StorageSummary {
    #[must_use] pub fn from_slots(slots: &SavedSlots) -> Self {
        Self {
            used: slots.count,
            max: slots.max,
            available: slots.available,
        }
    }

    /// Usage percentage, 0 when the capacity is unknown.
    #[must_use] pub fn percent_used(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            f64::from(self.used) * 100.0 / f64::from(self.max)
        }
    }
}

impl Default for StorageSummary {
    fn default() -> Self {
        Self::from_slots(&SavedSlots::default())
    }
}

/// Consolidated hub state
///
/// `status` and `wifi` are `None` until the first successful refresh. The
/// receiver counters and storage summary fall back to defaults when the hub
/// cannot report them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HubSnapshot {
    pub online: bool,
    pub status: Option<HubStatus>,
    pub wifi: Option<WifiStatus>,
    pub rx_info: RxInfo,
    pub storage: StorageSummary,
    pub last_capture: Option<CapturedSignal>,
    pub last_capture_at: Option<String>,
    pub learning_mode: bool,
    pub updated_at: Option<String>,
}

/// Owns the hub client, the command library handle, and the background tasks
pub struct HubCoordinator {
    client: ExtenderClient,
    library: Arc<CommandLibrary>,
    config: CoordinatorConfig,
    snapshot: RwLock<HubSnapshot>,
    learning_mode: AtomicBool,
    learn_context: Mutex<Option<LearnContext>>,
    learn_baseline: Mutex<Option<Vec<u32>>>,
    tasks: DashMap<String, JoinHandle<()>>,
    event_tx: broadcast::Sender<CoordinatorEvent>,
}

impl HubCoordinator {
    #[must_use] pub fn new(
        client: ExtenderClient,
        library: Arc<CommandLibrary>,
        config: CoordinatorConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            client,
            library,
            config,
            snapshot: RwLock::new(HubSnapshot::default()),
            learning_mode: AtomicBool::new(false),
            learn_context: Mutex::new(None),
            learn_baseline: Mutex::new(None),
            tasks: DashMap::new(),
            event_tx,
        }
    }

    /// Subscribe to coordinator events.
    #[must_use] pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.event_tx.subscribe()
    }

    /// Whether a learning loop is currently polling.
    #[must_use] pub fn learning_mode(&self) -> bool {
        self.learning_mode.load(Ordering::SeqCst)
    }

    /// The library learned commands are filed into.
    #[must_use] pub fn library(&self) -> &Arc<CommandLibrary> {
        &self.library
    }

    /// Current snapshot. The learning flag is read live so a snapshot taken
    /// mid-capture reports it accurately.
    pub async fn snapshot(&self) -> HubSnapshot {
        let mut snapshot = self.snapshot.read().await.clone();
        snapshot.learning_mode = self.learning_mode();
        snapshot
    }

    /// Spawn the scheduled refresh task. The interval's immediate first tick
    /// is skipped; callers run an explicit initial refresh if they want one.
    pub fn start(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.config.refresh_interval);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = coordinator.refresh().await {
                    tracing::warn!("Scheduled refresh failed: {}", e);
                }
            }
        });
        if let Some(old) = self.tasks.insert(TASK_REFRESH.to_string(), handle) {
            old.abort();
        }
        tracing::info!(
            "Hub refresh scheduled every {:?}",
            self.config.refresh_interval
        );
    }

    /// Refresh the snapshot from the hub.
    ///
    /// Status and wifi are required; either failing marks the hub offline and
    /// fails the cycle. Receiver counters and slot usage degrade to defaults.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        match self.fetch_hub_state().await {
            Ok((status, wifi, rx_info, storage)) => {
                let was_online = {
                    let mut snapshot = self.snapshot.write().await;
                    let was_online = snapshot.online;
                    snapshot.online = true;
                    snapshot.status = Some(status);
                    snapshot.wifi = Some(wifi);
                    snapshot.rx_info = rx_info;
                    snapshot.storage = storage;
                    snapshot.updated_at = Some(chrono::Utc::now().to_rfc3339());
                    was_online
                };
                if !was_online {
                    tracing::info!("Hub is online");
                    self.emit(CoordinatorEvent::HubState { online: true });
                }
                Ok(())
            }
            Err(e) => {
                let was_online = {
                    let mut snapshot = self.snapshot.write().await;
                    let was_online = snapshot.online;
                    snapshot.online = false;
                    snapshot.updated_at = Some(chrono::Utc::now().to_rfc3339());
                    was_online
                };
                if was_online {
                    tracing::warn!("Hub went offline: {}", e);
                    self.emit(CoordinatorEvent::HubState { online: false });
                }
                Err(e)
            }
        }
    }

    async fn fetch_hub_state(
        &self,
    ) -> Result<(HubStatus, WifiStatus, RxInfo, StorageSummary), CoreError> {
        let status = self.client.status().await?;
        let wifi = self.client.wifi_status().await?;

        let rx_info = match self.client.rx_info().await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Receiver info unavailable: {}", e);
                RxInfo::default()
            }
        };
        let storage = match self.client.saved_slots().await {
            Ok(slots) => StorageSummary::from_slots(&slots),
            Err(e) => {
                tracing::warn!("Slot usage unavailable: {}", e);
                StorageSummary::default()
            }
        };

        Ok((status, wifi, rx_info, storage))
    }

    /// Learn a command: validate the names, make sure the device exists, then
    /// arm the capture loop with the device/command context.
    pub async fn learn_command(
        self: &Arc<Self>,
        device_name: &str,
        command_name: &str,
        timeout: Option<Duration>,
    ) -> Result<(), CoreError> {
        let validated = validate_name(device_name)
            .and_then(|device| validate_name(command_name).map(|command| (device, command)));
        let (device_name, command_name) = match validated {
            Ok(names) => names,
            Err(e) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                    Operation::Learn,
                    EntityKind::Command,
                    Some(device_name.to_string()),
                    Some(command_name.to_string()),
                    e.to_string(),
                )));
                return Err(e);
            }
        };

        self.library.add_device(&device_name).await?;

        let timeout = timeout.unwrap_or(self.config.learn_timeout);
        self.start_learning(
            Some(LearnContext {
                device_name: device_name.clone(),
                command_name: command_name.clone(),
            }),
            timeout,
        )
        .await;

        self.emit(CoordinatorEvent::Operation(OperationEvent::started(
            Operation::Learn,
            EntityKind::Command,
            Some(device_name),
            Some(command_name),
            Some(json!({ "timeout_secs": timeout.as_secs() })),
        )));
        Ok(())
    }

    /// Arm the capture loop without a filing context. Whatever arrives is
    /// published as a `signal_captured` event instead of being stored.
    pub async fn capture_signal(self: &Arc<Self>, timeout: Option<Duration>) {
        let timeout = timeout.unwrap_or(self.config.learn_timeout);
        self.start_learning(None, timeout).await;

        self.emit(CoordinatorEvent::Operation(OperationEvent::started(
            Operation::Learn,
            EntityKind::Command,
            None,
            None,
            Some(json!({ "timeout_secs": timeout.as_secs() })),
        )));
    }

    /// Cancel any learning loop. No notification is emitted.
    pub async fn stop_learning(&self) {
        self.cancel_learn_task().await;
        if self.learning_mode.swap(false, Ordering::SeqCst) {
            self.disarm_hub().await;
            tracing::info!("Learning cancelled");
        }
        *self.learn_context.lock().await = None;
    }

    async fn start_learning(self: &Arc<Self>, context: Option<LearnContext>, timeout: Duration) {
        self.cancel_learn_task().await;

        // The capture sitting on the hub right now is stale. Its signature
        // becomes the baseline so only a genuinely new signal qualifies.
        let baseline = match self.client.last_signal().await {
            Ok(signal) if !signal.is_empty() => Some(signal.signature().to_vec()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("No capture baseline available: {}", e);
                None
            }
        };
        *self.learn_baseline.lock().await = baseline;
        *self.learn_context.lock().await = context;
        self.learning_mode.store(true, Ordering::SeqCst);

        if let Err(e) = self.client.learn_start().await {
            tracing::warn!("Failed to arm hub capture window: {}", e);
        }

        let coordinator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            coordinator.learn_poll_loop(timeout).await;
        });
        if let Some(old) = self.tasks.insert(TASK_LEARN.to_string(), handle) {
            old.abort();
        }
        tracing::info!(
            "Learning started, polling every {:?} for up to {:?}",
            self.config.learn_poll_interval,
            timeout
        );
    }

    async fn cancel_learn_task(&self) {
        if let Some((_, handle)) = self.tasks.remove(TASK_LEARN) {
            handle.abort();
            let _ = handle.await;
        }
    }

    async fn learn_poll_loop(self: Arc<Self>, timeout: Duration) {
        let started = tokio::time::Instant::now();
        loop {
            tokio::time::sleep(self.config.learn_poll_interval).await;

            match self.client.last_signal().await {
                Ok(signal) => {
                    if !signal.is_empty() && self.is_new_capture(&signal).await {
                        tracing::info!(
                            "Captured signal with {} marks at {} kHz",
                            signal.combined.len(),
                            signal.freq_khz
                        );
                        self.handle_capture(signal).await;
                        return;
                    }
                    tracing::debug!("No new capture yet");
                }
                Err(e) => tracing::debug!("Capture poll failed: {}", e),
            }

            if started.elapsed() >= timeout {
                self.handle_learn_timeout().await;
                return;
            }
        }
    }

    async fn is_new_capture(&self, signal: &CapturedSignal) -> bool {
        let baseline = self.learn_baseline.lock().await;
        match baseline.as_deref() {
            Some(known) => signal.signature() != known,
            None => true,
        }
    }

    async fn handle_capture(&self, signal: CapturedSignal) {
        // The flag drops before any event so listeners reacting to the
        // terminal notification see a settled coordinator.
        self.learning_mode.store(false, Ordering::SeqCst);
        *self.learn_baseline.lock().await = Some(signal.signature().to_vec());

        {
            let mut snapshot = self.snapshot.write().await;
            snapshot.last_capture = Some(signal.clone());
            snapshot.last_capture_at = Some(chrono::Utc::now().to_rfc3339());
        }

        let context = self.learn_context.lock().await.clone();
        match context {
            Some(ctx) => {
                let result = self
                    .library
                    .add_command(
                        &ctx.device_name,
                        &ctx.command_name,
                        signal.freq_khz,
                        DEFAULT_DUTY,
                        DEFAULT_REPEAT,
                        signal.combined.clone(),
                    )
                    .await;
                match result {
                    Ok(()) => {
                        *self.learn_context.lock().await = None;
                        tracing::info!(
                            "Learned '{}' for device '{}'",
                            ctx.command_name,
                            ctx.device_name
                        );
                        self.emit(CoordinatorEvent::Operation(OperationEvent::success(
                            Operation::Learn,
                            EntityKind::Command,
                            Some(ctx.device_name),
                            Some(ctx.command_name),
                            Some(json!({
                                "freq_khz": signal.freq_khz,
                                "count": signal.combined.len(),
                                "frames": signal.frames,
                            })),
                        )));
                    }
                    Err(e) => {
                        // Context stays in place so a retry can pick it up.
                        tracing::error!("Failed to file learned command: {}", e);
                        self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                            Operation::Learn,
                            EntityKind::Command,
                            Some(ctx.device_name),
                            Some(ctx.command_name),
                            e.to_string(),
                        )));
                    }
                }
            }
            None => {
                tracing::info!(
                    "Captured unassigned signal with {} marks",
                    signal.combined.len()
                );
                self.emit(CoordinatorEvent::SignalCaptured {
                    raw_data: signal.combined.clone(),
                    freq_khz: signal.freq_khz,
                    frames: signal.frames,
                    count: signal.combined.len(),
                });
            }
        }

        self.disarm_hub().await;

        if let Err(e) = self.refresh().await {
            tracing::debug!("Post-capture refresh failed: {}", e);
        }
    }

    async fn handle_learn_timeout(&self) {
        self.learning_mode.store(false, Ordering::SeqCst);
        let context = self.learn_context.lock().await.clone();
        match &context {
            Some(ctx) => tracing::warn!(
                "Learning timed out for '{}' on device '{}'",
                ctx.command_name,
                ctx.device_name
            ),
            None => tracing::warn!("Capture timed out with no signal received"),
        }
        self.emit(CoordinatorEvent::Operation(OperationEvent::timeout(
            Operation::Learn,
            EntityKind::Command,
            context.as_ref().map(|ctx| ctx.device_name.clone()),
            context.map(|ctx| ctx.command_name),
        )));
        self.disarm_hub().await;
    }

    async fn disarm_hub(&self) {
        if let Err(e) = self.client.learn_stop().await {
            tracing::debug!("Failed to disarm hub capture window: {}", e);
        }
    }

    /// Transmit a stored command. `Ok(false)` when the command is unknown.
    pub async fn send_command(
        &self,
        device_name: &str,
        command_name: &str,
    ) -> Result<bool, CoreError> {
        let Some(command) = self.library.get_command(device_name, command_name) else {
            self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                Operation::Send,
                EntityKind::Command,
                Some(device_name.to_string()),
                Some(command_name.to_string()),
                format!("Command '{command_name}' not found for device '{device_name}'"),
            )));
            return Ok(false);
        };

        let count = command.raw.len();
        let body = SendSignal::from_khz(command.freq_khz, command.duty, command.repeat, command.raw);
        match self.client.send_signal(&body).await {
            Ok(()) => {
                tracing::info!("Sent '{}' to device '{}'", command_name, device_name);
                self.emit(CoordinatorEvent::Operation(OperationEvent::success(
                    Operation::Send,
                    EntityKind::Command,
                    Some(device_name.to_string()),
                    Some(command_name.to_string()),
                    Some(json!({ "freq_khz": command.freq_khz, "count": count })),
                )));
                Ok(true)
            }
            Err(e) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                    Operation::Send,
                    EntityKind::Command,
                    Some(device_name.to_string()),
                    Some(command_name.to_string()),
                    e.to_string(),
                )));
                Err(e.into())
            }
        }
    }

    /// Transmit a caller-supplied raw signal.
    pub async fn send_raw(
        &self,
        freq_khz: u32,
        duty: u8,
        repeat: u32,
        raw: Vec<u32>,
    ) -> Result<(), CoreError> {
        let count = raw.len();
        let body = SendSignal::from_khz(freq_khz, duty, repeat, raw);
        match self.client.send_signal(&body).await {
            Ok(()) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::success(
                    Operation::Send,
                    EntityKind::Command,
                    None,
                    None,
                    Some(json!({ "freq_khz": freq_khz, "count": count })),
                )));
                Ok(())
            }
            Err(e) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                    Operation::Send,
                    EntityKind::Command,
                    None,
                    None,
                    e.to_string(),
                )));
                Err(e.into())
            }
        }
    }

    /// Delete a stored command and report the outcome as an event.
    pub async fn delete_command(
        &self,
        device_name: &str,
        command_name: &str,
    ) -> Result<bool, CoreError> {
        match self.library.delete_command(device_name, command_name).await {
            Ok(true) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::success(
                    Operation::Delete,
                    EntityKind::Command,
                    Some(device_name.to_string()),
                    Some(command_name.to_string()),
                    None,
                )));
                Ok(true)
            }
            Ok(false) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                    Operation::Delete,
                    EntityKind::Command,
                    Some(device_name.to_string()),
                    Some(command_name.to_string()),
                    format!("Command '{command_name}' not found for device '{device_name}'"),
                )));
                Ok(false)
            }
            Err(e) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                    Operation::Delete,
                    EntityKind::Command,
                    Some(device_name.to_string()),
                    Some(command_name.to_string()),
                    e.to_string(),
                )));
                Err(e)
            }
        }
    }

    /// Delete a device and its commands, reporting the outcome as an event.
    pub async fn delete_device(&self, device_name: &str) -> Result<bool, CoreError> {
        match self.library.delete_device(device_name).await {
            Ok(true) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::success(
                    Operation::Delete,
                    EntityKind::Device,
                    Some(device_name.to_string()),
                    None,
                    None,
                )));
                Ok(true)
            }
            Ok(false) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                    Operation::Delete,
                    EntityKind::Device,
                    Some(device_name.to_string()),
                    None,
                    format!("Device '{device_name}' not found"),
                )));
                Ok(false)
            }
            Err(e) => {
                self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                    Operation::Delete,
                    EntityKind::Device,
                    Some(device_name.to_string()),
                    None,
                    e.to_string(),
                )));
                Err(e)
            }
        }
    }

    /// List a device's commands, reporting the outcome as an event.
    pub fn list_commands(&self, device_name: &str) -> Vec<CommandSummary> {
        let commands = self.library.list_commands(device_name);
        if commands.is_empty() {
            self.emit(CoordinatorEvent::Operation(OperationEvent::error(
                Operation::List,
                EntityKind::Device,
                Some(device_name.to_string()),
                None,
                format!("No commands found for device '{device_name}'"),
            )));
        } else {
            self.emit(CoordinatorEvent::Operation(OperationEvent::success(
                Operation::List,
                EntityKind::Device,
                Some(device_name.to_string()),
                None,
                Some(json!({
                    "command_count": commands.len(),
                    "commands": commands,
                })),
            )));
        }
        commands
    }

    fn emit(&self, event: CoordinatorEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl Drop for HubCoordinator {
    fn drop(&mut self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_summary_tracks_slot_counters() {
        let slots = SavedSlots {
            count: 10,
            max: 50,
            available: 40,
            names: Vec::new(),
        };
        let summary = StorageSummary::from_slots(&slots);
        assert_eq!(summary.used, 10);
        assert_eq!(summary.available, 40);
        assert!((summary.percent_used() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_used_handles_unknown_capacity() {
        let summary = StorageSummary {
            used: 3,
            max: 0,
            available: 0,
        };
        assert!((summary.percent_used() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_config_uses_production_cadence() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.learn_poll_interval, Duration::from_secs(5));
        assert_eq!(config.learn_timeout, Duration::from_secs(30));
    }

    #[test]
    fn fresh_snapshot_starts_offline() {
        let snapshot = HubSnapshot::default();
        assert!(!snapshot.online);
        assert!(snapshot.status.is_none());
        assert_eq!(snapshot.storage.max, 50);
        assert!(snapshot.updated_at.is_none());
    }
}
