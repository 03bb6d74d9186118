//! Simulated e-board for development and tests.
//!
//! Behaves like a robotic board: connecting and moving pieces take time, positions are
//! validated, and `stop_motion` interrupts a move in progress. Every command is recorded
//! so tests can assert on what reached the "hardware".

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{sync::Notify, time};

use crate::{
    fen::{fen_to_piece_map, validate_fen, STARTING_FEN},
    models::{ConnectionStatus, DeviceInfo, SetPositionResult},
};

use super::BoardDriver;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

const MOCK_ADDRESS: &str = "00:00:00:00:00:01";

#[derive(Debug, Clone)]
pub struct MockBoardConfig {
    pub scan_delay_ms: u64,
    pub connect_delay_ms: u64,
    pub set_position_delay_ms: u64,
    /// Connection attempts end in `ConnectionStatus::Error`.
    pub fail_connect: bool,
    /// `set_position` returns a structured `Failed` result.
    pub fail_set_position: bool,
    /// `set_position` returns `Err`, like a transport fault.
    pub error_on_set_position: bool,
    /// `stop_motion` returns `Err` without halting anything.
    pub fail_stop_motion: bool,
    pub device_name: String,
    pub firmware_version: String,
    pub serial_number: String,
}

impl Default for MockBoardConfig {
    fn default() -> Self {
        Self {
            scan_delay_ms: 500,
            connect_delay_ms: 1000,
            set_position_delay_ms: 2000,
            fail_connect: false,
            fail_set_position: false,
            error_on_set_position: false,
            fail_stop_motion: false,
            device_name: "Mock Robotic Board".into(),
            firmware_version: "1.0.0-mock".into(),
            serial_number: "MOCK-001".into(),
        }
    }
}

impl MockBoardConfig {
    /// No simulated delays.
    pub fn instant() -> Self {
        Self {
            scan_delay_ms: 0,
            connect_delay_ms: 0,
            set_position_delay_ms: 0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCommand {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub argument: Option<String>,
    pub outcome: String,
}

#[derive(Default)]
struct MockBoardState {
    status: ConnectionStatus,
    position: BTreeMap<String, String>,
    lit_squares: HashSet<String>,
    log: Vec<BoardCommand>,
}

pub struct MockBoardDriver {
    config: MockBoardConfig,
    state: Mutex<MockBoardState>,
    motion_in_progress: AtomicBool,
    stop_signal: Notify,
}

impl MockBoardDriver {
    pub fn new(config: MockBoardConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MockBoardState::default()),
            motion_in_progress: AtomicBool::new(false),
            stop_signal: Notify::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MockBoardState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, command: &str, argument: Option<&str>, outcome: &str) {
        log_debug!("mock board: {command} {argument:?} -> {outcome}");
        self.lock_state().log.push(BoardCommand {
            timestamp: Utc::now(),
            command: command.to_string(),
            argument: argument.map(str::to_string),
            outcome: outcome.to_string(),
        });
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            model: self.config.device_name.clone(),
            firmware_version: Some(self.config.firmware_version.clone()),
            serial_number: Some(self.config.serial_number.clone()),
            bluetooth_address: Some(MOCK_ADDRESS.to_string()),
        }
    }

    pub async fn scan_for_devices(&self) -> Vec<DeviceInfo> {
        self.record("scan", None, "started");
        time::sleep(Duration::from_millis(self.config.scan_delay_ms)).await;
        self.record("scan", None, "found 1 device");
        vec![self.device_info()]
    }

    pub fn command_log(&self) -> Vec<BoardCommand> {
        self.lock_state().log.clone()
    }

    /// Number of `set_position` calls that reached the board.
    pub fn set_position_calls(&self) -> usize {
        self.count_commands("set_position", "started")
    }

    pub fn stop_motion_calls(&self) -> usize {
        self.count_commands("stop_motion", "executed")
    }

    fn count_commands(&self, command: &str, outcome: &str) -> usize {
        self.lock_state()
            .log
            .iter()
            .filter(|entry| entry.command == command && entry.outcome == outcome)
            .count()
    }

    pub fn current_position(&self) -> BTreeMap<String, String> {
        self.lock_state().position.clone()
    }

    pub fn lit_squares(&self) -> HashSet<String> {
        self.lock_state().lit_squares.clone()
    }

    pub fn is_motion_in_progress(&self) -> bool {
        self.motion_in_progress.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        *self.lock_state() = MockBoardState::default();
        self.motion_in_progress.store(false, Ordering::SeqCst);
    }
}

impl Default for MockBoardDriver {
    fn default() -> Self {
        Self::new(MockBoardConfig::default())
    }
}

impl BoardDriver for MockBoardDriver {
    fn connection_status(&self) -> ConnectionStatus {
        self.lock_state().status
    }

    async fn connect(&self, device: Option<DeviceInfo>) -> Result<ConnectionStatus> {
        let target = device.map(|d| d.model);
        self.record("connect", target.as_deref(), "started");
        self.lock_state().status = ConnectionStatus::Connecting;

        time::sleep(Duration::from_millis(self.config.connect_delay_ms)).await;

        if self.config.fail_connect {
            self.lock_state().status = ConnectionStatus::Error;
            self.record("connect", target.as_deref(), "failed");
            return Ok(ConnectionStatus::Error);
        }

        {
            let mut state = self.lock_state();
            state.status = ConnectionStatus::Connected;
            state.position = fen_to_piece_map(STARTING_FEN);
        }
        self.record("connect", target.as_deref(), "connected");
        Ok(ConnectionStatus::Connected)
    }

    async fn disconnect(&self) -> Result<()> {
        {
            let mut state = self.lock_state();
            state.status = ConnectionStatus::Disconnected;
            state.position.clear();
            state.lit_squares.clear();
        }
        self.motion_in_progress.store(false, Ordering::SeqCst);
        self.record("disconnect", None, "done");
        Ok(())
    }

    async fn set_position(&self, fen: &str) -> Result<SetPositionResult> {
        self.record("set_position", Some(fen), "started");

        if self.connection_status() != ConnectionStatus::Connected {
            self.record("set_position", Some(fen), "failed: not connected");
            return Ok(SetPositionResult::failed("Not connected"));
        }

        if let Err(err) = validate_fen(fen, false) {
            self.record("set_position", Some(fen), "failed: invalid fen");
            return Ok(SetPositionResult::failed(format!("Invalid FEN: {err}")));
        }

        if self.config.error_on_set_position {
            self.record("set_position", Some(fen), "error: transport");
            return Err(anyhow!("simulated transport fault"));
        }

        // Registered before any await so a stop issued mid-move is never missed.
        let stopped = self.stop_signal.notified();
        self.motion_in_progress.store(true, Ordering::SeqCst);

        if self.config.fail_set_position {
            time::sleep(Duration::from_millis(self.config.set_position_delay_ms / 2)).await;
            self.motion_in_progress.store(false, Ordering::SeqCst);
            self.record("set_position", Some(fen), "failed: simulated");
            return Ok(SetPositionResult::failed("Simulated failure"));
        }

        tokio::select! {
            _ = time::sleep(Duration::from_millis(self.config.set_position_delay_ms)) => {
                self.lock_state().position = fen_to_piece_map(fen);
                self.motion_in_progress.store(false, Ordering::SeqCst);
                self.record("set_position", Some(fen), "success");
                Ok(SetPositionResult::success("Position set successfully")
                    .with_estimated_time(self.config.set_position_delay_ms))
            }
            _ = stopped => {
                self.motion_in_progress.store(false, Ordering::SeqCst);
                self.record("set_position", Some(fen), "cancelled");
                Ok(SetPositionResult::cancelled("Motion stopped"))
            }
        }
    }

    async fn get_position(&self) -> Result<Option<BTreeMap<String, String>>> {
        let state = self.lock_state();
        if state.status != ConnectionStatus::Connected {
            return Ok(None);
        }
        Ok(Some(state.position.clone()))
    }

    async fn stop_motion(&self) -> Result<()> {
        if self.config.fail_stop_motion {
            self.record("stop_motion", None, "failed");
            return Err(anyhow!("simulated stop fault"));
        }

        if self.is_motion_in_progress() {
            log_warn!("mock board: stopping motion in progress");
        }
        self.stop_signal.notify_waiters();
        self.motion_in_progress.store(false, Ordering::SeqCst);
        self.record("stop_motion", None, "executed");
        Ok(())
    }

    async fn set_leds(&self, squares: &[String], color: &str) -> Result<()> {
        self.lock_state().lit_squares = squares.iter().cloned().collect();
        self.record("set_leds", Some(&format!("{} {color}", squares.join(","))), "done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::SetPositionStatus;

    const KINGS_ONLY: &str = "4k3/8/8/8/8/8/8/4K3 w - - 0 1";

    #[tokio::test]
    async fn connect_loads_starting_position() {
        let board = MockBoardDriver::new(MockBoardConfig::instant());
        assert_eq!(board.connection_status(), ConnectionStatus::Disconnected);

        let status = board.connect(None).await.unwrap();

        assert_eq!(status, ConnectionStatus::Connected);
        assert_eq!(board.get_position().await.unwrap().unwrap().len(), 32);
    }

    #[tokio::test]
    async fn connect_failure_is_reported_as_status() {
        let board = MockBoardDriver::new(MockBoardConfig {
            fail_connect: true,
            ..MockBoardConfig::instant()
        });

        assert_eq!(board.connect(None).await.unwrap(), ConnectionStatus::Error);
        assert_eq!(board.connection_status(), ConnectionStatus::Error);
    }

    #[tokio::test]
    async fn scan_returns_the_mock_device() {
        let board = MockBoardDriver::new(MockBoardConfig::instant());
        let devices = board.scan_for_devices().await;

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].model, "Mock Robotic Board");
    }

    #[tokio::test]
    async fn set_position_requires_connection() {
        let board = MockBoardDriver::new(MockBoardConfig::instant());
        let result = board.set_position(KINGS_ONLY).await.unwrap();

        assert_eq!(result.status, SetPositionStatus::Failed);
        assert_eq!(result.message.as_deref(), Some("Not connected"));
    }

    #[tokio::test]
    async fn set_position_validates_fen() {
        let board = MockBoardDriver::new(MockBoardConfig::instant());
        board.connect(None).await.unwrap();

        let result = board.set_position("8/8/8/8/8/8/8/8 w - - 0 1").await.unwrap();

        assert_eq!(result.status, SetPositionStatus::Failed);
        assert!(result.message.unwrap().starts_with("Invalid FEN"));
    }

    #[tokio::test]
    async fn set_position_updates_board() {
        let board = MockBoardDriver::new(MockBoardConfig::instant());
        board.connect(None).await.unwrap();

        let result = board.set_position(KINGS_ONLY).await.unwrap();
        let position = board.get_position().await.unwrap().unwrap();

        assert!(result.is_success());
        assert_eq!(position.len(), 2);
        assert_eq!(position.get("e1").map(String::as_str), Some("K"));
        assert_eq!(board.set_position_calls(), 1);
    }

    #[tokio::test]
    async fn stop_motion_interrupts_move() {
        let board = Arc::new(MockBoardDriver::new(MockBoardConfig {
            set_position_delay_ms: 5_000,
            ..MockBoardConfig::instant()
        }));
        board.connect(None).await.unwrap();

        let mover = {
            let board = board.clone();
            tokio::spawn(async move { board.set_position(KINGS_ONLY).await })
        };

        while !board.is_motion_in_progress() {
            tokio::task::yield_now().await;
        }
        board.stop_motion().await.unwrap();

        let result = mover.await.unwrap().unwrap();
        assert_eq!(result.status, SetPositionStatus::Cancelled);
        assert!(!board.is_motion_in_progress());
        assert_eq!(board.current_position().len(), 32);
    }

    #[tokio::test]
    async fn failing_stop_reports_an_error() {
        let board = MockBoardDriver::new(MockBoardConfig {
            fail_stop_motion: true,
            ..MockBoardConfig::instant()
        });

        assert!(board.stop_motion().await.is_err());
        assert_eq!(board.stop_motion_calls(), 0);
    }

    #[tokio::test]
    async fn command_log_records_outcomes_until_reset() {
        let board = MockBoardDriver::new(MockBoardConfig::instant());
        board.connect(None).await.unwrap();
        board.set_position(KINGS_ONLY).await.unwrap();

        let outcomes: Vec<(String, String)> = board
            .command_log()
            .into_iter()
            .map(|entry| (entry.command, entry.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                ("connect".to_string(), "started".to_string()),
                ("connect".to_string(), "connected".to_string()),
                ("set_position".to_string(), "started".to_string()),
                ("set_position".to_string(), "success".to_string()),
            ]
        );

        board.reset();

        assert!(board.command_log().is_empty());
        assert_eq!(board.connection_status(), ConnectionStatus::Disconnected);
        assert!(board.current_position().is_empty());
    }

    #[tokio::test]
    async fn leds_and_disconnect() {
        let board = MockBoardDriver::new(MockBoardConfig::instant());
        board.connect(None).await.unwrap();

        board
            .set_leds(&["e4".to_string(), "d5".to_string()], "green")
            .await
            .unwrap();
        assert_eq!(board.lit_squares().len(), 2);

        board.disconnect().await.unwrap();
        assert_eq!(board.connection_status(), ConnectionStatus::Disconnected);
        assert!(board.lit_squares().is_empty());
        assert!(board.get_position().await.unwrap().is_none());
    }
}
