pub mod mock;

use std::future::Future;

use anyhow::Result;

use crate::models::{ConnectionStatus, DeviceInfo, SetPositionResult};

pub use mock::{BoardCommand, MockBoardConfig, MockBoardDriver};

/// An e-board driver. `Err` from any method is a driver exception; structured refusals are
/// reported through `SetPositionResult` instead.
///
/// Implementations manage their own connection state and must tolerate `stop_motion` arriving
/// while `set_position` is still in flight.
pub trait BoardDriver: Send + Sync + 'static {
    fn connection_status(&self) -> ConnectionStatus;

    /// Connects to `device`, or the first available one when `None`.
    fn connect(
        &self,
        device: Option<DeviceInfo>,
    ) -> impl Future<Output = Result<ConnectionStatus>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Starts physical piece movement towards `fen`.
    fn set_position(&self, fen: &str) -> impl Future<Output = Result<SetPositionResult>> + Send;

    /// Square to piece map, or `None` when the board cannot report it.
    fn get_position(
        &self,
    ) -> impl Future<Output = Result<Option<std::collections::BTreeMap<String, String>>>> + Send;

    /// Halts all motion. Must be processed as quickly as possible.
    fn stop_motion(&self) -> impl Future<Output = Result<()>> + Send;

    fn set_leds(&self, squares: &[String], color: &str) -> impl Future<Output = Result<()>> + Send;
}
