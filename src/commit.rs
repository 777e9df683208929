//! Fetch, mutate, commit
//!
//! Every state-mutating operation runs as one session: fetch a fresh device
//! snapshot from the controller, mutate it in memory, push it back whole.
//! A session that is dropped without [`Session::commit`] discards its
//! mutations; nothing reaches the controller before the commit.
//!
//! There is no concurrency token. Two sessions against the same device race
//! and the last commit wins; callers serialize access to a device.

use crate::controller::ControllerGateway;
use crate::device::DeviceState;
use crate::error::{GatewayError, SyncError};
use tracing::{debug, info_span};

/// Opens sessions against a controller
pub struct ChangeCommitter<'g, G: ControllerGateway + ?Sized> {
    gateway: &'g G,
}

impl<'g, G: ControllerGateway + ?Sized> ChangeCommitter<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &'g G {
        self.gateway
    }

    /// Fetch the current device and open a session on it
    pub fn begin(&self) -> Result<Session<'g, G>, GatewayError> {
        let device = self.gateway.fetch_current_device()?;
        debug!(device_id = device.id(), "Session opened");
        Ok(Session {
            gateway: self.gateway,
            device,
        })
    }

    /// Run `mutate` inside a session and commit if it succeeds.
    ///
    /// An error from `mutate` drops the session, so the controller keeps its
    /// previous state.
    pub fn apply<T, F>(&self, operation: &str, mutate: F) -> Result<T, SyncError>
    where
        F: FnOnce(&mut Session<'g, G>) -> Result<T, SyncError>,
    {
        let span = info_span!("commit", operation);
        let _enter = span.enter();

        let mut session = self.begin()?;
        let value = mutate(&mut session)?;
        session.commit()?;
        Ok(value)
    }
}

/// A device snapshot checked out from the controller
pub struct Session<'g, G: ControllerGateway + ?Sized> {
    gateway: &'g G,
    device: DeviceState,
}

impl<'g, G: ControllerGateway + ?Sized> Session<'g, G> {
    pub fn controller(&self) -> &'g G {
        self.gateway
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut DeviceState {
        &mut self.device
    }

    /// Push the snapshot back to the controller
    pub fn commit(self) -> Result<(), GatewayError> {
        self.gateway.commit_device(&self.device)?;
        debug!(device_id = self.device.id(), "Session committed");
        Ok(())
    }
}
