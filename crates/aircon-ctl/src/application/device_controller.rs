//! DeviceController: per-unit use cases on top of the network services.
//!
//! A controller owns one unit's address and, once bound, its [`Session`].
//! The first operation binds; later operations reuse the session until
//! [`DeviceController::rebind`] is called or a reply stops decrypting (the
//! unit issued a new key to someone else), in which case the next operation
//! binds again.
//!
//! # Architecture
//!
//! The controller depends only on the [`DeviceLink`] trait.  The production
//! implementation, [`UdpDeviceLink`], calls the UDP services; tests inject a
//! mock.

use std::sync::Arc;
use std::time::Duration;

use aircon_core::{DeviceAddress, ParameterMap, ParameterName, ParameterValue, SessionKey};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::infrastructure::network::{
    self, ClientError, CommandResponse, Session, DEFAULT_REQUEST_TIMEOUT,
};

/// Lowest target temperature offered, in °C.
pub const MIN_TEMPERATURE_C: i64 = 16;
/// Highest target temperature offered, in °C.
pub const MAX_TEMPERATURE_C: i64 = 30;

/// Error type for device use cases.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("temperature {0} °C is outside 16..=30 °C")]
    TemperatureOutOfRange(i64),

    #[error("no parameters to set")]
    NothingToSet,

    #[error("device rejected command with status {status}")]
    CommandRejected { status: u16 },

    #[error("device did not report {0}")]
    MissingValue(ParameterName),

    #[error("{name} is not an on/off switch (value {value})")]
    NotASwitch {
        name: ParameterName,
        value: ParameterValue,
    },
}

/// Transport seam between the controller and a unit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Performs the bind handshake.
    async fn bind(&self, address: &DeviceAddress) -> Result<SessionKey, ClientError>;

    /// Reads the listed columns.
    async fn query(
        &self,
        session: &Session,
        columns: &[ParameterName],
    ) -> Result<ParameterMap, ClientError>;

    /// Sends one command.
    async fn command(
        &self,
        session: &Session,
        params: &ParameterMap,
    ) -> Result<CommandResponse, ClientError>;
}

/// [`DeviceLink`] over the UDP protocol services.
#[derive(Debug, Clone)]
pub struct UdpDeviceLink {
    request_timeout: Duration,
}

impl UdpDeviceLink {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for UdpDeviceLink {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait]
impl DeviceLink for UdpDeviceLink {
    async fn bind(&self, address: &DeviceAddress) -> Result<SessionKey, ClientError> {
        network::bind(address, self.request_timeout).await
    }

    async fn query(
        &self,
        session: &Session,
        columns: &[ParameterName],
    ) -> Result<ParameterMap, ClientError> {
        network::query_columns(session, columns, self.request_timeout).await
    }

    async fn command(
        &self,
        session: &Session,
        params: &ParameterMap,
    ) -> Result<CommandResponse, ClientError> {
        network::set_parameters(session, params, self.request_timeout).await
    }
}

/// Use-case handle for one unit.
pub struct DeviceController {
    name: String,
    address: DeviceAddress,
    link: Arc<dyn DeviceLink>,
    session: Option<Session>,
}

impl DeviceController {
    pub fn new(name: impl Into<String>, address: DeviceAddress, link: Arc<dyn DeviceLink>) -> Self {
        Self {
            name: name.into(),
            address,
            link,
            session: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    pub fn is_bound(&self) -> bool {
        self.session.is_some()
    }

    /// Discards any cached session and binds again.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] from the handshake, wrapped in
    /// [`ControlError::Client`].
    pub async fn rebind(&mut self) -> Result<(), ControlError> {
        self.session = None;
        self.session().await.map(|_| ())
    }

    /// Reads every known status column.
    ///
    /// # Errors
    ///
    /// [`ControlError::Client`] if binding or the query fails.
    pub async fn status(&mut self) -> Result<ParameterMap, ControlError> {
        self.query(&ParameterName::STATUS_COLUMNS).await
    }

    /// Sends `params` and returns the values the unit reports as applied.
    ///
    /// # Errors
    ///
    /// - [`ControlError::NothingToSet`] for an empty map.
    /// - [`ControlError::CommandRejected`] if the unit answers with a
    ///   failure status.
    /// - [`ControlError::Client`] if binding or the exchange fails.
    pub async fn set_values(&mut self, params: &ParameterMap) -> Result<ParameterMap, ControlError> {
        if params.is_empty() {
            return Err(ControlError::NothingToSet);
        }

        let session = self.session().await?;
        let result = self.link.command(&session, params).await;
        let response = result.map_err(|e| self.after_failure(e))?;

        if !response.success {
            return Err(ControlError::CommandRejected {
                status: response.status,
            });
        }

        info!(device = %self.name, %params, "parameters set");
        Ok(response.applied)
    }

    /// Sets a single on/off column.
    ///
    /// # Errors
    ///
    /// Same as [`set_values`](Self::set_values).
    pub async fn set_switch(&mut self, name: ParameterName, on: bool) -> Result<ParameterMap, ControlError> {
        let params = ParameterMap::new().with(name, i64::from(on));
        self.set_values(&params).await
    }

    /// Turns the unit on or off.
    ///
    /// # Errors
    ///
    /// Same as [`set_values`](Self::set_values).
    pub async fn set_power(&mut self, on: bool) -> Result<ParameterMap, ControlError> {
        self.set_switch(ParameterName::Power, on).await
    }

    /// Flips an on/off column: reads its current value and writes the
    /// opposite.  Returns the new state.
    ///
    /// # Errors
    ///
    /// - [`ControlError::MissingValue`] if the unit does not report the column.
    /// - [`ControlError::NotASwitch`] if its value is not an integer.
    /// - Anything [`set_values`](Self::set_values) returns.
    pub async fn toggle(&mut self, name: ParameterName) -> Result<bool, ControlError> {
        let current = self.query(std::slice::from_ref(&name)).await?;

        let on = match current.get(&name) {
            None => return Err(ControlError::MissingValue(name)),
            Some(ParameterValue::Int(v)) => *v == 0,
            Some(value @ ParameterValue::Text(_)) => {
                return Err(ControlError::NotASwitch {
                    value: value.clone(),
                    name,
                })
            }
        };

        debug!(device = %self.name, %name, on, "toggling");
        self.set_switch(name, on).await?;
        Ok(on)
    }

    /// Sets the target temperature in Celsius.
    ///
    /// # Errors
    ///
    /// - [`ControlError::TemperatureOutOfRange`] outside 16..=30 °C.
    /// - Anything [`set_values`](Self::set_values) returns.
    pub async fn set_temperature(&mut self, celsius: i64) -> Result<ParameterMap, ControlError> {
        if !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&celsius) {
            return Err(ControlError::TemperatureOutOfRange(celsius));
        }

        let params = ParameterMap::new()
            .with(ParameterName::TemperatureUnit, 0)
            .with(ParameterName::SetTemperature, celsius);
        self.set_values(&params).await
    }

    async fn query(&mut self, columns: &[ParameterName]) -> Result<ParameterMap, ControlError> {
        let session = self.session().await?;
        let result = self.link.query(&session, columns).await;
        result.map_err(|e| self.after_failure(e))
    }

    /// Returns the cached session, binding first if there is none.
    async fn session(&mut self) -> Result<Session, ControlError> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }

        let key = self.link.bind(&self.address).await?;
        let session = Session::new(self.address.clone(), key);
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Drops the cached session when a reply no longer decrypts with it.
    fn after_failure(&mut self, err: ClientError) -> ControlError {
        if matches!(err, ClientError::Decode(_)) {
            debug!(device = %self.name, "session key rejected, will rebind");
            self.session = None;
        }
        ControlError::Client(err)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
