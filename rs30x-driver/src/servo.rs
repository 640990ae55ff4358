//! Servo handle
//!
//! A [`Servo`] addresses one device id on a [`ServoBus`]. Creating it claims
//! the id on the bus; dropping it releases the id again. Commands are fire and
//! forget: they resolve once the packet is written. Only
//! [`Servo::read_status`] waits for an answer.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Duration;
use embedded_io_async::Write;

use rs30x_protocol::{Command, Rotation, Status, TorqueMode};

use crate::bus::ServoBus;
use crate::correlator::Registration;
use crate::error::ServoError;

/// One RS30X servo on a shared bus
pub struct Servo<'a, M: RawMutex, T: Write> {
    bus: &'a ServoBus<M, T>,
    registration: Registration,
}

impl<'a, M: RawMutex, T: Write> Servo<'a, M, T> {
    /// Claim `id` on `bus`
    ///
    /// Fails with [`ServoError::DuplicateRegistration`] while another handle
    /// for the same id is alive.
    pub fn new(bus: &'a ServoBus<M, T>, id: u8) -> Result<Self, ServoError<T::Error>> {
        let registration = bus.register(id)?;
        Ok(Self { bus, registration })
    }

    /// Device id
    pub fn id(&self) -> u8 {
        self.registration.id()
    }

    /// Bus this servo talks on
    pub fn bus(&self) -> &'a ServoBus<M, T> {
        self.bus
    }

    async fn send(&self, command: Command) -> Result<(), ServoError<T::Error>> {
        self.bus.send(self.id(), &command).await
    }

    /// Move to `degrees` at full speed, clamped to ±150°
    pub async fn set_angle(&self, degrees: f32) -> Result<(), ServoError<T::Error>> {
        self.send(Command::SetAngle { degrees }).await
    }

    /// Move to `degrees` (clamped to ±150°) over `goal`
    ///
    /// The goal time has a resolution of 10ms.
    pub async fn set_angle_in_time(
        &self,
        degrees: f32,
        goal: Duration,
    ) -> Result<(), ServoError<T::Error>> {
        let goal_ms = goal.as_millis().min(u32::MAX as u64) as u32;
        self.send(Command::SetAngleInTime { degrees, goal_ms }).await
    }

    /// Switch torque on or off
    pub async fn set_torque(&self, enable: bool) -> Result<(), ServoError<T::Error>> {
        self.set_torque_mode(TorqueMode::from(enable)).await
    }

    /// Select torque mode, including brake
    pub async fn set_torque_mode(&self, mode: TorqueMode) -> Result<(), ServoError<T::Error>> {
        self.send(Command::SetTorque(mode)).await
    }

    /// Limit output torque to `percent` of maximum and store it in ROM
    pub async fn set_max_torque(&self, percent: u8) -> Result<(), ServoError<T::Error>> {
        self.send(Command::SetMaxTorque(percent)).await?;
        self.send(Command::Flash).await
    }

    /// Set the compliance slope for one direction of rotation
    pub async fn set_compliance_slope(
        &self,
        rotation: Rotation,
        slope: u8,
    ) -> Result<(), ServoError<T::Error>> {
        self.send(Command::SetComplianceSlope { rotation, slope }).await
    }

    /// Set the delay before the servo answers a request
    pub async fn set_return_delay(&self, delay: u8) -> Result<(), ServoError<T::Error>> {
        self.send(Command::SetReturnDelay(delay)).await
    }

    /// Restart the servo
    pub async fn reboot(&self) -> Result<(), ServoError<T::Error>> {
        self.send(Command::Reboot).await
    }

    /// Store a new device id in the servo's ROM
    ///
    /// This handle follows the servo to its new id. Fails with
    /// [`ServoError::DuplicateRegistration`] before anything is sent if
    /// `new_id` is already in use on this bus. Both ids stay claimed until
    /// the SET_SERVO_ID write resolves; on failure the handle keeps its old id.
    pub async fn flash_id(&mut self, new_id: u8) -> Result<(), ServoError<T::Error>> {
        let old_id = self.id();
        if new_id == old_id {
            return self.send(Command::Flash).await;
        }
        let reservation = self.bus.register(new_id)?;

        if let Err(e) = self.bus.send(old_id, &Command::SetServoId(new_id)).await {
            log_warn!("servo {} id change to {} failed", old_id, new_id);
            self.bus.unregister(&reservation);
            return Err(e);
        }
        self.bus.transfer(&mut self.registration, reservation);
        log_info!("servo {} now answers as {}", old_id, new_id);
        self.send(Command::Flash).await
    }

    /// Read the servo's present state
    ///
    /// Waits up to the bus response timeout. Fails with
    /// [`ServoError::RequestPending`] if a read for this servo is already in
    /// flight.
    pub async fn read_status(&self) -> Result<Status, ServoError<T::Error>> {
        let packet = Command::RequestStatus.encode(self.id())?;
        let payload = self
            .bus
            .request(&self.registration, &packet)
            .await?
            .ok_or(ServoError::NoResponse { id: self.id() })?;
        Ok(Status::decode(&payload)?)
    }

    /// Read the present angle in degrees
    pub async fn read_angle(&self) -> Result<f32, ServoError<T::Error>> {
        Ok(self.read_status().await?.angle_degrees())
    }
}

impl<M: RawMutex, T: Write> Drop for Servo<'_, M, T> {
    fn drop(&mut self) {
        self.bus.unregister(&self.registration);
    }
}
