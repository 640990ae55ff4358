//! Shared servo bus
//!
//! One half-duplex UART carries commands to every servo and status responses
//! back. The bus serializes writes through an async mutex, frames incoming
//! bytes and routes each response to the servo that asked for it.
//!
//! The bus is an ordinary value: firmware typically places it in a
//! `static_cell::StaticCell` and hands `&'static` references to servos, a
//! motion player and the receive task.
//!
//! ```ignore
//! let bus = BUS.init(ServoBus::new(uart_tx, BusConfig::default())?);
//! spawner.spawn(servo_rx_task(bus, uart_rx))?;
//!
//! let pan = Servo::new(bus, 1)?;
//! pan.set_angle_in_time(45.0, Duration::from_millis(500)).await?;
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Duration;
use embedded_io_async::{Read, Write};

use rs30x_core::config::BusConfig;
use rs30x_protocol::{Command, FrameError, PacketFramer, Payload};

use crate::correlator::{Correlator, Delivery, Registration, RegistryError};
use crate::error::ServoError;

/// Receive chunk size used by [`ServoBus::receive`]
const RX_CHUNK: usize = 32;

/// A UART shared by a group of RS30X servos
pub struct ServoBus<M: RawMutex, T: Write> {
    tx: Mutex<M, T>,
    framer: BlockingMutex<M, RefCell<PacketFramer>>,
    correlator: Correlator<M>,
    config: BusConfig,
}

impl<M: RawMutex, T: Write> ServoBus<M, T> {
    /// Create a bus writing to `tx`
    pub fn new(tx: T, config: BusConfig) -> Result<Self, ServoError<T::Error>> {
        config.validate()?;
        Ok(Self {
            tx: Mutex::new(tx),
            framer: BlockingMutex::new(RefCell::new(PacketFramer::new())),
            correlator: Correlator::new(),
            config,
        })
    }

    /// Bus configuration
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// How long a status request waits for its response
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.config.response_timeout_ms as u64)
    }

    /// Whether a servo with `id` is live on this bus
    pub fn is_registered(&self, id: u8) -> bool {
        self.correlator.is_registered(id)
    }

    /// Whether a status request for `id` is outstanding
    pub fn is_pending(&self, id: u8) -> bool {
        self.correlator.is_pending(id)
    }

    pub(crate) fn register(&self, id: u8) -> Result<Registration, ServoError<T::Error>> {
        let registration = self.correlator.register(id).map_err(registry_error)?;
        log_debug!("servo {} registered", id);
        Ok(registration)
    }

    pub(crate) fn unregister(&self, registration: &Registration) {
        self.correlator.unregister(registration);
        log_debug!("servo {} unregistered", registration.id());
    }

    pub(crate) fn transfer(&self, registration: &mut Registration, reservation: Registration) {
        log_debug!("servo {} moved to {}", registration.id(), reservation.id());
        self.correlator.transfer(registration, reservation);
    }

    /// Write raw packet bytes
    ///
    /// Concurrent writers are serialized so packets never interleave. Dropping
    /// the returned future part way through a write leaves a truncated packet
    /// on the wire.
    pub async fn write(&self, packet: &[u8]) -> Result<(), ServoError<T::Error>> {
        let mut tx = self.tx.lock().await;
        let result = match tx.write_all(packet).await {
            Ok(()) => tx.flush().await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            log_error!("servo bus write of {} bytes failed", packet.len());
        }
        result.map_err(ServoError::Serial)
    }

    /// Encode and write a command to `device_id`
    pub async fn send(&self, device_id: u8, command: &Command) -> Result<(), ServoError<T::Error>> {
        let packet = command.encode(device_id)?;
        log_trace!("tx {:?} to {}", command.kind(), device_id);
        self.write(&packet).await
    }

    /// Write `packet` and wait for the registered servo's response
    ///
    /// Returns `Ok(None)` if nothing arrives within the response timeout.
    /// A second request for the same id while one is outstanding is rejected
    /// before anything is written.
    pub(crate) async fn request(
        &self,
        registration: &Registration,
        packet: &[u8],
    ) -> Result<Option<Payload>, ServoError<T::Error>> {
        let pending = self.correlator.begin(registration).map_err(registry_error)?;
        self.write(packet).await?;

        let response = pending.wait(self.response_timeout()).await;
        if response.is_none() {
            log_warn!(
                "servo {} did not respond within {}ms",
                registration.id(),
                self.config.response_timeout_ms
            );
        }
        Ok(response)
    }

    /// Feed received bytes, returning how many responses were delivered
    ///
    /// Call from the receive task whenever the UART has data. Echoes of our
    /// own commands, corrupted packets and responses nobody waits for are
    /// logged and dropped.
    pub fn on_readable(&self, bytes: &[u8]) -> usize {
        let mut delivered = 0;
        self.framer.lock(|framer| {
            framer.borrow_mut().feed_all(bytes, |result| match result {
                Ok(frame) if frame.is_echo() => {
                    log_trace!("echo from {} ignored", frame.device_id);
                }
                Ok(frame) => {
                    let id = frame.device_id;
                    match self.correlator.complete(id, frame.payload) {
                        Delivery::Delivered => {
                            log_trace!("response from {} delivered", id);
                            delivered += 1;
                        }
                        Delivery::NotPending => {
                            log_debug!("response from {} with no request waiting, dropped", id);
                        }
                        Delivery::Unregistered => {
                            log_warn!("response from unknown servo {}, dropped", id);
                        }
                    }
                }
                Err(FrameError::ChecksumMismatch { device_id }) => {
                    log_warn!("checksum mismatch in packet from {}", device_id);
                }
                Err(FrameError::LengthOverflow { declared }) => {
                    log_warn!("packet length {} exceeds receive buffer", declared);
                }
            });
        });
        delivered
    }

    /// Pump bytes from `rx` into the bus until it reports end of stream
    ///
    /// Read errors discard the partial packet and reading continues. A UART
    /// never reaches end of stream, so on target this runs forever.
    pub async fn receive<R: Read>(&self, rx: &mut R) {
        let mut buf = [0u8; RX_CHUNK];
        loop {
            match rx.read(&mut buf).await {
                Ok(0) => {
                    log_debug!("servo rx stream closed");
                    return;
                }
                Ok(n) => {
                    self.on_readable(&buf[..n]);
                }
                Err(_) => {
                    log_warn!("servo rx error, resynchronizing");
                    self.framer.lock(|framer| framer.borrow_mut().reset());
                }
            }
        }
    }
}

fn registry_error<E>(e: RegistryError) -> ServoError<E> {
    match e {
        RegistryError::Duplicate { id } => ServoError::DuplicateRegistration { id },
        RegistryError::Full => ServoError::RegistryFull,
        RegistryError::Pending { id } => ServoError::RequestPending { id },
    }
}
