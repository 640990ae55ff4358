//! Response correlation
//!
//! Every live servo owns one registry slot keyed by its id. A slot holds a
//! pending flag and a [`Signal`] the response is delivered through. A status
//! request marks the slot pending, waits on the signal with a timeout and
//! clears the flag again on every exit path, so at most one request per id is
//! ever in flight.
//!
//! Completion and expiry both run under the registry lock: a response either
//! reaches the waiter or is dropped, never both, and never after the waiter
//! has given up.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration};

use rs30x_protocol::Payload;

/// Maximum number of servos registered on one bus
pub const MAX_SERVOS: usize = 16;

/// Registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// Id already registered
    Duplicate { id: u8 },
    /// No free slot
    Full,
    /// A request for this id is outstanding
    Pending { id: u8 },
}

/// Proof of a registered id, owned by exactly one servo handle
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Registration {
    slot: usize,
    id: u8,
}

impl Registration {
    /// Registered device id
    pub fn id(&self) -> u8 {
        self.id
    }
}

/// Outcome of routing a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// Handed to the waiting request
    Delivered,
    /// Id registered but nothing is waiting (late or unsolicited)
    NotPending,
    /// No servo with this id
    Unregistered,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    id: u8,
    pending: bool,
}

/// Id registry plus one response signal per slot
pub struct Correlator<M: RawMutex> {
    slots: Mutex<M, RefCell<[Option<Slot>; MAX_SERVOS]>>,
    responses: [Signal<M, Payload>; MAX_SERVOS],
}

impl<M: RawMutex> Correlator<M> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([None; MAX_SERVOS])),
            responses: core::array::from_fn(|_| Signal::new()),
        }
    }

    /// Claim a slot for `id`
    pub fn register(&self, id: u8) -> Result<Registration, RegistryError> {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            if slots.iter().flatten().any(|s| s.id == id) {
                return Err(RegistryError::Duplicate { id });
            }
            let slot = slots
                .iter()
                .position(Option::is_none)
                .ok_or(RegistryError::Full)?;
            slots[slot] = Some(Slot { id, pending: false });
            self.responses[slot].reset();
            Ok(Registration { slot, id })
        })
    }

    /// Release a slot
    pub fn unregister(&self, registration: &Registration) {
        self.slots.lock(|slots| {
            slots.borrow_mut()[registration.slot] = None;
            self.responses[registration.slot].reset();
        });
    }

    /// Move `registration` onto a slot reserved for its new id
    ///
    /// Releases the old slot and takes over `reservation` in one step, so
    /// neither id is ever free for another handle in between.
    pub fn transfer(&self, registration: &mut Registration, reservation: Registration) {
        self.slots.lock(|slots| {
            slots.borrow_mut()[registration.slot] = None;
            self.responses[registration.slot].reset();
        });
        *registration = reservation;
    }

    /// Whether a servo with `id` is registered
    pub fn is_registered(&self, id: u8) -> bool {
        self.slots
            .lock(|slots| slots.borrow().iter().flatten().any(|s| s.id == id))
    }

    /// Whether a request for `id` is outstanding
    pub fn is_pending(&self, id: u8) -> bool {
        self.slots.lock(|slots| {
            slots
                .borrow()
                .iter()
                .flatten()
                .any(|s| s.id == id && s.pending)
        })
    }

    /// Mark the registration's slot pending
    ///
    /// Fails without side effects if a request is already outstanding. The
    /// returned guard clears the pending flag when dropped.
    pub fn begin<'c>(
        &'c self,
        registration: &Registration,
    ) -> Result<PendingRequest<'c, M>, RegistryError> {
        let slot = registration.slot;
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            match slots[slot].as_mut() {
                Some(s) if s.pending => Err(RegistryError::Pending { id: s.id }),
                Some(s) => {
                    s.pending = true;
                    self.responses[slot].reset();
                    Ok(())
                }
                None => Err(RegistryError::Full),
            }
        })?;
        Ok(PendingRequest {
            correlator: self,
            slot,
        })
    }

    /// Route a response to the request waiting on `id`
    pub fn complete(&self, id: u8, payload: Payload) -> Delivery {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let found = slots
                .iter_mut()
                .enumerate()
                .find_map(|(i, s)| s.as_mut().filter(|s| s.id == id).map(|s| (i, s)));
            match found {
                Some((i, s)) if s.pending => {
                    s.pending = false;
                    self.responses[i].signal(payload);
                    Delivery::Delivered
                }
                Some(_) => Delivery::NotPending,
                None => Delivery::Unregistered,
            }
        })
    }

    /// Give up on a slot after its timeout fired
    ///
    /// A response that completed between the timeout and this call is still
    /// returned.
    fn expire(&self, slot: usize) -> Option<Payload> {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            match slots[slot].as_mut() {
                Some(s) if s.pending => {
                    s.pending = false;
                    None
                }
                _ => self.responses[slot].try_take(),
            }
        })
    }

    fn abandon(&self, slot: usize) {
        self.slots.lock(|slots| {
            if let Some(s) = slots.borrow_mut()[slot].as_mut() {
                s.pending = false;
            }
            self.responses[slot].reset();
        });
    }
}

impl<M: RawMutex> Default for Correlator<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// An outstanding request, cleared on drop
pub struct PendingRequest<'c, M: RawMutex> {
    correlator: &'c Correlator<M>,
    slot: usize,
}

impl<M: RawMutex> PendingRequest<'_, M> {
    /// Wait for the response, `None` once `timeout` has elapsed
    pub async fn wait(&self, timeout: Duration) -> Option<Payload> {
        match with_timeout(timeout, self.correlator.responses[self.slot].wait()).await {
            Ok(payload) => Some(payload),
            Err(_) => self.correlator.expire(self.slot),
        }
    }
}

impl<M: RawMutex> Drop for PendingRequest<'_, M> {
    fn drop(&mut self) {
        self.correlator.abandon(self.slot);
    }
}
