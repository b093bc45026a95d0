//! Buses and the bus line: seat reservation, boarding, departure, and the
//! queue of buses still to arrive.
//!
//! Seats are claimed in two steps. A reservation is taken synchronously when
//! a passenger starts moving toward the bus, and consumed (or released) when
//! the move completes. Capacity checks always count reservations, so the sum
//! of boarded and in-flight passengers can never exceed [`BUS_CAPACITY`].

use crate::id::PassengerId;
use crate::passenger::PassengerColor;
use crate::traits::BusTrait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Seats per bus. A bus departs the moment the last seat is taken.
pub const BUS_CAPACITY: usize = 3;

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// The configuration one bus spawns from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusTemplate {
    pub color: PassengerColor,
    /// Seats held for reserved passengers, if this bus carries any.
    pub reserved_capacity: Option<u32>,
}

impl BusTemplate {
    pub fn plain(color: PassengerColor) -> Self {
        Self {
            color,
            reserved_capacity: None,
        }
    }

    pub fn with_reserved_seats(color: PassengerColor, seats: u32) -> Self {
        Self {
            color,
            reserved_capacity: Some(seats),
        }
    }
}

/// One bus at the stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    color: PassengerColor,
    boarded: Vec<PassengerId>,
    traits: Vec<BusTrait>,
    in_flight: u32,
    reserved_in_flight: u32,
    locked: bool,
}

impl Bus {
    pub fn from_template(template: &BusTemplate) -> Self {
        let mut traits = Vec::new();
        if let Some(seats) = template.reserved_capacity {
            traits.push(BusTrait::reserved_bus(seats));
        }
        Self {
            color: template.color,
            boarded: Vec::new(),
            traits,
            in_flight: 0,
            reserved_in_flight: 0,
            locked: false,
        }
    }

    pub fn color(&self) -> PassengerColor {
        self.color
    }

    pub fn boarded(&self) -> &[PassengerId] {
        &self.boarded
    }

    pub fn is_full(&self) -> bool {
        self.boarded.len() >= BUS_CAPACITY
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Seats neither taken nor promised to an in-flight boarder.
    pub fn free_spots(&self) -> u32 {
        (BUS_CAPACITY - self.boarded.len()) as u32 - self.in_flight
    }

    /// Whether a passenger of this color and reservation status could claim
    /// a seat right now.
    pub fn can_accept(&self, color: PassengerColor, is_reserved: bool) -> bool {
        if self.locked || color != self.color || self.free_spots() == 0 {
            return false;
        }
        if is_reserved
            && !self
                .traits
                .iter()
                .any(|t| matches!(t, BusTrait::ReservedBus { .. }))
        {
            return false;
        }
        self.traits
            .iter()
            .all(|t| t.can_accept(is_reserved, self.free_spots(), self.reserved_in_flight))
    }

    /// Claim a seat for a passenger about to start moving. The claim holds
    /// until [`Self::finalize_boarding`] or [`Self::release_spot`].
    pub fn try_reserve_spot(&mut self, color: PassengerColor, is_reserved: bool) -> bool {
        if !self.can_accept(color, is_reserved) {
            return false;
        }
        self.in_flight += 1;
        if is_reserved {
            self.reserved_in_flight += 1;
        }
        true
    }

    /// Give back a claimed seat (the boarder was turned away mid-flight).
    pub fn release_spot(&mut self, is_reserved: bool) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if is_reserved {
            self.reserved_in_flight = self.reserved_in_flight.saturating_sub(1);
        }
    }

    /// Seat an arriving passenger, consuming its reservation. Returns the
    /// seat index; `None` when the bus somehow has no seat left, in which
    /// case the reservation is still consumed.
    pub fn finalize_boarding(&mut self, passenger: PassengerId, is_reserved: bool) -> Option<usize> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if is_reserved {
            self.reserved_in_flight = self.reserved_in_flight.saturating_sub(1);
        }
        if self.is_full() {
            return None;
        }
        self.boarded.push(passenger);
        for t in &mut self.traits {
            t.on_bus_boarded(is_reserved);
        }
        if self.is_full() {
            self.locked = true;
        }
        Some(self.boarded.len() - 1)
    }
}

// ---------------------------------------------------------------------------
// BusSystem
// ---------------------------------------------------------------------------

/// The bus line: the bus currently at the stop and the ones still to come.
///
/// `boarding_open` is false while the current bus is pulling in; the
/// simulation opens it when the arrival move completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSystem {
    current: Option<Bus>,
    boarding_open: bool,
    upcoming: VecDeque<BusTemplate>,
}

impl BusSystem {
    pub fn new(templates: Vec<BusTemplate>) -> Self {
        Self {
            current: None,
            boarding_open: false,
            upcoming: templates.into(),
        }
    }

    pub fn current(&self) -> Option<&Bus> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Bus> {
        self.current.as_mut()
    }

    pub fn boarding_open(&self) -> bool {
        self.boarding_open
    }

    pub fn upcoming_count(&self) -> usize {
        self.upcoming.len()
    }

    /// Whether the bus at the stop is open and would seat this passenger.
    pub fn accepts(&self, color: PassengerColor, is_reserved: bool) -> bool {
        self.boarding_open
            && self
                .current
                .as_ref()
                .is_some_and(|bus| bus.can_accept(color, is_reserved))
    }

    /// Pull the next bus off the line in the arriving state (boarding
    /// closed). Returns false when the line is exhausted.
    pub fn spawn_next(&mut self) -> bool {
        debug_assert!(self.current.is_none());
        match self.upcoming.pop_front() {
            Some(template) => {
                self.current = Some(Bus::from_template(&template));
                self.boarding_open = false;
                true
            }
            None => false,
        }
    }

    /// The current bus finished pulling in.
    pub fn open_boarding(&mut self) {
        if self.current.is_some() {
            self.boarding_open = true;
        }
    }

    /// Retire the current bus. Callers destroy its boarded passengers and
    /// decide whether to spawn the next one.
    pub fn depart(&mut self) -> Option<Bus> {
        self.boarding_open = false;
        self.current.take()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
