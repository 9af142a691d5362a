// Copyright 2016-2018 Mateusz Sieczko and other GilRs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! joypad-core - normalization and polling core for HID game controllers
//! =====================================================================
//!
//! joypad-core turns heterogeneous raw HID reports from attached game
//! controllers into a uniform logical joypad model, so layers above it
//! (input remapping, game logic) can address "joypad 3, axis 2" without
//! caring about the physical controller's report layout, usage pages or
//! calibration range.
//!
//! The host HID subsystem is not part of this crate. An integration has to
//! provide:
//!
//! * A [`HidElement`] handle exposing an element's type, usage, logical
//!   range, stable cookie and (for collections) children
//! * A [`HidDevice`] handle exposing identity, metadata, its element list
//!   and per-element raw value reads
//! * A [`HidSystem`] that queues attach/remove notifications and hands them
//!   out without blocking
//!
//! On top of that boundary, [`classify`] buckets a device's elements into
//! axes, buttons and hats, and [`JoypadTracker`] keeps one [`Joypad`] per
//! attached device up to date: every [`JoypadTracker::poll`] drains pending
//! hotplug notifications, samples all bound elements, normalizes the raw
//! values into the signed 16-bit range and reports every transition through
//! the registered change handler.
//!
//! All read failures degrade to neutral values; one misbehaving device can
//! not stop polling of the others.

use uuid::Uuid;
use vec_map::VecMap;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

mod classify;
pub mod hid;
mod tracker;
mod utils;

pub use crate::classify::{classify, Classified};
pub use crate::hid::{ElementKind, HidDevice, HidElement, HidSystem, HotplugEvent};
pub use crate::tracker::{ChangeHandler, JoypadTracker};

/// Logical input group of a joypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum Group {
    Axis,
    Button,
    Hat,
}

/// One value transition observed during [`JoypadTracker::poll`].
///
/// Buttons report 0 and 1; axes and hat directions report the full signed
/// 16-bit range. The handler runs before `new` is committed, so the joypad
/// passed along with the event still holds `old`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ChangeEvent {
    pub group: Group,
    pub index: usize,
    pub old: i16,
    pub new: i16,
}

/// Logical range of an element, captured when its device is attached.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct AxisInfo {
    pub min: i32,
    pub max: i32,
}

/// Normalized public model of one controller.
///
/// Values are indexed in the order elements were classified at attach time.
/// Indices are stable while the device stays attached and carry no meaning
/// beyond that session.
#[derive(Clone, Debug)]
pub struct Joypad {
    name: String,
    uuid: Uuid,
    vendor_id: u16,
    product_id: u16,
    axes: VecMap<i16>,
    buttons: VecMap<bool>,
    hats: VecMap<i16>,
}

impl Joypad {
    pub(crate) fn new(
        name: String,
        vendor_id: u16,
        product_id: u16,
        axes: usize,
        buttons: usize,
        hat_slots: usize,
    ) -> Self {
        let mut joypad = Joypad {
            name,
            uuid: create_uuid(vendor_id, product_id),
            vendor_id,
            product_id,
            axes: VecMap::with_capacity(axes),
            buttons: VecMap::with_capacity(buttons),
            hats: VecMap::with_capacity(hat_slots),
        };

        for n in 0..axes {
            joypad.axes.insert(n, 0);
        }
        for n in 0..buttons {
            joypad.buttons.insert(n, false);
        }
        for n in 0..hat_slots {
            joypad.hats.insert(n, 0);
        }

        joypad
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    /// Number of hat value slots. Every physical hat contributes two
    /// adjacent slots: x (left/right) first, then y (up/down).
    pub fn hat_count(&self) -> usize {
        self.hats.len()
    }

    /// Returns the normalized value of axis `n`, or 0 for unknown indices.
    pub fn axis(&self, n: usize) -> i16 {
        self.axes.get(n).copied().unwrap_or(0)
    }

    /// Returns `true` if button `n` is pressed. Unknown indices read as
    /// released.
    pub fn button(&self, n: usize) -> bool {
        self.buttons.get(n).copied().unwrap_or(false)
    }

    /// Returns the normalized value of hat slot `n`, or 0 for unknown
    /// indices.
    pub fn hat(&self, n: usize) -> i16 {
        self.hats.get(n).copied().unwrap_or(0)
    }

    pub(crate) fn value(&self, group: Group, index: usize) -> i16 {
        match group {
            Group::Axis => self.axis(index),
            Group::Button => self.button(index) as i16,
            Group::Hat => self.hat(index),
        }
    }

    pub(crate) fn set_value(&mut self, group: Group, index: usize, value: i16) {
        match group {
            Group::Axis => {
                self.axes.insert(index, value);
            }
            Group::Button => {
                self.buttons.insert(index, value != 0);
            }
            Group::Hat => {
                self.hats.insert(index, value);
            }
        }
    }
}

fn create_uuid(vendor_id: u16, product_id: u16) -> Uuid {
    // Bus type is not reported through the HID boundary; assume USB.
    let bus = 0x03u32.to_be();
    let vendor = vendor_id.to_be();
    let product = product_id.to_be();
    Uuid::from_fields(
        bus,
        vendor,
        0,
        &[(product >> 8) as u8, product as u8, 0, 0, 0, 0, 0, 0],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdl_uuid() {
        let x = Uuid::parse_str("030000005e0400008e02000000000000").unwrap();
        let y = create_uuid(0x045e, 0x028e);
        assert_eq!(x, y);
    }

    #[test]
    fn joypad_starts_neutral() {
        let joypad = Joypad::new("Pad".to_owned(), 0x045e, 0x028e, 4, 12, 2);
        assert_eq!(joypad.axis_count(), 4);
        assert_eq!(joypad.button_count(), 12);
        assert_eq!(joypad.hat_count(), 2);
        assert!((0..4).all(|n| joypad.axis(n) == 0));
        assert!((0..12).all(|n| !joypad.button(n)));
        assert!((0..2).all(|n| joypad.hat(n) == 0));
    }
}
