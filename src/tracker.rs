// Copyright 2016-2018 Mateusz Sieczko and other GilRs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Tracking and polling of attached devices.

use log::{debug, info};

use crate::classify::classify;
use crate::hid::{HidDevice, HidElement, HidSystem, HotplugEvent};
use crate::utils::clamp_i16;
use crate::{AxisInfo, ChangeEvent, Group, Joypad};

const NEUTRAL: i16 = 0;
const LEFT: i16 = -1;
const RIGHT: i16 = 1;
const UP: i16 = -1;
const DOWN: i16 = 1;

// Octant 0 is north, continuing clockwise. Pairs are (x, y).
const HAT_DIRECTIONS: [(i16, i16); 8] = [
    (NEUTRAL, UP),
    (RIGHT, UP),
    (RIGHT, NEUTRAL),
    (RIGHT, DOWN),
    (NEUTRAL, DOWN),
    (LEFT, DOWN),
    (LEFT, NEUTRAL),
    (LEFT, UP),
];

/// Sink for value transitions, invoked synchronously during
/// [`JoypadTracker::poll`] before the new value is committed.
pub type ChangeHandler = Box<dyn FnMut(&Joypad, ChangeEvent)>;

/// Owns the set of currently tracked devices and keeps their logical
/// joypads synchronized with the raw values reported by the HID boundary.
pub struct JoypadTracker<S: HidSystem> {
    system: S,
    devices: Vec<TrackedDevice<S::Device>>,
    on_change: Option<ChangeHandler>,
}

struct TrackedDevice<D: HidDevice> {
    device: D,
    axes: Vec<(D::Element, AxisInfo)>,
    buttons: Vec<D::Element>,
    hats: Vec<(D::Element, AxisInfo)>,
    joypad: Joypad,
}

impl<S: HidSystem> JoypadTracker<S> {
    pub fn new(system: S) -> Self {
        JoypadTracker {
            system,
            devices: Vec::new(),
            on_change: None,
        }
    }

    /// Registers the handler that receives every value transition observed
    /// while polling.
    pub fn set_change_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&Joypad, ChangeEvent) + 'static,
    {
        self.on_change = Some(Box::new(handler));
    }

    /// Classifies `device` and starts tracking it. Devices without a single
    /// recognized element are ignored.
    pub fn attach(&mut self, device: S::Device) {
        if self.devices.iter().any(|dev| dev.device.id() == device.id()) {
            // We already know this device, ignore it:
            debug!("Device {} is already tracked, ignoring attach", device.id());
            return;
        }

        let elements = device.elements();
        let classified = classify(&elements);
        if classified.is_empty() {
            debug!(
                "Device {:04x}:{:04x} has no usable elements, ignoring",
                device.vendor_id(),
                device.product_id()
            );
            return;
        }

        let axes: Vec<_> = classified
            .axes
            .into_iter()
            .map(|element| {
                let info = AxisInfo {
                    min: element.logical_min(),
                    max: element.logical_max(),
                };
                (element, info)
            })
            .collect();
        let hats: Vec<_> = classified
            .hats
            .into_iter()
            .map(|element| {
                let info = AxisInfo {
                    min: element.logical_min(),
                    max: element.logical_max(),
                };
                (element, info)
            })
            .collect();
        let buttons = classified.buttons;

        let joypad = Joypad::new(
            device.name(),
            device.vendor_id(),
            device.product_id(),
            axes.len(),
            buttons.len(),
            hats.len() * 2,
        );

        info!(
            "Joypad {} ({:04x}:{:04x}) connected: {} axes, {} buttons, {} hats.",
            joypad.name(),
            joypad.vendor_id(),
            joypad.product_id(),
            axes.len(),
            buttons.len(),
            hats.len()
        );

        self.devices.push(TrackedDevice {
            device,
            axes,
            buttons,
            hats,
            joypad,
        });
    }

    /// Stops tracking the device with `device`'s identity. Unknown devices
    /// are a no-op; removal may race with discovery.
    pub fn detach(&mut self, device: &S::Device) {
        match self
            .devices
            .iter()
            .position(|dev| dev.device.id() == device.id())
        {
            Some(n) => {
                let dev = self.devices.remove(n);
                info!("Joypad {} disconnected.", dev.joypad.name());
            }
            None => debug!("Detach notification for untracked device {}", device.id()),
        }
    }

    /// Runs one input cycle: drains pending hotplug notifications, then
    /// samples every tracked device, reporting transitions through the
    /// change handler. Returns the tracked joypads in attach order.
    pub fn poll(&mut self) -> impl Iterator<Item = &Joypad> {
        while let Some(event) = self.system.next_hotplug() {
            match event {
                HotplugEvent::Attached(device) => self.attach(device),
                HotplugEvent::Removed(device) => self.detach(&device),
            }
        }

        for dev in &mut self.devices {
            poll_device(dev, &mut self.on_change);
        }

        self.devices.iter().map(|dev| &dev.joypad)
    }

    /// Force feedback is not implemented; always reports failure.
    pub fn rumble(&mut self, _id: u64, _enable: bool) -> bool {
        false
    }

    pub fn joypad(&self, n: usize) -> Option<&Joypad> {
        self.devices.get(n).map(|dev| &dev.joypad)
    }

    pub fn joypads(&self) -> impl Iterator<Item = &Joypad> {
        self.devices.iter().map(|dev| &dev.joypad)
    }

    pub fn joypad_count(&self) -> usize {
        self.devices.len()
    }
}

fn poll_device<D: HidDevice>(dev: &mut TrackedDevice<D>, on_change: &mut Option<ChangeHandler>) {
    for n in 0..dev.axes.len() {
        let (element, info) = &dev.axes[n];
        let value = match dev.device.read_value(element) {
            Some(raw) => normalize_axis(raw, info),
            None => NEUTRAL,
        };
        assign(&mut dev.joypad, on_change, Group::Axis, n, value);
    }

    for n in 0..dev.buttons.len() {
        let pressed = dev
            .device
            .read_value(&dev.buttons[n])
            .is_some_and(|raw| raw != 0);
        assign(&mut dev.joypad, on_change, Group::Button, n, pressed as i16);
    }

    for n in 0..dev.hats.len() {
        let (element, info) = &dev.hats[n];
        let (x, y) = match dev.device.read_value(element) {
            Some(position) => decode_hat(position, info),
            None => (NEUTRAL, NEUTRAL),
        };
        assign(&mut dev.joypad, on_change, Group::Hat, n * 2, x * 32767);
        assign(&mut dev.joypad, on_change, Group::Hat, n * 2 + 1, y * 32767);
    }
}

fn assign(
    joypad: &mut Joypad,
    on_change: &mut Option<ChangeHandler>,
    group: Group,
    index: usize,
    value: i16,
) {
    let old = joypad.value(group, index);
    if old == value {
        return;
    }

    if let Some(handler) = on_change {
        handler(
            joypad,
            ChangeEvent {
                group,
                index,
                old,
                new: value,
            },
        );
    }

    joypad.set_value(group, index, value);
}

fn normalize_axis(raw: i32, info: &AxisInfo) -> i16 {
    // The classifier rejects empty ranges, so the division is safe.
    let range = i64::from(info.max) - i64::from(info.min);
    clamp_i16((i64::from(raw) - i64::from(info.min)) * 65535 / range - 32767)
}

fn decode_hat(position: i32, info: &AxisInfo) -> (i16, i16) {
    if position < info.min || position > info.max {
        return (NEUTRAL, NEUTRAL);
    }

    let position = i64::from(position) - i64::from(info.min);
    let count = i64::from(info.max) - i64::from(info.min) + 1;
    let octant = match count {
        8 => position,
        // 4-position hats report only the cardinal directions.
        4 => position * 2,
        _ => return (NEUTRAL, NEUTRAL),
    };

    HAT_DIRECTIONS[octant as usize]
}
