// Copyright 2016-2018 Mateusz Sieczko and other GilRs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Classification of raw device elements into logical input groups.
//!
//! The usage page and usage code taxonomy is the only portable way to
//! interpret unlabeled HID report fields. Many controllers nest their
//! physical controls inside logical collections, so classification walks
//! the element tree depth-first, and controllers that expose the same
//! control through multiple report paths are handled by deduplicating on
//! the element cookie.

use fnv::FnvHashSet;
use log::{debug, trace};

use crate::hid::*;
use crate::Group;

/// Elements of one device bucketed by logical group, in first-seen order.
/// Each bucket is free of duplicates.
#[derive(Clone, Debug)]
pub struct Classified<E> {
    pub axes: Vec<E>,
    pub buttons: Vec<E>,
    pub hats: Vec<E>,
}

impl<E> Classified<E> {
    /// `true` when no element of the device was recognized.
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() && self.buttons.is_empty() && self.hats.is_empty()
    }
}

/// Walks `elements` (recursing into collections) and buckets every
/// recognized leaf into axes, buttons and hats.
///
/// Duplicate references to the same physical control and axes with an empty
/// logical range are dropped. Elements with unrecognized usages are
/// discarded without being recursed into.
pub fn classify<E: HidElement>(elements: &[E]) -> Classified<E> {
    let mut classified = Classified {
        axes: Vec::new(),
        buttons: Vec::new(),
        hats: Vec::new(),
    };
    let mut seen = Seen::default();
    walk(elements, &mut classified, &mut seen);
    classified
}

#[derive(Default)]
struct Seen {
    axes: FnvHashSet<u32>,
    buttons: FnvHashSet<u32>,
    hats: FnvHashSet<u32>,
}

fn walk<E: HidElement>(elements: &[E], out: &mut Classified<E>, seen: &mut Seen) {
    for element in elements {
        match element.kind() {
            ElementKind::Button => add_button(element, out, seen),
            ElementKind::Axis | ElementKind::Misc => {
                match classify_usage(element.usage_page(), element.usage()) {
                    Some(Group::Axis) => add_axis(element, out, seen),
                    Some(Group::Button) => add_button(element, out, seen),
                    Some(Group::Hat) => add_hat(element, out, seen),
                    None => trace!(
                        "Skipping element with usage {:#04x}:{:#04x}",
                        element.usage_page(),
                        element.usage()
                    ),
                }
            }
            ElementKind::Collection => walk(&element.children(), out, seen),
            ElementKind::Other => (),
        }
    }
}

fn classify_usage(page: u32, usage: u32) -> Option<Group> {
    if is_axis_usage(page, usage) {
        Some(Group::Axis)
    } else if is_button_usage(page, usage) {
        Some(Group::Button)
    } else if is_hat_usage(page, usage) {
        Some(Group::Hat)
    } else {
        None
    }
}

fn is_axis_usage(page: u32, usage: u32) -> bool {
    match page {
        PAGE_GENERIC_DESKTOP => matches!(
            usage,
            USAGE_GD_X
                | USAGE_GD_Y
                | USAGE_GD_Z
                | USAGE_GD_RX
                | USAGE_GD_RY
                | USAGE_GD_RZ
                | USAGE_GD_SLIDER
                | USAGE_GD_DIAL
                | USAGE_GD_WHEEL
        ),
        PAGE_SIMULATION => matches!(
            usage,
            USAGE_SIM_RUDDER | USAGE_SIM_THROTTLE | USAGE_SIM_ACCELERATOR | USAGE_SIM_BRAKE
        ),
        _ => false,
    }
}

fn is_button_usage(page: u32, usage: u32) -> bool {
    match page {
        PAGE_GENERIC_DESKTOP => matches!(
            usage,
            USAGE_GD_DPAD_UP
                | USAGE_GD_DPAD_DOWN
                | USAGE_GD_DPAD_RIGHT
                | USAGE_GD_DPAD_LEFT
                | USAGE_GD_START
                | USAGE_GD_SELECT
                | USAGE_GD_SYSTEM_MAIN_MENU
        ),
        PAGE_BUTTON => true,
        _ => false,
    }
}

fn is_hat_usage(page: u32, usage: u32) -> bool {
    page == PAGE_GENERIC_DESKTOP && usage == USAGE_GD_HATSWITCH
}

fn add_axis<E: HidElement>(element: &E, out: &mut Classified<E>, seen: &mut Seen) {
    if element.logical_min() == element.logical_max() {
        debug!(
            "Rejecting axis with empty logical range (cookie {})",
            element.cookie()
        );
        return;
    }
    if seen.axes.insert(element.cookie()) {
        out.axes.push(element.clone());
    }
}

fn add_button<E: HidElement>(element: &E, out: &mut Classified<E>, seen: &mut Seen) {
    if seen.buttons.insert(element.cookie()) {
        out.buttons.push(element.clone());
    }
}

fn add_hat<E: HidElement>(element: &E, out: &mut Classified<E>, seen: &mut Seen) {
    if seen.hats.insert(element.cookie()) {
        out.hats.push(element.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct TestElement {
        kind: ElementKind,
        page: u32,
        usage: u32,
        min: i32,
        max: i32,
        cookie: u32,
        children: Vec<TestElement>,
    }

    impl TestElement {
        fn leaf(kind: ElementKind, page: u32, usage: u32, cookie: u32) -> Self {
            TestElement {
                kind,
                page,
                usage,
                min: 0,
                max: 255,
                cookie,
                children: Vec::new(),
            }
        }

        fn misc(usage: u32, cookie: u32) -> Self {
            Self::leaf(ElementKind::Misc, PAGE_GENERIC_DESKTOP, usage, cookie)
        }

        fn button(usage: u32, cookie: u32) -> Self {
            Self::leaf(ElementKind::Button, PAGE_BUTTON, usage, cookie)
        }

        fn hat(cookie: u32) -> Self {
            let mut hat = Self::leaf(
                ElementKind::Misc,
                PAGE_GENERIC_DESKTOP,
                USAGE_GD_HATSWITCH,
                cookie,
            );
            hat.max = 7;
            hat
        }

        fn collection(cookie: u32, children: Vec<TestElement>) -> Self {
            TestElement {
                kind: ElementKind::Collection,
                page: PAGE_GENERIC_DESKTOP,
                usage: 0,
                min: 0,
                max: 0,
                cookie,
                children,
            }
        }
    }

    impl HidElement for TestElement {
        fn kind(&self) -> ElementKind {
            self.kind
        }

        fn usage_page(&self) -> u32 {
            self.page
        }

        fn usage(&self) -> u32 {
            self.usage
        }

        fn logical_min(&self) -> i32 {
            self.min
        }

        fn logical_max(&self) -> i32 {
            self.max
        }

        fn cookie(&self) -> u32 {
            self.cookie
        }

        fn children(&self) -> Vec<TestElement> {
            self.children.clone()
        }
    }

    fn cookies(elements: &[TestElement]) -> Vec<u32> {
        elements.iter().map(|e| e.cookie).collect()
    }

    #[test]
    fn buckets_by_usage_table() {
        let elements = vec![
            TestElement::misc(USAGE_GD_X, 1),
            TestElement::misc(USAGE_GD_Y, 2),
            TestElement::leaf(ElementKind::Misc, PAGE_SIMULATION, USAGE_SIM_BRAKE, 3),
            TestElement::button(1, 10),
            TestElement::button(2, 11),
            TestElement::misc(USAGE_GD_DPAD_UP, 20),
            TestElement::misc(USAGE_GD_START, 21),
            TestElement::hat(30),
        ];

        let classified = classify(&elements);
        assert_eq!(cookies(&classified.axes), [1, 2, 3]);
        assert_eq!(cookies(&classified.buttons), [10, 11, 20, 21]);
        assert_eq!(cookies(&classified.hats), [30]);
    }

    #[test]
    fn recurses_into_collections() {
        let elements = vec![TestElement::collection(
            100,
            vec![
                TestElement::misc(USAGE_GD_X, 1),
                TestElement::collection(
                    101,
                    vec![TestElement::hat(30), TestElement::button(1, 10)],
                ),
                TestElement::misc(USAGE_GD_RZ, 2),
            ],
        )];

        let classified = classify(&elements);
        assert_eq!(cookies(&classified.axes), [1, 2]);
        assert_eq!(cookies(&classified.buttons), [10]);
        assert_eq!(cookies(&classified.hats), [30]);
    }

    #[test]
    fn duplicate_cookies_appear_once() {
        let elements = vec![
            TestElement::misc(USAGE_GD_X, 1),
            TestElement::misc(USAGE_GD_X, 1),
            TestElement::button(1, 10),
            TestElement::button(1, 10),
            TestElement::hat(30),
            TestElement::hat(30),
        ];

        let classified = classify(&elements);
        assert_eq!(cookies(&classified.axes), [1]);
        assert_eq!(cookies(&classified.buttons), [10]);
        assert_eq!(cookies(&classified.hats), [30]);
    }

    #[test]
    fn rejects_axis_with_empty_range() {
        let mut broken = TestElement::misc(USAGE_GD_X, 1);
        broken.min = 128;
        broken.max = 128;
        let elements = vec![broken, TestElement::misc(USAGE_GD_Y, 2)];

        let classified = classify(&elements);
        assert_eq!(cookies(&classified.axes), [2]);
    }

    #[test]
    fn button_type_ignores_usage_table() {
        // A pure button element is a button even if its usage would read as
        // an axis.
        let elements = vec![TestElement::leaf(
            ElementKind::Button,
            PAGE_GENERIC_DESKTOP,
            USAGE_GD_X,
            10,
        )];

        let classified = classify(&elements);
        assert!(classified.axes.is_empty());
        assert_eq!(cookies(&classified.buttons), [10]);
    }

    #[test]
    fn unknown_usage_is_discarded_without_recursion() {
        // Children of a non-collection element must stay invisible even
        // when its own usage is unrecognized.
        let mut stray = TestElement::leaf(ElementKind::Misc, PAGE_GENERIC_DESKTOP, 0x47, 40);
        stray.children = vec![TestElement::misc(USAGE_GD_X, 1)];
        let elements = vec![stray];

        let classified = classify(&elements);
        assert!(classified.is_empty());
    }

    #[test]
    fn nothing_recognized_is_empty() {
        let elements = vec![TestElement::leaf(
            ElementKind::Other,
            PAGE_GENERIC_DESKTOP,
            USAGE_GD_X,
            1,
        )];

        assert!(classify(&elements).is_empty());
    }
}
