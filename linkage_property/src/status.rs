// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-property status bits.

bitflags::bitflags! {
    /// Status bits carried by each stored property value.
    ///
    /// The numbering leaves room between the well-known bits; the `USER*`
    /// bits are free for owners to use. The link layer uses [`USER3`] as the
    /// "mirroring in progress" marker that suppresses change re-entry.
    ///
    /// [`USER3`]: Self::USER3
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PropertyStatus: u32 {
        /// The value changed since the owner last executed.
        const TOUCHED = 1 << 0;
        /// Callers outside the owner may not assign the value.
        const IMMUTABLE = 1 << 1;
        /// Shown as read-only to editors.
        const READ_ONLY = 1 << 2;
        /// Hidden from editors; hidden link properties drop out of filtered out-lists.
        const HIDDEN = 1 << 3;
        /// Not persisted.
        const TRANSIENT = 1 << 4;
        /// Writing the value does not touch the owning object.
        const OUTPUT = 1 << 7;
        /// Free for owner use.
        const USER1 = 1 << 28;
        /// Free for owner use.
        const USER2 = 1 << 29;
        /// Free for owner use.
        const USER3 = 1 << 30;
        /// Free for owner use.
        const USER4 = 1 << 31;
    }
}
