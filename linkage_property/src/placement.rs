// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rigid placements.

use glam::{DMat4, DQuat, DVec3};

/// A rigid placement: a rotation followed by a translation.
///
/// ```rust
/// use glam::DVec3;
/// use linkage_property::Placement;
///
/// let p = Placement::from_translation(DVec3::new(1.0, 0.0, 0.0));
/// let m = p.to_matrix();
/// assert_eq!(m.transform_point3(DVec3::ZERO), DVec3::X);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    /// Translation applied after the rotation.
    pub translation: DVec3,
    /// Rotation about the local origin.
    pub rotation: DQuat,
}

impl Placement {
    /// The identity placement.
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    /// Creates a placement from its parts.
    #[must_use]
    pub const fn new(translation: DVec3, rotation: DQuat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// A pure translation.
    #[must_use]
    pub const fn from_translation(translation: DVec3) -> Self {
        Self::new(translation, DQuat::IDENTITY)
    }

    /// Returns the 4×4 transform of this placement.
    #[must_use]
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.translation)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Returns the 4×4 transform of a per-axis scale.
#[must_use]
pub fn scale_matrix(scale: DVec3) -> DMat4 {
    DMat4::from_scale(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_then_translation() {
        let p = Placement::new(
            DVec3::new(0.0, 0.0, 5.0),
            DQuat::from_rotation_z(core::f64::consts::FRAC_PI_2),
        );
        let moved = p.to_matrix().transform_point3(DVec3::X);
        assert!((moved - DVec3::new(0.0, 1.0, 5.0)).length() < 1e-12, "{moved:?}");
    }

    #[test]
    fn scale_is_diagonal() {
        let m = scale_matrix(DVec3::new(2.0, 3.0, 4.0));
        assert_eq!(m.transform_point3(DVec3::ONE), DVec3::new(2.0, 3.0, 4.0));
        assert_eq!(Placement::default().to_matrix(), DMat4::IDENTITY);
    }
}
