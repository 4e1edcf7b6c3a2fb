//! Volume and mute state

/// Volume controller
///
/// Level is a linear `[0, 1]` value handed straight to the primitive.
/// Muting preserves the level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    level: f64,
    muted: bool,
}

impl Volume {
    /// Create new volume controller, clamping `level` into `[0, 1]`
    pub fn new(level: f64) -> Self {
        Self {
            level: clamp_level(level),
            muted: false,
        }
    }

    /// Set volume level, clamped into `[0, 1]`
    ///
    /// Returns the stored level.
    pub fn set_level(&mut self, level: f64) -> f64 {
        self.level = clamp_level(level);
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Toggle mute state, returning the new state
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// NaN collapses to silence rather than propagating into the transport
fn clamp_level(level: f64) -> f64 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_volume() {
        let vol = Volume::new(0.8);
        assert_eq!(vol.level(), 0.8);
        assert!(!vol.is_muted());
    }

    #[test]
    fn set_volume_level_clamps() {
        let mut vol = Volume::new(0.5);

        assert_eq!(vol.set_level(-0.5), 0.0);
        assert_eq!(vol.set_level(1.5), 1.0);
        assert_eq!(vol.set_level(0.25), 0.25);
    }

    #[test]
    fn new_clamps_out_of_range() {
        assert_eq!(Volume::new(7.0).level(), 1.0);
        assert_eq!(Volume::new(f64::NAN).level(), 0.0);
    }

    #[test]
    fn mute_preserves_level() {
        let mut vol = Volume::new(0.8);

        assert!(vol.toggle_mute());
        assert_eq!(vol.level(), 0.8);
        assert!(vol.is_muted());

        assert!(!vol.toggle_mute());
        assert!(!vol.is_muted());
        assert_eq!(vol.level(), 0.8);
    }
}
