//! Container-level layer effects.
//!
//! Only the drop shadow is needed: it is attached to the group that holds
//! both processed stacks, never to individual members.

use serde::{Deserialize, Serialize};

/// Blend mode of a layer effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub const BLACK: Self = Self {
        red: 0,
        green: 0,
        blue: 0,
    };
}

/// Drop shadow parameters.
///
/// # Fields
/// * `opacity` - Percent, 0-100
/// * `angle` - Light angle in degrees
/// * `distance` - Offset in pixels
/// * `spread` - Percent, 0-100
/// * `size` - Blur size in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub blend_mode: BlendMode,
    pub color: RgbColor,
    pub opacity: f32,
    pub use_global_angle: bool,
    pub angle: f32,
    pub distance: f32,
    pub spread: f32,
    pub size: f32,
}

impl EffectSpec {
    /// Soft multiply shadow used for product shots of knives.
    pub fn knife_shadow() -> Self {
        Self {
            blend_mode: BlendMode::Multiply,
            color: RgbColor::BLACK,
            opacity: 35.0,
            use_global_angle: true,
            angle: 120.0,
            distance: 10.0,
            spread: 5.0,
            size: 10.0,
        }
    }

    /// Check ranges a host would reject.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.opacity) {
            return Err(format!("opacity {} outside 0-100", self.opacity));
        }
        if !(0.0..=100.0).contains(&self.spread) {
            return Err(format!("spread {} outside 0-100", self.spread));
        }
        if self.distance < 0.0 || self.size < 0.0 {
            return Err("distance and size must not be negative".into());
        }
        Ok(())
    }
}

impl Default for EffectSpec {
    fn default() -> Self {
        Self::knife_shadow()
    }
}
