//! Adjustment descriptors: what to do to a layer, as data.
//!
//! A descriptor states intent only. [`AdjustmentDescriptor::operation`]
//! translates it into the host-level [`Operation`] the applier issues:
//!
//! | Descriptor | Operation | Clipped |
//! |------------|-----------|---------|
//! | Desaturate | Hue/Saturation layer, master channel | yes |
//! | CurveMap | Curves layer | yes |
//! | BrightnessContrast | Brightness/Contrast layer | yes |
//! | ChannelSaturation | Hue/Saturation layer, one channel | yes |
//! | NoiseReduction | Dust & Scratches filter | no, edits pixels |
//! | Sharpen | Unsharp Mask filter | no, edits pixels |

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Parameters
// ============================================================================

/// One curve control point, input and output levels in 0-255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub input: u8,
    pub output: u8,
}

impl CurvePoint {
    pub const fn new(input: u8, output: u8) -> Self {
        Self { input, output }
    }
}

impl From<(u8, u8)> for CurvePoint {
    fn from((input, output): (u8, u8)) -> Self {
        Self { input, output }
    }
}

/// Color range a hue/saturation edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HueChannel {
    Master,
    Reds,
    Yellows,
    Greens,
    Cyans,
    Blues,
    Magentas,
}

impl HueChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Reds => "reds",
            Self::Yellows => "yellows",
            Self::Greens => "greens",
            Self::Cyans => "cyans",
            Self::Blues => "blues",
            Self::Magentas => "magentas",
        }
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Kind of an [`AdjustmentDescriptor`], without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Desaturate,
    CurveMap,
    BrightnessContrast,
    ChannelSaturation,
    NoiseReduction,
    Sharpen,
}

/// One non-destructive operation to apply against a target layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentDescriptor {
    /// Global saturation shift; -100 removes all color.
    Desaturate { saturation: i32 },
    /// Tone curve through the given control points.
    CurveMap { points: Vec<CurvePoint> },
    /// Independent brightness and contrast deltas.
    BrightnessContrast { brightness: i32, contrast: i32 },
    /// Saturation shift restricted to one color range.
    ChannelSaturation { channel: HueChannel, saturation: i32 },
    /// Dust & Scratches: median with a change threshold.
    NoiseReduction { radius: u32, threshold: u8 },
    /// Unsharp mask. `amount` is a percentage, `radius` in pixels.
    Sharpen { amount: u32, radius: f32, threshold: u8 },
}

impl AdjustmentDescriptor {
    pub fn desaturate(saturation: i32) -> Self {
        Self::Desaturate { saturation }
    }

    pub fn curve_map<P: Into<CurvePoint>>(points: impl IntoIterator<Item = P>) -> Self {
        Self::CurveMap {
            points: points.into_iter().map(Into::into).collect(),
        }
    }

    pub fn brightness_contrast(brightness: i32, contrast: i32) -> Self {
        Self::BrightnessContrast {
            brightness,
            contrast,
        }
    }

    pub fn channel_saturation(channel: HueChannel, saturation: i32) -> Self {
        Self::ChannelSaturation {
            channel,
            saturation,
        }
    }

    pub fn noise_reduction(radius: u32, threshold: u8) -> Self {
        Self::NoiseReduction { radius, threshold }
    }

    pub fn sharpen(amount: u32, radius: f32, threshold: u8) -> Self {
        Self::Sharpen {
            amount,
            radius,
            threshold,
        }
    }

    pub fn kind(&self) -> AdjustmentKind {
        match self {
            Self::Desaturate { .. } => AdjustmentKind::Desaturate,
            Self::CurveMap { .. } => AdjustmentKind::CurveMap,
            Self::BrightnessContrast { .. } => AdjustmentKind::BrightnessContrast,
            Self::ChannelSaturation { .. } => AdjustmentKind::ChannelSaturation,
            Self::NoiseReduction { .. } => AdjustmentKind::NoiseReduction,
            Self::Sharpen { .. } => AdjustmentKind::Sharpen,
        }
    }

    /// Host-level operation implementing this descriptor.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Desaturate { saturation } => Operation::Layer(AdjustmentLayer::HueSaturation {
                channel: HueChannel::Master,
                saturation: *saturation,
            }),
            Self::CurveMap { points } => Operation::Layer(AdjustmentLayer::Curves {
                points: points.clone(),
            }),
            Self::BrightnessContrast {
                brightness,
                contrast,
            } => Operation::Layer(AdjustmentLayer::BrightnessContrast {
                brightness: *brightness,
                contrast: *contrast,
            }),
            Self::ChannelSaturation {
                channel,
                saturation,
            } => Operation::Layer(AdjustmentLayer::HueSaturation {
                channel: *channel,
                saturation: *saturation,
            }),
            Self::NoiseReduction { radius, threshold } => {
                Operation::Filter(FilterSpec::DustAndScratches {
                    radius: *radius,
                    threshold: *threshold,
                })
            }
            Self::Sharpen {
                amount,
                radius,
                threshold,
            } => Operation::Filter(FilterSpec::UnsharpMask {
                amount: *amount,
                radius: *radius,
                threshold: *threshold,
            }),
        }
    }

    /// Whether this descriptor produces a clipped adjustment layer.
    pub fn creates_layer(&self) -> bool {
        matches!(self.operation(), Operation::Layer(_))
    }
}

impl fmt::Display for AdjustmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desaturate { saturation } => write!(f, "Desaturate({saturation:+})"),
            Self::CurveMap { points } => {
                write!(f, "CurveMap(")?;
                for (i, p) in points.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "({},{})", p.input, p.output)?;
                }
                write!(f, ")")
            }
            Self::BrightnessContrast {
                brightness,
                contrast,
            } => write!(f, "BrightnessContrast({brightness:+},{contrast:+})"),
            Self::ChannelSaturation {
                channel,
                saturation,
            } => write!(f, "ChannelSaturation({},{saturation:+})", channel.as_str()),
            Self::NoiseReduction { radius, threshold } => {
                write!(f, "NoiseReduction(r={radius},t={threshold})")
            }
            Self::Sharpen {
                amount,
                radius,
                threshold,
            } => write!(f, "Sharpen(amount={amount},radius={radius},threshold={threshold})"),
        }
    }
}

// ============================================================================
// Host-level operations
// ============================================================================

/// Parameterized adjustment layer the host should create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdjustmentLayer {
    HueSaturation { channel: HueChannel, saturation: i32 },
    Curves { points: Vec<CurvePoint> },
    BrightnessContrast { brightness: i32, contrast: i32 },
}

impl AdjustmentLayer {
    /// Default layer name, as an editor would label it.
    pub fn default_name(&self) -> &'static str {
        match self {
            Self::HueSaturation { .. } => "Hue/Saturation",
            Self::Curves { .. } => "Curves",
            Self::BrightnessContrast { .. } => "Brightness/Contrast",
        }
    }
}

/// Pixel filter the host should run directly on a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSpec {
    DustAndScratches { radius: u32, threshold: u8 },
    UnsharpMask { amount: u32, radius: f32, threshold: u8 },
}

impl FilterSpec {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DustAndScratches { .. } => "dustAndScratches",
            Self::UnsharpMask { .. } => "unsharpMask",
        }
    }
}

/// What the applier asks of the host for one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a clipped adjustment layer above the stack top.
    Layer(AdjustmentLayer),
    /// Edit the base layer's pixels in place.
    Filter(FilterSpec),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desaturate_is_master_hue_saturation() {
        let op = AdjustmentDescriptor::desaturate(-100).operation();
        assert_eq!(
            op,
            Operation::Layer(AdjustmentLayer::HueSaturation {
                channel: HueChannel::Master,
                saturation: -100,
            })
        );
    }

    #[test]
    fn test_channel_saturation_uses_same_constructor() {
        let op = AdjustmentDescriptor::channel_saturation(HueChannel::Blues, -100).operation();
        assert_eq!(
            op,
            Operation::Layer(AdjustmentLayer::HueSaturation {
                channel: HueChannel::Blues,
                saturation: -100,
            })
        );
    }

    #[test]
    fn test_filters_do_not_create_layers() {
        assert!(!AdjustmentDescriptor::noise_reduction(1, 10).creates_layer());
        assert!(!AdjustmentDescriptor::sharpen(100, 1.0, 5).creates_layer());
        assert!(AdjustmentDescriptor::brightness_contrast(8, 2).creates_layer());
    }

    #[test]
    fn test_curve_points_keep_order() {
        let d = AdjustmentDescriptor::curve_map([(137, 153), (71, 64)]);
        match d {
            AdjustmentDescriptor::CurveMap { ref points } => {
                assert_eq!(points[0], CurvePoint::new(137, 153));
                assert_eq!(points[1], CurvePoint::new(71, 64));
            }
            _ => panic!("expected a curve map"),
        }
        assert_eq!(d.kind(), AdjustmentKind::CurveMap);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AdjustmentDescriptor::curve_map([(75, 58), (135, 123)]).to_string(),
            "CurveMap((75,58),(135,123))"
        );
        assert_eq!(
            AdjustmentDescriptor::channel_saturation(HueChannel::Blues, -100).to_string(),
            "ChannelSaturation(blues,-100)"
        );
    }
}
