//! Style descriptors
//!
//! A style is the shared metadata of one pool: collider geometry, culling,
//! damage, graze pacing and tint. Descriptors arrive from an external
//! loader and are validated once at registration.

use crate::selector::merge_styles;
use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collider geometry in bullet-local space. Rectangles and segments rotate
/// with the bullet direction; every shape scales with the bullet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Collider {
    #[default]
    None,
    Circle {
        radius: f32,
    },
    Rect {
        half_extents: Vec2,
    },
    Segment {
        start: Vec2,
        end: Vec2,
        radius: f32,
    },
}

/// Update behaviour declared by a descriptor. Culled pools are never
/// declared; the registry derives them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StyleKind {
    #[default]
    Normal,
    Empty,
    Softcull {
        ttl: f32,
        #[serde(default)]
        time_jitter: f32,
        #[serde(default)]
        rotation_jitter: f32,
    },
}

/// Two-color gradient remap applied by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recolor {
    pub black: Vec4,
    pub white: Vec4,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TintState {
    pub tint: Vec4,
    pub recolor: Option<Recolor>,
}

impl TintState {
    /// Whether the renderer needs a per-instance tint for this pool.
    pub fn is_tinted(&self) -> bool {
        self.tint != Vec4::ONE
    }
}

impl Default for TintState {
    fn default() -> Self {
        Self {
            tint: Vec4::ONE,
            recolor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: StyleKind,
    #[serde(default)]
    pub collider: Collider,
    #[serde(default = "defaults::cull_radius")]
    pub cull_radius: f32,
    #[serde(default = "defaults::yes")]
    pub allow_camera_cull: bool,
    #[serde(default = "defaults::damage")]
    pub damage: i32,
    #[serde(default = "defaults::graze_every_frames")]
    pub graze_every_frames: u16,
    #[serde(default = "defaults::yes")]
    pub destructible: bool,
    /// Seconds of fade-out playback for destroyed bullets; zero disables
    /// the culled pool.
    #[serde(default)]
    pub fade_out_time: f32,
    #[serde(default)]
    pub tint: TintState,
}

mod defaults {
    pub fn cull_radius() -> f32 {
        4.0
    }
    pub fn yes() -> bool {
        true
    }
    pub fn damage() -> i32 {
        1
    }
    pub fn graze_every_frames() -> u16 {
        30
    }
}

impl StyleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StyleKind::Normal,
            collider: Collider::None,
            cull_radius: defaults::cull_radius(),
            allow_camera_cull: true,
            damage: defaults::damage(),
            graze_every_frames: defaults::graze_every_frames(),
            destructible: true,
            fade_out_time: 0.0,
            tint: TintState::default(),
        }
    }

    pub fn kind(mut self, kind: StyleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn collider(mut self, collider: Collider) -> Self {
        self.collider = collider;
        self
    }

    pub fn cull_radius(mut self, radius: f32) -> Self {
        self.cull_radius = radius;
        self
    }

    pub fn camera_cull(mut self, allow: bool) -> Self {
        self.allow_camera_cull = allow;
        self
    }

    pub fn damage(mut self, damage: i32) -> Self {
        self.damage = damage;
        self
    }

    pub fn graze_every(mut self, frames: u16) -> Self {
        self.graze_every_frames = frames;
        self
    }

    pub fn destructible(mut self, destructible: bool) -> Self {
        self.destructible = destructible;
        self
    }

    pub fn fade_out(mut self, seconds: f32) -> Self {
        self.fade_out_time = seconds;
        self
    }

    pub fn tint(mut self, tint: Vec4) -> Self {
        self.tint.tint = tint;
        self
    }

    /// Duplicate this descriptor with the given fields replaced.
    pub fn clone_with(&self, overrides: StyleOverrides) -> Self {
        let mut style = self.clone();
        if let Some(name) = overrides.name {
            style.name = name;
        }
        if let Some(tint) = overrides.tint {
            style.tint.tint = tint;
        }
        if let Some(recolor) = overrides.recolor {
            style.tint.recolor = recolor;
        }
        if let Some(damage) = overrides.damage {
            style.damage = damage;
        }
        if let Some(destructible) = overrides.destructible {
            style.destructible = destructible;
        }
        style
    }

    /// Reject descriptors that cannot be simulated.
    pub fn validate(&self) -> Result<(), StyleError> {
        let fail = |reason: &str| {
            Err(StyleError::Malformed {
                name: self.name.clone(),
                reason: reason.to_string(),
            })
        };
        if self.name.trim().is_empty() || self.name == "_" {
            return fail("name must not be empty or a placeholder");
        }
        if self.name.contains(char::is_whitespace) {
            return fail("name must not contain whitespace");
        }
        if self.name.contains(['.', '*']) || self.name.starts_with(['$']) {
            return fail("name uses a character reserved for derived styles");
        }
        if self.name.starts_with(crate::registry::PLAYER_PREFIX) {
            return fail("name uses the player copy prefix");
        }
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;
        let collider_ok = match self.collider {
            Collider::None => true,
            Collider::Circle { radius } => non_negative(radius),
            Collider::Rect { half_extents } => {
                non_negative(half_extents.x) && non_negative(half_extents.y)
            }
            Collider::Segment { start, end, radius } => {
                start.is_finite() && end.is_finite() && non_negative(radius)
            }
        };
        if !collider_ok {
            return fail("collider dimensions must be finite and non-negative");
        }
        if !non_negative(self.cull_radius) {
            return fail("cull radius must be finite and non-negative");
        }
        if self.graze_every_frames == 0 {
            return fail("graze interval must be at least one frame");
        }
        if !non_negative(self.fade_out_time) {
            return fail("fade-out time must be finite and non-negative");
        }
        if let StyleKind::Softcull {
            ttl,
            time_jitter,
            rotation_jitter,
        } = self.kind
        {
            if !(ttl.is_finite() && ttl > 0.0) {
                return fail("softcull time-to-live must be positive");
            }
            if !non_negative(time_jitter) || !non_negative(rotation_jitter) {
                return fail("softcull jitter must be finite and non-negative");
            }
        }
        Ok(())
    }
}

/// Field overrides for [`StyleDescriptor::clone_with`].
#[derive(Debug, Clone, Default)]
pub struct StyleOverrides {
    name: Option<String>,
    tint: Option<Vec4>,
    recolor: Option<Option<Recolor>>,
    damage: Option<i32>,
    destructible: Option<bool>,
}

impl StyleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn tint(mut self, tint: Vec4) -> Self {
        self.tint = Some(tint);
        self
    }

    pub fn recolor(mut self, recolor: Option<Recolor>) -> Self {
        self.recolor = Some(recolor);
        self
    }

    pub fn damage(mut self, damage: i32) -> Self {
        self.damage = Some(damage);
        self
    }

    pub fn destructible(mut self, destructible: bool) -> Self {
        self.destructible = Some(destructible);
        self
    }
}

/// A template expanded over color variants, e.g. `circle-*` over
/// `["red", "blue"]` with one tint per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleFamily {
    pub pattern: String,
    pub variants: Vec<String>,
    #[serde(default)]
    pub tints: Vec<Vec4>,
    pub template: StyleDescriptor,
}

impl StyleFamily {
    pub fn expand(&self) -> Result<Vec<StyleDescriptor>, StyleError> {
        if !self.pattern.contains('*') {
            return Err(StyleError::Malformed {
                name: self.pattern.clone(),
                reason: "family pattern must contain a wildcard".to_string(),
            });
        }
        if !self.tints.is_empty() && self.tints.len() != self.variants.len() {
            return Err(StyleError::MismatchedVariants {
                family: self.pattern.clone(),
                variants: self.variants.len(),
                tints: self.tints.len(),
            });
        }
        self.variants
            .iter()
            .enumerate()
            .map(|(i, variant)| {
                let mut overrides = StyleOverrides::new().name(merge_styles(&self.pattern, variant));
                if let Some(tint) = self.tints.get(i) {
                    overrides = overrides.tint(*tint);
                }
                let style = self.template.clone_with(overrides);
                style.validate()?;
                Ok(style)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleEntry {
    Family(StyleFamily),
    Single(StyleDescriptor),
}

/// Ordered list of style entries as produced by a loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    pub styles: Vec<StyleEntry>,
}

impl StyleSheet {
    /// Flatten families and validate every descriptor.
    pub fn expand(&self) -> Result<Vec<StyleDescriptor>, StyleError> {
        let mut out = Vec::new();
        for entry in &self.styles {
            match entry {
                StyleEntry::Family(family) => out.extend(family.expand()?),
                StyleEntry::Single(style) => {
                    style.validate()?;
                    out.push(style.clone());
                }
            }
        }
        Ok(out)
    }
}

/// Load-time style failures. None of these are recoverable at runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    #[error("style '{name}' is malformed: {reason}")]
    Malformed { name: String, reason: String },

    #[error("style '{name}' is already registered")]
    DuplicateStyle { name: String },

    #[error("style family '{family}' lists {variants} variants but {tints} tints")]
    MismatchedVariants {
        family: String,
        variants: usize,
        tints: usize,
    },
}
