use super::{CollisionResult, ReceiverProbe};
use crate::style::Collider;
use glam::Vec2;

/// A [`Collider`] with its early-exit bounds precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    None,
    Circle {
        radius: f32,
    },
    Rect {
        half_extents: Vec2,
        diag2: f32,
    },
    Segment {
        start: Vec2,
        delta: Vec2,
        radius: f32,
        delta_mag2: f32,
        max_dist2: f32,
    },
}

impl From<Collider> for ColliderShape {
    fn from(collider: Collider) -> Self {
        match collider {
            Collider::None => ColliderShape::None,
            Collider::Circle { radius } => ColliderShape::Circle { radius },
            Collider::Rect { half_extents } => ColliderShape::Rect {
                half_extents,
                diag2: half_extents.length_squared(),
            },
            Collider::Segment { start, end, radius } => {
                let reach = start.length().max(end.length()) + radius;
                ColliderShape::Segment {
                    start,
                    delta: end - start,
                    radius,
                    delta_mag2: (end - start).length_squared(),
                    max_dist2: reach * reach,
                }
            }
        }
    }
}

impl ColliderShape {
    pub fn is_none(&self) -> bool {
        matches!(self, ColliderShape::None)
    }

    /// Test `probe` against this shape placed at `position`, scaled by
    /// `scale` and rotated to face `direction` (a unit vector).
    #[inline]
    pub fn test(&self, probe: &ReceiverProbe, position: Vec2, scale: f32, direction: Vec2) -> CollisionResult {
        match *self {
            ColliderShape::None => CollisionResult::NONE,
            ColliderShape::Circle { radius } => circle_on_circle(probe, position, radius * scale),
            ColliderShape::Rect { half_extents, diag2 } => {
                circle_on_rect(probe, position, half_extents, diag2, scale, direction)
            }
            ColliderShape::Segment {
                start,
                delta,
                radius,
                delta_mag2,
                max_dist2,
            } => circle_on_segment(
                probe, position, radius, start, delta, delta_mag2, max_dist2, scale, direction,
            ),
        }
    }
}

#[inline]
pub fn circle_on_circle(probe: &ReceiverProbe, center: Vec2, radius: f32) -> CollisionResult {
    let d2 = (probe.position - center).length_squared();
    let hit_r = radius + probe.radius;
    let graze_r = radius + probe.graze_radius;
    CollisionResult::new(d2 < hit_r * hit_r, d2 < graze_r * graze_r)
}

/// Rotate `v` by the inverse of the rotation taking +X to `direction`.
#[inline]
fn derotate(v: Vec2, direction: Vec2) -> Vec2 {
    Vec2::new(
        direction.x * v.x + direction.y * v.y,
        direction.x * v.y - direction.y * v.x,
    )
}

pub fn circle_on_rect(
    probe: &ReceiverProbe,
    center: Vec2,
    half_extents: Vec2,
    diag2: f32,
    scale: f32,
    direction: Vec2,
) -> CollisionResult {
    let d = (probe.position - center) / scale;
    // (a + b)^2 <= 2(a^2 + b^2)
    if d.length_squared() > 2.0 * (diag2 + probe.graze_radius * probe.graze_radius) {
        return CollisionResult::NONE;
    }
    let local = derotate(d, direction).abs();
    if local.y < half_extents.y {
        let gap = local.x - half_extents.x;
        return CollisionResult::new(gap < probe.radius, gap < probe.graze_radius);
    }
    if local.x < half_extents.x {
        let gap = local.y - half_extents.y;
        return CollisionResult::new(gap < probe.radius, gap < probe.graze_radius);
    }
    let d2 = (local - half_extents).length_squared();
    CollisionResult::new(
        d2 < probe.radius * probe.radius,
        d2 < probe.graze_radius * probe.graze_radius,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn circle_on_segment(
    probe: &ReceiverProbe,
    center: Vec2,
    radius: f32,
    start: Vec2,
    delta: Vec2,
    delta_mag2: f32,
    max_dist2: f32,
    scale: f32,
    direction: Vec2,
) -> CollisionResult {
    let d = (probe.position - center) / scale;
    if d.length_squared() > 2.0 * (max_dist2 + probe.graze_radius * probe.graze_radius) {
        return CollisionResult::NONE;
    }
    let g = derotate(d, direction) - start;
    let hit_r = radius + probe.radius;
    let graze_r = radius + probe.graze_radius;
    let dot = g.dot(delta);
    let d2 = if dot <= 0.0 || delta_mag2 <= 0.0 {
        g.length_squared()
    } else if dot > delta_mag2 {
        (g - delta).length_squared()
    } else {
        g.length_squared() - dot * dot / delta_mag2
    };
    CollisionResult::new(d2 < hit_r * hit_r, d2 < graze_r * graze_r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(position: Vec2, radius: f32, graze_radius: f32) -> ReceiverProbe {
        ReceiverProbe {
            position,
            radius,
            graze_radius,
            active: true,
        }
    }

    #[test]
    fn circle_hit_and_graze_bands() {
        let shape = ColliderShape::from(Collider::Circle { radius: 1.0 });
        let p = probe(Vec2::ZERO, 0.5, 2.0);

        assert_eq!(shape.test(&p, Vec2::new(1.4, 0.0), 1.0, Vec2::X), CollisionResult::new(true, true));
        assert_eq!(shape.test(&p, Vec2::new(2.0, 0.0), 1.0, Vec2::X), CollisionResult::new(false, true));
        assert_eq!(shape.test(&p, Vec2::new(3.5, 0.0), 1.0, Vec2::X), CollisionResult::NONE);
        // scale widens the collider
        assert!(shape.test(&p, Vec2::new(2.0, 0.0), 2.0, Vec2::X).hit);
    }

    #[test]
    fn rect_rotates_with_direction() {
        let shape = ColliderShape::from(Collider::Rect {
            half_extents: Vec2::new(2.0, 0.25),
        });
        let p = probe(Vec2::new(0.0, 1.5), 0.1, 0.1);

        // Long axis along X: the probe is above the thin side.
        assert!(!shape.test(&p, Vec2::ZERO, 1.0, Vec2::X).hit);
        // Long axis along Y: the probe sits inside.
        assert!(shape.test(&p, Vec2::ZERO, 1.0, Vec2::Y).hit);
    }

    #[test]
    fn rect_corner_region() {
        let shape = ColliderShape::from(Collider::Rect {
            half_extents: Vec2::new(1.0, 1.0),
        });
        let near = probe(Vec2::new(1.2, 1.2), 0.3, 0.5);
        let far = probe(Vec2::new(1.4, 1.4), 0.3, 0.5);
        assert_eq!(shape.test(&near, Vec2::ZERO, 1.0, Vec2::X), CollisionResult::new(true, true));
        assert_eq!(shape.test(&far, Vec2::ZERO, 1.0, Vec2::X), CollisionResult::new(false, false));
    }

    #[test]
    fn segment_projects_onto_capsule() {
        let shape = ColliderShape::from(Collider::Segment {
            start: Vec2::ZERO,
            end: Vec2::new(4.0, 0.0),
            radius: 0.2,
        });
        let beside = probe(Vec2::new(2.0, 0.5), 0.2, 1.0);
        let behind = probe(Vec2::new(-0.3, 0.0), 0.2, 1.0);
        let beyond = probe(Vec2::new(4.8, 0.0), 0.2, 1.0);

        assert_eq!(shape.test(&beside, Vec2::ZERO, 1.0, Vec2::X), CollisionResult::new(false, true));
        assert!(shape.test(&behind, Vec2::ZERO, 1.0, Vec2::X).hit);
        assert_eq!(shape.test(&beyond, Vec2::ZERO, 1.0, Vec2::X), CollisionResult::new(false, true));
        // Facing up, the segment points along +Y.
        let above = probe(Vec2::new(0.0, 3.0), 0.2, 0.2);
        assert!(shape.test(&above, Vec2::ZERO, 1.0, Vec2::Y).hit);
    }

    #[test]
    fn none_never_collides() {
        let p = probe(Vec2::ZERO, 10.0, 10.0);
        assert_eq!(ColliderShape::None.test(&p, Vec2::ZERO, 1.0, Vec2::X), CollisionResult::NONE);
    }
}
