//! Barrage Runtime
//!
//! Headless driver: loads settings and a style sheet, fires a few demo
//! patterns at a stationary player and logs what the simulation did.

use anyhow::{Context, Result};
use barrage_core::collision::{CollisionReceiver, ReceiverProbe};
use barrage_core::glam::Vec2;
use barrage_core::style::{Collider, StyleDescriptor, StyleEntry, StyleKind, StyleSheet};
use barrage_core::{priority, Hook, Motion, Owner, Session, SpawnParams, StyleSelector};
use barrage_services::settings::Settings;
use barrage_services::style_sheet;
use std::sync::Arc;

const SETTINGS_PATH: &str = "barrage.json";

/// Stationary player hitbox at the bottom of the field.
struct Player;

impl CollisionReceiver for Player {
    fn probe(&self) -> ReceiverProbe {
        ReceiverProbe {
            position: Vec2::new(0.0, -3.5),
            radius: 0.05,
            graze_radius: 0.6,
            active: true,
        }
    }
}

fn demo_sheet() -> StyleSheet {
    let styles = vec![
        StyleDescriptor::new("circle")
            .collider(Collider::Circle { radius: 0.12 })
            .fade_out(0.3),
        StyleDescriptor::new("arrow")
            .collider(Collider::Rect {
                half_extents: Vec2::new(0.2, 0.05),
            })
            .graze_every(10),
        StyleDescriptor::new("poof").kind(StyleKind::Softcull {
            ttl: 0.4,
            time_jitter: 0.1,
            rotation_jitter: 40.0,
        }),
    ];
    StyleSheet {
        styles: styles.into_iter().map(StyleEntry::Single).collect(),
    }
}

/// Ring of `count` bullets around `center`, moving outward at `speed`.
fn fire_ring(session: &mut Session, style: &str, center: Vec2, count: u32, speed: f32) -> Result<()> {
    for i in 0..count {
        let dir = Vec2::from_angle(i as f32 * std::f32::consts::TAU / count as f32);
        session
            .spawn(
                style,
                Motion::linear(dir * speed),
                SpawnParams::at(center).facing(dir).owner_index(i),
            )
            .with_context(|| format!("spawning into {style}"))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("Barrage v{}", barrage_core::VERSION);

    let settings_path = std::env::args().nth(1).unwrap_or_else(|| SETTINGS_PATH.to_string());
    let settings = Settings::load(&settings_path).context("loading settings")?;
    let sheet = match &settings.runtime.style_sheet {
        Some(path) => style_sheet::load(path).context("loading style sheet")?,
        None => demo_sheet(),
    };
    let mut session = Session::with_styles(settings.simulation.clone(), &sheet).context("registering styles")?;

    let player = Arc::new(Player);
    session.register_receiver(Owner::Enemy, &player);

    // Arrows speed up for their first second, then coast.
    let accelerate = Hook::new(priority::MOVE_1, |ctx, _| {
        let dt = ctx.dt();
        if let Some(bullet) = ctx.bullet_mut() {
            if bullet.age < 1.0 {
                let push = bullet.direction * dt;
                bullet.nudge(push);
            }
        }
    });
    session
        .add_control(&StyleSelector::single("arrow"), accelerate)
        .context("attaching arrow control")?;

    let ticks = settings.runtime.ticks;
    let report_every = settings.runtime.report_every.max(1);
    let mut totals = (0usize, 0u32);
    for tick in 0..ticks {
        match tick % 240 {
            0 => fire_ring(&mut session, "circle", Vec2::new(0.0, 2.0), 48, 2.0)?,
            60 => fire_ring(&mut session, "arrow", Vec2::new(-2.0, 2.5), 24, 1.5)?,
            180 => {
                let culled = session
                    .soft_cull(&StyleSelector::single("arrow"), "poof")
                    .context("soft-culling arrows")?;
                tracing::info!(tick, culled, "cleared arrows");
            }
            _ => {}
        }

        let report = session.tick().context("simulation tick")?;
        totals.0 += report.hits;
        totals.1 += report.collisions.values().map(|r| r.graze).sum::<u32>();
        if tick % report_every == 0 {
            let live: usize = session.registry().iter().map(|(_, pool)| pool.live_count()).sum();
            tracing::info!(
                tick,
                live,
                hits = report.hits,
                grazes = report.grazes,
                compacted = report.compacted_pools,
                tick_ms = session.timer().tick_time_ms(),
                "tick"
            );
        }
    }

    for (stage, avg) in session.profiler().iter() {
        tracing::info!(stage, avg_us = avg.as_micros() as u64, "stage timing");
    }
    let ran = session.end();
    tracing::info!(ticks = ran, hits = totals.0, grazes = totals.1, "session finished");
    Ok(())
}
