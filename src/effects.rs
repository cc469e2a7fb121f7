//! Gameplay handlers plugged into the response table.
//!
//! Handlers never move anything themselves; they inspect and mutate gameplay
//! state and return a [`Resolution`] telling the dispatcher whether physics
//! separation should follow.

use log::debug;

use crate::error::{CollisionError, Result};
use crate::gameplay::{GameEvent, Status};
use crate::response::{Contact, EffectCtx, Resolution};

/// Enemy (subject) touches the player (other).
pub fn damage_player(ctx: &mut EffectCtx<'_>, c: &Contact) -> Result<Resolution> {
    let player = c.other.entity;
    let status = *ctx
        .scene
        .status_mut(player)
        .ok_or(CollisionError::missing(player, "Status"))?;
    match status {
        Status::Burrow => return Ok(Resolution::Ignore),
        Status::Hit { .. } => return Ok(Resolution::Separate),
        Status::None => {}
    }

    let health = ctx
        .scene
        .health_mut(player)
        .ok_or(CollisionError::missing(player, "Health"))?;
    health.0 = health.0.saturating_sub(1);
    let remaining = health.0;

    let timer = ctx.cfg.hit_invulnerability;
    if let Some(s) = ctx.scene.status_mut(player) {
        *s = Status::Hit { timer };
    }
    debug!("{player:?} hit by {:?}, {remaining} health left", c.subject.entity);

    ctx.emit(GameEvent::Damaged { entity: player, remaining });
    if remaining <= 0 {
        ctx.emit(GameEvent::Defeated { entity: player });
    }
    Ok(Resolution::Separate)
}

/// Player (subject) against a locked obstacle (other).
pub fn unlock_gate(ctx: &mut EffectCtx<'_>, c: &Contact) -> Result<Resolution> {
    let player = c.subject.entity;
    let gate = c.other.entity;
    let requires = ctx
        .scene
        .unlockable(gate)
        .ok_or(CollisionError::missing(gate, "Unlockable"))?
        .requires
        .clone();
    let inventory = ctx
        .scene
        .inventory_mut(player)
        .ok_or(CollisionError::missing(player, "Inventory"))?;

    if !inventory.contains_all(requires.iter().map(String::as_str)) {
        return Ok(Resolution::Separate);
    }

    ctx.scene.set_active(gate, false);
    ctx.deactivate(c.other.handle);
    debug!("{gate:?} unlocked by {player:?}");
    ctx.emit(GameEvent::GateOpened { gate, by: player });
    Ok(Resolution::Resolved)
}

pub fn collect_item(ctx: &mut EffectCtx<'_>, c: &Contact) -> Result<Resolution> {
    let player = c.subject.entity;
    let source = c.other.entity;
    let item = ctx
        .scene
        .collectible(source)
        .ok_or(CollisionError::missing(source, "Collectible"))?
        .item
        .clone();
    ctx.scene
        .inventory_mut(player)
        .ok_or(CollisionError::missing(player, "Inventory"))?
        .add(item.clone());

    ctx.scene.set_active(source, false);
    ctx.deactivate(c.other.handle);
    ctx.emit(GameEvent::Pickup { collector: player, item, source });
    Ok(Resolution::Resolved)
}

pub fn reach_goal(ctx: &mut EffectCtx<'_>, c: &Contact) -> Result<Resolution> {
    ctx.emit(GameEvent::GoalReached { player: c.subject.entity, goal: c.other.entity });
    Ok(Resolution::Resolved)
}

pub fn interact(ctx: &mut EffectCtx<'_>, c: &Contact) -> Result<Resolution> {
    let target = c.other.entity;
    let callback = ctx
        .scene
        .logic(target)
        .ok_or(CollisionError::missing(target, "Logic"))?
        .to_owned();
    ctx.emit(GameEvent::InteractionAvailable { player: c.subject.entity, target, callback });
    Ok(Resolution::Resolved)
}

pub fn trigger(ctx: &mut EffectCtx<'_>, c: &Contact) -> Result<Resolution> {
    let trigger = c.other.entity;
    let callback = ctx
        .scene
        .logic(trigger)
        .ok_or(CollisionError::missing(trigger, "Logic"))?
        .to_owned();
    ctx.emit(GameEvent::Triggered { player: c.subject.entity, trigger, callback });
    Ok(Resolution::Resolved)
}
