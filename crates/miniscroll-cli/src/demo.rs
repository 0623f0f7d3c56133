//! Wrapper types the demo binary binds to scene sections

use miniscroll_host::api::{Collision, Separation, ShaderParam, ShaderParamType};
use miniscroll_host::{Mini, MiniContext};
use tracing::{info, warn};

/// Bound to `Logo`. Counts its own age and greets on creation.
#[derive(Debug, Default)]
pub struct Logo {
    pub age: f32,
    pub collisions: u32,
}

impl Mini for Logo {
    fn on_create(&mut self, ctx: &mut MiniContext<'_>) -> anyhow::Result<()> {
        let greeting = ctx
            .get_string("Greeting")
            .unwrap_or_else(|| "hello".to_string());
        info!(target: "miniscroll::demo", "{} ({}) says {}", ctx.object(), ctx.class_name(), greeting);
        Ok(())
    }

    fn on_delete(&mut self, ctx: &mut MiniContext<'_>) -> anyhow::Result<()> {
        info!(target: "miniscroll::demo", "{} retired after {:.2}s", ctx.object(), self.age);
        Ok(())
    }

    fn on_update(&mut self, _ctx: &mut MiniContext<'_>, dt: f32) -> anyhow::Result<()> {
        self.age += dt;
        Ok(())
    }

    fn on_collide(&mut self, ctx: &mut MiniContext<'_>, collision: &Collision) -> anyhow::Result<()> {
        self.collisions += 1;
        info!(
            target: "miniscroll::demo",
            "{} hit {} ({} against {})",
            ctx.object(),
            collision.collider,
            collision.body_part_name,
            collision.collider_body_part_name
        );
        ctx.fire_trigger("Bump", &[collision.body_part_name.as_str()]);
        Ok(())
    }

    fn on_shader_param(
        &mut self,
        _ctx: &mut MiniContext<'_>,
        _shader: &str,
        param: &str,
        param_type: ShaderParamType,
    ) -> anyhow::Result<Option<ShaderParam>> {
        Ok(match (param, param_type) {
            ("age", ShaderParamType::Float) => Some(ShaderParam::Float(self.age)),
            _ => None,
        })
    }
}

/// Bound to `Spinner`. Turns at the `Speed` (degrees per second) configured
/// for the object, falling back to its class section.
#[derive(Debug, Default)]
pub struct Spinner {
    pub speed: f32,
    pub angle: f32,
    pub contacts: u32,
}

impl Mini for Spinner {
    fn on_create(&mut self, ctx: &mut MiniContext<'_>) -> anyhow::Result<()> {
        let speed = ctx.section(true).get_string("Speed");
        self.speed = match speed {
            Some(text) => text
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid Speed '{}': {}", text, e))?,
            None => {
                warn!(target: "miniscroll::demo", "{} has no Speed, standing still", ctx.object());
                0.0
            }
        };
        Ok(())
    }

    fn on_update(&mut self, _ctx: &mut MiniContext<'_>, dt: f32) -> anyhow::Result<()> {
        self.angle = (self.angle + self.speed * dt).rem_euclid(360.0);
        Ok(())
    }

    fn on_collide(&mut self, _ctx: &mut MiniContext<'_>, _collision: &Collision) -> anyhow::Result<()> {
        self.contacts += 1;
        Ok(())
    }

    fn on_separate(
        &mut self,
        _ctx: &mut MiniContext<'_>,
        _separation: &Separation,
    ) -> anyhow::Result<()> {
        self.contacts = self.contacts.saturating_sub(1);
        Ok(())
    }

    fn on_shader_param(
        &mut self,
        _ctx: &mut MiniContext<'_>,
        _shader: &str,
        param: &str,
        param_type: ShaderParamType,
    ) -> anyhow::Result<Option<ShaderParam>> {
        Ok(match (param, param_type) {
            ("angle", ShaderParamType::Float) => Some(ShaderParam::Float(self.angle)),
            _ => None,
        })
    }
}
