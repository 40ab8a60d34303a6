//! Built-in command and telemetry groups.
//!
//! Registered ahead of every adapter, so their ids always win.

use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;

use crate::app::ports::{Clock, OnboardLed};
use crate::cmnd::{CommandContext, CommandEntry};
use crate::tele::TelemetryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LedAction {
    On,
    Off,
    Toggle,
}

/// Accepts `on`/`off`/`toggle` as a bare word or JSON string, plus JSON
/// `true`/`false` and `1`/`0`.
pub(crate) fn parse_led_action(args: &str) -> Option<LedAction> {
    let trimmed = args.trim();
    let word = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(s)) => s,
        Ok(Value::Bool(on)) => return Some(if on { LedAction::On } else { LedAction::Off }),
        Ok(Value::Number(n)) => {
            return match n.as_u64() {
                Some(1) => Some(LedAction::On),
                Some(0) => Some(LedAction::Off),
                _ => None,
            };
        }
        _ => trimmed.to_owned(),
    };
    match word.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Some(LedAction::On),
        "off" | "false" | "0" => Some(LedAction::Off),
        "toggle" => Some(LedAction::Toggle),
        _ => None,
    }
}

fn cmnd_restart(ctx: &mut CommandContext<'_>) {
    info!("Supervisor: restart requested");
    ctx.request_restart();
}

fn cmnd_help(ctx: &mut CommandContext<'_>) {
    info!("Supervisor: {} commands available", ctx.registry().len());
    for entry in ctx.registry().entries() {
        info!("  {:<16} {}", entry.command_id, entry.description);
    }
}

fn cmnd_setconf(ctx: &mut CommandContext<'_>) {
    let Some(args) = ctx.args() else {
        warn!("Supervisor: setconf needs a JSON object");
        return;
    };
    let overrides = match serde_json::from_str::<Value>(args) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) => {
            warn!("Supervisor: setconf expects a JSON object");
            return;
        }
        Err(e) => {
            warn!("Supervisor: setconf invalid JSON: {}", e);
            return;
        }
    };
    match ctx.config_store().apply_json(&overrides) {
        Ok(()) => info!("Supervisor: configuration updated (applies after restart)"),
        Err(e) => warn!("Supervisor: setconf rejected: {}", e),
    }
}

fn cmnd_resetconf(ctx: &mut CommandContext<'_>) {
    match ctx.config_store().reset() {
        Ok(()) => {
            info!("Supervisor: configuration reset, restarting");
            ctx.request_restart();
        }
        Err(e) => warn!("Supervisor: resetconf failed: {}", e),
    }
}

pub(crate) fn core_commands(led: Arc<dyn OnboardLed>) -> [CommandEntry; 5] {
    [
        CommandEntry::new("restart", "Restart the device", cmnd_restart),
        CommandEntry::new("help", "Show available commands", cmnd_help),
        CommandEntry::new("setconf", "Set configuration from JSON", cmnd_setconf),
        CommandEntry::new(
            "resetconf",
            "Reset configuration and restart",
            cmnd_resetconf,
        ),
        CommandEntry::new(
            "onboard_led",
            "Set onboard LED state (on/off/toggle)",
            move |ctx| {
                let Some(action) = ctx.args().and_then(parse_led_action) else {
                    warn!("Supervisor: onboard_led expects on/off/toggle, got {:?}", ctx.args());
                    return;
                };
                match action {
                    LedAction::On => led.set(true),
                    LedAction::Off => led.set(false),
                    LedAction::Toggle => led.toggle(),
                }
                info!("Supervisor: onboard LED {}", if led.is_on() { "on" } else { "off" });
            },
        ),
    ]
}

pub(crate) fn core_telemetry(clock: Arc<dyn Clock>, led: Arc<dyn OnboardLed>) -> [TelemetryEntry; 2] {
    [
        TelemetryEntry::new("uptime", move |id, doc| {
            doc.insert(id.into(), clock.uptime_secs().into());
        }),
        TelemetryEntry::new("onboard_led", move |id, doc| {
            doc.insert(id.into(), led.is_on().into());
        }),
    ]
}
