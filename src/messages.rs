//! Operator-facing message catalog (English).

use crate::types::Vec3;

pub const NOT_ALLOWED: &str = "You are not authorized to do that.";
pub const RELOADED: &str = "Settings reloaded!";
pub const RESET: &str = "Settings reset to defaults.";
pub const SAVED: &str = "Settings saved.";
pub const VIEW_STARTED: &str = "Live view started.";
pub const VIEW_STOPPED: &str = "Live view stopped.";
pub const NO_POSITION: &str = "Could not resolve your position.";
pub const ONLY_SPAWN_LEFT: &str = "Only the spawn zone is left; nothing removed.";

pub const HELP: &str = "\
/cargo spawn            set the spawn zone to your position
/cargo spawn on|off     toggle the fixed spawn point
/cargo add              add a block zone at your position
/cargo remove [id]      remove a block zone (latest if no id)
/cargo list             list block zones
/cargo blocked          check whether you are inside a block zone
/cargo view             toggle the live zone view
/cargo tides on|off     toggle tide leveling
/cargo debug on|off     toggle debug output
/cargo save             save settings
/cargo reload           reload settings
/cargo reset            reset settings to defaults";

pub fn spawn_location(position: Vec3) -> String {
    format!("Set cargo ship spawn location to {}", position)
}

pub fn toggled(feature: &str, enabled: bool) -> String {
    format!("{} {}", feature, if enabled { "enabled" } else { "disabled" })
}

pub fn zone_added(id: u32, position: Vec3) -> String {
    format!("Added block zone {} at {}", id, position)
}

pub fn zone_removed(id: u32) -> String {
    format!("Removed block zone {}", id)
}

pub fn blocked(inside: bool, nearest: Option<(u32, f32)>) -> String {
    let verdict = if inside {
        "You are inside a block zone."
    } else {
        "You are not inside a block zone."
    };
    match nearest {
        Some((id, distance)) => format!("{} Nearest zone {} is {:.1}m away.", verdict, id, distance),
        None => verdict.to_string(),
    }
}

pub fn args_error(detail: &str) -> String {
    format!("Invalid arguments: {}", detail)
}

pub fn save_failed(detail: &str) -> String {
    format!("Failed to save settings: {}", detail)
}
