// Browser shell services
// Services provide cross-cutting functionality: settings, download notifications.

pub mod notification_sink;
pub mod settings_engine;
