use serde::Serialize;
use serde_json::Value;

pub const THEMES_CHANGED_EVENT: &str = "themes_changed";

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &str, payload: Value);
}

/// Payload of a `themes_changed` event
#[derive(Debug, Clone, Serialize)]
pub struct ThemeChange {
    pub action: &'static str,
    pub name: Option<String>,
}

pub fn emit_event<T: Serialize>(sink: &dyn EventSink, event: &str, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(value) => sink.emit(event, value),
        Err(e) => log::warn!("Dropping {event} event: {e}"),
    }
}

pub fn emit_theme_change(sink: &dyn EventSink, action: &'static str, name: Option<&str>) {
    let change = ThemeChange {
        action,
        name: name.map(str::to_string),
    };
    emit_event(sink, THEMES_CHANGED_EVENT, &change);
}
