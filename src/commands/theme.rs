// Theme Commands
// CRUD, default selection, swatch preview and CSS deployment

use serde_json::{json, Value};

use super::{get_arg, get_opt_arg, CommandError};
use crate::models::{NewTheme, ThemeUpdate};
use crate::services::{emit_theme_change, render_swatch, CssDeployer, EventSink, ThemeStore};

/// Services a theme command may touch
pub struct CommandContext<'a> {
    pub store: &'a ThemeStore,
    pub deployer: &'a CssDeployer,
    pub events: &'a dyn EventSink,
}

pub fn invoke_command(
    ctx: &CommandContext<'_>,
    command: &str,
    payload: &Value,
) -> Result<Value, CommandError> {
    match command {
        "get_all_themes" => {
            let themes = ctx.store.list_summaries()?;
            log::debug!("get_all_themes returning {} themes", themes.len());
            Ok(json!(themes))
        }
        "get_theme" => {
            let name: String = get_arg(payload, "name")?;
            Ok(json!(ctx.store.get(&name)?))
        }
        "save_theme" => {
            let theme = NewTheme {
                theme_name: get_arg(payload, "theme_name")?,
                description: get_opt_arg(payload, "description")?.unwrap_or_default(),
                json_data: json_data_arg(payload)?,
                is_default: get_opt_arg(payload, "is_default")?.unwrap_or(false),
            };
            let name = ctx.store.create(theme)?;
            emit_theme_change(ctx.events, "saved", Some(&name));
            Ok(json!(name))
        }
        "update_theme" => {
            let name: String = get_arg(payload, "name")?;
            let update = ThemeUpdate {
                description: get_arg(payload, "description")?,
                json_data: json_data_arg(payload)?,
                is_default: get_opt_arg(payload, "is_default")?,
            };
            let name = ctx.store.update(&name, update)?;
            emit_theme_change(ctx.events, "updated", Some(&name));
            Ok(json!(name))
        }
        "delete_theme" => {
            let name: String = get_arg(payload, "name")?;
            ctx.store.delete(&name)?;
            emit_theme_change(ctx.events, "deleted", Some(&name));
            Ok(json!({ "success": true }))
        }
        "get_default_theme" => Ok(json!(ctx.store.default_theme()?)),
        "set_default_theme" => {
            // An empty or missing name clears the default
            let name: Option<String> = get_opt_arg::<String>(payload, "name")?
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty());
            ctx.store.set_default(name.as_deref())?;
            emit_theme_change(ctx.events, "default_changed", name.as_deref());
            Ok(json!({ "success": true }))
        }
        "render_swatch" => {
            let json_data = json_data_arg(payload)?;
            Ok(json!(render_swatch(&json_data)))
        }
        "deploy_theme_css" => {
            let css: String = get_arg(payload, "css_content")?;
            let path = ctx.deployer.deploy(&css)?;
            Ok(json!({ "success": true, "path": path }))
        }
        "revert_theme_css" => {
            ctx.deployer.revert()?;
            Ok(json!({ "success": true }))
        }
        _ => Err(CommandError::UnknownCommand(command.to_string())),
    }
}

/// `json_data` is normally JSON text; an inline object is accepted and
/// serialized so clients do not have to double-encode.
fn json_data_arg(payload: &Value) -> Result<String, CommandError> {
    match get_arg::<Value>(payload, "json_data")? {
        Value::Null => Err(CommandError::MissingArgument("json_data".to_string())),
        Value::String(text) => Ok(text),
        other => Ok(other.to_string()),
    }
}
