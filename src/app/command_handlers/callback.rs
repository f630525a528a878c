use crate::app::command_support::{ensure_state_root, load_settings};
use crate::receiver::handle_callback_url;
use crate::store::SecureStore;

pub fn cmd_callback(args: &[String]) -> Result<String, String> {
    let [url] = args else {
        return Err("usage: callback <url>".to_string());
    };
    let paths = ensure_state_root()?;
    let settings = load_settings(&paths)?;
    let store = SecureStore::open(paths.callbacks_dir()).map_err(|e| e.to_string())?;
    let path = handle_callback_url(&store, &settings.callback_scheme, url).map_err(|e| e.to_string())?;
    Ok(format!("stored\npath={}", path.display()))
}

pub fn cmd_sweep() -> Result<String, String> {
    let paths = ensure_state_root()?;
    let settings = load_settings(&paths)?;
    let store = SecureStore::open(paths.callbacks_dir()).map_err(|e| e.to_string())?;
    let removed = store.sweep_stale(settings.store.retention());
    Ok(format!("swept\nremoved={removed}"))
}
