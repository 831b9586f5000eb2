//! Persist a whole window through the output module.

use crate::config::ExchangeConfig;
use crate::exchange_error::ExchangeError;
use crate::io::time_string::encode_time;
use crate::store::modules::{ModuleRegistry, WindowWriter};
use crate::store::{DataStore, ALL_ITEM};

/// File prefix of a window snapshot: `{window}_{stamp}_{id:05}`.
pub fn snapshot_prefix(window: &str, stamp: &str, id: u32) -> String {
    format!("{window}_{stamp}_{id:05}")
}

/// Write every item of `window` at simulation time `t`.
///
/// The output module is loaded for the duration of the call and its rank
/// suffix is disabled. Returns the file prefix that was written.
pub fn write_window(
    store: &dyn DataStore,
    modules: &ModuleRegistry,
    config: &ExchangeConfig,
    window: &str,
    t: f64,
) -> Result<String, ExchangeError> {
    let stamp = encode_time(t)?;
    let all = store
        .item_handle(window, ALL_ITEM)
        .ok_or_else(|| ExchangeError::MissingWindow(window.to_string()))?;
    let prefix = snapshot_prefix(window, &stamp, 0);
    let writer =
        modules.acquire::<dyn WindowWriter>(&config.writer_module, &config.writer_instance)?;
    let mut out = writer.lock();
    out.set_option("rankwidth", "0")?;
    out.write_items(store, &prefix, &all, window, &stamp)?;
    log::info!("wrote window `{window}` as `{prefix}`");
    Ok(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_pad_the_id() {
        assert_eq!(snapshot_prefix("fluid", "10.100000", 7), "fluid_10.100000_00007");
    }
}
