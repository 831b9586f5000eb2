//! Window names derived from canonical mesh file paths.

use crate::exchange_error::ExchangeError;

/// Characters that end the window-name part of a file name.
const DELIMITERS: &[char] = &[
    '_', '.', ':', '-', '*', '[', ']', '?', '\\', '"', '\'', '0', '1', '2', '3', '4', '5', '6',
    '7', '8', '9',
];

/// Derive a window name from a file path.
///
/// Directory components are stripped and the file name is cut at its first
/// delimiter or digit. A file name that does not start with a letter yields
/// [`ExchangeError::InvalidWindowName`].
///
/// ```
/// use mesh_exchange::transfer::window_name::window_name_from_path;
/// assert_eq!(window_name_from_path("run/ifluid_00.hdf").unwrap(), "ifluid");
/// ```
pub fn window_name_from_path(path: &str) -> Result<String, ExchangeError> {
    let file = path.rsplit('/').next().unwrap_or(path);
    let name = match file.find(DELIMITERS) {
        Some(cut) => &file[..cut],
        None => file,
    };
    match name.chars().next() {
        Some(c) if c.is_alphabetic() => Ok(name.to_string()),
        _ => Err(ExchangeError::InvalidWindowName(path.to_string())),
    }
}
