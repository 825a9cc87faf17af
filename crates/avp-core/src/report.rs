//! Result reporter: payload delivery to stdout or a save file.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

/// Deliver an action's payload: write it verbatim to `save_to` when given,
/// otherwise print it to stdout.
///
/// A failed save is downgraded to a warning; the underlying action's
/// success or failure stands on its own.
pub fn deliver(label: &str, payload: &str, save_to: Option<&Path>) {
    match save_to {
        Some(path) => match fs::write(path, payload) {
            Ok(()) => info!("saved {label} to {}", path.display()),
            Err(err) => warn!("failed to save {label} to {}: {err}", path.display()),
        },
        None => println!("{payload}"),
    }
}
