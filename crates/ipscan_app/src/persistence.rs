use std::fs;
use std::path::{Path, PathBuf};

use ipscan_engine::{AtomicFileWriter, PersistError};
use ipscan_logging::{scan_info, scan_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const STATE_FILENAME: &str = ".ipscan_state.ron";

#[derive(Debug, Error)]
pub(crate) enum StateError {
    #[error("cannot encode state: {0}")]
    Encode(#[from] ron::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
struct PersistedState {
    #[serde(default)]
    credential: String,
}

/// Returns the stored credential, or `None` if nothing usable is stored.
/// Unreadable state is logged and treated as absent.
pub(crate) fn load_credential(state_dir: &Path) -> Option<String> {
    let path = state_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            scan_warn!("Failed to read persisted state from {:?}: {}", path, err);
            return None;
        }
    };

    let state: PersistedState = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            scan_warn!("Failed to parse persisted state from {:?}: {}", path, err);
            return None;
        }
    };

    let credential = state.credential.trim().to_owned();
    (!credential.is_empty()).then_some(credential)
}

/// Stores `credential`; an empty string clears it.
pub(crate) fn save_credential(state_dir: &Path, credential: &str) -> Result<PathBuf, StateError> {
    let state = PersistedState {
        credential: credential.trim().to_owned(),
    };
    let content = ron::ser::to_string_pretty(&state, ron::ser::PrettyConfig::new())?;
    let path = AtomicFileWriter::new(state_dir).write(STATE_FILENAME, content.as_bytes())?;
    scan_info!("Saved credential state to {:?}", path);
    Ok(path)
}

/// Display form of a credential: the first four characters, then stars.
pub(crate) fn mask(credential: &str) -> String {
    let visible: String = credential.chars().take(4).collect();
    let hidden = credential.chars().count().saturating_sub(4);
    format!("{visible}{}", "*".repeat(hidden.min(12)))
}
