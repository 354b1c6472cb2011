// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Messages sent to connected browsers.

use serde::Serialize;

/// A live reload notification.
///
/// Serialized as a JSON object tagged by `type`, which is the wire format of
/// the reload WebSocket:
///
/// ```text
/// {"type":"notify","message":"Generating /index.bs …"}
/// {"type":"reload","url":"/index.bs"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadEvent {
    /// Show a transient status message in the browser.
    Notify {
        /// Text to display.
        message: String,
    },
    /// Reload pages showing `url`, or every page when `url` is `None`.
    Reload {
        /// URL whose content changed.
        url: Option<String>,
    },
}

impl ReloadEvent {
    /// Creates a notify event.
    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notify {
            message: message.into(),
        }
    }

    /// Creates a reload event for a single URL.
    pub fn reload(url: impl Into<String>) -> Self {
        Self::Reload {
            url: Some(url.into()),
        }
    }

    /// Encodes the event for the WebSocket.
    pub fn to_json(&self) -> String {
        // Serializing a plain enum of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
