/// Request/response shapes exchanged between the popup and the background engine
use crate::backend::TabBackend;
use crate::engine::DuplicateEngine;
use crate::tab_data::{DuplicateGroup, DuplicateMap, TabId, TabRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    AnalyzeTabs,
    CloseTabs {
        #[serde(rename = "tabIds", default)]
        tab_ids: Vec<TabId>,
    },
    UndoClose,
}

/// `{duplicates}` on success, `{error}` otherwise
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicates: Option<BTreeMap<String, Vec<TabRef>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectResponse {
    pub fn found(groups: DuplicateMap) -> Self {
        let duplicates = groups
            .into_iter()
            .map(|(key, group)| (key, group.tabs))
            .collect();

        DetectResponse {
            duplicates: Some(duplicates),
            error: None,
        }
    }

    pub fn failed(message: String) -> Self {
        DetectResponse {
            duplicates: None,
            error: Some(message),
        }
    }

    /// Groups in key order, or the reported error
    pub fn into_groups(self) -> Result<Vec<DuplicateGroup>, String> {
        if let Some(error) = self.error {
            return Err(error);
        }

        Ok(self
            .duplicates
            .unwrap_or_default()
            .into_iter()
            .map(|(key, tabs)| DuplicateGroup { key, tabs })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseResponse {
    pub success: bool,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub undo_available: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResponse {
    pub success: bool,
    #[serde(default)]
    pub restored: usize,
    #[serde(default)]
    pub attempted: usize,
    /// Older closes are still journaled
    #[serde(default)]
    pub undo_available: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Detect(DetectResponse),
    Close(CloseResponse),
    Undo(UndoResponse),
}

/// Run one request against the engine. Failures come back as response values.
pub async fn dispatch<B: TabBackend>(engine: &DuplicateEngine<B>, request: Request) -> Response {
    match request {
        Request::AnalyzeTabs => Response::Detect(match engine.detect_duplicates().await {
            Ok(groups) => DetectResponse::found(groups),
            Err(e) => DetectResponse::failed(e.to_string()),
        }),
        Request::CloseTabs { tab_ids } => Response::Close(match engine.close_tabs(&tab_ids).await {
            Ok(summary) => CloseResponse {
                success: true,
                count: summary.closed,
                undo_available: summary.undo_available,
                message: format!(
                    "Successfully closed {} tab{}",
                    summary.closed,
                    if summary.closed == 1 { "" } else { "s" }
                ),
            },
            Err(e) => CloseResponse {
                success: false,
                undo_available: engine.can_undo(),
                message: e.to_string(),
                ..CloseResponse::default()
            },
        }),
        Request::UndoClose => Response::Undo(match engine.undo_last().await {
            Ok(summary) => UndoResponse {
                success: true,
                restored: summary.restored(),
                attempted: summary.attempted(),
                undo_available: engine.can_undo(),
                message: format!("Restored {}/{} tabs", summary.restored(), summary.attempted()),
            },
            Err(e) => UndoResponse {
                success: false,
                message: e.to_string(),
                ..UndoResponse::default()
            },
        }),
    }
}
