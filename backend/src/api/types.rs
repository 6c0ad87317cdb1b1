//! REST API types for frontend integration.
//!
//! Every session response carries the current preview and audit log, so a
//! client can redraw after any call without a second request.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::edit::{AuditEntry, Session};
use crate::error::{EditError, ServerError};
use crate::view::{FilterSpec, Preview, PreviewRow};

/// Snapshot of a session sent after every call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub source_name: String,
    /// All dataset columns, in order
    pub columns: Vec<String>,
    /// Columns shown in `rows`
    pub visible_columns: Vec<String>,
    pub rows: Vec<PreviewRow>,
    pub total_rows: usize,
    pub matching_rows: usize,
    pub summary: String,
    /// Staged row as (column, value) pairs
    pub pending_row: Option<Vec<(String, String)>>,
    /// Rendered audit log lines, oldest first
    pub audit_log: Vec<String>,
}

impl SessionView {
    pub fn new(id: &str, session: &Session, preview: Preview) -> Self {
        let pending_row = session.pending_row().map(|p| {
            p.columns()
                .iter()
                .zip(p.cells())
                .map(|(c, v)| (c.clone(), v.as_str().to_string()))
                .collect()
        });

        Self {
            session_id: id.to_string(),
            source_name: session.source_name().to_string(),
            columns: session.dataset().columns().to_vec(),
            summary: preview.summary(),
            visible_columns: preview.columns,
            rows: preview.rows,
            total_rows: preview.total,
            matching_rows: preview.matching,
            pending_row,
            audit_log: session.audit_log().lines(),
        }
    }

    /// Unfiltered view of a session.
    pub fn unfiltered(id: &str, session: &Session) -> Self {
        Self::new(id, session, session.preview(&FilterSpec::new(), None))
    }
}

/// Body of `POST /api/sessions/{id}/preview`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewRequest {
    pub filters: FilterSpec,
    /// Visible columns; all when absent
    pub columns: Option<Vec<String>>,
    /// Overrides the session's preview cap
    pub limit: Option<usize>,
}

/// Response of `POST /api/sessions/{id}/commands`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    /// Entry recorded by the command, if it recorded one
    pub entry: Option<AuditEntry>,
    pub session: SessionView,
}

/// Status code for a server error.
pub fn status_for(error: &ServerError) -> StatusCode {
    match error {
        ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ServerError::BadRequest(_) | ServerError::Csv(_) => StatusCode::BAD_REQUEST,
        ServerError::Edit(EditError::NoPendingRow) => StatusCode::CONFLICT,
        ServerError::Edit(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_shape() {
        let mut session = Session::from_text("t.csv", "a,b\n1,2\n3,4").unwrap();
        session.add_formula_column("c", Some("a + b")).unwrap();
        session.start_row();

        let view = SessionView::unfiltered("abc", &session);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["sessionId"], "abc");
        assert_eq!(json["columns"], json!(["a", "b", "c"]));
        assert_eq!(json["totalRows"], 2);
        assert_eq!(json["rows"][1]["index"], 1);
        assert_eq!(json["rows"][1]["cells"], json!(["3", "4", "7"]));
        assert_eq!(json["pendingRow"][2], json!(["c", ""]));
        assert_eq!(json["auditLog"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_preview_request_defaults() {
        let req: PreviewRequest = serde_json::from_str("{}").unwrap();
        assert!(req.filters.is_unconstrained());
        assert!(req.columns.is_none());

        let req: PreviewRequest =
            serde_json::from_str(r#"{"filters": {"city": "Paris"}, "limit": 5}"#).unwrap();
        assert_eq!(req.limit, Some(5));
        assert!(!req.filters.is_unconstrained());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ServerError::SessionNotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ServerError::Edit(EditError::DuplicateColumn("a".into()))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&ServerError::Edit(EditError::NoPendingRow)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_error_response() {
        let body = error_response("boom");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "boom");
    }
}
