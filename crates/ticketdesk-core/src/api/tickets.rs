//! Ticket endpoints.
//!
//! List endpoints return a bare JSON array of tickets.

use serde::Serialize;

use crate::models::{TicketDetail, TicketListItem, TicketTab};

use super::{ApiClient, ApiError, ApiRequest};

#[derive(Serialize)]
struct AssignBody {
    #[serde(rename = "assigneeId")]
    assignee_id: i64,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

impl ApiClient {
    /// Support queue, filtered by tab and an optional search query
    pub async fn list_tickets(
        &self,
        tab: TicketTab,
        query: Option<&str>,
    ) -> Result<Vec<TicketListItem>, ApiError> {
        let mut request = ApiRequest::get("/tickets").query("tab", tab.as_param());
        if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
            request = request.query("q", query);
        }
        self.send_json(request).await
    }

    /// Tickets filed by the signed-in user
    pub async fn list_my_tickets(&self) -> Result<Vec<TicketListItem>, ApiError> {
        self.get_json("/tickets/my").await
    }

    pub async fn get_ticket(&self, id: i64) -> Result<TicketDetail, ApiError> {
        self.get_json(&format!("/tickets/{}", id)).await
    }

    /// Assign a ticket to a support user, returning the updated ticket
    pub async fn assign_ticket(&self, id: i64, assignee_id: i64) -> Result<TicketDetail, ApiError> {
        self.post_json(&format!("/tickets/{}/assign", id), &AssignBody { assignee_id })
            .await
    }

    pub async fn add_ticket_message(&self, id: i64, message: &str) -> Result<(), ApiError> {
        let request =
            ApiRequest::post(format!("/tickets/{}/messages", id)).json(&MessageBody { message })?;
        self.send(request).await?;
        Ok(())
    }
}
