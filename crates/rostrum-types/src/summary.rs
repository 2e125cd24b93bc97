use serde::{Deserialize, Serialize};

use crate::models::{fmt_ts, Invitation};

/// Display-oriented projection of an invitation, served to the invite
/// dashboard as a flat string map. Fields absent on the record stay `""`
/// rather than null so the client renders them directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationSummary {
    pub email: String,
    pub username: String,
    pub date_registered: String,
    pub date_invited: String,
    /// Placeholder for activity tracking; populated by a different layer.
    pub date_recent_activity: String,
    pub status: String,
}

impl Invitation {
    /// Pure projection of the current field values; total, no failure modes.
    pub fn summarize(&self) -> InvitationSummary {
        let mut summary = InvitationSummary {
            email: self.invitee_email.clone(),
            username: String::new(),
            date_registered: String::new(),
            date_invited: fmt_ts(&self.date_created),
            date_recent_activity: String::new(),
            status: "sent".to_string(),
        };

        if let Some(invitee) = &self.invitee_user {
            summary.status = "registered".to_string();
            summary.username = invitee.username.clone();
            summary.date_registered = fmt_ts(&invitee.date_joined);
        }

        summary
    }
}
