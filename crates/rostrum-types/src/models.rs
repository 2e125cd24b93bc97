use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored timestamp form: SQLite `datetime('now')` text, always UTC.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn fmt_opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub date_joined: DateTime<Utc>,
}

/// A response post. Rebuttals attach to one; this core consumes its
/// identity only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// The registered account linked to an invitation, hydrated from the
/// accounts table alongside the invitation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitee {
    pub id: Uuid,
    pub username: String,
    pub date_joined: DateTime<Utc>,
}

impl fmt::Display for Invitee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// A beta/site-access invitation and its registration status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub host_user: Option<Uuid>,
    pub invitee_email: String,
    pub verification_code: String,
    pub invitee_user: Option<Invitee>,
    pub date_created: DateTime<Utc>,
}

impl Invitation {
    /// An invitation counts as registered once an account is linked.
    pub fn is_registered(&self) -> bool {
        self.invitee_user.is_some()
    }

    /// When the invitee has registered, the moment their account joined.
    pub fn date_registered(&self) -> Option<DateTime<Utc>> {
        self.invitee_user.as_ref().map(|u| u.date_joined)
    }
}

impl fmt::Display for Invitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invitation(id={}, host_user={}, invitee_email={}, verification_code={}, invitee_user={}, date_created={})",
            self.id,
            fmt_opt(&self.host_user),
            self.invitee_email,
            self.verification_code,
            fmt_opt(&self.invitee_user),
            fmt_ts(&self.date_created),
        )
    }
}

/// Five-bucket sentiment tally, very-negative through very-positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub vneg: u32,
    pub neg: u32,
    pub neutral: u32,
    pub pos: u32,
    pub vpos: u32,
}

impl VoteTally {
    pub fn total(&self) -> u32 {
        self.vneg + self.neg + self.neutral + self.pos + self.vpos
    }
}

/// A rebuttal post attached to a response, with its vote tally.
/// Vote attribution and dedup are handled by the caller, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rebuttal {
    pub id: Uuid,
    pub author: Option<Uuid>,
    pub response: Option<Uuid>,
    pub body: String,
    pub votes: VoteTally,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl fmt::Display for Rebuttal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rebuttal(id={}, author={}, response={}, body={}, votes_vneg={}, votes_neg={}, votes_neutral={}, votes_pos={}, votes_vpos={}, created={}, last_modified={})",
            self.id,
            fmt_opt(&self.author),
            fmt_opt(&self.response),
            self.body,
            self.votes.vneg,
            self.votes.neg,
            self.votes.neutral,
            self.votes.pos,
            self.votes.vpos,
            fmt_ts(&self.created),
            fmt_ts(&self.last_modified),
        )
    }
}
