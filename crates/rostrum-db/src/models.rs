//! Database row types — these map directly to SQLite rows.
//! Distinct from the rostrum-types domain models to keep the DB layer
//! independent; conversion (TEXT ids and timestamps into Uuid/DateTime)
//! happens here.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rostrum_types::{Account, Invitation, Invitee, Rebuttal, VoteTally};
use uuid::Uuid;

pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub date_joined: String,
}

pub struct InvitationRow {
    pub id: String,
    pub host_user_id: Option<String>,
    pub invitee_email: String,
    pub verification_code: String,
    pub invitee_user_id: Option<String>,
    // Hydrated from accounts via LEFT JOIN
    pub invitee_username: Option<String>,
    pub invitee_date_joined: Option<String>,
    pub date_created: String,
}

pub struct RebuttalRow {
    pub id: String,
    pub author_id: Option<String>,
    pub response_id: Option<String>,
    pub body: String,
    pub votes_vneg: i64,
    pub votes_neg: i64,
    pub votes_neutral: i64,
    pub votes_pos: i64,
    pub votes_vpos: i64,
    pub created: String,
    pub last_modified: String,
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid id in row: {}", raw))
}

/// Stored timestamps are SQLite `datetime('now')` text, always UTC.
pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Invalid timestamp in row: {}", raw))?;
    Ok(naive.and_utc())
}

impl AccountRow {
    pub fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: parse_id(&self.id)?,
            username: self.username,
            date_joined: parse_ts(&self.date_joined)?,
        })
    }
}

impl InvitationRow {
    pub fn into_invitation(self) -> Result<Invitation> {
        let invitee_user = match self.invitee_user_id {
            Some(id) => Some(Invitee {
                id: parse_id(&id)?,
                username: self
                    .invitee_username
                    .context("Invitee row missing username")?,
                date_joined: parse_ts(
                    &self
                        .invitee_date_joined
                        .context("Invitee row missing date_joined")?,
                )?,
            }),
            None => None,
        };

        Ok(Invitation {
            id: parse_id(&self.id)?,
            host_user: self.host_user_id.as_deref().map(parse_id).transpose()?,
            invitee_email: self.invitee_email,
            verification_code: self.verification_code,
            invitee_user,
            date_created: parse_ts(&self.date_created)?,
        })
    }
}

impl RebuttalRow {
    pub fn into_rebuttal(self) -> Result<Rebuttal> {
        Ok(Rebuttal {
            id: parse_id(&self.id)?,
            author: self.author_id.as_deref().map(parse_id).transpose()?,
            response: self.response_id.as_deref().map(parse_id).transpose()?,
            body: self.body,
            votes: VoteTally {
                vneg: self.votes_vneg.try_into()?,
                neg: self.votes_neg.try_into()?,
                neutral: self.votes_neutral.try_into()?,
                pos: self.votes_pos.try_into()?,
                vpos: self.votes_vpos.try_into()?,
            },
            created: parse_ts(&self.created)?,
            last_modified: parse_ts(&self.last_modified)?,
        })
    }
}
