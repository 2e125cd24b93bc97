use crate::models::{AccountRow, InvitationRow, RebuttalRow};
use crate::Database;
use anyhow::Result;
use rostrum_types::{Account, Invitation, Rebuttal, VoteTally};
use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

// Invitee username/date_joined ride along via LEFT JOIN so a registered
// invitation hydrates in a single query.
const INVITATION_SELECT: &str = "SELECT i.id, i.host_user_id, i.invitee_email, i.verification_code,
        i.invitee_user_id, a.username, a.date_joined, i.date_created
 FROM invitations i
 LEFT JOIN accounts a ON i.invitee_user_id = a.id";

const REBUTTAL_SELECT: &str = "SELECT id, author_id, response_id, body,
        votes_vneg, votes_neg, votes_neutral, votes_pos, votes_vpos,
        created, last_modified
 FROM rebuttals";

impl Database {
    // -- Accounts (external collaborator; minimal surface) --

    pub fn create_account(&self, id: Uuid, username: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO accounts (id, username) VALUES (?1, ?2)",
                (id.to_string(), username),
            )?;
            Ok(())
        })
    }

    pub fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        self.with_conn(|conn| {
            let row = query_account_by_id(conn, &id.to_string())?;
            row.map(AccountRow::into_account).transpose()
        })
    }

    /// Fails while any invitation or rebuttal still references the account
    /// (ON DELETE RESTRICT).
    pub fn delete_account(&self, id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM accounts WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    // -- Responses (identity only) --

    pub fn create_response(&self, id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("INSERT INTO responses (id) VALUES (?1)", [id.to_string()])?;
            Ok(())
        })
    }

    /// Fails while any rebuttal still references the response.
    pub fn delete_response(&self, id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM responses WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    // -- Invitations --

    pub fn create_invitation(
        &self,
        id: Uuid,
        host_user: Option<Uuid>,
        invitee_email: &str,
        verification_code: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO invitations (id, host_user_id, invitee_email, verification_code)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    id.to_string(),
                    host_user.map(|h| h.to_string()),
                    invitee_email,
                    verification_code
                ],
            )?;
            debug!("Invitation {} created for {}", id, invitee_email);
            Ok(())
        })
    }

    /// Link (or unlink) the account an invitee registered with.
    pub fn set_invitee_user(&self, invitation_id: Uuid, invitee: Option<Uuid>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE invitations SET invitee_user_id = ?2 WHERE id = ?1",
                rusqlite::params![invitation_id.to_string(), invitee.map(|u| u.to_string())],
            )?;
            Ok(())
        })
    }

    pub fn get_invitation(&self, id: Uuid) -> Result<Option<Invitation>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE i.id = ?1", INVITATION_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt
                .query_row([id.to_string()], invitation_from_row)
                .optional()?;
            row.map(InvitationRow::into_invitation).transpose()
        })
    }

    /// All invitations, or only those issued by the given host.
    /// Natural storage order; no pagination.
    pub fn filter_by_host(&self, host: Option<Uuid>) -> Result<Vec<Invitation>> {
        self.with_conn(|conn| {
            let host = host.map(|h| h.to_string());
            let rows = query_invitations(conn, host.as_deref(), false)?;
            rows.into_iter().map(InvitationRow::into_invitation).collect()
        })
    }

    /// `filter_by_host` restricted to invitations whose invitee has
    /// registered an account.
    pub fn get_registered_invitees(&self, host: Option<Uuid>) -> Result<Vec<Invitation>> {
        self.with_conn(|conn| {
            let host = host.map(|h| h.to_string());
            let rows = query_invitations(conn, host.as_deref(), true)?;
            rows.into_iter().map(InvitationRow::into_invitation).collect()
        })
    }

    pub fn delete_invitation(&self, id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM invitations WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    // -- Rebuttals --

    pub fn create_rebuttal(
        &self,
        id: Uuid,
        author: Option<Uuid>,
        response: Option<Uuid>,
        body: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO rebuttals (id, author_id, response_id, body)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    id.to_string(),
                    author.map(|a| a.to_string()),
                    response.map(|r| r.to_string()),
                    body
                ],
            )?;
            debug!("Rebuttal {} created", id);
            Ok(())
        })
    }

    pub fn get_rebuttal(&self, id: Uuid) -> Result<Option<Rebuttal>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE id = ?1", REBUTTAL_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt
                .query_row([id.to_string()], rebuttal_from_row)
                .optional()?;
            row.map(RebuttalRow::into_rebuttal).transpose()
        })
    }

    pub fn get_rebuttals_for_response(&self, response_id: Uuid) -> Result<Vec<Rebuttal>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE response_id = ?1 ORDER BY created", REBUTTAL_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([response_id.to_string()], rebuttal_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(RebuttalRow::into_rebuttal).collect()
        })
    }

    /// Replace the body; `last_modified` is bumped by the statement itself.
    pub fn update_rebuttal_body(&self, id: Uuid, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE rebuttals SET body = ?2, last_modified = datetime('now') WHERE id = ?1",
                rusqlite::params![id.to_string(), body],
            )?;
            Ok(())
        })
    }

    /// Overwrite the five vote counters. Increment policy and voter dedup
    /// are the caller's concern.
    pub fn set_vote_tally(&self, id: Uuid, tally: VoteTally) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE rebuttals
                 SET votes_vneg = ?2, votes_neg = ?3, votes_neutral = ?4,
                     votes_pos = ?5, votes_vpos = ?6,
                     last_modified = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    tally.vneg,
                    tally.neg,
                    tally.neutral,
                    tally.pos,
                    tally.vpos
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_rebuttal(&self, id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM rebuttals WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }
}

fn query_account_by_id(conn: &Connection, id: &str) -> Result<Option<AccountRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, date_joined FROM accounts WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(AccountRow {
                id: row.get(0)?,
                username: row.get(1)?,
                date_joined: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_invitations(
    conn: &Connection,
    host: Option<&str>,
    registered_only: bool,
) -> Result<Vec<InvitationRow>> {
    let mut clauses: Vec<&str> = Vec::new();
    if host.is_some() {
        clauses.push("i.host_user_id = ?1");
    }
    if registered_only {
        clauses.push("i.invitee_user_id IS NOT NULL");
    }

    let mut sql = INVITATION_SELECT.to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(host.iter()), invitation_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn invitation_from_row(row: &rusqlite::Row) -> rusqlite::Result<InvitationRow> {
    Ok(InvitationRow {
        id: row.get(0)?,
        host_user_id: row.get(1)?,
        invitee_email: row.get(2)?,
        verification_code: row.get(3)?,
        invitee_user_id: row.get(4)?,
        invitee_username: row.get(5)?,
        invitee_date_joined: row.get(6)?,
        date_created: row.get(7)?,
    })
}

fn rebuttal_from_row(row: &rusqlite::Row) -> rusqlite::Result<RebuttalRow> {
    Ok(RebuttalRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        response_id: row.get(2)?,
        body: row.get(3)?,
        votes_vneg: row.get(4)?,
        votes_neg: row.get(5)?,
        votes_neutral: row.get(6)?,
        votes_pos: row.get(7)?,
        votes_vpos: row.get(8)?,
        created: row.get(9)?,
        last_modified: row.get(10)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn invite(db: &Database, host: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        db.create_invitation(id, host, "a@x.com", "ABC123").unwrap();
        id
    }

    #[test]
    fn new_invitation_summarizes_as_sent() {
        let db = db();
        let id = invite(&db, None);

        let inv = db.get_invitation(id).unwrap().unwrap();
        let summary = inv.summarize();

        assert_eq!(summary.email, "a@x.com");
        assert_eq!(summary.status, "sent");
        assert_eq!(summary.username, "");
        assert_eq!(summary.date_registered, "");
        assert_eq!(summary.date_recent_activity, "");
        assert_eq!(
            summary.date_invited,
            inv.date_created.format("%Y-%m-%d %H:%M:%S").to_string()
        );
    }

    #[test]
    fn linking_invitee_registers_the_invitation() {
        let db = db();
        let alice = Uuid::new_v4();
        db.create_account(alice, "alice").unwrap();
        let id = invite(&db, None);

        db.set_invitee_user(id, Some(alice)).unwrap();

        let inv = db.get_invitation(id).unwrap().unwrap();
        assert!(inv.is_registered());

        let account = db.get_account(alice).unwrap().unwrap();
        assert_eq!(inv.date_registered(), Some(account.date_joined));

        let summary = inv.summarize();
        assert_eq!(summary.status, "registered");
        assert_eq!(summary.username, "alice");
        assert_eq!(
            summary.date_registered,
            account.date_joined.format("%Y-%m-%d %H:%M:%S").to_string()
        );
    }

    #[test]
    fn filter_by_host_partitions_invitations() {
        let db = db();
        let host_a = Uuid::new_v4();
        let host_b = Uuid::new_v4();
        db.create_account(host_a, "host_a").unwrap();
        db.create_account(host_b, "host_b").unwrap();

        let a1 = invite(&db, Some(host_a));
        let a2 = invite(&db, Some(host_a));
        let b1 = invite(&db, Some(host_b));
        let unhosted = invite(&db, None);

        let all = db.filter_by_host(None).unwrap();
        let all_ids: Vec<Uuid> = all.iter().map(|i| i.id).collect();
        assert_eq!(all_ids.len(), 4);
        for id in [a1, a2, b1, unhosted] {
            assert!(all_ids.contains(&id));
        }

        let of_a: Vec<Uuid> = db
            .filter_by_host(Some(host_a))
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(of_a.len(), 2);
        assert!(of_a.contains(&a1));
        assert!(of_a.contains(&a2));
    }

    #[test]
    fn registered_invitees_are_the_registered_subset() {
        let db = db();
        let host = Uuid::new_v4();
        let user = Uuid::new_v4();
        db.create_account(host, "host").unwrap();
        db.create_account(user, "user").unwrap();

        let registered = invite(&db, Some(host));
        let _pending = invite(&db, Some(host));
        db.set_invitee_user(registered, Some(user)).unwrap();

        let got = db.get_registered_invitees(Some(host)).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, registered);
        assert!(got[0].is_registered());

        // Without a host filter, still only the registered record
        let got = db.get_registered_invitees(None).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, registered);
    }

    #[test]
    fn referenced_account_cannot_be_deleted() {
        let db = db();
        let host = Uuid::new_v4();
        db.create_account(host, "host").unwrap();
        let id = invite(&db, Some(host));

        assert!(db.delete_account(host).is_err());

        db.delete_invitation(id).unwrap();
        db.delete_account(host).unwrap();
    }

    #[test]
    fn overlong_verification_code_is_rejected() {
        let db = db();
        let code = "X".repeat(32);
        let result = db.create_invitation(Uuid::new_v4(), None, "a@x.com", &code);
        assert!(result.is_err());
    }

    #[test]
    fn new_rebuttal_has_zeroed_tally() {
        let db = db();
        let id = Uuid::new_v4();
        db.create_rebuttal(id, None, None, "I disagree.").unwrap();

        let reb = db.get_rebuttal(id).unwrap().unwrap();
        assert_eq!(reb.votes, VoteTally::default());
        assert_eq!(reb.body, "I disagree.");
        assert_eq!(reb.created, reb.last_modified);
    }

    #[test]
    fn rebuttal_body_length_is_capped() {
        let db = db();
        let too_long = "x".repeat(1024);
        assert!(db.create_rebuttal(Uuid::new_v4(), None, None, &too_long).is_err());

        let at_limit = "x".repeat(1023);
        db.create_rebuttal(Uuid::new_v4(), None, None, &at_limit).unwrap();
    }

    #[test]
    fn updates_bump_last_modified() {
        let db = db();
        let id = Uuid::new_v4();
        db.create_rebuttal(id, None, None, "first draft").unwrap();

        // Backdate so the bump is observable regardless of clock resolution
        db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE rebuttals SET last_modified = '2000-01-01 00:00:00' WHERE id = ?1",
                [id.to_string()],
            )?;
            Ok(())
        })
        .unwrap();

        db.update_rebuttal_body(id, "second draft").unwrap();

        let reb = db.get_rebuttal(id).unwrap().unwrap();
        assert_eq!(reb.body, "second draft");
        assert!(reb.last_modified.format("%Y").to_string() != "2000");
    }

    #[test]
    fn vote_tally_is_assignable_as_a_whole() {
        let db = db();
        let id = Uuid::new_v4();
        db.create_rebuttal(id, None, None, "contested claim").unwrap();

        let tally = VoteTally { vneg: 1, neg: 0, neutral: 2, pos: 5, vpos: 3 };
        db.set_vote_tally(id, tally).unwrap();

        let reb = db.get_rebuttal(id).unwrap().unwrap();
        assert_eq!(reb.votes, tally);
        assert_eq!(reb.votes.total(), 11);
    }

    #[test]
    fn rebuttals_list_by_response() {
        let db = db();
        let response = Uuid::new_v4();
        let other = Uuid::new_v4();
        db.create_response(response).unwrap();
        db.create_response(other).unwrap();

        let r1 = Uuid::new_v4();
        let r2 = Uuid::new_v4();
        db.create_rebuttal(r1, None, Some(response), "first").unwrap();
        db.create_rebuttal(r2, None, Some(response), "second").unwrap();
        db.create_rebuttal(Uuid::new_v4(), None, Some(other), "elsewhere").unwrap();

        let listed = db.get_rebuttals_for_response(response).unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&r1));
        assert!(ids.contains(&r2));
    }

    #[test]
    fn referenced_response_and_author_are_delete_protected() {
        let db = db();
        let author = Uuid::new_v4();
        let response = Uuid::new_v4();
        db.create_account(author, "author").unwrap();
        db.create_response(response).unwrap();

        let id = Uuid::new_v4();
        db.create_rebuttal(id, Some(author), Some(response), "hold on").unwrap();

        assert!(db.delete_account(author).is_err());
        assert!(db.delete_response(response).is_err());

        db.delete_rebuttal(id).unwrap();
        db.delete_response(response).unwrap();
        db.delete_account(author).unwrap();
    }
}
