use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS accounts (
            id           TEXT PRIMARY KEY,
            username     TEXT NOT NULL UNIQUE,
            date_joined  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS responses (
            id          TEXT PRIMARY KEY,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS invitations (
            id                 TEXT PRIMARY KEY,
            host_user_id       TEXT REFERENCES accounts(id) ON DELETE RESTRICT,
            invitee_email      TEXT NOT NULL,
            verification_code  TEXT NOT NULL
                               CHECK (length(verification_code) <= 31),
            invitee_user_id    TEXT REFERENCES accounts(id) ON DELETE RESTRICT,
            date_created       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_invitations_host
            ON invitations(host_user_id);

        CREATE TABLE IF NOT EXISTS rebuttals (
            id             TEXT PRIMARY KEY,
            author_id      TEXT REFERENCES accounts(id) ON DELETE RESTRICT,
            response_id    TEXT REFERENCES responses(id) ON DELETE RESTRICT,
            body           TEXT NOT NULL CHECK (length(body) <= 1023),
            votes_vneg     INTEGER NOT NULL DEFAULT 0 CHECK (votes_vneg >= 0),
            votes_neg      INTEGER NOT NULL DEFAULT 0 CHECK (votes_neg >= 0),
            votes_neutral  INTEGER NOT NULL DEFAULT 0 CHECK (votes_neutral >= 0),
            votes_pos      INTEGER NOT NULL DEFAULT 0 CHECK (votes_pos >= 0),
            votes_vpos     INTEGER NOT NULL DEFAULT 0 CHECK (votes_vpos >= 0),
            created        TEXT NOT NULL DEFAULT (datetime('now')),
            last_modified  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_rebuttals_response
            ON rebuttals(response_id, created);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
