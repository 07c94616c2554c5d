//! Database schema and migrations for Warden.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded. The schema_version table tracks which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: identities
    r#"
CREATE TABLE identities (
    id                          INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name                  TEXT,
    last_name                   TEXT,
    email                       TEXT NOT NULL UNIQUE,
    salt                        TEXT NOT NULL,
    hashed_password             TEXT NOT NULL,          -- Argon2id PHC string
    role                        INTEGER NOT NULL DEFAULT 100 CHECK (role > 0),
    last_login_at               TEXT,
    last_login_ip               TEXT,
    last_request_at             TEXT,
    locked_at                   TEXT,
    locked_by                   INTEGER,
    created_at                  TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (email = lower(email) AND instr(email, '@') > 0),
    CHECK (salt <> '' AND hashed_password <> '')
);

CREATE INDEX idx_identities_role ON identities(role);
"#,
    // v2: confirmation keys for email confirmation / password reset
    r#"
ALTER TABLE identities ADD COLUMN confirmation_key TEXT;
ALTER TABLE identities ADD COLUMN confirmation_key_expires_at TEXT;
ALTER TABLE identities ADD COLUMN confirmation_tries INTEGER NOT NULL DEFAULT 0;
"#,
];
