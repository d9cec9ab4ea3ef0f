//! `SQLite` schema definitions.
//!
//! Timestamps are unix seconds. Ids are UUID v4 strings.

pub const CREATE_SUB_ROLES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sub_roles (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at INTEGER NOT NULL
)
";

/// `username` is the login identifier and must be unique.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT,
    username TEXT NOT NULL UNIQUE,
    password TEXT,
    role TEXT NOT NULL DEFAULT 'teknisi',
    sub_role_id TEXT REFERENCES sub_roles(id) ON DELETE SET NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)
";

pub const CREATE_FORMS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS forms (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    sub_role_id TEXT REFERENCES sub_roles(id) ON DELETE SET NULL,
    created_by_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)
";

/// `options` holds a JSON array of strings for choice questions.
pub const CREATE_QUESTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS questions (
    id TEXT PRIMARY KEY,
    form_id TEXT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    label TEXT NOT NULL,
    description TEXT,
    options TEXT,
    required INTEGER NOT NULL DEFAULT 0,
    "order" INTEGER NOT NULL,
    scale_min INTEGER,
    scale_max INTEGER,
    scale_min_label TEXT,
    scale_max_label TEXT,
    rating_max INTEGER,
    created_at INTEGER NOT NULL
)
"#;

pub const CREATE_RESPONSES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS responses (
    id TEXT PRIMARY KEY,
    form_id TEXT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    submitted_at INTEGER NOT NULL
)
";

pub const CREATE_ANSWERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS answers (
    id TEXT PRIMARY KEY,
    response_id TEXT NOT NULL REFERENCES responses(id) ON DELETE CASCADE,
    question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
    value TEXT,
    file_url TEXT
)
";

pub const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_users_sub_role ON users(sub_role_id);
CREATE INDEX IF NOT EXISTS idx_forms_creator ON forms(created_by_id);
CREATE INDEX IF NOT EXISTS idx_forms_sub_role ON forms(sub_role_id);
CREATE INDEX IF NOT EXISTS idx_questions_form ON questions(form_id, "order");
CREATE INDEX IF NOT EXISTS idx_responses_form ON responses(form_id);
CREATE INDEX IF NOT EXISTS idx_responses_user ON responses(user_id);
CREATE INDEX IF NOT EXISTS idx_answers_response ON answers(response_id)
"#;

/// Key-value table for schema versioning.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in dependency order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_SUB_ROLES_TABLE,
    CREATE_USERS_TABLE,
    CREATE_FORMS_TABLE,
    CREATE_QUESTIONS_TABLE,
    CREATE_RESPONSES_TABLE,
    CREATE_ANSWERS_TABLE,
    CREATE_INDEXES,
    CREATE_METADATA_TABLE,
];
