pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS wallets (
    user_id TEXT PRIMARY KEY,
    credit_balance INTEGER NOT NULL DEFAULT 0 CHECK (credit_balance >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    amount INTEGER NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('purchase', 'scan', 'refund', 'adjustment')),
    job_id TEXT,
    purchase_id TEXT,
    balance_after INTEGER NOT NULL CHECK (balance_after >= 0),
    description TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reservations (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount > 0),
    job_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'settled', 'refunded')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scan_jobs (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    url TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'queued'
        CHECK (state IN ('queued', 'fetching', 'analyzing', 'completed', 'failed', 'timed_out')),
    version INTEGER NOT NULL DEFAULT 1,
    reservation_id TEXT NOT NULL,
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scan_results (
    job_id TEXT PRIMARY KEY REFERENCES scan_jobs(id),
    risk_score INTEGER NOT NULL CHECK (risk_score BETWEEN 0 AND 100),
    categories TEXT NOT NULL,
    confidence REAL NOT NULL,
    reasoning TEXT NOT NULL,
    indicators TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    http_status INTEGER NOT NULL,
    http_headers TEXT NOT NULL,
    content_type TEXT,
    model_used TEXT NOT NULL,
    analysis_metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_logs (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL,
    url_accessed TEXT NOT NULL,
    content_hash TEXT,
    http_status INTEGER,
    http_headers TEXT,
    content_type TEXT,
    risk_score INTEGER,
    categories TEXT,
    confidence REAL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_scan_jobs_state ON scan_jobs(state, created_at);
CREATE INDEX IF NOT EXISTS idx_scan_jobs_user ON scan_jobs(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_scan_results_hash ON scan_results(content_hash, created_at);
CREATE INDEX IF NOT EXISTS idx_audit_logs_job ON audit_logs(job_id);
";
