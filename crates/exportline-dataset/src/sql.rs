//! SQL for the dashboard database.
//!
//! Base tables are copied from the curated Parquet files; every view reads
//! only those tables, so rebuilding the tables is the whole refresh.

use std::path::Path;

/// Quote a path as a SQL string literal
fn sql_path(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

/// Returns SQL that (re)creates `table` from its Parquet file.
pub fn create_table(table: &str, parquet: &Path) -> String {
    format!(
        "CREATE OR REPLACE TABLE {table} AS SELECT * FROM read_parquet({})",
        sql_path(parquet)
    )
}

/// Dashboard views in creation order: `(name, CREATE statement)`
pub const VIEWS: &[(&str, &str)] = &[
    ("daily_users", DAILY_USERS),
    ("daily_donations", DAILY_DONATIONS),
    ("donation_details", DONATION_DETAILS),
    ("daily_accesses", DAILY_ACCESSES),
    ("daily_access_breakdown", DAILY_ACCESS_BREAKDOWN),
    ("access_by_donation", ACCESS_BY_DONATION),
    ("daily_payments", DAILY_PAYMENTS),
];

const DAILY_USERS: &str = "\
CREATE OR REPLACE VIEW daily_users AS
SELECT CAST(created_at AS DATE) AS day, COUNT(*) AS users_created
FROM users
WHERE created_at IS NOT NULL
GROUP BY 1
ORDER BY 1";

const DAILY_DONATIONS: &str = "\
CREATE OR REPLACE VIEW daily_donations AS
SELECT CAST(created_at AS DATE) AS day, COUNT(*) AS donations_created
FROM donations
WHERE created_at IS NOT NULL
GROUP BY 1
ORDER BY 1";

// LEFT JOIN: a donation without a link keeps its row with NULL link fields
const DONATION_DETAILS: &str = "\
CREATE OR REPLACE VIEW donation_details AS
SELECT
  CAST(d.created_at AS DATE) AS day,
  d.created_at,
  d.donation_id,
  d.user_id,
  d.name AS donation_name,
  d.amount_declared,
  d.active,
  d.closed,
  l.link_name,
  l.link_url
FROM donations d
LEFT JOIN donation_links l ON l.donation_id = d.donation_id
ORDER BY d.created_at DESC";

const DAILY_ACCESSES: &str = "\
CREATE OR REPLACE VIEW daily_accesses AS
SELECT
  CAST(created_at AS DATE) AS day,
  COUNT(*) AS access_events,
  COUNT(*) FILTER (WHERE acesse_donation) AS donation_page_accesses,
  COUNT(*) FILTER (WHERE create_pag1 OR create_pag2 OR create_pag3) AS payment_click_events
FROM accesses
WHERE created_at IS NOT NULL
GROUP BY 1
ORDER BY 1";

const DAILY_ACCESS_BREAKDOWN: &str = "\
CREATE OR REPLACE VIEW daily_access_breakdown AS
SELECT
  CAST(created_at AS DATE) AS day,
  COUNT(*) AS total_events,
  COUNT(DISTINCT NULLIF(user_id, '')) AS unique_users,
  COUNT(*) FILTER (WHERE acesse_donation) AS acesse_donation,
  COUNT(*) FILTER (WHERE create_pag1) AS create_pag1,
  COUNT(*) FILTER (WHERE create_pag2) AS create_pag2,
  COUNT(*) FILTER (WHERE create_pag3) AS create_pag3,
  COUNT(*) FILTER (WHERE create_pix) AS create_pix,
  COUNT(*) FILTER (WHERE create_cartao) AS create_cartao,
  COUNT(*) FILTER (WHERE create_paypal) AS create_paypal,
  COUNT(*) FILTER (WHERE create_google) AS create_google
FROM accesses
WHERE created_at IS NOT NULL
GROUP BY 1
ORDER BY 1";

const ACCESS_BY_DONATION: &str = "\
CREATE OR REPLACE VIEW access_by_donation AS
SELECT
  donation_id,
  COUNT(*) AS total_events,
  COUNT(*) FILTER (WHERE acesse_donation) AS donation_page_accesses,
  COUNT(*) FILTER (WHERE create_pag1 OR create_pag2 OR create_pag3) AS payment_click_events
FROM accesses
GROUP BY 1
ORDER BY total_events DESC, donation_id";

// Only finalized rows count towards the amount; total_payments counts all
const DAILY_PAYMENTS: &str = "\
CREATE OR REPLACE VIEW daily_payments AS
SELECT
  CAST(COALESCE(paid_at, created_at) AS DATE) AS day,
  COUNT(*) AS total_payments,
  COUNT(*) FILTER (WHERE finalizado) AS finalized_payments,
  SUM(CASE WHEN finalizado THEN COALESCE(amount, 0) ELSE 0 END) AS finalized_amount
FROM payments
WHERE COALESCE(paid_at, created_at) IS NOT NULL
GROUP BY 1
ORDER BY 1";
