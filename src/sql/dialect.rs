//! Positional-parameter syntax per SQL dialect.
//!
//! Statements are assembled with `?` placeholders; `rebind` rewrites them into the
//! dialect's syntax, numbering them left to right. `expand_in` widens the single
//! `IN (?)` membership marker to one placeholder per identifier.

use crate::error::ConfigError;

/// Set-membership marker a query template carries exactly once.
pub const IN_MARKER: &str = "IN (?)";

pub trait Dialect: Send + Sync {
    /// Placeholder for the `n`-th bound parameter (1-based).
    fn placeholder(&self, n: usize) -> String;
}

/// PostgreSQL: `$1, $2, ...`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PgDialect;

impl Dialect for PgDialect {
    fn placeholder(&self, n: usize) -> String {
        format!("${}", n)
    }
}

/// Renumber every `?` outside quoted text.
pub fn rebind(dialect: &dyn Dialect, sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    n += 1;
                    out.push_str(&dialect.placeholder(n));
                }
                _ => out.push(c),
            },
        }
    }
    out
}

/// Replace the one `IN (?)` marker with `IN (?, ?, ...)` holding `n` placeholders.
pub fn expand_in(sql: &str, n: usize) -> Result<String, ConfigError> {
    if n == 0 {
        return Err(ConfigError::Template("cannot expand membership to an empty set".into()));
    }
    let mut found = sql.match_indices(IN_MARKER);
    let (at, _) = found
        .next()
        .ok_or_else(|| ConfigError::Template(format!("no '{}' marker in: {}", IN_MARKER, sql)))?;
    if found.next().is_some() {
        return Err(ConfigError::Template(format!("more than one '{}' marker in: {}", IN_MARKER, sql)));
    }
    let list = vec!["?"; n].join(", ");
    Ok(format!("{}IN ({}){}", &sql[..at], list, &sql[at + IN_MARKER.len()..]))
}
