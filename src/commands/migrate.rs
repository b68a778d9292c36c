// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied { execution_ms: i64 },
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub filename: String,
    pub checksum: String,
    pub outcome: Outcome,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let dir = PathBuf::from(m.get_one::<String>("dir").unwrap().trim());
    let results = run_migrations(conn, &dir)?;
    let rows = results
        .iter()
        .map(|r| {
            let (status, detail) = match &r.outcome {
                Outcome::Applied { execution_ms } => ("applied", format!("{} ms", execution_ms)),
                Outcome::Skipped => ("skipped", String::new()),
                Outcome::Failed { error } => ("failed", error.clone()),
            };
            vec![
                r.filename.clone(),
                r.checksum[..12].to_string(),
                status.to_string(),
                detail,
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["File", "Checksum", "Status", "Detail"], rows)
    );
    if let Some(failed) = results
        .iter()
        .find(|r| matches!(r.outcome, Outcome::Failed { .. }))
    {
        bail!("Migration {} failed; later files were not run", failed.filename);
    }
    Ok(())
}

pub fn checksum(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}

fn sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn record(
    conn: &Connection,
    filename: &str,
    checksum: &str,
    status: &str,
    execution_ms: i64,
    error: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations(filename, checksum, status, execution_ms, error, applied_at)
         VALUES (?1,?2,?3,?4,?5,datetime('now'))
         ON CONFLICT(filename) DO UPDATE SET
            checksum=excluded.checksum, status=excluded.status,
            execution_ms=excluded.execution_ms, error=excluded.error,
            applied_at=excluded.applied_at",
        params![filename, checksum, status, execution_ms, error],
    )?;
    Ok(())
}

/// Apply every `*.sql` file in `dir` in file-name order. Files already
/// applied with the same checksum are skipped; an applied file whose content
/// changed is an error. Each file runs in its own transaction and the run
/// stops at the first failure, which is recorded and returned as the last
/// result.
pub fn run_migrations(conn: &Connection, dir: &Path) -> Result<Vec<MigrationResult>> {
    let mut results = Vec::new();
    for path in sql_files(dir)? {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let sql = fs::read_to_string(&path).with_context(|| format!("Read {}", path.display()))?;
        let sum = checksum(&sql);

        let previous: Option<(String, String)> = conn
            .query_row(
                "SELECT checksum, status FROM schema_migrations WHERE filename=?1",
                params![filename],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        if let Some((old_sum, status)) = previous {
            if status == "applied" {
                if old_sum != sum {
                    bail!(
                        "Migration {} was changed after it was applied (checksum {} != {})",
                        filename,
                        &old_sum[..12.min(old_sum.len())],
                        &sum[..12]
                    );
                }
                results.push(MigrationResult {
                    filename,
                    checksum: sum,
                    outcome: Outcome::Skipped,
                });
                continue;
            }
        }

        let started = Instant::now();
        let tx = conn.unchecked_transaction()?;
        let run = tx.execute_batch(&sql);
        let execution_ms = started.elapsed().as_millis() as i64;
        match run {
            Ok(()) => {
                record(&tx, &filename, &sum, "applied", execution_ms, None)?;
                tx.commit()?;
                tracing::info!(%filename, execution_ms, "migration applied");
                results.push(MigrationResult {
                    filename,
                    checksum: sum,
                    outcome: Outcome::Applied { execution_ms },
                });
            }
            Err(e) => {
                tx.rollback()?;
                let error = e.to_string();
                record(conn, &filename, &sum, "failed", execution_ms, Some(&error))?;
                tracing::error!(%filename, %error, "migration failed");
                results.push(MigrationResult {
                    filename,
                    checksum: sum,
                    outcome: Outcome::Failed { error },
                });
                break;
            }
        }
    }
    Ok(results)
}
