//! Subcommand implementations.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context as _, bail};
use dbhive_db::{Context, Manager};
use serde::Serialize;

use crate::cli::OutputFormat;

#[derive(Debug, Serialize)]
struct Listing {
    group: String,
    name: String,
    driver: String,
    target: String,
}

/// Print every registered database.
pub fn list(manager: &Manager, format: OutputFormat, out: &mut impl Write) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for group_name in manager.list_group_names() {
        let group = manager.group(&group_name)?;
        for name in group.list() {
            let (driver, target) = group.config(&name)?.describe();
            rows.push(Listing {
                group: group_name.clone(),
                name,
                driver,
                target,
            });
        }
    }

    match format {
        OutputFormat::Table => {
            for row in &rows {
                writeln!(out, "{}/{}\t{}\t{}", row.group, row.name, row.driver, row.target)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &rows)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Open every database (or every database of `only`) under a per-database
/// deadline, then close them all.
///
/// Fails when any database could not be opened or closed.
pub async fn check(
    manager: &Manager,
    only: Option<&str>,
    timeout: Duration,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let group_names = match only {
        Some(name) => {
            manager
                .group(name)
                .with_context(|| format!("cannot check group '{name}'"))?;
            vec![name.to_owned()]
        }
        None => manager.list_group_names(),
    };

    let mut checked = 0_usize;
    let mut failed = 0_usize;
    for group_name in &group_names {
        let group = manager.group(group_name)?;
        let names = group.list();
        let outcomes = futures::future::join_all(names.iter().map(|name| {
            let group = &group;
            async move {
                let ctx = Context::new().with_timeout(timeout);
                match group.get(&ctx, name).await {
                    Ok(db) => ctx.run(db.ping()).await.map_err(dbhive_db::Error::from).flatten(),
                    Err(err) => Err(err.into()),
                }
            }
        }))
        .await;

        for (name, outcome) in names.iter().zip(outcomes) {
            checked += 1;
            match outcome {
                Ok(()) => writeln!(out, "{group_name}/{name}\tok")?,
                Err(err) => {
                    failed += 1;
                    tracing::debug!(group = %group_name, database = %name, error = ?err, "Check failed");
                    writeln!(out, "{group_name}/{name}\terror: {err}")?;
                }
            }
        }
    }

    let close_errors = manager
        .close(&Context::new().with_timeout(timeout))
        .await;
    for err in &close_errors {
        writeln!(out, "close: {err}")?;
    }

    if failed > 0 || !close_errors.is_empty() {
        bail!("{failed} of {checked} databases failed the check");
    }
    tracing::info!(checked, "All databases answered");
    Ok(())
}
