use std::io::Write;

use chrono::{DateTime, Utc};
use clap::Parser;
use slotd_db::{
    models::{LICENSE_STATUS_ACTIVE, NewLicense},
    storage::LicenseStore,
};

#[derive(Clone, Parser)]
pub struct CreateLicenseParams {
    #[clap(short, long)]
    pub install_id: String,

    /// Maximum number of concurrently admitted devices.
    #[clap(short, long, value_parser = clap::value_parser!(i32).range(0..))]
    pub max_agents: i32,

    #[clap(short, long)]
    pub license_key: Option<String>,

    /// Only the newest record with status `active` governs admissions.
    #[clap(short, long, default_value = LICENSE_STATUS_ACTIVE)]
    pub status: String,

    /// RFC 3339 timestamp. Reported in the license status, not enforced.
    #[clap(short, long)]
    pub expires_at: Option<DateTime<Utc>>,
}

pub async fn create_license(
    stg: &impl LicenseStore,
    CreateLicenseParams {
        install_id,
        max_agents,
        license_key,
        status,
        expires_at,
    }: CreateLicenseParams,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let record = stg
        .create_license(NewLicense {
            install_id,
            license_key,
            max_agents,
            status,
            expires_at,
        })
        .await?;

    writeln!(
        out,
        "Created license record {} ({} slots, {})",
        record.id, record.max_agents, record.status
    )?;

    Ok(())
}

pub async fn list_licenses(stg: &impl LicenseStore, out: &mut impl Write) -> anyhow::Result<()> {
    let records = stg.list_licenses().await?;
    if records.is_empty() {
        writeln!(out, "No license records")?;
        return Ok(());
    }

    for r in records {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            r.id,
            r.install_id,
            r.status,
            r.max_agents,
            r.expires_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".into()),
            r.created_at.to_rfc3339(),
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use slotd_db::storage::{Ledger, memory::MemoryLedger};

    use super::*;

    fn params(install_id: &str, max_agents: i32) -> CreateLicenseParams {
        CreateLicenseParams {
            install_id: install_id.into(),
            max_agents,
            license_key: None,
            status: LICENSE_STATUS_ACTIVE.into(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn created_license_governs_status() {
        let stg = MemoryLedger::new(50);
        let mut out = Vec::new();

        create_license(&stg, params("install-1", 7), &mut out)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Created license record 1 (7 slots, active)\n"
        );
        assert_eq!(stg.status().await.unwrap().max_slots, 7);
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let stg = MemoryLedger::new(50);
        let mut sink = Vec::new();
        create_license(&stg, params("first", 1), &mut sink).await.unwrap();
        create_license(&stg, params("second", 2), &mut sink).await.unwrap();

        let mut out = Vec::new();
        list_licenses(&stg, &mut out).await.unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<_> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("2\tsecond\tactive\t2\t-\t"));
        assert!(lines[1].starts_with("1\tfirst\t"));
    }

    #[test]
    fn parses_expiry() {
        let params = CreateLicenseParams::try_parse_from([
            "create",
            "--install-id",
            "install-1",
            "--max-agents",
            "10",
            "--expires-at",
            "2030-01-01T00:00:00Z",
        ])
        .unwrap();

        assert_eq!(params.status, "active");
        assert_eq!(
            params.expires_at.unwrap().to_rfc3339(),
            "2030-01-01T00:00:00+00:00"
        );
    }
}
