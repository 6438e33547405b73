use std::io::Write;

use slotd_common::{identity::DeviceId, views::LicenseStatus};
use slotd_db::storage::Ledger;

pub async fn show_status(stg: &impl Ledger, out: &mut impl Write) -> anyhow::Result<()> {
    let status = LicenseStatus::from(stg.status().await?);
    writeln!(out, "{}", serde_json::to_string_pretty(&status)?)?;
    Ok(())
}

pub async fn list_devices(stg: &impl Ledger, out: &mut impl Write) -> anyhow::Result<()> {
    let activations = stg.list_all().await?;
    if activations.is_empty() {
        writeln!(out, "No active devices")?;
        return Ok(());
    }

    for a in activations {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            DeviceId::for_agent(&a.agent_key),
            a.agent_key,
            a.ip,
            a.activated_at.to_rfc3339(),
            a.last_seen_at.to_rfc3339(),
        )?;
    }

    Ok(())
}
