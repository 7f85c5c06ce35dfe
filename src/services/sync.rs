//! Command-line flows against the mapping backend: pull the account and the
//! saved floor, and push a snapshot file after validating it.

use crate::client::MappingGateway;
use crate::compression::parse_snapshot;
use crate::engine::session::MappingSession;
use crate::services::report::ValidationReport;
use log::{info, warn};
use std::path::Path;

/// Refresh the account, then load the saved mapping and the flat device list.
///
/// A failing `/users` call is not fatal; the session keeps its starting tier.
pub fn pull<G: MappingGateway + ?Sized>(gateway: &G, session: &mut MappingSession) -> Result<(), String> {
    if let Err(e) = session.refresh_account(gateway) {
        warn!("Account refresh failed, keeping tier {}: {}", session.account().tier, e);
    }
    session
        .load(gateway)
        .map_err(|e| format!("loading mapping failed: {}", e))?;
    info!(
        "Pulled floor {} ({} room(s), {} device(s), {} wall(s))",
        session.engine().current_floor_number(),
        session.engine().floor().rooms.len(),
        session.engine().floor().devices.len(),
        session.engine().floor().walls.len()
    );
    Ok(())
}

/// Read a snapshot file, apply it to the session and save it.
///
/// Nothing is sent when the report says the save would be blocked.
pub fn push_file<G: MappingGateway + ?Sized>(
    gateway: &G,
    session: &mut MappingSession,
    path: &Path,
) -> Result<ValidationReport, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let snapshot = parse_snapshot(&json).map_err(|e| format!("{}: {}", path.display(), e))?;
    info!(
        "Pushing {} as floor {} ({} room(s), {} device(s))",
        path.display(),
        snapshot.floor,
        snapshot.rooms.len(),
        snapshot.devices.len()
    );
    session
        .apply(snapshot)
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    let report = ValidationReport::build(session);
    report.log();
    if let Some(msg) = &report.quota_violation {
        return Err(format!("push blocked: {}", msg));
    }
    session.save(gateway).map_err(|e| format!("save failed: {}", e))?;
    info!("Push complete: {}", session.status().unwrap_or_default());
    Ok(report)
}
