use tracing::info;

use crate::error::StoreResult;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub copied: usize,
    pub already_present: usize,
}

/// Copy every record of `index` that `to` does not yet hold. Safe to re-run.
pub async fn mirror_missing(
    from: &dyn RecordStore,
    to: &dyn RecordStore,
    index: &str,
) -> StoreResult<MirrorReport> {
    let mut report = MirrorReport::default();

    for id in from.list(index).await? {
        if to.exists(index, &id).await? {
            report.already_present += 1;
            continue;
        }
        if let Some(page) = from.get(index, &id).await? {
            to.save(index, &page).await?;
            report.copied += 1;
        }
    }

    info!(
        index,
        from = from.name(),
        to = to.name(),
        copied = report.copied,
        already_present = report.already_present,
        "Mirror complete"
    );
    Ok(report)
}
