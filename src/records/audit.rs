use chrono::{DateTime, Utc};

use super::domain::{TechRecordVersion, UpdateType, UserDetails};

/// Actor and instant attached to every version a workflow writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    pub user: UserDetails,
    pub at: DateTime<Utc>,
}

impl AuditContext {
    pub fn new(user: UserDetails) -> Self {
        Self::at(user, Utc::now())
    }

    pub fn at(user: UserDetails, at: DateTime<Utc>) -> Self {
        Self { user, at }
    }
}

/// Stamps creation and supersession metadata onto versions.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditStamper;

impl AuditStamper {
    /// Marks `version` as freshly created by the context's actor.
    pub fn stamp_created(&self, mut version: TechRecordVersion, ctx: &AuditContext) -> TechRecordVersion {
        version.created_at = Some(ctx.at);
        version.created_by_name = Some(ctx.user.name.clone());
        version.created_by_id = Some(ctx.user.id.clone());
        version.last_updated_at = None;
        version.last_updated_by_name = None;
        version.last_updated_by_id = None;
        version.update_type = None;
        version
    }

    /// Records who superseded `version` and what kind of change did it.
    pub fn stamp_superseded(
        &self,
        mut version: TechRecordVersion,
        ctx: &AuditContext,
        update_type: UpdateType,
    ) -> TechRecordVersion {
        version.last_updated_at = Some(ctx.at);
        version.last_updated_by_name = Some(ctx.user.name.clone());
        version.last_updated_by_id = Some(ctx.user.id.clone());
        version.update_type = Some(update_type);
        version
    }

    /// A change confined to the regulatory-details block is a regulatory detail update;
    /// anything else is a plain tech record update.
    pub fn classify_update(
        &self,
        previous: &TechRecordVersion,
        next: &TechRecordVersion,
    ) -> UpdateType {
        if previous.details.regulatory_details() == next.details.regulatory_details() {
            return UpdateType::TechRecordUpdate;
        }

        if comparable(previous) == comparable(next) {
            UpdateType::RegulatoryDetailUpdate
        } else {
            UpdateType::TechRecordUpdate
        }
    }
}

// Strips fields every write rewrites, so only submitted technical data is compared.
fn comparable(version: &TechRecordVersion) -> TechRecordVersion {
    let mut stripped = version.clone();
    stripped.status_code = Default::default();
    stripped.record_completeness = None;
    stripped.reason_for_creation = None;
    stripped.created_at = None;
    stripped.created_by_name = None;
    stripped.created_by_id = None;
    stripped.last_updated_at = None;
    stripped.last_updated_by_name = None;
    stripped.last_updated_by_id = None;
    stripped.update_type = None;
    stripped.details = stripped.details.without_regulatory_details();
    stripped
}
