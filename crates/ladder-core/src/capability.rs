//! # Capability Predicates
//!
//! Authorization as pure functions over principal and entity.
//!
//! Role checks run before any lookup and fail with `Forbidden`. Ownership
//! checks run after the lookup and fail with `NotFound`, so a startup can't
//! probe for ids that belong to someone else.

use crate::directory::PortfolioDirectory;
use crate::{
    ClaimId, EvidenceId, EvidenceItem, IncubatorId, LadderError, Principal, ReadinessClaim,
    StartupId,
};

/// The startup behind `principal`, or `Forbidden` for incubators.
pub fn require_startup(principal: Principal) -> Result<StartupId, LadderError> {
    match principal {
        Principal::Startup(id) => Ok(id),
        Principal::Incubator(_) => Err(LadderError::Forbidden(
            "only startups may manage claims and evidence".to_string(),
        )),
    }
}

/// The incubator behind `principal`, or `Forbidden` for startups.
pub fn require_incubator(principal: Principal) -> Result<IncubatorId, LadderError> {
    match principal {
        Principal::Incubator(id) => Ok(id),
        Principal::Startup(_) => Err(LadderError::Forbidden(
            "only incubators may review evidence or read portfolios".to_string(),
        )),
    }
}

/// Claim lookup result, filtered to the requesting startup.
pub fn owned_claim(
    claim: Option<ReadinessClaim>,
    id: ClaimId,
    requester: StartupId,
) -> Result<ReadinessClaim, LadderError> {
    match claim {
        Some(claim) if can_manage_claim(Principal::Startup(requester), &claim) => Ok(claim),
        _ => Err(LadderError::claim_not_found(id)),
    }
}

/// Evidence lookup result, filtered to the requesting startup.
pub fn owned_evidence(
    item: Option<EvidenceItem>,
    id: EvidenceId,
    requester: StartupId,
) -> Result<EvidenceItem, LadderError> {
    match item {
        Some(item) if can_edit_evidence(Principal::Startup(requester), &item) => Ok(item),
        _ => Err(LadderError::evidence_not_found(id)),
    }
}

/// Check if `principal` may edit or delete `claim`.
#[must_use]
pub fn can_manage_claim(principal: Principal, claim: &ReadinessClaim) -> bool {
    principal == Principal::Startup(claim.startup)
}

/// Check if `principal` may edit or delete `item`.
#[must_use]
pub fn can_edit_evidence(principal: Principal, item: &EvidenceItem) -> bool {
    principal == Principal::Startup(item.startup)
}

/// Check if `principal` may review `item`: an incubator associated with its startup.
#[must_use]
pub fn can_review<D: PortfolioDirectory + ?Sized>(
    principal: Principal,
    item: &EvidenceItem,
    directory: &D,
) -> bool {
    match principal {
        Principal::Incubator(incubator) => directory.is_associated(incubator, item.startup),
        Principal::Startup(_) => false,
    }
}

/// Check if `principal` may read the levels of `startup`.
#[must_use]
pub fn can_view_startup<D: PortfolioDirectory + ?Sized>(
    principal: Principal,
    startup: StartupId,
    directory: &D,
) -> bool {
    match principal {
        Principal::Startup(id) => id == startup,
        Principal::Incubator(incubator) => directory.is_associated(incubator, startup),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use crate::{Level, ReviewStatus, Track};

    fn item(startup: u64) -> EvidenceItem {
        EvidenceItem {
            id: EvidenceId(1),
            startup: StartupId(startup),
            track: Track::Trl,
            level: Level::BASELINE,
            description: None,
            file_url: None,
            status: ReviewStatus::Pending,
            reviewer_notes: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn roles_are_exclusive() {
        assert!(require_startup(Principal::Startup(StartupId(1))).is_ok());
        assert!(matches!(
            require_startup(Principal::Incubator(IncubatorId(1))),
            Err(LadderError::Forbidden(_))
        ));
        assert!(matches!(
            require_incubator(Principal::Startup(StartupId(1))),
            Err(LadderError::Forbidden(_))
        ));
    }

    #[test]
    fn foreign_evidence_reads_as_not_found() {
        let result = owned_evidence(Some(item(2)), EvidenceId(1), StartupId(1));
        assert!(matches!(
            result,
            Err(LadderError::NotFound { kind: "evidence", id: 1 })
        ));
        assert!(owned_evidence(Some(item(1)), EvidenceId(1), StartupId(1)).is_ok());
        assert!(owned_evidence(None, EvidenceId(1), StartupId(1)).is_err());
    }

    #[test]
    fn review_requires_association() {
        let directory = StaticDirectory::new().associate(IncubatorId(9), StartupId(1));

        assert!(can_review(Principal::Incubator(IncubatorId(9)), &item(1), &directory));
        assert!(!can_review(Principal::Incubator(IncubatorId(8)), &item(1), &directory));
        assert!(!can_review(Principal::Incubator(IncubatorId(9)), &item(2), &directory));
        assert!(!can_review(Principal::Startup(StartupId(1)), &item(1), &directory));
    }

    #[test]
    fn startups_only_see_themselves() {
        let directory = StaticDirectory::new().associate(IncubatorId(9), StartupId(1));

        assert!(can_view_startup(Principal::Startup(StartupId(1)), StartupId(1), &directory));
        assert!(!can_view_startup(Principal::Startup(StartupId(2)), StartupId(1), &directory));
        assert!(can_view_startup(Principal::Incubator(IncubatorId(9)), StartupId(1), &directory));
        assert!(!can_view_startup(Principal::Incubator(IncubatorId(9)), StartupId(2), &directory));
        assert!(can_edit_evidence(Principal::Startup(StartupId(1)), &item(1)));
        assert!(!can_edit_evidence(Principal::Incubator(IncubatorId(1)), &item(1)));
    }
}
