// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::auth::Role;
use shared_models::records::AppointmentStatus;

use crate::models::{AppointmentError, LifecycleAction};

/// Transition rules for the appointment state machine.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Status an action must start from.
    pub fn source_status(&self, action: LifecycleAction) -> AppointmentStatus {
        match action {
            LifecycleAction::Approve | LifecycleAction::Reject => AppointmentStatus::Pending,
            LifecycleAction::Discharge => AppointmentStatus::Approved,
        }
    }

    pub fn target_status(&self, action: LifecycleAction) -> AppointmentStatus {
        match action {
            LifecycleAction::Approve => AppointmentStatus::Approved,
            LifecycleAction::Reject => AppointmentStatus::Rejected,
            LifecycleAction::Discharge => AppointmentStatus::Discharged,
        }
    }

    pub fn role_may(&self, role: Role, _action: LifecycleAction) -> bool {
        matches!(role, Role::Doctor | Role::Admin)
    }

    /// Actions still available from `status`. Empty for terminal states.
    pub fn allowed_actions(&self, status: AppointmentStatus) -> Vec<LifecycleAction> {
        if status.is_terminal() {
            return Vec::new();
        }
        [LifecycleAction::Approve, LifecycleAction::Reject, LifecycleAction::Discharge]
            .into_iter()
            .filter(|action| self.source_status(*action) == status)
            .collect()
    }

    /// Returns the next status, or `InvalidTransition` when either the status or
    /// the acting role does not allow `action`.
    pub fn validate_transition(
        &self,
        current: AppointmentStatus,
        action: LifecycleAction,
        role: Role,
    ) -> Result<AppointmentStatus, AppointmentError> {
        debug!("Validating {} from {} by {}", action, current, role);

        if !self.role_may(role, action) || current != self.source_status(action) {
            warn!("Rejected {} on {} appointment by {}", action, current, role);
            return Err(AppointmentError::InvalidTransition { from: current, action });
        }

        Ok(self.target_status(action))
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ALL_STATUSES: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::Rejected,
        AppointmentStatus::Discharged,
    ];

    #[test]
    fn test_valid_transitions() {
        let lifecycle = AppointmentLifecycleService::new();

        assert_eq!(
            lifecycle.validate_transition(AppointmentStatus::Pending, LifecycleAction::Approve, Role::Doctor).unwrap(),
            AppointmentStatus::Approved
        );
        assert_eq!(
            lifecycle.validate_transition(AppointmentStatus::Pending, LifecycleAction::Reject, Role::Admin).unwrap(),
            AppointmentStatus::Rejected
        );
        assert_eq!(
            lifecycle.validate_transition(AppointmentStatus::Approved, LifecycleAction::Discharge, Role::Doctor).unwrap(),
            AppointmentStatus::Discharged
        );
    }

    #[test]
    fn test_terminal_states_allow_nothing() {
        let lifecycle = AppointmentLifecycleService::new();
        for status in [AppointmentStatus::Rejected, AppointmentStatus::Discharged] {
            assert!(lifecycle.allowed_actions(status).is_empty());
            for action in [LifecycleAction::Approve, LifecycleAction::Reject, LifecycleAction::Discharge] {
                assert_matches!(
                    lifecycle.validate_transition(status, action, Role::Admin),
                    Err(AppointmentError::InvalidTransition { .. })
                );
            }
        }
    }

    #[test]
    fn test_allowed_actions_agree_with_validation() {
        let lifecycle = AppointmentLifecycleService::new();
        for status in ALL_STATUSES {
            let allowed = lifecycle.allowed_actions(status);
            assert_eq!(allowed.is_empty(), status.is_terminal(), "{}", status);
            for action in [LifecycleAction::Approve, LifecycleAction::Reject, LifecycleAction::Discharge] {
                let valid = lifecycle.validate_transition(status, action, Role::Admin).is_ok();
                assert_eq!(valid, allowed.contains(&action), "{} from {}", action, status);
            }
        }
    }

    #[test]
    fn test_patients_cannot_review() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_transition(AppointmentStatus::Pending, LifecycleAction::Approve, Role::Patient),
            Err(AppointmentError::InvalidTransition { from: AppointmentStatus::Pending, action: LifecycleAction::Approve })
        );
    }
}
