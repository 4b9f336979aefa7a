//! Access guard
//!
//! Evaluates route access requirements against the controller's state and
//! yields a decision the host can render: keep waiting, redirect to login,
//! show a forbidden view, or grant access. Evaluation uses only the
//! BFF-confirmed user on the controller.

use std::sync::Arc;

use tracing::{debug, info};

use crate::session::SessionController;
use crate::traits::{AuthApi, Navigator};

/// Declarative requirements for a protected surface.
///
/// Empty requirements grant access to any authenticated user. `require_all`
/// switches the role check from any-of to all-of; permissions are always
/// all-of.
#[derive(Debug, Clone, Default)]
pub struct AccessRequirements {
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub require_all: bool,
}

impl AccessRequirements {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// Require every listed role instead of any one of them.
    #[must_use]
    pub fn require_all_roles(mut self) -> Self {
        self.require_all = true;
        self
    }
}

/// What the host should do with the protected surface.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    /// Authentication state is still resolving; render nothing yet.
    Loading,
    /// Not authenticated; a login has been initiated.
    RedirectingToLogin,
    /// Authenticated but lacking the required roles or permissions.
    Forbidden(ForbiddenDetails),
    /// All requirements met.
    Granted,
}

/// Diagnostic payload for a forbidden decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ForbiddenDetails {
    pub message: String,
    pub required_roles: Vec<String>,
    pub actual_roles: Vec<String>,
    pub required_permissions: Vec<String>,
    pub actual_permissions: Vec<String>,
}

/// Evaluates [`AccessRequirements`] against a session controller.
pub struct AccessGuard<A: AuthApi + 'static, N: Navigator + 'static> {
    controller: Arc<SessionController<A, N>>,
}

impl<A: AuthApi + 'static, N: Navigator + 'static> AccessGuard<A, N> {
    #[must_use]
    pub fn new(controller: Arc<SessionController<A, N>>) -> Self {
        Self { controller }
    }

    /// Evaluate `requirements` against the current state.
    ///
    /// Order matters: loading short-circuits everything, an unauthenticated
    /// user triggers a login redirect before any role check runs, and role
    /// requirements are checked before permission requirements.
    pub fn evaluate(&self, requirements: &AccessRequirements) -> AccessDecision {
        let state = self.controller.state();

        if state.is_loading {
            return AccessDecision::Loading;
        }

        if !state.is_authenticated {
            info!("unauthenticated access to protected surface, starting login");
            self.controller.login(None);
            return AccessDecision::RedirectingToLogin;
        }

        let roles_ok = if requirements.roles.is_empty() {
            true
        } else {
            let wanted: Vec<&str> = requirements.roles.iter().map(String::as_str).collect();
            if requirements.require_all {
                self.controller.has_all_roles(&wanted)
            } else {
                self.controller.has_any_role(&wanted)
            }
        };

        if !roles_ok {
            debug!("access denied on role requirements");
            return AccessDecision::Forbidden(Self::forbidden(&state, requirements, "missing required role"));
        }

        let permissions_ok =
            requirements.permissions.iter().all(|permission| self.controller.has_permission(permission));
        if !permissions_ok {
            debug!("access denied on permission requirements");
            return AccessDecision::Forbidden(Self::forbidden(&state, requirements, "missing required permission"));
        }

        AccessDecision::Granted
    }

    fn forbidden(
        state: &crate::types::AuthState,
        requirements: &AccessRequirements,
        message: &str,
    ) -> ForbiddenDetails {
        let (actual_roles, actual_permissions) = state
            .user
            .as_ref()
            .map(|user| (user.roles.clone(), user.permissions.clone().unwrap_or_default()))
            .unwrap_or_default();

        ForbiddenDetails {
            message: message.to_string(),
            required_roles: requirements.roles.clone(),
            actual_roles,
            required_permissions: requirements.permissions.clone(),
            actual_permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for access decisions.
    use chrono::{Duration, Utc};
    use url::Url;

    use super::*;
    use crate::config::AuthConfig;
    use crate::storage::{AuthStorage, MemorySessionStore};
    use crate::testing::mocks::{MockAuthApi, MockNavigator};
    use crate::types::{AuthState, User};

    fn setup(state: AuthState) -> AccessGuard<MockAuthApi, MockNavigator> {
        let navigator =
            Arc::new(MockNavigator::new(Url::parse("https://app.example.com/admin").unwrap()));
        let controller = Arc::new(SessionController::new(
            Arc::new(MockAuthApi::new()),
            navigator,
            AuthStorage::new(Arc::new(MemorySessionStore::new())),
            AuthConfig {
                authority: "https://idp.example.com".to_string(),
                client_id: "portal-web-client".to_string(),
                redirect_uri: "https://app.example.com/callback".to_string(),
                post_logout_redirect_uri: "https://app.example.com/".to_string(),
                scope: "openid profile email".to_string(),
                refresh_threshold_seconds: 300,
                api_base_url: "https://app.example.com".to_string(),
            },
        ));
        controller.replace_state_for_test(state);
        AccessGuard::new(controller)
    }

    fn admin_user() -> User {
        User {
            id: "user-1".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            first_name: None,
            last_name: None,
            avatar: None,
            roles: vec!["ADMIN".to_string()],
            permissions: Some(vec!["reports:read".to_string()]),
        }
    }

    fn authed() -> AuthState {
        AuthState::authenticated(admin_user(), Utc::now() + Duration::seconds(600))
    }

    /// Validates `evaluate` for the still-loading scenario.
    ///
    /// Assertions:
    /// - Loading wins over every other check and triggers no login.
    #[tokio::test]
    async fn test_loading_short_circuits() {
        let guard = setup(AuthState::loading());
        assert_eq!(guard.evaluate(&AccessRequirements::new()), AccessDecision::Loading);
        assert!(guard.controller.navigator_for_test().assigned().is_empty());
    }

    /// Validates `evaluate` for the unauthenticated scenario.
    ///
    /// Assertions:
    /// - Reports a login redirect and actually initiates one.
    #[tokio::test]
    async fn test_unauthenticated_redirects_to_login() {
        let guard = setup(AuthState::unauthenticated(None));
        assert_eq!(guard.evaluate(&AccessRequirements::new()), AccessDecision::RedirectingToLogin);
        assert_eq!(guard.controller.navigator_for_test().assigned().len(), 1);
    }

    /// Validates `evaluate` for role requirement scenarios.
    ///
    /// Assertions:
    /// - Any-of passes with one matching role; all-of fails when one is
    ///   missing; forbidden details list the user's actual roles.
    #[tokio::test]
    async fn test_role_requirements() {
        let guard = setup(authed());

        let any = AccessRequirements::new().role("ADMIN").role("AUDITOR");
        assert_eq!(guard.evaluate(&any), AccessDecision::Granted);

        let all = AccessRequirements::new().role("ADMIN").role("AUDITOR").require_all_roles();
        match guard.evaluate(&all) {
            AccessDecision::Forbidden(details) => {
                assert_eq!(details.actual_roles, vec!["ADMIN".to_string()]);
            }
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    /// Validates `evaluate` for permission requirement scenarios.
    ///
    /// Assertions:
    /// - Permissions are all-of; an empty requirement set grants access.
    #[tokio::test]
    async fn test_permission_requirements() {
        let guard = setup(authed());

        assert_eq!(guard.evaluate(&AccessRequirements::new()), AccessDecision::Granted);

        let held = AccessRequirements::new().permission("reports:read");
        assert_eq!(guard.evaluate(&held), AccessDecision::Granted);

        let mixed = AccessRequirements::new().permission("reports:read").permission("reports:write");
        assert!(matches!(guard.evaluate(&mixed), AccessDecision::Forbidden(_)));
    }
}
