//! Route protection decisions derived from the session.

use campus_common::Role;

use crate::auth::principal::Principal;
use crate::auth::session::{Access, Session};

pub const SIGN_IN_NOTICE: &str = "Please sign in to access this page.";
pub const FORBIDDEN_NOTICE: &str = "You do not have permission to access this page.";

/// Who may pass a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any signed-in user.
    Authenticated,
    Role(Role),
    AnyOf(Vec<Role>),
}

/// What the route layer should do with a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    /// Session still settling; show a loading indicator.
    Loading,
    Redirect {
        to: String,
        /// Where the user was headed, so login can send them back.
        from: Option<String>,
        notice: Option<&'static str>,
    },
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
    unauthorized_path: Option<String>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new("/login")
    }
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            unauthorized_path: None,
        }
    }

    /// Send wrong-role users here instead of their own dashboard.
    pub fn with_unauthorized_path(mut self, path: impl Into<String>) -> Self {
        self.unauthorized_path = Some(path.into());
        self
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn check(&self, session: &Session, requirement: &Requirement, from: &str) -> RouteDecision {
        if session.is_pending() {
            return RouteDecision::Loading;
        }

        let access = match requirement {
            Requirement::Authenticated => session.authorize(None),
            Requirement::Role(role) => session.authorize(Some(*role)),
            Requirement::AnyOf(roles) => session.authorize_any(roles),
        };

        match access {
            Access::Allow => RouteDecision::Render,
            Access::DenyUnauthenticated => {
                tracing::debug!(%from, "unauthenticated navigation redirected to login");
                RouteDecision::Redirect {
                    to: self.login_path.clone(),
                    from: Some(from.to_string()),
                    notice: Some(SIGN_IN_NOTICE),
                }
            }
            Access::DenyWrongRole => {
                let to = match (&self.unauthorized_path, session.principal()) {
                    (Some(path), _) => path.clone(),
                    (None, Some(p)) => home_route(p.role).to_string(),
                    (None, None) => "/".to_string(),
                };
                tracing::debug!(%from, %to, "navigation denied for role");
                RouteDecision::Redirect {
                    to,
                    from: None,
                    notice: Some(FORBIDDEN_NOTICE),
                }
            }
        }
    }

    /// Entry point with no page of its own: send users to their dashboard.
    pub fn landing(&self, session: &Session) -> RouteDecision {
        if session.is_pending() {
            return RouteDecision::Loading;
        }
        match session.principal() {
            Some(p) => RouteDecision::Redirect {
                to: home_route(p.role).to_string(),
                from: None,
                notice: None,
            },
            None => RouteDecision::Redirect {
                to: self.login_path.clone(),
                from: None,
                notice: None,
            },
        }
    }

    /// Destination right after a successful login.
    pub fn after_login(&self, principal: &Principal, from: Option<&str>) -> String {
        match from {
            Some(path) if !path.is_empty() && path != self.login_path => path.to_string(),
            _ => home_route(principal.role).to_string(),
        }
    }
}

/// Default dashboard for a role.
pub fn home_route(role: Role) -> &'static str {
    role.home_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher() -> Session {
        Session::authenticated(Principal::new("u1", Role::Teacher, "Tess"))
    }

    #[test]
    fn pending_sessions_show_loading() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.check(&Session::checking(), &Requirement::Authenticated, "/teacher"),
            RouteDecision::Loading
        );
        assert_eq!(guard.landing(&Session::unknown()), RouteDecision::Loading);
    }

    #[test]
    fn anonymous_users_go_to_login_remembering_origin() {
        let guard = RouteGuard::default();
        let decision = guard.check(&Session::anonymous(), &Requirement::Role(Role::Admin), "/admin/users");
        assert_eq!(
            decision,
            RouteDecision::Redirect {
                to: "/login".to_string(),
                from: Some("/admin/users".to_string()),
                notice: Some(SIGN_IN_NOTICE),
            }
        );
    }

    #[test]
    fn wrong_role_goes_home_or_to_configured_path() {
        let guard = RouteGuard::default();
        let decision = guard.check(&teacher(), &Requirement::Role(Role::Admin), "/admin");
        assert_eq!(
            decision,
            RouteDecision::Redirect {
                to: "/teacher".to_string(),
                from: None,
                notice: Some(FORBIDDEN_NOTICE),
            }
        );

        let guard = RouteGuard::default().with_unauthorized_path("/");
        match guard.check(&teacher(), &Requirement::Role(Role::Admin), "/admin") {
            RouteDecision::Redirect { to, .. } => assert_eq!(to, "/"),
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn allowed_roles_render() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.check(
                &teacher(),
                &Requirement::AnyOf(vec![Role::Teacher, Role::Admin]),
                "/messages"
            ),
            RouteDecision::Render
        );
        assert_eq!(
            guard.check(&teacher(), &Requirement::Authenticated, "/profile"),
            RouteDecision::Render
        );
    }

    #[test]
    fn landing_routes_by_role() {
        let guard = RouteGuard::default();
        match guard.landing(&teacher()) {
            RouteDecision::Redirect { to, .. } => assert_eq!(to, "/teacher"),
            other => panic!("expected redirect, got {other:?}"),
        }
        match guard.landing(&Session::anonymous()) {
            RouteDecision::Redirect { to, .. } => assert_eq!(to, "/login"),
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn after_login_returns_to_origin_unless_it_was_login() {
        let guard = RouteGuard::default();
        let p = Principal::new("u9", Role::Student, "Sam");
        assert_eq!(guard.after_login(&p, Some("/student/courses")), "/student/courses");
        assert_eq!(guard.after_login(&p, Some("/login")), "/student");
        assert_eq!(guard.after_login(&p, None), "/student");
    }
}
