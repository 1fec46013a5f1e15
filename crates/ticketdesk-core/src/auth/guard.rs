//! Which view a session may see.

use crate::models::Role;

use super::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    /// Ticket list of a regular user
    User,
    /// Support queue
    Admin,
}

impl View {
    pub fn is_protected(self) -> bool {
        !matches!(self, View::Login)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Startup check still running, render nothing yet
    Pending,
    Show(View),
    Redirect(View),
}

impl Role {
    /// Landing view after sign-in
    pub fn home(self) -> View {
        match self {
            Role::User => View::User,
            Role::Support => View::Admin,
        }
    }

    pub fn can_view(self, view: View) -> bool {
        match view {
            View::Admin => self.is_support(),
            View::Login | View::User => true,
        }
    }
}

impl SessionState {
    pub fn route(&self, requested: View) -> Route {
        if !self.ready {
            return Route::Pending;
        }

        match &self.identity {
            None if requested.is_protected() => Route::Redirect(View::Login),
            None => Route::Show(requested),
            Some(user) if requested == View::Login => Route::Redirect(user.role.home()),
            Some(user) if !user.role.can_view(requested) => Route::Redirect(user.role.home()),
            Some(_) => Route::Show(requested),
        }
    }
}
