//! Role-based capability checks with per-role feature toggles.
//!
//! Every permission key has a static set of roles allowed by default. A feature
//! toggle can switch a feature on or off for one role, overriding that default.
//! Admins pass every check, and the wildcard key is only ever granted to
//! admins, whatever the toggles say.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Dashboard,
    Tickets,
    MyTickets,
    Kanban,
    Epics,
    Reports,
    Workflows,
    TeamManagement,
    CreateTicket,
    TicketDetail,
    AssignTickets,
    Profile,
    Notifications,
    /// The `*` capability behind admin-only surfaces.
    #[serde(rename = "admin", alias = "*")]
    Wildcard,
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Permission::Dashboard,
        Permission::Tickets,
        Permission::MyTickets,
        Permission::Kanban,
        Permission::Epics,
        Permission::Reports,
        Permission::Workflows,
        Permission::TeamManagement,
        Permission::CreateTicket,
        Permission::TicketDetail,
        Permission::AssignTickets,
        Permission::Profile,
        Permission::Notifications,
        Permission::Wildcard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Dashboard => "dashboard",
            Permission::Tickets => "tickets",
            Permission::MyTickets => "my_tickets",
            Permission::Kanban => "kanban",
            Permission::Epics => "epics",
            Permission::Reports => "reports",
            Permission::Workflows => "workflows",
            Permission::TeamManagement => "team_management",
            Permission::CreateTicket => "create_ticket",
            Permission::TicketDetail => "ticket_detail",
            Permission::AssignTickets => "assign_tickets",
            Permission::Profile => "profile",
            Permission::Notifications => "notifications",
            Permission::Wildcard => "admin",
        }
    }

    /// The feature toggle that governs this key, if any.
    pub fn feature(&self) -> Option<Feature> {
        match self {
            Permission::Dashboard => Some(Feature::DashboardAccess),
            Permission::Tickets | Permission::MyTickets => Some(Feature::TicketManagement),
            Permission::Kanban => Some(Feature::KanbanAccess),
            Permission::Epics => Some(Feature::ProjectManagement),
            Permission::Reports => Some(Feature::ReportsAccess),
            Permission::Workflows => Some(Feature::WorkflowManagement),
            Permission::Profile => Some(Feature::ProfileAccess),
            Permission::Notifications => Some(Feature::NotificationAccess),
            Permission::Wildcard => Some(Feature::AdminAccess),
            Permission::TeamManagement
            | Permission::CreateTicket
            | Permission::TicketDetail
            | Permission::AssignTickets => None,
        }
    }

    /// Roles granted this key when no toggle says otherwise. Admin is implicit.
    pub fn default_roles(&self) -> &'static [Role] {
        const STAFF: &[Role] = &[Role::Manager, Role::TeamMember];
        const EVERYONE: &[Role] = &[Role::Manager, Role::TeamMember, Role::Client];
        const MANAGERS: &[Role] = &[Role::Manager];

        match self {
            Permission::Dashboard
            | Permission::Tickets
            | Permission::MyTickets
            | Permission::CreateTicket
            | Permission::TicketDetail
            | Permission::Profile
            | Permission::Notifications => EVERYONE,
            Permission::Kanban => STAFF,
            Permission::Epics
            | Permission::Reports
            | Permission::Workflows
            | Permission::TeamManagement
            | Permission::AssignTickets => MANAGERS,
            Permission::Wildcard => &[],
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(Permission::Wildcard);
        }
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown permission: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    DashboardAccess,
    TicketManagement,
    KanbanAccess,
    ProjectManagement,
    WorkflowManagement,
    ReportsAccess,
    AdminAccess,
    NotificationAccess,
    ProfileAccess,
}

impl Feature {
    pub const ALL: [Feature; 9] = [
        Feature::DashboardAccess,
        Feature::TicketManagement,
        Feature::KanbanAccess,
        Feature::ProjectManagement,
        Feature::WorkflowManagement,
        Feature::ReportsAccess,
        Feature::AdminAccess,
        Feature::NotificationAccess,
        Feature::ProfileAccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::DashboardAccess => "dashboardAccess",
            Feature::TicketManagement => "ticketManagement",
            Feature::KanbanAccess => "kanbanAccess",
            Feature::ProjectManagement => "projectManagement",
            Feature::WorkflowManagement => "workflowManagement",
            Feature::ReportsAccess => "reportsAccess",
            Feature::AdminAccess => "adminAccess",
            Feature::NotificationAccess => "notificationAccess",
            Feature::ProfileAccess => "profileAccess",
        }
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("Unknown feature: {s}"))
    }
}

/// Explicit per-role overrides of the default capability table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureToggles {
    overrides: HashMap<(Feature, Role), bool>,
}

impl FeatureToggles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, feature: Feature, role: Role, enabled: bool) {
        self.overrides.insert((feature, role), enabled);
    }

    pub fn get(&self, feature: Feature, role: Role) -> Option<bool> {
        self.overrides.get(&(feature, role)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, Role, bool)> + '_ {
        self.overrides
            .iter()
            .map(|(&(feature, role), &enabled)| (feature, role, enabled))
    }
}

impl FromIterator<(Feature, Role, bool)> for FeatureToggles {
    fn from_iter<I: IntoIterator<Item = (Feature, Role, bool)>>(iter: I) -> Self {
        let mut toggles = FeatureToggles::new();
        for (feature, role, enabled) in iter {
            toggles.set(feature, role, enabled);
        }
        toggles
    }
}

pub fn has_permission(role: Role, permission: Permission, toggles: &FeatureToggles) -> bool {
    if role == Role::Admin {
        return true;
    }

    // Never reachable through a toggle.
    if permission == Permission::Wildcard {
        return false;
    }

    if let Some(enabled) = permission
        .feature()
        .and_then(|feature| toggles.get(feature, role))
    {
        return enabled;
    }

    permission.default_roles().contains(&role)
}

/// Every key the role currently holds.
pub fn effective_permissions(role: Role, toggles: &FeatureToggles) -> Vec<Permission> {
    Permission::ALL
        .into_iter()
        .filter(|&p| has_permission(role, p, toggles))
        .collect()
}
