//! Built-in scenario catalog
//!
//! Numbered scenarios covering the account, resource, container and system
//! administration workflows of the console. Selectors are defaults: a config
//! scenario with the same name replaces the built-in one.

mod account;
mod containers;
mod resources;
mod system;

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ScenarioDefinition, Step};
use crate::interact::SelectorCascade;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCase {
    // Account (1-3)
    Register,
    Login,
    ChangePassword,

    // Resources (4-13)
    CreateMachine,
    MachineTrace,
    CreateRepository,
    EditRepository,
    RepositoryUp,
    RepositoryDown,
    RepositoryPush,
    StorageImport,
    DeleteRepository,
    DeleteMachine,

    // Containers (14-17)
    ContainerInspect,
    ContainerLogs,
    ContainerPause,
    ContainerStop,

    // System (18-33)
    CreateUser,
    CreateTeam,
    DeactivateUser,
    CreatePermissionGroup,
    ConfigureVault,
    DeleteTeam,
    DeletePermissionGroup,
    BlockUserRequests,
    UnblockUserRequests,
    CreateBridge,
    EditBridge,
    DeleteBridge,
    ResetBridgeAuth,
    CreateRegion,
    EditRegion,
    DeleteRegion,
}

const ALL: [ScenarioCase; 33] = [
    ScenarioCase::Register,
    ScenarioCase::Login,
    ScenarioCase::ChangePassword,
    ScenarioCase::CreateMachine,
    ScenarioCase::MachineTrace,
    ScenarioCase::CreateRepository,
    ScenarioCase::EditRepository,
    ScenarioCase::RepositoryUp,
    ScenarioCase::RepositoryDown,
    ScenarioCase::RepositoryPush,
    ScenarioCase::StorageImport,
    ScenarioCase::DeleteRepository,
    ScenarioCase::DeleteMachine,
    ScenarioCase::ContainerInspect,
    ScenarioCase::ContainerLogs,
    ScenarioCase::ContainerPause,
    ScenarioCase::ContainerStop,
    ScenarioCase::CreateUser,
    ScenarioCase::CreateTeam,
    ScenarioCase::DeactivateUser,
    ScenarioCase::CreatePermissionGroup,
    ScenarioCase::ConfigureVault,
    ScenarioCase::DeleteTeam,
    ScenarioCase::DeletePermissionGroup,
    ScenarioCase::BlockUserRequests,
    ScenarioCase::UnblockUserRequests,
    ScenarioCase::CreateBridge,
    ScenarioCase::EditBridge,
    ScenarioCase::DeleteBridge,
    ScenarioCase::ResetBridgeAuth,
    ScenarioCase::CreateRegion,
    ScenarioCase::EditRegion,
    ScenarioCase::DeleteRegion,
];

impl ScenarioCase {
    /// Catalog number (1-33)
    pub fn number(&self) -> u16 {
        ALL.iter().position(|c| c == self).map_or(0, |i| i as u16 + 1)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioCase::Register => "Register",
            ScenarioCase::Login => "Login",
            ScenarioCase::ChangePassword => "Change Password",
            ScenarioCase::CreateMachine => "Create Machine",
            ScenarioCase::MachineTrace => "Machine Trace",
            ScenarioCase::CreateRepository => "Create Repository",
            ScenarioCase::EditRepository => "Edit Repository",
            ScenarioCase::RepositoryUp => "Repository Up",
            ScenarioCase::RepositoryDown => "Repository Down",
            ScenarioCase::RepositoryPush => "Repository Push",
            ScenarioCase::StorageImport => "Storage Import",
            ScenarioCase::DeleteRepository => "Delete Repository",
            ScenarioCase::DeleteMachine => "Delete Machine",
            ScenarioCase::ContainerInspect => "Container Inspect",
            ScenarioCase::ContainerLogs => "Container Logs",
            ScenarioCase::ContainerPause => "Container Pause",
            ScenarioCase::ContainerStop => "Container Stop",
            ScenarioCase::CreateUser => "Create User",
            ScenarioCase::CreateTeam => "Create Team",
            ScenarioCase::DeactivateUser => "Deactivate User",
            ScenarioCase::CreatePermissionGroup => "Create Permission Group",
            ScenarioCase::ConfigureVault => "Configure Vault",
            ScenarioCase::DeleteTeam => "Delete Team",
            ScenarioCase::DeletePermissionGroup => "Delete Permission Group",
            ScenarioCase::BlockUserRequests => "Block User Requests",
            ScenarioCase::UnblockUserRequests => "Unblock User Requests",
            ScenarioCase::CreateBridge => "Create Bridge",
            ScenarioCase::EditBridge => "Edit Bridge",
            ScenarioCase::DeleteBridge => "Delete Bridge",
            ScenarioCase::ResetBridgeAuth => "Reset Bridge Auth",
            ScenarioCase::CreateRegion => "Create Region",
            ScenarioCase::EditRegion => "Edit Region",
            ScenarioCase::DeleteRegion => "Delete Region",
        }
    }

    /// Key used in suite definitions, e.g. `create_repository`
    pub fn slug(&self) -> &'static str {
        match self {
            ScenarioCase::Register => "register",
            ScenarioCase::Login => "login",
            ScenarioCase::ChangePassword => "change_password",
            ScenarioCase::CreateMachine => "create_machine",
            ScenarioCase::MachineTrace => "machine_trace",
            ScenarioCase::CreateRepository => "create_repository",
            ScenarioCase::EditRepository => "edit_repository",
            ScenarioCase::RepositoryUp => "repository_up",
            ScenarioCase::RepositoryDown => "repository_down",
            ScenarioCase::RepositoryPush => "repository_push",
            ScenarioCase::StorageImport => "storage_import",
            ScenarioCase::DeleteRepository => "delete_repository",
            ScenarioCase::DeleteMachine => "delete_machine",
            ScenarioCase::ContainerInspect => "container_inspect",
            ScenarioCase::ContainerLogs => "container_logs",
            ScenarioCase::ContainerPause => "container_pause",
            ScenarioCase::ContainerStop => "container_stop",
            ScenarioCase::CreateUser => "create_user",
            ScenarioCase::CreateTeam => "create_team",
            ScenarioCase::DeactivateUser => "deactivate_user",
            ScenarioCase::CreatePermissionGroup => "create_permission_group",
            ScenarioCase::ConfigureVault => "configure_vault",
            ScenarioCase::DeleteTeam => "delete_team",
            ScenarioCase::DeletePermissionGroup => "delete_permission_group",
            ScenarioCase::BlockUserRequests => "block_user_requests",
            ScenarioCase::UnblockUserRequests => "unblock_user_requests",
            ScenarioCase::CreateBridge => "create_bridge",
            ScenarioCase::EditBridge => "edit_bridge",
            ScenarioCase::DeleteBridge => "delete_bridge",
            ScenarioCase::ResetBridgeAuth => "reset_bridge_auth",
            ScenarioCase::CreateRegion => "create_region",
            ScenarioCase::EditRegion => "edit_region",
            ScenarioCase::DeleteRegion => "delete_region",
        }
    }

    pub fn category(&self) -> &'static str {
        match self.number() {
            1..=3 => "Account",
            4..=13 => "Resources",
            14..=17 => "Containers",
            _ => "System",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScenarioCase::Register => "Register a company account and activate it",
            ScenarioCase::Login => "Sign in and reach the dashboard",
            ScenarioCase::ChangePassword => "Change the login password and change it back",
            ScenarioCase::CreateMachine => "Add a machine and wait for its setup task",
            ScenarioCase::MachineTrace => "Open the audit trace of a machine",
            ScenarioCase::CreateRepository => "Create a repository on the test machine",
            ScenarioCase::EditRepository => "Rename the session repository",
            ScenarioCase::RepositoryUp => "Start the session repository",
            ScenarioCase::RepositoryDown => "Stop the session repository",
            ScenarioCase::RepositoryPush => "Push the session repository",
            ScenarioCase::StorageImport => "Import rclone storage and push the session repository to it",
            ScenarioCase::DeleteRepository => "Delete the session repository",
            ScenarioCase::DeleteMachine => "Delete the machine added by this session",
            ScenarioCase::ContainerInspect => "Inspect a running container",
            ScenarioCase::ContainerLogs => "Fetch logs of a running container",
            ScenarioCase::ContainerPause => "Pause a running container",
            ScenarioCase::ContainerStop => "Stop a running container",
            ScenarioCase::CreateUser => "Create a user",
            ScenarioCase::CreateTeam => "Create a team",
            ScenarioCase::DeactivateUser => "Deactivate a non-protected user",
            ScenarioCase::CreatePermissionGroup => "Create a permission group",
            ScenarioCase::ConfigureVault => "Open and save the company vault",
            ScenarioCase::DeleteTeam => "Delete a non-protected team",
            ScenarioCase::DeletePermissionGroup => "Delete a non-protected permission group",
            ScenarioCase::BlockUserRequests => "Block requests of all other users",
            ScenarioCase::UnblockUserRequests => "Lift the user request block",
            ScenarioCase::CreateBridge => "Create a bridge",
            ScenarioCase::EditBridge => "Rename the session bridge",
            ScenarioCase::DeleteBridge => "Delete the session bridge",
            ScenarioCase::ResetBridgeAuth => "Reset the authorization of a bridge",
            ScenarioCase::CreateRegion => "Create a region",
            ScenarioCase::EditRegion => "Rename the session region",
            ScenarioCase::DeleteRegion => "Delete the session region",
        }
    }

    pub fn all() -> Vec<ScenarioCase> {
        ALL.to_vec()
    }

    fn steps(&self) -> Vec<Step> {
        match self {
            ScenarioCase::Register => account::register(),
            ScenarioCase::Login => account::login(),
            ScenarioCase::ChangePassword => account::change_password(),
            ScenarioCase::CreateMachine => resources::create_machine(),
            ScenarioCase::MachineTrace => resources::machine_trace(),
            ScenarioCase::CreateRepository => resources::create_repository(),
            ScenarioCase::EditRepository => resources::edit_repository(),
            ScenarioCase::RepositoryUp => resources::repository_function("up"),
            ScenarioCase::RepositoryDown => resources::repository_function("down"),
            ScenarioCase::RepositoryPush => resources::repository_push(),
            ScenarioCase::StorageImport => resources::storage_import(),
            ScenarioCase::DeleteRepository => resources::delete_repository(),
            ScenarioCase::DeleteMachine => resources::delete_machine(),
            ScenarioCase::ContainerInspect => containers::container_action("inspect"),
            ScenarioCase::ContainerLogs => containers::container_action("logs"),
            ScenarioCase::ContainerPause => containers::container_action("pause"),
            ScenarioCase::ContainerStop => containers::container_action("stop"),
            ScenarioCase::CreateUser => system::create_user(),
            ScenarioCase::CreateTeam => system::create_team(),
            ScenarioCase::DeactivateUser => system::deactivate_user(),
            ScenarioCase::CreatePermissionGroup => system::create_permission_group(),
            ScenarioCase::ConfigureVault => system::configure_vault(),
            ScenarioCase::DeleteTeam => system::delete_team(),
            ScenarioCase::DeletePermissionGroup => system::delete_permission_group(),
            ScenarioCase::BlockUserRequests => system::user_requests(true),
            ScenarioCase::UnblockUserRequests => system::user_requests(false),
            ScenarioCase::CreateBridge => system::create_bridge(),
            ScenarioCase::EditBridge => system::edit_bridge(),
            ScenarioCase::DeleteBridge => system::delete_bridge(),
            ScenarioCase::ResetBridgeAuth => system::reset_bridge_auth(),
            ScenarioCase::CreateRegion => system::create_region(),
            ScenarioCase::EditRegion => system::edit_region(),
            ScenarioCase::DeleteRegion => system::delete_region(),
        }
    }

    pub fn definition(&self) -> ScenarioDefinition {
        ScenarioDefinition {
            name: self.name().to_string(),
            number: Some(self.number()),
            category: self.category().to_string(),
            description: self.description().to_string(),
            steps: self.steps(),
        }
    }
}

impl fmt::Display for ScenarioCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scenario {}: {}", self.number(), self.name())
    }
}

fn target<const N: usize>(description: &str, selectors: [&str; N]) -> SelectorCascade {
    SelectorCascade::new(description, selectors)
}

/// Any open dialog
fn modal() -> SelectorCascade {
    target("dialog", [".ant-modal-content", "[role=\"dialog\"]"])
}

fn modal_ok() -> SelectorCascade {
    target(
        "dialog OK button",
        [
            "[data-testid=\"resource-modal-ok-button\"]",
            ".ant-modal-footer button.ant-btn-primary",
            "button:has-text(\"OK\")",
            "button:has-text(\"Create\")",
            "button:has-text(\"Save\")",
        ],
    )
}

/// Confirmation button of a popconfirm or confirm dialog
fn confirm() -> SelectorCascade {
    target(
        "confirmation button",
        [
            "[data-testid=\"confirm-delete-button\"]",
            ".ant-popconfirm button.ant-btn-dangerous",
            ".ant-popconfirm button.ant-btn-primary",
            ".ant-modal-confirm-btns button.ant-btn-primary",
            "button:has-text(\"Yes\")",
            "button:has-text(\"Confirm\")",
        ],
    )
}

/// Labelled form input inside a dialog
fn form_input(label: &str, test_id: &str) -> SelectorCascade {
    SelectorCascade::new(
        format!("{label} input"),
        [
            format!("[data-testid=\"{test_id}\"]"),
            format!(
                "xpath=//div[contains(@class,'ant-form-item')][.//label[contains(normalize-space(.),'{label}')]]//input"
            ),
            format!("input[placeholder*=\"{label}\" i]"),
        ],
    )
}
