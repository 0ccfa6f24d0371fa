use super::{confirm, form_input, modal, modal_ok, target, Step};
use crate::interact::SelectorCascade;

/// System page with one of its tabs selected
fn open_tab(tab: &str) -> Vec<Step> {
    vec![
        Step::navigate("/console/system"),
        Step::click_optional(SelectorCascade::new(
            format!("{tab} tab"),
            [
                format!("[data-testid=\"system-tab-{}\"]", tab.to_lowercase()),
                format!(".ant-tabs-tab:has-text(\"{tab}\")"),
                format!("[role=\"tab\"]:has-text(\"{tab}\")"),
            ],
        )),
    ]
}

/// Expert mode shows the infrastructure and danger-zone sections
fn expert_mode() -> Step {
    Step::click_optional(target(
        "expert mode",
        [
            "[data-testid=\"main-mode-toggle\"]",
            "label:has-text(\"Expert\")",
            ".ant-radio-wrapper:has-text(\"Expert\")",
        ],
    ))
}

fn create_entity(
    tab: &str,
    entity: &str,
    field: &str,
    value: &str,
    success: &[&str],
) -> Vec<Step> {
    let test_id = entity.to_lowercase().replace(' ', "-");
    let mut steps = open_tab(tab);
    steps.extend([
        Step::click(SelectorCascade::new(
            format!("create {entity} button"),
            [
                format!("[data-testid=\"system-create-{test_id}-button\"]"),
                format!("button:has-text(\"Create {entity}\")"),
                format!("button:has-text(\"Add {entity}\")"),
            ],
        )),
        Step::wait_visible(modal()),
        Step::fill(
            form_input(&format!("{entity} Name"), &format!("resource-modal-field-{field}-input")),
            value,
        ),
        Step::click(modal_ok()),
        Step::expect(success.iter().copied()),
        Step::screenshot(format!("{}_created", test_id.replace('-', "_"))),
    ]);
    steps
}

fn edit_entity(tab: &str, entity: &str, field: &str, var: &str) -> Vec<Step> {
    let test_id = entity.to_lowercase();
    let mut steps = open_tab(tab);
    steps.extend([
        expert_mode(),
        Step::click(SelectorCascade::new(
            format!("edit {{{var}}}"),
            [
                format!("[data-testid=\"system-{test_id}-edit-button-{{{var}}}\"]"),
                format!(
                    "xpath=//tr[contains(normalize-space(.),'{{{var}}}')]//button[contains(normalize-space(.),'Edit')]"
                ),
            ],
        )),
        Step::wait_visible(modal()),
        Step::fill(
            form_input(&format!("{entity} Name"), &format!("resource-modal-field-{field}-input")),
            format!("{{{var}}}_edited"),
        ),
        Step::click(modal_ok()),
        Step::expect([format!("{entity} (was )?updated"), "renamed".to_string()]),
        Step::set(var, format!("{{{var}}}_edited")),
        Step::screenshot(format!("{test_id}_edited")),
    ]);
    steps
}

fn delete_entity(tab: &str, entity: &str, var: &str) -> Vec<Step> {
    let test_id = entity.to_lowercase();
    let mut steps = open_tab(tab);
    steps.extend([
        expert_mode(),
        Step::click(SelectorCascade::new(
            format!("delete {{{var}}}"),
            [
                format!("[data-testid=\"system-{test_id}-delete-button-{{{var}}}\"]"),
                format!(
                    "xpath=//tr[contains(normalize-space(.),'{{{var}}}')]//button[contains(@class,'ant-btn-dangerous')]"
                ),
            ],
        )),
        Step::click(confirm()),
        Step::expect([format!("{entity} (was )?deleted"), "deleted successfully".to_string()]),
        Step::screenshot(format!("{test_id}_deleted")),
    ]);
    steps
}

pub(super) fn create_user() -> Vec<Step> {
    let mut steps = open_tab("Users");
    steps.extend([
        Step::click(target(
            "create user button",
            [
                "[data-testid=\"system-create-user-button\"]",
                "button:has-text(\"Create User\")",
            ],
        )),
        Step::wait_visible(modal()),
        Step::fill(
            form_input("Email", "resource-modal-field-newUserEmail-input"),
            "{session_user}",
        ),
        Step::fill(
            form_input("Password", "resource-modal-field-newUserPassword-input"),
            "{user_password}",
        ),
        Step::click(modal_ok()),
        Step::expect(["user (was )?created", "created successfully"]),
        Step::screenshot("user_created"),
    ]);
    steps
}

pub(super) fn create_team() -> Vec<Step> {
    create_entity(
        "Teams",
        "Team",
        "teamName",
        "{session_team}",
        &["team (was )?created", "created successfully"],
    )
}

pub(super) fn deactivate_user() -> Vec<Step> {
    let mut steps = open_tab("Users");
    steps.extend([
        Step::pick_row(
            "[data-testid=\"system-user-table\"] tbody tr",
            0,
            &["{protected_users}", "{email}"],
            Some("[data-testid=\"system-user-deactivate-button-{value}\"]"),
            "target_user",
        ),
        Step::click(target(
            "deactivate {target_user}",
            ["[data-testid=\"system-user-deactivate-button-{target_user}\"]"],
        )),
        Step::click(confirm()),
        Step::expect_or_verify(
            ["user (was )?deactivated", "deactivated successfully"],
            [
                "[data-testid=\"system-user-activate-button-{target_user}\"]",
                "xpath=//tr[contains(normalize-space(.),'{target_user}')]//span[contains(@class,'ant-tag')][contains(normalize-space(.),'Inactive')]",
            ],
        ),
        Step::screenshot("user_deactivated"),
    ]);
    steps
}

pub(super) fn create_permission_group() -> Vec<Step> {
    let mut steps = open_tab("Permissions");
    steps.extend([
        Step::click(target(
            "create permission group button",
            [
                "[data-testid=\"system-create-permission-group-button\"]",
                "button:has-text(\"Create Group\")",
            ],
        )),
        Step::wait_visible(modal()),
        Step::fill(
            form_input("Group Name", "system-permission-group-name-input"),
            "{session_group}",
        ),
        Step::click(modal_ok()),
        Step::expect(["permission group (was )?created", "group created"]),
        Step::screenshot("permission_group_created"),
    ]);
    steps
}

pub(super) fn configure_vault() -> Vec<Step> {
    vec![
        Step::navigate("/console/system"),
        Step::click(target(
            "company vault button",
            [
                "[data-testid=\"system-company-vault-button\"]",
                "button:has-text(\"Configure Vault\")",
                "button:has-text(\"Vault\")",
            ],
        )),
        Step::wait_visible(target(
            "vault dialog",
            ["[data-testid=\"vault-modal\"]", ".ant-modal:has-text(\"Vault\")"],
        )),
        Step::screenshot("vault_open"),
        Step::click(target(
            "save vault",
            [
                "[data-testid=\"vault-modal-save-button\"]",
                ".ant-modal button:has-text(\"Save\")",
                ".ant-modal button:has-text(\"OK\")",
            ],
        )),
        Step::expect(["vault (was )?(updated|saved)", "saved successfully"]),
    ]
}

pub(super) fn delete_team() -> Vec<Step> {
    let mut steps = open_tab("Teams");
    steps.extend([
        Step::pick_row(
            "[data-testid=\"system-team-table\"] tbody tr",
            0,
            &["{team_name}", "{protected_teams}"],
            Some("[data-testid=\"system-team-delete-button-{value}\"]"),
            "target_team",
        ),
        Step::click(target(
            "delete {target_team}",
            ["[data-testid=\"system-team-delete-button-{target_team}\"]"],
        )),
        Step::click(confirm()),
        Step::expect(["team (was )?deleted", "deleted successfully"]),
        Step::screenshot("team_deleted"),
    ]);
    steps
}

pub(super) fn delete_permission_group() -> Vec<Step> {
    let mut steps = open_tab("Permissions");
    steps.extend([
        Step::pick_row(
            "[data-testid=\"system-permission-group-table\"] tbody tr",
            0,
            &["{protected_groups}"],
            Some("[data-testid=\"system-permission-group-delete-button-{value}\"]"),
            "target_group",
        ),
        Step::click(target(
            "delete {target_group}",
            ["[data-testid=\"system-permission-group-delete-button-{target_group}\"]"],
        )),
        Step::click(confirm()),
        Step::expect(["permission group (was )?deleted", "deleted successfully"]),
        Step::screenshot("permission_group_deleted"),
    ]);
    steps
}

pub(super) fn user_requests(block: bool) -> Vec<Step> {
    let (label, test_id, success) = if block {
        ("Block User Requests", "system-block-user-requests-button", "blocked")
    } else {
        ("Unblock User Requests", "system-unblock-user-requests-button", "unblocked")
    };
    vec![
        Step::navigate("/console/system"),
        expert_mode(),
        Step::click(SelectorCascade::new(
            label.to_lowercase(),
            [
                format!("[data-testid=\"{test_id}\"]"),
                format!("button:has-text(\"{label}\")"),
            ],
        )),
        Step::click(target(
            "confirm",
            [
                ".ant-modal-confirm-btns button.ant-btn-primary",
                ".ant-popconfirm button.ant-btn-primary",
                "button:has-text(\"Yes\")",
                "button:has-text(\"Confirm\")",
            ],
        )),
        Step::expect([format!("requests? (were |are )?{success}"), success.to_string()]),
        Step::screenshot(format!("user_requests_{success}")),
    ]
}

pub(super) fn create_bridge() -> Vec<Step> {
    let mut steps = create_entity(
        "Bridges",
        "Bridge",
        "bridgeName",
        "{session_bridge}",
        &["bridge (was )?created", "created successfully"],
    );
    steps.insert(1, expert_mode());
    steps
}

pub(super) fn edit_bridge() -> Vec<Step> {
    edit_entity("Bridges", "Bridge", "bridgeName", "session_bridge")
}

pub(super) fn delete_bridge() -> Vec<Step> {
    delete_entity("Bridges", "Bridge", "session_bridge")
}

pub(super) fn reset_bridge_auth() -> Vec<Step> {
    let mut steps = open_tab("Bridges");
    steps.extend([
        expert_mode(),
        Step::pick_row(
            "[data-testid=\"system-bridge-table\"] tbody tr",
            0,
            &["{protected_bridges}"],
            Some("[data-testid=\"system-bridge-reset-auth-button-{value}\"]"),
            "target_bridge",
        ),
        Step::click(target(
            "reset auth of {target_bridge}",
            ["[data-testid=\"system-bridge-reset-auth-button-{target_bridge}\"]"],
        )),
        Step::click(confirm()),
        Step::expect([
            "authorization (was )?reset",
            "reset successfully",
            "token (was )?(regenerated|reset)",
        ]),
        Step::screenshot("bridge_auth_reset"),
    ]);
    steps
}

pub(super) fn create_region() -> Vec<Step> {
    let mut steps = create_entity(
        "Regions",
        "Region",
        "regionName",
        "{session_region}",
        &["region (was )?created", "created successfully"],
    );
    steps.insert(1, expert_mode());
    steps
}

pub(super) fn edit_region() -> Vec<Step> {
    edit_entity("Regions", "Region", "regionName", "session_region")
}

pub(super) fn delete_region() -> Vec<Step> {
    delete_entity("Regions", "Region", "session_region")
}
