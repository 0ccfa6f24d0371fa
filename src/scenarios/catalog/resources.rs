use super::{confirm, form_input, modal, modal_ok, target, Step};
use crate::interact::SelectorCascade;

fn open_machines() -> Vec<Step> {
    vec![
        Step::navigate("/console/machines"),
        Step::wait_visible(target(
            "machine table",
            [
                "[data-testid=\"machine-table\"]",
                ".ant-table",
            ],
        )),
    ]
}

/// Expand the repository list of the configured machine
fn open_machine_repositories() -> Vec<Step> {
    let mut steps = open_machines();
    steps.push(Step::click(target(
        "machine {machine_name}",
        [
            "[data-testid=\"machine-remote-{machine_name}\"]",
            "[data-testid=\"machine-expand-{machine_name}\"]",
            "tr:has-text(\"{machine_name}\")",
        ],
    )));
    steps
}

fn repository_actions() -> SelectorCascade {
    target(
        "actions of {session_repo}",
        [
            "[data-testid=\"machine-repo-list-repo-actions-{session_repo}\"]",
            "xpath=//tr[contains(normalize-space(.),'{session_repo}')]//button[contains(normalize-space(.),'Actions')]",
        ],
    )
}

fn run_function_dialog() -> Vec<Step> {
    vec![
        Step::wait_visible(target(
            "function dialog",
            [
                "[data-testid=\"machine-repo-list-function-modal\"]",
                ".ant-modal:has-text(\"Function\")",
            ],
        ))
        .with_timeout(3000)
        .optional(),
        Step::click_optional(target(
            "run function button",
            [
                "[data-testid=\"function-modal-submit\"]",
                ".ant-modal-footer button.ant-btn-primary",
            ],
        )),
    ]
}

pub(super) fn create_machine() -> Vec<Step> {
    let mut steps = open_machines();
    steps.extend([
        Step::click(target(
            "create machine button",
            [
                "[data-testid=\"resources-create-machine-button\"]",
                "button:has-text(\"Create Machine\")",
                "button:has-text(\"Add Machine\")",
            ],
        )),
        Step::wait_visible(modal()),
        Step::fill(
            form_input("Machine Name", "resource-modal-field-machineName-input"),
            "{session_machine}",
        ),
        Step::fill(form_input("IP", "vault-editor-field-ip"), "{machine_ip}"),
        Step::fill(form_input("User", "vault-editor-field-user"), "{machine_user}"),
        Step::click_optional(target(
            "test connection button",
            [
                "[data-testid=\"vault-editor-test-connection\"]",
                "button:has-text(\"Test Connection\")",
            ],
        )),
        Step::click(modal_ok()),
        Step::monitor_queue(),
        Step::screenshot("machine_created"),
    ]);
    steps
}

pub(super) fn machine_trace() -> Vec<Step> {
    let mut steps = open_machines();
    steps.extend([
        Step::click(target(
            "machine menu",
            [
                "[data-testid=\"machine-dropdown-{machine_name}\"]",
                "xpath=//tr[contains(normalize-space(.),'{machine_name}')]//button[last()]",
            ],
        )),
        Step::click(target(
            "trace menu item",
            [
                "[data-testid=\"machine-trace-{machine_name}\"]",
                ".ant-dropdown-menu-item:has-text(\"Trace\")",
            ],
        )),
        Step::wait_visible(target(
            "audit trace dialog",
            [
                "[data-testid=\"audit-trace-modal\"]",
                ".ant-modal:has-text(\"Trace\")",
            ],
        )),
        Step::screenshot("machine_trace"),
        Step::click_optional(target(
            "close trace",
            [
                "[data-testid=\"audit-trace-close-button\"]",
                ".ant-modal-footer button:has-text(\"Close\")",
                "button.ant-modal-close",
            ],
        )),
    ]);
    steps
}

pub(super) fn create_repository() -> Vec<Step> {
    let mut steps = open_machine_repositories();
    steps.extend([
        Step::click(target(
            "create repository button",
            [
                "[data-testid=\"machine-repositories-create-repo-button\"]",
                "text=Create Repo",
            ],
        )),
        Step::wait_visible(modal()),
        Step::fill(
            form_input("Repository Name", "resource-modal-field-repositoryName-input"),
            "{session_repo}",
        ),
        Step::fill(
            form_input("Size", "resource-modal-field-size-size-input"),
            "{repository_size}",
        ),
        Step::click_optional(target(
            "generate credential",
            ["[data-testid=\"vault-editor-generate-credential\"]"],
        )),
        Step::click_optional(target(
            "generate button",
            ["[data-testid=\"vault-editor-generate-button\"]"],
        )),
        Step::click_optional(target(
            "apply generated values",
            ["[data-testid=\"vault-editor-apply-generated\"]"],
        )),
        Step::click(modal_ok()),
        Step::monitor_queue(),
        Step::screenshot("repository_created"),
    ]);
    steps
}

/// Rename the repository and carry the new name to later scenarios
pub(super) fn edit_repository() -> Vec<Step> {
    let mut steps = open_machine_repositories();
    steps.extend([
        Step::click(target(
            "edit {session_repo}",
            [
                "[data-testid=\"resources-repository-edit-{session_repo}\"]",
                "xpath=//tr[contains(normalize-space(.),'{session_repo}')]//button[contains(normalize-space(.),'Edit')]",
            ],
        )),
        Step::wait_visible(modal()),
        Step::fill(
            form_input("Repository Name", "resource-modal-field-repositoryName-input"),
            "{session_repo}_edited",
        ),
        Step::click(modal_ok()),
        Step::expect(["repository (was )?updated", "renamed", "saved"]),
        Step::set("session_repo", "{session_repo}_edited"),
        Step::screenshot("repository_edited"),
    ]);
    steps
}

/// Run a repository function (`up`, `down`, ...) and follow its queue item
pub(super) fn repository_function(function: &str) -> Vec<Step> {
    let mut steps = open_machine_repositories();
    steps.push(Step::click(repository_actions()));
    steps.push(Step::click(SelectorCascade::new(
        format!("{function} action"),
        [
            format!("[data-testid=\"repo-action-{function}\"]"),
            format!("[data-testid=\"function-modal-item-{function}\"]"),
            format!(".ant-dropdown-menu-item:has-text(\"{function}\")"),
        ],
    )));
    steps.extend(run_function_dialog());
    steps.push(Step::monitor_queue());
    steps.push(Step::screenshot(format!("repository_{function}")));
    steps
}

pub(super) fn repository_push() -> Vec<Step> {
    let mut steps = open_machine_repositories();
    steps.extend([
        Step::click(repository_actions()),
        Step::click(target(
            "push action",
            [
                "[data-testid=\"repo-action-push\"]",
                "[data-testid=\"function-modal-item-push\"]",
                ".ant-dropdown-menu-item:has-text(\"push\")",
            ],
        )),
        Step::wait_visible(modal()),
        Step::fill(
            form_input("Destination", "function-modal-param-dest"),
            "{session_repo}_push",
        ),
    ]);
    steps.extend(run_function_dialog());
    steps.push(Step::monitor_queue());
    steps.push(Step::screenshot("repository_push"));
    steps
}

/// Import an rclone config as storage, then push the session repository to it
pub(super) fn storage_import() -> Vec<Step> {
    let mut steps = vec![
        Step::navigate("/console/resources"),
        Step::click(target(
            "storage tab",
            [
                "[data-testid=\"resources-tab-storage\"]",
                ".ant-tabs-tab:has-text(\"Storage\")",
            ],
        )),
        Step::click(target(
            "import button",
            [
                "[data-testid=\"resources-import-button\"]",
                "button:has-text(\"Import\")",
            ],
        )),
        Step::wait_visible(modal()),
        Step::upload(
            target(
                "rclone config input",
                [
                    "[data-testid=\"rclone-wizard-upload\"] input[type=\"file\"]",
                    ".ant-modal input[type=\"file\"]",
                    "input[type=\"file\"]",
                ],
            ),
            "{storage_config}",
        ),
        Step::pause(1000),
        // Disabled when the storage already exists
        Step::click_optional(target(
            "import storage button",
            [
                "[data-testid=\"rclone-wizard-import-button\"]",
                ".ant-modal-footer button:has-text(\"Import\")",
            ],
        )),
        Step::click_optional(target(
            "close import wizard",
            [
                "[data-testid=\"rclone-wizard-close-button\"]",
                ".ant-modal-footer button:has-text(\"Close\")",
                "button.ant-modal-close",
            ],
        )),
        Step::screenshot("storage_imported"),
    ];

    steps.extend(open_machine_repositories());
    steps.extend([
        Step::click(repository_actions()),
        Step::click(target(
            "push action",
            [
                "[data-testid=\"repo-action-push\"]",
                "[data-testid=\"function-modal-item-push\"]",
                ".ant-dropdown-menu-item:has-text(\"push\")",
            ],
        )),
        Step::wait_visible(modal()),
        Step::click_optional(target(
            "destination type",
            [
                "[data-testid=\"function-modal-param-destinationType\"]",
                "xpath=(//div[contains(@class,'ant-modal')]//div[contains(@class,'ant-select-selector')])[1]",
            ],
        )),
        Step::click_optional(target(
            "storage destination",
            [".ant-select-item:has-text(\"storage\")"],
        )),
        Step::click_optional(target(
            "storage select",
            [
                "[data-testid=\"function-modal-param-to\"]",
                "xpath=(//div[contains(@class,'ant-modal')]//div[contains(@class,'ant-select-selector')])[2]",
            ],
        )),
        Step::click_optional(target(
            "storage {storage_name}",
            [".ant-select-item:has-text(\"{storage_name}\")"],
        )),
        Step::click(target(
            "add to queue button",
            [
                "[data-testid=\"push-add-to-queue-button\"]",
                "button:has-text(\"Add to Queue\")",
            ],
        )),
        Step::monitor_queue(),
        Step::screenshot("storage_push"),
    ]);
    steps
}

pub(super) fn delete_repository() -> Vec<Step> {
    let mut steps = open_machine_repositories();
    steps.extend([
        Step::click(repository_actions()),
        Step::click(target(
            "delete action",
            [
                "[data-testid=\"repo-action-delete\"]",
                ".ant-dropdown-menu-item:has-text(\"Delete\")",
            ],
        )),
        Step::click(confirm()),
        Step::monitor_queue(),
        Step::screenshot("repository_deleted"),
    ]);
    steps
}

pub(super) fn delete_machine() -> Vec<Step> {
    let mut steps = open_machines();
    steps.extend([
        Step::click(target(
            "delete {session_machine}",
            [
                "[data-testid=\"machine-delete-{session_machine}\"]",
                "xpath=//tr[contains(normalize-space(.),'{session_machine}')]//button[contains(@class,'ant-btn-dangerous')]",
            ],
        )),
        Step::click(confirm()),
        Step::expect(["machine (was )?deleted", "deleted successfully"]),
        Step::screenshot("machine_deleted"),
    ]);
    steps
}
