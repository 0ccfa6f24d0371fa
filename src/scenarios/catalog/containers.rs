use super::{confirm, target, Step};
use crate::interact::SelectorCascade;

/// Run a container action on the first running container of the machine
pub(super) fn container_action(action: &str) -> Vec<Step> {
    vec![
        Step::navigate("/console/machines"),
        Step::click(target(
            "machine {machine_name}",
            [
                "[data-testid=\"machine-remote-{machine_name}\"]",
                "[data-testid=\"machine-expand-{machine_name}\"]",
                "tr:has-text(\"{machine_name}\")",
            ],
        )),
        Step::wait_visible(target(
            "container list",
            [
                "[data-testid=\"repository-container-list\"]",
                "[data-testid=\"machine-repo-list-system-containers-table\"]",
                ".ant-table-tbody",
            ],
        )),
        Step::click(target(
            "container actions",
            [
                "[data-testid^=\"container-actions-\"]",
                "button[data-testid*=\"container-actions\"]",
                ".ant-dropdown-trigger:has-text(\"Actions\")",
            ],
        )),
        Step::click(SelectorCascade::new(
            format!("container {action}"),
            [
                format!("[data-testid=\"container-action-{action}\"]"),
                format!("li:has-text(\"container_{action}\")"),
                format!(".ant-dropdown-menu-item:has-text(\"{action}\")"),
            ],
        )),
        Step::click_optional(confirm()),
        Step::monitor_queue(),
        Step::screenshot(format!("container_{action}")),
    ]
}
