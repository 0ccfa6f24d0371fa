use super::{confirm, form_input, modal, target, Step};

pub(super) fn register() -> Vec<Step> {
    vec![
        Step::navigate("/console/login"),
        Step::click(target(
            "register link",
            [
                "[data-testid=\"login-register-link\"]",
                "a:has-text(\"Register\")",
                "button:has-text(\"Register\")",
            ],
        )),
        Step::wait_visible(target(
            "registration dialog",
            [
                "[data-testid=\"registration-modal\"]",
                ".ant-modal:has-text(\"Register\")",
            ],
        )),
        Step::fill(
            form_input("Company", "registration-company-input"),
            "{register_company}",
        ),
        Step::fill(
            form_input("Email", "registration-email-input"),
            "{register_email}",
        ),
        Step::fill(
            target(
                "registration password",
                [
                    "[data-testid=\"registration-password-input\"]",
                    "#password",
                ],
            ),
            "{user_password}",
        ),
        Step::fill(
            target(
                "registration password confirmation",
                [
                    "[data-testid=\"registration-password-confirm-input\"]",
                    "#confirmPassword",
                ],
            ),
            "{user_password}",
        ),
        Step::click_optional(target(
            "terms checkbox",
            [
                "[data-testid=\"registration-terms-checkbox\"]",
                ".ant-modal .ant-checkbox-input",
            ],
        )),
        Step::click(target(
            "create account button",
            [
                "[data-testid=\"registration-submit-button\"]",
                ".ant-modal button[type=\"submit\"]",
                "button:has-text(\"Create Account\")",
            ],
        )),
        Step::fill(
            target(
                "activation code",
                [
                    "[data-testid=\"registration-activation-code-input\"]",
                    "input[placeholder*=\"code\" i]",
                ],
            ),
            "{activation_code}",
        ),
        Step::click(target(
            "verify button",
            [
                "[data-testid=\"registration-verify-button\"]",
                "button:has-text(\"Verify\")",
            ],
        )),
        Step::expect(["activated", "registration (was )?successful", "account created"]),
        Step::screenshot("register_done"),
    ]
}

/// Login itself is performed by the runner; this only checks the landing page
pub(super) fn login() -> Vec<Step> {
    vec![
        Step::wait_visible(target(
            "main navigation",
            [
                "[data-testid=\"main-nav-machines\"]",
                "[data-testid=\"main-nav-resources\"]",
                ".ant-layout-sider .ant-menu",
            ],
        )),
        Step::screenshot("login_success"),
    ]
}

fn password_form(from: &str, to: &str) -> Vec<Step> {
    vec![
        Step::navigate("/console/system"),
        Step::click(target(
            "change password button",
            [
                "[data-testid=\"system-change-password-button\"]",
                "button:has-text(\"Change Password\")",
                "button:has-text(\"Update Password\")",
            ],
        )),
        Step::wait_visible(modal()),
        Step::fill(
            form_input("Current Password", "change-password-current-input"),
            from,
        ),
        Step::fill(form_input("New Password", "change-password-new-input"), to),
        Step::fill(
            form_input("Confirm", "change-password-confirm-input"),
            to,
        ),
        Step::click(target(
            "submit password change",
            [
                "[data-testid=\"change-password-submit-button\"]",
                ".ant-modal-footer button.ant-btn-primary",
                "[role=\"dialog\"] button:has-text(\"Change\")",
            ],
        )),
        Step::click_optional(confirm()),
        Step::expect(["password (changed|updated)"]).required(),
    ]
}

/// Change to `new_password`, then restore the configured one
pub(super) fn change_password() -> Vec<Step> {
    let mut steps = password_form("{password}", "{new_password}");
    steps.push(Step::screenshot("password_changed"));
    steps.extend(password_form("{new_password}", "{password}"));
    steps
}
