//! Seeded demo page for the REPL.
//!
//! Models the app's auth screen: mode tabs, the sign-up form with a role
//! dropdown, and a hidden verification step that submitting reveals. A few
//! navigation links sit far down the page so scrolling has something to do.

use std::sync::Arc;

use compass_surface::{MockSurface, NodeSpec};

/// Build the auth demo page.
pub fn auth_page() -> Arc<MockSurface> {
    let surface = Arc::new(MockSurface::new("/auth"));

    surface.add(
        NodeSpec::button("Sign In")
            .action_id("signin-tab")
            .at(440.0, 120.0)
            .sized(120.0, 40.0),
    );
    surface.add(
        NodeSpec::button("Sign Up")
            .action_id("signup-tab")
            .at(580.0, 120.0)
            .sized(120.0, 40.0),
    );

    surface.add(
        NodeSpec::text_input("name")
            .action_id("signup-name")
            .label("Full name")
            .placeholder("Jane Doe")
            .at(440.0, 200.0),
    );
    surface.add(
        NodeSpec::text_input("email")
            .action_id("signup-email")
            .input_type("email")
            .label("Email address")
            .placeholder("you@example.com")
            .at(440.0, 260.0),
    );
    surface.add(
        NodeSpec::text_input("password")
            .action_id("signup-password")
            .input_type("password")
            .label("Password")
            .at(440.0, 320.0),
    );
    surface.add(
        NodeSpec::select(
            "role",
            vec![("student", "Student"), ("counsellor", "Counsellor")],
        )
        .action_id("role-select")
        .label("I am a")
        .at(440.0, 380.0),
    );
    surface.add(
        NodeSpec::checkbox("remember")
            .action_id("remember-me")
            .label("Remember me")
            .at(440.0, 440.0)
            .sized(24.0, 24.0),
    );

    let submit = surface.add(
        NodeSpec::button("Create account")
            .action_id("signup-submit")
            .at(440.0, 500.0),
    );

    // The verification step stays hidden until the form is submitted.
    let otp = surface.add(
        NodeSpec::text_input("otp")
            .action_id("otp-input")
            .label("Verification code")
            .placeholder("6-digit code")
            .at(440.0, 580.0)
            .hidden(),
    );
    let verify = surface.add(
        NodeSpec::button("Verify")
            .action_id("verify-submit")
            .at(440.0, 640.0)
            .hidden(),
    );
    surface.on_click(submit, move |page| {
        page.set_hidden(otp, false);
        page.set_hidden(verify, false);
    });

    surface.add(
        NodeSpec::link("Dashboard")
            .action_id("nav-dashboard")
            .at(200.0, 2200.0),
    );
    surface.add(
        NodeSpec::link("Resume builder")
            .action_id("nav-resume")
            .at(440.0, 2200.0),
    );
    surface.add(
        NodeSpec::link("Messages")
            .action_id("nav-messages")
            .at(680.0, 2200.0),
    );

    surface
}
