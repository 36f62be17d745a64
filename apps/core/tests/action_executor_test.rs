use quicksearch_core::action_executor::{
    validate_web_target, LaunchError, LinkOpener, RecordingLinkOpener,
};

#[test]
fn rejects_empty_open_target() {
    assert_eq!(validate_web_target("   "), Err(LaunchError::EmptyTarget));
}

#[test]
fn rejects_non_web_targets() {
    for target in ["file:///etc/passwd", "mailto:someone@example.com", "not a url"] {
        assert_eq!(
            validate_web_target(target),
            Err(LaunchError::InvalidUrl(target.to_string()))
        );
    }
}

#[test]
fn accepts_and_trims_web_targets() {
    assert_eq!(
        validate_web_target("  https://duckduckgo.com/?q=quicksearch "),
        Ok("https://duckduckgo.com/?q=quicksearch")
    );
    assert!(validate_web_target("http://localhost:3131").is_ok());
}

#[test]
fn recording_opener_shares_its_log_across_clones() {
    let opener = RecordingLinkOpener::default();
    let handle = opener.clone();

    opener.open("https://example.com/a").unwrap();
    handle.open("https://example.com/b").unwrap();

    assert_eq!(
        opener.opened(),
        vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string()
        ]
    );
}

#[test]
fn recording_opener_refuses_what_the_system_opener_would() {
    let opener = RecordingLinkOpener::default();
    assert_eq!(opener.open(""), Err(LaunchError::EmptyTarget));
    assert!(matches!(
        opener.open("javascript:alert(1)"),
        Err(LaunchError::InvalidUrl(_))
    ));
    assert!(opener.opened().is_empty());
}

#[test]
fn launch_errors_render_exit_codes() {
    let error = LaunchError::LaunchFailed {
        message: "ShellExecuteW failed".to_string(),
        code: Some(2),
    };
    assert_eq!(error.to_string(), "launch failed (2): ShellExecuteW failed");
}
