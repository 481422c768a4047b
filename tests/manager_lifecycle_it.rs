mod stub;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use parking_lot::Mutex;
// self
use oauth2_dpop_client::{
	error::Error,
	manager::{TokenManager, events::ManagerEvent},
};
use stub::{StubPrompter, StubTransport, credentials, endpoints, ok, token_body};

#[tokio::test]
async fn cached_token_is_reused_without_network() {
	let transport = StubTransport::new([ok(&token_body("Bearer", 300))]);
	let prompter = StubPrompter::granting("auth-code");
	let manager = stub::manager(transport.clone(), prompter).with_refresh_token("rt-1");
	let first = manager.authorization_header().await.expect("First acquisition should succeed.");

	for _ in 0..5 {
		let header =
			manager.authorization_header().await.expect("Cached reads should succeed.");

		assert_eq!(header, first);
	}

	assert_eq!(first, "Bearer at");
	assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn concurrent_callers_coalesce_into_one_acquisition() {
	let transport = StubTransport::with_delay(
		[ok(&token_body("Bearer", 300))],
		Duration::from_millis(50),
	);
	let prompter = StubPrompter::granting("auth-code");
	let manager =
		Arc::new(stub::manager(transport.clone(), prompter).with_refresh_token("rt-1"));
	let tasks = (0..5)
		.map(|_| {
			let manager = manager.clone();

			tokio::spawn(async move { manager.authorization_header().await })
		})
		.collect::<Vec<_>>();

	for task in tasks {
		let header = task
			.await
			.expect("Task should not panic.")
			.expect("Every coalesced caller should receive the token.");

		assert_eq!(header, "Bearer at");
	}

	assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn stored_refresh_token_skips_the_interactive_flow() {
	let transport = StubTransport::new([ok(&token_body("Bearer", 300))]);
	let prompter = StubPrompter::granting("auth-code");
	let manager =
		stub::manager(transport.clone(), prompter.clone()).with_refresh_token("rt-1");

	manager.authorization_header().await.expect("Refresh grant should succeed.");

	assert_eq!(prompter.prompt_count(), 0);

	let requests = transport.requests();

	assert_eq!(requests[0].field_value("grant_type"), Some("refresh_token"));
	assert_eq!(requests[0].field_value("refresh_token"), Some("rt-1"));
}

#[tokio::test]
async fn rotated_refresh_token_is_stored_and_announced() {
	let transport = StubTransport::new([ok(
		r#"{"access_token":"at","token_type":"Bearer","expires_in":300,"refresh_token":"rt-2"}"#,
	)]);
	let prompter = StubPrompter::granting("auth-code");
	let manager =
		stub::manager(transport.clone(), prompter).with_refresh_token("rt-1");
	let events = Arc::new(Mutex::new(Vec::new()));

	{
		let events = events.clone();

		manager.on_event(Box::new(move |event| events.lock().push(event.clone())));
	}

	manager.authorization_header().await.expect("Refresh grant should succeed.");

	assert_eq!(manager.refresh_token(), Some("rt-2".into()));
	assert_eq!(*events.lock(), vec![ManagerEvent::RefreshTokenIssued("rt-2".into())]);
}

#[tokio::test]
async fn insufficient_scope_fails_and_clears_the_refresh_token() {
	let transport = StubTransport::new([ok(
		r#"{"access_token":"at","token_type":"Bearer","expires_in":300,"scope":"a"}"#,
	)]);
	let prompter = StubPrompter::granting("auth-code");
	let manager = TokenManager::new(
		transport.clone(),
		prompter,
		credentials().with_scopes(["a", "b"]),
		endpoints(),
	)
	.with_refresh_token("rt-1");
	let err = manager
		.authorization_header()
		.await
		.expect_err("A narrower grant should fail the acquisition.");

	assert!(matches!(
		err,
		Error::ScopeMismatch { required, granted } if required == "a b" && granted == "a",
	));
	assert_eq!(manager.refresh_token(), None);
}

#[tokio::test]
async fn denied_prompt_surfaces_the_error_code() {
	let transport = StubTransport::new([]);
	let prompter = StubPrompter::denying(Some("access_denied"));
	let manager = stub::manager(transport.clone(), prompter);
	let err = manager
		.authorization_header()
		.await
		.expect_err("A denied prompt should fail the acquisition.");

	assert!(matches!(
		err,
		Error::AuthorizationDenied { code: Some(code) } if code == "access_denied",
	));
	// No exchange was attempted.
	assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn prompt_without_a_code_is_denied_with_no_error_code() {
	let transport = StubTransport::new([]);
	let prompter = StubPrompter::denying(None);
	let manager = stub::manager(transport, prompter);
	let err = manager
		.authorization_header()
		.await
		.expect_err("A codeless prompt should fail the acquisition.");

	assert!(matches!(err, Error::AuthorizationDenied { code: None }));
}

#[tokio::test]
async fn manual_wait_blocks_acquisition_until_released() {
	let transport = StubTransport::new([ok(&token_body("Bearer", 300))]);
	let prompter = StubPrompter::granting("auth-code");
	let manager =
		Arc::new(stub::manager(transport.clone(), prompter).with_refresh_token("rt-1"));

	manager.start_wait().await;

	let mut task = {
		let manager = manager.clone();

		tokio::spawn(async move { manager.authorization_header().await })
	};

	assert!(
		tokio::time::timeout(Duration::from_millis(50), &mut task).await.is_err(),
		"Acquisition should stay parked while the manual wait is held.",
	);

	manager.end_wait();

	let header = task
		.await
		.expect("Task should not panic.")
		.expect("Acquisition should resume after the manual wait is released.");

	assert_eq!(header, "Bearer at");
}

#[tokio::test]
async fn manager_stays_usable_after_a_failed_acquisition() {
	let transport = StubTransport::new([
		stub::response(500, r#"{"error":"server_error"}"#),
		ok(&token_body("Bearer", 300)),
	]);
	let prompter = StubPrompter::granting("auth-code");
	let manager =
		stub::manager(transport.clone(), prompter).with_refresh_token("rt-1");
	let err = manager
		.authorization_header()
		.await
		.expect_err("The scripted 500 should fail the first acquisition.");

	assert!(matches!(err, Error::TokenEndpoint { status: 500, .. }));

	let header = manager
		.authorization_header()
		.await
		.expect("A later acquisition should succeed on the same manager.");

	assert_eq!(header, "Bearer at");
}
