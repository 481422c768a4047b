mod stub;

// crates.io
use serde_json::json;
// self
use oauth2_dpop_client::{
	manager::{Introspection, TokenManager},
	token::TokenKind,
};
use stub::{StubPrompter, StubTransport, credentials, endpoints_with_maintenance, ok, token_body};

fn maintenance_manager(
	transport: std::sync::Arc<StubTransport>,
	prompter: std::sync::Arc<StubPrompter>,
) -> TokenManager<StubTransport> {
	TokenManager::new(transport, prompter, credentials(), endpoints_with_maintenance())
}

#[tokio::test]
async fn revoke_without_an_endpoint_is_a_no_op() {
	let transport = StubTransport::new([]);
	let manager = stub::manager(transport.clone(), StubPrompter::granting("auth-code"))
		.with_refresh_token("rt-1");
	let revoked = manager.revoke(TokenKind::Refresh).await.expect("Revoke should not error.");

	assert!(!revoked);
	assert_eq!(transport.request_count(), 0);
	assert_eq!(manager.refresh_token(), Some("rt-1".into()));
}

#[tokio::test]
async fn revoke_without_a_token_is_trivially_true() {
	let transport = StubTransport::new([]);
	let manager =
		maintenance_manager(transport.clone(), StubPrompter::granting("auth-code"));
	let revoked = manager.revoke(TokenKind::Refresh).await.expect("Revoke should not error.");

	assert!(revoked);
	assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn revoke_posts_the_token_and_drops_it_locally() {
	let transport = StubTransport::new([stub::response(200, "")]);
	let manager = maintenance_manager(transport.clone(), StubPrompter::granting("auth-code"))
		.with_refresh_token("rt-1");
	let revoked = manager.revoke(TokenKind::Refresh).await.expect("Revoke should not error.");

	assert!(revoked);

	let requests = transport.requests();

	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].url.as_str(), "https://auth.example/revoke");
	assert_eq!(requests[0].field_value("token"), Some("rt-1"));
	assert_eq!(requests[0].field_value("token_type_hint"), Some("refresh_token"));
	assert_eq!(manager.refresh_token(), None);
}

#[tokio::test]
async fn revoke_treats_a_completed_error_response_as_done() {
	let transport = StubTransport::new([stub::response(503, "")]);
	let manager = maintenance_manager(transport.clone(), StubPrompter::granting("auth-code"))
		.with_refresh_token("rt-1");
	let revoked = manager.revoke(TokenKind::Refresh).await.expect("Revoke should not error.");

	assert!(revoked);
}

#[tokio::test]
async fn revoking_the_access_token_forces_the_next_acquisition() {
	let transport = StubTransport::new([
		ok(&token_body("Bearer", 300)),
		stub::response(200, ""),
		ok(&token_body("Bearer", 300)),
	]);
	let manager = maintenance_manager(transport.clone(), StubPrompter::granting("auth-code"))
		.with_refresh_token("rt-1");

	manager.authorization_header().await.expect("First acquisition should succeed.");

	let revoked = manager.revoke(TokenKind::Access).await.expect("Revoke should not error.");

	assert!(revoked);

	manager.authorization_header().await.expect("Re-acquisition should succeed.");

	// Acquire, revoke, acquire again.
	assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn introspect_reports_a_missing_endpoint_as_not_configured() {
	let transport = StubTransport::new([]);
	let manager = stub::manager(transport, StubPrompter::granting("auth-code"))
		.with_refresh_token("rt-1");
	let outcome =
		manager.introspect(TokenKind::Refresh).await.expect("Introspect should not error.");

	assert_eq!(outcome, Introspection::NotConfigured);
}

#[tokio::test]
async fn introspect_reports_a_missing_token() {
	let transport = StubTransport::new([]);
	let manager = maintenance_manager(transport, StubPrompter::granting("auth-code"));
	let outcome =
		manager.introspect(TokenKind::Access).await.expect("Introspect should not error.");

	assert_eq!(outcome, Introspection::Missing);
}

#[tokio::test]
async fn introspect_returns_the_server_body() {
	let transport =
		StubTransport::new([stub::response(200, r#"{"active":true,"scope":"email"}"#)]);
	let manager = maintenance_manager(transport.clone(), StubPrompter::granting("auth-code"))
		.with_refresh_token("rt-1");
	let outcome =
		manager.introspect(TokenKind::Refresh).await.expect("Introspect should not error.");

	assert_eq!(
		outcome,
		Introspection::Response(json!({ "active": true, "scope": "email" })),
	);

	let requests = transport.requests();

	assert_eq!(requests[0].url.as_str(), "https://auth.example/introspect");
	assert_eq!(requests[0].field_value("token_type_hint"), Some("refresh_token"));
}
