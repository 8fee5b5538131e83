// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Integration tests for the JSON API, including concurrent requests.
//!
//! Each test binds the real router to an ephemeral port and talks to it
//! with reqwest, minting access tokens the way the auth service would.

use bank_ledger_rs::api::{self, AppState};
use bank_ledger_rs::auth::Claims;
use bank_ledger_rs::{
    AccountId, AccountStore, InMemoryJournal, JwtAuthenticator, NewAccount, NoopEmitter,
    TransferEngine,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

const SECRET: &[u8] = b"server-test-secret";

// === Server Setup ===

/// Test server that binds to an ephemeral port.
struct TestServer {
    base_url: String,
    store: Arc<AccountStore>,
    client: Client,
}

impl TestServer {
    async fn new() -> Self {
        let store = Arc::new(AccountStore::new());
        let engine = Arc::new(TransferEngine::new(
            Arc::clone(&store),
            Arc::new(InMemoryJournal::new()),
            Arc::new(NoopEmitter),
        ));
        let authenticator = Arc::new(JwtAuthenticator::new(SECRET, Arc::clone(&store)));
        let app = api::router(AppState::new(engine, authenticator));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to be ready by polling with retries
        let client = Client::new();
        let health_url = format!("{}/api/health", base_url);
        for _ in 0..50 {
            match client.get(&health_url).send().await {
                Ok(_) => break,
                Err(_) => tokio::time::sleep(tokio::time::Duration::from_millis(50)).await,
            }
        }

        TestServer {
            base_url,
            store,
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn user(&self, email: &str, phone: &str, balance: Decimal, verified: bool) -> (AccountId, String) {
        let mut account = NewAccount::new(email, phone).with_balance(balance);
        if verified {
            account = account.verified();
        }
        let id = self.store.create(account).unwrap().id;
        (id, token(id))
    }

    async fn transfer(&self, token: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url("/api/users/transfer"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }
}

fn token(id: AccountId) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        user_id: id.to_string(),
        iat: now,
        exp: now + 3600,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

// === Tests ===

#[tokio::test]
async fn health_reports_counts() {
    let server = TestServer::new().await;
    server.user("a@example.com", "+15550000001", dec!(0), true);

    let response = server.client.get(server.url("/api/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["accounts"], 1);
    assert_eq!(body["data"]["transactions"], 0);
}

#[tokio::test]
async fn transfer_then_dashboards_show_both_sides() {
    let server = TestServer::new().await;
    let (_, sender) = server.user("s@example.com", "+15550000001", dec!(1000), true);
    let (_, recipient) = server.user("r@example.com", "+15550000002", dec!(500), true);

    let (status, body) = server
        .transfer(&sender, json!({"recipientEmail": "r@example.com", "amount": 200}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Transfer completed successfully");
    assert_eq!(body["data"]["newBalance"].as_f64(), Some(800.0));
    assert_eq!(body["data"]["transaction"]["amount"].as_f64(), Some(200.0));
    assert_eq!(body["data"]["transaction"]["recipient"], "r@example.com");
    assert!(body["data"]["transaction"]["timestamp"].is_string());
    let tx_id = body["data"]["transaction"]["id"].clone();

    let (status, dash) = server.get(&sender, "/api/users/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["data"]["user"]["balance"].as_f64(), Some(800.0));
    assert_eq!(dash["data"]["user"]["email"], "s@example.com");
    assert_eq!(dash["data"]["user"]["isPhoneVerified"], true);
    assert_eq!(dash["data"]["totalTransactions"], 1);
    let entry = &dash["data"]["recentTransactions"][0];
    assert_eq!(entry["id"], tx_id);
    assert_eq!(entry["type"], "sent");
    assert_eq!(entry["amount"].as_f64(), Some(-200.0));
    assert_eq!(entry["otherParty"], "r@example.com");
    assert_eq!(entry["description"], "Sent to r@example.com");
    assert_eq!(entry["status"], "completed");

    let (_, dash) = server.get(&recipient, "/api/users/dashboard").await;
    assert_eq!(dash["data"]["user"]["balance"].as_f64(), Some(700.0));
    let entry = &dash["data"]["recentTransactions"][0];
    assert_eq!(entry["type"], "received");
    assert_eq!(entry["amount"].as_f64(), Some(200.0));
    assert_eq!(entry["otherParty"], "s@example.com");
}

#[tokio::test]
async fn auth_failures_are_401() {
    let server = TestServer::new().await;
    let (_, unverified) = server.user("u@example.com", "+15550000001", dec!(10), false);

    let response = server
        .client
        .get(server.url("/api/users/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "error": "Access token required"}));

    let (status, body) = server.get("not-a-token", "/api/users/dashboard").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");

    let (status, body) = server.get(&token(AccountId::new()), "/api/users/dashboard").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User not found");

    let (status, body) = server
        .transfer(&unverified, json!({"recipientEmail": "x@example.com", "amount": 1}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Phone number not verified");
}

#[tokio::test]
async fn transfer_errors_follow_the_taxonomy() {
    let server = TestServer::new().await;
    let (_, sender) = server.user("s@example.com", "+15550000001", dec!(100), true);
    server.user("r@example.com", "+15550000002", dec!(0), true);
    server.user("u@example.com", "+15550000003", dec!(0), false);

    let cases = [
        (json!({"recipientEmail": "r@example.com", "amount": 0}), StatusCode::BAD_REQUEST),
        (json!({"recipientEmail": "r@example.com", "amount": -5}), StatusCode::BAD_REQUEST),
        (json!({"recipientEmail": "r@example.com", "amount": 0.001}), StatusCode::BAD_REQUEST),
        (json!({"recipientEmail": "r@example.com", "amount": 100.01}), StatusCode::BAD_REQUEST),
        (json!({"recipientEmail": "s@example.com", "amount": 1}), StatusCode::BAD_REQUEST),
        (json!({"recipientEmail": "not-an-email", "amount": 1}), StatusCode::BAD_REQUEST),
        (json!({"recipientEmail": "r@example.com"}), StatusCode::BAD_REQUEST),
        (json!({"recipientEmail": "r@example.com", "amount": "10"}), StatusCode::BAD_REQUEST),
        (json!({"recipientEmail": "nobody@example.com", "amount": 1}), StatusCode::NOT_FOUND),
        (json!({"recipientEmail": "u@example.com", "amount": 1}), StatusCode::NOT_FOUND),
    ];

    for (body, expected) in cases {
        let (status, response) = server.transfer(&sender, body.clone()).await;
        assert_eq!(status, expected, "{body}");
        assert_eq!(response["success"], false, "{body}");
        assert!(response["error"].is_string(), "{body}");
    }

    let (_, body) = server
        .transfer(&sender, json!({"recipientEmail": "r@example.com", "amount": 100.01}))
        .await;
    assert_eq!(body["error"], "Insufficient balance");
    let (_, body) = server
        .transfer(&sender, json!({"recipientEmail": "s@example.com", "amount": 1}))
        .await;
    assert_eq!(body["error"], "Cannot transfer money to yourself");

    // Nothing moved.
    let (_, dash) = server.get(&sender, "/api/users/dashboard").await;
    assert_eq!(dash["data"]["user"]["balance"].as_f64(), Some(100.0));
    assert_eq!(dash["data"]["totalTransactions"], 0);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let server = TestServer::new().await;
    let (_, sender) = server.user("s@example.com", "+15550000001", dec!(100), true);

    let response = server
        .client
        .post(server.url("/api/users/transfer"))
        .bearer_auth(&sender)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn idempotency_key_replays_and_conflicts() {
    let server = TestServer::new().await;
    let (_, sender) = server.user("s@example.com", "+15550000001", dec!(100), true);
    server.user("r@example.com", "+15550000002", dec!(0), true);

    let send = |amount: u32| {
        server
            .client
            .post(server.url("/api/users/transfer"))
            .bearer_auth(&sender)
            .header("Idempotency-Key", "order-42")
            .json(&json!({"recipientEmail": "r@example.com", "amount": amount}))
            .send()
    };

    let first: Value = send(30).await.unwrap().json().await.unwrap();
    let second: Value = send(30).await.unwrap().json().await.unwrap();
    assert_eq!(first["data"]["transaction"]["id"], second["data"]["transaction"]["id"]);
    assert_eq!(second["data"]["newBalance"].as_f64(), Some(70.0));

    let conflict = send(31).await.unwrap();
    assert_eq!(conflict.status(), StatusCode::CONFLICT);

    let (_, dash) = server.get(&sender, "/api/users/dashboard").await;
    assert_eq!(dash["data"]["user"]["balance"].as_f64(), Some(70.0));
    assert_eq!(dash["data"]["totalTransactions"], 1);
}

#[tokio::test]
async fn transaction_history_is_paged() {
    let server = TestServer::new().await;
    let (_, sender) = server.user("s@example.com", "+15550000001", dec!(1000), true);
    server.user("r@example.com", "+15550000002", dec!(0), true);
    for amount in 1..=12 {
        let (status, _) = server
            .transfer(&sender, json!({"recipientEmail": "r@example.com", "amount": amount}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, dash) = server.get(&sender, "/api/users/dashboard").await;
    assert_eq!(dash["data"]["recentTransactions"].as_array().unwrap().len(), 10);
    assert_eq!(dash["data"]["totalTransactions"], 12);

    let (status, page) = server
        .get(&sender, "/api/users/transactions?limit=5&offset=10")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"]["total"], 12);
    let amounts: Vec<f64> = page["data"]["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["amount"].as_f64().unwrap())
        .collect();
    assert_eq!(amounts, vec![-2.0, -1.0]);

    let (_, page) = server.get(&sender, "/api/users/transactions").await;
    assert_eq!(page["data"]["transactions"].as_array().unwrap().len(), 10);

    let (status, _) = server
        .get(&sender, "/api/users/transactions?limit=abc")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_edit_updates_identity() {
    let server = TestServer::new().await;
    let (id, user) = server.user("a@example.com", "+15550000001", dec!(10), true);
    server.user("b@example.com", "+15550000002", dec!(10), true);

    let response = server
        .client
        .patch(server.url("/api/users/edit-profile"))
        .bearer_auth(&user)
        .json(&json!({"name": "Alice", "email": "Alice@Example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["data"]["user"]["name"], "Alice");
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
    assert_eq!(server.store.record(id).unwrap().email, "alice@example.com");

    let taken = server
        .client
        .patch(server.url("/api/users/edit-profile"))
        .bearer_auth(&user)
        .json(&json!({"phoneNumber": "+15550000002"}))
        .send()
        .await
        .unwrap();
    assert_eq!(taken.status(), StatusCode::BAD_REQUEST);
    let body: Value = taken.json().await.unwrap();
    assert_eq!(body["error"], "User with this phone number already exists");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/nope")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "error": "Route not found"}));
}

/// N concurrent HTTP transfers from one sender admit exactly floor(B / a).
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_never_overdraw() {
    let server = TestServer::new().await;
    let (sender_id, sender) = server.user("s@example.com", "+15550000001", dec!(1000), true);
    let (recipient_id, _) = server.user("r@example.com", "+15550000002", dec!(0), true);

    const NUM_REQUESTS: usize = 100;

    let mut handles = Vec::with_capacity(NUM_REQUESTS);
    for _ in 0..NUM_REQUESTS {
        let client = server.client.clone();
        let url = server.url("/api/users/transfer");
        let token = sender.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(&url)
                .bearer_auth(&token)
                .json(&json!({"recipientEmail": "r@example.com", "amount": 30}))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }

    let statuses: Vec<StatusCode> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    let succeeded = statuses.iter().filter(|s| s.is_success()).count();

    assert_eq!(succeeded, 33);
    assert!(
        statuses
            .iter()
            .filter(|s| !s.is_success())
            .all(|s| *s == StatusCode::BAD_REQUEST)
    );
    assert_eq!(server.store.record(sender_id).unwrap().balance, dec!(10));
    assert_eq!(server.store.record(recipient_id).unwrap().balance, dec!(990));
}
