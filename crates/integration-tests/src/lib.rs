//! Integration tests for Riffhouse.
//!
//! Each test spawns the full storefront router on an ephemeral port, backed
//! by the in-memory store and an in-memory session store, and talks to it
//! over HTTP with a cookie-carrying `reqwest` client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p riffhouse-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `sessions` - Registration, login, logout and access control
//! - `catalog` - Product browsing and admin product editing
//! - `carts` - Cart mutation
//! - `checkout` - Checkout properties, including concurrent checkouts
//! - `admin` - Stock panel, tickets and carts by id

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};

use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};

use riffhouse_core::{Price, ProductId, ProductStatus, Stock, UserId, UserRole};
use riffhouse_storefront::config::{LogFormat, OAuthConfig, StorefrontConfig};
use riffhouse_storefront::db::{MemoryStore, ProductRepository, Repositories, UserRepository};
use riffhouse_storefront::models::{NewProduct, Product};
use riffhouse_storefront::{AppState, build_router};

/// Password used for every test account.
pub const PASSWORD: &str = "correct-horse-battery";

/// A running storefront and direct access to its storage.
pub struct TestApp {
    pub address: SocketAddr,
    pub store: MemoryStore,
    next_ip: AtomicU32,
}

impl TestApp {
    /// Start the storefront on `127.0.0.1:0`.
    pub async fn spawn() -> Self {
        let store = MemoryStore::new();
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://unused"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            oauth: OAuthConfig::default(),
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config, Repositories::in_memory(store.clone()));
        let app = build_router(state, tower_sessions::MemoryStore::default());

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            address,
            store,
            next_ip: AtomicU32::new(1),
        }
    }

    /// A fresh client with its own cookie jar (its own session).
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    /// Send a request and decode the JSON body (`Value::Null` if it isn't JSON).
    ///
    /// Every request comes from a different client address so the
    /// per-IP rate limiters never trip.
    pub async fn send(
        &self,
        client: &Client,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let n = self.next_ip.fetch_add(1, Ordering::Relaxed);
        let forwarded = Ipv4Addr::from(0x0A00_0000 | n).to_string();

        let mut request = client
            .request(method, format!("http://{}{path}", self.address))
            .header("x-forwarded-for", forwarded);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.unwrap();
        let status = response.status();
        let text = response.text().await.unwrap();
        (status, serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    pub async fn get(&self, client: &Client, path: &str) -> (StatusCode, Value) {
        self.send(client, Method::GET, path, None).await
    }

    pub async fn post(&self, client: &Client, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(client, Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, client: &Client, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(client, Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, client: &Client, path: &str) -> (StatusCode, Value) {
        self.send(client, Method::DELETE, path, None).await
    }

    /// Register `email` through the API; the returned client is logged in.
    pub async fn shopper(&self, email: &str) -> (Client, UserId) {
        let client = Self::client();
        let (status, body) = self
            .post(
                &client,
                "/api/sessions/register",
                json!({
                    "firstName": "Test",
                    "lastName": "Shopper",
                    "email": email,
                    "age": 30,
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = UserId::new(i32::try_from(body["user"]["id"].as_i64().unwrap()).unwrap());
        (client, id)
    }

    /// A logged-in admin. The role is granted in storage, then the user logs
    /// in again so the session carries it.
    pub async fn admin(&self, email: &str) -> Client {
        let (client, id) = self.shopper(email).await;
        UserRepository::set_role(&self.store, id, UserRole::Admin)
            .await
            .unwrap();

        let (status, body) = self
            .post(
                &client,
                "/api/sessions/login",
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        client
    }

    /// Insert a product directly into storage.
    pub async fn product(&self, code: &str, price: &str, stock: i64) -> Product {
        ProductRepository::create(
            &self.store,
            &NewProduct {
                title: format!("Guitar {code}"),
                description: "Test instrument".to_string(),
                price: Price::new(price.parse::<Decimal>().unwrap()).unwrap(),
                stock: Stock::new(stock).unwrap(),
                category: "electric".to_string(),
                brand: "Riffhouse".to_string(),
                model: code.to_string(),
                code: code.to_string(),
                image_url: format!("https://images.example/{code}.jpg"),
                status: ProductStatus::Active,
            },
        )
        .await
        .unwrap()
    }

    /// Current stock of a product, read from storage.
    pub async fn stock_of(&self, id: ProductId) -> i32 {
        ProductRepository::get(&self.store, id)
            .await
            .unwrap()
            .unwrap()
            .stock
            .get()
    }

    /// Add `quantity` of a product to the client's cart through the API.
    pub async fn add_to_cart(&self, client: &Client, product: ProductId, quantity: i64) {
        let (status, body) = self
            .post(
                client,
                "/api/carts/add",
                json!({ "productId": product, "quantity": quantity }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
}

/// Parse a decimal serialized as a JSON string (prices, totals, amounts).
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}
