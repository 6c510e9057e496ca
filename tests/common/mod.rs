//! Common test utilities shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use laptop_catalog::auth::{AccessPolicy, Role, TokenAuthority, User, UserRegistry};
use laptop_catalog::proto::auth_service_server::AuthServiceServer;
use laptop_catalog::proto::catalog_service_client::CatalogServiceClient;
use laptop_catalog::proto::catalog_service_server::CatalogServiceServer;
use laptop_catalog::proto::{Cpu, Laptop, Memory, MemoryUnit};
use laptop_catalog::service::{AuthServiceImpl, CatalogServiceImpl};
use laptop_catalog::store::{DiskImageStore, LaptopStore, RatingStore};
use tonic::transport::{Channel, Server};
use tonic::Request;

pub const SECRET: &str = "integration-test-secret-of-32-bytes!";

/// An in-process server plus handles to its backing state.
pub struct TestServer {
    pub url: String,
    pub laptops: Arc<LaptopStore>,
    pub ratings: Arc<RatingStore>,
    pub authority: Arc<TokenAuthority>,
    pub image_dir: tempfile::TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

pub async fn start_test_server() -> TestServer {
    start_test_server_with_ttl(Duration::from_secs(900)).await
}

pub async fn start_test_server_with_ttl(ttl: Duration) -> TestServer {
    let authority = Arc::new(TokenAuthority::new(SECRET, ttl).unwrap());
    let policy = Arc::new(AccessPolicy::new(Arc::clone(&authority)));

    let users = Arc::new(UserRegistry::new());
    users
        .add(User::new("admin1", "secret", Role::Admin).unwrap())
        .unwrap();
    users
        .add(User::new("user1", "secret", Role::User).unwrap())
        .unwrap();

    let laptops = Arc::new(LaptopStore::new());
    let image_dir = tempfile::tempdir().unwrap();
    let images = DiskImageStore::new(image_dir.path());
    let ratings = Arc::new(RatingStore::new());

    let catalog = CatalogServiceImpl::new(
        Arc::clone(&laptops),
        images,
        Arc::clone(&ratings),
        Arc::clone(&policy),
    );
    let auth = AuthServiceImpl::new(users, Arc::clone(&authority), policy);

    let addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let local_addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        Server::builder()
            .add_service(AuthServiceServer::new(auth))
            .add_service(CatalogServiceServer::new(catalog))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    TestServer {
        url: format!("http://{local_addr}"),
        laptops,
        ratings,
        authority,
        image_dir,
        _handle: handle,
    }
}

pub async fn catalog_client(server: &TestServer) -> CatalogServiceClient<Channel> {
    CatalogServiceClient::connect(server.url.clone())
        .await
        .expect("Failed to connect to server")
}

pub fn admin_token(server: &TestServer) -> String {
    server.authority.issue("admin1", Role::Admin).unwrap()
}

pub fn user_token(server: &TestServer) -> String {
    server.authority.issue("user1", Role::User).unwrap()
}

/// Wraps a message in a request carrying the bearer token.
pub fn authed<T>(message: T, token: &str) -> Request<T> {
    let mut request = Request::new(message);
    request.metadata_mut().insert(
        "authorization",
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

pub fn sample_laptop(id: &str) -> Laptop {
    Laptop {
        id: id.to_string(),
        brand: "Lenovo".to_string(),
        name: "ThinkPad".to_string(),
        cpu: Some(Cpu {
            brand: "Intel".to_string(),
            number_cores: 8,
            min_ghz: 2.5,
            max_ghz: 4.5,
        }),
        ram: Some(Memory {
            value: 16,
            unit: MemoryUnit::Gigabyte as i32,
        }),
        price_usd: 1500.0,
    }
}
