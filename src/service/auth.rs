//! gRPC handler for credential login.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tonic::{Request, Response, Status};
use tracing::info;

use crate::auth::{AccessPolicy, TokenAuthority, UserRegistry};
use crate::proto::auth_service_server::AuthService;
use crate::proto::{LoginRequest, LoginResponse};

/// gRPC service implementation for username/password login.
pub struct AuthServiceImpl {
    users: Arc<UserRegistry>,
    authority: Arc<TokenAuthority>,
    policy: Arc<AccessPolicy>,
}

impl AuthServiceImpl {
    /// Creates a new login service over the given registry and authority.
    pub fn new(
        users: Arc<UserRegistry>,
        authority: Arc<TokenAuthority>,
        policy: Arc<AccessPolicy>,
    ) -> Self {
        Self {
            users,
            authority,
            policy,
        }
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let start = Instant::now();
        counter!("auth.login.requests").increment(1);

        self.policy
            .authorize("Login", request.metadata())
            .map_err(Status::from)?;

        let req = request.into_inner();

        // Unknown user and wrong password are indistinguishable to callers.
        let user = match self.users.find(&req.username) {
            Some(user) if user.verify_password(&req.password) => user,
            _ => {
                counter!("auth.login.failure").increment(1);
                return Err(Status::unauthenticated("incorrect username or password"));
            }
        };

        let access_token = self
            .authority
            .issue(user.username(), user.role())
            .map_err(Status::from)?;

        histogram!("auth.login.duration").record(start.elapsed().as_secs_f64());
        counter!("auth.login.success").increment(1);
        info!(username = %user.username(), role = %user.role(), "issued access token");

        Ok(Response::new(LoginResponse { access_token }))
    }
}
