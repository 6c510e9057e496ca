//! gRPC handlers for the laptop catalog.
//!
//! Each handler authorizes the call before touching the request body; for
//! streaming calls this happens before any stream message is read, so an
//! unauthorized stream never reaches the protocol state machine.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::AccessPolicy;
use crate::error::Error;
use crate::proto::catalog_service_server::CatalogService;
use crate::proto::upload_image_request::Data;
use crate::proto::{
    CreateLaptopRequest, CreateLaptopResponse, RateLaptopRequest, RateLaptopResponse,
    SearchLaptopRequest, SearchLaptopResponse, UploadImageRequest, UploadImageResponse,
};
use crate::store::{DiskImageStore, LaptopStore, RatingStore};

/// Maximum accepted image size in bytes.
const MAX_IMAGE_SIZE: u64 = 1 << 20;

/// gRPC service implementation for the laptop catalog.
pub struct CatalogServiceImpl {
    laptops: Arc<LaptopStore>,
    images: DiskImageStore,
    ratings: Arc<RatingStore>,
    policy: Arc<AccessPolicy>,
}

impl CatalogServiceImpl {
    /// Creates a new catalog service over the given stores and policy.
    pub fn new(
        laptops: Arc<LaptopStore>,
        images: DiskImageStore,
        ratings: Arc<RatingStore>,
        policy: Arc<AccessPolicy>,
    ) -> Self {
        Self {
            laptops,
            images,
            ratings,
            policy,
        }
    }
}

#[tonic::async_trait]
impl CatalogService for CatalogServiceImpl {
    async fn create_laptop(
        &self,
        request: Request<CreateLaptopRequest>,
    ) -> Result<Response<CreateLaptopResponse>, Status> {
        let start = Instant::now();
        counter!("catalog.create.requests").increment(1);

        self.policy
            .authorize("CreateLaptop", request.metadata())
            .map_err(Status::from)?;

        let mut laptop = request
            .into_inner()
            .laptop
            .ok_or_else(|| Status::invalid_argument("laptop is required"))?;

        if laptop.id.is_empty() {
            laptop.id = Uuid::new_v4().to_string();
        } else if Uuid::parse_str(&laptop.id).is_err() {
            return Err(Status::invalid_argument("laptop id is not a valid UUID"));
        }

        info!(id = %laptop.id, "create laptop");

        let result = self.laptops.save(laptop).map_err(Status::from);

        histogram!("catalog.create.duration").record(start.elapsed().as_secs_f64());
        if result.is_ok() {
            counter!("catalog.create.success").increment(1);
        } else {
            counter!("catalog.create.failure").increment(1);
        }

        let id = result?;
        Ok(Response::new(CreateLaptopResponse { id }))
    }

    type SearchLaptopStream = ReceiverStream<Result<SearchLaptopResponse, Status>>;

    async fn search_laptop(
        &self,
        request: Request<SearchLaptopRequest>,
    ) -> Result<Response<Self::SearchLaptopStream>, Status> {
        counter!("catalog.search.requests").increment(1);

        self.policy
            .authorize("SearchLaptop", request.metadata())
            .map_err(Status::from)?;

        let filter = request
            .into_inner()
            .filter
            .ok_or_else(|| Status::invalid_argument("filter is required"))?;

        // Snapshot the matches up front; zero matches is an empty stream,
        // not an error.
        let matches = self.laptops.search(&filter);
        info!(matches = matches.len(), "search laptops");
        counter!("catalog.search.matches").increment(matches.len() as u64);

        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            for laptop in matches {
                let id = laptop.id.clone();
                if tx
                    .send(Ok(SearchLaptopResponse {
                        laptop: Some(laptop),
                    }))
                    .await
                    .is_err()
                {
                    // Client went away; stop emitting.
                    return;
                }
                debug!(%id, "emitted search match");
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        counter!("catalog.upload.requests").increment(1);

        self.policy
            .authorize("UploadImage", request.metadata())
            .map_err(Status::from)?;

        let mut stream = request.into_inner();

        // AwaitingInfo: the first message must carry image metadata.
        let info = match stream.message().await? {
            Some(UploadImageRequest {
                data: Some(Data::Info(info)),
            }) => info,
            Some(_) => {
                return Err(Status::invalid_argument(
                    "first message must carry image info",
                ))
            }
            None => {
                return Err(Status::invalid_argument(
                    "upload stream closed before image info",
                ))
            }
        };

        if !self.laptops.contains(&info.laptop_id) {
            return Err(Status::from(Error::NotFound(info.laptop_id)));
        }

        info!(laptop_id = %info.laptop_id, image_type = %info.image_type, "upload image");

        let mut upload = self
            .images
            .begin(&info.laptop_id, &info.image_type)
            .await
            .map_err(Status::from)?;

        // ReceivingChunks: append until the client closes its send side. Any
        // protocol violation or failure aborts the upload, leaving no
        // visible artifact.
        loop {
            let message = match stream.message().await {
                Ok(message) => message,
                Err(status) => {
                    upload.abort().await;
                    return Err(status);
                }
            };

            let chunk = match message {
                None => break,
                Some(UploadImageRequest {
                    data: Some(Data::ChunkData(chunk)),
                }) => chunk,
                Some(_) => {
                    upload.abort().await;
                    return Err(Status::invalid_argument(
                        "expected chunk data after image info",
                    ));
                }
            };

            let total = match upload.write_chunk(&chunk).await {
                Ok(total) => total,
                Err(e) => {
                    upload.abort().await;
                    return Err(Status::from(e));
                }
            };

            if total > MAX_IMAGE_SIZE {
                upload.abort().await;
                return Err(Status::invalid_argument(format!(
                    "image exceeds maximum size of {MAX_IMAGE_SIZE} bytes"
                )));
            }
        }

        // Completed: exactly one terminal response.
        let (id, size) = upload.complete().await.map_err(Status::from)?;
        counter!("catalog.upload.bytes").increment(size);
        info!(%id, size, "image stored");

        Ok(Response::new(UploadImageResponse { id, size }))
    }

    type RateLaptopStream = ReceiverStream<Result<RateLaptopResponse, Status>>;

    async fn rate_laptop(
        &self,
        request: Request<Streaming<RateLaptopRequest>>,
    ) -> Result<Response<Self::RateLaptopStream>, Status> {
        counter!("catalog.rate.requests").increment(1);

        self.policy
            .authorize("RateLaptop", request.metadata())
            .map_err(Status::from)?;

        let mut inbound = request.into_inner();
        let laptops = Arc::clone(&self.laptops);
        let ratings = Arc::clone(&self.ratings);
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(async move {
            loop {
                let req = match inbound.message().await {
                    // Inbound exhausted: close the outbound stream.
                    Ok(None) => break,
                    Ok(Some(req)) => req,
                    Err(status) => {
                        let _ = tx.send(Err(status)).await;
                        break;
                    }
                };

                // Records are never deleted, so this check cannot be
                // invalidated before the score is applied.
                if !laptops.contains(&req.laptop_id) {
                    let _ = tx
                        .send(Err(Status::from(Error::NotFound(req.laptop_id))))
                        .await;
                    break;
                }

                let (rated_count, average_score) = ratings.add(&req.laptop_id, req.score);
                counter!("catalog.rate.scores").increment(1);
                debug!(laptop_id = %req.laptop_id, rated_count, average_score, "rated laptop");

                // Exactly one response per request, queued before the next
                // inbound read so responses mirror requests in order.
                let response = RateLaptopResponse {
                    laptop_id: req.laptop_id,
                    rated_count,
                    average_score,
                };
                if tx.send(Ok(response)).await.is_err() {
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
