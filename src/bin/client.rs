use clap::Parser;
use laptop_catalog::proto::auth_service_client::AuthServiceClient;
use laptop_catalog::proto::catalog_service_client::CatalogServiceClient;
use laptop_catalog::proto::{
    Cpu, CreateLaptopRequest, Filter, ImageInfo, Laptop, LoginRequest, Memory, MemoryUnit,
    RateLaptopRequest, SearchLaptopRequest, UploadImageRequest,
};
use rand::seq::SliceRandom;
use rand::Rng;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::interceptor::InterceptedService;
use tonic::service::Interceptor;
use tonic::transport::Channel;
use tonic::Request;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Laptop catalog demo client", long_about = None)]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, env = "CATALOG_ADDR", default_value = "http://127.0.0.1:50051")]
    addr: String,

    /// Username for login
    #[arg(short, long, default_value = "admin1")]
    username: String,

    /// Password for login
    #[arg(short, long, default_value = "secret")]
    password: String,

    /// Number of laptops to create
    #[arg(short, long, default_value = "10")]
    count: usize,

    /// Path to an image to upload for the first created laptop
    #[arg(short, long)]
    image: Option<std::path::PathBuf>,
}

/// Attaches the bearer token to every outgoing request.
#[derive(Clone)]
struct BearerInterceptor {
    token: MetadataValue<Ascii>,
}

impl Interceptor for BearerInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, tonic::Status> {
        request
            .metadata_mut()
            .insert("authorization", self.token.clone());
        Ok(request)
    }
}

fn random_laptop() -> Laptop {
    let mut rng = rand::thread_rng();

    let brand = *["Apple", "Dell", "Lenovo"].choose(&mut rng).unwrap();
    let name = *["Alpha", "Bravo", "Charlie", "Delta"].choose(&mut rng).unwrap();
    let min_ghz = rng.gen_range(2.0..3.5);

    Laptop {
        id: String::new(),
        brand: brand.to_string(),
        name: name.to_string(),
        cpu: Some(Cpu {
            brand: "Intel".to_string(),
            number_cores: rng.gen_range(2..=8),
            min_ghz,
            max_ghz: min_ghz + rng.gen_range(0.5..2.0),
        }),
        ram: Some(Memory {
            value: *[4, 8, 16, 32].choose(&mut rng).unwrap(),
            unit: MemoryUnit::Gigabyte as i32,
        }),
        price_usd: rng.gen_range(800.0..3000.0),
    }
}

type CatalogClient = CatalogServiceClient<InterceptedService<Channel, BearerInterceptor>>;

async fn upload_image(
    client: &mut CatalogClient,
    laptop_id: &str,
    path: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(path).await?;
    let image_type = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| ".bin".to_string());

    let mut requests = vec![UploadImageRequest {
        data: Some(laptop_catalog::proto::upload_image_request::Data::Info(
            ImageInfo {
                laptop_id: laptop_id.to_string(),
                image_type,
            },
        )),
    }];
    for chunk in bytes.chunks(1024) {
        requests.push(UploadImageRequest {
            data: Some(laptop_catalog::proto::upload_image_request::Data::ChunkData(
                chunk.to_vec(),
            )),
        });
    }

    let response = client
        .upload_image(tokio_stream::iter(requests))
        .await?
        .into_inner();
    info!(id = %response.id, size = response.size, "uploaded image");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut auth_client = AuthServiceClient::connect(args.addr.clone()).await?;
    let login = auth_client
        .login(LoginRequest {
            username: args.username.clone(),
            password: args.password.clone(),
        })
        .await?
        .into_inner();
    info!(username = %args.username, "logged in");

    let interceptor = BearerInterceptor {
        token: format!("Bearer {}", login.access_token).parse()?,
    };
    let channel = Channel::from_shared(args.addr.clone())?.connect().await?;
    let mut client = CatalogServiceClient::with_interceptor(channel, interceptor);

    // Create a batch of randomized laptops.
    let mut created_ids = Vec::with_capacity(args.count);
    for _ in 0..args.count {
        let response = client
            .create_laptop(CreateLaptopRequest {
                laptop: Some(random_laptop()),
            })
            .await?
            .into_inner();
        info!(id = %response.id, "created laptop");
        created_ids.push(response.id);
    }

    // Search with a fixed filter.
    let filter = Filter {
        max_price_usd: 2000.0,
        min_cpu_cores: 4,
        min_cpu_ghz: 2.0,
        min_ram: Some(Memory {
            value: 8,
            unit: MemoryUnit::Gigabyte as i32,
        }),
    };
    let mut stream = client
        .search_laptop(SearchLaptopRequest {
            filter: Some(filter),
        })
        .await?
        .into_inner();
    while let Some(response) = stream.message().await? {
        if let Some(laptop) = response.laptop {
            info!(id = %laptop.id, price = laptop.price_usd, "search match");
        }
    }

    // Rate every created laptop once.
    let requests: Vec<RateLaptopRequest> = created_ids
        .iter()
        .map(|id| RateLaptopRequest {
            laptop_id: id.clone(),
            score: rand::thread_rng().gen_range(1.0..=10.0),
        })
        .collect();
    let mut responses = client
        .rate_laptop(tokio_stream::iter(requests))
        .await?
        .into_inner();
    while let Some(response) = responses.message().await? {
        info!(
            laptop_id = %response.laptop_id,
            count = response.rated_count,
            average = response.average_score,
            "rated laptop"
        );
    }

    if let (Some(path), Some(id)) = (args.image.as_deref(), created_ids.first()) {
        upload_image(&mut client, id, path).await?;
    }

    Ok(())
}
