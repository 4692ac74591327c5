pub mod clock;
pub mod config;
pub mod dataset;
pub mod error;
pub mod gateway;
pub mod ingestion;
pub mod latency;
pub mod metrics;
pub mod models;
pub mod optimizer;
pub mod output;
pub mod retry;
pub mod scenario;
pub mod tuning;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ScenarioConfig, TuningConfig};
pub use dataset::{DatasetReader, JsonlDatasetReader};
pub use error::{EvalError, GatewayError};
pub use gateway::{MusubiHttpClient, SearchGateway, SearchRequest};
pub use models::{Document, Query, SearchParam};
pub use scenario::{ScenarioReport, ScenarioRunner};
pub use tuning::{ParamTuner, TuningReport};
