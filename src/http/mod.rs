pub mod bodypolicy;
pub mod headerparser;
pub mod method;
pub mod multipart;
pub mod orderedheaders;
pub mod request;
pub mod requestbody;
pub mod response;
pub mod responsebody;
pub mod retry;

// Re-exports for convenience
pub use method::Verb;
pub use multipart::{Form, MultipartBody, Part};
pub use orderedheaders::OrderedHeaderMap;
pub use request::LogicalRequest;
pub use requestbody::RequestBody;
pub use response::{ProtocolVersion, TransportResponse};
pub use responsebody::ResponseBody;
