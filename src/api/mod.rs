//! API 层：客户端抽象与实现（HTTP / Mock）

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpApiHelper;
pub use mock::{MockApiHelper, RecordedCall};
pub use traits::{decode, ApiHelper};
