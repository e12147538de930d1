pub mod request;
pub mod response;
pub mod transport;

pub use request::RequestModel;
pub use response::{RawResponse, ResponseModel};
pub use transport::{ReqwestTransport, Transport};
