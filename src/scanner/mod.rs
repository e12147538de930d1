pub mod pool;
pub mod session;
pub mod step;
pub mod toolkit;

pub use pool::SessionPool;
pub use session::ScanSession;
pub use step::compose_url;
pub use toolkit::Toolkit;
