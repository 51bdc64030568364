pub mod eta;
pub mod history;
pub mod location;
pub mod progress;
pub mod route;
pub mod routing;
pub mod session;
pub mod storage;
