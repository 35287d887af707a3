pub mod external;
pub mod ingress;
pub mod metrics;
pub mod models;
pub mod monitor;
pub mod utils;
