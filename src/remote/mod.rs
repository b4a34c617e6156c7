mod client;
mod traits;
pub mod types;

pub use client::{GatewayClient, RetryPolicy};
pub use traits::{GatewayApi, Sleeper, TokioSleeper};
pub use types::{NewList, NewPolicy, RemoteList, RemotePolicy};
