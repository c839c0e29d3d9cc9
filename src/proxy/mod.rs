pub mod aggregate;
pub mod forward;
pub mod stream_bridge;
pub mod upstream;
