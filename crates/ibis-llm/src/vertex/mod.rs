pub mod client;

pub use client::VertexClient;
