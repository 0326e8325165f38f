pub mod alphavantage;
pub mod analysis;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod indicator;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod store;
