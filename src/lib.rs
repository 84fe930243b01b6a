pub mod api;
pub mod config;
pub mod converter;
pub mod db;
pub mod decoder;
pub mod error;
pub mod feed;
pub mod job;
pub mod model;
pub mod service;
pub mod sync;
pub mod upload;
