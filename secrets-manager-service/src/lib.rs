pub mod config;
pub mod dtos;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod porting;
pub mod services;
pub mod startup;
