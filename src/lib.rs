pub mod config;
pub mod db;
pub mod docker;
pub mod http_server;
pub mod monitor;
pub mod notifications;
pub mod scanner;
