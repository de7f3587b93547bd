pub mod settings_service;
pub mod url_service;
pub mod webhook_service;
