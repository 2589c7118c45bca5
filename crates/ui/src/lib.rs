#![deny(unsafe_code)]

pub mod app;
pub mod chat;
pub mod settings;
