pub mod crypto;
pub mod indicators;
pub mod odoo;

pub mod database;
pub mod server;
pub mod services;
