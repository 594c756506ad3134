//! Loopback servers shared by the integration tests.

#![allow(dead_code)]

pub mod ftp_server;
pub mod http_server;
