//! Database driver implementations.
//!
//! Drivers implement the port traits from [`crate::port`]:
//!
//! - [`mysql`]: MySQL/MariaDB, split into a SQLx-backed reader and a
//!   mysql_async-backed writer
//!
//! # Adding New Databases
//!
//! To add support for a new backend, create a module under `drivers/` and
//! implement [`crate::port::SourcePort`] and/or [`crate::port::DestPort`].
//! The engine only sees the port traits, so nothing else changes.

pub mod mysql;

pub use mysql::{MysqlReader, MysqlWriter};
