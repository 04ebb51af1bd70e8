//! MySQL/MariaDB database driver.
//!
//! This module provides the MySQL implementations of the port traits:
//! - [`MysqlReader`]: source-side streaming reads (SQLx)
//! - [`MysqlWriter`]: destination-side transactional batch writes
//!   (mysql_async)
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod convert;
mod reader;
mod writer;

pub use reader::MysqlReader;
pub use writer::MysqlWriter;
