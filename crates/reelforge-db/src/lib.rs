//! Reelforge-DB: Database schema, migrations, and query operations
//!
//! This crate provides database functionality for reelforge using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use reelforge_db::pool::{init_pool, get_conn};
//! use reelforge_db::queries::{convertables, videos};
//!
//! let pool = init_pool("/var/lib/reelforge/db.sqlite").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let video = videos::create_video(&conn, "Movie", Some("/uploads/movie.mp4")).unwrap();
//! let record = convertables::get_or_create(&conn, video.id).unwrap();
//! assert!(record.available_profiles().is_empty());
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
