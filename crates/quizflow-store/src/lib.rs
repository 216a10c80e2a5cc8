//! Quizflow — PostgreSQL session store.

pub mod pg_session_store;

pub use pg_session_store::PgSessionStore;
