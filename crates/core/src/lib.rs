//! Auraforming Core
//!
//! Foundational types for the Auraforming workspace. This crate has zero
//! dependencies on application-level code (database, HTTP, LLM providers).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `form` - Field model (`FieldDescriptor`, `FieldKind`) and key/label derivation
//! - `coercion` - Mapping judged free-text values onto a field's native domain
//! - `language` - Supported interview languages and code normalization
//! - `proxy` - Proxy configuration shared by outbound HTTP clients
//!
//! ## Design Principles
//!
//! 1. **No I/O** - everything here is pure and synchronous
//! 2. **One coercion path** - interview, preview and submission all share `coercion`
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod coercion;
pub mod error;
pub mod form;
pub mod language;
pub mod proxy;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Form Model ─────────────────────────────────────────────────────────
pub use form::{group_key_of, humanize_key, FieldDescriptor, FieldKind};

// ── Coercion ───────────────────────────────────────────────────────────
pub use coercion::{
    coerce_boolean, coerce_group, coerce_value, group_options, is_selected, match_option,
};

// ── Languages ──────────────────────────────────────────────────────────
pub use language::{language_family, normalize_language_code, Language, DEFAULT_LANGUAGE};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};
