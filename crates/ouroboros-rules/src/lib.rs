//! Ouroboros Rules
//!
//! Declarative validation of nested request payloads with compact rule
//! strings.
//!
//! A rule tree mirrors the data: every field carries a leaf rule such as
//! `required|int|<=>=[1,100]`, nested objects descend, lists are OR groups
//! and field suffixes mark optional and numeric arrays. A pass returns a
//! verdict, a result mirror of the input and four views of the failures.
//!
//! # Architecture
//!
//! ```text
//! rules ─► parser (leaf string ─► tokens + custom messages)
//!            │
//! data ──► engine (tree walk) ─► resolver (token ─► method + params)
//!            │                      │
//!            │                      └─► registry ─► predicates / custom / global
//!            ▼
//!          session (result mirror + classic/standard error stores)
//! ```
//!
//! # Example
//!
//! ```rust
//! use ouroboros_rules::{Validator, Value};
//! use serde_json::json;
//!
//! let validator = Validator::new()
//!     .set_validation_global(true)
//!     .set_rules(json!({
//!         "h": ["required|>[100]", "required|string"],
//!         "items.*": "required|string",
//!     }));
//!
//! let data: Value = json!({"h": "tall", "items": ["a", "", 3]}).into();
//! let session = validator.validate(&data);
//! assert!(!session.is_valid());
//!
//! let errors: serde_json::Value = session.error(false, true).into();
//! assert_eq!(errors, json!({
//!     "items.1": "items.1 can not be empty",
//!     "items.2": "items.2 must be string",
//! }));
//! ```

// Public modules
pub mod config;
pub mod engine;
pub mod errors;
pub mod formats;
pub mod language;
pub mod parser;
pub mod predicates;
pub mod registry;
pub mod resolver;
pub mod rules;
pub mod session;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigPatch, GrammarConfig, ValidatorConfig, DEFAULT_MAX_DEPTH};
pub use engine::Validator;
pub use errors::{ErrorDetail, ErrorFormat, ErrorKind, ErrorStore, Result, RuleError};
pub use language::ErrorTemplate;
pub use parser::{parse_rule, ErrorMessage, ParsedRule};
pub use registry::{
    register_global_fn, register_global_method, unregister_global_method, BoxedRuleMethod,
    FnRuleMethod, MethodOutput, MethodRegistry, RuleMethod,
};
pub use resolver::MethodInvocation;
pub use rules::RuleNode;
pub use session::ValidationSession;
pub use types::Value;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
