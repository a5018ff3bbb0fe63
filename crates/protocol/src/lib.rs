//! # modai Protocol
//!
//! Models emit tool calls inline, anywhere in their prose:
//!
//! ```text
//! {"protocol":"modai","tool":"<name>","arguments":{...}}
//! ```
//!
//! This crate finds those objects, tolerating double-encoding and minor
//! syntax damage, and removes them from text shown to the user. It is pure:
//! no I/O and no async.
//!
//! ```
//! let text = r#"Sure! {"protocol":"modai","tool":"exec","arguments":{"command":"ls"}} done"#;
//! let found = modai_protocol::extract_all(text);
//! assert_eq!(found[0].tool(), "exec");
//! assert_eq!(modai_protocol::strip_all(text), "Sure!  done");
//! ```

pub mod directive;
pub mod extract;
mod scanner;
pub mod strip;

pub use directive::{Directive, DirectiveError, PROTOCOL};
pub use extract::{
    Accepted, Candidate, Candidates, RejectReason, Rejection, Tier, candidates, directives,
    extract_all, rejections,
};
pub use strip::strip_all;
