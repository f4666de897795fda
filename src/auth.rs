//! Auth-domain identifiers, the access token, and the session hooks the client is wired to.

pub mod hooks;
pub mod id;
pub mod token;

pub use hooks::*;
pub use id::*;
pub use token::*;
