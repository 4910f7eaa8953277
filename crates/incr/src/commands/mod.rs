pub mod diff;
pub mod replay;
pub mod scopes;
