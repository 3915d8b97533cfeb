pub mod manager;
pub mod transitions;
