pub mod add;
pub mod common;
pub mod edit;
pub mod find;
pub mod remove;
pub mod sync;
pub mod view;
