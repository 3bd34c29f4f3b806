pub mod cdn;
pub mod docs;
pub mod mirror;
pub mod winget;
