pub mod directory;
pub mod roster;
