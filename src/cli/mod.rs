//! Terminal front ends used by the `storyplay` binary

pub mod check;
pub mod play;
